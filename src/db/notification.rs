/// Notification storage
use super::{parse_time, Db};
use crate::error::{CourierError, CourierResult};
use crate::model::{Notification, NotificationType};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

fn notification_from_row(row: &SqliteRow) -> CourierResult<Notification> {
    let kind: String = row.try_get("notification_type")?;
    let status_id: String = row.try_get("status_id")?;
    let created_at: String = row.try_get("created_at")?;

    Ok(Notification {
        id: row.try_get("id")?,
        notification_type: NotificationType::from_db(&kind)
            .ok_or_else(|| CourierError::Internal(format!("Unknown notification type {}", kind)))?,
        target_account_id: row.try_get("target_account_id")?,
        origin_account_id: row.try_get("origin_account_id")?,
        status_id: Some(status_id).filter(|s| !s.is_empty()),
        created_at: parse_time(&created_at)?,
    })
}

impl Db {
    /// Store a notification unless an identical one exists
    ///
    /// Returns whether a row was inserted.
    pub async fn insert_notification(&self, notification: &Notification) -> CourierResult<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO notifications
            (id, notification_type, target_account_id, origin_account_id, status_id, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(notification_type, target_account_id, origin_account_id, status_id) DO NOTHING
            "#,
        )
        .bind(&notification.id)
        .bind(notification.notification_type.as_str())
        .bind(&notification.target_account_id)
        .bind(&notification.origin_account_id)
        .bind(notification.status_id.as_deref().unwrap_or(""))
        .bind(notification.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn get_notification(
        &self,
        kind: NotificationType,
        target_account_id: &str,
        origin_account_id: &str,
        status_id: Option<&str>,
    ) -> CourierResult<Option<Notification>> {
        let row = sqlx::query(
            r#"
            SELECT id, notification_type, target_account_id, origin_account_id, status_id, created_at
            FROM notifications
            WHERE notification_type = ? AND target_account_id = ? AND origin_account_id = ? AND status_id = ?
            "#,
        )
        .bind(kind.as_str())
        .bind(target_account_id)
        .bind(origin_account_id)
        .bind(status_id.unwrap_or(""))
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(notification_from_row).transpose()
    }

    /// Notifications for the account, oldest first
    pub async fn notifications_for(&self, target_account_id: &str) -> CourierResult<Vec<Notification>> {
        let rows = sqlx::query(
            r#"
            SELECT id, notification_type, target_account_id, origin_account_id, status_id, created_at
            FROM notifications
            WHERE target_account_id = ?
            ORDER BY rowid ASC
            "#,
        )
        .bind(target_account_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(notification_from_row).collect()
    }

    /// Notifications sent to or caused by the account
    pub async fn delete_notifications_of(&self, account_id: &str) -> CourierResult<u64> {
        let result = sqlx::query(
            "DELETE FROM notifications WHERE target_account_id = ? OR origin_account_id = ?",
        )
        .bind(account_id)
        .bind(account_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    pub async fn delete_notifications_of_status(&self, status_id: &str) -> CourierResult<u64> {
        let result = sqlx::query("DELETE FROM notifications WHERE status_id = ?")
            .bind(status_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::new_id;
    use chrono::Utc;

    fn notification(kind: NotificationType, status_id: Option<&str>) -> Notification {
        Notification {
            id: new_id(),
            notification_type: kind,
            target_account_id: "alice".to_string(),
            origin_account_id: "bob".to_string(),
            status_id: status_id.map(str::to_string),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_duplicate_notifications_are_ignored() {
        let db = Db::in_memory().await.unwrap();
        assert!(db
            .insert_notification(&notification(NotificationType::Follow, None))
            .await
            .unwrap());
        assert!(!db
            .insert_notification(&notification(NotificationType::Follow, None))
            .await
            .unwrap());
        assert!(db
            .insert_notification(&notification(NotificationType::Mention, Some("s1")))
            .await
            .unwrap());

        let stored = db.notifications_for("alice").await.unwrap();
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[0].status_id, None);
        assert_eq!(stored[1].status_id.as_deref(), Some("s1"));

        assert!(db
            .get_notification(NotificationType::Mention, "alice", "bob", Some("s1"))
            .await
            .unwrap()
            .is_some());
        assert_eq!(db.delete_notifications_of("bob").await.unwrap(), 2);
    }
}
