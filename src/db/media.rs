/// Media attachment storage
use super::{parse_time, Db};
use crate::error::CourierResult;
use crate::model::{Focus, MediaAttachment};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

fn media_from_row(row: &SqliteRow) -> CourierResult<MediaAttachment> {
    let created_at: String = row.try_get("created_at")?;
    let focus_x: f64 = row.try_get("focus_x")?;
    let focus_y: f64 = row.try_get("focus_y")?;

    Ok(MediaAttachment {
        id: row.try_get("id")?,
        account_id: row.try_get("account_id")?,
        status_id: row.try_get("status_id")?,
        scheduled_status_id: row.try_get("scheduled_status_id")?,
        description: row.try_get("description")?,
        focus: Focus {
            x: focus_x as f32,
            y: focus_y as f32,
        },
        created_at: parse_time(&created_at)?,
    })
}

impl Db {
    pub async fn insert_media(&self, media: &MediaAttachment) -> CourierResult<()> {
        sqlx::query(
            r#"
            INSERT INTO media_attachments
            (id, account_id, status_id, scheduled_status_id, description, focus_x, focus_y, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&media.id)
        .bind(&media.account_id)
        .bind(&media.status_id)
        .bind(&media.scheduled_status_id)
        .bind(&media.description)
        .bind(media.focus.x as f64)
        .bind(media.focus.y as f64)
        .bind(media.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn get_media(&self, id: &str) -> CourierResult<Option<MediaAttachment>> {
        let row = sqlx::query(
            r#"
            SELECT id, account_id, status_id, scheduled_status_id, description, focus_x, focus_y, created_at
            FROM media_attachments
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(media_from_row).transpose()
    }

    pub async fn update_media(&self, media: &MediaAttachment) -> CourierResult<()> {
        sqlx::query(
            r#"
            UPDATE media_attachments
            SET status_id = ?, scheduled_status_id = ?, description = ?, focus_x = ?, focus_y = ?
            WHERE id = ?
            "#,
        )
        .bind(&media.status_id)
        .bind(&media.scheduled_status_id)
        .bind(&media.description)
        .bind(media.focus.x as f64)
        .bind(media.focus.y as f64)
        .bind(&media.id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn delete_media_by_account(&self, account_id: &str) -> CourierResult<u64> {
        let result = sqlx::query("DELETE FROM media_attachments WHERE account_id = ?")
            .bind(account_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    /// Detach media from a deleted status so it can be cleaned up or reused
    pub async fn detach_media_from_status(&self, status_id: &str) -> CourierResult<u64> {
        let result = sqlx::query("UPDATE media_attachments SET status_id = NULL WHERE status_id = ?")
            .bind(status_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_media_round_trip() {
        let db = Db::in_memory().await.unwrap();
        let mut media = MediaAttachment::new("alice", "a cat");
        db.insert_media(&media).await.unwrap();

        media.focus = Focus { x: 0.5, y: -0.5 };
        media.status_id = Some("status".to_string());
        db.update_media(&media).await.unwrap();
        assert_eq!(db.get_media(&media.id).await.unwrap(), Some(media.clone()));

        assert_eq!(db.detach_media_from_status("status").await.unwrap(), 1);
        assert_eq!(db.get_media(&media.id).await.unwrap().unwrap().status_id, None);

        assert_eq!(db.delete_media_by_account("alice").await.unwrap(), 1);
        assert!(db.get_media(&media.id).await.unwrap().is_none());
    }
}
