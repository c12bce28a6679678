/// Account and thread mute storage
///
/// Thread mutes are keyed on the id of the thread's top-level status, which
/// [`Db::thread_id_of`] finds by climbing stored parents.
use super::{map_unique, parse_opt_time, parse_time, Db};
use crate::error::CourierResult;
use crate::model::{Status, ThreadMute, UserMute};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use std::collections::HashSet;

fn user_mute_from_row(row: &SqliteRow) -> CourierResult<UserMute> {
    let created_at: String = row.try_get("created_at")?;
    Ok(UserMute {
        id: row.try_get("id")?,
        account_id: row.try_get("account_id")?,
        target_account_id: row.try_get("target_account_id")?,
        notifications: row.try_get("notifications")?,
        expires_at: parse_opt_time(row.try_get("expires_at")?)?,
        created_at: parse_time(&created_at)?,
    })
}

impl Db {
    // ========== Account mutes ==========

    /// Store a mute, replacing the settings of an existing one for the pair
    pub async fn put_user_mute(&self, mute: &UserMute) -> CourierResult<()> {
        sqlx::query(
            r#"
            INSERT INTO user_mutes (id, account_id, target_account_id, notifications, expires_at, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(account_id, target_account_id)
            DO UPDATE SET notifications = excluded.notifications, expires_at = excluded.expires_at
            "#,
        )
        .bind(&mute.id)
        .bind(&mute.account_id)
        .bind(&mute.target_account_id)
        .bind(mute.notifications)
        .bind(mute.expires_at.map(|t| t.to_rfc3339()))
        .bind(mute.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn get_user_mute(
        &self,
        account_id: &str,
        target_account_id: &str,
    ) -> CourierResult<Option<UserMute>> {
        let row = sqlx::query(
            r#"
            SELECT id, account_id, target_account_id, notifications, expires_at, created_at
            FROM user_mutes
            WHERE account_id = ? AND target_account_id = ?
            "#,
        )
        .bind(account_id)
        .bind(target_account_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(user_mute_from_row).transpose()
    }

    pub async fn delete_user_mute(&self, account_id: &str, target_account_id: &str) -> CourierResult<bool> {
        let result = sqlx::query("DELETE FROM user_mutes WHERE account_id = ? AND target_account_id = ?")
            .bind(account_id)
            .bind(target_account_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    // ========== Thread mutes ==========

    pub async fn insert_thread_mute(&self, mute: &ThreadMute) -> CourierResult<()> {
        sqlx::query("INSERT INTO thread_mutes (id, account_id, thread_id, created_at) VALUES (?, ?, ?, ?)")
            .bind(&mute.id)
            .bind(&mute.account_id)
            .bind(&mute.thread_id)
            .bind(mute.created_at.to_rfc3339())
            .execute(&self.pool)
            .await
            .map_err(|e| map_unique(e, "thread mute"))?;

        Ok(())
    }

    pub async fn is_thread_muted(&self, account_id: &str, thread_id: &str) -> CourierResult<bool> {
        let row = sqlx::query("SELECT 1 FROM thread_mutes WHERE account_id = ? AND thread_id = ?")
            .bind(account_id)
            .bind(thread_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.is_some())
    }

    pub async fn delete_thread_mute(&self, account_id: &str, thread_id: &str) -> CourierResult<bool> {
        let result = sqlx::query("DELETE FROM thread_mutes WHERE account_id = ? AND thread_id = ?")
            .bind(account_id)
            .bind(thread_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Id of the top-level status of the thread `status` belongs to
    ///
    /// The climb stops at the first parent that is not stored locally, or
    /// that was already passed on the way up.
    pub async fn thread_id_of(&self, status: &Status) -> CourierResult<String> {
        let mut seen = HashSet::from([status.id.clone()]);
        let mut top = status.id.clone();
        let mut parent = status.in_reply_to_id.clone();

        while let Some(id) = parent {
            if !seen.insert(id.clone()) {
                break;
            }
            let Some(next) = self.get_status(&id).await? else {
                break;
            };
            top = next.id;
            parent = next.in_reply_to_id;
        }

        Ok(top)
    }

    /// Delete mutes the account made, and account mutes targeting it
    pub async fn delete_mutes_of(&self, account_id: &str) -> CourierResult<u64> {
        let users = sqlx::query("DELETE FROM user_mutes WHERE account_id = ? OR target_account_id = ?")
            .bind(account_id)
            .bind(account_id)
            .execute(&self.pool)
            .await?;
        let threads = sqlx::query("DELETE FROM thread_mutes WHERE account_id = ?")
            .bind(account_id)
            .execute(&self.pool)
            .await?;

        Ok(users.rows_affected() + threads.rows_affected())
    }
}
