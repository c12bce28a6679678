/// Scheduled status storage
use super::{from_json, parse_time, to_json, Db};
use crate::error::CourierResult;
use crate::model::{PollRequest, ScheduledStatus, Visibility};
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

const SCHEDULED_COLUMNS: &str = "id, account_id, scheduled_at, text, spoiler_text, sensitive, \
     language, visibility, in_reply_to_id, media_ids, poll, created_at";

fn scheduled_from_row(row: &SqliteRow) -> CourierResult<ScheduledStatus> {
    let scheduled_at: String = row.try_get("scheduled_at")?;
    let visibility: String = row.try_get("visibility")?;
    let media_ids: String = row.try_get("media_ids")?;
    let poll: Option<String> = row.try_get("poll")?;
    let created_at: String = row.try_get("created_at")?;

    Ok(ScheduledStatus {
        id: row.try_get("id")?,
        account_id: row.try_get("account_id")?,
        scheduled_at: parse_time(&scheduled_at)?,
        text: row.try_get("text")?,
        spoiler_text: row.try_get("spoiler_text")?,
        sensitive: row.try_get("sensitive")?,
        language: row.try_get("language")?,
        visibility: visibility.parse::<Visibility>()?,
        in_reply_to_id: row.try_get("in_reply_to_id")?,
        media_ids: from_json(&media_ids)?,
        poll: poll.as_deref().map(from_json::<PollRequest>).transpose()?,
        created_at: parse_time(&created_at)?,
    })
}

impl Db {
    pub async fn insert_scheduled_status(&self, scheduled: &ScheduledStatus) -> CourierResult<()> {
        sqlx::query(&format!(
            "INSERT INTO scheduled_statuses ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            SCHEDULED_COLUMNS
        ))
        .bind(&scheduled.id)
        .bind(&scheduled.account_id)
        .bind(scheduled.scheduled_at.to_rfc3339())
        .bind(&scheduled.text)
        .bind(&scheduled.spoiler_text)
        .bind(scheduled.sensitive)
        .bind(&scheduled.language)
        .bind(scheduled.visibility.as_str())
        .bind(&scheduled.in_reply_to_id)
        .bind(to_json(&scheduled.media_ids)?)
        .bind(scheduled.poll.as_ref().map(to_json).transpose()?)
        .bind(scheduled.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn get_scheduled_status(&self, id: &str) -> CourierResult<Option<ScheduledStatus>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM scheduled_statuses WHERE id = ?",
            SCHEDULED_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(scheduled_from_row).transpose()
    }

    pub async fn update_scheduled_at(&self, id: &str, scheduled_at: DateTime<Utc>) -> CourierResult<()> {
        sqlx::query("UPDATE scheduled_statuses SET scheduled_at = ? WHERE id = ?")
            .bind(scheduled_at.to_rfc3339())
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    pub async fn delete_scheduled_status(&self, id: &str) -> CourierResult<bool> {
        let result = sqlx::query("DELETE FROM scheduled_statuses WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn scheduled_statuses_of(&self, account_id: &str) -> CourierResult<Vec<ScheduledStatus>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM scheduled_statuses WHERE account_id = ? ORDER BY scheduled_at ASC",
            SCHEDULED_COLUMNS
        ))
        .bind(account_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(scheduled_from_row).collect()
    }

    pub async fn all_scheduled_statuses(&self) -> CourierResult<Vec<ScheduledStatus>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM scheduled_statuses ORDER BY scheduled_at ASC",
            SCHEDULED_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(scheduled_from_row).collect()
    }
}
