/// Status and status edit storage
use super::{from_json, map_unique, parse_opt_time, parse_time, to_json, Db};
use crate::error::{CourierError, CourierResult};
use crate::model::{Status, StatusEdit, StatusObjectType, Visibility};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

const STATUS_COLUMNS: &str = "id, uri, account_id, in_reply_to_id, in_reply_to_account_id, \
     boost_of_id, content, content_warning, text, language, sensitive, visibility, \
     attachment_ids, mention_ids, tags, emojis, poll_id, object_type, local, pinned_at, \
     created_at, edited_at";

/// Columns that `update_status` knows how to write
pub const UPDATABLE_COLUMNS: &[&str] = &[
    "content",
    "content_warning",
    "text",
    "language",
    "sensitive",
    "attachment_ids",
    "mention_ids",
    "tags",
    "emojis",
    "poll_id",
    "object_type",
    "pinned_at",
    "edited_at",
];

fn status_from_row(row: &SqliteRow) -> CourierResult<Status> {
    let visibility: String = row.try_get("visibility")?;
    let object_type: String = row.try_get("object_type")?;
    let attachment_ids: String = row.try_get("attachment_ids")?;
    let mention_ids: String = row.try_get("mention_ids")?;
    let tags: String = row.try_get("tags")?;
    let emojis: String = row.try_get("emojis")?;
    let created_at: String = row.try_get("created_at")?;

    Ok(Status {
        id: row.try_get("id")?,
        uri: row.try_get("uri")?,
        account_id: row.try_get("account_id")?,
        in_reply_to_id: row.try_get("in_reply_to_id")?,
        in_reply_to_account_id: row.try_get("in_reply_to_account_id")?,
        boost_of_id: row.try_get("boost_of_id")?,
        content: row.try_get("content")?,
        content_warning: row.try_get("content_warning")?,
        text: row.try_get("text")?,
        language: row.try_get("language")?,
        sensitive: row.try_get("sensitive")?,
        visibility: visibility.parse::<Visibility>()?,
        attachment_ids: from_json(&attachment_ids)?,
        mention_ids: from_json(&mention_ids)?,
        tags: from_json(&tags)?,
        emojis: from_json(&emojis)?,
        poll_id: row.try_get("poll_id")?,
        object_type: StatusObjectType::from_db(&object_type),
        local: row.try_get("local")?,
        pinned_at: parse_opt_time(row.try_get("pinned_at")?)?,
        created_at: parse_time(&created_at)?,
        edited_at: parse_opt_time(row.try_get("edited_at")?)?,
        poll: None,
        attachments: Vec::new(),
    })
}

fn edit_from_row(row: &SqliteRow) -> CourierResult<StatusEdit> {
    let attachment_ids: String = row.try_get("attachment_ids")?;
    let attachment_descriptions: String = row.try_get("attachment_descriptions")?;
    let poll_options: Option<String> = row.try_get("poll_options")?;
    let poll_votes: Option<String> = row.try_get("poll_votes")?;
    let created_at: String = row.try_get("created_at")?;

    Ok(StatusEdit {
        id: row.try_get("id")?,
        status_id: row.try_get("status_id")?,
        content: row.try_get("content")?,
        content_warning: row.try_get("content_warning")?,
        text: row.try_get("text")?,
        language: row.try_get("language")?,
        sensitive: row.try_get("sensitive")?,
        attachment_ids: from_json(&attachment_ids)?,
        attachment_descriptions: from_json(&attachment_descriptions)?,
        poll_options: poll_options.as_deref().map(from_json).transpose()?,
        poll_votes: poll_votes.as_deref().map(from_json).transpose()?,
        created_at: parse_time(&created_at)?,
    })
}

impl Db {
    pub async fn insert_status(&self, status: &Status) -> CourierResult<()> {
        sqlx::query(&format!(
            "INSERT INTO statuses ({}) VALUES \
             (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            STATUS_COLUMNS
        ))
        .bind(&status.id)
        .bind(&status.uri)
        .bind(&status.account_id)
        .bind(&status.in_reply_to_id)
        .bind(&status.in_reply_to_account_id)
        .bind(&status.boost_of_id)
        .bind(&status.content)
        .bind(&status.content_warning)
        .bind(&status.text)
        .bind(&status.language)
        .bind(status.sensitive)
        .bind(status.visibility.as_str())
        .bind(to_json(&status.attachment_ids)?)
        .bind(to_json(&status.mention_ids)?)
        .bind(to_json(&status.tags)?)
        .bind(to_json(&status.emojis)?)
        .bind(&status.poll_id)
        .bind(status.object_type.as_str())
        .bind(status.local)
        .bind(status.pinned_at.map(|t| t.to_rfc3339()))
        .bind(status.created_at.to_rfc3339())
        .bind(status.edited_at.map(|t| t.to_rfc3339()))
        .execute(&self.pool)
        .await
        .map_err(|e| map_unique(e, "status"))?;

        Ok(())
    }

    /// Fetch a status without its poll or attachments
    pub async fn get_status(&self, id: &str) -> CourierResult<Option<Status>> {
        let row = sqlx::query(&format!("SELECT {} FROM statuses WHERE id = ?", STATUS_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(status_from_row).transpose()
    }

    /// Fill `poll` and `attachments` from their own tables
    pub async fn populate_status(&self, status: &mut Status) -> CourierResult<()> {
        status.poll = match &status.poll_id {
            Some(poll_id) => self.get_poll(poll_id).await?,
            None => None,
        };

        let mut attachments = Vec::with_capacity(status.attachment_ids.len());
        for id in &status.attachment_ids {
            match self.get_media(id).await? {
                Some(media) => attachments.push(media),
                None => tracing::warn!(status = %status.id, media = %id, "Attachment missing"),
            }
        }
        status.attachments = attachments;

        Ok(())
    }

    /// Write only the named columns of `status`
    pub async fn update_status(&self, status: &Status, columns: &[&str]) -> CourierResult<()> {
        if columns.is_empty() {
            return Ok(());
        }
        if let Some(unknown) = columns.iter().find(|c| !UPDATABLE_COLUMNS.contains(c)) {
            return Err(CourierError::Internal(format!(
                "Cannot update status column {}",
                unknown
            )));
        }

        let assignments: Vec<String> = columns.iter().map(|c| format!("{} = ?", c)).collect();
        let sql = format!("UPDATE statuses SET {} WHERE id = ?", assignments.join(", "));

        let mut query = sqlx::query(&sql);
        for column in columns {
            query = match *column {
                "content" => query.bind(status.content.clone()),
                "content_warning" => query.bind(status.content_warning.clone()),
                "text" => query.bind(status.text.clone()),
                "language" => query.bind(status.language.clone()),
                "sensitive" => query.bind(status.sensitive),
                "attachment_ids" => query.bind(to_json(&status.attachment_ids)?),
                "mention_ids" => query.bind(to_json(&status.mention_ids)?),
                "tags" => query.bind(to_json(&status.tags)?),
                "emojis" => query.bind(to_json(&status.emojis)?),
                "poll_id" => query.bind(status.poll_id.clone()),
                "object_type" => query.bind(status.object_type.as_str()),
                "pinned_at" => query.bind(status.pinned_at.map(|t| t.to_rfc3339())),
                _ => query.bind(status.edited_at.map(|t| t.to_rfc3339())),
            };
        }

        query.bind(&status.id).execute(&self.pool).await?;
        Ok(())
    }

    pub async fn delete_status(&self, id: &str) -> CourierResult<bool> {
        let result = sqlx::query("DELETE FROM statuses WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        sqlx::query("DELETE FROM status_edits WHERE status_id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Every status authored by the account, newest first
    pub async fn statuses_by_account(&self, account_id: &str) -> CourierResult<Vec<Status>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM statuses WHERE account_id = ? ORDER BY created_at DESC, rowid DESC",
            STATUS_COLUMNS
        ))
        .bind(account_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(status_from_row).collect()
    }

    /// Direct replies, oldest first
    pub async fn replies_to(&self, status_id: &str) -> CourierResult<Vec<Status>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM statuses WHERE in_reply_to_id = ? ORDER BY created_at ASC, rowid ASC",
            STATUS_COLUMNS
        ))
        .bind(status_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(status_from_row).collect()
    }

    pub async fn boosts_of(&self, status_id: &str) -> CourierResult<Vec<Status>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM statuses WHERE boost_of_id = ?",
            STATUS_COLUMNS
        ))
        .bind(status_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(status_from_row).collect()
    }

    pub async fn pinned_statuses(&self, account_id: &str) -> CourierResult<Vec<Status>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM statuses WHERE account_id = ? AND pinned_at IS NOT NULL \
             ORDER BY pinned_at DESC",
            STATUS_COLUMNS
        ))
        .bind(account_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(status_from_row).collect()
    }

    pub async fn insert_status_edit(&self, edit: &StatusEdit) -> CourierResult<()> {
        sqlx::query(
            r#"
            INSERT INTO status_edits
            (id, status_id, content, content_warning, text, language, sensitive,
             attachment_ids, attachment_descriptions, poll_options, poll_votes, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&edit.id)
        .bind(&edit.status_id)
        .bind(&edit.content)
        .bind(&edit.content_warning)
        .bind(&edit.text)
        .bind(&edit.language)
        .bind(edit.sensitive)
        .bind(to_json(&edit.attachment_ids)?)
        .bind(to_json(&edit.attachment_descriptions)?)
        .bind(edit.poll_options.as_ref().map(to_json).transpose()?)
        .bind(edit.poll_votes.as_ref().map(to_json).transpose()?)
        .bind(edit.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Edit history of a status, oldest first
    pub async fn get_status_edits(&self, status_id: &str) -> CourierResult<Vec<StatusEdit>> {
        let rows = sqlx::query(
            r#"
            SELECT id, status_id, content, content_warning, text, language, sensitive,
                   attachment_ids, attachment_descriptions, poll_options, poll_votes, created_at
            FROM status_edits
            WHERE status_id = ?
            ORDER BY rowid ASC
            "#,
        )
        .bind(status_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(edit_from_row).collect()
    }
}
