/// Poll and poll vote storage
use super::{from_json, map_unique, parse_opt_time, parse_time, to_json, Db};
use crate::error::CourierResult;
use crate::model::{Poll, PollVote};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

const POLL_COLUMNS: &str =
    "id, status_id, options, multiple, hide_counts, expires_at, closed_at, votes, voters, created_at";

fn poll_from_row(row: &SqliteRow) -> CourierResult<Poll> {
    let options: String = row.try_get("options")?;
    let votes: String = row.try_get("votes")?;
    let created_at: String = row.try_get("created_at")?;

    Ok(Poll {
        id: row.try_get("id")?,
        status_id: row.try_get("status_id")?,
        options: from_json(&options)?,
        multiple: row.try_get("multiple")?,
        hide_counts: row.try_get("hide_counts")?,
        expires_at: parse_opt_time(row.try_get("expires_at")?)?,
        closed_at: parse_opt_time(row.try_get("closed_at")?)?,
        votes: from_json(&votes)?,
        voters: row.try_get("voters")?,
        created_at: parse_time(&created_at)?,
    })
}

fn vote_from_row(row: &SqliteRow) -> CourierResult<PollVote> {
    let choices: String = row.try_get("choices")?;
    let created_at: String = row.try_get("created_at")?;

    Ok(PollVote {
        id: row.try_get("id")?,
        poll_id: row.try_get("poll_id")?,
        account_id: row.try_get("account_id")?,
        choices: from_json(&choices)?,
        created_at: parse_time(&created_at)?,
    })
}

impl Db {
    pub async fn insert_poll(&self, poll: &Poll) -> CourierResult<()> {
        sqlx::query(&format!(
            "INSERT INTO polls ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            POLL_COLUMNS
        ))
        .bind(&poll.id)
        .bind(&poll.status_id)
        .bind(to_json(&poll.options)?)
        .bind(poll.multiple)
        .bind(poll.hide_counts)
        .bind(poll.expires_at.map(|t| t.to_rfc3339()))
        .bind(poll.closed_at.map(|t| t.to_rfc3339()))
        .bind(to_json(&poll.votes)?)
        .bind(poll.voters)
        .bind(poll.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn get_poll(&self, id: &str) -> CourierResult<Option<Poll>> {
        let row = sqlx::query(&format!("SELECT {} FROM polls WHERE id = ?", POLL_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(poll_from_row).transpose()
    }

    /// Write the mutable poll columns; options are never updated in place
    pub async fn update_poll(&self, poll: &Poll) -> CourierResult<()> {
        sqlx::query(
            r#"
            UPDATE polls
            SET hide_counts = ?, expires_at = ?, closed_at = ?, votes = ?, voters = ?
            WHERE id = ?
            "#,
        )
        .bind(poll.hide_counts)
        .bind(poll.expires_at.map(|t| t.to_rfc3339()))
        .bind(poll.closed_at.map(|t| t.to_rfc3339()))
        .bind(to_json(&poll.votes)?)
        .bind(poll.voters)
        .bind(&poll.id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Write only the settings an edit may change in place
    ///
    /// Tallies and `closed_at` belong to voting and closing and are left alone.
    pub async fn update_poll_settings(&self, poll: &Poll) -> CourierResult<()> {
        sqlx::query("UPDATE polls SET hide_counts = ?, expires_at = ? WHERE id = ?")
            .bind(poll.hide_counts)
            .bind(poll.expires_at.map(|t| t.to_rfc3339()))
            .bind(&poll.id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Delete a poll together with its votes
    pub async fn delete_poll(&self, id: &str) -> CourierResult<()> {
        sqlx::query("DELETE FROM poll_votes WHERE poll_id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        sqlx::query("DELETE FROM polls WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Polls that have an expiry but were never closed
    pub async fn open_polls_with_expiry(&self) -> CourierResult<Vec<Poll>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM polls WHERE expires_at IS NOT NULL AND closed_at IS NULL",
            POLL_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(poll_from_row).collect()
    }

    /// Fails with `Conflict` if the account already voted
    pub async fn insert_poll_vote(&self, vote: &PollVote) -> CourierResult<()> {
        sqlx::query(
            r#"
            INSERT INTO poll_votes (id, poll_id, account_id, choices, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&vote.id)
        .bind(&vote.poll_id)
        .bind(&vote.account_id)
        .bind(to_json(&vote.choices)?)
        .bind(vote.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| map_unique(e, "poll vote"))?;

        Ok(())
    }

    pub async fn get_poll_votes(&self, poll_id: &str) -> CourierResult<Vec<PollVote>> {
        let rows = sqlx::query(
            "SELECT id, poll_id, account_id, choices, created_at FROM poll_votes WHERE poll_id = ?",
        )
        .bind(poll_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(vote_from_row).collect()
    }

    pub async fn poll_votes_by_account(&self, account_id: &str) -> CourierResult<Vec<PollVote>> {
        let rows = sqlx::query(
            "SELECT id, poll_id, account_id, choices, created_at FROM poll_votes WHERE account_id = ?",
        )
        .bind(account_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(vote_from_row).collect()
    }

    pub async fn delete_poll_vote(&self, id: &str) -> CourierResult<()> {
        sqlx::query("DELETE FROM poll_votes WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
