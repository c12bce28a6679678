/// Account storage
use super::{from_json, map_unique, parse_opt_time, parse_time, to_json, Db};
use crate::error::CourierResult;
use crate::model::Account;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

const ACCOUNT_COLUMNS: &str = "id, uri, username, domain, display_name, language, locked, \
     statuses_count, pinned_count, last_status_at, interaction_policies, moved_to_uri, \
     also_known_as, created_at, suspended_at";

fn account_from_row(row: &SqliteRow) -> CourierResult<Account> {
    let created_at: String = row.try_get("created_at")?;
    let policies: String = row.try_get("interaction_policies")?;
    let also_known_as: String = row.try_get("also_known_as")?;

    Ok(Account {
        id: row.try_get("id")?,
        uri: row.try_get("uri")?,
        username: row.try_get("username")?,
        domain: row.try_get("domain")?,
        display_name: row.try_get("display_name")?,
        language: row.try_get("language")?,
        locked: row.try_get("locked")?,
        statuses_count: row.try_get("statuses_count")?,
        pinned_count: row.try_get("pinned_count")?,
        last_status_at: parse_opt_time(row.try_get("last_status_at")?)?,
        interaction_policies: from_json(&policies)?,
        moved_to_uri: row.try_get("moved_to_uri")?,
        also_known_as: from_json(&also_known_as)?,
        created_at: parse_time(&created_at)?,
        suspended_at: parse_opt_time(row.try_get("suspended_at")?)?,
    })
}

impl Db {
    pub async fn insert_account(&self, account: &Account) -> CourierResult<()> {
        sqlx::query(&format!(
            "INSERT INTO accounts ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            ACCOUNT_COLUMNS
        ))
        .bind(&account.id)
        .bind(&account.uri)
        .bind(&account.username)
        .bind(&account.domain)
        .bind(&account.display_name)
        .bind(&account.language)
        .bind(account.locked)
        .bind(account.statuses_count)
        .bind(account.pinned_count)
        .bind(account.last_status_at.map(|t| t.to_rfc3339()))
        .bind(to_json(&account.interaction_policies)?)
        .bind(&account.moved_to_uri)
        .bind(to_json(&account.also_known_as)?)
        .bind(account.created_at.to_rfc3339())
        .bind(account.suspended_at.map(|t| t.to_rfc3339()))
        .execute(&self.pool)
        .await
        .map_err(|e| map_unique(e, "account"))?;

        Ok(())
    }

    pub async fn get_account(&self, id: &str) -> CourierResult<Option<Account>> {
        let row = sqlx::query(&format!("SELECT {} FROM accounts WHERE id = ?", ACCOUNT_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(account_from_row).transpose()
    }

    pub async fn get_account_by_uri(&self, uri: &str) -> CourierResult<Option<Account>> {
        let row = sqlx::query(&format!("SELECT {} FROM accounts WHERE uri = ?", ACCOUNT_COLUMNS))
            .bind(uri)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(account_from_row).transpose()
    }

    /// Look up by username; `domain` None means a local account
    pub async fn get_account_by_username(
        &self,
        username: &str,
        domain: Option<&str>,
    ) -> CourierResult<Option<Account>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM accounts WHERE username = ? AND IFNULL(domain, '') = ?",
            ACCOUNT_COLUMNS
        ))
        .bind(username)
        .bind(domain.unwrap_or(""))
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(account_from_row).transpose()
    }

    /// Write every mutable column of `account`
    pub async fn update_account(&self, account: &Account) -> CourierResult<()> {
        sqlx::query(
            r#"
            UPDATE accounts
            SET display_name = ?,
                language = ?,
                locked = ?,
                statuses_count = ?,
                pinned_count = ?,
                last_status_at = ?,
                interaction_policies = ?,
                moved_to_uri = ?,
                also_known_as = ?,
                suspended_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&account.display_name)
        .bind(&account.language)
        .bind(account.locked)
        .bind(account.statuses_count)
        .bind(account.pinned_count)
        .bind(account.last_status_at.map(|t| t.to_rfc3339()))
        .bind(to_json(&account.interaction_policies)?)
        .bind(&account.moved_to_uri)
        .bind(to_json(&account.also_known_as)?)
        .bind(account.suspended_at.map(|t| t.to_rfc3339()))
        .bind(&account.id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn delete_account(&self, id: &str) -> CourierResult<bool> {
        let result = sqlx::query("DELETE FROM accounts WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Local accounts whose `also_known_as` lists `uri`
    pub async fn accounts_also_known_as(&self, uri: &str) -> CourierResult<Vec<Account>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM accounts WHERE EXISTS \
             (SELECT 1 FROM json_each(accounts.also_known_as) WHERE json_each.value = ?)",
            ACCOUNT_COLUMNS
        ))
        .bind(uri)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(account_from_row).collect()
    }
}
