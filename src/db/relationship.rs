/// Follow, follow request, block, fave and bookmark storage
///
/// Follows, follow requests and blocks share one row shape (an edge from
/// `account_id` to `target_account_id`) and a UNIQUE constraint on that
/// pair; inserting a duplicate edge fails with `Conflict`.

use super::{map_unique, parse_time, Db};
use crate::error::CourierResult;
use crate::model::{Block, Bookmark, Fave, Follow, FollowRequest};
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

/// Edge tables sharing the (id, uri, account_id, target_account_id, created_at) shape
#[derive(Debug, Clone, Copy)]
enum Edge {
    Follow,
    FollowRequest,
    Block,
}

impl Edge {
    fn table(self) -> &'static str {
        match self {
            Edge::Follow => "follows",
            Edge::FollowRequest => "follow_requests",
            Edge::Block => "blocks",
        }
    }

    fn label(self) -> &'static str {
        match self {
            Edge::Follow => "follow",
            Edge::FollowRequest => "follow request",
            Edge::Block => "block",
        }
    }
}

struct EdgeRow {
    id: String,
    uri: String,
    account_id: String,
    target_account_id: String,
    created_at: DateTime<Utc>,
}

fn edge_from_row(row: &SqliteRow) -> CourierResult<EdgeRow> {
    let created_at: String = row.try_get("created_at")?;
    Ok(EdgeRow {
        id: row.try_get("id")?,
        uri: row.try_get("uri")?,
        account_id: row.try_get("account_id")?,
        target_account_id: row.try_get("target_account_id")?,
        created_at: parse_time(&created_at)?,
    })
}

macro_rules! from_edge {
    ($ty:ident) => {
        impl From<EdgeRow> for $ty {
            fn from(e: EdgeRow) -> Self {
                $ty {
                    id: e.id,
                    uri: e.uri,
                    account_id: e.account_id,
                    target_account_id: e.target_account_id,
                    created_at: e.created_at,
                }
            }
        }
    };
}

from_edge!(Follow);
from_edge!(FollowRequest);
from_edge!(Block);

fn fave_from_row(row: &SqliteRow) -> CourierResult<Fave> {
    let created_at: String = row.try_get("created_at")?;
    Ok(Fave {
        id: row.try_get("id")?,
        uri: row.try_get("uri")?,
        account_id: row.try_get("account_id")?,
        target_account_id: row.try_get("target_account_id")?,
        status_id: row.try_get("status_id")?,
        created_at: parse_time(&created_at)?,
    })
}

impl Db {
    async fn insert_edge(
        &self,
        edge: Edge,
        id: &str,
        uri: &str,
        account_id: &str,
        target_account_id: &str,
        created_at: DateTime<Utc>,
    ) -> CourierResult<()> {
        sqlx::query(&format!(
            "INSERT INTO {} (id, uri, account_id, target_account_id, created_at) VALUES (?, ?, ?, ?, ?)",
            edge.table()
        ))
        .bind(id)
        .bind(uri)
        .bind(account_id)
        .bind(target_account_id)
        .bind(created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| map_unique(e, edge.label()))?;

        Ok(())
    }

    async fn get_edge(
        &self,
        edge: Edge,
        account_id: &str,
        target_account_id: &str,
    ) -> CourierResult<Option<EdgeRow>> {
        let row = sqlx::query(&format!(
            "SELECT id, uri, account_id, target_account_id, created_at FROM {} \
             WHERE account_id = ? AND target_account_id = ?",
            edge.table()
        ))
        .bind(account_id)
        .bind(target_account_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(edge_from_row).transpose()
    }

    async fn delete_edge(
        &self,
        edge: Edge,
        account_id: &str,
        target_account_id: &str,
    ) -> CourierResult<bool> {
        let result = sqlx::query(&format!(
            "DELETE FROM {} WHERE account_id = ? AND target_account_id = ?",
            edge.table()
        ))
        .bind(account_id)
        .bind(target_account_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn edges_where(&self, edge: Edge, column: &str, value: &str) -> CourierResult<Vec<EdgeRow>> {
        let rows = sqlx::query(&format!(
            "SELECT id, uri, account_id, target_account_id, created_at FROM {} WHERE {} = ? \
             ORDER BY rowid ASC",
            edge.table(),
            column
        ))
        .bind(value)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(edge_from_row).collect()
    }

    // ========== Follows ==========

    pub async fn insert_follow(&self, follow: &Follow) -> CourierResult<()> {
        self.insert_edge(
            Edge::Follow,
            &follow.id,
            &follow.uri,
            &follow.account_id,
            &follow.target_account_id,
            follow.created_at,
        )
        .await
    }

    pub async fn get_follow(&self, account_id: &str, target_account_id: &str) -> CourierResult<Option<Follow>> {
        Ok(self
            .get_edge(Edge::Follow, account_id, target_account_id)
            .await?
            .map(Follow::from))
    }

    pub async fn delete_follow(&self, account_id: &str, target_account_id: &str) -> CourierResult<bool> {
        self.delete_edge(Edge::Follow, account_id, target_account_id).await
    }

    /// Follows pointing at the account
    pub async fn followers_of(&self, account_id: &str) -> CourierResult<Vec<Follow>> {
        Ok(self
            .edges_where(Edge::Follow, "target_account_id", account_id)
            .await?
            .into_iter()
            .map(Follow::from)
            .collect())
    }

    /// Follows made by the account
    pub async fn following_of(&self, account_id: &str) -> CourierResult<Vec<Follow>> {
        Ok(self
            .edges_where(Edge::Follow, "account_id", account_id)
            .await?
            .into_iter()
            .map(Follow::from)
            .collect())
    }

    // ========== Follow requests ==========

    pub async fn insert_follow_request(&self, request: &FollowRequest) -> CourierResult<()> {
        self.insert_edge(
            Edge::FollowRequest,
            &request.id,
            &request.uri,
            &request.account_id,
            &request.target_account_id,
            request.created_at,
        )
        .await
    }

    pub async fn get_follow_request(
        &self,
        account_id: &str,
        target_account_id: &str,
    ) -> CourierResult<Option<FollowRequest>> {
        Ok(self
            .get_edge(Edge::FollowRequest, account_id, target_account_id)
            .await?
            .map(FollowRequest::from))
    }

    pub async fn delete_follow_request(&self, account_id: &str, target_account_id: &str) -> CourierResult<bool> {
        self.delete_edge(Edge::FollowRequest, account_id, target_account_id).await
    }

    // ========== Blocks ==========

    pub async fn insert_block(&self, block: &Block) -> CourierResult<()> {
        self.insert_edge(
            Edge::Block,
            &block.id,
            &block.uri,
            &block.account_id,
            &block.target_account_id,
            block.created_at,
        )
        .await
    }

    pub async fn get_block(&self, account_id: &str, target_account_id: &str) -> CourierResult<Option<Block>> {
        Ok(self
            .get_edge(Edge::Block, account_id, target_account_id)
            .await?
            .map(Block::from))
    }

    pub async fn delete_block(&self, account_id: &str, target_account_id: &str) -> CourierResult<bool> {
        self.delete_edge(Edge::Block, account_id, target_account_id).await
    }

    /// Whether either account blocks the other
    pub async fn is_either_blocked(&self, a: &str, b: &str) -> CourierResult<bool> {
        let row = sqlx::query(
            r#"
            SELECT 1 FROM blocks
            WHERE (account_id = ? AND target_account_id = ?)
               OR (account_id = ? AND target_account_id = ?)
            LIMIT 1
            "#,
        )
        .bind(a)
        .bind(b)
        .bind(b)
        .bind(a)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.is_some())
    }

    /// Delete follows, follow requests, blocks and mutes touching the account
    pub async fn delete_relationships_of(&self, account_id: &str) -> CourierResult<u64> {
        let mut deleted = self.delete_mutes_of(account_id).await?;
        for edge in [Edge::Follow, Edge::FollowRequest, Edge::Block] {
            let result = sqlx::query(&format!(
                "DELETE FROM {} WHERE account_id = ? OR target_account_id = ?",
                edge.table()
            ))
            .bind(account_id)
            .bind(account_id)
            .execute(&self.pool)
            .await?;
            deleted += result.rows_affected();
        }
        Ok(deleted)
    }

    // ========== Faves ==========

    pub async fn insert_fave(&self, fave: &Fave) -> CourierResult<()> {
        sqlx::query(
            r#"
            INSERT INTO status_faves (id, uri, account_id, target_account_id, status_id, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&fave.id)
        .bind(&fave.uri)
        .bind(&fave.account_id)
        .bind(&fave.target_account_id)
        .bind(&fave.status_id)
        .bind(fave.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| map_unique(e, "fave"))?;

        Ok(())
    }

    pub async fn faves_of_status(&self, status_id: &str) -> CourierResult<Vec<Fave>> {
        let rows = sqlx::query(
            r#"
            SELECT id, uri, account_id, target_account_id, status_id, created_at
            FROM status_faves WHERE status_id = ?
            "#,
        )
        .bind(status_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(fave_from_row).collect()
    }

    pub async fn delete_fave(&self, account_id: &str, status_id: &str) -> CourierResult<bool> {
        let result = sqlx::query("DELETE FROM status_faves WHERE account_id = ? AND status_id = ?")
            .bind(account_id)
            .bind(status_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Faves made by or targeting the account
    pub async fn delete_faves_of(&self, account_id: &str) -> CourierResult<u64> {
        let result = sqlx::query(
            "DELETE FROM status_faves WHERE account_id = ? OR target_account_id = ?",
        )
        .bind(account_id)
        .bind(account_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    pub async fn delete_faves_of_status(&self, status_id: &str) -> CourierResult<u64> {
        let result = sqlx::query("DELETE FROM status_faves WHERE status_id = ?")
            .bind(status_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    // ========== Bookmarks ==========

    pub async fn insert_bookmark(&self, bookmark: &Bookmark) -> CourierResult<()> {
        sqlx::query(
            "INSERT INTO bookmarks (id, account_id, status_id, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(&bookmark.id)
        .bind(&bookmark.account_id)
        .bind(&bookmark.status_id)
        .bind(bookmark.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| map_unique(e, "bookmark"))?;

        Ok(())
    }

    /// Accounts that bookmarked the status
    pub async fn bookmarkers_of(&self, status_id: &str) -> CourierResult<Vec<String>> {
        let rows = sqlx::query("SELECT account_id FROM bookmarks WHERE status_id = ?")
            .bind(status_id)
            .fetch_all(&self.pool)
            .await?;

        rows.iter()
            .map(|row| row.try_get::<String, _>("account_id").map_err(Into::into))
            .collect()
    }

    pub async fn delete_bookmarks_of(&self, account_id: &str) -> CourierResult<u64> {
        let result = sqlx::query("DELETE FROM bookmarks WHERE account_id = ?")
            .bind(account_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    pub async fn delete_bookmarks_of_status(&self, status_id: &str) -> CourierResult<u64> {
        let result = sqlx::query("DELETE FROM bookmarks WHERE status_id = ?")
            .bind(status_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}
