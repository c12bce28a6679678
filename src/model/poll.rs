/// Poll models
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Poll embedded in a status
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Poll {
    pub id: String,
    pub status_id: String,
    pub options: Vec<String>,
    pub multiple: bool,
    pub hide_counts: bool,
    pub expires_at: Option<DateTime<Utc>>,
    pub closed_at: Option<DateTime<Utc>>,
    /// Vote count per option, same length as `options`
    pub votes: Vec<i64>,
    /// Number of distinct accounts that voted
    pub voters: i64,
    pub created_at: DateTime<Utc>,
}

impl Poll {
    pub fn new(
        status_id: &str,
        options: Vec<String>,
        multiple: bool,
        hide_counts: bool,
        expires_at: Option<DateTime<Utc>>,
    ) -> Self {
        let votes = vec![0; options.len()];
        Self {
            id: super::new_id(),
            status_id: status_id.to_string(),
            options,
            multiple,
            hide_counts,
            expires_at,
            closed_at: None,
            votes,
            voters: 0,
            created_at: Utc::now(),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed_at.is_some()
    }

    /// Expiry has passed, whether or not the close task ran yet
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map(|at| at <= now).unwrap_or(false)
    }

    /// Whether vote counts may be shown to non-voters
    pub fn counts_visible(&self) -> bool {
        !self.hide_counts || self.is_closed()
    }

    /// Apply one account's choices to the tallies
    pub fn increment_votes(&mut self, choices: &[usize]) {
        for &choice in choices {
            if let Some(count) = self.votes.get_mut(choice) {
                *count += 1;
            }
        }
        self.voters += 1;
    }

    pub fn decrement_votes(&mut self, choices: &[usize]) {
        for &choice in choices {
            if let Some(count) = self.votes.get_mut(choice) {
                *count = (*count - 1).max(0);
            }
        }
        self.voters = (self.voters - 1).max(0);
    }
}

/// One account's vote on a poll
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PollVote {
    pub id: String,
    pub poll_id: String,
    pub account_id: String,
    pub choices: Vec<usize>,
    pub created_at: DateTime<Utc>,
}
