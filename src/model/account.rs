/// Account model
use super::policy::DefaultInteractionPolicies;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A local or remote actor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: String,
    /// Canonical ActivityPub id; used as the resource lock key
    pub uri: String,
    pub username: String,
    /// None for accounts on this instance
    pub domain: Option<String>,
    pub display_name: String,
    /// Default posting language
    pub language: Option<String>,
    /// Follows need approval
    pub locked: bool,
    pub statuses_count: i64,
    pub pinned_count: i64,
    pub last_status_at: Option<DateTime<Utc>>,
    pub interaction_policies: DefaultInteractionPolicies,
    pub moved_to_uri: Option<String>,
    pub also_known_as: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub suspended_at: Option<DateTime<Utc>>,
}

impl Account {
    /// Build a new local account under the given instance base URL
    pub fn new_local(base_url: &str, username: &str) -> Self {
        Self {
            id: super::new_id(),
            uri: format!("{}/users/{}", base_url, username),
            username: username.to_string(),
            domain: None,
            display_name: username.to_string(),
            language: None,
            locked: false,
            statuses_count: 0,
            pinned_count: 0,
            last_status_at: None,
            interaction_policies: DefaultInteractionPolicies::default(),
            moved_to_uri: None,
            also_known_as: Vec::new(),
            created_at: Utc::now(),
            suspended_at: None,
        }
    }

    /// Build a remote account as it would be stored after dereferencing
    pub fn new_remote(uri: &str, username: &str, domain: &str) -> Self {
        Self {
            domain: Some(domain.to_string()),
            uri: uri.to_string(),
            ..Self::new_local("", username)
        }
    }

    pub fn is_local(&self) -> bool {
        self.domain.is_none()
    }

    pub fn is_remote(&self) -> bool {
        self.domain.is_some()
    }

    pub fn is_suspended(&self) -> bool {
        self.suspended_at.is_some()
    }

    /// `user` for local accounts, `user@domain` for remote ones
    pub fn acct(&self) -> String {
        match &self.domain {
            Some(domain) => format!("{}@{}", self.username, domain),
            None => self.username.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_and_remote_accounts() {
        let local = Account::new_local("https://example.org", "alice");
        assert!(local.is_local());
        assert_eq!(local.uri, "https://example.org/users/alice");
        assert_eq!(local.acct(), "alice");

        let remote = Account::new_remote("https://remote.net/users/bob", "bob", "remote.net");
        assert!(remote.is_remote());
        assert_eq!(remote.acct(), "bob@remote.net");
        assert_ne!(local.id, remote.id);
    }
}
