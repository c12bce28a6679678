/// Interaction policies controlling who may like, reply to or boost a status
use serde::{Deserialize, Serialize};

/// Who a rule applies to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyValue {
    Public,
    Followers,
    Following,
    Mentioned,
    Author,
    Me,
    /// A specific account URI
    Uri(String),
}

/// Accounts that may interact outright, and those that need approval
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyRules {
    pub always: Vec<PolicyValue>,
    pub with_approval: Vec<PolicyValue>,
}

impl PolicyRules {
    fn open() -> Self {
        Self {
            always: vec![PolicyValue::Public, PolicyValue::Me],
            with_approval: Vec::new(),
        }
    }

    fn author_only() -> Self {
        Self {
            always: vec![PolicyValue::Author, PolicyValue::Me],
            with_approval: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InteractionPolicy {
    pub can_like: PolicyRules,
    pub can_reply: PolicyRules,
    pub can_announce: PolicyRules,
}

impl InteractionPolicy {
    /// Policy applied to public and unlisted statuses when the account set none
    pub fn default_open() -> Self {
        Self {
            can_like: PolicyRules::open(),
            can_reply: PolicyRules::open(),
            can_announce: PolicyRules::open(),
        }
    }

    /// Policy for followers-only and direct statuses: nobody but the author may boost
    pub fn default_restricted() -> Self {
        Self {
            can_like: PolicyRules::open(),
            can_reply: PolicyRules::open(),
            can_announce: PolicyRules::author_only(),
        }
    }

    /// The author must always be allowed to interact with their own status
    pub fn includes_author(&self) -> bool {
        [&self.can_like, &self.can_reply, &self.can_announce]
            .iter()
            .all(|rules| {
                rules
                    .always
                    .iter()
                    .any(|v| matches!(v, PolicyValue::Author | PolicyValue::Me))
            })
    }
}

/// Per-visibility defaults stored on the account; `None` means instance default
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefaultInteractionPolicies {
    pub public: Option<InteractionPolicy>,
    pub unlisted: Option<InteractionPolicy>,
    pub followers_only: Option<InteractionPolicy>,
    pub direct: Option<InteractionPolicy>,
}

impl DefaultInteractionPolicies {
    /// Overlay the policies set in `update` onto `self`, returning whether anything changed
    pub fn merge(&mut self, update: DefaultInteractionPolicies) -> bool {
        let mut changed = false;
        let slots = [
            (&mut self.public, update.public),
            (&mut self.unlisted, update.unlisted),
            (&mut self.followers_only, update.followers_only),
            (&mut self.direct, update.direct),
        ];
        for (slot, incoming) in slots {
            if let Some(policy) = incoming {
                if slot.as_ref() != Some(&policy) {
                    *slot = Some(policy);
                    changed = true;
                }
            }
        }
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_reports_change_only_for_new_values() {
        let mut current = DefaultInteractionPolicies::default();
        let update = DefaultInteractionPolicies {
            public: Some(InteractionPolicy::default_restricted()),
            ..Default::default()
        };

        assert!(current.merge(update.clone()));
        assert!(!current.merge(update));
        assert_eq!(current.public, Some(InteractionPolicy::default_restricted()));
        assert!(current.unlisted.is_none());
    }

    #[test]
    fn test_default_policies_include_author() {
        assert!(InteractionPolicy::default_open().includes_author());
        assert!(InteractionPolicy::default_restricted().includes_author());
    }
}
