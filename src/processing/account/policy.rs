/// Default interaction policies
use super::AccountProcessor;
use crate::error::{CourierError, CourierResult};
use crate::model::{Account, DefaultInteractionPolicies};
use tracing::debug;

impl AccountProcessor {
    /// Overlay the policies set in `update` onto the account's defaults
    ///
    /// Slots left `None` keep their current value. The read, merge and
    /// write happen under the account lock so concurrent updates of
    /// different slots both land.
    pub async fn update_interaction_policies(
        &self,
        requester: &Account,
        update: DefaultInteractionPolicies,
    ) -> CourierResult<DefaultInteractionPolicies> {
        let slots = [
            ("public", &update.public),
            ("unlisted", &update.unlisted),
            ("followers_only", &update.followers_only),
            ("direct", &update.direct),
        ];
        for (name, policy) in slots {
            if policy.as_ref().is_some_and(|p| !p.includes_author()) {
                return Err(CourierError::Validation(format!(
                    "{} policy must always allow the author",
                    name
                )));
            }
        }

        let _guard = self.ctx.locks.lock(&requester.uri).await;

        let mut account = self.get_account(&requester.id).await?;
        if account.interaction_policies.merge(update) {
            self.ctx.db.update_account(&account).await?;
            debug!(account = %account.id, "Default interaction policies updated");
        }

        Ok(account.interaction_policies)
    }
}
