/// Thread context of a status: what it replies to and what replies to it
use super::StatusProcessor;
use crate::error::CourierResult;
use crate::model::{Account, Status};
use crate::thread::sort_thread;
use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ThreadContext {
    /// Root first, ending with the direct parent
    pub ancestors: Vec<Status>,
    /// Parents before children, the author's own continuations first
    pub descendants: Vec<Status>,
}

impl StatusProcessor {
    pub async fn thread_context(
        &self,
        requester: Option<&Account>,
        status_id: &str,
    ) -> CourierResult<ThreadContext> {
        let target = self.get_visible_status(requester, status_id).await?;

        let mut seen: HashSet<String> = HashSet::from([target.id.clone()]);

        let mut ancestors = Vec::new();
        let mut parent_id = target.in_reply_to_id.clone();
        while let Some(id) = parent_id {
            if !seen.insert(id.clone()) {
                break;
            }
            let Some(parent) = self.ctx.db.get_status(&id).await? else {
                break;
            };
            parent_id = parent.in_reply_to_id.clone();
            if self.ctx.visibility.is_visible(requester, &parent).await? {
                ancestors.push(parent);
            }
        }
        ancestors.reverse();

        let mut descendants = Vec::new();
        let mut queue = VecDeque::from([target.id.clone()]);
        while let Some(id) = queue.pop_front() {
            for reply in self.ctx.db.replies_to(&id).await? {
                if !seen.insert(reply.id.clone()) {
                    continue;
                }
                queue.push_back(reply.id.clone());
                if self.ctx.visibility.is_visible(requester, &reply).await? {
                    descendants.push(reply);
                }
            }
        }

        Ok(ThreadContext {
            ancestors,
            descendants: sort_thread(descendants, Some(&target.account_id)),
        })
    }
}
