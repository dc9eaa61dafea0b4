//! Membership verification gate.
//!
//! Stateless: every check reads the administrator's configuration and asks
//! the platform for live membership, so repeated checks with unchanged
//! inputs give identical outcomes.

use std::sync::Arc;

use {
    async_trait::async_trait,
    futures::future::join_all,
    serde::Serialize,
    tracing::{debug, info, warn},
};

use crate::{
    Result,
    store::ConfigStore,
    types::{ChatRecord, MemberStatus, UserId},
};

/// Live membership lookup, provided by the transport.
#[async_trait]
pub trait MembershipProbe: Send + Sync {
    /// Membership status of `user` in the chat identified by `chat_id`.
    async fn status(&self, chat_id: &str, user: UserId) -> anyhow::Result<MemberStatus>;
}

/// Result of a single verification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum VerificationOutcome {
    /// The administrator has no groups or no channels configured.
    NotConfigured,
    /// Gate groups the user has not joined, in configured order.
    Blocked { unsatisfied: Vec<ChatRecord> },
    /// Every gate group is joined; reward links in configured order.
    Verified { reward_links: Vec<String> },
}

pub struct VerificationGate {
    store: Arc<dyn ConfigStore>,
    probe: Arc<dyn MembershipProbe>,
}

impl VerificationGate {
    pub fn new(store: Arc<dyn ConfigStore>, probe: Arc<dyn MembershipProbe>) -> Self {
        Self { store, probe }
    }

    /// Evaluate `user` against `admin`'s gate groups.
    pub async fn check(&self, admin: UserId, user: UserId) -> Result<VerificationOutcome> {
        let groups = self.store.list_groups(admin).await?;
        let channels = self.store.list_channels(admin).await?;

        if groups.is_empty() || channels.is_empty() {
            debug!(admin_id = admin.0, user_id = user.0, "gate not configured");
            return Ok(VerificationOutcome::NotConfigured);
        }

        let statuses = join_all(groups.iter().map(|g| self.joined(g, user))).await;
        let unsatisfied: Vec<ChatRecord> = groups
            .into_iter()
            .zip(statuses)
            .filter_map(|(group, joined)| (!joined).then_some(group))
            .collect();

        let outcome = if unsatisfied.is_empty() {
            VerificationOutcome::Verified {
                reward_links: channels.into_iter().map(|c| c.link).collect(),
            }
        } else {
            VerificationOutcome::Blocked { unsatisfied }
        };

        info!(
            admin_id = admin.0,
            user_id = user.0,
            verified = matches!(outcome, VerificationOutcome::Verified { .. }),
            "membership checked"
        );
        Ok(outcome)
    }

    /// Fail-closed: a probe error counts as not joined.
    async fn joined(&self, group: &ChatRecord, user: UserId) -> bool {
        match self.probe.status(&group.chat_id, user).await {
            Ok(status) => status.is_joined(),
            Err(e) => {
                warn!(
                    chat_id = %group.chat_id,
                    user_id = user.0,
                    error = %e,
                    "membership query failed, treating as not joined"
                );
                false
            },
        }
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod tests {
    use std::{
        collections::HashMap,
        sync::{
            Mutex,
            atomic::{AtomicUsize, Ordering},
        },
    };

    use {super::*, crate::memory::MemoryStore};

    /// Scripted membership: `(chat_id, user)` → status, or an error when
    /// the chat is marked failing. Missing entries are `Left`.
    #[derive(Default)]
    pub(crate) struct ScriptedProbe {
        statuses: Mutex<HashMap<(String, UserId), MemberStatus>>,
        failing: Mutex<Vec<String>>,
        pub calls: AtomicUsize,
    }

    impl ScriptedProbe {
        pub fn set(&self, chat_id: &str, user: UserId, status: MemberStatus) {
            self.statuses
                .lock()
                .unwrap()
                .insert((chat_id.to_string(), user), status);
        }

        pub fn fail(&self, chat_id: &str) {
            self.failing.lock().unwrap().push(chat_id.to_string());
        }
    }

    #[async_trait]
    impl MembershipProbe for ScriptedProbe {
        async fn status(&self, chat_id: &str, user: UserId) -> anyhow::Result<MemberStatus> {
            self.calls.fetch_add(1, Ordering::Relaxed);
            if self.failing.lock().unwrap().iter().any(|c| c == chat_id) {
                anyhow::bail!("chat not found");
            }
            Ok(self
                .statuses
                .lock()
                .unwrap()
                .get(&(chat_id.to_string(), user))
                .copied()
                .unwrap_or(MemberStatus::Left))
        }
    }

    const ADMIN: UserId = UserId(42);
    const USER: UserId = UserId(777);

    async fn configured() -> (VerificationGate, Arc<ScriptedProbe>) {
        let store = Arc::new(MemoryStore::new());
        store
            .upsert_group(ADMIN, &ChatRecord::new("-1001", "https://t.me/g1"))
            .await
            .unwrap();
        store
            .upsert_group(ADMIN, &ChatRecord::new("-1004", "https://t.me/g2"))
            .await
            .unwrap();
        store
            .upsert_channel(ADMIN, &ChatRecord::new("-1002", "https://t.me/c1"))
            .await
            .unwrap();
        let probe = Arc::new(ScriptedProbe::default());
        (VerificationGate::new(store, probe.clone()), probe)
    }

    #[tokio::test]
    async fn not_configured_issues_no_queries() {
        let store = Arc::new(MemoryStore::new());
        store
            .upsert_group(ADMIN, &ChatRecord::new("-1001", "https://t.me/g1"))
            .await
            .unwrap();
        let probe = Arc::new(ScriptedProbe::default());
        let gate = VerificationGate::new(store, probe.clone());

        assert_eq!(
            gate.check(ADMIN, USER).await.unwrap(),
            VerificationOutcome::NotConfigured
        );
        assert_eq!(
            gate.check(UserId(1), USER).await.unwrap(),
            VerificationOutcome::NotConfigured
        );
        assert_eq!(probe.calls.load(Ordering::Relaxed), 0);
    }

    #[tokio::test]
    async fn blocked_lists_unsatisfied_groups_in_order() {
        let (gate, probe) = configured().await;
        probe.set("-1004", USER, MemberStatus::Member);

        assert_eq!(
            gate.check(ADMIN, USER).await.unwrap(),
            VerificationOutcome::Blocked {
                unsatisfied: vec![ChatRecord::new("-1001", "https://t.me/g1")]
            }
        );
    }

    #[tokio::test]
    async fn repeated_checks_are_identical() {
        let (gate, probe) = configured().await;
        probe.set("-1001", USER, MemberStatus::Kicked);

        let first = gate.check(ADMIN, USER).await.unwrap();
        let second = gate.check(ADMIN, USER).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn joining_remaining_groups_unlocks() {
        let (gate, probe) = configured().await;
        assert!(matches!(
            gate.check(ADMIN, USER).await.unwrap(),
            VerificationOutcome::Blocked { ref unsatisfied } if unsatisfied.len() == 2
        ));

        probe.set("-1001", USER, MemberStatus::Administrator);
        probe.set("-1004", USER, MemberStatus::Owner);
        assert_eq!(
            gate.check(ADMIN, USER).await.unwrap(),
            VerificationOutcome::Verified {
                reward_links: vec!["https://t.me/c1".into()]
            }
        );
    }

    #[tokio::test]
    async fn probe_failure_is_fail_closed() {
        let (gate, probe) = configured().await;
        probe.set("-1001", USER, MemberStatus::Member);
        probe.set("-1004", USER, MemberStatus::Member);
        probe.fail("-1004");

        assert_eq!(
            gate.check(ADMIN, USER).await.unwrap(),
            VerificationOutcome::Blocked {
                unsatisfied: vec![ChatRecord::new("-1004", "https://t.me/g2")]
            }
        );
    }

    #[tokio::test]
    async fn restricted_member_is_not_joined() {
        let (gate, probe) = configured().await;
        probe.set("-1001", USER, MemberStatus::Restricted);
        probe.set("-1004", USER, MemberStatus::Member);

        assert!(matches!(
            gate.check(ADMIN, USER).await.unwrap(),
            VerificationOutcome::Blocked { .. }
        ));
    }
}
