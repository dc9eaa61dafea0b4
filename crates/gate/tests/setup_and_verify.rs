//! Drives the dispatcher through a full administrator setup and a visitor
//! unlocking the reward channels.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::{
    collections::HashSet,
    sync::{Arc, Mutex},
};

use {
    async_trait::async_trait,
    joingate_gate::{
        ApprovalRegistry, ChatRecord, ConfigStore, Dispatcher, Inbound, MemberStatus,
        MembershipProbe, MessageHandle, Reply, Sender, SetupWizard, SqliteStore, UserId,
        VerificationGate, VerificationOutcome,
    },
    sqlx::sqlite::SqlitePoolOptions,
};

const SUPER: UserId = UserId(1);
const ADMIN: UserId = UserId(42);
const VISITOR: UserId = UserId(900);

/// Membership is the set of `(chat_id, user)` pairs that have joined.
#[derive(Default)]
struct Memberships {
    joined: Mutex<HashSet<(String, i64)>>,
}

impl Memberships {
    fn join(&self, chat_id: &str, user: UserId) {
        self.joined
            .lock()
            .unwrap()
            .insert((chat_id.to_string(), user.0));
    }
}

#[async_trait]
impl MembershipProbe for Memberships {
    async fn status(&self, chat_id: &str, user: UserId) -> anyhow::Result<MemberStatus> {
        let joined = self
            .joined
            .lock()
            .unwrap()
            .contains(&(chat_id.to_string(), user.0));
        Ok(if joined {
            MemberStatus::Member
        } else {
            MemberStatus::Left
        })
    }
}

async fn build() -> (Dispatcher, Arc<SqliteStore>, Arc<Memberships>) {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    joingate_gate::run_migrations(&pool).await.unwrap();
    let store = Arc::new(SqliteStore::new(pool));
    let probe = Arc::new(Memberships::default());
    let dispatcher = Dispatcher::new(
        ApprovalRegistry::new(store.clone(), SUPER),
        SetupWizard::new(store.clone()),
        VerificationGate::new(store.clone(), probe.clone()),
    );
    (dispatcher, store, probe)
}

async fn say(dispatcher: &Dispatcher, from: UserId, text: &str) -> Vec<Reply> {
    dispatcher
        .handle(Inbound::message(Sender::new(from), from.0, text))
        .await
}

#[tokio::test]
async fn admin_setup_then_visitor_unlocks() {
    let (dispatcher, store, probe) = build().await;

    say(&dispatcher, ADMIN, "/request").await;
    say(&dispatcher, SUPER, "/approve 42").await;

    for line in [
        "/setup",
        "1",
        "-1001 https://t.me/g1",
        "1",
        "-1002 https://t.me/c1",
    ] {
        assert_eq!(say(&dispatcher, ADMIN, line).await.len(), 1, "{line}");
    }
    assert!(dispatcher.wizard().phase(ADMIN).is_none());

    // Setup writes the first batch as channels, the second as groups.
    assert_eq!(store.list_channels(ADMIN).await.unwrap(), vec![
        ChatRecord::new("-1001", "https://t.me/g1")
    ]);
    assert_eq!(store.list_groups(ADMIN).await.unwrap(), vec![
        ChatRecord::new("-1002", "https://t.me/c1")
    ]);

    assert_eq!(
        dispatcher.gate().check(ADMIN, VISITOR).await.unwrap(),
        VerificationOutcome::Blocked {
            unsatisfied: vec![ChatRecord::new("-1002", "https://t.me/c1")]
        }
    );

    let replies = say(&dispatcher, VISITOR, "/start admin_42").await;
    assert!(matches!(&replies[..], [Reply::Send { keyboard: Some(_), .. }]));

    probe.join("-1002", VISITOR);
    let replies = dispatcher
        .handle(Inbound::callback(
            Sender::new(VISITOR),
            VISITOR.0,
            "cb",
            Some(MessageHandle {
                chat_id: VISITOR.0,
                message_id: 3,
            }),
            "check_42",
        ))
        .await;
    assert!(matches!(
        replies.last(),
        Some(Reply::Edit { text, keyboard: None, .. }) if text.contains("https://t.me/g1")
    ));
}

#[tokio::test]
async fn gate_groups_block_until_joined() {
    let (dispatcher, store, probe) = build().await;
    store
        .upsert_group(ADMIN, &ChatRecord::new("-1001", "https://t.me/g1"))
        .await
        .unwrap();
    store
        .upsert_channel(ADMIN, &ChatRecord::new("-1002", "https://t.me/c1"))
        .await
        .unwrap();

    let blocked = dispatcher.gate().check(ADMIN, VISITOR).await.unwrap();
    assert_eq!(blocked, VerificationOutcome::Blocked {
        unsatisfied: vec![ChatRecord::new("-1001", "https://t.me/g1")]
    });
    assert_eq!(dispatcher.gate().check(ADMIN, VISITOR).await.unwrap(), blocked);

    probe.join("-1001", VISITOR);
    assert_eq!(
        dispatcher.gate().check(ADMIN, VISITOR).await.unwrap(),
        VerificationOutcome::Verified {
            reward_links: vec!["https://t.me/c1".into()]
        }
    );
}
