use async_trait::async_trait;

use crate::{
    Result,
    types::{ChatRecord, RecordKind, UserId},
};

/// Persistent approval flags, one row per identity.
#[async_trait]
pub trait ApprovalStore: Send + Sync {
    /// Insert a pending (unapproved) record. Must leave an existing record,
    /// approved or not, untouched.
    async fn insert_pending(&self, admin: UserId, username: Option<&str>) -> Result<()>;

    /// Set the approval flag, creating the record if absent.
    async fn set_approved(&self, admin: UserId) -> Result<()>;

    /// `true` iff a record exists and is approved.
    async fn is_approved(&self, admin: UserId) -> Result<bool>;
}

/// Per-administrator ordered lists of reward channels and gate groups.
///
/// Records are keyed on `(admin, chat_id)`: upserting an id that already
/// exists replaces its link and keeps its position.
#[async_trait]
pub trait ConfigStore: Send + Sync {
    async fn upsert_channel(&self, admin: UserId, record: &ChatRecord) -> Result<()>;
    async fn upsert_group(&self, admin: UserId, record: &ChatRecord) -> Result<()>;
    async fn list_channels(&self, admin: UserId) -> Result<Vec<ChatRecord>>;
    async fn list_groups(&self, admin: UserId) -> Result<Vec<ChatRecord>>;

    async fn upsert(&self, admin: UserId, kind: RecordKind, record: &ChatRecord) -> Result<()> {
        match kind {
            RecordKind::Channel => self.upsert_channel(admin, record).await,
            RecordKind::Group => self.upsert_group(admin, record).await,
        }
    }

    async fn list(&self, admin: UserId, kind: RecordKind) -> Result<Vec<ChatRecord>> {
        match kind {
            RecordKind::Channel => self.list_channels(admin).await,
            RecordKind::Group => self.list_groups(admin).await,
        }
    }
}
