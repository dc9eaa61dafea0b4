//! In-memory store backing tests and throwaway runs.

use std::{
    collections::HashMap,
    sync::{Mutex, MutexGuard},
};

use async_trait::async_trait;

use crate::{
    Result,
    store::{ApprovalStore, ConfigStore},
    types::{ChatRecord, RecordKind, UserId},
};

#[derive(Default)]
struct Tables {
    approvals: HashMap<UserId, bool>,
    records: HashMap<(UserId, RecordKind), Vec<ChatRecord>>,
}

/// Keyed-map implementation of [`ApprovalStore`] and [`ConfigStore`].
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn upsert_record(&self, admin: UserId, kind: RecordKind, record: &ChatRecord) {
        let mut tables = self.tables();
        let rows = tables.records.entry((admin, kind)).or_default();
        match rows.iter_mut().find(|r| r.chat_id == record.chat_id) {
            Some(existing) => existing.link.clone_from(&record.link),
            None => rows.push(record.clone()),
        }
    }

    fn list_records(&self, admin: UserId, kind: RecordKind) -> Vec<ChatRecord> {
        self.tables()
            .records
            .get(&(admin, kind))
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl ApprovalStore for MemoryStore {
    async fn insert_pending(&self, admin: UserId, _username: Option<&str>) -> Result<()> {
        self.tables().approvals.entry(admin).or_insert(false);
        Ok(())
    }

    async fn set_approved(&self, admin: UserId) -> Result<()> {
        self.tables().approvals.insert(admin, true);
        Ok(())
    }

    async fn is_approved(&self, admin: UserId) -> Result<bool> {
        Ok(self.tables().approvals.get(&admin).copied().unwrap_or(false))
    }
}

#[async_trait]
impl ConfigStore for MemoryStore {
    async fn upsert_channel(&self, admin: UserId, record: &ChatRecord) -> Result<()> {
        self.upsert_record(admin, RecordKind::Channel, record);
        Ok(())
    }

    async fn upsert_group(&self, admin: UserId, record: &ChatRecord) -> Result<()> {
        self.upsert_record(admin, RecordKind::Group, record);
        Ok(())
    }

    async fn list_channels(&self, admin: UserId) -> Result<Vec<ChatRecord>> {
        Ok(self.list_records(admin, RecordKind::Channel))
    }

    async fn list_groups(&self, admin: UserId) -> Result<Vec<ChatRecord>> {
        Ok(self.list_records(admin, RecordKind::Group))
    }
}
