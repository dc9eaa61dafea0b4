use std::time::{SystemTime, UNIX_EPOCH};

use {async_trait::async_trait, sqlx::SqlitePool, tracing::debug};

use crate::{
    Result,
    store::{ApprovalStore, ConfigStore},
    types::{ChatRecord, RecordKind, UserId},
};

/// Internal row type for sqlx mapping.
#[derive(sqlx::FromRow)]
struct RecordRow {
    chat_id: String,
    link: String,
}

impl From<RecordRow> for ChatRecord {
    fn from(r: RecordRow) -> Self {
        Self {
            chat_id: r.chat_id,
            link: r.link,
        }
    }
}

struct RecordSql {
    upsert: &'static str,
    list: &'static str,
}

const CHANNEL_SQL: RecordSql = RecordSql {
    upsert: r#"INSERT INTO channels (admin_id, channel_id, channel_link)
               VALUES (?, ?, ?)
               ON CONFLICT(admin_id, channel_id) DO UPDATE SET
                 channel_link = excluded.channel_link"#,
    list: "SELECT channel_id AS chat_id, channel_link AS link FROM channels \
           WHERE admin_id = ? ORDER BY id",
};

const GROUP_SQL: RecordSql = RecordSql {
    upsert: r#"INSERT INTO "groups" (admin_id, group_id, group_link)
               VALUES (?, ?, ?)
               ON CONFLICT(admin_id, group_id) DO UPDATE SET
                 group_link = excluded.group_link"#,
    list: r#"SELECT group_id AS chat_id, group_link AS link FROM "groups"
             WHERE admin_id = ? ORDER BY id"#,
};

fn sql_for(kind: RecordKind) -> &'static RecordSql {
    match kind {
        RecordKind::Channel => &CHANNEL_SQL,
        RecordKind::Group => &GROUP_SQL,
    }
}

fn now_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}

/// SQLite-backed approval and configuration store.
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn upsert_record(
        &self,
        admin: UserId,
        kind: RecordKind,
        record: &ChatRecord,
    ) -> Result<()> {
        sqlx::query(sql_for(kind).upsert)
            .bind(admin.0)
            .bind(&record.chat_id)
            .bind(&record.link)
            .execute(&self.pool)
            .await?;
        debug!(admin_id = admin.0, %kind, chat_id = %record.chat_id, "record upserted");
        Ok(())
    }

    async fn list_records(&self, admin: UserId, kind: RecordKind) -> Result<Vec<ChatRecord>> {
        let rows = sqlx::query_as::<_, RecordRow>(sql_for(kind).list)
            .bind(admin.0)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }
}

#[async_trait]
impl ApprovalStore for SqliteStore {
    async fn insert_pending(&self, admin: UserId, username: Option<&str>) -> Result<()> {
        sqlx::query(
            r#"INSERT INTO approvals (admin_id, approved, username, requested_at)
               VALUES (?, 0, ?, ?)
               ON CONFLICT(admin_id) DO NOTHING"#,
        )
        .bind(admin.0)
        .bind(username)
        .bind(now_secs())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn set_approved(&self, admin: UserId) -> Result<()> {
        sqlx::query(
            r#"INSERT INTO approvals (admin_id, approved)
               VALUES (?, 1)
               ON CONFLICT(admin_id) DO UPDATE SET approved = 1"#,
        )
        .bind(admin.0)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn is_approved(&self, admin: UserId) -> Result<bool> {
        let approved =
            sqlx::query_scalar::<_, i64>("SELECT approved FROM approvals WHERE admin_id = ?")
                .bind(admin.0)
                .fetch_optional(&self.pool)
                .await?;
        Ok(approved == Some(1))
    }
}

#[async_trait]
impl ConfigStore for SqliteStore {
    async fn upsert_channel(&self, admin: UserId, record: &ChatRecord) -> Result<()> {
        self.upsert_record(admin, RecordKind::Channel, record).await
    }

    async fn upsert_group(&self, admin: UserId, record: &ChatRecord) -> Result<()> {
        self.upsert_record(admin, RecordKind::Group, record).await
    }

    async fn list_channels(&self, admin: UserId) -> Result<Vec<ChatRecord>> {
        self.list_records(admin, RecordKind::Channel).await
    }

    async fn list_groups(&self, admin: UserId) -> Result<Vec<ChatRecord>> {
        self.list_records(admin, RecordKind::Group).await
    }
}
