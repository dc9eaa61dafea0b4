use std::str::FromStr;

use {
    joingate_config::DatabaseConfig,
    sqlx::{
        SqlitePool,
        sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    },
    tracing::info,
};

/// Open the SQLite database and apply pending migrations.
///
/// `:memory:` gets a single long-lived connection; every extra connection
/// would otherwise see its own empty database.
pub async fn open_pool(config: &DatabaseConfig) -> anyhow::Result<SqlitePool> {
    let pool = if config.is_in_memory() {
        SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(SqliteConnectOptions::from_str("sqlite::memory:")?)
            .await?
    } else {
        let options = SqliteConnectOptions::new()
            .filename(&config.path)
            .create_if_missing(true);
        SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?
    };

    joingate_gate::run_migrations(&pool).await?;
    info!(path = %config.path.display(), "database ready");
    Ok(pool)
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn creates_database_file_with_schema() {
        let dir = tempfile::tempdir().unwrap();
        let config = DatabaseConfig {
            path: dir.path().join("gate.db"),
        };

        let pool = open_pool(&config).await.unwrap();
        assert!(config.path.exists());

        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM approvals")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn in_memory_database_keeps_its_schema() {
        let config = DatabaseConfig {
            path: ":memory:".into(),
        };
        let pool = open_pool(&config).await.unwrap();

        sqlx::query("INSERT INTO approvals (admin_id, approved) VALUES (1, 1)")
            .execute(&pool)
            .await
            .unwrap();
        let (approved,): (i64,) =
            sqlx::query_as("SELECT approved FROM approvals WHERE admin_id = 1")
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(approved, 1);
    }
}
