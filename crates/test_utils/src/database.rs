//! PostgreSQL containers for store integration tests
//!
//! Each [`TestDatabase`] owns a throwaway container with the accounting
//! schema applied. The container stops when the value is dropped.

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::time::Duration;
use testcontainers::{
    core::{IntoContainerPort, WaitFor},
    runners::AsyncRunner,
    ContainerAsync, GenericImage, ImageExt,
};
use tracing::info;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

const IMAGE: (&str, &str) = ("postgres", "16-alpine");
const USER: &str = "ledger";
const PASSWORD: &str = "ledger";
const DATABASE: &str = "accounting_test";

const SCHEMA: &str = include_str!("../../../migrations/20240101_000001_initial_schema.sql");

/// Tables holding user data, children before parents
const DATA_TABLES: &[&str] = &[
    "transaction_references",
    "ledger_entries",
    "trajectories",
    "transactions",
    "invoices",
    "accounts",
    "account_systems",
    "subjects",
];

/// A running PostgreSQL container with the accounting schema
pub struct TestDatabase {
    _container: ContainerAsync<GenericImage>,
    url: String,
    pool: PgPool,
}

impl TestDatabase {
    /// Starts a container and applies the schema
    pub async fn start() -> Result<Self, BoxError> {
        let container = GenericImage::new(IMAGE.0, IMAGE.1)
            .with_exposed_port(5432.tcp())
            .with_wait_for(WaitFor::message_on_stderr(
                "database system is ready to accept connections",
            ))
            .with_env_var("POSTGRES_USER", USER)
            .with_env_var("POSTGRES_PASSWORD", PASSWORD)
            .with_env_var("POSTGRES_DB", DATABASE)
            .start()
            .await?;

        let host = container.get_host().await?;
        let port = container.get_host_port_ipv4(5432).await?;
        let url = format!("postgres://{USER}:{PASSWORD}@{host}:{port}/{DATABASE}");

        // the ledger tests run up to 16 concurrent writers
        let pool = PgPoolOptions::new()
            .max_connections(20)
            .acquire_timeout(Duration::from_secs(30))
            .connect(&url)
            .await?;
        sqlx::raw_sql(SCHEMA).execute(&pool).await?;
        info!(%url, "test database ready");

        Ok(Self {
            _container: container,
            url,
            pool,
        })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Removes every subject, system, account and ledger row
    ///
    /// The basic account types seeded by the schema survive; registered
    /// custom types are removed.
    pub async fn reset(&self) -> Result<(), BoxError> {
        let tables = DATA_TABLES.join(", ");
        sqlx::raw_sql(&format!("TRUNCATE TABLE {tables} CASCADE"))
            .execute(&self.pool)
            .await?;
        sqlx::query("DELETE FROM account_types WHERE name <> base_type")
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

/// Starts a database for a single test
pub async fn create_isolated_test_database() -> Result<TestDatabase, BoxError> {
    TestDatabase::start().await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_creates_every_data_table() {
        for table in DATA_TABLES {
            assert!(
                SCHEMA.contains(&format!("CREATE TABLE {table} (")),
                "schema has no table {table}"
            );
        }
    }
}
