//! Connection pool and schema setup for the accounting store

use serde::Deserialize;
use sqlx::migrate::Migrator;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use tracing::{info, instrument};

use crate::adapters::PostgresAccountingStore;
use crate::error::DatabaseError;

/// Type alias for the PostgreSQL connection pool
pub type DatabasePool = PgPool;

/// Accounting schema, embedded from `migrations/` at the workspace root
pub static MIGRATOR: Migrator = sqlx::migrate!("../../migrations");

/// Pool settings for the accounting database
///
/// ```rust
/// use infra_db::DatabaseConfig;
/// use std::time::Duration;
///
/// let config = DatabaseConfig::new("postgres://localhost/accounting")
///     .max_connections(20)
///     .connect_timeout(Duration::from_secs(10));
/// assert!(config.run_migrations);
/// ```
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout: Duration,
    /// Apply pending migrations when the store connects
    pub run_migrations: bool,
}

impl DatabaseConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            // ledger writes hold row locks on the entry counters, keep a few spare
            max_connections: 10,
            min_connections: 2,
            connect_timeout: Duration::from_secs(30),
            run_migrations: true,
        }
    }

    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    pub fn min_connections(mut self, min: u32) -> Self {
        self.min_connections = min;
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn run_migrations(mut self, run: bool) -> Self {
        self.run_migrations = run;
        self
    }

    /// Loads configuration from `DATABASE_*` environment variables
    ///
    /// `DATABASE_URL` is required. `DATABASE_MAX_CONNECTIONS`,
    /// `DATABASE_MIN_CONNECTIONS`, `DATABASE_CONNECT_TIMEOUT_SECS` and
    /// `DATABASE_RUN_MIGRATIONS` are optional. A `.env` file is read first if present.
    pub fn from_env() -> Result<Self, config::ConfigError> {
        dotenvy::dotenv().ok();

        let settings: DatabaseSettings = config::Config::builder()
            .add_source(config::Environment::with_prefix("DATABASE").try_parsing(true))
            .build()?
            .try_deserialize()?;
        Ok(settings.into())
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self::new("postgres://localhost/accounting")
    }
}

#[derive(Debug, Deserialize)]
struct DatabaseSettings {
    url: String,
    max_connections: Option<u32>,
    min_connections: Option<u32>,
    connect_timeout_secs: Option<u64>,
    run_migrations: Option<bool>,
}

impl From<DatabaseSettings> for DatabaseConfig {
    fn from(settings: DatabaseSettings) -> Self {
        let defaults = DatabaseConfig::new(settings.url);
        Self {
            max_connections: settings.max_connections.unwrap_or(defaults.max_connections),
            min_connections: settings.min_connections.unwrap_or(defaults.min_connections),
            connect_timeout: settings
                .connect_timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.connect_timeout),
            run_migrations: settings.run_migrations.unwrap_or(defaults.run_migrations),
            url: defaults.url,
        }
    }
}

/// Opens a pool with the given settings; does not touch the schema
#[instrument(skip_all, fields(max_connections = config.max_connections))]
pub async fn create_pool(config: &DatabaseConfig) -> Result<DatabasePool, DatabaseError> {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(config.connect_timeout)
        .connect(&config.url)
        .await
        .map_err(|e| DatabaseError::ConnectionFailed(e.to_string()))?;

    info!("accounting database pool ready");
    Ok(pool)
}

/// Applies pending accounting migrations
pub async fn run_migrations(pool: &DatabasePool) -> Result<(), DatabaseError> {
    MIGRATOR
        .run(pool)
        .await
        .map_err(|e| DatabaseError::QueryFailed(format!("migration failed: {e}")))?;
    info!(migrations = MIGRATOR.iter().count(), "accounting schema up to date");
    Ok(())
}

/// Opens a pool, migrates it when configured to, and wraps it in a store
pub async fn connect_store(config: &DatabaseConfig) -> Result<PostgresAccountingStore, DatabaseError> {
    let pool = create_pool(config).await?;
    if config.run_migrations {
        run_migrations(&pool).await?;
    }
    Ok(PostgresAccountingStore::new(pool))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builder() {
        let config = DatabaseConfig::new("postgres://test")
            .max_connections(50)
            .connect_timeout(Duration::from_secs(60))
            .run_migrations(false);

        assert_eq!(config.max_connections, 50);
        assert_eq!(config.min_connections, 2);
        assert_eq!(config.connect_timeout, Duration::from_secs(60));
        assert!(!config.run_migrations);
    }

    #[test]
    fn test_settings_fill_missing_values_with_defaults() {
        let config: DatabaseConfig = DatabaseSettings {
            url: "postgres://db/ledger".to_string(),
            max_connections: Some(4),
            min_connections: None,
            connect_timeout_secs: Some(5),
            run_migrations: None,
        }
        .into();

        assert_eq!(config.url, "postgres://db/ledger");
        assert_eq!(config.max_connections, 4);
        assert_eq!(config.min_connections, 2);
        assert_eq!(config.connect_timeout, Duration::from_secs(5));
        assert!(config.run_migrations);
    }

    #[test]
    fn test_schema_is_embedded() {
        assert!(MIGRATOR.iter().count() >= 1);
    }
}
