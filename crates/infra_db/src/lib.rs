//! Infrastructure Database Layer
//!
//! PostgreSQL persistence for the accounting core, built on SQLx.
//!
//! # Architecture
//!
//! The crate follows the repository pattern:
//! - [`repositories`] hold row types and SQL
//! - [`adapters`] implement the domain's `AccountingStore` port on top of them
//!
//! The schema lives in `migrations/` at the workspace root. Tree and ledger
//! uniqueness rules are enforced there (one root per system, unique sibling
//! names, unique `(account, entry_id)`).
//!
//! # Example
//!
//! ```rust,ignore
//! use infra_db::{connect_store, DatabaseConfig};
//!
//! let store = connect_store(&DatabaseConfig::from_env()?).await?;
//! ```

pub mod adapters;
pub mod error;
pub mod pool;
pub mod repositories;

pub use adapters::PostgresAccountingStore;
pub use error::DatabaseError;
pub use pool::{connect_store, create_pool, run_migrations, DatabaseConfig, DatabasePool, MIGRATOR};
