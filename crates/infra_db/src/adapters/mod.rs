//! Domain Adapters
//!
//! Adapter implementations of domain ports, connecting domain interfaces to
//! the PostgreSQL database layer. Each adapter translates between domain
//! models and database row types and uses the repository layer for SQL.

pub mod accounting;

pub use accounting::PostgresAccountingStore;
