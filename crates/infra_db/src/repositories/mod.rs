//! Repository implementations
//!
//! Repositories encapsulate SQL queries and the row types they return.
//! Multi-statement writes are exposed as functions over a `PgConnection`
//! so adapters can run them inside one transaction.

pub mod accounting;

pub use accounting::AccountingRepository;
