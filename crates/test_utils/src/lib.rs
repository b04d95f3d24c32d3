//! Test Utilities Crate
//!
//! Provides shared test infrastructure, fixtures, and helpers for the
//! accounting test suite.
//!
//! # Modules
//!
//! - `fixtures`: The DES ecosystem (people, GAS, suppliers) and fixed dates
//! - `builders`: Builders for account trees and transaction drafts
//! - `database`: PostgreSQL containers with the accounting schema
//! - `assertions`: Assertion helpers for accounting invariants
//! - `generators`: Property-based test data generators
//! - `logging`: One-time tracing setup for tests

pub mod fixtures;
pub mod builders;
pub mod database;
pub mod assertions;
pub mod generators;
pub mod logging;

pub use fixtures::*;
pub use builders::*;
pub use database::*;
pub use assertions::*;
pub use generators::*;
pub use logging::init_tracing;
