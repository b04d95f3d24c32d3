//! Core Kernel - Foundational types shared by the accounting crates
//!
//! This crate provides the building blocks used by the domain and its adapters:
//! - Strongly-typed identifiers for subjects, systems, accounts and transactions
//! - Port infrastructure (error type, marker traits, health checks)

pub mod identifiers;
pub mod ports;

pub use identifiers::{AccountId, AccountSystemId, IdParseError, InvoiceId, SubjectId, TransactionId};
pub use ports::{AdapterHealth, DomainPort, HealthCheckResult, HealthCheckable, PortError};
