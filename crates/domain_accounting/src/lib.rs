//! Accounting Domain - Double-Entry Account Trees and Ledgers
//!
//! This crate implements a double-entry accounting core: hierarchical account
//! trees owned by economic subjects, atomic multi-leg transactions and
//! append-only per-account ledgers.
//!
//! # Components
//!
//! - **Account types**: closed base roles ([`BaseAccountType`]) plus an open
//!   registry of named subtypes
//! - **Account tree**: one tree per [`AccountSystem`], addressed by paths
//! - **Ledger**: per-account entries numbered from 1 without reuse
//! - **Transactions**: validated drafts persisted atomically with their entries
//! - **Subjects**: kinds registered at startup, each with its setup hook
//!
//! # Sign Convention
//!
//! A [`CashFlow`] amount is positive when money leaves the account and
//! negative when it enters. Every transaction conserves money exactly:
//! `source.amount == Σ trajectory.amount()`.
//!
//! # Example
//!
//! ```rust,ignore
//! use domain_accounting::{Accounting, BareSetup, TransactionHeader};
//! use std::sync::Arc;
//! use rust_decimal_macros::dec;
//!
//! let accounting = Accounting::in_memory();
//! accounting.register_subject_kind("person".into(), Arc::new(BareSetup)).await?;
//!
//! let alice = accounting.create_subject("person".into(), "alice").await?;
//! let system = accounting.accounting_system_of(&alice).await?;
//! let asset = accounting.account_type("ASSET").await?;
//! let wallet = accounting.add_account(system.id, "/".into(), "wallet", &asset, false).await?;
//! let bank = accounting.add_account(system.id, "/".into(), "bank", &asset, false).await?;
//!
//! accounting
//!     .register_simple_transaction(TransactionHeader::new("withdrawal", alice.id), &bank, &wallet, dec!(50))
//!     .await?;
//! assert_eq!(accounting.balance(&wallet).await?, dec!(50));
//! ```

pub mod account;
pub mod account_type;
pub mod cache;
pub mod config;
pub mod error;
pub mod factory;
pub mod invoice;
pub mod ledger;
pub mod path;
pub mod ports;
pub mod proxy;
pub mod service;
pub mod subject;
pub mod transaction;
pub mod tree;
pub mod validation;

pub use account::{Account, AccountSystem, NewAccount, ParentRef};
pub use account_type::{AccountType, AccountTypeRegistry, BaseAccountType};
pub use cache::{BalanceCache, CacheStats};
pub use config::AccountingConfig;
pub use error::AccountingError;
pub use factory::{SplitSpec, TransactionDraft, TransactionHeader};
pub use invoice::{Invoice, InvoicePaymentHook, InvoiceStatus, NewInvoice};
pub use ledger::LedgerStamp;
pub use ports::memory::MemoryStore;
pub use ports::AccountingStore;
pub use proxy::AccountingProxy;
pub use service::{Accounting, EXPENSES, INCOMES};
pub use subject::{AccountingSetup, BareSetup, Subject, SubjectKind, SubjectKindRegistry};
pub use transaction::{CashFlow, LedgerEntry, Transaction, TransactionKind, TransactionReference, Trajectory};
