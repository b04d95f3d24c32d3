//! Transactions, cash flows and ledger entries
//!
//! # Sign convention
//!
//! A [`CashFlow`] amount is expressed from the point of view of the stock
//! account it touches: **positive = outgoing** (the stock decreases),
//! **negative = incoming** (the stock increases). A [`Trajectory`]'s amount
//! is the negated target flow, so it reads as money leaving the source.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fmt::Write as _;

use core_kernel::{AccountId, SubjectId, TransactionId};

use crate::account::Account;
use crate::error::AccountingError;

/// Money entering or leaving one stock-like account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CashFlow {
    pub account: Account,
    pub amount: Decimal,
}

impl CashFlow {
    /// Creates a cash flow; the account must be stock-like
    pub fn new(account: Account, amount: Decimal) -> Result<Self, AccountingError> {
        if !account.is_stock() {
            return Err(AccountingError::invalid_type(format!(
                "cash flows must involve a stock-like account, got {}",
                account
            )));
        }
        Ok(Self { account, amount })
    }

    /// Money leaving the account
    pub fn is_outgoing(&self) -> bool {
        self.amount.is_sign_positive() && !self.amount.is_zero()
    }

    /// Money entering the account
    pub fn is_incoming(&self) -> bool {
        self.amount.is_sign_negative() && !self.amount.is_zero()
    }
}

/// One leg of a transaction, from the shared source to a target
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trajectory {
    /// Flux-like account where money enters the target's system
    pub entry_point: Option<Account>,
    /// Flux-like account where money leaves the source's system
    pub exit_point: Option<Account>,
    /// Final stock-like destination
    pub target: CashFlow,
}

impl Trajectory {
    /// A leg staying inside the source's system
    pub fn internal(target: CashFlow) -> Self {
        Self {
            entry_point: None,
            exit_point: None,
            target,
        }
    }

    /// A leg crossing from the source's system into the target's
    pub fn crossing(exit_point: Account, entry_point: Account, target: CashFlow) -> Self {
        Self {
            entry_point: Some(entry_point),
            exit_point: Some(exit_point),
            target,
        }
    }

    /// Amount leaving the source along this leg
    pub fn amount(&self) -> Decimal {
        -self.target.amount
    }

    /// True if the leg never leaves the source's system
    pub fn is_internal(&self) -> bool {
        self.exit_point.is_none()
    }
}

/// Business meaning of a transaction
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum TransactionKind {
    #[default]
    Generic,
    /// Settlement of an invoice, recorded by the payer
    InvoicePayment,
    /// Settlement of an invoice, recorded by the issuer
    InvoiceCollection,
    /// Caller-defined tag
    Custom(String),
}

impl TransactionKind {
    /// Storage tag
    pub fn as_str(&self) -> &str {
        match self {
            TransactionKind::Generic => "GENERIC",
            TransactionKind::InvoicePayment => "INVOICE_PAYMENT",
            TransactionKind::InvoiceCollection => "INVOICE_COLLECTION",
            TransactionKind::Custom(tag) => tag,
        }
    }

    /// Parses a storage tag; unknown tags become `Custom`
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "GENERIC" => TransactionKind::Generic,
            "INVOICE_PAYMENT" => TransactionKind::InvoicePayment,
            "INVOICE_COLLECTION" => TransactionKind::InvoiceCollection,
            other => TransactionKind::Custom(other.to_string()),
        }
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pointer from a transaction to an external domain object
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TransactionReference {
    /// Kind of the referenced object (e.g. "invoice", "order")
    pub kind: String,
    /// Identifier of the referenced object
    pub id: String,
}

impl TransactionReference {
    pub fn new(kind: impl Into<String>, id: impl fmt::Display) -> Self {
        Self {
            kind: kind.into(),
            id: id.to_string(),
        }
    }
}

/// A validated, persisted movement of money
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    pub date: DateTime<Utc>,
    pub description: String,
    /// Subject who recorded the transaction
    pub issuer: SubjectId,
    pub source: CashFlow,
    pub splits: Vec<Trajectory>,
    pub kind: TransactionKind,
    /// Set once, never cleared
    pub confirmed: bool,
    pub references: Vec<TransactionReference>,
}

impl Transaction {
    /// More than one leg
    pub fn is_split(&self) -> bool {
        self.splits.len() > 1
    }

    /// Every leg stays inside the source's system
    pub fn is_internal(&self) -> bool {
        self.splits.iter().all(Trajectory::is_internal)
    }

    /// Internal and single-legged
    pub fn is_simple(&self) -> bool {
        self.is_internal() && !self.is_split()
    }

    /// Every account touched, with repetitions, in fan-out order
    pub fn touched_accounts(&self) -> Vec<AccountId> {
        let mut accounts = vec![self.source.account.id];
        for split in &self.splits {
            if let Some(exit) = &split.exit_point {
                accounts.push(exit.id);
            }
            if let Some(entry) = &split.entry_point {
                accounts.push(entry.id);
            }
            accounts.push(split.target.account.id);
        }
        accounts
    }

    /// Every referenced account snapshot, in fan-out order
    pub fn accounts(&self) -> impl Iterator<Item = &Account> {
        std::iter::once(&self.source.account).chain(self.splits.iter().flat_map(|s| {
            s.exit_point
                .iter()
                .chain(s.entry_point.iter())
                .chain(std::iter::once(&s.target.account))
        }))
    }

    /// Human-readable rendering of the transaction
    pub fn details(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Transaction {} ({})", self.id, self.kind);
        let _ = writeln!(out, "  date: {}", self.date.to_rfc3339());
        let _ = writeln!(out, "  description: {}", self.description);
        let _ = writeln!(out, "  issuer: {}", self.issuer);
        let _ = writeln!(
            out,
            "  source: {} amount {}",
            self.source.account.path, self.source.amount
        );
        for (i, split) in self.splits.iter().enumerate() {
            let route = match (&split.exit_point, &split.entry_point) {
                (Some(exit), Some(entry)) => format!("{} -> {} -> ", exit.path, entry.path),
                _ => String::new(),
            };
            let _ = writeln!(
                out,
                "  split {}: {}{} amount {}",
                i + 1,
                route,
                split.target.account.path,
                split.amount()
            );
        }
        if !self.references.is_empty() {
            let refs: Vec<String> = self
                .references
                .iter()
                .map(|r| format!("{}:{}", r.kind, r.id))
                .collect();
            let _ = writeln!(out, "  references: {}", refs.join(", "));
        }
        out
    }
}

/// One per-account record of a transaction touch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub account: AccountId,
    pub transaction: TransactionId,
    /// Gap-free per-account sequence number starting at 1
    pub entry_id: u64,
    /// Signed amount from the account's perspective
    pub amount: Decimal,
    pub date: DateTime<Utc>,
    pub description: String,
    pub issuer: SubjectId,
}
