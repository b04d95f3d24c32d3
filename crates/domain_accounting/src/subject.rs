//! Economic subjects and their accounting setup

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use core_kernel::SubjectId;

use crate::account::AccountSystem;
use crate::error::AccountingError;
use crate::invoice::InvoicePaymentHook;
use crate::service::Accounting;

/// Kind of external entity a subject stands for ("person", "gas", ...)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubjectKind(String);

impl SubjectKind {
    /// Kinds are compared trimmed and lower-cased
    pub fn new(kind: &str) -> Self {
        Self(kind.trim().to_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SubjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SubjectKind {
    fn from(kind: &str) -> Self {
        Self::new(kind)
    }
}

/// Opaque handle on an external entity able to own an accounting system
///
/// Identity is `(kind, external_id)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
    pub id: SubjectId,
    pub kind: SubjectKind,
    pub external_id: String,
}

impl Subject {
    pub fn new(kind: SubjectKind, external_id: impl Into<String>) -> Self {
        Self {
            id: SubjectId::new_v7(),
            kind,
            external_id: external_id.into(),
        }
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.external_id)
    }
}

/// Per-kind customization of a subject's accounting system
#[async_trait]
pub trait AccountingSetup: Send + Sync {
    /// Adds the kind's default accounts once the base tree exists
    async fn setup(&self, accounting: &Accounting, system: &AccountSystem) -> Result<(), AccountingError>;

    /// Path of the subject's main account, if the kind has one
    fn main_account_path(&self) -> Option<&str> {
        None
    }

    /// Builder of invoice settlement transactions
    fn payment_hook(&self) -> Option<&dyn InvoicePaymentHook> {
        None
    }
}

impl fmt::Debug for dyn AccountingSetup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("dyn AccountingSetup")
    }
}

/// Setup for kinds that only need the base tree
#[derive(Debug, Default, Clone, Copy)]
pub struct BareSetup;

#[async_trait]
impl AccountingSetup for BareSetup {
    async fn setup(&self, _accounting: &Accounting, _system: &AccountSystem) -> Result<(), AccountingError> {
        Ok(())
    }
}

/// Subject kinds registered at startup
#[derive(Default, Clone)]
pub struct SubjectKindRegistry {
    kinds: HashMap<SubjectKind, Arc<dyn AccountingSetup>>,
}

impl fmt::Debug for SubjectKindRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubjectKindRegistry")
            .field("kinds", &self.kinds.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl SubjectKindRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a kind; a kind can be registered once
    pub fn register(
        &mut self,
        kind: SubjectKind,
        setup: Arc<dyn AccountingSetup>,
    ) -> Result<(), AccountingError> {
        if self.kinds.contains_key(&kind) {
            return Err(AccountingError::conflict(format!(
                "subject kind {} is already registered",
                kind
            )));
        }
        self.kinds.insert(kind, setup);
        Ok(())
    }

    /// Setup hook of a registered kind
    pub fn get(&self, kind: &SubjectKind) -> Result<Arc<dyn AccountingSetup>, AccountingError> {
        self.kinds
            .get(kind)
            .cloned()
            .ok_or_else(|| AccountingError::not_found("SubjectKind", kind))
    }

    pub fn contains(&self, kind: &SubjectKind) -> bool {
        self.kinds.contains_key(kind)
    }
}
