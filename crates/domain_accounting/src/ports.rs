//! Accounting Store Port
//!
//! The persistence collaborator of the accounting core. Every mutating
//! method is one atomic unit: it either applies completely or leaves the
//! store untouched. Uniqueness rules (one root per system, unique sibling
//! names, unique `(account, entry_id)`, unique subject identity, unique
//! references per transaction) are enforced by the store itself and
//! reported as `PortError::Conflict`.
//!
//! # Adapters
//!
//! - [`memory::MemoryStore`]: in-process, one `RwLock` serializing writers
//! - `infra_db::PostgresAccountingStore`: one SQL transaction per operation
//!
//! ```rust,ignore
//! use domain_accounting::{Accounting, AccountingConfig};
//! use domain_accounting::ports::memory::MemoryStore;
//! use std::sync::Arc;
//!
//! let accounting = Accounting::new(Arc::new(MemoryStore::new()), AccountingConfig::default()).await?;
//! ```

use async_trait::async_trait;
use rust_decimal::Decimal;

use core_kernel::{
    AccountId, AccountSystemId, DomainPort, HealthCheckable, InvoiceId, PortError, SubjectId,
    TransactionId,
};

use crate::account::{Account, AccountSystem};
use crate::account_type::AccountType;
use crate::invoice::{Invoice, InvoiceStatus};
use crate::ledger::LedgerStamp;
use crate::subject::{Subject, SubjectKind};
use crate::transaction::{LedgerEntry, Transaction, TransactionReference};

/// The persistence port of the accounting domain
#[async_trait]
pub trait AccountingStore: DomainPort + HealthCheckable {
    // ========================================================================
    // Account types
    // ========================================================================

    /// Persists a registered account type (idempotent)
    async fn save_account_type(&self, account_type: &AccountType) -> Result<(), PortError>;

    /// All persisted account types
    async fn account_types(&self) -> Result<Vec<AccountType>, PortError>;

    // ========================================================================
    // Subjects and systems
    // ========================================================================

    /// Inserts a subject; `Conflict` if `(kind, external_id)` exists
    async fn insert_subject(&self, subject: &Subject) -> Result<(), PortError>;

    async fn get_subject(&self, id: SubjectId) -> Result<Subject, PortError>;

    async fn find_subject(
        &self,
        kind: &SubjectKind,
        external_id: &str,
    ) -> Result<Option<Subject>, PortError>;

    /// Deletes a subject with its system and accounts
    ///
    /// `Conflict` if any of its accounts has ledger entries or the subject
    /// issued transactions or takes part in invoices.
    async fn delete_subject(&self, id: SubjectId) -> Result<(), PortError>;

    /// Creates a system with its initial accounts
    ///
    /// `Conflict` if the owner already has a system; `NotFound` if the owner
    /// does not exist.
    async fn create_system(&self, system: &AccountSystem, accounts: &[Account]) -> Result<(), PortError>;

    async fn system_of(&self, owner: SubjectId) -> Result<Option<AccountSystem>, PortError>;

    async fn get_system(&self, id: AccountSystemId) -> Result<AccountSystem, PortError>;

    // ========================================================================
    // Account tree
    // ========================================================================

    /// Inserts an account
    ///
    /// `Conflict` on a duplicate sibling name or a second root; `NotFound`
    /// if the system or parent is missing.
    async fn insert_account(&self, account: &Account) -> Result<(), PortError>;

    async fn get_account(&self, id: AccountId) -> Result<Account, PortError>;

    /// Accounts of `system` without a parent
    async fn roots(&self, system: AccountSystemId) -> Result<Vec<Account>, PortError>;

    async fn child(&self, parent: AccountId, name: &str) -> Result<Option<Account>, PortError>;

    async fn children(&self, parent: AccountId) -> Result<Vec<Account>, PortError>;

    async fn accounts_in_system(&self, system: AccountSystemId) -> Result<Vec<Account>, PortError>;

    async fn accounts_of_type(&self, type_name: &str) -> Result<Vec<Account>, PortError>;

    /// Deletes a leaf account; `Conflict` if it has children or entries
    async fn delete_account(&self, id: AccountId) -> Result<(), PortError>;

    // ========================================================================
    // Transactions and ledger
    // ========================================================================

    /// Persists a transaction and numbers its ledger entries
    async fn insert_transaction(&self, transaction: &Transaction) -> Result<Vec<LedgerEntry>, PortError>;

    /// Replaces the legs and entries of an existing transaction
    ///
    /// The stored confirmed flag and references are kept.
    async fn replace_transaction(&self, transaction: &Transaction) -> Result<Vec<LedgerEntry>, PortError>;

    async fn get_transaction(&self, id: TransactionId) -> Result<Transaction, PortError>;

    /// Sets the confirmed flag; `Conflict` if already set
    async fn confirm_transaction(&self, id: TransactionId) -> Result<(), PortError>;

    /// Adds references; `Conflict` if any is already attached
    async fn add_references(
        &self,
        id: TransactionId,
        references: &[TransactionReference],
    ) -> Result<(), PortError>;

    async fn entries_for_account(&self, account: AccountId) -> Result<Vec<LedgerEntry>, PortError>;

    async fn entries_for_transaction(&self, id: TransactionId) -> Result<Vec<LedgerEntry>, PortError>;

    async fn ledger_stamp(&self, account: AccountId) -> Result<LedgerStamp, PortError>;

    async fn account_balance(&self, account: AccountId) -> Result<Decimal, PortError>;

    // ========================================================================
    // Invoices
    // ========================================================================

    async fn insert_invoice(&self, invoice: &Invoice) -> Result<(), PortError>;

    async fn get_invoice(&self, id: InvoiceId) -> Result<Invoice, PortError>;

    /// Moves an invoice from `expected` to `status`; `Conflict` if the stored
    /// status is not `expected`
    async fn update_invoice_status(
        &self,
        id: InvoiceId,
        expected: InvoiceStatus,
        status: InvoiceStatus,
    ) -> Result<(), PortError>;

    /// Registers `transactions` and moves the invoice status in one unit
    async fn settle_invoice(
        &self,
        id: InvoiceId,
        expected: InvoiceStatus,
        status: InvoiceStatus,
        transactions: &[Transaction],
    ) -> Result<Vec<LedgerEntry>, PortError>;
}

/// In-memory implementation of the store port
pub mod memory {
    use super::*;
    use std::collections::{HashMap, HashSet};
    use std::sync::Arc;
    use tokio::sync::RwLock;

    use core_kernel::HealthCheckResult;

    use crate::ledger::EntrySequencer;

    #[derive(Debug, Default)]
    struct MemoryState {
        account_types: HashMap<String, AccountType>,
        subjects: HashMap<SubjectId, Subject>,
        systems: HashMap<AccountSystemId, AccountSystem>,
        accounts: HashMap<AccountId, Account>,
        transactions: HashMap<TransactionId, Transaction>,
        entries: HashMap<AccountId, Vec<LedgerEntry>>,
        revisions: HashMap<AccountId, u64>,
        invoices: HashMap<InvoiceId, Invoice>,
    }

    impl MemoryState {
        fn account(&self, id: AccountId) -> Result<&Account, PortError> {
            self.accounts
                .get(&id)
                .ok_or_else(|| PortError::not_found("Account", id))
        }

        fn has_entries(&self, id: AccountId) -> bool {
            self.entries.get(&id).is_some_and(|e| !e.is_empty())
        }

        fn last_entry_id(&self, id: AccountId) -> u64 {
            self.entries
                .get(&id)
                .and_then(|entries| entries.iter().map(|e| e.entry_id).max())
                .unwrap_or(0)
        }

        /// Every account snapshot in `transaction` must equal the stored row
        fn check_accounts_current(&self, transaction: &Transaction) -> Result<(), PortError> {
            for account in transaction.accounts() {
                if self.account(account.id)? != account {
                    return Err(PortError::conflict(format!(
                        "account {} does not match the stored account",
                        account.id
                    )));
                }
            }
            Ok(())
        }

        fn sequencer_for(&self, transaction: &Transaction) -> EntrySequencer {
            let maxima = transaction
                .touched_accounts()
                .into_iter()
                .map(|id| (id, self.last_entry_id(id)))
                .collect();
            EntrySequencer::new(maxima)
        }

        fn bump_revision(&mut self, id: AccountId) {
            *self.revisions.entry(id).or_default() += 1;
        }

        /// Inserts entries and transaction; callers have checked every precondition
        fn apply_transaction(&mut self, transaction: &Transaction) -> Vec<LedgerEntry> {
            let mut sequencer = self.sequencer_for(transaction);
            let entries = sequencer.materialize(transaction);
            let touched: HashSet<AccountId> = entries.iter().map(|e| e.account).collect();
            for id in touched {
                self.bump_revision(id);
            }
            for entry in &entries {
                self.entries.entry(entry.account).or_default().push(entry.clone());
            }
            self.transactions.insert(transaction.id, transaction.clone());
            entries
        }

        fn remove_entries_of(&mut self, id: TransactionId) {
            let mut changed = Vec::new();
            for (account, entries) in self.entries.iter_mut() {
                let before = entries.len();
                entries.retain(|e| e.transaction != id);
                if entries.len() != before {
                    changed.push(*account);
                }
            }
            for account in changed {
                self.bump_revision(account);
            }
        }
    }

    /// In-memory store
    ///
    /// Writers are serialized by a single lock, which makes entry numbering
    /// and the uniqueness checks atomic.
    #[derive(Debug, Default, Clone)]
    pub struct MemoryStore {
        state: Arc<RwLock<MemoryState>>,
    }

    impl MemoryStore {
        /// Creates an empty store
        pub fn new() -> Self {
            Self::default()
        }
    }

    impl DomainPort for MemoryStore {}

    #[async_trait]
    impl HealthCheckable for MemoryStore {
        async fn health_check(&self) -> HealthCheckResult {
            HealthCheckResult::healthy("memory-accounting-store", 0)
        }
    }

    #[async_trait]
    impl AccountingStore for MemoryStore {
        async fn save_account_type(&self, account_type: &AccountType) -> Result<(), PortError> {
            let mut state = self.state.write().await;
            match state.account_types.get(account_type.name()) {
                Some(existing) if existing != account_type => Err(PortError::conflict(format!(
                    "account type {} exists with base {}",
                    existing.name(),
                    existing.base_type()
                ))),
                _ => {
                    state
                        .account_types
                        .insert(account_type.name().to_string(), account_type.clone());
                    Ok(())
                }
            }
        }

        async fn account_types(&self) -> Result<Vec<AccountType>, PortError> {
            Ok(self.state.read().await.account_types.values().cloned().collect())
        }

        async fn insert_subject(&self, subject: &Subject) -> Result<(), PortError> {
            let mut state = self.state.write().await;
            let duplicate = state
                .subjects
                .values()
                .any(|s| s.kind == subject.kind && s.external_id == subject.external_id);
            if duplicate || state.subjects.contains_key(&subject.id) {
                return Err(PortError::conflict(format!("subject {} already exists", subject)));
            }
            state.subjects.insert(subject.id, subject.clone());
            Ok(())
        }

        async fn get_subject(&self, id: SubjectId) -> Result<Subject, PortError> {
            self.state
                .read()
                .await
                .subjects
                .get(&id)
                .cloned()
                .ok_or_else(|| PortError::not_found("Subject", id))
        }

        async fn find_subject(
            &self,
            kind: &SubjectKind,
            external_id: &str,
        ) -> Result<Option<Subject>, PortError> {
            Ok(self
                .state
                .read()
                .await
                .subjects
                .values()
                .find(|s| &s.kind == kind && s.external_id == external_id)
                .cloned())
        }

        async fn delete_subject(&self, id: SubjectId) -> Result<(), PortError> {
            let mut state = self.state.write().await;
            if !state.subjects.contains_key(&id) {
                return Err(PortError::not_found("Subject", id));
            }

            let system = state.systems.values().find(|s| s.owner == id).map(|s| s.id);
            let accounts: Vec<AccountId> = match system {
                Some(system) => state
                    .accounts
                    .values()
                    .filter(|a| a.system == system)
                    .map(|a| a.id)
                    .collect(),
                None => Vec::new(),
            };

            if accounts.iter().any(|a| state.has_entries(*a)) {
                return Err(PortError::conflict(format!(
                    "subject {} owns accounts with ledger entries",
                    id
                )));
            }
            if state.transactions.values().any(|t| t.issuer == id) {
                return Err(PortError::conflict(format!("subject {} issued transactions", id)));
            }
            if state
                .invoices
                .values()
                .any(|i| i.issuer == id || i.recipient == id)
            {
                return Err(PortError::conflict(format!("subject {} has invoices", id)));
            }

            for account in accounts {
                state.accounts.remove(&account);
                state.entries.remove(&account);
                state.revisions.remove(&account);
            }
            if let Some(system) = system {
                state.systems.remove(&system);
            }
            state.subjects.remove(&id);
            Ok(())
        }

        async fn create_system(&self, system: &AccountSystem, accounts: &[Account]) -> Result<(), PortError> {
            let mut state = self.state.write().await;
            if !state.subjects.contains_key(&system.owner) {
                return Err(PortError::not_found("Subject", system.owner));
            }
            if state.systems.values().any(|s| s.owner == system.owner) {
                return Err(PortError::conflict(format!(
                    "subject {} already has an accounting system",
                    system.owner
                )));
            }
            if accounts.iter().filter(|a| a.is_root()).count() != 1 {
                return Err(PortError::validation("a new system needs exactly one root"));
            }

            state.systems.insert(system.id, system.clone());
            for account in accounts {
                state.accounts.insert(account.id, account.clone());
            }
            Ok(())
        }

        async fn system_of(&self, owner: SubjectId) -> Result<Option<AccountSystem>, PortError> {
            Ok(self
                .state
                .read()
                .await
                .systems
                .values()
                .find(|s| s.owner == owner)
                .cloned())
        }

        async fn get_system(&self, id: AccountSystemId) -> Result<AccountSystem, PortError> {
            self.state
                .read()
                .await
                .systems
                .get(&id)
                .cloned()
                .ok_or_else(|| PortError::not_found("AccountSystem", id))
        }

        async fn insert_account(&self, account: &Account) -> Result<(), PortError> {
            let mut state = self.state.write().await;
            if !state.systems.contains_key(&account.system) {
                return Err(PortError::not_found("AccountSystem", account.system));
            }
            if state.accounts.contains_key(&account.id) {
                return Err(PortError::conflict(format!("account {} already exists", account.id)));
            }

            match account.parent {
                None => {
                    if state
                        .accounts
                        .values()
                        .any(|a| a.system == account.system && a.is_root())
                    {
                        return Err(PortError::conflict(format!(
                            "accounting system {} already has a root",
                            account.system
                        )));
                    }
                }
                Some(parent) => {
                    let parent = state.account(parent)?;
                    if parent.system != account.system {
                        return Err(PortError::validation("parent belongs to another system"));
                    }
                    if state
                        .accounts
                        .values()
                        .any(|a| a.parent == account.parent && a.name == account.name)
                    {
                        return Err(PortError::conflict(format!(
                            "an account named {:?} already exists under {}",
                            account.name, parent.path
                        )));
                    }
                }
            }

            state.accounts.insert(account.id, account.clone());
            Ok(())
        }

        async fn get_account(&self, id: AccountId) -> Result<Account, PortError> {
            self.state.read().await.account(id).cloned()
        }

        async fn roots(&self, system: AccountSystemId) -> Result<Vec<Account>, PortError> {
            Ok(self
                .state
                .read()
                .await
                .accounts
                .values()
                .filter(|a| a.system == system && a.is_root())
                .cloned()
                .collect())
        }

        async fn child(&self, parent: AccountId, name: &str) -> Result<Option<Account>, PortError> {
            Ok(self
                .state
                .read()
                .await
                .accounts
                .values()
                .find(|a| a.parent == Some(parent) && a.name == name)
                .cloned())
        }

        async fn children(&self, parent: AccountId) -> Result<Vec<Account>, PortError> {
            let mut children: Vec<Account> = self
                .state
                .read()
                .await
                .accounts
                .values()
                .filter(|a| a.parent == Some(parent))
                .cloned()
                .collect();
            children.sort_by(|a, b| a.name.cmp(&b.name));
            Ok(children)
        }

        async fn accounts_in_system(&self, system: AccountSystemId) -> Result<Vec<Account>, PortError> {
            let mut accounts: Vec<Account> = self
                .state
                .read()
                .await
                .accounts
                .values()
                .filter(|a| a.system == system)
                .cloned()
                .collect();
            accounts.sort_by(|a, b| a.path.cmp(&b.path));
            Ok(accounts)
        }

        async fn accounts_of_type(&self, type_name: &str) -> Result<Vec<Account>, PortError> {
            let mut accounts: Vec<Account> = self
                .state
                .read()
                .await
                .accounts
                .values()
                .filter(|a| a.account_type.name() == type_name)
                .cloned()
                .collect();
            accounts.sort_by_key(|a| a.id);
            Ok(accounts)
        }

        async fn delete_account(&self, id: AccountId) -> Result<(), PortError> {
            let mut state = self.state.write().await;
            state.account(id)?;
            if state.accounts.values().any(|a| a.parent == Some(id)) {
                return Err(PortError::conflict(format!("account {} has children", id)));
            }
            if state.has_entries(id) {
                return Err(PortError::conflict(format!("account {} has ledger entries", id)));
            }
            state.accounts.remove(&id);
            state.entries.remove(&id);
            state.revisions.remove(&id);
            Ok(())
        }

        async fn insert_transaction(&self, transaction: &Transaction) -> Result<Vec<LedgerEntry>, PortError> {
            let mut state = self.state.write().await;
            if state.transactions.contains_key(&transaction.id) {
                return Err(PortError::conflict(format!(
                    "transaction {} already exists",
                    transaction.id
                )));
            }
            state.check_accounts_current(transaction)?;
            Ok(state.apply_transaction(transaction))
        }

        async fn replace_transaction(&self, transaction: &Transaction) -> Result<Vec<LedgerEntry>, PortError> {
            let mut state = self.state.write().await;
            let stored = state
                .transactions
                .get(&transaction.id)
                .cloned()
                .ok_or_else(|| PortError::not_found("Transaction", transaction.id))?;
            state.check_accounts_current(transaction)?;

            let replacement = Transaction {
                confirmed: stored.confirmed,
                references: stored.references,
                ..transaction.clone()
            };
            state.remove_entries_of(transaction.id);
            Ok(state.apply_transaction(&replacement))
        }

        async fn get_transaction(&self, id: TransactionId) -> Result<Transaction, PortError> {
            self.state
                .read()
                .await
                .transactions
                .get(&id)
                .cloned()
                .ok_or_else(|| PortError::not_found("Transaction", id))
        }

        async fn confirm_transaction(&self, id: TransactionId) -> Result<(), PortError> {
            let mut state = self.state.write().await;
            let transaction = state
                .transactions
                .get_mut(&id)
                .ok_or_else(|| PortError::not_found("Transaction", id))?;
            if transaction.confirmed {
                return Err(PortError::conflict(format!("transaction {} already confirmed", id)));
            }
            transaction.confirmed = true;
            Ok(())
        }

        async fn add_references(
            &self,
            id: TransactionId,
            references: &[TransactionReference],
        ) -> Result<(), PortError> {
            let mut state = self.state.write().await;
            let transaction = state
                .transactions
                .get_mut(&id)
                .ok_or_else(|| PortError::not_found("Transaction", id))?;

            let existing: HashSet<&TransactionReference> = transaction.references.iter().collect();
            if let Some(dup) = references.iter().find(|r| existing.contains(r)) {
                return Err(PortError::conflict(format!(
                    "reference {}:{} already attached to {}",
                    dup.kind, dup.id, id
                )));
            }
            transaction.references.extend(references.iter().cloned());
            transaction.references.sort();
            Ok(())
        }

        async fn entries_for_account(&self, account: AccountId) -> Result<Vec<LedgerEntry>, PortError> {
            let state = self.state.read().await;
            state.account(account)?;
            Ok(state.entries.get(&account).cloned().unwrap_or_default())
        }

        async fn entries_for_transaction(&self, id: TransactionId) -> Result<Vec<LedgerEntry>, PortError> {
            let state = self.state.read().await;
            if !state.transactions.contains_key(&id) {
                return Err(PortError::not_found("Transaction", id));
            }
            Ok(state
                .entries
                .values()
                .flatten()
                .filter(|e| e.transaction == id)
                .cloned()
                .collect())
        }

        async fn ledger_stamp(&self, account: AccountId) -> Result<LedgerStamp, PortError> {
            let state = self.state.read().await;
            state.account(account)?;
            Ok(LedgerStamp {
                last_entry_id: state.last_entry_id(account),
                entry_count: state.entries.get(&account).map_or(0, |e| e.len() as u64),
                revision: state.revisions.get(&account).copied().unwrap_or(0),
            })
        }

        async fn account_balance(&self, account: AccountId) -> Result<Decimal, PortError> {
            let state = self.state.read().await;
            state.account(account)?;
            Ok(state
                .entries
                .get(&account)
                .map(|entries| crate::ledger::balance_of(entries))
                .unwrap_or(Decimal::ZERO))
        }

        async fn insert_invoice(&self, invoice: &Invoice) -> Result<(), PortError> {
            let mut state = self.state.write().await;
            for subject in [invoice.issuer, invoice.recipient] {
                if !state.subjects.contains_key(&subject) {
                    return Err(PortError::not_found("Subject", subject));
                }
            }
            if state.invoices.contains_key(&invoice.id) {
                return Err(PortError::conflict(format!("invoice {} already exists", invoice.id)));
            }
            state.invoices.insert(invoice.id, invoice.clone());
            Ok(())
        }

        async fn get_invoice(&self, id: InvoiceId) -> Result<Invoice, PortError> {
            self.state
                .read()
                .await
                .invoices
                .get(&id)
                .cloned()
                .ok_or_else(|| PortError::not_found("Invoice", id))
        }

        async fn update_invoice_status(
            &self,
            id: InvoiceId,
            expected: InvoiceStatus,
            status: InvoiceStatus,
        ) -> Result<(), PortError> {
            let mut state = self.state.write().await;
            let invoice = state
                .invoices
                .get_mut(&id)
                .ok_or_else(|| PortError::not_found("Invoice", id))?;
            if invoice.status != expected {
                return Err(PortError::conflict(format!(
                    "invoice {} is {}, expected {}",
                    id, invoice.status, expected
                )));
            }
            invoice.status = status;
            Ok(())
        }

        async fn settle_invoice(
            &self,
            id: InvoiceId,
            expected: InvoiceStatus,
            status: InvoiceStatus,
            transactions: &[Transaction],
        ) -> Result<Vec<LedgerEntry>, PortError> {
            let mut state = self.state.write().await;
            let current = state
                .invoices
                .get(&id)
                .map(|i| i.status)
                .ok_or_else(|| PortError::not_found("Invoice", id))?;
            if current != expected {
                return Err(PortError::conflict(format!(
                    "invoice {} is {}, expected {}",
                    id, current, expected
                )));
            }
            for transaction in transactions {
                if state.transactions.contains_key(&transaction.id) {
                    return Err(PortError::conflict(format!(
                        "transaction {} already exists",
                        transaction.id
                    )));
                }
                state.check_accounts_current(transaction)?;
            }

            let mut entries = Vec::new();
            for transaction in transactions {
                entries.extend(state.apply_transaction(transaction));
            }
            if let Some(invoice) = state.invoices.get_mut(&id) {
                invoice.status = status;
            }
            Ok(entries)
        }
    }
}
