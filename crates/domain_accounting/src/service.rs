//! Accounting facade
//!
//! [`Accounting`] owns the store handle, the account type registry, the
//! subject kind registry and the configuration. Operations are spread across
//! the component modules as `impl Accounting` blocks; this module holds the
//! subject, system and invoice operations.

use chrono::NaiveDate;
use std::sync::Arc;
use tokio::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{error, info, instrument, warn};

use core_kernel::{InvoiceId, SubjectId, TransactionId};

use crate::account::{Account, AccountSystem, NewAccount};
use crate::account_type::{AccountType, AccountTypeRegistry, BaseAccountType};
use crate::config::AccountingConfig;
use crate::error::AccountingError;
use crate::invoice::{Invoice, InvoicePaymentHook, InvoiceStatus, NewInvoice};
use crate::ports::memory::MemoryStore;
use crate::ports::AccountingStore;
use crate::proxy::AccountingProxy;
use crate::subject::{AccountingSetup, Subject, SubjectKind, SubjectKindRegistry};
use crate::transaction::Transaction;

/// Name of the income placeholder created with every system
pub const INCOMES: &str = "incomes";
/// Name of the expense placeholder created with every system
pub const EXPENSES: &str = "expenses";

/// Entry point of the accounting core
pub struct Accounting {
    store: Arc<dyn AccountingStore>,
    config: AccountingConfig,
    types: RwLock<AccountTypeRegistry>,
    kinds: RwLock<SubjectKindRegistry>,
}

impl std::fmt::Debug for Accounting {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Accounting")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Accounting {
    /// Creates the facade over `store`, reloading persisted account types
    ///
    /// # Errors
    ///
    /// Returns `Store` if the types cannot be read, or `Conflict` if a
    /// persisted type clashes with a basic one.
    pub async fn new(
        store: Arc<dyn AccountingStore>,
        config: AccountingConfig,
    ) -> Result<Self, AccountingError> {
        let mut types = AccountTypeRegistry::new();
        for account_type in store.account_types().await? {
            types.register(account_type.name(), account_type.base_type())?;
        }

        Ok(Self {
            store,
            config,
            types: RwLock::new(types),
            kinds: RwLock::new(SubjectKindRegistry::new()),
        })
    }

    /// A facade over a fresh in-memory store with default configuration
    pub fn in_memory() -> Self {
        Self::with_memory_store(AccountingConfig::default())
    }

    /// A facade over a fresh in-memory store
    pub fn with_memory_store(config: AccountingConfig) -> Self {
        Self {
            store: Arc::new(MemoryStore::new()),
            config,
            types: RwLock::new(AccountTypeRegistry::new()),
            kinds: RwLock::new(SubjectKindRegistry::new()),
        }
    }

    pub fn config(&self) -> &AccountingConfig {
        &self.config
    }

    /// The underlying store
    pub fn store(&self) -> &dyn AccountingStore {
        self.store.as_ref()
    }

    pub(crate) async fn types(&self) -> RwLockReadGuard<'_, AccountTypeRegistry> {
        self.types.read().await
    }

    pub(crate) async fn types_mut(&self) -> RwLockWriteGuard<'_, AccountTypeRegistry> {
        self.types.write().await
    }

    // ========================================================================
    // Subjects
    // ========================================================================

    /// Registers a subject kind with the hook building its default accounts
    #[instrument(skip(self, setup), fields(kind = %kind))]
    pub async fn register_subject_kind(
        &self,
        kind: SubjectKind,
        setup: Arc<dyn AccountingSetup>,
    ) -> Result<(), AccountingError> {
        self.kinds.write().await.register(kind, setup)?;
        info!("Registered subject kind");
        Ok(())
    }

    /// Creates a subject with its accounting system and default accounts
    ///
    /// # Errors
    ///
    /// - `NotFound` if `kind` was never registered
    /// - `Conflict` if a subject with this identity exists
    /// - whatever the kind's setup hook fails with; the subject, its system
    ///   and accounts are then removed
    /// - `IncompleteSubject` if that removal fails too, for instance because
    ///   the hook registered transactions before failing; the subject stays
    ///   in the store and the error carries both failures
    #[instrument(skip(self, kind), fields(kind = %kind))]
    pub async fn create_subject(
        &self,
        kind: SubjectKind,
        external_id: &str,
    ) -> Result<Subject, AccountingError> {
        let setup = self.kinds.read().await.get(&kind)?;

        let subject = Subject::new(kind, external_id);
        self.store.insert_subject(&subject).await?;

        let result = async {
            let system = self.init_accounting_system(&subject).await?;
            setup.setup(self, &system).await
        }
        .await;

        if let Err(e) = result {
            warn!(subject_id = %subject.id, error = %e, "Subject setup failed, removing subject");
            if let Err(cleanup) = self.store.delete_subject(subject.id).await {
                error!(subject_id = %subject.id, error = %cleanup, "Could not remove subject");
                return Err(AccountingError::IncompleteSubject {
                    subject: subject.to_string(),
                    cause: Box::new(e),
                    cleanup: Box::new(cleanup.into()),
                });
            }
            return Err(e);
        }

        info!(subject_id = %subject.id, "Created subject");
        Ok(subject)
    }

    /// Loads a subject by id
    pub async fn subject(&self, id: SubjectId) -> Result<Subject, AccountingError> {
        Ok(self.store.get_subject(id).await?)
    }

    /// Looks up a subject by identity
    pub async fn subject_of(
        &self,
        kind: &SubjectKind,
        external_id: &str,
    ) -> Result<Subject, AccountingError> {
        self.store
            .find_subject(kind, external_id)
            .await?
            .ok_or_else(|| AccountingError::not_found("Subject", format!("{}:{}", kind, external_id)))
    }

    /// Deletes a subject together with its system and accounts
    ///
    /// Refused once any of its accounts has ledger entries or the subject
    /// takes part in transactions or invoices.
    #[instrument(skip(self, subject), fields(subject = %subject))]
    pub async fn delete_subject(&self, subject: &Subject) -> Result<(), AccountingError> {
        self.store.delete_subject(subject.id).await.map_err(|e| {
            if e.is_conflict() {
                AccountingError::invalid_operation(e.to_string())
            } else {
                e.into()
            }
        })?;
        info!("Deleted subject");
        Ok(())
    }

    // ========================================================================
    // Accounting systems
    // ========================================================================

    /// Creates the system of `subject` with its root, incomes and expenses
    ///
    /// # Errors
    ///
    /// Returns `InvalidAccountingOperation` if the subject already has one.
    #[instrument(skip(self, subject), fields(subject = %subject))]
    pub async fn init_accounting_system(&self, subject: &Subject) -> Result<AccountSystem, AccountingError> {
        let already = || {
            AccountingError::invalid_operation(format!(
                "subject {} already has an accounting system",
                subject
            ))
        };
        if self.store.system_of(subject.id).await?.is_some() {
            return Err(already());
        }

        let separator = self.config.path_separator;
        let system = AccountSystem::new(subject.id);
        let root = Account::root(system.id, separator);
        let incomes = Account::child_of(
            &root,
            NewAccount::placeholder(INCOMES, AccountType::basic(BaseAccountType::Income)),
            separator,
        );
        let expenses = Account::child_of(
            &root,
            NewAccount::placeholder(EXPENSES, AccountType::basic(BaseAccountType::Expense)),
            separator,
        );

        self.store
            .create_system(&system, &[root, incomes, expenses])
            .await
            .map_err(|e| if e.is_conflict() { already() } else { e.into() })?;

        info!(system_id = %system.id, "Initialized accounting system");
        Ok(system)
    }

    /// The system owned by `subject`
    ///
    /// # Errors
    ///
    /// Returns `NotConfigured` if the subject has none.
    pub async fn accounting_system_of(&self, subject: &Subject) -> Result<AccountSystem, AccountingError> {
        self.store.system_of(subject.id).await?.ok_or_else(|| {
            AccountingError::NotConfigured(format!("subject {} has no accounting system", subject))
        })
    }

    /// A handle bundling `subject` with its system and kind setup
    pub async fn accounting_proxy_of<'a>(
        &'a self,
        subject: &Subject,
    ) -> Result<AccountingProxy<'a>, AccountingError> {
        let setup = self.kinds.read().await.get(&subject.kind)?;
        let system = self.accounting_system_of(subject).await?;
        Ok(AccountingProxy::new(self, subject.clone(), system, setup))
    }

    // ========================================================================
    // Invoices
    // ========================================================================

    /// Issues an invoice in status `Issued`
    #[instrument(skip(self, new_invoice), fields(issuer = %new_invoice.issuer, recipient = %new_invoice.recipient))]
    pub async fn issue_invoice(&self, new_invoice: NewInvoice) -> Result<Invoice, AccountingError> {
        let invoice = new_invoice.into_invoice()?;
        self.store.insert_invoice(&invoice).await?;
        info!(invoice_id = %invoice.id, total = %invoice.total_amount(), "Issued invoice");
        Ok(invoice)
    }

    /// Loads an invoice
    pub async fn invoice(&self, id: InvoiceId) -> Result<Invoice, AccountingError> {
        Ok(self.store.get_invoice(id).await?)
    }

    /// Moves an issued invoice past its due date to `Overdue`
    #[instrument(skip(self))]
    pub async fn mark_overdue(&self, id: InvoiceId, today: NaiveDate) -> Result<Invoice, AccountingError> {
        let invoice = self.store.get_invoice(id).await?;
        if invoice.status != InvoiceStatus::Issued || today <= invoice.due_date {
            return Err(AccountingError::invalid_operation(format!(
                "invoice {} ({}, due {}) cannot become overdue on {}",
                id, invoice.status, invoice.due_date, today
            )));
        }

        self.store
            .update_invoice_status(id, invoice.status, InvoiceStatus::Overdue)
            .await?;
        info!("Invoice is overdue");
        Ok(Invoice {
            status: InvoiceStatus::Overdue,
            ..invoice
        })
    }

    /// Moves an invoice to `status`, registering the hook's transactions
    /// in the same atomic unit
    ///
    /// `Payed` may only be requested by the stored recipient and
    /// `PaymentConfirmed` only by the stored issuer.
    pub(crate) async fn settle_invoice(
        &self,
        id: InvoiceId,
        status: InvoiceStatus,
        settler: &Subject,
        hook: &dyn InvoicePaymentHook,
    ) -> Result<(Invoice, Vec<Transaction>), AccountingError> {
        let current = self.store.get_invoice(id).await?;
        let is_being_paid = status == InvoiceStatus::Payed;
        if is_being_paid && current.recipient != settler.id {
            return Err(AccountingError::invalid_operation(format!(
                "invoice {} is not addressed to {}",
                id, settler
            )));
        }
        if !is_being_paid && current.issuer != settler.id {
            return Err(AccountingError::invalid_operation(format!(
                "invoice {} was not issued by {}",
                id, settler
            )));
        }
        let status = current.status.transition(status)?;

        let drafts = hook.payment_transactions(self, &current, is_being_paid).await?;
        let mut transactions = Vec::with_capacity(drafts.len());
        for draft in drafts {
            let draft = self.reload_draft(draft).await?;
            transactions.push(draft.into_transaction(TransactionId::new_v7())?);
        }

        let entries = self
            .store
            .settle_invoice(id, current.status, status, &transactions)
            .await?;

        info!(
            invoice_id = %id,
            %status,
            transactions = transactions.len(),
            entries = entries.len(),
            "Settled invoice"
        );
        Ok((Invoice { status, ..current }, transactions))
    }
}
