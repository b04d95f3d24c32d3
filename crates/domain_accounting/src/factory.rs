//! Transaction factories
//!
//! Transactions are never built directly: callers describe them as a
//! [`TransactionDraft`], which is validated in full before a single write
//! happens and then persisted together with its ledger entries in one
//! atomic store operation.
//!
//! Amounts of the simple and crossing factories are the source's outgoing
//! amount. Split legs carry the *target* flow amount, so a balanced
//! transaction satisfies `source_amount + Σ split.amount == 0`.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::{debug, info, instrument};

use core_kernel::{SubjectId, TransactionId};

use crate::account::Account;
use crate::error::AccountingError;
use crate::service::Accounting;
use crate::transaction::{
    CashFlow, LedgerEntry, Transaction, TransactionKind, TransactionReference, Trajectory,
};
use crate::validation::validate_draft;

/// Descriptive fields shared by every factory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionHeader {
    pub date: DateTime<Utc>,
    pub description: String,
    pub issuer: SubjectId,
    pub kind: TransactionKind,
    pub references: Vec<TransactionReference>,
}

impl TransactionHeader {
    /// A generic transaction dated now
    pub fn new(description: impl Into<String>, issuer: SubjectId) -> Self {
        Self {
            date: Utc::now(),
            description: description.into(),
            issuer,
            kind: TransactionKind::Generic,
            references: Vec::new(),
        }
    }

    /// Sets the reference date
    pub fn dated(mut self, date: DateTime<Utc>) -> Self {
        self.date = date;
        self
    }

    /// Sets the kind
    pub fn kind(mut self, kind: TransactionKind) -> Self {
        self.kind = kind;
        self
    }

    /// Adds a reference to an external object
    pub fn with_reference(mut self, reference: TransactionReference) -> Self {
        self.references.push(reference);
        self
    }
}

/// One leg of a draft
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitSpec {
    pub entry_point: Option<Account>,
    pub exit_point: Option<Account>,
    pub target: Account,
    /// Target flow amount (negative = money entering the target)
    pub amount: Decimal,
}

impl SplitSpec {
    /// A leg inside the source's system
    pub fn internal(target: &Account, amount: Decimal) -> Self {
        Self {
            entry_point: None,
            exit_point: None,
            target: target.clone(),
            amount,
        }
    }

    /// A leg leaving through `exit_point` and entering through `entry_point`
    pub fn crossing(
        exit_point: &Account,
        entry_point: &Account,
        target: &Account,
        amount: Decimal,
    ) -> Self {
        Self {
            entry_point: Some(entry_point.clone()),
            exit_point: Some(exit_point.clone()),
            target: target.clone(),
            amount,
        }
    }
}

/// An unvalidated transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionDraft {
    pub header: TransactionHeader,
    pub source: Account,
    /// Source flow amount (positive = money leaving the source)
    pub source_amount: Decimal,
    pub splits: Vec<SplitSpec>,
}

impl TransactionDraft {
    /// Moves `amount` from `source` to `target` inside one system
    pub fn simple(header: TransactionHeader, source: &Account, target: &Account, amount: Decimal) -> Self {
        Self {
            header,
            source: source.clone(),
            source_amount: amount,
            splits: vec![SplitSpec::internal(target, -amount)],
        }
    }

    /// Several internal legs from one source flow
    pub fn internal(header: TransactionHeader, source: &CashFlow, targets: &[(Account, Decimal)]) -> Self {
        Self {
            header,
            source: source.account.clone(),
            source_amount: source.amount,
            splits: targets
                .iter()
                .map(|(target, amount)| SplitSpec::internal(target, *amount))
                .collect(),
        }
    }

    /// A single leg crossing one system boundary; both points are required
    pub fn crossing(
        header: TransactionHeader,
        source: &Account,
        exit_point: Option<&Account>,
        entry_point: Option<&Account>,
        target: &Account,
        amount: Decimal,
    ) -> Result<Self, AccountingError> {
        let (Some(exit_point), Some(entry_point)) = (exit_point, entry_point) else {
            return Err(AccountingError::invalid_operation(
                "a crossing transaction needs both an exit point and an entry point",
            ));
        };
        Ok(Self {
            header,
            source: source.clone(),
            source_amount: amount,
            splits: vec![SplitSpec::crossing(exit_point, entry_point, target, -amount)],
        })
    }

    /// The general case
    pub fn split(
        header: TransactionHeader,
        source: &Account,
        source_amount: Decimal,
        splits: Vec<SplitSpec>,
    ) -> Self {
        Self {
            header,
            source: source.clone(),
            source_amount,
            splits,
        }
    }

    /// Every account referenced by the draft
    pub fn accounts(&self) -> impl Iterator<Item = &Account> {
        std::iter::once(&self.source).chain(self.splits.iter().flat_map(|s| {
            s.exit_point
                .iter()
                .chain(s.entry_point.iter())
                .chain(std::iter::once(&s.target))
        }))
    }

    /// Validates the draft and turns it into an unconfirmed transaction
    pub fn into_transaction(self, id: TransactionId) -> Result<Transaction, AccountingError> {
        validate_draft(&self)?;

        let source = CashFlow::new(self.source, self.source_amount)?;
        let splits = self
            .splits
            .into_iter()
            .map(|s| {
                Ok(Trajectory {
                    entry_point: s.entry_point,
                    exit_point: s.exit_point,
                    target: CashFlow::new(s.target, s.amount)?,
                })
            })
            .collect::<Result<Vec<_>, AccountingError>>()?;

        let mut references = self.header.references;
        references.sort();
        if references.windows(2).any(|w| w[0] == w[1]) {
            return Err(AccountingError::conflict("duplicate transaction reference"));
        }

        Ok(Transaction {
            id,
            date: self.header.date,
            description: self.header.description,
            issuer: self.header.issuer,
            source,
            splits,
            kind: self.header.kind,
            confirmed: false,
            references,
        })
    }
}

impl Accounting {
    /// Replaces every account of `draft` with its stored row
    ///
    /// Validation then sees the stored type, placeholder flag and system
    /// rather than whatever the caller's copy says.
    pub(crate) async fn reload_draft(&self, mut draft: TransactionDraft) -> Result<TransactionDraft, AccountingError> {
        draft.source = self.store().get_account(draft.source.id).await?;
        for split in &mut draft.splits {
            split.target = self.store().get_account(split.target.id).await?;
            for point in [&mut split.exit_point, &mut split.entry_point].into_iter().flatten() {
                *point = self.store().get_account(point.id).await?;
            }
        }
        Ok(draft)
    }

    /// Validates and persists a draft with its ledger entries
    ///
    /// Accounts are validated as stored, not as passed in.
    #[instrument(skip(self, draft), fields(issuer = %draft.header.issuer, kind = %draft.header.kind))]
    pub async fn register(&self, draft: TransactionDraft) -> Result<Transaction, AccountingError> {
        let draft = self.reload_draft(draft).await?;
        let transaction = draft.into_transaction(TransactionId::new_v7())?;
        let entries = self.store().insert_transaction(&transaction).await?;

        info!(
            transaction_id = %transaction.id,
            entries = entries.len(),
            "Registered transaction"
        );
        Ok(transaction)
    }

    /// Moves `amount` between two stock accounts of one system
    pub async fn register_simple_transaction(
        &self,
        header: TransactionHeader,
        source: &Account,
        target: &Account,
        amount: Decimal,
    ) -> Result<Transaction, AccountingError> {
        self.register(TransactionDraft::simple(header, source, target, amount))
            .await
    }

    /// Splits one source flow across several accounts of the same system
    pub async fn register_internal_transaction(
        &self,
        header: TransactionHeader,
        source: &CashFlow,
        targets: &[(Account, Decimal)],
    ) -> Result<Transaction, AccountingError> {
        self.register(TransactionDraft::internal(header, source, targets))
            .await
    }

    /// Moves `amount` across exactly one system boundary
    pub async fn register_transaction(
        &self,
        header: TransactionHeader,
        source: &Account,
        exit_point: Option<&Account>,
        entry_point: Option<&Account>,
        target: &Account,
        amount: Decimal,
    ) -> Result<Transaction, AccountingError> {
        let draft =
            TransactionDraft::crossing(header, source, exit_point, entry_point, target, amount)?;
        self.register(draft).await
    }

    /// Registers an arbitrary set of legs from one source flow
    pub async fn register_split_transaction(
        &self,
        header: TransactionHeader,
        source: &CashFlow,
        splits: Vec<SplitSpec>,
    ) -> Result<Transaction, AccountingError> {
        let draft = TransactionDraft::split(header, &source.account, source.amount, splits);
        self.register(draft).await
    }

    /// Replaces the legs of an existing transaction
    ///
    /// Identity, date, description, issuer, kind, the confirmed flag and the
    /// reference set are preserved; ledger entries are regenerated.
    #[instrument(skip(self, transaction, source, splits), fields(transaction_id = %transaction.id))]
    pub async fn update_transaction(
        &self,
        transaction: &Transaction,
        source: CashFlow,
        splits: Vec<SplitSpec>,
    ) -> Result<Transaction, AccountingError> {
        let stored = self.store().get_transaction(transaction.id).await?;
        let header = TransactionHeader {
            date: stored.date,
            description: stored.description.clone(),
            issuer: stored.issuer,
            kind: stored.kind.clone(),
            references: Vec::new(),
        };

        let draft = TransactionDraft::split(header, &source.account, source.amount, splits);
        let mut updated = self.reload_draft(draft).await?.into_transaction(stored.id)?;
        updated.confirmed = stored.confirmed;
        updated.references = stored.references;

        let entries = self.store().replace_transaction(&updated).await?;
        info!(entries = entries.len(), "Updated transaction");
        Ok(updated)
    }

    /// Marks a transaction as confirmed; allowed exactly once
    #[instrument(skip(self))]
    pub async fn confirm_transaction(&self, id: TransactionId) -> Result<Transaction, AccountingError> {
        let stored = self.store().get_transaction(id).await?;
        if stored.confirmed {
            return Err(AccountingError::invalid_operation(format!(
                "transaction {} is already confirmed",
                id
            )));
        }

        self.store().confirm_transaction(id).await.map_err(|e| {
            if e.is_conflict() {
                AccountingError::invalid_operation(format!("transaction {} is already confirmed", id))
            } else {
                e.into()
            }
        })?;

        debug!("Confirmed transaction");
        Ok(Transaction {
            confirmed: true,
            ..stored
        })
    }

    /// Loads a transaction
    pub async fn transaction(&self, id: TransactionId) -> Result<Transaction, AccountingError> {
        Ok(self.store().get_transaction(id).await?)
    }

    /// Attaches one reference; duplicates fail with `Conflict`
    pub async fn add_reference(
        &self,
        id: TransactionId,
        reference: TransactionReference,
    ) -> Result<(), AccountingError> {
        self.add_references(id, vec![reference]).await
    }

    /// Attaches several references atomically
    #[instrument(skip(self, references), fields(count = references.len()))]
    pub async fn add_references(
        &self,
        id: TransactionId,
        mut references: Vec<TransactionReference>,
    ) -> Result<(), AccountingError> {
        references.sort();
        if references.windows(2).any(|w| w[0] == w[1]) {
            return Err(AccountingError::conflict("duplicate transaction reference"));
        }
        self.store().add_references(id, &references).await?;
        Ok(())
    }

    /// Ledger entries produced by a transaction
    pub async fn entries_for_transaction(
        &self,
        id: TransactionId,
    ) -> Result<Vec<LedgerEntry>, AccountingError> {
        let mut entries = self.store().entries_for_transaction(id).await?;
        entries.sort_by_key(|e| (e.account, e.entry_id));
        Ok(entries)
    }
}
