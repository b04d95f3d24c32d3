//! PostgreSQL Accounting Adapter
//!
//! Implements the `AccountingStore` port on top of [`AccountingRepository`].
//! Every mutating operation runs in one SQL transaction; entry numbering
//! happens while the touched accounts are row-locked.
//!
//! # Example
//!
//! ```rust,ignore
//! use infra_db::{connect_store, DatabaseConfig};
//! use domain_accounting::{Accounting, AccountingConfig};
//! use std::sync::Arc;
//!
//! let store = connect_store(&DatabaseConfig::from_env()?).await?;
//! let store = Arc::new(store);
//! let accounting = Accounting::new(store, AccountingConfig::from_env()?).await?;
//! ```

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};
use std::collections::HashMap;
use std::str::FromStr;
use tracing::{debug, instrument};
use uuid::Uuid;

use core_kernel::{
    AccountId, AccountSystemId, DomainPort, HealthCheckResult, HealthCheckable, InvoiceId,
    PortError, SubjectId, TransactionId,
};
use domain_accounting::ledger::EntrySequencer;
use domain_accounting::{
    Account, AccountSystem, AccountType, AccountingStore, BaseAccountType, CashFlow, Invoice,
    InvoiceStatus, LedgerEntry, LedgerStamp, Subject, SubjectKind, Trajectory, Transaction,
    TransactionKind, TransactionReference,
};

use crate::error::DatabaseError;
use crate::repositories::accounting::{
    self as repo, AccountRow, AccountTypeRow, AccountingRepository, EntryRow, InvoiceRow,
    NewEntry, ReferenceRow, SubjectRow, SystemRow, TrajectoryRow, TransactionRow,
};

const ADAPTER_ID: &str = "postgres-accounting-store";

/// PostgreSQL-backed implementation of the `AccountingStore` port
///
/// Database errors are translated through `From<DatabaseError> for PortError`;
/// stored values that no longer map onto domain values surface as
/// `PortError::Corrupted`.
#[derive(Debug, Clone)]
pub struct PostgresAccountingStore {
    repository: AccountingRepository,
    pool: PgPool,
}

impl PostgresAccountingStore {
    /// Creates a new store with the given connection pool
    pub fn new(pool: PgPool) -> Self {
        Self {
            repository: AccountingRepository::new(pool.clone()),
            pool,
        }
    }

    pub fn repository(&self) -> &AccountingRepository {
        &self.repository
    }

    async fn begin(&self) -> Result<sqlx::Transaction<'static, sqlx::Postgres>, PortError> {
        Ok(self.pool.begin().await.map_err(DatabaseError::from)?)
    }

    /// Loads the accounts referenced by `ids`; every id must exist
    async fn accounts_map(&self, ids: &[Uuid]) -> Result<HashMap<Uuid, Account>, PortError> {
        let rows = self.repository.accounts_by_ids(ids).await?;
        let mut accounts = HashMap::with_capacity(rows.len());
        for row in rows {
            accounts.insert(row.account_id, row_to_account(row)?);
        }
        if let Some(missing) = ids.iter().find(|id| !accounts.contains_key(*id)) {
            return Err(PortError::not_found("Account", AccountId::from_uuid(*missing)));
        }
        Ok(accounts)
    }

    async fn load_transaction(&self, row: TransactionRow) -> Result<Transaction, PortError> {
        let trajectories = self.repository.trajectories(row.transaction_id).await?;
        let references = self.repository.references(row.transaction_id).await?;

        let mut ids = vec![row.source_account_id];
        for leg in &trajectories {
            ids.push(leg.target_account_id);
            ids.extend(leg.exit_point_id);
            ids.extend(leg.entry_point_id);
        }
        ids.sort();
        ids.dedup();
        let accounts = self.accounts_map(&ids).await?;
        let lookup = |id: Uuid| -> Result<Account, PortError> {
            accounts
                .get(&id)
                .cloned()
                .ok_or_else(|| PortError::not_found("Account", AccountId::from_uuid(id)))
        };

        let source = CashFlow::new(lookup(row.source_account_id)?, row.source_amount).map_err(corrupted)?;
        let mut splits = Vec::with_capacity(trajectories.len());
        for leg in trajectories {
            let target = CashFlow::new(lookup(leg.target_account_id)?, leg.target_amount).map_err(corrupted)?;
            let trajectory = match (leg.exit_point_id, leg.entry_point_id) {
                (Some(exit), Some(entry)) => Trajectory::crossing(lookup(exit)?, lookup(entry)?, target),
                (None, None) => Trajectory::internal(target),
                _ => {
                    return Err(PortError::corrupted(format!(
                        "trajectory {} of transaction {} has only one boundary account",
                        leg.position, row.transaction_id
                    )))
                }
            };
            splits.push(trajectory);
        }

        Ok(Transaction {
            id: TransactionId::from_uuid(row.transaction_id),
            date: row.date,
            description: row.description,
            issuer: SubjectId::from_uuid(row.issuer_id),
            source,
            splits,
            kind: TransactionKind::from_tag(&row.kind),
            confirmed: row.confirmed,
            references: references
                .into_iter()
                .map(|r| TransactionReference {
                    kind: r.kind,
                    id: r.reference_id,
                })
                .collect(),
        })
    }
}

impl DomainPort for PostgresAccountingStore {}

#[async_trait]
impl HealthCheckable for PostgresAccountingStore {
    async fn health_check(&self) -> HealthCheckResult {
        let start = std::time::Instant::now();

        let result = sqlx::query("SELECT 1").execute(&self.pool).await;

        let latency_ms = start.elapsed().as_millis() as u64;

        match result {
            Ok(_) => HealthCheckResult::healthy(ADAPTER_ID, latency_ms),
            Err(e) => HealthCheckResult::unhealthy(ADAPTER_ID, latency_ms, format!("Database error: {}", e)),
        }
    }
}

#[async_trait]
impl AccountingStore for PostgresAccountingStore {
    async fn save_account_type(&self, account_type: &AccountType) -> Result<(), PortError> {
        let row = AccountTypeRow {
            name: account_type.name().to_string(),
            base_type: account_type.base_type().as_str().to_string(),
        };
        let stored = self.repository.upsert_account_type(&row).await?;
        if stored.base_type != row.base_type {
            return Err(PortError::conflict(format!(
                "account type {} exists with base {}",
                stored.name, stored.base_type
            )));
        }
        Ok(())
    }

    async fn account_types(&self) -> Result<Vec<AccountType>, PortError> {
        self.repository
            .account_types()
            .await?
            .into_iter()
            .map(|row| account_type_from(&row.name, &row.base_type))
            .collect()
    }

    #[instrument(skip(self, subject), fields(subject = %subject))]
    async fn insert_subject(&self, subject: &Subject) -> Result<(), PortError> {
        let row = SubjectRow {
            subject_id: *subject.id.as_uuid(),
            kind: subject.kind.as_str().to_string(),
            external_id: subject.external_id.clone(),
        };
        self.repository.insert_subject(&row).await?;
        Ok(())
    }

    async fn get_subject(&self, id: SubjectId) -> Result<Subject, PortError> {
        let row = self.repository.get_subject(*id.as_uuid()).await?;
        Ok(row_to_subject(row))
    }

    async fn find_subject(&self, kind: &SubjectKind, external_id: &str) -> Result<Option<Subject>, PortError> {
        let row = self.repository.find_subject(kind.as_str(), external_id).await?;
        Ok(row.map(row_to_subject))
    }

    #[instrument(skip(self), fields(subject_id = %id))]
    async fn delete_subject(&self, id: SubjectId) -> Result<(), PortError> {
        let subject = *id.as_uuid();
        let mut tx = self.begin().await?;

        if !repo::subject_exists(&mut tx, subject).await? {
            return Err(PortError::not_found("Subject", id));
        }
        let accounts = repo::accounts_of_subject(&mut tx, subject).await?;
        if repo::any_entries(&mut tx, &accounts).await? {
            return Err(PortError::conflict(format!(
                "subject {} owns accounts with ledger entries",
                id
            )));
        }
        if repo::subject_in_use(&mut tx, subject).await? {
            return Err(PortError::conflict(format!(
                "subject {} issued transactions or has invoices",
                id
            )));
        }
        repo::delete_subject(&mut tx, subject).await?;

        tx.commit().await.map_err(DatabaseError::from)?;
        debug!(accounts = accounts.len(), "Deleted subject");
        Ok(())
    }

    #[instrument(skip(self, system, accounts), fields(system_id = %system.id))]
    async fn create_system(&self, system: &AccountSystem, accounts: &[Account]) -> Result<(), PortError> {
        if accounts.iter().filter(|a| a.is_root()).count() != 1 {
            return Err(PortError::validation("a new system needs exactly one root"));
        }

        let mut tx = self.begin().await?;
        if !repo::subject_exists(&mut tx, *system.owner.as_uuid()).await? {
            return Err(PortError::not_found("Subject", system.owner));
        }
        let row = SystemRow {
            system_id: *system.id.as_uuid(),
            owner_id: *system.owner.as_uuid(),
        };
        repo::insert_system(&mut tx, &row).await?;

        // parents before children
        let mut ordered: Vec<&Account> = accounts.iter().collect();
        ordered.sort_by_key(|a| a.path.len());
        for account in ordered {
            repo::insert_account(&mut tx, &account_to_row(account)).await?;
        }

        tx.commit().await.map_err(DatabaseError::from)?;
        Ok(())
    }

    async fn system_of(&self, owner: SubjectId) -> Result<Option<AccountSystem>, PortError> {
        let row = self.repository.system_of(*owner.as_uuid()).await?;
        Ok(row.map(row_to_system))
    }

    async fn get_system(&self, id: AccountSystemId) -> Result<AccountSystem, PortError> {
        let row = self.repository.get_system(*id.as_uuid()).await?;
        Ok(row_to_system(row))
    }

    #[instrument(skip(self, account), fields(path = %account.path))]
    async fn insert_account(&self, account: &Account) -> Result<(), PortError> {
        let mut tx = self.begin().await?;

        if !repo::system_exists(&mut tx, *account.system.as_uuid()).await? {
            return Err(PortError::not_found("AccountSystem", account.system));
        }
        if let Some(parent) = account.parent {
            match repo::system_of_account(&mut tx, *parent.as_uuid()).await? {
                None => return Err(PortError::not_found("Account", parent)),
                Some(system) if system != *account.system.as_uuid() => {
                    return Err(PortError::validation("parent belongs to another system"))
                }
                Some(_) => {}
            }
        }
        repo::insert_account(&mut tx, &account_to_row(account)).await?;

        tx.commit().await.map_err(DatabaseError::from)?;
        Ok(())
    }

    async fn get_account(&self, id: AccountId) -> Result<Account, PortError> {
        row_to_account(self.repository.get_account(*id.as_uuid()).await?)
    }

    async fn roots(&self, system: AccountSystemId) -> Result<Vec<Account>, PortError> {
        rows_to_accounts(self.repository.roots(*system.as_uuid()).await?)
    }

    async fn child(&self, parent: AccountId, name: &str) -> Result<Option<Account>, PortError> {
        self.repository
            .child(*parent.as_uuid(), name)
            .await?
            .map(row_to_account)
            .transpose()
    }

    async fn children(&self, parent: AccountId) -> Result<Vec<Account>, PortError> {
        rows_to_accounts(self.repository.children(*parent.as_uuid()).await?)
    }

    async fn accounts_in_system(&self, system: AccountSystemId) -> Result<Vec<Account>, PortError> {
        rows_to_accounts(self.repository.accounts_in_system(*system.as_uuid()).await?)
    }

    async fn accounts_of_type(&self, type_name: &str) -> Result<Vec<Account>, PortError> {
        rows_to_accounts(self.repository.accounts_of_type(type_name).await?)
    }

    #[instrument(skip(self), fields(account_id = %id))]
    async fn delete_account(&self, id: AccountId) -> Result<(), PortError> {
        let account = *id.as_uuid();
        let mut tx = self.begin().await?;

        if repo::system_of_account(&mut tx, account).await?.is_none() {
            return Err(PortError::not_found("Account", id));
        }
        if repo::has_children(&mut tx, account).await? {
            return Err(PortError::conflict(format!("account {} has children", id)));
        }
        if repo::any_entries(&mut tx, &[account]).await? {
            return Err(PortError::conflict(format!("account {} has ledger entries", id)));
        }
        repo::delete_account(&mut tx, account).await?;

        tx.commit().await.map_err(DatabaseError::from)?;
        Ok(())
    }

    #[instrument(skip(self, transaction), fields(transaction_id = %transaction.id))]
    async fn insert_transaction(&self, transaction: &Transaction) -> Result<Vec<LedgerEntry>, PortError> {
        let mut tx = self.begin().await?;
        if repo::lock_transaction(&mut tx, *transaction.id.as_uuid()).await? {
            return Err(PortError::conflict(format!(
                "transaction {} already exists",
                transaction.id
            )));
        }
        let entries = write_transaction(&mut tx, transaction).await?;
        tx.commit().await.map_err(DatabaseError::from)?;

        debug!(entries = entries.len(), "Stored transaction");
        Ok(entries)
    }

    #[instrument(skip(self, transaction), fields(transaction_id = %transaction.id))]
    async fn replace_transaction(&self, transaction: &Transaction) -> Result<Vec<LedgerEntry>, PortError> {
        let id = *transaction.id.as_uuid();
        let mut tx = self.begin().await?;
        if !repo::lock_transaction(&mut tx, id).await? {
            return Err(PortError::not_found("Transaction", transaction.id));
        }

        // accounts losing entries are locked and re-stamped too
        let previous = repo::entry_accounts_of(&mut tx, id).await?;
        lock_for(&mut tx, transaction, &previous).await?;
        repo::delete_legs(&mut tx, id).await?;
        repo::update_transaction(&mut tx, &transaction_to_row(transaction)).await?;
        insert_legs(&mut tx, transaction).await?;
        let entries = write_entries(&mut tx, transaction, &previous).await?;

        tx.commit().await.map_err(DatabaseError::from)?;
        Ok(entries)
    }

    async fn get_transaction(&self, id: TransactionId) -> Result<Transaction, PortError> {
        let row = self.repository.get_transaction(*id.as_uuid()).await?;
        self.load_transaction(row).await
    }

    #[instrument(skip(self), fields(transaction_id = %id))]
    async fn confirm_transaction(&self, id: TransactionId) -> Result<(), PortError> {
        let mut tx = self.begin().await?;
        if !repo::lock_transaction(&mut tx, *id.as_uuid()).await? {
            return Err(PortError::not_found("Transaction", id));
        }
        if !repo::confirm_transaction(&mut tx, *id.as_uuid()).await? {
            return Err(PortError::conflict(format!("transaction {} is already confirmed", id)));
        }
        tx.commit().await.map_err(DatabaseError::from)?;
        Ok(())
    }

    async fn add_references(&self, id: TransactionId, references: &[TransactionReference]) -> Result<(), PortError> {
        let mut tx = self.begin().await?;
        if !repo::lock_transaction(&mut tx, *id.as_uuid()).await? {
            return Err(PortError::not_found("Transaction", id));
        }
        repo::insert_references(&mut tx, *id.as_uuid(), &reference_rows(references)).await?;
        tx.commit().await.map_err(DatabaseError::from)?;
        Ok(())
    }

    async fn entries_for_account(&self, account: AccountId) -> Result<Vec<LedgerEntry>, PortError> {
        // missing accounts are NotFound, not an empty ledger
        self.repository.ledger_stamp(*account.as_uuid()).await?;
        rows_to_entries(self.repository.entries_for_account(*account.as_uuid()).await?)
    }

    async fn entries_for_transaction(&self, id: TransactionId) -> Result<Vec<LedgerEntry>, PortError> {
        self.repository.get_transaction(*id.as_uuid()).await?;
        rows_to_entries(self.repository.entries_for_transaction(*id.as_uuid()).await?)
    }

    async fn ledger_stamp(&self, account: AccountId) -> Result<LedgerStamp, PortError> {
        let row = self.repository.ledger_stamp(*account.as_uuid()).await?;
        Ok(LedgerStamp {
            last_entry_id: to_u64(row.last_entry_id)?,
            entry_count: to_u64(row.entry_count)?,
            revision: to_u64(row.revision)?,
        })
    }

    async fn account_balance(&self, account: AccountId) -> Result<Decimal, PortError> {
        Ok(self.repository.account_balance(*account.as_uuid()).await?)
    }

    #[instrument(skip(self, invoice), fields(invoice_id = %invoice.id))]
    async fn insert_invoice(&self, invoice: &Invoice) -> Result<(), PortError> {
        self.repository.insert_invoice(&invoice_to_row(invoice)).await?;
        Ok(())
    }

    async fn get_invoice(&self, id: InvoiceId) -> Result<Invoice, PortError> {
        row_to_invoice(self.repository.get_invoice(*id.as_uuid()).await?)
    }

    #[instrument(skip(self), fields(invoice_id = %id, status = %status))]
    async fn update_invoice_status(
        &self,
        id: InvoiceId,
        expected: InvoiceStatus,
        status: InvoiceStatus,
    ) -> Result<(), PortError> {
        let mut tx = self.begin().await?;
        check_invoice_status(&mut tx, id, expected).await?;
        repo::set_invoice_status(&mut tx, *id.as_uuid(), status.as_str()).await?;
        tx.commit().await.map_err(DatabaseError::from)?;
        Ok(())
    }

    #[instrument(skip(self, transactions), fields(invoice_id = %id, status = %status))]
    async fn settle_invoice(
        &self,
        id: InvoiceId,
        expected: InvoiceStatus,
        status: InvoiceStatus,
        transactions: &[Transaction],
    ) -> Result<Vec<LedgerEntry>, PortError> {
        let mut tx = self.begin().await?;
        check_invoice_status(&mut tx, id, expected).await?;

        let mut entries = Vec::new();
        for transaction in transactions {
            entries.extend(write_transaction(&mut tx, transaction).await?);
        }
        repo::set_invoice_status(&mut tx, *id.as_uuid(), status.as_str()).await?;

        tx.commit().await.map_err(DatabaseError::from)?;
        debug!(transactions = transactions.len(), "Settled invoice");
        Ok(entries)
    }
}

// ============================================================================
// Transactional helpers
// ============================================================================

fn touched_uuids(transaction: &Transaction) -> Vec<Uuid> {
    transaction
        .touched_accounts()
        .iter()
        .map(|id| *id.as_uuid())
        .collect()
}

/// Locks every account `transaction` touches, plus `also`
///
/// Each account snapshot in `transaction` must equal the locked row.
async fn lock_for(conn: &mut PgConnection, transaction: &Transaction, also: &[Uuid]) -> Result<(), PortError> {
    let mut ids = touched_uuids(transaction);
    ids.extend_from_slice(also);
    ids.sort_unstable();
    ids.dedup();

    let mut stored = HashMap::with_capacity(ids.len());
    for row in repo::lock_accounts(conn, &ids).await? {
        stored.insert(row.account_id, row_to_account(row)?);
    }
    if let Some(missing) = ids.iter().find(|id| !stored.contains_key(*id)) {
        return Err(PortError::not_found("Account", AccountId::from_uuid(*missing)));
    }
    for account in transaction.accounts() {
        if stored.get(account.id.as_uuid()) != Some(account) {
            return Err(PortError::conflict(format!(
                "account {} does not match the stored account",
                account.id
            )));
        }
    }
    Ok(())
}

async fn insert_legs(conn: &mut PgConnection, transaction: &Transaction) -> Result<(), PortError> {
    let id = *transaction.id.as_uuid();
    for (position, leg) in transaction.splits.iter().enumerate() {
        let row = TrajectoryRow {
            position: position as i32,
            exit_point_id: leg.exit_point.as_ref().map(|a| *a.id.as_uuid()),
            entry_point_id: leg.entry_point.as_ref().map(|a| *a.id.as_uuid()),
            target_account_id: *leg.target.account.id.as_uuid(),
            target_amount: leg.target.amount,
        };
        repo::insert_trajectory(conn, id, &row).await?;
    }
    Ok(())
}

/// Numbers and inserts the entries of `transaction`, then bumps the ledger
/// revision of every touched account and of `also`; accounts must be locked
async fn write_entries(
    conn: &mut PgConnection,
    transaction: &Transaction,
    also: &[Uuid],
) -> Result<Vec<LedgerEntry>, PortError> {
    let mut touched = touched_uuids(transaction);
    let mut maxima = HashMap::with_capacity(touched.len());
    for (id, last) in repo::last_entry_ids(conn, &touched).await? {
        maxima.insert(AccountId::from_uuid(id), to_u64(last)?);
    }
    let entries = EntrySequencer::new(maxima).materialize(transaction);

    for entry in &entries {
        let row = NewEntry {
            account_id: *entry.account.as_uuid(),
            entry_id: entry.entry_id as i64,
            transaction_id: *entry.transaction.as_uuid(),
            amount: entry.amount,
        };
        repo::insert_entry(conn, &row).await?;
    }

    touched.extend_from_slice(also);
    touched.sort_unstable();
    touched.dedup();
    repo::bump_revisions(conn, &touched).await?;
    Ok(entries)
}

/// Inserts a new transaction with its legs, references and numbered entries
async fn write_transaction(conn: &mut PgConnection, transaction: &Transaction) -> Result<Vec<LedgerEntry>, PortError> {
    lock_for(conn, transaction, &[]).await?;
    repo::insert_transaction(conn, &transaction_to_row(transaction)).await?;
    insert_legs(conn, transaction).await?;
    repo::insert_references(conn, *transaction.id.as_uuid(), &reference_rows(&transaction.references)).await?;
    write_entries(conn, transaction, &[]).await
}

async fn check_invoice_status(
    conn: &mut PgConnection,
    id: InvoiceId,
    expected: InvoiceStatus,
) -> Result<(), PortError> {
    let stored = repo::lock_invoice_status(conn, *id.as_uuid())
        .await?
        .ok_or_else(|| PortError::not_found("Invoice", id))?;
    let stored = parse_status(&stored)?;
    if stored != expected {
        return Err(PortError::conflict(format!(
            "invoice {} is {}, expected {}",
            id, stored, expected
        )));
    }
    Ok(())
}

// ============================================================================
// Row conversions
// ============================================================================

fn corrupted(error: impl std::fmt::Display) -> PortError {
    PortError::corrupted(error.to_string())
}

fn to_u64(value: i64) -> Result<u64, PortError> {
    u64::try_from(value).map_err(corrupted)
}

fn account_type_from(name: &str, base_type: &str) -> Result<AccountType, PortError> {
    let base = BaseAccountType::from_str(base_type).map_err(corrupted)?;
    Ok(AccountType::new(name, base))
}

fn row_to_subject(row: SubjectRow) -> Subject {
    Subject {
        id: SubjectId::from_uuid(row.subject_id),
        kind: SubjectKind::new(&row.kind),
        external_id: row.external_id,
    }
}

fn row_to_system(row: SystemRow) -> AccountSystem {
    AccountSystem {
        id: AccountSystemId::from_uuid(row.system_id),
        owner: SubjectId::from_uuid(row.owner_id),
    }
}

fn row_to_account(row: AccountRow) -> Result<Account, PortError> {
    Ok(Account {
        id: AccountId::from_uuid(row.account_id),
        system: AccountSystemId::from_uuid(row.system_id),
        parent: row.parent_id.map(AccountId::from_uuid),
        account_type: account_type_from(&row.type_name, &row.base_type)?,
        name: row.name,
        is_placeholder: row.is_placeholder,
        path: row.path,
    })
}

fn rows_to_accounts(rows: Vec<AccountRow>) -> Result<Vec<Account>, PortError> {
    rows.into_iter().map(row_to_account).collect()
}

fn account_to_row(account: &Account) -> AccountRow {
    AccountRow {
        account_id: *account.id.as_uuid(),
        system_id: *account.system.as_uuid(),
        parent_id: account.parent.map(|p| *p.as_uuid()),
        name: account.name.clone(),
        type_name: account.account_type.name().to_string(),
        base_type: account.base_type().as_str().to_string(),
        is_placeholder: account.is_placeholder,
        path: account.path.clone(),
    }
}

fn transaction_to_row(transaction: &Transaction) -> TransactionRow {
    TransactionRow {
        transaction_id: *transaction.id.as_uuid(),
        date: transaction.date,
        description: transaction.description.clone(),
        issuer_id: *transaction.issuer.as_uuid(),
        source_account_id: *transaction.source.account.id.as_uuid(),
        source_amount: transaction.source.amount,
        kind: transaction.kind.as_str().to_string(),
        confirmed: transaction.confirmed,
    }
}

fn reference_rows(references: &[TransactionReference]) -> Vec<ReferenceRow> {
    references
        .iter()
        .map(|r| ReferenceRow {
            kind: r.kind.clone(),
            reference_id: r.id.clone(),
        })
        .collect()
}

fn rows_to_entries(rows: Vec<EntryRow>) -> Result<Vec<LedgerEntry>, PortError> {
    rows.into_iter()
        .map(|row| {
            Ok(LedgerEntry {
                account: AccountId::from_uuid(row.account_id),
                transaction: TransactionId::from_uuid(row.transaction_id),
                entry_id: to_u64(row.entry_id)?,
                amount: row.amount,
                date: row.date,
                description: row.description,
                issuer: SubjectId::from_uuid(row.issuer_id),
            })
        })
        .collect()
}

fn parse_status(tag: &str) -> Result<InvoiceStatus, PortError> {
    InvoiceStatus::from_tag(tag)
        .ok_or_else(|| PortError::corrupted(format!("unknown invoice status {}", tag)))
}

fn invoice_to_row(invoice: &Invoice) -> InvoiceRow {
    InvoiceRow {
        invoice_id: *invoice.id.as_uuid(),
        issuer_id: *invoice.issuer.as_uuid(),
        recipient_id: *invoice.recipient.as_uuid(),
        net_amount: invoice.net_amount,
        taxes: invoice.taxes,
        issue_date: invoice.issue_date,
        due_date: invoice.due_date,
        status: invoice.status.as_str().to_string(),
        document: invoice.document.clone(),
    }
}

fn row_to_invoice(row: InvoiceRow) -> Result<Invoice, PortError> {
    Ok(Invoice {
        id: InvoiceId::from_uuid(row.invoice_id),
        issuer: SubjectId::from_uuid(row.issuer_id),
        recipient: SubjectId::from_uuid(row.recipient_id),
        net_amount: row.net_amount,
        taxes: row.taxes,
        issue_date: row.issue_date,
        due_date: row.due_date,
        status: parse_status(&row.status)?,
        document: row.document,
    })
}
