//! Accounting repository implementation
//!
//! Row types and SQL for the accounting schema. Reads run against the pool;
//! write steps are free functions over a `PgConnection` so the adapter can
//! compose several of them inside one SQL transaction.
//!
//! # Entry numbering
//!
//! The next entry id of an account is `MAX(entry_id) + 1` over its current
//! entries. Writers first take [`lock_accounts`] (`FOR UPDATE`, rows locked in
//! id order), so concurrent writers touching the same account serialize and
//! [`last_entry_ids`] is stable until commit. `accounts.ledger_revision` is
//! bumped by every ledger write and never decreases.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::error::DatabaseError;

const ACCOUNT_SELECT: &str = r#"
    SELECT a.account_id, a.system_id, a.parent_id, a.name, a.type_name,
           t.base_type, a.is_placeholder, a.path
    FROM accounts a
    JOIN account_types t ON t.name = a.type_name
"#;

const ENTRY_SELECT: &str = r#"
    SELECT e.account_id, e.entry_id, e.transaction_id, e.amount,
           t.date, t.description, t.issuer_id
    FROM ledger_entries e
    JOIN transactions t ON t.transaction_id = e.transaction_id
"#;

const INVOICE_SELECT: &str = r#"
    SELECT invoice_id, issuer_id, recipient_id, net_amount, taxes,
           issue_date, due_date, status, document
    FROM invoices
"#;

/// Database row for an account type
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AccountTypeRow {
    pub name: String,
    pub base_type: String,
}

/// Database row for a subject
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SubjectRow {
    pub subject_id: Uuid,
    pub kind: String,
    pub external_id: String,
}

/// Database row for an accounting system
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SystemRow {
    pub system_id: Uuid,
    pub owner_id: Uuid,
}

/// Database row for an account, joined with its type's base
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AccountRow {
    pub account_id: Uuid,
    pub system_id: Uuid,
    pub parent_id: Option<Uuid>,
    pub name: String,
    pub type_name: String,
    pub base_type: String,
    pub is_placeholder: bool,
    pub path: String,
}

/// Database row for a transaction header and source flow
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TransactionRow {
    pub transaction_id: Uuid,
    pub date: DateTime<Utc>,
    pub description: String,
    pub issuer_id: Uuid,
    pub source_account_id: Uuid,
    pub source_amount: Decimal,
    pub kind: String,
    pub confirmed: bool,
}

/// Database row for one leg of a transaction
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TrajectoryRow {
    pub position: i32,
    pub exit_point_id: Option<Uuid>,
    pub entry_point_id: Option<Uuid>,
    pub target_account_id: Uuid,
    pub target_amount: Decimal,
}

/// Database row for a transaction reference
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct ReferenceRow {
    pub kind: String,
    pub reference_id: String,
}

/// Database row for a ledger entry, joined with its transaction header
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct EntryRow {
    pub account_id: Uuid,
    pub entry_id: i64,
    pub transaction_id: Uuid,
    pub amount: Decimal,
    pub date: DateTime<Utc>,
    pub description: String,
    pub issuer_id: Uuid,
}

/// Ledger position of an account
#[derive(Debug, Clone, Copy, sqlx::FromRow)]
pub struct StampRow {
    pub last_entry_id: i64,
    pub entry_count: i64,
    pub revision: i64,
}

/// Database row for an invoice
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct InvoiceRow {
    pub invoice_id: Uuid,
    pub issuer_id: Uuid,
    pub recipient_id: Uuid,
    pub net_amount: Decimal,
    pub taxes: Option<Decimal>,
    pub issue_date: NaiveDate,
    pub due_date: NaiveDate,
    pub status: String,
    pub document: Option<String>,
}

/// Data for a new ledger entry
#[derive(Debug, Clone)]
pub struct NewEntry {
    pub account_id: Uuid,
    pub entry_id: i64,
    pub transaction_id: Uuid,
    pub amount: Decimal,
}

/// Read access to the accounting tables
#[derive(Debug, Clone)]
pub struct AccountingRepository {
    pool: PgPool,
}

impl AccountingRepository {
    /// Creates a new AccountingRepository with the given connection pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn account_types(&self) -> Result<Vec<AccountTypeRow>, DatabaseError> {
        let rows = sqlx::query_as::<_, AccountTypeRow>("SELECT name, base_type FROM account_types")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    /// Inserts a type unless present and returns the stored row
    pub async fn upsert_account_type(&self, row: &AccountTypeRow) -> Result<AccountTypeRow, DatabaseError> {
        sqlx::query("INSERT INTO account_types (name, base_type) VALUES ($1, $2) ON CONFLICT (name) DO NOTHING")
            .bind(&row.name)
            .bind(&row.base_type)
            .execute(&self.pool)
            .await?;

        let stored = sqlx::query_as::<_, AccountTypeRow>(
            "SELECT name, base_type FROM account_types WHERE name = $1",
        )
        .bind(&row.name)
        .fetch_one(&self.pool)
        .await?;
        Ok(stored)
    }

    pub async fn insert_subject(&self, row: &SubjectRow) -> Result<(), DatabaseError> {
        sqlx::query("INSERT INTO subjects (subject_id, kind, external_id) VALUES ($1, $2, $3)")
            .bind(row.subject_id)
            .bind(&row.kind)
            .bind(&row.external_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn get_subject(&self, id: Uuid) -> Result<SubjectRow, DatabaseError> {
        sqlx::query_as::<_, SubjectRow>(
            "SELECT subject_id, kind, external_id FROM subjects WHERE subject_id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DatabaseError::not_found("Subject", id))
    }

    pub async fn find_subject(&self, kind: &str, external_id: &str) -> Result<Option<SubjectRow>, DatabaseError> {
        let row = sqlx::query_as::<_, SubjectRow>(
            "SELECT subject_id, kind, external_id FROM subjects WHERE kind = $1 AND external_id = $2",
        )
        .bind(kind)
        .bind(external_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn system_of(&self, owner: Uuid) -> Result<Option<SystemRow>, DatabaseError> {
        let row = sqlx::query_as::<_, SystemRow>(
            "SELECT system_id, owner_id FROM account_systems WHERE owner_id = $1",
        )
        .bind(owner)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn get_system(&self, id: Uuid) -> Result<SystemRow, DatabaseError> {
        sqlx::query_as::<_, SystemRow>(
            "SELECT system_id, owner_id FROM account_systems WHERE system_id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DatabaseError::not_found("AccountSystem", id))
    }

    pub async fn get_account(&self, id: Uuid) -> Result<AccountRow, DatabaseError> {
        sqlx::query_as::<_, AccountRow>(&format!("{ACCOUNT_SELECT} WHERE a.account_id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DatabaseError::not_found("Account", id))
    }

    /// Accounts with the given ids; missing ids are skipped
    pub async fn accounts_by_ids(&self, ids: &[Uuid]) -> Result<Vec<AccountRow>, DatabaseError> {
        let rows = sqlx::query_as::<_, AccountRow>(&format!("{ACCOUNT_SELECT} WHERE a.account_id = ANY($1)"))
            .bind(ids)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    pub async fn roots(&self, system: Uuid) -> Result<Vec<AccountRow>, DatabaseError> {
        let rows = sqlx::query_as::<_, AccountRow>(&format!(
            "{ACCOUNT_SELECT} WHERE a.system_id = $1 AND a.parent_id IS NULL"
        ))
        .bind(system)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn child(&self, parent: Uuid, name: &str) -> Result<Option<AccountRow>, DatabaseError> {
        let row = sqlx::query_as::<_, AccountRow>(&format!(
            "{ACCOUNT_SELECT} WHERE a.parent_id = $1 AND a.name = $2"
        ))
        .bind(parent)
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn children(&self, parent: Uuid) -> Result<Vec<AccountRow>, DatabaseError> {
        let rows = sqlx::query_as::<_, AccountRow>(&format!(
            "{ACCOUNT_SELECT} WHERE a.parent_id = $1 ORDER BY a.name"
        ))
        .bind(parent)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn accounts_in_system(&self, system: Uuid) -> Result<Vec<AccountRow>, DatabaseError> {
        let rows = sqlx::query_as::<_, AccountRow>(&format!(
            "{ACCOUNT_SELECT} WHERE a.system_id = $1 ORDER BY a.path"
        ))
        .bind(system)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn accounts_of_type(&self, type_name: &str) -> Result<Vec<AccountRow>, DatabaseError> {
        let rows = sqlx::query_as::<_, AccountRow>(&format!(
            "{ACCOUNT_SELECT} WHERE a.type_name = $1 ORDER BY a.account_id"
        ))
        .bind(type_name)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn get_transaction(&self, id: Uuid) -> Result<TransactionRow, DatabaseError> {
        sqlx::query_as::<_, TransactionRow>(
            r#"
            SELECT transaction_id, date, description, issuer_id,
                   source_account_id, source_amount, kind, confirmed
            FROM transactions
            WHERE transaction_id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DatabaseError::not_found("Transaction", id))
    }

    pub async fn trajectories(&self, transaction: Uuid) -> Result<Vec<TrajectoryRow>, DatabaseError> {
        let rows = sqlx::query_as::<_, TrajectoryRow>(
            r#"
            SELECT position, exit_point_id, entry_point_id, target_account_id, target_amount
            FROM trajectories
            WHERE transaction_id = $1
            ORDER BY position
            "#,
        )
        .bind(transaction)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn references(&self, transaction: Uuid) -> Result<Vec<ReferenceRow>, DatabaseError> {
        let rows = sqlx::query_as::<_, ReferenceRow>(
            "SELECT kind, reference_id FROM transaction_references WHERE transaction_id = $1 ORDER BY kind, reference_id",
        )
        .bind(transaction)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn entries_for_account(&self, account: Uuid) -> Result<Vec<EntryRow>, DatabaseError> {
        let rows = sqlx::query_as::<_, EntryRow>(&format!(
            "{ENTRY_SELECT} WHERE e.account_id = $1 ORDER BY e.entry_id"
        ))
        .bind(account)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn entries_for_transaction(&self, transaction: Uuid) -> Result<Vec<EntryRow>, DatabaseError> {
        let rows = sqlx::query_as::<_, EntryRow>(&format!(
            "{ENTRY_SELECT} WHERE e.transaction_id = $1 ORDER BY e.account_id, e.entry_id"
        ))
        .bind(transaction)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn ledger_stamp(&self, account: Uuid) -> Result<StampRow, DatabaseError> {
        sqlx::query_as::<_, StampRow>(
            r#"
            SELECT COALESCE((SELECT MAX(e.entry_id) FROM ledger_entries e WHERE e.account_id = a.account_id), 0) AS last_entry_id,
                   (SELECT COUNT(*) FROM ledger_entries e WHERE e.account_id = a.account_id) AS entry_count,
                   a.ledger_revision AS revision
            FROM accounts a
            WHERE a.account_id = $1
            "#,
        )
        .bind(account)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DatabaseError::not_found("Account", account))
    }

    pub async fn account_balance(&self, account: Uuid) -> Result<Decimal, DatabaseError> {
        sqlx::query_scalar::<_, Decimal>(
            r#"
            SELECT COALESCE((SELECT SUM(e.amount) FROM ledger_entries e WHERE e.account_id = a.account_id), 0)
            FROM accounts a
            WHERE a.account_id = $1
            "#,
        )
        .bind(account)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DatabaseError::not_found("Account", account))
    }

    pub async fn insert_invoice(&self, row: &InvoiceRow) -> Result<(), DatabaseError> {
        sqlx::query(
            r#"
            INSERT INTO invoices (
                invoice_id, issuer_id, recipient_id, net_amount, taxes,
                issue_date, due_date, status, document
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(row.invoice_id)
        .bind(row.issuer_id)
        .bind(row.recipient_id)
        .bind(row.net_amount)
        .bind(row.taxes)
        .bind(row.issue_date)
        .bind(row.due_date)
        .bind(&row.status)
        .bind(&row.document)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn get_invoice(&self, id: Uuid) -> Result<InvoiceRow, DatabaseError> {
        sqlx::query_as::<_, InvoiceRow>(&format!("{INVOICE_SELECT} WHERE invoice_id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DatabaseError::not_found("Invoice", id))
    }
}

// ============================================================================
// Write steps, run inside a caller-owned SQL transaction
// ============================================================================

pub async fn subject_exists(conn: &mut PgConnection, id: Uuid) -> Result<bool, DatabaseError> {
    let exists = sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM subjects WHERE subject_id = $1)")
        .bind(id)
        .fetch_one(&mut *conn)
        .await?;
    Ok(exists)
}

pub async fn system_exists(conn: &mut PgConnection, id: Uuid) -> Result<bool, DatabaseError> {
    let exists = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS (SELECT 1 FROM account_systems WHERE system_id = $1)",
    )
    .bind(id)
    .fetch_one(&mut *conn)
    .await?;
    Ok(exists)
}

/// System of an account, if the account exists
pub async fn system_of_account(conn: &mut PgConnection, id: Uuid) -> Result<Option<Uuid>, DatabaseError> {
    let system = sqlx::query_scalar::<_, Uuid>("SELECT system_id FROM accounts WHERE account_id = $1")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(system)
}

pub async fn insert_system(conn: &mut PgConnection, row: &SystemRow) -> Result<(), DatabaseError> {
    sqlx::query("INSERT INTO account_systems (system_id, owner_id) VALUES ($1, $2)")
        .bind(row.system_id)
        .bind(row.owner_id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

pub async fn insert_account(conn: &mut PgConnection, row: &AccountRow) -> Result<(), DatabaseError> {
    sqlx::query(
        r#"
        INSERT INTO accounts (account_id, system_id, parent_id, name, type_name, is_placeholder, path)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#,
    )
    .bind(row.account_id)
    .bind(row.system_id)
    .bind(row.parent_id)
    .bind(&row.name)
    .bind(&row.type_name)
    .bind(row.is_placeholder)
    .bind(&row.path)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

pub async fn has_children(conn: &mut PgConnection, account: Uuid) -> Result<bool, DatabaseError> {
    let exists = sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM accounts WHERE parent_id = $1)")
        .bind(account)
        .fetch_one(&mut *conn)
        .await?;
    Ok(exists)
}

/// True if any of `accounts` has ledger entries
pub async fn any_entries(conn: &mut PgConnection, accounts: &[Uuid]) -> Result<bool, DatabaseError> {
    let exists = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS (SELECT 1 FROM ledger_entries WHERE account_id = ANY($1))",
    )
    .bind(accounts)
    .fetch_one(&mut *conn)
    .await?;
    Ok(exists)
}

pub async fn delete_account(conn: &mut PgConnection, account: Uuid) -> Result<u64, DatabaseError> {
    let result = sqlx::query("DELETE FROM accounts WHERE account_id = $1")
        .bind(account)
        .execute(&mut *conn)
        .await?;
    Ok(result.rows_affected())
}

/// Ids of every account in the system owned by `subject`
pub async fn accounts_of_subject(conn: &mut PgConnection, subject: Uuid) -> Result<Vec<Uuid>, DatabaseError> {
    let ids = sqlx::query_scalar::<_, Uuid>(
        r#"
        SELECT a.account_id
        FROM accounts a
        JOIN account_systems s ON s.system_id = a.system_id
        WHERE s.owner_id = $1
        "#,
    )
    .bind(subject)
    .fetch_all(&mut *conn)
    .await?;
    Ok(ids)
}

/// True if the subject issued transactions or takes part in invoices
pub async fn subject_in_use(conn: &mut PgConnection, subject: Uuid) -> Result<bool, DatabaseError> {
    let in_use = sqlx::query_scalar::<_, bool>(
        r#"
        SELECT EXISTS (SELECT 1 FROM transactions WHERE issuer_id = $1)
            OR EXISTS (SELECT 1 FROM invoices WHERE issuer_id = $1 OR recipient_id = $1)
        "#,
    )
    .bind(subject)
    .fetch_one(&mut *conn)
    .await?;
    Ok(in_use)
}

/// Deletes a subject; its system and accounts follow by cascade
pub async fn delete_subject(conn: &mut PgConnection, subject: Uuid) -> Result<u64, DatabaseError> {
    let result = sqlx::query("DELETE FROM subjects WHERE subject_id = $1")
        .bind(subject)
        .execute(&mut *conn)
        .await?;
    Ok(result.rows_affected())
}

/// Locks `accounts` in id order and returns their current rows
pub async fn lock_accounts(conn: &mut PgConnection, accounts: &[Uuid]) -> Result<Vec<AccountRow>, DatabaseError> {
    let rows = sqlx::query_as::<_, AccountRow>(&format!(
        "{ACCOUNT_SELECT} WHERE a.account_id = ANY($1) ORDER BY a.account_id FOR UPDATE OF a"
    ))
    .bind(accounts)
    .fetch_all(&mut *conn)
    .await?;
    Ok(rows)
}

/// Highest recorded entry id per account; accounts without entries are absent
pub async fn last_entry_ids(conn: &mut PgConnection, accounts: &[Uuid]) -> Result<Vec<(Uuid, i64)>, DatabaseError> {
    let rows = sqlx::query_as::<_, (Uuid, i64)>(
        r#"
        SELECT account_id, MAX(entry_id)
        FROM ledger_entries
        WHERE account_id = ANY($1)
        GROUP BY account_id
        "#,
    )
    .bind(accounts)
    .fetch_all(&mut *conn)
    .await?;
    Ok(rows)
}

/// Accounts holding entries of a transaction
pub async fn entry_accounts_of(conn: &mut PgConnection, transaction: Uuid) -> Result<Vec<Uuid>, DatabaseError> {
    let rows = sqlx::query_scalar::<_, Uuid>(
        "SELECT DISTINCT account_id FROM ledger_entries WHERE transaction_id = $1",
    )
    .bind(transaction)
    .fetch_all(&mut *conn)
    .await?;
    Ok(rows)
}

pub async fn bump_revisions(conn: &mut PgConnection, accounts: &[Uuid]) -> Result<(), DatabaseError> {
    sqlx::query("UPDATE accounts SET ledger_revision = ledger_revision + 1 WHERE account_id = ANY($1)")
        .bind(accounts)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

pub async fn insert_transaction(conn: &mut PgConnection, row: &TransactionRow) -> Result<(), DatabaseError> {
    sqlx::query(
        r#"
        INSERT INTO transactions (
            transaction_id, date, description, issuer_id,
            source_account_id, source_amount, kind, confirmed
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        "#,
    )
    .bind(row.transaction_id)
    .bind(row.date)
    .bind(&row.description)
    .bind(row.issuer_id)
    .bind(row.source_account_id)
    .bind(row.source_amount)
    .bind(&row.kind)
    .bind(row.confirmed)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Locks a transaction row; false if it does not exist
pub async fn lock_transaction(conn: &mut PgConnection, id: Uuid) -> Result<bool, DatabaseError> {
    let found = sqlx::query_scalar::<_, Uuid>(
        "SELECT transaction_id FROM transactions WHERE transaction_id = $1 FOR UPDATE",
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(found.is_some())
}

/// Rewrites header, source and kind of a transaction; the confirmed flag is untouched
pub async fn update_transaction(conn: &mut PgConnection, row: &TransactionRow) -> Result<(), DatabaseError> {
    sqlx::query(
        r#"
        UPDATE transactions
        SET date = $2, description = $3, issuer_id = $4,
            source_account_id = $5, source_amount = $6, kind = $7
        WHERE transaction_id = $1
        "#,
    )
    .bind(row.transaction_id)
    .bind(row.date)
    .bind(&row.description)
    .bind(row.issuer_id)
    .bind(row.source_account_id)
    .bind(row.source_amount)
    .bind(&row.kind)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Deletes the legs and ledger entries of a transaction
pub async fn delete_legs(conn: &mut PgConnection, id: Uuid) -> Result<(), DatabaseError> {
    sqlx::query("DELETE FROM ledger_entries WHERE transaction_id = $1")
        .bind(id)
        .execute(&mut *conn)
        .await?;
    sqlx::query("DELETE FROM trajectories WHERE transaction_id = $1")
        .bind(id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

pub async fn insert_trajectory(
    conn: &mut PgConnection,
    transaction: Uuid,
    row: &TrajectoryRow,
) -> Result<(), DatabaseError> {
    sqlx::query(
        r#"
        INSERT INTO trajectories (
            transaction_id, position, exit_point_id, entry_point_id,
            target_account_id, target_amount
        ) VALUES ($1, $2, $3, $4, $5, $6)
        "#,
    )
    .bind(transaction)
    .bind(row.position)
    .bind(row.exit_point_id)
    .bind(row.entry_point_id)
    .bind(row.target_account_id)
    .bind(row.target_amount)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

pub async fn insert_entry(conn: &mut PgConnection, entry: &NewEntry) -> Result<(), DatabaseError> {
    sqlx::query(
        "INSERT INTO ledger_entries (account_id, entry_id, transaction_id, amount) VALUES ($1, $2, $3, $4)",
    )
    .bind(entry.account_id)
    .bind(entry.entry_id)
    .bind(entry.transaction_id)
    .bind(entry.amount)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Inserts references; a duplicate fails with `DuplicateEntry`
pub async fn insert_references(
    conn: &mut PgConnection,
    transaction: Uuid,
    references: &[ReferenceRow],
) -> Result<(), DatabaseError> {
    for reference in references {
        sqlx::query(
            "INSERT INTO transaction_references (transaction_id, kind, reference_id) VALUES ($1, $2, $3)",
        )
        .bind(transaction)
        .bind(&reference.kind)
        .bind(&reference.reference_id)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

/// Sets the confirmed flag; returns false if it was already set or the row is missing
pub async fn confirm_transaction(conn: &mut PgConnection, id: Uuid) -> Result<bool, DatabaseError> {
    let result = sqlx::query(
        "UPDATE transactions SET confirmed = TRUE WHERE transaction_id = $1 AND NOT confirmed",
    )
    .bind(id)
    .execute(&mut *conn)
    .await?;
    Ok(result.rows_affected() == 1)
}

/// Locks an invoice row and returns its status
pub async fn lock_invoice_status(conn: &mut PgConnection, id: Uuid) -> Result<Option<String>, DatabaseError> {
    let status = sqlx::query_scalar::<_, String>("SELECT status FROM invoices WHERE invoice_id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(status)
}

pub async fn set_invoice_status(conn: &mut PgConnection, id: Uuid, status: &str) -> Result<(), DatabaseError> {
    sqlx::query("UPDATE invoices SET status = $2 WHERE invoice_id = $1")
        .bind(id)
        .bind(status)
        .execute(&mut *conn)
        .await?;
    Ok(())
}
