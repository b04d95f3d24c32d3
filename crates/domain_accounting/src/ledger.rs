//! Ledger engine
//!
//! Ledger entries record each transaction from the touched account's point
//! of view: for stock accounts a positive entry increases the stock. The
//! next entry id of an account is one above the highest id currently in its
//! ledger (1 for an empty ledger); store adapters compute it under the same
//! lock that inserts the entries. Removing entries, as an update does, lowers
//! that maximum, so the ids of removed entries are handed out again.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::instrument;

use core_kernel::{AccountId, AccountSystemId};

use crate::account::Account;
use crate::account_type::BaseAccountType;
use crate::error::AccountingError;
use crate::service::Accounting;
use crate::transaction::{LedgerEntry, Transaction};

/// An entry amount waiting for its sequence number
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlannedEntry {
    pub account: AccountId,
    pub amount: Decimal,
}

/// Position of an account's ledger, used to detect any change to it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct LedgerStamp {
    /// Highest entry id currently recorded (0 if none)
    pub last_entry_id: u64,
    /// Number of entries currently recorded
    pub entry_count: u64,
    /// Ledger writes that touched the account; never decreases
    pub revision: u64,
}

/// Entry amounts for every account a transaction touches, in fan-out order
///
/// Source gets `-source.amount`; per leg with `a = trajectory.amount()`:
/// exit point `a` if it is an expense account else `-a`, entry point `a` if
/// it is an income account else `-a`, target `a`.
pub fn plan_entries(transaction: &Transaction) -> Vec<PlannedEntry> {
    let mut plan = Vec::with_capacity(1 + 3 * transaction.splits.len());
    plan.push(PlannedEntry {
        account: transaction.source.account.id,
        amount: -transaction.source.amount,
    });

    for split in &transaction.splits {
        let a = split.amount();
        if let Some(exit) = &split.exit_point {
            let amount = if exit.base_type() == BaseAccountType::Expense { a } else { -a };
            plan.push(PlannedEntry { account: exit.id, amount });
        }
        if let Some(entry) = &split.entry_point {
            let amount = if entry.base_type() == BaseAccountType::Income { a } else { -a };
            plan.push(PlannedEntry { account: entry.id, amount });
        }
        plan.push(PlannedEntry {
            account: split.target.account.id,
            amount: a,
        });
    }
    plan
}

/// Hands out per-account entry ids above the current maxima
#[derive(Debug, Default)]
pub struct EntrySequencer {
    counters: HashMap<AccountId, u64>,
}

impl EntrySequencer {
    /// Starts from the highest recorded id of each account
    pub fn new(counters: HashMap<AccountId, u64>) -> Self {
        Self { counters }
    }

    /// Next id for `account`
    pub fn next(&mut self, account: AccountId) -> u64 {
        let counter = self.counters.entry(account).or_insert(0);
        *counter += 1;
        *counter
    }

    /// Numbers every planned entry of `transaction`
    pub fn materialize(&mut self, transaction: &Transaction) -> Vec<LedgerEntry> {
        plan_entries(transaction)
            .into_iter()
            .map(|planned| LedgerEntry {
                account: planned.account,
                transaction: transaction.id,
                entry_id: self.next(planned.account),
                amount: planned.amount,
                date: transaction.date,
                description: transaction.description.clone(),
                issuer: transaction.issuer,
            })
            .collect()
    }
}

/// Signed sum of entry amounts
pub fn balance_of(entries: &[LedgerEntry]) -> Decimal {
    entries.iter().map(|e| e.amount).sum()
}

/// Newest transaction date first, ties by entry id descending
pub fn sort_newest_first(entries: &mut [LedgerEntry]) {
    entries.sort_by(|a, b| b.date.cmp(&a.date).then(b.entry_id.cmp(&a.entry_id)));
}

impl Accounting {
    /// Balance of an account
    #[instrument(skip(self, account), fields(account = %account.path))]
    pub async fn balance(&self, account: &Account) -> Result<Decimal, AccountingError> {
        Ok(self.store().account_balance(account.id).await?)
    }

    /// Sum of balances over the stock-like accounts of a system
    #[instrument(skip(self))]
    pub async fn total_amount(&self, system: AccountSystemId) -> Result<Decimal, AccountingError> {
        let mut total = Decimal::ZERO;
        for account in self.accounts_of(system).await? {
            if account.is_stock() {
                total += self.store().account_balance(account.id).await?;
            }
        }
        Ok(total)
    }

    /// Id the next entry of `account` will receive
    pub async fn next_entry_id(&self, account: &Account) -> Result<u64, AccountingError> {
        let stamp = self.store().ledger_stamp(account.id).await?;
        Ok(stamp.last_entry_id + 1)
    }

    /// Highest entry id currently recorded for `account`, if any
    pub async fn last_entry_id(&self, account: &Account) -> Result<Option<u64>, AccountingError> {
        let stamp = self.store().ledger_stamp(account.id).await?;
        Ok((stamp.last_entry_id > 0).then_some(stamp.last_entry_id))
    }

    /// Current ledger position of `account`
    pub async fn ledger_stamp(&self, account: &Account) -> Result<LedgerStamp, AccountingError> {
        Ok(self.store().ledger_stamp(account.id).await?)
    }

    /// Entries of an account, newest first
    #[instrument(skip(self, account), fields(account = %account.path))]
    pub async fn entries_for(&self, account: &Account) -> Result<Vec<LedgerEntry>, AccountingError> {
        let mut entries = self.store().entries_for_account(account.id).await?;
        sort_newest_first(&mut entries);
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::{AccountSystem, NewAccount};
    use crate::account_type::AccountType;
    use crate::transaction::{CashFlow, TransactionKind, Trajectory};
    use chrono::{Duration, Utc};
    use core_kernel::{SubjectId, TransactionId};
    use rust_decimal_macros::dec;

    fn child(root: &Account, name: &str, base: BaseAccountType) -> Account {
        Account::child_of(root, NewAccount::new(name, AccountType::basic(base)), '/')
    }

    fn transaction(source: CashFlow, splits: Vec<Trajectory>) -> Transaction {
        Transaction {
            id: TransactionId::new(),
            date: Utc::now(),
            description: "test".into(),
            issuer: SubjectId::new(),
            source,
            splits,
            kind: TransactionKind::Generic,
            confirmed: false,
            references: Vec::new(),
        }
    }

    #[test]
    fn test_simple_fan_out() {
        let root = Account::root(AccountSystem::new(SubjectId::new()).id, '/');
        let wallet = child(&root, "wallet", BaseAccountType::Asset);
        let cash = child(&root, "cash", BaseAccountType::Asset);
        let tx = transaction(
            CashFlow::new(wallet.clone(), dec!(100)).unwrap(),
            vec![Trajectory::internal(CashFlow::new(cash.clone(), dec!(-100)).unwrap())],
        );

        let plan = plan_entries(&tx);
        assert_eq!(
            plan,
            vec![
                PlannedEntry { account: wallet.id, amount: dec!(-100) },
                PlannedEntry { account: cash.id, amount: dec!(100) },
            ]
        );
    }

    #[test]
    fn test_crossing_fan_out_signs() {
        let gas = Account::root(AccountSystem::new(SubjectId::new()).id, '/');
        let supplier = Account::root(AccountSystem::new(SubjectId::new()).id, '/');
        let members = child(&gas, "members", BaseAccountType::Asset);
        let exit = child(&gas, "suppliers", BaseAccountType::Expense);
        let entry = child(&supplier, "gas", BaseAccountType::Income);
        let wallet = child(&supplier, "wallet", BaseAccountType::Asset);

        let tx = transaction(
            CashFlow::new(members.clone(), dec!(100)).unwrap(),
            vec![Trajectory::crossing(
                exit.clone(),
                entry.clone(),
                CashFlow::new(wallet.clone(), dec!(-100)).unwrap(),
            )],
        );

        let amounts: Vec<_> = plan_entries(&tx).into_iter().map(|p| (p.account, p.amount)).collect();
        assert_eq!(
            amounts,
            vec![
                (members.id, dec!(-100)),
                (exit.id, dec!(100)),
                (entry.id, dec!(100)),
                (wallet.id, dec!(100)),
            ]
        );
    }

    #[test]
    fn test_sequencer_continues_above_maxima() {
        let a = AccountId::new();
        let b = AccountId::new();
        let mut sequencer = EntrySequencer::new(HashMap::from([(a, 4)]));
        assert_eq!(sequencer.next(a), 5);
        assert_eq!(sequencer.next(b), 1);
        assert_eq!(sequencer.next(a), 6);
        assert_eq!(sequencer.next(b), 2);
    }

    #[test]
    fn test_sort_newest_first() {
        let account = AccountId::new();
        let now = Utc::now();
        let entry = |entry_id, date| LedgerEntry {
            account,
            transaction: TransactionId::new(),
            entry_id,
            amount: dec!(1),
            date,
            description: String::new(),
            issuer: SubjectId::new(),
        };
        let mut entries = vec![
            entry(1, now - Duration::days(1)),
            entry(2, now),
            entry(3, now),
            entry(4, now - Duration::days(2)),
        ];
        sort_newest_first(&mut entries);
        let ids: Vec<_> = entries.iter().map(|e| e.entry_id).collect();
        assert_eq!(ids, vec![3, 2, 1, 4]);
        assert_eq!(balance_of(&entries), dec!(4));
    }
}
