//! Custom Test Assertions
//!
//! Assertion helpers for accounting invariants with more useful failure
//! messages than bare `assert_eq!`.

use rust_decimal::Decimal;
use std::collections::HashMap;

use core_kernel::AccountId;
use domain_accounting::{Account, Accounting, AccountingError, LedgerEntry, Transaction};

/// Asserts that the source flow equals the sum of the trajectory amounts
pub fn assert_conserved(transaction: &Transaction) {
    let legs: Decimal = transaction.splits.iter().map(|s| s.amount()).sum();
    assert_eq!(
        transaction.source.amount, legs,
        "Transaction {} does not conserve money: source {}, legs {}",
        transaction.id, transaction.source.amount, legs
    );
}

/// Asserts that per-account entry ids of `entries` are exactly 1..=n
pub fn assert_gap_free(entries: &[LedgerEntry]) {
    let mut by_account: HashMap<AccountId, Vec<u64>> = HashMap::new();
    for entry in entries {
        by_account.entry(entry.account).or_default().push(entry.entry_id);
    }
    for (account, mut ids) in by_account {
        ids.sort_unstable();
        let expected: Vec<u64> = (1..=ids.len() as u64).collect();
        assert_eq!(ids, expected, "Entry ids of account {} are not gap-free", account);
    }
}

/// Asserts that entry ids of one ledger are unique
pub fn assert_unique_entry_ids(entries: &[LedgerEntry]) {
    let mut seen = std::collections::HashSet::new();
    for entry in entries {
        assert!(
            seen.insert((entry.account, entry.entry_id)),
            "Duplicate entry id {} on account {}",
            entry.entry_id,
            entry.account
        );
    }
}

/// Asserts the balance of `account`
pub async fn assert_balance(accounting: &Accounting, account: &Account, expected: Decimal) {
    let balance = accounting
        .balance(account)
        .await
        .unwrap_or_else(|e| panic!("Could not read balance of {}: {}", account.path, e));
    assert_eq!(
        balance, expected,
        "Balance of {} is {}, expected {}",
        account.path, balance, expected
    );
}

/// Asserts that `result` failed with an error matching `predicate`
pub fn assert_error<T: std::fmt::Debug>(
    result: Result<T, AccountingError>,
    predicate: impl FnOnce(&AccountingError) -> bool,
    expected: &str,
) {
    match result {
        Ok(value) => panic!("Expected {expected} error, got Ok({value:?})"),
        Err(e) => assert!(predicate(&e), "Expected {expected} error, got {e:?}"),
    }
}
