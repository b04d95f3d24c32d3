//! Invalidation-keyed balance cache
//!
//! Balances are cached under the account's [`LedgerStamp`]. Every write to a
//! ledger bumps the stamp's revision, including updates that reuse entry ids,
//! so a stale value is never served: the stamp is read on each lookup and a
//! mismatch falls through to the store.

use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

use core_kernel::{AccountId, AccountSystemId};

use crate::account::Account;
use crate::error::AccountingError;
use crate::ledger::LedgerStamp;
use crate::service::Accounting;

#[derive(Debug, Clone, Copy)]
struct CachedBalance {
    stamp: LedgerStamp,
    balance: Decimal,
    system: AccountSystemId,
}

/// Hit and miss counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
}

/// Cache of system roots and account balances in front of an [`Accounting`]
pub struct BalanceCache {
    accounting: Arc<Accounting>,
    roots: RwLock<HashMap<AccountSystemId, Account>>,
    balances: RwLock<HashMap<AccountId, CachedBalance>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl BalanceCache {
    pub fn new(accounting: Arc<Accounting>) -> Self {
        Self {
            accounting,
            roots: RwLock::new(HashMap::new()),
            balances: RwLock::new(HashMap::new()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn accounting(&self) -> &Accounting {
        &self.accounting
    }

    /// Root of `system`; roots never change once created
    pub async fn root(&self, system: AccountSystemId) -> Result<Account, AccountingError> {
        if let Some(root) = self.roots.read().await.get(&system) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(root.clone());
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        let root = self.accounting.root_of(system).await?;
        self.roots.write().await.insert(system, root.clone());
        Ok(root)
    }

    /// Balance of `account`, recomputed when its ledger moved
    pub async fn balance(&self, account: &Account) -> Result<Decimal, AccountingError> {
        let stamp = self.accounting.ledger_stamp(account).await?;

        if let Some(cached) = self.balances.read().await.get(&account.id) {
            if cached.stamp == stamp {
                self.hits.fetch_add(1, Ordering::Relaxed);
                return Ok(cached.balance);
            }
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        let balance = self.accounting.balance(account).await?;
        debug!(account = %account.path, revision = stamp.revision, "Cached balance");
        self.balances.write().await.insert(
            account.id,
            CachedBalance {
                stamp,
                balance,
                system: account.system,
            },
        );
        Ok(balance)
    }

    /// Drops everything cached for `system`
    pub async fn invalidate_system(&self, system: AccountSystemId) {
        self.roots.write().await.remove(&system);
        self.balances.write().await.retain(|_, cached| cached.system != system);
    }

    /// Drops everything
    pub async fn clear(&self) {
        self.roots.write().await.clear();
        self.balances.write().await.clear();
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}
