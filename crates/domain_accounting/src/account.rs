//! Accounts and accounting systems

use serde::{Deserialize, Serialize};
use std::fmt;

use core_kernel::{AccountId, AccountSystemId, SubjectId};

use crate::account_type::{AccountType, BaseAccountType};
use crate::path;

/// Container of one account tree, owned 1:1 by a subject
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountSystem {
    /// Unique identifier
    pub id: AccountSystemId,
    /// Subject owning this system
    pub owner: SubjectId,
}

impl AccountSystem {
    /// Creates a system for `owner`
    pub fn new(owner: SubjectId) -> Self {
        Self {
            id: AccountSystemId::new_v7(),
            owner,
        }
    }
}

/// A node of an account tree
///
/// `path` is materialized when the account is created; accounts are never
/// renamed or moved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Unique identifier
    pub id: AccountId,
    /// System this account belongs to
    pub system: AccountSystemId,
    /// Parent account, `None` only for the root
    pub parent: Option<AccountId>,
    /// Name, unique among siblings (empty for the root)
    pub name: String,
    /// Role of the account
    pub account_type: AccountType,
    /// Placeholders only structure the tree and never take part in transactions
    pub is_placeholder: bool,
    /// Full path from the root
    pub path: String,
}

impl Account {
    /// Builds the root account of `system`
    pub fn root(system: AccountSystemId, separator: char) -> Self {
        Self {
            id: AccountId::new_v7(),
            system,
            parent: None,
            name: String::new(),
            account_type: AccountType::basic(BaseAccountType::Root),
            is_placeholder: true,
            path: path::root_path(separator),
        }
    }

    /// Builds a child of `parent` from `spec`, without validating it
    pub fn child_of(parent: &Account, spec: NewAccount, separator: char) -> Self {
        Self {
            id: AccountId::new_v7(),
            system: parent.system,
            parent: Some(parent.id),
            path: path::child_path(&parent.path, &spec.name, separator),
            name: spec.name,
            account_type: spec.account_type,
            is_placeholder: spec.is_placeholder,
        }
    }

    /// True for the tree root
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    /// Base role of the account's type
    pub fn base_type(&self) -> BaseAccountType {
        self.account_type.base_type()
    }

    /// True for Asset and Liability accounts
    pub fn is_stock(&self) -> bool {
        self.account_type.is_stock()
    }

    /// True for Income and Expense accounts
    pub fn is_flux(&self) -> bool {
        self.account_type.is_flux()
    }
}

impl fmt::Display for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.path, self.account_type)
    }
}

/// Specification of an account to be added under a parent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAccount {
    pub name: String,
    pub account_type: AccountType,
    pub is_placeholder: bool,
}

impl NewAccount {
    /// A regular (non-placeholder) account
    pub fn new(name: impl Into<String>, account_type: AccountType) -> Self {
        Self {
            name: name.into(),
            account_type,
            is_placeholder: false,
        }
    }

    /// A placeholder account
    pub fn placeholder(name: impl Into<String>, account_type: AccountType) -> Self {
        Self {
            name: name.into(),
            account_type,
            is_placeholder: true,
        }
    }
}

/// How the parent of a new account is designated
#[derive(Debug, Clone, Copy)]
pub enum ParentRef<'a> {
    /// By path within the target system
    Path(&'a str),
    /// By an already loaded account
    Account(&'a Account),
}

impl<'a> From<&'a str> for ParentRef<'a> {
    fn from(path: &'a str) -> Self {
        ParentRef::Path(path)
    }
}

impl<'a> From<&'a Account> for ParentRef<'a> {
    fn from(account: &'a Account) -> Self {
        ParentRef::Account(account)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_account() {
        let system = AccountSystem::new(SubjectId::new());
        let root = Account::root(system.id, '/');
        assert!(root.is_root());
        assert!(root.is_placeholder);
        assert_eq!(root.name, "");
        assert_eq!(root.path, "/");
        assert_eq!(root.base_type(), BaseAccountType::Root);
    }

    #[test]
    fn test_child_path_is_materialized() {
        let system = AccountSystem::new(SubjectId::new());
        let root = Account::root(system.id, '/');
        let expenses = Account::child_of(
            &root,
            NewAccount::placeholder("expenses", AccountType::basic(BaseAccountType::Expense)),
            '/',
        );
        let gas = Account::child_of(
            &expenses,
            NewAccount::new("gas", AccountType::basic(BaseAccountType::Expense)),
            '/',
        );

        assert_eq!(expenses.path, "/expenses");
        assert_eq!(gas.path, "/expenses/gas");
        assert_eq!(gas.parent, Some(expenses.id));
        assert_eq!(gas.system, system.id);
        assert!(gas.is_flux());
        assert!(!gas.is_placeholder);
    }
}
