//! Account tree operations
//!
//! Structural checks live in plain functions so they can be tested without a
//! store; the `Accounting` methods below load what they need and delegate
//! uniqueness (one root, unique sibling names) to the store's atomic insert.

use std::collections::HashSet;
use tracing::{debug, info, instrument};

use core_kernel::{AccountId, AccountSystemId};

use crate::account::{Account, NewAccount, ParentRef};
use crate::account_type::{AccountType, BaseAccountType};
use crate::error::AccountingError;
use crate::path::{parse_path, validate_account_name};
use crate::service::Accounting;

/// Checks that `child` may be added under `parent`
pub fn validate_child(
    parent: &Account,
    child: &NewAccount,
    separator: char,
    enforce_typed_subtrees: bool,
) -> Result<(), AccountingError> {
    validate_account_name(&child.name, separator)?;

    if child.account_type.base_type() == BaseAccountType::Root {
        return Err(AccountingError::invalid_type(format!(
            "{} is reserved for the root account",
            child.account_type
        )));
    }

    if enforce_typed_subtrees && !parent.is_root() {
        let same_role = (parent.is_stock() && child.account_type.is_stock())
            || (parent.is_flux() && child.account_type.is_flux());
        if !same_role {
            return Err(AccountingError::invalid_type(format!(
                "{} cannot be a child of {}",
                child.account_type, parent
            )));
        }
    }
    Ok(())
}

/// Picks the single root among `roots`
pub fn select_root(system: AccountSystemId, mut roots: Vec<Account>) -> Result<Account, AccountingError> {
    match roots.len() {
        1 => Ok(roots.remove(0)),
        0 => Err(AccountingError::MalformedTree(format!(
            "accounting system {} has no root account",
            system
        ))),
        n => Err(AccountingError::MalformedTree(format!(
            "accounting system {} has {} root accounts",
            system, n
        ))),
    }
}

impl Accounting {
    /// The unique root of a system
    pub async fn root_of(&self, system: AccountSystemId) -> Result<Account, AccountingError> {
        let roots = self.store().roots(system).await?;
        select_root(system, roots)
    }

    /// Walks `path` from the root of `system`
    #[instrument(skip(self))]
    pub async fn resolve_path(&self, system: AccountSystemId, path: &str) -> Result<Account, AccountingError> {
        let components = parse_path(path, self.config().path_separator)?;
        let mut account = self.root_of(system).await?;
        for name in components {
            account = self
                .store()
                .child(account.id, name)
                .await?
                .ok_or_else(|| AccountingError::not_found("Account", path.trim()))?;
        }
        Ok(account)
    }

    /// Indexing accessor: the account at `path` in `system`
    pub async fn account_at(&self, system: AccountSystemId, path: &str) -> Result<Account, AccountingError> {
        self.resolve_path(system, path).await
    }

    /// Loads an account by id
    pub async fn account(&self, id: AccountId) -> Result<Account, AccountingError> {
        Ok(self.store().get_account(id).await?)
    }

    /// Adds an account under a parent designated by path or by account
    ///
    /// A parent passed as an account is reloaded by id, so the new path and
    /// the subtree checks follow the stored parent.
    #[instrument(skip(self, parent, account_type), fields(account_type = %account_type))]
    pub async fn add_account(
        &self,
        system: AccountSystemId,
        parent: ParentRef<'_>,
        name: &str,
        account_type: &AccountType,
        is_placeholder: bool,
    ) -> Result<Account, AccountingError> {
        let parent = match parent {
            ParentRef::Path(path) => self.resolve_path(system, path).await?,
            ParentRef::Account(account) => self.account(account.id).await?,
        };
        if parent.system != system {
            return Err(AccountingError::SystemMismatch(format!(
                "parent {} does not belong to system {}",
                parent.path, system
            )));
        }

        let account_type = self.account_type(account_type.name()).await?;
        let spec = NewAccount {
            name: name.to_string(),
            account_type,
            is_placeholder,
        };
        self.insert_child(&parent, spec).await
    }

    /// Creates the root of a system; fails with `Conflict` if one exists
    #[instrument(skip(self))]
    pub async fn add_root_account(&self, system: AccountSystemId) -> Result<Account, AccountingError> {
        let root = Account::root(system, self.config().path_separator);
        self.store().insert_account(&root).await?;
        debug!(account_id = %root.id, "Created root account");
        Ok(root)
    }

    /// Inserts `spec` under the stored row of `parent`; a duplicate sibling
    /// name is a `Conflict`
    pub async fn add_child(&self, parent: &Account, spec: NewAccount) -> Result<Account, AccountingError> {
        let parent = self.account(parent.id).await?;
        self.insert_child(&parent, spec).await
    }

    #[instrument(skip(self, parent, spec), fields(parent = %parent.path, name = %spec.name))]
    async fn insert_child(&self, parent: &Account, spec: NewAccount) -> Result<Account, AccountingError> {
        let config = self.config();
        validate_child(parent, &spec, config.path_separator, config.enforce_typed_subtrees)?;

        if !self.types().await.contains(&spec.account_type) {
            return Err(AccountingError::not_found("AccountType", spec.account_type.name()));
        }

        let account = Account::child_of(parent, spec, config.path_separator);
        self.store().insert_account(&account).await?;

        info!(account_id = %account.id, path = %account.path, "Added account");
        Ok(account)
    }

    /// The child of `parent` named `name`
    pub async fn get_child(&self, parent: &Account, name: &str) -> Result<Account, AccountingError> {
        self.store().child(parent.id, name).await?.ok_or_else(|| {
            AccountingError::not_found(
                "Account",
                crate::path::child_path(&parent.path, name, self.config().path_separator),
            )
        })
    }

    /// Direct children of `parent`, by name
    pub async fn get_children(&self, parent: &Account) -> Result<Vec<Account>, AccountingError> {
        Ok(self.store().children(parent.id).await?)
    }

    /// Every account of a system, by path
    pub async fn accounts_of(&self, system: AccountSystemId) -> Result<Vec<Account>, AccountingError> {
        Ok(self.store().accounts_in_system(system).await?)
    }

    /// Ancestors of `account`, nearest first, ending with the root
    pub async fn ancestors(&self, account: &Account) -> Result<Vec<Account>, AccountingError> {
        let mut seen = HashSet::from([account.id]);
        let mut ancestors = Vec::new();
        let mut next = account.parent;

        while let Some(id) = next {
            if !seen.insert(id) {
                return Err(AccountingError::MalformedTree(format!(
                    "cycle through account {} above {}",
                    id, account.path
                )));
            }
            let parent = self.store().get_account(id).await?;
            next = parent.parent;
            ancestors.push(parent);
        }
        Ok(ancestors)
    }

    /// Deletes a leaf account without ledger entries
    #[instrument(skip(self, account), fields(account_id = %account.id))]
    pub async fn remove_account(&self, account: &Account) -> Result<(), AccountingError> {
        let account = self.account(account.id).await?;
        if account.is_root() {
            return Err(AccountingError::invalid_operation("the root account cannot be removed"));
        }
        if !self.store().children(account.id).await?.is_empty() {
            return Err(AccountingError::invalid_operation(format!(
                "account {} has children",
                account.path
            )));
        }
        if self.store().ledger_stamp(account.id).await?.entry_count > 0 {
            return Err(AccountingError::invalid_operation(format!(
                "account {} has ledger entries",
                account.path
            )));
        }

        self.store().delete_account(account.id).await.map_err(|e| {
            if e.is_conflict() {
                AccountingError::invalid_operation(format!("account {} is in use", account.path))
            } else {
                e.into()
            }
        })?;
        info!("Removed account");
        Ok(())
    }

    /// Looks up a registered account type by name
    pub async fn account_type(&self, name: &str) -> Result<AccountType, AccountingError> {
        self.types().await.get(name)
    }

    /// Registers and persists an account subtype
    #[instrument(skip(self))]
    pub async fn register_account_type(
        &self,
        name: &str,
        base_type: BaseAccountType,
    ) -> Result<AccountType, AccountingError> {
        // the registry changes only once the store has accepted the type
        let mut types = self.types_mut().await;
        let account_type = types.prepare(name, base_type)?;
        self.store().save_account_type(&account_type).await?;
        types.register(account_type.name(), base_type)?;
        drop(types);
        debug!(account_type = %account_type, "Registered account type");
        Ok(account_type)
    }

    /// Accounts of the given type across every system
    pub async fn accounts_of_type(&self, account_type: &AccountType) -> Result<Vec<Account>, AccountingError> {
        Ok(self.store().accounts_of_type(account_type.name()).await?)
    }
}
