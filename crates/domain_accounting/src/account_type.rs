//! Account types
//!
//! Every account plays one of five base roles. Callers may register named
//! subtypes ("BANK ACCOUNT", "SUPPLIER DEBT") that map onto exactly one base
//! role; the registry seeds the five basic types itself.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::error::AccountingError;

/// Base role of an account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BaseAccountType {
    /// The unique root of an account tree
    Root,
    /// Money entering the system from outside
    Income,
    /// Money leaving the system
    Expense,
    /// A deposit of money held by the subject
    Asset,
    /// Money owed by the subject
    Liability,
}

impl BaseAccountType {
    /// All base types, in registry seeding order
    pub const ALL: [BaseAccountType; 5] = [
        BaseAccountType::Root,
        BaseAccountType::Income,
        BaseAccountType::Expense,
        BaseAccountType::Asset,
        BaseAccountType::Liability,
    ];

    /// Stock-like accounts hold a running balance
    pub fn is_stock(&self) -> bool {
        matches!(self, BaseAccountType::Asset | BaseAccountType::Liability)
    }

    /// Flux-like accounts mark money crossing the system boundary
    pub fn is_flux(&self) -> bool {
        matches!(self, BaseAccountType::Income | BaseAccountType::Expense)
    }

    /// Canonical upper-case name
    pub fn as_str(&self) -> &'static str {
        match self {
            BaseAccountType::Root => "ROOT",
            BaseAccountType::Income => "INCOME",
            BaseAccountType::Expense => "EXPENSE",
            BaseAccountType::Asset => "ASSET",
            BaseAccountType::Liability => "LIABILITY",
        }
    }
}

impl fmt::Display for BaseAccountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BaseAccountType {
    type Err = AccountingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = normalize_account_type_name(s);
        BaseAccountType::ALL
            .into_iter()
            .find(|base| base.as_str() == normalized)
            .ok_or_else(|| AccountingError::not_found("BaseAccountType", s))
    }
}

/// Normalizes an account type name for lookup and storage
pub fn normalize_account_type_name(name: &str) -> String {
    name.trim().to_uppercase()
}

/// A named account role mapping onto a base type
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccountType {
    name: String,
    base_type: BaseAccountType,
}

impl AccountType {
    /// Creates a type with a normalized name
    pub fn new(name: &str, base_type: BaseAccountType) -> Self {
        Self {
            name: normalize_account_type_name(name),
            base_type,
        }
    }

    /// The basic type named after its base role
    pub fn basic(base_type: BaseAccountType) -> Self {
        Self {
            name: base_type.as_str().to_string(),
            base_type,
        }
    }

    /// Normalized name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Base role
    pub fn base_type(&self) -> BaseAccountType {
        self.base_type
    }

    /// True for Asset and Liability roles
    pub fn is_stock(&self) -> bool {
        self.base_type.is_stock()
    }

    /// True for Income and Expense roles
    pub fn is_flux(&self) -> bool {
        self.base_type.is_flux()
    }

    /// True if this is one of the five seeded types
    pub fn is_basic(&self) -> bool {
        self.name == self.base_type.as_str()
    }
}

impl fmt::Display for AccountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_basic() {
            write!(f, "{}", self.name)
        } else {
            write!(f, "{} ({})", self.name, self.base_type)
        }
    }
}

/// In-process catalogue of account types
#[derive(Debug, Clone)]
pub struct AccountTypeRegistry {
    types: HashMap<String, AccountType>,
}

impl Default for AccountTypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl AccountTypeRegistry {
    /// Creates a registry seeded with the five basic types
    pub fn new() -> Self {
        let types = BaseAccountType::ALL
            .into_iter()
            .map(|base| (base.as_str().to_string(), AccountType::basic(base)))
            .collect();
        Self { types }
    }

    /// Looks up a type by (normalized) name
    pub fn get(&self, name: &str) -> Result<AccountType, AccountingError> {
        self.types
            .get(&normalize_account_type_name(name))
            .cloned()
            .ok_or_else(|| AccountingError::not_found("AccountType", name))
    }

    /// The type [`register`](Self::register) would return, without recording it
    pub fn prepare(&self, name: &str, base_type: BaseAccountType) -> Result<AccountType, AccountingError> {
        let candidate = AccountType::new(name, base_type);
        if candidate.name().is_empty() {
            return Err(AccountingError::invalid_type("account type name cannot be empty"));
        }

        match self.types.get(candidate.name()) {
            Some(existing) if existing.base_type == base_type => Ok(existing.clone()),
            Some(existing) => Err(AccountingError::conflict(format!(
                "account type {} is already registered as {}",
                existing.name, existing.base_type
            ))),
            None => Ok(candidate),
        }
    }

    /// Registers a subtype
    ///
    /// Registering an existing name with the same base type returns the
    /// existing type; with a different base type it fails with `Conflict`.
    pub fn register(
        &mut self,
        name: &str,
        base_type: BaseAccountType,
    ) -> Result<AccountType, AccountingError> {
        let account_type = self.prepare(name, base_type)?;
        self.types
            .entry(account_type.name.clone())
            .or_insert_with(|| account_type.clone());
        Ok(account_type)
    }

    /// True if this exact type (name and base) is registered
    pub fn contains(&self, account_type: &AccountType) -> bool {
        self.types.get(account_type.name()) == Some(account_type)
    }

    /// All registered types, in no particular order
    pub fn iter(&self) -> impl Iterator<Item = &AccountType> {
        self.types.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stock_and_flux_predicates() {
        assert!(BaseAccountType::Asset.is_stock());
        assert!(BaseAccountType::Liability.is_stock());
        assert!(BaseAccountType::Income.is_flux());
        assert!(BaseAccountType::Expense.is_flux());
        assert!(!BaseAccountType::Root.is_stock());
        assert!(!BaseAccountType::Root.is_flux());
    }

    #[test]
    fn test_registry_is_seeded() {
        let registry = AccountTypeRegistry::new();
        for base in BaseAccountType::ALL {
            let ty = registry.get(base.as_str()).unwrap();
            assert_eq!(ty.base_type(), base);
            assert!(ty.is_basic());
        }
    }

    #[test]
    fn test_lookup_is_normalized() {
        let registry = AccountTypeRegistry::new();
        assert_eq!(registry.get("  asset ").unwrap(), AccountType::basic(BaseAccountType::Asset));
    }

    #[test]
    fn test_unknown_type_is_not_found() {
        let registry = AccountTypeRegistry::new();
        assert!(registry.get("EQUITY").unwrap_err().is_not_found());
    }

    #[test]
    fn test_register_subtype() {
        let mut registry = AccountTypeRegistry::new();
        let bank = registry.register("bank account", BaseAccountType::Asset).unwrap();
        assert_eq!(bank.name(), "BANK ACCOUNT");
        assert!(bank.is_stock());
        assert!(!bank.is_basic());
        assert_eq!(registry.get("Bank Account").unwrap(), bank);
    }

    #[test]
    fn test_register_is_idempotent_for_same_base() {
        let mut registry = AccountTypeRegistry::new();
        let first = registry.register("fees", BaseAccountType::Income).unwrap();
        let second = registry.register("FEES", BaseAccountType::Income).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_register_conflicts_on_different_base() {
        let mut registry = AccountTypeRegistry::new();
        registry.register("fees", BaseAccountType::Income).unwrap();
        let err = registry.register("fees", BaseAccountType::Expense).unwrap_err();
        assert!(matches!(err, AccountingError::Conflict(_)));
    }

    #[test]
    fn test_prepare_leaves_registry_untouched() {
        let registry = AccountTypeRegistry::new();
        let fees = registry.prepare("fees", BaseAccountType::Income).unwrap();
        assert_eq!(fees.name(), "FEES");
        assert!(!registry.contains(&fees));
        assert!(registry.get("FEES").unwrap_err().is_not_found());
    }

    #[test]
    fn test_basic_types_cannot_be_rebased() {
        let mut registry = AccountTypeRegistry::new();
        let err = registry.register("asset", BaseAccountType::Liability).unwrap_err();
        assert!(matches!(err, AccountingError::Conflict(_)));
        assert!(registry.register("asset", BaseAccountType::Asset).is_ok());
    }

    #[test]
    fn test_base_type_parsing() {
        assert_eq!("income".parse::<BaseAccountType>().unwrap(), BaseAccountType::Income);
        assert!("equity".parse::<BaseAccountType>().is_err());
    }
}
