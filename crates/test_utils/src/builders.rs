//! Test Data Builders
//!
//! Builders for account trees and transactions with sensible defaults, so
//! tests only spell out what they check.

use fake::faker::name::en::Name;
use fake::Fake;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;

use domain_accounting::{
    Account, AccountSystem, Accounting, AccountingError, BareSetup, BaseAccountType, CashFlow,
    NewAccount, SplitSpec, Subject, SubjectKind, TransactionDraft, TransactionHeader, EXPENSES,
    INCOMES,
};

/// Kind used by [`TestSystemBuilder`]
pub const TEST_KIND: &str = "test";

/// An account system built for a test, with its accounts indexed by path
#[derive(Debug, Clone)]
pub struct TestSystem {
    pub subject: Subject,
    pub system: AccountSystem,
    pub accounts: HashMap<String, Account>,
}

impl TestSystem {
    /// Account at `path`; panics if the builder did not create it
    pub fn account(&self, path: &str) -> &Account {
        self.accounts
            .get(path)
            .unwrap_or_else(|| panic!("no account {path} in test system"))
    }
}

/// Builder for a subject with a custom account tree
pub struct TestSystemBuilder {
    external_id: String,
    accounts: Vec<(String, NewAccount)>,
}

impl TestSystemBuilder {
    /// Creates a builder for a subject of kind [`TEST_KIND`]
    pub fn new(external_id: impl Into<String>) -> Self {
        Self {
            external_id: external_id.into(),
            accounts: Vec::new(),
        }
    }

    /// Adds an account under `parent` (a path built earlier or by default)
    pub fn with_account(mut self, parent: &str, name: &str, base: BaseAccountType) -> Self {
        let account_type = domain_accounting::AccountType::basic(base);
        self.accounts
            .push((parent.to_string(), NewAccount::new(name, account_type)));
        self
    }

    /// Adds a placeholder account under `parent`
    pub fn with_placeholder(mut self, parent: &str, name: &str, base: BaseAccountType) -> Self {
        let account_type = domain_accounting::AccountType::basic(base);
        self.accounts
            .push((parent.to_string(), NewAccount::placeholder(name, account_type)));
        self
    }

    /// Creates the subject, its system and the accounts in insertion order
    pub async fn build(self, accounting: &Accounting) -> Result<TestSystem, AccountingError> {
        let kind = SubjectKind::new(TEST_KIND);
        match accounting.register_subject_kind(kind.clone(), Arc::new(BareSetup)).await {
            Ok(()) | Err(AccountingError::Conflict(_)) => {}
            Err(e) => return Err(e),
        }

        let subject = accounting.create_subject(kind, &self.external_id).await?;
        let system = accounting.accounting_system_of(&subject).await?;

        let separator = accounting.config().path_separator;
        let mut accounts = HashMap::new();
        let root = accounting.root_of(system.id).await?;
        for name in [INCOMES, EXPENSES] {
            let child = accounting.get_child(&root, name).await?;
            accounts.insert(format!("{separator}{name}"), child);
        }
        accounts.insert(root.path.clone(), root);
        for (parent, spec) in self.accounts {
            let parent = accounting.account_at(system.id, &parent).await?;
            let account = accounting.add_child(&parent, spec).await?;
            accounts.insert(account.path.clone(), account);
        }

        Ok(TestSystem {
            subject,
            system,
            accounts,
        })
    }
}

/// A subject with `/wallet`, `/bank` and `/savings` assets and a `/loan` liability
pub async fn stock_system(accounting: &Accounting, external_id: &str) -> Result<TestSystem, AccountingError> {
    TestSystemBuilder::new(external_id)
        .with_account("/", "wallet", BaseAccountType::Asset)
        .with_account("/", "bank", BaseAccountType::Asset)
        .with_account("/", "savings", BaseAccountType::Asset)
        .with_account("/", "loan", BaseAccountType::Liability)
        .with_account("/incomes", "sales", BaseAccountType::Income)
        .with_account("/expenses", "purchases", BaseAccountType::Expense)
        .build(accounting)
        .await
}

/// A random person-like external id, unique per call
pub fn fake_external_id() -> String {
    let name: String = Name().fake();
    format!("{} {}", name.replace('/', "-"), uuid_suffix())
}

fn uuid_suffix() -> String {
    core_kernel::SubjectId::new().as_uuid().simple().to_string()[..8].to_string()
}

/// Builder for split transaction drafts
pub struct TestDraftBuilder {
    header: TransactionHeader,
    source: Account,
    source_amount: Decimal,
    splits: Vec<SplitSpec>,
}

impl TestDraftBuilder {
    /// Starts a draft flowing out of `source`
    pub fn new(source: &Account, source_amount: Decimal, issuer: &Subject) -> Self {
        Self {
            header: TransactionHeader::new("test transaction", issuer.id),
            source: source.clone(),
            source_amount,
            splits: Vec::new(),
        }
    }

    /// Adds an internal leg moving `amount` into `target`
    pub fn to(mut self, target: &Account, amount: Decimal) -> Self {
        self.splits.push(SplitSpec::internal(target, -amount));
        self
    }

    /// Adds a crossing leg moving `amount` into `target`
    pub fn across(mut self, exit: &Account, entry: &Account, target: &Account, amount: Decimal) -> Self {
        self.splits.push(SplitSpec::crossing(exit, entry, target, -amount));
        self
    }

    pub fn with_header(mut self, header: TransactionHeader) -> Self {
        self.header = header;
        self
    }

    /// The source flow
    pub fn source_flow(&self) -> Result<CashFlow, AccountingError> {
        CashFlow::new(self.source.clone(), self.source_amount)
    }

    pub fn splits(&self) -> Vec<SplitSpec> {
        self.splits.clone()
    }

    pub fn build(self) -> TransactionDraft {
        TransactionDraft::split(self.header, &self.source, self.source_amount, self.splits)
    }
}
