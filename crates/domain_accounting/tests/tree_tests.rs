//! Account tree, account type and subject tests for domain_accounting

use async_trait::async_trait;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;

use domain_accounting::{
    AccountSystem, Accounting, AccountingConfig, AccountingError, AccountingSetup, AccountType,
    BareSetup, BaseAccountType, NewAccount, Subject, SubjectKind, TransactionHeader, EXPENSES,
    INCOMES,
};
use test_utils::{assert_error, fake_external_id, init_tracing, stock_system, TestSystemBuilder, TEST_KIND};

// ============================================================================
// Path resolution
// ============================================================================

mod path_tests {
    use super::*;

    #[tokio::test]
    async fn test_root_path_resolves_to_root() {
        let accounting = Accounting::in_memory();
        let system = stock_system(&accounting, "alice").await.unwrap();

        let root = accounting.account_at(system.system.id, "/").await.unwrap();
        assert!(root.is_root());
        assert_eq!(root.path, "/");
        assert_eq!(root.account_type.base_type(), BaseAccountType::Root);
    }

    #[tokio::test]
    async fn test_nested_path_resolves() {
        let accounting = Accounting::in_memory();
        let system = stock_system(&accounting, "alice").await.unwrap();

        let sales = accounting
            .account_at(system.system.id, "/incomes/sales")
            .await
            .unwrap();
        assert_eq!(sales.name, "sales");
        assert_eq!(sales.path, "/incomes/sales");
        assert_eq!(sales.id, system.account("/incomes/sales").id);
    }

    #[tokio::test]
    async fn test_surrounding_whitespace_is_ignored() {
        let accounting = Accounting::in_memory();
        let system = stock_system(&accounting, "alice").await.unwrap();

        let wallet = accounting.account_at(system.system.id, "  /wallet ").await.unwrap();
        assert_eq!(wallet.path, "/wallet");
    }

    #[tokio::test]
    async fn test_malformed_paths_are_rejected() {
        let accounting = Accounting::in_memory();
        let system = stock_system(&accounting, "alice").await.unwrap();

        for path in ["", "   ", "wallet", "/wallet/", "//wallet", "/incomes//sales"] {
            assert_error(
                accounting.account_at(system.system.id, path).await,
                |e| matches!(e, AccountingError::MalformedPath(_)),
                "MalformedPath",
            );
        }
    }

    #[tokio::test]
    async fn test_missing_account_is_not_found() {
        let accounting = Accounting::in_memory();
        let system = stock_system(&accounting, "alice").await.unwrap();

        let err = accounting
            .account_at(system.system.id, "/incomes/rent")
            .await
            .unwrap_err();
        assert!(err.is_not_found());
        assert!(err.to_string().contains("/incomes/rent"));
    }

    #[tokio::test]
    async fn test_custom_separator() {
        let config = AccountingConfig::default().with_path_separator(':');
        let accounting = Accounting::with_memory_store(config);
        let system = TestSystemBuilder::new("colon")
            .with_account(":", "wallet", BaseAccountType::Asset)
            .build(&accounting)
            .await
            .unwrap();

        let wallet = system.account(":wallet");
        assert_eq!(wallet.path, ":wallet");

        let incomes = accounting.account_at(system.system.id, ":incomes").await.unwrap();
        assert_eq!(incomes.name, INCOMES);

        assert_error(
            accounting.account_at(system.system.id, "/wallet").await,
            |e| matches!(e, AccountingError::MalformedPath(_)),
            "MalformedPath",
        );
    }
}

// ============================================================================
// Tree structure
// ============================================================================

mod tree_tests {
    use super::*;

    #[tokio::test]
    async fn test_new_system_has_incomes_and_expenses() {
        let accounting = Accounting::in_memory();
        let system = TestSystemBuilder::new("bare").build(&accounting).await.unwrap();

        let root = accounting.root_of(system.system.id).await.unwrap();
        let children = accounting.get_children(&root).await.unwrap();
        let names: Vec<&str> = children.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec![EXPENSES, INCOMES]);

        for child in &children {
            assert!(child.is_placeholder);
            assert!(child.is_flux());
        }
    }

    #[tokio::test]
    async fn test_add_account_by_path_and_by_parent() {
        let accounting = Accounting::in_memory();
        let system = TestSystemBuilder::new("bob").build(&accounting).await.unwrap();
        let asset = accounting.account_type("asset").await.unwrap();

        let bank = accounting
            .add_account(system.system.id, "/".into(), "bank", &asset, true)
            .await
            .unwrap();
        let checking = accounting
            .add_account(system.system.id, (&bank).into(), "checking", &asset, false)
            .await
            .unwrap();

        assert_eq!(checking.path, "/bank/checking");
        assert_eq!(checking.parent, Some(bank.id));
        assert!(!checking.is_placeholder);

        let found = accounting.get_child(&bank, "checking").await.unwrap();
        assert_eq!(found, checking);
    }

    #[tokio::test]
    async fn test_duplicate_sibling_is_conflict() {
        let accounting = Accounting::in_memory();
        let system = stock_system(&accounting, "alice").await.unwrap();
        let asset = accounting.account_type("ASSET").await.unwrap();

        assert_error(
            accounting
                .add_account(system.system.id, "/".into(), "wallet", &asset, false)
                .await,
            |e| matches!(e, AccountingError::Conflict(_)),
            "Conflict",
        );
    }

    #[tokio::test]
    async fn test_second_root_is_conflict() {
        let accounting = Accounting::in_memory();
        let system = stock_system(&accounting, "alice").await.unwrap();

        assert_error(
            accounting.add_root_account(system.system.id).await,
            |e| matches!(e, AccountingError::Conflict(_)),
            "Conflict",
        );
    }

    #[tokio::test]
    async fn test_invalid_names_are_rejected() {
        let accounting = Accounting::in_memory();
        let system = stock_system(&accounting, "alice").await.unwrap();
        let root = system.account("/");

        for name in ["", "a/b", " padded"] {
            assert_error(
                accounting
                    .add_child(root, NewAccount::new(name, AccountType::basic(BaseAccountType::Asset)))
                    .await,
                |e| matches!(e, AccountingError::MalformedPath(_)),
                "MalformedPath",
            );
        }
    }

    #[tokio::test]
    async fn test_root_type_is_reserved() {
        let accounting = Accounting::in_memory();
        let system = stock_system(&accounting, "alice").await.unwrap();

        assert_error(
            accounting
                .add_child(
                    system.account("/"),
                    NewAccount::new("other-root", AccountType::basic(BaseAccountType::Root)),
                )
                .await,
            |e| matches!(e, AccountingError::InvalidAccountType(_)),
            "InvalidAccountType",
        );
    }

    #[tokio::test]
    async fn test_typed_subtrees_are_enforced() {
        let accounting = Accounting::in_memory();
        let system = stock_system(&accounting, "alice").await.unwrap();

        assert_error(
            accounting
                .add_child(
                    system.account("/incomes"),
                    NewAccount::new("cash", AccountType::basic(BaseAccountType::Asset)),
                )
                .await,
            |e| matches!(e, AccountingError::InvalidAccountType(_)),
            "InvalidAccountType",
        );
        assert_error(
            accounting
                .add_child(
                    system.account("/wallet"),
                    NewAccount::new("tips", AccountType::basic(BaseAccountType::Income)),
                )
                .await,
            |e| matches!(e, AccountingError::InvalidAccountType(_)),
            "InvalidAccountType",
        );

        // an income under an expense keeps the flux role
        let refunds = accounting
            .add_child(
                system.account("/expenses"),
                NewAccount::new("refunds", AccountType::basic(BaseAccountType::Income)),
            )
            .await
            .unwrap();
        assert_eq!(refunds.path, "/expenses/refunds");
    }

    #[tokio::test]
    async fn test_typed_subtrees_can_be_disabled() {
        let config = AccountingConfig::default().with_typed_subtrees(false);
        let accounting = Accounting::with_memory_store(config);
        let system = stock_system(&accounting, "alice").await.unwrap();

        let cash = accounting
            .add_child(
                system.account("/incomes"),
                NewAccount::new("cash", AccountType::basic(BaseAccountType::Asset)),
            )
            .await
            .unwrap();
        assert!(cash.is_stock());
    }

    #[tokio::test]
    async fn test_parent_from_other_system_is_mismatch() {
        let accounting = Accounting::in_memory();
        let alice = stock_system(&accounting, "alice").await.unwrap();
        let bob = stock_system(&accounting, "bob").await.unwrap();
        let asset = accounting.account_type("ASSET").await.unwrap();

        assert_error(
            accounting
                .add_account(bob.system.id, alice.account("/wallet").into(), "coins", &asset, false)
                .await,
            |e| matches!(e, AccountingError::SystemMismatch(_)),
            "SystemMismatch",
        );
    }

    #[tokio::test]
    async fn test_parent_copy_is_reloaded_from_store() {
        let accounting = Accounting::in_memory();
        let alice = stock_system(&accounting, "alice").await.unwrap();
        let bob = stock_system(&accounting, "bob").await.unwrap();
        let asset = accounting.account_type("ASSET").await.unwrap();

        // a stale copy claiming another path and the income role
        let mut wallet = alice.account("/wallet").clone();
        wallet.path = "/bank".to_string();
        wallet.account_type = AccountType::basic(BaseAccountType::Income);
        let coins = accounting
            .add_child(&wallet, NewAccount::new("coins", asset.clone()))
            .await
            .unwrap();
        assert_eq!(coins.path, "/wallet/coins");
        assert_eq!(
            accounting.account_at(alice.system.id, "/wallet/coins").await.unwrap().id,
            coins.id
        );

        // a copy moved into bob's system is still alice's account
        let mut savings = alice.account("/savings").clone();
        savings.system = bob.system.id;
        assert_error(
            accounting
                .add_account(bob.system.id, (&savings).into(), "jar", &asset, false)
                .await,
            |e| matches!(e, AccountingError::SystemMismatch(_)),
            "SystemMismatch",
        );
        assert!(accounting.account_at(bob.system.id, "/savings/jar").await.is_err());
    }

    #[tokio::test]
    async fn test_ancestors_nearest_first() {
        let accounting = Accounting::in_memory();
        let system = TestSystemBuilder::new("deep")
            .with_placeholder("/", "bank", BaseAccountType::Asset)
            .with_placeholder("/bank", "eu", BaseAccountType::Asset)
            .with_account("/bank/eu", "checking", BaseAccountType::Asset)
            .build(&accounting)
            .await
            .unwrap();

        let ancestors = accounting
            .ancestors(system.account("/bank/eu/checking"))
            .await
            .unwrap();
        let paths: Vec<&str> = ancestors.iter().map(|a| a.path.as_str()).collect();
        assert_eq!(paths, vec!["/bank/eu", "/bank", "/"]);

        assert!(accounting.ancestors(system.account("/")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_accounts_of_lists_by_path() {
        let accounting = Accounting::in_memory();
        let system = stock_system(&accounting, "alice").await.unwrap();

        let accounts = accounting.accounts_of(system.system.id).await.unwrap();
        let paths: Vec<&str> = accounts.iter().map(|a| a.path.as_str()).collect();
        let mut sorted = paths.clone();
        sorted.sort();
        assert_eq!(paths, sorted);
        assert_eq!(accounts.len(), system.accounts.len());
    }

    #[tokio::test]
    async fn test_remove_leaf_account() {
        let accounting = Accounting::in_memory();
        let system = stock_system(&accounting, "alice").await.unwrap();
        let savings = system.account("/savings");

        accounting.remove_account(savings).await.unwrap();

        assert!(accounting
            .account_at(system.system.id, "/savings")
            .await
            .unwrap_err()
            .is_not_found());
    }

    #[tokio::test]
    async fn test_remove_refuses_root_parents_and_used_accounts() {
        let accounting = Accounting::in_memory();
        let system = stock_system(&accounting, "alice").await.unwrap();

        assert_error(
            accounting.remove_account(system.account("/")).await,
            |e| matches!(e, AccountingError::InvalidAccountingOperation(_)),
            "InvalidAccountingOperation",
        );
        assert_error(
            accounting.remove_account(system.account("/incomes")).await,
            |e| matches!(e, AccountingError::InvalidAccountingOperation(_)),
            "InvalidAccountingOperation",
        );

        accounting
            .register_simple_transaction(
                TransactionHeader::new("move", system.subject.id),
                system.account("/wallet"),
                system.account("/bank"),
                dec!(10),
            )
            .await
            .unwrap();
        assert_error(
            accounting.remove_account(system.account("/bank")).await,
            |e| matches!(e, AccountingError::InvalidAccountingOperation(_)),
            "InvalidAccountingOperation",
        );
    }
}

// ============================================================================
// Account types
// ============================================================================

mod account_type_tests {
    use super::*;

    #[tokio::test]
    async fn test_basic_types_are_registered() {
        let accounting = Accounting::in_memory();
        for name in ["ROOT", "INCOME", "EXPENSE", "ASSET", "LIABILITY"] {
            let account_type = accounting.account_type(name).await.unwrap();
            assert!(account_type.is_basic());
        }
        assert!(accounting.account_type("equity").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_register_subtype_and_use_it() {
        let accounting = Accounting::in_memory();
        let system = TestSystemBuilder::new("carol").build(&accounting).await.unwrap();

        let credit_card = accounting
            .register_account_type("credit card", BaseAccountType::Liability)
            .await
            .unwrap();
        assert!(credit_card.is_stock());
        assert_eq!(credit_card.base_type(), BaseAccountType::Liability);

        let visa = accounting
            .add_account(system.system.id, "/".into(), "visa", &credit_card, false)
            .await
            .unwrap();
        assert_eq!(visa.account_type, credit_card);

        let of_type = accounting.accounts_of_type(&credit_card).await.unwrap();
        assert_eq!(of_type, vec![visa]);
    }

    #[tokio::test]
    async fn test_register_is_idempotent_but_base_is_fixed() {
        let accounting = Accounting::in_memory();
        let first = accounting
            .register_account_type("Bank", BaseAccountType::Asset)
            .await
            .unwrap();
        let again = accounting
            .register_account_type("BANK", BaseAccountType::Asset)
            .await
            .unwrap();
        assert_eq!(first, again);

        assert_error(
            accounting
                .register_account_type("bank", BaseAccountType::Liability)
                .await,
            |e| matches!(e, AccountingError::Conflict(_)),
            "Conflict",
        );
    }

    #[tokio::test]
    async fn test_unregistered_type_is_not_found() {
        let accounting = Accounting::in_memory();
        let system = TestSystemBuilder::new("dave").build(&accounting).await.unwrap();

        let err = accounting
            .add_child(
                system.account("/"),
                NewAccount::new("stash", AccountType::new("STASH", BaseAccountType::Asset)),
            )
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_rejected_type_is_not_registered() {
        let store = Arc::new(domain_accounting::MemoryStore::new());
        let stale = Accounting::new(store.clone(), AccountingConfig::default()).await.unwrap();
        let current = Accounting::new(store, AccountingConfig::default()).await.unwrap();
        current
            .register_account_type("fees", BaseAccountType::Income)
            .await
            .unwrap();

        // the stale facade has never seen FEES; the store refuses the new base
        assert_error(
            stale.register_account_type("fees", BaseAccountType::Expense).await,
            |e| matches!(e, AccountingError::Conflict(_)),
            "Conflict",
        );
        assert!(stale.account_type("FEES").await.unwrap_err().is_not_found());
        assert_eq!(
            current.account_type("FEES").await.unwrap().base_type(),
            BaseAccountType::Income
        );
    }

    #[tokio::test]
    async fn test_types_survive_a_new_facade_over_the_same_store() {
        let store = Arc::new(domain_accounting::MemoryStore::new());
        let first = Accounting::new(store.clone(), AccountingConfig::default()).await.unwrap();
        first
            .register_account_type("PETTY CASH", BaseAccountType::Asset)
            .await
            .unwrap();

        let second = Accounting::new(store, AccountingConfig::default()).await.unwrap();
        let petty = second.account_type("petty cash").await.unwrap();
        assert_eq!(petty.base_type(), BaseAccountType::Asset);
    }
}

// ============================================================================
// Subjects and accounting systems
// ============================================================================

mod subject_tests {
    use super::*;

    struct FailingSetup;

    #[async_trait]
    impl AccountingSetup for FailingSetup {
        async fn setup(&self, accounting: &Accounting, system: &AccountSystem) -> Result<(), AccountingError> {
            let income = accounting.account_type("INCOME").await?;
            // `/incomes` already exists
            accounting
                .add_account(system.id, "/".into(), INCOMES, &income, true)
                .await?;
            Ok(())
        }
    }

    /// Books a transaction before failing, so the subject cannot be removed
    struct LedgerWritingSetup;

    #[async_trait]
    impl AccountingSetup for LedgerWritingSetup {
        async fn setup(&self, accounting: &Accounting, system: &AccountSystem) -> Result<(), AccountingError> {
            let asset = accounting.account_type("ASSET").await?;
            let cash = accounting.add_account(system.id, "/".into(), "cash", &asset, false).await?;
            let till = accounting.add_account(system.id, "/".into(), "till", &asset, false).await?;
            accounting
                .register_simple_transaction(TransactionHeader::new("float", system.owner), &cash, &till, dec!(20))
                .await?;
            Err(AccountingError::invalid_operation("setup aborted"))
        }
    }

    #[tokio::test]
    async fn test_create_and_find_subject() {
        init_tracing();
        let accounting = Accounting::in_memory();
        let external_id = fake_external_id();
        let system = TestSystemBuilder::new(external_id.clone()).build(&accounting).await.unwrap();

        let kind = SubjectKind::new(TEST_KIND);
        let found = accounting.subject_of(&kind, &external_id).await.unwrap();
        assert_eq!(found, system.subject);
        assert_eq!(accounting.subject(found.id).await.unwrap(), found);

        let owned = accounting.accounting_system_of(&found).await.unwrap();
        assert_eq!(owned, system.system);
        assert_eq!(owned.owner, found.id);
    }

    #[tokio::test]
    async fn test_unknown_kind_is_not_found() {
        let accounting = Accounting::in_memory();
        let err = accounting
            .create_subject(SubjectKind::new("martian"), "zork")
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_duplicate_kind_registration_is_conflict() {
        let accounting = Accounting::in_memory();
        let kind = SubjectKind::new("shop");
        accounting
            .register_subject_kind(kind.clone(), Arc::new(BareSetup))
            .await
            .unwrap();

        assert_error(
            accounting.register_subject_kind(kind, Arc::new(BareSetup)).await,
            |e| matches!(e, AccountingError::Conflict(_)),
            "Conflict",
        );
    }

    #[tokio::test]
    async fn test_duplicate_identity_is_conflict() {
        let accounting = Accounting::in_memory();
        TestSystemBuilder::new("erin").build(&accounting).await.unwrap();

        assert_error(
            accounting.create_subject(SubjectKind::new(TEST_KIND), "erin").await,
            |e| matches!(e, AccountingError::Conflict(_)),
            "Conflict",
        );
    }

    #[tokio::test]
    async fn test_failed_setup_removes_subject() {
        init_tracing();
        let accounting = Accounting::in_memory();
        let kind = SubjectKind::new("broken");
        accounting
            .register_subject_kind(kind.clone(), Arc::new(FailingSetup))
            .await
            .unwrap();

        assert_error(
            accounting.create_subject(kind.clone(), "frank").await,
            |e| matches!(e, AccountingError::Conflict(_)),
            "Conflict",
        );
        assert!(accounting.subject_of(&kind, "frank").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_failed_cleanup_is_reported() {
        init_tracing();
        let accounting = Accounting::in_memory();
        let kind = SubjectKind::new("half-built");
        accounting
            .register_subject_kind(kind.clone(), Arc::new(LedgerWritingSetup))
            .await
            .unwrap();

        let err = accounting.create_subject(kind.clone(), "judy").await.unwrap_err();
        match &err {
            AccountingError::IncompleteSubject { cause, cleanup, .. } => {
                assert!(matches!(**cause, AccountingError::InvalidAccountingOperation(_)));
                assert!(matches!(**cleanup, AccountingError::Conflict(_)));
            }
            other => panic!("expected IncompleteSubject, got {other:?}"),
        }
        assert!(!err.is_user_error());

        // the leftover subject is still there for an operator to inspect
        let leftover = accounting.subject_of(&kind, "judy").await.unwrap();
        let system = accounting.accounting_system_of(&leftover).await.unwrap();
        assert_eq!(accounting.total_amount(system.id).await.unwrap(), Decimal::ZERO);
    }

    #[tokio::test]
    async fn test_subject_without_system_is_not_configured() {
        let accounting = Accounting::in_memory();
        let subject = Subject::new(SubjectKind::new(TEST_KIND), "grace");
        accounting.store().insert_subject(&subject).await.unwrap();

        assert_error(
            accounting.accounting_system_of(&subject).await,
            |e| matches!(e, AccountingError::NotConfigured(_)),
            "NotConfigured",
        );

        let system = accounting.init_accounting_system(&subject).await.unwrap();
        let incomes = accounting.account_at(system.id, "/incomes").await.unwrap();
        assert!(incomes.is_placeholder);

        assert_error(
            accounting.init_accounting_system(&subject).await,
            |e| matches!(e, AccountingError::InvalidAccountingOperation(_)),
            "InvalidAccountingOperation",
        );
    }

    #[tokio::test]
    async fn test_delete_unused_subject() {
        let accounting = Accounting::in_memory();
        let system = stock_system(&accounting, "heidi").await.unwrap();

        accounting.delete_subject(&system.subject).await.unwrap();

        assert!(accounting.subject(system.subject.id).await.unwrap_err().is_not_found());
        assert!(accounting
            .account(system.account("/wallet").id)
            .await
            .unwrap_err()
            .is_not_found());
    }

    #[tokio::test]
    async fn test_delete_refused_once_ledger_is_used() {
        let accounting = Accounting::in_memory();
        let system = stock_system(&accounting, "ivan").await.unwrap();
        accounting
            .register_simple_transaction(
                TransactionHeader::new("move", system.subject.id),
                system.account("/wallet"),
                system.account("/bank"),
                dec!(5),
            )
            .await
            .unwrap();

        assert_error(
            accounting.delete_subject(&system.subject).await,
            |e| matches!(e, AccountingError::InvalidAccountingOperation(_)),
            "InvalidAccountingOperation",
        );
        assert!(accounting.subject(system.subject.id).await.is_ok());
    }
}
