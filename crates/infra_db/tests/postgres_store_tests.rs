//! PostgreSQL store integration tests
//!
//! Each test starts its own PostgreSQL container; run with
//! `cargo test -p infra_db -- --ignored` on a host with Docker.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;

use core_kernel::{HealthCheckable, TransactionId};
use domain_accounting::{
    Accounting, AccountingConfig, AccountingError, AccountingStore, BaseAccountType, CashFlow,
    InvoiceStatus, NewInvoice, SplitSpec, TransactionDraft, TransactionHeader, TransactionReference,
};
use infra_db::{connect_store, DatabaseConfig, PostgresAccountingStore};
use test_utils::{
    assert_balance, assert_error, assert_gap_free, assert_unique_entry_ids,
    create_isolated_test_database, init_tracing, stock_system, DateFixtures, Des, TestDatabase,
};

async fn accounting_on(db: &TestDatabase) -> Accounting {
    let store = Arc::new(PostgresAccountingStore::new(db.pool().clone()));
    Accounting::new(store, AccountingConfig::default()).await.unwrap()
}

async fn setup() -> (TestDatabase, Accounting) {
    init_tracing();
    let db = create_isolated_test_database().await.unwrap();
    let accounting = accounting_on(&db).await;
    (db, accounting)
}

// ============================================================================
// Store
// ============================================================================

mod store_tests {
    use super::*;

    #[tokio::test]
    #[ignore = "requires Docker"]
    async fn test_health_check() {
        let (db, _) = setup().await;
        let store = PostgresAccountingStore::new(db.pool().clone());
        assert!(store.health_check().await.is_healthy());
    }

    #[tokio::test]
    #[ignore = "requires Docker"]
    async fn test_connect_store_from_config() {
        let (db, _) = setup().await;
        // the container already carries the schema
        let config = DatabaseConfig::new(db.url()).max_connections(2).run_migrations(false);
        let store = connect_store(&config).await.unwrap();
        let accounting = Accounting::new(Arc::new(store), AccountingConfig::default())
            .await
            .unwrap();
        let asset = accounting.account_type("ASSET").await.unwrap();
        assert_eq!(asset.base_type(), BaseAccountType::Asset);
    }

    #[tokio::test]
    #[ignore = "requires Docker"]
    async fn test_account_types_survive_restart() {
        let (db, accounting) = setup().await;
        accounting
            .register_account_type("bank_account", BaseAccountType::Asset)
            .await
            .unwrap();

        let restarted = accounting_on(&db).await;
        let reloaded = restarted.account_type("BANK_ACCOUNT").await.unwrap();
        assert_eq!(reloaded.base_type(), BaseAccountType::Asset);
        assert_error(
            restarted
                .register_account_type("bank_account", BaseAccountType::Liability)
                .await,
            |e| matches!(e, AccountingError::Conflict(_)),
            "Conflict",
        );
    }

    #[tokio::test]
    #[ignore = "requires Docker"]
    async fn test_tree_round_trips() {
        let (_db, accounting) = setup().await;
        let alice = stock_system(&accounting, "alice").await.unwrap();

        let wallet = accounting.account_at(alice.system.id, "/wallet").await.unwrap();
        assert_eq!(&wallet, alice.account("/wallet"));

        let names: Vec<String> = accounting
            .get_children(alice.account("/"))
            .await
            .unwrap()
            .into_iter()
            .map(|a| a.name)
            .collect();
        assert_eq!(names, ["bank", "expenses", "incomes", "loan", "savings", "wallet"]);

        let ancestors = accounting
            .ancestors(alice.account("/incomes/sales"))
            .await
            .unwrap();
        assert_eq!(ancestors.len(), 2);
        assert!(ancestors[1].is_root());

        assert_error(
            accounting
                .add_account(alice.system.id, "/".into(), "wallet", &wallet.account_type, false)
                .await,
            |e| matches!(e, AccountingError::Conflict(_)),
            "Conflict",
        );
    }

    #[tokio::test]
    #[ignore = "requires Docker"]
    async fn test_subject_lookup_and_delete() {
        let (_db, accounting) = setup().await;
        let alice = stock_system(&accounting, "alice").await.unwrap();

        let found = accounting
            .subject_of(&alice.subject.kind, "alice")
            .await
            .unwrap();
        assert_eq!(found, alice.subject);

        accounting.delete_subject(&alice.subject).await.unwrap();
        assert!(accounting.subject(alice.subject.id).await.unwrap_err().is_not_found());
    }
}

// ============================================================================
// Ledger
// ============================================================================

mod ledger_tests {
    use super::*;

    #[tokio::test]
    #[ignore = "requires Docker"]
    async fn test_crossing_transaction_is_persisted() {
        let (_db, accounting) = setup().await;
        let alice = stock_system(&accounting, "alice").await.unwrap();
        let bob = stock_system(&accounting, "bob").await.unwrap();

        let registered = accounting
            .register_transaction(
                TransactionHeader::new("purchase", alice.subject.id)
                    .with_reference(TransactionReference::new("order", 42)),
                alice.account("/wallet"),
                Some(alice.account("/expenses/purchases")),
                Some(bob.account("/incomes/sales")),
                bob.account("/wallet"),
                dec!(50),
            )
            .await
            .unwrap();

        let loaded = accounting.transaction(registered.id).await.unwrap();
        assert_eq!(loaded.splits, registered.splits);
        assert_eq!(loaded.source, registered.source);
        assert_eq!(loaded.references, registered.references);
        assert_eq!(loaded.kind, registered.kind);

        assert_balance(&accounting, alice.account("/wallet"), dec!(-50)).await;
        assert_balance(&accounting, alice.account("/expenses/purchases"), dec!(50)).await;
        assert_balance(&accounting, bob.account("/incomes/sales"), dec!(50)).await;
        assert_balance(&accounting, bob.account("/wallet"), dec!(50)).await;
        assert_eq!(accounting.total_amount(bob.system.id).await.unwrap(), dec!(50));
    }

    #[tokio::test]
    #[ignore = "requires Docker"]
    async fn test_update_confirm_and_references() {
        let (_db, accounting) = setup().await;
        let alice = stock_system(&accounting, "alice").await.unwrap();
        let transaction = accounting
            .register_simple_transaction(
                TransactionHeader::new("move", alice.subject.id),
                alice.account("/wallet"),
                alice.account("/bank"),
                dec!(30),
            )
            .await
            .unwrap();

        let source = CashFlow::new(alice.account("/wallet").clone(), dec!(30)).unwrap();
        accounting
            .update_transaction(
                &transaction,
                source,
                vec![SplitSpec::internal(alice.account("/savings"), dec!(-30))],
            )
            .await
            .unwrap();
        assert_balance(&accounting, alice.account("/bank"), Decimal::ZERO).await;
        assert_balance(&accounting, alice.account("/savings"), dec!(30)).await;
        assert_eq!(accounting.next_entry_id(alice.account("/wallet")).await.unwrap(), 2);
        assert_eq!(accounting.next_entry_id(alice.account("/bank")).await.unwrap(), 1);
        assert_gap_free(&accounting.entries_for(alice.account("/wallet")).await.unwrap());

        accounting.confirm_transaction(transaction.id).await.unwrap();
        assert_error(
            accounting.confirm_transaction(transaction.id).await,
            |e| matches!(e, AccountingError::InvalidAccountingOperation(_)),
            "InvalidAccountingOperation",
        );

        let reference = TransactionReference::new("receipt", "R-1");
        accounting.add_reference(transaction.id, reference.clone()).await.unwrap();
        assert_error(
            accounting.add_reference(transaction.id, reference).await,
            |e| matches!(e, AccountingError::Conflict(_)),
            "Conflict",
        );
    }

    #[tokio::test]
    #[ignore = "requires Docker"]
    async fn test_stale_snapshot_is_refused_by_store() {
        let (db, accounting) = setup().await;
        let alice = stock_system(&accounting, "alice").await.unwrap();
        let bob = stock_system(&accounting, "bob").await.unwrap();
        let store = PostgresAccountingStore::new(db.pool().clone());

        // validated against the copy, which claims bob's wallet is alice's
        let mut wallet = bob.account("/wallet").clone();
        wallet.system = alice.system.id;
        let transaction = TransactionDraft::simple(
            TransactionHeader::new("move", alice.subject.id),
            alice.account("/wallet"),
            &wallet,
            dec!(10),
        )
        .into_transaction(TransactionId::new())
        .unwrap();

        let err = store.insert_transaction(&transaction).await.unwrap_err();
        assert!(err.is_conflict(), "{err:?}");
        assert_balance(&accounting, bob.account("/wallet"), Decimal::ZERO).await;
        assert_eq!(accounting.next_entry_id(alice.account("/wallet")).await.unwrap(), 1);
    }

    #[tokio::test]
    #[ignore = "requires Docker"]
    async fn test_account_with_entries_cannot_be_removed() {
        let (_db, accounting) = setup().await;
        let alice = stock_system(&accounting, "alice").await.unwrap();
        accounting
            .register_simple_transaction(
                TransactionHeader::new("move", alice.subject.id),
                alice.account("/wallet"),
                alice.account("/bank"),
                dec!(1),
            )
            .await
            .unwrap();

        assert_error(
            accounting.remove_account(alice.account("/bank")).await,
            |e| matches!(e, AccountingError::InvalidAccountingOperation(_)),
            "InvalidAccountingOperation",
        );
        accounting.remove_account(alice.account("/loan")).await.unwrap();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    #[ignore = "requires Docker"]
    async fn test_concurrent_writers_keep_ids_gap_free() {
        let (_db, accounting) = setup().await;
        let accounting = Arc::new(accounting);
        let alice = stock_system(&accounting, "alice").await.unwrap();

        let mut handles = Vec::new();
        for i in 0..16 {
            let accounting = accounting.clone();
            let wallet = alice.account("/wallet").clone();
            let target = if i % 2 == 0 { alice.account("/bank") } else { alice.account("/savings") }.clone();
            let issuer = alice.subject.id;
            handles.push(tokio::spawn(async move {
                accounting
                    .register_simple_transaction(
                        TransactionHeader::new(format!("transfer {i}"), issuer),
                        &wallet,
                        &target,
                        dec!(2),
                    )
                    .await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let wallet = accounting.entries_for(alice.account("/wallet")).await.unwrap();
        assert_eq!(wallet.len(), 16);
        assert_unique_entry_ids(&wallet);
        assert_gap_free(&wallet);
        assert_gap_free(&accounting.entries_for(alice.account("/bank")).await.unwrap());
        assert_balance(&accounting, alice.account("/wallet"), dec!(-32)).await;
    }
}

// ============================================================================
// Invoices
// ============================================================================

mod invoice_tests {
    use super::*;

    #[tokio::test]
    #[ignore = "requires Docker"]
    async fn test_invoice_settlement_is_atomic() {
        let (_db, accounting) = setup().await;
        let des = Des::setup(&accounting).await.unwrap();
        let (gas, supplier) = (&des.gases[1], &des.suppliers[1]);

        let invoice = accounting
            .issue_invoice(NewInvoice::new(
                supplier.id,
                gas.id,
                dec!(80),
                DateFixtures::issue_date(),
                DateFixtures::due_date(),
            ))
            .await
            .unwrap();
        assert_eq!(accounting.invoice(invoice.id).await.unwrap(), invoice);

        let gas_proxy = accounting.accounting_proxy_of(gas).await.unwrap();
        let (paid, transactions) = gas_proxy.pay_invoice(&invoice).await.unwrap();
        assert_eq!(paid.status, InvoiceStatus::Payed);
        assert_eq!(transactions.len(), 1);

        let wallet = des.account(&accounting, supplier, "/wallet").await.unwrap();
        assert_balance(&accounting, &wallet, dec!(80)).await;

        // a second payment fails and books nothing
        assert!(gas_proxy.pay_invoice(&invoice).await.is_err());
        assert_balance(&accounting, &wallet, dec!(80)).await;

        let supplier_proxy = accounting.accounting_proxy_of(supplier).await.unwrap();
        let (confirmed, _) = supplier_proxy.set_invoice_paid(&paid).await.unwrap();
        assert_eq!(confirmed.status, InvoiceStatus::PaymentConfirmed);
        assert_eq!(
            accounting.invoice(invoice.id).await.unwrap().status,
            InvoiceStatus::PaymentConfirmed
        );
    }
}
