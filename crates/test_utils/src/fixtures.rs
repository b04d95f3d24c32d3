//! Pre-built Test Fixtures
//!
//! A small solidarity-economy ecosystem ("DES"): people join purchasing
//! groups (GAS) and GAS sign solidal pacts with suppliers. Each kind of
//! subject builds its default accounts through an [`AccountingSetup`].
//!
//! ```text
//! person  /wallet   /expenses/gas/<gas>/{recharges,fees}
//! gas     /cash     /members/<person>   /expenses/suppliers/<supplier>
//!         /incomes/{recharges,fees}
//! supplier /wallet  /incomes/gas/<gas>
//! ```

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use std::sync::Arc;

use domain_accounting::{
    Account, AccountSystem, Accounting, AccountingError, AccountingSetup, BaseAccountType,
    Invoice, InvoicePaymentHook, Subject, SubjectKind, TransactionDraft, TransactionHeader,
    TransactionKind, TransactionReference,
};

pub const PERSON: &str = "person";
pub const GAS: &str = "gas";
pub const SUPPLIER: &str = "supplier";

/// Names used by [`Des::setup`]
pub const PERSON_NAMES: [&str; 4] = ["Mario Rossi", "Giorgio Verdi", "Tizio Tizi", "Alda Bianchi"];
pub const GAS_NAMES: [&str; 3] = ["GASteropode", "GASsosa", "MiGASo"];
pub const SUPPLIER_NAMES: [&str; 4] = ["GoodCompany", "BioNatura", "Acme inc.", "EcoSuole"];

/// Default accounts of a person: a wallet
#[derive(Debug, Default)]
pub struct PersonSetup;

#[async_trait]
impl AccountingSetup for PersonSetup {
    async fn setup(&self, accounting: &Accounting, system: &AccountSystem) -> Result<(), AccountingError> {
        let asset = accounting.account_type("ASSET").await?;
        accounting.add_account(system.id, "/".into(), "wallet", &asset, false).await?;
        Ok(())
    }

    fn main_account_path(&self) -> Option<&str> {
        Some("/wallet")
    }
}

/// Default accounts of a GAS; a GAS pays supplier invoices from its cash
#[derive(Debug, Default)]
pub struct GasSetup {
    hook: GasPaymentHook,
}

#[async_trait]
impl AccountingSetup for GasSetup {
    async fn setup(&self, accounting: &Accounting, system: &AccountSystem) -> Result<(), AccountingError> {
        let asset = accounting.account_type("ASSET").await?;
        let income = accounting.account_type("INCOME").await?;
        let expense = accounting.account_type("EXPENSE").await?;

        accounting.add_account(system.id, "/".into(), "cash", &asset, false).await?;
        accounting.add_account(system.id, "/".into(), "members", &asset, true).await?;
        accounting
            .add_account(system.id, "/expenses".into(), "suppliers", &expense, true)
            .await?;
        accounting
            .add_account(system.id, "/incomes".into(), "recharges", &income, false)
            .await?;
        accounting.add_account(system.id, "/incomes".into(), "fees", &income, false).await?;
        Ok(())
    }

    fn main_account_path(&self) -> Option<&str> {
        Some("/cash")
    }

    fn payment_hook(&self) -> Option<&dyn InvoicePaymentHook> {
        Some(&self.hook)
    }
}

/// Pays a supplier invoice: GAS cash to supplier wallet through the pact accounts
#[derive(Debug, Default)]
pub struct GasPaymentHook;

#[async_trait]
impl InvoicePaymentHook for GasPaymentHook {
    async fn payment_transactions(
        &self,
        accounting: &Accounting,
        invoice: &Invoice,
        is_being_paid: bool,
    ) -> Result<Vec<TransactionDraft>, AccountingError> {
        if !is_being_paid {
            return Ok(Vec::new());
        }

        let gas = accounting.subject(invoice.recipient).await?;
        let supplier = accounting.subject(invoice.issuer).await?;
        let gas_system = accounting.accounting_system_of(&gas).await?;
        let supplier_system = accounting.accounting_system_of(&supplier).await?;

        let source = accounting.account_at(gas_system.id, "/cash").await?;
        let exit = accounting
            .account_at(gas_system.id, &format!("/expenses/suppliers/{}", supplier.external_id))
            .await?;
        let entry = accounting
            .account_at(supplier_system.id, &format!("/incomes/gas/{}", gas.external_id))
            .await?;
        let target = accounting.account_at(supplier_system.id, "/wallet").await?;

        let header = TransactionHeader::new(format!("Payment of invoice {}", invoice.id), gas.id)
            .kind(TransactionKind::InvoicePayment)
            .with_reference(TransactionReference::new("invoice", invoice.id));
        let draft = TransactionDraft::crossing(
            header,
            &source,
            Some(&exit),
            Some(&entry),
            &target,
            invoice.total_amount(),
        )?;
        Ok(vec![draft])
    }
}

/// Default accounts of a supplier; acknowledging payment books nothing
#[derive(Debug, Default)]
pub struct SupplierSetup {
    hook: AcknowledgeOnlyHook,
}

#[async_trait]
impl AccountingSetup for SupplierSetup {
    async fn setup(&self, accounting: &Accounting, system: &AccountSystem) -> Result<(), AccountingError> {
        let asset = accounting.account_type("ASSET").await?;
        let income = accounting.account_type("INCOME").await?;
        accounting.add_account(system.id, "/".into(), "wallet", &asset, false).await?;
        accounting.add_account(system.id, "/incomes".into(), "gas", &income, true).await?;
        Ok(())
    }

    fn main_account_path(&self) -> Option<&str> {
        Some("/wallet")
    }

    fn payment_hook(&self) -> Option<&dyn InvoicePaymentHook> {
        Some(&self.hook)
    }
}

/// Hook that settles invoices without booking transactions
#[derive(Debug, Default)]
pub struct AcknowledgeOnlyHook;

#[async_trait]
impl InvoicePaymentHook for AcknowledgeOnlyHook {
    async fn payment_transactions(
        &self,
        _accounting: &Accounting,
        _invoice: &Invoice,
        _is_being_paid: bool,
    ) -> Result<Vec<TransactionDraft>, AccountingError> {
        Ok(Vec::new())
    }
}

/// Registers the person, GAS and supplier kinds
pub async fn register_des_kinds(accounting: &Accounting) -> Result<(), AccountingError> {
    accounting
        .register_subject_kind(SubjectKind::new(PERSON), Arc::new(PersonSetup))
        .await?;
    accounting
        .register_subject_kind(SubjectKind::new(GAS), Arc::new(GasSetup::default()))
        .await?;
    accounting
        .register_subject_kind(SubjectKind::new(SUPPLIER), Arc::new(SupplierSetup::default()))
        .await?;
    Ok(())
}

/// Accounts opened when a person joins a GAS
#[derive(Debug, Clone)]
pub struct Membership {
    /// Person-side `/expenses/gas/<gas>/recharges`
    pub recharges: Account,
    /// Person-side `/expenses/gas/<gas>/fees`
    pub fees: Account,
    /// GAS-side `/members/<person>`
    pub member_account: Account,
}

/// Opens the membership accounts on both sides
pub async fn join_gas(
    accounting: &Accounting,
    person: &Subject,
    gas: &Subject,
) -> Result<Membership, AccountingError> {
    let expense = accounting.account_type("EXPENSE").await?;
    let asset = accounting.account_type("ASSET").await?;
    let person_system = accounting.accounting_system_of(person).await?;
    let gas_system = accounting.accounting_system_of(gas).await?;

    let base = match accounting.account_at(person_system.id, "/expenses/gas").await {
        Ok(account) => account,
        Err(e) if e.is_not_found() => {
            accounting
                .add_account(person_system.id, "/expenses".into(), GAS, &expense, true)
                .await?
        }
        Err(e) => return Err(e),
    };
    let per_gas = accounting
        .add_account(person_system.id, (&base).into(), &gas.external_id, &expense, true)
        .await?;
    let recharges = accounting
        .add_account(person_system.id, (&per_gas).into(), "recharges", &expense, false)
        .await?;
    let fees = accounting
        .add_account(person_system.id, (&per_gas).into(), "fees", &expense, false)
        .await?;
    let member_account = accounting
        .add_account(gas_system.id, "/members".into(), &person.external_id, &asset, false)
        .await?;

    Ok(Membership {
        recharges,
        fees,
        member_account,
    })
}

/// Accounts opened by a GAS-supplier solidal pact
#[derive(Debug, Clone)]
pub struct SolidalPact {
    /// GAS-side `/expenses/suppliers/<supplier>`
    pub gas_expense: Account,
    /// Supplier-side `/incomes/gas/<gas>`
    pub supplier_income: Account,
}

/// Opens the pact accounts on both sides
pub async fn sign_solidal_pact(
    accounting: &Accounting,
    gas: &Subject,
    supplier: &Subject,
) -> Result<SolidalPact, AccountingError> {
    let expense = accounting.account_type("EXPENSE").await?;
    let income = accounting.account_type("INCOME").await?;
    let gas_system = accounting.accounting_system_of(gas).await?;
    let supplier_system = accounting.accounting_system_of(supplier).await?;

    let gas_expense = accounting
        .add_account(
            gas_system.id,
            "/expenses/suppliers".into(),
            &supplier.external_id,
            &expense,
            false,
        )
        .await?;
    let supplier_income = accounting
        .add_account(supplier_system.id, "/incomes/gas".into(), &gas.external_id, &income, false)
        .await?;

    Ok(SolidalPact {
        gas_expense,
        supplier_income,
    })
}

/// The full test ecosystem
#[derive(Debug, Clone)]
pub struct Des {
    pub people: Vec<Subject>,
    pub gases: Vec<Subject>,
    pub suppliers: Vec<Subject>,
}

impl Des {
    /// Registers the kinds, creates every subject and signs the pacts
    /// GAS 1 with suppliers 1, 2 and 3, GAS 2 with suppliers 2 and 3
    pub async fn setup(accounting: &Accounting) -> Result<Self, AccountingError> {
        register_des_kinds(accounting).await?;

        let mut people = Vec::new();
        for name in PERSON_NAMES {
            people.push(accounting.create_subject(SubjectKind::new(PERSON), name).await?);
        }
        let mut gases = Vec::new();
        for name in GAS_NAMES {
            gases.push(accounting.create_subject(SubjectKind::new(GAS), name).await?);
        }
        let mut suppliers = Vec::new();
        for name in SUPPLIER_NAMES {
            suppliers.push(accounting.create_subject(SubjectKind::new(SUPPLIER), name).await?);
        }

        for (g, s) in [(1, 1), (1, 2), (1, 3), (2, 2), (2, 3)] {
            sign_solidal_pact(accounting, &gases[g], &suppliers[s]).await?;
        }

        Ok(Self {
            people,
            gases,
            suppliers,
        })
    }

    /// Account at `path` in the system of `subject`
    pub async fn account(
        &self,
        accounting: &Accounting,
        subject: &Subject,
        path: &str,
    ) -> Result<Account, AccountingError> {
        let system = accounting.accounting_system_of(subject).await?;
        accounting.account_at(system.id, path).await
    }
}

/// Fixed dates
pub struct DateFixtures;

impl DateFixtures {
    /// Jan 1, 2024, midnight UTC
    pub fn new_year() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    /// Jun 15, 2024, noon UTC
    pub fn mid_year() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap()
    }

    pub fn issue_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
    }

    pub fn due_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 31).unwrap()
    }

    pub fn after_due_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 4, 15).unwrap()
    }
}

/// Base roles usable as transaction sources and targets
pub const STOCK_TYPES: [BaseAccountType; 2] = [BaseAccountType::Asset, BaseAccountType::Liability];
/// Base roles usable as entry and exit points
pub const FLUX_TYPES: [BaseAccountType; 2] = [BaseAccountType::Income, BaseAccountType::Expense];
