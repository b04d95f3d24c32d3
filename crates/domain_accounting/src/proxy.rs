//! Per-subject accounting handle

use std::sync::Arc;
use tracing::instrument;

use crate::account::{Account, AccountSystem};
use crate::error::AccountingError;
use crate::invoice::{Invoice, InvoicePaymentHook, InvoiceStatus};
use crate::service::Accounting;
use crate::subject::{AccountingSetup, Subject};
use crate::transaction::Transaction;

/// A subject bound to its accounting system
///
/// Obtained from [`Accounting::accounting_proxy_of`]. Invoice settlement
/// goes through the subject kind's [`InvoicePaymentHook`].
#[derive(Clone)]
pub struct AccountingProxy<'a> {
    accounting: &'a Accounting,
    subject: Subject,
    system: AccountSystem,
    setup: Arc<dyn AccountingSetup>,
}

impl std::fmt::Debug for AccountingProxy<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountingProxy")
            .field("subject", &self.subject)
            .field("system", &self.system)
            .finish_non_exhaustive()
    }
}

impl<'a> AccountingProxy<'a> {
    pub(crate) fn new(
        accounting: &'a Accounting,
        subject: Subject,
        system: AccountSystem,
        setup: Arc<dyn AccountingSetup>,
    ) -> Self {
        Self {
            accounting,
            subject,
            system,
            setup,
        }
    }

    /// The subject this handle acts for
    pub fn subject(&self) -> &Subject {
        &self.subject
    }

    /// The subject's accounting system
    pub fn system(&self) -> &AccountSystem {
        &self.system
    }

    /// The subject's main account, for kinds that declare one
    pub async fn account(&self) -> Result<Option<Account>, AccountingError> {
        match self.setup.main_account_path() {
            Some(path) => Ok(Some(self.accounting.resolve_path(self.system.id, path).await?)),
            None => Ok(None),
        }
    }

    /// Pays an invoice addressed to this subject
    ///
    /// The invoice moves to `Payed` and the hook's transactions are
    /// registered in one atomic unit. Only the id of `invoice` is used; the
    /// recipient is checked on the stored invoice.
    #[instrument(skip(self, invoice), fields(subject = %self.subject, invoice_id = %invoice.id))]
    pub async fn pay_invoice(&self, invoice: &Invoice) -> Result<(Invoice, Vec<Transaction>), AccountingError> {
        self.accounting
            .settle_invoice(invoice.id, InvoiceStatus::Payed, &self.subject, self.hook()?)
            .await
    }

    /// Acknowledges payment of an invoice issued by this subject
    ///
    /// The issuer is checked on the stored invoice.
    #[instrument(skip(self, invoice), fields(subject = %self.subject, invoice_id = %invoice.id))]
    pub async fn set_invoice_paid(
        &self,
        invoice: &Invoice,
    ) -> Result<(Invoice, Vec<Transaction>), AccountingError> {
        self.accounting
            .settle_invoice(invoice.id, InvoiceStatus::PaymentConfirmed, &self.subject, self.hook()?)
            .await
    }

    fn hook(&self) -> Result<&dyn InvoicePaymentHook, AccountingError> {
        self.setup.payment_hook().ok_or_else(|| {
            AccountingError::invalid_operation(format!(
                "subject kind {} cannot settle invoices",
                self.subject.kind
            ))
        })
    }
}
