//! Invoices
//!
//! Invoices are metadata records linking an issuer to a recipient. Settling
//! one produces domain-specific transactions built by an
//! [`InvoicePaymentHook`].

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use core_kernel::{InvoiceId, SubjectId};

use crate::error::AccountingError;
use crate::factory::TransactionDraft;
use crate::service::Accounting;

/// Invoice status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InvoiceStatus {
    /// Issued, waiting for payment
    Issued,
    /// Past its due date without payment
    Overdue,
    /// Paid by the recipient
    Payed,
    /// Payment acknowledged by the issuer
    PaymentConfirmed,
}

impl InvoiceStatus {
    /// Allowed moves of the status machine
    pub fn can_transition_to(self, next: InvoiceStatus) -> bool {
        use InvoiceStatus::*;
        matches!(
            (self, next),
            (Issued, Overdue)
                | (Issued | Overdue, Payed)
                | (Issued | Overdue | Payed, PaymentConfirmed)
        )
    }

    /// Checks a move and returns the new status
    pub fn transition(self, next: InvoiceStatus) -> Result<InvoiceStatus, AccountingError> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(AccountingError::invalid_operation(format!(
                "invoice cannot go from {} to {}",
                self, next
            )))
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Issued => "ISSUED",
            InvoiceStatus::Overdue => "OVERDUE",
            InvoiceStatus::Payed => "PAYED",
            InvoiceStatus::PaymentConfirmed => "PAYMENT_CONFIRMED",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "ISSUED" => Some(InvoiceStatus::Issued),
            "OVERDUE" => Some(InvoiceStatus::Overdue),
            "PAYED" => Some(InvoiceStatus::Payed),
            "PAYMENT_CONFIRMED" => Some(InvoiceStatus::PaymentConfirmed),
            _ => None,
        }
    }
}

impl fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An invoice issued by one subject to another
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invoice {
    /// Unique identifier
    pub id: InvoiceId,
    /// Subject who issued the invoice
    pub issuer: SubjectId,
    /// Subject expected to pay it
    pub recipient: SubjectId,
    /// Amount before taxes
    pub net_amount: Decimal,
    /// Taxes, if any
    pub taxes: Option<Decimal>,
    pub issue_date: NaiveDate,
    pub due_date: NaiveDate,
    pub status: InvoiceStatus,
    /// Reference to the stored document
    pub document: Option<String>,
}

impl Invoice {
    /// Net amount plus taxes
    pub fn total_amount(&self) -> Decimal {
        self.net_amount + self.taxes.unwrap_or(Decimal::ZERO)
    }

    /// True if unpaid and `today` is after the due date
    pub fn is_past_due(&self, today: NaiveDate) -> bool {
        matches!(self.status, InvoiceStatus::Issued | InvoiceStatus::Overdue) && today > self.due_date
    }
}

/// Data for issuing an invoice
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewInvoice {
    pub issuer: SubjectId,
    pub recipient: SubjectId,
    pub net_amount: Decimal,
    pub taxes: Option<Decimal>,
    pub issue_date: NaiveDate,
    pub due_date: NaiveDate,
    pub document: Option<String>,
}

impl NewInvoice {
    pub fn new(
        issuer: SubjectId,
        recipient: SubjectId,
        net_amount: Decimal,
        issue_date: NaiveDate,
        due_date: NaiveDate,
    ) -> Self {
        Self {
            issuer,
            recipient,
            net_amount,
            taxes: None,
            issue_date,
            due_date,
            document: None,
        }
    }

    /// Sets the taxes
    pub fn with_taxes(mut self, taxes: Decimal) -> Self {
        self.taxes = Some(taxes);
        self
    }

    /// Sets the document reference
    pub fn with_document(mut self, document: impl Into<String>) -> Self {
        self.document = Some(document.into());
        self
    }

    /// Checks the data and builds an `Issued` invoice
    pub fn into_invoice(self) -> Result<Invoice, AccountingError> {
        if self.issuer == self.recipient {
            return Err(AccountingError::invalid_operation(
                "an invoice cannot be issued to its own issuer",
            ));
        }
        if self.net_amount.is_sign_negative() || self.taxes.is_some_and(|t| t.is_sign_negative()) {
            return Err(AccountingError::invalid_operation(
                "invoice amounts cannot be negative",
            ));
        }
        if self.due_date < self.issue_date {
            return Err(AccountingError::invalid_operation(
                "invoice is due before it was issued",
            ));
        }

        Ok(Invoice {
            id: InvoiceId::new_v7(),
            issuer: self.issuer,
            recipient: self.recipient,
            net_amount: self.net_amount,
            taxes: self.taxes,
            issue_date: self.issue_date,
            due_date: self.due_date,
            status: InvoiceStatus::Issued,
            document: self.document,
        })
    }
}

/// Domain capability building the transactions that settle an invoice
#[async_trait]
pub trait InvoicePaymentHook: Send + Sync {
    /// Drafts to register when `invoice` is paid (`is_being_paid`, called on
    /// the recipient's side) or its payment acknowledged (issuer's side)
    async fn payment_transactions(
        &self,
        accounting: &Accounting,
        invoice: &Invoice,
        is_being_paid: bool,
    ) -> Result<Vec<TransactionDraft>, AccountingError>;
}
