//! Accounting domain errors

use rust_decimal::Decimal;
use thiserror::Error;

use core_kernel::PortError;

/// Errors that can occur in the accounting domain
///
/// Every validation failure is reported before anything is written, so an
/// `Err` from a mutating operation always means the store is unchanged.
#[derive(Debug, Error)]
pub enum AccountingError {
    /// Structural corruption of an account tree (missing/duplicate root, cycle)
    #[error("Malformed account tree: {0}")]
    MalformedTree(String),

    /// Path string does not follow the path syntax
    #[error("Malformed path: {0}")]
    MalformedPath(String),

    /// Account, type, subject or other entity absent
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// The subject never had an accounting system initialized
    #[error("No accounting system configured for subject {0}")]
    NotConfigured(String),

    /// Duplicate sibling, duplicate root or duplicate registration
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Wrong stock/flux role for the operation
    #[error("Invalid account type: {0}")]
    InvalidAccountType(String),

    /// Placeholder misuse, cross-system misuse, forbidden state transition
    #[error("Invalid accounting operation: {0}")]
    InvalidAccountingOperation(String),

    /// The signed flows of a transaction do not sum to zero
    #[error("Conservation of money violated: source amount {source_amount}, split amounts {splits_amount}")]
    ConservationViolation {
        source_amount: Decimal,
        splits_amount: Decimal,
    },

    /// Structural split rules violated
    #[error("Malformed transaction: {0}")]
    MalformedTransaction(String),

    /// Accounts from unrelated systems combined where forbidden
    #[error("Accounting system mismatch: {0}")]
    SystemMismatch(String),

    /// Subject creation failed and the partly created subject could not be removed
    #[error("Subject {subject} left partly created: {cause} (cleanup failed: {cleanup})")]
    IncompleteSubject {
        subject: String,
        #[source]
        cause: Box<AccountingError>,
        cleanup: Box<AccountingError>,
    },

    /// Infrastructure failure reported by the store adapter
    #[error("Store error: {0}")]
    Store(#[source] PortError),
}

impl AccountingError {
    /// Creates a NotFound error for an entity type and identifier
    pub fn not_found(entity: impl Into<String>, id: impl std::fmt::Display) -> Self {
        AccountingError::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    /// Creates a Conflict error
    pub fn conflict(message: impl Into<String>) -> Self {
        AccountingError::Conflict(message.into())
    }

    /// Creates an InvalidAccountingOperation error
    pub fn invalid_operation(message: impl Into<String>) -> Self {
        AccountingError::InvalidAccountingOperation(message.into())
    }

    /// Creates an InvalidAccountType error
    pub fn invalid_type(message: impl Into<String>) -> Self {
        AccountingError::InvalidAccountType(message.into())
    }

    /// Creates a MalformedPath error
    pub fn malformed_path(message: impl Into<String>) -> Self {
        AccountingError::MalformedPath(message.into())
    }

    /// Returns true if the caller may retry after re-reading state
    pub fn is_retryable(&self) -> bool {
        match self {
            AccountingError::Conflict(_) => true,
            AccountingError::Store(e) => e.is_transient(),
            _ => false,
        }
    }

    /// Returns true if the error stems from caller input rather than a bug or outage
    pub fn is_user_error(&self) -> bool {
        !matches!(
            self,
            AccountingError::MalformedTree(_)
                | AccountingError::IncompleteSubject { .. }
                | AccountingError::Store(_)
        )
    }

    /// Returns true if this error indicates the entity was not found
    pub fn is_not_found(&self) -> bool {
        matches!(self, AccountingError::NotFound { .. })
    }
}

impl From<PortError> for AccountingError {
    fn from(error: PortError) -> Self {
        match error {
            PortError::NotFound { entity_type, id } => AccountingError::NotFound {
                entity: entity_type,
                id,
            },
            PortError::Conflict { message } => AccountingError::Conflict(message),
            other => AccountingError::Store(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_port_not_found_is_translated() {
        let err: AccountingError = PortError::not_found("Account", "ACC-1").into();
        assert!(err.is_not_found());
        assert!(err.to_string().contains("ACC-1"));
    }

    #[test]
    fn test_port_conflict_is_translated_and_retryable() {
        let err: AccountingError = PortError::conflict("duplicate root").into();
        assert!(matches!(err, AccountingError::Conflict(_)));
        assert!(err.is_retryable());
    }

    #[test]
    fn test_transient_store_error_is_retryable() {
        let err: AccountingError = PortError::connection("reset by peer").into();
        assert!(matches!(err, AccountingError::Store(_)));
        assert!(err.is_retryable());
        assert!(!err.is_user_error());
    }

    #[test]
    fn test_malformed_tree_is_not_user_error() {
        let err = AccountingError::MalformedTree("two roots".into());
        assert!(!err.is_user_error());
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_conservation_message_carries_amounts() {
        let err = AccountingError::ConservationViolation {
            source_amount: dec!(100),
            splits_amount: dec!(-90),
        };
        let msg = err.to_string();
        assert!(msg.contains("100"));
        assert!(msg.contains("-90"));
        assert!(err.is_user_error());
    }
}
