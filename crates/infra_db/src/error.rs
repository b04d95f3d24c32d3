//! SQL failures and their translation into [`PortError`]

use thiserror::Error;

use core_kernel::PortError;

/// A failed database operation, classified by PostgreSQL error code
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("cannot reach the accounting database: {0}")]
    ConnectionFailed(String),

    #[error("no free connection in the pool")]
    PoolExhausted,

    #[error("query failed: {0}")]
    QueryFailed(String),

    #[error("{entity} {id} not found")]
    NotFound { entity: String, id: String },

    /// Unique index hit: a second root, a duplicate sibling name, a reused entry id
    #[error("duplicate row: {0}")]
    DuplicateEntry(String),

    /// Deleting a row that ledger rows still point at
    #[error("row still referenced: {0}")]
    ForeignKeyViolation(String),

    #[error("check constraint failed: {0}")]
    ConstraintViolation(String),

    /// Serialization failure or deadlock; the transaction was rolled back
    #[error("lock contention: {0}")]
    Contention(String),
}

impl DatabaseError {
    /// ```rust
    /// use infra_db::DatabaseError;
    ///
    /// let error = DatabaseError::not_found("Account", "ACC-123");
    /// assert!(error.is_not_found());
    /// ```
    pub fn not_found(entity: &str, id: impl std::fmt::Display) -> Self {
        DatabaseError::NotFound {
            entity: entity.to_string(),
            id: id.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, DatabaseError::NotFound { .. })
    }
}

/// Maps SQLx errors to DatabaseError variants by PostgreSQL error code
impl From<&sqlx::Error> for DatabaseError {
    fn from(error: &sqlx::Error) -> Self {
        match error {
            sqlx::Error::RowNotFound => DatabaseError::NotFound {
                entity: "Record".to_string(),
                id: "unknown".to_string(),
            },
            sqlx::Error::PoolTimedOut => DatabaseError::PoolExhausted,
            sqlx::Error::Io(e) => DatabaseError::ConnectionFailed(e.to_string()),
            sqlx::Error::Database(db_err) => {
                // https://www.postgresql.org/docs/current/errcodes-appendix.html
                let message = db_err.message().to_string();
                match db_err.code().as_deref() {
                    Some("23505") => DatabaseError::DuplicateEntry(message),
                    Some("23503") => DatabaseError::ForeignKeyViolation(message),
                    Some("23514") => DatabaseError::ConstraintViolation(message),
                    Some("40001") | Some("40P01") => DatabaseError::Contention(message),
                    _ => DatabaseError::QueryFailed(message),
                }
            }
            _ => DatabaseError::QueryFailed(error.to_string()),
        }
    }
}

impl From<sqlx::Error> for DatabaseError {
    fn from(error: sqlx::Error) -> Self {
        DatabaseError::from(&error)
    }
}

impl From<DatabaseError> for PortError {
    fn from(error: DatabaseError) -> Self {
        match error {
            DatabaseError::NotFound { entity, id } => PortError::NotFound {
                entity_type: entity,
                id,
            },
            DatabaseError::DuplicateEntry(message) | DatabaseError::ForeignKeyViolation(message) => {
                PortError::Conflict { message }
            }
            DatabaseError::Contention(message) => PortError::Contention { message },
            DatabaseError::ConstraintViolation(message) => PortError::Validation { message },
            e @ (DatabaseError::ConnectionFailed(_) | DatabaseError::PoolExhausted) => {
                PortError::connection(e.to_string())
            }
            e @ DatabaseError::QueryFailed(_) => PortError::internal(e.to_string()),
        }
    }
}
