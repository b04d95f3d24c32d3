//! Store port plumbing
//!
//! The domain crate declares its `AccountingStore` port on top of
//! [`DomainPort`] and [`HealthCheckable`]; every store implementation
//! (in-memory, PostgreSQL) reports failures as a [`PortError`].

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Failure reported by a store
#[derive(Debug, Error)]
pub enum PortError {
    #[error("{entity_type} {id} does not exist")]
    NotFound { entity_type: String, id: String },

    /// A write was refused by a uniqueness or reference rule
    #[error("conflicting write: {message}")]
    Conflict { message: String },

    /// A write was refused because its input breaks a store rule
    #[error("rejected by store: {message}")]
    Validation { message: String },

    /// A concurrent writer won a lock or serialization race; the
    /// operation was rolled back and can be retried as is
    #[error("lost a race with another writer: {message}")]
    Contention { message: String },

    #[error("store unreachable: {message}")]
    Connection { message: String },

    /// A stored row could not be decoded into a domain value
    #[error("corrupted record: {message}")]
    Corrupted { message: String },

    #[error("store failure: {message}")]
    Internal { message: String },
}

impl PortError {
    pub fn not_found(entity_type: impl Into<String>, id: impl fmt::Display) -> Self {
        PortError::NotFound {
            entity_type: entity_type.into(),
            id: id.to_string(),
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        PortError::Conflict { message: message.into() }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        PortError::Validation { message: message.into() }
    }

    pub fn contention(message: impl Into<String>) -> Self {
        PortError::Contention { message: message.into() }
    }

    pub fn connection(message: impl Into<String>) -> Self {
        PortError::Connection { message: message.into() }
    }

    pub fn corrupted(message: impl Into<String>) -> Self {
        PortError::Corrupted { message: message.into() }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        PortError::Internal { message: message.into() }
    }

    /// Whether retrying the same call may succeed
    pub fn is_transient(&self) -> bool {
        matches!(self, PortError::Connection { .. } | PortError::Contention { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, PortError::NotFound { .. })
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, PortError::Conflict { .. })
    }
}

/// Marker for store ports; they are shared across tasks behind an `Arc`
pub trait DomainPort: Send + Sync + 'static {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdapterHealth {
    Healthy,
    Unhealthy,
}

/// Outcome of probing a store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheckResult {
    pub adapter_id: String,
    pub status: AdapterHealth,
    /// Round trip of the probe
    pub latency_ms: u64,
    pub message: Option<String>,
    pub checked_at: chrono::DateTime<chrono::Utc>,
}

impl HealthCheckResult {
    fn probe(adapter_id: impl Into<String>, status: AdapterHealth, latency_ms: u64, message: Option<String>) -> Self {
        Self {
            adapter_id: adapter_id.into(),
            status,
            latency_ms,
            message,
            checked_at: chrono::Utc::now(),
        }
    }

    pub fn healthy(adapter_id: impl Into<String>, latency_ms: u64) -> Self {
        Self::probe(adapter_id, AdapterHealth::Healthy, latency_ms, None)
    }

    pub fn unhealthy(adapter_id: impl Into<String>, latency_ms: u64, message: impl Into<String>) -> Self {
        Self::probe(adapter_id, AdapterHealth::Unhealthy, latency_ms, Some(message.into()))
    }

    pub fn is_healthy(&self) -> bool {
        self.status == AdapterHealth::Healthy
    }
}

#[async_trait::async_trait]
pub trait HealthCheckable: Send + Sync {
    async fn health_check(&self) -> HealthCheckResult;
}
