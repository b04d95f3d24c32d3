//! Strongly-typed identifiers for accounting entities
//!
//! Every entity gets a UUID newtype so an account id cannot be passed where a
//! system id is expected. Identifiers render as `<PREFIX>-<uuid>`; parsing
//! accepts that form or a bare UUID, and rejects the prefix of another kind.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

/// Failure to parse an identifier from text
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid {kind} identifier {input:?}: {reason}")]
pub struct IdParseError {
    /// Prefix of the identifier kind being parsed
    pub kind: &'static str,
    pub input: String,
    pub reason: String,
}

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Display prefix
            pub const PREFIX: &'static str = $prefix;

            /// A random identifier
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// A time-ordered identifier; used for everything the store persists
            pub fn new_v7() -> Self {
                Self(Uuid::now_v7())
            }

            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }

            pub fn prefix() -> &'static str {
                Self::PREFIX
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}-{}", Self::PREFIX, self.0)
            }
        }

        impl FromStr for $name {
            type Err = IdParseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                parse_prefixed(Self::PREFIX, s).map(Self)
            }
        }

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Uuid {
                id.0
            }
        }
    };
}

fn parse_prefixed(prefix: &'static str, input: &str) -> Result<Uuid, IdParseError> {
    let error = |reason: String| IdParseError {
        kind: prefix,
        input: input.to_string(),
        reason,
    };

    let trimmed = input.trim();
    let raw = match trimmed.split_once('-') {
        // a UUID's first group is 8 hex digits, so a shorter head is a prefix
        Some((head, rest)) if head.len() < 8 => {
            if head != prefix {
                return Err(error(format!("expected prefix {prefix}, found {head}")));
            }
            rest
        }
        _ => trimmed,
    };
    Uuid::parse_str(raw).map_err(|e| error(e.to_string()))
}

define_id!(
    /// An economic subject able to own an accounting system
    SubjectId,
    "SUBJ"
);
define_id!(
    /// An accounting system, owned 1:1 by a subject
    AccountSystemId,
    "SYS"
);
define_id!(AccountId, "ACC");
define_id!(TransactionId, "TXN");
define_id!(InvoiceId, "INV");
