//! Identifier types for tenants, fields, animals and vaccines
//!
//! ID Format:
//! - Field IDs: `f-{7-char-hash}` (e.g., `f-7f2b4c1`)
//! - Animal IDs: `a-{7-char-hash}` (e.g., `a-9d3e5f2`)
//! - Vaccine IDs: `v-{7-char-hash}` (e.g., `v-1c0ffee`)
//!
//! Hash is derived from owner + name (or tag) + creation timestamp, so the
//! same name registered by two owners never collides. Hashes are short, so
//! the registries re-derive with a salt when a hash is already taken.
//!
//! Ledger rows (stays, snapshots, transfers, ...) use the integer row id the
//! store assigns; those are plain `i64`s.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum IdError {
    #[error("Invalid {kind} ID format: expected '{prefix}-{{7-char-hash}}', got '{value}'")]
    InvalidId {
        kind: &'static str,
        prefix: &'static str,
        value: String,
    },

    #[error("Owner ID must not be empty")]
    EmptyOwner,

    #[error("Unknown {kind} '{value}'")]
    UnknownVariant { kind: &'static str, value: String },
}

/// Generates a 7-character hash from the owner, a name, a timestamp and a salt
fn generate_hash(owner: &OwnerId, name: &str, timestamp: DateTime<Utc>, salt: u32) -> String {
    let mut input = format!(
        "{}\u{1f}{}\u{1f}{}",
        owner,
        name,
        timestamp.timestamp_nanos_opt().unwrap_or(0)
    );
    if salt > 0 {
        input.push_str(&format!("\u{1f}{}", salt));
    }
    let hash = blake3::hash(input.as_bytes());
    let hex = hash.to_hex();
    hex[..7].to_string()
}

fn parse_hash(s: &str, kind: &'static str, prefix: &'static str) -> Result<String, IdError> {
    let s = s.trim();
    let invalid = || IdError::InvalidId {
        kind,
        prefix,
        value: s.to_string(),
    };

    let hash = s
        .strip_prefix(prefix)
        .and_then(|rest| rest.strip_prefix('-'))
        .ok_or_else(invalid)?;

    if hash.len() != 7 || !hash.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(invalid());
    }

    Ok(hash.to_ascii_lowercase())
}

/// Tenant (user account) that owns fields, animals and vaccines
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct OwnerId(String);

impl OwnerId {
    pub fn new(value: impl Into<String>) -> Result<Self, IdError> {
        let value = value.into();
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(IdError::EmptyOwner);
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.0)
    }
}

impl FromStr for OwnerId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for OwnerId {
    type Error = IdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<OwnerId> for String {
    fn from(id: OwnerId) -> Self {
        id.0
    }
}

/// Declares a hashed entity ID with its textual prefix
macro_rules! hashed_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal, $kind:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name {
            hash: String,
        }

        impl $name {
            pub const PREFIX: &'static str = $prefix;

            /// Creates a new ID from owner, name and timestamp
            pub fn new(owner: &OwnerId, name: &str, timestamp: DateTime<Utc>) -> Self {
                Self::salted(owner, name, timestamp, 0)
            }

            /// Same as [`Self::new`] with a salt mixed in; salt 0 gives `new`'s ID
            pub fn salted(owner: &OwnerId, name: &str, timestamp: DateTime<Utc>, salt: u32) -> Self {
                Self {
                    hash: generate_hash(owner, name, timestamp, salt),
                }
            }

            /// Returns the hash portion of the ID
            pub fn hash(&self) -> &str {
                &self.hash
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.pad(&format!("{}-{}", $prefix, self.hash))
            }
        }

        impl FromStr for $name {
            type Err = IdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self {
                    hash: parse_hash(s, $kind, $prefix)?,
                })
            }
        }

        impl TryFrom<String> for $name {
            type Error = IdError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                value.parse()
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.to_string()
            }
        }
    };
}

hashed_id!(
    /// Field (paddock) ID in the format `f-{7-char-hash}`
    FieldId,
    "f",
    "field"
);

hashed_id!(
    /// Animal ID in the format `a-{7-char-hash}`
    AnimalId,
    "a",
    "animal"
);

hashed_id!(
    /// Vaccine ID in the format `v-{7-char-hash}`
    VaccineId,
    "v",
    "vaccine"
);
