//! Status snapshots
//!
//! An animal's productive cycle, health and general status are never stored
//! as mutable columns. Each change appends an immutable [`StatusSnapshot`]
//! and the current status is simply the latest one.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::id::{AnimalId, IdError};

/// Implements `as_str`, `Display` and `FromStr` for a kebab-case enum
macro_rules! text_enum {
    ($name:ident, $kind:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.pad(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = IdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
                    $($text => Ok($name::$variant),)+
                    _ => Err(IdError::UnknownVariant {
                        kind: $kind,
                        value: s.to_string(),
                    }),
                }
            }
        }
    };
}

/// Age/role classification of an animal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum ProductiveCycle {
    #[default]
    Calf,
    Steer,
    Bull,
    HeiferCalf,
    Heifer,
    Cow,
}

text_enum!(ProductiveCycle, "productive cycle", {
    Calf => "calf",
    Steer => "steer",
    Bull => "bull",
    HeiferCalf => "heifer-calf",
    Heifer => "heifer",
    Cow => "cow",
});

/// Health condition recorded on a snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Health {
    Healthy,
    Brucellosis,
    Tuberculosis,
    Other,
}

text_enum!(Health, "health status", {
    Healthy => "healthy",
    Brucellosis => "brucellosis",
    Tuberculosis => "tuberculosis",
    Other => "other",
});

/// General lifecycle marker of an animal
///
/// This is an informational trailing marker, not a gate: no operation is
/// refused because of the current general status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GeneralStatus {
    Active,
    Sold,
    Dead,
    Transferred,
}

text_enum!(GeneralStatus, "general status", {
    Active => "active",
    Sold => "sold",
    Dead => "dead",
    Transferred => "transferred",
});

impl GeneralStatus {
    /// Returns true if the animal has left the operation
    pub fn is_final(&self) -> bool {
        matches!(self, GeneralStatus::Sold | GeneralStatus::Dead)
    }
}

/// Immutable, timestamped record of an animal's status
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub id: i64,
    pub animal: AnimalId,
    pub recorded_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub productive_cycle: Option<ProductiveCycle>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub health: Option<Health>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub general_status: Option<GeneralStatus>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub notes: String,
}

/// Values for a snapshot that has not been written yet
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewStatus {
    pub productive_cycle: Option<ProductiveCycle>,
    pub health: Option<Health>,
    pub general_status: Option<GeneralStatus>,
    pub notes: String,
    /// Defaults to the time of the write
    pub recorded_at: Option<DateTime<Utc>>,
}

impl NewStatus {
    /// The snapshot every animal receives at intake
    pub fn intake(cycle: ProductiveCycle) -> Self {
        Self {
            productive_cycle: Some(cycle),
            health: Some(Health::Healthy),
            general_status: Some(GeneralStatus::Active),
            ..Self::default()
        }
    }

    /// A snapshot carrying only a general status marker
    pub fn general(status: GeneralStatus, notes: impl Into<String>) -> Self {
        Self {
            general_status: Some(status),
            notes: notes.into(),
            ..Self::default()
        }
    }

    /// Returns true if no status dimension is set
    pub fn is_empty(&self) -> bool {
        self.productive_cycle.is_none() && self.health.is_none() && self.general_status.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cycle_parses_both_separators() {
        assert_eq!("heifer-calf".parse::<ProductiveCycle>().unwrap(), ProductiveCycle::HeiferCalf);
        assert_eq!("Heifer_Calf".parse::<ProductiveCycle>().unwrap(), ProductiveCycle::HeiferCalf);
        assert!("yearling".parse::<ProductiveCycle>().is_err());
    }

    #[test]
    fn text_form_matches_serde() {
        for status in GeneralStatus::ALL {
            let json = serde_json::to_string(status).unwrap();
            assert_eq!(json, format!("\"{}\"", status.as_str()));
        }
        let json = serde_json::to_string(&ProductiveCycle::HeiferCalf).unwrap();
        assert_eq!(json, "\"heifer-calf\"");
    }

    #[test]
    fn intake_defaults() {
        let status = NewStatus::intake(ProductiveCycle::default());

        assert_eq!(status.productive_cycle, Some(ProductiveCycle::Calf));
        assert_eq!(status.health, Some(Health::Healthy));
        assert_eq!(status.general_status, Some(GeneralStatus::Active));
        assert!(status.recorded_at.is_none());
    }

    #[test]
    fn empty_status() {
        assert!(NewStatus::default().is_empty());
        assert!(!NewStatus::general(GeneralStatus::Dead, "").is_empty());
    }

    #[test]
    fn final_statuses() {
        assert!(GeneralStatus::Sold.is_final());
        assert!(GeneralStatus::Dead.is_final());
        assert!(!GeneralStatus::Transferred.is_final());
    }
}
