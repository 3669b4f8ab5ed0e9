//! Field (paddock) domain model and occupancy math

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::id::{FieldId, OwnerId};

/// A paddock or parcel of land owned by a tenant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub id: FieldId,
    pub owner: OwnerId,
    pub name: String,
    /// Area in hectares; always > 0 when present
    #[serde(skip_serializing_if = "Option::is_none")]
    pub area: Option<f64>,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub description: String,
    pub created_at: DateTime<Utc>,
}

impl Field {
    /// Animals per hectare for the given number of occupants
    pub fn density(&self, occupants: usize) -> f64 {
        density(occupants, self.area)
    }
}

/// Input for registering a field
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewField {
    pub name: String,
    pub area: Option<f64>,
    pub location: String,
    pub description: String,
}

impl NewField {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_area(mut self, area: f64) -> Self {
        self.area = Some(area);
        self
    }
}

/// Mutable descriptive fields of a field
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldUpdate {
    pub area: Option<f64>,
    pub location: Option<String>,
    pub description: Option<String>,
}

/// Returns occupants / area, or 0 when the area is unknown or not positive
pub fn density(occupants: usize, area: Option<f64>) -> f64 {
    match area {
        Some(area) if area > 0.0 => occupants as f64 / area,
        _ => 0.0,
    }
}

/// Three-bucket classification of a field's stocking density
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OccupancyLevel {
    Low,
    Medium,
    High,
}

impl OccupancyLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            OccupancyLevel::Low => "low",
            OccupancyLevel::Medium => "medium",
            OccupancyLevel::High => "high",
        }
    }
}

impl fmt::Display for OccupancyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Density bounds (animals per hectare) between the occupancy buckets
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OccupancyThresholds {
    /// Densities strictly below this are `Low`
    pub low_below: f64,
    /// Densities strictly above this are `High`
    pub high_above: f64,
}

impl Default for OccupancyThresholds {
    fn default() -> Self {
        Self {
            low_below: 0.8,
            high_above: 2.0,
        }
    }
}

impl OccupancyThresholds {
    pub fn classify(&self, density: f64) -> OccupancyLevel {
        if density < self.low_below {
            OccupancyLevel::Low
        } else if density > self.high_above {
            OccupancyLevel::High
        } else {
            OccupancyLevel::Medium
        }
    }
}
