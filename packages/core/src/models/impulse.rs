//! Impulse rows and progress writes

use crate::models::{DayKey, ValidationError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One completion event for a node on a calendar day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Impulse {
    pub id: String,

    pub node_id: String,

    /// Count delta for quantity nodes, seconds for duration nodes, ignored for binary
    #[serde(default)]
    pub value: f64,

    /// Day the impulse counts towards
    pub completed_at: DayKey,

    pub created_at: DateTime<Utc>,
}

/// How a progress write combines with the day's existing impulses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WriteMode {
    /// Adds a new impulse; values are summed with earlier same-day impulses
    Incremental,
    /// Replaces the day's impulses with a single row holding the value
    Absolute,
}

impl WriteMode {
    pub fn is_incremental(self) -> bool {
        matches!(self, Self::Incremental)
    }
}

/// Parameters of a single `save_node_progress` call
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressWrite {
    pub node_id: String,
    pub value: f64,
    pub date: DayKey,
    pub mode: WriteMode,
}

impl ProgressWrite {
    /// Build a write, rejecting values that cannot be stored
    ///
    /// Deletion is never expressed through the value channel, so negative
    /// values are refused instead of being passed through as sentinels.
    pub fn new(
        node_id: impl Into<String>,
        value: f64,
        date: DayKey,
        mode: WriteMode,
    ) -> Result<Self, ValidationError> {
        let node_id = node_id.into();
        if node_id.trim().is_empty() {
            return Err(ValidationError::InvalidValue(
                "node id must not be empty".to_string(),
            ));
        }
        if !value.is_finite() {
            return Err(ValidationError::InvalidValue(format!(
                "progress value must be finite, got {}",
                value
            )));
        }
        if value < 0.0 {
            return Err(ValidationError::InvalidValue(format!(
                "progress value must not be negative, got {}",
                value
            )));
        }
        Ok(Self {
            node_id,
            value,
            date,
            mode,
        })
    }

    pub fn incremental(node_id: impl Into<String>, value: f64, date: DayKey) -> Result<Self, ValidationError> {
        Self::new(node_id, value, date, WriteMode::Incremental)
    }

    pub fn absolute(node_id: impl Into<String>, value: f64, date: DayKey) -> Result<Self, ValidationError> {
        Self::new(node_id, value, date, WriteMode::Absolute)
    }
}

/// RPC payload for `save_node_progress`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SaveProgressParams<'a> {
    pub p_node_id: &'a str,
    pub p_value: f64,
    pub p_date: DayKey,
    pub p_is_incremental: bool,
}

impl<'a> From<&'a ProgressWrite> for SaveProgressParams<'a> {
    fn from(write: &'a ProgressWrite) -> Self {
        Self {
            p_node_id: &write.node_id,
            p_value: write.value,
            p_date: write.date,
            p_is_incremental: write.mode.is_incremental(),
        }
    }
}
