//! Node Data Structures
//!
//! This module defines the `Node` struct (a trackable habit unit) and the
//! form-level types used to create and edit nodes.
//!
//! # Architecture
//!
//! - **Fixed Type**: `node_type` is chosen at creation and decides how a day's
//!   impulses accumulate (existence for binary, sum for quantity/duration)
//! - **Backend Rows**: Field names match the hosted `nodes` table (snake_case)
//! - **Validated Drafts**: Forms produce a `NodeDraft`, which is validated into a
//!   `NewNode` before any network call is made
//!
//! # Examples
//!
//! ```rust
//! use nodes_core::models::{NodeDefaults, NodeDraft, NodeType};
//!
//! let draft = NodeDraft {
//!     name: "Read".to_string(),
//!     node_type: NodeType::Quantity,
//!     connector_ids: vec!["connector-1".to_string()],
//!     ..Default::default()
//! };
//!
//! let new_node = draft.validate(&NodeDefaults::default()).unwrap();
//! // Quantity nodes without a target get the default of 10 units
//! assert_eq!(new_node.target_value, Some(10.0));
//! ```

use crate::models::icon::NodeIcon;
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;
use thiserror::Error;

/// Minimum node mass accepted by forms
pub const MIN_MASS: f64 = 0.5;

/// Maximum node mass accepted by forms
pub const MAX_MASS: f64 = 10.0;

/// Mass used when a form value cannot be parsed
pub const DEFAULT_MASS: f64 = 1.0;

const NAME_MIN_CHARS: usize = 2;
const NAME_MAX_CHARS: usize = 50;
const DESCRIPTION_MAX_CHARS: usize = 500;

// Hex color as produced by the color picker: #rrggbb
const COLOR_PATTERN: &str = r"^#[0-9a-fA-F]{6}$";

/// Validation errors for node forms
///
/// Each variant maps to a single form field so the UI can show the message
/// inline next to the offending input.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Invalid name: {0}")]
    InvalidName(String),

    #[error("Invalid description: {0}")]
    InvalidDescription(String),

    #[error("Invalid node type: {0}")]
    InvalidNodeType(String),

    #[error("Select at least one connector")]
    MissingConnector,

    #[error("Invalid color: {0}")]
    InvalidColor(String),

    #[error("Invalid value: {0}")]
    InvalidValue(String),

    #[error("Invalid date: {0}")]
    InvalidDate(String),
}

impl ValidationError {
    /// Form field this error belongs to
    pub fn field(&self) -> &'static str {
        match self {
            Self::InvalidName(_) => "name",
            Self::InvalidDescription(_) => "description",
            Self::InvalidNodeType(_) => "node_type",
            Self::MissingConnector => "connector_ids",
            Self::InvalidColor(_) => "color",
            Self::InvalidValue(_) => "value",
            Self::InvalidDate(_) => "date",
        }
    }
}

/// All validation failures collected from one form submission
#[derive(Error, Debug, Clone, PartialEq, Default)]
#[error("{}", self.summary())]
pub struct ValidationErrors(pub Vec<ValidationError>);

impl ValidationErrors {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn push(&mut self, error: ValidationError) {
        self.0.push(error);
    }

    /// First error reported for a given form field, if any
    pub fn for_field(&self, field: &str) -> Option<&ValidationError> {
        self.0.iter().find(|e| e.field() == field)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ValidationError> {
        self.0.iter()
    }

    fn summary(&self) -> String {
        self.0
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

impl From<ValidationError> for ValidationErrors {
    fn from(error: ValidationError) -> Self {
        Self(vec![error])
    }
}

/// Node type decides completion semantics
///
/// Maps to string values in the `node_type` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeType {
    /// Done / not done. Any impulse on a day completes it.
    #[default]
    Binary,
    /// Counted units accumulated towards `target_value`
    Quantity,
    /// Timed seconds accumulated towards `target_value` minutes
    Duration,
}

impl NodeType {
    /// Whether completion is driven by summing impulse values
    pub fn is_accumulating(self) -> bool {
        !matches!(self, Self::Binary)
    }
}

impl FromStr for NodeType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "binary" => Ok(Self::Binary),
            "quantity" => Ok(Self::Quantity),
            "duration" => Ok(Self::Duration),
            _ => Err(ValidationError::InvalidNodeType(s.to_string())),
        }
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Binary => write!(f, "binary"),
            Self::Quantity => write!(f, "quantity"),
            Self::Duration => write!(f, "duration"),
        }
    }
}

/// Display band for a node's externally computed stability score
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StabilityBand {
    /// 70 and above
    Stable,
    /// 30 to 70
    Wavering,
    /// Below 30
    Fading,
}

impl StabilityBand {
    pub fn from_score(score: f64) -> Self {
        if score >= 70.0 {
            Self::Stable
        } else if score >= 30.0 {
            Self::Wavering
        } else {
            Self::Fading
        }
    }
}

/// A trackable habit unit
///
/// # Fields
///
/// - `mass`: cost/complexity weight (0.5 - 10.0) counted against the daily capacity
/// - `target_value`: units for quantity nodes, minutes for duration nodes, unused for binary
/// - `stability_score`: 0 - 100, computed by the backend
/// - `completion_count`: confirmed completion events, maintained by the backend
/// - `connector_ids`: tags attached through the `node_connectors` join table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: String,

    pub user_id: String,

    pub name: String,

    #[serde(default)]
    pub description: Option<String>,

    pub node_type: NodeType,

    #[serde(default = "default_mass")]
    pub mass: f64,

    #[serde(default)]
    pub stability_score: f64,

    #[serde(default)]
    pub target_value: Option<f64>,

    #[serde(default)]
    pub completion_count: u32,

    #[serde(default)]
    pub color: Option<String>,

    #[serde(default)]
    pub icon: Option<String>,

    #[serde(default)]
    pub core_id: Option<String>,

    #[serde(default)]
    pub connector_ids: Vec<String>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

fn default_mass() -> f64 {
    DEFAULT_MASS
}

impl Node {
    /// Build a node from a validated draft, as the backend would store it
    pub fn from_new(id: impl Into<String>, user_id: impl Into<String>, new_node: NewNode) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            user_id: user_id.into(),
            name: new_node.name,
            description: new_node.description,
            node_type: new_node.node_type,
            mass: new_node.mass,
            stability_score: 0.0,
            target_value: new_node.target_value,
            completion_count: 0,
            color: Some(new_node.color),
            icon: Some(new_node.icon),
            core_id: new_node.core_id,
            connector_ids: new_node.connector_ids,
            created_at: now,
            updated_at: now,
        }
    }

    /// Target expressed in the unit impulses are recorded in
    ///
    /// Quantity targets are plain units, duration targets are stored in minutes
    /// while duration impulses carry seconds. Binary nodes and nodes without a
    /// positive target return `None`, which the progress calculator treats as
    /// "never completed by value".
    pub fn target_units(&self) -> Option<f64> {
        let target = self.target_value.filter(|t| t.is_finite() && *t > 0.0)?;
        match self.node_type {
            NodeType::Binary => None,
            NodeType::Quantity => Some(target),
            NodeType::Duration => Some(target * 60.0),
        }
    }

    /// Mass used for capacity accounting (missing or invalid mass counts as 1.0)
    pub fn effective_mass(&self) -> f64 {
        if self.mass.is_finite() && self.mass > 0.0 {
            self.mass
        } else {
            DEFAULT_MASS
        }
    }

    /// Resolved icon (unknown keys fall back to `NodeIcon::Unknown`)
    pub fn icon(&self) -> NodeIcon {
        self.icon
            .as_deref()
            .map(NodeIcon::from_key)
            .unwrap_or_default()
    }

    pub fn stability_band(&self) -> StabilityBand {
        StabilityBand::from_score(self.stability_score)
    }
}

/// Defaults applied while validating node forms
#[derive(Debug, Clone, PartialEq)]
pub struct NodeDefaults {
    pub quantity_target: f64,
    pub duration_target_minutes: f64,
    pub color: String,
    pub icon: String,
}

impl Default for NodeDefaults {
    fn default() -> Self {
        Self {
            quantity_target: 10.0,
            duration_target_minutes: 30.0,
            color: "#8b5cf6".to_string(),
            icon: NodeIcon::Circle.key().to_string(),
        }
    }
}

/// Raw create/edit form input
#[derive(Debug, Clone, PartialEq)]
pub struct NodeDraft {
    pub name: String,
    pub description: Option<String>,
    pub node_type: NodeType,
    pub mass: f64,
    pub target_value: Option<f64>,
    pub connector_ids: Vec<String>,
    pub color: Option<String>,
    pub icon: Option<String>,
    pub core_id: Option<String>,
}

impl Default for NodeDraft {
    fn default() -> Self {
        Self {
            name: String::new(),
            description: None,
            node_type: NodeType::Binary,
            mass: DEFAULT_MASS,
            target_value: None,
            connector_ids: Vec::new(),
            color: None,
            icon: None,
            core_id: None,
        }
    }
}

/// Parse the mass slider value, clamped to the accepted range
///
/// Unparseable input falls back to the default mass of 1.0.
pub fn parse_mass(input: &str) -> f64 {
    clamp_mass(input.trim().parse::<f64>().unwrap_or(DEFAULT_MASS))
}

/// Parse an optional numeric target; empty or invalid input means "no target"
pub fn parse_target(input: &str) -> Option<f64> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|v| v.is_finite())
}

fn clamp_mass(mass: f64) -> f64 {
    if mass.is_finite() {
        mass.clamp(MIN_MASS, MAX_MASS)
    } else {
        DEFAULT_MASS
    }
}

fn is_hex_color(color: &str) -> bool {
    static COLOR_REGEX: OnceLock<Regex> = OnceLock::new();
    COLOR_REGEX
        .get_or_init(|| Regex::new(COLOR_PATTERN).expect("color pattern is valid"))
        .is_match(color)
}

impl NodeDraft {
    /// Validate the form and normalize it into an insertable node
    ///
    /// All field errors are collected, not just the first one.
    pub fn validate(&self, defaults: &NodeDefaults) -> Result<NewNode, ValidationErrors> {
        let mut errors = ValidationErrors::default();

        let name = self.name.trim();
        let name_len = name.chars().count();
        if name_len < NAME_MIN_CHARS {
            errors.push(ValidationError::InvalidName(format!(
                "must be at least {} characters",
                NAME_MIN_CHARS
            )));
        } else if name_len > NAME_MAX_CHARS {
            errors.push(ValidationError::InvalidName(format!(
                "must be at most {} characters",
                NAME_MAX_CHARS
            )));
        }

        let description = self
            .description
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty());
        if let Some(d) = description {
            if d.chars().count() > DESCRIPTION_MAX_CHARS {
                errors.push(ValidationError::InvalidDescription(format!(
                    "must be at most {} characters",
                    DESCRIPTION_MAX_CHARS
                )));
            }
        }

        let mut connector_ids: Vec<String> = Vec::with_capacity(self.connector_ids.len());
        for id in &self.connector_ids {
            if !id.is_empty() && !connector_ids.contains(id) {
                connector_ids.push(id.clone());
            }
        }
        if connector_ids.is_empty() {
            errors.push(ValidationError::MissingConnector);
        }

        let color = match self.color.as_deref().map(str::trim) {
            Some(c) if !c.is_empty() => {
                if !is_hex_color(c) {
                    errors.push(ValidationError::InvalidColor(c.to_string()));
                }
                c.to_string()
            }
            _ => defaults.color.clone(),
        };

        let target_value = match self.node_type {
            NodeType::Binary => None,
            NodeType::Quantity | NodeType::Duration => {
                let fallback = if self.node_type == NodeType::Quantity {
                    defaults.quantity_target
                } else {
                    defaults.duration_target_minutes
                };
                match self.target_value.filter(|t| t.is_finite()) {
                    Some(t) if t > 0.0 => Some(t),
                    Some(t) if t < 0.0 => {
                        errors.push(ValidationError::InvalidValue(format!(
                            "target must be positive, got {}",
                            t
                        )));
                        None
                    }
                    _ => Some(fallback),
                }
            }
        };

        let icon = self
            .icon
            .as_deref()
            .map(str::trim)
            .filter(|i| !i.is_empty())
            .map(|i| NodeIcon::from_key(i).resolved().key().to_string())
            .unwrap_or_else(|| defaults.icon.clone());

        if !errors.is_empty() {
            return Err(errors);
        }

        Ok(NewNode {
            name: name.to_string(),
            description: description.map(str::to_string),
            node_type: self.node_type,
            mass: clamp_mass(self.mass),
            target_value,
            color,
            icon,
            core_id: self.core_id.clone().filter(|c| !c.is_empty()),
            connector_ids,
        })
    }
}

/// Validated node ready for insertion
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewNode {
    pub name: String,
    pub description: Option<String>,
    pub node_type: NodeType,
    pub mass: f64,
    pub target_value: Option<f64>,
    pub color: String,
    pub icon: String,
    pub core_id: Option<String>,
    /// Written to the join table, not to the node row
    #[serde(skip)]
    pub connector_ids: Vec<String>,
}

/// Sparse node update
///
/// Only provided fields change. `connector_ids`, when present, replaces the
/// whole connector set.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NodeUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<Option<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub mass: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_value: Option<Option<f64>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub core_id: Option<Option<String>>,

    #[serde(skip)]
    pub connector_ids: Option<Vec<String>>,
}

impl NodeUpdate {
    /// Full replacement of every editable field, as submitted by the edit form
    pub fn replace_with(new_node: NewNode) -> Self {
        Self {
            name: Some(new_node.name),
            description: Some(new_node.description),
            mass: Some(new_node.mass),
            target_value: Some(new_node.target_value),
            color: Some(new_node.color),
            icon: Some(new_node.icon),
            core_id: Some(new_node.core_id),
            connector_ids: Some(new_node.connector_ids),
        }
    }

    /// Whether any node-row column is touched (connector set excluded)
    pub fn has_row_changes(&self) -> bool {
        self.name.is_some()
            || self.description.is_some()
            || self.mass.is_some()
            || self.target_value.is_some()
            || self.color.is_some()
            || self.icon.is_some()
            || self.core_id.is_some()
    }

    /// Apply the update to a cached node
    pub fn apply_to(&self, node: &mut Node) {
        if let Some(name) = &self.name {
            node.name = name.clone();
        }
        if let Some(description) = &self.description {
            node.description = description.clone();
        }
        if let Some(mass) = self.mass {
            node.mass = mass;
        }
        if let Some(target) = self.target_value {
            node.target_value = target;
        }
        if let Some(color) = &self.color {
            node.color = Some(color.clone());
        }
        if let Some(icon) = &self.icon {
            node.icon = Some(icon.clone());
        }
        if let Some(core_id) = &self.core_id {
            node.core_id = core_id.clone();
        }
        if let Some(connector_ids) = &self.connector_ids {
            node.connector_ids = connector_ids.clone();
        }
        node.updated_at = Utc::now();
    }
}
