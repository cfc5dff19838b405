//! Connectors (tags) and cores (node groups)

use crate::models::ValidationError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

const CONNECTOR_NAME_MAX_CHARS: usize = 50;

/// Tag grouping nodes by life direction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Connector {
    pub id: String,
    pub user_id: String,
    pub name: String,
    #[serde(default)]
    pub color: Option<String>,
    /// Primary life-direction tag; display only
    #[serde(default)]
    pub is_mainline: bool,
    pub created_at: DateTime<Utc>,
}

/// Optional aggregation parent for nodes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Core {
    pub id: String,
    pub user_id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub stability_score: f64,
    pub created_at: DateTime<Utc>,
}

/// Optional settings when creating a connector
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConnectorOptions {
    pub color: Option<String>,
    pub is_mainline: bool,
}

/// Validated connector row ready for insertion
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewConnector {
    pub name: String,
    pub color: String,
    pub is_mainline: bool,
}

impl NewConnector {
    /// Normalize user input: a leading `#` is dropped and whitespace trimmed
    pub fn build(
        raw_name: &str,
        options: ConnectorOptions,
        default_color: &str,
    ) -> Result<Self, ValidationError> {
        let name = normalize_connector_name(raw_name);
        if name.is_empty() {
            return Err(ValidationError::InvalidName(
                "connector name must not be empty".to_string(),
            ));
        }
        if name.chars().count() > CONNECTOR_NAME_MAX_CHARS {
            return Err(ValidationError::InvalidName(format!(
                "connector name must be at most {} characters",
                CONNECTOR_NAME_MAX_CHARS
            )));
        }

        Ok(Self {
            name,
            color: options
                .color
                .filter(|c| !c.trim().is_empty())
                .unwrap_or_else(|| default_color.to_string()),
            is_mainline: options.is_mainline,
        })
    }
}

pub fn normalize_connector_name(raw: &str) -> String {
    let trimmed = raw.trim();
    trimmed.strip_prefix('#').unwrap_or(trimmed).trim().to_string()
}
