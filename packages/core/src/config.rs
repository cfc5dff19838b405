//! Engine configuration
//!
//! Loaded from a JSON file; every field has a default so partial files (or no
//! file at all) are valid. Environment variables override file values:
//!
//! - `NODES_BACKEND_URL`
//! - `NODES_BACKEND_ANON_KEY`
//! - `NODES_ACCESS_TOKEN`
//! - `NODES_DAILY_CAPACITY`

use crate::models::{NodeDefaults, DEFAULT_DAILY_CAPACITY};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::fs;

/// Hosted backend connection settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendConfig {
    #[serde(default)]
    pub url: String,

    #[serde(default)]
    pub anon_key: String,

    /// Session token of the signed-in user
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            anon_key: String::new(),
            access_token: None,
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

fn default_request_timeout_secs() -> u64 {
    10
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Mass ceiling for the focus capacity warning
    pub daily_capacity: f64,

    /// Duration sessions shorter than this are discarded
    pub min_session_secs: u64,

    pub default_quantity_target: f64,

    pub default_duration_target_minutes: f64,

    pub default_node_color: String,

    pub default_connector_color: String,

    pub default_icon: String,

    pub backend: BackendConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        let node_defaults = NodeDefaults::default();
        Self {
            daily_capacity: DEFAULT_DAILY_CAPACITY,
            min_session_secs: 10,
            default_quantity_target: node_defaults.quantity_target,
            default_duration_target_minutes: node_defaults.duration_target_minutes,
            default_node_color: node_defaults.color,
            default_connector_color: "#22c55e".to_string(),
            default_icon: node_defaults.icon,
            backend: BackendConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Load from a JSON file; a missing file yields the defaults
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !fs::try_exists(path).await.unwrap_or(false) {
            tracing::debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse config {}", path.display()))
    }

    /// Write to a JSON file (temp file, then rename)
    pub async fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let serialized = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        let temp = path.with_extension("json.tmp");
        fs::write(&temp, serialized)
            .await
            .with_context(|| format!("Failed to write {}", temp.display()))?;
        fs::rename(&temp, path)
            .await
            .with_context(|| format!("Failed to replace {}", path.display()))?;
        Ok(())
    }

    /// Apply `NODES_*` environment variables
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(url) = lookup("NODES_BACKEND_URL") {
            self.backend.url = url;
        }
        if let Some(key) = lookup("NODES_BACKEND_ANON_KEY") {
            self.backend.anon_key = key;
        }
        if let Some(token) = lookup("NODES_ACCESS_TOKEN") {
            self.backend.access_token = Some(token).filter(|t| !t.is_empty());
        }
        if let Some(raw) = lookup("NODES_DAILY_CAPACITY") {
            match raw.trim().parse::<f64>() {
                Ok(capacity) if capacity.is_finite() && capacity > 0.0 => {
                    self.daily_capacity = capacity
                }
                _ => tracing::warn!("Ignoring invalid NODES_DAILY_CAPACITY '{}'", raw),
            }
        }
        self
    }

    /// Defaults applied to node forms
    pub fn node_defaults(&self) -> NodeDefaults {
        NodeDefaults {
            quantity_target: self.default_quantity_target,
            duration_target_minutes: self.default_duration_target_minutes,
            color: self.default_node_color.clone(),
            icon: self.default_icon.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[tokio::test]
    async fn test_missing_file_gives_defaults() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let config = EngineConfig::load(dir.path().join("absent.json")).await?;
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.daily_capacity, 10.0);
        assert_eq!(config.min_session_secs, 10);
        Ok(())
    }

    #[tokio::test]
    async fn test_partial_file_keeps_other_defaults() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("nodes.json");
        tokio::fs::write(
            &path,
            r#"{ "daily_capacity": 12.5, "backend": { "url": "https://x.supabase.co" } }"#,
        )
        .await?;

        let config = EngineConfig::load(&path).await?;
        assert_eq!(config.daily_capacity, 12.5);
        assert_eq!(config.backend.url, "https://x.supabase.co");
        assert_eq!(config.backend.request_timeout_secs, 10);
        assert_eq!(config.default_connector_color, "#22c55e");
        Ok(())
    }

    #[tokio::test]
    async fn test_save_then_load() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("nested").join("nodes.json");
        let config = EngineConfig {
            min_session_secs: 30,
            ..Default::default()
        };
        tokio_test::assert_ok!(config.save(&path).await);
        assert_eq!(EngineConfig::load(&path).await?, config);
        Ok(())
    }

    #[tokio::test]
    async fn test_malformed_file_is_an_error() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("nodes.json");
        tokio::fs::write(&path, "{ not json").await?;
        tokio_test::assert_err!(EngineConfig::load(&path).await);
        Ok(())
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("NODES_BACKEND_URL", "https://env.supabase.co"),
            ("NODES_ACCESS_TOKEN", "token"),
            ("NODES_DAILY_CAPACITY", "not-a-number"),
        ]
        .into_iter()
        .collect();

        let config = EngineConfig::default()
            .with_overrides(|key| env.get(key).map(|v| v.to_string()));
        assert_eq!(config.backend.url, "https://env.supabase.co");
        assert_eq!(config.backend.access_token.as_deref(), Some("token"));
        assert_eq!(config.daily_capacity, 10.0);
    }
}
