//! Connector and core service

use crate::db::ProgressBackend;
use crate::models::{Connector, ConnectorOptions, Core, NewConnector};
use crate::services::error::{or_empty_when_signed_out, ServiceError};
use std::sync::Arc;

const DEFAULT_CONNECTOR_COLOR: &str = "#22c55e";

#[derive(Clone)]
pub struct ConnectorService {
    backend: Arc<dyn ProgressBackend>,
    default_color: String,
}

impl ConnectorService {
    pub fn new(backend: Arc<dyn ProgressBackend>) -> Self {
        Self::with_default_color(backend, DEFAULT_CONNECTOR_COLOR)
    }

    pub fn with_default_color(backend: Arc<dyn ProgressBackend>, color: impl Into<String>) -> Self {
        Self {
            backend,
            default_color: color.into(),
        }
    }

    /// Connectors of the signed-in user, newest first
    pub async fn list_connectors(&self) -> Result<Vec<Connector>, ServiceError> {
        or_empty_when_signed_out(self.backend.list_connectors().await, "connector list")
    }

    /// Create a connector; a leading `#` in the name is dropped
    pub async fn create_connector(
        &self,
        name: &str,
        options: ConnectorOptions,
    ) -> Result<Connector, ServiceError> {
        let connector = NewConnector::build(name, options, &self.default_color)?;
        let created = self.backend.insert_connector(&connector).await?;
        tracing::info!("Created connector '{}'", created.name);
        Ok(created)
    }

    pub async fn list_cores(&self) -> Result<Vec<Core>, ServiceError> {
        or_empty_when_signed_out(self.backend.list_cores().await, "core list")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryBackend;
    use chrono::Utc;

    #[tokio::test]
    async fn test_create_connector_normalizes_name() {
        let backend = Arc::new(MemoryBackend::new("u1"));
        let service = ConnectorService::new(backend);

        let created = service
            .create_connector("#fitness", ConnectorOptions::default())
            .await
            .unwrap();
        assert_eq!(created.name, "fitness");
        assert_eq!(created.color.as_deref(), Some("#22c55e"));
        assert!(!created.is_mainline);

        let listed = service.list_connectors().await.unwrap();
        assert_eq!(listed.len(), 1);
    }

    #[tokio::test]
    async fn test_empty_name_rejected() {
        let backend = Arc::new(MemoryBackend::new("u1"));
        let service = ConnectorService::new(backend.clone());
        let err = service
            .create_connector("#", ConnectorOptions::default())
            .await
            .unwrap_err();
        assert!(err.validation_errors().is_some());
        assert!(backend.calls().is_empty());
    }

    #[tokio::test]
    async fn test_cores_are_user_scoped() {
        let backend = Arc::new(MemoryBackend::new("u1"));
        for (id, user) in [("core-1", "u1"), ("core-2", "u2")] {
            backend.seed_core(Core {
                id: id.to_string(),
                user_id: user.to_string(),
                name: "Health".to_string(),
                description: None,
                color: None,
                stability_score: 55.0,
                created_at: Utc::now(),
            });
        }
        let service = ConnectorService::new(backend);
        let cores = service.list_cores().await.unwrap();
        assert_eq!(cores.len(), 1);
        assert_eq!(cores[0].id, "core-1");
    }
}
