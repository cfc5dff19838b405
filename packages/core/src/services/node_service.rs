//! Node Service - Node Definition Store
//!
//! Business logic for node definitions:
//!
//! - Listing nodes (newest first, connector ids attached)
//! - Creating nodes from validated drafts, then linking connectors
//! - Full-replace edits (fields plus connector set)
//! - Deletion
//!
//! # Validation
//!
//! Drafts are validated before any request is made. A node's type is fixed
//! at creation: edits are validated against the stored type, whatever the
//! draft says.
//!
//! # Connector Links
//!
//! The node row and its connector links are two separate writes. When the
//! link write fails after the node was created, the failure is logged and the
//! node is still returned (without connectors), matching the hosted client.

use crate::db::ProgressBackend;
use crate::models::{Node, NodeDefaults, NodeDraft, NodeType, NodeUpdate};
use crate::services::error::{or_empty_when_signed_out, ServiceError};
use std::sync::Arc;

/// Service for node definitions
#[derive(Clone)]
pub struct NodeService {
    backend: Arc<dyn ProgressBackend>,
    defaults: NodeDefaults,
}

impl NodeService {
    pub fn new(backend: Arc<dyn ProgressBackend>) -> Self {
        Self::with_defaults(backend, NodeDefaults::default())
    }

    pub fn with_defaults(backend: Arc<dyn ProgressBackend>, defaults: NodeDefaults) -> Self {
        Self { backend, defaults }
    }

    pub fn defaults(&self) -> &NodeDefaults {
        &self.defaults
    }

    /// All nodes of the signed-in user, newest first
    ///
    /// Returns an empty list when nobody is signed in.
    pub async fn list_nodes(&self) -> Result<Vec<Node>, ServiceError> {
        let nodes = or_empty_when_signed_out(self.backend.list_nodes().await, "node list")?;
        tracing::debug!("Loaded {} nodes", nodes.len());
        Ok(nodes)
    }

    pub async fn get_node(&self, id: &str) -> Result<Option<Node>, ServiceError> {
        or_empty_when_signed_out(self.backend.get_node(id).await, "node")
    }

    /// Validate a draft and create the node with its connector links
    pub async fn create_node(&self, draft: &NodeDraft) -> Result<Node, ServiceError> {
        let new_node = draft.validate(&self.defaults)?;

        let mut node = self.backend.insert_node(&new_node).await?;
        tracing::info!("Created node {} ({})", node.id, node.node_type);

        match self
            .backend
            .replace_node_connectors(&node.id, &new_node.connector_ids)
            .await
        {
            Ok(()) => node.connector_ids = new_node.connector_ids,
            Err(e) => {
                tracing::warn!("Failed to link connectors for node {}: {}", node.id, e);
                node.connector_ids.clear();
            }
        }
        Ok(node)
    }

    /// Replace every editable field and the connector set from an edit form
    ///
    /// Fields that do not depend on the node type are checked before any
    /// request; the target is checked against the stored type once it is known.
    pub async fn update_node(&self, id: &str, draft: &NodeDraft) -> Result<Node, ServiceError> {
        NodeDraft {
            node_type: NodeType::Binary,
            ..draft.clone()
        }
        .validate(&self.defaults)?;

        let existing = self
            .backend
            .get_node(id)
            .await?
            .ok_or_else(|| ServiceError::node_not_found(id))?;

        let draft = NodeDraft {
            node_type: existing.node_type,
            ..draft.clone()
        };
        let new_node = draft.validate(&self.defaults)?;
        self.apply_update(id, &NodeUpdate::replace_with(new_node))
            .await
    }

    /// Apply a sparse update: row columns first, then the connector set
    pub async fn apply_update(&self, id: &str, update: &NodeUpdate) -> Result<Node, ServiceError> {
        let mut node = self.backend.update_node(id, update).await?;

        if let Some(connector_ids) = &update.connector_ids {
            self.backend
                .replace_node_connectors(id, connector_ids)
                .await?;
            node.connector_ids = connector_ids.clone();
        }

        tracing::info!("Updated node {}", id);
        Ok(node)
    }

    pub async fn delete_node(&self, id: &str) -> Result<(), ServiceError> {
        self.backend.delete_node(id).await?;
        tracing::info!("Deleted node {}", id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{BackendCall, MemoryBackend};

    fn draft(name: &str, node_type: NodeType) -> NodeDraft {
        NodeDraft {
            name: name.to_string(),
            node_type,
            connector_ids: vec!["c1".to_string()],
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_create_links_connectors() {
        let backend = Arc::new(MemoryBackend::new("u1"));
        let service = NodeService::new(backend.clone());

        let node = service
            .create_node(&draft("Stretch", NodeType::Binary))
            .await
            .unwrap();
        assert_eq!(node.connector_ids, vec!["c1".to_string()]);
        assert_eq!(node.user_id, "u1");

        let stored = service.get_node(&node.id).await.unwrap().unwrap();
        assert_eq!(stored.connector_ids, vec!["c1".to_string()]);
    }

    #[tokio::test]
    async fn test_invalid_draft_makes_no_request() {
        let backend = Arc::new(MemoryBackend::new("u1"));
        let service = NodeService::new(backend.clone());

        let err = service
            .create_node(&NodeDraft::default())
            .await
            .unwrap_err();
        assert!(err.validation_errors().is_some());
        assert!(backend.calls().is_empty());
    }

    #[tokio::test]
    async fn test_list_is_newest_first_and_empty_when_signed_out() {
        let backend = Arc::new(MemoryBackend::new("u1"));
        let service = NodeService::new(backend.clone());
        service.create_node(&draft("First", NodeType::Binary)).await.unwrap();
        service.create_node(&draft("Second", NodeType::Binary)).await.unwrap();

        let names: Vec<String> = service
            .list_nodes()
            .await
            .unwrap()
            .into_iter()
            .map(|n| n.name)
            .collect();
        assert_eq!(names, vec!["Second".to_string(), "First".to_string()]);

        backend.sign_out();
        assert!(service.list_nodes().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_keeps_node_type_and_replaces_connectors() {
        let backend = Arc::new(MemoryBackend::new("u1"));
        let service = NodeService::new(backend.clone());
        let node = service
            .create_node(&draft("Pushups", NodeType::Quantity))
            .await
            .unwrap();

        let mut edit = draft("Push-ups", NodeType::Binary);
        edit.target_value = Some(25.0);
        edit.connector_ids = vec!["c2".to_string(), "c3".to_string()];
        let updated = service.update_node(&node.id, &edit).await.unwrap();

        assert_eq!(updated.node_type, NodeType::Quantity);
        assert_eq!(updated.name, "Push-ups");
        assert_eq!(updated.target_value, Some(25.0));
        assert_eq!(updated.connector_ids.len(), 2);
        assert!(backend
            .calls()
            .contains(&BackendCall::ReplaceNodeConnectors(node.id.clone())));
    }

    #[tokio::test]
    async fn test_invalid_edit_makes_no_request() {
        let backend = Arc::new(MemoryBackend::new("u1"));
        let service = NodeService::new(backend.clone());

        let err = service
            .update_node("any-node", &NodeDraft::default())
            .await
            .unwrap_err();
        assert!(err.validation_errors().is_some());
        assert!(backend.calls().is_empty());
    }

    #[tokio::test]
    async fn test_update_checks_target_against_stored_type() {
        let backend = Arc::new(MemoryBackend::new("u1"));
        let service = NodeService::new(backend.clone());
        let node = service
            .create_node(&draft("Run", NodeType::Duration))
            .await
            .unwrap();

        let mut edit = draft("Run", NodeType::Binary);
        edit.target_value = Some(-5.0);
        let err = service.update_node(&node.id, &edit).await.unwrap_err();
        assert!(err.validation_errors().is_some());
        assert!(!backend
            .calls()
            .contains(&BackendCall::UpdateNode(node.id.clone())));
    }

    #[tokio::test]
    async fn test_update_missing_node() {
        let backend = Arc::new(MemoryBackend::new("u1"));
        let service = NodeService::new(backend);
        let err = service
            .update_node("missing", &draft("Ghost", NodeType::Binary))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NodeNotFound { .. }));
    }
}
