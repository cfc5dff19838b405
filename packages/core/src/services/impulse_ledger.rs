//! Impulse Ledger
//!
//! Write and read operations on impulses. Each write is a single backend
//! request and either takes effect or returns an error; nothing is retried
//! automatically.
//!
//! # Write modes
//!
//! - `record_increment` appends an impulse; values sum with earlier ones
//! - `set_absolute` replaces the day's impulses with one row holding the value
//! - `clear_day` removes every impulse of the node on that day
//!
//! Incremental and absolute writes do not commute. After `set_absolute`,
//! re-read the day before building on its value with further increments.

use crate::db::ProgressBackend;
use crate::models::{batch_progress, DailyProgress, DayKey, Impulse, Node, ProgressWrite};
use crate::services::error::{or_empty_when_signed_out, ServiceError};
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Clone)]
pub struct ImpulseLedger {
    backend: Arc<dyn ProgressBackend>,
}

impl ImpulseLedger {
    pub fn new(backend: Arc<dyn ProgressBackend>) -> Self {
        Self { backend }
    }

    /// Append an impulse (count delta or seconds) for a node on a day
    pub async fn record_increment(
        &self,
        node_id: &str,
        value: f64,
        date: DayKey,
    ) -> Result<(), ServiceError> {
        let write = ProgressWrite::incremental(node_id, value, date)?;
        self.backend.save_node_progress(&write).await?;
        tracing::info!("Recorded impulse of {} for node {} on {}", value, node_id, date);
        Ok(())
    }

    /// Overwrite the day's accumulated value
    pub async fn set_absolute(
        &self,
        node_id: &str,
        value: f64,
        date: DayKey,
    ) -> Result<(), ServiceError> {
        let write = ProgressWrite::absolute(node_id, value, date)?;
        self.backend.save_node_progress(&write).await?;
        tracing::info!("Set progress of node {} on {} to {}", node_id, date, value);
        Ok(())
    }

    /// Remove all impulses of a node on a day, returning how many were removed
    pub async fn clear_day(&self, node_id: &str, date: DayKey) -> Result<u32, ServiceError> {
        let removed = self.backend.clear_day(node_id, date).await?;
        tracing::info!("Cleared {} impulses of node {} on {}", removed, node_id, date);
        Ok(removed)
    }

    /// All impulses of the given nodes on one day
    ///
    /// An empty id list returns immediately without a request.
    pub async fn read_batch(
        &self,
        node_ids: &[String],
        date: DayKey,
    ) -> Result<Vec<Impulse>, ServiceError> {
        if node_ids.is_empty() {
            return Ok(Vec::new());
        }
        or_empty_when_signed_out(self.backend.impulses_for(node_ids, date).await, "impulses")
    }

    /// Progress of a single node on a day
    pub async fn read_progress(&self, node: &Node, date: DayKey) -> Result<DailyProgress, ServiceError> {
        let impulses = self.read_batch(std::slice::from_ref(&node.id), date).await?;
        Ok(DailyProgress::for_node(node, &impulses))
    }

    /// Progress of many nodes on one day, with a single read
    pub async fn read_batch_progress(
        &self,
        nodes: &[Node],
        date: DayKey,
    ) -> Result<HashMap<String, DailyProgress>, ServiceError> {
        let ids: Vec<String> = nodes.iter().map(|n| n.id.clone()).collect();
        let impulses = self.read_batch(&ids, date).await?;
        Ok(batch_progress(nodes, &impulses))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryBackend;
    use crate::models::{NewNode, NodeType};

    fn day() -> DayKey {
        "2024-06-01".parse().unwrap()
    }

    fn seed(backend: &MemoryBackend, id: &str, node_type: NodeType, target: Option<f64>) -> Node {
        let node = Node::from_new(
            id,
            "u1",
            NewNode {
                name: id.to_string(),
                description: None,
                node_type,
                mass: 1.0,
                target_value: target,
                color: "#8b5cf6".to_string(),
                icon: "Circle".to_string(),
                core_id: None,
                connector_ids: vec!["c1".to_string()],
            },
        );
        backend.seed_node(node.clone());
        node
    }

    #[tokio::test]
    async fn test_empty_batch_makes_no_request() {
        let backend = Arc::new(MemoryBackend::new("u1"));
        let ledger = ImpulseLedger::new(backend.clone());
        assert!(ledger.read_batch(&[], day()).await.unwrap().is_empty());
        assert!(backend.calls().is_empty());
    }

    #[tokio::test]
    async fn test_negative_value_is_rejected_before_request() {
        let backend = Arc::new(MemoryBackend::new("u1"));
        let ledger = ImpulseLedger::new(backend.clone());
        seed(&backend, "n1", NodeType::Quantity, Some(5.0));

        let err = ledger.record_increment("n1", -1.0, day()).await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
        assert!(backend.calls().is_empty());
    }

    #[tokio::test]
    async fn test_increments_accumulate_and_absolute_overwrites() {
        let backend = Arc::new(MemoryBackend::new("u1"));
        let ledger = ImpulseLedger::new(backend.clone());
        let node = seed(&backend, "m", NodeType::Quantity, Some(8.0));

        ledger.record_increment("m", 3.0, day()).await.unwrap();
        ledger.record_increment("m", 4.0, day()).await.unwrap();
        assert_eq!(ledger.read_progress(&node, day()).await.unwrap().value, 7.0);

        ledger.set_absolute("m", 2.0, day()).await.unwrap();
        let p = ledger.read_progress(&node, day()).await.unwrap();
        assert_eq!(p.value, 2.0);
        assert!(!p.completed);
    }

    #[tokio::test]
    async fn test_clear_day_removes_all_rows() {
        let backend = Arc::new(MemoryBackend::new("u1"));
        let ledger = ImpulseLedger::new(backend.clone());
        let node = seed(&backend, "b", NodeType::Binary, None);

        ledger.record_increment("b", 1.0, day()).await.unwrap();
        ledger.record_increment("b", 1.0, day()).await.unwrap();
        assert!(ledger.read_progress(&node, day()).await.unwrap().completed);

        assert_eq!(ledger.clear_day("b", day()).await.unwrap(), 2);
        assert!(!ledger.read_progress(&node, day()).await.unwrap().completed);
    }

    #[tokio::test]
    async fn test_batch_progress_uses_one_read() {
        let backend = Arc::new(MemoryBackend::new("u1"));
        let ledger = ImpulseLedger::new(backend.clone());
        let a = seed(&backend, "a", NodeType::Quantity, Some(2.0));
        let b = seed(&backend, "b", NodeType::Binary, None);
        backend.seed_impulse("a", 3.0, day());
        backend.seed_impulse("b", 1.0, day());
        backend.seed_impulse("a", 9.0, day().add_days(-1));

        let progress = ledger
            .read_batch_progress(&[a, b], day())
            .await
            .unwrap();
        assert_eq!(backend.calls().len(), 1);
        assert_eq!(progress["a"].overdrive, 1.0);
        assert!(progress["b"].completed);
    }

    #[tokio::test]
    async fn test_signed_out_read_is_empty_but_write_fails() {
        let backend = Arc::new(MemoryBackend::signed_out());
        let ledger = ImpulseLedger::new(backend);

        assert!(ledger
            .read_batch(&["n1".to_string()], day())
            .await
            .unwrap()
            .is_empty());
        assert!(matches!(
            ledger.record_increment("n1", 1.0, day()).await,
            Err(ServiceError::NotAuthenticated)
        ));
    }
}
