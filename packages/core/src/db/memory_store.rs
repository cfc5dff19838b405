//! In-Memory Backend
//!
//! `MemoryBackend` keeps all rows in process memory and follows the same
//! contract as the hosted backend, including the `completion_count`
//! aggregate and the absolute-write replacement rule. It is used for tests,
//! demos and offline development.
//!
//! Every call is recorded in a call log so tests can assert which requests
//! were (or were not) made. Read and write failures can be injected, and an
//! optional delay simulates network latency.

use crate::db::{BackendError, ProgressBackend};
use crate::models::{
    Connector, Core, DayKey, Impulse, NewConnector, NewNode, Node, NodeUpdate, ProgressWrite,
    WriteMode,
};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use uuid::Uuid;

/// A request made against the backend
#[derive(Debug, Clone, PartialEq)]
pub enum BackendCall {
    ListNodes,
    GetNode(String),
    InsertNode(String),
    UpdateNode(String),
    DeleteNode(String),
    ReplaceNodeConnectors(String),
    ListConnectors,
    InsertConnector(String),
    ListCores,
    SaveProgress(ProgressWrite),
    ClearDay { node_id: String, date: DayKey },
    ImpulsesFor { node_ids: Vec<String>, date: DayKey },
    FocusNodeIds(DayKey),
    ReplaceFocus { date: DayKey, node_ids: Vec<String> },
}

impl BackendCall {
    pub fn is_write(&self) -> bool {
        matches!(
            self,
            Self::InsertNode(_)
                | Self::UpdateNode(_)
                | Self::DeleteNode(_)
                | Self::ReplaceNodeConnectors(_)
                | Self::InsertConnector(_)
                | Self::SaveProgress(_)
                | Self::ClearDay { .. }
                | Self::ReplaceFocus { .. }
        )
    }
}

#[derive(Debug, Clone)]
struct StoredImpulse {
    impulse: Impulse,
    incremental: bool,
}

#[derive(Debug, Default)]
struct MemoryState {
    user_id: Option<String>,
    nodes: Vec<Node>,
    impulses: Vec<StoredImpulse>,
    focus: HashMap<DayKey, Vec<String>>,
    connectors: Vec<Connector>,
    cores: Vec<Core>,
    calls: Vec<BackendCall>,
    /// Writes allowed before every further write fails
    write_budget: Option<usize>,
}

impl MemoryState {
    fn user(&self) -> Result<String, BackendError> {
        self.user_id.clone().ok_or(BackendError::NotAuthenticated)
    }

    fn node_mut(&mut self, id: &str) -> Result<&mut Node, BackendError> {
        let user = self.user()?;
        self.nodes
            .iter_mut()
            .find(|n| n.id == id && n.user_id == user)
            .ok_or_else(|| BackendError::not_found("node", id))
    }
}

/// Backend storing every row in memory
#[derive(Clone)]
pub struct MemoryBackend {
    state: Arc<Mutex<MemoryState>>,
    fail_reads: Arc<AtomicBool>,
    fail_writes: Arc<AtomicBool>,
    delay: Option<Duration>,
}

impl MemoryBackend {
    /// Backend with a signed-in user and no rows
    pub fn new(user_id: impl Into<String>) -> Self {
        let state = MemoryState {
            user_id: Some(user_id.into()),
            ..Default::default()
        };
        Self {
            state: Arc::new(Mutex::new(state)),
            fail_reads: Arc::new(AtomicBool::new(false)),
            fail_writes: Arc::new(AtomicBool::new(false)),
            delay: None,
        }
    }

    /// Backend without a session
    pub fn signed_out() -> Self {
        let backend = Self::new("");
        if let Ok(mut state) = backend.state.lock() {
            state.user_id = None;
        }
        backend
    }

    /// Simulate network latency on every call
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn sign_out(&self) {
        if let Ok(mut state) = self.state.lock() {
            state.user_id = None;
        }
    }

    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Let the next `writes` writes succeed and fail every write after them
    pub fn fail_writes_after(&self, writes: usize) {
        if let Ok(mut state) = self.state.lock() {
            state.write_budget = Some(writes);
        }
    }

    /// Insert a node row directly, bypassing the call log
    pub fn seed_node(&self, node: Node) {
        if let Ok(mut state) = self.state.lock() {
            state.nodes.push(node);
        }
    }

    pub fn seed_connector(&self, connector: Connector) {
        if let Ok(mut state) = self.state.lock() {
            state.connectors.push(connector);
        }
    }

    pub fn seed_core(&self, core: Core) {
        if let Ok(mut state) = self.state.lock() {
            state.cores.push(core);
        }
    }

    /// Insert an incremental impulse row directly, bypassing the call log
    pub fn seed_impulse(&self, node_id: &str, value: f64, date: DayKey) {
        if let Ok(mut state) = self.state.lock() {
            state.impulses.push(StoredImpulse {
                impulse: new_impulse(node_id, value, date),
                incremental: true,
            });
        }
    }

    /// Every call made so far, in order
    pub fn calls(&self) -> Vec<BackendCall> {
        self.state
            .lock()
            .map(|s| s.calls.clone())
            .unwrap_or_default()
    }

    pub fn write_calls(&self) -> Vec<BackendCall> {
        self.calls().into_iter().filter(BackendCall::is_write).collect()
    }

    pub fn clear_calls(&self) {
        if let Ok(mut state) = self.state.lock() {
            state.calls.clear();
        }
    }

    /// Stored impulse rows for one node and day, oldest first
    pub fn impulse_rows(&self, node_id: &str, date: DayKey) -> Vec<Impulse> {
        self.state
            .lock()
            .map(|s| {
                s.impulses
                    .iter()
                    .filter(|i| i.impulse.node_id == node_id && i.impulse.completed_at == date)
                    .map(|i| i.impulse.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn completion_count(&self, node_id: &str) -> Option<u32> {
        self.state.lock().ok().and_then(|s| {
            s.nodes
                .iter()
                .find(|n| n.id == node_id)
                .map(|n| n.completion_count)
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, MemoryState>, BackendError> {
        self.state
            .lock()
            .map_err(|_| BackendError::unavailable("memory backend lock poisoned"))
    }

    /// Latency, call logging and failure injection shared by every request
    async fn begin(&self, call: BackendCall) -> Result<(), BackendError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let is_write = call.is_write();
        let over_budget = {
            let mut state = self.lock()?;
            state.calls.push(call);
            match state.write_budget.as_mut() {
                Some(remaining) if is_write => {
                    let exhausted = *remaining == 0;
                    *remaining = remaining.saturating_sub(1);
                    exhausted
                }
                _ => false,
            }
        };

        if is_write && (over_budget || self.fail_writes.load(Ordering::SeqCst)) {
            return Err(BackendError::rejected("write failure injected"));
        }
        if !is_write && self.fail_reads.load(Ordering::SeqCst) {
            return Err(BackendError::unavailable("read failure injected"));
        }
        Ok(())
    }
}

fn new_impulse(node_id: &str, value: f64, date: DayKey) -> Impulse {
    Impulse {
        id: Uuid::new_v4().to_string(),
        node_id: node_id.to_string(),
        value,
        completed_at: date,
        created_at: Utc::now(),
    }
}

#[async_trait]
impl ProgressBackend for MemoryBackend {
    async fn current_user_id(&self) -> Result<String, BackendError> {
        self.lock()?.user()
    }

    async fn list_nodes(&self) -> Result<Vec<Node>, BackendError> {
        self.begin(BackendCall::ListNodes).await?;
        let state = self.lock()?;
        let user = state.user()?;
        Ok(state
            .nodes
            .iter()
            .rev()
            .filter(|n| n.user_id == user)
            .cloned()
            .collect())
    }

    async fn get_node(&self, id: &str) -> Result<Option<Node>, BackendError> {
        self.begin(BackendCall::GetNode(id.to_string())).await?;
        let state = self.lock()?;
        let user = state.user()?;
        Ok(state
            .nodes
            .iter()
            .find(|n| n.id == id && n.user_id == user)
            .cloned())
    }

    async fn insert_node(&self, node: &NewNode) -> Result<Node, BackendError> {
        self.begin(BackendCall::InsertNode(node.name.clone())).await?;
        let mut state = self.lock()?;
        let user = state.user()?;

        let mut row = Node::from_new(Uuid::new_v4().to_string(), user, node.clone());
        row.connector_ids.clear();
        state.nodes.push(row.clone());
        Ok(row)
    }

    async fn update_node(&self, id: &str, update: &NodeUpdate) -> Result<Node, BackendError> {
        self.begin(BackendCall::UpdateNode(id.to_string())).await?;
        let mut state = self.lock()?;

        let row_update = NodeUpdate {
            connector_ids: None,
            ..update.clone()
        };
        let node = state.node_mut(id)?;
        row_update.apply_to(node);
        Ok(node.clone())
    }

    async fn delete_node(&self, id: &str) -> Result<(), BackendError> {
        self.begin(BackendCall::DeleteNode(id.to_string())).await?;
        let mut state = self.lock()?;
        let user = state.user()?;

        state.nodes.retain(|n| !(n.id == id && n.user_id == user));
        state.impulses.retain(|i| i.impulse.node_id != id);
        for ids in state.focus.values_mut() {
            ids.retain(|n| n != id);
        }
        Ok(())
    }

    async fn replace_node_connectors(
        &self,
        node_id: &str,
        connector_ids: &[String],
    ) -> Result<(), BackendError> {
        self.begin(BackendCall::ReplaceNodeConnectors(node_id.to_string()))
            .await?;
        let mut state = self.lock()?;
        state.node_mut(node_id)?.connector_ids = connector_ids.to_vec();
        Ok(())
    }

    async fn list_connectors(&self) -> Result<Vec<Connector>, BackendError> {
        self.begin(BackendCall::ListConnectors).await?;
        let state = self.lock()?;
        let user = state.user()?;
        Ok(state
            .connectors
            .iter()
            .rev()
            .filter(|c| c.user_id == user)
            .cloned()
            .collect())
    }

    async fn insert_connector(&self, connector: &NewConnector) -> Result<Connector, BackendError> {
        self.begin(BackendCall::InsertConnector(connector.name.clone()))
            .await?;
        let mut state = self.lock()?;
        let user = state.user()?;

        let row = Connector {
            id: Uuid::new_v4().to_string(),
            user_id: user,
            name: connector.name.clone(),
            color: Some(connector.color.clone()),
            is_mainline: connector.is_mainline,
            created_at: Utc::now(),
        };
        state.connectors.push(row.clone());
        Ok(row)
    }

    async fn list_cores(&self) -> Result<Vec<Core>, BackendError> {
        self.begin(BackendCall::ListCores).await?;
        let state = self.lock()?;
        let user = state.user()?;
        Ok(state
            .cores
            .iter()
            .filter(|c| c.user_id == user)
            .cloned()
            .collect())
    }

    async fn save_node_progress(&self, write: &ProgressWrite) -> Result<(), BackendError> {
        self.begin(BackendCall::SaveProgress(write.clone())).await?;
        let mut state = self.lock()?;

        let node = state.node_mut(&write.node_id)?;
        if write.mode == WriteMode::Incremental {
            node.completion_count = node.completion_count.saturating_add(1);
        }

        if write.mode == WriteMode::Absolute {
            state.impulses.retain(|i| {
                !(i.impulse.node_id == write.node_id && i.impulse.completed_at == write.date)
            });
        }
        state.impulses.push(StoredImpulse {
            impulse: new_impulse(&write.node_id, write.value, write.date),
            incremental: write.mode.is_incremental(),
        });
        Ok(())
    }

    async fn clear_day(&self, node_id: &str, date: DayKey) -> Result<u32, BackendError> {
        self.begin(BackendCall::ClearDay {
            node_id: node_id.to_string(),
            date,
        })
        .await?;
        let mut state = self.lock()?;
        state.user()?;

        let before = state.impulses.len();
        let mut removed_events: u32 = 0;
        state.impulses.retain(|i| {
            let hit = i.impulse.node_id == node_id && i.impulse.completed_at == date;
            if hit && i.incremental {
                removed_events += 1;
            }
            !hit
        });
        let removed = (before - state.impulses.len()) as u32;

        if let Ok(node) = state.node_mut(node_id) {
            node.completion_count = node.completion_count.saturating_sub(removed_events);
        }
        Ok(removed)
    }

    async fn impulses_for(
        &self,
        node_ids: &[String],
        date: DayKey,
    ) -> Result<Vec<Impulse>, BackendError> {
        self.begin(BackendCall::ImpulsesFor {
            node_ids: node_ids.to_vec(),
            date,
        })
        .await?;
        let state = self.lock()?;
        state.user()?;

        Ok(state
            .impulses
            .iter()
            .filter(|i| i.impulse.completed_at == date && node_ids.contains(&i.impulse.node_id))
            .map(|i| i.impulse.clone())
            .collect())
    }

    async fn focus_node_ids(&self, date: DayKey) -> Result<Vec<String>, BackendError> {
        self.begin(BackendCall::FocusNodeIds(date)).await?;
        let state = self.lock()?;
        state.user()?;
        Ok(state.focus.get(&date).cloned().unwrap_or_default())
    }

    async fn replace_focus(&self, date: DayKey, node_ids: &[String]) -> Result<(), BackendError> {
        self.begin(BackendCall::ReplaceFocus {
            date,
            node_ids: node_ids.to_vec(),
        })
        .await?;
        let mut state = self.lock()?;
        state.user()?;

        state.focus.remove(&date);
        if !node_ids.is_empty() {
            state.focus.insert(date, node_ids.to_vec());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NodeDefaults, NodeDraft, NodeType};

    fn day() -> DayKey {
        "2024-06-01".parse().unwrap()
    }

    async fn quantity_node(backend: &MemoryBackend) -> Node {
        let draft = NodeDraft {
            name: "Water".to_string(),
            node_type: NodeType::Quantity,
            target_value: Some(8.0),
            connector_ids: vec!["c1".to_string()],
            ..Default::default()
        };
        let new_node = draft.validate(&NodeDefaults::default()).unwrap();
        backend.insert_node(&new_node).await.unwrap()
    }

    #[tokio::test]
    async fn test_absolute_write_replaces_day_rows() {
        let backend = MemoryBackend::new("u1");
        let node = quantity_node(&backend).await;

        for v in [3.0, 4.0] {
            let w = ProgressWrite::incremental(&node.id, v, day()).unwrap();
            backend.save_node_progress(&w).await.unwrap();
        }
        assert_eq!(backend.impulse_rows(&node.id, day()).len(), 2);

        let w = ProgressWrite::absolute(&node.id, 5.0, day()).unwrap();
        backend.save_node_progress(&w).await.unwrap();

        let rows = backend.impulse_rows(&node.id, day());
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].value, 5.0);
    }

    #[tokio::test]
    async fn test_write_budget_fails_later_writes() {
        let backend = MemoryBackend::new("u1");
        let node = quantity_node(&backend).await;
        backend.fail_writes_after(1);

        let w = ProgressWrite::incremental(&node.id, 1.0, day()).unwrap();
        assert!(backend.save_node_progress(&w).await.is_ok());
        assert!(matches!(
            backend.save_node_progress(&w).await,
            Err(BackendError::Rejected(_))
        ));
        // Reads are unaffected
        assert_eq!(backend.impulses_for(&[node.id.clone()], day()).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_completion_count_follows_incremental_events() {
        let backend = MemoryBackend::new("u1");
        let node = quantity_node(&backend).await;

        let w = ProgressWrite::incremental(&node.id, 1.0, day()).unwrap();
        backend.save_node_progress(&w).await.unwrap();
        backend.save_node_progress(&w).await.unwrap();
        let abs = ProgressWrite::absolute(&node.id, 4.0, day()).unwrap();
        backend.save_node_progress(&abs).await.unwrap();
        assert_eq!(backend.completion_count(&node.id), Some(2));

        let marker = ProgressWrite::incremental(&node.id, 0.0, day()).unwrap();
        backend.save_node_progress(&marker).await.unwrap();
        assert_eq!(backend.completion_count(&node.id), Some(3));

        // Only the marker row survived the absolute write as an incremental event
        let removed = backend.clear_day(&node.id, day()).await.unwrap();
        assert_eq!(removed, 2);
        assert_eq!(backend.completion_count(&node.id), Some(2));
    }

    #[tokio::test]
    async fn test_progress_for_unknown_node_is_rejected() {
        let backend = MemoryBackend::new("u1");
        let w = ProgressWrite::incremental("missing", 1.0, day()).unwrap();
        assert!(matches!(
            backend.save_node_progress(&w).await,
            Err(BackendError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_signed_out_reads_fail_with_not_authenticated() {
        let backend = MemoryBackend::signed_out();
        assert!(matches!(
            backend.list_nodes().await,
            Err(BackendError::NotAuthenticated)
        ));
        assert!(backend
            .current_user_id()
            .await
            .unwrap_err()
            .is_not_authenticated());
    }

    #[tokio::test]
    async fn test_injected_failures_are_logged() {
        let backend = MemoryBackend::new("u1");
        backend.set_fail_writes(true);

        let result = backend.replace_focus(day(), &["n1".to_string()]).await;
        assert!(matches!(result, Err(BackendError::Rejected(_))));
        assert_eq!(backend.write_calls().len(), 1);

        // Reads are unaffected
        assert!(backend.focus_node_ids(day()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_cascades_impulses_and_focus() {
        let backend = MemoryBackend::new("u1");
        let node = quantity_node(&backend).await;
        backend.seed_impulse(&node.id, 2.0, day());
        backend
            .replace_focus(day(), &[node.id.clone()])
            .await
            .unwrap();

        backend.delete_node(&node.id).await.unwrap();

        assert!(backend.impulse_rows(&node.id, day()).is_empty());
        assert!(backend.focus_node_ids(day()).await.unwrap().is_empty());
        assert!(backend.get_node(&node.id).await.unwrap().is_none());
    }
}
