//! Application State Container
//!
//! One cache of backend state shared by every screen: the node list, the
//! selected day's progress values, the focus set, connectors and cores.
//!
//! # Architecture
//!
//! - **Pure Reducer**: `AppState::reduce` is a pure transition function; every
//!   mutation is an `Action`, testable without a runtime
//! - **Single Writer**: `AppStore` applies actions through a `watch` channel;
//!   subscribers see each new state after the whole action is applied
//! - **Batch Actions**: `SetBatchDayValues` and `LoadDay` coalesce many
//!   logical updates into one published state
//!
//! The store is a cache. Authoritative state lives in the backend.

use crate::models::{
    CapacityStatus, Connector, Core, DailyProgress, DayKey, Node, NodeUpdate,
};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::watch;

/// Everything loaded for one day in a single batch
#[derive(Debug, Clone, PartialEq)]
pub struct DaySnapshot {
    pub date: DayKey,
    pub nodes: Vec<Node>,
    pub day_values: HashMap<String, DailyProgress>,
    pub focus_ids: Vec<String>,
}

/// State transitions
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    SetNodes(Vec<Node>),
    /// Prepend a newly created node
    AddNode(Node),
    /// Patch a cached node in place
    UpdateNode { id: String, update: NodeUpdate },
    /// Replace a cached node with a fresh backend row
    ReplaceNode(Node),
    RemoveNode(String),
    SetDayValue { node_id: String, progress: DailyProgress },
    SetBatchDayValues(HashMap<String, DailyProgress>),
    SetFocus(Vec<String>),
    SetConnectors(Vec<Connector>),
    SetCores(Vec<Core>),
    /// Switch the selected day; day values and focus of the old day are dropped
    SelectDate(DayKey),
    LoadDay(DaySnapshot),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AppState {
    pub nodes: Vec<Node>,
    /// Progress of each node on `selected_date`
    pub day_values: HashMap<String, DailyProgress>,
    pub focus_ids: Vec<String>,
    pub connectors: Vec<Connector>,
    pub cores: Vec<Core>,
    pub selected_date: Option<DayKey>,
}

impl AppState {
    pub fn reduce(mut self, action: Action) -> Self {
        match action {
            Action::SetNodes(nodes) => {
                self.nodes = nodes;
            }
            Action::AddNode(node) => {
                self.nodes.retain(|n| n.id != node.id);
                self.nodes.insert(0, node);
            }
            Action::UpdateNode { id, update } => {
                if let Some(node) = self.nodes.iter_mut().find(|n| n.id == id) {
                    update.apply_to(node);
                }
            }
            Action::ReplaceNode(node) => {
                match self.nodes.iter_mut().find(|n| n.id == node.id) {
                    Some(existing) => *existing = node,
                    None => self.nodes.insert(0, node),
                }
            }
            Action::RemoveNode(id) => {
                self.nodes.retain(|n| n.id != id);
                self.day_values.remove(&id);
                self.focus_ids.retain(|f| f != &id);
            }
            Action::SetDayValue { node_id, progress } => {
                self.day_values.insert(node_id, progress);
            }
            Action::SetBatchDayValues(values) => {
                self.day_values.extend(values);
            }
            Action::SetFocus(ids) => {
                self.focus_ids = ids;
            }
            Action::SetConnectors(connectors) => {
                self.connectors = connectors;
            }
            Action::SetCores(cores) => {
                self.cores = cores;
            }
            Action::SelectDate(date) => {
                if self.selected_date != Some(date) {
                    self.day_values.clear();
                    self.focus_ids.clear();
                }
                self.selected_date = Some(date);
            }
            Action::LoadDay(snapshot) => {
                self.selected_date = Some(snapshot.date);
                self.nodes = snapshot.nodes;
                self.day_values = snapshot.day_values;
                self.focus_ids = snapshot.focus_ids;
            }
        }
        self
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Progress of a node on the selected day (zero when unknown)
    pub fn progress(&self, node_id: &str) -> DailyProgress {
        self.day_values.get(node_id).copied().unwrap_or_default()
    }

    /// Focused nodes in focus order; ids without a cached node are skipped
    pub fn focused_nodes(&self) -> Vec<&Node> {
        self.focus_ids
            .iter()
            .filter_map(|id| self.node(id))
            .collect()
    }

    pub fn is_focused(&self, node_id: &str) -> bool {
        self.focus_ids.iter().any(|f| f == node_id)
    }

    pub fn capacity(&self, capacity: f64) -> CapacityStatus {
        CapacityStatus::for_focus(&self.nodes, &self.focus_ids, capacity)
    }
}

/// Shared handle to the application state
///
/// Cloning the store clones the handle, not the state.
#[derive(Clone)]
pub struct AppStore {
    tx: Arc<watch::Sender<AppState>>,
}

impl AppStore {
    pub fn new() -> Self {
        Self::with_state(AppState::default())
    }

    pub fn with_state(state: AppState) -> Self {
        let (tx, _rx) = watch::channel(state);
        Self { tx: Arc::new(tx) }
    }

    /// Apply an action and notify subscribers
    pub fn dispatch(&self, action: Action) {
        self.tx.send_modify(|state| {
            let current = std::mem::take(state);
            *state = current.reduce(action);
        });
    }

    /// Copy of the current state
    pub fn snapshot(&self) -> AppState {
        self.tx.borrow().clone()
    }

    /// Read from the current state without cloning it
    pub fn read<R>(&self, f: impl FnOnce(&AppState) -> R) -> R {
        f(&*self.tx.borrow())
    }

    pub fn subscribe(&self) -> watch::Receiver<AppState> {
        self.tx.subscribe()
    }
}

impl Default for AppStore {
    fn default() -> Self {
        Self::new()
    }
}
