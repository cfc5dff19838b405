//! Dashboard
//!
//! Screen-level orchestration over the services and the shared store:
//!
//! - Loading a day (nodes, focus set, connectors, cores and batch progress)
//! - Day selection with the week strip; future days cannot be selected
//! - One-tap impulses and quantity updates from node cards
//! - Focus selection with the capacity warning
//! - Node and connector editing
//! - Building the per-type control for a node
//!
//! Every handler reports its outcome through the notifier and returns whether
//! the write was acknowledged. Errors never escape to the caller.

use crate::config::EngineConfig;
use crate::controls::{BinaryControl, ControlContext, DurationControl, QuantityControl};
use crate::db::ProgressBackend;
use crate::models::{
    dedupe_focus, CapacityStatus, Clock, Connector, ConnectorOptions, DailyProgress, DayKey, Node,
    NodeDraft, NodeType, WeekView,
};
use crate::services::{
    ConnectorService, DailyFocusService, ImpulseLedger, NodeService, Notice, Notifier, ServiceError,
};
use crate::state::{Action, AppStore, DaySnapshot};
use std::collections::HashMap;
use std::sync::Arc;

/// Interactive control matching a node's type
pub enum NodeControl {
    Binary(BinaryControl),
    Quantity(QuantityControl),
    Duration(DurationControl),
}

impl NodeControl {
    pub fn node(&self) -> &Node {
        match self {
            Self::Binary(c) => c.node(),
            Self::Quantity(c) => c.node(),
            Self::Duration(c) => c.node(),
        }
    }

    /// Passive refresh from a confirmed backend value
    pub fn refresh(&self, progress: DailyProgress) {
        match self {
            Self::Binary(c) => c.refresh(progress.completed),
            Self::Quantity(c) => c.refresh(progress.value),
            Self::Duration(c) => c.refresh(progress.value),
        }
    }
}

pub struct Dashboard {
    nodes: NodeService,
    ledger: ImpulseLedger,
    focus: DailyFocusService,
    connectors: ConnectorService,
    store: AppStore,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
    min_session_secs: u64,
}

impl Dashboard {
    pub fn new(
        backend: Arc<dyn ProgressBackend>,
        config: &EngineConfig,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            nodes: NodeService::with_defaults(backend.clone(), config.node_defaults()),
            ledger: ImpulseLedger::new(backend.clone()),
            focus: DailyFocusService::with_capacity(backend.clone(), config.daily_capacity),
            connectors: ConnectorService::with_default_color(
                backend,
                config.default_connector_color.clone(),
            ),
            store: AppStore::new(),
            notifier,
            clock,
            min_session_secs: config.min_session_secs,
        }
    }

    pub fn store(&self) -> &AppStore {
        &self.store
    }

    pub fn today(&self) -> DayKey {
        self.clock.today()
    }

    /// Selected day, defaulting to today
    pub fn selected_date(&self) -> DayKey {
        self.store
            .read(|s| s.selected_date)
            .unwrap_or_else(|| self.today())
    }

    pub fn week_view(&self) -> WeekView {
        WeekView::new(self.selected_date(), self.today())
    }

    /// Load everything shown for a day
    ///
    /// The four list reads run concurrently, then progress is read in one
    /// batch. Any failure shows a single notice and leaves the day empty.
    pub async fn load_day(&self, date: DayKey) -> bool {
        let (nodes, focus_ids, connectors, cores) = tokio::join!(
            self.nodes.list_nodes(),
            self.focus.get_focus_node_ids(date),
            self.connectors.list_connectors(),
            self.connectors.list_cores(),
        );

        let loaded = async {
            let nodes = nodes?;
            let day_values = self.ledger.read_batch_progress(&nodes, date).await?;
            Ok::<_, ServiceError>(DaySnapshot {
                date,
                nodes,
                day_values,
                focus_ids: focus_ids?,
            })
        }
        .await
        .and_then(|snapshot| Ok((snapshot, connectors?, cores?)));

        match loaded {
            Ok((snapshot, connectors, cores)) => {
                tracing::debug!(
                    "Loaded {} nodes and {} focus entries for {}",
                    snapshot.nodes.len(),
                    snapshot.focus_ids.len(),
                    date
                );
                self.store.dispatch(Action::LoadDay(snapshot));
                self.store.dispatch(Action::SetConnectors(connectors));
                self.store.dispatch(Action::SetCores(cores));
                true
            }
            Err(e) => {
                tracing::warn!("Failed to load {}: {}", date, e);
                self.store.dispatch(Action::LoadDay(DaySnapshot {
                    date,
                    nodes: Vec::new(),
                    day_values: HashMap::new(),
                    focus_ids: Vec::new(),
                }));
                self.store.dispatch(Action::SetConnectors(Vec::new()));
                self.store.dispatch(Action::SetCores(Vec::new()));
                self.notifier
                    .notify(Notice::failure("Could not load your nodes", &e));
                false
            }
        }
    }

    /// Switch to another day and load it; future days are refused
    pub async fn select_date(&self, date: DayKey) -> bool {
        if date > self.today() {
            tracing::debug!("Refusing to select future day {}", date);
            return false;
        }
        self.store.dispatch(Action::SelectDate(date));
        self.load_day(date).await
    }

    /// Record an impulse of `value` from a node card and re-read the node's day
    pub async fn handle_impulse(&self, node_id: &str, value: f64) -> bool {
        let date = self.selected_date();
        let result = async {
            let node = self.cached_node(node_id)?;
            self.ledger.record_increment(node_id, value, date).await?;
            let progress = self.ledger.read_progress(&node, date).await?;
            Ok::<_, ServiceError>((node, progress))
        }
        .await;

        match result {
            Ok((node, progress)) => {
                self.publish(node_id, progress);
                self.notifier
                    .notify(Notice::success(format!("Impulse recorded for {}", node.name)));
                true
            }
            Err(e) => {
                tracing::warn!("Impulse for node {} failed: {}", node_id, e);
                self.notifier
                    .notify(Notice::failure("Could not record impulse", &e));
                false
            }
        }
    }

    /// Overwrite a node's value for the selected day and re-read it
    pub async fn handle_quantity_update(&self, node_id: &str, value: f64) -> bool {
        let date = self.selected_date();
        let result = async {
            let node = self.cached_node(node_id)?;
            self.ledger.set_absolute(node_id, value, date).await?;
            let progress = self.ledger.read_progress(&node, date).await?;
            Ok::<_, ServiceError>((node, progress))
        }
        .await;

        match result {
            Ok((node, progress)) => {
                self.publish(node_id, progress);
                self.notifier
                    .notify(Notice::success(format!("{} updated to {}", node.name, value)));
                true
            }
            Err(e) => {
                tracing::warn!("Quantity update for node {} failed: {}", node_id, e);
                self.notifier
                    .notify(Notice::failure("Could not update progress", &e));
                false
            }
        }
    }

    /// Re-read one node's progress for the selected day
    pub async fn refresh_node(&self, node_id: &str) -> Option<DailyProgress> {
        let date = self.selected_date();
        let node = self.store.read(|s| s.node(node_id).cloned())?;
        match self.ledger.read_progress(&node, date).await {
            Ok(progress) => {
                self.publish(node_id, progress);
                Some(progress)
            }
            Err(e) => {
                tracing::warn!("Failed to refresh node {}: {}", node_id, e);
                None
            }
        }
    }

    /// Capacity of a prospective focus selection
    pub fn capacity(&self, focus_ids: &[String]) -> CapacityStatus {
        self.store
            .read(|s| self.focus.capacity_status(&s.nodes, focus_ids))
    }

    /// Capacity of the saved focus set
    pub fn current_capacity(&self) -> CapacityStatus {
        self.store.read(|s| s.capacity(self.focus.capacity()))
    }

    /// Replace the selected day's focus set
    ///
    /// Going over capacity shows a warning but still saves.
    pub async fn save_focus(&self, node_ids: &[String]) -> bool {
        let date = self.selected_date();
        let node_ids = dedupe_focus(node_ids);

        let status = self.capacity(&node_ids);
        if status.overloaded {
            self.notifier.notify(
                Notice::warning("Over daily capacity").with_description(format!(
                    "Focus mass {:.1} exceeds capacity {:.1}",
                    status.current_mass, status.capacity
                )),
            );
        }

        match self.focus.replace_focus(date, &node_ids).await {
            Ok(()) => {
                let count = node_ids.len();
                self.store.dispatch(Action::SetFocus(node_ids));
                self.notifier
                    .notify(Notice::success(format!("Focus saved ({} nodes)", count)));
                true
            }
            Err(e) => {
                tracing::warn!("Failed to save focus for {}: {}", date, e);
                self.notifier.notify(Notice::failure("Could not save focus", &e));
                false
            }
        }
    }

    pub async fn create_node(&self, draft: &NodeDraft) -> Option<Node> {
        match self.nodes.create_node(draft).await {
            Ok(node) => {
                self.store.dispatch(Action::AddNode(node.clone()));
                self.notifier
                    .notify(Notice::success(format!("{} created", node.name)));
                Some(node)
            }
            Err(e) => {
                self.notifier.notify(Notice::failure("Could not create node", &e));
                None
            }
        }
    }

    pub async fn update_node(&self, id: &str, draft: &NodeDraft) -> Option<Node> {
        match self.nodes.update_node(id, draft).await {
            Ok(node) => {
                self.store.dispatch(Action::ReplaceNode(node.clone()));
                self.notifier
                    .notify(Notice::success(format!("{} updated", node.name)));
                Some(node)
            }
            Err(e) => {
                self.notifier.notify(Notice::failure("Could not update node", &e));
                None
            }
        }
    }

    pub async fn delete_node(&self, id: &str) -> bool {
        match self.nodes.delete_node(id).await {
            Ok(()) => {
                self.store.dispatch(Action::RemoveNode(id.to_string()));
                self.notifier.notify(Notice::info("Node deleted"));
                true
            }
            Err(e) => {
                self.notifier.notify(Notice::failure("Could not delete node", &e));
                false
            }
        }
    }

    pub async fn create_connector(&self, name: &str, options: ConnectorOptions) -> Option<Connector> {
        match self.connectors.create_connector(name, options).await {
            Ok(connector) => {
                let mut connectors = self.store.read(|s| s.connectors.clone());
                connectors.insert(0, connector.clone());
                self.store.dispatch(Action::SetConnectors(connectors));
                self.notifier
                    .notify(Notice::success(format!("#{} created", connector.name)));
                Some(connector)
            }
            Err(e) => {
                self.notifier
                    .notify(Notice::failure("Could not create connector", &e));
                None
            }
        }
    }

    /// Collaborators for controls on the selected day
    pub fn control_context(&self) -> ControlContext {
        ControlContext {
            ledger: self.ledger.clone(),
            notifier: self.notifier.clone(),
            store: self.store.clone(),
            date: self.selected_date(),
            min_session_secs: self.min_session_secs,
        }
    }

    /// Build the control for a cached node, seeded with its confirmed progress
    pub fn control_for(&self, node_id: &str) -> Option<NodeControl> {
        let (node, progress) = self
            .store
            .read(|s| s.node(node_id).cloned().map(|n| (n, s.progress(node_id))))?;
        let ctx = self.control_context();

        Some(match node.node_type {
            NodeType::Binary => NodeControl::Binary(BinaryControl::new(node, ctx, progress.completed)),
            NodeType::Quantity => {
                NodeControl::Quantity(QuantityControl::new(node, ctx, progress.value))
            }
            NodeType::Duration => {
                NodeControl::Duration(DurationControl::new(node, ctx, progress.value))
            }
        })
    }

    fn cached_node(&self, node_id: &str) -> Result<Node, ServiceError> {
        self.store
            .read(|s| s.node(node_id).cloned())
            .ok_or_else(|| ServiceError::node_not_found(node_id))
    }

    fn publish(&self, node_id: &str, progress: DailyProgress) {
        self.store.dispatch(Action::SetDayValue {
            node_id: node_id.to_string(),
            progress,
        });
    }
}
