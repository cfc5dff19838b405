//! Daily Focus Set
//!
//! Which nodes are pinned as active on a given day. The whole set for a date
//! is replaced on every save; there is no partial diff. Focus membership is
//! independent of completion, and the capacity ceiling is a warning only.

use crate::db::ProgressBackend;
use crate::models::{current_mass, dedupe_focus, CapacityStatus, DayKey, Node, DEFAULT_DAILY_CAPACITY};
use crate::services::error::{or_empty_when_signed_out, ServiceError};
use std::sync::Arc;

#[derive(Clone)]
pub struct DailyFocusService {
    backend: Arc<dyn ProgressBackend>,
    capacity: f64,
}

impl DailyFocusService {
    pub fn new(backend: Arc<dyn ProgressBackend>) -> Self {
        Self::with_capacity(backend, DEFAULT_DAILY_CAPACITY)
    }

    pub fn with_capacity(backend: Arc<dyn ProgressBackend>, capacity: f64) -> Self {
        Self { backend, capacity }
    }

    pub fn capacity(&self) -> f64 {
        self.capacity
    }

    /// Node ids pinned for the date; empty when none are set
    pub async fn get_focus_node_ids(&self, date: DayKey) -> Result<Vec<String>, ServiceError> {
        or_empty_when_signed_out(self.backend.focus_node_ids(date).await, "focus set")
    }

    /// Replace the focus set for the date
    ///
    /// An empty selection clears the day's focus.
    pub async fn replace_focus(&self, date: DayKey, node_ids: &[String]) -> Result<(), ServiceError> {
        let node_ids = dedupe_focus(node_ids);
        self.backend.replace_focus(date, &node_ids).await?;
        tracing::info!("Saved focus for {}: {} nodes", date, node_ids.len());
        Ok(())
    }

    /// Sum of mass of the nodes focused on the date
    pub async fn current_mass(&self, nodes: &[Node], date: DayKey) -> Result<f64, ServiceError> {
        let focus_ids = self.get_focus_node_ids(date).await?;
        Ok(current_mass(nodes, &focus_ids))
    }

    /// Capacity bar state for a selection
    pub fn capacity_status(&self, nodes: &[Node], focus_ids: &[String]) -> CapacityStatus {
        let status = CapacityStatus::for_focus(nodes, focus_ids, self.capacity);
        if status.overloaded {
            tracing::debug!(
                "Focus mass {} exceeds daily capacity {}",
                status.current_mass,
                status.capacity
            );
        }
        status
    }
}
