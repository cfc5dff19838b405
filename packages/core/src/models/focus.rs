//! Daily focus entries and capacity accounting
//!
//! The focus set pins nodes as active for one day. Its total mass is compared
//! against a daily capacity for a warning only; going over never blocks a save.

use crate::models::{DayKey, Node};
use serde::{Deserialize, Serialize};

/// Mass ceiling shown on the capacity bar
pub const DEFAULT_DAILY_CAPACITY: f64 = 10.0;

/// Row in the `daily_focus` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FocusEntry {
    pub user_id: String,
    pub node_id: String,
    pub focus_date: DayKey,
}

/// Sum of mass over the focused nodes
///
/// Focus ids without a matching node contribute nothing; a node with an
/// invalid mass counts as the default mass.
pub fn current_mass(nodes: &[Node], focus_ids: &[String]) -> f64 {
    focus_ids
        .iter()
        .filter_map(|id| nodes.iter().find(|n| &n.id == id))
        .map(Node::effective_mass)
        .sum()
}

/// Capacity bar state
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CapacityStatus {
    pub current_mass: f64,
    pub capacity: f64,
    /// Fill percentage, capped at 100
    pub ratio_percent: f64,
    pub overloaded: bool,
}

impl CapacityStatus {
    pub fn new(current_mass: f64, capacity: f64) -> Self {
        let capacity = if capacity.is_finite() && capacity > 0.0 {
            capacity
        } else {
            DEFAULT_DAILY_CAPACITY
        };
        Self {
            current_mass,
            capacity,
            ratio_percent: ((current_mass / capacity) * 100.0).clamp(0.0, 100.0),
            overloaded: current_mass > capacity,
        }
    }

    pub fn for_focus(nodes: &[Node], focus_ids: &[String], capacity: f64) -> Self {
        Self::new(current_mass(nodes, focus_ids), capacity)
    }

    /// Mass still available before the warning triggers
    pub fn remaining(&self) -> f64 {
        (self.capacity - self.current_mass).max(0.0)
    }
}

impl Default for CapacityStatus {
    fn default() -> Self {
        Self::new(0.0, DEFAULT_DAILY_CAPACITY)
    }
}

/// Deduplicate a focus selection, keeping first-seen order
pub fn dedupe_focus(node_ids: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(node_ids.len());
    for id in node_ids {
        if !id.is_empty() && !out.contains(id) {
            out.push(id.clone());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NewNode, NodeType};

    fn node(id: &str, mass: f64) -> Node {
        Node::from_new(
            id,
            "u1",
            NewNode {
                name: id.to_string(),
                description: None,
                node_type: NodeType::Binary,
                mass,
                target_value: None,
                color: "#8b5cf6".to_string(),
                icon: "Circle".to_string(),
                core_id: None,
                connector_ids: vec![],
            },
        )
    }

    #[test]
    fn test_current_mass_sums_focused_nodes() {
        let nodes = vec![node("n", 2.0), node("m", 3.0), node("x", 4.0)];
        let focus = vec!["n".to_string(), "m".to_string()];
        assert_eq!(current_mass(&nodes, &focus), 5.0);
        assert_eq!(current_mass(&nodes, &[]), 0.0);
        assert_eq!(current_mass(&nodes, &["gone".to_string()]), 0.0);
    }

    #[test]
    fn test_invalid_mass_counts_as_default() {
        let nodes = vec![node("n", 0.0)];
        assert_eq!(current_mass(&nodes, &["n".to_string()]), 1.0);
    }

    #[test]
    fn test_capacity_status_overload_is_warning_only() {
        let status = CapacityStatus::new(12.5, 10.0);
        assert!(status.overloaded);
        assert_eq!(status.ratio_percent, 100.0);
        assert_eq!(status.remaining(), 0.0);

        let status = CapacityStatus::new(10.0, 10.0);
        assert!(!status.overloaded);

        let status = CapacityStatus::new(2.5, 10.0);
        assert_eq!(status.ratio_percent, 25.0);
        assert_eq!(status.remaining(), 7.5);
    }

    #[test]
    fn test_dedupe_focus() {
        let ids = vec!["a".to_string(), "b".to_string(), "a".to_string()];
        assert_eq!(dedupe_focus(&ids), vec!["a".to_string(), "b".to_string()]);
    }
}
