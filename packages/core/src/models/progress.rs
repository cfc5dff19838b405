//! Daily Progress Calculator
//!
//! Pure functions turning a node and its impulses for one calendar day into a
//! `DailyProgress`. The batch form groups impulses by node id first and then
//! applies the single-node calculator, so both paths always agree.
//!
//! # Completion rules
//!
//! - **binary**: completed when at least one impulse exists; values are ignored
//! - **quantity / duration**: completed when the summed value reaches a positive
//!   target; anything above the target is reported as overdrive
//!
//! A quantity or duration node without a positive target is never completed.

use crate::models::{Impulse, Node, NodeType};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Per-node state for one day
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct DailyProgress {
    pub completed: bool,
    /// Sum of the day's impulse values
    pub value: f64,
    /// Amount above target (always 0 for binary nodes)
    pub overdrive: f64,
}

/// Coarse phase of a node's day, used for card styling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressPhase {
    NotStarted,
    InProgress,
    Completed,
    Overdrive,
}

impl DailyProgress {
    /// Compute progress for one node from the impulses of a single day
    ///
    /// `target_units` is the target in impulse units (seconds for duration
    /// nodes), as returned by [`Node::target_units`].
    pub fn compute(node_type: NodeType, target_units: Option<f64>, impulses: &[Impulse]) -> Self {
        let value: f64 = impulses.iter().map(|i| i.value).sum();

        match node_type {
            NodeType::Binary => Self {
                completed: !impulses.is_empty(),
                value,
                overdrive: 0.0,
            },
            NodeType::Quantity | NodeType::Duration => Self::from_total(value, target_units),
        }
    }

    /// Progress for a node given its impulses for the day
    pub fn for_node(node: &Node, impulses: &[Impulse]) -> Self {
        Self::compute(node.node_type, node.target_units(), impulses)
    }

    /// Progress of an accumulating node from an already summed value
    pub fn from_total(value: f64, target_units: Option<f64>) -> Self {
        match target_units.filter(|t| t.is_finite() && *t > 0.0) {
            Some(target) => Self {
                completed: value >= target,
                value,
                overdrive: (value - target).max(0.0),
            },
            None => Self {
                completed: false,
                value,
                overdrive: 0.0,
            },
        }
    }

    /// Share of the target reached, capped at 100
    pub fn percent_of(&self, target_units: Option<f64>) -> f64 {
        match target_units.filter(|t| t.is_finite() && *t > 0.0) {
            Some(target) => ((self.value / target) * 100.0).clamp(0.0, 100.0),
            None if self.completed => 100.0,
            None => 0.0,
        }
    }

    pub fn phase(&self) -> ProgressPhase {
        if self.overdrive > 0.0 {
            ProgressPhase::Overdrive
        } else if self.completed {
            ProgressPhase::Completed
        } else if self.value > 0.0 {
            ProgressPhase::InProgress
        } else {
            ProgressPhase::NotStarted
        }
    }
}

/// Group a day's impulses by node id
pub fn group_by_node(impulses: &[Impulse]) -> HashMap<&str, Vec<&Impulse>> {
    let mut grouped: HashMap<&str, Vec<&Impulse>> = HashMap::new();
    for impulse in impulses {
        grouped.entry(impulse.node_id.as_str()).or_default().push(impulse);
    }
    grouped
}

/// Progress for many nodes sharing one date
///
/// Every node gets an entry, including nodes without impulses.
pub fn batch_progress(nodes: &[Node], impulses: &[Impulse]) -> HashMap<String, DailyProgress> {
    let grouped = group_by_node(impulses);

    nodes
        .iter()
        .map(|node| {
            let day: Vec<Impulse> = grouped
                .get(node.id.as_str())
                .map(|rows| rows.iter().map(|i| (*i).clone()).collect())
                .unwrap_or_default();
            (node.id.clone(), DailyProgress::for_node(node, &day))
        })
        .collect()
}
