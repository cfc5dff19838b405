//! Data Models
//!
//! This module contains the core data structures of the progress engine:
//!
//! - `Node` - habit unit definition with its type, target and mass
//! - `Impulse` - completion event for one node on one calendar day
//! - `DailyProgress` - per-node day state computed from impulses
//! - `FocusEntry` / `CapacityStatus` - daily focus selection and mass budget
//! - `Connector` / `Core` - tags and groups nodes are attached to
//!
//! Row types mirror the hosted tables field-for-field (snake_case), so they
//! deserialize directly from REST responses.

mod connector;
mod day;
mod focus;
mod icon;
mod impulse;
mod node;
mod progress;

pub use connector::{normalize_connector_name, Connector, ConnectorOptions, Core, NewConnector};
pub use day::{Clock, DayKey, FixedClock, SystemClock, WeekView};
pub use focus::{current_mass, dedupe_focus, CapacityStatus, FocusEntry, DEFAULT_DAILY_CAPACITY};
pub use icon::{IconCategory, NodeIcon, ICON_CATEGORIES};
pub use impulse::{Impulse, ProgressWrite, SaveProgressParams, WriteMode};
pub use node::{
    parse_mass, parse_target, NewNode, Node, NodeDefaults, NodeDraft, NodeType, NodeUpdate,
    StabilityBand, ValidationError, ValidationErrors, DEFAULT_MASS, MAX_MASS, MIN_MASS,
};
pub use progress::{batch_progress, group_by_node, DailyProgress, ProgressPhase};
