//! Nodes Core - Daily Progress Reconciliation Engine
//!
//! Data and state layer of the Nodes habit tracker. Users define nodes
//! (binary, quantity or duration habits), record impulses against them for a
//! calendar day, and pin a subset of nodes as the day's focus.
//!
//! # Architecture
//!
//! - **Impulse Ledger**: progress is never stored directly; it is derived from
//!   the day's impulses on every read
//! - **Backend Trait**: the hosted REST backend and the in-memory backend both
//!   implement `ProgressBackend`
//! - **Optimistic Controls**: per-type state machines keep local edits on top
//!   of server-confirmed values
//! - **Shared Store**: one reducer-driven cache of the selected day
//!
//! # Modules
//!
//! - [`models`] - Nodes, impulses, day keys, progress and focus
//! - [`db`] - Backend trait, REST client and in-memory backend
//! - [`services`] - Node store, impulse ledger, focus set, connectors, notices
//! - [`state`] - Application state container
//! - [`controls`] - Binary, quantity and duration controls
//! - [`dashboard`] - Screen-level orchestration
//! - [`config`] - Engine configuration
//! - [`logging`] - Tracing setup

pub mod config;
pub mod controls;
pub mod dashboard;
pub mod db;
pub mod logging;
pub mod models;
pub mod services;
pub mod state;

// Re-export commonly used types
pub use config::{BackendConfig, EngineConfig};
pub use controls::*;
pub use dashboard::{Dashboard, NodeControl};
pub use db::{BackendError, MemoryBackend, ProgressBackend, RestBackend};
pub use models::*;
pub use services::*;
pub use state::{Action, AppState, AppStore, DaySnapshot};
