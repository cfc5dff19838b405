//! Business Services
//!
//! This module contains the service layer of the progress engine:
//!
//! - `NodeService` - node definitions (list, create, edit, delete)
//! - `ImpulseLedger` - impulse writes (increment, absolute, clear) and batch reads
//! - `DailyFocusService` - per-day focus set and capacity accounting
//! - `ConnectorService` - connectors (tags) and cores (groups)
//! - `Notifier` - user-visible notices
//!
//! Services coordinate between the persistence backend and the controls,
//! validating input before any request is made.

pub mod connector_service;
pub mod error;
pub mod focus_service;
pub mod impulse_ledger;
pub mod node_service;
pub mod notifier;

pub use connector_service::ConnectorService;
pub use error::ServiceError;
pub use focus_service::DailyFocusService;
pub use impulse_ledger::ImpulseLedger;
pub use node_service::NodeService;
pub use notifier::{Notice, NoticeLevel, Notifier, RecordingNotifier, TracingNotifier};
