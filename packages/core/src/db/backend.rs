//! ProgressBackend Trait - Persistence Abstraction
//!
//! The engine never owns authoritative state: nodes, impulses, focus entries,
//! connectors and cores live in a hosted row store. This trait is the seam
//! between the services and that store.
//!
//! # Contract
//!
//! Implementations must preserve:
//!
//! 1. **Day keys**: impulse and focus rows are keyed by `YYYY-MM-DD`
//! 2. **Write modes**: `save_node_progress` distinguishes incremental writes
//!    (append a row) from absolute writes (replace the day's rows with one)
//! 3. **Focus replace**: `replace_focus` removes every entry for the date
//!    before inserting the new selection
//! 4. **Explicit deletion**: clearing a day is its own operation, never a
//!    magic value on the progress channel
//!
//! Every call is a single request from the caller's perspective: it either
//! takes effect or returns an error.
//!
//! # Examples
//!
//! ```rust,no_run
//! use nodes_core::db::{MemoryBackend, ProgressBackend};
//! use nodes_core::models::{DayKey, ProgressWrite};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let backend = MemoryBackend::new("user-1");
//! let today: DayKey = "2024-06-01".parse()?;
//! backend
//!     .save_node_progress(&ProgressWrite::incremental("node-1", 1.0, today)?)
//!     .await?;
//! let rows = backend.impulses_for(&["node-1".to_string()], today).await?;
//! assert_eq!(rows.len(), 1);
//! # Ok(())
//! # }
//! ```

use crate::db::BackendError;
use crate::models::{
    Connector, Core, DayKey, Impulse, NewConnector, NewNode, Node, NodeUpdate, ProgressWrite,
};
use async_trait::async_trait;

/// Abstraction over the hosted persistence backend
///
/// All methods are user-scoped: implementations resolve the current user from
/// their session and return `BackendError::NotAuthenticated` when there is none.
#[async_trait]
pub trait ProgressBackend: Send + Sync {
    //
    // SESSION
    //

    /// Id of the signed-in user
    async fn current_user_id(&self) -> Result<String, BackendError>;

    //
    // NODES
    //

    /// All nodes of the current user, newest first, with connector ids attached
    async fn list_nodes(&self) -> Result<Vec<Node>, BackendError>;

    async fn get_node(&self, id: &str) -> Result<Option<Node>, BackendError>;

    /// Insert the node row only; connector links are written separately
    async fn insert_node(&self, node: &NewNode) -> Result<Node, BackendError>;

    /// Update the node row columns present in `update`
    async fn update_node(&self, id: &str, update: &NodeUpdate) -> Result<Node, BackendError>;

    async fn delete_node(&self, id: &str) -> Result<(), BackendError>;

    /// Replace the node's connector links with `connector_ids`
    async fn replace_node_connectors(
        &self,
        node_id: &str,
        connector_ids: &[String],
    ) -> Result<(), BackendError>;

    //
    // CONNECTORS & CORES
    //

    async fn list_connectors(&self) -> Result<Vec<Connector>, BackendError>;

    async fn insert_connector(&self, connector: &NewConnector) -> Result<Connector, BackendError>;

    async fn list_cores(&self) -> Result<Vec<Core>, BackendError>;

    //
    // IMPULSES
    //

    /// The `save_node_progress` remote procedure
    async fn save_node_progress(&self, write: &ProgressWrite) -> Result<(), BackendError>;

    /// Delete every impulse of a node on a day, returning the number removed
    async fn clear_day(&self, node_id: &str, date: DayKey) -> Result<u32, BackendError>;

    /// Impulse rows of the given nodes on one day
    async fn impulses_for(
        &self,
        node_ids: &[String],
        date: DayKey,
    ) -> Result<Vec<Impulse>, BackendError>;

    //
    // DAILY FOCUS
    //

    async fn focus_node_ids(&self, date: DayKey) -> Result<Vec<String>, BackendError>;

    /// Delete the day's focus entries, then insert one per node id
    async fn replace_focus(&self, date: DayKey, node_ids: &[String]) -> Result<(), BackendError>;
}
