//! Persistence Layer
//!
//! All authoritative state lives in a hosted row store; this module defines
//! the `ProgressBackend` abstraction the services talk to and its two
//! implementations:
//!
//! - `RestBackend` - PostgREST/auth endpoints over HTTP (production)
//! - `MemoryBackend` - in-process rows with call log and failure injection
//!   (tests, demos, offline development)

mod backend;
mod error;
mod memory_store;
mod rest_store;

pub use backend::ProgressBackend;
pub use error::BackendError;
pub use memory_store::{BackendCall, MemoryBackend};
pub use rest_store::RestBackend;
