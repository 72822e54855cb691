//! Infrastructure service and HTTP API.
//!
//! The single authority for host and container state on this node. Serves
//! the REST surface on port 4200, owns the SQLite inventory and the engine
//! socket, and runs the background reconciler that keeps the store aligned
//! with the engine's ground truth.

mod client;
mod handlers;
mod metrics;
mod reconciler;
mod server;
mod state;
mod types;

//--------------------------------------------------------------------------------------------------
// Exports
//--------------------------------------------------------------------------------------------------

pub use client::*;
pub use handlers::*;
pub use metrics::*;
pub use reconciler::*;
pub use server::*;
pub use state::*;
pub use types::*;
