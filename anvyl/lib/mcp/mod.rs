//! Model Context Protocol server.
//!
//! Exposes the infrastructure tool set over JSON-RPC 2.0 so external AI
//! clients and the internal agent service can invoke it. Two transports:
//! HTTP POST on `/mcp` (default port 4201) and newline-delimited stdio.

mod protocol;
mod router;
mod server;
mod tools;

//--------------------------------------------------------------------------------------------------
// Exports
//--------------------------------------------------------------------------------------------------

pub use protocol::*;
pub use router::*;
pub use server::*;
pub use tools::*;
