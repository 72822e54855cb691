//! Host and container persistence.
//!
//! A single SQLite file holds the node's inventory. The infrastructure
//! service is the only process that opens it; every operation here is one
//! short statement or transaction, and schema invariants (foreign keys,
//! uniqueness, the single local host) are enforced in the store itself.

mod container;
mod db;
mod host;
mod models;

//--------------------------------------------------------------------------------------------------
// Exports
//--------------------------------------------------------------------------------------------------

pub use container::*;
pub use db::*;
pub use host::*;
pub use models::*;
