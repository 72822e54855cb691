//! Common utilities and helpers.

mod env;
mod net;
mod path;
mod proc;

//--------------------------------------------------------------------------------------------------
// Exports
//--------------------------------------------------------------------------------------------------

pub use env::*;
pub use net::*;
pub use path::*;
pub use proc::*;
