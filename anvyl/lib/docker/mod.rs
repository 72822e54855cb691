//! Typed adapter over the Docker engine.
//!
//! The [`ContainerEngine`] trait is the seam between anvyl and the engine:
//! the infrastructure service only ever talks to the trait, which keeps the
//! engine library out of the rest of the crate and lets tests substitute a
//! scripted engine.

mod adapter;
mod engine;
mod types;

//--------------------------------------------------------------------------------------------------
// Exports
//--------------------------------------------------------------------------------------------------

pub use adapter::*;
pub use engine::*;
pub use types::*;
