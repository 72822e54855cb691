mod anvyl;
mod anvyld;

//--------------------------------------------------------------------------------------------------
// Exports
//--------------------------------------------------------------------------------------------------

pub use anvyl::*;
pub use anvyld::*;
