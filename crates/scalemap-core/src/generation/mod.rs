//! Generation - building tile trees for the engine

mod builder;
mod fixture;

pub use builder::*;
pub use fixture::*;
