//! Systems - logic that operates on tile components

mod aggregation;
mod hierarchy;
mod production;
mod reachability;
mod withdrawal;

pub use aggregation::*;
pub use hierarchy::*;
pub use production::*;
pub use reachability::*;
pub use withdrawal::*;
