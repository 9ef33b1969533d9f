//! Component definitions for the tile tree.
//!
//! Components are pure data attached to tile entities.
//! They have no behavior beyond value bookkeeping - that lives in systems.

mod building;
mod resources;
mod terrain;
mod tile;

pub use building::*;
pub use resources::*;
pub use terrain::*;
pub use tile::*;
