//! ScaleMap Core - Multi-Scale Tile Tree Simulation Engine
//!
//! A map is a tree of tiles: every zoomable tile opens a finer sub-map one
//! granularity step below it. Resources sit on tiles, transport buildings
//! decide how far up the tree a tile may draw from, and withdrawals are
//! spread down the tree in proportion to what each branch holds.
//!
//! # Architecture
//!
//! Tiles live in a `hecs` world:
//! - **Entities**: Tiles, linked parent to child through their sub-maps
//! - **Components**: `Tile`, `LocalResources`, `SubtreeResources`, `TransportReach`, `Buildings`
//! - **Systems**: Aggregation, reachability, withdrawal and production over those components
//!
//! # Example
//!
//! ```rust,no_run
//! use scalemap_core::prelude::*;
//! use scalemap_core::generation::TreeConfig;
//!
//! let mut engine = SimulationEngine::new();
//!
//! // Generate a star system tree
//! let layout = engine.generate(&TreeConfig::default(), 42).unwrap();
//!
//! // Run simulation
//! for _ in 0..100 {
//!     engine.tick();
//! }
//!
//! let tile = layout.tiles[0];
//! let pool = engine.reachable_pool(tile);
//! println!("{} units of ore in reach", pool.get(ResourceKind::Ore));
//! ```

pub mod components;
pub mod config;
pub mod engine;
pub mod error;
pub mod generation;
pub mod systems;

/// Commonly used types for convenient importing
pub mod prelude {
    pub use crate::components::*;
    pub use crate::config::EngineConfig;
    pub use crate::engine::{SimulationEngine, TickReport, TileView};
    pub use crate::error::{ConfigError, TreeError};
    pub use crate::systems::{Reachability, Withdrawal};
}
