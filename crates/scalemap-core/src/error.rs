//! Error types for tree handoff and configuration loading.

use hecs::Entity;
use std::{io, path::PathBuf};
use thiserror::Error;

/// Broken structural precondition in a tile tree handed to the engine
#[derive(Debug, Error)]
pub enum TreeError {
    #[error("tile {0:?} does not exist")]
    MissingTile(Entity),
    #[error("tile {tile:?} has scale {found}, expected {expected} under parent {parent:?}")]
    ScaleMismatch {
        tile: Entity,
        parent: Entity,
        expected: i32,
        found: i32,
    },
    #[error("sub-map of {tile:?} is recorded at scale {found}, expected {expected}")]
    MapScaleMismatch {
        tile: Entity,
        expected: i32,
        found: i32,
    },
    #[error("tile {tile:?} listed under {listed_under:?} points at parent {parent:?}")]
    ParentMismatch {
        tile: Entity,
        listed_under: Entity,
        parent: Option<Entity>,
    },
    #[error("root tile {0:?} has a parent")]
    RootHasParent(Entity),
    #[error("tile {0:?} is reachable more than once (cycle or shared child)")]
    Cycle(Entity),
    #[error("granularity step must be positive, got {0}")]
    InvalidGranularity(i32),
}

/// Engine configuration could not be loaded
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}
