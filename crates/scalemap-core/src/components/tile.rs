//! Tile tree components: Tile, MapLevel and the per-tile resource caches.
//!
//! Tiles are entities in the engine's `hecs::World`. A tile owns its
//! zoomed-in interior as a `MapLevel` of child entity handles and points back
//! at its parent with a plain handle.

use super::building::{Building, Buildings};
use super::resources::Ledger;
use super::terrain::TerrainType;
use hecs::{Entity, World};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Transport range, or negative infinity when there is no transport at all.
///
/// `Reach::NONE` orders below every real range, so `max` over a set of
/// reaches behaves like a max over integers extended with negative infinity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Reach(Option<i32>);

impl Reach {
    pub const NONE: Reach = Reach(None);

    pub fn range(range: i32) -> Self {
        Reach(Some(range))
    }

    pub fn value(&self) -> Option<i32> {
        self.0
    }

    pub fn is_none(&self) -> bool {
        self.0.is_none()
    }

    /// True when the reach spans at least the given scale
    pub fn covers(&self, scale: i32) -> bool {
        matches!(self.0, Some(range) if range >= scale)
    }
}

impl fmt::Display for Reach {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(range) => write!(f, "{}", range),
            None => write!(f, "-inf"),
        }
    }
}

/// Tile component - a node of the spatial hierarchy
#[derive(Debug, Clone)]
pub struct Tile {
    /// Zoom level; each step into a sub-map lowers it by the granularity step
    pub scale: i32,
    pub terrain: TerrainType,
    /// Non-owning back-reference, `None` for roots
    pub parent: Option<Entity>,
    /// Zoomed-in interior, only present on zoomable tiles
    pub sub_map: Option<MapLevel>,
}

impl Tile {
    pub fn new(terrain: TerrainType, scale: i32) -> Self {
        Self {
            scale,
            terrain,
            parent: None,
            sub_map: None,
        }
    }

    pub fn with_parent(mut self, parent: Entity) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    pub fn is_zoomable(&self) -> bool {
        self.sub_map.is_some()
    }

    /// Child tiles, empty for leaves
    pub fn children(&self) -> &[Entity] {
        self.sub_map.as_ref().map(MapLevel::tiles).unwrap_or(&[])
    }
}

/// Sibling tiles sharing one parent and one scale
#[derive(Debug, Clone)]
pub struct MapLevel {
    parent: Entity,
    scale: i32,
    tiles: Vec<Entity>,
}

impl MapLevel {
    pub fn new(parent: Entity, scale: i32) -> Self {
        Self {
            parent,
            scale,
            tiles: Vec::new(),
        }
    }

    pub fn parent(&self) -> Entity {
        self.parent
    }

    pub fn scale(&self) -> i32 {
        self.scale
    }

    pub fn tiles(&self) -> &[Entity] {
        &self.tiles
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Entity> {
        self.tiles.iter()
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    pub fn contains(&self, tile: Entity) -> bool {
        self.tiles.contains(&tile)
    }

    pub(crate) fn push(&mut self, tile: Entity) {
        if !self.tiles.contains(&tile) {
            self.tiles.push(tile);
        }
    }

    /// Every building placed on a tile of this level, with the tile it sits on
    pub fn buildings(&self, world: &World) -> Vec<(Entity, Building)> {
        let mut found = Vec::new();
        for &tile in &self.tiles {
            if let Ok(buildings) = world.get::<&Buildings>(tile) {
                found.extend(buildings.iter().map(|b| (tile, b.clone())));
            }
        }
        found
    }

    /// Tiles of this level carrying a building with the given name
    pub fn tiles_with_building(&self, world: &World, name: &str) -> Vec<Entity> {
        self.tiles
            .iter()
            .copied()
            .filter(|&tile| {
                world
                    .get::<&Buildings>(tile)
                    .map(|buildings| buildings.find(name).is_some())
                    .unwrap_or(false)
            })
            .collect()
    }
}

/// Quantities produced or stored directly at a tile
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LocalResources(pub Ledger);

/// Cached sum of the tile's and all descendants' local resources
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubtreeResources(pub Ledger);

/// Cached max transport range over the tile's subtree
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransportReach(pub Reach);
