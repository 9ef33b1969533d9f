//! Reachability query - which pool a tile may draw from this tick.
//!
//! A tile's effective reach starts at its own subtree transport reach. Every
//! ancestor whose subtree reach spans at least its own scale dominates its
//! level and can raise the effective reach to that value. The pool is the
//! subtree of the ancestor whose scale equals the effective reach, falling
//! back to the root when no scale matches.

use super::hierarchy::{ancestors, scale_of};
use crate::components::{Ledger, Reach, SubtreeResources, Tile, TransportReach};
use hecs::{Entity, World};

/// Result of a reachability query for one tile
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reachability {
    pub effective_reach: Reach,
    /// Tile whose subtree pool is available
    pub anchor: Entity,
}

fn reach_of(world: &World, tile: Entity) -> Reach {
    world
        .get::<&TransportReach>(tile)
        .map(|r| r.0)
        .unwrap_or(Reach::NONE)
}

/// Resolve effective reach and pool anchor; `None` when the tile does not exist.
pub fn query_reachability(world: &World, tile: Entity) -> Option<Reachability> {
    let tile_scale = world.get::<&Tile>(tile).ok()?.scale;

    let mut effective_reach = reach_of(world, tile);
    for ancestor in ancestors(world, tile) {
        let reach = reach_of(world, ancestor);
        let Some(scale) = scale_of(world, ancestor) else {
            continue;
        };
        if reach.covers(scale) {
            effective_reach = effective_reach.max(reach);
        }
    }

    // The anchor is the first tile on the way up whose scale equals the reach,
    // or the root when none does. A reach below the tile's own scale does not
    // span the tile's level and leaves the tile on its own subtree.
    let anchor = match effective_reach.value() {
        Some(range) if range >= tile_scale => {
            let mut anchor = tile;
            for candidate in std::iter::once(tile).chain(ancestors(world, tile)) {
                anchor = candidate;
                if scale_of(world, candidate) == Some(range) {
                    break;
                }
            }
            anchor
        }
        _ => tile,
    };

    Some(Reachability {
        effective_reach,
        anchor,
    })
}

/// Effective reach alone, `Reach::NONE` when the tile does not exist
pub fn effective_reach(world: &World, tile: Entity) -> Reach {
    query_reachability(world, tile)
        .map(|r| r.effective_reach)
        .unwrap_or(Reach::NONE)
}

pub fn pool_anchor(world: &World, tile: Entity) -> Option<Entity> {
    query_reachability(world, tile).map(|r| r.anchor)
}

/// The pool a tile may draw from, empty when the tile does not exist
pub fn reachable_pool(world: &World, tile: Entity) -> Ledger {
    pool_anchor(world, tile)
        .and_then(|anchor| {
            world
                .get::<&SubtreeResources>(anchor)
                .ok()
                .map(|s| s.0.clone())
        })
        .unwrap_or_default()
}
