//! Tree navigation and structural validation over tile entities

use crate::components::Tile;
use crate::error::TreeError;
use hecs::{Entity, World};
use std::collections::HashSet;

pub fn parent_of(world: &World, tile: Entity) -> Option<Entity> {
    world.get::<&Tile>(tile).ok().and_then(|t| t.parent)
}

pub fn scale_of(world: &World, tile: Entity) -> Option<i32> {
    world.get::<&Tile>(tile).ok().map(|t| t.scale)
}

/// Direct children of a tile (copied out so the world can be mutated while iterating)
pub fn children_of(world: &World, tile: Entity) -> Vec<Entity> {
    world
        .get::<&Tile>(tile)
        .map(|t| t.children().to_vec())
        .unwrap_or_default()
}

/// Ancestors of a tile, nearest first, excluding the tile itself.
///
/// Panics if the parent chain loops: the generator contract forbids it and
/// every cached aggregate would be wrong past that point.
pub fn ancestors(world: &World, tile: Entity) -> Vec<Entity> {
    let limit = world.len() as usize;
    let mut chain = Vec::new();
    let mut current = parent_of(world, tile);
    while let Some(ancestor) = current {
        assert!(
            chain.len() <= limit && ancestor != tile,
            "cycle in parent chain of tile {:?}",
            tile
        );
        chain.push(ancestor);
        current = parent_of(world, ancestor);
    }
    chain
}

/// Topmost ancestor of a tile (the tile itself for roots)
pub fn root_of(world: &World, tile: Entity) -> Entity {
    ancestors(world, tile).last().copied().unwrap_or(tile)
}

/// Depth below the root, 0 for roots
pub fn depth_of(world: &World, tile: Entity) -> usize {
    ancestors(world, tile).len()
}

/// Every tile under the given roots, children before parents
pub fn post_order(world: &World, roots: &[Entity]) -> Vec<Entity> {
    let mut order = pre_order(world, roots);
    // Reversed pre-order with children pushed in order visits children first.
    order.reverse();
    order
}

/// Every tile under the given roots, parents before children
pub fn pre_order(world: &World, roots: &[Entity]) -> Vec<Entity> {
    let mut order = Vec::new();
    let mut stack: Vec<Entity> = roots.iter().rev().copied().collect();
    while let Some(tile) = stack.pop() {
        if !world.contains(tile) {
            continue;
        }
        order.push(tile);
        let children = children_of(world, tile);
        stack.extend(children.into_iter().rev());
    }
    order
}

/// Check the generator's structural contract for the trees under `roots`.
///
/// Returns the number of tiles visited.
pub fn validate_tree(
    world: &World,
    roots: &[Entity],
    granularity_step: i32,
) -> Result<usize, TreeError> {
    if granularity_step <= 0 {
        return Err(TreeError::InvalidGranularity(granularity_step));
    }

    let mut visited = HashSet::new();
    let mut stack = Vec::new();

    for &root in roots {
        let tile = world.get::<&Tile>(root).map_err(|_| TreeError::MissingTile(root))?;
        if !tile.is_root() {
            return Err(TreeError::RootHasParent(root));
        }
        stack.push(root);
    }

    while let Some(entity) = stack.pop() {
        if !visited.insert(entity) {
            return Err(TreeError::Cycle(entity));
        }
        let tile = world.get::<&Tile>(entity).map_err(|_| TreeError::MissingTile(entity))?;
        let Some(sub_map) = tile.sub_map.as_ref() else {
            continue;
        };

        let expected = tile.scale - granularity_step;
        if sub_map.scale() != expected {
            return Err(TreeError::MapScaleMismatch {
                tile: entity,
                expected,
                found: sub_map.scale(),
            });
        }

        for &child in sub_map.tiles() {
            let child_tile = world.get::<&Tile>(child).map_err(|_| TreeError::MissingTile(child))?;
            if child_tile.parent != Some(entity) || sub_map.parent() != entity {
                return Err(TreeError::ParentMismatch {
                    tile: child,
                    listed_under: entity,
                    parent: child_tile.parent,
                });
            }
            if child_tile.scale != expected {
                return Err(TreeError::ScaleMismatch {
                    tile: child,
                    parent: entity,
                    expected,
                    found: child_tile.scale,
                });
            }
            stack.push(child);
        }
    }

    Ok(visited.len())
}
