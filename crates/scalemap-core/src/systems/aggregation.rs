//! Aggregation pass - bottom-up recomputation of subtree resources and transport reach

use crate::components::{
    Buildings, Ledger, LocalResources, Reach, SubtreeResources, Tile, TransportReach,
};
use hecs::{Entity, World};
use serde::{Deserialize, Serialize};

/// What one aggregation pass touched
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregationSummary {
    pub tiles_visited: usize,
    pub deepest_level: usize,
}

/// Recompute `SubtreeResources` and `TransportReach` for every tile under `roots`.
///
/// Recomputes from scratch; any drift left by in-tick bookkeeping is
/// corrected here.
pub fn aggregation_system(
    world: &mut World,
    roots: &[Entity],
    granularity_step: i32,
) -> AggregationSummary {
    let mut summary = AggregationSummary::default();
    for &root in roots {
        aggregate_subtree(world, root, granularity_step, 0, &mut summary);
    }
    summary
}

/// Post-order aggregation of one subtree, returning its totals.
///
/// A tile's caches are written only once every child has returned.
fn aggregate_subtree(
    world: &mut World,
    tile: Entity,
    granularity_step: i32,
    depth: usize,
    summary: &mut AggregationSummary,
) -> (Ledger, Reach) {
    let (scale, children) = match world.get::<&Tile>(tile) {
        Ok(t) => (t.scale, t.children().to_vec()),
        Err(_) => return (Ledger::new(), Reach::NONE),
    };

    let mut resources = world
        .get::<&LocalResources>(tile)
        .map(|local| local.0.clone())
        .unwrap_or_default();
    let mut reach = world
        .get::<&Buildings>(tile)
        .map(|buildings| buildings.transport_reach())
        .unwrap_or(Reach::NONE);

    for child in children {
        let child_scale = world.get::<&Tile>(child).map(|t| t.scale).ok();
        assert_eq!(
            child_scale,
            Some(scale - granularity_step),
            "tile {:?} under {:?} breaks the scale step",
            child,
            tile
        );
        let (child_resources, child_reach) =
            aggregate_subtree(world, child, granularity_step, depth + 1, summary);
        resources.merge_in(&child_resources);
        reach = reach.max(child_reach);
    }

    write_caches(world, tile, &resources, reach);
    summary.tiles_visited += 1;
    summary.deepest_level = summary.deepest_level.max(depth);

    (resources, reach)
}

fn write_caches(world: &mut World, tile: Entity, resources: &Ledger, reach: Reach) {
    let resources_written = match world.get::<&mut SubtreeResources>(tile) {
        Ok(mut cache) => {
            cache.0 = resources.clone();
            true
        }
        Err(_) => false,
    };
    if !resources_written {
        let _ = world.insert_one(tile, SubtreeResources(resources.clone()));
    }

    let reach_written = match world.get::<&mut TransportReach>(tile) {
        Ok(mut cache) => {
            cache.0 = reach;
            true
        }
        Err(_) => false,
    };
    if !reach_written {
        let _ = world.insert_one(tile, TransportReach(reach));
    }
}
