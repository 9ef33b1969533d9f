//! Distributed withdrawal - removing resources from a subtree.
//!
//! A withdrawal drains the starting tile's local stock first, then splits what
//! is still owed among the child subtrees in proportion to what each holds,
//! recursively. Every amount taken from a local ledger is also taken from the
//! subtree cache of that tile and each of its ancestors, so cached totals stay
//! exact until the next aggregation pass.

use super::hierarchy::{ancestors, children_of};
use super::reachability::pool_anchor;
use crate::components::{LocalResources, ResourceKind, SubtreeResources};
use hecs::{Entity, World};
use serde::{Deserialize, Serialize};

/// Outcome of a withdrawal request
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Withdrawal {
    pub requested: f64,
    pub removed: f64,
    pub shortfall: f64,
}

impl Withdrawal {
    pub fn new(requested: f64, removed: f64) -> Self {
        Self {
            requested,
            removed,
            shortfall: (requested - removed).max(0.0),
        }
    }

    /// Fully satisfied, up to `epsilon`
    pub fn is_complete(&self, epsilon: f64) -> bool {
        self.shortfall <= epsilon
    }
}

/// Withdraw `amount` of `kind` from the subtree rooted at `tile`.
///
/// Never removes more than requested or more than the subtree holds. Callers
/// must credit any output from `removed`, not from the request.
pub fn withdraw(
    world: &mut World,
    tile: Entity,
    kind: ResourceKind,
    amount: f64,
    epsilon: f64,
) -> Withdrawal {
    let requested = amount.max(0.0);
    let removed = withdraw_from(world, tile, kind, requested, epsilon);
    let result = Withdrawal::new(requested, removed);
    if !result.is_complete(epsilon) {
        log::debug!(
            "withdrawal of {:.3} {} at {:?} short by {:.3}",
            requested,
            kind.name(),
            tile,
            result.shortfall
        );
    }
    result
}

/// Withdraw from the tile's own subtree first, then the rest from its reachable pool.
pub fn withdraw_reachable(
    world: &mut World,
    tile: Entity,
    kind: ResourceKind,
    amount: f64,
    epsilon: f64,
) -> Withdrawal {
    let local = withdraw(world, tile, kind, amount, epsilon);
    if local.is_complete(epsilon) {
        return local;
    }

    match pool_anchor(world, tile) {
        Some(anchor) if anchor != tile => {
            let pooled = withdraw(world, anchor, kind, local.shortfall, epsilon);
            Withdrawal::new(local.requested, local.removed + pooled.removed)
        }
        _ => local,
    }
}

/// Credit a tile's local stock and every cached total above it.
///
/// Returns the amount credited (zero for missing tiles or non-positive amounts).
pub fn deposit(world: &mut World, tile: Entity, kind: ResourceKind, amount: f64) -> f64 {
    if amount <= 0.0 {
        return 0.0;
    }
    let credited = match world.get::<&mut LocalResources>(tile) {
        Ok(mut local) => local.0.add(kind, amount),
        Err(_) => return 0.0,
    };
    for t in std::iter::once(tile).chain(ancestors(world, tile)) {
        if let Ok(mut cache) = world.get::<&mut SubtreeResources>(t) {
            cache.0.add(kind, credited);
        }
    }
    credited
}

fn withdraw_from(
    world: &mut World,
    tile: Entity,
    kind: ResourceKind,
    amount: f64,
    epsilon: f64,
) -> f64 {
    if amount <= epsilon {
        return 0.0;
    }

    let local_amount = match world.get::<&mut LocalResources>(tile) {
        Ok(mut local) => local.0.take(kind, amount),
        Err(_) => return 0.0,
    };
    if local_amount > 0.0 {
        debit_caches(world, tile, kind, local_amount);
    }

    let remaining = amount - local_amount;
    if remaining <= epsilon {
        return local_amount;
    }

    // Split the remainder by each child's share of what the children hold
    let holders: Vec<(Entity, f64)> = children_of(world, tile)
        .into_iter()
        .filter_map(|child| {
            let held = world
                .get::<&SubtreeResources>(child)
                .map(|cache| cache.0.get(kind))
                .unwrap_or(0.0);
            (held > 0.0).then_some((child, held))
        })
        .collect();
    let total_held: f64 = holders.iter().map(|(_, held)| held).sum();
    if total_held <= 0.0 {
        return local_amount;
    }

    let mut removed = local_amount;
    for (child, held) in holders {
        let share = held / total_held;
        removed += withdraw_from(world, child, kind, remaining * share, epsilon);
    }
    removed
}

fn debit_caches(world: &mut World, tile: Entity, kind: ResourceKind, amount: f64) {
    for t in std::iter::once(tile).chain(ancestors(world, tile)) {
        if let Ok(mut cache) = world.get::<&mut SubtreeResources>(t) {
            cache.0.take(kind, amount);
        }
    }
}
