//! Integration tests for resource flow through the tile tree.
//!
//! Exercises: TreeBuilder / generate_tree → aggregation → reachability
//! → withdrawal → production ticks, through the public engine API.

use hecs::{Entity, World};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use scalemap_core::generation::{generate_tree, TreeBuilder, TreeConfig, TreeLayout};
use scalemap_core::prelude::*;
use scalemap_core::systems::{aggregation_system, children_of, parent_of, post_order};

const TOL: f64 = 1e-9;

// ── Helpers ────────────────────────────────────────────────────────────

fn generated(seed: u64, config: &TreeConfig) -> (World, Vec<Entity>, TreeLayout) {
    let mut builder = TreeBuilder::new(1);
    let mut rng = StdRng::seed_from_u64(seed);
    let layout =
        generate_tree(&mut builder, config, &mut rng).expect("generator keeps the contract");
    let (mut world, roots) = builder.finish();
    aggregation_system(&mut world, &roots, 1);
    (world, roots, layout)
}

fn dense_config() -> TreeConfig {
    TreeConfig {
        depth: 3,
        map_size: 5,
        zoomable_chance: 0.5,
        stock_chance: 0.8,
        extractor_chance: 0.3,
        processor_chance: 0.3,
        transport_chance: 0.2,
        ..Default::default()
    }
}

fn local(world: &World, tile: Entity) -> Ledger {
    world.get::<&LocalResources>(tile).unwrap().0.clone()
}

fn subtree(world: &World, tile: Entity) -> Ledger {
    world.get::<&SubtreeResources>(tile).unwrap().0.clone()
}

fn reach(world: &World, tile: Entity) -> Reach {
    world.get::<&TransportReach>(tile).unwrap().0
}

/// Every tile's cached subtree equals its local stock plus its children's caches
fn assert_conserved(world: &World, roots: &[Entity]) {
    for tile in post_order(world, roots) {
        let mut expected = local(world, tile);
        for child in children_of(world, tile) {
            expected.merge_in(&subtree(world, child));
        }
        assert!(
            expected.approx_eq(&subtree(world, tile), 1e-6),
            "cache drift at {:?}: expected {:?}, found {:?}",
            tile,
            expected,
            subtree(world, tile)
        );
    }
}

/// root(0) -> child(-1) with Ore 10
fn two_level() -> (SimulationEngine, Entity, Entity) {
    let mut builder = TreeBuilder::new(1);
    let root = builder.root(TerrainType::InnerSolarSystem, 0);
    let child = builder.child(root, TerrainType::InnerSystemBody).unwrap();
    builder.stock(child, ResourceKind::Ore, 10.0).unwrap();
    let engine = SimulationEngine::from_builder(builder, EngineConfig::default()).unwrap();
    (engine, root, child)
}

// ── Withdrawal scenarios ───────────────────────────────────────────────

#[test]
fn withdrawal_within_stock_updates_caches() {
    let (mut engine, root, child) = two_level();
    let result = engine.withdraw(child, ResourceKind::Ore, 6.0);

    assert_eq!(result.removed, 6.0);
    assert_eq!(result.shortfall, 0.0);
    assert_eq!(local(&engine.world, child).get(ResourceKind::Ore), 4.0);
    assert_eq!(subtree(&engine.world, root).get(ResourceKind::Ore), 4.0);
}

#[test]
fn withdrawal_beyond_stock_reports_shortfall() {
    let (mut engine, root, child) = two_level();
    let result = engine.withdraw(child, ResourceKind::Ore, 15.0);

    assert_eq!(result.requested, 15.0);
    assert_eq!(result.removed, 10.0);
    assert_eq!(result.shortfall, 5.0);
    assert_eq!(local(&engine.world, child).get(ResourceKind::Ore), 0.0);
    assert_eq!(subtree(&engine.world, root).get(ResourceKind::Ore), 0.0);
}

#[test]
fn withdrawal_splits_by_child_holdings() {
    let mut builder = TreeBuilder::new(1);
    let parent = builder.root(TerrainType::AsteroidBeltBodies, -1);
    let kids = builder
        .children(
            parent,
            &[
                TerrainType::InnerSystemBody,
                TerrainType::InnerSystemBody,
                TerrainType::InnerSystemBody,
            ],
        )
        .unwrap();
    builder.stock(kids[0], ResourceKind::Iron, 5.0).unwrap();
    builder.stock(kids[1], ResourceKind::Iron, 3.0).unwrap();
    let mut engine = SimulationEngine::from_builder(builder, EngineConfig::default()).unwrap();

    let result = engine.withdraw(parent, ResourceKind::Iron, 4.0);

    assert!((result.removed - 4.0).abs() < TOL);
    assert!((local(&engine.world, kids[0]).get(ResourceKind::Iron) - 2.5).abs() < TOL);
    assert!((local(&engine.world, kids[1]).get(ResourceKind::Iron) - 1.5).abs() < TOL);
    assert_eq!(local(&engine.world, kids[2]).get(ResourceKind::Iron), 0.0);
    assert!((subtree(&engine.world, parent).get(ResourceKind::Iron) - 4.0).abs() < TOL);
}

// ── Properties over generated trees ────────────────────────────────────

#[test]
fn aggregation_conserves_on_generated_trees() {
    for seed in 0..8 {
        let (world, roots, _) = generated(seed, &dense_config());
        assert_conserved(&world, &roots);
    }
}

#[test]
fn generated_trees_keep_scale_step() {
    let (world, roots, layout) = generated(3, &dense_config());
    for &tile in &layout.tiles {
        let tile_scale = world.get::<&Tile>(tile).unwrap().scale;
        match parent_of(&world, tile) {
            Some(parent) => {
                let parent_scale = world.get::<&Tile>(parent).unwrap().scale;
                assert_eq!(tile_scale, parent_scale - 1);
            }
            None => assert!(roots.contains(&tile)),
        }
    }
}

#[test]
fn aggregation_is_idempotent() {
    let (mut world, roots, layout) = generated(11, &dense_config());
    let before: Vec<(Ledger, Reach)> = layout
        .tiles
        .iter()
        .map(|&t| (subtree(&world, t), reach(&world, t)))
        .collect();

    aggregation_system(&mut world, &roots, 1);

    let after: Vec<(Ledger, Reach)> = layout
        .tiles
        .iter()
        .map(|&t| (subtree(&world, t), reach(&world, t)))
        .collect();
    assert_eq!(before, after);
}

#[test]
fn reachability_defaults_without_transport() {
    let config = TreeConfig {
        transport_chance: 0.0,
        ..dense_config()
    };
    let (world, _, layout) = generated(5, &config);

    for &tile in &layout.tiles {
        let query = scalemap_core::systems::query_reachability(&world, tile).unwrap();
        assert_eq!(query.effective_reach, reach(&world, tile));
        assert!(query.effective_reach.is_none());
        assert_eq!(query.anchor, tile);
        assert_eq!(scalemap_core::systems::reachable_pool(&world, tile), subtree(&world, tile));
    }
}

#[test]
fn withdrawal_never_exceeds_request_or_stock() {
    let (mut world, roots, layout) = generated(21, &dense_config());
    let mut rng = StdRng::seed_from_u64(21);

    for _ in 0..200 {
        let tile = layout.tiles[rng.gen_range(0..layout.tiles.len())];
        let kind = ResourceKind::ALL[rng.gen_range(0..ResourceKind::ALL.len())];
        let requested = rng.gen_range(0.0..30.0);
        let available = subtree(&world, tile).get(kind);

        let result = scalemap_core::systems::withdraw(&mut world, tile, kind, requested, TOL);

        assert!(result.removed <= requested + TOL);
        assert!(result.removed <= available + 1e-6);
        assert!((result.removed + result.shortfall - requested).abs() < 1e-6);
        assert!((subtree(&world, tile).get(kind) - (available - result.removed)).abs() < 1e-6);
    }

    // Caches stayed exact through every withdrawal
    assert_conserved(&world, &roots);
}

// ── Engine ticks ───────────────────────────────────────────────────────

#[test]
fn ticks_keep_caches_consistent() {
    let mut engine = SimulationEngine::new();
    engine.generate(&dense_config(), 8).unwrap();

    for _ in 0..20 {
        let report = engine.tick();
        assert!(report.production.shortfall >= 0.0);
        assert_eq!(report.aggregation.tiles_visited, engine.tile_count());
        assert_conserved(&engine.world, engine.roots());
    }

    for view in engine.snapshot() {
        assert!(view.local_resources.iter().all(|(_, amount)| amount >= 0.0));
    }
}

#[test]
fn processes_never_create_more_than_their_ratio() {
    let mut engine = SimulationEngine::new();
    engine.generate(&dense_config(), 13).unwrap();

    for _ in 0..10 {
        let report = engine.tick();
        for (input, consumed) in report.production.consumed.iter() {
            let Some(output) = input.refined() else { continue };
            // Generated refineries yield at most one unit per unit of input
            assert!(report.production.produced.get(output) <= consumed + 1e-6);
        }
    }
}

#[test]
fn transport_widens_the_pool() {
    let mut builder = TreeBuilder::new(1);
    let system = builder.root(TerrainType::InnerSolarSystem, 0);
    let colony = builder.child(system, TerrainType::InnerSystemBody).unwrap();
    let belt = builder.child(system, TerrainType::AsteroidBeltBodies).unwrap();
    builder.stock(belt, ResourceKind::Ore, 8.0).unwrap();
    let mut engine = SimulationEngine::from_builder(builder, EngineConfig::default()).unwrap();

    assert!(engine.reachable_pool(colony).is_empty());

    engine.place_building(colony, Building::new("Spaceport").with_transport(0));
    engine.refresh_aggregates();

    assert_eq!(engine.reachability(colony).unwrap().anchor, system);
    assert_eq!(engine.reachable_pool(colony).get(ResourceKind::Ore), 8.0);

    let result = engine.withdraw_reachable(colony, ResourceKind::Ore, 5.0);
    assert_eq!(result.removed, 5.0);
    assert_eq!(local(&engine.world, belt).get(ResourceKind::Ore), 3.0);
}

#[test]
fn coarse_step_pool_falls_back_to_root() {
    let mut builder = TreeBuilder::new(2);
    let system = builder.root(TerrainType::SolarSystem, 0);
    let inner = builder.child(system, TerrainType::InnerSolarSystem).unwrap();
    let colony = builder.child(inner, TerrainType::InnerSystemBody).unwrap();
    let cloud = builder.child(system, TerrainType::HillsCloudBodies).unwrap();
    builder.stock(cloud, ResourceKind::Ice, 6.0).unwrap();
    builder
        .place(colony, Building::new("Tug Fleet").with_transport(-3))
        .unwrap();
    let config = EngineConfig {
        granularity_step: 2,
        ..Default::default()
    };
    let mut engine = SimulationEngine::from_builder(builder, config).unwrap();

    // -3 matches neither the -2 nor the 0 level
    assert_eq!(engine.effective_reach(colony), Reach::range(-3));
    assert_eq!(engine.reachability(colony).unwrap().anchor, system);

    let result = engine.withdraw_reachable(colony, ResourceKind::Ice, 4.0);
    assert_eq!(result.removed, 4.0);
    assert_eq!(local(&engine.world, cloud).get(ResourceKind::Ice), 2.0);
}

#[test]
fn tile_views_serialize_for_presentation() {
    let (engine, root, _) = two_level();
    let view = engine.tile_view(root).unwrap();
    let json = serde_json::to_value(&view).unwrap();
    assert_eq!(json["scale"], 0);
    assert_eq!(json["children"], 1);
    assert_eq!(json["subtree_resources"]["Ore"], 10.0);
}
