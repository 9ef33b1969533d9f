//! ScaleMap Headless Simulation Harness
//!
//! Generates tile trees, runs ticks and checks the resource-flow properties.
//! Runs entirely in-process: no rendering, no persistence.
//!
//! Usage:
//!   cargo run -p scalemap-simtest
//!   cargo run -p scalemap-simtest -- --verbose --seed 7 --ticks 50
//!   cargo run -p scalemap-simtest -- --json

use clap::Parser;
use hecs::{Entity, World};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use scalemap_core::config::{load_engine_config_from_env, EngineConfig, BUILTIN_ENGINE_CONFIG};
use scalemap_core::generation::{generate_tree, TreeBuilder, TreeConfig};
use scalemap_core::prelude::*;
use scalemap_core::systems::{
    aggregation_system, children_of, post_order, query_reachability, reachable_pool,
    validate_tree, withdraw,
};
use serde::Serialize;

const TOL: f64 = 1e-6;

// ── Test harness ────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct TestResult {
    name: String,
    passed: bool,
    detail: String,
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Headless ScaleMap harness", long_about = None)]
struct Options {
    /// Print every check, not only failures
    #[arg(long)]
    verbose: bool,

    /// Emit the results as JSON instead of the text summary
    #[arg(long)]
    json: bool,

    /// Seed for the generated trees
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Ticks to run in the multi-tick check
    #[arg(long, default_value_t = 25)]
    ticks: u32,
}

fn main() {
    env_logger::init();
    let opts = Options::parse();
    if !opts.json {
        println!("=== ScaleMap Simulation Harness (seed {}) ===\n", opts.seed);
    }

    let (config, source) = load_engine_config_from_env();
    log::info!(
        "harness using config from {}",
        source
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "builtin".into())
    );

    let mut results = Vec::new();

    // 1. Engine configuration
    results.extend(validate_config(&config, &opts));

    // 2. Withdrawal scenarios on hand-built trees
    results.extend(validate_withdrawal_scenarios(&config, &opts));

    // 3. Structure and aggregation on generated trees
    results.extend(validate_generated_trees(&config, &opts));

    // 4. Reachability defaulting
    results.extend(validate_reachability(&config, &opts));

    // 5. Random withdrawals stay within bounds
    results.extend(validate_withdrawal_bound(&config, &opts));

    // 6. Multi-tick run
    results.extend(validate_tick_run(&config, &opts));

    // ── Summary ──
    let passed = results.iter().filter(|r| r.passed).count();
    let failed = results.iter().filter(|r| !r.passed).count();
    let total = results.len();

    if opts.json {
        match serde_json::to_string_pretty(&results) {
            Ok(json) => println!("{}", json),
            Err(e) => eprintln!("failed to encode results: {}", e),
        }
    } else {
        println!();
        for r in &results {
            let icon = if r.passed { "✓" } else { "✗" };
            if !r.passed || opts.verbose {
                println!("  {} {}: {}", icon, r.name, r.detail);
            }
        }
        println!(
            "\n=== RESULT: {}/{} passed, {} failed ===",
            passed, total, failed
        );
    }

    if failed > 0 {
        std::process::exit(1);
    }
}

fn section(title: &str, opts: &Options) {
    if !opts.json {
        println!("--- {} ---", title);
    }
}

fn harness_tree_config() -> TreeConfig {
    TreeConfig {
        depth: 4,
        map_size: 6,
        zoomable_chance: 0.4,
        stock_chance: 0.7,
        extractor_chance: 0.25,
        processor_chance: 0.25,
        transport_chance: 0.15,
        ..Default::default()
    }
}

fn generated_world(
    config: &EngineConfig,
    seed: u64,
    tree: &TreeConfig,
) -> Option<(World, Vec<Entity>, Vec<Entity>)> {
    let mut builder = TreeBuilder::new(config.granularity_step);
    let mut rng = StdRng::seed_from_u64(seed);
    let layout = generate_tree(&mut builder, tree, &mut rng).ok()?;
    let (mut world, roots) = builder.finish();
    aggregation_system(&mut world, &roots, config.granularity_step);
    Some((world, roots, layout.tiles))
}

fn local_of(world: &World, tile: Entity) -> Ledger {
    world
        .get::<&LocalResources>(tile)
        .map(|l| l.0.clone())
        .unwrap_or_default()
}

fn subtree_of(world: &World, tile: Entity) -> Ledger {
    world
        .get::<&SubtreeResources>(tile)
        .map(|s| s.0.clone())
        .unwrap_or_default()
}

fn reach_of(world: &World, tile: Entity) -> Reach {
    world
        .get::<&TransportReach>(tile)
        .map(|r| r.0)
        .unwrap_or(Reach::NONE)
}

/// Number of tiles whose cache differs from local plus children's caches
fn conservation_violations(world: &World, roots: &[Entity]) -> usize {
    post_order(world, roots)
        .into_iter()
        .filter(|&tile| {
            let mut expected = local_of(world, tile);
            for child in children_of(world, tile) {
                expected.merge_in(&subtree_of(world, child));
            }
            !expected.approx_eq(&subtree_of(world, tile), TOL)
        })
        .count()
}

// ── 1. Config ───────────────────────────────────────────────────────────

fn validate_config(config: &EngineConfig, opts: &Options) -> Vec<TestResult> {
    section("Engine Config", opts);
    let mut results = Vec::new();

    let builtin = EngineConfig::from_json_str(BUILTIN_ENGINE_CONFIG);
    results.push(TestResult {
        name: "config_builtin_parses".into(),
        passed: builtin.is_ok(),
        detail: match &builtin {
            Ok(c) => format!(
                "step {}, epsilon {:e}, validate {}",
                c.granularity_step, c.withdrawal_epsilon, c.validate_on_load
            ),
            Err(e) => e.to_string(),
        },
    });

    results.push(TestResult {
        name: "config_active_valid".into(),
        passed: config.validate().is_ok(),
        detail: format!("granularity step {}", config.granularity_step),
    });

    if opts.verbose && !opts.json {
        println!("  active config: {:?}", config);
    }

    results
}

// ── 2. Withdrawal scenarios ─────────────────────────────────────────────

fn validate_withdrawal_scenarios(config: &EngineConfig, opts: &Options) -> Vec<TestResult> {
    section("Withdrawal Scenarios", opts);
    let mut results = Vec::new();

    let two_level = || -> Option<(SimulationEngine, Entity, Entity)> {
        let mut builder = TreeBuilder::new(config.granularity_step);
        let root = builder.root(TerrainType::InnerSolarSystem, 0);
        let child = builder.child(root, TerrainType::InnerSystemBody).ok()?;
        builder.stock(child, ResourceKind::Ore, 10.0).ok()?;
        let engine = SimulationEngine::from_builder(builder, config.clone()).ok()?;
        Some((engine, root, child))
    };

    // Withdraw 6 of 10
    match two_level() {
        Some((mut engine, root, child)) => {
            let w = engine.withdraw(child, ResourceKind::Ore, 6.0);
            let child_left = local_of(&engine.world, child).get(ResourceKind::Ore);
            let root_total = subtree_of(&engine.world, root).get(ResourceKind::Ore);
            results.push(TestResult {
                name: "withdraw_within_stock".into(),
                passed: (w.removed - 6.0).abs() < TOL
                    && (child_left - 4.0).abs() < TOL
                    && (root_total - 4.0).abs() < TOL,
                detail: format!(
                    "removed {:.2}, child holds {:.2}, root subtree {:.2}",
                    w.removed, child_left, root_total
                ),
            });
        }
        None => results.push(build_failure("withdraw_within_stock")),
    }

    // Withdraw 15 of 10
    match two_level() {
        Some((mut engine, _, child)) => {
            let w = engine.withdraw(child, ResourceKind::Ore, 15.0);
            let child_left = local_of(&engine.world, child).get(ResourceKind::Ore);
            results.push(TestResult {
                name: "withdraw_beyond_stock".into(),
                passed: (w.removed - 10.0).abs() < TOL
                    && (w.shortfall - 5.0).abs() < TOL
                    && child_left == 0.0,
                detail: format!(
                    "removed {:.2}, shortfall {:.2}, child holds {:.2}",
                    w.removed, w.shortfall, child_left
                ),
            });
        }
        None => results.push(build_failure("withdraw_beyond_stock")),
    }

    // Proportional split 5 / 3 / 0
    let split = || -> Option<(Vec<f64>, Withdrawal)> {
        let mut builder = TreeBuilder::new(config.granularity_step);
        let parent = builder.root(TerrainType::AsteroidBeltBodies, -1);
        let kids = builder
            .children(parent, &[TerrainType::InnerSystemBody; 3])
            .ok()?;
        builder.stock(kids[0], ResourceKind::Iron, 5.0).ok()?;
        builder.stock(kids[1], ResourceKind::Iron, 3.0).ok()?;
        let mut engine = SimulationEngine::from_builder(builder, config.clone()).ok()?;
        let before: Vec<f64> = kids
            .iter()
            .map(|&k| local_of(&engine.world, k).get(ResourceKind::Iron))
            .collect();
        let w = engine.withdraw(parent, ResourceKind::Iron, 4.0);
        let taken = kids
            .iter()
            .zip(before)
            .map(|(&k, b)| b - local_of(&engine.world, k).get(ResourceKind::Iron))
            .collect();
        Some((taken, w))
    };
    match split() {
        Some((taken, w)) => {
            let expected = [2.5, 1.5, 0.0];
            results.push(TestResult {
                name: "withdraw_proportional_split".into(),
                passed: (w.removed - 4.0).abs() < TOL
                    && taken.iter().zip(expected).all(|(t, e)| (t - e).abs() < TOL),
                detail: format!(
                    "taken {:.2} / {:.2} / {:.2}",
                    taken[0], taken[1], taken[2]
                ),
            });
        }
        None => results.push(build_failure("withdraw_proportional_split")),
    }

    results
}

fn build_failure(name: &str) -> TestResult {
    TestResult {
        name: name.into(),
        passed: false,
        detail: "could not build fixture tree".into(),
    }
}

// ── 3. Generated trees ──────────────────────────────────────────────────

fn validate_generated_trees(config: &EngineConfig, opts: &Options) -> Vec<TestResult> {
    section("Generated Trees", opts);
    let mut results = Vec::new();
    let tree = harness_tree_config();

    let mut invalid = Vec::new();
    let mut drift = 0usize;
    let mut unstable = 0usize;
    let mut tiles = 0usize;

    for offset in 0..10 {
        let seed = opts.seed.wrapping_add(offset);
        let Some((mut world, roots, layout_tiles)) = generated_world(config, seed, &tree) else {
            invalid.push(seed);
            continue;
        };
        tiles += layout_tiles.len();

        if validate_tree(&world, &roots, config.granularity_step).is_err() {
            invalid.push(seed);
        }
        drift += conservation_violations(&world, &roots);

        let before: Vec<(Ledger, Reach)> = layout_tiles
            .iter()
            .map(|&t| (subtree_of(&world, t), reach_of(&world, t)))
            .collect();
        aggregation_system(&mut world, &roots, config.granularity_step);
        unstable += layout_tiles
            .iter()
            .zip(&before)
            .filter(|(t, b)| (subtree_of(&world, **t), reach_of(&world, **t)) != **b)
            .count();

        if opts.verbose && !opts.json {
            println!("  seed {}: {} tiles", seed, layout_tiles.len());
        }
    }

    results.push(TestResult {
        name: "tree_scale_step".into(),
        passed: invalid.is_empty(),
        detail: if invalid.is_empty() {
            format!("10 trees, {} tiles, every child one step below its parent", tiles)
        } else {
            format!("invalid trees for seeds {:?}", invalid)
        },
    });

    results.push(TestResult {
        name: "aggregation_conservation".into(),
        passed: drift == 0,
        detail: format!("{} tiles with cache drift", drift),
    });

    results.push(TestResult {
        name: "aggregation_idempotent".into(),
        passed: unstable == 0,
        detail: format!("{} tiles changed on a second pass", unstable),
    });

    results
}

// ── 4. Reachability ─────────────────────────────────────────────────────

fn validate_reachability(config: &EngineConfig, opts: &Options) -> Vec<TestResult> {
    section("Reachability", opts);
    let mut results = Vec::new();

    let tree = TreeConfig {
        transport_chance: 0.0,
        ..harness_tree_config()
    };
    let Some((world, _, tiles)) = generated_world(config, opts.seed, &tree) else {
        results.push(build_failure("reach_defaults_without_transport"));
        return results;
    };

    let mismatched = tiles
        .iter()
        .filter(|&&tile| match query_reachability(&world, tile) {
            Some(q) => {
                q.effective_reach != reach_of(&world, tile)
                    || q.anchor != tile
                    || reachable_pool(&world, tile) != subtree_of(&world, tile)
            }
            None => true,
        })
        .count();

    results.push(TestResult {
        name: "reach_defaults_without_transport".into(),
        passed: mismatched == 0,
        detail: format!("{} of {} tiles deviate from their own subtree", mismatched, tiles.len()),
    });

    // A transport hub on a body opens its whole system
    let widened = || -> Option<(bool, f64)> {
        let mut builder = TreeBuilder::new(config.granularity_step);
        let system = builder.root(TerrainType::InnerSolarSystem, 0);
        let colony = builder.child(system, TerrainType::InnerSystemBody).ok()?;
        let belt = builder.child(system, TerrainType::AsteroidBeltBodies).ok()?;
        builder.stock(belt, ResourceKind::Ice, 8.0).ok()?;
        let hub_range = builder.scale_of(system)?;
        builder
            .place(colony, Building::new("Transport Hub").with_transport(hub_range))
            .ok()?;
        let engine = SimulationEngine::from_builder(builder, config.clone()).ok()?;
        let anchor = engine.reachability(colony)?.anchor;
        Some((anchor == system, engine.reachable_pool(colony).get(ResourceKind::Ice)))
    };
    match widened() {
        Some((anchored, ice)) => results.push(TestResult {
            name: "reach_transport_widens_pool".into(),
            passed: anchored && (ice - 8.0).abs() < TOL,
            detail: format!("pool anchored at system: {}, ice in reach {:.2}", anchored, ice),
        }),
        None => results.push(build_failure("reach_transport_widens_pool")),
    }

    results
}

// ── 5. Withdrawal bound ─────────────────────────────────────────────────

fn validate_withdrawal_bound(config: &EngineConfig, opts: &Options) -> Vec<TestResult> {
    section("Withdrawal Bound", opts);
    let mut results = Vec::new();

    let Some((mut world, roots, tiles)) =
        generated_world(config, opts.seed, &harness_tree_config())
    else {
        results.push(build_failure("withdraw_bound"));
        return results;
    };
    let mut rng = StdRng::seed_from_u64(opts.seed);

    let mut over_request = 0usize;
    let mut over_stock = 0usize;
    let mut removed_total = 0.0;
    let mut shortfall_total = 0.0;
    let draws = 500;

    for _ in 0..draws {
        let tile = tiles[rng.gen_range(0..tiles.len())];
        let kind = ResourceKind::ALL[rng.gen_range(0..ResourceKind::ALL.len())];
        let requested = rng.gen_range(0.0..25.0);
        let available = subtree_of(&world, tile).get(kind);

        let w = withdraw(&mut world, tile, kind, requested, config.withdrawal_epsilon);
        if w.removed > requested + TOL {
            over_request += 1;
        }
        if w.removed > available + TOL {
            over_stock += 1;
        }
        removed_total += w.removed;
        shortfall_total += w.shortfall;
    }

    results.push(TestResult {
        name: "withdraw_bound".into(),
        passed: over_request == 0 && over_stock == 0,
        detail: format!(
            "{} draws, {:.1} removed, {:.1} short, {} over request, {} over stock",
            draws, removed_total, shortfall_total, over_request, over_stock
        ),
    });

    let drift = conservation_violations(&world, &roots);
    results.push(TestResult {
        name: "withdraw_keeps_caches_exact".into(),
        passed: drift == 0,
        detail: format!("{} tiles with cache drift after withdrawals", drift),
    });

    results
}

// ── 6. Tick run ─────────────────────────────────────────────────────────

fn validate_tick_run(config: &EngineConfig, opts: &Options) -> Vec<TestResult> {
    section("Tick Run", opts);
    let mut results = Vec::new();

    let mut engine = SimulationEngine::with_config(config.clone());
    if let Err(e) = engine.generate(&harness_tree_config(), opts.seed) {
        results.push(TestResult {
            name: "tick_generate".into(),
            passed: false,
            detail: e.to_string(),
        });
        return results;
    }

    let mut drift = 0usize;
    let mut negatives = 0usize;
    let mut overproduced = 0u32;
    let mut run = 0u32;
    let mut partial = 0u32;
    let mut starved = 0u32;

    for _ in 0..opts.ticks {
        let report = engine.tick();
        run += report.production.processes_run;
        partial += report.production.processes_partial;
        starved += report.production.processes_starved;

        for (input, consumed) in report.production.consumed.iter() {
            if let Some(output) = input.refined() {
                if report.production.produced.get(output) > consumed + TOL {
                    overproduced += 1;
                }
            }
        }

        drift += conservation_violations(&engine.world, engine.roots());
        negatives += engine
            .snapshot()
            .iter()
            .filter(|v| v.local_resources.iter().any(|(_, a)| a < 0.0))
            .count();

        if opts.verbose && !opts.json {
            println!(
                "  tick {}: total {:.1}",
                report.tick,
                engine.total_resources().total()
            );
        }
    }

    results.push(TestResult {
        name: "tick_conservation".into(),
        passed: drift == 0,
        detail: format!(
            "{} ticks over {} tiles, {} drifted caches",
            opts.ticks,
            engine.tile_count(),
            drift
        ),
    });

    results.push(TestResult {
        name: "tick_no_negative_stock".into(),
        passed: negatives == 0,
        detail: format!("{} negative ledgers observed", negatives),
    });

    results.push(TestResult {
        name: "tick_output_bounded_by_input".into(),
        passed: overproduced == 0,
        detail: format!(
            "{} runs, {} partial, {} starved, {} overproducing ticks",
            run, partial, starved, overproduced
        ),
    });

    results
}
