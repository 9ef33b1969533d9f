//! Simulation engine - main entry point for running the resource-flow simulation

use hecs::{Entity, World};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::components::*;
use crate::config::EngineConfig;
use crate::error::TreeError;
use crate::generation::{generate_tree, TreeBuilder, TreeConfig, TreeLayout};
use crate::systems::*;

/// Main simulation engine
pub struct SimulationEngine {
    /// ECS world holding every tile
    pub world: World,
    roots: Vec<Entity>,
    config: EngineConfig,
    tick: u64,
}

/// What one tick did
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TickReport {
    pub tick: u64,
    pub production: ProductionReport,
    pub aggregation: AggregationSummary,
}

/// Read-only view of one tile for presentation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TileView {
    pub id: u64,
    pub parent: Option<u64>,
    pub scale: i32,
    pub terrain: TerrainType,
    pub children: usize,
    pub buildings: Vec<String>,
    pub local_resources: Ledger,
    pub subtree_resources: Ledger,
    pub subtree_transport_reach: Reach,
}

impl SimulationEngine {
    /// Create an empty engine with the builtin config
    pub fn new() -> Self {
        Self::with_config(EngineConfig::builtin())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        Self {
            world: World::new(),
            roots: Vec::new(),
            config,
            tick: 0,
        }
    }

    /// Take over a tree built by a generator.
    ///
    /// Validates the structure (unless disabled in config) and runs one
    /// aggregation pass so queries are valid before the first tick.
    pub fn from_tree(
        world: World,
        roots: Vec<Entity>,
        config: EngineConfig,
    ) -> Result<Self, TreeError> {
        if config.validate_on_load {
            let tiles = validate_tree(&world, &roots, config.granularity_step)?;
            log::info!("tile tree accepted: {} roots, {} tiles", roots.len(), tiles);
        }

        let mut engine = Self {
            world,
            roots,
            config,
            tick: 0,
        };
        engine.refresh_aggregates();
        Ok(engine)
    }

    pub fn from_builder(builder: TreeBuilder, config: EngineConfig) -> Result<Self, TreeError> {
        let (world, roots) = builder.finish();
        Self::from_tree(world, roots, config)
    }

    /// Replace the current tree with a generated fixture tree
    pub fn generate(
        &mut self,
        tree_config: &TreeConfig,
        seed: u64,
    ) -> Result<TreeLayout, TreeError> {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut builder = TreeBuilder::new(self.config.granularity_step);
        let layout = generate_tree(&mut builder, tree_config, &mut rng)?;

        let (world, roots) = builder.finish();
        self.world = world;
        self.roots = roots;
        self.tick = 0;
        self.refresh_aggregates();

        log::info!(
            "generated tree '{}': {} tiles across {} map levels",
            layout.name,
            layout.tiles.len(),
            layout.map_levels
        );
        Ok(layout)
    }

    /// Run one tick: production, then the aggregation pass
    pub fn tick(&mut self) -> TickReport {
        let production =
            production_system(&mut self.world, &self.roots, self.config.withdrawal_epsilon);
        let aggregation = self.refresh_aggregates();
        self.tick += 1;

        log::debug!(
            "tick {}: {} processes run, {} partial, {} starved, shortfall {:.3}",
            self.tick,
            production.processes_run,
            production.processes_partial,
            production.processes_starved,
            production.shortfall
        );

        TickReport {
            tick: self.tick,
            production,
            aggregation,
        }
    }

    /// Recompute subtree resources and transport reach for the whole tree
    pub fn refresh_aggregates(&mut self) -> AggregationSummary {
        aggregation_system(&mut self.world, &self.roots, self.config.granularity_step)
    }

    /// Withdraw from the subtree rooted at `tile`
    pub fn withdraw(&mut self, tile: Entity, kind: ResourceKind, amount: f64) -> Withdrawal {
        withdraw(&mut self.world, tile, kind, amount, self.config.withdrawal_epsilon)
    }

    /// Withdraw from the tile's subtree, then from its reachable pool
    pub fn withdraw_reachable(
        &mut self,
        tile: Entity,
        kind: ResourceKind,
        amount: f64,
    ) -> Withdrawal {
        withdraw_reachable(
            &mut self.world,
            tile,
            kind,
            amount,
            self.config.withdrawal_epsilon,
        )
    }

    pub fn deposit(&mut self, tile: Entity, kind: ResourceKind, amount: f64) -> f64 {
        deposit(&mut self.world, tile, kind, amount)
    }

    pub fn reachability(&self, tile: Entity) -> Option<Reachability> {
        query_reachability(&self.world, tile)
    }

    pub fn effective_reach(&self, tile: Entity) -> Reach {
        effective_reach(&self.world, tile)
    }

    pub fn reachable_pool(&self, tile: Entity) -> Ledger {
        reachable_pool(&self.world, tile)
    }

    /// Reassign a tile's terrain
    pub fn set_terrain(&mut self, tile: Entity, terrain: TerrainType) -> bool {
        if let Ok(mut t) = self.world.get::<&mut Tile>(tile) {
            t.terrain = terrain;
            true
        } else {
            false
        }
    }

    /// Place a building; its transport counts from the next aggregation pass
    pub fn place_building(&mut self, tile: Entity, building: Building) -> bool {
        if let Ok(mut buildings) = self.world.get::<&mut Buildings>(tile) {
            buildings.place(building);
            true
        } else {
            false
        }
    }

    pub fn tile_view(&self, tile: Entity) -> Option<TileView> {
        let t = self.world.get::<&Tile>(tile).ok()?;
        let local = self.world.get::<&LocalResources>(tile).ok();
        let subtree = self.world.get::<&SubtreeResources>(tile).ok();
        let reach = self.world.get::<&TransportReach>(tile).ok();
        let buildings = self.world.get::<&Buildings>(tile).ok();

        Some(TileView {
            id: tile.to_bits().get(),
            parent: t.parent.map(|p| p.to_bits().get()),
            scale: t.scale,
            terrain: t.terrain,
            children: t.children().len(),
            buildings: buildings
                .map(|b| b.iter().map(|b| b.name.clone()).collect())
                .unwrap_or_default(),
            local_resources: local.map(|l| l.0.clone()).unwrap_or_default(),
            subtree_resources: subtree.map(|s| s.0.clone()).unwrap_or_default(),
            subtree_transport_reach: reach.map(|r| r.0).unwrap_or(Reach::NONE),
        })
    }

    /// Views of every tile, parents before children
    pub fn snapshot(&self) -> Vec<TileView> {
        pre_order(&self.world, &self.roots)
            .into_iter()
            .filter_map(|tile| self.tile_view(tile))
            .collect()
    }

    /// Sum of every root's subtree pool
    pub fn total_resources(&self) -> Ledger {
        let mut total = Ledger::new();
        for &root in &self.roots {
            if let Ok(subtree) = self.world.get::<&SubtreeResources>(root) {
                total.merge_in(&subtree.0);
            }
        }
        total
    }

    pub fn roots(&self) -> &[Entity] {
        &self.roots
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn tick_count(&self) -> u64 {
        self.tick
    }

    pub fn tile_count(&self) -> usize {
        self.world.query::<&Tile>().iter().count()
    }
}

impl Default for SimulationEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_engine() -> (SimulationEngine, Entity, Entity) {
        let mut builder = TreeBuilder::new(1);
        let root = builder.root(TerrainType::InnerSolarSystem, 0);
        let body = builder.child(root, TerrainType::InnerSystemBody).unwrap();
        builder.stock(body, ResourceKind::Ore, 10.0).unwrap();
        builder
            .place(body, Building::new("Mine").with_extraction(ResourceKind::Ore, 2.0))
            .unwrap();
        let engine = SimulationEngine::from_builder(builder, EngineConfig::default()).unwrap();
        (engine, root, body)
    }

    #[test]
    fn test_engine_creation() {
        let engine = SimulationEngine::new();
        assert_eq!(engine.tile_count(), 0);
        assert_eq!(engine.tick_count(), 0);
        assert!(engine.snapshot().is_empty());
    }

    #[test]
    fn test_handoff_aggregates_immediately() {
        let (engine, root, _) = small_engine();
        assert_eq!(engine.reachable_pool(root).get(ResourceKind::Ore), 10.0);
        assert_eq!(engine.total_resources().get(ResourceKind::Ore), 10.0);
    }

    #[test]
    fn test_handoff_rejects_broken_tree() {
        let mut builder = TreeBuilder::new(1);
        let root = builder.root(TerrainType::InnerSolarSystem, 0);
        builder.child(root, TerrainType::InnerSystemBody).unwrap();
        let (world, roots) = builder.finish();

        let config = EngineConfig {
            granularity_step: 2,
            ..Default::default()
        };
        assert!(matches!(
            SimulationEngine::from_tree(world, roots, config),
            Err(TreeError::MapScaleMismatch { .. })
        ));
    }

    #[test]
    fn test_tick_extracts_and_counts() {
        let (mut engine, root, body) = small_engine();
        let report = engine.tick();
        assert_eq!(report.tick, 1);
        assert_eq!(report.production.extracted.get(ResourceKind::Ore), 2.0);
        assert_eq!(report.aggregation.tiles_visited, 2);
        assert_eq!(engine.tick_count(), 1);

        let view = engine.tile_view(body).unwrap();
        assert_eq!(view.local_resources.get(ResourceKind::Ore), 12.0);
        assert_eq!(engine.tile_view(root).unwrap().subtree_resources.get(ResourceKind::Ore), 12.0);
    }

    #[test]
    fn test_engine_withdraw_and_views() {
        let (mut engine, root, body) = small_engine();
        let w = engine.withdraw(body, ResourceKind::Ore, 6.0);
        assert_eq!(w.removed, 6.0);

        let snapshot = engine.snapshot();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[0].id, root.to_bits().get());
        assert_eq!(snapshot[0].subtree_resources.get(ResourceKind::Ore), 4.0);
        assert_eq!(snapshot[1].parent, Some(root.to_bits().get()));
        assert_eq!(snapshot[1].buildings, vec!["Mine".to_string()]);
    }

    #[test]
    fn test_place_building_and_terrain() {
        let (mut engine, root, body) = small_engine();
        assert!(engine.place_building(body, Building::new("Spaceport").with_transport(0)));
        assert!(engine.set_terrain(body, TerrainType::OuterSystemBody));

        // Reach only changes after aggregation
        assert_eq!(engine.reachability(body).unwrap().anchor, body);
        engine.refresh_aggregates();
        assert_eq!(engine.reachability(body).unwrap().anchor, root);
        assert_eq!(engine.tile_view(body).unwrap().terrain, TerrainType::OuterSystemBody);
    }

    #[test]
    fn test_engine_generation() {
        let mut engine = SimulationEngine::new();
        let layout = engine.generate(&TreeConfig::default(), 42).unwrap();
        assert_eq!(engine.tile_count(), layout.tiles.len());
        assert_eq!(engine.roots(), layout.roots.as_slice());

        for _ in 0..5 {
            engine.tick();
        }
        assert_eq!(engine.tick_count(), 5);
    }
}
