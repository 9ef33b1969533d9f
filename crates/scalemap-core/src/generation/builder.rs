//! Tree builder - the handoff API for whatever generates the tile tree.
//!
//! The builder enforces the scale step as tiles are added, so a tree built
//! through it always passes `validate_tree`.

use crate::components::{
    Building, Buildings, Ledger, LocalResources, MapLevel, ResourceKind, SubtreeResources,
    TerrainType, Tile, TransportReach,
};
use crate::error::TreeError;
use hecs::{Entity, World};

pub struct TreeBuilder {
    world: World,
    granularity_step: i32,
    roots: Vec<Entity>,
}

impl TreeBuilder {
    pub fn new(granularity_step: i32) -> Self {
        Self {
            world: World::new(),
            granularity_step,
            roots: Vec::new(),
        }
    }

    pub fn tile_count(&self) -> usize {
        self.world.len() as usize
    }

    /// Add a top-level tile
    pub fn root(&mut self, terrain: TerrainType, scale: i32) -> Entity {
        let entity = spawn_tile(&mut self.world, Tile::new(terrain, scale));
        self.roots.push(entity);
        entity
    }

    /// Add a tile to `parent`'s sub-map, creating the sub-map if needed
    pub fn child(&mut self, parent: Entity, terrain: TerrainType) -> Result<Entity, TreeError> {
        let scale =
            self.scale_of(parent).ok_or(TreeError::MissingTile(parent))? - self.granularity_step;
        let entity = spawn_tile(&mut self.world, Tile::new(terrain, scale).with_parent(parent));

        let mut tile = self
            .world
            .get::<&mut Tile>(parent)
            .map_err(|_| TreeError::MissingTile(parent))?;
        tile.sub_map
            .get_or_insert_with(|| MapLevel::new(parent, scale))
            .push(entity);

        Ok(entity)
    }

    /// Add one child per terrain, in order
    pub fn children(
        &mut self,
        parent: Entity,
        terrains: &[TerrainType],
    ) -> Result<Vec<Entity>, TreeError> {
        terrains
            .iter()
            .map(|&terrain| self.child(parent, terrain))
            .collect()
    }

    /// Seed a tile's local stock
    pub fn stock(
        &mut self,
        tile: Entity,
        kind: ResourceKind,
        amount: f64,
    ) -> Result<(), TreeError> {
        let mut local = self
            .world
            .get::<&mut LocalResources>(tile)
            .map_err(|_| TreeError::MissingTile(tile))?;
        local.0.add(kind, amount);
        Ok(())
    }

    pub fn place(&mut self, tile: Entity, building: Building) -> Result<(), TreeError> {
        let mut buildings = self
            .world
            .get::<&mut Buildings>(tile)
            .map_err(|_| TreeError::MissingTile(tile))?;
        buildings.place(building);
        Ok(())
    }

    pub fn scale_of(&self, tile: Entity) -> Option<i32> {
        self.world.get::<&Tile>(tile).ok().map(|t| t.scale)
    }

    /// Hand the finished tree over: the arena and its roots
    pub fn finish(self) -> (World, Vec<Entity>) {
        (self.world, self.roots)
    }
}

fn spawn_tile(world: &mut World, tile: Tile) -> Entity {
    world.spawn((
        tile,
        LocalResources(Ledger::new()),
        SubtreeResources(Ledger::new()),
        TransportReach::default(),
        Buildings::new(),
    ))
}
