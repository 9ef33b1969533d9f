//! Random tile trees for tests, benchmarks and the headless harness.
//!
//! Loosely follows a star system layout: every system area zooms into the
//! next finer area at its center, surrounded by small body fields and
//! occasional single bodies. This stands in for the real celestial generator,
//! which lives outside the engine.

use super::builder::TreeBuilder;
use crate::components::{Building, ResourceKind, TerrainType};
use crate::error::TreeError;
use hecs::Entity;
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::VecDeque;

/// Configuration for fixture tree generation
#[derive(Debug, Clone)]
pub struct TreeConfig {
    pub name: String,
    pub root_count: u32,
    pub root_scale: i32,
    /// Zoom levels below the roots
    pub depth: u32,
    /// Tiles per sub-map
    pub map_size: u32,
    /// Chance that an off-center zoomable tile gets its own sub-map
    pub zoomable_chance: f64,
    pub stock_chance: f64,
    pub max_stock: f64,
    pub extractor_chance: f64,
    pub processor_chance: f64,
    pub transport_chance: f64,
    /// How many levels above its own scale a transport building may span
    pub max_transport_span: i32,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            name: "Sol".to_string(),
            root_count: 1,
            root_scale: 0,
            depth: 4,
            map_size: 6,
            zoomable_chance: 0.2,
            stock_chance: 0.5,
            max_stock: 20.0,
            extractor_chance: 0.15,
            processor_chance: 0.1,
            transport_chance: 0.05,
            max_transport_span: 2,
        }
    }
}

/// Handles into a generated tree
#[derive(Debug, Clone)]
pub struct TreeLayout {
    pub name: String,
    pub roots: Vec<Entity>,
    /// Every tile, parents before children
    pub tiles: Vec<Entity>,
    pub map_levels: usize,
}

/// Generate a populated tree into the builder
pub fn generate_tree(
    builder: &mut TreeBuilder,
    config: &TreeConfig,
    rng: &mut impl Rng,
) -> Result<TreeLayout, TreeError> {
    let mut layout = TreeLayout {
        name: config.name.clone(),
        roots: Vec::new(),
        tiles: Vec::new(),
        map_levels: 0,
    };

    let mut queue = VecDeque::new();
    for _ in 0..config.root_count {
        let root = builder.root(TerrainType::SolarSystem, config.root_scale);
        layout.roots.push(root);
        queue.push_back((root, TerrainType::SolarSystem, 0u32));
    }

    while let Some((tile, terrain, depth)) = queue.pop_front() {
        layout.tiles.push(tile);
        populate_tile(builder, tile, config, rng)?;

        if depth >= config.depth || !terrain.is_zoomable() {
            continue;
        }

        let terrains = sub_map_terrains(terrain, config.map_size, rng);
        let children = builder.children(tile, &terrains)?;
        layout.map_levels += 1;

        for (index, (child, child_terrain)) in children.into_iter().zip(terrains).enumerate() {
            let zooms = child_terrain.is_zoomable()
                && (index == 0 || rng.gen_bool(config.zoomable_chance.clamp(0.0, 1.0)));
            if zooms {
                queue.push_back((child, child_terrain, depth + 1));
            } else {
                layout.tiles.push(child);
                populate_tile(builder, child, config, rng)?;
            }
        }
    }

    Ok(layout)
}

/// Terrain for one sub-map: the finer area at the center, then fields and bodies
fn sub_map_terrains(area: TerrainType, size: u32, rng: &mut impl Rng) -> Vec<TerrainType> {
    let center = area.inner_area().unwrap_or_else(|| area.small_bodies());
    let mut terrains = vec![center];
    let surroundings = [area.small_bodies(), area.orbiting_body(), TerrainType::SystemOrbit];
    for _ in 1..size.max(1) {
        terrains.push(*surroundings.choose(rng).unwrap_or(&TerrainType::SystemOrbit));
    }
    terrains
}

fn populate_tile(
    builder: &mut TreeBuilder,
    tile: Entity,
    config: &TreeConfig,
    rng: &mut impl Rng,
) -> Result<(), TreeError> {
    if rng.gen_bool(config.stock_chance.clamp(0.0, 1.0)) && config.max_stock > 0.0 {
        let kind = *ResourceKind::RAW.choose(rng).unwrap_or(&ResourceKind::Ore);
        builder.stock(tile, kind, rng.gen_range(0.0..config.max_stock))?;
    }

    if rng.gen_bool(config.extractor_chance.clamp(0.0, 1.0)) {
        let kind = *ResourceKind::RAW.choose(rng).unwrap_or(&ResourceKind::Ore);
        let name = format!("{} Extractor", kind.name());
        builder.place(tile, Building::new(name).with_extraction(kind, rng.gen_range(0.5..3.0)))?;
    }

    if rng.gen_bool(config.processor_chance.clamp(0.0, 1.0)) {
        let input = *ResourceKind::RAW.choose(rng).unwrap_or(&ResourceKind::Ore);
        if let Some(output) = input.refined() {
            let name = format!("{} Refinery", output.name());
            builder.place(
                tile,
                Building::new(name).with_process(
                    input,
                    rng.gen_range(1.0..4.0),
                    output,
                    rng.gen_range(0.5..1.0),
                ),
            )?;
        }
    }

    if rng.gen_bool(config.transport_chance.clamp(0.0, 1.0)) {
        let scale = builder.scale_of(tile).ok_or(TreeError::MissingTile(tile))?;
        let range = scale + rng.gen_range(0..=config.max_transport_span.max(0));
        builder.place(tile, Building::new("Transport Hub").with_transport(range))?;
    }

    Ok(())
}
