//! Terrain classification for tiles.
//!
//! Terrain is assigned by the external generator. The engine only reads it,
//! except for explicit reassignment through the engine API.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TerrainType {
    // System areas, coarsest first
    SolarSystem,
    HillsCloud,
    ScatteredDisk,
    OuterSolarSystem,
    InnerSolarSystem,

    // Fill
    InterstellarSpace,
    SystemOrbit,

    // Small body fields
    OortCloudBodies,
    HillsCloudBodies,
    ScatteredDiskBodies,
    KuiperBeltBodies,
    AsteroidBeltBodies,

    // Single bodies
    Star,
    FarSystemBody,
    OuterSystemBody,
    InnerSystemBody,
}

impl TerrainType {
    /// The next finer system area, if this terrain is itself a system area
    pub fn inner_area(&self) -> Option<TerrainType> {
        match self {
            TerrainType::SolarSystem => Some(TerrainType::HillsCloud),
            TerrainType::HillsCloud => Some(TerrainType::ScatteredDisk),
            TerrainType::ScatteredDisk => Some(TerrainType::OuterSolarSystem),
            TerrainType::OuterSolarSystem => Some(TerrainType::InnerSolarSystem),
            TerrainType::InnerSolarSystem => Some(TerrainType::Star),
            _ => None,
        }
    }

    /// Small bodies scattered through an area's map
    pub fn small_bodies(&self) -> TerrainType {
        match self {
            TerrainType::SolarSystem => TerrainType::InterstellarSpace,
            TerrainType::HillsCloud => TerrainType::HillsCloudBodies,
            TerrainType::ScatteredDisk => TerrainType::ScatteredDiskBodies,
            TerrainType::OuterSolarSystem => TerrainType::KuiperBeltBodies,
            _ => TerrainType::AsteroidBeltBodies,
        }
    }

    /// Single body placed in an area's orbits
    pub fn orbiting_body(&self) -> TerrainType {
        match self {
            TerrainType::SolarSystem | TerrainType::HillsCloud | TerrainType::ScatteredDisk => {
                TerrainType::FarSystemBody
            }
            TerrainType::OuterSolarSystem => TerrainType::OuterSystemBody,
            _ => TerrainType::InnerSystemBody,
        }
    }

    /// Whether tiles of this terrain normally carry a zoomed-in sub-map
    pub fn is_zoomable(&self) -> bool {
        matches!(
            self,
            TerrainType::SolarSystem
                | TerrainType::HillsCloud
                | TerrainType::ScatteredDisk
                | TerrainType::OuterSolarSystem
                | TerrainType::InnerSolarSystem
                | TerrainType::InnerSystemBody
                | TerrainType::OuterSystemBody
        )
    }

}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_area_chain_ends_at_star() {
        let mut area = TerrainType::SolarSystem;
        let mut steps = 0;
        while let Some(inner) = area.inner_area() {
            area = inner;
            steps += 1;
        }
        assert_eq!(area, TerrainType::Star);
        assert_eq!(steps, 5);
    }

    #[test]
    fn test_star_is_not_zoomable() {
        assert!(!TerrainType::Star.is_zoomable());
        assert!(TerrainType::InnerSolarSystem.is_zoomable());
    }
}
