//! Building capability specs, supplied read-only by the building collaborator.

use super::resources::ResourceKind;
use super::tile::Reach;
use serde::{Deserialize, Serialize};

/// Pulls `rate` of a resource out of the tile each tick
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Extraction {
    pub resource: ResourceKind,
    pub rate: f64,
}

/// Consumes `rate` of `input` per tick and yields `amount` of `output` per unit consumed
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Process {
    pub input: ResourceKind,
    pub rate: f64,
    pub output: ResourceKind,
    pub amount: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum BuildingSpec {
    Extraction(Extraction),
    Process(Process),
    /// Transport network spanning up to scale `range`
    Transport { range: i32 },
}

/// A placed building and what it can do
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Building {
    pub name: String,
    pub specs: Vec<BuildingSpec>,
}

impl Building {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            specs: Vec::new(),
        }
    }

    pub fn with_extraction(mut self, resource: ResourceKind, rate: f64) -> Self {
        self.specs
            .push(BuildingSpec::Extraction(Extraction { resource, rate }));
        self
    }

    pub fn with_process(
        mut self,
        input: ResourceKind,
        rate: f64,
        output: ResourceKind,
        amount: f64,
    ) -> Self {
        self.specs.push(BuildingSpec::Process(Process {
            input,
            rate,
            output,
            amount,
        }));
        self
    }

    pub fn with_transport(mut self, range: i32) -> Self {
        self.specs.push(BuildingSpec::Transport { range });
        self
    }

    pub fn extractions(&self) -> impl Iterator<Item = &Extraction> + '_ {
        self.specs.iter().filter_map(|spec| match spec {
            BuildingSpec::Extraction(extraction) => Some(extraction),
            _ => None,
        })
    }

    pub fn processes(&self) -> impl Iterator<Item = &Process> + '_ {
        self.specs.iter().filter_map(|spec| match spec {
            BuildingSpec::Process(process) => Some(process),
            _ => None,
        })
    }

    /// Longest transport range this building provides
    pub fn transport_reach(&self) -> Reach {
        self.specs
            .iter()
            .filter_map(|spec| match spec {
                BuildingSpec::Transport { range } => Some(Reach::range(*range)),
                _ => None,
            })
            .max()
            .unwrap_or(Reach::NONE)
    }
}

/// Buildings placed directly on a tile
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Buildings(pub Vec<Building>);

impl Buildings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn place(&mut self, building: Building) {
        self.0.push(building);
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Building> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Max transport range over every building on the tile
    pub fn transport_reach(&self) -> Reach {
        self.0
            .iter()
            .map(Building::transport_reach)
            .max()
            .unwrap_or(Reach::NONE)
    }

    pub fn find(&self, name: &str) -> Option<&Building> {
        self.0.iter().find(|b| b.name == name)
    }
}
