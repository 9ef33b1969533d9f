//! Production step - per-tile extraction and processing for one tick

use super::hierarchy::post_order;
use super::reachability::reachable_pool;
use super::withdrawal::{deposit, withdraw_reachable};
use crate::components::{Buildings, Extraction, Ledger, Process};
use hecs::{Entity, World};
use serde::{Deserialize, Serialize};

/// Resource movement during one production step
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductionReport {
    pub extracted: Ledger,
    pub consumed: Ledger,
    pub produced: Ledger,
    /// Processes whose input was fully withdrawn
    pub processes_run: u32,
    /// Processes that ran on a partially fulfilled withdrawal
    pub processes_partial: u32,
    /// Processes skipped because the reachable pool could not cover one run
    pub processes_starved: u32,
    /// Input requested but not found while running processes
    pub shortfall: f64,
}

/// Apply every tile's extraction, then its processes, children before parents.
///
/// Processes check the reachable pool computed by the previous aggregation
/// pass, and credit output only for the input actually withdrawn.
pub fn production_system(world: &mut World, roots: &[Entity], epsilon: f64) -> ProductionReport {
    let mut report = ProductionReport::default();

    for tile in post_order(world, roots) {
        let (extractions, processes): (Vec<Extraction>, Vec<Process>) =
            match world.get::<&Buildings>(tile) {
                Ok(buildings) => (
                    buildings.iter().flat_map(|b| b.extractions().copied()).collect(),
                    buildings.iter().flat_map(|b| b.processes().copied()).collect(),
                ),
                Err(_) => continue,
            };

        for extraction in extractions {
            let credited = deposit(world, tile, extraction.resource, extraction.rate);
            report.extracted.add(extraction.resource, credited);
        }

        for process in processes {
            run_process(world, tile, &process, epsilon, &mut report);
        }
    }

    report
}

fn run_process(
    world: &mut World,
    tile: Entity,
    process: &Process,
    epsilon: f64,
    report: &mut ProductionReport,
) {
    let available = reachable_pool(world, tile).get(process.input);
    if available + epsilon < process.rate {
        report.processes_starved += 1;
        return;
    }

    let withdrawal = withdraw_reachable(world, tile, process.input, process.rate, epsilon);
    report.consumed.add(process.input, withdrawal.removed);
    report.shortfall += withdrawal.shortfall;

    let output = deposit(world, tile, process.output, withdrawal.removed * process.amount);
    report.produced.add(process.output, output);

    if withdrawal.is_complete(epsilon) {
        report.processes_run += 1;
    } else {
        report.processes_partial += 1;
    }
}
