//! Job phases and run statistics

use super::partition::PartitionStrategy;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Phase of a multiplication job
///
/// The phases execute in order: ShapeDiscovery → Map → Join → Reduce. The
/// join phase only runs under the shared-dimension strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    /// Register both operands and lock their roles
    ShapeDiscovery,
    /// Emit, partition and combine input splits
    Map,
    /// Cross product per shared index
    Join,
    /// Produce one value per destination cell
    Reduce,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::ShapeDiscovery => write!(f, "ShapeDiscovery"),
            Phase::Map => write!(f, "Map"),
            Phase::Join => write!(f, "Join"),
            Phase::Reduce => write!(f, "Reduce"),
        }
    }
}

/// Wall-clock time spent in one phase
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhaseTiming {
    pub phase: Phase,
    pub duration_secs: f64,
}

/// Counters collected while a job runs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobStats {
    pub strategy: PartitionStrategy,
    pub left: String,
    pub right: String,
    pub splits: usize,
    pub elements_emitted: usize,
    /// Records produced by map tasks before combining
    pub map_records: usize,
    /// Records handed to the shuffle after combining
    pub shuffled_records: usize,
    /// Distinct keys seen by the final reducers
    pub reduce_keys: usize,
    pub result_cells: usize,
    pub retries: usize,
    pub phases: Vec<PhaseTiming>,
}

impl JobStats {
    pub fn new(strategy: PartitionStrategy, left: String, right: String) -> Self {
        Self {
            strategy,
            left,
            right,
            splits: 0,
            elements_emitted: 0,
            map_records: 0,
            shuffled_records: 0,
            reduce_keys: 0,
            result_cells: 0,
            retries: 0,
            phases: Vec::new(),
        }
    }

    pub fn record_phase(&mut self, phase: Phase, duration: Duration) {
        self.phases.push(PhaseTiming {
            phase,
            duration_secs: duration.as_secs_f64(),
        });
    }

    /// Total time across recorded phases
    pub fn total_duration(&self) -> Duration {
        Duration::from_secs_f64(self.phases.iter().map(|p| p.duration_secs).sum())
    }

    pub fn phase_duration(&self, phase: Phase) -> Option<Duration> {
        self.phases
            .iter()
            .find(|p| p.phase == phase)
            .map(|p| Duration::from_secs_f64(p.duration_secs))
    }
}
