//! A discrete-day SEIRD epidemic engine that runs on a synthetic contact network.
//!
//! A run is assembled from four pieces:
//!
//! * a [`Graph`] produced by a [`GraphBuilder`] from one of five topologies,
//! * a [`DiseaseProfile`] describing durations, severity and vaccine parameters,
//! * an [`InterventionSchedule`] of dated public-health measures,
//! * a [`SeedSpec`] choosing the initially exposed nodes.
//!
//! [`SimulationEngine`] advances every node through its disease states one day at a time and
//! records a [`SimulationHistory`]. [`stats::summarize`] derives the reported metrics from that
//! history. [`runner::run_simulation`] ties everything together from a single
//! [`SimulationConfig`].
//!
//! Every run owns its own [`Context`], so independent runs (for example the ones launched by
//! [`sweep::run_sweep`]) never share mutable state.

pub mod config;
pub mod context;
pub mod disease;
pub mod engine;
pub mod error;
pub mod graph;
pub mod hashing;
pub mod intervention;
pub mod logging;
pub mod random;
pub mod report;
pub mod runner;
pub mod stats;
pub mod sweep;

// Re-exported for use in `define_rng!` and so callers do not need their own `rand` dependency.
pub use rand;

pub use config::SimulationConfig;
pub use context::{Context, DataPlugin};
pub use disease::{DiseaseProfile, DurationDistribution, Severity};
pub use engine::{
    DiseaseState, HospitalConfig, RunOptions, SeedMethod, SeedSpec, SimulationEngine,
    SimulationHistory,
};
pub use error::EpiError;
pub use graph::{EdgeType, Graph, GraphBuilder, NetworkInfo, Topology};
pub use intervention::{Intervention, InterventionKind, InterventionSchedule, Scenario};
pub use random::ContextRandomExt;
pub use runner::{run_simulation, SimulationOutput};
pub use stats::{summarize, SummaryMetrics};

use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};

/// A dense node index. Node `i` of an `n`-node graph is `NodeId(i)` for `0 <= i < n`.
#[derive(
    Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct NodeId(pub usize);

impl NodeId {
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

impl Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
