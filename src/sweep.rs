/*!

Parameter sweeps: the cartesian product of a few varied inputs over a base configuration,
executed in parallel.

Each configuration runs with its own network, engine and [`Context`](crate::Context), so runs
share no mutable state and the outcome of a seeded run does not depend on the thread it ran on.

*/

use crate::{
    config::SimulationConfig,
    error::EpiError,
    runner::{run_simulation, ResultSummary},
};
use log::info;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// The inputs a sweep varies. An empty list keeps the base configuration's value.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParameterGrid {
    pub base: SimulationConfig,
    pub r0_values: Vec<f64>,
    pub initial_infections: Vec<usize>,
    pub random_seeds: Vec<u64>,
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SweepPoint {
    pub r0: f64,
    pub initial_infections: usize,
    pub random_seed: Option<u64>,
}

impl ParameterGrid {
    #[must_use]
    pub fn new(base: SimulationConfig) -> Self {
        ParameterGrid {
            base,
            ..ParameterGrid::default()
        }
    }

    #[must_use]
    pub fn points(&self) -> Vec<SweepPoint> {
        let r0_values = if self.r0_values.is_empty() {
            vec![self.base.disease_profile.r0]
        } else {
            self.r0_values.clone()
        };
        let infections = if self.initial_infections.is_empty() {
            vec![self.base.seed_spec.count]
        } else {
            self.initial_infections.clone()
        };
        let seeds: Vec<Option<u64>> = if self.random_seeds.is_empty() {
            vec![self.base.random_seed]
        } else {
            self.random_seeds.iter().copied().map(Some).collect()
        };

        let mut points = Vec::with_capacity(r0_values.len() * infections.len() * seeds.len());
        for &r0 in &r0_values {
            for &initial_infections in &infections {
                for &random_seed in &seeds {
                    points.push(SweepPoint {
                        r0,
                        initial_infections,
                        random_seed,
                    });
                }
            }
        }
        points
    }

    /// The base configuration with the values of `point` applied.
    #[must_use]
    pub fn config_for(&self, point: &SweepPoint) -> SimulationConfig {
        let mut config = self.base.clone();
        config.disease_profile.r0 = point.r0;
        config.seed_spec.count = point.initial_infections;
        config.random_seed = point.random_seed;
        config
    }

    #[must_use]
    pub fn configs(&self) -> Vec<SimulationConfig> {
        self.points().iter().map(|point| self.config_for(point)).collect()
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SweepResult {
    pub point: SweepPoint,
    pub random_seed: u64,
    pub summary: ResultSummary,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Objective {
    MinimizeDeaths,
    MinimizePeakInfections,
    MinimizeAttackRate,
}

impl Objective {
    fn score(self, summary: &ResultSummary) -> f64 {
        match self {
            Objective::MinimizeDeaths => summary.total_deaths as f64,
            Objective::MinimizePeakInfections => summary.peak_infections as f64,
            Objective::MinimizeAttackRate => summary.attack_rate,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SweepReport {
    /// One result per grid point, in grid order.
    pub results: Vec<SweepResult>,
}

impl SweepReport {
    /// The result with the lowest score; the earliest one on ties.
    #[must_use]
    pub fn best(&self, objective: Objective) -> Option<&SweepResult> {
        self.results.iter().reduce(|best, candidate| {
            if objective.score(&candidate.summary) < objective.score(&best.summary) {
                candidate
            } else {
                best
            }
        })
    }
}

/// Runs every grid point in parallel. The first failing configuration fails the sweep.
pub fn run_sweep(grid: &ParameterGrid) -> Result<SweepReport, EpiError> {
    let points = grid.points();
    info!("running a sweep of {} configurations", points.len());

    let results = points
        .into_par_iter()
        .map(|point| {
            let output = run_simulation(&grid.config_for(&point))?;
            Ok(SweepResult {
                point,
                random_seed: output.random_seed,
                summary: output.summary,
            })
        })
        .collect::<Result<Vec<_>, EpiError>>()?;
    Ok(SweepReport { results })
}
