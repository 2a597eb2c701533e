/*!

One complete run from a [`SimulationConfig`]: validation, seed resolution, network generation,
simulation and summary.

A single base seed drives the whole run. The network is generated from the `GraphRng` stream and
the engine draws from its own streams, so fixing `random_seed` fixes both the network and the
epidemic on it.

*/

use crate::{
    config::SimulationConfig,
    context::Context,
    engine::{SeverityCounts, SimulationEngine, SimulationHistory},
    error::EpiError,
    graph::{Graph, NetworkInfo},
    random::ContextRandomExt,
    stats::{summarize, SummaryMetrics},
};
use log::info;
use serde::{Deserialize, Serialize};

/// The daily series of a run in column form.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct HistorySeries {
    pub day: Vec<u32>,
    #[serde(rename = "S")]
    pub susceptible: Vec<usize>,
    #[serde(rename = "E")]
    pub exposed: Vec<usize>,
    #[serde(rename = "I")]
    pub infectious: Vec<usize>,
    #[serde(rename = "R")]
    pub recovered: Vec<usize>,
    #[serde(rename = "D")]
    pub deceased: Vec<usize>,
    #[serde(rename = "V")]
    pub vaccinated: Vec<usize>,
    pub severity_breakdown: Vec<SeverityCounts>,
    pub daily_new_cases: Vec<usize>,
    pub daily_deaths: Vec<usize>,
    pub daily_hospitalizations: Vec<usize>,
}

impl From<&SimulationHistory> for HistorySeries {
    fn from(history: &SimulationHistory) -> Self {
        let mut series = HistorySeries::default();
        for snapshot in &history.snapshots {
            series.day.push(snapshot.day);
            series.susceptible.push(snapshot.susceptible);
            series.exposed.push(snapshot.exposed);
            series.infectious.push(snapshot.infectious);
            series.recovered.push(snapshot.recovered);
            series.deceased.push(snapshot.deceased);
            series.vaccinated.push(snapshot.vaccinated);
            series.severity_breakdown.push(snapshot.severity);
            series.daily_new_cases.push(snapshot.new_infections);
            series.daily_deaths.push(snapshot.new_deaths);
            series
                .daily_hospitalizations
                .push(snapshot.new_hospitalizations);
        }
        series
    }
}

/// The headline numbers of a run.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResultSummary {
    pub attack_rate: f64,
    pub peak_infections: usize,
    pub peak_day: u32,
    pub total_deaths: usize,
    pub total_hospitalized: usize,
    pub final_r_effective: f64,
    pub case_fatality_rate: f64,
}

impl From<&SummaryMetrics> for ResultSummary {
    fn from(metrics: &SummaryMetrics) -> Self {
        ResultSummary {
            attack_rate: metrics.attack_rate,
            peak_infections: metrics.peak_infections,
            peak_day: metrics.peak_day,
            total_deaths: metrics.total_deaths,
            total_hospitalized: metrics.total_hospitalized,
            final_r_effective: metrics.final_r_effective,
            case_fatality_rate: metrics.case_fatality_rate,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SimulationOutput {
    pub history: HistorySeries,
    pub summary: ResultSummary,
    pub network_info: NetworkInfo,
    pub metrics: SummaryMetrics,
    /// The seed the run actually used, drawn from the operating system if none was configured.
    pub random_seed: u64,
}

/// Builds the network and runs the engine, returning the network and the raw history.
pub fn execute(config: &SimulationConfig) -> Result<(Graph, SimulationHistory), EpiError> {
    config.validate()?;
    let random_seed = config.random_seed.unwrap_or_else(rand::random::<u64>);

    let mut context = Context::new();
    context.init_random(random_seed);
    let graph = config.graph_builder().build(&mut context)?;

    let mut options = config.run_options();
    options.random_seed = Some(random_seed);
    let mut engine = SimulationEngine::new(
        graph,
        config.disease_profile.clone(),
        config.intervention_schedule.clone(),
        config.seed_spec,
        options,
    )?;
    while engine.step()? {}
    Ok(engine.into_parts())
}

/// Runs `config` end to end.
pub fn run_simulation(config: &SimulationConfig) -> Result<SimulationOutput, EpiError> {
    let (graph, history) = execute(config)?;
    let metrics = summarize(&history);
    let summary = ResultSummary::from(&metrics);
    info!(
        "run with seed {} finished: attack rate {:.3}, {} deaths, peak of {} on day {}",
        history.random_seed,
        summary.attack_rate,
        summary.total_deaths,
        summary.peak_infections,
        summary.peak_day
    );
    Ok(SimulationOutput {
        history: HistorySeries::from(&history),
        summary,
        network_info: graph.network_info(),
        metrics,
        random_seed: history.random_seed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{graph::Topology, intervention::Scenario};

    fn small_config(seed: Option<u64>) -> SimulationConfig {
        SimulationConfig {
            population_size: 300,
            random_seed: seed,
            max_days: 60,
            ..SimulationConfig::default()
        }
    }

    #[test]
    fn series_line_up_with_the_history() {
        let output = run_simulation(&small_config(Some(21))).unwrap();
        let days = output.history.day.len();
        assert!(days >= 1);
        for column in [
            &output.history.susceptible,
            &output.history.exposed,
            &output.history.infectious,
            &output.history.recovered,
            &output.history.deceased,
            &output.history.vaccinated,
        ] {
            assert_eq!(column.len(), days);
        }
        assert_eq!(output.history.day[0], 0);
        assert_eq!(output.random_seed, 21);
        assert_eq!(output.network_info.node_count, 300);
        assert_eq!(output.summary.peak_day, output.metrics.peak_day);
    }

    #[test]
    fn unseeded_runs_report_their_seed() {
        let output = run_simulation(&small_config(None)).unwrap();
        let replay = run_simulation(&small_config(Some(output.random_seed))).unwrap();
        assert_eq!(output.history, replay.history);
        assert_eq!(output.network_info, replay.network_info);
    }

    #[test]
    fn output_serializes_with_compartment_letters() {
        let config = SimulationConfig {
            topology: Topology::RandomGraph {
                edge_probability: 0.02,
            },
            ..small_config(Some(4))
        }
        .with_scenario(Scenario::RapidResponse);
        let output = run_simulation(&config).unwrap();
        let json = serde_json::to_value(&output).unwrap();
        for key in ["S", "E", "I", "R", "D", "V", "daily_new_cases"] {
            assert!(json["history"][key].is_array(), "missing {key}");
        }
        assert!(json["summary"]["attack_rate"].is_number());
    }

    #[test]
    fn invalid_configurations_fail_before_running() {
        let config = SimulationConfig {
            population_size: 0,
            ..SimulationConfig::default()
        };
        assert!(matches!(
            run_simulation(&config),
            Err(EpiError::InvalidParameter(_))
        ));
    }
}
