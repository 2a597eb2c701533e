/*!

Summary statistics derived from a [`SimulationHistory`].

Everything here is a pure function of the recorded history, so a summary can be recomputed from a
history that was saved and loaded again.

The effective reproduction number for day `t` averages, over the nodes whose infectious onset
falls within the trailing window `t - 6 ..= t`, the number of nodes each of them infected over the
whole run. Nodes that infected nobody count as zero; a window without onsets gives zero.

*/

use crate::{
    disease::Severity,
    engine::{DiseaseState, SimulationHistory},
    NodeId,
};
use serde::{Deserialize, Serialize};

/// Length of the trailing onset window of the effective reproduction number.
pub const R_EFFECTIVE_WINDOW: u32 = 7;

/// Number of bins of the degree histogram.
pub const DEGREE_BINS: usize = 20;

/// One bin of a histogram over `lower..upper` (`upper` exclusive, except for the last bin).
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HistogramBin {
    pub lower: f64,
    pub upper: f64,
    pub count: usize,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InfectionPeak {
    pub day: u32,
    pub infectious: usize,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SummaryMetrics {
    /// Share of the population ever infected.
    pub attack_rate: f64,
    /// Cumulative attack rate at the end of each day.
    pub attack_rate_series: Vec<f64>,
    pub peak_infections: usize,
    /// First day on which `peak_infections` was reached.
    pub peak_day: u32,
    /// Strict local maxima of the infectious count.
    pub infection_peaks: Vec<InfectionPeak>,
    pub r_effective_series: Vec<f64>,
    pub final_r_effective: f64,
    /// Deaths over resolved cases; zero while nothing has resolved.
    pub case_fatality_rate: f64,
    /// Hospital load over capacity for each day.
    pub hospital_utilization: Vec<f64>,
    pub peak_hospital_utilization: f64,
    pub days_over_capacity: usize,
    /// Infectious onsets per severity level, in `Severity::ALL` order.
    pub onsets_by_severity: [usize; 5],
    /// Ever-infected nodes per age decade, the last bin holding ages 80 and above.
    pub infected_age_histogram: [usize; 9],
    pub degree_histogram: Vec<HistogramBin>,
    pub total_infected: usize,
    pub total_deaths: usize,
    pub total_recovered: usize,
    pub total_hospitalized: usize,
    pub total_vaccinated: usize,
}

impl SummaryMetrics {
    #[must_use]
    pub fn onsets_of(&self, severity: Severity) -> usize {
        self.onsets_by_severity[severity.index()]
    }
}

#[must_use]
pub fn summarize(history: &SimulationHistory) -> SummaryMetrics {
    let population = history.population_size.max(1) as f64;
    let last = history.final_snapshot();

    let total_infected = last.map_or(0, |s| s.cumulative_infections);
    let total_deaths = last.map_or(0, |s| s.cumulative_deaths);
    let total_recovered = last.map_or(0, |s| s.cumulative_recoveries);

    let attack_rate_series: Vec<f64> = history
        .snapshots
        .iter()
        .map(|s| s.cumulative_infections as f64 / population)
        .collect();

    let infectious = history.series(DiseaseState::Infectious);
    let (peak_day, peak_infections) = peak(&infectious);
    let peak_day = history.snapshots.get(peak_day).map_or(0, |s| s.day);

    let capacity = history.hospital_capacity.max(1) as f64;
    let hospital_utilization: Vec<f64> = history
        .snapshots
        .iter()
        .map(|s| s.hospital_load() as f64 / capacity)
        .collect();

    let resolved = total_deaths + total_recovered;
    let r_effective_series = r_effective_series(history);

    SummaryMetrics {
        attack_rate: total_infected as f64 / population,
        attack_rate_series,
        peak_infections,
        peak_day,
        infection_peaks: infection_peaks(history),
        final_r_effective: r_effective_series.last().copied().unwrap_or(0.0),
        r_effective_series,
        case_fatality_rate: if resolved == 0 {
            0.0
        } else {
            total_deaths as f64 / resolved as f64
        },
        peak_hospital_utilization: hospital_utilization.iter().copied().fold(0.0, f64::max),
        days_over_capacity: hospital_utilization.iter().filter(|&&u| u > 1.0).count(),
        hospital_utilization,
        onsets_by_severity: onsets_by_severity(history),
        infected_age_histogram: infected_age_histogram(history),
        degree_histogram: degree_histogram(history),
        total_infected,
        total_deaths,
        total_recovered,
        total_hospitalized: last.map_or(0, |s| s.cumulative_hospitalizations),
        total_vaccinated: last.map_or(0, |s| s.cumulative_vaccinations),
    }
}

// (index, value) of the first maximum
fn peak(values: &[usize]) -> (usize, usize) {
    values
        .iter()
        .enumerate()
        .fold((0, 0), |(best_index, best), (index, &value)| {
            if value > best { (index, value) } else { (best_index, best) }
        })
}

fn infection_peaks(history: &SimulationHistory) -> Vec<InfectionPeak> {
    history
        .snapshots
        .windows(3)
        .filter(|w| w[1].infectious > w[0].infectious && w[1].infectious > w[2].infectious)
        .map(|w| InfectionPeak {
            day: w[1].day,
            infectious: w[1].infectious,
        })
        .collect()
}

/// Effective reproduction number for every recorded day.
#[must_use]
pub fn r_effective_series(history: &SimulationHistory) -> Vec<f64> {
    let mut offspring = vec![0usize; history.population_size];
    for edge in &history.lineage {
        if let Some(count) = offspring.get_mut(edge.infector.index()) {
            *count += 1;
        }
    }
    let offspring_of = |node: NodeId| offspring.get(node.index()).copied().unwrap_or(0);

    history
        .snapshots
        .iter()
        .map(|snapshot| {
            let first = snapshot.day.saturating_sub(R_EFFECTIVE_WINDOW - 1);
            let (cases, secondary) = history
                .onsets
                .iter()
                .filter(|onset| (first..=snapshot.day).contains(&onset.day))
                .fold((0usize, 0usize), |(cases, secondary), onset| {
                    (cases + 1, secondary + offspring_of(onset.node))
                });
            if cases == 0 {
                0.0
            } else {
                secondary as f64 / cases as f64
            }
        })
        .collect()
}

fn onsets_by_severity(history: &SimulationHistory) -> [usize; 5] {
    let mut counts = [0; 5];
    for onset in &history.onsets {
        counts[onset.severity.index()] += 1;
    }
    counts
}

fn infected_age_histogram(history: &SimulationHistory) -> [usize; 9] {
    let mut bins = [0; 9];
    for node in history.nodes.iter().filter(|node| node.ever_infected) {
        bins[usize::from(node.age / 10).min(8)] += 1;
    }
    bins
}

fn degree_histogram(history: &SimulationHistory) -> Vec<HistogramBin> {
    let Some(max) = history.nodes.iter().map(|node| node.degree).max() else {
        return Vec::new();
    };
    let min = history.nodes.iter().map(|node| node.degree).min().unwrap_or(0);
    let (min, max) = (min as f64, max as f64);
    // A single-valued sample still gets a bin of width one.
    let width = if max > min {
        (max - min) / DEGREE_BINS as f64
    } else {
        1.0 / DEGREE_BINS as f64
    };

    let mut bins: Vec<HistogramBin> = (0..DEGREE_BINS)
        .map(|i| HistogramBin {
            lower: min + width * i as f64,
            upper: min + width * (i + 1) as f64,
            count: 0,
        })
        .collect();
    for node in &history.nodes {
        let index = ((node.degree as f64 - min) / width).floor() as usize;
        bins[index.min(DEGREE_BINS - 1)].count += 1;
    }
    bins
}
