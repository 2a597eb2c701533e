use super::DiseaseState;
use crate::{disease::Severity, NodeId};
use serde::{Deserialize, Serialize};

/// Infectious nodes per severity level.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeverityCounts {
    pub asymptomatic: usize,
    pub mild: usize,
    pub severe: usize,
    pub hospitalized: usize,
    pub critical: usize,
}

impl SeverityCounts {
    #[must_use]
    pub fn from_array(counts: [usize; 5]) -> Self {
        let [asymptomatic, mild, severe, hospitalized, critical] = counts;
        SeverityCounts {
            asymptomatic,
            mild,
            severe,
            hospitalized,
            critical,
        }
    }

    #[must_use]
    pub fn get(&self, severity: Severity) -> usize {
        match severity {
            Severity::Asymptomatic => self.asymptomatic,
            Severity::Mild => self.mild,
            Severity::Severe => self.severe,
            Severity::Hospitalized => self.hospitalized,
            Severity::Critical => self.critical,
        }
    }
}

/// Counts recorded at the end of one simulated day.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DaySnapshot {
    pub day: u32,
    pub susceptible: usize,
    pub exposed: usize,
    pub infectious: usize,
    pub recovered: usize,
    pub deceased: usize,
    pub vaccinated: usize,
    pub severity: SeverityCounts,
    /// Exposures on this day, seeds included.
    pub new_infections: usize,
    pub new_deaths: usize,
    /// Onsets of hospital-level severity on this day.
    pub new_hospitalizations: usize,
    pub cumulative_infections: usize,
    pub cumulative_recoveries: usize,
    pub cumulative_deaths: usize,
    pub cumulative_hospitalizations: usize,
    pub cumulative_vaccinations: usize,
}

impl DaySnapshot {
    #[must_use]
    pub fn count(&self, state: DiseaseState) -> usize {
        match state {
            DiseaseState::Susceptible => self.susceptible,
            DiseaseState::Exposed => self.exposed,
            DiseaseState::Infectious => self.infectious,
            DiseaseState::Recovered => self.recovered,
            DiseaseState::Deceased => self.deceased,
            DiseaseState::Vaccinated => self.vaccinated,
        }
    }

    /// Sum over all disease states; equals the population size.
    #[must_use]
    pub fn total(&self) -> usize {
        DiseaseState::ALL.iter().map(|&state| self.count(state)).sum()
    }

    #[must_use]
    pub fn hospital_load(&self) -> usize {
        self.severity.hospitalized + self.severity.critical
    }
}

/// One transmission event of the lineage.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InfectionEdge {
    pub infector: NodeId,
    pub infectee: NodeId,
    pub day: u32,
}

/// A node becoming infectious.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InfectiousOnset {
    pub node: NodeId,
    pub day: u32,
    pub severity: Severity,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeSummary {
    pub age: u8,
    pub degree: usize,
    pub ever_infected: bool,
    pub final_state: DiseaseState,
}

/// Everything a run records, self-contained so that statistics need nothing else.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SimulationHistory {
    pub population_size: usize,
    pub hospital_capacity: usize,
    pub random_seed: u64,
    pub snapshots: Vec<DaySnapshot>,
    pub lineage: Vec<InfectionEdge>,
    pub onsets: Vec<InfectiousOnset>,
    pub seeds: Vec<NodeId>,
    pub nodes: Vec<NodeSummary>,
}

impl SimulationHistory {
    #[must_use]
    pub fn final_snapshot(&self) -> Option<&DaySnapshot> {
        self.snapshots.last()
    }

    /// Number of recorded days.
    #[must_use]
    pub fn days(&self) -> usize {
        self.snapshots.len()
    }

    #[must_use]
    pub fn series(&self, state: DiseaseState) -> Vec<usize> {
        self.snapshots.iter().map(|s| s.count(state)).collect()
    }
}
