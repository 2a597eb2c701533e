use crate::{
    context::{Context, DataPlugin},
    disease::Severity,
    error::EpiError,
    NodeId,
};
use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiseaseState {
    Susceptible,
    Exposed,
    Infectious,
    Recovered,
    Deceased,
    /// Susceptible but carrying vaccine protection.
    Vaccinated,
}

impl DiseaseState {
    pub const ALL: [DiseaseState; 6] = [
        DiseaseState::Susceptible,
        DiseaseState::Exposed,
        DiseaseState::Infectious,
        DiseaseState::Recovered,
        DiseaseState::Deceased,
        DiseaseState::Vaccinated,
    ];

    #[must_use]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Exposed or infectious, i.e. the epidemic is still running while any node is active.
    #[must_use]
    pub fn is_active(self) -> bool {
        matches!(self, DiseaseState::Exposed | DiseaseState::Infectious)
    }

    /// Whether a node in this state can be infected.
    #[must_use]
    pub fn is_susceptible(self) -> bool {
        matches!(self, DiseaseState::Susceptible | DiseaseState::Vaccinated)
    }

    #[must_use]
    pub fn can_transition_to(self, target: DiseaseState) -> bool {
        use DiseaseState::*;
        matches!(
            (self, target),
            (Susceptible, Exposed)
                | (Vaccinated, Exposed)
                | (Susceptible, Vaccinated)
                | (Vaccinated, Susceptible)
                | (Exposed, Infectious)
                | (Infectious, Recovered)
                | (Infectious, Deceased)
        )
    }
}

/// Dynamic per-node state owned by the engine.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct NodeState {
    pub disease_state: DiseaseState,
    /// Set when the node becomes infectious and kept afterward.
    pub severity: Option<Severity>,
    pub infected_day: Option<u32>,
    pub state_entry_day: u32,
    pub vaccinated: bool,
    pub vaccination_day: Option<u32>,
    /// Protection against infection right after vaccination.
    pub vaccine_efficacy: f64,
    /// Remaining protection against infection; zero when unprotected.
    pub vaccine_protection: f64,
    /// `None` for seeded nodes and nodes never infected.
    pub infected_by: Option<NodeId>,
    /// First day of isolation.
    pub isolated_from: Option<u32>,
    /// Multiplier on infectiousness while isolated.
    pub isolation_factor: f64,
}

impl Default for NodeState {
    fn default() -> Self {
        NodeState {
            disease_state: DiseaseState::Susceptible,
            severity: None,
            infected_day: None,
            state_entry_day: 0,
            vaccinated: false,
            vaccination_day: None,
            vaccine_efficacy: 0.0,
            vaccine_protection: 0.0,
            infected_by: None,
            isolated_from: None,
            isolation_factor: 1.0,
        }
    }
}

impl NodeState {
    #[must_use]
    pub fn is_isolated_on(&self, day: u32) -> bool {
        self.isolated_from.is_some_and(|from| day >= from)
    }

    #[must_use]
    pub fn isolation_multiplier(&self, day: u32) -> f64 {
        if self.is_isolated_on(day) {
            self.isolation_factor
        } else {
            1.0
        }
    }

    /// Share of the initial vaccine protection that is left, in `[0, 1]`.
    #[must_use]
    pub fn vaccine_strength(&self) -> f64 {
        if self.vaccine_efficacy > 0.0 {
            (self.vaccine_protection / self.vaccine_efficacy).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }
}

/// Arena of node states with incrementally maintained counts.
#[derive(Debug)]
pub struct Population {
    nodes: Vec<NodeState>,
    state_counts: [usize; 6],
    // Infectious nodes only, by severity
    severity_counts: [usize; 5],
}

static EMPTY_POPULATION: Population = Population::empty();

impl DataPlugin for Population {
    const new: &'static dyn Fn() -> Self = &Population::empty;
}

impl Population {
    const fn empty() -> Self {
        Population {
            nodes: Vec::new(),
            state_counts: [0; 6],
            severity_counts: [0; 5],
        }
    }

    fn reset(&mut self, size: usize) {
        self.nodes = vec![NodeState::default(); size];
        self.state_counts = [0; 6];
        self.state_counts[DiseaseState::Susceptible.index()] = size;
        self.severity_counts = [0; 5];
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    #[must_use]
    pub fn get(&self, node: NodeId) -> &NodeState {
        &self.nodes[node.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &NodeState)> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .map(|(index, state)| (NodeId(index), state))
    }

    /// Mutable access to everything but the disease state, which only changes through
    /// [`Population::transition`].
    pub(crate) fn get_mut(&mut self, node: NodeId) -> &mut NodeState {
        &mut self.nodes[node.index()]
    }

    #[must_use]
    pub fn count(&self, state: DiseaseState) -> usize {
        self.state_counts[state.index()]
    }

    #[must_use]
    pub fn state_counts(&self) -> [usize; 6] {
        self.state_counts
    }

    #[must_use]
    pub fn infectious_by_severity(&self) -> [usize; 5] {
        self.severity_counts
    }

    /// Infectious nodes that occupy a hospital bed.
    #[must_use]
    pub fn hospital_load(&self) -> usize {
        self.severity_counts[Severity::Hospitalized.index()]
            + self.severity_counts[Severity::Critical.index()]
    }

    #[must_use]
    pub fn active_count(&self) -> usize {
        self.count(DiseaseState::Exposed) + self.count(DiseaseState::Infectious)
    }

    /// Moves `node` to `target` on `day`. A node entering `Infectious` must already carry a
    /// severity.
    pub(crate) fn transition(
        &mut self,
        node: NodeId,
        target: DiseaseState,
        day: u32,
    ) -> Result<(), EpiError> {
        let state = &mut self.nodes[node.index()];
        let source = state.disease_state;
        if !source.can_transition_to(target) {
            return Err(EpiError::Internal(format!(
                "illegal transition {source:?} -> {target:?} for node {node} on day {day}"
            )));
        }

        if source == DiseaseState::Infectious {
            if let Some(severity) = state.severity {
                self.severity_counts[severity.index()] -= 1;
            }
        }
        if target == DiseaseState::Infectious {
            let Some(severity) = state.severity else {
                return Err(EpiError::Internal(format!(
                    "node {node} became infectious without a severity"
                )));
            };
            self.severity_counts[severity.index()] += 1;
        }

        state.disease_state = target;
        state.state_entry_day = day;
        self.state_counts[source.index()] -= 1;
        self.state_counts[target.index()] += 1;
        Ok(())
    }

    /// Verifies that every node is counted exactly once.
    pub(crate) fn check_conservation(&self, day: u32) -> Result<(), EpiError> {
        let total: usize = self.state_counts.iter().sum();
        if total != self.nodes.len() {
            return Err(EpiError::Internal(format!(
                "state counts sum to {total} on day {day}, population is {}",
                self.nodes.len()
            )));
        }
        Ok(())
    }
}

pub trait ContextPopulationExt {
    /// Replaces the population with `size` susceptible nodes.
    fn init_population(&mut self, size: usize);

    fn population(&self) -> &Population;

    fn population_mut(&mut self) -> &mut Population;

    fn disease_state(&self, node: NodeId) -> DiseaseState {
        self.population().get(node).disease_state
    }
}

impl ContextPopulationExt for Context {
    fn init_population(&mut self, size: usize) {
        self.get_data_container_mut::<Population>().reset(size);
    }

    fn population(&self) -> &Population {
        self.get_data_container::<Population>()
            .unwrap_or(&EMPTY_POPULATION)
    }

    fn population_mut(&mut self) -> &mut Population {
        self.get_data_container_mut::<Population>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legal_transitions_update_counts() {
        let mut context = Context::new();
        context.init_population(3);
        let population = context.population_mut();

        population.transition(NodeId(0), DiseaseState::Exposed, 0).unwrap();
        population.get_mut(NodeId(0)).severity = Some(Severity::Critical);
        population.transition(NodeId(0), DiseaseState::Infectious, 4).unwrap();
        population.transition(NodeId(1), DiseaseState::Vaccinated, 4).unwrap();

        assert_eq!(population.count(DiseaseState::Susceptible), 1);
        assert_eq!(population.count(DiseaseState::Infectious), 1);
        assert_eq!(population.hospital_load(), 1);
        assert_eq!(population.get(NodeId(0)).state_entry_day, 4);

        population.transition(NodeId(0), DiseaseState::Deceased, 9).unwrap();
        assert_eq!(population.hospital_load(), 0);
        population.check_conservation(9).unwrap();
        assert_eq!(context.disease_state(NodeId(0)), DiseaseState::Deceased);
    }

    #[test]
    fn illegal_transitions_are_internal_errors() {
        let mut context = Context::new();
        context.init_population(2);
        let population = context.population_mut();
        assert!(matches!(
            population.transition(NodeId(0), DiseaseState::Recovered, 1),
            Err(EpiError::Internal(_))
        ));
        population.transition(NodeId(1), DiseaseState::Exposed, 1).unwrap();
        // No severity assigned yet
        assert!(matches!(
            population.transition(NodeId(1), DiseaseState::Infectious, 2),
            Err(EpiError::Internal(_))
        ));
    }

    #[test]
    fn recovered_and_deceased_are_final() {
        for terminal in [DiseaseState::Recovered, DiseaseState::Deceased] {
            for target in DiseaseState::ALL {
                assert!(!terminal.can_transition_to(target));
            }
        }
    }

    #[test]
    fn uninitialized_context_has_an_empty_population() {
        let context = Context::new();
        assert!(context.population().is_empty());
    }
}
