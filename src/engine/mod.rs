/*!

The discrete-day simulation engine.

A [`SimulationEngine`] owns its [`Graph`], [`DiseaseProfile`] and [`InterventionSchedule`]
together with a private [`Context`] that holds the node [`Population`] and the random number
streams. Each call to [`SimulationEngine::step`] simulates one day:

1. on day 0, the seed nodes become exposed;
2. the transmission pass exposes susceptible neighbors of infectious nodes;
3. transitions scheduled for the day are applied (onset of infectiousness with a severity draw,
   recovery and death);
4. the interventions active on the day are evaluated. Their contact multipliers take effect in
   the next day's transmission pass, while waning, vaccination and testing act immediately;
5. a [`DaySnapshot`] is recorded.

The run ends when no node is exposed or infectious, or after `max_days` days.

```
use epinet_core::{
    engine, Context, DiseaseProfile, GraphBuilder, InterventionSchedule, RunOptions, SeedSpec,
    Topology,
};

let mut context = Context::new();
# use epinet_core::ContextRandomExt;
# context.init_random(7);
let graph = GraphBuilder::new(300, Topology::default()).build(&mut context).unwrap();
let options = RunOptions { random_seed: Some(7), ..RunOptions::default() };
let history = engine::run(
    graph,
    DiseaseProfile::default(),
    InterventionSchedule::new(),
    SeedSpec::random(3),
    options,
)
.unwrap();
assert_eq!(history.snapshots[0].exposed, 3);
```

*/

mod history;
mod measures;
mod plan;
mod progression;
mod seeding;
mod state;
mod transmission;

pub use history::{
    DaySnapshot, InfectionEdge, InfectiousOnset, NodeSummary, SeverityCounts, SimulationHistory,
};
pub use plan::{ScheduledTransition, TransitionQueue};
pub use progression::{mortality_probability, severity_weights};
pub use seeding::{SeedMethod, SeedSpec};
pub use state::{ContextPopulationExt, DiseaseState, NodeState, Population};
pub use transmission::{base_rate, ContactFactors};

use crate::{
    context::Context,
    disease::{DiseaseProfile, Severity},
    error::EpiError,
    graph::Graph,
    intervention::{ActiveMeasures, InterventionSchedule},
    random::ContextRandomExt,
    NodeId,
};
use log::{debug, info, trace};
use progression::ProgressionRng;
use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HospitalConfig {
    /// Beds for hospitalized and critical nodes; 10% of the population (at least one) if unset.
    pub capacity: Option<usize>,
    /// Mortality multiplier for onsets that happen while the hospital is over capacity.
    pub overflow_mortality_multiplier: f64,
}

impl Default for HospitalConfig {
    fn default() -> Self {
        HospitalConfig {
            capacity: None,
            overflow_mortality_multiplier: 2.0,
        }
    }
}

impl HospitalConfig {
    #[must_use]
    pub fn capacity_for(&self, population_size: usize) -> usize {
        self.capacity.unwrap_or((population_size / 10).max(1))
    }

    pub fn validate(&self) -> Result<(), EpiError> {
        if self.capacity == Some(0) {
            return Err(EpiError::InvalidParameter(
                "hospital capacity must be at least 1".to_string(),
            ));
        }
        let multiplier = self.overflow_mortality_multiplier;
        if !multiplier.is_finite() || multiplier < 1.0 {
            return Err(EpiError::InvalidParameter(format!(
                "overflow mortality multiplier must be at least 1, got {multiplier}"
            )));
        }
        Ok(())
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunOptions {
    pub max_days: u32,
    /// Drawn from the operating system when unset, and reported in the history.
    pub random_seed: Option<u64>,
    pub hospital: HospitalConfig,
}

impl Default for RunOptions {
    fn default() -> Self {
        RunOptions {
            max_days: 120,
            random_seed: None,
            hospital: HospitalConfig::default(),
        }
    }
}

impl RunOptions {
    pub fn validate(&self) -> Result<(), EpiError> {
        if self.max_days == 0 {
            return Err(EpiError::InvalidParameter(
                "max_days must be at least 1".to_string(),
            ));
        }
        self.hospital.validate()
    }
}

// Daily counters are reset after every snapshot, cumulative ones never.
#[derive(Copy, Clone, Debug, Default)]
struct Tally {
    new_infections: usize,
    new_deaths: usize,
    new_hospitalizations: usize,
    cumulative_infections: usize,
    cumulative_recoveries: usize,
    cumulative_deaths: usize,
    cumulative_hospitalizations: usize,
    cumulative_vaccinations: usize,
}

pub struct SimulationEngine {
    context: Context,
    graph: Graph,
    profile: DiseaseProfile,
    schedule: InterventionSchedule,
    seed_spec: SeedSpec,
    max_days: u32,
    overflow_mortality_multiplier: f64,
    base_rate: f64,
    measures: ActiveMeasures,
    queue: TransitionQueue,
    history: SimulationHistory,
    // Nodes infected by each node, indexed by infector
    offspring: Vec<Vec<NodeId>>,
    ever_infected: Vec<bool>,
    tally: Tally,
    day: u32,
    finished: bool,
}

impl SimulationEngine {
    /// Validates the inputs and prepares a run that starts at day 0.
    pub fn new(
        graph: Graph,
        profile: DiseaseProfile,
        schedule: InterventionSchedule,
        seed_spec: SeedSpec,
        options: RunOptions,
    ) -> Result<Self, EpiError> {
        let population_size = graph.node_count();
        if population_size == 0 {
            return Err(EpiError::InvalidParameter(
                "cannot simulate an empty graph".to_string(),
            ));
        }
        profile.validate()?;
        schedule.validate()?;
        seed_spec.validate(population_size)?;
        options.validate()?;

        let random_seed = options.random_seed.unwrap_or_else(rand::random::<u64>);
        let mut context = Context::new();
        context.init_random(random_seed);
        context.init_population(population_size);

        let hospital_capacity = options.hospital.capacity_for(population_size);
        let base_rate = transmission::base_rate(&graph, &profile);
        debug!("per-contact transmission rate {base_rate:.5}, hospital capacity {hospital_capacity}");

        Ok(SimulationEngine {
            context,
            profile,
            schedule,
            seed_spec,
            max_days: options.max_days,
            overflow_mortality_multiplier: options.hospital.overflow_mortality_multiplier,
            base_rate,
            measures: ActiveMeasures::default(),
            queue: TransitionQueue::new(),
            history: SimulationHistory {
                population_size,
                hospital_capacity,
                random_seed,
                ..SimulationHistory::default()
            },
            offspring: vec![Vec::new(); population_size],
            ever_infected: vec![false; population_size],
            tally: Tally::default(),
            day: 0,
            finished: false,
            graph,
        })
    }

    /// The next day to be simulated.
    #[must_use]
    pub fn day(&self) -> u32 {
        self.day
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    #[must_use]
    pub fn random_seed(&self) -> u64 {
        self.history.random_seed
    }

    #[must_use]
    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    #[must_use]
    pub fn population(&self) -> &Population {
        self.context.population()
    }

    #[must_use]
    pub fn node_state(&self, node: NodeId) -> &NodeState {
        self.context.population().get(node)
    }

    /// The measures that apply to the next transmission pass.
    #[must_use]
    pub fn measures(&self) -> &ActiveMeasures {
        &self.measures
    }

    #[must_use]
    pub fn history(&self) -> &SimulationHistory {
        &self.history
    }

    /// Simulates one day. Returns `false` once the run has ended, either with this day or
    /// before it.
    pub fn step(&mut self) -> Result<bool, EpiError> {
        if self.finished {
            return Ok(false);
        }
        let day = self.day;
        if day == 0 {
            info!(
                "starting simulation of {} nodes for up to {} days with seed {}",
                self.graph.node_count(),
                self.max_days,
                self.history.random_seed
            );
            self.seed()?;
        }

        let exposures = transmission::transmission_pass(
            &mut self.context,
            &self.graph,
            &self.profile,
            &self.measures,
            self.base_rate,
            day,
        );
        for exposure in exposures {
            self.expose(exposure.target, Some(exposure.infector), day)?;
        }

        while let Some(transition) = self.queue.pop_due(day) {
            self.apply_transition(transition)?;
        }

        self.apply_interventions(day)?;
        self.record_snapshot(day)?;

        self.day += 1;
        if self.context.population().active_count() == 0 || self.day >= self.max_days {
            self.finished = true;
        }
        Ok(!self.finished)
    }

    /// Runs the remaining days and returns the completed history.
    pub fn run(mut self) -> Result<SimulationHistory, EpiError> {
        while self.step()? {}
        Ok(self.into_history())
    }

    /// Consumes the engine, filling in the per-node summaries of the history.
    #[must_use]
    pub fn into_history(self) -> SimulationHistory {
        self.into_parts().1
    }

    /// Like [`SimulationEngine::into_history`], also handing back the graph.
    #[must_use]
    pub fn into_parts(mut self) -> (Graph, SimulationHistory) {
        let population = self.context.population();
        self.history.nodes = population
            .iter()
            .map(|(node, state)| NodeSummary {
                age: self.graph.node(node).age,
                degree: self.graph.degree(node),
                ever_infected: self.ever_infected[node.index()],
                final_state: state.disease_state,
            })
            .collect();
        info!(
            "simulation finished after {} days: {} infections, {} deaths",
            self.history.days(),
            self.tally.cumulative_infections,
            self.tally.cumulative_deaths
        );
        (self.graph, self.history)
    }

    fn seed(&mut self) -> Result<(), EpiError> {
        let seeds = seeding::select_seeds(&mut self.context, &self.graph, &self.seed_spec)?;
        for &node in &seeds {
            self.expose(node, None, 0)?;
        }
        debug!("seeded {} nodes", seeds.len());
        self.history.seeds = seeds;
        Ok(())
    }

    fn expose(&mut self, node: NodeId, infector: Option<NodeId>, day: u32) -> Result<(), EpiError> {
        let population = self.context.population_mut();
        population.transition(node, DiseaseState::Exposed, day)?;
        let state = population.get_mut(node);
        state.infected_day = Some(day);
        state.infected_by = infector;

        if let Some(infector) = infector {
            self.offspring[infector.index()].push(node);
            self.history.lineage.push(InfectionEdge {
                infector,
                infectee: node,
                day,
            });
            trace!("node {infector} infected node {node} on day {day}");
        }
        self.ever_infected[node.index()] = true;
        self.tally.new_infections += 1;
        self.tally.cumulative_infections += 1;

        let incubation = self
            .profile
            .incubation
            .sample::<ProgressionRng>(&mut self.context, 1.0)?;
        self.queue
            .schedule(day.saturating_add(incubation), node, DiseaseState::Infectious);
        Ok(())
    }

    fn apply_transition(&mut self, transition: ScheduledTransition) -> Result<(), EpiError> {
        let ScheduledTransition { day, node, target } = transition;
        match target {
            DiseaseState::Infectious => self.become_infectious(node, day),
            DiseaseState::Recovered => {
                self.context.population_mut().transition(node, target, day)?;
                self.tally.cumulative_recoveries += 1;
                trace!("node {node} recovered on day {day}");
                Ok(())
            }
            DiseaseState::Deceased => {
                self.context.population_mut().transition(node, target, day)?;
                self.tally.new_deaths += 1;
                self.tally.cumulative_deaths += 1;
                trace!("node {node} died on day {day}");
                Ok(())
            }
            _ => Err(EpiError::Internal(format!(
                "unexpected scheduled transition of node {node} to {target:?}"
            ))),
        }
    }

    fn become_infectious(&mut self, node: NodeId, day: u32) -> Result<(), EpiError> {
        let attributes = self.graph.node(node);
        let band = self.profile.age_band(attributes.age);
        let severity_protection = self.profile.vaccine.efficacy_severity
            * self.context.population().get(node).vaccine_strength();

        let weights =
            severity_weights(&self.profile, band, attributes.comorbidity, severity_protection);
        let index = self
            .context
            .sample_weighted::<ProgressionRng>(&weights)
            .map_err(|e| {
                EpiError::InvalidDiseaseProfile(format!(
                    "cannot draw a severity for node {node} from weights {weights:?}: {e}"
                ))
            })?;
        let severity = Severity::ALL[index];

        let population = self.context.population_mut();
        population.get_mut(node).severity = Some(severity);
        population.transition(node, DiseaseState::Infectious, day)?;
        self.history.onsets.push(InfectiousOnset {
            node,
            day,
            severity,
        });
        if severity.requires_hospital() {
            self.tally.new_hospitalizations += 1;
            self.tally.cumulative_hospitalizations += 1;
        }

        let scale = self.profile.severity.get(severity).infectious_period_scale;
        let duration = self
            .profile
            .infectious_period
            .sample::<ProgressionRng>(&mut self.context, scale)?;
        let overloaded = self.context.population().hospital_load() > self.history.hospital_capacity;
        let mortality = mortality_probability(
            &self.profile,
            severity,
            band,
            overloaded,
            self.overflow_mortality_multiplier,
            severity_protection,
        );
        let outcome = if self.context.sample_bool::<ProgressionRng>(mortality) {
            DiseaseState::Deceased
        } else {
            DiseaseState::Recovered
        };
        self.queue.schedule(day.saturating_add(duration), node, outcome);
        trace!("node {node} became infectious ({severity:?}) on day {day}");
        Ok(())
    }

    fn apply_interventions(&mut self, day: u32) -> Result<(), EpiError> {
        for intervention in self.schedule.interventions() {
            if intervention.start_day == day {
                info!("day {day}: {} starts", intervention.kind.label());
            }
            if intervention.end_day == Some(day) {
                info!("day {day}: {} ends", intervention.kind.label());
            }
        }
        self.measures = ActiveMeasures::evaluate(&self.schedule, day);

        measures::wane(&mut self.context, &self.profile, day)?;
        for campaign in &self.measures.vaccinations {
            let doses =
                measures::vaccinate(&mut self.context, &self.graph, &self.profile, campaign, day)?;
            self.tally.cumulative_vaccinations += doses;
        }
        for policy in &self.measures.testing {
            let isolated = measures::testing(&mut self.context, policy, &self.offspring, day);
            if isolated > 0 {
                debug!("day {day}: {isolated} nodes isolated after testing and tracing");
            }
        }
        Ok(())
    }

    fn record_snapshot(&mut self, day: u32) -> Result<(), EpiError> {
        let population = self.context.population();
        population.check_conservation(day)?;

        let counts = population.state_counts();
        let tally = self.tally;
        let snapshot = DaySnapshot {
            day,
            susceptible: counts[DiseaseState::Susceptible.index()],
            exposed: counts[DiseaseState::Exposed.index()],
            infectious: counts[DiseaseState::Infectious.index()],
            recovered: counts[DiseaseState::Recovered.index()],
            deceased: counts[DiseaseState::Deceased.index()],
            vaccinated: counts[DiseaseState::Vaccinated.index()],
            severity: SeverityCounts::from_array(population.infectious_by_severity()),
            new_infections: tally.new_infections,
            new_deaths: tally.new_deaths,
            new_hospitalizations: tally.new_hospitalizations,
            cumulative_infections: tally.cumulative_infections,
            cumulative_recoveries: tally.cumulative_recoveries,
            cumulative_deaths: tally.cumulative_deaths,
            cumulative_hospitalizations: tally.cumulative_hospitalizations,
            cumulative_vaccinations: tally.cumulative_vaccinations,
        };
        debug!(
            "day {day}: S={} E={} I={} R={} D={} V={} new={}",
            snapshot.susceptible,
            snapshot.exposed,
            snapshot.infectious,
            snapshot.recovered,
            snapshot.deceased,
            snapshot.vaccinated,
            snapshot.new_infections
        );
        self.history.snapshots.push(snapshot);

        self.tally.new_infections = 0;
        self.tally.new_deaths = 0;
        self.tally.new_hospitalizations = 0;
        Ok(())
    }
}

/// Builds an engine from the given parts and runs it to completion.
pub fn run(
    graph: Graph,
    profile: DiseaseProfile,
    schedule: InterventionSchedule,
    seed_spec: SeedSpec,
    options: RunOptions,
) -> Result<SimulationHistory, EpiError> {
    SimulationEngine::new(graph, profile, schedule, seed_spec, options)?.run()
}
