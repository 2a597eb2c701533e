/*!

The daily transmission pass, in two phases.

1. From the unchanged state of the day, every (infectious node, susceptible neighbor) contact is
   turned into a candidate carrying its infection probability. Candidates are ordered by infector
   id and then by the infector's adjacency order.
2. Candidates are drawn in that order. The first successful draw for a target wins and later
   candidates for the same target are skipped without a draw.

The caller applies the returned exposures afterward, so nothing exposed today can transmit or be
counted as susceptible again within the same pass.

*/

use super::{state::ContextPopulationExt, DiseaseState};
use crate::{
    context::Context,
    define_rng,
    disease::DiseaseProfile,
    graph::Graph,
    intervention::ActiveMeasures,
    random::ContextRandomExt,
    NodeId,
};

define_rng!(TransmissionRng);

/// Per-contact transmission rate `r0 / (mean degree * mean infectious period)`, zero for a graph
/// without edges.
#[must_use]
pub fn base_rate(graph: &Graph, profile: &DiseaseProfile) -> f64 {
    let mean_degree = graph.mean_degree();
    if mean_degree == 0.0 {
        return 0.0;
    }
    profile.r0 / (mean_degree * profile.infectious_period.mean)
}

/// The multiplicative factors behind one contact's infection probability.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ContactFactors {
    pub base_rate: f64,
    pub edge_weight: f64,
    /// Layer and per-contact intervention multiplier for the edge.
    pub intervention: f64,
    /// Age-based susceptibility of the target.
    pub susceptibility: f64,
    /// Severity-based infectivity of the infector.
    pub infectivity: f64,
    /// Isolation multiplier of the infector.
    pub isolation: f64,
    /// Vaccine protection of the infector against onward transmission.
    pub transmission_protection: f64,
    /// Vaccine protection of the target against infection.
    pub infection_protection: f64,
    pub seasonality: f64,
}

impl ContactFactors {
    /// The product of all factors, clamped to `[0, 1]`.
    #[must_use]
    pub fn probability(&self) -> f64 {
        let p = self.base_rate
            * self.edge_weight
            * self.intervention
            * self.susceptibility
            * self.infectivity
            * self.isolation
            * (1.0 - self.transmission_protection)
            * (1.0 - self.infection_protection)
            * self.seasonality;
        if p.is_nan() { 0.0 } else { p.clamp(0.0, 1.0) }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) struct Exposure {
    pub(crate) infector: NodeId,
    pub(crate) target: NodeId,
}

struct Candidate {
    exposure: Exposure,
    probability: f64,
}

pub(crate) fn transmission_pass(
    context: &mut Context,
    graph: &Graph,
    profile: &DiseaseProfile,
    measures: &ActiveMeasures,
    base_rate: f64,
    day: u32,
) -> Vec<Exposure> {
    if base_rate == 0.0 {
        return Vec::new();
    }
    let candidates = collect_candidates(context, graph, profile, measures, base_rate, day);

    let mut exposed = vec![false; graph.node_count()];
    let mut exposures = Vec::new();
    for candidate in candidates {
        let target = candidate.exposure.target;
        if exposed[target.index()] {
            continue;
        }
        if context.sample_bool::<TransmissionRng>(candidate.probability) {
            exposed[target.index()] = true;
            exposures.push(candidate.exposure);
        }
    }
    exposures
}

fn collect_candidates(
    context: &Context,
    graph: &Graph,
    profile: &DiseaseProfile,
    measures: &ActiveMeasures,
    base_rate: f64,
    day: u32,
) -> Vec<Candidate> {
    let population = context.population();
    let seasonality = profile.seasonality.factor(day);
    let mut candidates = Vec::new();

    for (infector, infector_state) in population.iter() {
        if infector_state.disease_state != DiseaseState::Infectious {
            continue;
        }
        let infectivity = infector_state
            .severity
            .map_or(1.0, |severity| profile.severity.get(severity).infectivity);
        let transmission_protection =
            profile.vaccine.efficacy_transmission * infector_state.vaccine_strength();

        for (target, edge) in graph.neighbors(infector) {
            let target_state = population.get(target);
            if !target_state.disease_state.is_susceptible() {
                continue;
            }
            let factors = ContactFactors {
                base_rate,
                edge_weight: edge.weight,
                intervention: measures.edge_multiplier(edge.kind),
                susceptibility: profile.age_band(graph.node(target).age).susceptibility,
                infectivity,
                isolation: infector_state.isolation_multiplier(day),
                transmission_protection,
                infection_protection: target_state.vaccine_protection,
                seasonality,
            };
            let probability = factors.probability();
            if probability > 0.0 {
                candidates.push(Candidate {
                    exposure: Exposure { infector, target },
                    probability,
                });
            }
        }
    }
    candidates
}
