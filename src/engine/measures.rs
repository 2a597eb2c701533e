//! Node-level effects of the active interventions: vaccine waning, vaccination campaigns and
//! testing with contact tracing.

use super::{state::ContextPopulationExt, DiseaseState};
use crate::{
    context::Context,
    define_rng,
    disease::DiseaseProfile,
    error::EpiError,
    graph::Graph,
    intervention::{TestingPolicy, VaccinationCampaign, VaccinationPriority},
    random::ContextRandomExt,
    NodeId,
};
use log::trace;
use std::cmp::Reverse;

define_rng!(InterventionRng);

/// Lets vaccine protection decay. Nodes whose protection falls below the profile threshold
/// lose it entirely, and a `Vaccinated` node becomes `Susceptible` again.
///
/// Returns the number of nodes that lost their protection.
pub(crate) fn wane(
    context: &mut Context,
    profile: &DiseaseProfile,
    day: u32,
) -> Result<usize, EpiError> {
    let vaccine = &profile.vaccine;
    let population = context.population_mut();
    let protected: Vec<NodeId> = population
        .iter()
        .filter(|(_, state)| state.vaccine_protection > 0.0)
        .map(|(node, _)| node)
        .collect();

    let mut expired = 0;
    for node in protected {
        let state = population.get_mut(node);
        let since = day.saturating_sub(state.vaccination_day.unwrap_or(day));
        let remaining = vaccine.remaining_protection(state.vaccine_efficacy, since);
        if remaining >= vaccine.protection_threshold {
            state.vaccine_protection = remaining;
            continue;
        }
        state.vaccine_protection = 0.0;
        expired += 1;
        if state.disease_state == DiseaseState::Vaccinated {
            population.transition(node, DiseaseState::Susceptible, day)?;
            trace!("vaccine protection of node {node} expired on day {day}");
        }
    }
    Ok(expired)
}

/// Vaccinates up to `floor(daily_rate * population)` eligible nodes in priority order.
/// Susceptible and recovered nodes without current protection are eligible; only susceptible
/// ones given a protective dose change state.
///
/// Returns the number of doses given.
pub(crate) fn vaccinate(
    context: &mut Context,
    graph: &Graph,
    profile: &DiseaseProfile,
    campaign: &VaccinationCampaign,
    day: u32,
) -> Result<usize, EpiError> {
    let population = context.population();
    let quota = (campaign.daily_rate * population.len() as f64).floor() as usize;
    if quota == 0 {
        return Ok(0);
    }
    let mut eligible: Vec<NodeId> = population
        .iter()
        .filter(|(_, state)| {
            matches!(
                state.disease_state,
                DiseaseState::Susceptible | DiseaseState::Recovered
            ) && state.vaccine_protection == 0.0
        })
        .map(|(node, _)| node)
        .collect();

    match campaign.priority {
        VaccinationPriority::AgeDescending => {
            eligible.sort_by_key(|&node| Reverse(graph.node(node).age));
        }
        VaccinationPriority::DegreeDescending => {
            eligible.sort_by_key(|&node| Reverse(graph.degree(node)));
        }
        VaccinationPriority::MobilityDescending => eligible
            .sort_by(|&a, &b| graph.node(b).mobility.total_cmp(&graph.node(a).mobility)),
        VaccinationPriority::ComorbidityDescending => eligible.sort_by(|&a, &b| {
            graph
                .node(b)
                .comorbidity
                .total_cmp(&graph.node(a).comorbidity)
        }),
        VaccinationPriority::Random => context.shuffle::<InterventionRng, _>(&mut eligible),
    }
    eligible.truncate(quota);

    let efficacy = campaign
        .efficacy
        .unwrap_or(profile.vaccine.efficacy_infection);
    let population = context.population_mut();
    for &node in &eligible {
        let state = population.get_mut(node);
        state.vaccinated = true;
        state.vaccination_day = Some(day);
        state.vaccine_efficacy = efficacy;
        state.vaccine_protection = efficacy;
        // A dose without protection is recorded but leaves the node susceptible.
        if state.disease_state == DiseaseState::Susceptible && efficacy > 0.0 {
            population.transition(node, DiseaseState::Vaccinated, day)?;
        }
        trace!("vaccinated node {node} on day {day}");
    }
    Ok(eligible.len())
}

fn isolate(context: &mut Context, node: NodeId, policy: &TestingPolicy, day: u32) {
    let from = day.saturating_add(policy.delay_days);
    let state = context.population_mut().get_mut(node);
    state.isolated_from = Some(from);
    state.isolation_factor = 1.0 - policy.isolation_effectiveness;
    trace!("node {node} isolates from day {from}");
}

/// Tests `floor(daily_rate * infectious)` random infectious nodes that are not yet isolated.
/// Each positive is isolated, and so is each of its traced contacts with probability
/// `tracing_coverage`. `offspring[i]` lists the nodes infected by node `i`.
///
/// Returns the number of newly isolated nodes.
pub(crate) fn testing(
    context: &mut Context,
    policy: &TestingPolicy,
    offspring: &[Vec<NodeId>],
    day: u32,
) -> usize {
    let population = context.population();
    let quota =
        (policy.daily_rate * population.count(DiseaseState::Infectious) as f64).floor() as usize;
    if quota == 0 {
        return 0;
    }
    let mut candidates: Vec<NodeId> = population
        .iter()
        .filter(|(_, state)| {
            state.disease_state == DiseaseState::Infectious && state.isolated_from.is_none()
        })
        .map(|(node, _)| node)
        .collect();
    context.shuffle::<InterventionRng, _>(&mut candidates);
    candidates.truncate(quota);

    let mut isolated = 0;
    for node in candidates {
        // Traced earlier today
        if context.population().get(node).isolated_from.is_some() {
            continue;
        }
        if !context.sample_bool::<InterventionRng>(policy.accuracy) {
            continue;
        }
        isolate(context, node, policy, day);
        isolated += 1;

        let contacts = context
            .population()
            .get(node)
            .infected_by
            .into_iter()
            .chain(offspring[node.index()].iter().copied());
        let traceable: Vec<NodeId> = contacts
            .filter(|&contact| {
                let state = context.population().get(contact);
                state.disease_state.is_active() && state.isolated_from.is_none()
            })
            .collect();
        for contact in traceable {
            if context.sample_bool::<InterventionRng>(policy.tracing_coverage) {
                isolate(context, contact, policy, day);
                isolated += 1;
            }
        }
    }
    isolated
}
