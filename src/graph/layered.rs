//! The household, workplace, school and community layers of the composite network.

use super::{demographics::Demographics, EdgeSet, EdgeType, GraphRng, LayeredParams};
use crate::{context::Context, random::ContextRandomExt};
use log::trace;

// Bound on community sampling attempts per wanted edge, so that near-complete graphs terminate.
const ATTEMPTS_PER_EDGE: usize = 20;

pub(crate) fn build_layers(
    context: &mut Context,
    demographics: &Demographics,
    params: &LayeredParams,
) -> EdgeSet {
    let population_size = demographics.nodes.len();
    let mut edges = EdgeSet::new(population_size);

    for household in &demographics.households {
        for (i, &a) in household.iter().enumerate() {
            for &b in &household[i + 1..] {
                edges.insert(a, b, EdgeType::Household, params.household_weight);
            }
        }
    }
    let household_edges = edges.len();

    // A pair that already shares a household keeps its household edge.
    for workplace in &demographics.workplaces {
        connect_group(
            context,
            &mut edges,
            workplace,
            params.workplace_contact_probability,
            EdgeType::Workplace,
            params.workplace_weight,
        );
    }
    for school in &demographics.schools {
        connect_group(
            context,
            &mut edges,
            school,
            params.school_contact_probability,
            EdgeType::School,
            params.school_weight,
        );
    }
    let setting_edges = edges.len() - household_edges;

    if population_size >= 2 {
        let free_pairs = (population_size * (population_size - 1) / 2).saturating_sub(edges.len());
        let wanted = ((params.community_mean_degree * population_size as f64 / 2.0).round() as usize)
            .min(free_pairs);
        let max_attempts = wanted.saturating_mul(ATTEMPTS_PER_EDGE);
        let mut added = 0;
        let mut attempts = 0;
        while added < wanted && attempts < max_attempts {
            attempts += 1;
            let a = context.sample_range::<GraphRng, _, usize>(0..population_size);
            let b = context.sample_range::<GraphRng, _, usize>(0..population_size);
            if edges.insert(a, b, EdgeType::Community, params.community_weight) {
                added += 1;
            }
        }
        add_hubs(context, &mut edges, demographics, params);
    }

    trace!(
        "layered network: {household_edges} household, {setting_edges} workplace/school, {} community edges",
        edges.len() - household_edges - setting_edges
    );
    edges
}

fn connect_group(
    context: &mut Context,
    edges: &mut EdgeSet,
    members: &[usize],
    probability: f64,
    kind: EdgeType,
    weight: f64,
) {
    for (i, &a) in members.iter().enumerate() {
        for &b in &members[i + 1..] {
            if context.sample_bool::<GraphRng>(probability) {
                edges.insert(a, b, kind, weight);
            }
        }
    }
}

/// The most mobile nodes become hubs and each attempts a random number of extra community
/// contacts with uniformly chosen partners.
fn add_hubs(
    context: &mut Context,
    edges: &mut EdgeSet,
    demographics: &Demographics,
    params: &LayeredParams,
) {
    let population_size = demographics.nodes.len();
    let hub_count = ((params.hub_fraction * population_size as f64).ceil() as usize).min(population_size);
    if hub_count == 0 {
        return;
    }

    let mut by_mobility: Vec<usize> = (0..population_size).collect();
    by_mobility.sort_by(|&a, &b| {
        demographics.nodes[b]
            .mobility
            .total_cmp(&demographics.nodes[a].mobility)
    });

    // A hub cannot gain more partners than there are other nodes.
    let max = params.hub_extra_contacts.max.min(population_size - 1);
    let min = params.hub_extra_contacts.min.min(max);
    for &hub in &by_mobility[..hub_count] {
        let contacts = context.sample_range::<GraphRng, _, usize>(min..=max);
        for _ in 0..contacts {
            let target = context.sample_range::<GraphRng, _, usize>(0..population_size);
            edges.insert(hub, target, EdgeType::Community, params.community_weight);
        }
    }
    trace!("added {hub_count} hub nodes");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{demographics::generate, SizeRange};

    fn layered(params: &LayeredParams, seed: u64, population_size: usize) -> (Demographics, EdgeSet) {
        let mut context = Context::new();
        context.init_random(seed);
        let demographics = generate(&mut context, population_size, params).unwrap();
        let edges = build_layers(&mut context, &demographics, params);
        (demographics, edges)
    }

    #[test]
    fn households_are_complete_subgraphs() {
        let (demographics, edges) = layered(&LayeredParams::default(), 3, 400);
        for household in &demographics.households {
            for (i, &a) in household.iter().enumerate() {
                for &b in &household[i + 1..] {
                    assert!(edges.contains(a, b));
                }
            }
        }
    }

    #[test]
    fn layer_edges_stay_inside_their_groups() {
        let params = LayeredParams {
            hub_fraction: 0.0,
            community_mean_degree: 0.0,
            ..LayeredParams::default()
        };
        let (demographics, edges) = layered(&params, 4, 600);
        let graph = edges.into_graph(demographics.nodes);
        for edge in graph.edges() {
            let a = graph.node(edge.a);
            let b = graph.node(edge.b);
            match edge.kind {
                EdgeType::Household => assert_eq!(a.household_id, b.household_id),
                EdgeType::Workplace => {
                    assert!(a.workplace_id.is_some());
                    assert_eq!(a.workplace_id, b.workplace_id);
                    assert!((edge.weight - 0.6).abs() < 1e-12);
                }
                EdgeType::School => {
                    assert!(a.school_id.is_some());
                    assert_eq!(a.school_id, b.school_id);
                }
                EdgeType::Community => panic!("no community edges were requested"),
            }
        }
    }

    #[test]
    fn hubs_raise_the_maximum_degree() {
        let without = LayeredParams {
            hub_fraction: 0.0,
            ..LayeredParams::default()
        };
        let (d1, plain) = layered(&without, 9, 1000);
        let (d2, hubbed) = layered(&LayeredParams::default(), 9, 1000);
        let max_plain = (0..d1.nodes.len()).map(|n| plain.degree(n)).max().unwrap();
        let max_hubbed = (0..d2.nodes.len()).map(|n| hubbed.degree(n)).max().unwrap();
        // The runs share every draw up to the hub step, so the hub edges come on top.
        assert!(max_hubbed >= 20);
        assert!(max_hubbed >= max_plain);
        assert!(hubbed.len() >= plain.len() + 150);
    }

    #[test]
    fn oversized_contact_targets_stop_at_a_complete_graph() {
        let params = LayeredParams {
            community_mean_degree: 1e30,
            hub_fraction: 1.0,
            hub_extra_contacts: SizeRange::new(usize::MAX - 1, usize::MAX),
            ..LayeredParams::default()
        };
        let (demographics, edges) = layered(&params, 5, 10);
        assert_eq!(demographics.nodes.len(), 10);
        assert!(edges.len() <= 45);
        for node in 0..10 {
            assert!(edges.degree(node) <= 9);
        }
    }
}
