//! Synthetic population attributes and group memberships shared by every topology.

use super::{topology::SizeRange, GraphRng, LayeredParams, NodeAttributes};
use crate::{context::Context, error::EpiError, random::ContextRandomExt};
use log::trace;
use rand_distr::Normal;
use std::ops::RangeInclusive;

/// `(youngest, oldest, share)` of each age band.
const AGE_BANDS: [(u8, u8, f64); 9] = [
    (0, 4, 0.06),
    (5, 14, 0.12),
    (15, 24, 0.13),
    (25, 34, 0.13),
    (35, 44, 0.12),
    (45, 54, 0.11),
    (55, 64, 0.10),
    (65, 74, 0.08),
    (75, 90, 0.05),
];

pub(crate) const SCHOOL_AGES: RangeInclusive<u8> = 5..=18;
pub(crate) const WORKING_AGES: RangeInclusive<u8> = 19..=64;

const MOBILITY_NOISE: f64 = 0.1;
const COMORBIDITY_NOISE: f64 = 0.05;

/// Node attributes plus the member lists of every group, indexed by group id.
pub(crate) struct Demographics {
    pub(crate) nodes: Vec<NodeAttributes>,
    pub(crate) households: Vec<Vec<usize>>,
    pub(crate) workplaces: Vec<Vec<usize>>,
    pub(crate) schools: Vec<Vec<usize>>,
}

pub(crate) fn generate(
    context: &mut Context,
    population_size: usize,
    params: &LayeredParams,
) -> Result<Demographics, EpiError> {
    let band_weights: Vec<f64> = AGE_BANDS.iter().map(|band| band.2).collect();
    let mut ages = Vec::with_capacity(population_size);
    for _ in 0..population_size {
        let band = context
            .sample_weighted::<GraphRng>(&band_weights)
            .map_err(|e| EpiError::Internal(format!("age band weights: {e}")))?;
        let (youngest, oldest, _) = AGE_BANDS[band];
        ages.push(context.sample_range::<GraphRng, _, u8>(youngest..=oldest));
    }

    // Households: a random ordering of everybody cut into consecutive chunks.
    let mut order: Vec<usize> = (0..population_size).collect();
    context.shuffle::<GraphRng, _>(&mut order);
    let mut household_of = vec![0; population_size];
    let mut households = Vec::new();
    let mut rest = order.as_slice();
    while !rest.is_empty() {
        let size = context
            .sample_weighted::<GraphRng>(&params.household_size_weights)
            .map_err(|e| EpiError::InvalidParameter(format!("household_size_weights: {e}")))?
            + 1;
        let (members, remaining) = rest.split_at(size.min(rest.len()));
        for &node in members {
            household_of[node] = households.len();
        }
        households.push(members.to_vec());
        rest = remaining;
    }

    let students: Vec<usize> = (0..population_size)
        .filter(|&node| SCHOOL_AGES.contains(&ages[node]))
        .collect();
    let mut workers = Vec::new();
    for node in 0..population_size {
        if WORKING_AGES.contains(&ages[node])
            && context.sample_bool::<GraphRng>(params.employment_rate)
        {
            workers.push(node);
        }
    }

    let schools = partition(context, &students, params.school_size);
    let workplaces = partition(context, &workers, params.workplace_size);

    let mut school_of = vec![None; population_size];
    for (school_id, members) in schools.iter().enumerate() {
        for &node in members {
            school_of[node] = Some(school_id);
        }
    }
    let mut workplace_of = vec![None; population_size];
    for (workplace_id, members) in workplaces.iter().enumerate() {
        for &node in members {
            workplace_of[node] = Some(workplace_id);
        }
    }

    let mobility_noise = Normal::new(0.0, MOBILITY_NOISE)
        .map_err(|e| EpiError::Internal(format!("mobility noise: {e}")))?;
    let comorbidity_noise = Normal::new(0.0, COMORBIDITY_NOISE)
        .map_err(|e| EpiError::Internal(format!("comorbidity noise: {e}")))?;

    let mut nodes = Vec::with_capacity(population_size);
    for node in 0..population_size {
        let age = ages[node];
        let mut mobility = base_mobility(age);
        if school_of[node].is_some() {
            mobility *= 1.2;
        } else if workplace_of[node].is_some() {
            mobility *= 1.1;
        }
        mobility += context.sample_distr::<GraphRng, f64>(mobility_noise);
        let comorbidity =
            base_comorbidity(age) + context.sample_distr::<GraphRng, f64>(comorbidity_noise);

        nodes.push(NodeAttributes {
            age,
            mobility: mobility.clamp(0.1, 0.95),
            comorbidity: comorbidity.clamp(0.0, 1.0),
            household_id: household_of[node],
            workplace_id: workplace_of[node],
            school_id: school_of[node],
        });
    }

    trace!(
        "generated {population_size} nodes in {} households, {} workplaces and {} schools",
        households.len(),
        workplaces.len(),
        schools.len()
    );

    Ok(Demographics {
        nodes,
        households,
        workplaces,
        schools,
    })
}

/// Cuts `members` into consecutive groups whose sizes are drawn uniformly from `size`. The last
/// group takes whatever is left.
fn partition(context: &mut Context, members: &[usize], size: SizeRange) -> Vec<Vec<usize>> {
    let mut groups = Vec::new();
    let mut rest = members;
    while !rest.is_empty() {
        let group_size = context.sample_range::<GraphRng, _, usize>(size.min..=size.max);
        let (group, remaining) = rest.split_at(group_size.clamp(1, rest.len()));
        groups.push(group.to_vec());
        rest = remaining;
    }
    groups
}

fn base_mobility(age: u8) -> f64 {
    match age {
        0..5 => 0.3,
        5..18 => 0.6,
        18..30 => 0.8,
        30..50 => 0.7,
        50..70 => 0.5,
        _ => 0.3,
    }
}

fn base_comorbidity(age: u8) -> f64 {
    match age {
        0..10 => 0.1,
        10..20 => 0.05,
        20..40 => 0.1,
        40..50 => 0.2,
        50..60 => 0.3,
        60..70 => 0.5,
        70..80 => 0.7,
        _ => 0.9,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn demographics(seed: u64, population_size: usize) -> Demographics {
        let mut context = Context::new();
        context.init_random(seed);
        generate(&mut context, population_size, &LayeredParams::default()).unwrap()
    }

    #[test]
    fn every_node_is_in_exactly_one_household() {
        let result = demographics(11, 500);
        let mut seen = vec![0; 500];
        for (household_id, members) in result.households.iter().enumerate() {
            assert!(!members.is_empty() && members.len() <= 5);
            for &node in members {
                seen[node] += 1;
                assert_eq!(result.nodes[node].household_id, household_id);
            }
        }
        assert!(seen.iter().all(|&count| count == 1));
    }

    #[test]
    fn memberships_follow_age() {
        let result = demographics(12, 2000);
        for node in &result.nodes {
            assert!(node.workplace_id.is_none() || node.school_id.is_none());
            if node.school_id.is_some() {
                assert!(SCHOOL_AGES.contains(&node.age));
            }
            if node.workplace_id.is_some() {
                assert!(WORKING_AGES.contains(&node.age));
            }
            if SCHOOL_AGES.contains(&node.age) {
                assert!(node.school_id.is_some());
            }
            assert!((0.1..=0.95).contains(&node.mobility));
            assert!((0.0..=1.0).contains(&node.comorbidity));
            assert!(node.age <= 90);
        }
        // Every group but the last fits within the configured size range.
        let params = LayeredParams::default();
        let schools = &result.schools[..result.schools.len().saturating_sub(1)];
        assert!(schools
            .iter()
            .all(|s| (params.school_size.min..=params.school_size.max).contains(&s.len())));
    }

    #[test]
    fn same_seed_same_population() {
        assert_eq!(demographics(5, 300).nodes, demographics(5, 300).nodes);
    }
}
