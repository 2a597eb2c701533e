//! Choice of the initially exposed nodes.

use crate::{
    context::Context, define_rng, error::EpiError, graph::Graph, hashing::HashSet,
    random::ContextRandomExt, NodeId,
};
use log::warn;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

define_rng!(SeedingRng);

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeedMethod {
    /// Uniformly random nodes.
    #[default]
    Random,
    HighestDegree,
    HighestMobility,
    /// A breadth-first neighborhood of a random node.
    Cluster,
    /// Random nodes with an age in `min_age..=max_age`.
    AgeTargeted { min_age: u8, max_age: u8 },
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedSpec {
    pub count: usize,
    #[serde(default)]
    pub method: SeedMethod,
}

impl Default for SeedSpec {
    fn default() -> Self {
        SeedSpec::random(5)
    }
}

impl SeedSpec {
    #[must_use]
    pub fn random(count: usize) -> Self {
        SeedSpec {
            count,
            method: SeedMethod::Random,
        }
    }

    #[must_use]
    pub fn new(count: usize, method: SeedMethod) -> Self {
        SeedSpec { count, method }
    }

    pub fn validate(&self, population_size: usize) -> Result<(), EpiError> {
        if self.count > population_size {
            return Err(EpiError::InvalidParameter(format!(
                "cannot seed {} infections in a population of {population_size}",
                self.count
            )));
        }
        if let SeedMethod::AgeTargeted { min_age, max_age } = self.method {
            if min_age > max_age {
                return Err(EpiError::InvalidParameter(format!(
                    "age-targeted seeding range {min_age}..={max_age} is empty"
                )));
            }
        }
        Ok(())
    }
}

/// Selects the seed nodes. The result has exactly `seed_spec.count` distinct nodes, except for
/// age-targeted seeding with too few eligible nodes, which seeds every eligible node.
pub(crate) fn select_seeds(
    context: &mut Context,
    graph: &Graph,
    seed_spec: &SeedSpec,
) -> Result<Vec<NodeId>, EpiError> {
    seed_spec.validate(graph.node_count())?;
    if seed_spec.count == 0 {
        return Ok(Vec::new());
    }

    let mut seeds: Vec<NodeId> = match seed_spec.method {
        SeedMethod::Random => {
            let mut nodes: Vec<NodeId> = graph.node_ids().collect();
            context.shuffle::<SeedingRng, _>(&mut nodes);
            nodes
        }
        SeedMethod::HighestDegree => {
            let mut nodes: Vec<NodeId> = graph.node_ids().collect();
            nodes.sort_by_key(|&node| std::cmp::Reverse(graph.degree(node)));
            nodes
        }
        SeedMethod::HighestMobility => {
            let mut nodes: Vec<NodeId> = graph.node_ids().collect();
            nodes.sort_by(|&a, &b| graph.node(b).mobility.total_cmp(&graph.node(a).mobility));
            nodes
        }
        SeedMethod::Cluster => cluster(context, graph, seed_spec.count),
        SeedMethod::AgeTargeted { min_age, max_age } => {
            let mut nodes: Vec<NodeId> = graph
                .node_ids()
                .filter(|&node| (min_age..=max_age).contains(&graph.node(node).age))
                .collect();
            if nodes.len() < seed_spec.count {
                warn!(
                    "only {} nodes aged {min_age}..={max_age} are available for {} seeds",
                    nodes.len(),
                    seed_spec.count
                );
            }
            context.shuffle::<SeedingRng, _>(&mut nodes);
            nodes
        }
    };
    seeds.truncate(seed_spec.count);
    Ok(seeds)
}

/// Breadth-first search from a random start, restarting from another random unvisited node
/// whenever a component runs out before `count` nodes are collected.
fn cluster(context: &mut Context, graph: &Graph, count: usize) -> Vec<NodeId> {
    let mut visited: HashSet<NodeId> = HashSet::default();
    let mut order = Vec::with_capacity(count);

    while order.len() < count {
        let unvisited: Vec<NodeId> = graph.node_ids().filter(|node| !visited.contains(node)).collect();
        let start = unvisited[context.sample_range::<SeedingRng, _, usize>(0..unvisited.len())];

        let mut queue = VecDeque::from([start]);
        visited.insert(start);
        while let Some(node) = queue.pop_front() {
            order.push(node);
            if order.len() == count {
                break;
            }
            for (neighbor, _) in graph.neighbors(node) {
                if visited.insert(neighbor) {
                    queue.push_back(neighbor);
                }
            }
        }
    }
    order
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{
        tests::{attributes, edge},
        Graph, GraphBuilder, Topology,
    };

    fn path_graph(n: usize) -> Graph {
        let edges = (0..n - 1).map(|i| edge(i, i + 1)).collect();
        Graph::from_parts(attributes(n), edges).unwrap()
    }

    fn seeded_context() -> Context {
        let mut context = Context::new();
        context.init_random(17);
        context
    }

    #[test]
    fn too_many_seeds_are_rejected() {
        let graph = path_graph(4);
        let result = select_seeds(&mut seeded_context(), &graph, &SeedSpec::random(5));
        assert!(matches!(result, Err(EpiError::InvalidParameter(_))));
    }

    #[test]
    fn random_seeds_are_distinct() {
        let graph = path_graph(50);
        let seeds = select_seeds(&mut seeded_context(), &graph, &SeedSpec::random(20)).unwrap();
        let unique: HashSet<NodeId> = seeds.iter().copied().collect();
        assert_eq!(unique.len(), 20);
    }

    #[test]
    fn highest_degree_picks_the_hub() {
        // Star around node 3 plus a separate edge
        let edges = vec![edge(3, 0), edge(3, 1), edge(3, 2), edge(3, 4), edge(5, 6)];
        let graph = Graph::from_parts(attributes(7), edges).unwrap();
        let seed_spec = SeedSpec::new(1, SeedMethod::HighestDegree);
        assert_eq!(
            select_seeds(&mut seeded_context(), &graph, &seed_spec).unwrap(),
            vec![NodeId(3)]
        );
    }

    #[test]
    fn cluster_seeds_are_contiguous_on_a_path() {
        let graph = path_graph(100);
        let seed_spec = SeedSpec::new(5, SeedMethod::Cluster);
        let mut seeds = select_seeds(&mut seeded_context(), &graph, &seed_spec).unwrap();
        seeds.sort();
        let span = seeds[4].index() - seeds[0].index();
        assert_eq!(span, 4);
    }

    #[test]
    fn cluster_crosses_components_when_needed() {
        let graph = Graph::from_parts(attributes(6), vec![edge(0, 1)]).unwrap();
        let seed_spec = SeedSpec::new(6, SeedMethod::Cluster);
        let seeds = select_seeds(&mut seeded_context(), &graph, &seed_spec).unwrap();
        assert_eq!(seeds.len(), 6);
    }

    #[test]
    fn age_targeted_seeds_respect_the_range() {
        let mut context = seeded_context();
        let graph = GraphBuilder::new(500, Topology::default())
            .build(&mut context)
            .unwrap();
        let seed_spec = SeedSpec::new(
            10,
            SeedMethod::AgeTargeted {
                min_age: 65,
                max_age: 90,
            },
        );
        let seeds = select_seeds(&mut context, &graph, &seed_spec).unwrap();
        assert_eq!(seeds.len(), 10);
        assert!(seeds.iter().all(|&node| graph.node(node).age >= 65));

        let scarce = SeedSpec::new(
            3,
            SeedMethod::AgeTargeted {
                min_age: 200,
                max_age: 255,
            },
        );
        assert!(select_seeds(&mut context, &graph, &scarce).unwrap().is_empty());
    }
}
