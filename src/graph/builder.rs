use super::{
    demographics, layered, EdgeSet, EdgeType, Graph, GraphRng, LayeredParams, Topology,
};
use crate::{context::Context, error::EpiError, random::ContextRandomExt};
use log::{debug, info};
use rand::Rng;

/// Largest population accepted unless a builder raises or lowers the ceiling.
pub const DEFAULT_MAX_POPULATION: usize = 250_000;

// Topologies without layers connect nodes with community edges of full strength.
const PLAIN_EDGE: (EdgeType, f64) = (EdgeType::Community, 1.0);

/// Builds a [`Graph`] for a population size and topology.
///
/// ```rust
/// # use epinet_core::{Context, ContextRandomExt, GraphBuilder, Topology};
/// let mut context = Context::new();
/// context.init_random(42);
/// let graph = GraphBuilder::new(200, Topology::ScaleFree { edges_per_node: 2 })
///     .build(&mut context)
///     .unwrap();
/// assert_eq!(graph.node_count(), 200);
/// ```
#[derive(Clone, Debug)]
pub struct GraphBuilder {
    population_size: usize,
    topology: Topology,
    max_population: usize,
}

impl GraphBuilder {
    #[must_use]
    pub fn new(population_size: usize, topology: Topology) -> Self {
        GraphBuilder {
            population_size,
            topology,
            max_population: DEFAULT_MAX_POPULATION,
        }
    }

    #[must_use]
    pub fn with_max_population(mut self, ceiling: usize) -> Self {
        self.max_population = ceiling;
        self
    }

    /// Checks the population size and topology parameters without drawing anything.
    pub fn validate(&self) -> Result<(), EpiError> {
        if self.population_size == 0 {
            return Err(EpiError::InvalidParameter(
                "population size must be at least 1".to_string(),
            ));
        }
        if self.population_size > self.max_population {
            return Err(EpiError::CapacityExceeded {
                requested: self.population_size,
                ceiling: self.max_population,
            });
        }
        self.topology.validate(self.population_size)
    }

    /// Generates the graph with the `GraphRng` stream of `context`.
    pub fn build(&self, context: &mut Context) -> Result<Graph, EpiError> {
        self.validate()?;
        let n = self.population_size;
        info!("building a {} network of {n} nodes", self.topology.name());

        let defaults = LayeredParams::default();
        let params = match &self.topology {
            Topology::Layered(params) => params,
            _ => &defaults,
        };
        let demographics = demographics::generate(context, n, params)?;

        let edges = match &self.topology {
            Topology::RandomGraph { edge_probability } => {
                random_graph(context, n, *edge_probability)
            }
            Topology::SmallWorld {
                neighbors,
                rewire_probability,
            } => small_world(context, n, *neighbors, *rewire_probability),
            Topology::ScaleFree { edges_per_node } => scale_free(context, n, *edges_per_node),
            Topology::Community {
                communities,
                intra_probability,
                inter_probability,
            } => community(context, n, *communities, *intra_probability, *inter_probability),
            Topology::Layered(params) => layered::build_layers(context, &demographics, params),
        };

        let graph = edges.into_graph(demographics.nodes);
        debug!(
            "network built: {} edges, mean degree {:.2}",
            graph.edge_count(),
            graph.mean_degree()
        );
        Ok(graph)
    }
}

/// Shorthand for `GraphBuilder::new(population_size, topology.clone()).build(context)`.
pub fn build(
    context: &mut Context,
    population_size: usize,
    topology: &Topology,
) -> Result<Graph, EpiError> {
    GraphBuilder::new(population_size, topology.clone()).build(context)
}

fn random_graph(context: &mut Context, n: usize, p: f64) -> EdgeSet {
    let mut edges = EdgeSet::new(n);
    context.sample::<GraphRng, _>(|rng| {
        for a in 0..n {
            for b in a + 1..n {
                if rng.random::<f64>() < p {
                    edges.insert(a, b, PLAIN_EDGE.0, PLAIN_EDGE.1);
                }
            }
        }
    });
    edges
}

/// Ring lattice plus rewiring. Each lattice edge `(u, u + j)` is, with probability `p`, replaced
/// by `(u, w)` for a uniformly chosen `w` not already adjacent to `u`.
fn small_world(context: &mut Context, n: usize, k: usize, p: f64) -> EdgeSet {
    let mut edges = EdgeSet::new(n);
    for j in 1..=k / 2 {
        for u in 0..n {
            edges.insert(u, (u + j) % n, PLAIN_EDGE.0, PLAIN_EDGE.1);
        }
    }

    for j in 1..=k / 2 {
        for u in 0..n {
            let v = (u + j) % n;
            if !context.sample_bool::<GraphRng>(p) {
                continue;
            }
            // A node adjacent to everybody has nowhere to rewire to.
            if edges.degree(u) >= n - 1 || !edges.contains(u, v) {
                continue;
            }
            let w = loop {
                let candidate = context.sample_range::<GraphRng, _, usize>(0..n);
                if candidate != u && !edges.contains(u, candidate) {
                    break candidate;
                }
            };
            edges.remove(u, v);
            edges.insert(u, w, PLAIN_EDGE.0, PLAIN_EDGE.1);
        }
    }
    edges
}

/// Preferential attachment from a complete seed graph on `m + 1` nodes. Every edge endpoint is
/// appended to `repeated`, so a uniform draw from it picks nodes proportionally to degree.
fn scale_free(context: &mut Context, n: usize, m: usize) -> EdgeSet {
    let mut edges = EdgeSet::new(n);
    let mut repeated: Vec<usize> = Vec::with_capacity(2 * m * n);

    let seed_size = (m + 1).min(n);
    for a in 0..seed_size {
        for b in a + 1..seed_size {
            edges.insert(a, b, PLAIN_EDGE.0, PLAIN_EDGE.1);
            repeated.push(a);
            repeated.push(b);
        }
    }

    for new_node in seed_size..n {
        let mut targets: Vec<usize> = Vec::with_capacity(m);
        while targets.len() < m {
            let index = context.sample_range::<GraphRng, _, usize>(0..repeated.len());
            let candidate = repeated[index];
            if !targets.contains(&candidate) {
                targets.push(candidate);
            }
        }
        for target in targets {
            edges.insert(new_node, target, PLAIN_EDGE.0, PLAIN_EDGE.1);
            repeated.push(new_node);
            repeated.push(target);
        }
    }
    edges
}

/// Stochastic block model over `k` equal blocks; the last block absorbs the remainder.
fn community(context: &mut Context, n: usize, k: usize, intra: f64, inter: f64) -> EdgeSet {
    let block_size = n / k;
    let block_of = |node: usize| (node / block_size).min(k - 1);

    let mut edges = EdgeSet::new(n);
    context.sample::<GraphRng, _>(|rng| {
        for a in 0..n {
            for b in a + 1..n {
                let p = if block_of(a) == block_of(b) { intra } else { inter };
                if rng.random::<f64>() < p {
                    edges.insert(a, b, PLAIN_EDGE.0, PLAIN_EDGE.1);
                }
            }
        }
    });
    edges
}
