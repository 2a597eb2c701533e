/*!

The contact network. A [`Graph`] is built once by a [`GraphBuilder`] and is immutable afterward;
interventions never touch edge weights and instead supply multipliers that the transmission pass
reads alongside them.

Nodes are dense indices (`NodeId(0)..NodeId(n)`) into a vector of static [`NodeAttributes`].
Edges are stored once in an edge list and every node keeps the indices of its incident edges, so
iterating a node's neighbors follows edge-insertion order and is reproducible.

*/

mod builder;
mod demographics;
mod layered;
mod metrics;
mod topology;

pub use builder::{build, GraphBuilder, DEFAULT_MAX_POPULATION};
pub use metrics::NetworkInfo;
pub use topology::{LayeredParams, SizeRange, Topology};

use crate::{
    define_rng,
    error::EpiError,
    hashing::{HashMap, HashSet},
    NodeId,
};
use serde::{Deserialize, Serialize};

define_rng!(GraphRng);

/// The social setting an edge represents.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeType {
    Household,
    Workplace,
    School,
    Community,
}

impl EdgeType {
    pub const ALL: [EdgeType; 4] = [
        EdgeType::Household,
        EdgeType::Workplace,
        EdgeType::School,
        EdgeType::Community,
    ];

    #[must_use]
    pub fn index(self) -> usize {
        self as usize
    }
}

/// An undirected edge. `a < b` always holds.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub a: NodeId,
    pub b: NodeId,
    pub kind: EdgeType,
    /// Contact strength in `[0, 1]`.
    pub weight: f64,
}

impl Edge {
    /// The endpoint that is not `node`.
    #[must_use]
    pub fn other(&self, node: NodeId) -> NodeId {
        if self.a == node { self.b } else { self.a }
    }
}

/// Static demographic attributes of a node.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NodeAttributes {
    pub age: u8,
    pub mobility: f64,
    pub comorbidity: f64,
    pub household_id: usize,
    pub workplace_id: Option<usize>,
    pub school_id: Option<usize>,
}

#[derive(Clone, Debug)]
pub struct Graph {
    nodes: Vec<NodeAttributes>,
    edges: Vec<Edge>,
    // Indices into `edges` of the edges incident to each node
    adjacency: Vec<Vec<usize>>,
}

impl Graph {
    /// Assembles a graph from explicit parts. Edge endpoints may be given in either order.
    ///
    /// Fails with `InvalidParameter` on self-loops, duplicate pairs, endpoints out of range and
    /// weights outside `[0, 1]`.
    pub fn from_parts(nodes: Vec<NodeAttributes>, edges: Vec<Edge>) -> Result<Graph, EpiError> {
        let n = nodes.len();
        let mut seen: HashSet<(usize, usize)> = HashSet::default();
        let mut normalized = Vec::with_capacity(edges.len());

        for edge in edges {
            let (a, b) = (edge.a.index(), edge.b.index());
            if a >= n || b >= n {
                return Err(EpiError::InvalidParameter(format!(
                    "edge ({a}, {b}) refers to a node outside 0..{n}"
                )));
            }
            if a == b {
                return Err(EpiError::InvalidParameter(format!("self-loop on node {a}")));
            }
            if !(0.0..=1.0).contains(&edge.weight) {
                return Err(EpiError::InvalidParameter(format!(
                    "edge ({a}, {b}) has weight {} outside [0, 1]",
                    edge.weight
                )));
            }
            let key = (a.min(b), a.max(b));
            if !seen.insert(key) {
                return Err(EpiError::InvalidParameter(format!(
                    "duplicate edge ({}, {})",
                    key.0, key.1
                )));
            }
            normalized.push(Edge {
                a: NodeId(key.0),
                b: NodeId(key.1),
                ..edge
            });
        }

        Ok(Graph::assemble(nodes, normalized))
    }

    // Callers guarantee that the edges are already normalized and valid.
    fn assemble(nodes: Vec<NodeAttributes>, edges: Vec<Edge>) -> Graph {
        let mut adjacency = vec![Vec::new(); nodes.len()];
        for (index, edge) in edges.iter().enumerate() {
            adjacency[edge.a.index()].push(index);
            adjacency[edge.b.index()].push(index);
        }
        Graph {
            nodes,
            edges,
            adjacency,
        }
    }

    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    #[must_use]
    pub fn node(&self, node: NodeId) -> &NodeAttributes {
        &self.nodes[node.index()]
    }

    #[must_use]
    pub fn nodes(&self) -> &[NodeAttributes] {
        &self.nodes
    }

    #[must_use]
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + use<> {
        (0..self.nodes.len()).map(NodeId)
    }

    #[must_use]
    pub fn degree(&self, node: NodeId) -> usize {
        self.adjacency[node.index()].len()
    }

    /// Neighbors of `node` together with the connecting edge, in edge-insertion order.
    pub fn neighbors(&self, node: NodeId) -> impl Iterator<Item = (NodeId, &Edge)> + '_ {
        self.adjacency[node.index()].iter().map(move |&index| {
            let edge = &self.edges[index];
            (edge.other(node), edge)
        })
    }

    #[must_use]
    pub fn contains_edge(&self, a: NodeId, b: NodeId) -> bool {
        self.neighbors(a).any(|(other, _)| other == b)
    }

    /// `2E / N`, or zero for an empty graph.
    #[must_use]
    pub fn mean_degree(&self) -> f64 {
        if self.nodes.is_empty() {
            return 0.0;
        }
        2.0 * self.edges.len() as f64 / self.nodes.len() as f64
    }

    #[must_use]
    pub fn network_info(&self) -> NetworkInfo {
        metrics::analyze(self)
    }
}

/// Accumulates edges during construction while rejecting self-loops and duplicates.
pub(crate) struct EdgeSet {
    edges: Vec<Edge>,
    positions: HashMap<(usize, usize), usize>,
    degrees: Vec<usize>,
}

impl EdgeSet {
    pub(crate) fn new(node_count: usize) -> Self {
        EdgeSet {
            edges: Vec::new(),
            positions: HashMap::default(),
            degrees: vec![0; node_count],
        }
    }

    fn key(a: usize, b: usize) -> (usize, usize) {
        (a.min(b), a.max(b))
    }

    pub(crate) fn len(&self) -> usize {
        self.edges.len()
    }

    pub(crate) fn degree(&self, node: usize) -> usize {
        self.degrees[node]
    }

    pub(crate) fn contains(&self, a: usize, b: usize) -> bool {
        self.positions.contains_key(&Self::key(a, b))
    }

    /// Adds the edge unless it is a self-loop or already present. Returns whether it was added.
    pub(crate) fn insert(&mut self, a: usize, b: usize, kind: EdgeType, weight: f64) -> bool {
        if a == b {
            return false;
        }
        let key = Self::key(a, b);
        if self.positions.contains_key(&key) {
            return false;
        }
        self.positions.insert(key, self.edges.len());
        self.edges.push(Edge {
            a: NodeId(key.0),
            b: NodeId(key.1),
            kind,
            weight,
        });
        self.degrees[a] += 1;
        self.degrees[b] += 1;
        true
    }

    pub(crate) fn remove(&mut self, a: usize, b: usize) -> Option<Edge> {
        let position = self.positions.remove(&Self::key(a, b))?;
        let edge = self.edges.swap_remove(position);
        if let Some(moved) = self.edges.get(position) {
            self.positions
                .insert((moved.a.index(), moved.b.index()), position);
        }
        self.degrees[a] -= 1;
        self.degrees[b] -= 1;
        Some(edge)
    }

    pub(crate) fn into_graph(self, nodes: Vec<NodeAttributes>) -> Graph {
        Graph::assemble(nodes, self.edges)
    }
}
