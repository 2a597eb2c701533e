use super::{EdgeType, Graph};
use crate::{hashing::HashSet, NodeId};
use serde::{Deserialize, Serialize};

/// Structural summary of a contact network.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NetworkInfo {
    pub node_count: usize,
    pub edge_count: usize,
    pub average_degree: f64,
    /// Mean local clustering coefficient; nodes of degree below two contribute zero.
    pub clustering_coefficient: f64,
    pub max_degree: usize,
    pub isolated_nodes: usize,
    pub connected_components: usize,
    pub largest_component: usize,
    /// Edge counts in `EdgeType::ALL` order.
    pub edges_by_type: [usize; 4],
}

impl NetworkInfo {
    #[must_use]
    pub fn edges_of_type(&self, kind: EdgeType) -> usize {
        self.edges_by_type[kind.index()]
    }
}

pub(crate) fn analyze(graph: &Graph) -> NetworkInfo {
    let n = graph.node_count();
    let mut edges_by_type = [0; 4];
    for edge in graph.edges() {
        edges_by_type[edge.kind.index()] += 1;
    }

    let degrees: Vec<usize> = graph.node_ids().map(|node| graph.degree(node)).collect();
    let (connected_components, largest_component) = components(graph);

    NetworkInfo {
        node_count: n,
        edge_count: graph.edge_count(),
        average_degree: graph.mean_degree(),
        clustering_coefficient: average_clustering(graph),
        max_degree: degrees.iter().copied().max().unwrap_or(0),
        isolated_nodes: degrees.iter().filter(|&&d| d == 0).count(),
        connected_components,
        largest_component,
        edges_by_type,
    }
}

fn average_clustering(graph: &Graph) -> f64 {
    let n = graph.node_count();
    if n == 0 {
        return 0.0;
    }
    let mut total = 0.0;
    let mut neighbor_set: HashSet<NodeId> = HashSet::default();
    for node in graph.node_ids() {
        let degree = graph.degree(node);
        if degree < 2 {
            continue;
        }
        neighbor_set.clear();
        neighbor_set.extend(graph.neighbors(node).map(|(other, _)| other));

        // Each triangle through `node` is seen once from each of its two other corners.
        let mut links = 0usize;
        for (neighbor, _) in graph.neighbors(node) {
            links += graph
                .neighbors(neighbor)
                .filter(|(second, _)| neighbor_set.contains(second))
                .count();
        }
        let possible = degree * (degree - 1);
        total += links as f64 / possible as f64;
    }
    total / n as f64
}

/// Union-find over the edge list. Returns the number of components and the size of the largest.
fn components(graph: &Graph) -> (usize, usize) {
    let n = graph.node_count();
    let mut parent: Vec<usize> = (0..n).collect();
    let mut size = vec![1usize; n];

    fn find(parent: &mut [usize], mut node: usize) -> usize {
        while parent[node] != node {
            parent[node] = parent[parent[node]];
            node = parent[node];
        }
        node
    }

    for edge in graph.edges() {
        let a = find(&mut parent, edge.a.index());
        let b = find(&mut parent, edge.b.index());
        if a == b {
            continue;
        }
        let (big, small) = if size[a] >= size[b] { (a, b) } else { (b, a) };
        parent[small] = big;
        size[big] += size[small];
    }

    let mut count = 0;
    let mut largest = 0;
    for node in 0..n {
        if find(&mut parent, node) == node {
            count += 1;
            largest = largest.max(size[node]);
        }
    }
    (count, largest)
}

#[cfg(test)]
mod tests {
    use crate::graph::{
        tests::{attributes, edge},
        Graph,
    };

    #[test]
    fn triangle_with_a_tail() {
        // 0-1-2 triangle, 2-3 tail, 4 isolated
        let graph = Graph::from_parts(
            attributes(5),
            vec![edge(0, 1), edge(1, 2), edge(0, 2), edge(2, 3)],
        )
        .unwrap();
        let info = graph.network_info();
        assert_eq!(info.edge_count, 4);
        assert_eq!(info.max_degree, 3);
        assert_eq!(info.isolated_nodes, 1);
        assert_eq!(info.connected_components, 2);
        assert_eq!(info.largest_component, 4);
        // Local clustering: 1, 1, 1/3, 0, 0
        assert!((info.clustering_coefficient - (7.0 / 3.0) / 5.0).abs() < 1e-12);
        assert_eq!(info.edges_of_type(crate::graph::EdgeType::Community), 4);
    }

    #[test]
    fn empty_edge_list() {
        let info = Graph::from_parts(attributes(3), vec![]).unwrap().network_info();
        assert_eq!(info.connected_components, 3);
        assert_eq!(info.largest_component, 1);
        assert_eq!(info.clustering_coefficient, 0.0);
        assert_eq!(info.average_degree, 0.0);
    }
}
