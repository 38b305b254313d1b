use std::cell::OnceCell;
use std::collections::BTreeSet;

use super::model::MultiGraph;

/// Memoized graph measures; cleared by every structural mutation.
#[derive(Debug, Default)]
pub struct AnalysisCache {
    biconnected: OnceCell<Vec<Vec<usize>>>,
    clustering: OnceCell<Vec<f64>>,
    conductance: OnceCell<Vec<f64>>,
}

impl AnalysisCache {
    pub fn invalidate(&mut self) {
        self.biconnected.take();
        self.clustering.take();
        self.conductance.take();
    }

    #[cfg(test)]
    pub fn is_populated(&self) -> bool {
        self.biconnected.get().is_some()
            || self.clustering.get().is_some()
            || self.conductance.get().is_some()
    }

    pub fn biconnected_components(&self, graph: &MultiGraph) -> &[Vec<usize>] {
        self.biconnected.get_or_init(|| biconnected_components(graph))
    }

    pub fn clustering_coefficients(&self, graph: &MultiGraph) -> &[f64] {
        self.clustering.get_or_init(|| {
            (0..graph.node_count())
                .map(|index| clustering_coefficient(graph, index))
                .collect()
        })
    }

    pub fn component_conductance(&self, graph: &MultiGraph) -> &[f64] {
        let components = self.biconnected_components(graph);
        self.conductance.get_or_init(|| {
            components
                .iter()
                .map(|component| conductance(graph, &component.iter().copied().collect()))
                .collect()
        })
    }
}

fn simple_adjacency(graph: &MultiGraph) -> Vec<Vec<usize>> {
    (0..graph.node_count())
        .map(|index| {
            graph
                .neighbors(index)
                .filter(|&neighbor| neighbor != index)
                .collect()
        })
        .collect()
}

fn biconnected_components(graph: &MultiGraph) -> Vec<Vec<usize>> {
    let adjacency = simple_adjacency(graph);
    let node_count = adjacency.len();
    let mut discovery = vec![usize::MAX; node_count];
    let mut low = vec![0usize; node_count];
    let mut time = 0usize;
    let mut edge_stack: Vec<(usize, usize)> = Vec::new();
    let mut components = Vec::new();

    for root in 0..node_count {
        if discovery[root] != usize::MAX {
            continue;
        }

        discovery[root] = time;
        low[root] = time;
        time += 1;
        let mut stack = vec![(root, usize::MAX, 0usize)];

        while let Some(&(node, parent, cursor)) = stack.last() {
            if let Some(&next) = adjacency[node].get(cursor) {
                if let Some(top) = stack.last_mut() {
                    top.2 += 1;
                }

                if discovery[next] == usize::MAX {
                    edge_stack.push((node, next));
                    discovery[next] = time;
                    low[next] = time;
                    time += 1;
                    stack.push((next, node, 0));
                } else if next != parent && discovery[next] < discovery[node] {
                    edge_stack.push((node, next));
                    low[node] = low[node].min(discovery[next]);
                }
                continue;
            }

            stack.pop();
            let Some(&(up, _, _)) = stack.last() else {
                continue;
            };
            low[up] = low[up].min(low[node]);

            if low[node] >= discovery[up] {
                let mut members = BTreeSet::new();
                while let Some((a, b)) = edge_stack.pop() {
                    members.insert(a);
                    members.insert(b);
                    if (a, b) == (up, node) {
                        break;
                    }
                }
                components.push(members.into_iter().collect());
            }
        }
    }

    components
}

fn clustering_coefficient(graph: &MultiGraph, index: usize) -> f64 {
    let neighbors = graph
        .neighbors(index)
        .filter(|&neighbor| neighbor != index)
        .collect::<Vec<_>>();
    let degree = neighbors.len();
    if degree < 2 {
        return 0.0;
    }

    let mut closed = 0usize;
    for (position, &a) in neighbors.iter().enumerate() {
        for &b in &neighbors[position + 1..] {
            if graph.link(a, b).is_some() {
                closed += 1;
            }
        }
    }

    (2 * closed) as f64 / (degree * (degree - 1)) as f64
}

/// `cut(S) / min(vol(S), vol(V \ S))` over link weights; 0 when undefined.
pub fn conductance(graph: &MultiGraph, members: &BTreeSet<usize>) -> f64 {
    let mut cut = 0u64;
    let mut member_volume = 0u64;
    let mut total_volume = 0u64;

    for (from, to, link) in graph.links() {
        total_volume += link.weight;
        if members.contains(&from) {
            member_volume += link.weight;
            if !members.contains(&to) {
                cut += link.weight;
            }
        }
    }

    let denominator = member_volume.min(total_volume - member_volume);
    if denominator == 0 {
        0.0
    } else {
        cut as f64 / denominator as f64
    }
}
