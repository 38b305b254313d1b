use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::records::BundleId;

use super::analysis::AnalysisCache;
use super::relationship::EdgeStyle;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LinkRef {
    pub weight: u64,
    pub bundles: BTreeSet<BundleId>,
    pub styles: BTreeSet<EdgeStyle>,
}

/// Multigraph over entity strings. A link `(from, to)` exists independently
/// of `(to, from)`; undirected use inserts both.
#[derive(Clone, Debug, Default)]
pub struct MultiGraph {
    entities: Vec<String>,
    index_by_entity: HashMap<String, usize>,
    adjacency: Vec<BTreeMap<usize, LinkRef>>,
    links_by_bundle: HashMap<BundleId, BTreeSet<(usize, usize)>>,
    link_count: usize,
}

impl MultiGraph {
    pub fn ensure_node(&mut self, entity: &str) -> usize {
        if let Some(&index) = self.index_by_entity.get(entity) {
            return index;
        }

        let index = self.entities.len();
        self.entities.push(entity.to_owned());
        self.index_by_entity.insert(entity.to_owned(), index);
        self.adjacency.push(BTreeMap::new());
        index
    }

    pub fn add_link(&mut self, from: usize, to: usize, bundle: BundleId) {
        let Some(neighbors) = self.adjacency.get_mut(from) else {
            return;
        };
        if to >= self.entities.len() {
            return;
        }

        let link = neighbors.entry(to).or_insert_with(|| {
            self.link_count += 1;
            LinkRef::default()
        });
        link.weight += 1;
        link.bundles.insert(bundle);
        self.links_by_bundle
            .entry(bundle)
            .or_default()
            .insert((from, to));
    }

    pub fn add_style(&mut self, from: usize, to: usize, style: EdgeStyle) {
        if let Some(link) = self
            .adjacency
            .get_mut(from)
            .and_then(|neighbors| neighbors.get_mut(&to))
        {
            link.styles.insert(style);
        }
    }

    pub fn node_count(&self) -> usize {
        self.entities.len()
    }

    pub fn link_count(&self) -> usize {
        self.link_count
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn index_of(&self, entity: &str) -> Option<usize> {
        self.index_by_entity.get(entity).copied()
    }

    pub fn entity(&self, index: usize) -> Option<&str> {
        self.entities.get(index).map(String::as_str)
    }

    pub fn entities(&self) -> &[String] {
        &self.entities
    }

    pub fn neighbors(&self, index: usize) -> impl Iterator<Item = usize> + '_ {
        self.adjacency
            .get(index)
            .into_iter()
            .flat_map(|neighbors| neighbors.keys().copied())
    }

    pub fn link(&self, from: usize, to: usize) -> Option<&LinkRef> {
        self.adjacency.get(from)?.get(&to)
    }

    pub fn weight(&self, from: usize, to: usize) -> u64 {
        self.link(from, to).map_or(0, |link| link.weight)
    }

    pub fn links(&self) -> impl Iterator<Item = (usize, usize, &LinkRef)> + '_ {
        self.adjacency
            .iter()
            .enumerate()
            .flat_map(|(from, neighbors)| neighbors.iter().map(move |(&to, link)| (from, to, link)))
    }

    /// Link references a record contributed to.
    pub fn links_for_bundle(&self, bundle: BundleId) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.links_by_bundle
            .get(&bundle)
            .into_iter()
            .flat_map(|links| links.iter().copied())
    }
}

#[derive(Debug, Default)]
pub struct GraphModel {
    pub directed: MultiGraph,
    pub undirected: MultiGraph,
    analysis: AnalysisCache,
}

impl GraphModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ensures both endpoints exist and returns their indices, which are the
    /// same in both views because nodes are always inserted pairwise.
    pub fn ensure_node(&mut self, entity: &str) -> usize {
        let index = self.directed.ensure_node(entity);
        let undirected_index = self.undirected.ensure_node(entity);
        debug_assert_eq!(index, undirected_index);
        self.analysis.invalidate();
        index
    }

    pub fn add_edge(&mut self, from: &str, to: &str, bundle: BundleId, style: EdgeStyle) {
        let from_index = self.ensure_node(from);
        let to_index = self.ensure_node(to);

        self.undirected.add_link(from_index, to_index, bundle);
        if from_index != to_index {
            self.undirected.add_link(to_index, from_index, bundle);
        }
        self.directed.add_link(from_index, to_index, bundle);
        self.directed.add_style(from_index, to_index, style);
        self.analysis.invalidate();
    }

    pub fn node_count(&self) -> usize {
        self.directed.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.directed.is_empty()
    }

    pub fn entities(&self) -> &[String] {
        self.directed.entities()
    }

    pub fn contains(&self, entity: &str) -> bool {
        self.directed.index_of(entity).is_some()
    }

    pub fn analysis(&self) -> &AnalysisCache {
        &self.analysis
    }

    /// Undirected edge list with each pair once, for layout and analysis.
    pub fn undirected_pairs(&self) -> Vec<(usize, usize)> {
        self.undirected
            .links()
            .filter(|(from, to, _link)| from < to)
            .map(|(from, to, _link)| (from, to))
            .collect()
    }

    pub fn biconnected_components(&self) -> &[Vec<usize>] {
        self.analysis.biconnected_components(&self.undirected)
    }

    pub fn clustering_coefficients(&self) -> &[f64] {
        self.analysis.clustering_coefficients(&self.undirected)
    }

    pub fn component_conductance(&self) -> &[f64] {
        self.analysis.component_conductance(&self.undirected)
    }

    pub fn conductance(&self, members: &BTreeSet<usize>) -> f64 {
        super::analysis::conductance(&self.undirected, members)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn undirected_links_are_symmetric() {
        let mut graph = GraphModel::new();
        graph.add_edge("a", "b", BundleId(0), EdgeStyle::Solid);
        graph.add_edge("a", "b", BundleId(1), EdgeStyle::Dotted);

        let a = graph.undirected.index_of("a").expect("a exists");
        let b = graph.undirected.index_of("b").expect("b exists");

        assert_eq!(graph.undirected.weight(a, b), 2);
        assert_eq!(graph.undirected.weight(b, a), 2);
        assert_eq!(graph.directed.weight(a, b), 2);
        assert_eq!(graph.directed.weight(b, a), 0);
        assert!(graph.directed.link(b, a).is_none());
    }

    #[test]
    fn directed_links_collect_styles_and_bundles() {
        let mut graph = GraphModel::new();
        graph.add_edge("a", "b", BundleId(3), EdgeStyle::Solid);
        graph.add_edge("a", "b", BundleId(4), EdgeStyle::LongDash);

        let link = graph.directed.link(0, 1).expect("link exists");
        assert_eq!(
            link.styles.iter().copied().collect::<Vec<_>>(),
            vec![EdgeStyle::Solid, EdgeStyle::LongDash]
        );
        assert_eq!(
            link.bundles.iter().copied().collect::<Vec<_>>(),
            vec![BundleId(3), BundleId(4)]
        );
        assert_eq!(graph.directed.links_for_bundle(BundleId(4)).collect::<Vec<_>>(), vec![(0, 1)]);
        assert_eq!(graph.directed.links_for_bundle(BundleId(9)).count(), 0);
    }

    #[test]
    fn self_links_count_once_in_undirected_view() {
        let mut graph = GraphModel::new();
        graph.add_edge("a", "a", BundleId(0), EdgeStyle::Solid);

        assert_eq!(graph.node_count(), 1);
        assert_eq!(graph.undirected.weight(0, 0), 1);
        assert_eq!(graph.undirected.link_count(), 1);
    }
}
