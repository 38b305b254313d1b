use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};

use tracing::{debug, info};

use crate::records::{NOT_SET, RecordSet};
use crate::settings::Settings;

use super::model::GraphModel;
use super::relationship::{NodeIcon, RelationshipSpec};
use super::world::{WorldPoint, WorldPositions};

/// Owns the working graph of one dataset and derives it from the active
/// relationship list.
#[derive(Debug)]
pub struct LinkGraph {
    graph: GraphModel,
    relationships: Vec<RelationshipSpec>,
    world: WorldPositions,
    retained: HashSet<String>,
    sticky_labels: BTreeSet<String>,
    icons: HashMap<String, NodeIcon>,
    recent: VecDeque<String>,
    recent_capacity: usize,
}

impl LinkGraph {
    pub fn new(settings: &Settings) -> Self {
        Self {
            graph: GraphModel::new(),
            relationships: Vec::new(),
            world: WorldPositions::new(settings.world_seed),
            retained: HashSet::new(),
            sticky_labels: BTreeSet::new(),
            icons: HashMap::new(),
            recent: VecDeque::new(),
            recent_capacity: settings.recent_capacity,
        }
    }

    pub fn graph(&self) -> &GraphModel {
        &self.graph
    }

    pub fn relationships(&self) -> &[RelationshipSpec] {
        &self.relationships
    }

    pub fn world(&self) -> &WorldPositions {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut WorldPositions {
        &mut self.world
    }

    pub fn recent(&self) -> impl Iterator<Item = &str> {
        self.recent.iter().map(String::as_str)
    }

    pub fn retained(&self) -> &HashSet<String> {
        &self.retained
    }

    pub fn sticky_labels(&self) -> &BTreeSet<String> {
        &self.sticky_labels
    }

    pub fn icon(&self, entity: &str) -> NodeIcon {
        self.icons.get(entity).copied().unwrap_or_default()
    }

    /// Adds and materializes `spec`. Returns false when the spec is already
    /// active or no tablet in `records` can resolve both of its fields.
    pub fn add_relationship(&mut self, spec: RelationshipSpec, records: &RecordSet) -> bool {
        if self.relationships.contains(&spec) {
            debug!(relationship = %spec, "relationship already active");
            return false;
        }

        let resolvable = records
            .tablets()
            .iter()
            .any(|tablet| tablet.can_resolve(&spec.from_field) && tablet.can_resolve(&spec.to_field));
        if !resolvable {
            debug!(relationship = %spec, "relationship fields absent from schema");
            return false;
        }

        let added = self.materialize(&spec, records);
        info!(relationship = %spec, links = added, nodes = self.graph.node_count(), "relationship added");

        self.remember(spec.encode());
        self.relationships.push(spec);
        true
    }

    pub fn remove_relationship(&mut self, spec: &RelationshipSpec, records: &RecordSet) -> bool {
        let Some(position) = self.relationships.iter().position(|active| active == spec) else {
            return false;
        };

        self.relationships.remove(position);
        info!(relationship = %spec, "relationship removed");
        self.rebuild(records);
        true
    }

    pub fn clear_relationships(&mut self) {
        self.relationships.clear();
        self.graph = GraphModel::new();
    }

    /// Rebuilds the graph from scratch against `records`, keeping every known
    /// world position so surviving entities stay where they were.
    pub fn rebuild(&mut self, records: &RecordSet) {
        self.graph = GraphModel::new();
        let relationships = self.relationships.clone();
        for spec in &relationships {
            self.materialize(spec, records);
        }
        info!(
            relationships = relationships.len(),
            nodes = self.graph.node_count(),
            links = self.graph.directed.link_count(),
            "graph rebuilt"
        );
    }

    pub fn retain(&mut self, entities: impl IntoIterator<Item = String>, records: &RecordSet) {
        self.retained = entities.into_iter().collect();
        info!(retained = self.retained.len(), "narrowing graph to retained nodes");
        self.rebuild(records);
    }

    pub fn clear_retained(&mut self, records: &RecordSet) {
        if self.retained.is_empty() {
            return;
        }
        self.retained.clear();
        self.rebuild(records);
    }

    pub fn toggle_sticky(&mut self, entity: &str) -> bool {
        if self.sticky_labels.remove(entity) {
            false
        } else {
            self.sticky_labels.insert(entity.to_owned());
            true
        }
    }

    pub fn adopt_layout(&mut self, positions: &HashMap<String, WorldPoint>) -> usize {
        let mut applied = 0;
        for (entity, point) in positions {
            if self.graph.contains(entity) {
                self.world.set(entity, *point);
                applied += 1;
            }
        }
        info!(applied, "layout adopted");
        applied
    }

    fn materialize(&mut self, spec: &RelationshipSpec, records: &RecordSet) -> usize {
        let mut added = 0usize;

        for tablet in records.tablets() {
            if !tablet.can_resolve(&spec.from_field) || !tablet.can_resolve(&spec.to_field) {
                continue;
            }

            for record in tablet.records() {
                let from_keys = tablet.resolve(&spec.from_field, record);
                let to_keys = tablet.resolve(&spec.to_field, record);

                for from_key in &from_keys {
                    for to_key in &to_keys {
                        if spec.ignore_not_set && (from_key == NOT_SET || to_key == NOT_SET) {
                            continue;
                        }

                        let from = spec.from_entity(from_key);
                        let to = spec.to_entity(to_key);
                        if !self.retained.is_empty()
                            && (!self.retained.contains(&from) || !self.retained.contains(&to))
                        {
                            continue;
                        }

                        self.world.ensure(&from);
                        self.world.ensure(&to);
                        self.icons.insert(from.clone(), spec.from_icon);
                        self.icons.insert(to.clone(), spec.to_icon);
                        self.graph.add_edge(&from, &to, record.bundle, spec.style);
                        added += 1;
                    }
                }
            }
        }

        added
    }

    fn remember(&mut self, encoded: String) {
        self.recent.retain(|known| known != &encoded);
        self.recent.push_front(encoded);
        self.recent.truncate(self.recent_capacity);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::record_set_from_rows;
    use pretty_assertions::assert_eq;

    fn link_graph() -> LinkGraph {
        LinkGraph::new(&Settings::default())
    }

    fn flows() -> RecordSet {
        record_set_from_rows(&[
            &[("sip", "1.1.1.1"), ("dip", "2.2.2.2")],
            &[("sip", "1.1.1.1"), ("dip", "2.2.2.2")],
            &[("sip", "1.1.1.1"), ("dip", "2.2.2.2")],
        ])
    }

    #[test]
    fn repeated_records_accumulate_weight() {
        let records = flows();
        let mut links = link_graph();

        assert!(links.add_relationship(RelationshipSpec::new("sip", "dip"), &records));

        let graph = links.graph();
        let a = graph.undirected.index_of("1.1.1.1").expect("source node");
        let b = graph.undirected.index_of("2.2.2.2").expect("target node");
        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.undirected.weight(a, b), 3);
        assert_eq!(graph.undirected.weight(b, a), 3);
        assert_eq!(graph.directed.weight(a, b), 3);
        assert_eq!(graph.directed.weight(b, a), 0);
    }

    #[test]
    fn ignore_not_set_skips_sentinel_pairs() {
        let records = record_set_from_rows(&[&[("sip", "1.1.1.1"), ("dip", "")]]);
        let mut links = link_graph();
        let mut spec = RelationshipSpec::new("sip", "dip");
        spec.ignore_not_set = true;

        assert!(links.add_relationship(spec, &records));
        assert_eq!(links.graph().node_count(), 0);
        assert_eq!(links.graph().directed.link_count(), 0);
        assert_eq!(links.world().len(), 0);
    }

    #[test]
    fn not_set_sentinel_becomes_entity_without_flag() {
        let records = record_set_from_rows(&[&[("sip", "1.1.1.1"), ("dip", "")]]);
        let mut links = link_graph();

        assert!(links.add_relationship(RelationshipSpec::new("sip", "dip"), &records));
        assert!(links.graph().contains(NOT_SET));
    }

    #[test]
    fn multi_valued_fields_cross_connect() {
        let records = record_set_from_rows(&[&[
            ("user", "alice"),
            ("user", "bob"),
            ("host", "x"),
            ("host", "y"),
        ]]);
        let mut links = link_graph();

        links.add_relationship(RelationshipSpec::new("user", "host"), &records);
        assert_eq!(links.graph().node_count(), 4);
        assert_eq!(links.graph().directed.link_count(), 4);
    }

    #[test]
    fn unresolvable_relationship_is_a_no_op() {
        let records = flows();
        let mut links = link_graph();

        assert!(!links.add_relationship(RelationshipSpec::new("sip", "proto"), &records));
        assert!(links.relationships().is_empty());
        assert!(links.graph().is_empty());
    }

    #[test]
    fn duplicate_specs_are_not_re_added() {
        let records = flows();
        let mut links = link_graph();

        assert!(links.add_relationship(RelationshipSpec::new("sip", "dip"), &records));
        assert!(!links.add_relationship(RelationshipSpec::new("sip", "dip"), &records));
        assert_eq!(links.relationships().len(), 1);
        assert_eq!(links.recent().count(), 1);
    }

    #[test]
    fn typed_endpoints_keep_same_values_apart() {
        let records = record_set_from_rows(&[&[("a", "x"), ("b", "x")]]);
        let mut links = link_graph();
        let mut spec = RelationshipSpec::new("a", "b");
        spec.from_typed = true;
        spec.to_typed = true;

        links.add_relationship(spec, &records);
        let mut entities = links.graph().entities().to_vec();
        entities.sort();
        assert_eq!(entities, vec!["a=x".to_owned(), "b=x".to_owned()]);
    }

    #[test]
    fn retained_set_only_keeps_links_inside_it() {
        let records = record_set_from_rows(&[
            &[("sip", "a"), ("dip", "b")],
            &[("sip", "a"), ("dip", "c")],
        ]);
        let mut links = link_graph();
        links.add_relationship(RelationshipSpec::new("sip", "dip"), &records);
        assert_eq!(links.graph().node_count(), 3);

        links.retain(["a".to_owned(), "b".to_owned()], &records);
        assert_eq!(links.graph().node_count(), 2);
        assert!(!links.graph().contains("c"));

        links.clear_retained(&records);
        assert_eq!(links.graph().node_count(), 3);
    }

    #[test]
    fn world_positions_survive_relationship_removal_and_rebuild() {
        let records = record_set_from_rows(&[&[("sip", "a"), ("dip", "b"), ("port", "80")]]);
        let mut links = link_graph();
        let first = RelationshipSpec::new("sip", "dip");
        let second = RelationshipSpec::new("sip", "port");
        links.add_relationship(first.clone(), &records);
        links.add_relationship(second.clone(), &records);
        links.world_mut().set("a", WorldPoint::new(5.0, 6.0));

        assert!(links.remove_relationship(&second, &records));
        assert!(!links.graph().contains("80"));
        assert_eq!(links.world().get("a"), Some(WorldPoint::new(5.0, 6.0)));

        let replacement = record_set_from_rows(&[&[("sip", "a"), ("dip", "z")]]);
        links.rebuild(&replacement);
        assert_eq!(links.world().get("a"), Some(WorldPoint::new(5.0, 6.0)));
        assert!(links.graph().contains("z"));
        assert!(!links.graph().contains("b"));
    }

    #[test]
    fn recent_list_is_most_recent_first_and_bounded() {
        let records = record_set_from_rows(&[&[("a", "1"), ("b", "2"), ("c", "3")]]);
        let mut links = LinkGraph::new(&Settings {
            recent_capacity: 2,
            ..Settings::default()
        });
        let specs = [
            RelationshipSpec::new("a", "b"),
            RelationshipSpec::new("b", "c"),
            RelationshipSpec::new("a", "c"),
        ];
        for spec in &specs {
            links.add_relationship(spec.clone(), &records);
        }

        assert_eq!(
            links.recent().collect::<Vec<_>>(),
            vec![specs[2].encode().as_str(), specs[1].encode().as_str()]
        );
    }

    #[test]
    fn sticky_labels_toggle() {
        let mut links = link_graph();
        assert!(links.toggle_sticky("a"));
        assert!(links.sticky_labels().contains("a"));
        assert!(!links.toggle_sticky("a"));
        assert!(links.sticky_labels().is_empty());
    }
}
