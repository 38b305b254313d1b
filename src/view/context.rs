use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use eframe::egui::Color32;
use tracing::debug;

use crate::graph::{EdgeStyle, GraphModel, RelationshipSpec};
use crate::records::{BundleId, RecordSet};

use super::counting::{CountContext, RecordColors};
use super::options::RenderOptions;
use super::transform::{CoordinateTransform, NodeKey};

/// Rendered line between two node keys, stored with the smaller key first so
/// both directions of a link collapse onto one line.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LinkKey {
    pub a: NodeKey,
    pub b: NodeKey,
}

impl LinkKey {
    pub fn new(from: NodeKey, to: NodeKey) -> Self {
        if from <= to {
            Self { a: from, b: to }
        } else {
            Self { a: to, b: from }
        }
    }

    pub fn is_loop(&self) -> bool {
        self.a == self.b
    }
}

impl fmt::Display for LinkKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.a, self.b)
    }
}

/// Hands out render ids; a pass is cancelled as soon as a newer id exists.
#[derive(Clone, Debug, Default)]
pub struct RenderRequests {
    latest: Arc<AtomicU64>,
}

impl RenderRequests {
    pub fn next(&self) -> CancelToken {
        let id = self.latest.fetch_add(1, Ordering::SeqCst) + 1;
        CancelToken {
            id,
            latest: Arc::clone(&self.latest),
        }
    }
}

#[derive(Clone, Debug)]
pub struct CancelToken {
    id: u64,
    latest: Arc<AtomicU64>,
}

impl CancelToken {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn is_cancelled(&self) -> bool {
        self.latest.load(Ordering::SeqCst) != self.id
    }
}

/// Styles and directions of every link reference collapsing onto one line.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LinkInfo {
    pub styles: BTreeSet<EdgeStyle>,
    pub forward: bool,
    pub backward: bool,
}

impl LinkInfo {
    pub fn style(&self) -> EdgeStyle {
        match self.styles.iter().collect::<Vec<_>>().as_slice() {
            [only] => **only,
            _ => EdgeStyle::Solid,
        }
    }
}

pub struct RenderInput<'a> {
    pub records: &'a RecordSet,
    pub graph: &'a GraphModel,
    pub relationships: &'a [RelationshipSpec],
    pub transform: &'a CoordinateTransform,
    pub options: &'a RenderOptions,
    pub fallback_color: Color32,
}

/// Snapshot correlating records, graph and viewport for one render pass.
#[derive(Debug, Default)]
pub struct RenderContext {
    render_id: u64,
    transform_id: u64,
    complete: bool,
    no_mapping: BTreeSet<BundleId>,
    links: CountContext<LinkKey>,
    nodes: CountContext<NodeKey>,
    entities: CountContext<String>,
    node_entities: BTreeMap<NodeKey, BTreeSet<String>>,
    entity_node: HashMap<String, NodeKey>,
    link_info: BTreeMap<LinkKey, LinkInfo>,
}

impl RenderContext {
    /// Walks every record once. When `token` is cancelled mid-scan the
    /// partial context comes back with `is_complete() == false`.
    pub fn build(input: &RenderInput<'_>, token: &CancelToken) -> Self {
        Self::build_until(input, token.id(), || token.is_cancelled())
    }

    /// `cancelled` is polled before each record.
    pub(crate) fn build_until(
        input: &RenderInput<'_>,
        render_id: u64,
        mut cancelled: impl FnMut() -> bool,
    ) -> Self {
        let mut context = Self {
            render_id,
            transform_id: input.transform.transform_id(),
            no_mapping: input.records.bundles().collect(),
            ..Self::default()
        };

        let directed = &input.graph.directed;
        let fill_by_default = input.relationships.is_empty() && !input.graph.is_empty();

        for tablet in input.records.tablets() {
            let fillable = fill_by_default
                || input.relationships.iter().any(|spec| {
                    tablet.can_resolve(&spec.from_field) && tablet.can_resolve(&spec.to_field)
                });
            if !fillable {
                continue;
            }

            for record in tablet.records() {
                if cancelled() {
                    debug!(render_id, "render pass abandoned");
                    return context;
                }

                let mut mapped = false;
                for (from, to) in directed.links_for_bundle(record.bundle) {
                    let (Some(from_entity), Some(to_entity)) =
                        (directed.entity(from), directed.entity(to))
                    else {
                        continue;
                    };
                    let (Some(from_key), Some(to_key)) = (
                        input.transform.screen_of(from_entity),
                        input.transform.screen_of(to_entity),
                    ) else {
                        continue;
                    };

                    let link_key = LinkKey::new(from_key, to_key);
                    context.links.add(link_key, record.bundle);
                    context.nodes.add(from_key, record.bundle);
                    context.nodes.add(to_key, record.bundle);
                    context.entities.add(from_entity.to_owned(), record.bundle);
                    context.entities.add(to_entity.to_owned(), record.bundle);
                    context.place(from_entity, from_key);
                    context.place(to_entity, to_key);

                    let info = context.link_info.entry(link_key).or_default();
                    if let Some(link) = directed.link(from, to) {
                        info.styles.extend(link.styles.iter().copied());
                    }
                    if link_key.a == from_key {
                        info.forward = true;
                    } else {
                        info.backward = true;
                    }
                    mapped = true;
                }

                if mapped {
                    context.no_mapping.remove(&record.bundle);
                }
            }
        }

        let colors = RecordColors::new(
            input.records,
            input.options.color_by.as_deref(),
            input.fallback_color,
        );
        context.links.finish(&colors);
        context.nodes.finish(&colors);
        context.entities.finish(&colors);
        context.complete = true;

        debug!(
            render_id = context.render_id,
            nodes = context.nodes.len(),
            links = context.links.len(),
            unmapped = context.no_mapping.len(),
            "render pass complete"
        );
        context
    }

    fn place(&mut self, entity: &str, key: NodeKey) {
        self.node_entities
            .entry(key)
            .or_default()
            .insert(entity.to_owned());
        self.entity_node.insert(entity.to_owned(), key);
    }

    pub fn render_id(&self) -> u64 {
        self.render_id
    }

    pub fn transform_id(&self) -> u64 {
        self.transform_id
    }

    pub fn is_complete(&self) -> bool {
        self.complete
    }

    pub fn no_mapping(&self) -> &BTreeSet<BundleId> {
        &self.no_mapping
    }

    pub fn links(&self) -> &CountContext<LinkKey> {
        &self.links
    }

    pub fn nodes(&self) -> &CountContext<NodeKey> {
        &self.nodes
    }

    pub fn entities(&self) -> &CountContext<String> {
        &self.entities
    }

    pub fn node_entities(&self, key: NodeKey) -> Option<&BTreeSet<String>> {
        self.node_entities.get(&key)
    }

    pub fn node_of(&self, entity: &str) -> Option<NodeKey> {
        self.entity_node.get(entity).copied()
    }

    pub fn link_info(&self, key: LinkKey) -> Option<&LinkInfo> {
        self.link_info.get(&key)
    }

    pub fn record_count(&self, entity: &str) -> usize {
        self.entities.get(&entity.to_owned()).map_or(0, |bin| bin.total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{LinkGraph, WorldPoint};
    use crate::records::record_set_from_rows;
    use crate::settings::Settings;
    use crate::view::transform::Extents;
    use pretty_assertions::assert_eq;

    struct Fixture {
        records: RecordSet,
        links: LinkGraph,
        transform: CoordinateTransform,
        options: RenderOptions,
    }

    impl Fixture {
        fn new(records: RecordSet, specs: &[RelationshipSpec]) -> Self {
            let mut links = LinkGraph::new(&Settings::default());
            for spec in specs {
                links.add_relationship(spec.clone(), &records);
            }
            let mut transform = CoordinateTransform::new(100, 100);
            transform.set_extents(Extents::new(0.0, 0.0, 100.0, 100.0));
            Self {
                records,
                links,
                transform,
                options: RenderOptions::default(),
            }
        }

        fn place(&mut self, entity: &str, x: f64, y: f64) {
            self.links.world_mut().set(entity, WorldPoint::new(x, y));
        }

        fn build(&mut self, token: &CancelToken) -> RenderContext {
            let entities = self.links.graph().entities().to_vec();
            self.transform
                .transform_all(entities.iter().map(String::as_str), self.links.world());
            let input = RenderInput {
                records: &self.records,
                graph: self.links.graph(),
                relationships: self.links.relationships(),
                transform: &self.transform,
                options: &self.options,
                fallback_color: Color32::WHITE,
            };
            RenderContext::build(&input, token)
        }
    }

    #[test]
    fn entities_on_one_pixel_aggregate() {
        let records = record_set_from_rows(&[
            &[("sip", "a"), ("dip", "c")],
            &[("sip", "b"), ("dip", "c")],
        ]);
        let mut fixture = Fixture::new(records, &[RelationshipSpec::new("sip", "dip")]);
        fixture.place("a", 10.2, 10.7);
        fixture.place("b", 10.9, 10.1);
        fixture.place("c", 50.0, 50.0);

        let context = fixture.build(&RenderRequests::default().next());
        let key = NodeKey::new(10, 10);

        assert!(context.is_complete());
        assert_eq!(
            context.node_entities(key).cloned(),
            Some(BTreeSet::from(["a".to_owned(), "b".to_owned()]))
        );
        assert_eq!(context.node_of("a"), Some(key));
        assert_eq!(context.node_of("b"), Some(key));
        assert_eq!(context.nodes().get(&key).map(|bin| bin.total), Some(2));
        assert_eq!(context.links().len(), 1);
        assert_eq!(context.record_count("c"), 2);
    }

    #[test]
    fn unmatched_records_land_in_no_mapping_only() {
        let records = record_set_from_rows(&[
            &[("sip", "a"), ("dip", "b")],
            &[("sip", "a"), ("proto", "tcp")],
        ]);
        let mut fixture = Fixture::new(records, &[RelationshipSpec::new("sip", "dip")]);
        fixture.place("a", 1.0, 1.0);
        fixture.place("b", 2.0, 2.0);

        let context = fixture.build(&RenderRequests::default().next());

        let mapped = BundleId(0);
        let unmapped = BundleId(1);
        assert_eq!(context.no_mapping(), &BTreeSet::from([unmapped]));
        assert!(!context.links().contains_bundle(unmapped));
        assert!(!context.nodes().contains_bundle(unmapped));
        assert!(!context.entities().contains_bundle(unmapped));
        assert!(context.links().contains_bundle(mapped));

        for bundle in fixture.records.bundles() {
            let in_no_mapping = context.no_mapping().contains(&bundle);
            let counted = context.links().contains_bundle(bundle);
            assert!(in_no_mapping != counted);
        }
    }

    #[test]
    fn tablets_without_relationship_fields_stay_unmapped() {
        let mut records = RecordSet::new();
        let flows = records.add_tablet("flows", vec!["sip".to_owned(), "dip".to_owned()]);
        let dns = records.add_tablet("dns", vec!["query".to_owned()]);
        records.push_record(
            flows,
            [("sip", "a"), ("dip", "b")]
                .into_iter()
                .map(|(k, v)| (k.to_owned(), vec![v.to_owned()]))
                .collect(),
        );
        records.push_record(
            dns,
            [("query", "example.org".to_owned())]
                .into_iter()
                .map(|(k, v)| (k.to_owned(), vec![v]))
                .collect(),
        );
        let mut fixture = Fixture::new(records, &[RelationshipSpec::new("sip", "dip")]);

        let context = fixture.build(&RenderRequests::default().next());
        assert_eq!(context.no_mapping(), &BTreeSet::from([BundleId(1)]));
    }

    #[test]
    fn newer_request_abandons_the_pass() {
        let records = record_set_from_rows(&[&[("sip", "a"), ("dip", "b")]]);
        let mut fixture = Fixture::new(records, &[RelationshipSpec::new("sip", "dip")]);

        let requests = RenderRequests::default();
        let stale = requests.next();
        let fresh = requests.next();
        assert!(stale.is_cancelled());
        assert!(!fresh.is_cancelled());

        let context = fixture.build(&stale);
        assert!(!context.is_complete());
        assert!(context.links().is_empty());
    }

    #[test]
    fn cancellation_mid_scan_leaves_the_pass_incomplete() {
        let records = record_set_from_rows(&[
            &[("sip", "a"), ("dip", "b")],
            &[("sip", "a"), ("dip", "c")],
            &[("sip", "b"), ("dip", "c")],
        ]);
        let mut fixture = Fixture::new(records, &[RelationshipSpec::new("sip", "dip")]);
        fixture.place("a", 1.0, 1.0);
        fixture.place("b", 20.0, 20.0);
        fixture.place("c", 40.0, 40.0);
        let entities = fixture.links.graph().entities().to_vec();
        fixture
            .transform
            .transform_all(entities.iter().map(String::as_str), fixture.links.world());

        let input = RenderInput {
            records: &fixture.records,
            graph: fixture.links.graph(),
            relationships: fixture.links.relationships(),
            transform: &fixture.transform,
            options: &fixture.options,
            fallback_color: Color32::WHITE,
        };
        let mut polls = 0;
        let context = RenderContext::build_until(&input, 7, || {
            polls += 1;
            polls > 2
        });

        assert_eq!(polls, 3);
        assert!(!context.is_complete());
        assert_eq!(context.links().len(), 2);
        assert_eq!(context.render_id(), 7);
    }

    #[test]
    fn without_relationships_a_populated_graph_fills_every_tablet() {
        let records = record_set_from_rows(&[&[("sip", "a"), ("dip", "b")]]);
        let mut fixture = Fixture::new(records, &[RelationshipSpec::new("sip", "dip")]);
        fixture.place("a", 1.0, 1.0);
        fixture.place("b", 20.0, 20.0);
        let entities = fixture.links.graph().entities().to_vec();
        fixture
            .transform
            .transform_all(entities.iter().map(String::as_str), fixture.links.world());

        let input = RenderInput {
            records: &fixture.records,
            graph: fixture.links.graph(),
            relationships: &[],
            transform: &fixture.transform,
            options: &fixture.options,
            fallback_color: Color32::WHITE,
        };
        let context = RenderContext::build(&input, &RenderRequests::default().next());

        assert!(context.is_complete());
        assert!(context.no_mapping().is_empty());
        assert_eq!(context.links().len(), 1);
    }

    #[test]
    fn reversed_links_share_a_line_and_conflicting_styles_fall_back() {
        let records = record_set_from_rows(&[&[("sip", "a"), ("dip", "b")]]);
        let mut forward = RelationshipSpec::new("sip", "dip");
        forward.style = EdgeStyle::Dotted;
        let mut backward = RelationshipSpec::new("dip", "sip");
        backward.style = EdgeStyle::LongDash;
        let mut fixture = Fixture::new(records, &[forward, backward]);
        fixture.place("a", 1.0, 1.0);
        fixture.place("b", 20.0, 20.0);

        let context = fixture.build(&RenderRequests::default().next());
        let key = LinkKey::new(NodeKey::new(1, 1), NodeKey::new(20, 20));
        let info = context.link_info(key).cloned().unwrap_or_default();

        assert_eq!(context.links().len(), 1);
        assert!(info.forward && info.backward);
        assert_eq!(info.styles.len(), 2);
        assert_eq!(info.style(), EdgeStyle::Solid);
    }

    #[test]
    fn single_style_survives_aggregation() {
        let info = LinkInfo {
            styles: BTreeSet::from([EdgeStyle::Dotted]),
            forward: true,
            backward: false,
        };
        assert_eq!(info.style(), EdgeStyle::Dotted);
        assert_eq!(LinkInfo::default().style(), EdgeStyle::Solid);
    }
}
