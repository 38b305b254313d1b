use std::collections::{BTreeSet, HashMap};

use eframe::egui::{Color32, Pos2, Rect};

use crate::graph::{EdgeStyle, NodeIcon};
use crate::records::BundleId;
use crate::settings::Theme;

use super::context::{LinkKey, RenderContext};
use super::options::RenderOptions;
use super::transform::NodeKey;

pub type ShapeId = usize;

#[derive(Clone, Debug, PartialEq)]
pub enum Shape {
    Node {
        key: NodeKey,
        center: Pos2,
        radius: f32,
        icon: NodeIcon,
        color: Color32,
    },
    Link {
        key: LinkKey,
        from: Pos2,
        to: Pos2,
        width: f32,
        color: Color32,
        style: EdgeStyle,
        forward: bool,
        backward: bool,
    },
}

fn to_pos(key: NodeKey) -> Pos2 {
    Pos2::new(key.x as f32, key.y as f32)
}

/// Arena of drawn primitives for one complete render context, with lookups
/// in both directions between shapes and the bundles behind them.
#[derive(Debug, Default)]
pub struct ShapeIndex {
    shapes: Vec<Shape>,
    bundles_by_shape: Vec<BTreeSet<BundleId>>,
    by_node: HashMap<NodeKey, ShapeId>,
    by_link: HashMap<LinkKey, ShapeId>,
    by_bundle: HashMap<BundleId, BTreeSet<ShapeId>>,
}

impl ShapeIndex {
    pub fn build(
        context: &RenderContext,
        options: &RenderOptions,
        theme: &Theme,
        icon_of: impl Fn(&str) -> NodeIcon,
    ) -> Self {
        let mut index = Self::default();

        for (&key, bin) in context.links().iter() {
            if key.is_loop() {
                continue;
            }
            let info = context.link_info(key).cloned().unwrap_or_default();
            let shape = Shape::Link {
                key,
                from: to_pos(key.a),
                to: to_pos(key.b),
                width: options.link_size.width(bin),
                color: options.apply_transparency(options.link_color.color(bin, theme)),
                style: info.style(),
                forward: info.forward,
                backward: info.backward,
            };
            let id = index.push(shape, &bin.bundles);
            index.by_link.insert(key, id);
        }

        for (&key, bin) in context.nodes().iter() {
            let entities = context.node_entities(key);
            let entity_count = entities.map_or(0, BTreeSet::len);
            let icon = entities
                .and_then(|entities| entities.iter().next())
                .map(|entity| icon_of(entity.as_str()))
                .unwrap_or_default();
            let shape = Shape::Node {
                key,
                center: to_pos(key),
                radius: options.node_size.radius(bin, entity_count),
                icon,
                color: options.apply_transparency(options.node_color.color(bin, theme)),
            };
            let id = index.push(shape, &bin.bundles);
            index.by_node.insert(key, id);
        }

        index
    }

    fn push(&mut self, shape: Shape, bundles: &BTreeSet<BundleId>) -> ShapeId {
        let id = self.shapes.len();
        self.shapes.push(shape);
        self.bundles_by_shape.push(bundles.clone());
        for &bundle in bundles {
            self.by_bundle.entry(bundle).or_default().insert(id);
        }
        id
    }

    pub fn shapes(&self) -> &[Shape] {
        &self.shapes
    }

    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }

    pub fn node_shape(&self, key: NodeKey) -> Option<ShapeId> {
        self.by_node.get(&key).copied()
    }

    pub fn link_shape(&self, key: LinkKey) -> Option<ShapeId> {
        self.by_link.get(&key).copied()
    }

    pub fn bundles_of(&self, id: ShapeId) -> Option<&BTreeSet<BundleId>> {
        self.bundles_by_shape.get(id)
    }

    pub fn shapes_of(&self, bundle: BundleId) -> Option<&BTreeSet<ShapeId>> {
        self.by_bundle.get(&bundle)
    }

    /// Node whose disc contains `point`, nearest center first.
    pub fn node_at(&self, point: Pos2) -> Option<NodeKey> {
        self.shapes
            .iter()
            .filter_map(|shape| match shape {
                Shape::Node {
                    key,
                    center,
                    radius,
                    ..
                } => {
                    let distance = center.distance(point);
                    (distance <= radius.max(3.0)).then_some((*key, distance))
                }
                Shape::Link { .. } => None,
            })
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(key, _)| key)
    }

    pub fn nodes_in_rect(&self, rect: Rect) -> Vec<NodeKey> {
        self.shapes
            .iter()
            .filter_map(|shape| match shape {
                Shape::Node {
                    key,
                    center,
                    radius,
                    ..
                } => rect.expand(*radius).contains(*center).then_some(*key),
                Shape::Link { .. } => None,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{LinkGraph, RelationshipSpec, WorldPoint};
    use crate::records::record_set_from_rows;
    use crate::settings::Settings;
    use crate::view::context::{RenderInput, RenderRequests};
    use crate::view::transform::{CoordinateTransform, Extents};
    use pretty_assertions::assert_eq;

    fn indexed() -> (RenderContext, ShapeIndex) {
        let records = record_set_from_rows(&[
            &[("sip", "a"), ("dip", "b")],
            &[("sip", "a"), ("dip", "c")],
            &[("sip", "b"), ("dip", "b")],
        ]);
        let mut spec = RelationshipSpec::new("sip", "dip");
        spec.to_icon = NodeIcon::Square;
        let mut links = LinkGraph::new(&Settings::default());
        links.add_relationship(spec, &records);
        links.world_mut().set("a", WorldPoint::new(10.0, 10.0));
        links.world_mut().set("b", WorldPoint::new(50.0, 10.0));
        links.world_mut().set("c", WorldPoint::new(50.0, 80.0));

        let mut transform = CoordinateTransform::new(100, 100);
        transform.set_extents(Extents::new(0.0, 0.0, 100.0, 100.0));
        let entities = links.graph().entities().to_vec();
        transform.transform_all(entities.iter().map(String::as_str), links.world());

        let options = RenderOptions::default();
        let input = RenderInput {
            records: &records,
            graph: links.graph(),
            relationships: links.relationships(),
            transform: &transform,
            options: &options,
            fallback_color: Color32::WHITE,
        };
        let context = RenderContext::build(&input, &RenderRequests::default().next());
        let shapes = ShapeIndex::build(&context, &options, &Theme::default(), |entity| {
            links.icon(entity)
        });
        (context, shapes)
    }

    #[test]
    fn every_counted_bundle_reaches_a_shape_and_back() {
        let (context, shapes) = indexed();

        for (_key, bin) in context.nodes().iter() {
            for &bundle in &bin.bundles {
                let ids = shapes.shapes_of(bundle).cloned().unwrap_or_default();
                assert!(!ids.is_empty());
                for id in ids {
                    assert!(shapes.bundles_of(id).is_some_and(|set| set.contains(&bundle)));
                }
            }
        }
    }

    #[test]
    fn self_loops_draw_no_segment() {
        let (context, shapes) = indexed();
        let loop_key = LinkKey::new(NodeKey::new(50, 10), NodeKey::new(50, 10));

        assert!(context.links().get(&loop_key).is_some());
        assert_eq!(shapes.link_shape(loop_key), None);
        assert_eq!(shapes.len(), 5);
    }

    #[test]
    fn hit_tests_find_nodes() {
        let (_context, shapes) = indexed();

        assert_eq!(shapes.node_at(Pos2::new(11.0, 11.0)), Some(NodeKey::new(10, 10)));
        assert_eq!(shapes.node_at(Pos2::new(30.0, 40.0)), None);

        let mut inside = shapes.nodes_in_rect(Rect::from_min_max(Pos2::new(40.0, 0.0), Pos2::new(60.0, 90.0)));
        inside.sort();
        assert_eq!(inside, vec![NodeKey::new(50, 10), NodeKey::new(50, 80)]);
    }

    #[test]
    fn node_icon_follows_its_entity() {
        let (_context, shapes) = indexed();
        let Some(Shape::Node { icon, .. }) = shapes
            .node_shape(NodeKey::new(50, 80))
            .and_then(|id| shapes.shapes().get(id))
        else {
            panic!("node shape for c");
        };
        assert_eq!(*icon, NodeIcon::Square);
    }
}
