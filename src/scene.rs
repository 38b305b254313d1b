use std::collections::{BTreeSet, HashMap};
use std::path::Path;

use eframe::egui::{Pos2, Rect};
use tracing::{debug, info, warn};

use crate::codec::ConfigError;
use crate::graph::{LinkGraph, RelationshipSpec, WorldPoint};
use crate::records::{BundleId, RecordSet};
use crate::settings::{Settings, Theme};
use crate::view::{
    CoordinateTransform, RenderContext, RenderInput, RenderOptions, RenderRequests, ShapeId,
    ShapeIndex, ViewConfig,
};

/// Everything one visible dataset needs between frames: records, the derived
/// graph, the viewport and the last published render.
#[derive(Debug)]
pub struct Scene {
    records: RecordSet,
    links: LinkGraph,
    transform: CoordinateTransform,
    options: RenderOptions,
    theme: Theme,
    requests: RenderRequests,
    context: Option<RenderContext>,
    shapes: ShapeIndex,
    selection: BTreeSet<String>,
    dirty: bool,
}

impl Scene {
    pub fn new(records: RecordSet, settings: &Settings, width: u32, height: u32) -> Self {
        Self {
            records,
            links: LinkGraph::new(settings),
            transform: CoordinateTransform::new(width, height),
            options: RenderOptions::default(),
            theme: settings.theme.clone(),
            requests: RenderRequests::default(),
            context: None,
            shapes: ShapeIndex::default(),
            selection: BTreeSet::new(),
            dirty: true,
        }
    }

    pub fn records(&self) -> &RecordSet {
        &self.records
    }

    pub fn links(&self) -> &LinkGraph {
        &self.links
    }

    pub fn transform(&self) -> &CoordinateTransform {
        &self.transform
    }

    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    pub fn theme(&self) -> &Theme {
        &self.theme
    }

    pub fn context(&self) -> Option<&RenderContext> {
        self.context.as_ref()
    }

    pub fn shapes(&self) -> &ShapeIndex {
        &self.shapes
    }

    pub fn selection(&self) -> &BTreeSet<String> {
        &self.selection
    }

    pub fn selection_mut(&mut self) -> &mut BTreeSet<String> {
        &mut self.selection
    }

    pub fn invalidate(&mut self) {
        self.dirty = true;
    }

    pub fn needs_render(&self) -> bool {
        self.dirty || self.transform.is_stale()
    }

    pub fn set_options(&mut self, options: RenderOptions) {
        if self.options != options {
            self.options = options;
            self.dirty = true;
        }
    }

    pub fn add_relationship(&mut self, spec: RelationshipSpec) -> bool {
        let added = self.links.add_relationship(spec, &self.records);
        if added {
            self.retransform();
        }
        added
    }

    pub fn remove_relationship(&mut self, spec: &RelationshipSpec) -> bool {
        let removed = self.links.remove_relationship(spec, &self.records);
        if removed {
            self.prune_selection();
            self.retransform();
        }
        removed
    }

    /// Swaps in a new root record set; the graph is rebuilt and surviving
    /// entities keep their world positions.
    pub fn replace_records(&mut self, records: RecordSet) {
        self.records = records;
        self.links.rebuild(&self.records);
        self.prune_selection();
        self.context = None;
        self.shapes = ShapeIndex::default();
        self.retransform();
    }

    pub fn retain_selection(&mut self) {
        if self.selection.is_empty() {
            return;
        }
        self.links.retain(self.selection.iter().cloned(), &self.records);
        self.prune_selection();
        self.retransform();
    }

    pub fn clear_retained(&mut self) {
        self.links.clear_retained(&self.records);
        self.retransform();
    }

    pub fn toggle_sticky(&mut self, entity: &str) -> bool {
        self.dirty = true;
        self.links.toggle_sticky(entity)
    }

    pub fn view_config(&self) -> ViewConfig {
        ViewConfig {
            options: self.options.clone(),
            relationships: self.links.relationships().to_vec(),
        }
    }

    /// Parses `raw` fully before touching any state, so a bad string leaves
    /// the view as it was.
    pub fn apply_view_config(&mut self, raw: &str) -> Result<(), ConfigError> {
        let config = match ViewConfig::parse(raw) {
            Ok(config) => config,
            Err(error) => {
                warn!(%error, "view configuration rejected");
                return Err(error);
            }
        };

        self.options = config.options;
        if config.relationships != self.links.relationships() {
            self.links.clear_relationships();
            for spec in config.relationships {
                self.links.add_relationship(spec, &self.records);
            }
            self.prune_selection();
        }
        info!(relationships = self.links.relationships().len(), "view configuration applied");
        self.retransform();
        Ok(())
    }

    pub fn adopt_layout(&mut self, positions: &HashMap<String, WorldPoint>) -> usize {
        let applied = self.links.adopt_layout(positions);
        self.retransform();
        applied
    }

    pub fn load_layout(&mut self, path: &Path) -> anyhow::Result<usize> {
        let applied = crate::graph::load_layout(path, &mut self.links)?;
        self.retransform();
        Ok(applied)
    }

    pub fn save_layout(&self, path: &Path) -> anyhow::Result<usize> {
        crate::graph::save_layout(
            path,
            self.links.graph().entities().iter().map(String::as_str),
            self.links.world(),
        )
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.transform.resize(width, height);
    }

    pub fn screen_to_world(&self, point: Pos2) -> WorldPoint {
        self.transform.screen_to_world(point.x as f64, point.y as f64)
    }

    pub fn zoom_in(&mut self, steps: i32, anchor: Option<Pos2>) {
        let anchor = anchor.map(|point| self.screen_to_world(point));
        self.transform.zoom_in(steps, anchor);
    }

    pub fn pan(&mut self, dx: f64, dy: f64) {
        self.transform.pan(dx, dy);
    }

    /// Entities drawn in the last published render, or every graph entity
    /// before the first render.
    pub fn visible_entities(&self) -> Vec<String> {
        match &self.context {
            Some(context) if !context.entities().is_empty() => {
                context.entities().keys().cloned().collect()
            }
            _ => self.links.graph().entities().to_vec(),
        }
    }

    pub fn zoom_to_fit(&mut self) -> bool {
        let visible = self.visible_entities();
        self.transform.zoom_to_fit(
            visible.iter().map(String::as_str),
            self.links.world(),
            self.options.geographic(),
        )
    }

    pub fn move_entities<'a>(&mut self, entities: impl IntoIterator<Item = &'a String>, dx: f64, dy: f64) {
        for entity in entities {
            if self.links.world_mut().translate(entity, dx, dy) {
                self.transform.transform_entity(entity, self.links.world());
            }
        }
        self.dirty = true;
    }

    pub fn place_entities(&mut self, placements: &[(String, WorldPoint)]) {
        for (entity, point) in placements {
            if self.links.graph().contains(entity) {
                self.links.world_mut().set(entity, *point);
                self.transform.transform_entity(entity, self.links.world());
            }
        }
        self.dirty = true;
    }

    /// Builds and publishes a render context if anything changed. A pass
    /// overtaken by a newer request publishes nothing.
    pub fn render(&mut self) -> bool {
        if !self.needs_render() {
            return false;
        }

        if self.transform.is_stale() {
            self.transform.transform_all(
                self.links.graph().entities().iter().map(String::as_str),
                self.links.world(),
            );
        }

        let token = self.requests.next();
        let input = RenderInput {
            records: &self.records,
            graph: self.links.graph(),
            relationships: self.links.relationships(),
            transform: &self.transform,
            options: &self.options,
            fallback_color: self.theme.node,
        };
        let context = RenderContext::build(&input, &token);
        self.publish(context)
    }

    /// Replaces the published context unless `context` was abandoned or was
    /// built against an older transform.
    fn publish(&mut self, context: RenderContext) -> bool {
        if !context.is_complete() || context.transform_id() != self.transform.transform_id() {
            debug!(render_id = context.render_id(), "stale render discarded");
            return false;
        }

        let links = &self.links;
        self.shapes = ShapeIndex::build(&context, &self.options, &self.theme, |entity| links.icon(entity));
        self.context = Some(context);
        self.dirty = false;
        true
    }

    pub fn entities_at(&self, point: Pos2) -> BTreeSet<String> {
        self.shapes
            .node_at(point)
            .and_then(|key| self.context.as_ref()?.node_entities(key).cloned())
            .unwrap_or_default()
    }

    pub fn entities_in_rect(&self, rect: Rect) -> BTreeSet<String> {
        let Some(context) = &self.context else {
            return BTreeSet::new();
        };
        self.shapes
            .nodes_in_rect(rect)
            .into_iter()
            .filter_map(|key| context.node_entities(key))
            .flatten()
            .cloned()
            .collect()
    }

    pub fn bundles_for_shape(&self, id: ShapeId) -> BTreeSet<BundleId> {
        self.shapes.bundles_of(id).cloned().unwrap_or_default()
    }

    pub fn shapes_for_bundle(&self, bundle: BundleId) -> BTreeSet<ShapeId> {
        self.shapes.shapes_of(bundle).cloned().unwrap_or_default()
    }

    pub fn bundles_for_entities(&self, entities: &BTreeSet<String>) -> BTreeSet<BundleId> {
        let Some(context) = &self.context else {
            return BTreeSet::new();
        };
        entities
            .iter()
            .filter_map(|entity| context.entities().get(entity))
            .flat_map(|bin| bin.bundles.iter().copied())
            .collect()
    }

    pub fn record_count(&self, entity: &str) -> usize {
        self.context
            .as_ref()
            .map_or(0, |context| context.record_count(entity))
    }

    fn retransform(&mut self) {
        self.transform.transform_all(
            self.links.graph().entities().iter().map(String::as_str),
            self.links.world(),
        );
        self.dirty = true;
    }

    fn prune_selection(&mut self) {
        let graph = self.links.graph();
        self.selection.retain(|entity| graph.contains(entity));
    }
}

#[cfg(test)]
pub(crate) fn scene_from_rows(rows: &[&[(&str, &str)]], specs: &[RelationshipSpec]) -> Scene {
    use crate::records::record_set_from_rows;
    use crate::view::Extents;

    let mut scene = Scene::new(record_set_from_rows(rows), &Settings::default(), 100, 100);
    for spec in specs {
        scene.add_relationship(spec.clone());
    }
    scene.transform.set_extents(Extents::new(0.0, 0.0, 100.0, 100.0));
    scene
}
