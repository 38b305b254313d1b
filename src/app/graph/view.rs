use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Instant;

use eframe::egui::{self, Align2, Color32, FontId, Rect, Sense, Stroke, StrokeKind, Ui, vec2};
use fuzzy_matcher::FuzzyMatcher;
use fuzzy_matcher::skim::SkimMatcherV2;

use crate::interaction::GestureState;
use crate::util::short_name;
use crate::view::{LabelCalculator, LabelInput, LabelTarget, NodeKey, Shape, compose_label};

use super::super::render_utils::{
    blend_color, circle_visible, dim_color, draw_arrow, draw_background, draw_icon,
    draw_styled_path, edge_visible, link_path, path_midpoint,
};
use super::super::{SearchMatchCache, ViewModel};

const DYNAMIC_LABEL_THRESHOLD: f32 = 0.25;

fn fuzzy_match_score(matcher: &SkimMatcherV2, text: &str, query: &str) -> Option<i64> {
    matcher
        .fuzzy_match(text, query)
        .or_else(|| matcher.fuzzy_match(&text.to_ascii_lowercase(), &query.to_ascii_lowercase()))
}

impl ViewModel {
    /// Entities matching the search box; strict mode wants a literal
    /// substring, otherwise skim fuzzy matching.
    pub(in crate::app) fn search_matches(&mut self) -> Option<Arc<BTreeSet<String>>> {
        let query = self.search.trim();
        if query.is_empty() {
            return None;
        }
        let strict = self.scene.options().strict_matches;

        if let Some(cached) = &self.search_cache
            && cached.query == query
            && cached.strict == strict
        {
            return Some(Arc::clone(&cached.matches));
        }

        let matcher = SkimMatcherV2::default();
        let matches = self
            .scene
            .links()
            .graph()
            .entities()
            .iter()
            .filter(|entity| {
                if strict {
                    entity.contains(query)
                } else {
                    fuzzy_match_score(&matcher, entity, query).is_some()
                }
            })
            .cloned()
            .collect::<BTreeSet<_>>();
        let matches = Arc::new(matches);

        self.search_cache = Some(SearchMatchCache {
            query: query.to_owned(),
            strict,
            matches: Arc::clone(&matches),
        });

        Some(matches)
    }

    pub(in crate::app) fn draw_graph(&mut self, ui: &mut Ui) {
        let (rect, response) = ui.allocate_exact_size(ui.available_size(), Sense::click_and_drag());
        let painter = ui.painter_at(rect);
        self.scene
            .resize(rect.width().max(1.0) as u32, rect.height().max(1.0) as u32);

        self.handle_graph_keys(ui);
        self.handle_graph_zoom(ui, rect, &response);
        self.handle_graph_pointer(ui, rect, &response);

        if self.scene.needs_render() {
            let started = Instant::now();
            if self.scene.render() {
                self.last_render_ms = Some(started.elapsed().as_secs_f64() * 1000.0);
            }
        }

        let search_matches = self.search_matches();
        let scene = &self.scene;
        let theme = scene.theme();
        let options = scene.options();

        draw_background(&painter, rect, theme, scene.transform(), options.geographic());

        let context = match scene.context() {
            Some(context) if !scene.shapes().is_empty() => context,
            _ => {
                painter.text(
                    rect.center(),
                    Align2::CENTER_CENTER,
                    "Add a relationship to build the graph.",
                    FontId::proportional(14.0),
                    theme.label,
                );
                return;
            }
        };

        let offset = rect.min.to_vec2();
        let selected_keys = scene
            .selection()
            .iter()
            .filter_map(|entity| context.node_of(entity))
            .collect::<BTreeSet<NodeKey>>();
        let match_keys = search_matches
            .as_ref()
            .map(|matches| {
                matches
                    .iter()
                    .filter_map(|entity| context.node_of(entity))
                    .collect::<BTreeSet<NodeKey>>()
            })
            .unwrap_or_default();
        let hovered_key = Self::hovered_point(ui, rect).and_then(|point| scene.shapes().node_at(point));
        let highlight_active = !selected_keys.is_empty() || !match_keys.is_empty();

        for shape in scene.shapes().shapes() {
            let Shape::Link {
                key,
                from,
                to,
                width,
                color,
                style,
                forward,
                backward,
            } = shape
            else {
                continue;
            };

            let (from, to) = (*from + offset, *to + offset);
            if !edge_visible(rect, from, to, *width) {
                continue;
            }

            let touches_selection = selected_keys.contains(&key.a) || selected_keys.contains(&key.b);
            let color = if touches_selection {
                blend_color(*color, theme.selection, 0.6)
            } else if highlight_active {
                dim_color(*color, 0.6)
            } else {
                *color
            };

            let path = link_path(from, to, options.curves);
            draw_styled_path(&painter, &path, *style, Stroke::new(*width, color));
            if options.arrows {
                if *forward {
                    draw_arrow(&painter, &path, false, color);
                }
                if *backward {
                    draw_arrow(&painter, &path, true, color);
                }
            }

            if !options.draw_link_labels || options.link_labels.is_empty() {
                continue;
            }
            let (Some(bin), Some(from_entities), Some(to_entities)) = (
                context.links().get(key),
                context.node_entities(key.a),
                context.node_entities(key.b),
            ) else {
                continue;
            };
            if options.dynamic_labels && bin.normalized < DYNAMIC_LABEL_THRESHOLD && !touches_selection {
                continue;
            }

            let input = LabelInput {
                target: LabelTarget::Link(from_entities, to_entities),
                bin,
                records: scene.records(),
            };
            let text = compose_label(&options.link_labels, &input);
            if !text.is_empty()
                && let Some(mid) = path_midpoint(&path)
            {
                painter.text(
                    mid + vec2(0.0, -6.0),
                    Align2::CENTER_BOTTOM,
                    text,
                    FontId::proportional(11.0),
                    theme.label,
                );
            }
        }

        let sticky = scene.links().sticky_labels();
        for shape in scene.shapes().shapes() {
            let Shape::Node {
                key,
                center,
                radius,
                icon,
                color,
            } = shape
            else {
                continue;
            };

            let center = *center + offset;
            if !circle_visible(rect, center, *radius) {
                continue;
            }

            let is_selected = selected_keys.contains(key);
            let is_match = match_keys.contains(key);
            let is_hovered = hovered_key == Some(*key);
            let fill = if is_selected {
                theme.selection
            } else if is_hovered {
                blend_color(*color, Color32::WHITE, 0.35)
            } else if is_match {
                blend_color(*color, theme.search_match, 0.68)
            } else if highlight_active {
                dim_color(*color, 0.52)
            } else {
                *color
            };
            let stroke_width = if is_selected || is_match { 1.8 } else { 1.0 };
            draw_icon(
                &painter,
                center,
                *radius,
                *icon,
                fill,
                Stroke::new(stroke_width, Color32::from_rgba_unmultiplied(15, 15, 15, 190)),
            );
            if is_selected {
                painter.circle_stroke(center, radius + 4.0, Stroke::new(1.4, theme.selection));
            }

            let (Some(entities), Some(bin)) = (context.node_entities(*key), context.nodes().get(key))
            else {
                continue;
            };
            let is_sticky = entities.iter().any(|entity| sticky.contains(entity));
            let prominent = !options.dynamic_labels
                || bin.normalized >= DYNAMIC_LABEL_THRESHOLD
                || is_selected
                || is_hovered;
            if !is_sticky && !(options.draw_node_labels && prominent) {
                continue;
            }

            let input = LabelInput {
                target: LabelTarget::Node(entities),
                bin,
                records: scene.records(),
            };
            let text = compose_label(&options.node_labels, &input);
            if text.is_empty() {
                continue;
            }
            let label_color = match options.node_labels.first() {
                Some(kind) if options.color_by.is_some() => kind.label_color(&input),
                _ => theme.label,
            };
            painter.text(
                center + vec2(radius + 5.0, 0.0),
                Align2::LEFT_CENTER,
                text,
                FontId::proportional(12.0),
                label_color,
            );
        }

        if let Some(drag) = self.controller.drag()
            && !drag.is_click()
        {
            let start = drag.start + offset;
            let end = drag.end + offset;
            let stroke = Stroke::new(1.2, theme.rubber_band);
            match self.controller.state() {
                GestureState::Selecting | GestureState::GridLayout => {
                    let band = Rect::from_two_pos(start, end);
                    painter.rect_filled(band, 0.0, theme.rubber_band.gamma_multiply(0.15));
                    painter.rect_stroke(band, 0.0, stroke, StrokeKind::Inside);
                }
                GestureState::CircleLayout => {
                    painter.circle_stroke(start, start.distance(end), stroke);
                }
                GestureState::Panning | GestureState::Moving | GestureState::LineLayout => {
                    painter.line_segment([start, end], stroke);
                }
                GestureState::None => {}
            }
        }

        if let Some(key) = hovered_key
            && let Some(entities) = context.node_entities(key)
            && let Some(first) = entities.iter().next()
        {
            ui.output_mut(|output| {
                output.cursor_icon = egui::CursorIcon::PointingHand;
            });

            let records = scene
                .shapes()
                .node_shape(key)
                .map_or(0, |id| scene.bundles_for_shape(id).len());
            let mut panel_text = format!("{}  |  records {records}", short_name(first, 48));
            if entities.len() > 1 {
                panel_text.push_str(&format!("  |  +{} more", entities.len() - 1));
            }
            painter.text(
                rect.left_top() + vec2(10.0, 10.0),
                Align2::LEFT_TOP,
                panel_text,
                FontId::proportional(13.0),
                theme.label,
            );
        }

        if options.timing_marks
            && let Some(render_ms) = self.last_render_ms
        {
            painter.text(
                rect.right_bottom() - vec2(10.0, 10.0),
                Align2::RIGHT_BOTTOM,
                format!("render #{}  {render_ms:.1} ms", context.render_id()),
                FontId::monospace(11.0),
                theme.label,
            );
        }
    }
}
