use std::path::Path;
use std::sync::Arc;

use eframe::egui::{self, Color32, RichText, Ui};
use tracing::{info, warn};

use crate::graph::{EdgeStyle, NodeIcon, RelationshipSpec};
use crate::layout::{LayoutSnapshot, default_candidates, preview_layouts};
use crate::view::{
    BackgroundMode, LabelKind, LinkColorMode, LinkSizeMode, NodeColorMode, NodeSizeMode,
};

use super::super::ViewModel;

const PREVIEW_CANDIDATES: usize = 4;

fn enum_combo<T: Copy + PartialEq>(
    ui: &mut Ui,
    id: &str,
    label: &str,
    value: &mut T,
    all: &[T],
    name: fn(T) -> &'static str,
) {
    ui.horizontal(|ui| {
        ui.label(label);
        egui::ComboBox::from_id_salt(id)
            .selected_text(name(*value))
            .show_ui(ui, |ui| {
                for option in all {
                    ui.selectable_value(value, *option, name(*option));
                }
            });
    });
}

fn field_combo(ui: &mut Ui, id: &str, value: &mut String, fields: &[String]) {
    egui::ComboBox::from_id_salt(id)
        .selected_text(value.as_str())
        .width(140.0)
        .show_ui(ui, |ui| {
            for field in fields {
                ui.selectable_value(value, field.clone(), field.as_str());
            }
        });
}

fn label_toggles(ui: &mut Ui, kinds: &mut Vec<LabelKind>, fields: &[String]) {
    let mut candidates = vec![LabelKind::Entity, LabelKind::RecordCount];
    candidates.extend(fields.iter().cloned().map(LabelKind::Field));

    ui.horizontal_wrapped(|ui| {
        for kind in candidates {
            let mut enabled = kinds.contains(&kind);
            if ui.checkbox(&mut enabled, kind.name()).changed() {
                if enabled {
                    kinds.push(kind);
                } else {
                    kinds.retain(|existing| *existing != kind);
                }
            }
        }
    });
}

impl ViewModel {
    pub(in crate::app) fn draw_controls(&mut self, ui: &mut Ui) {
        ui.heading("Graph Controls");
        ui.separator();
        ui.add_space(4.0);

        egui::ScrollArea::vertical()
            .id_salt("controls_scroll")
            .auto_shrink([false, false])
            .show(ui, |ui| {
                self.draw_search(ui);
                ui.separator();
                self.draw_relationship_editor(ui);
                ui.separator();
                self.draw_render_options(ui);
                ui.separator();
                self.draw_selection_actions(ui);
                ui.separator();
                self.draw_layout_controls(ui);
                ui.separator();
                self.draw_view_config(ui);
            });
    }

    fn draw_search(&mut self, ui: &mut Ui) {
        ui.label("Search entities")
            .on_hover_text("Highlight matching entities without changing the graph.");
        ui.text_edit_singleline(&mut self.search)
            .on_hover_text("Fuzzy match by default; strict matching wants a literal substring.");

        ui.horizontal(|ui| {
            let mut options = self.scene.options().clone();
            ui.checkbox(&mut options.strict_matches, "Strict")
                .on_hover_text("Match the query as an exact substring.");
            self.scene.set_options(options);

            if ui.button("Select matches").clicked()
                && let Some(matches) = self.search_matches()
            {
                *self.scene.selection_mut() = matches.as_ref().clone();
                self.scene.invalidate();
                self.set_status(format!("Selected {} matching entities.", matches.len()), false);
            }
        });
    }

    fn draw_relationship_editor(&mut self, ui: &mut Ui) {
        let fields = self.scene.records().fields();

        egui::CollapsingHeader::new("Relationships")
            .default_open(true)
            .show(ui, |ui| {
                ui.horizontal(|ui| {
                    ui.label("From");
                    field_combo(ui, "draft_from_field", &mut self.draft.from_field, &fields);
                    ui.checkbox(&mut self.draft.from_typed, "typed")
                        .on_hover_text("Prefix entities with the field name.");
                });
                enum_combo(
                    ui,
                    "draft_from_icon",
                    "From icon",
                    &mut self.draft.from_icon,
                    &NodeIcon::ALL,
                    NodeIcon::name,
                );

                ui.horizontal(|ui| {
                    ui.label("To");
                    field_combo(ui, "draft_to_field", &mut self.draft.to_field, &fields);
                    ui.checkbox(&mut self.draft.to_typed, "typed")
                        .on_hover_text("Prefix entities with the field name.");
                });
                enum_combo(
                    ui,
                    "draft_to_icon",
                    "To icon",
                    &mut self.draft.to_icon,
                    &NodeIcon::ALL,
                    NodeIcon::name,
                );

                enum_combo(
                    ui,
                    "draft_style",
                    "Line style",
                    &mut self.draft.style,
                    &EdgeStyle::ALL,
                    EdgeStyle::name,
                );
                ui.checkbox(&mut self.draft.ignore_not_set, "Ignore not-set values")
                    .on_hover_text("Skip records where either field has no value.");

                if ui.button("Add relationship").clicked() {
                    let spec = self.draft.clone();
                    self.add_relationship(spec);
                }

                ui.add_space(4.0);
                ui.label(RichText::new("Active").strong());
                let active = self.scene.links().relationships().to_vec();
                if active.is_empty() {
                    ui.label("No relationships yet.");
                }
                for spec in active {
                    ui.horizontal(|ui| {
                        if ui.small_button("x").on_hover_text("Remove relationship").clicked()
                            && self.scene.remove_relationship(&spec)
                        {
                            self.graph_changed();
                        }
                        ui.label(format!(
                            "{} -> {}  ({})",
                            spec.from_field,
                            spec.to_field,
                            spec.style.name()
                        ));
                    });
                }

                let recent = self.scene.links().recent().map(str::to_owned).collect::<Vec<_>>();
                if !recent.is_empty() {
                    ui.collapsing("Recent", |ui| {
                        for encoded in recent {
                            let Ok(spec) = RelationshipSpec::decode(&encoded) else {
                                continue;
                            };
                            let text = format!("{} -> {}", spec.from_field, spec.to_field);
                            if ui.link(text).on_hover_text(encoded.as_str()).clicked() {
                                self.draft = spec.clone();
                                self.add_relationship(spec);
                            }
                        }
                    });
                }
            });
    }

    fn add_relationship(&mut self, spec: RelationshipSpec) {
        let was_empty = self.scene.links().graph().is_empty();
        let description = format!("{} -> {}", spec.from_field, spec.to_field);
        if self.scene.add_relationship(spec) {
            if was_empty {
                self.scene.zoom_to_fit();
            }
            self.graph_changed();
            self.set_status(format!("Added {description}."), false);
        } else {
            self.set_status(format!("No tablet resolves {description}."), true);
        }
    }

    fn draw_render_options(&mut self, ui: &mut Ui) {
        let fields = self.scene.records().fields();
        let mut options = self.scene.options().clone();

        egui::CollapsingHeader::new("Render options")
            .default_open(true)
            .show(ui, |ui| {
                enum_combo(
                    ui,
                    "node_size",
                    "Node size",
                    &mut options.node_size,
                    &NodeSizeMode::ALL,
                    NodeSizeMode::name,
                );
                enum_combo(
                    ui,
                    "node_color",
                    "Node color",
                    &mut options.node_color,
                    &NodeColorMode::ALL,
                    NodeColorMode::name,
                );
                enum_combo(
                    ui,
                    "link_size",
                    "Link size",
                    &mut options.link_size,
                    &LinkSizeMode::ALL,
                    LinkSizeMode::name,
                );
                enum_combo(
                    ui,
                    "link_color",
                    "Link color",
                    &mut options.link_color,
                    &LinkColorMode::ALL,
                    LinkColorMode::name,
                );
                enum_combo(
                    ui,
                    "background",
                    "Background",
                    &mut options.background,
                    &BackgroundMode::ALL,
                    BackgroundMode::name,
                );

                ui.horizontal(|ui| {
                    ui.label("Color by");
                    egui::ComboBox::from_id_salt("color_by")
                        .selected_text(options.color_by.as_deref().unwrap_or("none"))
                        .show_ui(ui, |ui| {
                            ui.selectable_value(&mut options.color_by, None, "none");
                            for field in &fields {
                                ui.selectable_value(
                                    &mut options.color_by,
                                    Some(field.clone()),
                                    field.as_str(),
                                );
                            }
                        });
                })
                .response
                .on_hover_text("Field whose first value picks each record's color.");

                ui.collapsing("Node labels", |ui| {
                    label_toggles(ui, &mut options.node_labels, &fields);
                });
                ui.collapsing("Link labels", |ui| {
                    label_toggles(ui, &mut options.link_labels, &fields);
                });

                ui.horizontal_wrapped(|ui| {
                    ui.checkbox(&mut options.draw_node_labels, "Node labels");
                    ui.checkbox(&mut options.draw_link_labels, "Link labels");
                    ui.checkbox(&mut options.dynamic_labels, "Dynamic labels")
                        .on_hover_text("Only label prominent, selected or hovered nodes.");
                });
                ui.horizontal_wrapped(|ui| {
                    ui.checkbox(&mut options.arrows, "Arrows");
                    ui.checkbox(&mut options.curves, "Curves");
                    ui.checkbox(&mut options.transparency, "Transparency");
                    ui.checkbox(&mut options.timing_marks, "Timing")
                        .on_hover_text("Show the duration of the last render pass.");
                });
            });

        if &options != self.scene.options() {
            self.scene.set_options(options);
            self.view_config_text = self.scene.view_config().serialize();
        }
    }

    fn draw_selection_actions(&mut self, ui: &mut Ui) {
        ui.label(RichText::new("Selection").strong());
        ui.horizontal_wrapped(|ui| {
            let has_selection = !self.scene.selection().is_empty();

            if ui
                .add_enabled(has_selection, egui::Button::new("Retain"))
                .on_hover_text("Keep only the selected entities in the graph.")
                .clicked()
            {
                self.scene.retain_selection();
                self.graph_changed();
            }
            if ui
                .add_enabled(
                    !self.scene.links().retained().is_empty(),
                    egui::Button::new("Clear retained"),
                )
                .clicked()
            {
                self.scene.clear_retained();
                self.graph_changed();
            }
            if ui
                .add_enabled(has_selection, egui::Button::new("Sticky labels"))
                .on_hover_text("Toggle always-on labels for the selected entities.")
                .clicked()
            {
                let selected = self.scene.selection().iter().cloned().collect::<Vec<_>>();
                for entity in selected {
                    self.scene.toggle_sticky(&entity);
                }
            }
            if ui.button("Zoom to fit").clicked() {
                self.scene.zoom_to_fit();
            }
        });
    }

    fn draw_layout_controls(&mut self, ui: &mut Ui) {
        ui.collapsing("Layout", |ui| {
            ui.horizontal(|ui| {
                ui.label("File");
                ui.text_edit_singleline(&mut self.layout_path);
            });
            ui.horizontal(|ui| {
                if ui.button("Save").clicked() {
                    let path = self.layout_path.clone();
                    match self.scene.save_layout(Path::new(&path)) {
                        Ok(written) => {
                            self.set_status(format!("Saved {written} positions to {path}."), false);
                        }
                        Err(error) => {
                            warn!(error = %format!("{error:#}"), "layout save failed");
                            self.set_status(format!("Layout save failed: {error:#}"), true);
                        }
                    }
                }
                if ui.button("Load").clicked() {
                    let path = self.layout_path.clone();
                    match self.scene.load_layout(Path::new(&path)) {
                        Ok(applied) => {
                            self.scene.zoom_to_fit();
                            self.set_status(format!("Applied {applied} positions from {path}."), false);
                        }
                        Err(error) => {
                            warn!(error = %format!("{error:#}"), "layout load failed");
                            self.set_status(format!("Layout load failed: {error:#}"), true);
                        }
                    }
                }
            });

            ui.add_space(4.0);
            if ui
                .add_enabled(
                    !self.scene.links().graph().is_empty(),
                    egui::Button::new("Preview layouts"),
                )
                .on_hover_text("Compute candidate layouts on worker threads.")
                .clicked()
            {
                let snapshot = Arc::new(LayoutSnapshot::capture(self.scene.links()));
                self.previews = preview_layouts(
                    snapshot,
                    default_candidates(PREVIEW_CANDIDATES),
                    self.settings.preview_workers,
                );
                info!(count = self.previews.len(), "layout previews ready");
            }

            let mut adopted = None;
            for (index, preview) in self.previews.iter().enumerate() {
                ui.horizontal(|ui| {
                    ui.label(preview.candidate.label());
                    if ui.small_button("Apply").clicked() {
                        adopted = Some(index);
                    }
                });
            }
            if let Some(preview) = adopted.and_then(|index| self.previews.get(index)) {
                let label = preview.candidate.label();
                let applied = self.scene.adopt_layout(&preview.positions);
                self.scene.zoom_to_fit();
                self.set_status(format!("Applied {label} to {applied} entities."), false);
            }
        });
    }

    fn draw_view_config(&mut self, ui: &mut Ui) {
        ui.collapsing("View configuration", |ui| {
            ui.add(
                egui::TextEdit::multiline(&mut self.view_config_text)
                    .desired_rows(3)
                    .code_editor(),
            );
            ui.horizontal(|ui| {
                if ui.button("Copy").clicked() {
                    self.view_config_text = self.scene.view_config().serialize();
                    ui.ctx().copy_text(self.view_config_text.clone());
                }
                if ui.button("Apply").clicked() {
                    let raw = self.view_config_text.trim().to_owned();
                    match self.scene.apply_view_config(&raw) {
                        Ok(()) => {
                            self.graph_changed();
                            self.set_status("View configuration applied.".to_owned(), false);
                        }
                        Err(error) => {
                            self.set_status(format!("View configuration rejected: {error}"), true);
                        }
                    }
                }
            });
            if let Some(status) = &self.status
                && status.is_error
            {
                ui.label(RichText::new(status.text.as_str()).color(Color32::from_rgb(235, 110, 100)));
            }
        });
    }
}
