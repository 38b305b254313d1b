use std::collections::BTreeSet;

use eframe::egui::{self, RichText, Ui};

use crate::records::{BundleId, RecordSet};
use crate::util::short_name;
use crate::view::LinkKey;

use super::super::ViewModel;

const MAX_LINK_SCAN_NODES: usize = 64;

struct SelectedEntry {
    entity: String,
    records: usize,
    clustering: Option<f64>,
    sticky: bool,
}

fn record_summary(records: &RecordSet, bundle: BundleId) -> String {
    let Some(record) = records.record(bundle) else {
        return format!("{bundle}  (missing)");
    };
    let tablet = records
        .tablet_of(bundle)
        .map_or("?", |tablet| tablet.name.as_str());
    let values = record
        .values
        .iter()
        .map(|(field, values)| format!("{field}={}", values.join("|")))
        .collect::<Vec<_>>()
        .join(", ");
    format!("{bundle} {tablet}: {values}")
}

impl ViewModel {
    /// Drawn links with both ends on selected nodes; `None` when the
    /// selection covers too many nodes to scan pairwise.
    fn links_within_selection(&self) -> Option<usize> {
        let context = self.scene.context()?;
        let keys = self
            .scene
            .selection()
            .iter()
            .filter_map(|entity| context.node_of(entity))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect::<Vec<_>>();
        if keys.len() > MAX_LINK_SCAN_NODES {
            return None;
        }

        let mut count = 0;
        for (index, &a) in keys.iter().enumerate() {
            for &b in &keys[index + 1..] {
                if self.scene.shapes().link_shape(LinkKey::new(a, b)).is_some() {
                    count += 1;
                }
            }
        }
        Some(count)
    }

    pub(in crate::app) fn draw_details(&mut self, ui: &mut Ui) {
        ui.heading("Selection Details");
        ui.add_space(6.0);

        let graph = self.scene.links().graph();
        ui.label(format!("Entities in graph: {}", graph.node_count()));
        let weakest = graph
            .component_conductance()
            .iter()
            .copied()
            .min_by(f64::total_cmp);
        let components = ui.label(format!(
            "Biconnected components: {}",
            graph.biconnected_components().len()
        ));
        if let Some(weakest) = weakest {
            components.on_hover_text(format!("Lowest component conductance: {weakest:.3}"));
        }
        if let Some(context) = self.scene.context() {
            ui.label(format!(
                "Records without a mapping: {}",
                context.no_mapping().len()
            ));
        }
        ui.separator();

        if self.scene.selection().is_empty() {
            ui.label("Select entities in the graph.");
            return;
        }

        let coefficients = graph.clustering_coefficients();
        let sticky = self.scene.links().sticky_labels();
        let mut entries = self
            .scene
            .selection()
            .iter()
            .map(|entity| SelectedEntry {
                entity: entity.clone(),
                records: self.scene.record_count(entity),
                clustering: graph
                    .directed
                    .index_of(entity)
                    .and_then(|index| coefficients.get(index).copied()),
                sticky: sticky.contains(entity),
            })
            .collect::<Vec<_>>();
        entries.sort_by(|a, b| b.records.cmp(&a.records).then_with(|| a.entity.cmp(&b.entity)));

        let members = self
            .scene
            .selection()
            .iter()
            .filter_map(|entity| graph.directed.index_of(entity))
            .collect::<BTreeSet<_>>();
        let conductance = graph.conductance(&members);

        ui.label(RichText::new(format!("{} selected", entries.len())).strong());
        ui.label(format!("Selection conductance: {conductance:.3}"))
            .on_hover_text("Links leaving the selection relative to the smaller side's volume.");
        if let Some(links) = self.links_within_selection() {
            ui.label(format!("Links within selection: {links}"));
        }
        ui.add_space(4.0);

        let mut focus = None;
        let mut toggle_sticky = None;
        egui::ScrollArea::vertical()
            .id_salt("selected_entities_scroll")
            .max_height(240.0)
            .auto_shrink([false, true])
            .show_rows(ui, 22.0, entries.len(), |ui, row_range| {
                for entry in &entries[row_range] {
                    ui.horizontal(|ui| {
                        let pin = if entry.sticky { "unpin" } else { "pin" };
                        if ui
                            .small_button(pin)
                            .on_hover_text("Toggle an always-on label.")
                            .clicked()
                        {
                            toggle_sticky = Some(entry.entity.clone());
                        }
                        let clustering = entry
                            .clustering
                            .map_or_else(|| "-".to_owned(), |value| format!("{value:.2}"));
                        let label = format!(
                            "{}  ({} records, cc {clustering})",
                            short_name(&entry.entity, 32),
                            entry.records
                        );
                        if ui
                            .link(label)
                            .on_hover_text(entry.entity.as_str())
                            .clicked()
                        {
                            focus = Some(entry.entity.clone());
                        }
                    });
                }
            });

        if let Some(entity) = toggle_sticky {
            self.scene.toggle_sticky(&entity);
        }
        if let Some(entity) = focus {
            *self.scene.selection_mut() = BTreeSet::from([entity]);
            self.scene.invalidate();
            self.record_rows_visible = Self::INITIAL_RECORD_ROWS;
        }

        ui.separator();
        ui.label(RichText::new("Backing records").strong());

        let bundles = self
            .scene
            .bundles_for_entities(self.scene.selection())
            .into_iter()
            .collect::<Vec<_>>();
        if bundles.is_empty() {
            ui.label("No rendered records behind the selection.");
            return;
        }

        let drawn = bundles
            .iter()
            .flat_map(|&bundle| self.scene.shapes_for_bundle(bundle))
            .collect::<BTreeSet<_>>();
        ui.label(format!("{} records drawn as {} shapes", bundles.len(), drawn.len()));

        let row_count = bundles.len().min(self.record_rows_visible);
        let mut should_load_more = false;
        let records = self.scene.records();

        egui::ScrollArea::vertical()
            .id_salt("backing_records_scroll")
            .auto_shrink([false, false])
            .show_rows(ui, 20.0, row_count, |ui, row_range| {
                if row_range.end + Self::RECORD_PREFETCH_MARGIN >= row_count {
                    should_load_more = true;
                }

                for &bundle in &bundles[row_range] {
                    let summary = record_summary(records, bundle);
                    ui.add(egui::Label::new(RichText::new(summary).monospace()).truncate())
                        .on_hover_text(record_summary(records, bundle));
                }
            });

        if should_load_more && row_count < bundles.len() {
            self.record_rows_visible = (row_count + Self::RECORD_PAGE_ROWS).min(bundles.len());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::record_set_from_rows;
    use pretty_assertions::assert_eq;

    #[test]
    fn summaries_list_every_field() {
        let records = record_set_from_rows(&[&[("sip", "a"), ("dip", "b")]]);
        let bundle = records.bundles().next().unwrap_or(BundleId(0));

        let summary = record_summary(&records, bundle);
        assert!(summary.contains("dip=b"));
        assert!(summary.contains("sip=a"));
        assert_eq!(record_summary(&records, BundleId(999)), "#999  (missing)");
    }
}
