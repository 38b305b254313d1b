use eframe::egui::{self, Key, Pos2, Rect, Ui};

use crate::interaction::{ModeLatch, Modifiers, PointerButton};

use super::super::ViewModel;

const SCROLL_PER_ZOOM_STEP: f32 = 50.0;

const LATCH_KEYS: [(Key, ModeLatch); 4] = [
    (Key::Space, ModeLatch::Pan),
    (Key::G, ModeLatch::Grid),
    (Key::L, ModeLatch::Line),
    (Key::C, ModeLatch::Circle),
];

fn local(rect: Rect, point: Pos2) -> Pos2 {
    (point - rect.min).to_pos2()
}

fn modifiers(ui: &Ui) -> Modifiers {
    ui.input(|input| Modifiers {
        shift: input.modifiers.shift,
        ctrl: input.modifiers.ctrl || input.modifiers.command,
    })
}

impl ViewModel {
    pub(in crate::app) fn handle_graph_keys(&mut self, ui: &Ui) {
        if ui.ctx().wants_keyboard_input() {
            for (_, latch) in LATCH_KEYS {
                self.controller.key_up(latch);
            }
            return;
        }

        for (key, latch) in LATCH_KEYS {
            if ui.input(|input| input.key_down(key)) {
                self.controller.key_down(latch);
            } else {
                self.controller.key_up(latch);
            }
        }

        let (fit, clear) =
            ui.input(|input| (input.key_pressed(Key::F), input.key_pressed(Key::Escape)));
        if fit {
            self.scene.zoom_to_fit();
        }
        if clear && !self.scene.selection().is_empty() {
            self.scene.selection_mut().clear();
            self.scene.invalidate();
        }
    }

    /// Wheel notches accumulate until they add up to whole zoom steps anchored
    /// at the pointer.
    pub(in crate::app) fn handle_graph_zoom(
        &mut self,
        ui: &Ui,
        rect: Rect,
        response: &egui::Response,
    ) {
        if !response.hovered() {
            self.scroll_accumulator = 0.0;
            return;
        }

        let scroll = ui.input(|input| input.raw_scroll_delta.y);
        if scroll.abs() <= f32::EPSILON {
            return;
        }

        self.scroll_accumulator += scroll;
        let steps = (self.scroll_accumulator / SCROLL_PER_ZOOM_STEP).trunc() as i32;
        if steps == 0 {
            return;
        }
        self.scroll_accumulator -= steps as f32 * SCROLL_PER_ZOOM_STEP;

        let anchor = ui
            .input(|input| input.pointer.hover_pos())
            .map(|pointer| local(rect, pointer));
        self.scene.zoom_in(steps, anchor);
    }

    pub(in crate::app) fn handle_graph_pointer(
        &mut self,
        ui: &Ui,
        rect: Rect,
        response: &egui::Response,
    ) {
        let modifiers = modifiers(ui);
        let button = if response.drag_started_by(egui::PointerButton::Secondary)
            || response.drag_started_by(egui::PointerButton::Middle)
            || response.secondary_clicked()
            || response.middle_clicked()
        {
            PointerButton::Secondary
        } else {
            PointerButton::Primary
        };

        if response.drag_started() {
            let origin = ui
                .input(|input| input.pointer.press_origin())
                .or(response.interact_pointer_pos());
            if let Some(origin) = origin {
                self.controller
                    .press(&mut self.scene, local(rect, origin), button, modifiers);
            }
        }

        if response.dragged()
            && let Some(pointer) = response.interact_pointer_pos()
        {
            self.controller
                .drag_to(&self.scene, local(rect, pointer), modifiers);
            ui.ctx().request_repaint();
        }

        if response.drag_stopped() {
            let end = response
                .interact_pointer_pos()
                .map(|pointer| local(rect, pointer))
                .or_else(|| self.controller.drag().map(|drag| drag.end));
            if let Some(end) = end {
                self.controller.release(&mut self.scene, end, modifiers);
            }
        }

        if (response.clicked() || response.secondary_clicked() || response.middle_clicked())
            && let Some(pointer) = response.interact_pointer_pos()
        {
            let point = local(rect, pointer);
            self.controller.press(&mut self.scene, point, button, modifiers);
            self.controller.release(&mut self.scene, point, modifiers);
        }
    }

    /// Scene-local pointer position while the pointer is over the canvas.
    pub(in crate::app) fn hovered_point(ui: &Ui, rect: Rect) -> Option<Pos2> {
        ui.input(|input| input.pointer.hover_pos())
            .filter(|pointer| rect.contains(*pointer))
            .map(|pointer| local(rect, pointer))
    }
}
