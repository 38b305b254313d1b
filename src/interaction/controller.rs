use std::cmp::Reverse;

use eframe::egui::{Pos2, Rect};
use tracing::debug;

use crate::graph::WorldPoint;
use crate::scene::Scene;

use super::arrange::{circle_positions, grid_positions, line_positions};
use super::selection::{Modifiers, SetOp};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum GestureState {
    #[default]
    None,
    Panning,
    Selecting,
    Moving,
    GridLayout,
    LineLayout,
    CircleLayout,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PointerButton {
    Primary,
    Secondary,
}

/// Held keys that preselect the gesture started by the next press.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModeLatch {
    Pan,
    Grid,
    Line,
    Circle,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Drag {
    pub start: Pos2,
    pub end: Pos2,
    pub start_world: WorldPoint,
    pub end_world: WorldPoint,
}

impl Drag {
    fn new(point: Pos2, world: WorldPoint) -> Self {
        Self {
            start: point,
            end: point,
            start_world: world,
            end_world: world,
        }
    }

    pub fn screen_rect(&self) -> Rect {
        Rect::from_two_pos(self.start, self.end)
    }

    pub fn world_delta(&self) -> (f64, f64) {
        (
            self.end_world.x - self.start_world.x,
            self.end_world.y - self.start_world.y,
        )
    }

    pub fn is_click(&self) -> bool {
        self.start == self.end
    }
}

#[derive(Debug, Default)]
pub struct InteractionController {
    state: GestureState,
    pan_latch: bool,
    grid_latch: bool,
    line_latch: bool,
    circle_latch: bool,
    drag: Option<Drag>,
}

impl InteractionController {
    pub fn state(&self) -> GestureState {
        self.state
    }

    pub fn drag(&self) -> Option<&Drag> {
        self.drag.as_ref()
    }

    pub fn latched(&self, latch: ModeLatch) -> bool {
        match latch {
            ModeLatch::Pan => self.pan_latch,
            ModeLatch::Grid => self.grid_latch,
            ModeLatch::Line => self.line_latch,
            ModeLatch::Circle => self.circle_latch,
        }
    }

    pub fn key_down(&mut self, latch: ModeLatch) {
        *self.latch_mut(latch) = true;
    }

    pub fn key_up(&mut self, latch: ModeLatch) {
        *self.latch_mut(latch) = false;
    }

    fn latch_mut(&mut self, latch: ModeLatch) -> &mut bool {
        match latch {
            ModeLatch::Pan => &mut self.pan_latch,
            ModeLatch::Grid => &mut self.grid_latch,
            ModeLatch::Line => &mut self.line_latch,
            ModeLatch::Circle => &mut self.circle_latch,
        }
    }

    pub fn press(
        &mut self,
        scene: &mut Scene,
        point: Pos2,
        button: PointerButton,
        modifiers: Modifiers,
    ) {
        if self.state != GestureState::None {
            return;
        }

        let next = if button == PointerButton::Secondary || self.pan_latch {
            GestureState::Panning
        } else if self.grid_latch {
            GestureState::GridLayout
        } else if self.line_latch {
            GestureState::LineLayout
        } else if self.circle_latch {
            GestureState::CircleLayout
        } else {
            let under = scene.entities_at(point);
            if !under.is_disjoint(scene.selection()) {
                GestureState::Moving
            } else if !under.is_empty() && !modifiers.any() {
                *scene.selection_mut() = under;
                scene.invalidate();
                GestureState::Moving
            } else if !under.is_empty() {
                SetOp::from_modifiers(modifiers).apply(scene.selection_mut(), under);
                scene.invalidate();
                GestureState::None
            } else {
                GestureState::Selecting
            }
        };

        self.state = next;
        self.drag = (next != GestureState::None)
            .then(|| Drag::new(point, scene.screen_to_world(point)));
        debug!(state = ?self.state, "gesture started");
    }

    pub fn drag_to(&mut self, scene: &Scene, point: Pos2, modifiers: Modifiers) {
        let axis_locked = matches!(
            self.state,
            GestureState::Panning | GestureState::LineLayout
        );
        let Some(drag) = self.drag.as_mut() else {
            return;
        };

        let mut end = point;
        if axis_locked && modifiers.shift {
            end.y = drag.start.y;
        } else if axis_locked && modifiers.ctrl {
            end.x = drag.start.x;
        }
        drag.end = end;
        drag.end_world = scene.screen_to_world(end);
    }

    pub fn release(&mut self, scene: &mut Scene, point: Pos2, modifiers: Modifiers) {
        self.drag_to(scene, point, modifiers);
        let state = std::mem::take(&mut self.state);
        let Some(drag) = self.drag.take() else {
            return;
        };

        match state {
            GestureState::None => {}
            GestureState::Panning => {
                if drag.is_click() {
                    if scene.entities_at(drag.end).is_empty() {
                        scene.zoom_to_fit();
                    }
                } else {
                    let (dx, dy) = drag.world_delta();
                    scene.pan(-dx, -dy);
                }
            }
            GestureState::Selecting => {
                let items = scene.entities_in_rect(drag.screen_rect());
                SetOp::from_modifiers(modifiers).apply(scene.selection_mut(), items);
                scene.invalidate();
            }
            GestureState::Moving => {
                if drag.is_click() {
                    let under = scene.entities_at(drag.end);
                    SetOp::from_modifiers(modifiers).apply(scene.selection_mut(), under);
                    scene.invalidate();
                } else {
                    let (dx, dy) = drag.world_delta();
                    let selected = scene.selection().clone();
                    scene.move_entities(&selected, dx, dy);
                }
            }
            GestureState::GridLayout | GestureState::LineLayout | GestureState::CircleLayout => {
                let ordered = ordered_selection(scene);
                let positions = match state {
                    GestureState::GridLayout => {
                        grid_positions(ordered.len(), drag.start_world, drag.end_world)
                    }
                    GestureState::LineLayout => {
                        line_positions(ordered.len(), drag.start_world, drag.end_world)
                    }
                    _ => circle_positions(ordered.len(), drag.start_world, drag.end_world),
                };
                let placements = ordered.into_iter().zip(positions).collect::<Vec<_>>();
                scene.place_entities(&placements);
            }
        }
        debug!(?state, "gesture finished");
    }
}

/// Selected entities, most records first.
fn ordered_selection(scene: &Scene) -> Vec<String> {
    let mut ordered = scene.selection().iter().cloned().collect::<Vec<_>>();
    ordered.sort_by_cached_key(|entity| (Reverse(scene.record_count(entity)), entity.clone()));
    ordered
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;
    use crate::graph::RelationshipSpec;
    use crate::scene::scene_from_rows;
    use pretty_assertions::assert_eq;

    fn set(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|item| (*item).to_owned()).collect()
    }

    fn two_nodes() -> Scene {
        let mut scene = scene_from_rows(
            &[&[("sip", "a"), ("dip", "b")]],
            &[RelationshipSpec::new("sip", "dip")],
        );
        scene.place_entities(&[
            ("a".to_owned(), WorldPoint::new(10.0, 10.0)),
            ("b".to_owned(), WorldPoint::new(50.0, 50.0)),
        ]);
        scene.render();
        scene
    }

    fn click(controller: &mut InteractionController, scene: &mut Scene, point: Pos2, modifiers: Modifiers) {
        controller.press(scene, point, PointerButton::Primary, modifiers);
        controller.release(scene, point, modifiers);
    }

    const SHIFT: Modifiers = Modifiers {
        shift: true,
        ctrl: false,
    };
    const CTRL: Modifiers = Modifiers {
        shift: false,
        ctrl: true,
    };

    #[test]
    fn pressing_an_unselected_node_selects_and_moves_it() {
        let mut scene = two_nodes();
        let mut controller = InteractionController::default();

        controller.press(&mut scene, Pos2::new(10.0, 10.0), PointerButton::Primary, Modifiers::NONE);
        assert_eq!(controller.state(), GestureState::Moving);
        assert_eq!(scene.selection(), &set(&["a"]));

        controller.drag_to(&scene, Pos2::new(-5.0, 12.0), Modifiers::NONE);
        controller.release(&mut scene, Pos2::new(20.0, 15.0), Modifiers::NONE);

        assert_eq!(controller.state(), GestureState::None);
        assert_eq!(scene.links().world().get("a"), Some(WorldPoint::new(20.0, 15.0)));
        assert_eq!(scene.links().world().get("b"), Some(WorldPoint::new(50.0, 50.0)));
    }

    #[test]
    fn zero_length_move_becomes_a_click_select() {
        let mut scene = two_nodes();
        let mut controller = InteractionController::default();
        scene.selection_mut().extend(set(&["a", "b"]));

        click(&mut controller, &mut scene, Pos2::new(10.0, 10.0), Modifiers::NONE);
        assert_eq!(scene.selection(), &set(&["a"]));
        assert_eq!(scene.links().world().get("a"), Some(WorldPoint::new(10.0, 10.0)));
    }

    #[test]
    fn modified_press_applies_set_operation_immediately() {
        let mut scene = two_nodes();
        let mut controller = InteractionController::default();
        scene.selection_mut().insert("a".to_owned());

        controller.press(&mut scene, Pos2::new(50.0, 50.0), PointerButton::Primary, CTRL);
        assert_eq!(controller.state(), GestureState::None);
        assert_eq!(scene.selection(), &set(&["a", "b"]));
        assert!(controller.drag().is_none());
    }

    #[test]
    fn rubber_band_selection_uses_modifiers() {
        let mut scene = two_nodes();
        let mut controller = InteractionController::default();

        controller.press(&mut scene, Pos2::new(80.0, 80.0), PointerButton::Primary, Modifiers::NONE);
        assert_eq!(controller.state(), GestureState::Selecting);
        controller.release(&mut scene, Pos2::new(0.0, 0.0), Modifiers::NONE);
        assert_eq!(scene.selection(), &set(&["a", "b"]));

        controller.press(&mut scene, Pos2::new(30.0, 30.0), PointerButton::Primary, Modifiers::NONE);
        controller.release(&mut scene, Pos2::new(0.0, 0.0), SHIFT);
        assert_eq!(scene.selection(), &set(&["b"]));

        click(&mut controller, &mut scene, Pos2::new(90.0, 5.0), Modifiers::NONE);
        assert!(scene.selection().is_empty());
    }

    #[test]
    fn secondary_drag_pans_the_extents() {
        let mut scene = two_nodes();
        let mut controller = InteractionController::default();

        controller.press(&mut scene, Pos2::new(50.0, 50.0), PointerButton::Secondary, Modifiers::NONE);
        assert_eq!(controller.state(), GestureState::Panning);
        controller.release(&mut scene, Pos2::new(60.0, 45.0), Modifiers::NONE);

        let extents = scene.transform().extents();
        assert!((extents.min_x + 10.0).abs() < 1e-9);
        assert!((extents.min_y - 5.0).abs() < 1e-9);
    }

    #[test]
    fn shift_locks_pan_to_horizontal() {
        let mut scene = two_nodes();
        let mut controller = InteractionController::default();
        controller.key_down(ModeLatch::Pan);

        controller.press(&mut scene, Pos2::new(50.0, 50.0), PointerButton::Primary, Modifiers::NONE);
        controller.release(&mut scene, Pos2::new(60.0, 80.0), SHIFT);

        let extents = scene.transform().extents();
        assert!((extents.min_x + 10.0).abs() < 1e-9);
        assert!(extents.min_y.abs() < 1e-9);
    }

    #[test]
    fn pan_click_on_empty_canvas_fits_the_view() {
        let mut scene = two_nodes();
        let mut controller = InteractionController::default();

        controller.press(&mut scene, Pos2::new(90.0, 5.0), PointerButton::Secondary, Modifiers::NONE);
        controller.release(&mut scene, Pos2::new(90.0, 5.0), Modifiers::NONE);

        let extents = scene.transform().extents();
        assert!((extents.min_x - 8.0).abs() < 1e-9);
        assert!((extents.width - 44.0).abs() < 1e-9);
    }

    #[test]
    fn grid_gesture_places_selection_by_record_count() {
        let mut rows: Vec<Vec<(&str, &str)>> = Vec::new();
        let targets = ["e1", "e2", "e3", "e4", "e5", "e6", "e7", "e8", "e9"];
        for (index, target) in targets.iter().enumerate() {
            for _ in 0..=index {
                rows.push(vec![("sip", "hub"), ("dip", *target)]);
            }
        }
        let rows = rows.iter().map(Vec::as_slice).collect::<Vec<_>>();
        let mut scene = scene_from_rows(&rows, &[RelationshipSpec::new("sip", "dip")]);
        scene.render();
        scene.selection_mut().extend(set(&targets));

        let mut controller = InteractionController::default();
        controller.key_down(ModeLatch::Grid);
        controller.press(&mut scene, Pos2::new(0.0, 0.0), PointerButton::Primary, Modifiers::NONE);
        assert_eq!(controller.state(), GestureState::GridLayout);
        controller.release(&mut scene, Pos2::new(90.0, 90.0), Modifiers::NONE);

        let world = scene.links().world();
        let expected = [
            ("e9", 0.0, 0.0),
            ("e8", 45.0, 0.0),
            ("e7", 90.0, 0.0),
            ("e6", 0.0, 45.0),
            ("e5", 45.0, 45.0),
            ("e4", 90.0, 45.0),
            ("e3", 0.0, 90.0),
            ("e2", 45.0, 90.0),
            ("e1", 90.0, 90.0),
        ];
        for (entity, x, y) in expected {
            assert_eq!(world.get(entity), Some(WorldPoint::new(x, y)), "{entity}");
        }
        assert_eq!(controller.state(), GestureState::None);
    }

    #[test]
    fn releasing_a_latch_mid_gesture_keeps_the_gesture() {
        let mut scene = two_nodes();
        scene.selection_mut().extend(set(&["a", "b"]));
        let mut controller = InteractionController::default();

        controller.key_down(ModeLatch::Line);
        controller.press(&mut scene, Pos2::new(0.0, 20.0), PointerButton::Primary, Modifiers::NONE);
        controller.key_up(ModeLatch::Line);
        assert!(!controller.latched(ModeLatch::Line));
        controller.release(&mut scene, Pos2::new(40.0, 20.0), Modifiers::NONE);

        let world = scene.links().world();
        let mut placed = [world.get("a"), world.get("b")]
            .into_iter()
            .flatten()
            .map(|point| (point.x as i64, point.y as i64))
            .collect::<Vec<_>>();
        placed.sort();
        assert_eq!(placed, vec![(0, 20), (40, 20)]);
    }

    #[test]
    fn circle_gesture_uses_drag_as_radius() {
        let mut scene = two_nodes();
        scene.selection_mut().extend(set(&["a", "b"]));
        let mut controller = InteractionController::default();

        controller.key_down(ModeLatch::Circle);
        controller.press(&mut scene, Pos2::new(50.0, 50.0), PointerButton::Primary, Modifiers::NONE);
        controller.release(&mut scene, Pos2::new(50.0, 60.0), Modifiers::NONE);

        let center = WorldPoint::new(50.0, 50.0);
        for entity in ["a", "b"] {
            let point = scene.links().world().get(entity).unwrap_or_default();
            assert!((point.distance(center) - 10.0).abs() < 1e-9);
        }
    }
}
