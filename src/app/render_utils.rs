use eframe::egui::{Color32, Painter, Pos2, Rect, Shape, Stroke, Vec2, vec2};

use crate::graph::{EdgeStyle, NodeIcon};
use crate::settings::Theme;
use crate::view::CoordinateTransform;

const CURVE_SAMPLES: usize = 16;
const CURVE_BEND: f32 = 0.15;
const ARROW_LENGTH: f32 = 9.0;

pub(super) fn blend_color(base: Color32, overlay: Color32, amount: f32) -> Color32 {
    let amount = amount.clamp(0.0, 1.0);
    let inverse = 1.0 - amount;

    Color32::from_rgba_unmultiplied(
        ((base.r() as f32 * inverse) + (overlay.r() as f32 * amount)) as u8,
        ((base.g() as f32 * inverse) + (overlay.g() as f32 * amount)) as u8,
        ((base.b() as f32 * inverse) + (overlay.b() as f32 * amount)) as u8,
        ((base.a() as f32 * inverse) + (overlay.a() as f32 * amount)) as u8,
    )
}

pub(super) fn dim_color(color: Color32, factor: f32) -> Color32 {
    let factor = factor.clamp(0.0, 1.0);
    Color32::from_rgba_unmultiplied(
        (color.r() as f32 * factor) as u8,
        (color.g() as f32 * factor) as u8,
        (color.b() as f32 * factor) as u8,
        (color.a() as f32 * (0.45 + (factor * 0.55))) as u8,
    )
}

/// Plain mode draws a fixed screen grid; geographic mode draws a 30 degree
/// graticule through the current transform, clipped to the globe.
pub(super) fn draw_background(
    painter: &Painter,
    rect: Rect,
    theme: &Theme,
    transform: &CoordinateTransform,
    geographic: bool,
) {
    painter.rect_filled(rect, 0.0, theme.background);
    let stroke = Stroke::new(1.0, theme.grid);

    if !geographic {
        let step = 56.0;
        let mut x = rect.left();
        while x < rect.right() {
            painter.line_segment([Pos2::new(x, rect.top()), Pos2::new(x, rect.bottom())], stroke);
            x += step;
        }
        let mut y = rect.top();
        while y < rect.bottom() {
            painter.line_segment([Pos2::new(rect.left(), y), Pos2::new(rect.right(), y)], stroke);
            y += step;
        }
        return;
    }

    let to_screen = |lon: f64, lat: f64| {
        rect.min
            + vec2(
                transform.world_to_screen_x(lon) as f32,
                transform.world_to_screen_y(lat) as f32,
            )
    };

    for step in 0..=12 {
        let lon = -180.0 + step as f64 * 30.0;
        let start = to_screen(lon, -90.0);
        let end = to_screen(lon, 90.0);
        if edge_visible(rect, start, end, 0.0) {
            painter.line_segment([start, end], stroke);
        }
    }
    for step in 0..=6 {
        let lat = -90.0 + step as f64 * 30.0;
        let start = to_screen(-180.0, lat);
        let end = to_screen(180.0, lat);
        if edge_visible(rect, start, end, 0.0) {
            painter.line_segment([start, end], stroke);
        }
    }
}

pub(super) fn circle_visible(rect: Rect, position: Pos2, radius: f32) -> bool {
    !(position.x + radius < rect.left()
        || position.x - radius > rect.right()
        || position.y + radius < rect.top()
        || position.y - radius > rect.bottom())
}

pub(super) fn edge_visible(rect: Rect, start: Pos2, end: Pos2, padding: f32) -> bool {
    let min_x = start.x.min(end.x) - padding;
    let max_x = start.x.max(end.x) + padding;
    let min_y = start.y.min(end.y) - padding;
    let max_y = start.y.max(end.y) + padding;

    if max_x < rect.left() || min_x > rect.right() || max_y < rect.top() || min_y > rect.bottom() {
        return false;
    }

    if rect.contains(start) || rect.contains(end) {
        return true;
    }

    let top_left = rect.left_top();
    let top_right = rect.right_top();
    let bottom_left = rect.left_bottom();
    let bottom_right = rect.right_bottom();

    segments_intersect(start, end, top_left, top_right)
        || segments_intersect(start, end, top_right, bottom_right)
        || segments_intersect(start, end, bottom_right, bottom_left)
        || segments_intersect(start, end, bottom_left, top_left)
}

fn segments_intersect(a1: Pos2, a2: Pos2, b1: Pos2, b2: Pos2) -> bool {
    fn cross(o: Pos2, a: Pos2, b: Pos2) -> f32 {
        let oa = a - o;
        let ob = b - o;
        (oa.x * ob.y) - (oa.y * ob.x)
    }

    let c1 = cross(a1, a2, b1);
    let c2 = cross(a1, a2, b2);
    let c3 = cross(b1, b2, a1);
    let c4 = cross(b1, b2, a2);

    (c1 <= 0.0 && c2 >= 0.0 || c1 >= 0.0 && c2 <= 0.0)
        && (c3 <= 0.0 && c4 >= 0.0 || c3 >= 0.0 && c4 <= 0.0)
}

pub(super) fn draw_icon(
    painter: &Painter,
    center: Pos2,
    radius: f32,
    icon: NodeIcon,
    fill: Color32,
    stroke: Stroke,
) {
    match icon {
        NodeIcon::Circle => {
            painter.circle(center, radius, fill, stroke);
        }
        NodeIcon::Square => {
            let half = radius * 0.9;
            let corners = vec![
                center + vec2(-half, -half),
                center + vec2(half, -half),
                center + vec2(half, half),
                center + vec2(-half, half),
            ];
            painter.add(Shape::convex_polygon(corners, fill, stroke));
        }
        NodeIcon::Triangle => {
            let corners = vec![
                center + vec2(0.0, -radius * 1.1),
                center + vec2(radius, radius * 0.8),
                center + vec2(-radius, radius * 0.8),
            ];
            painter.add(Shape::convex_polygon(corners, fill, stroke));
        }
        NodeIcon::Diamond => {
            let reach = radius * 1.2;
            let corners = vec![
                center + vec2(0.0, -reach),
                center + vec2(reach, 0.0),
                center + vec2(0.0, reach),
                center + vec2(-reach, 0.0),
            ];
            painter.add(Shape::convex_polygon(corners, fill, stroke));
        }
    }
}

/// Points along a link, bent into a quadratic curve when `curved` is set.
pub(super) fn link_path(from: Pos2, to: Pos2, curved: bool) -> Vec<Pos2> {
    if !curved || from == to {
        return vec![from, to];
    }

    let delta = to - from;
    let normal = vec2(-delta.y, delta.x) * CURVE_BEND;
    let control = from + delta * 0.5 + normal;

    (0..=CURVE_SAMPLES)
        .map(|step| {
            let t = step as f32 / CURVE_SAMPLES as f32;
            let inverse = 1.0 - t;
            Pos2::new(
                inverse * inverse * from.x + 2.0 * inverse * t * control.x + t * t * to.x,
                inverse * inverse * from.y + 2.0 * inverse * t * control.y + t * t * to.y,
            )
        })
        .collect()
}

pub(super) fn draw_styled_path(painter: &Painter, points: &[Pos2], style: EdgeStyle, stroke: Stroke) {
    match style {
        EdgeStyle::Solid => {
            painter.add(Shape::line(points.to_vec(), stroke));
        }
        EdgeStyle::LongDash => {
            painter.extend(Shape::dashed_line(points, stroke, 10.0, 6.0));
        }
        EdgeStyle::Alternate => {
            painter.extend(Shape::dashed_line(points, stroke, 4.0, 4.0));
        }
        EdgeStyle::Dotted => {
            painter.extend(Shape::dotted_line(
                points,
                stroke.color,
                (stroke.width * 3.0).max(3.0),
                (stroke.width * 0.6).max(0.8),
            ));
        }
    }
}

/// Arrow head at the middle of the path pointing towards its end.
pub(super) fn draw_arrow(painter: &Painter, points: &[Pos2], reverse: bool, color: Color32) {
    let Some((tip, direction)) = midpoint_direction(points) else {
        return;
    };
    let direction = if reverse { -direction } else { direction };
    let normal = vec2(-direction.y, direction.x);
    let back = tip - direction * ARROW_LENGTH;
    let corners = vec![
        tip,
        back + normal * (ARROW_LENGTH * 0.45),
        back - normal * (ARROW_LENGTH * 0.45),
    ];
    painter.add(Shape::convex_polygon(corners, color, Stroke::NONE));
}

pub(super) fn path_midpoint(points: &[Pos2]) -> Option<Pos2> {
    midpoint_direction(points).map(|(point, _)| point)
}

fn midpoint_direction(points: &[Pos2]) -> Option<(Pos2, Vec2)> {
    let total = points
        .windows(2)
        .map(|pair| pair[0].distance(pair[1]))
        .sum::<f32>();
    if total <= f32::EPSILON {
        return None;
    }

    let mut remaining = total * 0.5;
    for pair in points.windows(2) {
        let length = pair[0].distance(pair[1]);
        if length >= remaining && length > 0.0 {
            let direction = (pair[1] - pair[0]) / length;
            return Some((pair[0] + direction * remaining, direction));
        }
        remaining -= length;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn straight_paths_have_two_points() {
        let path = link_path(Pos2::new(0.0, 0.0), Pos2::new(10.0, 0.0), false);
        assert_eq!(path, vec![Pos2::new(0.0, 0.0), Pos2::new(10.0, 0.0)]);
    }

    #[test]
    fn curves_keep_their_endpoints() {
        let from = Pos2::new(0.0, 0.0);
        let to = Pos2::new(20.0, 0.0);
        let path = link_path(from, to, true);

        assert_eq!(path.len(), CURVE_SAMPLES + 1);
        assert_eq!(path.first(), Some(&from));
        assert_eq!(path.last(), Some(&to));
        assert!(path[CURVE_SAMPLES / 2].y.abs() > 1.0);
    }

    #[test]
    fn midpoint_of_a_segment() {
        let path = [Pos2::new(0.0, 0.0), Pos2::new(10.0, 0.0)];
        assert_eq!(path_midpoint(&path), Some(Pos2::new(5.0, 0.0)));
        assert_eq!(path_midpoint(&[Pos2::new(1.0, 1.0), Pos2::new(1.0, 1.0)]), None);
    }

    #[test]
    fn segments_crossing_the_viewport_are_visible() {
        let rect = Rect::from_min_max(Pos2::new(0.0, 0.0), Pos2::new(10.0, 10.0));
        assert!(edge_visible(rect, Pos2::new(-5.0, 5.0), Pos2::new(15.0, 5.0), 0.0));
        assert!(!edge_visible(rect, Pos2::new(-5.0, -5.0), Pos2::new(-1.0, 20.0), 0.0));
        assert!(circle_visible(rect, Pos2::new(-2.0, 5.0), 3.0));
    }
}
