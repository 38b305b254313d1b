use std::f64::consts::TAU;

use crate::graph::WorldPoint;

/// Columns and rows for `count` cells whose shape best matches `width` by
/// `height`.
pub fn grid_dimensions(count: usize, width: f64, height: f64) -> (usize, usize) {
    if count == 0 {
        return (0, 0);
    }

    let target = if width <= f64::EPSILON && height <= f64::EPSILON {
        1.0
    } else if height <= f64::EPSILON {
        f64::INFINITY
    } else {
        width / height
    };

    let mut best = (count, 1usize);
    let mut best_score = f64::INFINITY;
    for columns in 1..=count {
        let rows = count.div_ceil(columns);
        let ratio = columns as f64 / rows as f64;
        let score = if target.is_infinite() {
            1.0 / ratio
        } else if target <= f64::EPSILON {
            ratio
        } else {
            (ratio / target).ln().abs()
        };
        if score < best_score {
            best_score = score;
            best = (columns, rows);
        }
    }
    best
}

/// Row-major grid spanning the rectangle between `start` and `end`.
pub fn grid_positions(count: usize, start: WorldPoint, end: WorldPoint) -> Vec<WorldPoint> {
    let min_x = start.x.min(end.x);
    let min_y = start.y.min(end.y);
    let width = (end.x - start.x).abs();
    let height = (end.y - start.y).abs();
    let (columns, rows) = grid_dimensions(count, width, height);

    let step_x = if columns > 1 {
        width / (columns - 1) as f64
    } else {
        0.0
    };
    let step_y = if rows > 1 {
        height / (rows - 1) as f64
    } else {
        0.0
    };

    (0..count)
        .map(|index| {
            let row = index / columns;
            let column = index % columns;
            WorldPoint::new(
                min_x + column as f64 * step_x,
                min_y + row as f64 * step_y,
            )
        })
        .collect()
}

pub fn line_positions(count: usize, start: WorldPoint, end: WorldPoint) -> Vec<WorldPoint> {
    if count == 1 {
        return vec![start];
    }
    (0..count)
        .map(|index| {
            let t = index as f64 / (count - 1) as f64;
            WorldPoint::new(
                start.x + (end.x - start.x) * t,
                start.y + (end.y - start.y) * t,
            )
        })
        .collect()
}

/// Circle about `center` through `rim`.
pub fn circle_positions(count: usize, center: WorldPoint, rim: WorldPoint) -> Vec<WorldPoint> {
    let radius = center.distance(rim);
    (0..count)
        .map(|index| {
            let angle = TAU * index as f64 / count as f64;
            center.offset(radius * angle.cos(), radius * angle.sin())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn square_rect_with_nine_items_is_three_by_three() {
        assert_eq!(grid_dimensions(9, 10.0, 10.5), (3, 3));

        let positions = grid_positions(9, WorldPoint::new(0.0, 0.0), WorldPoint::new(10.0, 10.0));
        assert_eq!(positions[0], WorldPoint::new(0.0, 0.0));
        assert_eq!(positions[1], WorldPoint::new(5.0, 0.0));
        assert_eq!(positions[2], WorldPoint::new(10.0, 0.0));
        assert_eq!(positions[3], WorldPoint::new(0.0, 5.0));
        assert_eq!(positions[8], WorldPoint::new(10.0, 10.0));
    }

    #[test]
    fn wide_rect_gets_more_columns() {
        let (columns, rows) = grid_dimensions(8, 40.0, 10.0);
        assert!(columns > rows);
        assert_eq!(grid_dimensions(5, 10.0, 0.0), (5, 1));
        assert_eq!(grid_dimensions(5, 0.0, 10.0), (1, 5));
    }

    #[test]
    fn drag_direction_does_not_change_grid_origin() {
        let forward = grid_positions(4, WorldPoint::new(0.0, 0.0), WorldPoint::new(2.0, 2.0));
        let backward = grid_positions(4, WorldPoint::new(2.0, 2.0), WorldPoint::new(0.0, 0.0));
        assert_eq!(forward, backward);
    }

    #[test]
    fn line_interpolates_between_endpoints() {
        let positions = line_positions(3, WorldPoint::new(0.0, 0.0), WorldPoint::new(4.0, 2.0));
        assert_eq!(
            positions,
            vec![
                WorldPoint::new(0.0, 0.0),
                WorldPoint::new(2.0, 1.0),
                WorldPoint::new(4.0, 2.0)
            ]
        );
        assert_eq!(line_positions(1, WorldPoint::new(1.0, 1.0), WorldPoint::new(4.0, 2.0)).len(), 1);
    }

    #[test]
    fn circle_uses_drag_length_as_radius() {
        let center = WorldPoint::new(1.0, 1.0);
        let positions = circle_positions(4, center, WorldPoint::new(4.0, 5.0));
        for point in &positions {
            assert!((point.distance(center) - 5.0).abs() < 1e-9);
        }
        assert!((positions[0].x - 6.0).abs() < 1e-9);
    }
}
