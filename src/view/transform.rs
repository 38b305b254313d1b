use std::collections::HashMap;
use std::fmt;

use crate::graph::{WorldPoint, WorldPositions};

const FIT_EPSILON: f64 = 1e-3;
const FIT_PADDING: f64 = 0.05;
const ZOOM_STEP: f64 = 1.5;
/// Screen offsets beyond this many pixels in either direction get no key.
const MAX_SCREEN_OFFSET: f64 = (1u32 << 30) as f64;

/// Rounded screen position; entities projecting onto the same key render as
/// one aggregated node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeKey {
    pub x: i32,
    pub y: i32,
}

impl NodeKey {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.x, self.y)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Extents {
    pub min_x: f64,
    pub min_y: f64,
    pub width: f64,
    pub height: f64,
}

impl Extents {
    pub fn new(min_x: f64, min_y: f64, width: f64, height: f64) -> Self {
        Self {
            min_x,
            min_y,
            width,
            height,
        }
    }

    pub fn from_corners(min: WorldPoint, max: WorldPoint) -> Self {
        Self::new(min.x, min.y, max.x - min.x, max.y - min.y)
    }

    pub fn max_x(&self) -> f64 {
        self.min_x + self.width
    }

    pub fn max_y(&self) -> f64 {
        self.min_y + self.height
    }

    pub fn center(&self) -> WorldPoint {
        WorldPoint::new(self.min_x + self.width / 2.0, self.min_y + self.height / 2.0)
    }

    pub fn contains(&self, point: WorldPoint) -> bool {
        point.x >= self.min_x
            && point.x <= self.max_x()
            && point.y >= self.min_y
            && point.y <= self.max_y()
    }
}

impl Default for Extents {
    fn default() -> Self {
        Self::new(-1.0, -1.0, 2.0, 2.0)
    }
}

/// Linear map between the world extents and a fixed pixel surface, with a
/// per-entity cache of screen keys.
#[derive(Debug)]
pub struct CoordinateTransform {
    extents: Extents,
    width: u32,
    height: u32,
    screen: HashMap<String, NodeKey>,
    transform_id: u64,
    stale: bool,
}

impl CoordinateTransform {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            extents: Extents::default(),
            width: width.max(1),
            height: height.max(1),
            screen: HashMap::new(),
            transform_id: 0,
            stale: true,
        }
    }

    pub fn extents(&self) -> Extents {
        self.extents
    }

    pub fn transform_id(&self) -> u64 {
        self.transform_id
    }

    /// True when extents or dimensions changed since the last `transform_all`.
    pub fn is_stale(&self) -> bool {
        self.stale
    }

    pub fn set_extents(&mut self, extents: Extents) {
        self.extents = extents;
        self.mark_stale();
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        let (width, height) = (width.max(1), height.max(1));
        if (width, height) != (self.width, self.height) {
            self.width = width;
            self.height = height;
            self.mark_stale();
        }
    }

    pub fn world_to_screen_x(&self, wx: f64) -> f64 {
        self.width as f64 * (wx - self.extents.min_x) / self.extents.width
    }

    pub fn world_to_screen_y(&self, wy: f64) -> f64 {
        self.height as f64 * (wy - self.extents.min_y) / self.extents.height
    }

    pub fn screen_to_world_x(&self, sx: f64) -> f64 {
        self.extents.min_x + sx * self.extents.width / self.width as f64
    }

    pub fn screen_to_world_y(&self, sy: f64) -> f64 {
        self.extents.min_y + sy * self.extents.height / self.height as f64
    }

    pub fn screen_to_world(&self, sx: f64, sy: f64) -> WorldPoint {
        WorldPoint::new(self.screen_to_world_x(sx), self.screen_to_world_y(sy))
    }

    /// Screen key for a world point; `as` truncates toward zero. Points that
    /// project non-finite or too far off the surface are unmapped, so distinct
    /// far-away entities never share a saturated key.
    pub fn screen_key(&self, point: WorldPoint) -> Option<NodeKey> {
        let in_range = |value: f64| value.is_finite() && value.abs() <= MAX_SCREEN_OFFSET;
        let (sx, sy) = (self.world_to_screen_x(point.x), self.world_to_screen_y(point.y));
        (in_range(sx) && in_range(sy)).then(|| NodeKey::new(sx as i32, sy as i32))
    }

    pub fn screen_of(&self, entity: &str) -> Option<NodeKey> {
        self.screen.get(entity).copied()
    }

    pub fn transform_entity(&mut self, entity: &str, world: &WorldPositions) {
        match world.get(entity).and_then(|point| self.screen_key(point)) {
            Some(key) => {
                self.screen.insert(entity.to_owned(), key);
            }
            None => {
                self.screen.remove(entity);
            }
        }
    }

    pub fn transform_all<'a>(
        &mut self,
        entities: impl IntoIterator<Item = &'a str>,
        world: &WorldPositions,
    ) {
        self.screen.clear();
        for entity in entities {
            if let Some(key) = world.get(entity).and_then(|point| self.screen_key(point)) {
                self.screen.insert(entity.to_owned(), key);
            }
        }
        self.stale = false;
    }

    /// Fits the extents around `visible` entities with 5% padding. In
    /// geographic mode the result always covers the whole globe and sides
    /// already at or past the globe's bounds get no padding.
    pub fn zoom_to_fit<'a>(
        &mut self,
        visible: impl IntoIterator<Item = &'a str>,
        world: &WorldPositions,
        geographic: bool,
    ) -> bool {
        let mut min = WorldPoint::new(f64::INFINITY, f64::INFINITY);
        let mut max = WorldPoint::new(f64::NEG_INFINITY, f64::NEG_INFINITY);
        for entity in visible {
            let Some(point) = world.get(entity) else {
                continue;
            };
            min.x = min.x.min(point.x);
            min.y = min.y.min(point.y);
            max.x = max.x.max(point.x);
            max.y = max.y.max(point.y);
        }

        if !min.x.is_finite() && !geographic {
            return false;
        }

        if !min.x.is_finite() {
            self.set_extents(Extents::new(-180.0, -90.0, 360.0, 180.0));
            return true;
        }

        if max.x - min.x <= 0.0 {
            min.x -= FIT_EPSILON;
            max.x += FIT_EPSILON;
        }
        if max.y - min.y <= 0.0 {
            min.y -= FIT_EPSILON;
            max.y += FIT_EPSILON;
        }

        let pad_x = (max.x - min.x) * FIT_PADDING;
        let pad_y = (max.y - min.y) * FIT_PADDING;

        let (min_x, max_x, min_y, max_y) = if geographic {
            (
                if min.x <= -180.0 { min.x } else { -180.0 },
                if max.x >= 180.0 { max.x } else { 180.0 },
                if min.y <= -90.0 { min.y } else { -90.0 },
                if max.y >= 90.0 { max.y } else { 90.0 },
            )
        } else {
            (min.x - pad_x, max.x + pad_x, min.y - pad_y, max.y + pad_y)
        };

        self.set_extents(Extents::from_corners(
            WorldPoint::new(min_x, min_y),
            WorldPoint::new(max_x, max_y),
        ));
        true
    }

    /// Shrinks the extents by 1.5^steps, keeping the anchor's proportional
    /// position fixed; negative steps zoom out. Anchors outside the extents
    /// zoom about the center.
    pub fn zoom_in(&mut self, steps: i32, anchor: Option<WorldPoint>) {
        let factor = ZOOM_STEP.powi(steps);
        let extents = self.extents;
        let anchor = anchor
            .filter(|point| extents.contains(*point))
            .unwrap_or_else(|| extents.center());

        let fraction_x = (anchor.x - extents.min_x) / extents.width;
        let fraction_y = (anchor.y - extents.min_y) / extents.height;
        let width = extents.width / factor;
        let height = extents.height / factor;

        self.set_extents(Extents::new(
            anchor.x - fraction_x * width,
            anchor.y - fraction_y * height,
            width,
            height,
        ));
    }

    pub fn pan(&mut self, dx: f64, dy: f64) {
        let mut extents = self.extents;
        extents.min_x += dx;
        extents.min_y += dy;
        self.set_extents(extents);
    }

    fn mark_stale(&mut self) {
        self.transform_id += 1;
        self.stale = true;
    }
}
