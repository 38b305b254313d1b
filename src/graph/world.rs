use std::collections::HashMap;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct WorldPoint {
    pub x: f64,
    pub y: f64,
}

impl WorldPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn offset(self, dx: f64, dy: f64) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }

    pub fn distance(self, other: Self) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// Entity world coordinates. Entries are created lazily with a random seed
/// position and outlive graph rebuilds so known entities keep their place.
#[derive(Debug)]
pub struct WorldPositions {
    positions: HashMap<String, WorldPoint>,
    rng: StdRng,
}

impl WorldPositions {
    pub fn new(seed: u64) -> Self {
        Self {
            positions: HashMap::new(),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn ensure(&mut self, entity: &str) -> WorldPoint {
        if let Some(&point) = self.positions.get(entity) {
            return point;
        }

        let point = WorldPoint::new(self.rng.gen_range(-1.0..1.0), self.rng.gen_range(-1.0..1.0));
        self.positions.insert(entity.to_owned(), point);
        point
    }

    pub fn get(&self, entity: &str) -> Option<WorldPoint> {
        self.positions.get(entity).copied()
    }

    pub fn set(&mut self, entity: &str, point: WorldPoint) {
        self.positions.insert(entity.to_owned(), point);
    }

    pub fn translate(&mut self, entity: &str, dx: f64, dy: f64) -> bool {
        match self.positions.get_mut(entity) {
            Some(point) => {
                *point = point.offset(dx, dy);
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }
}
