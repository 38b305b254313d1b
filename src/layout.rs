use std::collections::HashMap;
use std::f64::consts::TAU;
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, warn};

use crate::graph::{LinkGraph, WorldPoint};

/// Read-only copy of the graph shared with preview workers.
#[derive(Clone, Debug, Default)]
pub struct LayoutSnapshot {
    pub entities: Vec<String>,
    pub edges: Vec<(usize, usize)>,
    pub positions: Vec<WorldPoint>,
}

impl LayoutSnapshot {
    pub fn capture(links: &LinkGraph) -> Self {
        let entities = links.graph().entities().to_vec();
        let positions = entities
            .iter()
            .map(|entity| links.world().get(entity).unwrap_or_default())
            .collect();
        Self {
            entities,
            edges: links.graph().undirected_pairs(),
            positions,
        }
    }

    fn centroid(&self) -> WorldPoint {
        if self.positions.is_empty() {
            return WorldPoint::default();
        }
        let n = self.positions.len() as f64;
        let (x, y) = self
            .positions
            .iter()
            .fold((0.0, 0.0), |(x, y), point| (x + point.x, y + point.y));
        WorldPoint::new(x / n, y / n)
    }

    fn spread(&self) -> f64 {
        let mut min = WorldPoint::new(f64::INFINITY, f64::INFINITY);
        let mut max = WorldPoint::new(f64::NEG_INFINITY, f64::NEG_INFINITY);
        for point in &self.positions {
            min.x = min.x.min(point.x);
            min.y = min.y.min(point.y);
            max.x = max.x.max(point.x);
            max.y = max.y.max(point.y);
        }
        (max.x - min.x).max(max.y - min.y).max(1.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LayoutCandidate {
    Force { seed: u64, iterations: usize },
    Circular,
}

impl LayoutCandidate {
    pub fn label(&self) -> String {
        match self {
            Self::Force { seed, .. } => format!("force #{seed}"),
            Self::Circular => "circular".to_owned(),
        }
    }

    fn compute(&self, snapshot: &LayoutSnapshot) -> Vec<WorldPoint> {
        match *self {
            Self::Force { seed, iterations } => force_layout(snapshot, seed, iterations),
            Self::Circular => circular_layout(snapshot),
        }
    }
}

#[derive(Clone, Debug)]
pub struct LayoutPreview {
    pub candidate: LayoutCandidate,
    pub positions: HashMap<String, WorldPoint>,
}

/// Default candidate set: a few seeded force layouts plus a circle.
pub fn default_candidates(count: usize) -> Vec<LayoutCandidate> {
    let mut candidates = (0..count.saturating_sub(1) as u64)
        .map(|seed| LayoutCandidate::Force {
            seed: seed + 1,
            iterations: 250,
        })
        .collect::<Vec<_>>();
    candidates.push(LayoutCandidate::Circular);
    candidates
}

/// Computes every candidate on a fixed pool of worker threads and returns the
/// results in candidate order once all workers have been joined.
pub fn preview_layouts(
    snapshot: Arc<LayoutSnapshot>,
    candidates: Vec<LayoutCandidate>,
    workers: usize,
) -> Vec<LayoutPreview> {
    let total = candidates.len();
    let (job_tx, job_rx) = mpsc::channel();
    for job in candidates.into_iter().enumerate() {
        let _ = job_tx.send(job);
    }
    drop(job_tx);

    let job_rx = Arc::new(Mutex::new(job_rx));
    let (result_tx, result_rx) = mpsc::channel();

    let handles = (0..workers.clamp(1, total.max(1)))
        .map(|worker| {
            let snapshot = Arc::clone(&snapshot);
            let job_rx = Arc::clone(&job_rx);
            let result_tx = result_tx.clone();
            thread::spawn(move || {
                loop {
                    let job = match job_rx.lock() {
                        Ok(receiver) => receiver.recv(),
                        Err(_) => break,
                    };
                    let Ok((index, candidate)) = job else {
                        break;
                    };

                    let positions = candidate.compute(&snapshot);
                    debug!(worker, candidate = %candidate.label(), "layout candidate computed");
                    let preview = LayoutPreview {
                        candidate,
                        positions: snapshot.entities.iter().cloned().zip(positions).collect(),
                    };
                    if result_tx.send((index, preview)).is_err() {
                        break;
                    }
                }
            })
        })
        .collect::<Vec<_>>();
    drop(result_tx);

    for handle in handles {
        if handle.join().is_err() {
            warn!("layout preview worker panicked");
        }
    }

    let mut results = result_rx.into_iter().collect::<Vec<_>>();
    results.sort_by_key(|(index, _)| *index);
    results.into_iter().map(|(_, preview)| preview).collect()
}

fn force_layout(snapshot: &LayoutSnapshot, seed: u64, iterations: usize) -> Vec<WorldPoint> {
    let n = snapshot.entities.len();
    if n == 0 {
        return Vec::new();
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let scale = snapshot.spread();
    let mut positions = snapshot
        .positions
        .iter()
        .map(|point| {
            point.offset(
                rng.gen_range(-0.5..0.5) * scale,
                rng.gen_range(-0.5..0.5) * scale,
            )
        })
        .collect::<Vec<_>>();

    if n == 1 {
        return positions;
    }

    let center = snapshot.centroid();
    let k = scale / (n as f64).sqrt();
    let mut temperature = scale * 0.1;

    for _ in 0..iterations {
        let mut disp = vec![(0.0f64, 0.0f64); n];

        for i in 0..n {
            for j in (i + 1)..n {
                let dx = positions[i].x - positions[j].x;
                let dy = positions[i].y - positions[j].y;
                let distance = (dx * dx + dy * dy).sqrt().max(k * 0.01);
                let force = k * k / distance;
                let (ux, uy) = (dx / distance, dy / distance);
                disp[i].0 += ux * force;
                disp[i].1 += uy * force;
                disp[j].0 -= ux * force;
                disp[j].1 -= uy * force;
            }
        }

        for &(from, to) in &snapshot.edges {
            if from >= n || to >= n || from == to {
                continue;
            }

            let dx = positions[from].x - positions[to].x;
            let dy = positions[from].y - positions[to].y;
            let distance = (dx * dx + dy * dy).sqrt().max(k * 0.01);
            let force = distance * distance / k;
            let (ux, uy) = (dx / distance, dy / distance);
            disp[from].0 -= ux * force;
            disp[from].1 -= uy * force;
            disp[to].0 += ux * force;
            disp[to].1 += uy * force;
        }

        for (i, (dx, dy)) in disp.iter_mut().enumerate() {
            *dx -= (positions[i].x - center.x) * 0.01;
            *dy -= (positions[i].y - center.y) * 0.01;
        }

        for (position, (dx, dy)) in positions.iter_mut().zip(&disp) {
            let length = (dx * dx + dy * dy).sqrt();
            if length > 0.0 {
                let step = length.min(temperature) / length;
                *position = position.offset(dx * step, dy * step);
            }
        }

        temperature *= 0.97;
        if temperature < scale * 1e-4 {
            break;
        }
    }

    positions
}

fn circular_layout(snapshot: &LayoutSnapshot) -> Vec<WorldPoint> {
    let n = snapshot.entities.len();
    let center = snapshot.centroid();
    let radius = snapshot.spread() / 2.0;
    (0..n)
        .map(|index| {
            let angle = TAU * index as f64 / n as f64;
            center.offset(radius * angle.cos(), radius * angle.sin())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn triangle() -> LayoutSnapshot {
        LayoutSnapshot {
            entities: vec!["a".to_owned(), "b".to_owned(), "c".to_owned()],
            edges: vec![(0, 1), (1, 2)],
            positions: vec![
                WorldPoint::new(0.0, 0.0),
                WorldPoint::new(4.0, 0.0),
                WorldPoint::new(0.0, 4.0),
            ],
        }
    }

    #[test]
    fn every_candidate_comes_back_in_order() {
        let candidates = default_candidates(4);
        let previews = preview_layouts(Arc::new(triangle()), candidates.clone(), 2);

        assert_eq!(
            previews.iter().map(|preview| preview.candidate).collect::<Vec<_>>(),
            candidates
        );
        for preview in &previews {
            assert_eq!(preview.positions.len(), 3);
            assert!(preview.positions.values().all(|point| point.x.is_finite() && point.y.is_finite()));
        }
    }

    #[test]
    fn seeded_force_layouts_are_reproducible() {
        let snapshot = triangle();
        let first = force_layout(&snapshot, 7, 50);
        let second = force_layout(&snapshot, 7, 50);
        assert_eq!(first, second);
    }

    #[test]
    fn circular_layout_surrounds_the_centroid() {
        let snapshot = triangle();
        let center = snapshot.centroid();
        for point in circular_layout(&snapshot) {
            assert!((point.distance(center) - 2.0).abs() < 1e-9);
        }
    }

    #[test]
    fn more_workers_than_jobs_is_fine() {
        let previews = preview_layouts(Arc::new(triangle()), vec![LayoutCandidate::Circular], 8);
        assert_eq!(previews.len(), 1);
        assert!(preview_layouts(Arc::new(LayoutSnapshot::default()), Vec::new(), 4).is_empty());
    }
}
