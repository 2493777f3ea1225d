//! Profile computation over a finished scene.

use super::{CutPoint, CutPointKind, CutProfile};
use crate::geometry::{Point3, Segment};
use crate::scene::{Scene, WallKind};

/// Merges points closer than `tolerance` along the ray that fall into the
/// same group, keeping the one inserted first. Output keeps input order.
fn dedup_coincident<K: Ord + Copy>(
    points: Vec<CutPoint>,
    ray: &Segment,
    tolerance: f64,
    group: impl Fn(&CutPoint) -> K,
) -> Vec<CutPoint> {
    if points.len() < 2 {
        return points;
    }
    let length = ray.length();
    let mut order: Vec<(K, f64, usize)> = points
        .iter()
        .enumerate()
        .map(|(i, p)| (group(p), ray.fraction_of(p.position()) * length, i))
        .collect();
    order.sort_by(|a, b| a.0.cmp(&b.0).then(a.1.total_cmp(&b.1)).then(a.2.cmp(&b.2)));

    let mut keep = vec![false; points.len()];
    let mut first = order[0].2;
    for w in order.windows(2) {
        let (prev, next) = (w[0], w[1]);
        if prev.0 != next.0 || next.1 - prev.1 > tolerance {
            keep[first] = true;
            first = next.2;
        } else {
            first = first.min(next.2);
        }
    }
    keep[first] = true;

    points
        .into_iter()
        .zip(keep)
        .filter_map(|(p, k)| k.then_some(p))
        .collect()
}

/// Sorts points by their projection on the ray, source first.
fn order_points(ray: &Segment, points: &mut Vec<CutPoint>) {
    let mut keyed: Vec<(f64, CutPoint)> = points
        .drain(..)
        .map(|p| (ray.fraction_of(p.position()), p))
        .collect();
    keyed.sort_by(|a, b| a.0.total_cmp(&b.0));
    points.extend(keyed.into_iter().map(|(_, p)| p));

    if points.first().map(CutPoint::kind) != Some(CutPointKind::Source) {
        points.reverse();
    }
    let first = points.first().map(CutPoint::kind);
    let last = points.last().map(CutPoint::kind);
    if first != Some(CutPointKind::Source) || last != Some(CutPointKind::Receiver) {
        log::error!(
            "Cut profile endpoints out of place after ordering: first {:?}, last {:?}",
            first,
            last
        );
    }
}

impl Scene {
    /// Computes the cut profile between `source` and `receiver`.
    ///
    /// The ray is split into chords no longer than the configured chord
    /// length to query the spatial indexes. Building and ground effect walls
    /// are intersected with the whole ray, terrain triangle edges with each
    /// chord. Points are ordered from source to receiver and carry the
    /// coefficient of the ground effect active where they lie.
    pub fn profile(&self, source: Point3, receiver: Point3) -> CutProfile {
        let source = source.or_ground();
        let receiver = receiver.or_ground();
        let mut points = vec![CutPoint::endpoint(source, CutPointKind::Source)];
        if !(source.is_finite_xy() && receiver.is_finite_xy()) {
            log::warn!("Profile requested with non-finite endpoints");
            points.push(CutPoint::endpoint(receiver, CutPointKind::Receiver));
            return CutProfile::from_points(points);
        }

        let ray = Segment::new(source, receiver);
        let chords = ray.split(self.config().effective_chord_length());
        points.extend(self.terrain_crossings(&ray, &chords));
        points.extend(self.wall_crossings(&ray, &chords));
        points.push(CutPoint::endpoint(receiver, CutPointKind::Receiver));

        order_points(&ray, &mut points);
        self.propagate_ground(source, &mut points);
        CutProfile::from_points(points)
    }

    /// Building and ground effect crossings of the full ray.
    fn wall_crossings(&self, ray: &Segment, chords: &[Segment]) -> Vec<CutPoint> {
        let mut candidates: Vec<usize> = chords
            .iter()
            .flat_map(|c| self.walls_in(&c.envelope()))
            .collect();
        candidates.sort_unstable();
        candidates.dedup();

        let mut crossings = Vec::new();
        for i in candidates {
            let wall = &self.walls()[i];
            let kind = match wall.kind {
                WallKind::Building => CutPointKind::Building,
                WallKind::GroundEffect => CutPointKind::GroundEffect,
                WallKind::Terrain => continue,
            };
            let Some(hit) = ray.intersection(&wall.segment) else {
                continue;
            };
            let z = wall
                .segment
                .interpolate_z(hit)
                .or_else(|| self.fallback_elevation(hit.x, hit.y))
                .unwrap_or(f64::NAN);
            crossings.push(CutPoint::crossing(hit.with_z(z), kind, wall.origin));
        }
        crossings
    }

    /// Crossings of the ray with terrain triangle edges, one per location.
    fn terrain_crossings(&self, ray: &Segment, chords: &[Segment]) -> Vec<CutPoint> {
        let terrain = self.terrain();
        let mut crossings = Vec::new();
        for chord in chords {
            for t in self.triangles_in(&chord.envelope()) {
                for edge in terrain.triangle_edges(t) {
                    if let Some(hit) = chord.intersection(&edge) {
                        let z = edge.interpolate_z(hit).unwrap_or(f64::NAN);
                        crossings.push(CutPoint::crossing(hit.with_z(z), CutPointKind::Terrain, t));
                    }
                }
            }
        }
        dedup_coincident(crossings, ray, self.config().coincidence_tolerance, |_| ())
    }

    /// Ground level for wall vertices without elevation. Scenes without
    /// terrain are flat at zero.
    fn fallback_elevation(&self, x: f64, y: f64) -> Option<f64> {
        if self.terrain().is_empty() {
            return Some(0.0);
        }
        self.ground_elevation(x, y)
    }

    /// Assigns ground coefficients walking from the source: a crossing of
    /// the active region exits it, a crossing while outside enters the
    /// crossed region. Entry and exit points carry the region coefficient.
    fn propagate_ground(&self, source: Point3, points: &mut [CutPoint]) {
        let effects = self.ground_effects();
        let mut active = effects.iter().rposition(|g| g.contains(source.x, source.y));
        for p in points.iter_mut() {
            let mut region = active;
            if let (CutPointKind::GroundEffect, Some(crossed)) = (p.kind(), p.origin()) {
                match active {
                    Some(current) if current == crossed => active = None,
                    None => {
                        active = Some(crossed);
                        region = active;
                    }
                    Some(_) => {}
                }
            }
            p.set_ground_coefficient(region.and_then(|i| effects.get(i)).map(|g| g.coefficient()));
        }
    }
}
