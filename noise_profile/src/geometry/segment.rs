//! Planar line segments carrying optional elevations at their endpoints.

use super::{distance, Envelope, Point3};

/// Relative tolerance for parameter bounds and parallelism checks.
const EPS: f64 = 1e-12;
/// Absolute planar offset under which parallel segments are collinear.
const COLLINEAR_TOL: f64 = 1e-9;

fn cross(a: (f64, f64), b: (f64, f64)) -> f64 {
    a.0 * b.1 - a.1 * b.0
}

fn dot(a: (f64, f64), b: (f64, f64)) -> f64 {
    a.0 * b.0 + a.1 * b.1
}

/// Representation of a line segment between two points.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Segment {
    pub start: Point3,
    pub end: Point3,
}

impl Segment {
    /// Creates a new segment.
    pub fn new(start: Point3, end: Point3) -> Self {
        Self { start, end }
    }

    /// Returns the planar length of the segment.
    pub fn length(&self) -> f64 {
        distance(self.start, self.end)
    }

    /// Returns the bounding box of the segment.
    pub fn envelope(&self) -> Envelope {
        Envelope::new(self.start.x, self.start.y, self.end.x, self.end.y)
    }

    /// `true` when both endpoints carry an elevation.
    pub fn has_z(&self) -> bool {
        self.start.has_z() && self.end.has_z()
    }

    fn direction(&self) -> (f64, f64) {
        (self.end.x - self.start.x, self.end.y - self.start.y)
    }

    /// Returns the point at fraction `t` along the segment. The elevation is
    /// interpolated when both endpoints carry one.
    pub fn point_along(&self, t: f64) -> Point3 {
        let (dx, dy) = self.direction();
        let z = if self.has_z() {
            self.start.z + t * (self.end.z - self.start.z)
        } else {
            f64::NAN
        };
        Point3::new(self.start.x + t * dx, self.start.y + t * dy, z)
    }

    /// Fraction along the segment of the orthogonal projection of `p`,
    /// clamped to `[0, 1]`.
    pub fn fraction_of(&self, p: Point3) -> f64 {
        let d = self.direction();
        let len2 = dot(d, d);
        if len2 <= 0.0 {
            return 0.0;
        }
        (dot((p.x - self.start.x, p.y - self.start.y), d) / len2).clamp(0.0, 1.0)
    }

    /// Elevation of the segment at the projection of `p`, or `None` if an
    /// endpoint has no elevation.
    pub fn interpolate_z(&self, p: Point3) -> Option<f64> {
        if !self.has_z() {
            return None;
        }
        let t = self.fraction_of(p);
        Some(self.start.z + (self.end.z - self.start.z) * t)
    }

    fn touches(&self, p: Point3) -> bool {
        let q = self.point_along(self.fraction_of(p));
        distance(p, q) <= COLLINEAR_TOL
    }

    /// Planar intersection with `other`. Collinear overlaps yield the overlap
    /// end closest to `self.start`. The returned point has no elevation.
    pub fn intersection(&self, other: &Segment) -> Option<Point3> {
        let r = self.direction();
        let s = other.direction();
        let rr = dot(r, r);
        let ss = dot(s, s);
        if rr <= 0.0 && ss <= 0.0 {
            return (distance(self.start, other.start) <= COLLINEAR_TOL)
                .then(|| Point3::xy(self.start.x, self.start.y));
        }
        if rr <= 0.0 {
            return other
                .touches(self.start)
                .then(|| Point3::xy(self.start.x, self.start.y));
        }
        if ss <= 0.0 {
            return self
                .touches(other.start)
                .then(|| Point3::xy(other.start.x, other.start.y));
        }

        let qp = (other.start.x - self.start.x, other.start.y - self.start.y);
        let denom = cross(r, s);
        if denom.abs() <= EPS * (rr * ss).sqrt() {
            // Parallel: only collinear overlaps intersect.
            if cross(qp, r).abs() / rr.sqrt() > COLLINEAR_TOL {
                return None;
            }
            let t0 = dot(qp, r) / rr;
            let t1 = dot((other.end.x - self.start.x, other.end.y - self.start.y), r) / rr;
            let lo = t0.min(t1).max(0.0);
            let hi = t0.max(t1).min(1.0);
            if lo > hi + EPS {
                return None;
            }
            let p = self.point_along(lo);
            return Some(Point3::xy(p.x, p.y));
        }

        let t = cross(qp, s) / denom;
        let u = cross(qp, r) / denom;
        if t < -EPS || t > 1.0 + EPS || u < -EPS || u > 1.0 + EPS {
            return None;
        }
        let p = self.point_along(t.clamp(0.0, 1.0));
        Some(Point3::xy(p.x, p.y))
    }

    /// Splits the segment into consecutive parts of equal length, none longer
    /// than `max_length`. Consecutive parts share their endpoints exactly.
    pub fn split(&self, max_length: f64) -> Vec<Segment> {
        let len = self.length();
        if !(max_length > 0.0) || len <= max_length {
            return vec![*self];
        }
        let n = (len / max_length).ceil() as usize;
        let mut pts = Vec::with_capacity(n + 1);
        pts.push(self.start);
        for i in 1..n {
            pts.push(self.point_along(i as f64 / n as f64));
        }
        pts.push(self.end);
        pts.windows(2).map(|w| Segment::new(w[0], w[1])).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seg(x0: f64, y0: f64, x1: f64, y1: f64) -> Segment {
        Segment::new(Point3::xy(x0, y0), Point3::xy(x1, y1))
    }

    #[test]
    fn crossing_segments_intersect() {
        let a = seg(0.0, 0.0, 2.0, 2.0);
        let b = seg(0.0, 2.0, 2.0, 0.0);
        let p = a.intersection(&b).unwrap();
        assert!((p.x - 1.0).abs() < 1e-9 && (p.y - 1.0).abs() < 1e-9);
        assert!(!p.has_z());
    }

    #[test]
    fn disjoint_and_parallel_segments() {
        let a = seg(0.0, 0.0, 1.0, 0.0);
        assert!(a.intersection(&seg(0.0, 1.0, 1.0, 1.0)).is_none());
        assert!(a.intersection(&seg(2.0, -1.0, 2.0, 1.0)).is_none());
    }

    #[test]
    fn touching_endpoint_counts() {
        let a = seg(0.0, 0.0, 1.0, 0.0);
        let p = a.intersection(&seg(1.0, 0.0, 1.0, 5.0)).unwrap();
        assert!((p.x - 1.0).abs() < 1e-9 && p.y.abs() < 1e-9);
    }

    #[test]
    fn collinear_overlap_returns_first_shared_point() {
        let a = seg(0.0, 0.0, 10.0, 0.0);
        let p = a.intersection(&seg(12.0, 0.0, 4.0, 0.0)).unwrap();
        assert!((p.x - 4.0).abs() < 1e-9);
        assert!(a.intersection(&seg(11.0, 0.0, 12.0, 0.0)).is_none());
    }

    #[test]
    fn interpolated_elevation() {
        let s = Segment::new(Point3::new(0.0, 0.0, 0.0), Point3::new(10.0, 0.0, 5.0));
        let z = s.interpolate_z(Point3::xy(4.0, 3.0)).unwrap();
        assert!((z - 2.0).abs() < 1e-9);
        assert!(seg(0.0, 0.0, 1.0, 0.0)
            .interpolate_z(Point3::xy(0.5, 0.0))
            .is_none());
    }

    #[test]
    fn split_covers_without_gaps() {
        let s = Segment::new(Point3::new(0.0, 0.0, 0.0), Point3::new(40.0, 0.0, 8.0));
        let parts = s.split(15.0);
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0].start, s.start);
        assert_eq!(parts[2].end, s.end);
        for w in parts.windows(2) {
            assert_eq!(w[0].end, w[1].start);
        }
        for p in &parts {
            assert!(p.length() <= 15.0 + 1e-9);
        }
        let total: f64 = parts.iter().map(|p| p.length()).sum();
        assert!((total - 40.0).abs() < 1e-9);
    }

    #[test]
    fn short_segment_is_not_split() {
        let s = seg(0.0, 0.0, 3.0, 4.0);
        assert_eq!(s.split(15.0), vec![s]);
    }
}
