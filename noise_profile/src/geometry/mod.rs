//! Geometry primitives used by the scene builder and the profile engine.
//!
//! Elevations are optional: a `z` of `NaN` means the coordinate carries no
//! elevation of its own.

pub mod polygon;
pub mod segment;

pub use polygon::{point_in_ring, polygon_area, MultiPolygon, Polygon};
pub use segment::Segment;

/// Representation of a 3D point.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Point3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Point3 {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Planar point without an elevation.
    pub fn xy(x: f64, y: f64) -> Self {
        Self { x, y, z: f64::NAN }
    }

    /// Returns `true` when the point carries an elevation.
    pub fn has_z(&self) -> bool {
        !self.z.is_nan()
    }

    /// Returns a copy of the point with the given elevation.
    pub fn with_z(&self, z: f64) -> Self {
        Self::new(self.x, self.y, z)
    }

    /// Returns the point with an undefined elevation replaced by `0`.
    pub fn or_ground(&self) -> Self {
        if self.has_z() {
            *self
        } else {
            self.with_z(0.0)
        }
    }

    /// `true` if both planar coordinates are finite.
    pub fn is_finite_xy(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl From<geo_types::Coord<f64>> for Point3 {
    fn from(c: geo_types::Coord<f64>) -> Self {
        Point3::xy(c.x, c.y)
    }
}

/// Calculates the planar distance between two points.
pub fn distance(a: Point3, b: Point3) -> f64 {
    ((b.x - a.x).powi(2) + (b.y - a.y).powi(2)).sqrt()
}

/// Axis aligned planar bounding box.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Envelope {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Envelope {
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x: min_x.min(max_x),
            min_y: min_y.min(max_y),
            max_x: min_x.max(max_x),
            max_y: min_y.max(max_y),
        }
    }

    /// Degenerate envelope covering a single point.
    pub fn from_point(p: Point3) -> Self {
        Self::new(p.x, p.y, p.x, p.y)
    }

    /// Smallest envelope containing every point, `None` for an empty input.
    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a Point3>) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = Self::from_point(*iter.next()?);
        Some(iter.fold(first, |env, p| env.including(*p)))
    }

    /// Returns the envelope grown to contain `p`.
    pub fn including(&self, p: Point3) -> Self {
        Self {
            min_x: self.min_x.min(p.x),
            min_y: self.min_y.min(p.y),
            max_x: self.max_x.max(p.x),
            max_y: self.max_y.max(p.y),
        }
    }

    /// Returns the union of two envelopes.
    pub fn merged(&self, other: &Envelope) -> Self {
        Self {
            min_x: self.min_x.min(other.min_x),
            min_y: self.min_y.min(other.min_y),
            max_x: self.max_x.max(other.max_x),
            max_y: self.max_y.max(other.max_y),
        }
    }

    /// Returns the envelope grown by `margin` on every side.
    pub fn expanded_by(&self, margin: f64) -> Self {
        Self {
            min_x: self.min_x - margin,
            min_y: self.min_y - margin,
            max_x: self.max_x + margin,
            max_y: self.max_y + margin,
        }
    }
}

/// Extends an optional envelope with another one.
pub(crate) fn expand_envelope(target: &mut Option<Envelope>, env: Envelope) {
    *target = Some(match target {
        Some(current) => current.merged(&env),
        None => env,
    });
}
