//! Polygons used for building footprints and ground effect regions.

use super::{Envelope, Point3, Segment};
use crate::error::{ProfileError, Result};

/// Returns `true` if (`x`, `y`) is inside the ring using the ray casting
/// algorithm. The ring may be open or closed.
pub fn point_in_ring(x: f64, y: f64, ring: &[Point3]) -> bool {
    let mut inside = false;
    if ring.is_empty() {
        return inside;
    }
    let mut j = ring.len() - 1;
    for i in 0..ring.len() {
        let pi = ring[i];
        let pj = ring[j];
        if ((pi.y > y) != (pj.y > y)) && (x < (pj.x - pi.x) * (y - pi.y) / (pj.y - pi.y) + pi.x) {
            inside = !inside;
        }
        j = i;
    }
    inside
}

/// Calculates the planar area of a simple ring using the shoelace formula.
pub fn polygon_area(vertices: &[Point3]) -> f64 {
    if vertices.len() < 3 {
        return 0.0;
    }
    let mut sum = 0.0;
    for i in 0..vertices.len() {
        let j = (i + 1) % vertices.len();
        sum += vertices[i].x * vertices[j].y - vertices[j].x * vertices[i].y;
    }
    sum.abs() * 0.5
}

/// Drops the closing vertex and consecutive duplicates from a ring.
fn open_ring(mut ring: Vec<Point3>) -> Vec<Point3> {
    ring.dedup_by(|a, b| a.x == b.x && a.y == b.y);
    while ring.len() > 1 {
        let first = ring[0];
        let last = ring[ring.len() - 1];
        if first.x == last.x && first.y == last.y {
            ring.pop();
        } else {
            break;
        }
    }
    ring
}

fn ring_edges(ring: &[Point3]) -> impl Iterator<Item = Segment> + '_ {
    let n = ring.len();
    let count = if n > 1 { n } else { 0 };
    (0..count).map(move |i| Segment::new(ring[i], ring[(i + 1) % n]))
}

fn validate_ring(ring: &[Point3]) -> Result<()> {
    if ring.len() < 3 {
        return Err(ProfileError::InvalidGeometry(format!(
            "ring has {} distinct vertices, at least 3 are required",
            ring.len()
        )));
    }
    if ring.iter().any(|p| !p.is_finite_xy()) {
        return Err(ProfileError::InvalidGeometry(
            "ring contains non-finite coordinates".into(),
        ));
    }
    if polygon_area(ring) <= f64::EPSILON {
        return Err(ProfileError::InvalidGeometry("ring has no area".into()));
    }
    let edges: Vec<Segment> = ring_edges(ring).collect();
    let n = edges.len();
    for i in 0..n {
        for j in (i + 2)..n {
            if i == 0 && j == n - 1 {
                continue;
            }
            if edges[i].intersection(&edges[j]).is_some() {
                return Err(ProfileError::InvalidGeometry(format!(
                    "ring is self-intersecting between edges {} and {}",
                    i, j
                )));
            }
        }
    }
    Ok(())
}

/// Simple polygon with an exterior ring and optional interior rings (holes).
/// Rings are stored open: the closing vertex is not repeated.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Polygon {
    exterior: Vec<Point3>,
    interiors: Vec<Vec<Point3>>,
}

impl Polygon {
    /// Creates a polygon from its rings. Closed rings are accepted.
    pub fn new(exterior: Vec<Point3>, interiors: Vec<Vec<Point3>>) -> Self {
        Self {
            exterior: open_ring(exterior),
            interiors: interiors.into_iter().map(open_ring).collect(),
        }
    }

    /// Creates a polygon without holes.
    pub fn from_exterior(exterior: Vec<Point3>) -> Self {
        Self::new(exterior, Vec::new())
    }

    pub fn exterior(&self) -> &[Point3] {
        &self.exterior
    }

    pub fn interiors(&self) -> &[Vec<Point3>] {
        &self.interiors
    }

    /// Iterates over the exterior ring followed by the holes.
    pub fn rings(&self) -> impl Iterator<Item = &[Point3]> + '_ {
        std::iter::once(self.exterior.as_slice()).chain(self.interiors.iter().map(Vec::as_slice))
    }

    /// Every ring edge, closing edges included.
    pub fn edges(&self) -> impl Iterator<Item = Segment> + '_ {
        self.rings().flat_map(ring_edges)
    }

    /// Checks that every ring is a simple, non-degenerate ring.
    pub fn validate(&self) -> Result<()> {
        for ring in self.rings() {
            validate_ring(ring)?;
        }
        Ok(())
    }

    /// `true` if (`x`, `y`) lies inside the exterior and outside every hole.
    pub fn contains(&self, x: f64, y: f64) -> bool {
        point_in_ring(x, y, &self.exterior)
            && !self.interiors.iter().any(|h| point_in_ring(x, y, h))
    }

    pub fn envelope(&self) -> Option<Envelope> {
        Envelope::from_points(&self.exterior)
    }
}

impl From<geo_types::Polygon<f64>> for Polygon {
    fn from(poly: geo_types::Polygon<f64>) -> Self {
        let exterior = poly.exterior().coords().map(|c| Point3::from(*c)).collect();
        let interiors = poly
            .interiors()
            .iter()
            .map(|ring| ring.coords().map(|c| Point3::from(*c)).collect())
            .collect();
        Polygon::new(exterior, interiors)
    }
}

/// Collection of polygons treated as one region.
#[derive(Debug, Clone, PartialEq, Default, serde::Serialize, serde::Deserialize)]
pub struct MultiPolygon(pub Vec<Polygon>);

impl MultiPolygon {
    pub fn polygons(&self) -> &[Polygon] {
        &self.0
    }

    pub fn edges(&self) -> impl Iterator<Item = Segment> + '_ {
        self.0.iter().flat_map(Polygon::edges)
    }

    pub fn contains(&self, x: f64, y: f64) -> bool {
        self.0.iter().any(|p| p.contains(x, y))
    }

    pub fn envelope(&self) -> Option<Envelope> {
        self.0
            .iter()
            .filter_map(Polygon::envelope)
            .reduce(|a, b| a.merged(&b))
    }
}

impl From<Polygon> for MultiPolygon {
    fn from(poly: Polygon) -> Self {
        MultiPolygon(vec![poly])
    }
}

impl From<Vec<Polygon>> for MultiPolygon {
    fn from(polys: Vec<Polygon>) -> Self {
        MultiPolygon(polys)
    }
}

impl From<geo_types::Polygon<f64>> for MultiPolygon {
    fn from(poly: geo_types::Polygon<f64>) -> Self {
        MultiPolygon(vec![poly.into()])
    }
}

impl From<geo_types::MultiPolygon<f64>> for MultiPolygon {
    fn from(multi: geo_types::MultiPolygon<f64>) -> Self {
        MultiPolygon(multi.0.into_iter().map(Polygon::from).collect())
    }
}
