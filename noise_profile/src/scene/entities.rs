//! Items owned by a scene: buildings, walls, ground effects and sources.

use crate::geometry::{Envelope, MultiPolygon, Point3, Polygon, Segment};

/// Building extruded vertically from its footprint.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Building {
    footprint: Polygon,
    height: f64,
    absorption: Vec<f64>,
    id: Option<i64>,
}

impl Building {
    pub(crate) fn new(
        footprint: Polygon,
        height: f64,
        absorption: Vec<f64>,
        id: Option<i64>,
    ) -> Self {
        Self {
            footprint,
            height,
            absorption,
            id,
        }
    }

    pub fn footprint(&self) -> &Polygon {
        &self.footprint
    }

    pub fn height(&self) -> f64 {
        self.height
    }

    /// Absorption coefficients, one per frequency band.
    pub fn absorption(&self) -> &[f64] {
        &self.absorption
    }

    /// External identifier, e.g. a database key.
    pub fn id(&self) -> Option<i64> {
        self.id
    }

    /// One wall per footprint edge. Vertices with an explicit elevation keep
    /// it, the others are lifted to the building height.
    pub(crate) fn walls(&self, building: usize) -> impl Iterator<Item = Wall> + '_ {
        let lift = move |p: Point3| if p.has_z() { p } else { p.with_z(self.height) };
        self.footprint.edges().map(move |edge| Wall {
            segment: Segment::new(lift(edge.start), lift(edge.end)),
            kind: WallKind::Building,
            origin: building,
        })
    }
}

/// What a wall was derived from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum WallKind {
    Building,
    Terrain,
    GroundEffect,
}

/// Segment used as a crossing test primitive.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Wall {
    pub segment: Segment,
    pub kind: WallKind,
    /// Building index, terrain triangle index or ground effect index.
    pub origin: usize,
}

/// Area with a single ground absorption coefficient, nominally in `[0, 1]`.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct GroundEffect {
    footprint: MultiPolygon,
    coefficient: f64,
}

impl GroundEffect {
    pub(crate) fn new(footprint: MultiPolygon, coefficient: f64) -> Self {
        Self {
            footprint,
            coefficient,
        }
    }

    pub fn footprint(&self) -> &MultiPolygon {
        &self.footprint
    }

    pub fn coefficient(&self) -> f64 {
        self.coefficient
    }

    pub fn contains(&self, x: f64, y: f64) -> bool {
        self.footprint.contains(x, y)
    }

    pub(crate) fn walls(&self, effect: usize) -> impl Iterator<Item = Wall> + '_ {
        self.footprint.edges().map(move |segment| Wall {
            segment,
            kind: WallKind::GroundEffect,
            origin: effect,
        })
    }
}

/// Point, line or area sound source.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum SourceGeometry {
    Point(Point3),
    Line(Vec<Point3>),
    Area(Polygon),
}

impl SourceGeometry {
    pub fn envelope(&self) -> Option<Envelope> {
        match self {
            SourceGeometry::Point(p) => Some(Envelope::from_point(*p)),
            SourceGeometry::Line(pts) => Envelope::from_points(pts),
            SourceGeometry::Area(poly) => poly.envelope(),
        }
    }

    pub(crate) fn is_finite(&self) -> bool {
        match self {
            SourceGeometry::Point(p) => p.is_finite_xy(),
            SourceGeometry::Line(pts) => !pts.is_empty() && pts.iter().all(Point3::is_finite_xy),
            SourceGeometry::Area(poly) => poly.rings().flatten().all(Point3::is_finite_xy),
        }
    }

    /// Replaces undefined elevations with ground level.
    pub(crate) fn grounded(self) -> Self {
        match self {
            SourceGeometry::Point(p) => SourceGeometry::Point(p.or_ground()),
            SourceGeometry::Line(pts) => {
                SourceGeometry::Line(pts.into_iter().map(|p| p.or_ground()).collect())
            }
            SourceGeometry::Area(poly) => SourceGeometry::Area(poly),
        }
    }
}

impl From<Point3> for SourceGeometry {
    fn from(p: Point3) -> Self {
        SourceGeometry::Point(p)
    }
}

impl From<Polygon> for SourceGeometry {
    fn from(poly: Polygon) -> Self {
        SourceGeometry::Area(poly)
    }
}

impl From<geo_types::Point<f64>> for SourceGeometry {
    fn from(p: geo_types::Point<f64>) -> Self {
        SourceGeometry::Point(Point3::xy(p.x(), p.y()))
    }
}

impl From<geo_types::LineString<f64>> for SourceGeometry {
    fn from(line: geo_types::LineString<f64>) -> Self {
        SourceGeometry::Line(line.coords().map(|c| Point3::from(*c)).collect())
    }
}
