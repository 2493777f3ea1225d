//! Cut profiles: the ordered crossings of a source to receiver line with the
//! scene.

mod query;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::geometry::Point3;

/// What a cut point lies on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CutPointKind {
    Source,
    Receiver,
    Building,
    Terrain,
    GroundEffect,
}

impl CutPointKind {
    pub fn name(&self) -> &'static str {
        match self {
            CutPointKind::Source => "SOURCE",
            CutPointKind::Receiver => "RECEIVER",
            CutPointKind::Building => "BUILDING",
            CutPointKind::Terrain => "TERRAIN",
            CutPointKind::GroundEffect => "GROUND_EFFECT",
        }
    }
}

impl fmt::Display for CutPointKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A single point of a [`CutProfile`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CutPoint {
    position: Point3,
    kind: CutPointKind,
    origin: Option<usize>,
    building: Option<usize>,
    ground_coefficient: Option<f64>,
}

impl CutPoint {
    pub(crate) fn endpoint(position: Point3, kind: CutPointKind) -> Self {
        Self {
            position,
            kind,
            origin: None,
            building: None,
            ground_coefficient: None,
        }
    }

    pub(crate) fn crossing(position: Point3, kind: CutPointKind, origin: usize) -> Self {
        Self {
            position,
            kind,
            origin: Some(origin),
            building: (kind == CutPointKind::Building).then_some(origin),
            ground_coefficient: None,
        }
    }

    pub fn position(&self) -> Point3 {
        self.position
    }

    pub fn kind(&self) -> CutPointKind {
        self.kind
    }

    /// Index of the crossed feature: building, terrain triangle or ground
    /// effect. `None` for the source and the receiver.
    pub fn origin(&self) -> Option<usize> {
        self.origin
    }

    /// Building the point belongs to, if any.
    pub fn building(&self) -> Option<usize> {
        self.building
    }

    /// Absorption coefficient of the ground effect active at this point.
    pub fn ground_coefficient(&self) -> Option<f64> {
        self.ground_coefficient
    }

    pub(crate) fn set_ground_coefficient(&mut self, coefficient: Option<f64>) {
        self.ground_coefficient = coefficient;
    }
}

impl fmt::Display for CutPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({},{},{}) ; {}",
            self.kind,
            self.position.x,
            self.position.y,
            self.position.z,
            self.ground_coefficient.unwrap_or(f64::NAN)
        )
    }
}

/// Ordered cut points from the source to the receiver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CutProfile {
    points: Vec<CutPoint>,
    has_building: bool,
    has_terrain: bool,
    has_ground_effect: bool,
}

impl CutProfile {
    pub(crate) fn from_points(points: Vec<CutPoint>) -> Self {
        let has = |kind| points.iter().any(|p: &CutPoint| p.kind == kind);
        Self {
            has_building: has(CutPointKind::Building),
            has_terrain: has(CutPointKind::Terrain),
            has_ground_effect: has(CutPointKind::GroundEffect),
            points,
        }
    }

    pub fn points(&self) -> &[CutPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, CutPoint> {
        self.points.iter()
    }

    /// First point of the profile, the source.
    pub fn source(&self) -> Option<&CutPoint> {
        self.points.first()
    }

    /// Last point of the profile, the receiver.
    pub fn receiver(&self) -> Option<&CutPoint> {
        self.points.last()
    }

    pub fn has_building(&self) -> bool {
        self.has_building
    }

    pub fn has_terrain(&self) -> bool {
        self.has_terrain
    }

    pub fn has_ground_effect(&self) -> bool {
        self.has_ground_effect
    }
}

impl<'a> IntoIterator for &'a CutProfile {
    type Item = &'a CutPoint;
    type IntoIter = std::slice::Iter<'a, CutPoint>;

    fn into_iter(self) -> Self::IntoIter {
        self.points.iter()
    }
}
