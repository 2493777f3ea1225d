//! File input and output helpers for scene descriptions.

use std::fs::File;
use std::io::{self, Read, Write};

use serde::{Deserialize, Serialize};

use crate::config::ProfileConfig;
use crate::error::{ProfileError, Result};
use crate::geometry::{MultiPolygon, Point3, Polygon};
use crate::scene::{SceneBuilder, SourceGeometry};

pub mod gis;

pub use gis::{read_buildings_geojson, read_ground_effects_geojson};

/// Position as `[x, y]` or `[x, y, z]`.
pub type Coordinate = Vec<f64>;
/// Polygon ring as a list of positions, closed or open.
pub type Ring = Vec<Coordinate>;

/// Reads a file to string.
pub fn read_to_string(path: &str) -> io::Result<String> {
    let mut buffer = String::new();
    File::open(path)?.read_to_string(&mut buffer)?;
    Ok(buffer)
}

/// Writes a string to a file, replacing it.
pub fn write_string(path: &str, contents: &str) -> io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(contents.as_bytes())
}

fn to_point(c: &[f64]) -> Result<Point3> {
    match *c {
        [x, y] => Ok(Point3::xy(x, y)),
        [x, y, z] => Ok(Point3::new(x, y, z)),
        _ => Err(ProfileError::InvalidGeometry(format!(
            "coordinate with {} values, expected 2 or 3",
            c.len()
        ))),
    }
}

fn to_points(coords: &[Coordinate]) -> Result<Vec<Point3>> {
    coords.iter().map(|c| to_point(c)).collect()
}

fn to_polygon(rings: &[Ring]) -> Result<Polygon> {
    let (exterior, interiors) = rings
        .split_first()
        .ok_or_else(|| ProfileError::InvalidGeometry("polygon without rings".into()))?;
    let interiors = interiors
        .iter()
        .map(|r| to_points(r))
        .collect::<Result<Vec<_>>>()?;
    Ok(Polygon::new(to_points(exterior)?, interiors))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildingDescription {
    /// Exterior ring followed by courtyards.
    pub footprint: Vec<Ring>,
    pub height: f64,
    #[serde(default)]
    pub absorption: Vec<f64>,
    #[serde(default)]
    pub id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroundEffectDescription {
    pub polygons: Vec<Vec<Ring>>,
    pub coefficient: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "coordinates")]
pub enum SourceDescription {
    Point(Coordinate),
    LineString(Vec<Coordinate>),
    Polygon(Vec<Ring>),
}

/// Serializable scene content, replayed through a [`SceneBuilder`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneDescription {
    pub config: ProfileConfig,
    pub buildings: Vec<BuildingDescription>,
    pub terrain_points: Vec<Coordinate>,
    pub terrain_lines: Vec<Vec<Coordinate>>,
    pub ground_effects: Vec<GroundEffectDescription>,
    pub sources: Vec<SourceDescription>,
    pub receivers: Vec<Coordinate>,
}

impl SceneDescription {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds every item into a new builder. Malformed coordinates, invalid
    /// buildings and invalid ground effects abort with an error.
    pub fn into_builder(self) -> Result<SceneBuilder> {
        let mut builder = SceneBuilder::new(self.config);
        for b in self.buildings {
            builder.add_building(to_polygon(&b.footprint)?, b.height, b.absorption, b.id)?;
        }
        for p in &self.terrain_points {
            builder.add_terrain_point(to_point(p)?);
        }
        for line in &self.terrain_lines {
            builder.add_terrain_line(to_points(line)?);
        }
        for g in self.ground_effects {
            let polygons = g
                .polygons
                .iter()
                .map(|rings| to_polygon(rings))
                .collect::<Result<Vec<_>>>()?;
            builder.add_ground_effect(MultiPolygon(polygons), g.coefficient)?;
        }
        for s in &self.sources {
            let geometry = match s {
                SourceDescription::Point(c) => SourceGeometry::Point(to_point(c)?),
                SourceDescription::LineString(cs) => SourceGeometry::Line(to_points(cs)?),
                SourceDescription::Polygon(rings) => SourceGeometry::Area(to_polygon(rings)?),
            };
            builder.add_source(geometry);
        }
        for r in &self.receivers {
            builder.add_receiver(to_point(r)?);
        }
        Ok(builder)
    }
}

pub fn read_scene_json(path: &str) -> Result<SceneDescription> {
    let contents = read_to_string(path)?;
    let scene: SceneDescription = serde_json::from_str(&contents)?;
    Ok(scene)
}

pub fn write_scene_json(path: &str, scene: &SceneDescription) -> Result<()> {
    let json = serde_json::to_string_pretty(scene)?;
    write_string(path, &json)?;
    Ok(())
}
