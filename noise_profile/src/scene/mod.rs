//! Scene construction and the immutable, queryable scene.
//!
//! A [`SceneBuilder`] collects buildings, terrain, ground effects, sources and
//! receivers. [`SceneBuilder::finish`] consumes it, triangulates the terrain
//! and builds the spatial indexes, producing a [`Scene`] that only offers
//! read access and can be shared between threads.

pub mod entities;

pub use entities::{Building, GroundEffect, SourceGeometry, Wall, WallKind};

use crate::config::ProfileConfig;
use crate::dtm::{DelaunayTriangulator, TerrainMesh, Triangulator};
use crate::error::{ProfileError, Result};
use crate::geometry::{expand_envelope, Envelope, MultiPolygon, Point3, Polygon, Segment};
use crate::index::BoxIndex;

/// Mutable feeding phase of a scene.
#[derive(Debug, Clone, Default)]
pub struct SceneBuilder {
    config: ProfileConfig,
    buildings: Vec<Building>,
    terrain_points: Vec<Point3>,
    terrain_lines: Vec<Vec<Point3>>,
    ground_effects: Vec<GroundEffect>,
    sources: Vec<SourceGeometry>,
    receivers: Vec<Point3>,
    envelope: Option<Envelope>,
}

impl SceneBuilder {
    pub fn new(config: ProfileConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn config(&self) -> &ProfileConfig {
        &self.config
    }

    /// Adds a building and returns its index. The footprint must be a simple
    /// polygon; otherwise nothing is stored and an error is returned.
    pub fn add_building(
        &mut self,
        footprint: Polygon,
        height: f64,
        absorption: Vec<f64>,
        id: Option<i64>,
    ) -> Result<usize> {
        if let Err(e) = footprint.validate() {
            log::error!("Building geometry rejected: {}", e);
            return Err(e);
        }
        if !height.is_finite() {
            return Err(ProfileError::InvalidGeometry(format!(
                "building height {} is not finite",
                height
            )));
        }
        if let Some(env) = footprint.envelope() {
            expand_envelope(&mut self.envelope, env);
        }
        self.buildings
            .push(Building::new(footprint, height, absorption, id));
        Ok(self.buildings.len() - 1)
    }

    /// Adds a terrain elevation sample. Points without an elevation are
    /// stored at ground level.
    pub fn add_terrain_point(&mut self, point: Point3) -> Option<usize> {
        if !point.is_finite_xy() {
            log::warn!("Ignoring terrain point with non-finite coordinates");
            return None;
        }
        expand_envelope(&mut self.envelope, Envelope::from_point(point));
        self.terrain_points.push(point.or_ground());
        Some(self.terrain_points.len() - 1)
    }

    /// Adds a terrain break-line enforced as triangle edges.
    pub fn add_terrain_line(&mut self, line: Vec<Point3>) -> Option<usize> {
        if line.len() < 2 || line.iter().any(|p| !p.is_finite_xy()) {
            log::warn!(
                "Ignoring terrain line with {} vertices or non-finite coordinates",
                line.len()
            );
            return None;
        }
        if let Some(env) = Envelope::from_points(&line) {
            expand_envelope(&mut self.envelope, env);
        }
        self.terrain_lines
            .push(line.into_iter().map(|p| p.or_ground()).collect());
        Some(self.terrain_lines.len() - 1)
    }

    /// Adds a ground effect region made of one or more polygons.
    pub fn add_ground_effect(
        &mut self,
        footprint: impl Into<MultiPolygon>,
        coefficient: f64,
    ) -> Result<usize> {
        let footprint = footprint.into();
        if footprint.polygons().is_empty() {
            return Err(ProfileError::InvalidGeometry(
                "ground effect without polygon".into(),
            ));
        }
        for poly in footprint.polygons() {
            poly.validate()?;
        }
        if !(0.0..=1.0).contains(&coefficient) {
            log::warn!("Ground effect coefficient {} outside [0, 1]", coefficient);
        }
        if let Some(env) = footprint.envelope() {
            expand_envelope(&mut self.envelope, env);
        }
        self.ground_effects
            .push(GroundEffect::new(footprint, coefficient));
        Ok(self.ground_effects.len() - 1)
    }

    /// Adds a point, line or area source.
    pub fn add_source(&mut self, geometry: impl Into<SourceGeometry>) -> Option<usize> {
        let geometry = geometry.into();
        if !geometry.is_finite() {
            log::warn!("Ignoring empty or non-finite source geometry");
            return None;
        }
        if let Some(env) = geometry.envelope() {
            expand_envelope(&mut self.envelope, env);
        }
        self.sources.push(geometry.grounded());
        Some(self.sources.len() - 1)
    }

    pub fn add_receiver(&mut self, point: Point3) -> Option<usize> {
        if !point.is_finite_xy() {
            log::warn!("Ignoring receiver with non-finite coordinates");
            return None;
        }
        expand_envelope(&mut self.envelope, Envelope::from_point(point));
        self.receivers.push(point.or_ground());
        Some(self.receivers.len() - 1)
    }

    /// Removes every building added so far.
    pub fn clear_buildings(&mut self) {
        self.buildings.clear();
    }

    pub fn building_count(&self) -> usize {
        self.buildings.len()
    }

    /// Envelope of everything fed so far.
    pub fn envelope(&self) -> Option<Envelope> {
        self.envelope
    }

    /// Finishes feeding with the default triangulator.
    pub fn finish(self) -> Result<Scene> {
        let triangulator = DelaunayTriangulator::new(self.config.max_triangle_area);
        self.finish_with(&triangulator)
    }

    /// Finishes feeding: triangulates the terrain and builds the wall,
    /// triangle and source indexes.
    pub fn finish_with(self, triangulator: &dyn Triangulator) -> Result<Scene> {
        let source_index = BoxIndex::bulk_load(
            self.sources
                .iter()
                .enumerate()
                .filter_map(|(i, s)| s.envelope().map(|env| (env, i))),
        );

        let mut walls: Vec<Wall> = Vec::new();
        for (i, building) in self.buildings.iter().enumerate() {
            walls.extend(building.walls(i));
        }

        let mut terrain = TerrainMesh::default();
        if !self.terrain_points.is_empty() || !self.terrain_lines.is_empty() {
            terrain = triangulator
                .triangulate(&self.terrain_points, &self.terrain_lines)
                .and_then(|mesh| mesh.validate().map(|_| mesh))
                .map_err(|e| {
                    log::error!("Terrain triangulation failed: {}", e);
                    e
                })?;
            walls.extend(terrain.boundary_edges().into_iter().map(|(a, b, t)| Wall {
                segment: Segment::new(terrain.vertices[a], terrain.vertices[b]),
                kind: WallKind::Terrain,
                origin: t,
            }));
        }
        let triangle_index = BoxIndex::bulk_load(
            (0..terrain.triangles.len()).map(|i| (terrain.triangle_envelope(i), i)),
        );

        for (i, effect) in self.ground_effects.iter().enumerate() {
            walls.extend(effect.walls(i));
        }
        let wall_index = BoxIndex::bulk_load(
            walls
                .iter()
                .enumerate()
                .map(|(i, w)| (w.segment.envelope(), i)),
        );

        log::debug!(
            "Scene finished: {} buildings, {} walls, {} terrain triangles, \
             {} ground effects, {} sources",
            self.buildings.len(),
            walls.len(),
            terrain.triangles.len(),
            self.ground_effects.len(),
            self.sources.len()
        );

        Ok(Scene {
            config: self.config,
            buildings: self.buildings,
            walls,
            wall_index,
            terrain,
            triangle_index,
            ground_effects: self.ground_effects,
            sources: self.sources,
            source_index,
            receivers: self.receivers,
            envelope: self.envelope,
        })
    }
}

/// Finished scene. Read-only; profiles are computed with [`Scene::profile`].
#[derive(Debug, Clone)]
pub struct Scene {
    config: ProfileConfig,
    buildings: Vec<Building>,
    walls: Vec<Wall>,
    wall_index: BoxIndex,
    terrain: TerrainMesh,
    triangle_index: BoxIndex,
    ground_effects: Vec<GroundEffect>,
    sources: Vec<SourceGeometry>,
    source_index: BoxIndex,
    receivers: Vec<Point3>,
    envelope: Option<Envelope>,
}

impl Scene {
    pub fn config(&self) -> &ProfileConfig {
        &self.config
    }

    pub fn envelope(&self) -> Option<Envelope> {
        self.envelope
    }

    pub fn buildings(&self) -> &[Building] {
        &self.buildings
    }

    pub fn building(&self, index: usize) -> Option<&Building> {
        self.buildings.get(index)
    }

    pub fn building_count(&self) -> usize {
        self.buildings.len()
    }

    pub fn walls(&self) -> &[Wall] {
        &self.walls
    }

    pub fn terrain(&self) -> &TerrainMesh {
        &self.terrain
    }

    pub fn ground_effects(&self) -> &[GroundEffect] {
        &self.ground_effects
    }

    pub fn sources(&self) -> &[SourceGeometry] {
        &self.sources
    }

    pub fn receivers(&self) -> &[Point3] {
        &self.receivers
    }

    /// Indices of walls whose bounding box intersects `env`.
    pub fn walls_in(&self, env: &Envelope) -> Vec<usize> {
        self.wall_index.query(env)
    }

    /// Indices of sources whose bounding box intersects `env`.
    pub fn sources_in(&self, env: &Envelope) -> Vec<usize> {
        self.source_index.query(env)
    }

    pub(crate) fn triangles_in(&self, env: &Envelope) -> Vec<usize> {
        self.triangle_index.query(env)
    }

    /// Terrain elevation at (`x`, `y`).
    ///
    /// The search box around the point starts at the chord length and
    /// doubles until the triangle index returns a candidate, at most
    /// `elevation_search_steps` times. A candidate containing the point is
    /// preferred, otherwise the first one is extrapolated. `None` without
    /// terrain or when the search is exhausted.
    pub fn ground_elevation(&self, x: f64, y: f64) -> Option<f64> {
        if self.triangle_index.is_empty() || !(x.is_finite() && y.is_finite()) {
            return None;
        }
        let origin = Envelope::from_point(Point3::xy(x, y));
        let mut margin = self.config.effective_chord_length();
        for _ in 0..self.config.elevation_search_steps.max(1) {
            let candidates = self.triangles_in(&origin.expanded_by(margin));
            if let Some(&first) = candidates.first() {
                let tri = candidates
                    .iter()
                    .copied()
                    .find(|&t| self.terrain.triangle_contains(t, x, y))
                    .unwrap_or(first);
                return self.terrain.elevation_in_triangle(tri, x, y);
            }
            margin *= 2.0;
        }
        log::warn!(
            "No terrain triangle found around ({}, {}) after {} search steps",
            x,
            y,
            self.config.elevation_search_steps
        );
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(x0: f64, y0: f64, size: f64) -> Polygon {
        Polygon::from_exterior(vec![
            Point3::xy(x0, y0),
            Point3::xy(x0 + size, y0),
            Point3::xy(x0 + size, y0 + size),
            Point3::xy(x0, y0 + size),
        ])
    }

    struct FailingTriangulator;

    impl Triangulator for FailingTriangulator {
        fn triangulate(&self, _: &[Point3], _: &[Vec<Point3>]) -> Result<TerrainMesh> {
            Err(ProfileError::Triangulation("provider offline".into()))
        }
    }

    struct DanglingTriangulator;

    impl Triangulator for DanglingTriangulator {
        fn triangulate(&self, points: &[Point3], _: &[Vec<Point3>]) -> Result<TerrainMesh> {
            Ok(TerrainMesh {
                vertices: points.to_vec(),
                triangles: vec![[0, 1, points.len()]],
            })
        }
    }

    #[test]
    fn invalid_building_is_rejected_without_mutation() {
        let mut builder = SceneBuilder::default();
        let bow_tie = Polygon::from_exterior(vec![
            Point3::xy(0.0, 0.0),
            Point3::xy(1.0, 1.0),
            Point3::xy(1.0, 0.0),
            Point3::xy(0.0, 1.0),
        ]);
        assert!(builder.add_building(bow_tie, 5.0, Vec::new(), None).is_err());
        assert_eq!(builder.building_count(), 0);
        assert!(builder.envelope().is_none());
        assert!(builder
            .add_building(square(0.0, 0.0, 1.0), f64::NAN, Vec::new(), None)
            .is_err());
    }

    #[test]
    fn feeding_expands_envelope() {
        let mut builder = SceneBuilder::default();
        builder
            .add_building(square(0.0, 0.0, 2.0), 5.0, Vec::new(), None)
            .unwrap();
        builder.add_terrain_point(Point3::new(-5.0, 1.0, 3.0));
        builder.add_receiver(Point3::new(1.0, 9.0, 4.0));
        assert_eq!(builder.envelope(), Some(Envelope::new(-5.0, 0.0, 2.0, 9.0)));
    }

    #[test]
    fn cleared_buildings_leave_no_walls() {
        let mut builder = SceneBuilder::default();
        builder
            .add_building(square(0.0, 0.0, 2.0), 5.0, Vec::new(), Some(1))
            .unwrap();
        builder
            .add_building(square(4.0, 0.0, 2.0), 8.0, Vec::new(), Some(2))
            .unwrap();
        builder.add_ground_effect(square(10.0, 0.0, 3.0), 0.5).unwrap();
        assert_eq!(builder.building_count(), 2);

        builder.clear_buildings();
        assert_eq!(builder.building_count(), 0);
        let scene = builder.finish().unwrap();
        assert_eq!(scene.building_count(), 0);
        assert!(scene.walls().iter().all(|w| w.kind != WallKind::Building));
        assert_eq!(scene.walls().len(), 4);

        let profile = scene.profile(Point3::new(-1.0, 1.0, 1.0), Point3::new(7.0, 1.0, 1.0));
        assert!(!profile.has_building());
    }

    #[test]
    fn degenerate_inputs_are_ignored() {
        let mut builder = SceneBuilder::default();
        assert!(builder.add_terrain_line(vec![Point3::new(0.0, 0.0, 0.0)]).is_none());
        assert!(builder.add_terrain_point(Point3::xy(f64::NAN, 0.0)).is_none());
        assert!(builder.add_source(SourceGeometry::Line(Vec::new())).is_none());
        assert!(builder.add_ground_effect(Vec::<Polygon>::new(), 0.5).is_err());
        let scene = builder.finish().unwrap();
        assert!(scene.terrain().is_empty());
        assert!(scene.sources().is_empty());
    }

    #[test]
    fn finish_builds_walls_for_every_kind() {
        let mut builder = SceneBuilder::default();
        builder
            .add_building(square(0.0, 0.0, 2.0), 5.0, Vec::new(), Some(7))
            .unwrap();
        for p in [(-10.0, -10.0), (20.0, -10.0), (20.0, 20.0), (-10.0, 20.0)] {
            builder.add_terrain_point(Point3::new(p.0, p.1, 0.0));
        }
        builder.add_ground_effect(square(5.0, 5.0, 3.0), 0.5).unwrap();
        let scene = builder.finish().unwrap();

        let count = |kind| scene.walls().iter().filter(|w| w.kind == kind).count();
        assert_eq!(count(WallKind::Building), 4);
        assert_eq!(count(WallKind::Terrain), 4);
        assert_eq!(count(WallKind::GroundEffect), 4);
        assert_eq!(scene.terrain().triangles.len(), 2);
        assert_eq!(scene.building(0).and_then(Building::id), Some(7));
    }

    #[test]
    fn indexes_reference_existing_items() {
        let mut builder = SceneBuilder::default();
        builder
            .add_building(square(0.0, 0.0, 2.0), 5.0, Vec::new(), None)
            .unwrap();
        builder.add_source(Point3::new(1.0, 1.0, 0.5));
        builder.add_source(square(3.0, 3.0, 1.0));
        for p in [(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0), (5.0, 4.0)] {
            builder.add_terrain_point(Point3::new(p.0, p.1, 1.0));
        }
        let scene = builder.finish().unwrap();
        assert!(scene.wall_index.max_item().unwrap() < scene.walls().len());
        assert!(scene.triangle_index.max_item().unwrap() < scene.terrain().triangles.len());
        assert!(scene.source_index.max_item().unwrap() < scene.sources().len());
        assert_eq!(scene.wall_index.len(), scene.walls().len());
    }

    #[test]
    fn source_index_queries() {
        let mut builder = SceneBuilder::default();
        builder.add_source(Point3::new(1.0, 1.0, 0.0));
        builder.add_source(geo_types::LineString::from(vec![(10.0, 0.0), (20.0, 0.0)]));
        let scene = builder.finish().unwrap();
        assert_eq!(scene.sources_in(&Envelope::new(0.0, 0.0, 2.0, 2.0)), vec![0]);
        assert_eq!(scene.sources_in(&Envelope::new(15.0, -1.0, 16.0, 1.0)), vec![1]);
        assert_eq!(scene.sources_in(&Envelope::new(-1.0, -1.0, 30.0, 1.0)), vec![0, 1]);
    }

    #[test]
    fn triangulation_failure_is_surfaced() {
        let mut builder = SceneBuilder::default();
        for p in [(0.0, 0.0), (1.0, 0.0), (0.0, 1.0)] {
            builder.add_terrain_point(Point3::new(p.0, p.1, 0.0));
        }
        let err = builder.clone().finish_with(&FailingTriangulator).unwrap_err();
        assert!(matches!(err, ProfileError::Triangulation(_)));
        assert!(builder.finish_with(&DanglingTriangulator).is_err());
    }

    #[test]
    fn flat_terrain_elevation_fallback() {
        let mut builder = SceneBuilder::new(ProfileConfig::default().max_chord_length(1.0));
        for p in [(0.0, 0.0), (100.0, 0.0), (100.0, 100.0), (0.0, 100.0)] {
            builder.add_terrain_point(Point3::new(p.0, p.1, 10.0));
        }
        let scene = builder.finish().unwrap();
        for (x, y) in [(50.0, 50.0), (150.0, 50.0)] {
            let z = scene.ground_elevation(x, y).unwrap();
            assert!((z - 10.0).abs() < 1e-9);
        }
    }

    #[test]
    fn sloped_terrain_prefers_containing_triangle() {
        let mut builder = SceneBuilder::default();
        builder.add_terrain_point(Point3::new(0.0, 0.0, 0.0));
        builder.add_terrain_point(Point3::new(10.0, 0.0, 10.0));
        builder.add_terrain_point(Point3::new(10.0, 10.0, 10.0));
        builder.add_terrain_point(Point3::new(0.0, 10.0, 0.0));
        let scene = builder.finish().unwrap();
        let z = scene.ground_elevation(2.5, 7.5).unwrap();
        assert!((z - 2.5).abs() < 1e-9);
    }

    #[test]
    fn elevation_search_is_capped() {
        let config = ProfileConfig::default()
            .max_chord_length(1.0)
            .elevation_search_steps(3);
        let mut builder = SceneBuilder::new(config);
        for p in [(0.0, 0.0), (1.0, 0.0), (0.0, 1.0)] {
            builder.add_terrain_point(Point3::new(p.0, p.1, 0.0));
        }
        let scene = builder.finish().unwrap();
        assert_eq!(scene.ground_elevation(1000.0, 1000.0), None);
        assert!(SceneBuilder::default()
            .finish()
            .unwrap()
            .ground_elevation(0.0, 0.0)
            .is_none());
    }

    #[test]
    fn scene_is_shareable_between_threads() {
        fn assert_sync<T: Send + Sync>() {}
        assert_sync::<Scene>();
    }
}
