//! Terrain mesh built from scattered elevation points and break-lines.
//!
//! Triangulation is delegated to a [`Triangulator`]; the default
//! [`DelaunayTriangulator`] uses `delaunator` for unconstrained input and
//! `cdt` once break-lines are present.

use std::collections::HashMap;

use crate::error::{ProfileError, Result};
use crate::geometry::{polygon_area, Envelope, Point3, Segment};

/// Triangulation provider used when a scene is finished.
pub trait Triangulator {
    /// Triangulates `points` in the XY plane, forcing every consecutive
    /// vertex pair of each `constraints` line to be a mesh edge.
    fn triangulate(&self, points: &[Point3], constraints: &[Vec<Point3>]) -> Result<TerrainMesh>;
}

fn point_on_segment(a: Point3, b: Point3, p: Point3, tol: f64) -> bool {
    let ab = (b.x - a.x, b.y - a.y);
    let ap = (p.x - a.x, p.y - a.y);
    let len2 = ab.0 * ab.0 + ab.1 * ab.1;
    if len2 <= 0.0 {
        return false;
    }
    let cross = ab.0 * ap.1 - ab.1 * ap.0;
    if cross.abs() / len2.sqrt() > tol {
        return false;
    }
    let dot = (ap.0 * ab.0 + ap.1 * ab.1) / len2;
    dot > 0.0 && dot < 1.0
}

/// Splits constraint edges at every vertex lying on them.
fn refine_edges_for_points(points: &[Point3], edges: &[(usize, usize)]) -> Vec<(usize, usize)> {
    let mut refined = Vec::new();
    for &(a, b) in edges {
        let pa = points[a];
        let pb = points[b];
        let mut mids: Vec<(usize, f64)> = Vec::new();
        for (i, &p) in points.iter().enumerate() {
            if i == a || i == b {
                continue;
            }
            if point_on_segment(pa, pb, p, 1e-9) {
                let t = (p.x - pa.x).hypot(p.y - pa.y);
                mids.push((i, t));
            }
        }
        mids.sort_by(|x, y| x.1.total_cmp(&y.1));
        let mut last = a;
        for (idx, _) in mids {
            refined.push((last, idx));
            last = idx;
        }
        refined.push((last, b));
    }
    refined.sort_unstable();
    refined.dedup();
    refined
}

fn barycentric(x: f64, y: f64, a: Point3, b: Point3, c: Point3) -> Option<(f64, f64, f64)> {
    let det = (b.y - c.y) * (a.x - c.x) + (c.x - b.x) * (a.y - c.y);
    if det.abs() < f64::EPSILON {
        return None;
    }
    let u = ((b.y - c.y) * (x - c.x) + (c.x - b.x) * (y - c.y)) / det;
    let v = ((c.y - a.y) * (x - c.x) + (a.x - c.x) * (y - c.y)) / det;
    let w = 1.0 - u - v;
    Some((u, v, w))
}

/// Triangulated terrain surface.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TerrainMesh {
    /// Unique vertices of the mesh.
    pub vertices: Vec<Point3>,
    /// Indices into `vertices` forming triangles.
    pub triangles: Vec<[usize; 3]>,
}

impl TerrainMesh {
    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    /// Checks that every triangle references existing vertices.
    pub fn validate(&self) -> Result<()> {
        let n = self.vertices.len();
        match self.triangles.iter().position(|t| t.iter().any(|&i| i >= n)) {
            Some(bad) => Err(ProfileError::Triangulation(format!(
                "triangle {} references a vertex outside the {} mesh vertices",
                bad, n
            ))),
            None => Ok(()),
        }
    }

    /// The three corners of triangle `i`.
    pub fn triangle_points(&self, i: usize) -> [Point3; 3] {
        let t = self.triangles[i];
        [self.vertices[t[0]], self.vertices[t[1]], self.vertices[t[2]]]
    }

    /// The three edges of triangle `i`: AB, BC and CA.
    pub fn triangle_edges(&self, i: usize) -> [Segment; 3] {
        let [a, b, c] = self.triangle_points(i);
        [Segment::new(a, b), Segment::new(b, c), Segment::new(c, a)]
    }

    pub fn triangle_envelope(&self, i: usize) -> Envelope {
        let [a, b, c] = self.triangle_points(i);
        Envelope::from_point(a).including(b).including(c)
    }

    /// Planar area of triangle `i`.
    pub fn triangle_area(&self, i: usize) -> f64 {
        polygon_area(&self.triangle_points(i))
    }

    /// Elevation of the plane through triangle `i` at (`x`, `y`). Points
    /// outside the triangle are extrapolated; degenerate triangles give `None`.
    pub fn elevation_in_triangle(&self, i: usize, x: f64, y: f64) -> Option<f64> {
        let [a, b, c] = self.triangle_points(i);
        let (u, v, w) = barycentric(x, y, a, b, c)?;
        Some(u * a.z + v * b.z + w * c.z)
    }

    /// `true` if (`x`, `y`) lies inside triangle `i` or on its border.
    pub fn triangle_contains(&self, i: usize, x: f64, y: f64) -> bool {
        let [a, b, c] = self.triangle_points(i);
        match barycentric(x, y, a, b, c) {
            Some((u, v, w)) => u >= -1e-9 && v >= -1e-9 && w >= -1e-9,
            None => false,
        }
    }

    /// Edges belonging to exactly one triangle, as `(start, end, triangle)`
    /// in triangle order. Edges shared by two triangles are interior and
    /// dropped.
    pub fn boundary_edges(&self) -> Vec<(usize, usize, usize)> {
        let mut counts: HashMap<(usize, usize), usize> = HashMap::new();
        let mut edges = Vec::with_capacity(self.triangles.len() * 3);
        for (ti, t) in self.triangles.iter().enumerate() {
            for (a, b) in [(t[0], t[1]), (t[1], t[2]), (t[2], t[0])] {
                *counts.entry((a.min(b), a.max(b))).or_insert(0) += 1;
                edges.push((a, b, ti));
            }
        }
        edges.retain(|&(a, b, _)| counts[&(a.min(b), a.max(b))] == 1);
        edges
    }
}

/// Vertex list that merges points sharing the same planar position.
#[derive(Default)]
struct VertexSet {
    vertices: Vec<Point3>,
    lookup: HashMap<(u64, u64), usize>,
}

impl VertexSet {
    fn insert(&mut self, p: Point3) -> usize {
        // `+ 0.0` folds -0.0 into 0.0 so both hash alike.
        let key = ((p.x + 0.0).to_bits(), (p.y + 0.0).to_bits());
        if let Some(&idx) = self.lookup.get(&key) {
            let existing = self.vertices[idx];
            if p.has_z() && (existing.z - p.z).abs() > f64::EPSILON {
                log::debug!(
                    "terrain vertex ({}, {}) supplied twice, keeping z = {}",
                    p.x,
                    p.y,
                    existing.z
                );
            }
            return idx;
        }
        self.vertices.push(p.or_ground());
        self.lookup.insert(key, self.vertices.len() - 1);
        self.vertices.len() - 1
    }
}

fn run_triangulation(vertices: &[Point3], edges: &[(usize, usize)]) -> Result<Vec<[usize; 3]>> {
    let triangles: Vec<[usize; 3]> = if edges.is_empty() {
        let coords: Vec<delaunator::Point> = vertices
            .iter()
            .map(|p| delaunator::Point { x: p.x, y: p.y })
            .collect();
        let triangulation = delaunator::triangulate(&coords);
        triangulation
            .triangles
            .chunks(3)
            .map(|c| [c[0], c[1], c[2]])
            .collect()
    } else {
        let coords: Vec<(f64, f64)> = vertices.iter().map(|p| (p.x, p.y)).collect();
        cdt::triangulate_with_edges(&coords, edges)
            .map_err(|e| ProfileError::Triangulation(format!("{:?}", e)))?
            .into_iter()
            .map(|t| [t.0, t.1, t.2])
            .collect()
    };
    if triangles.is_empty() {
        return Err(ProfileError::Triangulation(
            "no triangle produced, terrain points may be collinear".into(),
        ));
    }
    Ok(triangles)
}

/// Default triangulation provider.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DelaunayTriangulator {
    /// Triangles larger than this are split by centroid insertion.
    pub max_area: Option<f64>,
    /// Upper bound on refinement passes.
    pub max_refinement_passes: usize,
}

impl Default for DelaunayTriangulator {
    fn default() -> Self {
        Self {
            max_area: None,
            max_refinement_passes: 12,
        }
    }
}

impl DelaunayTriangulator {
    pub fn new(max_area: Option<f64>) -> Self {
        Self {
            max_area,
            ..Self::default()
        }
    }
}

impl Triangulator for DelaunayTriangulator {
    fn triangulate(&self, points: &[Point3], constraints: &[Vec<Point3>]) -> Result<TerrainMesh> {
        let mut set = VertexSet::default();
        for p in points {
            set.insert(*p);
        }
        let mut edges = Vec::new();
        for line in constraints {
            for w in line.windows(2) {
                let a = set.insert(w[0]);
                let b = set.insert(w[1]);
                if a != b {
                    edges.push((a.min(b), a.max(b)));
                }
            }
        }
        if set.vertices.len() < 3 {
            return Err(ProfileError::Triangulation(format!(
                "{} distinct terrain vertices, at least 3 are required",
                set.vertices.len()
            )));
        }
        if !edges.is_empty() {
            edges = refine_edges_for_points(&set.vertices, &edges);
        }

        let mut mesh = TerrainMesh {
            triangles: run_triangulation(&set.vertices, &edges)?,
            vertices: set.vertices.clone(),
        };
        let max_area = match self.max_area {
            Some(a) if a > 0.0 => a,
            _ => return Ok(mesh),
        };
        for pass in 0..self.max_refinement_passes {
            let centroids: Vec<Point3> = (0..mesh.triangles.len())
                .filter(|&i| mesh.triangle_area(i) > max_area)
                .map(|i| {
                    let [a, b, c] = mesh.triangle_points(i);
                    Point3::new(
                        (a.x + b.x + c.x) / 3.0,
                        (a.y + b.y + c.y) / 3.0,
                        (a.z + b.z + c.z) / 3.0,
                    )
                })
                .collect();
            if centroids.is_empty() {
                return Ok(mesh);
            }
            log::debug!(
                "refinement pass {}: splitting {} triangles larger than {}",
                pass,
                centroids.len(),
                max_area
            );
            for c in centroids {
                set.insert(c);
            }
            mesh = TerrainMesh {
                triangles: run_triangulation(&set.vertices, &edges)?,
                vertices: set.vertices.clone(),
            };
        }
        if (0..mesh.triangles.len()).any(|i| mesh.triangle_area(i) > max_area) {
            log::warn!(
                "terrain still has triangles larger than {} after {} refinement passes",
                max_area,
                self.max_refinement_passes
            );
        }
        Ok(mesh)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat_square(z: f64) -> Vec<Point3> {
        vec![
            Point3::new(0.0, 0.0, z),
            Point3::new(10.0, 0.0, z),
            Point3::new(10.0, 10.0, z),
            Point3::new(0.0, 10.0, z),
        ]
    }

    #[test]
    fn flat_square_has_two_triangles_and_four_boundary_edges() {
        let mesh = DelaunayTriangulator::default()
            .triangulate(&flat_square(10.0), &[])
            .unwrap();
        assert_eq!(mesh.vertices.len(), 4);
        assert_eq!(mesh.triangles.len(), 2);
        assert!(mesh.validate().is_ok());
        assert_eq!(mesh.boundary_edges().len(), 4);
    }

    #[test]
    fn elevation_interpolates_plane() {
        let mesh = TerrainMesh {
            vertices: vec![
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.0, 0.0, 1.0),
                Point3::new(0.0, 1.0, 2.0),
            ],
            triangles: vec![[0, 1, 2]],
        };
        let z = mesh.elevation_in_triangle(0, 0.25, 0.25).unwrap();
        assert!((z - 0.75).abs() < 1e-9);
        assert!(mesh.triangle_contains(0, 0.25, 0.25));
        assert!(!mesh.triangle_contains(0, 1.0, 1.0));
    }

    #[test]
    fn duplicate_points_are_merged() {
        let mut pts = flat_square(0.0);
        pts.push(Point3::new(10.0, 10.0, 3.0));
        let mesh = DelaunayTriangulator::default().triangulate(&pts, &[]).unwrap();
        assert_eq!(mesh.vertices.len(), 4);
        assert!(mesh.vertices.iter().all(|v| v.z == 0.0));
    }

    #[test]
    fn undefined_elevation_becomes_ground() {
        let pts = vec![Point3::xy(0.0, 0.0), Point3::xy(1.0, 0.0), Point3::xy(0.0, 1.0)];
        let mesh = DelaunayTriangulator::default().triangulate(&pts, &[]).unwrap();
        assert!(mesh.vertices.iter().all(|v| v.z == 0.0));
    }

    #[test]
    fn breakline_through_vertex_is_split_and_kept() {
        let pts = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
            Point3::new(0.5, 0.5, 1.0),
        ];
        let line = vec![Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 1.0, 0.0)];
        let mesh = DelaunayTriangulator::default()
            .triangulate(&pts, &[line])
            .unwrap();
        assert!(mesh.triangles.iter().any(|t| t.contains(&0) && t.contains(&4)));
        assert!(mesh.triangles.iter().any(|t| t.contains(&4) && t.contains(&2)));
    }

    #[test]
    fn breakline_vertices_join_the_mesh() {
        let line = vec![Point3::new(5.0, -5.0, 2.0), Point3::new(5.0, 15.0, 2.0)];
        let mesh = DelaunayTriangulator::default()
            .triangulate(&flat_square(0.0), &[line])
            .unwrap();
        assert_eq!(mesh.vertices.len(), 6);
        assert!(mesh
            .triangles
            .iter()
            .any(|t| t.contains(&4) && t.contains(&5)));
    }

    #[test]
    fn too_few_or_collinear_points_fail() {
        let two = vec![Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 0.0, 0.0)];
        assert!(matches!(
            DelaunayTriangulator::default().triangulate(&two, &[]),
            Err(ProfileError::Triangulation(_))
        ));
        let line = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(2.0, 0.0, 0.0),
        ];
        assert!(DelaunayTriangulator::default().triangulate(&line, &[]).is_err());
    }

    #[test]
    fn max_area_refines_large_triangles() {
        let mesh = DelaunayTriangulator::new(Some(10.0))
            .triangulate(&flat_square(1.0), &[])
            .unwrap();
        assert!(mesh.vertices.len() > 4);
        for i in 0..mesh.triangles.len() {
            assert!(mesh.triangle_area(i) <= 10.0 + 1e-9);
        }
        assert!(mesh.vertices.iter().all(|v| (v.z - 1.0).abs() < 1e-9));
        let total: f64 = (0..mesh.triangles.len()).map(|i| mesh.triangle_area(i)).sum();
        assert!((total - 100.0).abs() < 1e-6);
    }

    #[test]
    fn dangling_triangle_is_rejected() {
        let mesh = TerrainMesh {
            vertices: vec![Point3::new(0.0, 0.0, 0.0)],
            triangles: vec![[0, 1, 2]],
        };
        assert!(mesh.validate().is_err());
    }
}
