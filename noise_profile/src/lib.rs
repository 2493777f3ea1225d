//! Core library for acoustic cut profiles.
//!
//! A scene of buildings, terrain and ground effect regions is fed into a
//! [`SceneBuilder`], finished once into an immutable [`Scene`], then queried
//! with [`Scene::profile`] for the ordered features crossed by the line
//! between a source and a receiver.

pub mod config;
pub mod dtm;
pub mod error;
pub mod geometry;
pub mod index;
pub mod io;
pub mod profile;
pub mod scene;

pub use config::ProfileConfig;
pub use dtm::{DelaunayTriangulator, TerrainMesh, Triangulator};
pub use error::{ProfileError, Result};
pub use geometry::{Envelope, MultiPolygon, Point3, Polygon, Segment};
pub use profile::{CutPoint, CutPointKind, CutProfile};
pub use scene::{Building, GroundEffect, Scene, SceneBuilder, SourceGeometry, Wall, WallKind};
