//! Tunable parameters of the scene builder and the profile query engine.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileConfig {
    /// Longest sub-segment used when querying the spatial indexes.
    pub max_chord_length: f64,
    /// Upper bound on terrain triangle area, forwarded to the triangulator.
    pub max_triangle_area: Option<f64>,
    /// Number of doubling steps the terrain elevation fallback may take.
    pub elevation_search_steps: usize,
    /// Planar distance under which two terrain crossings are the same point.
    pub coincidence_tolerance: f64,
}

impl Default for ProfileConfig {
    fn default() -> Self {
        Self {
            max_chord_length: 15.0,
            max_triangle_area: None,
            elevation_search_steps: 32,
            coincidence_tolerance: 1e-9,
        }
    }
}

impl ProfileConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_chord_length(mut self, length: f64) -> Self {
        self.max_chord_length = length;
        self
    }

    pub fn max_triangle_area(mut self, area: Option<f64>) -> Self {
        self.max_triangle_area = area;
        self
    }

    pub fn elevation_search_steps(mut self, steps: usize) -> Self {
        self.elevation_search_steps = steps;
        self
    }

    pub fn coincidence_tolerance(mut self, tolerance: f64) -> Self {
        self.coincidence_tolerance = tolerance;
        self
    }

    /// Chord length actually used for splitting; non-positive or non-finite
    /// values fall back to the default.
    pub(crate) fn effective_chord_length(&self) -> f64 {
        if self.max_chord_length.is_finite() && self.max_chord_length > 0.0 {
            self.max_chord_length
        } else {
            Self::default().max_chord_length
        }
    }
}
