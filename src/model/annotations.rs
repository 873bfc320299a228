use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{Geometry, Point2};

/// Per-shape measurements and flags shown in the results tables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShapeAnnotations {
    pub area: Option<f64>,
    pub perimeter: Option<f64>,
    pub length: Option<f64>,
    pub centroid: Option<Point2>,
    #[serde(default)]
    pub read_only: bool,
    #[serde(default = "default_true")]
    pub deletable: bool,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub extras: BTreeMap<String, Value>,
}

fn default_true() -> bool {
    true
}

impl Default for ShapeAnnotations {
    fn default() -> Self {
        Self {
            area: None,
            perimeter: None,
            length: None,
            centroid: None,
            read_only: false,
            deletable: true,
            text: None,
            extras: BTreeMap::new(),
        }
    }
}

impl ShapeAnnotations {
    pub fn measured(geometry: &Geometry) -> Self {
        let mut annotations = Self::default();
        annotations.refresh_measurements(geometry);
        annotations
    }

    /// Recomputes the derived measurements, keeping flags and free text.
    pub fn refresh_measurements(&mut self, geometry: &Geometry) {
        self.area = geometry.area();
        self.perimeter = geometry.perimeter();
        self.length = geometry.length();
        self.centroid = geometry.centroid();
    }
}
