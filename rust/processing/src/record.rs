// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Building records going into the workers and rows coming out.

use crate::source::RawFeature;
use building_metrics_geometry::{parse_geometry, GeometryPayload, RepairOutcome, SurfaceAnalysis};
use serde_json::{Map, Value};

/// Source attributes in source order
pub type Properties = Map<String, Value>;

/// One output row: source attributes followed by `DERIVED_COLUMNS`
pub type Row = Map<String, Value>;

/// Surface analysis, or why it could not be computed
pub type SurfaceResult = std::result::Result<SurfaceAnalysis, String>;

/// Columns appended to every row, in output order.
pub const DERIVED_COLUMNS: [&str; 24] = [
    "mesh_volume",
    "mesh_is_watertight",
    "mesh_vertex_count",
    "mesh_face_count",
    "mesh_repair_applied",
    "mesh_repair_steps",
    "mesh_process_error",
    "mesh_orientation_fixed",
    "surf_roof_area",
    "surf_footprint_area",
    "surf_wall_area",
    "surf_sloped_area",
    "surf_total_area",
    "surf_building_height",
    "surf_wall_perimeter",
    "surf_roof_complexity",
    "surf_min_elevation",
    "surf_max_elevation",
    "surf_horizontal_faces",
    "surf_vertical_faces",
    "surf_sloped_faces",
    "surf_analysis_error",
    "processing_status",
    "processing_error",
];

pub const STATUS_SUCCESS: &str = "success";
pub const STATUS_FAILED: &str = "failed";

/// One building as read from the source, geometry already parsed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BuildingRecord {
    pub properties: Properties,
    pub geometry: GeometryPayload,
    /// `type` tag of the source geometry, if it had one
    pub geometry_type: Option<String>,
}

impl BuildingRecord {
    pub fn from_feature(feature: RawFeature) -> Self {
        let RawFeature {
            properties,
            geometry,
        } = feature;
        Self {
            properties,
            geometry_type: geometry
                .get("type")
                .and_then(Value::as_str)
                .map(str::to_string),
            geometry: parse_geometry(&geometry),
        }
    }
}

/// Result of processing one building. Exactly one per input building.
#[derive(Debug, Clone, PartialEq)]
pub enum BuildingOutcome {
    Success {
        properties: Properties,
        mesh: RepairOutcome,
        /// `None` when no volume was computed and the classifier was skipped
        surfaces: Option<SurfaceResult>,
    },
    Failure {
        properties: Properties,
        error: String,
        mesh_error: Option<String>,
    },
}

impl BuildingOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    pub fn properties(&self) -> &Properties {
        match self {
            Self::Success { properties, .. } | Self::Failure { properties, .. } => properties,
        }
    }

    /// Flatten into an output row carrying every derived column.
    ///
    /// A source attribute sharing a derived column's name is replaced by
    /// the derived value.
    pub fn into_row(self) -> Row {
        let mut derived = Derived::default();
        let properties = match self {
            Self::Success {
                properties,
                mesh,
                surfaces,
            } => {
                derived.mesh(&mesh);
                match surfaces {
                    Some(Ok(analysis)) => derived.surfaces(&analysis),
                    Some(Err(error)) => derived.set("surf_analysis_error", error),
                    None => {}
                }
                derived.set("processing_status", STATUS_SUCCESS);
                properties
            }
            Self::Failure {
                properties,
                error,
                mesh_error,
            } => {
                derived.set("mesh_process_error", mesh_error);
                derived.set("processing_status", STATUS_FAILED);
                derived.set("processing_error", error);
                properties
            }
        };

        let mut row = Row::new();
        for (key, value) in properties {
            if !DERIVED_COLUMNS.contains(&key.as_str()) {
                row.insert(key, value);
            }
        }
        for (column, value) in DERIVED_COLUMNS.iter().zip(derived.values) {
            row.insert((*column).to_string(), value);
        }
        row
    }
}

/// Derived column values under construction, all null to start with
struct Derived {
    values: Vec<Value>,
}

impl Default for Derived {
    fn default() -> Self {
        Self {
            values: vec![Value::Null; DERIVED_COLUMNS.len()],
        }
    }
}

impl Derived {
    fn set(&mut self, column: &str, value: impl Into<Value>) {
        if let Some(i) = DERIVED_COLUMNS.iter().position(|c| *c == column) {
            self.values[i] = value.into();
        }
    }

    fn mesh(&mut self, mesh: &RepairOutcome) {
        self.set("mesh_volume", mesh.volume);
        self.set("mesh_is_watertight", mesh.is_watertight);
        self.set("mesh_vertex_count", mesh.vertex_count.map(|n| n as u64));
        self.set("mesh_face_count", mesh.face_count.map(|n| n as u64));
        self.set("mesh_repair_applied", mesh.repair_applied);
        self.set("mesh_repair_steps", mesh.trace_text());
        self.set("mesh_process_error", mesh.error.clone());
        self.set("mesh_orientation_fixed", mesh.orientation_fixed);
    }

    fn surfaces(&mut self, analysis: &SurfaceAnalysis) {
        self.set("surf_roof_area", analysis.roof_area);
        self.set("surf_footprint_area", analysis.footprint_area);
        self.set("surf_wall_area", analysis.wall_area);
        self.set("surf_sloped_area", analysis.sloped_area);
        self.set("surf_total_area", analysis.total_area);
        self.set("surf_building_height", analysis.building_height);
        self.set("surf_wall_perimeter", analysis.wall_perimeter);
        self.set("surf_roof_complexity", analysis.roof_complexity);
        self.set("surf_min_elevation", analysis.min_elevation);
        self.set("surf_max_elevation", analysis.max_elevation);
        self.set("surf_horizontal_faces", analysis.horizontal_faces as u64);
        self.set("surf_vertical_faces", analysis.vertical_faces as u64);
        self.set("surf_sloped_faces", analysis.sloped_faces as u64);
    }
}
