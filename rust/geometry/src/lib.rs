// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Building Metrics Geometry
//!
//! Turns multipatch building solids into indexed triangle meshes, repairs
//! them toward watertightness to measure enclosed volume, and splits their
//! surface area into footprint, roof, wall and sloped categories.

pub mod error;
pub mod holes;
pub mod mesh;
pub mod parser;
pub mod repair;
pub mod surface;
pub mod topology;
pub mod triangulation;
pub mod winding;

#[cfg(test)]
mod test_fixtures;

// Re-export nalgebra types for convenience
pub use nalgebra::{Point3, Vector3};

pub use error::{Error, Result};
pub use mesh::Mesh;
pub use parser::{parse_geometry, GeometryPayload};
pub use repair::{repair_and_measure, repair_mesh, RepairOutcome, RepairParams, RepairStep};
pub use surface::{analyze_surfaces, Orientation, SurfaceAnalysis, SurfaceParams};
pub use topology::EdgeTopology;
pub use triangulation::fan_triangulate;
