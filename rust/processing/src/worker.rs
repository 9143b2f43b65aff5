// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Per-building unit of work.

use crate::config::AnalysisConfig;
use crate::logging::RunLog;
use crate::record::{BuildingOutcome, BuildingRecord, SurfaceResult};
use building_metrics_geometry::{analyze_surfaces, repair_and_measure, GeometryPayload, RepairOutcome};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

/// Geometry results of one building, before they are attached to its
/// attributes
#[derive(Debug, Clone, PartialEq)]
pub struct GeometryAnalysis {
    pub mesh: RepairOutcome,
    pub surfaces: Option<SurfaceResult>,
}

/// Repair and measure the mesh, then classify its surfaces when a volume
/// came out. A mesh that could not even be built is an error.
pub fn analyze_geometry(
    geometry: &GeometryPayload,
    config: &AnalysisConfig,
) -> std::result::Result<GeometryAnalysis, String> {
    let mesh = repair_and_measure(&geometry.vertices, &geometry.triangles, &config.repair);
    if let Some(error) = &mesh.error {
        return Err(error.clone());
    }

    let surfaces = mesh.volume.map(|_| {
        analyze_surfaces(&geometry.vertices, &geometry.triangles, &config.surface)
            .map_err(|e| e.to_string())
    });
    Ok(GeometryAnalysis { mesh, surfaces })
}

/// Process one building. Never panics and never fails: every problem ends
/// up in the returned outcome. The geometry is dropped before returning.
pub fn process_building(
    record: BuildingRecord,
    config: &AnalysisConfig,
    log: &dyn RunLog,
) -> BuildingOutcome {
    process_building_with(record, log, |geometry| analyze_geometry(geometry, config))
}

/// `process_building` with the geometry step supplied by the caller
pub(crate) fn process_building_with<F>(
    record: BuildingRecord,
    log: &dyn RunLog,
    analyze: F,
) -> BuildingOutcome
where
    F: FnOnce(&GeometryPayload) -> std::result::Result<GeometryAnalysis, String>,
{
    let BuildingRecord {
        properties,
        geometry,
        geometry_type,
    } = record;

    if geometry.vertices.is_empty() || geometry.triangles.is_empty() {
        log.debug(&format!(
            "No usable geometry (type {})",
            geometry_type.as_deref().unwrap_or("none")
        ));
        return BuildingOutcome::Failure {
            properties,
            error: "No geometry data".to_string(),
            mesh_error: Some(format!(
                "Empty vertices ({}) or faces ({})",
                geometry.vertices.len(),
                geometry.triangles.len()
            )),
        };
    }

    let result = panic::catch_unwind(AssertUnwindSafe(|| analyze(&geometry)));
    drop(geometry);

    match result {
        Ok(Ok(GeometryAnalysis { mesh, surfaces })) => {
            if let Some(Err(error)) = &surfaces {
                log.debug(&format!("Surface analysis error: {error}"));
            }
            BuildingOutcome::Success {
                properties,
                mesh,
                surfaces,
            }
        }
        Ok(Err(error)) => {
            log.debug(&format!("Mesh processing error: {error}"));
            BuildingOutcome::Failure {
                properties,
                mesh_error: Some(error.clone()),
                error,
            }
        }
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            log.error(&format!("Building processing panicked: {message}"));
            BuildingOutcome::Failure {
                properties,
                mesh_error: Some(message.clone()),
                error: message,
            }
        }
    }
}

/// Text of a panic payload
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "worker panicked".to_string()
    }
}
