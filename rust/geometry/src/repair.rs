// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Mesh repair toward watertightness, and volume measurement.
//!
//! The repair runs as a fixed sequence that stops at the first check
//! where the mesh is closed:
//!
//! 1. construct and merge coincident vertices
//! 2. already closed? measure and stop
//! 3. merge near vertices, drop degenerate faces, fix normals, check
//! 4. fill holes, clean up, check
//! 5. still open: best-effort volume, flagged `is_watertight = false`

use crate::holes::fill_holes;
use crate::topology::EdgeTopology;
use crate::winding::fix_normals;
use crate::{Error, Mesh};
use std::fmt;

/// A closed mesh with `|volume| <= FLAT_VOLUME_RATIO * area^1.5` is
/// treated as enclosing nothing (a sheet closed against itself).
const FLAT_VOLUME_RATIO: f64 = 1e-9;

/// Tunable constants of the repair sequence.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RepairParams {
    /// Decimal digits kept when merging near-coincident vertices
    pub merge_digits: u32,
    /// Faces whose smallest height falls below this are degenerate
    pub degenerate_height: f64,
}

impl Default for RepairParams {
    fn default() -> Self {
        Self {
            merge_digits: 5,
            degenerate_height: 1e-8,
        }
    }
}

/// One entry of the repair trace.
#[derive(Debug, Clone, PartialEq)]
pub enum RepairStep {
    AlreadyWatertight,
    AlreadyWatertightInsideOut,
    MergedVertices(usize),
    RemovedDegenerate(usize),
    FixedNormals,
    WatertightAfterBasic,
    FilledHoles(usize),
    RemovedUnreferenced(usize),
    WatertightAfterFull,
    ClosedWithoutVolume,
    InsideOut,
    StillOpen,
    VolumeDespiteOpen(f64),
    VolumeUnavailable,
    Failed(String),
}

impl fmt::Display for RepairStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyWatertight => f.write_str("Already watertight - no repair needed"),
            Self::AlreadyWatertightInsideOut => {
                f.write_str("Already watertight - fixed inside-out orientation")
            }
            Self::MergedVertices(n) => write!(f, "Merged {n} duplicate vertices"),
            Self::RemovedDegenerate(n) => write!(f, "Removed {n} degenerate faces"),
            Self::FixedNormals => f.write_str("Fixed normals"),
            Self::WatertightAfterBasic => f.write_str("Watertight after basic repairs"),
            Self::FilledHoles(n) => write!(f, "Filled {n} holes"),
            Self::RemovedUnreferenced(n) => write!(f, "Removed {n} unreferenced vertices"),
            Self::WatertightAfterFull => f.write_str("Watertight after full repair"),
            Self::ClosedWithoutVolume => {
                f.write_str("Closed surface encloses no volume - input was likely an open sheet")
            }
            Self::InsideOut => f.write_str("Mesh is inside-out, taking absolute value"),
            Self::StillOpen => f.write_str("Still not watertight after repair"),
            Self::VolumeDespiteOpen(v) => {
                write!(f, "Calculated volume despite non-watertight: {v:.2} m³")
            }
            Self::VolumeUnavailable => f.write_str("Volume could not be calculated"),
            Self::Failed(message) => write!(f, "Repair error: {message}"),
        }
    }
}

/// Result of repairing and measuring one building mesh.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RepairOutcome {
    /// Enclosed volume, never negative
    pub volume: Option<f64>,
    /// `None` when the mesh could not be built
    pub is_watertight: Option<bool>,
    pub orientation_fixed: bool,
    pub repair_applied: bool,
    pub trace: Vec<RepairStep>,
    pub error: Option<String>,
    /// Counts after construction (coincident vertices merged)
    pub vertex_count: Option<usize>,
    pub face_count: Option<usize>,
}

impl RepairOutcome {
    fn failed(error: &Error) -> Self {
        let message = error.to_string();
        Self {
            trace: vec![RepairStep::Failed(message.clone())],
            error: Some(message),
            ..Self::default()
        }
    }

    /// Trace rendered as one line, steps separated by `" | "`
    pub fn trace_text(&self) -> Option<String> {
        if self.trace.is_empty() {
            return None;
        }
        Some(
            self.trace
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(" | "),
        )
    }

    /// Record a volume, folding a negative sign into `orientation_fixed`
    fn set_volume(&mut self, signed: f64) {
        if signed < 0.0 {
            self.orientation_fixed = true;
            if self.repair_applied {
                self.trace.push(RepairStep::InsideOut);
            }
        }
        self.volume = Some(signed.abs());
    }

    /// Measure a mesh the repair closed, flagging closures with no interior
    fn set_repaired_volume(&mut self, mesh: &Mesh) {
        let signed = mesh.signed_volume();
        self.set_volume(signed);
        if signed.abs() <= FLAT_VOLUME_RATIO * mesh.area().powf(1.5) {
            self.trace.push(RepairStep::ClosedWithoutVolume);
        }
    }
}

/// Build a mesh from raw lists, then repair and measure it.
///
/// Never fails: construction problems are reported through
/// `RepairOutcome::error` with no volume.
pub fn repair_and_measure(
    vertices: &[[f64; 3]],
    triangles: &[[u32; 3]],
    params: &RepairParams,
) -> RepairOutcome {
    if vertices.is_empty() || triangles.is_empty() {
        return RepairOutcome::failed(&Error::EmptyMesh(
            "No vertices or faces provided".to_string(),
        ));
    }

    let mut mesh = match Mesh::from_arrays(vertices, triangles) {
        Ok(mesh) => mesh,
        Err(e) => return RepairOutcome::failed(&e),
    };
    mesh.merge_coincident_vertices();

    repair_mesh(&mut mesh, params)
}

/// Run the repair sequence on an already constructed mesh.
///
/// A mesh that is closed and consistently wound on entry is measured and
/// left untouched.
pub fn repair_mesh(mesh: &mut Mesh, params: &RepairParams) -> RepairOutcome {
    let mut outcome = RepairOutcome {
        vertex_count: Some(mesh.vertex_count()),
        face_count: Some(mesh.triangle_count()),
        ..RepairOutcome::default()
    };

    if EdgeTopology::build(&mesh.triangles).is_closed_and_consistent() {
        outcome.is_watertight = Some(true);
        outcome.set_volume(mesh.signed_volume());
        outcome.trace.push(if outcome.orientation_fixed {
            RepairStep::AlreadyWatertightInsideOut
        } else {
            RepairStep::AlreadyWatertight
        });
        return outcome;
    }

    outcome.repair_applied = true;

    let merged = mesh.merge_vertices_rounded(params.merge_digits);
    if merged > 0 {
        outcome.trace.push(RepairStep::MergedVertices(merged));
    }

    let removed = remove_degenerate_triangles(mesh, params.degenerate_height);
    if removed > 0 {
        outcome.trace.push(RepairStep::RemovedDegenerate(removed));
    }

    fix_normals(mesh);
    outcome.trace.push(RepairStep::FixedNormals);

    if EdgeTopology::build(&mesh.triangles).is_closed_and_consistent() {
        outcome.is_watertight = Some(true);
        outcome.trace.push(RepairStep::WatertightAfterBasic);
        outcome.set_repaired_volume(mesh);
        return outcome;
    }

    let filled = fill_holes(mesh);
    outcome.trace.push(RepairStep::FilledHoles(filled));

    let removed = remove_degenerate_triangles(mesh, params.degenerate_height);
    if removed > 0 {
        outcome.trace.push(RepairStep::RemovedDegenerate(removed));
    }
    let unreferenced = remove_unreferenced_vertices(mesh);
    if unreferenced > 0 {
        outcome.trace.push(RepairStep::RemovedUnreferenced(unreferenced));
    }

    if EdgeTopology::build(&mesh.triangles).is_closed_and_consistent() {
        outcome.is_watertight = Some(true);
        outcome.trace.push(RepairStep::WatertightAfterFull);
        outcome.set_repaired_volume(mesh);
        return outcome;
    }

    outcome.is_watertight = Some(false);
    outcome.trace.push(RepairStep::StillOpen);

    let volume = mesh.signed_volume();
    if mesh.is_empty() || !volume.is_finite() {
        outcome.trace.push(RepairStep::VolumeUnavailable);
        return outcome;
    }
    outcome.set_volume(volume);
    outcome
        .trace
        .push(RepairStep::VolumeDespiteOpen(volume.abs()));
    outcome
}

/// Remove faces with repeated corners or a smallest height below
/// `min_height` (zero-area and collinear faces). Returns the number
/// removed.
pub fn remove_degenerate_triangles(mesh: &mut Mesh, min_height: f64) -> usize {
    let before = mesh.triangles.len();
    let vertices = &mesh.vertices;
    mesh.triangles.retain(|&[a, b, c]| {
        if a == b || b == c || a == c {
            return false;
        }
        let p0 = vertices[a as usize];
        let p1 = vertices[b as usize];
        let p2 = vertices[c as usize];
        let longest = (p1 - p0)
            .norm()
            .max((p2 - p1).norm())
            .max((p0 - p2).norm());
        if longest <= 0.0 {
            return false;
        }
        let height = (p1 - p0).cross(&(p2 - p0)).norm() / longest;
        height >= min_height
    });
    before - mesh.triangles.len()
}

/// Drop vertices no face refers to and compact indices. Returns the
/// number removed.
pub fn remove_unreferenced_vertices(mesh: &mut Mesh) -> usize {
    let mut used = vec![false; mesh.vertices.len()];
    for tri in &mesh.triangles {
        for &i in tri {
            used[i as usize] = true;
        }
    }

    let before = mesh.vertices.len();
    let mut remap = vec![0u32; before];
    let mut kept = Vec::with_capacity(before);
    for (old, p) in mesh.vertices.iter().enumerate() {
        if used[old] {
            remap[old] = kept.len() as u32;
            kept.push(*p);
        }
    }
    if kept.len() == before {
        return 0;
    }

    for tri in &mut mesh.triangles {
        for i in tri.iter_mut() {
            *i = remap[*i as usize];
        }
    }
    mesh.vertices = kept;
    before - mesh.vertices.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::{box_mesh, box_vertices, open_top_cube, unit_cube, BOX_TRIANGLES};
    use approx::assert_relative_eq;

    #[test]
    fn test_closed_box_short_circuits() {
        let outcome = repair_and_measure(
            &box_vertices(4.0, 3.0, 2.0, 0.0),
            &BOX_TRIANGLES,
            &RepairParams::default(),
        );
        assert_eq!(outcome.is_watertight, Some(true));
        assert!(!outcome.repair_applied);
        assert!(!outcome.orientation_fixed);
        assert_relative_eq!(outcome.volume.unwrap(), 24.0, epsilon = 1e-9);
        assert_eq!(
            outcome.trace_text().as_deref(),
            Some("Already watertight - no repair needed")
        );
        assert_eq!(outcome.vertex_count, Some(8));
        assert_eq!(outcome.face_count, Some(12));
    }

    #[test]
    fn test_watertight_mesh_left_untouched() {
        let mut mesh = box_mesh(2.0, 2.0, 2.0);
        let before = mesh.clone();
        repair_mesh(&mut mesh, &RepairParams::default());
        assert_eq!(mesh, before);
    }

    #[test]
    fn test_inside_out_box_reports_orientation() {
        let flipped: Vec<[u32; 3]> = BOX_TRIANGLES.iter().map(|t| [t[0], t[2], t[1]]).collect();
        let outcome = repair_and_measure(
            &box_vertices(1.0, 1.0, 1.0, 0.0),
            &flipped,
            &RepairParams::default(),
        );
        assert!(outcome.orientation_fixed);
        assert!(!outcome.repair_applied);
        assert_relative_eq!(outcome.volume.unwrap(), 1.0, epsilon = 1e-12);
        assert_eq!(outcome.trace, vec![RepairStep::AlreadyWatertightInsideOut]);
    }

    #[test]
    fn test_duplicated_ring_vertices_are_merged_on_construction() {
        // Every face carries its own copy of its corners, as parsed rings do
        let mesh = unit_cube();
        let mut vertices = Vec::new();
        let mut triangles = Vec::new();
        for t in 0..mesh.triangle_count() {
            let base = vertices.len() as u32;
            for p in mesh.triangle_points(t) {
                vertices.push([p.x, p.y, p.z]);
            }
            triangles.push([base, base + 1, base + 2]);
        }
        let outcome = repair_and_measure(&vertices, &triangles, &RepairParams::default());
        assert_eq!(outcome.is_watertight, Some(true));
        assert!(!outcome.repair_applied);
        assert_eq!(outcome.vertex_count, Some(8));
        assert_relative_eq!(outcome.volume.unwrap(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_near_vertices_merged_by_basic_repair() {
        let mut vertices = box_vertices(1.0, 1.0, 1.0, 0.0);
        // A ninth vertex a hair away from corner 6, used by one roof triangle
        vertices.push([1.000_000_1, 1.0, 1.0]);
        let mut triangles = BOX_TRIANGLES.to_vec();
        triangles[2] = [4, 5, 8];

        let outcome = repair_and_measure(&vertices, &triangles, &RepairParams::default());
        assert!(outcome.repair_applied);
        assert_eq!(outcome.is_watertight, Some(true));
        assert!(outcome.trace.contains(&RepairStep::MergedVertices(1)));
        assert!(outcome.trace.contains(&RepairStep::WatertightAfterBasic));
        assert_relative_eq!(outcome.volume.unwrap(), 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_open_box_filled() {
        let mut mesh = open_top_cube();
        let outcome = repair_mesh(&mut mesh, &RepairParams::default());
        assert!(outcome.repair_applied);
        assert_eq!(outcome.is_watertight, Some(true));
        assert!(outcome.trace.contains(&RepairStep::FilledHoles(1)));
        assert_eq!(outcome.trace.last(), Some(&RepairStep::WatertightAfterFull));
        assert_relative_eq!(outcome.volume.unwrap(), 1.0, epsilon = 1e-12);
        assert!(!outcome.trace.contains(&RepairStep::ClosedWithoutVolume));
    }

    #[test]
    fn test_sheet_closed_against_itself_is_flagged() {
        // A lone footprint triangle: filling its rim adds the mirrored face
        let outcome = repair_and_measure(
            &[
                [2_600_000.0, 1_200_000.0, 400.0],
                [2_600_010.0, 1_200_000.0, 400.0],
                [2_600_000.0, 1_200_010.0, 400.0],
            ],
            &[[0, 1, 2]],
            &RepairParams::default(),
        );
        assert_eq!(outcome.is_watertight, Some(true));
        assert!(outcome.trace.contains(&RepairStep::WatertightAfterFull));
        assert_eq!(outcome.trace.last(), Some(&RepairStep::ClosedWithoutVolume));
        assert!(outcome.volume.unwrap() < 1e-6);
        assert!(outcome
            .trace_text()
            .unwrap()
            .ends_with("Closed surface encloses no volume - input was likely an open sheet"));
    }

    #[test]
    fn test_unfillable_mesh_gets_best_effort_volume() {
        // Two triangles meeting at one edge and a third dangling off it:
        // the shared edge is non-manifold so no loop ever closes
        let mut mesh = Mesh::from_arrays(
            &[
                [0.0, 0.0, 0.0],
                [1.0, 0.0, 0.0],
                [0.0, 1.0, 0.0],
                [0.0, -1.0, 0.0],
                [0.0, 0.0, 1.0],
            ],
            &[[0, 1, 2], [1, 0, 3], [0, 1, 4]],
        )
        .unwrap();
        let outcome = repair_mesh(&mut mesh, &RepairParams::default());
        assert_eq!(outcome.is_watertight, Some(false));
        assert!(outcome.trace.contains(&RepairStep::StillOpen));
        let volume = outcome.volume.expect("best-effort volume");
        assert!(volume >= 0.0);
    }

    #[test]
    fn test_empty_input_is_error() {
        let outcome = repair_and_measure(&[], &[], &RepairParams::default());
        assert_eq!(outcome.volume, None);
        assert_eq!(outcome.is_watertight, None);
        assert_eq!(
            outcome.error.as_deref(),
            Some("Empty mesh: No vertices or faces provided")
        );
    }

    #[test]
    fn test_bad_index_is_error_not_panic() {
        let outcome = repair_and_measure(
            &[[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
            &[[0, 1, 9]],
            &RepairParams::default(),
        );
        assert!(outcome.error.is_some());
        assert_eq!(outcome.volume, None);
        assert!(outcome.trace_text().unwrap().starts_with("Repair error:"));
    }

    #[test]
    fn test_remove_degenerate() {
        let mut mesh = Mesh::from_arrays(
            &[
                [0.0, 0.0, 0.0],
                [1.0, 0.0, 0.0],
                [2.0, 0.0, 0.0],
                [0.0, 1.0, 0.0],
            ],
            &[[0, 1, 2], [0, 0, 3], [0, 1, 3]],
        )
        .unwrap();
        assert_eq!(remove_degenerate_triangles(&mut mesh, 1e-8), 2);
        assert_eq!(mesh.triangles, vec![[0, 1, 3]]);
    }

    #[test]
    fn test_remove_unreferenced() {
        let mut mesh = Mesh::from_arrays(
            &[
                [9.0, 9.0, 9.0],
                [0.0, 0.0, 0.0],
                [1.0, 0.0, 0.0],
                [0.0, 1.0, 0.0],
            ],
            &[[1, 2, 3]],
        )
        .unwrap();
        assert_eq!(remove_unreferenced_vertices(&mut mesh), 1);
        assert_eq!(mesh.triangles, vec![[0, 1, 2]]);
        assert_eq!(mesh.vertex_count(), 3);
    }

    #[test]
    fn test_trace_text_joins_steps() {
        let outcome = RepairOutcome {
            trace: vec![
                RepairStep::MergedVertices(3),
                RepairStep::FixedNormals,
                RepairStep::VolumeDespiteOpen(12.345),
            ],
            ..RepairOutcome::default()
        };
        assert_eq!(
            outcome.trace_text().unwrap(),
            "Merged 3 duplicate vertices | Fixed normals | Calculated volume despite non-watertight: 12.35 m³"
        );
    }
}
