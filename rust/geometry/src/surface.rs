// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Surface classification.
//!
//! Splits a building's surface area by face orientation: horizontal faces
//! near the lowest horizontal level are footprint, higher ones are roof,
//! near-vertical faces are wall and everything else is sloped.

use crate::{Error, Mesh, Result};

/// Orientation thresholds and footprint split constants.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceParams {
    /// Max normal tilt from vertical for a horizontal face, in degrees
    pub horizontal_tolerance_deg: f64,
    /// Max normal tilt from horizontal for a wall face, in degrees
    pub vertical_tolerance_deg: f64,
    /// Fraction of the horizontal elevation range counted as footprint
    pub footprint_fraction: f64,
    /// Below this elevation range the fixed offset applies instead
    pub min_elevation_range: f64,
    /// Footprint band above the lowest horizontal face for flat buildings
    pub flat_footprint_offset: f64,
}

impl Default for SurfaceParams {
    fn default() -> Self {
        Self {
            horizontal_tolerance_deg: 10.0,
            vertical_tolerance_deg: 10.0,
            footprint_fraction: 0.1,
            min_elevation_range: 0.01,
            flat_footprint_offset: 0.1,
        }
    }
}

impl SurfaceParams {
    #[inline]
    pub fn cos_tol(&self) -> f64 {
        self.horizontal_tolerance_deg.to_radians().cos()
    }

    #[inline]
    pub fn sin_tol(&self) -> f64 {
        self.vertical_tolerance_deg.to_radians().sin()
    }

    /// Classify a face by the z component of its unit normal
    pub fn classify(&self, normal_z: f64) -> Orientation {
        let abs_z = normal_z.abs();
        if abs_z > self.cos_tol() {
            if normal_z > 0.0 {
                Orientation::HorizontalUp
            } else {
                Orientation::HorizontalDown
            }
        } else if abs_z < self.sin_tol() {
            Orientation::Vertical
        } else {
            Orientation::Sloped
        }
    }

    /// Highest centroid elevation still counted as footprint, given the
    /// lowest and highest horizontal centroid elevations
    pub fn footprint_threshold(&self, min_z: f64, max_z: f64) -> f64 {
        let range = max_z - min_z;
        if range > self.min_elevation_range {
            min_z + self.footprint_fraction * range
        } else {
            min_z + self.flat_footprint_offset
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    HorizontalUp,
    HorizontalDown,
    Vertical,
    Sloped,
}

impl Orientation {
    pub fn is_horizontal(self) -> bool {
        matches!(self, Self::HorizontalUp | Self::HorizontalDown)
    }
}

/// Surface area decomposition of one building
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SurfaceAnalysis {
    pub roof_area: f64,
    pub footprint_area: f64,
    pub wall_area: f64,
    pub sloped_area: f64,
    pub total_area: f64,
    pub building_height: f64,
    /// Wall area over height; `None` for flat meshes
    pub wall_perimeter: Option<f64>,
    /// Sloped share of roof plus sloped area, 0 when both are zero
    pub roof_complexity: f64,
    pub min_elevation: f64,
    pub max_elevation: f64,
    pub horizontal_faces: usize,
    pub vertical_faces: usize,
    pub sloped_faces: usize,
}

/// Classify every face of a building and sum areas per category.
///
/// Zero-area faces have no defined normal and are left out of the counts;
/// they add nothing to any area.
pub fn analyze_surfaces(
    vertices: &[[f64; 3]],
    triangles: &[[u32; 3]],
    params: &SurfaceParams,
) -> Result<SurfaceAnalysis> {
    if vertices.is_empty() || triangles.is_empty() {
        return Err(Error::EmptyMesh("No vertices or faces provided".to_string()));
    }

    let mut mesh = Mesh::from_arrays(vertices, triangles)?;
    mesh.merge_coincident_vertices();

    let mut analysis = SurfaceAnalysis::default();
    // (centroid z, area) of horizontal faces, split once the z range is known
    let mut horizontal: Vec<(f64, f64)> = Vec::new();

    for t in 0..mesh.triangle_count() {
        let area = mesh.face_area(t);
        analysis.total_area += area;
        if area <= 0.0 {
            continue;
        }

        match params.classify(mesh.face_normal(t).z) {
            Orientation::HorizontalUp | Orientation::HorizontalDown => {
                horizontal.push((mesh.face_centroid(t).z, area));
            }
            Orientation::Vertical => {
                analysis.vertical_faces += 1;
                analysis.wall_area += area;
            }
            Orientation::Sloped => {
                analysis.sloped_faces += 1;
                analysis.sloped_area += area;
            }
        }
    }

    analysis.horizontal_faces = horizontal.len();
    if !horizontal.is_empty() {
        let (min_z, max_z) = horizontal
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &(z, _)| {
                (lo.min(z), hi.max(z))
            });
        let threshold = params.footprint_threshold(min_z, max_z);
        for (z, area) in horizontal {
            if z <= threshold {
                analysis.footprint_area += area;
            } else {
                analysis.roof_area += area;
            }
        }
    }

    if let Some((min_z, max_z)) = mesh.z_bounds() {
        analysis.min_elevation = min_z;
        analysis.max_elevation = max_z;
        analysis.building_height = max_z - min_z;
    }
    if analysis.building_height > 0.0 {
        analysis.wall_perimeter = Some(analysis.wall_area / analysis.building_height);
    }

    let roof_total = analysis.roof_area + analysis.sloped_area;
    if roof_total > 0.0 {
        analysis.roof_complexity = analysis.sloped_area / roof_total;
    }

    Ok(analysis)
}
