// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Indexed triangle mesh

use crate::{Error, Result};
use nalgebra::{Point3, Vector3};
use rustc_hash::FxHashMap;
use std::hash::Hash;

/// Indexed triangle mesh in f64 precision.
///
/// Every index in `triangles` is a valid offset into `vertices`; the
/// constructors check this and every mutating operation preserves it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mesh {
    /// Vertex positions
    pub vertices: Vec<Point3<f64>>,
    /// Triangle vertex indices (i0, i1, i2)
    pub triangles: Vec<[u32; 3]>,
}

impl Mesh {
    /// Build a mesh, validating indices and coordinates.
    pub fn new(vertices: Vec<Point3<f64>>, triangles: Vec<[u32; 3]>) -> Result<Self> {
        if let Some(bad) = vertices
            .iter()
            .position(|p| !(p.x.is_finite() && p.y.is_finite() && p.z.is_finite()))
        {
            return Err(Error::NonFiniteVertex(bad));
        }

        let vertex_count = vertices.len();
        for (triangle, tri) in triangles.iter().enumerate() {
            if let Some(&index) = tri.iter().find(|&&i| i as usize >= vertex_count) {
                return Err(Error::InvalidIndex {
                    triangle,
                    index,
                    vertex_count,
                });
            }
        }

        Ok(Self {
            vertices,
            triangles,
        })
    }

    /// Build a mesh from plain coordinate arrays
    pub fn from_arrays(vertices: &[[f64; 3]], triangles: &[[u32; 3]]) -> Result<Self> {
        let points = vertices
            .iter()
            .map(|&[x, y, z]| Point3::new(x, y, z))
            .collect();
        Self::new(points, triangles.to_vec())
    }

    /// Get vertex count
    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Get triangle count
    #[inline]
    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    /// Check if mesh has no triangles
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    /// Merge vertices with bit-identical coordinates. Returns the number of
    /// vertices removed.
    pub fn merge_coincident_vertices(&mut self) -> usize {
        self.merge_by_key(|p| [exact_bits(p.x), exact_bits(p.y), exact_bits(p.z)])
    }

    /// Merge vertices whose coordinates agree after rounding to `digits`
    /// decimal places. Returns the number of vertices removed.
    pub fn merge_vertices_rounded(&mut self, digits: u32) -> usize {
        let scale = 10f64.powi(digits as i32);
        self.merge_by_key(|p| {
            [
                (p.x * scale).round() as i64,
                (p.y * scale).round() as i64,
                (p.z * scale).round() as i64,
            ]
        })
    }

    /// Collapse vertices sharing a key onto the first one seen and remap
    /// triangle indices accordingly.
    fn merge_by_key<K, F>(&mut self, key: F) -> usize
    where
        K: Hash + Eq,
        F: Fn(&Point3<f64>) -> K,
    {
        let before = self.vertices.len();
        let mut first_seen: FxHashMap<K, u32> = FxHashMap::default();
        let mut kept: Vec<Point3<f64>> = Vec::with_capacity(before);
        let mut remap: Vec<u32> = Vec::with_capacity(before);

        for p in &self.vertices {
            let next = kept.len() as u32;
            let index = *first_seen.entry(key(p)).or_insert_with(|| {
                kept.push(*p);
                next
            });
            remap.push(index);
        }

        if kept.len() == before {
            return 0;
        }

        for tri in &mut self.triangles {
            for i in tri.iter_mut() {
                *i = remap[*i as usize];
            }
        }
        self.vertices = kept;
        before - self.vertices.len()
    }

    /// Corner positions of a triangle
    #[inline]
    pub fn triangle_points(&self, triangle: usize) -> [Point3<f64>; 3] {
        let [a, b, c] = self.triangles[triangle];
        [
            self.vertices[a as usize],
            self.vertices[b as usize],
            self.vertices[c as usize],
        ]
    }

    /// Unnormalized face normal (e1 x e2), length equals twice the area
    #[inline]
    pub fn face_cross(&self, triangle: usize) -> Vector3<f64> {
        let [p0, p1, p2] = self.triangle_points(triangle);
        (p1 - p0).cross(&(p2 - p0))
    }

    /// Unit face normal following the winding order, zero for degenerate faces
    #[inline]
    pub fn face_normal(&self, triangle: usize) -> Vector3<f64> {
        let cross = self.face_cross(triangle);
        let len = cross.norm();
        if len > 0.0 {
            cross / len
        } else {
            Vector3::zeros()
        }
    }

    /// Triangle area
    #[inline]
    pub fn face_area(&self, triangle: usize) -> f64 {
        0.5 * self.face_cross(triangle).norm()
    }

    /// Triangle centroid
    #[inline]
    pub fn face_centroid(&self, triangle: usize) -> Point3<f64> {
        let [p0, p1, p2] = self.triangle_points(triangle);
        Point3::from((p0.coords + p1.coords + p2.coords) / 3.0)
    }

    /// Total surface area
    pub fn area(&self) -> f64 {
        (0..self.triangles.len()).map(|t| self.face_area(t)).sum()
    }

    /// Average of all vertex positions
    pub fn centroid(&self) -> Point3<f64> {
        if self.vertices.is_empty() {
            return Point3::origin();
        }
        let sum = self
            .vertices
            .iter()
            .fold(Vector3::zeros(), |acc, p| acc + p.coords);
        Point3::from(sum / self.vertices.len() as f64)
    }

    /// Signed enclosed volume as a sum of signed tetrahedra.
    ///
    /// Tetrahedra are anchored at the vertex centroid so georeferenced
    /// coordinates (LV95 puts buildings around 2.6e6 / 1.2e6 m) keep their
    /// precision. For a closed mesh the anchor does not change the result.
    /// Positive when faces wind counter-clockwise seen from outside.
    pub fn signed_volume(&self) -> f64 {
        let anchor = self.centroid();
        let sum: f64 = self
            .triangles
            .iter()
            .map(|&[a, b, c]| {
                let p0 = self.vertices[a as usize] - anchor;
                let p1 = self.vertices[b as usize] - anchor;
                let p2 = self.vertices[c as usize] - anchor;
                p0.dot(&p1.cross(&p2))
            })
            .sum();
        sum / 6.0
    }

    /// Lowest and highest vertex elevation
    pub fn z_bounds(&self) -> Option<(f64, f64)> {
        self.vertices.iter().fold(None, |acc, p| match acc {
            None => Some((p.z, p.z)),
            Some((lo, hi)) => Some((lo.min(p.z), hi.max(p.z))),
        })
    }

    /// Reverse the winding of one triangle
    #[inline]
    pub fn flip_triangle(&mut self, triangle: usize) {
        self.triangles[triangle].swap(1, 2);
    }
}

/// Bit pattern of a coordinate with -0.0 folded onto 0.0
#[inline]
fn exact_bits(v: f64) -> u64 {
    if v == 0.0 {
        0
    } else {
        v.to_bits()
    }
}
