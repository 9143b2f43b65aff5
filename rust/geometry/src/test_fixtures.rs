// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Shared meshes for unit tests

use crate::Mesh;

/// Corner coordinates of an axis-aligned box with its base at `z0`
pub(crate) fn box_vertices(length: f64, width: f64, height: f64, z0: f64) -> Vec<[f64; 3]> {
    vec![
        [0.0, 0.0, z0],
        [length, 0.0, z0],
        [length, width, z0],
        [0.0, width, z0],
        [0.0, 0.0, z0 + height],
        [length, 0.0, z0 + height],
        [length, width, z0 + height],
        [0.0, width, z0 + height],
    ]
}

/// Outward-wound triangles of a box built from `box_vertices`
pub(crate) const BOX_TRIANGLES: [[u32; 3]; 12] = [
    [0, 2, 1],
    [0, 3, 2],
    [4, 5, 6],
    [4, 6, 7],
    [0, 1, 5],
    [0, 5, 4],
    [1, 2, 6],
    [1, 6, 5],
    [2, 3, 7],
    [2, 7, 6],
    [3, 0, 4],
    [3, 4, 7],
];

pub(crate) fn box_mesh(length: f64, width: f64, height: f64) -> Mesh {
    Mesh::from_arrays(&box_vertices(length, width, height, 0.0), &BOX_TRIANGLES).unwrap()
}

pub(crate) fn unit_cube() -> Mesh {
    box_mesh(1.0, 1.0, 1.0)
}

/// Unit cube with the two roof triangles removed
pub(crate) fn open_top_cube() -> Mesh {
    let mut mesh = unit_cube();
    mesh.triangles.retain(|t| *t != [4, 5, 6] && *t != [4, 6, 7]);
    mesh
}
