// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Winding order correction.

use crate::topology::{directed_edges, has_directed_edge, EdgeTopology};
use crate::Mesh;
use std::collections::VecDeque;

const UNVISITED: usize = usize::MAX;

/// What `fix_normals` changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WindingFix {
    /// Faces flipped to agree with their neighbours
    pub flipped_faces: usize,
    /// Components turned inside out to face outward
    pub inverted_components: usize,
    /// Edge-connected components found
    pub components: usize,
}

/// Make winding consistent across each edge-connected component, then
/// orient every component so its signed volume is positive (normals point
/// outward).
///
/// Propagation only crosses manifold edges (exactly two faces).
pub fn fix_normals(mesh: &mut Mesh) -> WindingFix {
    let face_count = mesh.triangle_count();
    let topology = EdgeTopology::build(&mesh.triangles);
    let mut component = vec![UNVISITED; face_count];
    let mut fix = WindingFix::default();
    let mut queue = VecDeque::new();

    for seed in 0..face_count {
        if component[seed] != UNVISITED {
            continue;
        }
        let id = fix.components;
        component[seed] = id;
        queue.push_back(seed);

        while let Some(face) = queue.pop_front() {
            let tri = mesh.triangles[face];
            for (a, b) in directed_edges(&tri) {
                let neighbours = topology.faces_for_edge(a, b);
                if neighbours.len() != 2 {
                    continue;
                }
                for &other in neighbours {
                    if other == face || component[other] != UNVISITED {
                        continue;
                    }
                    // A consistent neighbour walks the shared edge as b -> a
                    if has_directed_edge(&mesh.triangles[other], a, b) {
                        mesh.flip_triangle(other);
                        fix.flipped_faces += 1;
                    }
                    component[other] = id;
                    queue.push_back(other);
                }
            }
        }
        fix.components += 1;
    }

    let anchor = mesh.centroid();
    let mut volumes = vec![0.0f64; fix.components];
    for (face, &[a, b, c]) in mesh.triangles.iter().enumerate() {
        let p0 = mesh.vertices[a as usize] - anchor;
        let p1 = mesh.vertices[b as usize] - anchor;
        let p2 = mesh.vertices[c as usize] - anchor;
        volumes[component[face]] += p0.dot(&p1.cross(&p2));
    }

    for (id, volume) in volumes.iter().enumerate() {
        if *volume < 0.0 {
            fix.inverted_components += 1;
            for face in 0..face_count {
                if component[face] == id {
                    mesh.flip_triangle(face);
                }
            }
        }
    }

    fix
}
