// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Hole detection and filling.
//!
//! A hole is a closed loop of boundary edges (edges used by one face only).
//! Loops are traced against the winding of the faces bordering them, so a
//! fan over the loop comes out wound consistently with its surroundings.

use crate::topology::{directed_edges, EdgeTopology};
use crate::triangulation::fan_triangulate;
use crate::Mesh;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

/// Ordered vertex indices of one open boundary loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundaryLoop {
    pub vertices: Vec<u32>,
}

impl BoundaryLoop {
    /// Number of edges (and vertices) in the loop
    pub fn edge_count(&self) -> usize {
        self.vertices.len()
    }
}

/// Trace all closed boundary loops.
///
/// Each boundary edge `a -> b` of a face contributes the step `b -> a` to a
/// loop. Chains that do not close (non-manifold junctions, dangling edges)
/// are dropped.
pub fn detect_holes(mesh: &Mesh) -> Vec<BoundaryLoop> {
    let topology = EdgeTopology::build(&mesh.triangles);
    let mut next: FxHashMap<u32, SmallVec<[u32; 2]>> = FxHashMap::default();
    let mut boundary_edges = 0usize;

    for tri in &mesh.triangles {
        for (a, b) in directed_edges(tri) {
            if a != b && topology.faces_for_edge(a, b).len() == 1 {
                next.entry(b).or_default().push(a);
                boundary_edges += 1;
            }
        }
    }

    let mut starts: Vec<u32> = next.keys().copied().collect();
    starts.sort_unstable();

    let mut loops = Vec::new();
    for start in starts {
        while next.get(&start).is_some_and(|n| !n.is_empty()) {
            let mut chain = vec![start];
            let mut current = start;
            let mut closed = false;

            for _ in 0..boundary_edges {
                let Some(step) = next.get_mut(&current).and_then(|n| n.pop()) else {
                    break;
                };
                if step == start {
                    closed = true;
                    break;
                }
                chain.push(step);
                current = step;
            }

            if closed && chain.len() >= 3 {
                loops.push(BoundaryLoop { vertices: chain });
            }
        }
    }

    loops
}

/// Close every detected hole with a triangle fan. Returns the number of
/// holes filled.
pub fn fill_holes(mesh: &mut Mesh) -> usize {
    let holes = detect_holes(mesh);
    for hole in &holes {
        let count = hole.vertices.len() as u32;
        for [a, b, c] in fan_triangulate(0, count) {
            mesh.triangles.push([
                hole.vertices[a as usize],
                hole.vertices[b as usize],
                hole.vertices[c as usize],
            ]);
        }
    }
    holes.len()
}
