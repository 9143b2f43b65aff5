// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Edge adjacency for watertightness and winding checks.

use rustc_hash::FxHashMap;
use smallvec::SmallVec;

/// Faces using one undirected edge, and in which direction.
#[derive(Debug, Clone, Default)]
pub struct EdgeUse {
    /// Face indices touching the edge
    pub faces: SmallVec<[usize; 2]>,
    /// Uses traversing the edge from the lower to the higher vertex index
    pub forward: u32,
    /// Uses traversing the edge from the higher to the lower vertex index
    pub backward: u32,
}

/// Undirected edge map of a triangle list.
///
/// Keys are `(lo, hi)` vertex pairs with `lo <= hi`.
#[derive(Debug, Clone, Default)]
pub struct EdgeTopology {
    edges: FxHashMap<(u32, u32), EdgeUse>,
}

impl EdgeTopology {
    /// Build the edge map for a triangle list
    pub fn build(triangles: &[[u32; 3]]) -> Self {
        let mut edges: FxHashMap<(u32, u32), EdgeUse> =
            FxHashMap::with_capacity_and_hasher(triangles.len() * 3 / 2, Default::default());

        for (face, tri) in triangles.iter().enumerate() {
            for (a, b) in directed_edges(tri) {
                let entry = edges.entry(normalize_edge(a, b)).or_default();
                entry.faces.push(face);
                if a <= b {
                    entry.forward += 1;
                } else {
                    entry.backward += 1;
                }
            }
        }

        Self { edges }
    }

    /// Number of distinct undirected edges
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Faces touching an edge, in either direction
    pub fn faces_for_edge(&self, a: u32, b: u32) -> &[usize] {
        self.edges
            .get(&normalize_edge(a, b))
            .map(|e| e.faces.as_slice())
            .unwrap_or(&[])
    }

    /// Edges used by exactly one face
    pub fn boundary_edge_count(&self) -> usize {
        self.edges.values().filter(|e| e.faces.len() == 1).count()
    }

    /// Edges used by more than two faces
    pub fn non_manifold_edge_count(&self) -> usize {
        self.edges.values().filter(|e| e.faces.len() > 2).count()
    }

    /// Every edge is shared by exactly two faces.
    ///
    /// An empty mesh is not watertight.
    pub fn is_watertight(&self) -> bool {
        !self.edges.is_empty() && self.edges.values().all(|e| e.faces.len() == 2)
    }

    /// Every two-face edge is traversed once in each direction.
    pub fn is_winding_consistent(&self) -> bool {
        self.edges
            .values()
            .filter(|e| e.faces.len() == 2)
            .all(|e| e.forward == 1 && e.backward == 1)
    }

    /// Closed, and wound consistently enough for a signed volume to mean
    /// something.
    pub fn is_closed_and_consistent(&self) -> bool {
        self.is_watertight() && self.is_winding_consistent()
    }
}

/// Directed edges of a triangle in winding order
#[inline]
pub fn directed_edges(tri: &[u32; 3]) -> [(u32, u32); 3] {
    [(tri[0], tri[1]), (tri[1], tri[2]), (tri[2], tri[0])]
}

/// Whether a triangle traverses `a -> b` in its winding order
#[inline]
pub fn has_directed_edge(tri: &[u32; 3], a: u32, b: u32) -> bool {
    directed_edges(tri).contains(&(a, b))
}

#[inline]
fn normalize_edge(a: u32, b: u32) -> (u32, u32) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}
