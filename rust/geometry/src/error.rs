// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use thiserror::Error;

/// Result type for geometry operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while building a mesh from raw vertex/triangle lists
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("Empty mesh: {0}")]
    EmptyMesh(String),

    #[error("Triangle {triangle} references vertex {index} but only {vertex_count} vertices exist")]
    InvalidIndex {
        triangle: usize,
        index: u32,
        vertex_count: usize,
    },

    #[error("Vertex {0} has a non-finite coordinate")]
    NonFiniteVertex(usize),
}
