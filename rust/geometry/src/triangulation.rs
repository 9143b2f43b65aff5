// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Polygon triangulation utilities

/// Fan triangulation of a ring stored contiguously at `start`.
///
/// Yields `count - 2` triangles `(start, start + i, start + i + 1)` for
/// `i` in `1..count - 1`; rings with fewer than three vertices yield none.
#[inline]
pub fn fan_triangulate(start: u32, count: u32) -> impl Iterator<Item = [u32; 3]> {
    (1..count.saturating_sub(1)).map(move |i| [start, start + i, start + i + 1])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_triangle() {
        assert_eq!(fan_triangulate(0, 3).collect::<Vec<_>>(), vec![[0, 1, 2]]);
    }

    #[test]
    fn test_quad_with_offset() {
        assert_eq!(
            fan_triangulate(10, 4).collect::<Vec<_>>(),
            vec![[10, 11, 12], [10, 12, 13]]
        );
    }

    #[test]
    fn test_too_few_vertices() {
        assert_eq!(fan_triangulate(0, 0).count(), 0);
        assert_eq!(fan_triangulate(0, 1).count(), 0);
        assert_eq!(fan_triangulate(5, 2).count(), 0);
    }
}
