// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Multipatch geometry parsing.
//!
//! Converts a GeoJSON-style `Polygon` / `MultiPolygon` description into a
//! flat vertex list plus fan-triangulated index list. Malformed parts are
//! skipped, never reported: the worst case is an empty payload.

use crate::triangulation::fan_triangulate;
use serde_json::Value;

/// Vertex and triangle lists of one building, straight from its rings.
///
/// Vertices are not deduplicated; every ring contributes its own copies.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeometryPayload {
    pub vertices: Vec<[f64; 3]>,
    pub triangles: Vec<[u32; 3]>,
}

impl GeometryPayload {
    /// No usable geometry (either list empty)
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty() || self.triangles.is_empty()
    }

    fn add_polygon(&mut self, rings: &[Value]) {
        for ring in rings {
            if let Some(points) = ring.as_array() {
                self.add_ring(points);
            }
        }
    }

    fn add_ring(&mut self, points: &[Value]) {
        let mut ring: Vec<[f64; 3]> = points.iter().filter_map(parse_coordinate).collect();
        if ring.len() >= 2 && ring.first() == ring.last() {
            ring.pop();
        }

        let start = self.vertices.len() as u32;
        let count = ring.len() as u32;
        self.vertices.extend(ring);
        self.triangles.extend(fan_triangulate(start, count));
    }
}

/// Parse one geometry description. Unknown types and malformed input give
/// an empty payload.
pub fn parse_geometry(geometry: &Value) -> GeometryPayload {
    let mut payload = GeometryPayload::default();

    let Some(coordinates) = geometry.get("coordinates").and_then(Value::as_array) else {
        return payload;
    };

    match geometry.get("type").and_then(Value::as_str) {
        Some("Polygon") => payload.add_polygon(coordinates),
        Some("MultiPolygon") => {
            for polygon in coordinates {
                if let Some(rings) = polygon.as_array() {
                    payload.add_polygon(rings);
                }
            }
        }
        _ => {}
    }

    payload
}

/// `[x, y]` or `[x, y, z]`; a missing or non-numeric elevation becomes 0.
fn parse_coordinate(value: &Value) -> Option<[f64; 3]> {
    let parts = value.as_array()?;
    let x = parts.first()?.as_f64()?;
    let y = parts.get(1)?.as_f64()?;
    let z = parts.get(2).and_then(Value::as_f64).unwrap_or(0.0);
    Some([x, y, z])
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_polygon_square() {
        let payload = parse_geometry(&json!({
            "type": "Polygon",
            "coordinates": [[[0, 0, 1], [1, 0, 1], [1, 1, 1], [0, 1, 1], [0, 0, 1]]]
        }));
        assert_eq!(payload.vertices.len(), 4);
        assert_eq!(payload.triangles, vec![[0, 1, 2], [0, 2, 3]]);
        assert_eq!(payload.vertices[2], [1.0, 1.0, 1.0]);
    }

    #[test]
    fn test_multipolygon_offsets_rings() {
        let payload = parse_geometry(&json!({
            "type": "MultiPolygon",
            "coordinates": [
                [[[0, 0, 0], [1, 0, 0], [0, 1, 0], [0, 0, 0]]],
                [[[0, 0, 5], [1, 0, 5], [1, 1, 5], [0, 1, 5], [0, 0, 5]]]
            ]
        }));
        assert_eq!(payload.vertices.len(), 7);
        assert_eq!(payload.triangles, vec![[0, 1, 2], [3, 4, 5], [3, 5, 6]]);
    }

    #[test]
    fn test_missing_elevation_defaults_to_zero() {
        let payload = parse_geometry(&json!({
            "type": "Polygon",
            "coordinates": [[[0, 0], [2, 0], [2, 2], [0, 0]]]
        }));
        assert!(payload.vertices.iter().all(|v| v[2] == 0.0));
        assert_eq!(payload.triangles.len(), 1);
    }

    #[test]
    fn test_short_ring_skipped_without_aborting_siblings() {
        let payload = parse_geometry(&json!({
            "type": "Polygon",
            "coordinates": [
                [[0, 0, 0], [1, 0, 0], [0, 0, 0]],
                "not a ring",
                [[0, 0, 0], [1, 0, 0], [1, 1, 0], [0, 0, 0]]
            ]
        }));
        // The short ring still contributes its two vertices
        assert_eq!(payload.vertices.len(), 5);
        assert_eq!(payload.triangles, vec![[2, 3, 4]]);
    }

    #[test]
    fn test_malformed_coordinates_skipped() {
        let payload = parse_geometry(&json!({
            "type": "Polygon",
            "coordinates": [[[0, 0, 0], ["x", 1], [1, 0, 0], [7], [1, 1, 0], [0, 1, 0], [0, 0, 0]]]
        }));
        assert_eq!(payload.vertices.len(), 4);
        assert_eq!(payload.triangles.len(), 2);
    }

    #[test]
    fn test_unusable_geometry_is_empty() {
        for geometry in [
            json!(null),
            json!({"type": "Point", "coordinates": [1, 2, 3]}),
            json!({"type": "Polygon"}),
            json!({"type": "Polygon", "coordinates": 12}),
            json!({"type": "MultiPolygon", "coordinates": [1, [2]]}),
        ] {
            let payload = parse_geometry(&geometry);
            assert!(payload.is_empty(), "{geometry}");
            assert!(payload.triangles.is_empty());
        }
    }
}
