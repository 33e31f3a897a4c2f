//! Parsing of the product `Polygon` column into GeoJSON geometry.
//!
//! The column holds either nothing, a WKT `Multipolygon(...)` string, or a
//! JSON coordinate array. Arrays nested one deep are points, three deep are
//! polygons (shell followed by holes). Anything else yields no geometry.

use serde_json::Value;
use tracing::warn;

use osccat_shared::{Geometry, Position};

/// Parse a `Polygon` cell. Never fails; unusable input yields `None`.
pub fn parse_geometry(source: &str) -> Option<Geometry> {
    let source = source.trim();
    if source.is_empty() {
        return None;
    }

    // TODO: parse WKT multipolygons once a product needs one rendered.
    if source.starts_with("Multipolygon") || source.starts_with("MULTIPOLYGON") {
        return None;
    }

    let raw: Value = match serde_json::from_str(source) {
        Ok(v) => v,
        Err(e) => {
            warn!(source, error = %e, "polygon column is not valid JSON");
            return None;
        }
    };

    match depth(&raw) {
        1 => match serde_json::from_value::<Position>(raw) {
            Ok(pos) if pos.len() >= 2 => Some(Geometry::Point { coordinates: pos }),
            _ => {
                warn!(source, "point has fewer than two numeric coordinates");
                None
            }
        },
        3 => match serde_json::from_value::<Vec<Vec<Position>>>(raw) {
            Ok(rings) if !rings.is_empty() => Some(Geometry::Polygon {
                coordinates: rings.into_iter().map(close_ring).collect(),
            }),
            _ => {
                warn!(source, "polygon rings are not numeric coordinate lists");
                None
            }
        },
        d => {
            warn!(source, depth = d, "unsupported coordinate nesting depth");
            None
        }
    }
}

/// Array nesting depth, following the first element at each level.
fn depth(value: &Value) -> usize {
    match value {
        Value::Array(items) => 1 + items.first().map(depth).unwrap_or(0),
        _ => 0,
    }
}

/// Append the first position if the ring is not already closed.
fn close_ring(mut ring: Vec<Position>) -> Vec<Position> {
    if let (Some(first), Some(last)) = (ring.first(), ring.last()) {
        if first != last {
            let first = first.clone();
            ring.push(first);
        }
    }
    ring
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_and_multipolygon_yield_none() {
        assert!(parse_geometry("").is_none());
        assert!(parse_geometry("Multipolygon(((0 0, 1 0, 1 1, 0 0)))").is_none());
    }

    #[test]
    fn flat_array_is_point() {
        let geom = parse_geometry("[12.5, 41.9]").unwrap();
        assert_eq!(
            geom,
            Geometry::Point {
                coordinates: vec![12.5, 41.9]
            }
        );
    }

    #[test]
    fn triple_nested_is_polygon_with_holes() {
        let geom =
            parse_geometry("[[[0,0],[10,0],[10,10],[0,10]],[[2,2],[3,2],[3,3],[2,2]]]").unwrap();
        let Geometry::Polygon { coordinates } = geom else {
            panic!("expected polygon");
        };
        assert_eq!(coordinates.len(), 2);
        // Shell was open and gets closed.
        assert_eq!(coordinates[0].len(), 5);
        assert_eq!(coordinates[0][0], coordinates[0][4]);
        // Hole was already closed.
        assert_eq!(coordinates[1].len(), 4);
    }

    #[test]
    fn line_string_depth_is_unsupported() {
        assert!(parse_geometry("[[0,0],[1,1]]").is_none());
    }

    #[test]
    fn invalid_json_yields_none() {
        assert!(parse_geometry("not json").is_none());
        assert!(parse_geometry("[\"a\", \"b\"]").is_none());
        assert!(parse_geometry("[]").is_none());
    }

    #[test]
    fn depth_follows_first_element() {
        assert_eq!(depth(&serde_json::json!(5)), 0);
        assert_eq!(depth(&serde_json::json!([1, 2])), 1);
        assert_eq!(depth(&serde_json::json!([[[1, 2]]])), 3);
        assert_eq!(depth(&serde_json::json!([])), 1);
    }
}
