//! Point-in-polygon filtering against the calibrated field.
//!
//! GPS noise regularly puts samples on the bench, in the car park or on the
//! next pitch over. Samples are kept only if they fall inside the
//! quadrilateral spanned by the four calibrated corners.
//!
//! Containment uses the even-odd ray casting rule with longitude as X and
//! latitude as Y. The result is exact for simple polygons. For a
//! self-intersecting corner order it is still deterministic, just not
//! meaningful; [`FieldCorners::shape`] reports that case.

use geo::{Area, Coord, Intersects, Line, LineString, Polygon};
use log::debug;

use crate::calibration::FieldCorners;
use crate::GeoPoint;

/// Test whether a point lies inside the field.
///
/// For each edge `(i, j)` with `j` the previous corner, a horizontal ray from
/// the point crosses the edge when the edge straddles the point's latitude
/// and the crossing longitude lies east of the point. Horizontal edges never
/// count as a crossing. Non-finite input is reported as outside.
pub fn point_in_field(point: &GeoPoint, corners: &FieldCorners) -> bool {
    let px = point.longitude;
    let py = point.latitude;
    let vertices = corners.points();

    let mut inside = false;
    let mut j = vertices.len() - 1;
    for i in 0..vertices.len() {
        let (xi, yi) = (vertices[i].longitude, vertices[i].latitude);
        let (xj, yj) = (vertices[j].longitude, vertices[j].latitude);
        j = i;

        if yi == yj {
            continue;
        }
        let straddles = (yi > py) != (yj > py);
        if straddles && px < (xj - xi) * (py - yi) / (yj - yi) + xi {
            inside = !inside;
        }
    }
    inside
}

/// Keep only the points inside the field, preserving order.
pub fn filter_points_in_field(points: &[GeoPoint], corners: &FieldCorners) -> Vec<GeoPoint> {
    let kept: Vec<GeoPoint> = points
        .iter()
        .filter(|p| point_in_field(p, corners))
        .copied()
        .collect();
    debug!(
        "[Geofence] {}/{} points inside the field",
        kept.len(),
        points.len()
    );
    kept
}

/// Share of points inside the field (0.0 for no points).
pub fn field_inclusion_ratio(points: &[GeoPoint], corners: &FieldCorners) -> f64 {
    if points.is_empty() {
        return 0.0;
    }
    let inside = points.iter().filter(|p| point_in_field(p, corners)).count();
    inside as f64 / points.len() as f64
}

// ============================================================================
// Field Shape Diagnostics
// ============================================================================

/// Geometric quality of a calibrated field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "ffi", derive(uniffi::Enum))]
pub enum FieldShape {
    /// A simple quadrilateral with positive area
    Valid,
    /// Duplicate or collinear corners; nothing can be inside
    ZeroArea,
    /// The corners were walked in crossing order (a "bow tie")
    SelfIntersecting,
}

impl FieldCorners {
    /// Classify the corner polygon.
    pub fn shape(&self) -> FieldShape {
        if self.bounds().is_degenerate() || self.is_collinear() {
            return FieldShape::ZeroArea;
        }

        let edges = self.edges();
        // Only opposite edges can cross in a quadrilateral
        if crosses(&edges[0], &edges[2]) || crosses(&edges[1], &edges[3]) {
            return FieldShape::SelfIntersecting;
        }
        FieldShape::Valid
    }

    /// Planar area in square degrees, for logging and sanity checks.
    pub fn planar_area(&self) -> f64 {
        let ring: Vec<Coord> = self.points().iter().map(to_coord).collect();
        Polygon::new(LineString::new(ring), vec![]).unsigned_area()
    }

    fn edges(&self) -> [Line<f64>; 4] {
        let p = self.points();
        [
            Line::new(to_coord(&p[0]), to_coord(&p[1])),
            Line::new(to_coord(&p[1]), to_coord(&p[2])),
            Line::new(to_coord(&p[2]), to_coord(&p[3])),
            Line::new(to_coord(&p[3]), to_coord(&p[0])),
        ]
    }

    /// Every triple of corners spans no area.
    fn is_collinear(&self) -> bool {
        let c: Vec<Coord> = self.points().iter().map(to_coord).collect();
        const TRIPLES: [(usize, usize, usize); 4] = [(0, 1, 2), (0, 1, 3), (0, 2, 3), (1, 2, 3)];
        TRIPLES.iter().all(|&(a, b, d)| {
            let u = c[b] - c[a];
            let v = c[d] - c[a];
            u.x * v.y - u.y * v.x == 0.0
        })
    }
}

/// Two edges cross somewhere other than a shared (duplicated) corner.
fn crosses(a: &Line<f64>, b: &Line<f64>) -> bool {
    if a.start == a.end || b.start == b.end {
        return false;
    }
    let touching = [a.start, a.end].iter().any(|p| *p == b.start || *p == b.end);
    !touching && a.intersects(b)
}

fn to_coord(p: &GeoPoint) -> Coord {
    Coord {
        x: p.longitude,
        y: p.latitude,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square_field() -> FieldCorners {
        FieldCorners::from_points(&[
            GeoPoint::new(0.0, 0.0),
            GeoPoint::new(0.0, 10.0),
            GeoPoint::new(10.0, 10.0),
            GeoPoint::new(10.0, 0.0),
        ])
        .unwrap()
    }

    #[test]
    fn test_inside_and_outside() {
        let field = square_field();
        assert!(point_in_field(&GeoPoint::new(5.0, 5.0), &field));
        assert!(!point_in_field(&GeoPoint::new(15.0, 15.0), &field));
        assert!(!point_in_field(&GeoPoint::new(-1.0, 5.0), &field));
        assert!(!point_in_field(&GeoPoint::new(5.0, 10.5), &field));
    }

    #[test]
    fn test_vertex_is_deterministic() {
        let field = square_field();
        let vertex = GeoPoint::new(10.0, 10.0);
        let first = point_in_field(&vertex, &field);
        for _ in 0..10 {
            assert_eq!(point_in_field(&vertex, &field), first);
        }
    }

    #[test]
    fn test_rotated_field() {
        // Diamond: corners on the axes
        let diamond = FieldCorners::from_points(&[
            GeoPoint::new(0.0, 5.0),
            GeoPoint::new(5.0, 10.0),
            GeoPoint::new(10.0, 5.0),
            GeoPoint::new(5.0, 0.0),
        ])
        .unwrap();
        assert!(point_in_field(&GeoPoint::new(5.0, 5.0), &diamond));
        // Inside the bounding box but outside the diamond
        assert!(!point_in_field(&GeoPoint::new(0.5, 0.5), &diamond));
        assert!(!point_in_field(&GeoPoint::new(9.5, 9.5), &diamond));
    }

    #[test]
    fn test_degenerate_fields_do_not_panic() {
        let same = GeoPoint::new(3.0, 3.0);
        let collapsed = FieldCorners::from_points(&[same, same, same, same]).unwrap();
        assert!(!point_in_field(&same, &collapsed));
        assert!(!point_in_field(&GeoPoint::new(4.0, 4.0), &collapsed));
        assert_eq!(collapsed.shape(), FieldShape::ZeroArea);

        // Every edge horizontal
        let flat = FieldCorners::from_points(&[
            GeoPoint::new(1.0, 0.0),
            GeoPoint::new(1.0, 5.0),
            GeoPoint::new(1.0, 10.0),
            GeoPoint::new(1.0, 2.0),
        ])
        .unwrap();
        assert!(!point_in_field(&GeoPoint::new(1.0, 3.0), &flat));
        assert_eq!(flat.shape(), FieldShape::ZeroArea);
    }

    #[test]
    fn test_nan_point_is_outside() {
        let field = square_field();
        assert!(!point_in_field(&GeoPoint::new(f64::NAN, 5.0), &field));
        assert!(!point_in_field(&GeoPoint::new(5.0, f64::NAN), &field));
    }

    #[test]
    fn test_filter_and_ratio() {
        let field = square_field();
        let points = vec![
            GeoPoint::new(1.0, 1.0),
            GeoPoint::new(20.0, 20.0),
            GeoPoint::new(9.0, 9.0),
            GeoPoint::new(-5.0, 3.0),
        ];
        let kept = filter_points_in_field(&points, &field);
        assert_eq!(kept, vec![GeoPoint::new(1.0, 1.0), GeoPoint::new(9.0, 9.0)]);
        assert!((field_inclusion_ratio(&points, &field) - 0.5).abs() < 1e-12);
        assert_eq!(field_inclusion_ratio(&[], &field), 0.0);
    }

    #[test]
    fn test_shape_classification() {
        assert_eq!(square_field().shape(), FieldShape::Valid);
        assert!((square_field().planar_area() - 100.0).abs() < 1e-9);

        let bow_tie = FieldCorners::from_points(&[
            GeoPoint::new(0.0, 0.0),
            GeoPoint::new(10.0, 10.0),
            GeoPoint::new(0.0, 10.0),
            GeoPoint::new(10.0, 0.0),
        ])
        .unwrap();
        assert_eq!(bow_tie.shape(), FieldShape::SelfIntersecting);

        let diagonal = FieldCorners::from_points(&[
            GeoPoint::new(0.0, 0.0),
            GeoPoint::new(1.0, 1.0),
            GeoPoint::new(2.0, 2.0),
            GeoPoint::new(3.0, 3.0),
        ])
        .unwrap();
        assert_eq!(diagonal.shape(), FieldShape::ZeroArea);
    }

    #[test]
    fn test_duplicated_corner_is_a_triangle() {
        let triangle = FieldCorners::from_points(&[
            GeoPoint::new(0.0, 0.0),
            GeoPoint::new(0.0, 0.0),
            GeoPoint::new(10.0, 10.0),
            GeoPoint::new(0.0, 10.0),
        ])
        .unwrap();
        assert_eq!(triangle.shape(), FieldShape::Valid);
        assert!((triangle.planar_area() - 50.0).abs() < 1e-9);
        assert!(point_in_field(&GeoPoint::new(2.0, 8.0), &triangle));
        assert!(!point_in_field(&GeoPoint::new(8.0, 2.0), &triangle));
    }
}
