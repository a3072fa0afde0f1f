//! Synthetic buffer polygons standing in for state and city boundaries.
//!
//! These are approximations built around a single geocoded point, not
//! administrative boundaries. Containment against them answers "is the point
//! near the geocoded center", nothing more.

use std::f64::consts::TAU;

use super::{Geometry, Ring};

/// Axis-aligned square of `half_width` degrees around the point.
///
/// Ring order follows a counter-clockwise walk starting at the south-east corner.
pub fn rectangle(lat: f64, lon: f64, half_width: f64) -> Geometry {
    let (min_lon, max_lon) = (lon - half_width, lon + half_width);
    let (min_lat, max_lat) = (lat - half_width, lat + half_width);
    Geometry::polygon(vec![
        vec![max_lon, min_lat],
        vec![max_lon, max_lat],
        vec![min_lon, max_lat],
        vec![min_lon, min_lat],
    ])
}

/// Regular `segments`-gon inscribed in a circle of `radius` degrees.
pub fn circle(lat: f64, lon: f64, radius: f64, segments: usize) -> Geometry {
    let segments = segments.max(3);
    let ring: Ring = (0..segments)
        .map(|i| {
            let theta = TAU * i as f64 / segments as f64;
            vec![lon + radius * theta.cos(), lat + radius * theta.sin()]
        })
        .collect();
    Geometry::polygon(ring)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::containment::{bounds, contains};
    use approx::assert_relative_eq;

    #[test]
    fn test_rectangle_extent() {
        let g = rectangle(36.78, -119.42, 0.5);
        let b = bounds(&g).unwrap();
        assert_relative_eq!(b.min_lat, 36.28, epsilon = 1e-9);
        assert_relative_eq!(b.max_lon, -118.92, epsilon = 1e-9);
        assert!(contains(&g, 36.78, -119.42));
        assert!(!contains(&g, 37.5, -119.42));
        let Geometry::Polygon(rings) = &g else { panic!("expected polygon") };
        assert_eq!(rings[0].len(), 5);
        assert_eq!(rings[0].first(), rings[0].last());
    }

    #[test]
    fn test_circle_vertices_on_radius() {
        let g = circle(19.07, 72.87, 0.1, 32);
        let Geometry::Polygon(rings) = &g else { panic!("expected polygon") };
        assert_eq!(rings[0].len(), 33);
        for p in &rings[0] {
            let d = ((p[0] - 72.87).powi(2) + (p[1] - 19.07).powi(2)).sqrt();
            assert_relative_eq!(d, 0.1, epsilon = 1e-9);
        }
        assert!(contains(&g, 19.07, 72.87));
        assert!(contains(&g, 19.12, 72.87));
        assert!(!contains(&g, 19.2, 72.87));
    }

    #[test]
    fn test_circle_segment_floor() {
        let Geometry::Polygon(rings) = circle(0.0, 0.0, 1.0, 1) else { panic!("expected polygon") };
        assert_eq!(rings[0].len(), 4);
    }
}
