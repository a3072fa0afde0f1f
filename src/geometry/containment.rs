//! Point-in-region queries over resolved geometries. Pure, no I/O.
//!
//! Boundary policy: a point lying exactly on a ring edge or vertex counts as
//! contained. A multipolygon contains a point if any member polygon does.

use geo::{Intersects, MultiPolygon, Point};

use super::{parse_polygon, BoundingBox, Center, Geometry, Ring};

/// Anything with a latitude and longitude that can be filtered by region.
pub trait Located {
    fn lat(&self) -> f64;
    fn lon(&self) -> f64;
}

impl Located for Center {
    fn lat(&self) -> f64 {
        self.lat
    }
    fn lon(&self) -> f64 {
        self.lon
    }
}

pub fn contains(geometry: &Geometry, lat: f64, lon: f64) -> bool {
    let point = Point::new(lon, lat);
    match geometry {
        Geometry::Polygon(rings) => polygon_contains(rings, &point),
        Geometry::MultiPolygon(polygons) => {
            polygons.iter().any(|rings| polygon_contains(rings, &point))
        }
    }
}

/// Containment against an already parsed shape.
pub fn shape_contains(shape: &MultiPolygon<f64>, lat: f64, lon: f64) -> bool {
    shape.intersects(&Point::new(lon, lat))
}

fn polygon_contains(rings: &[Ring], point: &Point<f64>) -> bool {
    match parse_polygon(rings) {
        Ok(polygon) => polygon.intersects(point),
        Err(e) => {
            tracing::warn!("skipping malformed polygon in containment test: {}", e);
            false
        }
    }
}

/// Extent of every position in the geometry. `None` when it has no positions.
pub fn bounds(geometry: &Geometry) -> Option<BoundingBox> {
    let rings: Vec<&Ring> = match geometry {
        Geometry::Polygon(rings) => rings.iter().collect(),
        Geometry::MultiPolygon(polygons) => polygons.iter().flatten().collect(),
    };

    let mut acc: Option<BoundingBox> = None;
    for position in rings.into_iter().flatten() {
        let [lon, lat, ..] = position.as_slice() else { continue };
        let b = acc.get_or_insert(BoundingBox {
            min_lon: *lon,
            min_lat: *lat,
            max_lon: *lon,
            max_lat: *lat,
        });
        b.min_lon = b.min_lon.min(*lon);
        b.min_lat = b.min_lat.min(*lat);
        b.max_lon = b.max_lon.max(*lon);
        b.max_lat = b.max_lat.max(*lat);
    }
    acc
}

/// The subsequence of `points` inside `geometry`, order preserved.
///
/// The geometry is parsed once; a malformed geometry matches nothing.
pub fn filter_points_in<P: Located + Clone>(geometry: &Geometry, points: &[P]) -> Vec<P> {
    let shape = match geometry.to_shape() {
        Ok(shape) => shape,
        Err(e) => {
            tracing::warn!("cannot filter points against malformed geometry: {}", e);
            return Vec::new();
        }
    };
    points
        .iter()
        .filter(|p| shape_contains(&shape, p.lat(), p.lon()))
        .cloned()
        .collect()
}
