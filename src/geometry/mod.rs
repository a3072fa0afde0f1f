//! GeoJSON-shaped geometry values and their conversion to analyzable shapes.
//!
//! Positions are stored `[lon, lat]` (GeoJSON order). Centers handed to
//! callers are always `(lat, lon)`.

pub mod buffer;
pub mod containment;

use geo::{BoundingRect, Centroid, Coord, LineString, MultiPolygon, Polygon};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::location::types::LocationError;

/// A GeoJSON position: `[lon, lat]`, optionally followed by altitude.
pub type Position = Vec<f64>;

/// A linear ring. Stored rings are closed (first position == last).
pub type Ring = Vec<Position>;

/// Polygon or multipolygon in GeoJSON form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "coordinates")]
pub enum Geometry {
    /// Exterior ring followed by any holes.
    Polygon(Vec<Ring>),
    MultiPolygon(Vec<Vec<Ring>>),
}

impl Geometry {
    /// A hole-free polygon from a single exterior ring. The ring is closed if needed.
    pub fn polygon(mut exterior: Ring) -> Self {
        close_ring(&mut exterior);
        Geometry::Polygon(vec![exterior])
    }

    pub fn polygon_count(&self) -> usize {
        match self {
            Geometry::Polygon(_) => 1,
            Geometry::MultiPolygon(polygons) => polygons.len(),
        }
    }

    /// Parse into a `geo` multipolygon, validating every ring.
    pub fn to_shape(&self) -> Result<MultiPolygon<f64>, LocationError> {
        match self {
            Geometry::Polygon(rings) => Ok(MultiPolygon::new(vec![parse_polygon(rings)?])),
            Geometry::MultiPolygon(polygons) => {
                if polygons.is_empty() {
                    return Err(LocationError::GeometryParse(
                        "multipolygon has no polygons".into(),
                    ));
                }
                let parsed = polygons
                    .iter()
                    .map(|rings| parse_polygon(rings))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(MultiPolygon::new(parsed))
            }
        }
    }
}

/// Append the first position to a ring whose ends differ.
pub fn close_ring(ring: &mut Ring) {
    if let (Some(first), Some(last)) = (ring.first(), ring.last()) {
        if first != last {
            let first = first.clone();
            ring.push(first);
        }
    }
}

pub(crate) fn parse_polygon(rings: &[Ring]) -> Result<Polygon<f64>, LocationError> {
    let (exterior, holes) = rings
        .split_first()
        .ok_or_else(|| LocationError::GeometryParse("polygon has no rings".into()))?;
    let exterior = parse_ring(exterior)?;
    let interiors = holes.iter().map(|r| parse_ring(r)).collect::<Result<Vec<_>, _>>()?;
    Ok(Polygon::new(exterior, interiors))
}

fn parse_ring(ring: &[Position]) -> Result<LineString<f64>, LocationError> {
    let mut coords = Vec::with_capacity(ring.len() + 1);
    for position in ring {
        match position.as_slice() {
            [lon, lat, ..] if lon.is_finite() && lat.is_finite() => {
                coords.push(Coord { x: *lon, y: *lat });
            }
            other => {
                return Err(LocationError::GeometryParse(format!(
                    "invalid position {:?}",
                    other
                )));
            }
        }
    }
    if let (Some(first), Some(last)) = (coords.first().copied(), coords.last().copied()) {
        if first != last {
            coords.push(first);
        }
    }
    // closed ring needs at least 3 distinct positions plus the closing one
    let mut distinct: Vec<Coord<f64>> = Vec::with_capacity(3);
    for c in &coords {
        if !distinct.contains(c) {
            distinct.push(*c);
            if distinct.len() == 3 {
                break;
            }
        }
    }
    if coords.len() < 4 || distinct.len() < 3 {
        return Err(LocationError::GeometryParse(format!(
            "ring has {} positions, need at least 3 distinct",
            ring.len()
        )));
    }
    Ok(LineString::from(coords))
}

/// Axis-aligned extent in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_lon: f64,
    pub min_lat: f64,
    pub max_lon: f64,
    pub max_lat: f64,
}

impl BoundingBox {
    pub fn of_shape(shape: &MultiPolygon<f64>) -> Option<Self> {
        shape.bounding_rect().map(|rect| BoundingBox {
            min_lon: rect.min().x,
            min_lat: rect.min().y,
            max_lon: rect.max().x,
            max_lat: rect.max().y,
        })
    }

    /// Inclusive on every edge.
    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        (self.min_lat..=self.max_lat).contains(&lat) && (self.min_lon..=self.max_lon).contains(&lon)
    }
}

/// A `(lat, lon)` pair as surfaced to callers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Center {
    pub lat: f64,
    pub lon: f64,
}

impl Center {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    pub fn of_shape(shape: &MultiPolygon<f64>) -> Option<Self> {
        shape.centroid().map(|p| Center::new(p.y(), p.x()))
    }
}

impl fmt::Display for Center {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ns = if self.lat >= 0.0 { 'N' } else { 'S' };
        let ew = if self.lon >= 0.0 { 'E' } else { 'W' };
        write!(f, "{:.4}\u{00B0}{}, {:.4}\u{00B0}{}", self.lat.abs(), ns, self.lon.abs(), ew)
    }
}
