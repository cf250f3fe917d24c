//! Minimal GeoJSON model
//!
//! Only what the map collaborator consumes: point markers for properties
//! and polygon boundaries for towns.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Boundary feature property holding the planning-area (town) name
pub const TOWN_NAME_PROPERTY: &str = "PLN_AREA_N";

/// Longitude/latitude pair
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LngLat {
    pub lon: f64,
    pub lat: f64,
}

impl LngLat {
    pub const fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }

    /// Arithmetic mean of a set of positions, `None` for an empty set
    pub fn centroid<I: IntoIterator<Item = LngLat>>(points: I) -> Option<Self> {
        let (count, lon, lat) = points
            .into_iter()
            .fold((0usize, 0.0, 0.0), |(n, lon, lat), p| (n + 1, lon + p.lon, lat + p.lat));
        if count == 0 {
            return None;
        }
        Some(Self::new(lon / count as f64, lat / count as f64))
    }
}

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
}

impl Bounds {
    /// Degenerate box around a single point
    pub fn around(point: LngLat) -> Self {
        Self {
            west: point.lon,
            south: point.lat,
            east: point.lon,
            north: point.lat,
        }
    }

    pub fn extend(&mut self, point: LngLat) {
        self.west = self.west.min(point.lon);
        self.east = self.east.max(point.lon);
        self.south = self.south.min(point.lat);
        self.north = self.north.max(point.lat);
    }

    /// Smallest box containing every point
    pub fn from_points<I: IntoIterator<Item = LngLat>>(points: I) -> Option<Self> {
        let mut iter = points.into_iter();
        let mut bounds = Self::around(iter.next()?);
        for point in iter {
            bounds.extend(point);
        }
        Some(bounds)
    }

    pub fn contains(&self, point: LngLat) -> bool {
        point.lon >= self.west && point.lon <= self.east && point.lat >= self.south && point.lat <= self.north
    }
}

/// GeoJSON position; extra elements (elevation) are tolerated
pub type Position = Vec<f64>;

fn to_lng_lat(position: &Position) -> Option<LngLat> {
    match position.as_slice() {
        [lon, lat, ..] => Some(LngLat::new(*lon, *lat)),
        _ => None,
    }
}

/// Supported geometry kinds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Geometry {
    Point { coordinates: Position },
    Polygon { coordinates: Vec<Vec<Position>> },
    MultiPolygon { coordinates: Vec<Vec<Vec<Position>>> },
}

impl Geometry {
    pub fn point(at: LngLat) -> Self {
        Geometry::Point {
            coordinates: vec![at.lon, at.lat],
        }
    }

    /// Positions of the outer ring(s); holes are ignored
    pub fn outer_positions(&self) -> Vec<LngLat> {
        match self {
            Geometry::Point { coordinates } => to_lng_lat(coordinates).into_iter().collect(),
            Geometry::Polygon { coordinates } => coordinates
                .first()
                .map(|ring| ring.iter().filter_map(to_lng_lat).collect())
                .unwrap_or_default(),
            Geometry::MultiPolygon { coordinates } => coordinates
                .iter()
                .filter_map(|polygon| polygon.first())
                .flat_map(|ring| ring.iter().filter_map(to_lng_lat))
                .collect(),
        }
    }
}

/// A geometry plus free-form properties
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    #[serde(rename = "type", default = "feature_type")]
    pub kind: String,
    pub geometry: Geometry,
    #[serde(default)]
    pub properties: Map<String, Value>,
}

fn feature_type() -> String {
    "Feature".to_string()
}

fn collection_type() -> String {
    "FeatureCollection".to_string()
}

impl Feature {
    pub fn new(geometry: Geometry, properties: Map<String, Value>) -> Self {
        Self {
            kind: feature_type(),
            geometry,
            properties,
        }
    }

    pub fn property_str(&self, key: &str) -> Option<&str> {
        self.properties.get(key).and_then(Value::as_str)
    }
}

/// Collection of features
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureCollection {
    #[serde(rename = "type", default = "collection_type")]
    pub kind: String,
    #[serde(default)]
    pub features: Vec<Feature>,
}

impl Default for FeatureCollection {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl FeatureCollection {
    pub fn new(features: Vec<Feature>) -> Self {
        Self {
            kind: collection_type(),
            features,
        }
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Boundary feature for a town, matched case-insensitively
    pub fn town_boundary(&self, town: &str) -> Option<&Feature> {
        self.features.iter().find(|f| {
            f.property_str(TOWN_NAME_PROPERTY)
                .is_some_and(|name| name.eq_ignore_ascii_case(town))
        })
    }

    /// Combined outer bounds of the named towns' boundaries
    pub fn towns_bounds<S: AsRef<str>>(&self, towns: &[S]) -> Option<Bounds> {
        let points = towns
            .iter()
            .filter_map(|town| self.town_boundary(town.as_ref()))
            .flat_map(|feature| feature.geometry.outer_positions());
        Bounds::from_points(points)
    }
}
