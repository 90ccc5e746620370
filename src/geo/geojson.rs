//! Structural GeoJSON validation
//!
//! An object whose `type` names a recognized kind only counts as GeoJSON when
//! the rest of the object decodes against that kind's shape. Extra members
//! (`properties`, `bbox`, `crs`, foreign members) are ignored.

use serde::Deserialize;
use serde_json::{Map, Value};

/// GeoJSON kinds the scanner recognizes
pub const RECOGNIZED_KINDS: &[&str] = &[
    "Point",
    "LineString",
    "Polygon",
    "MultiPoint",
    "MultiPolygon",
    "GeometryCollection",
    "Feature",
    "FeatureCollection",
];

/// A coordinate tuple: at least longitude and latitude
#[derive(Debug, Deserialize)]
#[serde(try_from = "Vec<f64>")]
struct Position;

impl TryFrom<Vec<f64>> for Position {
    type Error = String;

    fn try_from(values: Vec<f64>) -> Result<Self, Self::Error> {
        if values.len() < 2 {
            return Err(format!("position needs 2+ numbers, got {}", values.len()));
        }
        Ok(Position)
    }
}

#[allow(dead_code)]
#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum Geometry {
    Point {
        coordinates: Position,
    },
    LineString {
        coordinates: Vec<Position>,
    },
    Polygon {
        coordinates: Vec<Vec<Position>>,
    },
    MultiPoint {
        coordinates: Vec<Position>,
    },
    MultiPolygon {
        coordinates: Vec<Vec<Vec<Position>>>,
    },
    GeometryCollection {
        geometries: Vec<Geometry>,
    },
}

#[allow(dead_code)]
#[derive(Debug, Deserialize)]
struct Feature {
    geometry: Geometry,
    #[serde(default)]
    properties: Option<Map<String, Value>>,
}

#[allow(dead_code)]
#[derive(Debug, Deserialize)]
struct FeatureCollection {
    features: Vec<TypedFeature>,
}

/// Feature nested in a collection must still say `"type": "Feature"`
#[allow(dead_code)]
#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum TypedFeature {
    Feature(Feature),
}

/// Outcome of checking an object's `type` member
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeoJsonCheck {
    /// No `type`, or a `type` the scanner does not know
    NotGeoJson,
    /// Recognized `type` whose members do not fit its shape
    Malformed,
    /// Structurally valid GeoJSON
    Valid,
}

/// Check whether `object` is structurally valid GeoJSON of a recognized kind
pub fn check(object: &Map<String, Value>) -> GeoJsonCheck {
    let Some(kind) = object.get("type").and_then(Value::as_str) else {
        return GeoJsonCheck::NotGeoJson;
    };
    if !RECOGNIZED_KINDS.contains(&kind) {
        return GeoJsonCheck::NotGeoJson;
    }

    let value = Value::Object(object.clone());
    let decoded = match kind {
        "Feature" => Feature::deserialize(&value).map(drop),
        "FeatureCollection" => FeatureCollection::deserialize(&value).map(drop),
        _ => Geometry::deserialize(&value).map(drop),
    };

    match decoded {
        Ok(()) => GeoJsonCheck::Valid,
        Err(e) => {
            tracing::debug!(kind, error = %e, "Recognized GeoJSON type failed to decode");
            GeoJsonCheck::Malformed
        }
    }
}
