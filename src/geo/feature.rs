//! Detected geo features and their source paths

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Wire name of the source path annotation
pub const PATH_FIELD: &str = "geobinRequestPath";

/// Wire name of the radius annotation
pub const RADIUS_FIELD: &str = "geobinRadius";

/// One step from a parent value to a child value
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PathSegment {
    /// Array index
    Index(usize),
    /// Object key
    Key(String),
}

impl From<&str> for PathSegment {
    fn from(key: &str) -> Self {
        PathSegment::Key(key.to_string())
    }
}

impl From<usize> for PathSegment {
    fn from(index: usize) -> Self {
        PathSegment::Index(index)
    }
}

impl std::fmt::Display for PathSegment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PathSegment::Index(i) => write!(f, "[{}]", i),
            PathSegment::Key(k) => write!(f, ".{}", k),
        }
    }
}

/// Location of a value inside a document. Empty = document root.
pub type RequestPath = Vec<PathSegment>;

/// A geographic object found inside a request body
///
/// `object` is the GeoJSON object itself: either the structurally-valid
/// original or a synthesized `Point`. On the wire the annotations sit next to
/// the GeoJSON fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoFeature {
    /// GeoJSON fields
    #[serde(flatten)]
    object: Map<String, Value>,

    /// Where in the source document the feature was found
    #[serde(rename = "geobinRequestPath", default)]
    path: RequestPath,

    /// Radius from a companion distance/accuracy field
    #[serde(
        rename = "geobinRadius",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    radius: Option<f64>,
}

impl GeoFeature {
    /// Wrap an already-validated GeoJSON object found at `path`
    pub fn from_geojson(mut object: Map<String, Value>, path: RequestPath) -> Self {
        // annotations are out-of-band; never let the source shadow them
        object.remove(PATH_FIELD);
        object.remove(RADIUS_FIELD);
        Self {
            object,
            path,
            radius: None,
        }
    }

    /// Synthesize a GeoJSON `Point` from a longitude/latitude pair
    pub fn point(lng: f64, lat: f64, radius: Option<f64>, path: RequestPath) -> Self {
        let mut object = Map::new();
        object.insert("type".into(), Value::from("Point"));
        object.insert("coordinates".into(), Value::from(vec![lng, lat]));
        Self {
            object,
            path,
            radius,
        }
    }

    /// GeoJSON `type` of the feature
    pub fn kind(&self) -> Option<&str> {
        self.object.get("type").and_then(Value::as_str)
    }

    /// GeoJSON fields without annotations
    pub fn object(&self) -> &Map<String, Value> {
        &self.object
    }

    /// Source path inside the scanned document
    pub fn path(&self) -> &[PathSegment] {
        &self.path
    }

    /// Radius, if a radius-like field accompanied the coordinates
    pub fn radius(&self) -> Option<f64> {
        self.radius
    }

    /// `[lng, lat]` when the feature is a Point
    pub fn point_coordinates(&self) -> Option<(f64, f64)> {
        if self.kind() != Some("Point") {
            return None;
        }
        let coords = self.object.get("coordinates")?.as_array()?;
        Some((coords.first()?.as_f64()?, coords.get(1)?.as_f64()?))
    }
}
