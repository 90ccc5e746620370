//! Heuristic detection of loose latitude/longitude fields
//!
//! Many payloads carry coordinates without GeoJSON framing, e.g.
//! `{"lat": 45.5, "lng": -122.6, "acc": 20}`. Key names are matched
//! case-insensitively against the tables below.

use serde_json::{Map, Value};

/// Keys read as latitude
pub const LATITUDE_KEYS: &[&str] = &["lat", "latitude", "y"];

/// Keys read as longitude
pub const LONGITUDE_KEYS: &[&str] = &["lng", "lon", "long", "longitude", "x"];

/// Keys read as a radius around the point
pub const RADIUS_KEYS: &[&str] = &[
    "dst", "dist", "distance", "rad", "radius", "acc", "accuracy",
];

/// Keys whose value may be a `[longitude, latitude]` pair
pub const PAIR_KEYS: &[&str] = &[
    "geo",
    "loc",
    "location",
    "coord",
    "coords",
    "coordinate",
    "coordinates",
];

/// A point assembled from loose fields of a single object
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoosePoint {
    /// Longitude in degrees
    pub lng: f64,
    /// Latitude in degrees
    pub lat: f64,
    /// Companion radius, if present
    pub radius: Option<f64>,
}

/// Returns true if `lat` is within [-90, 90]
pub fn lat_is_valid(lat: f64) -> bool {
    (-90.0..=90.0).contains(&lat)
}

/// Returns true if `lng` is within [-180, 180]
pub fn lng_is_valid(lng: f64) -> bool {
    (-180.0..=180.0).contains(&lng)
}

enum KeyClass {
    Latitude,
    Longitude,
    Radius,
    Pair,
    Other,
}

fn classify(key: &str) -> KeyClass {
    let key = key.to_ascii_lowercase();
    let key = key.as_str();
    if LATITUDE_KEYS.contains(&key) {
        KeyClass::Latitude
    } else if LONGITUDE_KEYS.contains(&key) {
        KeyClass::Longitude
    } else if RADIUS_KEYS.contains(&key) {
        KeyClass::Radius
    } else if PAIR_KEYS.contains(&key) {
        KeyClass::Pair
    } else {
        KeyClass::Other
    }
}

/// `[a, b]` where both members are numbers
fn numeric_pair(value: &Value) -> Option<(f64, f64)> {
    match value.as_array()?.as_slice() {
        [a, b] => Some((a.as_f64()?, b.as_f64()?)),
        _ => None,
    }
}

/// Look for a latitude/longitude pair among the direct members of `object`
///
/// Only numeric values inside the valid range count. A `[lng, lat]` pair under
/// one of [`PAIR_KEYS`] takes precedence over separate fields. The radius is
/// reported only when a point is found.
pub fn detect(object: &Map<String, Value>) -> Option<LoosePoint> {
    let mut lat = None;
    let mut lng = None;
    let mut radius = None;
    let mut pair = None;

    for (key, value) in object {
        match classify(key) {
            KeyClass::Latitude => {
                if let Some(v) = value.as_f64().filter(|v| lat_is_valid(*v)) {
                    lat.get_or_insert(v);
                }
            }
            KeyClass::Longitude => {
                if let Some(v) = value.as_f64().filter(|v| lng_is_valid(*v)) {
                    lng.get_or_insert(v);
                }
            }
            KeyClass::Radius => {
                if let Some(v) = value.as_f64() {
                    radius.get_or_insert(v);
                }
            }
            KeyClass::Pair => {
                if pair.is_none() {
                    pair = numeric_pair(value);
                }
            }
            KeyClass::Other => {}
        }
    }

    let (lng, lat) = match pair {
        Some((pair_lng, pair_lat)) => {
            if !lng_is_valid(pair_lng) || !lat_is_valid(pair_lat) {
                return None;
            }
            (pair_lng, pair_lat)
        }
        None => (lng?, lat?),
    };

    Some(LoosePoint { lng, lat, radius })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn detect_json(value: Value) -> Option<LoosePoint> {
        match value {
            Value::Object(map) => detect(&map),
            _ => None,
        }
    }

    #[test]
    fn test_lat_lng() {
        let point = detect_json(json!({"lat": 45.5, "lng": -122.6})).unwrap();
        assert_eq!(point.lat, 45.5);
        assert_eq!(point.lng, -122.6);
        assert_eq!(point.radius, None);
    }

    #[test]
    fn test_key_variants_case_insensitive() {
        let point = detect_json(json!({"Latitude": 10, "LONGITUDE": 20})).unwrap();
        assert_eq!((point.lng, point.lat), (20.0, 10.0));

        let point = detect_json(json!({"y": 1.5, "X": 2.5})).unwrap();
        assert_eq!((point.lng, point.lat), (2.5, 1.5));

        let point = detect_json(json!({"lat": 1, "long": 2})).unwrap();
        assert_eq!((point.lng, point.lat), (2.0, 1.0));
    }

    #[test]
    fn test_out_of_range() {
        assert!(detect_json(json!({"lat": 95, "lng": 10})).is_none());
        assert!(detect_json(json!({"lat": 10, "lng": -180.5})).is_none());
        assert!(detect_json(json!({"lat": -90, "lng": 180})).is_some());
    }

    #[test]
    fn test_non_numeric_ignored() {
        assert!(detect_json(json!({"lat": "45.5", "lng": -122.6})).is_none());
        assert!(detect_json(json!({"lat": null, "lng": 1})).is_none());
    }

    #[test]
    fn test_requires_both() {
        assert!(detect_json(json!({"lat": 45.5})).is_none());
        assert!(detect_json(json!({"lng": 45.5, "acc": 3})).is_none());
    }

    #[test]
    fn test_radius() {
        let point = detect_json(json!({"lat": 1, "lng": 2, "acc": 5})).unwrap();
        assert_eq!(point.radius, Some(5.0));

        let point = detect_json(json!({"lat": 1, "lng": 2, "Distance": 7.5})).unwrap();
        assert_eq!(point.radius, Some(7.5));

        let point = detect_json(json!({"lat": 1, "lng": 2, "radius": "big"})).unwrap();
        assert_eq!(point.radius, None);
    }

    #[test]
    fn test_pair_overrides_fields() {
        let point = detect_json(json!({"lat": 1, "lng": 2, "coords": [30, 40]})).unwrap();
        assert_eq!((point.lng, point.lat), (30.0, 40.0));

        let point = detect_json(json!({"location": [-122.6, 45.5]})).unwrap();
        assert_eq!((point.lng, point.lat), (-122.6, 45.5));
    }

    #[test]
    fn test_pair_shape() {
        assert!(detect_json(json!({"geo": [1, 2, 3]})).is_none());
        assert!(detect_json(json!({"geo": ["1", "2"]})).is_none());
        assert!(detect_json(json!({"geo": [10, 95]})).is_none());
        assert!(detect_json(json!({"geo": {"lat": 1, "lng": 2}})).is_none());
    }
}
