//! Captured request records
//!
//! A [`Record`] is what a bin stores and what viewers receive: the request
//! headers and body plus any geo features found in the body. Its JSON form is
//! both the persisted value and the broadcast payload.

use std::collections::BTreeMap;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::geo::GeoFeature;

/// One captured request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Unix seconds when the request arrived
    pub timestamp: i64,

    /// Header name to value; repeated headers joined with ", "
    pub headers: BTreeMap<String, String>,

    /// Raw request body
    pub body: String,

    /// Geo features detected in the body
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub geo: Vec<GeoFeature>,
}

impl Record {
    /// Create a record; invalid UTF-8 in the body is replaced
    pub fn new(
        timestamp: i64,
        headers: BTreeMap<String, String>,
        body: &[u8],
        geo: Vec<GeoFeature>,
    ) -> Self {
        Self {
            timestamp,
            headers,
            body: String::from_utf8_lossy(body).into_owned(),
            geo,
        }
    }

    /// Flatten header pairs into a map, preserving name case
    ///
    /// Repeated names are joined with ", " in arrival order.
    pub fn flatten_headers<I, K, V>(pairs: I) -> BTreeMap<String, String>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: AsRef<str>,
    {
        let mut headers: BTreeMap<String, String> = BTreeMap::new();
        for (name, value) in pairs {
            headers
                .entry(name.into())
                .and_modify(|joined| {
                    joined.push_str(", ");
                    joined.push_str(value.as_ref());
                })
                .or_insert_with(|| value.as_ref().to_string());
        }
        headers
    }

    /// Whether any geo features were detected
    pub fn has_geo(&self) -> bool {
        !self.geo.is_empty()
    }

    /// Serialize to the wire format
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Serialize to a broadcast payload
    pub fn to_payload(&self) -> Result<Bytes, serde_json::Error> {
        self.to_json().map(Bytes::from)
    }

    /// Decode a stored record
    pub fn from_json(data: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(data)
    }
}
