//! Geographic feature detection
//!
//! Request bodies are arbitrary JSON. The scanner finds geographic data in
//! them using two independent strategies:
//!
//! - **Typed GeoJSON**: an object whose `type` is a known GeoJSON kind and
//!   whose members decode against that kind's shape.
//! - **Loose coordinates**: an object holding numeric latitude and longitude
//!   fields (`lat`/`lng`, `latitude`/`longitude`, `y`/`x`, ...) or a
//!   `[lng, lat]` pair under a key like `coords`, synthesized into a `Point`.
//!
//! Every feature carries the path at which it was found.
//!
//! ```text
//! {"user": {"home": {"lat": 45.5, "lng": -122.6}}}
//!            │
//!            ▼
//! {"type": "Point", "coordinates": [-122.6, 45.5],
//!  "geobinRequestPath": ["user", "home"]}
//! ```

pub mod feature;
pub mod geojson;
pub mod heuristic;
pub mod scanner;

pub use feature::{GeoFeature, PathSegment, RequestPath};
pub use scanner::{GeoScanner, ScannerConfig};
