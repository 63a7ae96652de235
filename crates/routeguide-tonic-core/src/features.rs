//! In-memory feature store.
//!
//! The store is loaded once at startup and never written afterwards. It is
//! backed by an `Arc<[Feature]>`, so clones are cheap and every in-flight call
//! can read it concurrently without locking.
//!
//! ## Fixture format
//!
//! A JSON array of records:
//!
//! ```json
//! [
//!   { "location": { "latitude": 407838351, "longitude": -746143763 },
//!     "name": "Patriots Path, Mendham, NJ 07945, USA" }
//! ]
//! ```
//!
//! Names may be empty. Load order is preserved and drives streaming order.

use crate::{
    Error, Result,
    geo::Bounds,
    proto::{Feature, Point},
};
use serde::Deserialize;
use std::{fs::File, io::Read, path::Path, sync::Arc};

#[derive(Debug, Deserialize)]
struct FeatureRecord {
    location: LocationRecord,
    #[serde(default)]
    name: String,
}

#[derive(Debug, Deserialize)]
struct LocationRecord {
    latitude: i32,
    longitude: i32,
}

impl From<FeatureRecord> for Feature {
    fn from(record: FeatureRecord) -> Self {
        Feature {
            name: record.name,
            location: Some(Point {
                latitude: record.location.latitude,
                longitude: record.location.longitude,
            }),
        }
    }
}

/// Read-only, ordered collection of named locations.
#[derive(Clone, Debug, Default)]
pub struct FeatureStore {
    features: Arc<[Feature]>,
}

impl FeatureStore {
    /// Loads the store from a JSON fixture on disk.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Load`] if the file cannot be opened or does not parse.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| Error::Load {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

        Self::from_reader(file).map_err(|e| match e {
            Error::Load { reason, .. } => Error::Load {
                path: path.display().to_string(),
                reason,
            },
            other => other,
        })
    }

    /// Parses the store from any byte source in the fixture format.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Load`] if the source is unreadable or malformed.
    pub fn from_reader(reader: impl Read) -> Result<Self> {
        let records: Vec<FeatureRecord> =
            serde_json::from_reader(reader).map_err(|e| Error::Load {
                path: "<reader>".to_string(),
                reason: e.to_string(),
            })?;

        Ok(Self::from_features(records.into_iter().map(Feature::from)))
    }

    pub fn from_features(features: impl IntoIterator<Item = Feature>) -> Self {
        Self {
            features: features.into_iter().collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Feature> {
        self.features.iter()
    }

    /// Returns the first feature located exactly at `point`.
    ///
    /// An unknown location is not an error: the result is a feature at that
    /// location with an empty name.
    pub fn lookup(&self, point: &Point) -> Feature {
        self.features
            .iter()
            .find(|f| f.location.as_ref() == Some(point))
            .cloned()
            .unwrap_or_else(|| Feature {
                name: String::new(),
                location: Some(*point),
            })
    }

    pub fn is_feature_location(&self, point: &Point) -> bool {
        self.features
            .iter()
            .any(|f| f.location.as_ref() == Some(point))
    }

    /// Lazily yields every stored feature inside `bounds`, in load order.
    ///
    /// Features with an empty name are yielded too. Features without a
    /// location never match.
    pub fn list_in_range<'a>(&'a self, bounds: &'a Bounds) -> impl Iterator<Item = &'a Feature> {
        self.features.iter().filter(move |f| {
            f.location
                .as_ref()
                .is_some_and(|location| bounds.contains(location))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURE: &str = r#"[
        {"location": {"latitude": 407838351, "longitude": -746143763}, "name": "Patriots Path, Mendham, NJ 07945, USA"},
        {"location": {"latitude": 408122808, "longitude": -743999179}, "name": "101 New Jersey 10, Whippany, NJ 07981, USA"},
        {"location": {"latitude": 404080723, "longitude": -746119569}, "name": ""},
        {"location": {"latitude": 378199220, "longitude": -1224782550}, "name": "Golden Gate Bridge"}
    ]"#;

    fn store() -> FeatureStore {
        FeatureStore::from_reader(FIXTURE.as_bytes()).unwrap()
    }

    #[test]
    fn loads_records_in_order() {
        let store = store();
        assert_eq!(store.len(), 4);
        let names: Vec<_> = store.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(
            names,
            [
                "Patriots Path, Mendham, NJ 07945, USA",
                "101 New Jersey 10, Whippany, NJ 07981, USA",
                "",
                "Golden Gate Bridge",
            ]
        );
    }

    #[test]
    fn rejects_malformed_source() {
        let err = FeatureStore::from_reader(&b"{ not json"[..]).unwrap_err();
        assert!(matches!(err, Error::Load { .. }));
    }

    #[test]
    fn reports_missing_file_path() {
        let err = FeatureStore::load("/definitely/not/here.json").unwrap_err();
        match err {
            Error::Load { path, .. } => assert_eq!(path, "/definitely/not/here.json"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn lookup_matches_exact_location() {
        let store = store();
        let gg = Point {
            latitude: 378_199_220,
            longitude: -1_224_782_550,
        };
        assert_eq!(store.lookup(&gg).name, "Golden Gate Bridge");

        let near = Point {
            latitude: 378_199_221,
            longitude: -1_224_782_550,
        };
        let missing = store.lookup(&near);
        assert!(missing.name.is_empty());
        assert_eq!(missing.location, Some(near));
    }

    #[test]
    fn list_in_range_keeps_order_and_empty_names() {
        let store = store();
        let bounds = Bounds::new(
            &Point {
                latitude: 400_000_000,
                longitude: -750_000_000,
            },
            &Point {
                latitude: 420_000_000,
                longitude: -730_000_000,
            },
        );

        let names: Vec<_> = store
            .list_in_range(&bounds)
            .map(|f| f.name.as_str())
            .collect();
        assert_eq!(
            names,
            [
                "Patriots Path, Mendham, NJ 07945, USA",
                "101 New Jersey 10, Whippany, NJ 07981, USA",
                "",
            ]
        );

        // Each call starts over.
        assert_eq!(store.list_in_range(&bounds).count(), 3);
    }

    #[test]
    fn list_in_range_can_be_empty() {
        let store = store();
        let bounds = Bounds::new(
            &Point {
                latitude: -10,
                longitude: -10,
            },
            &Point {
                latitude: 10,
                longitude: 10,
            },
        );
        assert_eq!(store.list_in_range(&bounds).count(), 0);
    }

    #[test]
    fn stored_locations_are_plain_hashable_values() {
        use std::collections::HashSet;

        let store = store();
        let locations: HashSet<Point> = store.iter().filter_map(|f| f.location).collect();
        assert_eq!(locations.len(), store.len());

        for point in &locations {
            assert!(store.is_feature_location(point));
            assert_eq!(store.lookup(point).location, Some(*point));
        }
    }
}
