//! Tests for venue module

use std::cell::Cell;
use trailcast::venue::describe_venue;
use trailcast::{
    CoordinateLookup, FeatureEncoder, FeatureWeights, GeoPoint, Ping, TrailError, Venue,
    VenueLookup, describe_point,
};

// Thursday 2015-05-07 12:40:36 UTC
const THURSDAY: i64 = 1_431_002_436;

/// Lookup with a fixed answer that counts how often it was asked.
struct FixedLookup {
    venue: Venue,
    calls: Cell<usize>,
}

impl FixedLookup {
    fn new(name: &str, confident: bool) -> Self {
        Self {
            venue: Venue {
                name: name.to_string(),
                confident,
            },
            calls: Cell::new(0),
        }
    }
}

impl VenueLookup for FixedLookup {
    fn lookup(&self, _location: &GeoPoint) -> trailcast::Result<Venue> {
        self.calls.set(self.calls.get() + 1);
        Ok(self.venue.clone())
    }
}

struct FailingLookup;

impl VenueLookup for FailingLookup {
    fn lookup(&self, _location: &GeoPoint) -> trailcast::Result<Venue> {
        Err(TrailError::VenueLookup("service unavailable".to_string()))
    }
}

#[test]
fn test_coordinate_lookup_names_by_position() {
    let venue = CoordinateLookup
        .lookup(&GeoPoint::new(41.0029563, -74.0784164))
        .unwrap();
    assert_eq!(venue.name, "41.0030,-74.0784");
    assert!(venue.confident);
}

#[test]
fn test_describe_venue_confident() {
    let venue = Venue {
        name: "Office".to_string(),
        confident: true,
    };
    let text = describe_venue(&venue, &GeoPoint::new(40.7240291, -73.9973741));
    assert_eq!(text, "Office (40.724029, -73.997374)");
}

#[test]
fn test_describe_venue_low_confidence() {
    let venue = Venue {
        name: "Somewhere".to_string(),
        confident: false,
    };
    let text = describe_venue(&venue, &GeoPoint::new(41.0, -74.0));
    assert_eq!(text, "Somewhere (41.000000, -74.000000) (low confidence)");
}

#[test]
fn test_describe_point_format() {
    let lookup = FixedLookup::new("Home", true);
    let ping = Ping::new(THURSDAY, 41.0029563, -74.0784164, Some(30));
    let text = describe_point(&ping, &lookup, &FeatureEncoder::default()).unwrap();

    assert_eq!(
        text,
        "Thu May 07, 2015 12:40 PM at Home (41.002956, -74.078416)"
    );
    assert_eq!(lookup.calls.get(), 1);
}

#[test]
fn test_describe_point_applies_utc_offset() {
    let encoder = FeatureEncoder::new(FeatureWeights {
        utc_offset_seconds: -4 * 3600,
        ..FeatureWeights::default()
    });
    let ping = Ping::new(THURSDAY, 41.0, -74.0, None);
    let text = describe_point(&ping, &CoordinateLookup, &encoder).unwrap();

    assert!(text.starts_with("Thu May 07, 2015 08:40 AM at "));
}

#[test]
fn test_describe_point_propagates_lookup_failure() {
    let ping = Ping::new(THURSDAY, 41.0, -74.0, None);
    let result = describe_point(&ping, &FailingLookup, &FeatureEncoder::default());

    match result {
        Err(TrailError::VenueLookup(reason)) => assert_eq!(reason, "service unavailable"),
        other => panic!("expected lookup failure, got {:?}", other),
    }
}
