//! # Trailcast
//!
//! Batch analysis of daily GPS ping trails.
//!
//! This library provides:
//! - Trail loading from tab-separated ping dumps (grouping, dedup, sorting)
//! - Commute extraction between two fixed anchors (HOME/WORK state machine)
//! - Validation of morning/evening commute pairs (jump and exclusion-zone checks)
//! - Feature encoding of pings into a weighted time/place metric space
//! - k-nearest-neighbor retrieval and future-location extrapolation
//!
//! ## Features
//!
//! - **`parallel`** - Enable per-trail parallel processing with rayon
//! - **`http`** - Enable the Foursquare venue lookup client
//! - **`synthetic`** - Enable the synthetic commute generator (benches, stress tests)
//! - **`cli`** - Build the `trailcast-cli` binary
//!
//! ## Quick Start
//!
//! ```rust
//! use trailcast::{CommuteSegmenter, GeoPoint, Ping, Trail};
//!
//! let home = GeoPoint::new(41.0030, -74.0786);
//! let work = GeoPoint::new(40.7240, -73.9974);
//!
//! let trail = Trail::new(
//!     "2014-04-16",
//!     vec![
//!         Ping::new(0, 41.0030, -74.0786, Some(20)),
//!         Ping::new(60, 40.9000, -74.0500, None),
//!         Ping::new(120, 40.7240, -73.9974, Some(10)),
//!     ],
//! );
//!
//! let segmenter = CommuteSegmenter::new(0.005);
//! let commute = segmenter.commute(&trail, &home, &work).unwrap();
//! assert_eq!(commute.len(), 2);
//! ```

use serde::{Deserialize, Serialize};

// Unified error handling
pub mod error;
pub use error::{OptionExt, Result, TrailError};

// Proximity primitives and geographic helpers
pub mod geo_utils;
pub use geo_utils::{distance, near};

// Raw ping ingestion
pub mod loader;
pub use loader::{LoadOptions, LoadStats, TrailCorpus, load_points, load_trails};

// Commute extraction state machine
pub mod segmentation;
#[cfg(feature = "parallel")]
pub use segmentation::all_commutes_parallel;
pub use segmentation::{CommuteConfig, CommuteSegment, CommuteSegmenter, SegmentState};

// Morning/evening pairing and jump/exclusion checks
pub mod validation;
#[cfg(feature = "parallel")]
pub use validation::commute_days_parallel;
pub use validation::{
    CommuteDay, ExclusionZone, TrajectoryValidator, ValidationConfig, Violation, commute_days,
};

// Commute file output and the end-to-end pipeline
pub mod export;
pub use export::{PipelineConfig, PipelineReport, run_commute_pipeline, write_commute_points};

// Weighted time/place encoding
pub mod features;
pub use features::{FEATURE_DIMENSIONS, FeatureEncoder, FeatureVector, FeatureWeights};

// Nearest-neighbor model and future-point extrapolation
pub mod predictor;
pub use predictor::{
    FuturePoint, Neighbor, NeighborModel, Prediction, PredictorConfig, get_future_point,
    get_future_trail,
};

// Venue lookup collaborator boundary
pub mod venue;
#[cfg(feature = "http")]
pub use venue::FoursquareLookup;
pub use venue::{CoordinateLookup, Venue, VenueLookup, describe_point};

// Synthetic commute generator
#[cfg(feature = "synthetic")]
pub mod synthetic;

// ============================================================================
// Core Types
// ============================================================================

/// A coordinate pair in degrees.
///
/// # Example
/// ```
/// use trailcast::GeoPoint;
/// let point = GeoPoint::new(40.7240, -73.9974); // Manhattan
/// assert!(point.is_valid());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Check if the point has valid coordinates.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && self.latitude >= -90.0
            && self.latitude <= 90.0
            && self.longitude >= -180.0
            && self.longitude <= 180.0
    }
}

/// A fixed reference location (home, work, ...).
///
/// All anchors in a run share one proximity radius, carried by
/// [`CommuteConfig::slack`] rather than by the anchor itself.
pub type Anchor = GeoPoint;

/// A single location ping.
///
/// `timestamp` is entity-local wall-clock seconds. `accuracy` is the reported
/// horizontal accuracy in meters, `None` when the source marked it unknown.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Ping {
    pub timestamp: i64,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accuracy: Option<i32>,
}

impl Ping {
    pub fn new(timestamp: i64, latitude: f64, longitude: f64, accuracy: Option<i32>) -> Self {
        Self {
            timestamp,
            latitude,
            longitude,
            accuracy,
        }
    }

    /// The ping's position.
    pub fn location(&self) -> GeoPoint {
        GeoPoint::new(self.latitude, self.longitude)
    }
}

/// One entity's pings, sorted ascending by timestamp.
///
/// A trail is built once and never mutated afterwards; the points are only
/// reachable through shared slices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trail {
    entity_key: String,
    points: Vec<Ping>,
}

impl Trail {
    /// Create a trail, sorting the points by timestamp.
    ///
    /// The sort is stable, so pings with equal timestamps keep their input order.
    /// Deduplication is the loader's job and is not repeated here.
    pub fn new(entity_key: impl Into<String>, mut points: Vec<Ping>) -> Self {
        points.sort_by_key(|p| p.timestamp);
        Self {
            entity_key: entity_key.into(),
            points,
        }
    }

    pub fn entity_key(&self) -> &str {
        &self.entity_key
    }

    pub fn points(&self) -> &[Ping] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Timestamp of the earliest ping, if any.
    pub fn start_time(&self) -> Option<i64> {
        self.points.first().map(|p| p.timestamp)
    }

    /// Bounding box of all pings.
    pub fn bounds(&self) -> Option<Bounds> {
        Bounds::from_pings(&self.points)
    }

    /// Consume the trail, returning its sorted points.
    pub fn into_points(self) -> Vec<Ping> {
        self.points
    }
}

/// Bounding box in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lng: f64,
    pub max_lng: f64,
}

impl Bounds {
    /// Create bounds from pings.
    pub fn from_pings(points: &[Ping]) -> Option<Self> {
        if points.is_empty() {
            return None;
        }
        let mut min_lat = f64::MAX;
        let mut max_lat = f64::MIN;
        let mut min_lng = f64::MAX;
        let mut max_lng = f64::MIN;

        for p in points {
            min_lat = min_lat.min(p.latitude);
            max_lat = max_lat.max(p.latitude);
            min_lng = min_lng.min(p.longitude);
            max_lng = max_lng.max(p.longitude);
        }

        Some(Self {
            min_lat,
            max_lat,
            min_lng,
            max_lng,
        })
    }

    /// Smallest bounds covering both.
    pub fn merge(&self, other: &Bounds) -> Bounds {
        Bounds {
            min_lat: self.min_lat.min(other.min_lat),
            max_lat: self.max_lat.max(other.max_lat),
            min_lng: self.min_lng.min(other.min_lng),
            max_lng: self.max_lng.max(other.max_lng),
        }
    }

    /// Get the center point of the bounds.
    pub fn center(&self) -> GeoPoint {
        GeoPoint::new(
            (self.min_lat + self.max_lat) / 2.0,
            (self.min_lng + self.max_lng) / 2.0,
        )
    }
}
