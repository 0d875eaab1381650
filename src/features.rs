//! Feature encoding of pings for similarity search.
//!
//! A ping becomes a 5-D vector
//!
//! ```text
//! [minute_of_day * 10, weekday * 1000, lat * 1e5, lng * 1e5, accuracy]
//! ```
//!
//! so that Euclidean distance mixes time of day, day of week and position on
//! comparable scales: 1e-5 degrees is roughly a meter, a minute of day is worth
//! ten of those, and a weekday difference outweighs most time-of-day
//! differences. The weights are fixed; historical distances are only
//! comparable if they are reproduced exactly.

use chrono::{DateTime, Datelike, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};

use crate::Ping;

/// Number of dimensions of a [`FeatureVector`].
pub const FEATURE_DIMENSIONS: usize = 5;

/// Weights applied to each feature.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureWeights {
    /// Multiplier for minute of day (0..1440). Default: 10
    pub minute_of_day: f64,
    /// Multiplier for weekday (Monday = 0). Default: 1000
    pub weekday: f64,
    /// Multiplier for latitude and longitude. Default: 100000
    pub coordinate: f64,
    /// Value used when accuracy is unknown. Default: 0
    pub accuracy_placeholder: f64,
    /// Offset added to timestamps before calendar decomposition. Default: 0
    /// (timestamps are already entity-local wall clock).
    pub utc_offset_seconds: i64,
}

impl Default for FeatureWeights {
    fn default() -> Self {
        Self {
            minute_of_day: 10.0,
            weekday: 1000.0,
            coordinate: 100_000.0,
            accuracy_placeholder: 0.0,
            utc_offset_seconds: 0,
        }
    }
}

/// A weighted feature vector.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector(pub [f64; FEATURE_DIMENSIONS]);

impl FeatureVector {
    pub fn as_array(&self) -> &[f64; FEATURE_DIMENSIONS] {
        &self.0
    }

    /// Squared Euclidean distance.
    pub fn distance_2(&self, other: &FeatureVector) -> f64 {
        self.0
            .iter()
            .zip(other.0.iter())
            .map(|(a, b)| (a - b) * (a - b))
            .sum()
    }

    /// Euclidean distance.
    pub fn distance(&self, other: &FeatureVector) -> f64 {
        self.distance_2(other).sqrt()
    }
}

/// Encodes pings into [`FeatureVector`]s.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FeatureEncoder {
    weights: FeatureWeights,
}

impl FeatureEncoder {
    pub fn new(weights: FeatureWeights) -> Self {
        Self { weights }
    }

    pub fn weights(&self) -> &FeatureWeights {
        &self.weights
    }

    /// Local calendar time of a timestamp.
    ///
    /// Out-of-range timestamps clamp to the Unix epoch.
    pub fn local_time(&self, timestamp: i64) -> NaiveDateTime {
        DateTime::from_timestamp(
            timestamp.saturating_add(self.weights.utc_offset_seconds),
            0,
        )
        .unwrap_or_default()
        .naive_utc()
    }

    pub fn encode(&self, ping: &Ping) -> FeatureVector {
        let w = &self.weights;
        let local = self.local_time(ping.timestamp);
        let minute_of_day = f64::from(local.hour() * 60 + local.minute());
        let weekday = f64::from(local.weekday().num_days_from_monday());

        FeatureVector([
            minute_of_day * w.minute_of_day,
            weekday * w.weekday,
            ping.latitude * w.coordinate,
            ping.longitude * w.coordinate,
            ping.accuracy.map(f64::from).unwrap_or(w.accuracy_placeholder),
        ])
    }

    /// Encode a whole corpus, preserving order.
    pub fn encode_all(&self, pings: &[Ping]) -> Vec<FeatureVector> {
        #[cfg(feature = "parallel")]
        {
            use rayon::prelude::*;
            pings.par_iter().map(|p| self.encode(p)).collect()
        }
        #[cfg(not(feature = "parallel"))]
        {
            pings.iter().map(|p| self.encode(p)).collect()
        }
    }
}
