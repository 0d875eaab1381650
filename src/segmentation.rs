//! Commute extraction.
//!
//! A commute is the stretch of a day's trail between leaving the origin's
//! proximity radius and first entering the destination's. Extraction is a
//! small state machine driven point by point:
//!
//! ```text
//! NotStarted --near(origin)--> AtOrigin --!near(origin)--> InTransit --near(dest)--> Arrived
//! ```
//!
//! The point that leaves the origin opens the segment, the first point near
//! the destination closes it, and nothing after that is inspected. If the
//! trail ends before `Arrived`, there is no commute and nothing partial is
//! returned.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::geo_utils::{self, DEFAULT_SLACK};
use crate::{Anchor, GeoPoint, Ping, Trail};

/// Anchors and proximity radius for commute extraction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommuteConfig {
    pub home: Anchor,
    pub work: Anchor,
    /// Proximity radius in degrees shared by both anchors. Default: 0.005 (~500m)
    pub slack: f64,
}

impl Default for CommuteConfig {
    fn default() -> Self {
        Self {
            home: GeoPoint::new(41.0030105, -74.0785889),
            work: GeoPoint::new(40.7240291, -73.9973741),
            slack: DEFAULT_SLACK,
        }
    }
}

/// Segmenter state while walking a trail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SegmentState {
    /// Origin not visited yet.
    NotStarted,
    /// Inside the origin's radius.
    AtOrigin,
    /// Left the origin, destination not reached.
    InTransit,
    /// Reached the destination. Terminal.
    Arrived,
}

impl SegmentState {
    /// Whether a point seen in this state belongs to the segment.
    pub fn collects(self) -> bool {
        matches!(self, SegmentState::InTransit | SegmentState::Arrived)
    }
}

/// A non-empty run of pings from leaving the origin to reaching the destination.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommuteSegment {
    pub entity_key: String,
    pub points: Vec<Ping>,
}

impl CommuteSegment {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Always false for segments produced by [`CommuteSegmenter`].
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// The "left origin" ping.
    pub fn departure(&self) -> Option<&Ping> {
        self.points.first()
    }

    /// The first ping inside the destination radius.
    pub fn arrival(&self) -> Option<&Ping> {
        self.points.last()
    }

    /// Seconds between departure and arrival.
    pub fn duration_seconds(&self) -> i64 {
        match (self.departure(), self.arrival()) {
            (Some(d), Some(a)) => a.timestamp - d.timestamp,
            _ => 0,
        }
    }

    /// Haversine length of the segment in meters.
    pub fn length_meters(&self) -> f64 {
        geo_utils::path_length_meters(&self.points)
    }
}

/// Extracts commute segments using a fixed proximity radius.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CommuteSegmenter {
    slack: f64,
}

impl Default for CommuteSegmenter {
    fn default() -> Self {
        Self::new(DEFAULT_SLACK)
    }
}

impl CommuteSegmenter {
    /// Create a segmenter with the given proximity radius in degrees.
    pub fn new(slack: f64) -> Self {
        Self { slack }
    }

    pub fn from_config(config: &CommuteConfig) -> Self {
        Self::new(config.slack)
    }

    pub fn slack(&self) -> f64 {
        self.slack
    }

    /// Advance the state machine by one point.
    pub fn step(
        &self,
        state: SegmentState,
        point: &GeoPoint,
        origin: &Anchor,
        destination: &Anchor,
    ) -> SegmentState {
        match state {
            SegmentState::NotStarted if geo_utils::near(point, origin, self.slack) => {
                SegmentState::AtOrigin
            }
            SegmentState::AtOrigin if !geo_utils::near(point, origin, self.slack) => {
                SegmentState::InTransit
            }
            SegmentState::InTransit if geo_utils::near(point, destination, self.slack) => {
                SegmentState::Arrived
            }
            other => other,
        }
    }

    /// Extract the commute from `origin` to `destination`, if the trail has one.
    ///
    /// The departure point itself is never checked against the destination;
    /// arrival can only happen on a later point.
    pub fn commute(
        &self,
        trail: &Trail,
        origin: &Anchor,
        destination: &Anchor,
    ) -> Option<CommuteSegment> {
        let mut state = SegmentState::NotStarted;
        let mut points = Vec::new();

        for ping in trail.points() {
            state = self.step(state, &ping.location(), origin, destination);

            if state.collects() {
                points.push(*ping);
            }
            if state == SegmentState::Arrived {
                break;
            }
        }

        if state == SegmentState::Arrived {
            Some(CommuteSegment {
                entity_key: trail.entity_key().to_string(),
                points,
            })
        } else {
            debug!(
                "[Segmenter] {}: no commute (ended in {:?})",
                trail.entity_key(),
                state
            );
            None
        }
    }

    /// Extract commutes from every trail, keeping only those that have one.
    ///
    /// Output order follows input order.
    pub fn all_commutes<'a>(
        &self,
        trails: impl IntoIterator<Item = &'a Trail>,
        origin: &Anchor,
        destination: &Anchor,
    ) -> Vec<CommuteSegment> {
        trails
            .into_iter()
            .filter_map(|trail| self.commute(trail, origin, destination))
            .collect()
    }
}

/// Extract commutes from every trail in parallel.
///
/// Same result, in the same order, as [`CommuteSegmenter::all_commutes`].
#[cfg(feature = "parallel")]
pub fn all_commutes_parallel(
    segmenter: &CommuteSegmenter,
    trails: &[&Trail],
    origin: &Anchor,
    destination: &Anchor,
) -> Vec<CommuteSegment> {
    use rayon::prelude::*;

    trails
        .par_iter()
        .filter_map(|trail| segmenter.commute(trail, origin, destination))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_transitions() {
        let seg = CommuteSegmenter::new(0.005);
        let origin = GeoPoint::new(0.0, 0.0);
        let dest = GeoPoint::new(1.0, 1.0);
        let far = GeoPoint::new(0.5, 0.5);

        assert_eq!(
            seg.step(SegmentState::NotStarted, &far, &origin, &dest),
            SegmentState::NotStarted
        );
        assert_eq!(
            seg.step(SegmentState::NotStarted, &origin, &origin, &dest),
            SegmentState::AtOrigin
        );
        assert_eq!(
            seg.step(SegmentState::AtOrigin, &origin, &origin, &dest),
            SegmentState::AtOrigin
        );
        assert_eq!(
            seg.step(SegmentState::AtOrigin, &far, &origin, &dest),
            SegmentState::InTransit
        );
        assert_eq!(
            seg.step(SegmentState::InTransit, &far, &origin, &dest),
            SegmentState::InTransit
        );
        assert_eq!(
            seg.step(SegmentState::InTransit, &dest, &origin, &dest),
            SegmentState::Arrived
        );
        assert_eq!(
            seg.step(SegmentState::Arrived, &far, &origin, &dest),
            SegmentState::Arrived
        );
    }
}
