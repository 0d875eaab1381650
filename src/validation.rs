//! Commute-day pairing and plausibility checks.
//!
//! A commute day is one trail that yields both a HOME->WORK and a WORK->HOME
//! segment. The concatenation morning ++ evening is then scanned from its
//! second point onwards; a day is rejected outright if any step jumps farther
//! than [`ValidationConfig::max_jump`] or any point lands inside an exclusion
//! zone (known GPS noise clusters). One violation rejects the whole day.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::geo_utils;
use crate::segmentation::{CommuteConfig, CommuteSegment, CommuteSegmenter};
use crate::{GeoPoint, Ping, Trail};

/// A circular zone whose points are treated as noise.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExclusionZone {
    pub center: GeoPoint,
    /// Radius in degrees.
    pub radius: f64,
}

impl ExclusionZone {
    pub fn new(center: GeoPoint, radius: f64) -> Self {
        Self { center, radius }
    }

    pub fn contains(&self, point: &GeoPoint) -> bool {
        geo_utils::distance(&self.center, point) < self.radius
    }
}

/// Thresholds for trajectory validation.
///
/// The defaults were tuned by hand against one commuter's history and carry
/// no general geofencing meaning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Maximum displacement between consecutive points, in degrees. Default: 0.05
    pub max_jump: f64,
    /// Zones whose points invalidate a day.
    pub exclusion_zones: Vec<ExclusionZone>,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            max_jump: 0.05,
            exclusion_zones: vec![
                ExclusionZone::new(GeoPoint::new(40.868024, -74.154092), 0.01),
                ExclusionZone::new(GeoPoint::new(40.846178, -73.943481), 0.01),
            ],
        }
    }
}

/// Why a commute day was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Violation {
    /// Point `index` is more than `max_jump` away from its predecessor.
    Jump { index: usize, distance: f64 },
    /// Point `index` lies inside exclusion zone `zone`.
    ExclusionZone { index: usize, zone: usize },
}

impl Violation {
    /// Index of the offending point in the concatenated day.
    pub fn index(&self) -> usize {
        match self {
            Violation::Jump { index, .. } | Violation::ExclusionZone { index, .. } => *index,
        }
    }
}

/// A trail that produced both a morning and an evening commute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommuteDay {
    pub entity_key: String,
    pub morning: CommuteSegment,
    pub evening: CommuteSegment,
}

impl CommuteDay {
    /// Morning points followed by evening points.
    pub fn points(&self) -> impl Iterator<Item = &Ping> {
        self.morning.points.iter().chain(self.evening.points.iter())
    }

    pub fn len(&self) -> usize {
        self.morning.len() + self.evening.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Checks concatenated commute days against a [`ValidationConfig`].
#[derive(Debug, Clone, Default)]
pub struct TrajectoryValidator {
    config: ValidationConfig,
}

impl TrajectoryValidator {
    pub fn new(config: ValidationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ValidationConfig {
        &self.config
    }

    /// First violation in a point sequence, if any.
    ///
    /// The first point is neither jump-checked nor zone-checked.
    pub fn first_violation<'a>(
        &self,
        points: impl IntoIterator<Item = &'a Ping>,
    ) -> Option<Violation> {
        let mut previous: Option<GeoPoint> = None;

        for (index, ping) in points.into_iter().enumerate() {
            let here = ping.location();
            let Some(prev) = previous.replace(here) else {
                continue;
            };

            let step = geo_utils::distance(&here, &prev);
            if step > self.config.max_jump {
                return Some(Violation::Jump {
                    index,
                    distance: step,
                });
            }
            if let Some(zone) = self
                .config
                .exclusion_zones
                .iter()
                .position(|z| z.contains(&here))
            {
                return Some(Violation::ExclusionZone { index, zone });
            }
        }

        None
    }

    /// Validate a morning/evening pair as one concatenated sequence.
    pub fn validate_pair(
        &self,
        morning: &CommuteSegment,
        evening: &CommuteSegment,
    ) -> Result<(), Violation> {
        match self.first_violation(morning.points.iter().chain(evening.points.iter())) {
            Some(v) => Err(v),
            None => Ok(()),
        }
    }

    /// Whether a commute day passes validation.
    pub fn is_valid(&self, day: &CommuteDay) -> bool {
        match self.validate_pair(&day.morning, &day.evening) {
            Ok(()) => true,
            Err(v) => {
                debug!("[Validator] {}: day excluded ({:?})", day.entity_key, v);
                false
            }
        }
    }

    /// Keep only the days that pass validation, preserving order.
    pub fn retain_valid(&self, days: Vec<CommuteDay>) -> Vec<CommuteDay> {
        days.into_iter().filter(|d| self.is_valid(d)).collect()
    }
}

/// Pair a trail's morning (home->work) and evening (work->home) commutes.
///
/// Both directions are searched over the whole trail independently.
pub fn commute_day(
    segmenter: &CommuteSegmenter,
    trail: &Trail,
    config: &CommuteConfig,
) -> Option<CommuteDay> {
    let morning = segmenter.commute(trail, &config.home, &config.work)?;
    let evening = segmenter.commute(trail, &config.work, &config.home)?;
    Some(CommuteDay {
        entity_key: trail.entity_key().to_string(),
        morning,
        evening,
    })
}

/// Build commute days for every trail that has both commutes, in input order.
pub fn commute_days<'a>(
    trails: impl IntoIterator<Item = &'a Trail>,
    config: &CommuteConfig,
) -> Vec<CommuteDay> {
    let segmenter = CommuteSegmenter::from_config(config);
    trails
        .into_iter()
        .filter_map(|trail| commute_day(&segmenter, trail, config))
        .collect()
}

/// Parallel version of [`commute_days`]; output order matches input order.
#[cfg(feature = "parallel")]
pub fn commute_days_parallel(trails: &[&Trail], config: &CommuteConfig) -> Vec<CommuteDay> {
    use rayon::prelude::*;

    let segmenter = CommuteSegmenter::from_config(config);
    trails
        .par_iter()
        .filter_map(|trail| commute_day(&segmenter, trail, config))
        .collect()
}
