//! Synthetic commute-day generator for stress testing and benchmarking.
//!
//! Generates one trail per day: a dwell at home, a noisy straight-ish drive
//! to work, a dwell at work, and the drive back. A configurable fraction of
//! days gets an injected GPS jump so validation has something to reject.
//!
//! Feature-gated behind `synthetic`; not included in production builds.
//!
//! # Example
//!
//! ```rust
//! use trailcast::synthetic::CommuteScenario;
//!
//! let scenario = CommuteScenario::standard();
//! let dataset = scenario.generate();
//! assert_eq!(dataset.trails.len(), scenario.days);
//! ```

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::f64::consts::PI;

use crate::geo_utils::meters_to_degrees;
use crate::{GeoPoint, Ping, Trail};

/// Meters per degree of latitude (approximately constant).
const METERS_PER_DEG_LAT: f64 = 111_320.0;

/// Seconds in a day.
const DAY: i64 = 86_400;

/// Scenario configuration for generating synthetic commute days.
#[derive(Debug, Clone)]
pub struct CommuteScenario {
    pub home: GeoPoint,
    pub work: GeoPoint,
    /// Number of days (one trail each).
    pub days: usize,
    /// Pings per commute leg.
    pub points_per_leg: usize,
    /// Pings while dwelling at each anchor.
    pub dwell_points: usize,
    /// Seconds between consecutive pings.
    pub sample_interval: i64,
    /// Unix time of midnight of the first day.
    pub start_timestamp: i64,
    /// GPS noise standard deviation in meters.
    pub gps_noise_sigma_meters: f64,
    /// Fraction of days (0.0-1.0) with an injected jump.
    pub jump_fraction: f64,
    /// RNG seed for deterministic reproduction.
    pub seed: u64,
}

/// A generated dataset with ground truth.
#[derive(Debug, Clone)]
pub struct SyntheticCommutes {
    pub trails: Vec<Trail>,
    /// Entity keys of days that had a jump injected.
    pub jump_days: Vec<String>,
}

impl SyntheticCommutes {
    /// Render as tab-separated loader input, with a header line.
    pub fn to_tsv(&self) -> String {
        let mut out = String::from("dt\ttimestamp\tlat\tlng\tllacc\n");
        for trail in &self.trails {
            for p in trail.points() {
                let acc = p
                    .accuracy
                    .map(|a| a.to_string())
                    .unwrap_or_else(|| "\\N".to_string());
                out.push_str(&format!(
                    "{}\t{}\t{:.7}\t{:.7}\t{}\n",
                    trail.entity_key(),
                    p.timestamp * 1000,
                    p.latitude,
                    p.longitude,
                    acc
                ));
            }
        }
        out
    }

    /// All pings of all days, chronologically.
    pub fn flattened(&self) -> Vec<Ping> {
        let mut all: Vec<Ping> = self
            .trails
            .iter()
            .flat_map(|t| t.points().iter().copied())
            .collect();
        all.sort_by_key(|p| p.timestamp);
        all
    }

    pub fn total_points(&self) -> usize {
        self.trails.iter().map(Trail::len).sum()
    }
}

/// Add Gaussian GPS noise to a coordinate (Box-Muller).
fn add_gps_noise(p: GeoPoint, sigma_meters: f64, rng: &mut StdRng) -> GeoPoint {
    if sigma_meters <= 0.0 {
        return p;
    }
    let u1: f64 = rng.gen_range(0.0001..1.0);
    let u2: f64 = rng.r#gen();
    let z0 = (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos();
    let z1 = (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).sin();
    GeoPoint::new(
        p.latitude + z0 * sigma_meters / METERS_PER_DEG_LAT,
        p.longitude + meters_to_degrees(z1 * sigma_meters, p.latitude),
    )
}

impl CommuteScenario {
    /// Two weeks of weekday commutes between the reference anchors.
    pub fn standard() -> Self {
        Self {
            home: GeoPoint::new(41.0030105, -74.0785889),
            work: GeoPoint::new(40.7240291, -73.9973741),
            days: 14,
            points_per_leg: 60,
            dwell_points: 5,
            sample_interval: 60,
            // Monday 2015-05-04 00:00 UTC
            start_timestamp: 1_430_697_600,
            gps_noise_sigma_meters: 15.0,
            jump_fraction: 0.0,
            seed: 42,
        }
    }

    /// A year of days, for stress benches.
    pub fn year() -> Self {
        Self {
            days: 365,
            jump_fraction: 0.1,
            ..Self::standard()
        }
    }

    /// Generate the dataset.
    pub fn generate(&self) -> SyntheticCommutes {
        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut trails = Vec::with_capacity(self.days);
        let mut jump_days = Vec::new();

        for day in 0..self.days {
            let key = format!("synth-{:04}", day);
            let midnight = self.start_timestamp + day as i64 * DAY;
            let inject_jump = rng.r#gen::<f64>() < self.jump_fraction;

            let mut points = Vec::new();
            // Leave home around 07:30, work around 17:30
            let mut t = midnight + 7 * 3600 + 30 * 60 + rng.gen_range(-900..900);
            self.emit_dwell(self.home, &mut t, &mut points, &mut rng);
            self.emit_leg(self.home, self.work, &mut t, &mut points, &mut rng);
            self.emit_dwell(self.work, &mut t, &mut points, &mut rng);

            let mut t = midnight + 17 * 3600 + 30 * 60 + rng.gen_range(-900..900);
            self.emit_dwell(self.work, &mut t, &mut points, &mut rng);
            self.emit_leg(self.work, self.home, &mut t, &mut points, &mut rng);
            self.emit_dwell(self.home, &mut t, &mut points, &mut rng);

            if inject_jump && points.len() > 2 {
                let i = self.dwell_points + self.points_per_leg / 2;
                if let Some(p) = points.get_mut(i) {
                    p.latitude += 0.2;
                }
                jump_days.push(key.clone());
            }

            trails.push(Trail::new(key, points));
        }

        SyntheticCommutes { trails, jump_days }
    }

    fn emit_dwell(&self, at: GeoPoint, t: &mut i64, out: &mut Vec<Ping>, rng: &mut StdRng) {
        for _ in 0..self.dwell_points {
            let p = add_gps_noise(at, self.gps_noise_sigma_meters, rng);
            out.push(Ping::new(*t, p.latitude, p.longitude, Some(rng.gen_range(5..50))));
            *t += self.sample_interval;
        }
    }

    fn emit_leg(
        &self,
        from: GeoPoint,
        to: GeoPoint,
        t: &mut i64,
        out: &mut Vec<Ping>,
        rng: &mut StdRng,
    ) {
        let n = self.points_per_leg.max(2);
        for i in 1..=n {
            let f = i as f64 / n as f64;
            let base = GeoPoint::new(
                from.latitude + (to.latitude - from.latitude) * f,
                from.longitude + (to.longitude - from.longitude) * f,
            );
            let p = add_gps_noise(base, self.gps_noise_sigma_meters, rng);
            let accuracy = if rng.gen_bool(0.1) {
                None
            } else {
                Some(rng.gen_range(5..100))
            };
            out.push(Ping::new(*t, p.latitude, p.longitude, accuracy));
            *t += self.sample_interval;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_generation() {
        let scenario = CommuteScenario::standard();
        let dataset = scenario.generate();

        assert_eq!(dataset.trails.len(), 14);
        assert!(dataset.jump_days.is_empty());
        let per_day = 4 * scenario.dwell_points + 2 * scenario.points_per_leg;
        assert_eq!(dataset.total_points(), 14 * per_day);
    }

    #[test]
    fn test_deterministic_generation() {
        let a = CommuteScenario::standard().generate();
        let b = CommuteScenario::standard().generate();
        assert_eq!(a.trails, b.trails);
        assert_eq!(a.to_tsv(), b.to_tsv());
    }

    #[test]
    fn test_tsv_has_header() {
        let dataset = CommuteScenario::standard().generate();
        let tsv = dataset.to_tsv();
        assert!(tsv.starts_with("dt\t"));
        assert_eq!(tsv.lines().count(), dataset.total_points() + 1);
    }
}
