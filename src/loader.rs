//! Trail loading from tab-separated ping dumps.
//!
//! Each line is `entityKey \t timestamp_ms \t lat \t lng \t accuracy`. A line
//! whose key is the literal `dt` is a header and is skipped. An accuracy that
//! is not an integer (the dump writes `\N` for unknown) becomes `None`.
//! Coordinates must be finite and within WGS84 range.
//!
//! Timestamps are truncated to whole seconds before deduplication, so two
//! records less than a second apart count as the same moment.
//!
//! Two loaders are provided:
//! - [`load_trails`] groups pings per entity key, dropping repeated timestamps
//!   within an entity (first occurrence wins). No cap.
//! - [`load_points`] flattens everything into one sorted sequence for the
//!   predictor, dropping repeated timestamps globally and stopping once
//!   [`LoadOptions::limit`] distinct timestamps have been read.

use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::error::{Result, TrailError};
use crate::{GeoPoint, Ping, Trail};

/// Entity key that marks a header line.
pub const HEADER_KEY: &str = "dt";

/// Reference record cap for the predictor's single-trail loader.
pub const DEFAULT_LIMIT: usize = 1_000_000;

/// Options for [`load_points`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadOptions {
    /// Stop after this many distinct timestamps. `None` reads everything.
    pub limit: Option<usize>,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            limit: Some(DEFAULT_LIMIT),
        }
    }
}

/// Counters collected while loading.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadStats {
    pub lines_read: usize,
    pub headers_skipped: usize,
    pub blank_skipped: usize,
    pub malformed_skipped: usize,
    pub duplicates_dropped: usize,
    pub pings_loaded: usize,
}

/// One parsed input line.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecord {
    pub entity_key: String,
    pub timestamp_ms: i64,
    pub latitude: f64,
    pub longitude: f64,
    pub accuracy: Option<i32>,
}

impl RawRecord {
    /// Timestamp in whole seconds.
    pub fn timestamp(&self) -> i64 {
        self.timestamp_ms.div_euclid(1000)
    }

    /// Convert to a ping with a timestamp in whole seconds.
    pub fn to_ping(&self) -> Ping {
        Ping::new(
            self.timestamp(),
            self.latitude,
            self.longitude,
            self.accuracy,
        )
    }
}

/// Parse one tab-separated line.
///
/// Returns `Ok(None)` for header and blank lines, and a
/// [`TrailError::Parse`] when a required field is missing, not numeric, or a
/// coordinate is not a valid position.
pub fn parse_line(line: &str, line_number: usize) -> Result<Option<RawRecord>> {
    let line = line.trim_end_matches(['\r', '\n']);
    if line.trim().is_empty() {
        return Ok(None);
    }

    let fields: Vec<&str> = line.split('\t').collect();
    if fields[0] == HEADER_KEY {
        return Ok(None);
    }
    if fields.len() < 4 {
        return Err(TrailError::Parse {
            line: line_number,
            reason: format!("expected at least 4 fields, found {}", fields.len()),
        });
    }

    let parse_err = |field: &str, value: &str| TrailError::Parse {
        line: line_number,
        reason: format!("invalid {field} '{value}'"),
    };

    let timestamp_ms: i64 = fields[1]
        .trim()
        .parse()
        .map_err(|_| parse_err("timestamp", fields[1]))?;
    let latitude: f64 = fields[2]
        .trim()
        .parse()
        .map_err(|_| parse_err("latitude", fields[2]))?;
    let longitude: f64 = fields[3]
        .trim()
        .parse()
        .map_err(|_| parse_err("longitude", fields[3]))?;
    if !GeoPoint::new(latitude, longitude).is_valid() {
        return Err(TrailError::Parse {
            line: line_number,
            reason: format!("invalid position ({}, {})", fields[2], fields[3]),
        });
    }
    let accuracy = fields.get(4).and_then(|a| a.trim().parse::<i32>().ok());

    Ok(Some(RawRecord {
        entity_key: fields[0].to_string(),
        timestamp_ms,
        latitude,
        longitude,
        accuracy,
    }))
}

/// All trails of a dump, keyed by entity.
///
/// Iteration is in entity-key order, which keeps every downstream pass
/// deterministic.
#[derive(Debug, Clone, Default)]
pub struct TrailCorpus {
    trails: BTreeMap<String, Trail>,
    stats: LoadStats,
}

impl TrailCorpus {
    /// Build a corpus from already-constructed trails.
    ///
    /// A later trail with the same key replaces an earlier one.
    pub fn from_trails(trails: impl IntoIterator<Item = Trail>) -> Self {
        let trails: BTreeMap<String, Trail> = trails
            .into_iter()
            .map(|t| (t.entity_key().to_string(), t))
            .collect();
        let pings_loaded = trails.values().map(Trail::len).sum();
        Self {
            trails,
            stats: LoadStats {
                pings_loaded,
                ..LoadStats::default()
            },
        }
    }

    pub fn get(&self, entity_key: &str) -> Option<&Trail> {
        self.trails.get(entity_key)
    }

    pub fn len(&self) -> usize {
        self.trails.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trails.is_empty()
    }

    pub fn stats(&self) -> &LoadStats {
        &self.stats
    }

    /// Trails in entity-key order.
    pub fn trails(&self) -> impl Iterator<Item = &Trail> {
        self.trails.values()
    }

    /// Trails ordered by their first timestamp, ties broken by entity key.
    ///
    /// Empty trails sort last.
    pub fn trails_by_start(&self) -> Vec<&Trail> {
        let mut trails: Vec<&Trail> = self.trails.values().collect();
        trails.sort_by(|a, b| {
            let ka = a.start_time().unwrap_or(i64::MAX);
            let kb = b.start_time().unwrap_or(i64::MAX);
            ka.cmp(&kb).then_with(|| a.entity_key().cmp(b.entity_key()))
        });
        trails
    }
}

/// Load all trails from a reader, one trail per entity key.
pub fn load_trails<R: BufRead>(reader: R) -> Result<TrailCorpus> {
    let mut stats = LoadStats::default();
    let mut pings: BTreeMap<String, Vec<Ping>> = BTreeMap::new();
    let mut seen: BTreeMap<String, HashSet<i64>> = BTreeMap::new();

    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        stats.lines_read += 1;
        if line.trim().is_empty() {
            stats.blank_skipped += 1;
            continue;
        }

        let record = match parse_line(&line, idx + 1) {
            Ok(Some(record)) => record,
            Ok(None) => {
                stats.headers_skipped += 1;
                continue;
            }
            Err(e) => {
                warn!("[Loader] Skipping malformed line: {}", e);
                stats.malformed_skipped += 1;
                continue;
            }
        };

        let known = seen.entry(record.entity_key.clone()).or_default();
        if !known.insert(record.timestamp()) {
            stats.duplicates_dropped += 1;
            continue;
        }

        pings
            .entry(record.entity_key.clone())
            .or_default()
            .push(record.to_ping());
        stats.pings_loaded += 1;
    }

    let trails: BTreeMap<String, Trail> = pings
        .into_iter()
        .map(|(key, points)| (key.clone(), Trail::new(key, points)))
        .collect();

    info!(
        "[Loader] Loaded {} trails ({} pings, {} duplicates dropped, {} malformed lines)",
        trails.len(),
        stats.pings_loaded,
        stats.duplicates_dropped,
        stats.malformed_skipped
    );

    Ok(TrailCorpus { trails, stats })
}

/// Load all trails from a file.
pub fn load_trails_from_path(path: impl AsRef<Path>) -> Result<TrailCorpus> {
    let file = File::open(path.as_ref())?;
    load_trails(BufReader::new(file))
}

/// Load every ping of a dump as one chronologically sorted sequence.
///
/// Timestamps are deduplicated across all entity keys. Reading stops as soon
/// as `options.limit` distinct timestamps have been collected.
pub fn load_points<R: BufRead>(
    reader: R,
    options: &LoadOptions,
) -> Result<(Vec<Ping>, LoadStats)> {
    let mut stats = LoadStats::default();
    let mut known_timestamps: HashSet<i64> = HashSet::new();
    let mut points: Vec<Ping> = Vec::new();

    if options.limit == Some(0) {
        return Ok((points, stats));
    }

    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        stats.lines_read += 1;
        if line.trim().is_empty() {
            stats.blank_skipped += 1;
            continue;
        }

        let record = match parse_line(&line, idx + 1) {
            Ok(Some(record)) => record,
            Ok(None) => {
                stats.headers_skipped += 1;
                continue;
            }
            Err(e) => {
                warn!("[Loader] Skipping malformed line: {}", e);
                stats.malformed_skipped += 1;
                continue;
            }
        };

        if !known_timestamps.insert(record.timestamp()) {
            stats.duplicates_dropped += 1;
            continue;
        }
        points.push(record.to_ping());
        stats.pings_loaded += 1;

        if options.limit == Some(known_timestamps.len()) {
            info!("[Loader] Reached limit of {} points", known_timestamps.len());
            break;
        }
    }

    points.sort_by_key(|p| p.timestamp);
    Ok((points, stats))
}

/// Load the predictor corpus from a file.
pub fn load_points_from_path(
    path: impl AsRef<Path>,
    options: &LoadOptions,
) -> Result<(Vec<Ping>, LoadStats)> {
    let file = File::open(path.as_ref())?;
    load_points(BufReader::new(file), options)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_line_unknown_accuracy() {
        let record = parse_line("2014-04-16\t1397649600000\t41.0\t-74.0\t\\N", 1)
            .unwrap()
            .unwrap();
        assert_eq!(record.accuracy, None);
        assert_eq!(record.to_ping().timestamp, 1_397_649_600);
    }

    #[test]
    fn test_parse_line_missing_accuracy_column() {
        let record = parse_line("k\t1000\t41.0\t-74.0", 1).unwrap().unwrap();
        assert_eq!(record.accuracy, None);
    }

    #[test]
    fn test_parse_line_header_and_blank() {
        assert!(parse_line("dt\ttimestamp\tlat\tlng\tllacc", 1).unwrap().is_none());
        assert!(parse_line("   ", 2).unwrap().is_none());
    }

    #[test]
    fn test_parse_line_bad_latitude() {
        let err = parse_line("k\t1000\tnorth\t-74.0\t5", 7).unwrap_err();
        assert!(err.to_string().contains("line 7"));
    }

    #[test]
    fn test_parse_line_rejects_non_finite_coordinates() {
        for line in [
            "k\t1000\tNaN\t-74.0\t5",
            "k\t1000\t41.0\tinf\t5",
            "k\t1000\t-inf\t-74.0\t5",
            "k\t1000\t91.0\t-74.0\t5",
        ] {
            assert!(
                matches!(parse_line(line, 3), Err(TrailError::Parse { line: 3, .. })),
                "accepted {line:?}"
            );
        }
    }

    #[test]
    fn test_record_timestamp_truncates_to_seconds() {
        let record = parse_line("k\t1999\t41.0\t-74.0\t5", 1).unwrap().unwrap();
        assert_eq!(record.timestamp(), 1);
        let record = parse_line("k\t-1\t41.0\t-74.0\t5", 1).unwrap().unwrap();
        assert_eq!(record.timestamp(), -1);
    }
}
