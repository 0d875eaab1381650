//! Commute file output and the load -> segment -> validate -> write pipeline.
//!
//! The output file has one `lat,lng` line per retained point (six decimals, no
//! header), day by day in trail start order, morning points before evening
//! points. The same input always yields byte-identical output.

use log::info;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use crate::Bounds;
use crate::error::Result;
use crate::loader::{self, LoadStats, TrailCorpus};
use crate::segmentation::{CommuteConfig, CommuteSegment};
use crate::validation::{self, CommuteDay, TrajectoryValidator, ValidationConfig};

/// Everything the commute pipeline needs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub commute: CommuteConfig,
    #[serde(default)]
    pub validation: ValidationConfig,
}

impl PipelineConfig {
    /// Read a JSON configuration file. Missing sections fall back to defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        Ok(serde_json::from_reader(BufReader::new(file))?)
    }
}

/// Summary of one pipeline run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineReport {
    pub load: LoadStats,
    pub trails: usize,
    /// Bounding box of every loaded ping.
    pub extent: Option<Bounds>,
    /// Trails with both a morning and an evening commute.
    pub commute_days: usize,
    /// Commute days rejected by validation.
    pub excluded_days: usize,
    pub points_written: usize,
    /// Mean departure-to-arrival time over retained segments.
    pub mean_commute_seconds: f64,
    /// Mean haversine length over retained segments.
    pub mean_commute_meters: f64,
}

/// Mean duration (seconds) and length (meters) of the days' segments.
///
/// Both are zero when there are no days.
pub fn commute_means(days: &[CommuteDay]) -> (f64, f64) {
    let segments: Vec<&CommuteSegment> = days
        .iter()
        .flat_map(|d| [&d.morning, &d.evening])
        .collect();
    if segments.is_empty() {
        return (0.0, 0.0);
    }
    let n = segments.len() as f64;
    let seconds: i64 = segments.iter().map(|s| s.duration_seconds()).sum();
    let meters: f64 = segments.iter().map(|s| s.length_meters()).sum();
    (seconds as f64 / n, meters / n)
}

/// Write the points of each day as `lat,lng` lines.
///
/// Returns the number of lines written.
pub fn write_commute_points<W: Write>(days: &[CommuteDay], writer: &mut W) -> Result<usize> {
    let mut written = 0;
    for day in days {
        for p in day.points() {
            writeln!(writer, "{:.6},{:.6}", p.latitude, p.longitude)?;
            written += 1;
        }
    }
    writer.flush()?;
    Ok(written)
}

/// Pair and validate the commute days of a loaded corpus.
///
/// Returns the retained days (in trail start order) and how many were rejected.
pub fn validated_commute_days(
    corpus: &TrailCorpus,
    config: &PipelineConfig,
) -> (Vec<CommuteDay>, usize) {
    let trails = corpus.trails_by_start();

    #[cfg(feature = "parallel")]
    let days = validation::commute_days_parallel(&trails, &config.commute);
    #[cfg(not(feature = "parallel"))]
    let days = validation::commute_days(trails.iter().copied(), &config.commute);

    let total = days.len();
    let validator = TrajectoryValidator::new(config.validation.clone());
    let valid = validator.retain_valid(days);
    let excluded = total - valid.len();
    (valid, excluded)
}

/// Run the full pipeline from a reader to a writer.
pub fn run_commute_pipeline<R: BufRead, W: Write>(
    reader: R,
    writer: &mut W,
    config: &PipelineConfig,
) -> Result<PipelineReport> {
    let corpus = loader::load_trails(reader)?;
    let (days, excluded_days) = validated_commute_days(&corpus, config);
    let points_written = write_commute_points(&days, writer)?;
    let (mean_commute_seconds, mean_commute_meters) = commute_means(&days);
    let extent = corpus
        .trails()
        .filter_map(|t| t.bounds())
        .reduce(|a, b| a.merge(&b));

    let report = PipelineReport {
        load: *corpus.stats(),
        trails: corpus.len(),
        extent,
        commute_days: days.len() + excluded_days,
        excluded_days,
        points_written,
        mean_commute_seconds,
        mean_commute_meters,
    };

    info!(
        "[Pipeline] {} trails, {} commute days, {} excluded, {} points written",
        report.trails, report.commute_days, report.excluded_days, report.points_written
    );

    Ok(report)
}

/// Run the pipeline between two files.
pub fn commutes_to_file(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    config: &PipelineConfig,
) -> Result<PipelineReport> {
    let reader = BufReader::new(File::open(input.as_ref())?);
    let mut writer = BufWriter::new(File::create(output.as_ref())?);
    run_commute_pipeline(reader, &mut writer, config)
}
