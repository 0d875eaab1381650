//! End-to-end tests over synthetic commute days
//!
//! Run with: `cargo test --features synthetic`

#![cfg(feature = "synthetic")]

use std::io::Cursor;
use trailcast::synthetic::CommuteScenario;
use trailcast::{
    LoadOptions, NeighborModel, PipelineConfig, PredictorConfig, load_points, load_trails,
    run_commute_pipeline,
};

fn pipeline_config(scenario: &CommuteScenario) -> PipelineConfig {
    let mut config = PipelineConfig::default();
    config.commute.home = scenario.home;
    config.commute.work = scenario.work;
    config
}

#[test]
fn test_tsv_loads_back_into_same_trails() {
    let dataset = CommuteScenario::standard().generate();
    let corpus = load_trails(Cursor::new(dataset.to_tsv())).unwrap();

    assert_eq!(corpus.len(), dataset.trails.len());
    assert_eq!(corpus.stats().headers_skipped, 1);
    assert_eq!(corpus.stats().malformed_skipped, 0);
    assert_eq!(corpus.stats().duplicates_dropped, 0);
    for trail in &dataset.trails {
        let loaded = corpus.get(trail.entity_key()).unwrap();
        assert_eq!(loaded.len(), trail.len());
        assert_eq!(loaded.start_time(), trail.start_time());
    }
}

#[test]
fn test_clean_days_all_retained() {
    let scenario = CommuteScenario::standard();
    let dataset = scenario.generate();
    let mut out = Vec::new();
    let report = run_commute_pipeline(
        Cursor::new(dataset.to_tsv()),
        &mut out,
        &pipeline_config(&scenario),
    )
    .unwrap();

    assert_eq!(report.trails, scenario.days);
    assert_eq!(report.commute_days, scenario.days);
    assert_eq!(report.excluded_days, 0);
    assert!(report.points_written > 0);
    assert_eq!(
        String::from_utf8(out).unwrap().lines().count(),
        report.points_written
    );
}

#[test]
fn test_jump_days_are_excluded() {
    let scenario = CommuteScenario {
        days: 60,
        jump_fraction: 0.5,
        ..CommuteScenario::standard()
    };
    let dataset = scenario.generate();
    assert!(!dataset.jump_days.is_empty());

    let mut out = Vec::new();
    let report = run_commute_pipeline(
        Cursor::new(dataset.to_tsv()),
        &mut out,
        &pipeline_config(&scenario),
    )
    .unwrap();

    assert_eq!(report.commute_days, scenario.days);
    assert_eq!(report.excluded_days, dataset.jump_days.len());
}

#[test]
fn test_model_over_flattened_days() {
    let dataset = CommuteScenario::standard().generate();
    let (points, stats) =
        load_points(Cursor::new(dataset.to_tsv()), &LoadOptions::default()).unwrap();
    assert_eq!(points.len(), dataset.total_points());
    assert_eq!(stats.pings_loaded, points.len());

    let query = points[10];
    let model = NeighborModel::build(points, PredictorConfig::default()).unwrap();
    let predictions = model.predict(&query, 3600);

    assert_eq!(predictions.len(), 10);
    assert_eq!(predictions[0].neighbor.distance, 0.0);
    assert!(
        predictions
            .windows(2)
            .all(|w| w[0].neighbor.distance <= w[1].neighbor.distance)
    );
}
