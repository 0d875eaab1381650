//! Tests for loader module

use std::io::Cursor;
use trailcast::loader::*;

const SAMPLE: &str = "dt\ttimestamp\tlat\tlng\tllacc
2014-04-16\t1397649720000\t41.0031\t-74.0786\t20
2014-04-16\t1397649600000\t41.0030\t-74.0785\t\\N
2014-04-17\t1397736000000\t40.7240\t-73.9974\t15
2014-04-16\t1397649600000\t42.0000\t-75.0000\t1
2014-04-16\tbogus\t41.0\t-74.0\t5
";

#[test]
fn test_load_trails_groups_and_sorts() {
    let corpus = load_trails(Cursor::new(SAMPLE)).unwrap();
    assert_eq!(corpus.len(), 2);

    let day = corpus.get("2014-04-16").unwrap();
    assert_eq!(day.len(), 2);
    assert_eq!(day.points()[0].timestamp, 1_397_649_600);
    assert_eq!(day.points()[1].timestamp, 1_397_649_720);
}

#[test]
fn test_load_trails_first_duplicate_wins() {
    let corpus = load_trails(Cursor::new(SAMPLE)).unwrap();
    let day = corpus.get("2014-04-16").unwrap();
    // The later duplicate at 42.0 is dropped
    assert_eq!(day.points()[0].latitude, 41.0030);
    assert_eq!(corpus.stats().duplicates_dropped, 1);
}

#[test]
fn test_load_trails_unknown_accuracy_is_none() {
    let corpus = load_trails(Cursor::new(SAMPLE)).unwrap();
    let day = corpus.get("2014-04-16").unwrap();
    assert_eq!(day.points()[0].accuracy, None);
    assert_eq!(day.points()[1].accuracy, Some(20));
}

#[test]
fn test_load_trails_skips_header_and_malformed() {
    let corpus = load_trails(Cursor::new(SAMPLE)).unwrap();
    let stats = corpus.stats();
    assert_eq!(stats.lines_read, 6);
    assert_eq!(stats.headers_skipped, 1);
    assert_eq!(stats.blank_skipped, 0);
    assert_eq!(stats.malformed_skipped, 1);
    assert_eq!(stats.pings_loaded, 3);
}

#[test]
fn test_non_finite_coordinates_are_malformed() {
    let input = "k\t1000\t41.0\t-74.0\t5
k\t2000\tNaN\t-74.0\t5
k\t3000\t41.0\tinf\t5
k\t4000\t-inf\t-74.0\t5
k\t5000\t41.1\t-74.1\t5
";
    let (points, stats) = load_points(Cursor::new(input), &LoadOptions { limit: None }).unwrap();
    assert_eq!(points.len(), 2);
    assert_eq!(stats.malformed_skipped, 3);
    assert!(points.iter().all(|p| p.latitude.is_finite() && p.longitude.is_finite()));

    let corpus = load_trails(Cursor::new(input)).unwrap();
    assert_eq!(corpus.get("k").unwrap().len(), 2);
    assert_eq!(corpus.stats().malformed_skipped, 3);
}

#[test]
fn test_blank_lines_counted_separately() {
    let input = "dt\ttimestamp\tlat\tlng\tllacc\n\nk\t1000\t41.0\t-74.0\t5\n   \n";
    let corpus = load_trails(Cursor::new(input)).unwrap();
    let stats = corpus.stats();
    assert_eq!(stats.lines_read, 4);
    assert_eq!(stats.headers_skipped, 1);
    assert_eq!(stats.blank_skipped, 2);
    assert_eq!(stats.pings_loaded, 1);
}

#[test]
fn test_sub_second_duplicates_dropped() {
    // 1000ms and 1500ms land on the same second
    let input = "k\t1000\t41.0\t-74.0\t5\nk\t1500\t42.0\t-75.0\t5\nk\t2000\t43.0\t-76.0\t5\n";
    let corpus = load_trails(Cursor::new(input)).unwrap();
    let trail = corpus.get("k").unwrap();
    assert_eq!(trail.len(), 2);
    assert_eq!(trail.points()[0].latitude, 41.0);
    assert_eq!(corpus.stats().duplicates_dropped, 1);

    let (points, stats) = load_points(Cursor::new(input), &LoadOptions { limit: None }).unwrap();
    assert_eq!(points.len(), 2);
    assert_eq!(stats.duplicates_dropped, 1);
}

#[test]
fn test_same_timestamp_different_entities_kept() {
    let input = "a\t1000\t1.0\t1.0\t1\nb\t1000\t2.0\t2.0\t1\n";
    let corpus = load_trails(Cursor::new(input)).unwrap();
    assert_eq!(corpus.get("a").unwrap().len(), 1);
    assert_eq!(corpus.get("b").unwrap().len(), 1);
}

#[test]
fn test_trails_by_start() {
    let input = "late\t9000\t1.0\t1.0\t1\nearly\t1000\t2.0\t2.0\t1\nalso-early\t1000\t3.0\t3.0\t1\n";
    let corpus = load_trails(Cursor::new(input)).unwrap();
    let keys: Vec<&str> = corpus
        .trails_by_start()
        .iter()
        .map(|t| t.entity_key())
        .collect();
    assert_eq!(keys, vec!["also-early", "early", "late"]);
}

#[test]
fn test_load_points_dedupes_globally() {
    let input = "a\t1000\t1.0\t1.0\t1\nb\t1000\t2.0\t2.0\t1\nb\t3000\t3.0\t3.0\t\\N\n";
    let (points, stats) = load_points(Cursor::new(input), &LoadOptions { limit: None }).unwrap();
    assert_eq!(points.len(), 2);
    assert_eq!(points[0].latitude, 1.0);
    assert_eq!(points[1].accuracy, None);
    assert_eq!(stats.duplicates_dropped, 1);
}

#[test]
fn test_load_points_respects_limit() {
    let input = "k\t5000\t5.0\t5.0\t1\nk\t1000\t1.0\t1.0\t1\nk\t3000\t3.0\t3.0\t1\n";
    let (points, _) = load_points(Cursor::new(input), &LoadOptions { limit: Some(2) }).unwrap();
    // Only the first two lines are read, then sorted
    assert_eq!(points.len(), 2);
    assert_eq!(points[0].timestamp, 1);
    assert_eq!(points[1].timestamp, 5);
}

#[test]
fn test_load_points_zero_limit() {
    let input = "k\t5000\t5.0\t5.0\t1\n";
    let (points, _) = load_points(Cursor::new(input), &LoadOptions { limit: Some(0) }).unwrap();
    assert!(points.is_empty());
}

#[test]
fn test_default_limit() {
    assert_eq!(LoadOptions::default().limit, Some(DEFAULT_LIMIT));
}

#[test]
fn test_missing_file_is_io_error() {
    let err = load_trails_from_path("/nonexistent/trailcast/input.tsv").unwrap_err();
    assert!(matches!(err, trailcast::TrailError::Io(_)));
}
