//! Calibration runs against a small synthetic survey.

use disha_locate::radiomap::MeanRadioMap;
use disha_locate::{AxisMode, CalibrationEngine, Parameters, RadioMapBuilder};
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

const MAC_A: &str = "aa:aa:aa:aa:aa:aa";
const MAC_B: &str = "bb:bb:bb:bb:bb:bb";

/// Two-location survey with one sample per MAC per location, so the
/// mean map is exactly the surveyed values.
fn build_fixture() -> (TempDir, PathBuf, PathBuf, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let logs = dir.path().join("rsslogs");
    fs::create_dir(&logs).unwrap();
    fs::write(
        logs.join("survey.txt"),
        format!(
            "# Timestamp, X, Y\n\
             1, 0, 0, {MAC_A}, -50\n\
             2, 0, 0, {MAC_B}, -70\n\
             3, 10, 0, {MAC_A}, -80\n\
             4, 10, 0, {MAC_B}, -40\n"
        ),
    )
    .unwrap();

    let radiomap = dir.path().join("radiomap.txt");
    let mean = dir.path().join("radiomap-mean.txt");
    let mut builder = RadioMapBuilder::new(AxisMode::Indoor, -110);
    builder.aggregate(&logs).unwrap();
    builder.write(&radiomap, &mean).unwrap();

    // Test log replays the surveyed fingerprints at their true spots.
    let test_log = dir.path().join("testwalk.txt");
    fs::write(
        &test_log,
        format!(
            "# X, Y, {MAC_A}, {MAC_B}\n\
             0, 0, -50, -70\n\
             10, 0, -80, -40\n"
        ),
    )
    .unwrap();

    (dir, radiomap, mean, test_log)
}

#[test]
fn calibration_is_deterministic() {
    let (_dir, radiomap, mean, test_log) = build_fixture();
    let mean_map = MeanRadioMap::from_file(&mean).unwrap();
    let engine = CalibrationEngine::new(AxisMode::Indoor, -110);

    let first = engine.calibrate(&mean_map, &radiomap, &test_log).unwrap();
    let second = engine.calibrate(&mean_map, &radiomap, &test_log).unwrap();
    assert_eq!(first, second);
}

#[test]
fn exact_replay_picks_smallest_k() {
    let (_dir, radiomap, mean, test_log) = build_fixture();
    let mean_map = MeanRadioMap::from_file(&mean).unwrap();
    let engine = CalibrationEngine::new(AxisMode::Indoor, -110);
    let params = engine.calibrate(&mean_map, &radiomap, &test_log).unwrap();

    // K=1 reproduces every test row exactly (error 0); larger K pulls
    // the centroid away. WKNN short-circuits on the exact match for
    // every K, so the ascending sweep keeps K=1.
    assert_eq!(params.k_knn, 1);
    assert_eq!(params.k_wknn, 1);
    // MAP ranks the true location first for every σ; first-found wins.
    assert_eq!(params.s_map, 1.0);
    assert!((1.0..=10.0).contains(&params.s_mmse));
    assert_eq!(params.nan_value, -110);
    assert_eq!(params.min_rss, -80);
    assert_eq!(params.max_rss, -40);
}

#[test]
fn parameters_survive_disk_round_trip() {
    let (dir, radiomap, mean, test_log) = build_fixture();
    let mean_map = MeanRadioMap::from_file(&mean).unwrap();
    let engine = CalibrationEngine::new(AxisMode::Indoor, -110);
    let params = engine.calibrate(&mean_map, &radiomap, &test_log).unwrap();

    let path = dir.path().join("radiomap-parameters.txt");
    params.write_to(&path).unwrap();
    let read = Parameters::from_file(&path).unwrap();
    assert_eq!(read.k_knn, params.k_knn);
    assert_eq!(read.k_wknn, params.k_wknn);
    assert_eq!(read.s_map, params.s_map);
    assert_eq!(read.s_mmse, params.s_mmse);
    assert_eq!(read.nan_value, params.nan_value);
}

#[test]
fn calibration_rejects_empty_test_log() {
    let (dir, radiomap, mean, _) = build_fixture();
    let mean_map = MeanRadioMap::from_file(&mean).unwrap();
    let engine = CalibrationEngine::new(AxisMode::Indoor, -110);

    let empty = dir.path().join("empty.txt");
    fs::write(&empty, format!("# X, Y, {MAC_A}, {MAC_B}\n")).unwrap();
    assert!(engine.calibrate(&mean_map, &radiomap, &empty).is_err());
}
