mod common;

use chrono::{TimeZone, Utc};
use common::{quick_config, ShiftedGaussian};
use snl_core::RunProvenance;
use snl_inference::{
    log_dir, DiagonalGaussian, RoundEvent, Snl, SummaryRecord, TelemetryRecorder,
    MEDIAN_OBSERVATION_DISTANCES,
};
use tempfile::tempdir;

#[test]
fn run_directory_follows_simulator_and_timestamp() {
    let root = tempdir().unwrap();
    let started = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
    let recorder = TelemetryRecorder::started_at(root.path(), "shifted-gaussian", 7, started).unwrap();
    assert_eq!(
        recorder.dir(),
        root.path().join("snl").join("shifted-gaussian").join("20240102-030405.000")
    );
    assert_eq!(
        log_dir(root.path(), "x", "t"),
        root.path().join("snl").join("x").join("t")
    );
    assert!(recorder.dir().is_dir());
}

#[test]
fn runs_started_together_get_separate_directories() {
    let root = tempdir().unwrap();
    let started = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap()
        + chrono::Duration::milliseconds(250);
    let first = TelemetryRecorder::started_at(root.path(), "shifted-gaussian", 1, started).unwrap();
    let second = TelemetryRecorder::started_at(root.path(), "shifted-gaussian", 2, started).unwrap();
    let third = TelemetryRecorder::started_at(root.path(), "shifted-gaussian", 3, started).unwrap();
    let base = root.path().join("snl").join("shifted-gaussian");
    assert_eq!(first.dir(), base.join("20240102-030405.250"));
    assert_eq!(second.dir(), base.join("20240102-030405.250-1"));
    assert_eq!(third.dir(), base.join("20240102-030405.250-2"));
}

#[test]
fn rounds_write_summary_events_and_provenance() {
    let root = tempdir().unwrap();
    let started = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
    let recorder = TelemetryRecorder::started_at(root.path(), "shifted-gaussian", 11, started).unwrap();
    let dir = recorder.dir().to_path_buf();

    let mut snl = Snl::with_default_estimator(
        ShiftedGaussian { dim: 2, noise: 0.3 },
        DiagonalGaussian::standard(2),
        &[0.1, 0.2],
        quick_config(11),
        Some(Box::new(recorder)),
    )
    .unwrap();
    snl.run(2, 30).unwrap();

    let csv = std::fs::read_to_string(dir.join("summary.csv")).unwrap();
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(
        lines[0],
        "round,epochs,best-validation-log-probs,neural-net-fit-times,mcmc-times,median-observation-distances"
    );
    assert_eq!(lines.len(), 3);
    assert!(lines[2].starts_with("1,"));

    let events: Vec<RoundEvent> = std::fs::read_to_string(dir.join("events.jsonl"))
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(events.len(), 2);
    assert_eq!(events[1].round, 1);
    assert_eq!(events[1].num_examples, 60);
    assert_eq!(events[1].simulator, "shifted-gaussian");
    assert_eq!(
        events[0].metrics[MEDIAN_OBSERVATION_DISTANCES],
        snl.summary().get(MEDIAN_OBSERVATION_DISTANCES).unwrap()[0]
    );

    let provenance: RunProvenance =
        serde_json::from_str(&std::fs::read_to_string(dir.join("provenance.json")).unwrap())
            .unwrap();
    assert_eq!(provenance.simulator, "shifted-gaussian");
    assert_eq!(provenance.seed, 11);
    assert!(provenance.created_at.starts_with("2024-06-01T12:00:00"));
}

#[test]
fn enabled_telemetry_config_creates_run_directory() {
    let root = tempdir().unwrap();
    let mut config = quick_config(12);
    config.telemetry.enabled = true;
    config.telemetry.log_root = root.path().to_path_buf();
    let mut snl = Snl::with_default_estimator(
        ShiftedGaussian { dim: 2, noise: 0.3 },
        DiagonalGaussian::standard(2),
        &[0.0, 0.0],
        config,
        None,
    )
    .unwrap();
    snl.run(1, 20).unwrap();

    let runs: Vec<_> = std::fs::read_dir(root.path().join("snl").join("shifted-gaussian"))
        .unwrap()
        .collect();
    assert_eq!(runs.len(), 1);
    let run = runs[0].as_ref().unwrap().path();
    assert!(run.join("summary.csv").is_file());
    assert!(run.join("provenance.json").is_file());
}

#[test]
fn summary_record_is_append_only() {
    let mut summary = SummaryRecord::new();
    summary.record(0, "epochs", 12.0).unwrap();
    let err = summary.record(0, "epochs", 13.0).unwrap_err();
    assert_eq!(err.code(), "metric-already-recorded");

    summary.record(2, "late-metric", 1.5).unwrap();
    let late = summary.get("late-metric").unwrap();
    assert!(late[0].is_nan() && late[1].is_nan());
    assert_eq!(late[2], 1.5);
    assert_eq!(summary.num_rounds(), 3);
    assert_eq!(summary.metric_names(), vec!["epochs", "late-metric"]);
    assert_eq!(summary.last("epochs"), Some(12.0));
}
