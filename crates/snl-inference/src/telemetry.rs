//! On-disk telemetry for SNL runs.
//!
//! Each run writes to `<log_root>/snl/<simulator>/<timestamp>/`:
//! `summary.csv` (rewritten after every round), `events.jsonl` (one line per
//! round) and `provenance.json` (written once).

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};
use snl_core::{ErrorInfo, RunProvenance, SnlError};

use crate::bank::ParameterObservationBank;
use crate::summary::{DistanceRecorder, SummaryRecord, SummaryRecorder};

/// Timestamp format of run directories.
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d-%H%M%S%.3f";

/// Formats `now` as a run-directory timestamp.
pub fn timestamp(now: DateTime<Utc>) -> String {
    now.format(TIMESTAMP_FORMAT).to_string()
}

/// `<log_root>/snl/<simulator_name>/<timestamp>`.
pub fn log_dir(log_root: &Path, simulator_name: &str, timestamp: &str) -> PathBuf {
    log_root.join("snl").join(simulator_name).join(timestamp)
}

/// One line of `events.jsonl`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundEvent {
    /// Zero-based round index.
    pub round: usize,
    /// Simulator the run is fitted against.
    pub simulator: String,
    /// Examples in the bank after the round.
    pub num_examples: usize,
    /// Metric values recorded for the round.
    pub metrics: IndexMap<String, f64>,
}

/// Recorder writing summary telemetry below a per-run directory.
#[derive(Debug)]
pub struct TelemetryRecorder {
    dir: PathBuf,
    provenance: RunProvenance,
    provenance_written: bool,
    distances: DistanceRecorder,
}

impl TelemetryRecorder {
    /// Creates the run directory for a run started now.
    pub fn new(log_root: &Path, simulator_name: &str, seed: u64) -> Result<Self, SnlError> {
        Self::started_at(log_root, simulator_name, seed, Utc::now())
    }

    /// Creates the run directory for a run started at `started`.
    ///
    /// A run started within the same millisecond as an existing directory
    /// gets a `-1`, `-2`, ... suffix instead of sharing it.
    pub fn started_at(
        log_root: &Path,
        simulator_name: &str,
        seed: u64,
        started: DateTime<Utc>,
    ) -> Result<Self, SnlError> {
        let stamp = timestamp(started);
        let dir = claim_run_dir(log_root, simulator_name, &stamp)?;
        Ok(Self {
            dir,
            provenance: RunProvenance::new(simulator_name, seed, started.to_rfc3339()),
            provenance_written: false,
            distances: DistanceRecorder,
        })
    }

    /// Run directory receiving the telemetry files.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn write_provenance(&mut self) -> Result<(), SnlError> {
        if self.provenance_written {
            return Ok(());
        }
        let path = self.dir.join("provenance.json");
        let json = serde_json::to_string_pretty(&self.provenance).map_err(|err| {
            SnlError::Serde(ErrorInfo::new("telemetry-serialize", err.to_string()))
        })?;
        fs::write(&path, json).map_err(|err| io_error("telemetry-write", &path, err))?;
        self.provenance_written = true;
        Ok(())
    }

    fn write_summary_csv(&self, summary: &SummaryRecord) -> Result<(), SnlError> {
        let path = self.dir.join("summary.csv");
        let csv_error = |err: csv::Error| {
            SnlError::Serde(
                ErrorInfo::new("telemetry-csv", err.to_string())
                    .with_context("path", path.display()),
            )
        };
        let mut writer = csv::Writer::from_path(&path).map_err(csv_error)?;
        let mut header = vec!["round".to_string()];
        header.extend(summary.metric_names().into_iter().map(str::to_string));
        writer.write_record(&header).map_err(csv_error)?;
        for round in 0..summary.num_rounds() {
            let mut record = vec![round.to_string()];
            record.extend(summary.round_values(round).values().map(f64::to_string));
            writer.write_record(&record).map_err(csv_error)?;
        }
        writer
            .flush()
            .map_err(|err| io_error("telemetry-write", &path, err))
    }

    fn append_event(&self, event: &RoundEvent) -> Result<(), SnlError> {
        let path = self.dir.join("events.jsonl");
        let line = serde_json::to_string(event).map_err(|err| {
            SnlError::Serde(ErrorInfo::new("telemetry-serialize", err.to_string()))
        })?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|err| io_error("telemetry-write", &path, err))?;
        writeln!(file, "{line}").map_err(|err| io_error("telemetry-write", &path, err))
    }
}

impl SummaryRecorder for TelemetryRecorder {
    fn record(
        &mut self,
        round: usize,
        observation: &DMatrix<f64>,
        bank: &ParameterObservationBank,
        simulator_name: &str,
        summary: &mut SummaryRecord,
    ) -> Result<(), SnlError> {
        self.distances
            .record(round, observation, bank, simulator_name, summary)?;
        self.write_provenance()?;
        self.write_summary_csv(summary)?;
        self.append_event(&RoundEvent {
            round,
            simulator: simulator_name.to_string(),
            num_examples: bank.num_examples(),
            metrics: summary.round_values(round),
        })
    }
}

fn claim_run_dir(log_root: &Path, simulator_name: &str, stamp: &str) -> Result<PathBuf, SnlError> {
    let first = log_dir(log_root, simulator_name, stamp);
    if let Some(parent) = first.parent() {
        fs::create_dir_all(parent).map_err(|err| io_error("telemetry-mkdir", parent, err))?;
    }
    let mut suffix = 0usize;
    loop {
        let dir = if suffix == 0 {
            first.clone()
        } else {
            log_dir(log_root, simulator_name, &format!("{stamp}-{suffix}"))
        };
        match fs::create_dir(&dir) {
            Ok(()) => return Ok(dir),
            Err(err) if err.kind() == std::io::ErrorKind::AlreadyExists => suffix += 1,
            Err(err) => return Err(io_error("telemetry-mkdir", &dir, err)),
        }
    }
}

fn io_error(code: &str, path: &Path, err: std::io::Error) -> SnlError {
    SnlError::Serde(ErrorInfo::new(code, err.to_string()).with_context("path", path.display()))
}
