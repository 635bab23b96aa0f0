//! Offline grid search for estimator parameters.
//!
//! Calibration replays a held-out test log against the mean radio map
//! for every candidate parameter value and keeps the candidate with the
//! smallest average Euclidean ground-truth error:
//!
//! | Algorithm | Sweep |
//! |-----------|-------|
//! | KNN, WKNN | K = 1..=15, step 1 |
//! | MAP, MMSE | σ = 1..=10, step 1 |
//!
//! The comparison is strict less-than and the sweep ascends, so exact
//! ties go to the smallest parameter. The run is synchronous,
//! single-pass, non-resumable and has no timeout; it must not run
//! concurrently with aggregation against the same files.

use crate::algorithms::{build_observation, Algorithm};
use crate::error::{Error, Result};
use crate::logfile::{is_valid_mac, normalize_separators};
use crate::radiomap::{rss_bounds, MeanRadioMap};
use crate::types::{parse_location_key, AxisMode, Parameters, ScanReading};
use log::info;
use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

/// One test log row: ground-truth coordinates plus one RSS value per
/// header MAC.
struct TestRow {
    truth: String,
    rss: Vec<i32>,
}

/// Parsed test log in the radio-map row format
/// (`# X, Y, <mac...>` header, then `x, y, rss...` rows).
struct TestLog {
    macs: Vec<String>,
    rows: Vec<TestRow>,
}

/// Grid-searches estimator parameters against a test log.
pub struct CalibrationEngine {
    mode: AxisMode,
    nan_value: i32,
}

impl CalibrationEngine {
    pub fn new(mode: AxisMode, nan_value: i32) -> Self {
        Self { mode, nan_value }
    }

    /// Run the full calibration: sweep all four algorithms and collect
    /// the winning parameters plus the observed RSS bounds of the full
    /// radio map.
    pub fn calibrate(
        &self,
        mean_map: &MeanRadioMap,
        radiomap_path: &Path,
        test_log_path: &Path,
    ) -> Result<Parameters> {
        let test_log = self.parse_test_log(test_log_path)?;
        if test_log.rows.is_empty() {
            return Err(Error::Calibration(format!(
                "{}: test log has no data rows",
                test_log_path.display()
            )));
        }
        let (min_rss, max_rss) = rss_bounds(radiomap_path, self.nan_value)?;
        info!("observed RSS bounds: [{min_rss}, {max_rss}]");

        let k_knn = self.best_parameter(mean_map, &test_log, Algorithm::Knn, 1, 15)?;
        let k_wknn = self.best_parameter(mean_map, &test_log, Algorithm::Wknn, 1, 15)?;
        let s_map = self.best_parameter(mean_map, &test_log, Algorithm::Map, 1, 10)?;
        let s_mmse = self.best_parameter(mean_map, &test_log, Algorithm::Mmse, 1, 10)?;

        Ok(Parameters {
            nan_value: self.nan_value,
            k_knn,
            k_wknn,
            s_map: f64::from(s_map),
            s_mmse: f64::from(s_mmse),
            min_rss,
            max_rss,
        })
    }

    /// Sweep one algorithm over an inclusive integer parameter range.
    ///
    /// Every test row is replayed as an observation; an estimator
    /// failure aborts the whole calibration. Rows whose ground-truth
    /// coordinates do not parse are skipped.
    fn best_parameter(
        &self,
        mean_map: &MeanRadioMap,
        test_log: &TestLog,
        algorithm: Algorithm,
        start: u32,
        end: u32,
    ) -> Result<u32> {
        let mut best_parameter = start;
        let mut best_error = f64::INFINITY;

        for parameter in start..=end {
            let mut sum_error = 0.0;
            let mut count = 0usize;

            for row in &test_log.rows {
                let scan: Vec<ScanReading> = test_log
                    .macs
                    .iter()
                    .zip(&row.rss)
                    .map(|(mac, &rss)| ScanReading {
                        mac: mac.clone(),
                        rss,
                    })
                    .collect();
                let observed = build_observation(mean_map.mac_order(), &scan, self.nan_value);
                let estimate = algorithm.run(mean_map, &observed, f64::from(parameter))?;

                let truth = match parse_location_key(&row.truth) {
                    Ok(p) => p,
                    Err(_) => continue,
                };
                sum_error += truth.distance_to(&estimate);
                count += 1;
            }

            if count == 0 {
                return Err(Error::Calibration(format!(
                    "{}: no test row has usable ground-truth coordinates",
                    algorithm.name()
                )));
            }

            let average = sum_error / count as f64;
            info!(
                "{} parameter {}: {} positions, avg error {:.3}",
                algorithm.name(),
                parameter,
                count,
                average
            );

            if average < best_error {
                best_error = average;
                best_parameter = parameter;
            }
        }

        info!(
            "{} winner: parameter {} (avg error {:.3})",
            algorithm.name(),
            best_parameter,
            best_error
        );
        Ok(best_parameter)
    }

    fn parse_test_log(&self, path: &Path) -> Result<TestLog> {
        let calibration_error =
            |line: usize, reason: String| Error::Calibration(format!("{}: line {line}: {reason}", path.display()));

        let reader = BufReader::new(File::open(path)?);
        let mut lines = reader.lines();

        let header = match lines.next() {
            Some(line) => line?,
            None => return Err(Error::Calibration(format!("{}: empty test log", path.display()))),
        };
        if !header.starts_with('#') {
            return Err(calibration_error(1, "missing '#' header row".to_string()));
        }
        let normalized = normalize_separators(&header);
        let fields: Vec<&str> = normalized.split_whitespace().collect();
        if fields.len() < 4 {
            return Err(calibration_error(
                1,
                format!("header has {} fields, expected at least 4", fields.len()),
            ));
        }
        let (first, second) = self.mode.axis_labels();
        if !fields[1].eq_ignore_ascii_case(first) || !fields[2].eq_ignore_ascii_case(second) {
            return Err(calibration_error(
                1,
                format!("header axis labels do not match {} mode", self.mode),
            ));
        }
        let mut macs = Vec::with_capacity(fields.len() - 3);
        for mac in &fields[3..] {
            if !is_valid_mac(mac) {
                return Err(calibration_error(1, format!("'{mac}' is not a MAC address")));
            }
            macs.push((*mac).to_string());
        }

        let mut rows = Vec::new();
        for (idx, line) in lines.enumerate() {
            let line = line?;
            let line_num = idx + 2;
            if line.trim().is_empty() {
                continue;
            }
            let normalized = normalize_separators(&line);
            let fields: Vec<&str> = normalized.split_whitespace().collect();
            if fields.len() != macs.len() + 2 {
                return Err(calibration_error(
                    line_num,
                    format!("{} fields, expected {}", fields.len(), macs.len() + 2),
                ));
            }
            let mut rss = Vec::with_capacity(macs.len());
            for field in &fields[2..] {
                let value: i32 = field.parse().map_err(|_| {
                    calibration_error(line_num, format!("'{field}' is not an RSS integer"))
                })?;
                rss.push(value);
            }
            rows.push(TestRow {
                truth: format!("{} {}", fields[0], fields[1]),
                rss,
            });
        }

        Ok(TestLog { macs, rows })
    }
}

impl Parameters {
    /// Write the canonical five-line parameters file. A partial file is
    /// removed if writing fails.
    pub fn write_to(&self, path: &Path) -> Result<()> {
        let result = self.try_write(path);
        if result.is_err() {
            let _ = fs::remove_file(path);
        }
        result
    }

    fn try_write(&self, path: &Path) -> Result<()> {
        let mut out = BufWriter::new(File::create(path)?);
        writeln!(out, "NaN:{}", self.nan_value)?;
        writeln!(out, "KNN:{}", self.k_knn)?;
        writeln!(out, "WKNN:{}", self.k_wknn)?;
        writeln!(out, "MAP:{:.1}", self.s_map)?;
        writeln!(out, "MMSE:{:.1}", self.s_mmse)?;
        out.flush()?;
        Ok(())
    }

    /// Parse a parameters file written by [`Parameters::write_to`] (or
    /// streamed down from the server). RSS bounds are not part of the
    /// file; they come back as the full `i32` range markers.
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let mut lines = contents.lines().filter(|l| !l.trim().is_empty());

        fn field<'a>(line: Option<&'a str>, prefix: &str) -> Result<&'a str> {
            let line = line.ok_or_else(|| Error::Parameters(format!("missing {prefix} line")))?;
            line.strip_prefix(prefix)
                .and_then(|rest| rest.strip_prefix(':'))
                .ok_or_else(|| Error::Parameters(format!("expected '{prefix}:<value>', got '{line}'")))
        }

        let nan_value: i32 = field(lines.next(), "NaN")?
            .trim()
            .parse()
            .map_err(|_| Error::Parameters("NaN value is not an integer".to_string()))?;
        let k_knn: u32 = field(lines.next(), "KNN")?
            .trim()
            .parse()
            .map_err(|_| Error::Parameters("KNN value is not an integer".to_string()))?;
        let k_wknn: u32 = field(lines.next(), "WKNN")?
            .trim()
            .parse()
            .map_err(|_| Error::Parameters("WKNN value is not an integer".to_string()))?;
        let s_map: f64 = field(lines.next(), "MAP")?
            .trim()
            .parse()
            .map_err(|_| Error::Parameters("MAP value is not a number".to_string()))?;
        let s_mmse: f64 = field(lines.next(), "MMSE")?
            .trim()
            .parse()
            .map_err(|_| Error::Parameters("MMSE value is not a number".to_string()))?;

        Ok(Parameters {
            nan_value,
            k_knn,
            k_wknn,
            s_map,
            s_mmse,
            min_rss: i32::MAX,
            max_rss: i32::MIN,
        })
    }
}
