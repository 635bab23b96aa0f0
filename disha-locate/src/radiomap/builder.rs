//! Aggregation of survey logs into radio map files.

use crate::error::{Error, Result};
use crate::logfile::{self, normalize_separators};
use crate::radiomap::MeanRadioMap;
use crate::types::{AxisMode, Sample};
use log::{debug, info, warn};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

/// Raw radio map: location key → MAC address → readings in file-read
/// order. Merging is additive; readings are appended, never overwritten.
///
/// `BTreeMap` keeps location and MAC iteration deterministic across
/// runs, which fixes the canonical MAC order of the written files.
pub type RawRadioMap = BTreeMap<String, BTreeMap<String, Vec<i32>>>;

/// Builds a raw radio map from a folder tree of survey logs and writes
/// the full and mean radio map files.
pub struct RadioMapBuilder {
    mode: AxisMode,
    nan_value: i32,
    map: RawRadioMap,
}

impl RadioMapBuilder {
    pub fn new(mode: AxisMode, nan_value: i32) -> Self {
        Self {
            mode,
            nan_value,
            map: RawRadioMap::new(),
        }
    }

    /// Recursively walk `root` and merge every readable, valid survey
    /// log. Invalid files are skipped with a warning; they never abort
    /// the run.
    pub fn aggregate(&mut self, root: &Path) -> Result<()> {
        if !root.is_dir() {
            return Err(Error::RadioMap(format!(
                "{} is not a directory",
                root.display()
            )));
        }
        self.visit(root);
        info!(
            "aggregated {} locations from {}",
            self.map.len(),
            root.display()
        );
        Ok(())
    }

    fn visit(&mut self, dir: &Path) {
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                warn!("skipping unreadable directory {}: {}", dir.display(), e);
                return;
            }
        };

        // Sort by name so file-read order, and with it the full radio
        // map's row order, does not depend on filesystem enumeration.
        let mut paths: Vec<_> = entries.filter_map(|e| e.ok().map(|e| e.path())).collect();
        paths.sort();

        for path in paths {
            if path.is_dir() {
                self.visit(&path);
            } else if path.is_file() {
                match logfile::parse_log_file(&path, self.mode) {
                    Ok(samples) => {
                        debug!("merged {} samples from {}", samples.len(), path.display());
                        self.merge(samples);
                    }
                    Err(e) => warn!("skipping survey log: {}", e),
                }
            }
        }
    }

    /// Append samples into the raw map.
    pub fn merge(&mut self, samples: Vec<Sample>) {
        for sample in samples {
            self.map
                .entry(sample.location)
                .or_default()
                .entry(sample.mac)
                .or_default()
                .push(sample.rss);
        }
    }

    pub fn raw(&self) -> &RawRadioMap {
        &self.map
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Canonical MAC order: all distinct MAC addresses, sorted.
    pub fn mac_order(&self) -> Vec<String> {
        let mut macs: Vec<String> = self
            .map
            .values()
            .flat_map(|per_mac| per_mac.keys().cloned())
            .collect();
        macs.sort();
        macs.dedup();
        macs
    }

    /// Derive the mean radio map.
    ///
    /// For each location the mean is taken over `max` slots, where `max`
    /// is the largest per-MAC sample count at that location; MACs with
    /// fewer readings are padded with the NaN placeholder before
    /// averaging. The padding deliberately pulls the mean toward the
    /// placeholder; an ignore-missing average would change calibration
    /// results.
    pub fn derive_mean(&self) -> Result<MeanRadioMap> {
        let mac_order = self.mac_order();
        let mut rows = Vec::with_capacity(self.map.len());

        for (location, per_mac) in &self.map {
            let max = per_mac.values().map(Vec::len).max().unwrap_or(0);
            let mut values = Vec::with_capacity(mac_order.len());
            for mac in &mac_order {
                let mean = match per_mac.get(mac) {
                    None => f64::from(self.nan_value),
                    Some(readings) => {
                        let real: f64 = readings.iter().map(|&v| f64::from(v)).sum();
                        let padded = (max - readings.len()) as f64 * f64::from(self.nan_value);
                        (real + padded) / max as f64
                    }
                };
                values.push(mean);
            }
            rows.push((location.clone(), values));
        }

        MeanRadioMap::new(mac_order, rows)
    }

    /// Write the full and mean radio map files.
    ///
    /// Fails on an empty raw map. On any I/O error both partially
    /// written files are removed before the error is returned.
    pub fn write(&self, radiomap_path: &Path, mean_path: &Path) -> Result<()> {
        if self.map.is_empty() {
            return Err(Error::EmptyRadioMap);
        }

        let result = self.try_write(radiomap_path, mean_path);
        if result.is_err() {
            let _ = fs::remove_file(radiomap_path);
            let _ = fs::remove_file(mean_path);
        }
        result
    }

    fn try_write(&self, radiomap_path: &Path, mean_path: &Path) -> Result<()> {
        let mac_order = self.mac_order();
        let mean = self.derive_mean()?;

        let mut full = BufWriter::new(File::create(radiomap_path)?);
        let mut mean_out = BufWriter::new(File::create(mean_path)?);

        let (first, second) = self.mode.axis_labels();
        let mut header = format!("# {first}, {second}");
        for mac in &mac_order {
            header.push_str(", ");
            header.push_str(mac);
        }
        writeln!(full, "{header}")?;
        writeln!(mean_out, "{header}")?;

        // Full map: one row per sample index, NaN-padded up to the
        // location's largest per-MAC sample count.
        for (location, per_mac) in &self.map {
            let max = per_mac.values().map(Vec::len).max().unwrap_or(0);
            for index in 0..max {
                write!(full, "{}", location.replace(' ', ", "))?;
                for mac in &mac_order {
                    let value = per_mac
                        .get(mac)
                        .and_then(|readings| readings.get(index).copied())
                        .unwrap_or(self.nan_value);
                    write!(full, ", {value}")?;
                }
                writeln!(full)?;
            }
        }

        for (location, values) in mean.rows() {
            write!(mean_out, "{}", location.replace(' ', ", "))?;
            for value in values {
                write!(mean_out, ", {value:.1}")?;
            }
            writeln!(mean_out)?;
        }

        full.flush()?;
        mean_out.flush()?;
        info!(
            "wrote radio map {} and mean radio map {}",
            radiomap_path.display(),
            mean_path.display()
        );
        Ok(())
    }
}

/// Scan a full radio map file for the observed RSS bounds.
///
/// The NaN placeholder is excluded from the minimum; the bounds are
/// informational (carried in [`crate::Parameters`] but never written to
/// the parameters file).
pub fn rss_bounds(radiomap_path: &Path, nan_value: i32) -> Result<(i32, i32)> {
    let reader = BufReader::new(File::open(radiomap_path)?);
    let mut min = i32::MAX;
    let mut max = i32::MIN;

    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        if line.starts_with('#') || line.trim().is_empty() {
            continue;
        }
        let normalized = normalize_separators(&line);
        let fields: Vec<&str> = normalized.split_whitespace().collect();
        if fields.len() < 3 {
            return Err(Error::RadioMap(format!(
                "{}: line {}: {} fields, expected at least 3",
                radiomap_path.display(),
                idx + 1,
                fields.len()
            )));
        }
        for field in &fields[2..] {
            let value: i32 = field.parse().map_err(|_| {
                Error::RadioMap(format!(
                    "{}: line {}: '{}' is not an RSS integer",
                    radiomap_path.display(),
                    idx + 1,
                    field
                ))
            })?;
            if value != nan_value && value < min {
                min = value;
            }
            if value > max {
                max = value;
            }
        }
    }

    if min == i32::MAX {
        return Err(Error::RadioMap(format!(
            "{}: no RSS values found",
            radiomap_path.display()
        )));
    }
    Ok((min, max))
}
