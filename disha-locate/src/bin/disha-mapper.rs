//! Offline radio map builder.
//!
//! Aggregates a folder tree of RSS survey logs into the full and mean
//! radio map files, and optionally calibrates estimator parameters
//! against a held-out test log:
//!
//! ```text
//! disha-mapper rsslogs/ radiomap.txt --test-log walk1.txt
//! ```
//!
//! writes `radiomap.txt`, `radiomap-mean.txt` and (with `--test-log`)
//! `radiomap-parameters.txt`.

use clap::{Parser, ValueEnum};
use disha_locate::{AxisMode, CalibrationEngine, MeanRadioMap, RadioMapBuilder, Result};
use log::info;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ModeArg {
    /// Planar X/Y survey coordinates
    Indoor,
    /// Latitude/Longitude survey coordinates
    Outdoor,
}

impl From<ModeArg> for AxisMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Indoor => AxisMode::Indoor,
            ModeArg::Outdoor => AxisMode::Outdoor,
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "disha-mapper", about = "Build radio map files from RSS survey logs")]
struct Args {
    /// Folder tree containing RSS survey logs
    rss_folder: PathBuf,

    /// Output path for the full radio map
    radiomap: PathBuf,

    /// Output path for the mean radio map
    /// (default: radiomap path with a `-mean` suffix)
    #[arg(long)]
    mean: Option<PathBuf>,

    /// Output path for the calibrated parameters
    /// (default: radiomap path with a `-parameters` suffix)
    #[arg(long)]
    parameters: Option<PathBuf>,

    /// Held-out test log; when given, estimator parameters are
    /// calibrated and written after aggregation
    #[arg(long)]
    test_log: Option<PathBuf>,

    /// Placeholder RSS value for unheard access points
    #[arg(long, default_value_t = -110)]
    nan_value: i32,

    /// Survey coordinate mode
    #[arg(long, value_enum, default_value_t = ModeArg::Indoor)]
    mode: ModeArg,
}

/// `radiomap.txt` → `radiomap-mean.txt` (same scheme the server expects).
fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("radiomap");
    let mut name = format!("{stem}{suffix}");
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        name.push('.');
        name.push_str(ext);
    }
    path.with_file_name(name)
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let mode = AxisMode::from(args.mode);
    let mean_path = args
        .mean
        .unwrap_or_else(|| with_suffix(&args.radiomap, "-mean"));
    let parameters_path = args
        .parameters
        .unwrap_or_else(|| with_suffix(&args.radiomap, "-parameters"));

    let mut builder = RadioMapBuilder::new(mode, args.nan_value);
    builder.aggregate(&args.rss_folder)?;
    builder.write(&args.radiomap, &mean_path)?;

    if let Some(test_log) = args.test_log {
        // Calibrate against the mean map exactly as written to disk so
        // that clients replaying the served file see the same numbers.
        let mean_map = MeanRadioMap::from_file(&mean_path)?;
        let engine = CalibrationEngine::new(mode, args.nan_value);
        let parameters = engine.calibrate(&mean_map, &args.radiomap, &test_log)?;
        parameters.write_to(&parameters_path)?;
        info!(
            "calibrated parameters written to {} (KNN={}, WKNN={}, MAP={}, MMSE={})",
            parameters_path.display(),
            parameters.k_knn,
            parameters.k_wknn,
            parameters.s_map,
            parameters.s_mmse
        );
    }

    Ok(())
}
