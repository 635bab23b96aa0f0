//! DishaLocate - WiFi RSS fingerprint localization
//!
//! Turns raw received-signal-strength (RSS) logs into radio map files and
//! estimates a device position from a live fingerprint against those maps.
//!
//! # Pipeline
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                   raw RSS logs                      │  ← logfile/
//! └─────────────────────────────────────────────────────┘
//!                          │ aggregate
//! ┌─────────────────────────────────────────────────────┐
//! │          radio map + mean radio map files           │  ← radiomap/
//! └─────────────────────────────────────────────────────┘
//!                          │ grid search (+ test log)
//! ┌─────────────────────────────────────────────────────┐
//! │                  parameters file                    │  ← calibration
//! └─────────────────────────────────────────────────────┘
//!                          │ serve / load
//! ┌─────────────────────────────────────────────────────┐
//! │        KNN / WKNN / MAP / MMSE estimation           │  ← algorithms
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! The mean radio map holds one averaged fingerprint row per surveyed
//! location, positionally aligned to the MAC address order fixed by the
//! file header. Access points that were never heard at a location are
//! filled with a configured NaN placeholder value, and that placeholder
//! participates in averaging and distance computation as an ordinary
//! number.

pub mod algorithms;
pub mod calibration;
pub mod error;
pub mod logfile;
pub mod radiomap;
pub mod types;

pub use algorithms::Algorithm;
pub use calibration::CalibrationEngine;
pub use error::{Error, Result};
pub use radiomap::{MeanRadioMap, RadioMapBuilder};
pub use types::{AxisMode, Parameters, Point2D, Sample, ScanReading};
