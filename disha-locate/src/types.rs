//! Core types shared across the crate.

use crate::error::{Error, Result};
use std::fmt;
use std::str::FromStr;

/// Survey mode. Selects the coordinate axis labels expected in log file
/// headers and written to radio map headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AxisMode {
    /// Local planar coordinates, header labels `X`, `Y`
    Indoor,
    /// Geographic coordinates, header labels `Latitude`, `Longitude`
    Outdoor,
}

impl AxisMode {
    /// The pair of axis labels this mode expects in file headers.
    pub fn axis_labels(self) -> (&'static str, &'static str) {
        match self {
            AxisMode::Indoor => ("X", "Y"),
            AxisMode::Outdoor => ("Latitude", "Longitude"),
        }
    }
}

impl fmt::Display for AxisMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AxisMode::Indoor => write!(f, "indoor"),
            AxisMode::Outdoor => write!(f, "outdoor"),
        }
    }
}

impl FromStr for AxisMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "indoor" => Ok(AxisMode::Indoor),
            "outdoor" => Ok(AxisMode::Outdoor),
            other => Err(Error::InvalidParameter(format!(
                "unknown axis mode '{other}' (expected 'indoor' or 'outdoor')"
            ))),
        }
    }
}

/// One raw RSS reading from a survey log.
///
/// `location` is the verbatim `"x y"` text of the coordinate pair as it
/// appears in the log. Textually different spellings of the same numeric
/// coordinate ("1 2" vs "1.0 2.0") are distinct locations; normalizing
/// them would silently change how logs from different sources merge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sample {
    /// Verbatim coordinate-pair key
    pub location: String,
    /// Access point MAC address
    pub mac: String,
    /// Received signal strength (dBm)
    pub rss: i32,
}

/// One access point sighting from a live or test scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanReading {
    /// Access point MAC address
    pub mac: String,
    /// Received signal strength (dBm)
    pub rss: i32,
}

/// 2D position in the survey coordinate frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point2D {
    pub x: f64,
    pub y: f64,
}

impl Point2D {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point.
    pub fn distance_to(&self, other: &Point2D) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

impl fmt::Display for Point2D {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.x, self.y)
    }
}

/// Parse a `"x y"` location key into coordinates.
pub fn parse_location_key(key: &str) -> Result<Point2D> {
    let mut fields = key.split_whitespace();
    let (Some(x), Some(y)) = (fields.next(), fields.next()) else {
        return Err(Error::Computation(format!(
            "location key '{key}' does not hold two coordinates"
        )));
    };
    let x: f64 = x
        .parse()
        .map_err(|_| Error::Computation(format!("location key '{key}' has non-numeric x")))?;
    let y: f64 = y
        .parse()
        .map_err(|_| Error::Computation(format!("location key '{key}' has non-numeric y")))?;
    Ok(Point2D::new(x, y))
}

/// Calibrated estimator parameters.
///
/// `min_rss`/`max_rss` are the observed signal bounds across the full
/// radio map. They are informational and are not written to the
/// parameters file, which carries exactly five lines.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameters {
    /// Placeholder value standing in for unheard access points
    pub nan_value: i32,
    /// Winning neighbor count for KNN
    pub k_knn: u32,
    /// Winning neighbor count for WKNN
    pub k_wknn: u32,
    /// Winning kernel width for MAP
    pub s_map: f64,
    /// Winning kernel width for MMSE
    pub s_mmse: f64,
    /// Smallest real (non-placeholder) RSS value observed
    pub min_rss: i32,
    /// Largest RSS value observed
    pub max_rss: i32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn axis_mode_labels() {
        assert_eq!(AxisMode::Indoor.axis_labels(), ("X", "Y"));
        assert_eq!(AxisMode::Outdoor.axis_labels(), ("Latitude", "Longitude"));
    }

    #[test]
    fn axis_mode_from_str() {
        assert_eq!("indoor".parse::<AxisMode>().unwrap(), AxisMode::Indoor);
        assert_eq!(" Outdoor ".parse::<AxisMode>().unwrap(), AxisMode::Outdoor);
        assert!("underwater".parse::<AxisMode>().is_err());
    }

    #[test]
    fn location_key_parsing() {
        let p = parse_location_key("1.5 -2.25").unwrap();
        assert_eq!(p, Point2D::new(1.5, -2.25));
        assert!(parse_location_key("1.5").is_err());
        assert!(parse_location_key("a b").is_err());
    }

    #[test]
    fn point_distance() {
        let a = Point2D::new(0.0, 0.0);
        let b = Point2D::new(3.0, 4.0);
        assert_eq!(a.distance_to(&b), 5.0);
    }
}
