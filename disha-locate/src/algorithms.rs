//! The four location estimation algorithms.
//!
//! All four take a mean radio map and an observation vector positionally
//! aligned to the map's MAC order:
//!
//! | Algorithm | Parameter | Result |
//! |-----------|-----------|--------|
//! | KNN       | K         | unweighted centroid of the K nearest fingerprints |
//! | WKNN      | K         | 1/distance-weighted centroid of the K nearest |
//! | MAP       | σ         | arg-max of a Gaussian-kernel likelihood |
//! | MMSE      | σ         | likelihood-weighted expectation over all locations |
//!
//! NaN placeholder values participate in the arithmetic as ordinary
//! numbers: an access point missing from the observation contributes a
//! fixed penalty term to every distance. This is a deliberate design
//! compromise inherited from the survey format, not a guarded special
//! case.

use crate::error::{Error, Result};
use crate::radiomap::MeanRadioMap;
use crate::types::{parse_location_key, Point2D, ScanReading};
use std::cmp::Ordering;

/// Algorithm selector, used by calibration and by callers that pick the
/// algorithm at run time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Algorithm {
    Knn,
    Wknn,
    Map,
    Mmse,
}

impl Algorithm {
    pub fn name(self) -> &'static str {
        match self {
            Algorithm::Knn => "KNN",
            Algorithm::Wknn => "WKNN",
            Algorithm::Map => "MAP",
            Algorithm::Mmse => "MMSE",
        }
    }

    /// Run this algorithm with a numeric parameter (K for the neighbor
    /// family, σ for the probabilistic family).
    pub fn run(self, map: &MeanRadioMap, observed: &[f64], parameter: f64) -> Result<Point2D> {
        match self {
            Algorithm::Knn | Algorithm::Wknn => {
                if parameter < 1.0 || parameter.fract() != 0.0 {
                    return Err(Error::InvalidParameter(format!(
                        "K must be a positive integer, got {parameter}"
                    )));
                }
                let k = parameter as usize;
                if self == Algorithm::Knn {
                    knn(map, observed, k)
                } else {
                    wknn(map, observed, k)
                }
            }
            Algorithm::Map => map_estimate(map, observed, parameter),
            Algorithm::Mmse => mmse(map, observed, parameter),
        }
    }
}

/// Build an observation vector aligned to `mac_order` from a scan list.
/// Access points not present in the scan get the NaN placeholder.
pub fn build_observation(mac_order: &[String], scan: &[ScanReading], nan_value: i32) -> Vec<f64> {
    mac_order
        .iter()
        .map(|mac| {
            scan.iter()
                .find(|reading| reading.mac == *mac)
                .map(|reading| f64::from(reading.rss))
                .unwrap_or(f64::from(nan_value))
        })
        .collect()
}

fn check_map(map: &MeanRadioMap, observed: &[f64]) -> Result<()> {
    if map.is_empty() {
        return Err(Error::Computation("mean radio map is empty".to_string()));
    }
    for (key, values) in map.rows() {
        if values.len() != observed.len() {
            return Err(Error::Computation(format!(
                "row '{}' has {} values, observation has {}",
                key,
                values.len(),
                observed.len()
            )));
        }
    }
    Ok(())
}

fn euclidean(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f64>()
        .sqrt()
}

/// All locations with their fingerprint distance to the observation,
/// stably sorted ascending. Equal distances keep map row order.
fn ranked_distances<'a>(map: &'a MeanRadioMap, observed: &[f64]) -> Vec<(&'a str, f64)> {
    let mut ranked: Vec<(&str, f64)> = map
        .rows()
        .iter()
        .map(|(key, values)| (key.as_str(), euclidean(values, observed)))
        .collect();
    ranked.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal));
    ranked
}

/// K nearest neighbors: unweighted centroid of the `min(k, n)` closest
/// fingerprint locations.
pub fn knn(map: &MeanRadioMap, observed: &[f64], k: usize) -> Result<Point2D> {
    if k == 0 {
        return Err(Error::InvalidParameter("K must be at least 1".to_string()));
    }
    check_map(map, observed)?;

    let ranked = ranked_distances(map, observed);
    let k_min = k.min(ranked.len());

    let mut sum_x = 0.0;
    let mut sum_y = 0.0;
    for (key, _) in &ranked[..k_min] {
        let p = parse_location_key(key)?;
        sum_x += p.x;
        sum_y += p.y;
    }
    Ok(Point2D::new(sum_x / k_min as f64, sum_y / k_min as f64))
}

/// Weighted K nearest neighbors: centroid of the `min(k, n)` closest
/// locations weighted by inverse distance.
///
/// An exact fingerprint match (distance 0) short-circuits to that
/// location; the weights would otherwise divide by zero.
pub fn wknn(map: &MeanRadioMap, observed: &[f64], k: usize) -> Result<Point2D> {
    if k == 0 {
        return Err(Error::InvalidParameter("K must be at least 1".to_string()));
    }
    check_map(map, observed)?;

    let ranked = ranked_distances(map, observed);
    if ranked[0].1 == 0.0 {
        return parse_location_key(ranked[0].0);
    }

    let k_min = k.min(ranked.len());
    let mut sum_weights = 0.0;
    let mut sum_x = 0.0;
    let mut sum_y = 0.0;
    for (key, distance) in &ranked[..k_min] {
        let weight = 1.0 / distance;
        let p = parse_location_key(key)?;
        sum_weights += weight;
        sum_x += weight * p.x;
        sum_y += weight * p.y;
    }
    Ok(Point2D::new(sum_x / sum_weights, sum_y / sum_weights))
}

fn check_sigma(sigma: f64) -> Result<()> {
    if sigma <= 0.0 || !sigma.is_finite() {
        return Err(Error::InvalidParameter(format!(
            "σ must be positive and finite, got {sigma}"
        )));
    }
    Ok(())
}

/// Unnormalized Gaussian-kernel likelihood of the observation at one
/// fingerprint row: `Π exp(-(obs - mean)² / σ²)`.
fn kernel_score(values: &[f64], observed: &[f64], sigma: f64) -> f64 {
    values
        .iter()
        .zip(observed)
        .map(|(v, o)| {
            let d = v - o;
            (-(d * d) / (sigma * sigma)).exp()
        })
        .product()
}

/// Maximum a posteriori: the single location with the highest kernel
/// score. Ties break to the lexicographically smallest location key so
/// the result never depends on map iteration order.
pub fn map_estimate(map: &MeanRadioMap, observed: &[f64], sigma: f64) -> Result<Point2D> {
    check_sigma(sigma)?;
    check_map(map, observed)?;

    let mut best: Option<(&str, f64)> = None;
    for (key, values) in map.rows() {
        let score = kernel_score(values, observed, sigma);
        let better = match best {
            None => true,
            Some((best_key, best_score)) => {
                score > best_score || (score == best_score && key.as_str() < best_key)
            }
        };
        if better {
            best = Some((key, score));
        }
    }

    match best {
        Some((key, _)) => parse_location_key(key),
        None => Err(Error::Computation("mean radio map is empty".to_string())),
    }
}

/// Minimum mean square error: expectation over all locations weighted by
/// normalized kernel score.
pub fn mmse(map: &MeanRadioMap, observed: &[f64], sigma: f64) -> Result<Point2D> {
    check_sigma(sigma)?;
    check_map(map, observed)?;

    let scores: Vec<f64> = map
        .rows()
        .iter()
        .map(|(_, values)| kernel_score(values, observed, sigma))
        .collect();
    let total: f64 = scores.iter().sum();
    if total == 0.0 {
        return Err(Error::Computation(
            "all candidate scores are zero, cannot normalize weights".to_string(),
        ));
    }

    let mut sum_x = 0.0;
    let mut sum_y = 0.0;
    for ((key, _), score) in map.rows().iter().zip(&scores) {
        let p = parse_location_key(key)?;
        let weight = score / total;
        sum_x += weight * p.x;
        sum_y += weight * p.y;
    }
    Ok(Point2D::new(sum_x, sum_y))
}
