//! Affine raw-to-engineering-unit transform

use serde::{Deserialize, Serialize};

use crate::constants::SAMPLE_DECIMALS;

/// Slope and intercept of `calibrated = slope * raw + intercept`.
///
/// The pair is `Copy` and always handed around as one value, so a reader
/// never observes a slope from one update and an intercept from another.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Calibration {
    pub slope: f64,
    pub intercept: f64,
}

impl Calibration {
    pub fn new(slope: f64, intercept: f64) -> Self {
        Self { slope, intercept }
    }

    /// Apply the transform, rounded to the log file's sample precision
    pub fn apply(&self, raw: f64) -> f64 {
        round_to(self.slope * raw + self.intercept, SAMPLE_DECIMALS)
    }
}

impl Default for Calibration {
    fn default() -> Self {
        Self {
            slope: 1.0,
            intercept: 0.0,
        }
    }
}

/// Round to `decimals` places, exact ties going to the even digit
pub fn round_to(value: f64, decimals: u32) -> f64 {
    let scale = 10f64.powi(decimals as i32);
    let rounded = (value * scale).round_ties_even() / scale;
    // Avoid writing "-0.0"
    if rounded == 0.0 {
        0.0
    } else {
        rounded
    }
}
