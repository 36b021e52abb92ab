//! Least-squares calibration fit

use serde::{Deserialize, Serialize};

use crate::calibration::transform::{round_to, Calibration};
use crate::constants::CALIBRATION_DECIMALS;
use crate::error::CalibrationError;

/// A reference reading: raw bit value against a known torque
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalibrationPoint {
    pub bit_value: f64,
    pub torque_value: f64,
}

impl CalibrationPoint {
    pub fn new(bit_value: f64, torque_value: f64) -> Self {
        Self {
            bit_value,
            torque_value,
        }
    }
}

/// Fit `torque = slope * bit + intercept` by ordinary least squares.
///
/// Needs at least two points with distinct bit values. The returned
/// coefficients are rounded to three decimal places. On error nothing is
/// produced, so callers keep whatever calibration they already had.
pub fn fit(points: &[CalibrationPoint]) -> Result<Calibration, CalibrationError> {
    if points.len() < 2 {
        return Err(CalibrationError::InsufficientPoints(points.len()));
    }

    if let Some(index) = points
        .iter()
        .position(|p| !p.bit_value.is_finite() || !p.torque_value.is_finite())
    {
        return Err(CalibrationError::NonFinitePoint(index));
    }

    let first = points[0].bit_value;
    if points.iter().all(|p| p.bit_value == first) {
        return Err(CalibrationError::DegenerateCalibration);
    }

    let n = points.len() as f64;
    let mean_x = points.iter().map(|p| p.bit_value).sum::<f64>() / n;
    let mean_y = points.iter().map(|p| p.torque_value).sum::<f64>() / n;

    // Centered sums keep precision when bit values sit far from zero
    let (sxx, sxy) = points.iter().fold((0.0, 0.0), |(sxx, sxy), p| {
        let dx = p.bit_value - mean_x;
        (sxx + dx * dx, sxy + dx * (p.torque_value - mean_y))
    });

    if sxx == 0.0 || !sxx.is_finite() {
        return Err(CalibrationError::DegenerateCalibration);
    }

    let slope = sxy / sxx;
    let intercept = mean_y - slope * mean_x;

    Ok(Calibration::new(
        round_to(slope, CALIBRATION_DECIMALS),
        round_to(intercept, CALIBRATION_DECIMALS),
    ))
}
