//! Linear calibration
//!
//! Converts raw sensor readings to engineering units and fits the
//! conversion from a set of reference points.

pub mod estimator;
pub mod transform;

pub use estimator::{fit, CalibrationPoint};
pub use transform::{round_to, Calibration};
