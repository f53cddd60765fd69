//! Error functions used as fitness and for reporting.
//!
//! All functions take `(predicted, actual)` slices of equal length and
//! return a non-negative error. Lower is better.

use std::fmt;
use std::str::FromStr;

/// Pluggable error function: `(predicted, actual) -> error`.
pub type ErrorFn = fn(&[f64], &[f64]) -> f64;

/// Default tolerance for [`compare_floats`].
pub const EPSILON: f64 = 0.005;

/// `|a - b| < epsilon`.
#[inline]
pub fn compare_floats(a: f64, b: f64, epsilon: f64) -> bool {
    (a - b).abs() < epsilon
}

/// Mean squared error.
pub fn mse(predicted: &[f64], actual: &[f64]) -> f64 {
    debug_assert_eq!(predicted.len(), actual.len());
    if actual.is_empty() {
        return 0.0;
    }
    let sum: f64 = predicted
        .iter()
        .zip(actual)
        .map(|(p, a)| (p - a) * (p - a))
        .sum();
    sum / actual.len() as f64
}

/// Root mean squared error.
pub fn rmse(predicted: &[f64], actual: &[f64]) -> f64 {
    mse(predicted, actual).sqrt()
}

/// Mean absolute error.
pub fn mae(predicted: &[f64], actual: &[f64]) -> f64 {
    debug_assert_eq!(predicted.len(), actual.len());
    if actual.is_empty() {
        return 0.0;
    }
    let sum: f64 = predicted.iter().zip(actual).map(|(p, a)| (p - a).abs()).sum();
    sum / actual.len() as f64
}

/// Named selector over the built-in error functions.
///
/// ```
/// use u_symreg::metrics::Metric;
///
/// let m: Metric = "rmse".parse().unwrap();
/// assert_eq!((m.function())(&[1.0, 3.0], &[1.0, 1.0]), 2f64.sqrt());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    Mse,
    Rmse,
    Mae,
}

impl Metric {
    pub const ALL: [Metric; 3] = [Metric::Mse, Metric::Rmse, Metric::Mae];

    pub fn function(self) -> ErrorFn {
        match self {
            Metric::Mse => mse,
            Metric::Rmse => rmse,
            Metric::Mae => mae,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Metric::Mse => "mse",
            Metric::Rmse => "rmse",
            Metric::Mae => "mae",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Metric {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mse" => Ok(Metric::Mse),
            "rmse" => Ok(Metric::Rmse),
            "mae" => Ok(Metric::Mae),
            other => Err(format!("unknown metric '{other}' (expected mse, rmse or mae)")),
        }
    }
}
