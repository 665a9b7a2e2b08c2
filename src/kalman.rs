use std::f64::consts::PI;

use rand::Rng;
use tracing::warn;

use crate::error::{CarmaError, Result};
use crate::series::TimeSeries;
use crate::types::Prediction;

/// Output of a full forward filter pass.
#[derive(Debug, Clone)]
pub struct FilterOutput {
    /// One-step-ahead predictive means E[y_i | y_0..y_{i-1}].
    pub mean: Vec<f64>,
    /// One-step-ahead predictive variances, measurement error included.
    pub variance: Vec<f64>,
    /// Innovation sequence y_i - mean_i.
    pub innovations: Vec<f64>,
    /// Gaussian log-likelihood of the series.
    pub loglike: f64,
}

impl FilterOutput {
    pub(crate) fn from_pass(series: &TimeSeries, mean: &[f64], variance: &[f64]) -> Self {
        let innovations: Vec<f64> = series
            .y()
            .iter()
            .zip(mean.iter())
            .map(|(y, m)| y - m)
            .collect();
        let loglike = gaussian_loglike(series.y(), mean, variance);
        Self {
            mean: mean.to_vec(),
            variance: variance.to_vec(),
            innovations,
            loglike,
        }
    }
}

/// Prediction-error decomposition of the Gaussian log-likelihood:
///   loglike = -0.5 * sum_i [ ln(2pi var_i) + (y_i - mean_i)^2 / var_i ]
pub fn gaussian_loglike(y: &[f64], mean: &[f64], variance: &[f64]) -> f64 {
    y.iter()
        .zip(mean.iter())
        .zip(variance.iter())
        .map(|((y, m), v)| {
            let r = y - m;
            -0.5 * ((2.0 * PI * v).ln() + r * r / v)
        })
        .sum()
}

/// Fail on a predictive variance that is non-finite or not above `min_variance`.
pub(crate) fn check_variance(index: usize, variance: f64, min_variance: f64) -> Result<()> {
    if variance.is_finite() && variance > min_variance {
        return Ok(());
    }
    warn!(index, variance, min_variance, "predictive variance is not positive");
    Err(CarmaError::NumericalInstability { index, variance })
}

/// Fail on a query time that is not finite.
pub(crate) fn check_query_time(time: f64) -> Result<()> {
    if time.is_finite() {
        Ok(())
    } else {
        Err(CarmaError::InvalidParameter(format!(
            "query time must be finite, got {}",
            time
        )))
    }
}

/// Kalman filter for a continuous-time autoregressive process observed at
/// irregular times.
///
/// `reset` and `update` advance the forward recursion in place and fill the
/// `mean`/`variance` arrays. `predict` and `simulate` work on a private copy
/// of the recursion and leave the filter untouched.
pub trait KalmanFilter {
    /// Conditioning series.
    fn series(&self) -> &TimeSeries;

    /// Re-initialize to the stationary prior; sets `current_index` to 1.
    fn reset(&mut self) -> Result<()>;

    /// Advance the recursion by one observation.
    fn update(&mut self) -> Result<()>;

    /// Index of the next observation `update` will fill.
    fn current_index(&self) -> usize;

    fn mean(&self) -> &[f64];

    fn variance(&self) -> &[f64];

    /// Predictive distribution of the process at `time` given the whole series.
    fn predict(&self, time: f64) -> Result<Prediction>;

    /// Draw process values at `times`, conditional on the series. Results are
    /// returned in the order of `times`.
    ///
    /// Each draw is conditioned on as an error-free observation before the
    /// next query is predicted. With high order and query spacing far below
    /// the process decorrelation time, the conditional variance of the next
    /// point falls to f64 round-off and the call fails with
    /// [`CarmaError::NumericalInstability`]; coarsen the grid or add
    /// measurement error to the conditioning series.
    fn simulate<R: Rng + ?Sized>(&self, times: &[f64], rng: &mut R) -> Result<Vec<f64>>;

    /// Reset, then update through every observation.
    fn filter(&mut self) -> Result<FilterOutput> {
        self.reset()?;
        while self.current_index() < self.series().len() {
            self.update()?;
        }
        Ok(FilterOutput::from_pass(
            self.series(),
            self.mean(),
            self.variance(),
        ))
    }

    /// Log-likelihood of the series from a full filter pass.
    fn loglike(&mut self) -> Result<f64> {
        Ok(self.filter()?.loglike)
    }
}
