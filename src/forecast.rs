use crate::error::{CarmaError, Result};
use crate::kalman::{FilterOutput, KalmanFilter};

/// Predictive distribution over a grid of query times.
#[derive(Debug, Clone)]
pub struct PredictionBand {
    /// Predictive means E[z(t) | series].
    pub mean: Vec<f64>,
    /// Predictive variances Var[z(t) | series].
    pub variance: Vec<f64>,
    /// Lower confidence interval bounds.
    pub ci_lower: Vec<f64>,
    /// Upper confidence interval bounds.
    pub ci_upper: Vec<f64>,
}

/// Residual diagnostics output.
#[derive(Debug, Clone)]
pub struct ResidualOutput {
    /// Raw innovations y_i - mean_i.
    pub residuals: Vec<f64>,
    /// Standardized residuals (y_i - mean_i) / sqrt(var_i).
    pub standardized_residuals: Vec<f64>,
}

/// Predict at every time in `times` and attach a symmetric normal
/// `(1 - alpha)` confidence interval.
///
/// Query times may lie anywhere: before, between or after the observations.
pub fn predict_band<F: KalmanFilter>(
    filter: &F,
    times: &[f64],
    alpha: f64,
) -> Result<PredictionBand> {
    if !(alpha > 0.0 && alpha < 1.0) {
        return Err(CarmaError::InvalidParameter(format!(
            "alpha must lie in (0, 1), got {}",
            alpha
        )));
    }

    // z-score for confidence interval
    let z_alpha = z_score(1.0 - alpha / 2.0);

    let m = times.len();
    let mut mean = Vec::with_capacity(m);
    let mut variance = Vec::with_capacity(m);
    let mut ci_lower = Vec::with_capacity(m);
    let mut ci_upper = Vec::with_capacity(m);

    for &t in times {
        let pred = filter.predict(t)?;
        let se = pred.std_dev();
        mean.push(pred.mean);
        variance.push(pred.variance);
        ci_lower.push(pred.mean - z_alpha * se);
        ci_upper.push(pred.mean + z_alpha * se);
    }

    Ok(PredictionBand {
        mean,
        variance,
        ci_lower,
        ci_upper,
    })
}

/// Compute residuals and standardized residuals from a filter pass.
pub fn compute_residuals(filter_output: &FilterOutput) -> ResidualOutput {
    let standardized = filter_output
        .innovations
        .iter()
        .zip(filter_output.variance.iter())
        .map(|(&v, &f)| if f > 0.0 { v / f.sqrt() } else { 0.0 })
        .collect();

    ResidualOutput {
        residuals: filter_output.innovations.clone(),
        standardized_residuals: standardized,
    }
}

/// Approximate inverse normal CDF using rational approximation (Abramowitz & Stegun 26.2.23).
fn z_score(p: f64) -> f64 {
    if p <= 0.0 {
        return f64::NEG_INFINITY;
    }
    if p >= 1.0 {
        return f64::INFINITY;
    }
    if (p - 0.5).abs() < 1e-15 {
        return 0.0;
    }

    let (sign, q) = if p < 0.5 { (-1.0, p) } else { (1.0, 1.0 - p) };
    let t = (-2.0 * q.ln()).sqrt();

    let c0 = 2.515517;
    let c1 = 0.802853;
    let c2 = 0.010328;
    let d1 = 1.432788;
    let d2 = 0.189269;
    let d3 = 0.001308;

    let x = t - (c0 + c1 * t + c2 * t * t) / (1.0 + d1 * t + d2 * t * t + d3 * t * t * t);

    sign * x
}
