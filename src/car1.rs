use rand::Rng;
use tracing::{debug, trace};

use crate::error::{CarmaError, Result};
use crate::kalman::{check_query_time, check_variance, KalmanFilter};
use crate::params::Car1Params;
use crate::series::TimeSeries;
use crate::types::{CarmaConfig, Prediction};

/// Closed-form scalar recursion for the CAR(1) (Ornstein-Uhlenbeck) process.
#[derive(Debug, Clone)]
pub(crate) struct Car1Model {
    pub(crate) params: Car1Params,
    pub(crate) min_variance: f64,
}

impl Car1Model {
    fn stationary_var(&self) -> f64 {
        self.params.stationary_var()
    }

    fn decay(&self, dt: f64) -> f64 {
        (-self.params.omega * dt).exp()
    }

    /// Belief about the process `dt` after observation `i`, conditional on
    /// observations `0..=i`. Requires `state` filled through `i`.
    fn propagate(&self, state: &Car1State, series: &TimeSeries, i: usize, dt: f64) -> (f64, f64) {
        let rho = self.decay(dt);
        let previous_var = state.var[i] - series.yvar(i);
        let var_ratio = previous_var / state.var[i];

        let mean = rho * state.mean[i] + rho * var_ratio * (series.y()[i] - state.mean[i]);
        let var = self.stationary_var() * (1.0 - rho * rho)
            + rho * rho * previous_var * (1.0 - var_ratio);
        (mean, var)
    }

    /// Backward belief (left neighbor or stationary prior) merged in
    /// information form with the likelihood of the right neighbor,
    /// `y[i] | z ~ N(rho z, stat (1 - rho^2) + yerr[i]^2)`.
    pub(crate) fn predict(&self, series: &TimeSeries, time: f64) -> Result<Prediction> {
        check_query_time(time)?;
        let n = series.len();
        let ipredict = series.bracket(time);

        if series.is_pinned(ipredict, time) {
            return Ok(Prediction::new(series.y()[ipredict], 0.0));
        }

        let mut state = Car1State::new(self, series)?;

        if ipredict == n {
            trace!(time, ipredict, "forecasting CAR(1) process");
            state.run_through(self, series, n - 1)?;
            let (mean, var) = self.propagate(&state, series, n - 1, time - series.time()[n - 1]);
            check_variance(ipredict, var, self.min_variance)?;
            return Ok(Prediction::new(mean, var));
        }

        let (back_mean, back_var) = if ipredict == 0 {
            trace!(time, "backcasting CAR(1) process");
            (0.0, self.stationary_var())
        } else {
            trace!(time, ipredict, "interpolating CAR(1) process");
            state.run_through(self, series, ipredict - 1)?;
            let dt = time - series.time()[ipredict - 1];
            self.propagate(&state, series, ipredict - 1, dt)
        };
        check_variance(ipredict, back_var, self.min_variance)?;

        let rho = self.decay(series.time()[ipredict] - time);
        let noise_var = self.stationary_var() * (1.0 - rho * rho) + series.yvar(ipredict);
        check_variance(ipredict, noise_var, self.min_variance)?;

        let var = 1.0 / (1.0 / back_var + rho * rho / noise_var);
        let mean = var * (back_mean / back_var + rho * series.y()[ipredict] / noise_var);
        Ok(Prediction::new(mean, var))
    }
}

/// Forward recursion state: one-step-ahead predictive means and variances.
#[derive(Debug, Clone)]
pub(crate) struct Car1State {
    mean: Vec<f64>,
    var: Vec<f64>,
    current_index: usize,
}

impl Car1State {
    fn new(model: &Car1Model, series: &TimeSeries) -> Result<Self> {
        let n = series.len();
        let mut state = Self {
            mean: vec![0.0; n],
            var: vec![0.0; n],
            current_index: 0,
        };
        state.reset(model, series)?;
        Ok(state)
    }

    fn reset(&mut self, model: &Car1Model, series: &TimeSeries) -> Result<()> {
        self.mean.fill(0.0);
        self.var.fill(0.0);

        let var0 = model.stationary_var() + series.yvar(0);
        check_variance(0, var0, model.min_variance)?;
        self.var[0] = var0;
        self.current_index = 1;
        Ok(())
    }

    fn update(&mut self, model: &Car1Model, series: &TimeSeries) -> Result<()> {
        let i = self.current_index;
        let n = series.len();
        if i >= n {
            return Err(CarmaError::SeriesExhausted { n });
        }

        let (mean, var) = model.propagate(self, series, i - 1, series.dt(i - 1));
        let var = var + series.yvar(i);
        check_variance(i, var, model.min_variance)?;

        self.mean[i] = mean;
        self.var[i] = var;
        self.current_index += 1;
        Ok(())
    }

    /// Update until `mean`/`var` are filled through `index`.
    fn run_through(&mut self, model: &Car1Model, series: &TimeSeries, index: usize) -> Result<()> {
        while self.current_index <= index {
            self.update(model, series)?;
        }
        Ok(())
    }
}

/// Kalman filter for a CAR(1) process.
#[derive(Debug, Clone)]
pub struct Car1Filter {
    series: TimeSeries,
    model: Car1Model,
    state: Car1State,
}

impl Car1Filter {
    pub fn new(series: TimeSeries, params: Car1Params, config: &CarmaConfig) -> Result<Self> {
        params.validate(config)?;
        let model = Car1Model {
            params,
            min_variance: config.min_variance,
        };
        let state = Car1State::new(&model, &series)?;
        debug!(
            n = series.len(),
            sigsqr = params.sigsqr,
            omega = params.omega,
            "constructed CAR(1) filter"
        );
        Ok(Self {
            series,
            model,
            state,
        })
    }

    pub fn params(&self) -> &Car1Params {
        &self.model.params
    }
}

impl KalmanFilter for Car1Filter {
    fn series(&self) -> &TimeSeries {
        &self.series
    }

    fn reset(&mut self) -> Result<()> {
        self.state.reset(&self.model, &self.series)
    }

    fn update(&mut self) -> Result<()> {
        self.state.update(&self.model, &self.series)
    }

    fn current_index(&self) -> usize {
        self.state.current_index
    }

    fn mean(&self) -> &[f64] {
        &self.state.mean
    }

    fn variance(&self) -> &[f64] {
        &self.state.var
    }

    fn predict(&self, time: f64) -> Result<Prediction> {
        self.model.predict(&self.series, time)
    }

    fn simulate<R: Rng + ?Sized>(&self, times: &[f64], rng: &mut R) -> Result<Vec<f64>> {
        self.model.simulate(&self.series, times, rng)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn load_fixtures() -> serde_json::Value {
        let path = concat!(
            env!("CARGO_MANIFEST_DIR"),
            "/tests/fixtures/irregular_series.json"
        );
        let data = std::fs::read_to_string(path).expect("fixtures file not found");
        serde_json::from_str(&data).expect("invalid JSON")
    }

    fn as_vec(v: &serde_json::Value) -> Vec<f64> {
        v.as_array()
            .unwrap()
            .iter()
            .map(|x| x.as_f64().unwrap())
            .collect()
    }

    fn fixture_filter() -> Car1Filter {
        let fixtures = load_fixtures();
        let case = &fixtures["irregular"];
        let series = TimeSeries::new(
            as_vec(&case["time"]),
            as_vec(&case["y"]),
            as_vec(&case["yerr"]),
        )
        .unwrap();
        let p = &fixtures["car1_params"];
        let params = Car1Params::new(p["sigsqr"].as_f64().unwrap(), p["omega"].as_f64().unwrap());
        Car1Filter::new(series, params, &CarmaConfig::car1()).unwrap()
    }

    #[test]
    fn test_reset_initial_variance() {
        let filter = fixture_filter();
        let stat = filter.params().stationary_var();
        let yerr0 = filter.series().yerr()[0];
        assert_eq!(filter.current_index(), 1);
        assert_eq!(filter.mean()[0], 0.0);
        assert!((filter.variance()[0] - (stat + yerr0 * yerr0)).abs() < 1e-14);
    }

    #[test]
    fn test_variances_positive() {
        let mut filter = fixture_filter();
        let out = filter.filter().unwrap();
        assert_eq!(out.variance.len(), filter.series().len());
        for (i, v) in out.variance.iter().enumerate() {
            assert!(*v > 0.0, "var[{}] = {} not positive", i, v);
        }
        assert!(out.loglike.is_finite());
    }

    #[test]
    fn test_fast_decorrelation_limit() {
        // omega → ∞: every observation is independent of the past
        let series = TimeSeries::new(
            vec![0.0, 1.0, 1.5, 3.0],
            vec![0.4, -1.0, 2.0, 0.3],
            vec![0.1, 0.2, 0.0, 0.3],
        )
        .unwrap();
        let params = Car1Params::new(4.0e6, 1.0e6);
        let mut filter = Car1Filter::new(series, params, &CarmaConfig::car1()).unwrap();
        filter.filter().unwrap();

        let stat = params.stationary_var();
        for i in 0..4 {
            let yerr = filter.series().yerr()[i];
            assert!(filter.mean()[i].abs() < 1e-12);
            assert!((filter.variance()[i] - (stat + yerr * yerr)).abs() < 1e-12);
        }
    }

    #[test]
    fn test_reset_is_idempotent() {
        let mut filter = fixture_filter();
        let first = filter.filter().unwrap();
        filter.reset().unwrap();
        filter.reset().unwrap();
        assert_eq!(filter.current_index(), 1);
        let second = filter.filter().unwrap();
        assert_eq!(first.mean, second.mean);
        assert_eq!(first.variance, second.variance);
    }

    #[test]
    fn test_update_past_end_fails() {
        let mut filter = fixture_filter();
        filter.filter().unwrap();
        assert!(matches!(
            filter.update(),
            Err(CarmaError::SeriesExhausted { .. })
        ));
    }

    #[test]
    fn test_bridge_midpoint() {
        // Ornstein-Uhlenbeck bridge between two exact observations:
        //   mean = rho (x0 + x2) / (1 + rho^2),  var = stat (1 - rho^2) / (1 + rho^2)
        let series = TimeSeries::without_errors(vec![0.0, 2.0], vec![1.0, 1.0]).unwrap();
        let filter =
            Car1Filter::new(series, Car1Params::new(2.0, 1.0), &CarmaConfig::car1()).unwrap();
        let pred = filter.predict(1.0).unwrap();

        let rho = (-1.0f64).exp();
        let expected_mean = 2.0 * rho / (1.0 + rho * rho);
        let expected_var = (1.0 - rho * rho) / (1.0 + rho * rho);
        assert!((pred.mean - expected_mean).abs() < 1e-12, "mean {}", pred.mean);
        assert!((pred.variance - expected_var).abs() < 1e-12, "var {}", pred.variance);
    }

    #[test]
    fn test_predict_far_from_data_reverts_to_prior() {
        let filter = fixture_filter();
        let stat = filter.params().stationary_var();
        let first = filter.series().time()[0];
        let last = *filter.series().time().last().unwrap();

        let back = filter.predict(first - 200.0).unwrap();
        assert!(back.mean.abs() < 1e-10);
        assert!((back.variance - stat).abs() < 1e-10);

        let fwd = filter.predict(last + 200.0).unwrap();
        assert!(fwd.mean.abs() < 1e-10);
        assert!((fwd.variance - stat).abs() < 1e-10);
    }

    #[test]
    fn test_predict_forecast_shrinks_near_last_point() {
        let filter = fixture_filter();
        let last = *filter.series().time().last().unwrap();
        let near = filter.predict(last + 0.01).unwrap();
        let far = filter.predict(last + 5.0).unwrap();
        assert!(near.variance < far.variance);
    }

    #[test]
    fn test_predict_pinned_observation() {
        let series = TimeSeries::without_errors(vec![0.0, 1.0, 2.0], vec![0.5, -0.3, 0.9]).unwrap();
        let filter =
            Car1Filter::new(series, Car1Params::new(1.0, 0.5), &CarmaConfig::car1()).unwrap();
        for (t, y) in [(0.0, 0.5), (1.0, -0.3), (2.0, 0.9)] {
            let pred = filter.predict(t).unwrap();
            assert_eq!(pred.mean, y);
            assert_eq!(pred.variance, 0.0);
        }
    }

    #[test]
    fn test_predict_leaves_filter_state_untouched() {
        let mut filter = fixture_filter();
        let out = filter.filter().unwrap();
        let t = filter.series().time()[5] + 0.1;
        filter.predict(t).unwrap();
        assert_eq!(filter.mean(), &out.mean[..]);
        assert_eq!(filter.variance(), &out.variance[..]);
        assert_eq!(filter.current_index(), filter.series().len());
    }

    #[test]
    fn test_zero_omega_is_numerical_instability() {
        let series = TimeSeries::without_errors(vec![0.0, 1.0], vec![0.0, 1.0]).unwrap();
        let mut config = CarmaConfig::car1();
        config.enforce_stationarity = false;
        let err = Car1Filter::new(series, Car1Params::new(1.0, 0.0), &config).unwrap_err();
        assert!(matches!(err, CarmaError::NumericalInstability { index: 0, .. }));
    }
}
