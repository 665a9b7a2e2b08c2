use nalgebra::{DMatrix, DVector, RowDVector};
use rand::Rng;
use tracing::debug;

use crate::error::{CarmaError, Result};
use crate::initialization::StationaryInit;
use crate::kalman::{check_variance, KalmanFilter};
use crate::params::CarmaParams;
use crate::series::TimeSeries;
use crate::types::{CarmaConfig, Prediction, C64};

pub(crate) fn real(x: f64) -> C64 {
    C64::new(x, 0.0)
}

/// Immutable part of the CARMA(p, q) filter: AR roots plus the stationary
/// eigenbasis quantities computed once from the parameters.
#[derive(Debug, Clone)]
pub(crate) struct CarmaModel {
    pub(crate) params: CarmaParams,
    pub(crate) init: StationaryInit,
    pub(crate) min_variance: f64,
}

impl CarmaModel {
    pub(crate) fn new(params: CarmaParams, config: &CarmaConfig) -> Result<Self> {
        params.validate(config)?;
        let init = StationaryInit::new(&params)?;
        Ok(Self {
            params,
            init,
            min_variance: config.min_variance,
        })
    }

    /// Elementwise decay factors exp(root * dt).
    pub(crate) fn decay(&self, dt: f64) -> DVector<C64> {
        self.params.ar_roots.map(|r| (r * dt).exp())
    }
}

/// Mutable recursion state of the CARMA(p, q) filter.
///
/// `mean[i]`/`var[i]` are the one-step-ahead predictive moments of
/// observation `i`; the state vector and `prediction_var` live in the
/// eigenbasis and are the predicted state at `time[current_index - 1]`.
#[derive(Debug, Clone)]
pub(crate) struct CarmaState {
    pub(crate) mean: Vec<f64>,
    pub(crate) var: Vec<f64>,
    pub(crate) innovation: f64,
    pub(crate) current_index: usize,
    pub(crate) state_vector: DVector<C64>,
    pub(crate) prediction_var: DMatrix<C64>,
    pub(crate) kalman_gain: DVector<C64>,
    pub(crate) rho: DVector<C64>,
}

impl CarmaState {
    pub(crate) fn new(model: &CarmaModel, series: &TimeSeries) -> Result<Self> {
        let n = series.len();
        let p = model.params.ar_roots.len();
        let mut state = Self {
            mean: vec![0.0; n],
            var: vec![0.0; n],
            innovation: 0.0,
            current_index: 0,
            state_vector: DVector::zeros(p),
            prediction_var: DMatrix::zeros(p, p),
            kalman_gain: DVector::zeros(p),
            rho: DVector::from_element(p, real(1.0)),
        };
        state.reset(model, series)?;
        Ok(state)
    }

    pub(crate) fn reset(&mut self, model: &CarmaModel, series: &TimeSeries) -> Result<()> {
        self.mean.fill(0.0);
        self.var.fill(0.0);
        self.state_vector.copy_from(&model.init.initial_state);
        self.prediction_var.copy_from(&model.init.state_var);
        self.kalman_gain.fill(real(0.0));
        self.rho.fill(real(1.0));

        let var0 = model.init.stationary_var + series.yvar(0);
        check_variance(0, var0, model.min_variance)?;
        self.var[0] = var0;
        self.innovation = series.y()[0];
        self.current_index = 1;
        Ok(())
    }

    /// Kalman gain for an observation with predictive variance `var`:
    /// K = PredictionVar * rotated_ma^H / var.
    pub(crate) fn gain(&self, model: &CarmaModel, var: f64) -> DVector<C64> {
        &self.prediction_var * model.init.rotated_ma.adjoint() * real(1.0 / var)
    }

    /// PredictionVar -= var * K K^H
    pub(crate) fn shrink(&mut self, gain: &DVector<C64>, var: f64) {
        self.prediction_var -= gain * gain.adjoint() * real(var);
    }

    /// Condition the predicted state on observation `index`, whose innovation
    /// is the current `innovation`.
    pub(crate) fn absorb(&mut self, model: &CarmaModel, index: usize) {
        let var = self.var[index];
        let gain = self.gain(model, var);
        self.state_vector += &gain * real(self.innovation);
        self.shrink(&gain, var);
        self.kalman_gain = gain;
    }

    /// PredictionVar := (rho rho^H) ⊙ (PredictionVar - StateVar) + StateVar
    pub(crate) fn propagate_cov(&mut self, model: &CarmaModel) {
        let state_var = &model.init.state_var;
        let decay = &self.rho * self.rho.adjoint();
        self.prediction_var = decay.component_mul(&(&self.prediction_var - state_var)) + state_var;
    }

    /// Carry the state and its covariance forward by `dt`.
    pub(crate) fn propagate(&mut self, model: &CarmaModel, dt: f64) {
        self.rho = model.decay(dt);
        self.state_vector.component_mul_assign(&self.rho);
        self.propagate_cov(model);
    }

    pub(crate) fn update(&mut self, model: &CarmaModel, series: &TimeSeries) -> Result<()> {
        let i = self.current_index;
        let n = series.len();
        if i >= n {
            return Err(CarmaError::SeriesExhausted { n });
        }

        self.absorb(model, i - 1);
        self.propagate(model, series.dt(i - 1));

        let mean = model.init.observe_mean(&self.state_vector);
        let var = model.init.observe_var(&self.prediction_var) + series.yvar(i);
        check_variance(i, var, model.min_variance)?;

        self.mean[i] = mean;
        self.var[i] = var;
        self.innovation = series.y()[i] - mean;
        self.current_index += 1;
        Ok(())
    }
}

/// Kalman filter for a CARMA(p, q) process.
#[derive(Debug, Clone)]
pub struct CarmaFilter {
    series: TimeSeries,
    pub(crate) model: CarmaModel,
    state: CarmaState,
}

impl CarmaFilter {
    pub fn new(series: TimeSeries, params: CarmaParams, config: &CarmaConfig) -> Result<Self> {
        let model = CarmaModel::new(params, config)?;
        let state = CarmaState::new(&model, &series)?;
        debug!(
            p = config.order.p,
            q = config.order.q,
            n = series.len(),
            stationary_var = model.init.stationary_var,
            "constructed CARMA filter"
        );
        Ok(Self {
            series,
            model,
            state,
        })
    }

    /// Filter for AR roots derived from Lorentzian PSD parameters.
    pub fn from_psd(
        series: TimeSeries,
        sigsqr: f64,
        lorentz_params: &[f64],
        ma_coefs: Vec<f64>,
        config: &CarmaConfig,
    ) -> Result<Self> {
        Self::new(
            series,
            CarmaParams::from_psd(sigsqr, lorentz_params, ma_coefs),
            config,
        )
    }

    pub fn params(&self) -> &CarmaParams {
        &self.model.params
    }

    pub fn ar_roots(&self) -> &DVector<C64> {
        &self.model.params.ar_roots
    }

    pub fn rotated_ma_coefs(&self) -> &RowDVector<C64> {
        &self.model.init.rotated_ma
    }

    pub fn stationary_covariance(&self) -> &DMatrix<C64> {
        &self.model.init.state_var
    }

    /// Stationary variance of the observed process (no measurement error).
    pub fn stationary_variance(&self) -> f64 {
        self.model.init.stationary_var
    }

    pub fn prediction_covariance(&self) -> &DMatrix<C64> {
        &self.state.prediction_var
    }

    pub fn state_vector(&self) -> &DVector<C64> {
        &self.state.state_vector
    }

    pub fn kalman_gain(&self) -> &DVector<C64> {
        &self.state.kalman_gain
    }

    pub fn decay_factors(&self) -> &DVector<C64> {
        &self.state.rho
    }

    pub fn innovation(&self) -> f64 {
        self.state.innovation
    }
}

impl KalmanFilter for CarmaFilter {
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
