//! Interpolation, backcasting and forecasting for the CARMA(p, q) filter.
//!
//! A query at `time` is answered by merging two Gaussian beliefs about the
//! process value `z` there, in information form:
//!
//! - the backward belief `N(ymean, yvar)`, from the forward recursion run over
//!   every observation strictly before `time` (the stationary prior when
//!   there are none);
//! - the evidence of every observation at or after `time`. For these the
//!   recursion is continued with `z` treated as unknown: observation `i` has
//!   conditional mean `yconst_i + yslope_i * z` and innovation variance
//!   `var_i`, so it adds `yslope_i^2 / var_i` to the precision and
//!   `yslope_i (y_i - yconst_i) / var_i` to the precision-weighted mean.

use nalgebra::DVector;
use tracing::trace;

use crate::carma::{real, CarmaModel, CarmaState};
use crate::error::{CarmaError, Result};
use crate::kalman::{check_query_time, check_variance};
use crate::series::TimeSeries;
use crate::types::{Prediction, C64};

/// Coefficients of the linear filter expressing the predicted state (and the
/// predicted observation) as an affine function of the process value `z` at
/// the query time.
#[derive(Debug, Clone)]
pub(crate) struct LinearCoefs {
    pub(crate) state_const: DVector<C64>,
    pub(crate) state_slope: DVector<C64>,
    pub(crate) yconst: f64,
    pub(crate) yslope: f64,
}

impl CarmaModel {
    pub(crate) fn predict(&self, series: &TimeSeries, time: f64) -> Result<Prediction> {
        check_query_time(time)?;
        let n = series.len();
        let ipredict = series.bracket(time);

        if series.is_pinned(ipredict, time) {
            return Ok(Prediction::new(series.y()[ipredict], 0.0));
        }

        let (mut state, ymean, yvar) = self.backward_belief(series, time, ipredict)?;

        if ipredict == n {
            trace!(time, ipredict, "forecasting CARMA process");
            return Ok(Prediction::new(ymean, yvar));
        }
        trace!(time, ipredict, "interpolating CARMA process");

        let mut yprecision = 1.0 / yvar;
        let mut weighted_mean = ymean / yvar;

        let mut coefs = state.initialize_coefs(self, series, time, ipredict, ymean, yvar)?;
        let mut i = ipredict;
        loop {
            let var = state.var[i];
            yprecision += coefs.yslope * coefs.yslope / var;
            weighted_mean += coefs.yslope * (series.y()[i] - coefs.yconst) / var;

            if state.current_index >= n {
                break;
            }
            i = state.update_coefs(self, series, &mut coefs)?;
        }

        let var = 1.0 / yprecision;
        Ok(Prediction::new(weighted_mean * var, var))
    }

    /// Belief about the process at `time` from the observations before
    /// `ipredict` only, together with the recursion state it leaves behind.
    pub(crate) fn backward_belief(
        &self,
        series: &TimeSeries,
        time: f64,
        ipredict: usize,
    ) -> Result<(CarmaState, f64, f64)> {
        let mut state = CarmaState::new(self, series)?;
        for _ in 1..ipredict {
            state.update(self, series)?;
        }

        if ipredict == 0 {
            return Ok((state, 0.0, self.init.stationary_var));
        }

        state.absorb(self, ipredict - 1);
        state.propagate(self, time - series.time()[ipredict - 1]);

        let ymean = self.init.observe_mean(&state.state_vector);
        let yvar = self.init.observe_var(&state.prediction_var);
        check_variance(ipredict, yvar, self.min_variance)?;
        Ok((state, ymean, yvar))
    }
}

impl CarmaState {
    /// Condition on the unknown value at `time` (backward belief
    /// `N(ymean, yvar)`), split the state into constant and slope parts, and
    /// carry them to observation `itime`.
    pub(crate) fn initialize_coefs(
        &mut self,
        model: &CarmaModel,
        series: &TimeSeries,
        time: f64,
        itime: usize,
        ymean: f64,
        yvar: f64,
    ) -> Result<LinearCoefs> {
        let gain = self.gain(model, yvar);
        let state_const = &self.state_vector - &gain * real(ymean);
        let state_slope = gain.clone();
        self.shrink(&gain, yvar);
        self.kalman_gain = gain;

        self.rho = model.decay(series.time()[itime] - time);
        let mut coefs = LinearCoefs {
            state_const: state_const.component_mul(&self.rho),
            state_slope: state_slope.component_mul(&self.rho),
            yconst: 0.0,
            yslope: 0.0,
        };
        self.propagate_cov(model);

        self.observe_coefs(model, series, itime, &mut coefs)?;
        self.current_index = itime + 1;
        Ok(coefs)
    }

    /// Fold observation `current_index - 1` into the coefficients and carry
    /// them to the next observation. Returns the index of that observation.
    pub(crate) fn update_coefs(
        &mut self,
        model: &CarmaModel,
        series: &TimeSeries,
        coefs: &mut LinearCoefs,
    ) -> Result<usize> {
        let i = self.current_index;
        let n = series.len();
        if i >= n {
            return Err(CarmaError::SeriesExhausted { n });
        }

        let var = self.var[i - 1];
        let gain = self.gain(model, var);
        coefs.state_const += &gain * real(series.y()[i - 1] - coefs.yconst);
        coefs.state_slope -= &gain * real(coefs.yslope);
        self.shrink(&gain, var);
        self.kalman_gain = gain;

        self.rho = model.decay(series.dt(i - 1));
        coefs.state_const.component_mul_assign(&self.rho);
        coefs.state_slope.component_mul_assign(&self.rho);
        self.propagate_cov(model);

        self.observe_coefs(model, series, i, coefs)?;
        self.current_index += 1;
        Ok(i)
    }

    /// Observation-space coefficients and innovation variance at `index`.
    fn observe_coefs(
        &mut self,
        model: &CarmaModel,
        series: &TimeSeries,
        index: usize,
        coefs: &mut LinearCoefs,
    ) -> Result<()> {
        coefs.yconst = model.init.observe_mean(&coefs.state_const);
        coefs.yslope = model.init.observe_mean(&coefs.state_slope);

        let var = model.init.observe_var(&self.prediction_var) + series.yvar(index);
        check_variance(index, var, model.min_variance)?;
        self.var[index] = var;
        Ok(())
    }
}
