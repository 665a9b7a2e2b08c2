//! Conditional simulation of the process at arbitrary times.

use rand::Rng;
use rand_distr::{Distribution, StandardNormal};
use tracing::debug;

use crate::car1::Car1Model;
use crate::carma::CarmaModel;
use crate::error::Result;
use crate::kalman::check_query_time;
use crate::series::TimeSeries;

/// One draw from N(mean, sd^2).
pub(crate) fn draw_normal<R: Rng + ?Sized>(rng: &mut R, mean: f64, sd: f64) -> f64 {
    let z: f64 = StandardNormal.sample(rng);
    mean + sd * z
}

fn check_times(times: &[f64]) -> Result<()> {
    times.iter().try_for_each(|&t| check_query_time(t))
}

impl Car1Model {
    /// Independent draws from the marginal predictive distribution at each
    /// time, in query order.
    pub(crate) fn simulate<R: Rng + ?Sized>(
        &self,
        series: &TimeSeries,
        times: &[f64],
        rng: &mut R,
    ) -> Result<Vec<f64>> {
        check_times(times)?;
        debug!(m = times.len(), "simulating CAR(1) process");
        times
            .iter()
            .map(|&t| {
                let pred = self.predict(series, t)?;
                Ok(draw_normal(rng, pred.mean, pred.std_dev()))
            })
            .collect()
    }
}

impl CarmaModel {
    /// Sequential joint draw: visit the query times in increasing order, draw
    /// from the predictive distribution given the data and every earlier draw,
    /// then condition on the drawn value as an exact observation.
    pub(crate) fn simulate<R: Rng + ?Sized>(
        &self,
        series: &TimeSeries,
        times: &[f64],
        rng: &mut R,
    ) -> Result<Vec<f64>> {
        check_times(times)?;
        debug!(m = times.len(), n = series.len(), "simulating CARMA process");

        let mut order: Vec<usize> = (0..times.len()).collect();
        order.sort_by(|&a, &b| times[a].total_cmp(&times[b]));

        let mut working = series.clone();
        let mut values = vec![0.0; times.len()];
        for &k in &order {
            let t = times[k];
            let pred = self.predict(&working, t)?;
            let value = draw_normal(rng, pred.mean, pred.std_dev());
            values[k] = value;

            if !working.is_pinned(working.bracket(t), t) {
                working.insert(t, value, 0.0);
            }
        }
        Ok(values)
    }
}
