//! Kalman filtering for continuous-time autoregressive moving-average
//! processes observed at irregular times with heteroscedastic measurement
//! error.
//!
//! Two filters implement [`KalmanFilter`]:
//! - [`Car1Filter`], the closed-form scalar recursion for CAR(1);
//! - [`CarmaFilter`], the general CARMA(p, q) filter in the eigenbasis of the
//!   transition matrix.
//!
//! Both compute one-step-ahead predictive moments and the log-likelihood of a
//! series, predict the process at arbitrary times and draw conditional
//! realizations from a caller-supplied random number generator.

pub mod error;
pub mod types;
pub mod series;
pub mod params;
pub mod roots;
mod initialization;
pub mod kalman;
pub mod car1;
pub mod carma;
mod predict;
mod simulate;
pub mod forecast;
pub mod batch;

pub use car1::Car1Filter;
pub use carma::CarmaFilter;
pub use error::{CarmaError, Result};
pub use forecast::{compute_residuals, predict_band, PredictionBand, ResidualOutput};
pub use kalman::{FilterOutput, KalmanFilter};
pub use params::{Car1Params, CarmaParams};
pub use series::TimeSeries;
pub use types::{CarmaConfig, CarmaOrder, Prediction, C64};
