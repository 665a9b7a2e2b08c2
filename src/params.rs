use nalgebra::DVector;

use crate::error::{CarmaError, Result};
use crate::roots::ar_roots;
use crate::types::{CarmaConfig, CarmaOrder, C64};

/// CAR(1) parameters: driving white-noise variance and decay rate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Car1Params {
    pub sigsqr: f64,
    pub omega: f64,
}

impl Car1Params {
    pub fn new(sigsqr: f64, omega: f64) -> Self {
        Self { sigsqr, omega }
    }

    /// Stationary process variance sigsqr / (2 omega).
    pub fn stationary_var(&self) -> f64 {
        self.sigsqr / (2.0 * self.omega)
    }

    pub fn validate(&self, config: &CarmaConfig) -> Result<()> {
        if !config.order.is_car1() {
            return Err(CarmaError::InvalidParameter(format!(
                "CAR(1) filter requires order (1, 0), got ({}, {})",
                config.order.p, config.order.q
            )));
        }
        validate_sigsqr(self.sigsqr)?;
        if !self.omega.is_finite() {
            return Err(CarmaError::InvalidParameter(format!(
                "omega must be finite, got {}",
                self.omega
            )));
        }
        if config.enforce_stationarity && self.omega <= 0.0 {
            return Err(CarmaError::InvalidParameter(format!(
                "omega must be positive for a stationary CAR(1) process, got {}",
                self.omega
            )));
        }
        Ok(())
    }
}

/// CARMA(p, q) parameters.
///
/// `ar_roots` has length p, `ma_coefs` has length q + 1 with the leading
/// coefficient conventionally 1.
#[derive(Debug, Clone, PartialEq)]
pub struct CarmaParams {
    pub sigsqr: f64,
    pub ar_roots: DVector<C64>,
    pub ma_coefs: Vec<f64>,
}

impl CarmaParams {
    pub fn new(sigsqr: f64, ar_roots: DVector<C64>, ma_coefs: Vec<f64>) -> Self {
        Self {
            sigsqr,
            ar_roots,
            ma_coefs,
        }
    }

    /// Parameters from Lorentzian PSD parameters (see [`ar_roots`]).
    pub fn from_psd(sigsqr: f64, lorentz_params: &[f64], ma_coefs: Vec<f64>) -> Self {
        Self::new(sigsqr, ar_roots(lorentz_params), ma_coefs)
    }

    /// The CAR(1) process as a CARMA(1, 0) parameter set: root -omega, MA [1].
    pub fn from_car1(params: &Car1Params) -> Self {
        Self::new(
            params.sigsqr,
            DVector::from_element(1, C64::new(-params.omega, 0.0)),
            vec![1.0],
        )
    }

    /// Unpack a flat parameter vector.
    ///
    /// Layout: `[sigsqr | lorentz(p) | ma(q)]`; the leading MA coefficient is
    /// fixed at 1 and not part of the flat vector.
    pub fn from_flat(flat: &[f64], order: &CarmaOrder) -> Result<Self> {
        let p = order.p;
        let q = order.q;
        let expected = 1 + order.n_lorentz_params() + q;

        if flat.len() != expected {
            return Err(CarmaError::DimensionMismatch {
                what: "flat parameter vector",
                expected,
                got: flat.len(),
            });
        }

        let sigsqr = flat[0];
        let lorentz = &flat[1..1 + p];
        let mut ma_coefs = Vec::with_capacity(q + 1);
        ma_coefs.push(1.0);
        ma_coefs.extend_from_slice(&flat[1 + p..]);

        Ok(Self::from_psd(sigsqr, lorentz, ma_coefs))
    }

    /// Order implied by the parameter lengths.
    pub fn order(&self) -> CarmaOrder {
        CarmaOrder::new(self.ar_roots.len(), self.ma_coefs.len().saturating_sub(1))
    }

    pub fn validate(&self, config: &CarmaConfig) -> Result<()> {
        let order = &config.order;
        if !order.is_valid() {
            return Err(CarmaError::InvalidParameter(format!(
                "CARMA order requires p >= 1 and q < p, got ({}, {})",
                order.p, order.q
            )));
        }
        if self.ar_roots.len() != order.k_states() {
            return Err(CarmaError::DimensionMismatch {
                what: "ar_roots",
                expected: order.k_states(),
                got: self.ar_roots.len(),
            });
        }
        if self.ma_coefs.len() != order.n_ma_coefs() {
            return Err(CarmaError::DimensionMismatch {
                what: "ma_coefs",
                expected: order.n_ma_coefs(),
                got: self.ma_coefs.len(),
            });
        }
        validate_sigsqr(self.sigsqr)?;

        for (i, r) in self.ar_roots.iter().enumerate() {
            if !r.re.is_finite() || !r.im.is_finite() {
                return Err(CarmaError::InvalidParameter(format!(
                    "AR root {} is not finite: {}",
                    i, r
                )));
            }
            if config.enforce_stationarity && r.re >= 0.0 {
                return Err(CarmaError::InvalidParameter(format!(
                    "AR root {} = {} has non-negative real part; process is not stationary",
                    i, r
                )));
            }
        }
        if let Some(c) = self.ma_coefs.iter().find(|c| !c.is_finite()) {
            return Err(CarmaError::InvalidParameter(format!(
                "MA coefficient is not finite: {}",
                c
            )));
        }
        Ok(())
    }
}

fn validate_sigsqr(sigsqr: f64) -> Result<()> {
    if !sigsqr.is_finite() || sigsqr <= 0.0 {
        return Err(CarmaError::InvalidParameter(format!(
            "sigsqr must be positive and finite, got {}",
            sigsqr
        )));
    }
    Ok(())
}
