use nalgebra::Complex;

/// Complex scalar used for the eigenbasis state.
pub type C64 = Complex<f64>;

/// CARMA model order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CarmaOrder {
    pub p: usize, // autoregressive order
    pub q: usize, // moving-average order
}

impl CarmaOrder {
    pub fn new(p: usize, q: usize) -> Self {
        Self { p, q }
    }

    /// Dimension of the state vector: p
    pub fn k_states(&self) -> usize {
        self.p
    }

    /// Length of the MA coefficient vector including the leading 1: q + 1
    pub fn n_ma_coefs(&self) -> usize {
        self.q + 1
    }

    /// Number of Lorentzian PSD parameters: p (pairs plus an optional trailing width)
    pub fn n_lorentz_params(&self) -> usize {
        self.p
    }

    /// True for the CAR(1) special case.
    pub fn is_car1(&self) -> bool {
        self.p == 1 && self.q == 0
    }

    /// A CARMA(p, q) order is usable only with p >= 1 and q < p.
    pub fn is_valid(&self) -> bool {
        self.p >= 1 && self.q < self.p
    }
}

/// Filter configuration.
#[derive(Debug, Clone)]
pub struct CarmaConfig {
    pub order: CarmaOrder,
    /// Reject non-positive decay rates / AR roots with non-negative real part at construction.
    pub enforce_stationarity: bool,
    /// Predictive variances at or below this value abort the recursion.
    ///
    /// Error-free observations spaced much closer than the process
    /// decorrelation time leave true predictive variances near f64 round-off,
    /// where they can come out non-positive.
    pub min_variance: f64,
}

impl CarmaConfig {
    pub fn new(p: usize, q: usize) -> Self {
        Self {
            order: CarmaOrder::new(p, q),
            ..Self::default()
        }
    }

    pub fn car1() -> Self {
        Self::new(1, 0)
    }
}

impl Default for CarmaConfig {
    fn default() -> Self {
        Self {
            order: CarmaOrder::new(1, 0),
            enforce_stationarity: true,
            min_variance: 0.0,
        }
    }
}

/// Predictive distribution of the process value at a query time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prediction {
    pub mean: f64,
    pub variance: f64,
}

impl Prediction {
    pub fn new(mean: f64, variance: f64) -> Self {
        Self { mean, variance }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance.max(0.0).sqrt()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_carma_order_dimensions() {
        // CARMA(3,1): 3 states, MA vector [1, theta_1], 3 PSD parameters
        let order = CarmaOrder::new(3, 1);
        assert_eq!(order.k_states(), 3);
        assert_eq!(order.n_ma_coefs(), 2);
        assert_eq!(order.n_lorentz_params(), 3);
        assert!(order.is_valid());
        assert!(!order.is_car1());
    }

    #[test]
    fn test_carma_order_validity() {
        assert!(CarmaOrder::new(1, 0).is_valid());
        assert!(CarmaOrder::new(1, 0).is_car1());
        assert!(!CarmaOrder::new(2, 2).is_valid());
        assert!(!CarmaOrder::new(0, 0).is_valid());
    }

    #[test]
    fn test_default_config() {
        let config = CarmaConfig::default();
        assert_eq!(config.order, CarmaOrder::new(1, 0));
        assert!(config.enforce_stationarity);
        assert_eq!(config.min_variance, 0.0);
        assert_eq!(CarmaConfig::car1().order, config.order);
    }

    #[test]
    fn test_prediction_std_dev() {
        let pred = Prediction::new(1.5, 4.0);
        assert!((pred.std_dev() - 2.0).abs() < 1e-15);
        assert_eq!(Prediction::new(0.0, 0.0).std_dev(), 0.0);
    }
}
