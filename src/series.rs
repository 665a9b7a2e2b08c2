use crate::error::{CarmaError, Result};

/// Irregularly sampled time series with per-point measurement errors.
///
/// `time` is strictly increasing, `yerr` holds measurement-error standard
/// deviations. All three arrays have the same, non-zero length.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeries {
    time: Vec<f64>,
    y: Vec<f64>,
    yerr: Vec<f64>,
}

impl TimeSeries {
    pub fn new(time: Vec<f64>, y: Vec<f64>, yerr: Vec<f64>) -> Result<Self> {
        let n = time.len();
        if n == 0 {
            return Err(CarmaError::DataError("time series is empty".into()));
        }
        if y.len() != n {
            return Err(CarmaError::DimensionMismatch {
                what: "y",
                expected: n,
                got: y.len(),
            });
        }
        if yerr.len() != n {
            return Err(CarmaError::DimensionMismatch {
                what: "yerr",
                expected: n,
                got: yerr.len(),
            });
        }

        for i in 0..n {
            if !time[i].is_finite() || !y[i].is_finite() || !yerr[i].is_finite() {
                return Err(CarmaError::DataError(format!(
                    "non-finite value at index {}: time={}, y={}, yerr={}",
                    i, time[i], y[i], yerr[i]
                )));
            }
            if yerr[i] < 0.0 {
                return Err(CarmaError::InvalidParameter(format!(
                    "yerr[{}] = {} is negative",
                    i, yerr[i]
                )));
            }
            if i > 0 && time[i] <= time[i - 1] {
                return Err(CarmaError::UnsortedTimes {
                    index: i,
                    previous: time[i - 1],
                    current: time[i],
                });
            }
        }

        Ok(Self { time, y, yerr })
    }

    /// Series with zero measurement error everywhere.
    pub fn without_errors(time: Vec<f64>, y: Vec<f64>) -> Result<Self> {
        let yerr = vec![0.0; time.len()];
        Self::new(time, y, yerr)
    }

    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    pub fn time(&self) -> &[f64] {
        &self.time
    }

    pub fn y(&self) -> &[f64] {
        &self.y
    }

    pub fn yerr(&self) -> &[f64] {
        &self.yerr
    }

    /// Measurement-error variance of point `i`.
    pub fn yvar(&self, i: usize) -> f64 {
        self.yerr[i] * self.yerr[i]
    }

    /// Gap between point `i` and point `i + 1`.
    pub fn dt(&self, i: usize) -> f64 {
        self.time[i + 1] - self.time[i]
    }

    /// Index of the first observation at or after `time`; `len()` when `time`
    /// lies past the last observation.
    pub fn bracket(&self, time: f64) -> usize {
        self.time.partition_point(|&t| t < time)
    }

    /// True when observation `i` sits exactly at `time` with no measurement error.
    pub fn is_pinned(&self, i: usize, time: f64) -> bool {
        i < self.len() && self.time[i] == time && self.yerr[i] == 0.0
    }

    /// Insert a point ahead of any observation at the same or a later time.
    ///
    /// Ties are allowed here: simulation conditions on drawn values that may
    /// coincide with a noisy observation.
    pub(crate) fn insert(&mut self, time: f64, y: f64, yerr: f64) -> usize {
        let idx = self.bracket(time);
        self.time.insert(idx, time);
        self.y.insert(idx, y);
        self.yerr.insert(idx, yerr);
        idx
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_series() -> TimeSeries {
        TimeSeries::new(
            vec![0.0, 1.0, 2.5, 4.0],
            vec![0.3, -0.2, 0.8, 0.1],
            vec![0.1, 0.1, 0.2, 0.0],
        )
        .unwrap()
    }

    #[test]
    fn test_dt() {
        let s = sample_series();
        assert!((s.dt(0) - 1.0).abs() < 1e-15);
        assert!((s.dt(1) - 1.5).abs() < 1e-15);
        assert!((s.dt(2) - 1.5).abs() < 1e-15);
    }

    #[test]
    fn test_bracket_regimes() {
        let s = sample_series();
        assert_eq!(s.bracket(-1.0), 0); // backcast
        assert_eq!(s.bracket(0.0), 0); // exact first time
        assert_eq!(s.bracket(0.5), 1);
        assert_eq!(s.bracket(2.5), 2); // exact interior time
        assert_eq!(s.bracket(3.0), 3);
        assert_eq!(s.bracket(4.0), 3);
        assert_eq!(s.bracket(10.0), 4); // forecast
    }

    #[test]
    fn test_is_pinned() {
        let s = sample_series();
        assert!(s.is_pinned(3, 4.0));
        assert!(!s.is_pinned(2, 2.5)); // yerr > 0
        assert!(!s.is_pinned(3, 3.9));
        assert!(!s.is_pinned(4, 4.0));
    }

    #[test]
    fn test_insert_keeps_order() {
        let mut s = sample_series();
        let idx = s.insert(2.0, 1.1, 0.0);
        assert_eq!(idx, 2);
        assert_eq!(s.time(), &[0.0, 1.0, 2.0, 2.5, 4.0]);
        assert_eq!(s.y()[2], 1.1);
        assert_eq!(s.yerr()[2], 0.0);

        // Ties go in front of the existing observation
        let idx = s.insert(2.5, -0.4, 0.0);
        assert_eq!(idx, 3);
        assert_eq!(s.y()[3], -0.4);
        assert_eq!(s.y()[4], 0.8);
    }

    #[test]
    fn test_rejects_unsorted_times() {
        let err = TimeSeries::new(vec![0.0, 2.0, 1.0], vec![0.0; 3], vec![0.0; 3]).unwrap_err();
        match err {
            CarmaError::UnsortedTimes { index, .. } => assert_eq!(index, 2),
            other => panic!("unexpected error: {}", other),
        }

        // Duplicates are not strictly increasing either
        assert!(TimeSeries::new(vec![0.0, 1.0, 1.0], vec![0.0; 3], vec![0.0; 3]).is_err());
    }

    #[test]
    fn test_rejects_length_mismatch() {
        let err = TimeSeries::new(vec![0.0, 1.0], vec![0.0], vec![0.0, 0.0]).unwrap_err();
        assert!(matches!(
            err,
            CarmaError::DimensionMismatch { what: "y", expected: 2, got: 1 }
        ));
        let err = TimeSeries::new(vec![0.0, 1.0], vec![0.0, 0.0], vec![0.0]).unwrap_err();
        assert!(matches!(err, CarmaError::DimensionMismatch { what: "yerr", .. }));
    }

    #[test]
    fn test_rejects_empty_and_bad_values() {
        assert!(matches!(
            TimeSeries::new(vec![], vec![], vec![]),
            Err(CarmaError::DataError(_))
        ));
        assert!(matches!(
            TimeSeries::new(vec![0.0], vec![f64::NAN], vec![0.0]),
            Err(CarmaError::DataError(_))
        ));
        assert!(matches!(
            TimeSeries::new(vec![0.0], vec![1.0], vec![-0.1]),
            Err(CarmaError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_without_errors() {
        let s = TimeSeries::without_errors(vec![0.0, 1.0], vec![2.0, 3.0]).unwrap();
        assert_eq!(s.yerr(), &[0.0, 0.0]);
        assert_eq!(s.yvar(1), 0.0);
    }
}
