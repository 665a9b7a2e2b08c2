use thiserror::Error;

#[derive(Error, Debug)]
pub enum CarmaError {
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("observation times must be strictly increasing: time[{index}] = {current} does not follow {previous}")]
    UnsortedTimes {
        index: usize,
        previous: f64,
        current: f64,
    },

    #[error("dimension mismatch for {what}: expected {expected}, got {got}")]
    DimensionMismatch {
        what: &'static str,
        expected: usize,
        got: usize,
    },

    #[error("numerical instability: predictive variance {variance} at index {index} is not positive")]
    NumericalInstability { index: usize, variance: f64 },

    #[error("filter has already consumed all {n} observations")]
    SeriesExhausted { n: usize },

    #[error("data error: {0}")]
    DataError(String),
}

pub type Result<T> = std::result::Result<T, CarmaError>;
