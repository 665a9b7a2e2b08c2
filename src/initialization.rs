use nalgebra::{DMatrix, DVector, RowDVector};

use crate::error::{CarmaError, Result};
use crate::params::CarmaParams;
use crate::types::C64;

/// Stationary initialization of the CARMA state in the eigenbasis of the
/// transition matrix.
///
/// In this basis the state transition is diagonal: each coordinate decays as
/// `exp(root * dt)`. The basis is the Vandermonde matrix of the AR roots
/// (row `k` holds `root^k`), the input vector `e_p` becomes `J = EigenMat^-1 e_p`
/// (notation of Belcher et al. 1994), and the observation row becomes
/// `rotated_ma = ma_coefs * EigenMat`.
#[derive(Debug, Clone)]
pub(crate) struct StationaryInit {
    /// Initial state vector (zeros).
    pub(crate) initial_state: DVector<C64>,
    /// Stationary state covariance, Hermitian.
    pub(crate) state_var: DMatrix<C64>,
    /// MA coefficients expressed in the eigenbasis (1 x p).
    pub(crate) rotated_ma: RowDVector<C64>,
    /// Stationary variance of the observed process, Re(rotated_ma * state_var * rotated_ma^H).
    pub(crate) stationary_var: f64,
}

impl StationaryInit {
    pub(crate) fn new(params: &CarmaParams) -> Result<Self> {
        let roots = &params.ar_roots;
        let p = roots.len();
        if p == 0 {
            return Err(CarmaError::InvalidParameter(
                "at least one AR root is required".into(),
            ));
        }
        // q < p: the MA row must fit the state dimension
        if params.ma_coefs.is_empty() || params.ma_coefs.len() > p {
            return Err(CarmaError::DimensionMismatch {
                what: "ma_coefs",
                expected: p,
                got: params.ma_coefs.len(),
            });
        }

        let eigen_mat = DMatrix::<C64>::from_fn(p, p, |i, j| roots[j].powu(i as u32));

        let mut e_p = DVector::<C64>::zeros(p);
        e_p[p - 1] = C64::new(1.0, 0.0);

        let j_vec = eigen_mat
            .clone()
            .lu()
            .solve(&e_p)
            .filter(|j| j.iter().all(|c| c.re.is_finite() && c.im.is_finite()))
            .ok_or_else(|| {
                CarmaError::InvalidParameter(
                    "eigenbasis is singular: AR roots must be distinct".into(),
                )
            })?;

        let ma_row = DVector::<C64>::from_fn(p, |j, _| {
            params
                .ma_coefs
                .get(j)
                .map_or(C64::new(0.0, 0.0), |&c| C64::new(c, 0.0))
        })
        .transpose();
        let rotated_ma = &ma_row * &eigen_mat;

        // Upper triangle, mirrored: StateVar[j, i] = conj(StateVar[i, j])
        let mut state_var = DMatrix::<C64>::zeros(p, p);
        for i in 0..p {
            for j in i..p {
                let v = -j_vec[i] * j_vec[j].conj() / (roots[i] + roots[j].conj())
                    * params.sigsqr;
                state_var[(i, j)] = v;
                state_var[(j, i)] = v.conj();
            }
        }

        let stationary_var = quad_form(&rotated_ma, &state_var);

        Ok(Self {
            initial_state: DVector::zeros(p),
            state_var,
            rotated_ma,
            stationary_var,
        })
    }

    /// Observed-process mean for a state: Re(rotated_ma * state).
    pub(crate) fn observe_mean(&self, state: &DVector<C64>) -> f64 {
        (&self.rotated_ma * state)[0].re
    }

    /// Observed-process variance for a state covariance.
    pub(crate) fn observe_var(&self, cov: &DMatrix<C64>) -> f64 {
        quad_form(&self.rotated_ma, cov)
    }
}

/// Re(row * m * row^H)
fn quad_form(row: &RowDVector<C64>, m: &DMatrix<C64>) -> f64 {
    (row * m * row.adjoint())[(0, 0)].re
}
