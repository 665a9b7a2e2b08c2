use std::f64::consts::PI;

use nalgebra::DVector;

use crate::types::C64;

/// Roots of the characteristic polynomial from Lorentzian PSD parameters.
///
/// The power spectrum is a sum of Lorentzians. `lorentz_params` holds
/// `[center_1, width_1, center_2, width_2, ...]`, and when its length `p` is
/// odd a trailing low-frequency width `lorentz_params[p - 1]`. Each pair maps to
/// the conjugate roots `2π(-width ± i·center)`, the trailing width to the real
/// root `-2π·width`.
///
/// Stability requires every width to be positive; that is checked when the
/// roots are handed to a filter, not here.
pub fn ar_roots(lorentz_params: &[f64]) -> DVector<C64> {
    let p = lorentz_params.len();
    let mut roots = DVector::<C64>::zeros(p);

    for i in 0..p / 2 {
        let center = lorentz_params[2 * i];
        let width = lorentz_params[2 * i + 1];
        roots[2 * i] = C64::new(-width, center);
        roots[2 * i + 1] = roots[2 * i].conj();
    }

    if p % 2 == 1 {
        roots[p - 1] = C64::new(-lorentz_params[p - 1], 0.0);
    }

    roots * C64::new(2.0 * PI, 0.0)
}

/// Complex polynomial multiplication (convolution): c[k] = sum_i a[i]*b[k-i].
fn polymul(a: &[C64], b: &[C64]) -> Vec<C64> {
    if a.is_empty() || b.is_empty() {
        return vec![];
    }
    let mut r = vec![C64::new(0.0, 0.0); a.len() + b.len() - 1];
    for (i, &ai) in a.iter().enumerate() {
        for (j, &bj) in b.iter().enumerate() {
            r[i + j] += ai * bj;
        }
    }
    r
}

/// Characteristic polynomial coefficients from its roots.
///
/// Returns `[1, alpha_1, ..., alpha_p]` for
/// `alpha(s) = s^p + alpha_1 s^{p-1} + ... + alpha_p = prod_k (s - r_k)`.
/// Complex roots are expected in conjugate pairs, so only real parts are kept.
pub fn char_poly_coefs(roots: &DVector<C64>) -> Vec<f64> {
    roots
        .iter()
        .fold(vec![C64::new(1.0, 0.0)], |poly, &r| {
            polymul(&poly, &[C64::new(1.0, 0.0), -r])
        })
        .into_iter()
        .map(|c| c.re)
        .collect()
}
