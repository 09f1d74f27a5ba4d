//! Coefficient transforms and lag-polynomial helpers.

/// Maps unconstrained parameters to stationary coefficients via the PACF
/// parametrisation (Jones 1980, Monahan 1984).
///
/// Each value is squashed into (-1, 1) by `tanh` and the resulting partial
/// autocorrelations are converted to coefficients of `y_t = sum phi_k y_(t-k)`
/// by the Levinson-Durbin recursion. The output is always stationary; for
/// moving-average terms negate it to obtain an invertible polynomial.
pub(crate) fn unconstrained_to_coeffs(alpha: &[f64]) -> Vec<f64> {
    let p = alpha.len();
    if p == 0 {
        return Vec::new();
    }
    let r: Vec<f64> = alpha.iter().map(|a| a.tanh()).collect();
    let mut phi = vec![0.0; p];
    let mut prev = vec![0.0; p];
    phi[0] = r[0];
    for k in 1..p {
        prev.copy_from_slice(&phi);
        phi[k] = r[k];
        for j in 0..k {
            phi[j] = prev[j] - r[k] * prev[k - 1 - j];
        }
    }
    phi
}

/// Inverse Levinson-Durbin: partial autocorrelations of `phi`, or `None`
/// when the polynomial `1 - sum phi_k z^k` has a root on or inside the unit
/// circle.
pub(crate) fn step_down(phi: &[f64]) -> Option<Vec<f64>> {
    let mut current = phi.to_vec();
    let mut pacf = vec![0.0; phi.len()];
    for k in (0..phi.len()).rev() {
        let r = current[k];
        if !r.is_finite() || r.abs() >= 1.0 {
            return None;
        }
        pacf[k] = r;
        let denom = 1.0 - r * r;
        current = (0..k)
            .map(|j| (current[j] + r * current[k - 1 - j]) / denom)
            .collect();
    }
    Some(pacf)
}

/// Whether every root of `1 - sum phi_k z^k` lies outside the circle of
/// radius `margin`.
///
/// Rescaling `z = margin w` turns the question into stationarity of the
/// coefficients `phi_k margin^k`.
pub(crate) fn roots_outside(phi: &[f64], margin: f64) -> bool {
    let scaled: Vec<f64> = phi
        .iter()
        .enumerate()
        .map(|(k, c)| c * margin.powi(k as i32 + 1))
        .collect();
    step_down(&scaled).is_some()
}

/// Product of two polynomials given by their coefficients, constant first.
pub(crate) fn poly_mul(a: &[f64], b: &[f64]) -> Vec<f64> {
    if a.is_empty() || b.is_empty() {
        return Vec::new();
    }
    let mut out = vec![0.0; a.len() + b.len() - 1];
    for (i, x) in a.iter().enumerate() {
        for (j, y) in b.iter().enumerate() {
            out[i + j] += x * y;
        }
    }
    out
}

/// Expand a non-seasonal and a seasonal lag polynomial into one.
///
/// `sign` is `-1` for autoregressive factors `1 - sum c B^k` and `+1` for
/// moving-average factors `1 + sum c B^k`. Returns the combined
/// coefficients in the same convention, lag one first.
pub(crate) fn expand(nonseasonal: &[f64], seasonal: &[f64], period: usize, sign: f64) -> Vec<f64> {
    let mut a = vec![1.0];
    a.extend(nonseasonal.iter().map(|c| sign * c));
    let mut b = vec![0.0; seasonal.len() * period + 1];
    b[0] = 1.0;
    for (j, c) in seasonal.iter().enumerate() {
        b[(j + 1) * period] = sign * c;
    }
    let mut full: Vec<f64> = poly_mul(&a, &b).into_iter().skip(1).map(|c| sign * c).collect();
    while full.last() == Some(&0.0) {
        full.pop();
    }
    full
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn pacf_round_trip() {
        let alpha = [0.5, 0.3, -0.2];
        let phi = unconstrained_to_coeffs(&alpha);
        let pacf = step_down(&phi).unwrap();
        for (r, a) in pacf.iter().zip(alpha) {
            assert_relative_eq!(*r, a.tanh(), epsilon = 1e-12);
        }
    }

    #[test]
    fn two_term_recursion() {
        let phi = unconstrained_to_coeffs(&[0.5, 0.3]);
        assert_relative_eq!(phi[0], 0.5f64.tanh() - 0.3f64.tanh() * 0.5f64.tanh(), epsilon = 1e-12);
        assert_relative_eq!(phi[1], 0.3f64.tanh(), epsilon = 1e-12);
        assert!(unconstrained_to_coeffs(&[]).is_empty());
    }

    #[test]
    fn unit_root_detection() {
        assert!(step_down(&[1.0]).is_none());
        assert!(step_down(&[0.5, 0.6]).is_none());
        assert!(step_down(&[0.5, 0.3]).is_some());
        assert!(roots_outside(&[0.9], 1.01));
        assert!(!roots_outside(&[0.995], 1.01));
    }

    #[test]
    fn seasonal_expansion() {
        // (1 - 0.5B)(1 - 0.4B^4)
        let ar = expand(&[0.5], &[0.4], 4, -1.0);
        assert_eq!(ar.len(), 5);
        assert_relative_eq!(ar[0], 0.5);
        assert_relative_eq!(ar[3], 0.4);
        assert_relative_eq!(ar[4], -0.2);

        // (1 + 0.3B)(1 + 0.6B^4)
        let ma = expand(&[0.3], &[0.6], 4, 1.0);
        assert_relative_eq!(ma[0], 0.3);
        assert_relative_eq!(ma[3], 0.6);
        assert_relative_eq!(ma[4], 0.18, epsilon = 1e-12);
        assert!(expand(&[], &[], 4, 1.0).is_empty());
    }
}
