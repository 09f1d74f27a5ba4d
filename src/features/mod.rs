//! Series features used by the automatic fitters.

mod decomposition;

pub use decomposition::{classical_decomposition, Decomposition, DecompositionType};

use crate::utils::stats::variance;

/// Strength of seasonality, `max(0, 1 - Var(R) / Var(S + R))`, from a
/// classical decomposition. Zero when the series is shorter than two
/// periods or the period is 1.
pub fn seasonal_strength(values: &[f64], period: usize) -> f64 {
    let Some(dec) = classical_decomposition(values, period, DecompositionType::Additive) else {
        return 0.0;
    };
    let (remainder, detrended): (Vec<f64>, Vec<f64>) = dec
        .remainder
        .iter()
        .zip(&dec.seasonal)
        .filter(|(r, _)| !r.is_nan())
        .map(|(r, s)| (*r, r + s))
        .unzip();
    let var_sr = variance(&detrended);
    if !(var_sr > 0.0) {
        return 0.0;
    }
    (1.0 - variance(&remainder) / var_sr).max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strong_and_absent_seasonality() {
        let pattern = [5.0, -2.0, 1.0, -4.0];
        let seasonal: Vec<f64> = (0..40)
            .map(|i| 50.0 + 0.3 * i as f64 + pattern[i % 4] + 0.05 * ((i * 7) % 3) as f64)
            .collect();
        assert!(seasonal_strength(&seasonal, 4) > 0.9);

        let flat: Vec<f64> = (0..40).map(|i| ((i * 17 + 13) % 97) as f64).collect();
        assert!(seasonal_strength(&flat, 4) < 0.64);
        assert_eq!(seasonal_strength(&seasonal[..6], 4), 0.0);
        assert_eq!(seasonal_strength(&seasonal, 1), 0.0);
    }
}
