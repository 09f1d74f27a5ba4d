//! Classical moving-average decomposition.

/// Whether the seasonal component adds to or scales the trend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecompositionType {
    Additive,
    Multiplicative,
}

/// Trend, seasonal and remainder columns aligned with the input.
///
/// The trend and remainder are `NaN` where the centred moving average is
/// undefined (half a period at each end) or the input is missing.
#[derive(Debug, Clone, PartialEq)]
pub struct Decomposition {
    pub trend: Vec<f64>,
    pub seasonal: Vec<f64>,
    pub remainder: Vec<f64>,
    /// One seasonal index per position in the cycle, starting at the first
    /// observation. Additive indices sum to zero; multiplicative ones
    /// average one.
    pub indices: Vec<f64>,
}

/// Decompose `values` with a centred moving average of order `period`
/// (a 2 x m average for even periods).
///
/// Returns `None` when `period < 2` or fewer than two full periods are
/// available.
pub fn classical_decomposition(
    values: &[f64],
    period: usize,
    kind: DecompositionType,
) -> Option<Decomposition> {
    let n = values.len();
    if period < 2 || n < 2 * period {
        return None;
    }

    let trend = centred_moving_average(values, period);
    let detrended: Vec<f64> = values
        .iter()
        .zip(&trend)
        .map(|(y, t)| match kind {
            DecompositionType::Additive => y - t,
            DecompositionType::Multiplicative => y / t,
        })
        .collect();

    let mut sums = vec![0.0; period];
    let mut counts = vec![0usize; period];
    for (i, d) in detrended.iter().enumerate() {
        if d.is_finite() {
            sums[i % period] += d;
            counts[i % period] += 1;
        }
    }
    if counts.iter().any(|&c| c == 0) {
        return None;
    }
    let mut indices: Vec<f64> = sums.iter().zip(&counts).map(|(s, c)| s / *c as f64).collect();
    let centre = indices.iter().sum::<f64>() / period as f64;
    for s in indices.iter_mut() {
        match kind {
            DecompositionType::Additive => *s -= centre,
            DecompositionType::Multiplicative => *s /= centre,
        }
    }

    let seasonal: Vec<f64> = (0..n).map(|i| indices[i % period]).collect();
    let remainder = values
        .iter()
        .zip(&trend)
        .zip(&seasonal)
        .map(|((y, t), s)| match kind {
            DecompositionType::Additive => y - t - s,
            DecompositionType::Multiplicative => y / (t * s),
        })
        .collect();

    Some(Decomposition {
        trend,
        seasonal,
        remainder,
        indices,
    })
}

fn centred_moving_average(values: &[f64], period: usize) -> Vec<f64> {
    let n = values.len();
    let half = period / 2;
    let mut out = vec![f64::NAN; n];
    for (t, slot) in out.iter_mut().enumerate() {
        if t < half || t + half >= n {
            continue;
        }
        *slot = if period % 2 == 1 {
            values[t - half..=t + half].iter().sum::<f64>() / period as f64
        } else {
            let inner: f64 = values[t - half + 1..t + half].iter().sum();
            (0.5 * values[t - half] + inner + 0.5 * values[t + half]) / period as f64
        };
    }
    out
}
