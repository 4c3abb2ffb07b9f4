use std::collections::HashMap;

use crate::analyzers::types::Mode;

/// Computes the arithmetic mean of a slice of values. Returns 0.0 for empty input.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Computes the population standard deviation given a pre-computed mean.
/// Returns 0.0 for empty input.
pub fn stddev(values: &[f64], mean: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;

    variance.sqrt()
}

/// Rounds to two decimal places.
///
/// Works on the exact decimal value of `value`, so a tie such as 84.625
/// goes to the even digit (84.62), the same as `{:.2}` formatting.
pub fn round2(value: f64) -> f64 {
    format!("{value:.2}").parse().unwrap_or(value)
}

/// Returns an ascending copy of `values`.
pub fn sorted(values: &[f64]) -> Vec<f64> {
    let mut out = values.to_vec();
    out.sort_by(|a, b| a.total_cmp(b));
    out
}

/// Middle value, or the mean of the two middle values. Returns 0.0 for empty input.
pub fn median(values: &[f64]) -> f64 {
    let s = sorted(values);
    let n = s.len();
    match n {
        0 => 0.0,
        _ if n % 2 == 1 => s[n / 2],
        _ => (s[n / 2 - 1] + s[n / 2]) / 2.0,
    }
}

/// Most frequent value. Ties between several values, and empty input, give
/// [`Mode::NoUniqueMode`].
pub fn mode(values: &[f64]) -> Mode {
    let mut counts: HashMap<u64, usize> = HashMap::new();
    for v in values {
        *counts.entry(normalize_zero(*v).to_bits()).or_default() += 1;
    }

    let Some(best) = counts.values().copied().max() else {
        return Mode::NoUniqueMode;
    };

    let mut winners = counts.iter().filter(|(_, c)| **c == best);
    match (winners.next(), winners.next()) {
        (Some((bits, _)), None) => Mode::Unique(f64::from_bits(*bits)),
        _ => Mode::NoUniqueMode,
    }
}

// -0.0 and 0.0 count as the same score
fn normalize_zero(v: f64) -> f64 {
    if v == 0.0 { 0.0 } else { v }
}
