//! Rolling standard deviation.
//!
//! Population standard deviation over n values.
//! STDDEV(n)[i] = sqrt(sum((x[i-j] - SMA(n)[i])^2 for j in 0..n-1) / n)
//! Warmup: first (n-1) rows are undefined.

use super::rolling;

pub fn population_stddev(window: &[f64]) -> f64 {
    let n = window.len() as f64;
    let mean = window.iter().sum::<f64>() / n;
    let variance = window
        .iter()
        .map(|x| {
            let diff = x - mean;
            diff * diff
        })
        .sum::<f64>()
        / n;
    variance.sqrt()
}

pub fn calculate_stddev(values: &[Option<f64>], period: usize) -> Vec<Option<f64>> {
    rolling(values, period, population_stddev)
}
