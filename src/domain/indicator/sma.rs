//! Simple Moving Average.
//!
//! SMA(n)[i] = mean of the last n values. Warmup: first (n-1) rows undefined.

use super::rolling;

pub fn calculate_sma(values: &[Option<f64>], period: usize) -> Vec<Option<f64>> {
    rolling(values, period, |window| {
        window.iter().sum::<f64>() / window.len() as f64
    })
}
