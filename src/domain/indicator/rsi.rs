//! RSI (Relative Strength Index) indicator implementation.
//!
//! Gains and losses are smoothed with Wilder's recursion
//! avg = (prev_avg * (n-1) + current) / n, starting from the first row, whose
//! change counts as zero.
//!
//! Formula: RSI = 100 - (100 / (1 + avg_gain / avg_loss))
//! If avg_loss == 0: RSI = 100
//!
//! Warmup: first (n-1) rows are undefined. An undefined input restarts the
//! smoothing from the next defined value.

fn rsi_value(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        100.0
    } else {
        100.0 - (100.0 / (1.0 + avg_gain / avg_loss))
    }
}

pub fn calculate_rsi(values: &[Option<f64>], period: usize) -> Vec<Option<f64>> {
    if period == 0 {
        return vec![None; values.len()];
    }

    let n = period as f64;
    let mut prev: Option<f64> = None;
    let mut run = 0usize;
    let mut avg_gain = 0.0;
    let mut avg_loss = 0.0;

    values
        .iter()
        .map(|value| {
            let Some(close) = *value else {
                prev = None;
                run = 0;
                return None;
            };
            let change = prev.replace(close).map_or(0.0, |last| close - last);
            let gain = change.max(0.0);
            let loss = (-change).max(0.0);

            if run == 0 {
                avg_gain = gain;
                avg_loss = loss;
            } else {
                avg_gain = (avg_gain * (n - 1.0) + gain) / n;
                avg_loss = (avg_loss * (n - 1.0) + loss) / n;
            }
            run += 1;
            (run >= period).then(|| rsi_value(avg_gain, avg_loss))
        })
        .collect()
}
