//! Exponential Moving Average.
//!
//! k = 2/(n+1), seeded with the first value: EMA[0] = C[0], then
//! EMA[i] = C[i]*k + EMA[i-1]*(1-k). The first (n-1) values are undefined.
//! An undefined input restarts the recursion from the next defined value.

pub fn calculate_ema(values: &[Option<f64>], period: usize) -> Vec<Option<f64>> {
    if period == 0 {
        return vec![None; values.len()];
    }

    let k = 2.0 / (period as f64 + 1.0);
    let mut run = 0usize;
    let mut ema = 0.0;

    values
        .iter()
        .map(|value| {
            let Some(close) = *value else {
                run = 0;
                return None;
            };
            ema = if run == 0 {
                close
            } else {
                close * k + ema * (1.0 - k)
            };
            run += 1;
            (run >= period).then_some(ema)
        })
        .collect()
}
