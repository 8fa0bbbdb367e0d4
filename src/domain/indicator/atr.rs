//! Average True Range.
//!
//! TR[0] = high - low; TR[i] = max(H-L, |H-C[i-1]|, |L-C[i-1]|).
//! Seeded with the mean of the first n true ranges, then Wilder-smoothed:
//! ATR[i] = (ATR[i-1] * (n-1) + TR[i]) / n. Warmup: first (n-1) rows undefined.

use crate::domain::ohlcv::true_range;

pub fn calculate_atr(
    high: &[Option<f64>],
    low: &[Option<f64>],
    close: &[Option<f64>],
    period: usize,
) -> Vec<Option<f64>> {
    if period == 0 {
        return vec![None; close.len()];
    }

    let n = period as f64;
    let mut prev_close: Option<f64> = None;
    let mut run = 0usize;
    let mut atr = 0.0;

    high.iter()
        .zip(low)
        .zip(close)
        .map(|((h, l), c)| {
            let (Some(h), Some(l), Some(c)) = (*h, *l, *c) else {
                prev_close = None;
                run = 0;
                atr = 0.0;
                return None;
            };
            let tr = match prev_close.replace(c) {
                Some(pc) => true_range(h, l, pc),
                None => h - l,
            };
            run += 1;

            if run < period {
                atr += tr;
                None
            } else if run == period {
                atr = (atr + tr) / n;
                Some(atr)
            } else {
                atr = (atr * (n - 1.0) + tr) / n;
                Some(atr)
            }
        })
        .collect()
}
