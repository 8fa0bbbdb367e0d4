#![allow(dead_code)]

use quantfold::domain::error::QuantfoldError;
pub use quantfold::domain::ohlcv::{Bar, TimeframeSeries};
use quantfold::ports::data_port::SeriesSource;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

pub struct MockSeriesSource {
    pub data: BTreeMap<u32, Vec<Bar>>,
    pub errors: BTreeMap<u32, String>,
}

impl MockSeriesSource {
    pub fn new() -> Self {
        Self {
            data: BTreeMap::new(),
            errors: BTreeMap::new(),
        }
    }

    pub fn with_bars(mut self, tf_minutes: u32, bars: Vec<Bar>) -> Self {
        self.data.insert(tf_minutes, bars);
        self
    }

    pub fn with_error(mut self, tf_minutes: u32, reason: &str) -> Self {
        self.errors.insert(tf_minutes, reason.to_string());
        self
    }
}

impl SeriesSource for MockSeriesSource {
    fn fetch_series(
        &self,
        coin: &str,
        pair: &str,
        tf_minutes: u32,
    ) -> Result<TimeframeSeries, QuantfoldError> {
        let path = format!("{coin}/{pair}/{pair}_{tf_minutes}.csv");
        if let Some(reason) = self.errors.get(&tf_minutes) {
            return Err(QuantfoldError::Csv {
                path,
                reason: reason.clone(),
            });
        }
        let bars = self.data.get(&tf_minutes).cloned().ok_or(QuantfoldError::Csv {
            path,
            reason: "no such file".to_string(),
        })?;
        TimeframeSeries::new(tf_minutes, bars)
    }

    fn list_timeframes(&self, _coin: &str, _pair: &str) -> Result<Vec<u32>, QuantfoldError> {
        Ok(self.data.keys().copied().collect())
    }
}

pub fn make_bar(timestamp: i64, close: f64) -> Bar {
    Bar {
        timestamp,
        open: close - 0.5,
        high: close + 1.0,
        low: close - 1.0,
        close,
        volume: 1000.0,
        trades: 50.0,
    }
}

/// `n` bars of a drifting wave starting at `start`, spaced one cadence apart.
pub fn wave_bars(tf_minutes: u32, n: usize, start: i64) -> Vec<Bar> {
    let step = i64::from(tf_minutes) * 60;
    (0..n)
        .map(|i| {
            let x = i as f64;
            let close = 100.0 + 5.0 * (x * 0.3).sin() + 0.05 * x;
            make_bar(start + i as i64 * step, close)
        })
        .collect()
}

/// Bars whose close equals their own timestamp, so merged values reveal
/// which source row they came from.
pub fn timestamp_encoded_bars(tf_minutes: u32, n: usize) -> Vec<Bar> {
    let step = i64::from(tf_minutes) * 60;
    (0..n)
        .map(|i| make_bar(i as i64 * step, (i as i64 * step) as f64))
        .collect()
}

/// Write bars in the headerless on-disk layout `<base>/<coin>/<pair>/<pair>_<tf>.csv`.
pub fn write_series_csv(base: &Path, coin: &str, pair: &str, tf_minutes: u32, bars: &[Bar]) {
    let dir = base.join(coin).join(pair);
    fs::create_dir_all(&dir).unwrap();
    let body: String = bars
        .iter()
        .map(|b| {
            format!(
                "{},{},{},{},{},{},{}\n",
                b.timestamp, b.open, b.high, b.low, b.close, b.volume, b.trades
            )
        })
        .collect();
    fs::write(dir.join(format!("{pair}_{tf_minutes}.csv")), body).unwrap();
}

pub const RUN_INI: &str = r#"
[pipeline]
target_timeframe = 15
timeframes = 5, 15, 60

[indicators]
default = ema:window=5 | rsi:window=5
tf_15 = sma:window=4 | bollinger:window=4,std_dev=2 | atr:window=3

[folds]
n_folds = 3
initial_train_frac = 0.4

[backtest]
initial_balance = 10000
percent_to_buy = 0.1
"#;
