//! CSV bar series adapter.
//!
//! Layout: `<base>/<coin>/<pair>/<pair>_<tf>.csv`, one headerless row per bar:
//! `timestamp,open,high,low,close,volume,trades`. Rows are taken in file
//! order; ordering problems surface as data-integrity errors from
//! [`TimeframeSeries::new`].

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use crate::domain::error::QuantfoldError;
use crate::domain::ohlcv::{Bar, TimeframeSeries};
use crate::ports::data_port::SeriesSource;

const FIELDS: [&str; 7] = ["timestamp", "open", "high", "low", "close", "volume", "trades"];

pub struct CsvSeriesSource {
    base_path: PathBuf,
}

impl CsvSeriesSource {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn pair_dir(&self, coin: &str, pair: &str) -> PathBuf {
        self.base_path.join(coin).join(pair)
    }

    fn csv_path(&self, coin: &str, pair: &str, tf_minutes: u32) -> PathBuf {
        self.pair_dir(coin, pair)
            .join(format!("{}_{}.csv", pair, tf_minutes))
    }
}

fn csv_error(path: &Path, reason: impl Into<String>) -> QuantfoldError {
    QuantfoldError::Csv {
        path: path.display().to_string(),
        reason: reason.into(),
    }
}

fn parse_bar(record: &csv::StringRecord, path: &Path, line: usize) -> Result<Bar, QuantfoldError> {
    if record.len() != FIELDS.len() {
        return Err(csv_error(
            path,
            format!(
                "line {line}: expected {} fields, found {}",
                FIELDS.len(),
                record.len()
            ),
        ));
    }
    let number = |i: usize| -> Result<f64, QuantfoldError> {
        let raw = record[i].trim();
        raw.parse().map_err(|_| {
            csv_error(path, format!("line {line}: invalid {} value '{raw}'", FIELDS[i]))
        })
    };
    let raw_ts = record[0].trim();
    let timestamp = raw_ts.parse().map_err(|_| {
        csv_error(path, format!("line {line}: invalid timestamp '{raw_ts}'"))
    })?;

    Ok(Bar {
        timestamp,
        open: number(1)?,
        high: number(2)?,
        low: number(3)?,
        close: number(4)?,
        volume: number(5)?,
        trades: number(6)?,
    })
}

impl SeriesSource for CsvSeriesSource {
    fn fetch_series(
        &self,
        coin: &str,
        pair: &str,
        tf_minutes: u32,
    ) -> Result<TimeframeSeries, QuantfoldError> {
        let path = self.csv_path(coin, pair, tf_minutes);
        let file = File::open(&path).map_err(|e| csv_error(&path, e.to_string()))?;
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(false)
            .from_reader(file);

        let mut bars = Vec::new();
        for (i, result) in rdr.records().enumerate() {
            let record = result.map_err(|e| csv_error(&path, e.to_string()))?;
            bars.push(parse_bar(&record, &path, i + 1)?);
        }

        if bars.is_empty() {
            return Err(QuantfoldError::EmptySeries {
                context: path.display().to_string(),
            });
        }
        TimeframeSeries::new(tf_minutes, bars)
    }

    fn list_timeframes(&self, coin: &str, pair: &str) -> Result<Vec<u32>, QuantfoldError> {
        let dir = self.pair_dir(coin, pair);
        let entries = fs::read_dir(&dir)?;

        let prefix = format!("{}_", pair);
        let mut timeframes = Vec::new();

        for entry in entries {
            let name = entry?.file_name();
            let name = name.to_string_lossy();
            let tf = name
                .strip_prefix(&prefix)
                .and_then(|rest| rest.strip_suffix(".csv"))
                .and_then(|tf| tf.parse::<u32>().ok());
            if let Some(tf) = tf {
                timeframes.push(tf);
            }
        }

        timeframes.sort_unstable();
        Ok(timeframes)
    }
}
