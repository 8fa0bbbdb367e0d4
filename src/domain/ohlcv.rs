//! OHLCV bar and per-timeframe series.

use crate::domain::error::QuantfoldError;

#[derive(Debug, Clone, PartialEq)]
pub struct Bar {
    /// Bar open time, epoch seconds.
    pub timestamp: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    pub trades: f64,
}

/// max(high - low, |high - prev_close|, |low - prev_close|)
pub fn true_range(high: f64, low: f64, prev_close: f64) -> f64 {
    let hl = high - low;
    let hc = (high - prev_close).abs();
    let lc = (low - prev_close).abs();
    hl.max(hc).max(lc)
}

/// An ordered run of bars at one cadence.
///
/// Construction guarantees the series is non-empty with strictly increasing
/// timestamps; nothing is re-sorted or deduplicated on the caller's behalf.
#[derive(Debug, Clone)]
pub struct TimeframeSeries {
    tf_minutes: u32,
    bars: Vec<Bar>,
}

impl TimeframeSeries {
    pub fn new(tf_minutes: u32, bars: Vec<Bar>) -> Result<Self, QuantfoldError> {
        let context = format!("{tf_minutes}m series");
        if bars.is_empty() {
            return Err(QuantfoldError::EmptySeries { context });
        }
        validate_timestamps(bars.iter().map(|b| b.timestamp), &context)?;
        Ok(Self { tf_minutes, bars })
    }

    pub fn tf_minutes(&self) -> u32 {
        self.tf_minutes
    }

    pub fn duration_secs(&self) -> i64 {
        i64::from(self.tf_minutes) * 60
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }
}

/// Fails on the first timestamp that does not strictly exceed its predecessor.
pub fn validate_timestamps(
    timestamps: impl IntoIterator<Item = i64>,
    context: &str,
) -> Result<(), QuantfoldError> {
    let mut previous: Option<i64> = None;
    for (index, current) in timestamps.into_iter().enumerate() {
        if let Some(previous) = previous {
            if current == previous {
                return Err(QuantfoldError::DuplicateTimestamp {
                    context: context.to_string(),
                    index,
                    timestamp: current,
                });
            }
            if current < previous {
                return Err(QuantfoldError::UnsortedTimestamps {
                    context: context.to_string(),
                    index,
                    previous,
                    current,
                });
            }
        }
        previous = Some(current);
    }
    Ok(())
}
