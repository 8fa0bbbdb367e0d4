//! Bar series source port.

use crate::domain::error::QuantfoldError;
use crate::domain::ohlcv::TimeframeSeries;

/// Supplies one validated bar series per `(coin, pair, timeframe)` key.
pub trait SeriesSource {
    fn fetch_series(
        &self,
        coin: &str,
        pair: &str,
        tf_minutes: u32,
    ) -> Result<TimeframeSeries, QuantfoldError>;

    /// Timeframes available for a pair, ascending.
    fn list_timeframes(&self, coin: &str, pair: &str) -> Result<Vec<u32>, QuantfoldError>;
}
