//! Long-only round-trip trade simulator.
//!
//! Row 0 only seeds the balance history. For every later row `i` the entry
//! is the realized price of row `i - 1`; when the prediction for row `i` is
//! above it, one trade is bought at the entry and sold at row `i`'s price,
//! with slippage and fees applied on both legs. State lives in locals, so
//! independent simulations never share anything.

use tracing::debug;

use crate::domain::error::QuantfoldError;
use crate::domain::fold::Segment;
use crate::domain::metrics::BacktestSummary;
use crate::ports::model_port::PricePredictor;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BacktestConfig {
    pub initial_balance: f64,
    /// Fraction of the current balance committed to each trade.
    pub percent_to_buy: f64,
    pub fee_rate: f64,
    pub slippage_rate: f64,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        BacktestConfig {
            initial_balance: 10_000.0,
            percent_to_buy: 0.1,
            fee_rate: 0.0,
            slippage_rate: 0.0,
        }
    }
}

impl BacktestConfig {
    pub fn validate(&self) -> Result<(), QuantfoldError> {
        if !(self.initial_balance.is_finite() && self.initial_balance > 0.0) {
            return Err(QuantfoldError::invalid(
                "backtest",
                "initial_balance",
                format!("must be positive, got {}", self.initial_balance),
            ));
        }
        if !(self.percent_to_buy > 0.0 && self.percent_to_buy <= 1.0) {
            return Err(QuantfoldError::invalid(
                "backtest",
                "percent_to_buy",
                format!("must be in (0, 1], got {}", self.percent_to_buy),
            ));
        }
        for (key, rate) in [("fee_rate", self.fee_rate), ("slippage_rate", self.slippage_rate)] {
            if !(0.0..1.0).contains(&rate) {
                return Err(QuantfoldError::invalid(
                    "backtest",
                    key,
                    format!("must be in [0, 1), got {rate}"),
                ));
            }
        }
        Ok(())
    }
}

/// One completed round trip. Prices are the raw realized prices; slippage
/// only shows up in `fees` and `profit`.
#[derive(Debug, Clone, PartialEq)]
pub struct Trade {
    pub entry_index: usize,
    pub exit_index: usize,
    pub entry_price: f64,
    pub exit_price: f64,
    pub trade_value: f64,
    pub fees: f64,
    pub profit: f64,
}

impl Trade {
    /// Profit relative to the capital committed.
    pub fn trade_return(&self) -> f64 {
        self.profit / self.trade_value
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestResult {
    pub summary: BacktestSummary,
    pub balance_history: Vec<f64>,
    pub trades: Vec<Trade>,
}

/// Run the simulation over precomputed predictions.
///
/// `predicted[i]` is the model output for row `i`; `predicted[0]` is never
/// consulted. A NaN prediction never triggers a buy.
pub fn simulate_predictions(
    predicted: &[f64],
    targets: &[f64],
    config: &BacktestConfig,
) -> Result<BacktestResult, QuantfoldError> {
    if predicted.len() != targets.len() {
        return Err(QuantfoldError::PredictionCount {
            expected: targets.len(),
            actual: predicted.len(),
        });
    }

    let mut balance = config.initial_balance;
    let mut balance_history = Vec::with_capacity(targets.len());
    let mut trades = Vec::new();
    if !targets.is_empty() {
        balance_history.push(balance);
    }

    for i in 1..targets.len() {
        let entry_price = targets[i - 1];
        if predicted[i] > entry_price {
            let trade_value = balance * config.percent_to_buy;
            let effective_entry = entry_price * (1.0 + config.slippage_rate);
            let buy_fee = trade_value * config.fee_rate;
            let quantity = (trade_value - buy_fee) / effective_entry;

            let exit_price = targets[i];
            let effective_exit = exit_price * (1.0 - config.slippage_rate);
            let gross_sell = quantity * effective_exit;
            let sell_fee = gross_sell * config.fee_rate;
            let net_sell = gross_sell - sell_fee;

            let profit = net_sell - trade_value;
            balance += profit;
            trades.push(Trade {
                entry_index: i - 1,
                exit_index: i,
                entry_price,
                exit_price,
                trade_value,
                fees: buy_fee + sell_fee,
                profit,
            });
        }
        balance_history.push(balance);
    }

    let summary = BacktestSummary::compute(config.initial_balance, &balance_history, &trades);
    debug!(
        rows = targets.len(),
        trades = summary.num_trades,
        final_balance = summary.final_balance,
        "simulation complete"
    );
    Ok(BacktestResult {
        summary,
        balance_history,
        trades,
    })
}

/// Predict every row of `segment` in one batch, then simulate.
pub fn simulate<P>(
    model: &P,
    segment: &Segment,
    config: &BacktestConfig,
) -> Result<BacktestResult, QuantfoldError>
where
    P: PricePredictor + ?Sized,
{
    let predicted = model.predict_batch(&segment.features);
    simulate_predictions(&predicted, &segment.targets, config)
}
