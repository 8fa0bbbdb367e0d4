//! Aggregate backtest statistics.

use std::fmt;
use std::str::FromStr;

use super::backtest::Trade;

/// Sortino value reported when downside deviation cannot be measured,
/// including the no-trade case.
pub const SORTINO_PENALTY: f64 = -10.0;

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestSummary {
    pub initial_balance: f64,
    pub final_balance: f64,
    pub total_profit: f64,
    pub num_trades: usize,
    pub wins: usize,
    pub losses: usize,
    pub breakeven: usize,
    pub win_rate: f64,
    pub loss_rate: f64,
    pub avg_profit_per_trade: f64,
    pub max_drawdown: f64,
    /// NaN without trades or with zero return variance.
    pub sharpe_ratio: f64,
    pub sortino_ratio: f64,
    /// NaN without a realized loss.
    pub profit_factor: f64,
}

impl BacktestSummary {
    pub fn compute(initial_balance: f64, balance_history: &[f64], trades: &[Trade]) -> Self {
        let final_balance = balance_history.last().copied().unwrap_or(initial_balance);
        let total_profit = final_balance - initial_balance;

        let mut wins = 0usize;
        let mut losses = 0usize;
        let mut breakeven = 0usize;
        let mut total_profit_win = 0.0_f64;
        let mut total_profit_loss = 0.0_f64;

        for trade in trades {
            if trade.profit > 0.0 {
                wins += 1;
                total_profit_win += trade.profit;
            } else if trade.profit < 0.0 {
                losses += 1;
                total_profit_loss += trade.profit;
            } else {
                breakeven += 1;
            }
        }

        let num_trades = trades.len();
        let per_trade = |count: usize| {
            if num_trades > 0 {
                count as f64 / num_trades as f64
            } else {
                0.0
            }
        };
        let avg_profit_per_trade = if num_trades > 0 {
            total_profit / num_trades as f64
        } else {
            0.0
        };

        let returns: Vec<f64> = trades.iter().map(Trade::trade_return).collect();
        let (sharpe_ratio, sortino_ratio) = compute_risk_adjusted(&returns);

        let profit_factor = if total_profit_loss < 0.0 {
            total_profit_win / total_profit_loss.abs()
        } else {
            f64::NAN
        };

        BacktestSummary {
            initial_balance,
            final_balance,
            total_profit,
            num_trades,
            wins,
            losses,
            breakeven,
            win_rate: per_trade(wins),
            loss_rate: per_trade(losses),
            avg_profit_per_trade,
            max_drawdown: compute_drawdown(balance_history),
            sharpe_ratio,
            sortino_ratio,
            profit_factor,
        }
    }

    pub fn field(&self, field: SummaryField) -> f64 {
        match field {
            SummaryField::InitialBalance => self.initial_balance,
            SummaryField::FinalBalance => self.final_balance,
            SummaryField::TotalProfit => self.total_profit,
            SummaryField::NumTrades => self.num_trades as f64,
            SummaryField::Wins => self.wins as f64,
            SummaryField::Losses => self.losses as f64,
            SummaryField::Breakeven => self.breakeven as f64,
            SummaryField::WinRate => self.win_rate,
            SummaryField::LossRate => self.loss_rate,
            SummaryField::AvgProfitPerTrade => self.avg_profit_per_trade,
            SummaryField::MaxDrawdown => self.max_drawdown,
            SummaryField::SharpeRatio => self.sharpe_ratio,
            SummaryField::SortinoRatio => self.sortino_ratio,
            SummaryField::ProfitFactor => self.profit_factor,
        }
    }
}

/// Largest fractional fall from the running peak of the balance history.
fn compute_drawdown(balance_history: &[f64]) -> f64 {
    let mut peak = f64::NEG_INFINITY;
    let mut max_dd = 0.0_f64;
    for &balance in balance_history {
        peak = peak.max(balance);
        let dd = (peak - balance) / peak;
        if dd > max_dd {
            max_dd = dd;
        }
    }
    max_dd
}

fn population_stddev(values: &[f64], mean: f64) -> f64 {
    let n = values.len() as f64;
    (values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n).sqrt()
}

/// Per-trade (sharpe, sortino). Both use the mean of every trade return;
/// sortino divides by the deviation of the negative returns only.
fn compute_risk_adjusted(returns: &[f64]) -> (f64, f64) {
    if returns.is_empty() {
        return (f64::NAN, SORTINO_PENALTY);
    }

    let mean = returns.iter().sum::<f64>() / returns.len() as f64;
    let stddev = population_stddev(returns, mean);
    let sharpe = if stddev > 0.0 { mean / stddev } else { f64::NAN };

    let negative: Vec<f64> = returns.iter().copied().filter(|&r| r < 0.0).collect();
    let sortino = if negative.is_empty() {
        SORTINO_PENALTY
    } else {
        let neg_mean = negative.iter().sum::<f64>() / negative.len() as f64;
        let downside = population_stddev(&negative, neg_mean);
        if downside > 0.0 {
            mean / downside
        } else {
            SORTINO_PENALTY
        }
    };

    (sharpe, sortino)
}

/// Numeric summary fields usable as a walk-forward objective.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SummaryField {
    InitialBalance,
    FinalBalance,
    TotalProfit,
    NumTrades,
    Wins,
    Losses,
    Breakeven,
    WinRate,
    LossRate,
    AvgProfitPerTrade,
    MaxDrawdown,
    SharpeRatio,
    #[default]
    SortinoRatio,
    ProfitFactor,
}

impl SummaryField {
    pub const ALL: [SummaryField; 14] = [
        SummaryField::InitialBalance,
        SummaryField::FinalBalance,
        SummaryField::TotalProfit,
        SummaryField::NumTrades,
        SummaryField::Wins,
        SummaryField::Losses,
        SummaryField::Breakeven,
        SummaryField::WinRate,
        SummaryField::LossRate,
        SummaryField::AvgProfitPerTrade,
        SummaryField::MaxDrawdown,
        SummaryField::SharpeRatio,
        SummaryField::SortinoRatio,
        SummaryField::ProfitFactor,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            SummaryField::InitialBalance => "initial_balance",
            SummaryField::FinalBalance => "final_balance",
            SummaryField::TotalProfit => "total_profit",
            SummaryField::NumTrades => "num_trades",
            SummaryField::Wins => "wins",
            SummaryField::Losses => "losses",
            SummaryField::Breakeven => "breakeven",
            SummaryField::WinRate => "win_rate",
            SummaryField::LossRate => "loss_rate",
            SummaryField::AvgProfitPerTrade => "avg_profit_per_trade",
            SummaryField::MaxDrawdown => "max_drawdown",
            SummaryField::SharpeRatio => "sharpe_ratio",
            SummaryField::SortinoRatio => "sortino_ratio",
            SummaryField::ProfitFactor => "profit_factor",
        }
    }
}

impl FromStr for SummaryField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        SummaryField::ALL
            .into_iter()
            .find(|f| f.name() == wanted)
            .ok_or_else(|| format!("unknown summary field '{}'", s.trim()))
    }
}

impl fmt::Display for SummaryField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
