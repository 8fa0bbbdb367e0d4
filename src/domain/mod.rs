//! Core domain types and logic.

pub mod backtest;
pub mod config_validation;
pub mod error;
pub mod fold;
pub mod indicator;
pub mod merge;
pub mod metrics;
pub mod ohlcv;
pub mod pipeline;
pub mod staging;
pub mod table;
pub mod walk_forward;
