//! CLI definition and dispatch.
//!
//! Progress goes to stderr; tables go to stdout.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use chrono::DateTime;
use clap::{Parser, Subcommand};

use crate::adapters::column_model::ColumnTrainer;
use crate::adapters::csv_adapter::CsvSeriesSource;
use crate::adapters::feature_csv::{read_feature_table, write_feature_table};
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::config_validation::{load_run_config, RunConfig};
use crate::domain::error::QuantfoldError;
use crate::domain::fold::{holdout_split, make_folds};
use crate::domain::metrics::BacktestSummary;
use crate::domain::staging::process_coinpair;
use crate::domain::table::FeatureTable;
use crate::domain::walk_forward::{evaluate_holdout, walk_forward};
use crate::ports::data_port::SeriesSource;

#[derive(Parser, Debug)]
#[command(
    name = "quantfold",
    about = "Causal multi-timeframe features and walk-forward backtests"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Stage and merge one coinpair's timeframes into a feature table
    Prepare {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        data_dir: PathBuf,
        #[arg(long)]
        coin: String,
        #[arg(long)]
        pair: String,
        #[arg(short, long)]
        output: PathBuf,
        /// Drop rows where any merged column is still undefined
        #[arg(long)]
        drop_undefined: bool,
    },
    /// Print walk-forward fold boundaries for a feature table
    Folds {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        features: PathBuf,
    },
    /// Walk-forward backtest using one feature column as the prediction
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        features: PathBuf,
        #[arg(long)]
        column: String,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    let result = match cli.command {
        Command::Prepare {
            config,
            data_dir,
            coin,
            pair,
            output,
            drop_undefined,
        } => run_prepare(&config, data_dir, &coin, &pair, &output, drop_undefined),
        Command::Folds { config, features } => run_folds(&config, &features),
        Command::Backtest {
            config,
            features,
            column,
        } => run_backtest(&config, &features, &column),
        Command::Validate { config } => run_validate(&config),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

pub fn load_config(path: &Path) -> Result<RunConfig, QuantfoldError> {
    eprintln!("Loading config from {}", path.display());
    let adapter = FileConfigAdapter::from_file(path)?;
    load_run_config(&adapter)
}

fn format_timestamp(ts: i64) -> String {
    DateTime::from_timestamp(ts, 0)
        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| ts.to_string())
}

fn format_ratio(value: f64) -> String {
    if value.is_nan() {
        "n/a".to_string()
    } else {
        format!("{value:.3}")
    }
}

pub fn run_prepare(
    config_path: &Path,
    data_dir: PathBuf,
    coin: &str,
    pair: &str,
    output: &Path,
    drop_undefined: bool,
) -> Result<(), QuantfoldError> {
    let config = load_config(config_path)?;
    let source = CsvSeriesSource::new(data_dir);

    let available = source.list_timeframes(coin, pair)?;
    let missing: Vec<String> = config
        .pipeline
        .timeframes
        .iter()
        .filter(|tf| !available.contains(tf))
        .map(|tf| tf.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(QuantfoldError::Csv {
            path: format!("{coin}/{pair}"),
            reason: format!("no data for timeframes {}", missing.join(", ")),
        });
    }

    eprintln!(
        "Staging {} {} on {} timeframes (target {}m)...",
        coin,
        pair,
        config.pipeline.timeframes.len(),
        config.pipeline.target_timeframe
    );
    let mut table = process_coinpair(&source, coin, pair, &config.pipeline)?;
    if drop_undefined {
        let before = table.len();
        table = table.drop_undefined_rows();
        eprintln!("Dropped {} rows with undefined merged values", before - table.len());
    }
    write_feature_table(output, &table)?;
    eprintln!(
        "Wrote {} rows x {} columns to {}",
        table.len(),
        table.columns().len(),
        output.display()
    );
    Ok(())
}

fn load_features(path: &Path) -> Result<FeatureTable, QuantfoldError> {
    eprintln!("Loading features from {}", path.display());
    read_feature_table(path)
}

pub fn run_folds(config_path: &Path, features_path: &Path) -> Result<(), QuantfoldError> {
    let config = load_config(config_path)?;
    let table = load_features(features_path)?;
    let (table, holdout) = holdout_split(&table, config.holdout_frac)?;
    let folds = make_folds(&table, &config.folds)?;

    println!(
        "{:>4}  {:>13}  {:>13}  {:>13}  {:<16}  {:<16}",
        "fold", "train", "validate", "test", "test start", "test end"
    );
    for fold in &folds {
        let validate = fold
            .validate
            .as_ref()
            .map(|v| format!("{:?}", v.rows))
            .unwrap_or_else(|| "-".to_string());
        let ts = table.timestamps();
        println!(
            "{:>4}  {:>13}  {:>13}  {:>13}  {:<16}  {:<16}",
            fold.index,
            format!("{:?}", fold.train.rows),
            validate,
            format!("{:?}", fold.test.rows),
            format_timestamp(ts[fold.test.rows.start]),
            format_timestamp(ts[fold.test.rows.end - 1]),
        );
    }
    if !holdout.is_empty() {
        println!(
            "holdout: {} rows from {}",
            holdout.len(),
            format_timestamp(holdout.timestamps()[0])
        );
    }
    Ok(())
}

fn print_summary(label: &str, s: &BacktestSummary) {
    println!(
        "{:>7}  {:>6}  {:>6.1}%  {:>14.2}  {:>8.2}%  {:>8}  {:>8}  {:>8}",
        label,
        s.num_trades,
        s.win_rate * 100.0,
        s.final_balance,
        s.max_drawdown * 100.0,
        format_ratio(s.sharpe_ratio),
        format_ratio(s.sortino_ratio),
        format_ratio(s.profit_factor),
    );
}

pub fn run_backtest(config_path: &Path, features_path: &Path, column: &str) -> Result<(), QuantfoldError> {
    let config = load_config(config_path)?;
    let table = load_features(features_path)?;
    let (table, holdout) = holdout_split(&table, config.holdout_frac)?;
    let folds = make_folds(&table, &config.folds)?;
    let trainer = ColumnTrainer::new(column);

    eprintln!("Running {} folds with column '{}'...", folds.len(), column);
    let report = walk_forward(&folds, &trainer, &config.backtest, config.objective)?;

    println!(
        "{:>7}  {:>6}  {:>7}  {:>14}  {:>9}  {:>8}  {:>8}  {:>8}",
        "fold", "trades", "win", "final balance", "max dd", "sharpe", "sortino", "pf"
    );
    for fold in &report.folds {
        print_summary(&fold.index.to_string(), &fold.summary);
    }
    println!(
        "\nmean {}: {}",
        report.objective,
        format_ratio(report.mean_objective)
    );

    if !holdout.is_empty() {
        let result = evaluate_holdout(&table, &holdout, &trainer, &config.backtest)?;
        print_summary("holdout", &result.summary);
    }
    Ok(())
}

pub fn run_validate(config_path: &Path) -> Result<(), QuantfoldError> {
    let config = load_config(config_path)?;
    let timeframes: Vec<String> = config
        .pipeline
        .timeframes
        .iter()
        .map(|tf| format!("{tf}m"))
        .collect();
    println!("Configuration OK");
    println!(
        "  target: {}m ({})",
        config.pipeline.target_timeframe, config.pipeline.target_mode
    );
    println!("  timeframes: {}", timeframes.join(", "));
    for tf in &config.pipeline.timeframes {
        let indicators: Vec<String> = config
            .pipeline
            .pipeline_for(*tf)
            .definitions()
            .iter()
            .map(|d| d.kind.to_string())
            .collect();
        println!("  {tf}m indicators: {}", indicators.join(", "));
    }
    println!(
        "  folds: {} (initial train {}, validation {})",
        config.folds.n_folds,
        config.folds.initial_train_frac,
        if config.folds.emit_validation {
            format!("{}", config.folds.val_frac)
        } else {
            "off".to_string()
        }
    );
    println!("  objective: {}", config.objective);
    Ok(())
}
