//! CLI integration tests for the prepare, folds, backtest and validate commands.
//!
//! Tests cover:
//! - Argument parsing for each subcommand
//! - Config loading from INI files on disk
//! - prepare -> folds -> backtest over a temporary data directory
//! - Exit codes for configuration and data-integrity failures

mod common;

use clap::Parser;
use common::*;
use quantfold::adapters::feature_csv::read_feature_table;
use quantfold::cli::{self, Cli, Command};
use quantfold::domain::error::QuantfoldError;
use quantfold::domain::metrics::SummaryField;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tempfile::TempDir;

fn write_temp_ini(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

fn seed_data_dir(base: &Path) {
    write_series_csv(base, "BTC", "BTCUSDT", 5, &wave_bars(5, 1200, 0));
    write_series_csv(base, "BTC", "BTCUSDT", 15, &wave_bars(15, 400, 0));
    write_series_csv(base, "BTC", "BTCUSDT", 60, &wave_bars(60, 100, 0));
}

/// Seed a data directory and run `prepare`, returning the feature file path.
fn prepare_features(dir: &TempDir, config: &Path) -> PathBuf {
    let data_dir = dir.path().join("data");
    seed_data_dir(&data_dir);
    let output = dir.path().join("features.csv");
    cli::run_prepare(config, data_dir, "BTC", "BTCUSDT", &output, false).unwrap();
    output
}

mod argument_parsing {
    use super::*;

    #[test]
    fn prepare_arguments() {
        let cli = Cli::try_parse_from([
            "quantfold",
            "prepare",
            "--config",
            "run.ini",
            "--data-dir",
            "data",
            "--coin",
            "BTC",
            "--pair",
            "BTCUSDT",
            "-o",
            "out.csv",
            "--drop-undefined",
        ])
        .unwrap();
        match cli.command {
            Command::Prepare {
                config,
                coin,
                output,
                drop_undefined,
                ..
            } => {
                assert_eq!(config, PathBuf::from("run.ini"));
                assert_eq!(coin, "BTC");
                assert_eq!(output, PathBuf::from("out.csv"));
                assert!(drop_undefined);
            }
            other => panic!("expected prepare, got {other:?}"),
        }
    }

    #[test]
    fn backtest_requires_column() {
        assert!(Cli::try_parse_from(["quantfold", "backtest", "-c", "run.ini", "-f", "f.csv"]).is_err());
    }

    #[test]
    fn unknown_subcommand_is_rejected() {
        assert!(Cli::try_parse_from(["quantfold", "optimize"]).is_err());
    }
}

mod config_loading {
    use super::*;

    #[test]
    fn load_valid_config() {
        let ini = write_temp_ini(RUN_INI);
        let config = cli::load_config(ini.path()).unwrap();
        assert_eq!(config.pipeline.target_timeframe, 15);
        assert_eq!(config.pipeline.timeframes, vec![5, 15, 60]);
        assert_eq!(config.folds.n_folds, 3);
        assert_eq!(config.holdout_frac, 0.0);
        assert_eq!(config.objective, SummaryField::SortinoRatio);
        assert_eq!(config.pipeline.pipeline_for(15).definitions().len(), 3);
        assert_eq!(config.pipeline.pipeline_for(60).definitions().len(), 2);
    }

    #[test]
    fn missing_file_is_a_configuration_error() {
        let err = cli::load_config(Path::new("/nonexistent/run.ini")).unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn validate_command_accepts_valid_config() {
        let ini = write_temp_ini(RUN_INI);
        assert!(cli::run_validate(ini.path()).is_ok());
    }

    #[test]
    fn validate_command_rejects_unknown_indicator() {
        let ini = write_temp_ini(&RUN_INI.replace("ema:window=5", "macd:window=5"));
        let err = cli::run_validate(ini.path()).unwrap_err();
        assert!(matches!(err, QuantfoldError::UnknownIndicator { ref name } if name == "macd"));
    }

    #[test]
    fn validate_exit_code_for_bad_config() {
        let ini = write_temp_ini(&RUN_INI.replace("target_timeframe = 15", "target_timeframe = 30"));
        let path = ini.path().to_str().unwrap();
        let code = cli::run(Cli::try_parse_from(["quantfold", "validate", "-c", path]).unwrap());
        assert_eq!(code, ExitCode::from(2));
    }
}

mod prepare_and_backtest {
    use super::*;

    #[test]
    fn prepare_writes_feature_table() {
        let dir = TempDir::new().unwrap();
        let ini = write_temp_ini(RUN_INI);
        let output = prepare_features(&dir, ini.path());

        let table = read_feature_table(&output).unwrap();
        assert!(table.len() > 390);
        assert!(table.column("target").is_some());
        assert!(table.column("60_rsi_5").is_some());
        assert!(table.count_undefined_rows() > 0);
    }

    #[test]
    fn prepare_can_drop_undefined_rows() {
        let dir = TempDir::new().unwrap();
        let ini = write_temp_ini(RUN_INI);
        let data_dir = dir.path().join("data");
        seed_data_dir(&data_dir);
        let output = dir.path().join("dense.csv");
        cli::run_prepare(ini.path(), data_dir, "BTC", "BTCUSDT", &output, true).unwrap();

        let table = read_feature_table(&output).unwrap();
        assert!(!table.is_empty());
        assert_eq!(table.count_undefined_rows(), 0);
    }

    #[test]
    fn prepare_reports_missing_timeframe() {
        let dir = TempDir::new().unwrap();
        let ini = write_temp_ini(RUN_INI);
        let data_dir = dir.path().join("data");
        write_series_csv(&data_dir, "BTC", "BTCUSDT", 15, &wave_bars(15, 400, 0));
        let output = dir.path().join("features.csv");

        let err = cli::run_prepare(ini.path(), data_dir, "BTC", "BTCUSDT", &output, false).unwrap_err();
        assert!(err.to_string().contains("no data for timeframes 5, 60"));
        assert!(!output.exists());
    }

    #[test]
    fn prepare_exit_code_for_unsorted_series() {
        let dir = TempDir::new().unwrap();
        let ini = write_temp_ini(RUN_INI);
        let data_dir = dir.path().join("data");
        seed_data_dir(&data_dir);
        let mut bars = wave_bars(60, 100, 0);
        bars.swap(3, 4);
        write_series_csv(&data_dir, "BTC", "BTCUSDT", 60, &bars);

        let code = cli::run(Cli {
            command: Command::Prepare {
                config: ini.path().to_path_buf(),
                data_dir,
                coin: "BTC".into(),
                pair: "BTCUSDT".into(),
                output: dir.path().join("features.csv"),
                drop_undefined: false,
            },
        });
        assert_eq!(code, ExitCode::from(5));
    }

    #[test]
    fn folds_command_on_prepared_features() {
        let dir = TempDir::new().unwrap();
        let ini = write_temp_ini(RUN_INI);
        let output = prepare_features(&dir, ini.path());
        assert!(cli::run_folds(ini.path(), &output).is_ok());
    }

    #[test]
    fn backtest_command_on_prepared_features() {
        let dir = TempDir::new().unwrap();
        let ini = write_temp_ini(&RUN_INI.replace(
            "initial_train_frac = 0.4",
            "initial_train_frac = 0.4\nholdout_frac = 0.1",
        ));
        let output = prepare_features(&dir, ini.path());
        let code = cli::run(Cli {
            command: Command::Backtest {
                config: ini.path().to_path_buf(),
                features: output,
                column: "sma_4".into(),
            },
        });
        assert_eq!(code, ExitCode::SUCCESS);
    }

    #[test]
    fn backtest_with_unknown_column_fails() {
        let dir = TempDir::new().unwrap();
        let ini = write_temp_ini(RUN_INI);
        let output = prepare_features(&dir, ini.path());
        let err = cli::run_backtest(ini.path(), &output, "ema_200").unwrap_err();
        assert!(matches!(err, QuantfoldError::MissingColumn { ref column, .. } if column == "ema_200"));
    }

    #[test]
    fn backtest_on_missing_features_file_fails() {
        let ini = write_temp_ini(RUN_INI);
        let err = cli::run_backtest(ini.path(), Path::new("/nonexistent/features.csv"), "sma_4")
            .unwrap_err();
        assert!(matches!(err, QuantfoldError::Csv { .. }));
    }
}
