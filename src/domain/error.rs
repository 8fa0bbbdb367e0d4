//! Domain error types.
//!
//! Errors fall into two fatal families. Configuration errors are raised
//! before any data is touched where possible; data-integrity errors abort the
//! affected timeframe, coinpair, or fold. Numerically undefined results
//! (warm-up rows, zero-variance ratios) are not errors and never appear here.

/// Top-level error type for quantfold.
#[derive(Debug, thiserror::Error)]
pub enum QuantfoldError {
    #[error("unknown indicator '{name}'")]
    UnknownIndicator { name: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("table '{table}' has no '{column}' column")]
    MissingColumn { table: String, column: String },

    #[error("cannot merge target timeframe {tf_minutes}m with itself")]
    SelfMerge { tf_minutes: u32 },

    #[error("target timeframe {tf_minutes}m is not among the supplied timeframes")]
    TargetTimeframeAbsent { tf_minutes: u32 },

    #[error("invalid fold layout: {reason}")]
    InvalidFolds { reason: String },

    #[error("empty series: {context}")]
    EmptySeries { context: String },

    #[error(
        "timestamps out of order in {context} at row {index}: {current} follows {previous}"
    )]
    UnsortedTimestamps {
        context: String,
        index: usize,
        previous: i64,
        current: i64,
    },

    #[error("duplicate timestamp {timestamp} in {context} at row {index}")]
    DuplicateTimestamp {
        context: String,
        index: usize,
        timestamp: i64,
    },

    #[error("target value is undefined at row {row}")]
    UndefinedTarget { row: usize },

    #[error("column '{column}' has {actual} rows, expected {expected}")]
    RaggedTable {
        column: String,
        expected: usize,
        actual: usize,
    },

    #[error("model returned {actual} predictions for {expected} rows")]
    PredictionCount { expected: usize, actual: usize },

    #[error("csv error in {path}: {reason}")]
    Csv { path: String, reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl QuantfoldError {
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            QuantfoldError::UnknownIndicator { .. }
                | QuantfoldError::ConfigParse { .. }
                | QuantfoldError::ConfigMissing { .. }
                | QuantfoldError::ConfigInvalid { .. }
                | QuantfoldError::MissingColumn { .. }
                | QuantfoldError::SelfMerge { .. }
                | QuantfoldError::TargetTimeframeAbsent { .. }
                | QuantfoldError::InvalidFolds { .. }
        )
    }

    pub fn is_data_integrity(&self) -> bool {
        matches!(
            self,
            QuantfoldError::EmptySeries { .. }
                | QuantfoldError::UnsortedTimestamps { .. }
                | QuantfoldError::DuplicateTimestamp { .. }
                | QuantfoldError::UndefinedTarget { .. }
                | QuantfoldError::RaggedTable { .. }
                | QuantfoldError::PredictionCount { .. }
        )
    }

    pub(crate) fn invalid(section: &str, key: &str, reason: impl Into<String>) -> Self {
        QuantfoldError::ConfigInvalid {
            section: section.to_string(),
            key: key.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<&QuantfoldError> for std::process::ExitCode {
    fn from(err: &QuantfoldError) -> Self {
        let code: u8 = if err.is_configuration() {
            2
        } else if err.is_data_integrity() {
            5
        } else {
            1
        };
        std::process::ExitCode::from(code)
    }
}
