//! Concrete adapter implementations for ports.

pub mod column_model;
pub mod csv_adapter;
pub mod feature_csv;
pub mod file_config_adapter;
