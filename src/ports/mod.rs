//! Port traits: the seams to ingestion, configuration, and model collaborators.

pub mod config_port;
pub mod data_port;
pub mod model_port;
