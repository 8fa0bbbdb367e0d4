//! Configuration access port trait.
//!
//! Typed getters fall back to `default` only when the key is absent; a
//! present but unparsable value is a configuration error.

use crate::domain::error::QuantfoldError;

pub trait ConfigPort {
    fn get_string(&self, section: &str, key: &str) -> Option<String>;
    fn get_int(&self, section: &str, key: &str, default: i64) -> Result<i64, QuantfoldError>;
    fn get_double(&self, section: &str, key: &str, default: f64) -> Result<f64, QuantfoldError>;
    fn get_bool(&self, section: &str, key: &str, default: bool) -> Result<bool, QuantfoldError>;
    /// Keys present in `section`, sorted.
    fn keys(&self, section: &str) -> Vec<String>;
}
