//! INI file configuration adapter.
//!
//! Section and key names are case-insensitive.

use std::path::Path;
use std::str::FromStr;

use configparser::ini::Ini;

use crate::domain::error::QuantfoldError;
use crate::ports::config_port::ConfigPort;

#[derive(Debug)]
pub struct FileConfigAdapter {
    config: Ini,
}

impl FileConfigAdapter {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, QuantfoldError> {
        let mut config = Ini::new();
        config
            .load(path.as_ref())
            .map_err(|reason| QuantfoldError::ConfigParse {
                file: path.as_ref().display().to_string(),
                reason,
            })?;
        Ok(Self { config })
    }

    pub fn from_string(content: &str) -> Result<Self, QuantfoldError> {
        let mut config = Ini::new();
        config
            .read(content.to_string())
            .map_err(|reason| QuantfoldError::ConfigParse {
                file: "<string>".to_string(),
                reason,
            })?;
        Ok(Self { config })
    }

    fn parse_bool(value: &str) -> Option<bool> {
        match value.to_lowercase().as_str() {
            "true" | "yes" | "1" => Some(true),
            "false" | "no" | "0" => Some(false),
            _ => None,
        }
    }

    fn parsed<T: FromStr>(&self, section: &str, key: &str, default: T, kind: &str) -> Result<T, QuantfoldError> {
        match self.get_string(section, key) {
            None => Ok(default),
            Some(raw) => raw.trim().parse().map_err(|_| {
                QuantfoldError::invalid(section, key, format!("expected {kind}, got '{raw}'"))
            }),
        }
    }
}

impl ConfigPort for FileConfigAdapter {
    fn get_string(&self, section: &str, key: &str) -> Option<String> {
        self.config.get(section, key)
    }

    fn get_int(&self, section: &str, key: &str, default: i64) -> Result<i64, QuantfoldError> {
        self.parsed(section, key, default, "an integer")
    }

    fn get_double(&self, section: &str, key: &str, default: f64) -> Result<f64, QuantfoldError> {
        self.parsed(section, key, default, "a number")
    }

    fn get_bool(&self, section: &str, key: &str, default: bool) -> Result<bool, QuantfoldError> {
        match self.get_string(section, key) {
            None => Ok(default),
            Some(raw) => Self::parse_bool(raw.trim()).ok_or_else(|| {
                QuantfoldError::invalid(section, key, format!("expected a boolean, got '{raw}'"))
            }),
        }
    }

    fn keys(&self, section: &str) -> Vec<String> {
        let mut keys: Vec<String> = self
            .config
            .get_map_ref()
            .get(&section.to_lowercase())
            .map(|entries| entries.keys().cloned().collect())
            .unwrap_or_default();
        keys.sort();
        keys
    }
}
