//! INI file configuration adapter.
//!
//! ```ini
//! [strategy]
//! short_period = 10
//! long_period = 30
//! printlog = true
//!
//! [backtest]
//! initial_cash = 100000.0
//! commission_rate = 0.001
//!
//! [data]
//! path = data/AAPL.csv
//! ```

use crate::domain::error::MacrossError;
use crate::ports::config_port::ConfigPort;
use configparser::ini::Ini;
use std::path::Path;

#[derive(Debug)]
pub struct FileConfigAdapter {
    config: Ini,
}

impl FileConfigAdapter {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, MacrossError> {
        let path = path.as_ref();
        let mut config = Ini::new();
        config
            .load(path)
            .map_err(|reason| MacrossError::ConfigParse {
                file: path.display().to_string(),
                reason,
            })?;
        Ok(Self { config })
    }

    pub fn from_string(content: &str) -> Result<Self, MacrossError> {
        let mut config = Ini::new();
        config
            .read(content.to_string())
            .map_err(|reason| MacrossError::ConfigParse {
                file: "<string>".to_string(),
                reason,
            })?;
        Ok(Self { config })
    }

    fn parse_bool(value: &str) -> Option<bool> {
        match value.trim().to_lowercase().as_str() {
            "true" | "yes" | "on" | "1" => Some(true),
            "false" | "no" | "off" | "0" => Some(false),
            _ => None,
        }
    }
}

impl ConfigPort for FileConfigAdapter {
    fn get_string(&self, section: &str, key: &str) -> Option<String> {
        self.config
            .get(section, key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn get_int(&self, section: &str, key: &str) -> Result<Option<i64>, MacrossError> {
        self.config
            .getint(section, key)
            .map_err(|reason| MacrossError::invalid(section, key, reason))
    }

    fn get_double(&self, section: &str, key: &str) -> Result<Option<f64>, MacrossError> {
        self.config
            .getfloat(section, key)
            .map_err(|reason| MacrossError::invalid(section, key, reason))
    }

    fn get_bool(&self, section: &str, key: &str) -> Result<Option<bool>, MacrossError> {
        match self.get_string(section, key) {
            None => Ok(None),
            Some(raw) => Self::parse_bool(&raw).map(Some).ok_or_else(|| {
                MacrossError::invalid(
                    section,
                    key,
                    format!("expected true/false, got '{}'", raw),
                )
            }),
        }
    }
}
