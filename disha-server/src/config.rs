//! Configuration for the radio map server
//!
//! Loads configuration from a TOML file:
//!
//! ```toml
//! [server]
//! listen_addr = "0.0.0.0:4445"
//! radiomap_mean = "/var/lib/disha/radiomap-mean.txt"
//! parameters = "/var/lib/disha/radiomap-parameters.txt"
//! upload_dir = "/var/lib/disha/rsslogs"
//! mode = "indoor"
//!
//! [logging]
//! level = "info"
//! ```

use crate::error::{Error, Result};
use disha_locate::AxisMode;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Top-level application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Network and file distribution configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// TCP bind address, e.g. `0.0.0.0:4445`
    pub listen_addr: String,
    /// Mean radio map file served to clients
    pub radiomap_mean: PathBuf,
    /// Calibrated parameters file served to clients
    pub parameters: PathBuf,
    /// Pre-existing folder where uploaded RSS logs are stored
    pub upload_dir: PathBuf,
    /// Survey mode: `indoor` or `outdoor` (selects axis labels)
    pub mode: String,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&contents)?;
        config.server.axis_mode()?;
        Ok(config)
    }
}

impl ServerConfig {
    /// Parse the configured survey mode
    pub fn axis_mode(&self) -> Result<AxisMode> {
        self.mode
            .parse()
            .map_err(|e: disha_locate::Error| Error::InvalidConfig(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn parses_full_config() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        write!(
            f,
            "[server]\n\
             listen_addr = \"127.0.0.1:4445\"\n\
             radiomap_mean = \"maps/radiomap-mean.txt\"\n\
             parameters = \"maps/radiomap-parameters.txt\"\n\
             upload_dir = \"rsslogs\"\n\
             mode = \"outdoor\"\n\
             \n\
             [logging]\n\
             level = \"debug\"\n"
        )
        .unwrap();
        let config = AppConfig::from_file(f.path()).unwrap();
        assert_eq!(config.server.listen_addr, "127.0.0.1:4445");
        assert_eq!(config.server.axis_mode().unwrap(), AxisMode::Outdoor);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn logging_section_is_optional() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        write!(
            f,
            "[server]\n\
             listen_addr = \"127.0.0.1:4445\"\n\
             radiomap_mean = \"radiomap-mean.txt\"\n\
             parameters = \"radiomap-parameters.txt\"\n\
             upload_dir = \"rsslogs\"\n\
             mode = \"indoor\"\n"
        )
        .unwrap();
        let config = AppConfig::from_file(f.path()).unwrap();
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn rejects_unknown_mode() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        write!(
            f,
            "[server]\n\
             listen_addr = \"127.0.0.1:4445\"\n\
             radiomap_mean = \"radiomap-mean.txt\"\n\
             parameters = \"radiomap-parameters.txt\"\n\
             upload_dir = \"rsslogs\"\n\
             mode = \"submarine\"\n"
        )
        .unwrap();
        assert!(AppConfig::from_file(f.path()).is_err());
    }
}
