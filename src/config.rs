//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.

use serde::Deserialize;
use serde::de::Error;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::error::{Result, ThrustStandError};

/// Baud rates the test-stand firmware can be built with
const SUPPORTED_BAUD_RATES: &[u32] = &[9600, 19200, 38400, 57600, 115200, 230400];

/// Main configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub serial: SerialConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub plot: PlotConfig,
}

/// Serial port configuration
#[derive(Debug, Deserialize, Clone)]
pub struct SerialConfig {
    #[serde(default = "default_serial_port")]
    pub port: String,

    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,

    /// Upper bound on a single line read
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Delay after opening the port; the controller resets when the port opens
    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,

    /// Wait between writing a command and reading its response line
    #[serde(default = "default_command_response_delay_ms")]
    pub command_response_delay_ms: u64,
}

/// Telemetry log configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_file")]
    pub output_file: String,

    #[serde(default = "default_status_interval_ms")]
    pub status_interval_ms: u64,
}

/// Plot output configuration
#[derive(Debug, Deserialize, Clone)]
pub struct PlotConfig {
    #[serde(default = "default_plot_file")]
    pub output_file: String,

    #[serde(default = "default_plot_size")]
    pub width: u32,

    #[serde(default = "default_plot_size")]
    pub height: u32,
}

// Default value functions
fn default_serial_port() -> String { "/dev/ttyACM0".to_string() }
fn default_baud_rate() -> u32 { 57600 }
fn default_timeout_ms() -> u64 { 2000 }
fn default_settle_ms() -> u64 { 2000 }
fn default_command_response_delay_ms() -> u64 { 100 }

fn default_log_file() -> String { "thrust_data.csv".to_string() }
fn default_status_interval_ms() -> u64 { 1000 }

fn default_plot_file() -> String { "thrust_data.png".to_string() }
fn default_plot_size() -> u32 { 1000 }

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: default_serial_port(),
            baud_rate: default_baud_rate(),
            timeout_ms: default_timeout_ms(),
            settle_ms: default_settle_ms(),
            command_response_delay_ms: default_command_response_delay_ms(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            output_file: default_log_file(),
            status_interval_ms: default_status_interval_ms(),
        }
    }
}

impl Default for PlotConfig {
    fn default() -> Self {
        Self {
            output_file: default_plot_file(),
            width: default_plot_size(),
            height: default_plot_size(),
        }
    }
}

impl SerialConfig {
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    pub fn command_response_delay(&self) -> Duration {
        Duration::from_millis(self.command_response_delay_ms)
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use thrust_stand::config::Config;
    ///
    /// let config = Config::load("config/default.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    /// Load configuration from a file if it exists, otherwise use defaults
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        if path.as_ref().exists() {
            Self::load(path)
        } else {
            let config = Self::default();
            config.validate()?;
            Ok(config)
        }
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns error if any configuration value is out of valid range
    pub fn validate(&self) -> Result<()> {
        if self.serial.port.is_empty() {
            return Err(invalid("serial port cannot be empty"));
        }

        if !SUPPORTED_BAUD_RATES.contains(&self.serial.baud_rate) {
            return Err(invalid(format!(
                "baud_rate must be one of: {:?}",
                SUPPORTED_BAUD_RATES
            )));
        }

        if self.serial.timeout_ms == 0 || self.serial.timeout_ms > 10000 {
            return Err(invalid("timeout_ms must be between 1 and 10000"));
        }

        if self.serial.settle_ms > 10000 {
            return Err(invalid("settle_ms must be at most 10000"));
        }

        if self.serial.command_response_delay_ms > 5000 {
            return Err(invalid("command_response_delay_ms must be at most 5000"));
        }

        if self.logging.output_file.is_empty() {
            return Err(invalid("logging output_file cannot be empty"));
        }

        if self.logging.status_interval_ms == 0 || self.logging.status_interval_ms > 60000 {
            return Err(invalid("status_interval_ms must be between 1 and 60000"));
        }

        if self.plot.output_file.is_empty() {
            return Err(invalid("plot output_file cannot be empty"));
        }

        for dim in [self.plot.width, self.plot.height] {
            if !(200..=8000).contains(&dim) {
                return Err(invalid("plot width and height must be between 200 and 8000"));
            }
        }

        Ok(())
    }
}

fn invalid(msg: impl std::fmt::Display) -> ThrustStandError {
    ThrustStandError::Config(toml::de::Error::custom(msg))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_empty_toml_uses_defaults() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config.serial.port, "/dev/ttyACM0");
        assert_eq!(config.serial.baud_rate, 57600);
        assert_eq!(config.logging.output_file, "thrust_data.csv");
        assert_eq!(config.plot.output_file, "thrust_data.png");
    }

    #[test]
    fn test_partial_section_keeps_other_defaults() {
        let config = Config::from_toml(
            r#"
            [serial]
            port = "/dev/tty.usbmodem101"
            "#,
        )
        .unwrap();
        assert_eq!(config.serial.port, "/dev/tty.usbmodem101");
        assert_eq!(config.serial.timeout_ms, 2000);
        assert_eq!(config.serial.command_response_delay_ms, 100);
    }

    #[test]
    fn test_empty_port_rejected() {
        let mut config = Config::default();
        config.serial.port = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_baud_rate() {
        let mut config = Config::default();
        config.serial.baud_rate = 420000;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_valid_baud_rates() {
        for &baud in SUPPORTED_BAUD_RATES {
            let mut config = Config::default();
            config.serial.baud_rate = baud;
            assert!(config.validate().is_ok(), "Baud rate {} should be valid", baud);
        }
    }

    #[test]
    fn test_timeout_bounds() {
        let mut config = Config::default();
        config.serial.timeout_ms = 0;
        assert!(config.validate().is_err());
        config.serial.timeout_ms = 10001;
        assert!(config.validate().is_err());
        config.serial.timeout_ms = 10000;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_settle_allowed() {
        let mut config = Config::default();
        config.serial.settle_ms = 0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_log_file_rejected() {
        let mut config = Config::default();
        config.logging.output_file = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_plot_size_bounds() {
        let mut config = Config::default();
        config.plot.width = 100;
        assert!(config.validate().is_err());
        config.plot.width = 1000;
        config.plot.height = 9000;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_unknown_toml_is_parse_error() {
        let result = Config::from_toml("[serial]\nbaud_rate = \"fast\"");
        assert!(matches!(result, Err(ThrustStandError::Config(_))));
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let config = Config::load_or_default("/nonexistent/thrust_stand.toml").unwrap();
        assert_eq!(config.serial.baud_rate, 57600);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        use std::io::Write;
        writeln!(file, "[logging]\noutput_file = \"run1.csv\"").unwrap();
        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.logging.output_file, "run1.csv");
    }

    #[test]
    fn test_durations() {
        let serial = SerialConfig::default();
        assert_eq!(serial.read_timeout(), Duration::from_secs(2));
        assert_eq!(serial.settle_delay(), Duration::from_secs(2));
        assert_eq!(serial.command_response_delay(), Duration::from_millis(100));
    }
}
