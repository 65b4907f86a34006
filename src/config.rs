//! Run Configuration Module
//! Acquisition/display rates, plot window and output locations.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Settings for a single unpack & plot run.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Data acquisition sampling frequency (Hz)
    pub data_sampling_hz: f64,
    /// Number of points per second to show (Hz)
    pub plot_sampling_hz: f64,
    /// Starting time for the plot (s)
    pub window_start_s: f64,
    /// End time for the plot (s), exclusive
    pub window_end_s: f64,
    /// Visible horizontal range of each panel (s)
    pub x_range_s: f64,
    pub panel_width: u32,
    pub panel_height: u32,
    /// Directory receiving the CSV exports
    pub export_dir: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_sampling_hz: 1024.0,
            plot_sampling_hz: 100.0,
            window_start_s: 3060.0,
            window_end_s: 3080.0,
            x_range_s: 20.0,
            panel_width: 1200,
            panel_height: 200,
            export_dir: PathBuf::from("."),
        }
    }
}

impl AppConfig {
    /// Load settings from a TOML file. Keys left out keep their defaults.
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Keep one row every N when downsampling for display.
    pub fn downsample_step(&self) -> usize {
        ((self.data_sampling_hz / self.plot_sampling_hz) as usize).max(1)
    }

    /// Horizontal range shared by every panel.
    pub fn x_range(&self) -> (f64, f64) {
        (self.window_start_s, self.window_start_s + self.x_range_s)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.data_sampling_hz > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "data_sampling_hz must be positive, got {}",
                self.data_sampling_hz
            )));
        }
        if !(self.plot_sampling_hz > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "plot_sampling_hz must be positive, got {}",
                self.plot_sampling_hz
            )));
        }
        if !(self.window_end_s > self.window_start_s) {
            return Err(ConfigError::Invalid(format!(
                "window end ({}) must be after window start ({})",
                self.window_end_s, self.window_start_s
            )));
        }
        if !(self.x_range_s > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "x_range_s must be positive, got {}",
                self.x_range_s
            )));
        }
        if self.panel_width == 0 || self.panel_height == 0 {
            return Err(ConfigError::Invalid("panel size must be non-zero".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_acquisition_setup() {
        let config = AppConfig::default();
        assert_eq!(config.downsample_step(), 10);
        assert_eq!(config.x_range(), (3060.0, 3080.0));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn example_file_matches_defaults() {
        let config = AppConfig::from_toml_str(include_str!("../ecg_plot.example.toml"))
            .expect("example config parses");
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = AppConfig::from_toml_str("window_start_s = 10.0\nwindow_end_s = 15.0\n")
            .expect("valid toml");
        assert_eq!(config.window_start_s, 10.0);
        assert_eq!(config.window_end_s, 15.0);
        assert_eq!(config.data_sampling_hz, 1024.0);
        assert_eq!(config.panel_height, 200);
    }

    #[test]
    fn display_rate_above_acquisition_keeps_every_row() {
        let config = AppConfig {
            plot_sampling_hz: 2048.0,
            ..AppConfig::default()
        };
        assert_eq!(config.downsample_step(), 1);
    }

    #[test]
    fn rejects_inverted_window() {
        let config = AppConfig {
            window_start_s: 20.0,
            window_end_s: 10.0,
            ..AppConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn rejects_zero_sampling_rate() {
        let config = AppConfig {
            data_sampling_hz: 0.0,
            ..AppConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
