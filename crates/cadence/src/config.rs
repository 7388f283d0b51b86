//! Configuration management for the cadence frame loop.
//!
//! This module handles loading and validation of the host configuration from
//! TOML files. The event system itself takes no configuration; everything
//! here describes how the frame loop drives it.

use crate::cli::CliArgs;
use cadence_event_system::Budget;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

fn default_tick_interval() -> u64 {
    16 // ~60 frames per second
}
fn default_budget_ms() -> u64 {
    4
}
fn default_stats_interval_frames() -> u64 {
    300
}
fn default_publisher_threads() -> usize {
    2
}
fn default_events_per_frame() -> usize {
    8
}
fn default_listener_cost_us() -> u64 {
    50
}
fn default_log_level() -> String {
    "info".to_string()
}

/// Application configuration loaded from TOML file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct AppConfig {
    /// Frame timing settings
    #[serde(default)]
    pub frame: FrameSettings,
    /// Synthetic workload settings
    #[serde(default)]
    pub simulation: SimulationSettings,
    /// Logging configuration settings
    #[serde(default)]
    pub logging: LoggingSettings,
}

/// Frame loop timing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameSettings {
    /// Time between frames in milliseconds
    #[serde(default = "default_tick_interval")]
    pub tick_interval_ms: u64,
    /// Dispatch budget per frame in milliseconds (0 = unbounded)
    #[serde(default = "default_budget_ms")]
    pub budget_ms: u64,
    /// Frames to run before stopping (0 = until a shutdown signal)
    #[serde(default)]
    pub max_frames: u64,
    /// Frames between statistics reports (0 disables periodic reports)
    #[serde(default = "default_stats_interval_frames")]
    pub stats_interval_frames: u64,
}

/// Synthetic publishers and listeners exercising the event system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationSettings {
    /// Number of threads publishing events
    #[serde(default = "default_publisher_threads")]
    pub publisher_threads: usize,
    /// Events each publisher queues per frame
    #[serde(default = "default_events_per_frame")]
    pub events_per_frame: usize,
    /// Simulated work per listener call in microseconds
    #[serde(default = "default_listener_cost_us")]
    pub listener_cost_us: u64,
    /// Toggle between the "default" and "paused" groups every N frames (0 = never)
    #[serde(default)]
    pub pause_every_frames: u64,
}

/// Logging configuration settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Log level filter (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Whether to output logs in JSON format
    #[serde(default)]
    pub json_format: bool,
}

impl Default for FrameSettings {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval(),
            budget_ms: default_budget_ms(),
            max_frames: 0,
            stats_interval_frames: default_stats_interval_frames(),
        }
    }
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            publisher_threads: default_publisher_threads(),
            events_per_frame: default_events_per_frame(),
            listener_cost_us: default_listener_cost_us(),
            pause_every_frames: 0,
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json_format: false,
        }
    }
}

impl FrameSettings {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    /// Dispatch budget for one frame.
    pub fn budget(&self) -> Budget {
        Budget::from(Duration::from_millis(self.budget_ms))
    }
}

impl AppConfig {
    /// Loads configuration from a TOML file.
    ///
    /// If the file doesn't exist, a default configuration file is written at
    /// `path` and the defaults are returned.
    pub async fn load_from_file(path: &PathBuf) -> Result<Self, Box<dyn std::error::Error>> {
        if path.exists() {
            let content = tokio::fs::read_to_string(path).await?;
            let config: AppConfig = toml::from_str(&content)?;
            Ok(config)
        } else {
            let default_config = AppConfig::default();
            let toml_content = toml::to_string_pretty(&default_config)?;
            tokio::fs::write(path, toml_content).await?;
            info!("Created default configuration file: {}", path.display());
            Ok(default_config)
        }
    }

    /// Applies command-line overrides on top of the file settings.
    pub fn apply_cli_overrides(&mut self, args: &CliArgs) {
        if let Some(log_level) = &args.log_level {
            self.logging.level = log_level.clone();
        }
        if args.json_logs {
            self.logging.json_format = true;
        }
        if let Some(budget_ms) = args.budget_ms {
            self.frame.budget_ms = budget_ms;
        }
        if let Some(frames) = args.frames {
            self.frame.max_frames = frames;
        }
    }

    /// Validates the configuration settings.
    pub fn validate(&self) -> Result<(), String> {
        if self.frame.tick_interval_ms == 0 {
            return Err("frame.tick_interval_ms must be greater than 0".to_string());
        }

        if self.simulation.publisher_threads == 0 {
            return Err("simulation.publisher_threads must be greater than 0".to_string());
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(format!(
                "Invalid log level: {}. Must be one of: {valid_levels:?}",
                &self.logging.level
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::{NamedTempFile, TempDir};
    use tokio::fs;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();

        assert_eq!(config.frame.tick_interval_ms, 16);
        assert_eq!(config.frame.budget_ms, 4);
        assert_eq!(config.frame.max_frames, 0);
        assert_eq!(config.simulation.publisher_threads, 2);
        assert_eq!(config.simulation.pause_every_frames, 0);
        assert_eq!(config.logging.level, "info");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = AppConfig::default();

        config.frame.tick_interval_ms = 0;
        assert!(config.validate().is_err());

        config.frame.tick_interval_ms = 16;
        config.simulation.publisher_threads = 0;
        assert!(config.validate().is_err());

        config.simulation.publisher_threads = 1;
        config.logging.level = "verbose".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.contains("Invalid log level: verbose"));
    }

    #[test]
    fn test_zero_budget_is_unbounded() {
        let mut frame = FrameSettings::default();
        assert_eq!(frame.budget(), Budget::Limited(Duration::from_millis(4)));

        frame.budget_ms = 0;
        assert!(frame.budget().is_unbounded());
    }

    #[test]
    fn test_cli_overrides() {
        let mut config = AppConfig::default();
        let args = CliArgs {
            config_path: PathBuf::from("unused.toml"),
            log_level: Some("trace".to_string()),
            json_logs: true,
            budget_ms: Some(0),
            frames: Some(120),
        };

        config.apply_cli_overrides(&args);
        assert_eq!(config.logging.level, "trace");
        assert!(config.logging.json_format);
        assert_eq!(config.frame.budget_ms, 0);
        assert_eq!(config.frame.max_frames, 120);
        // Untouched settings keep their file values.
        assert_eq!(config.frame.tick_interval_ms, 16);
    }

    #[tokio::test]
    async fn test_load_from_nonexistent_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cadence.toml");

        let config = AppConfig::load_from_file(&path).await.unwrap();
        assert_eq!(config, AppConfig::default());
        assert!(path.exists());

        // The written file loads back to the same settings.
        let reloaded = AppConfig::load_from_file(&path).await.unwrap();
        assert_eq!(reloaded, config);
    }

    #[tokio::test]
    async fn test_load_from_existing_file() {
        let toml_content = r#"
[frame]
tick_interval_ms = 33
budget_ms = 8
max_frames = 900

[simulation]
publisher_threads = 4
pause_every_frames = 120

[logging]
level = "debug"
json_format = true
"#;

        let temp_file = NamedTempFile::new().unwrap();
        fs::write(temp_file.path(), toml_content).await.unwrap();

        let config = AppConfig::load_from_file(&temp_file.path().to_path_buf())
            .await
            .unwrap();

        assert_eq!(config.frame.tick_interval_ms, 33);
        assert_eq!(config.frame.budget_ms, 8);
        assert_eq!(config.frame.max_frames, 900);
        assert_eq!(config.frame.stats_interval_frames, 300);
        assert_eq!(config.simulation.publisher_threads, 4);
        assert_eq!(config.simulation.events_per_frame, 8);
        assert_eq!(config.simulation.pause_every_frames, 120);
        assert_eq!(config.logging.level, "debug");
        assert!(config.logging.json_format);
    }

    #[tokio::test]
    async fn test_load_rejects_malformed_file() {
        let temp_file = NamedTempFile::new().unwrap();
        fs::write(temp_file.path(), "[frame]\ntick_interval_ms = \"fast\"\n")
            .await
            .unwrap();

        let result = AppConfig::load_from_file(&temp_file.path().to_path_buf()).await;
        assert!(result.is_err());
    }
}
