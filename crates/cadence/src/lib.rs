//! # Cadence - Frame Loop Host
//!
//! Drives a [`cadence_event_system::EventSystem`] the way a game loop would:
//! publisher threads queue prioritised events, and once per frame the loop
//! dispatches as many as fit in the frame budget.
//!
//! ## Quick Start
//!
//! ```bash
//! # Run with default configuration
//! cadence
//!
//! # Specify custom configuration
//! cadence --config stress.toml
//!
//! # Tight budget, fixed run length, verbose output
//! cadence --budget-ms 1 --frames 600 --log-level debug
//!
//! # JSON logging
//! cadence --json-logs
//! ```
//!
//! ## Configuration
//!
//! Settings are loaded from a TOML file (default: `cadence.toml`). If the file
//! doesn't exist, a default configuration will be created.
//!
//! ## Signal Handling
//!
//! The loop stops gracefully on SIGINT (Ctrl+C) and SIGTERM, drains the
//! queue and logs final statistics.

use tracing::error;

mod app;
mod cli;
mod config;
mod logging;
mod signals;
pub mod simulation;

pub use app::Application;
pub use cli::CliArgs;
pub use config::{AppConfig, FrameSettings, LoggingSettings, SimulationSettings};

/// Entry point called from `main`.
///
/// Parses arguments, sets up logging from the configuration file and runs the
/// application. Exits the process with status 1 on startup or runtime errors.
pub async fn init() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    // Load configuration to get logging settings
    let mut config = AppConfig::load_from_file(&args.config_path)
        .await
        .unwrap_or_default();
    config.apply_cli_overrides(&args);

    if let Err(e) = logging::setup_logging(&config.logging, args.json_logs) {
        eprintln!("❌ Failed to setup logging: {e}");
        std::process::exit(1);
    }

    match Application::new(args).await {
        Ok(app) => {
            if let Err(e) = app.run().await {
                error!("❌ Application error: {:?}", e);
                std::process::exit(1);
            }
        }
        Err(e) => {
            error!("❌ Failed to start application: {e:?}");
            std::process::exit(1);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::PAUSED_GROUP;
    use cadence_event_system::DEFAULT_GROUP;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn fast_config(max_frames: u64) -> AppConfig {
        let mut config = AppConfig::default();
        config.frame.tick_interval_ms = 1;
        config.frame.budget_ms = 0;
        config.frame.max_frames = max_frames;
        config.frame.stats_interval_frames = 2;
        config.simulation.publisher_threads = 2;
        config.simulation.events_per_frame = 3;
        config.simulation.listener_cost_us = 0;
        config
    }

    #[tokio::test]
    async fn test_application_creation() {
        let dir = TempDir::new().unwrap();
        let args = CliArgs {
            config_path: dir.path().join("cadence.toml"),
            log_level: Some("debug".to_string()),
            json_logs: false,
            budget_ms: Some(2),
            frames: Some(10),
        };

        let app = Application::new(args.clone()).await.unwrap();

        // A default file was written next to the requested path.
        assert!(args.config_path.exists());
        let events = app.event_system();
        assert_eq!(events.active_group(), DEFAULT_GROUP);
        assert!(events.has_group(PAUSED_GROUP));
        assert!(events.is_queue_empty());
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let mut config = fast_config(1);
        config.simulation.publisher_threads = 0;

        let err = Application::with_config(config).err().unwrap();
        assert!(err.to_string().contains("Configuration validation failed"));
    }

    #[tokio::test]
    async fn test_missing_config_directory_fails() {
        let args = CliArgs {
            config_path: PathBuf::from("/nonexistent-dir/cadence.toml"),
            log_level: None,
            json_logs: false,
            budget_ms: None,
            frames: None,
        };

        assert!(Application::new(args).await.is_err());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_runs_fixed_number_of_frames() {
        let app = Application::with_config(fast_config(6)).unwrap();
        let events = app.event_system().clone();

        let stats = app
            .run_until(std::future::pending::<Result<(), Box<dyn std::error::Error>>>())
            .await
            .unwrap();

        // One pass per frame plus the final drain.
        assert_eq!(stats.dispatch_passes, 7);
        assert!(events.is_queue_empty());
        assert_eq!(
            stats.events_published,
            stats.events_dispatched + stats.events_flushed
        );
        assert_eq!(stats.listener_failures, 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_pause_toggle_switches_groups() {
        let mut config = fast_config(3);
        config.simulation.pause_every_frames = 3;
        let app = Application::with_config(config).unwrap();
        let events = app.event_system().clone();

        app.run_until(std::future::pending::<Result<(), Box<dyn std::error::Error>>>())
            .await
            .unwrap();

        // Frame 3 switched to the paused group.
        assert_eq!(events.active_group(), PAUSED_GROUP);
        assert!(events.is_queue_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_shutdown_future_stops_the_loop() {
        let app = Application::with_config(fast_config(0)).unwrap();

        let stats = app
            .run_until(async {
                tokio::time::sleep(std::time::Duration::from_millis(20)).await;
                Ok::<(), Box<dyn std::error::Error>>(())
            })
            .await
            .unwrap();

        assert!(stats.dispatch_passes >= 2);
        assert_eq!(
            stats.events_published,
            stats.events_dispatched + stats.events_flushed
        );
    }
}
