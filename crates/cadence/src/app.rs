//! Main application logic and lifecycle management.
//!
//! The `Application` owns the event system and runs the frame loop: every
//! tick it optionally switches subscriber groups, dispatches queued events
//! within the frame budget and periodically reports statistics.

use crate::cli::CliArgs;
use crate::config::AppConfig;
use crate::logging::display_banner;
use crate::signals::{wait_for_shutdown, wait_for_shutdown_silent};
use crate::simulation::{install_listeners, GameEvent, PublisherPool, PAUSED_GROUP};
use cadence_event_system::{create_event_system, Budget, EventSystem, EventSystemStats, DEFAULT_GROUP};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};

/// Frame loop host with statistics reporting.
pub struct Application {
    /// Loaded application configuration
    config: AppConfig,
    /// Event system shared with the publisher threads
    events: Arc<EventSystem<GameEvent>>,
}

impl Application {
    /// Loads the configuration file, applies CLI overrides and builds the
    /// application.
    pub async fn new(args: CliArgs) -> Result<Self, Box<dyn std::error::Error>> {
        info!("🔧 Loading configuration from: {}", args.config_path.display());
        let mut config = AppConfig::load_from_file(&args.config_path).await?;
        config.apply_cli_overrides(&args);

        Self::with_config(config)
    }

    /// Validates `config`, creates the event system and installs listeners.
    pub fn with_config(config: AppConfig) -> Result<Self, Box<dyn std::error::Error>> {
        if let Err(e) = config.validate() {
            return Err(format!("Configuration validation failed: {e}").into());
        }
        info!("✅ Configuration loaded and validated successfully");

        let events: Arc<EventSystem<GameEvent>> = create_event_system();
        install_listeners(
            &events,
            Duration::from_micros(config.simulation.listener_cost_us),
        )?;

        Ok(Self { config, events })
    }

    /// The event system driven by this application.
    pub fn event_system(&self) -> &Arc<EventSystem<GameEvent>> {
        &self.events
    }

    /// Runs until Ctrl+C / SIGTERM or the configured frame count.
    ///
    /// A second signal during shutdown exits immediately.
    pub async fn run(self) -> Result<EventSystemStats, Box<dyn std::error::Error>> {
        display_banner();

        let shutdown = async {
            wait_for_shutdown().await?;

            tokio::spawn(async move {
                if let Err(e) = wait_for_shutdown_silent().await {
                    error!("Failed to set up merciless shutdown signal handler: {e}");
                    return;
                }

                warn!("Shutdown handler received again! I'll make this quick.");
                std::process::exit(1);
            });
            Ok::<(), Box<dyn std::error::Error>>(())
        };

        self.run_until(shutdown).await
    }

    /// Runs the frame loop until `shutdown` resolves or `max_frames` is hit,
    /// then stops the publishers, drains the queue and returns the final
    /// statistics.
    ///
    /// Requires a multi-threaded runtime: dispatch runs listeners on the
    /// runtime thread through `block_in_place`.
    pub async fn run_until<F>(self, shutdown: F) -> Result<EventSystemStats, Box<dyn std::error::Error>>
    where
        F: Future<Output = Result<(), Box<dyn std::error::Error>>>,
    {
        info!("🌟 Starting Cadence frame loop");
        self.log_configuration_summary();

        let frame_settings = &self.config.frame;
        let publishers = PublisherPool::spawn(
            self.events.clone(),
            &self.config.simulation,
            frame_settings.tick_interval(),
        )?;

        let mut interval = tokio::time::interval(frame_settings.tick_interval());
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tokio::pin!(shutdown);

        info!("🛑 Press Ctrl+C to gracefully shutdown");

        let mut frames = 0u64;
        let mut last_report = EventSystemStats::default();
        let outcome = loop {
            tokio::select! {
                result = &mut shutdown => break result,
                _ = interval.tick() => {}
            }

            frames += 1;
            self.run_frame(frames);

            if frame_settings.stats_interval_frames != 0
                && frames % frame_settings.stats_interval_frames == 0
            {
                self.log_periodic_stats(frames, &mut last_report);
            }

            if frame_settings.max_frames != 0 && frames >= frame_settings.max_frames {
                info!("🏁 Reached {} frames", frames);
                break Ok(());
            }
        };

        info!("🛑 Stopping publishers...");
        let published = publishers.shutdown();

        info!("⏳ Draining {} remaining events...", self.events.queue_len());
        if let Err(e) = self.dispatch(Budget::Unbounded) {
            warn!("⚠️ Final drain aborted: {}", e);
        }

        log_final_statistics(&self.events, frames, published);
        outcome?;

        info!("✅ Cadence shutdown complete");
        Ok(self.events.stats())
    }

    /// One tick: optional group toggle, then a budgeted dispatch.
    fn run_frame(&self, frame: u64) {
        let pause_every = self.config.simulation.pause_every_frames;
        if pause_every != 0 && frame % pause_every == 0 {
            self.toggle_pause(frame);
        }

        if let Err(e) = self.dispatch(self.config.frame.budget()) {
            warn!("⚠️ Frame {} dispatch aborted: {}", frame, e);
        }
    }

    fn dispatch(&self, budget: Budget) -> cadence_event_system::Result<()> {
        tokio::task::block_in_place(|| self.events.dispatch(budget, None))
    }

    /// Switches between the default and paused groups, discarding events
    /// queued against the old one.
    fn toggle_pause(&self, frame: u64) {
        let target = if self.events.active_group() == DEFAULT_GROUP {
            PAUSED_GROUP
        } else {
            DEFAULT_GROUP
        };

        let pending = self.events.queue_len();
        match self.events.set_active_subscriber_group(target, true) {
            Ok(()) if target == PAUSED_GROUP => {
                info!("⏸️ Frame {}: paused ({} queued events discarded)", frame, pending)
            }
            Ok(()) => info!("▶️ Frame {}: resumed ({} queued events discarded)", frame, pending),
            Err(e) => warn!("⚠️ Frame {}: could not switch to '{}': {}", frame, target, e),
        }
    }

    fn log_periodic_stats(&self, frame: u64, last: &mut EventSystemStats) {
        let stats = self.events.stats();
        let dispatched = stats.events_dispatched - last.events_dispatched;
        let exhausted = stats.budget_exhausted_passes - last.budget_exhausted_passes;

        info!(
            "📊 Frame {} - {} events dispatched | {} passes over budget | {} queued | group '{}'",
            frame,
            dispatched,
            exhausted,
            self.events.queue_len(),
            self.events.active_group()
        );

        if exhausted > 0 && self.events.queue_len() > dispatched as usize {
            info!("🔥 Backlog growing - queue is outpacing the frame budget");
        }

        *last = stats;
    }

    /// Logs the configuration summary at startup.
    fn log_configuration_summary(&self) {
        let frame = &self.config.frame;
        let simulation = &self.config.simulation;

        info!("📋 Configuration Summary:");
        info!("  ⏱️ Tick interval: {}ms", frame.tick_interval_ms);
        match frame.budget() {
            Budget::Unbounded => info!("  ⚡ Dispatch budget: unbounded"),
            Budget::Limited(budget) => info!("  ⚡ Dispatch budget: {:?}", budget),
        }
        if frame.max_frames != 0 {
            info!("  🏁 Frame limit: {}", frame.max_frames);
        }
        info!(
            "  📤 Publishers: {} x {} events/frame",
            simulation.publisher_threads, simulation.events_per_frame
        );
        info!("  🎧 Listener cost: {}us", simulation.listener_cost_us);
        if simulation.pause_every_frames != 0 {
            info!("  ⏸️ Pause toggle every {} frames", simulation.pause_every_frames);
        }
    }
}

/// Logs final statistics during shutdown.
fn log_final_statistics(events: &EventSystem<GameEvent>, frames: u64, published: u64) {
    let stats = events.stats();
    info!("📊 Final Statistics:");
    info!("  - Frames run: {}", frames);
    info!("  - Events published: {} ({} by publisher threads)", stats.events_published, published);
    info!("  - Events dispatched: {}", stats.events_dispatched);
    info!("  - Events flushed: {}", stats.events_flushed);
    info!("  - Listener invocations: {}", stats.listener_invocations);
    info!("  - Listener failures: {}", stats.listener_failures);
    info!(
        "  - Passes over budget: {} of {}",
        stats.budget_exhausted_passes, stats.dispatch_passes
    );
    info!("  - Left in queue: {}", events.queue_len());
}
