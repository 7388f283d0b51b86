//! Signal handling for graceful shutdown of the frame loop.

use tokio::signal;
use tracing::info;

/// Waits for a termination signal and logs it.
///
/// Handles SIGINT and SIGTERM on Unix platforms and Ctrl+C on Windows.
pub async fn wait_for_shutdown() -> Result<(), Box<dyn std::error::Error>> {
    wait_for_shutdown_silent().await?;
    info!("📡 Received shutdown signal - initiating graceful shutdown");
    Ok(())
}

pub async fn wait_for_shutdown_silent() -> Result<(), Box<dyn std::error::Error>> {
    #[cfg(unix)]
    {
        use signal::unix::{signal, SignalKind};

        let mut sigint = signal(SignalKind::interrupt())?;
        let mut sigterm = signal(SignalKind::terminate())?;

        tokio::select! {
            _ = sigint.recv() => (),
            _ = sigterm.recv() => ()
        }
    }

    #[cfg(windows)]
    signal::ctrl_c().await?;

    Ok(())
}
