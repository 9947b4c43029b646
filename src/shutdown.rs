use anyhow::Result;
use tracing::info;

/// Resolve once the process is asked to stop (Ctrl-C, or SIGTERM on Unix)
pub async fn wait_for_shutdown_signal() -> Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut terminate = signal(SignalKind::terminate())?;
        tokio::select! {
            result = tokio::signal::ctrl_c() => result?,
            _ = terminate.recv() => {}
        }
    }

    #[cfg(not(unix))]
    tokio::signal::ctrl_c().await?;

    info!("Shutdown signal received");
    Ok(())
}
