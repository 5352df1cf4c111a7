// Signal handling module
//
// - SIGTERM: graceful shutdown
// - SIGINT:  graceful shutdown (Ctrl+C)

use std::sync::Arc;
use tokio::sync::Notify;

use crate::logger;

/// Listen for termination signals and fire `shutdown` once
#[cfg(unix)]
pub fn start_signal_handler(shutdown: Arc<Notify>) -> std::io::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    tokio::spawn(async move {
        let name = tokio::select! {
            _ = sigterm.recv() => "SIGTERM",
            _ = sigint.recv() => "SIGINT",
        };
        logger::log_info(&format!("[Signal] {name} received, shutting down gracefully"));
        // A stored permit survives until the accept loop polls again
        shutdown.notify_one();
    });

    logger::log_debug(&format!(
        "[Signal] Handlers registered for SIGTERM and SIGINT (pid {})",
        std::process::id()
    ));
    Ok(())
}

/// Non-unix fallback: only Ctrl+C
#[cfg(not(unix))]
pub fn start_signal_handler(shutdown: Arc<Notify>) -> std::io::Result<()> {
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                logger::log_info("[Signal] Ctrl+C received, shutting down gracefully");
                shutdown.notify_one();
            }
            Err(e) => logger::log_error(&format!("[Signal] Failed to listen for Ctrl+C: {e}")),
        }
    });
    Ok(())
}
