// Server loop module
// Accepts connections until shutdown is requested, then drains

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

use super::connection::accept_connection;
use crate::config::AppState;
use crate::logger;

/// How long shutdown waits for in-flight connections
pub const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);
const DRAIN_POLL: Duration = Duration::from_millis(50);

/// Accept loop; returns once the shutdown signal fires and connections drained
pub async fn start_server_loop(
    listener: TcpListener,
    state: Arc<AppState>,
) -> Result<(), Box<dyn std::error::Error>> {
    loop {
        tokio::select! {
            accept_result = listener.accept() => {
                match accept_result {
                    Ok((stream, peer_addr)) => accept_connection(stream, peer_addr, &state),
                    Err(e) => logger::log_error(&format!("Failed to accept connection: {e}")),
                }
            }

            () = state.shutdown.notified() => break,
        }
    }

    // Stop accepting before draining
    drop(listener);
    logger::log_shutdown(state.active_connections.load(Ordering::SeqCst));

    if !wait_for_drain(&state, DRAIN_TIMEOUT).await {
        logger::log_warning(&format!(
            "[Shutdown] {} connection(s) still open after {}s, closing anyway",
            state.active_connections.load(Ordering::SeqCst),
            DRAIN_TIMEOUT.as_secs()
        ));
    }

    match (state.notes.flush().await, state.notes.file()) {
        (Err(e), _) => logger::log_error(&format!("[Shutdown] Failed to flush notes: {e}")),
        (Ok(()), Some(path)) => {
            logger::log_info(&format!("[Shutdown] Notes saved to {}", path.display()));
        }
        (Ok(()), None) => {}
    }
    logger::log_info("[Shutdown] Server stopped");
    Ok(())
}

/// Poll the active counter until it reaches zero or `timeout` passes
async fn wait_for_drain(state: &AppState, timeout: Duration) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    while state.active_connections.load(Ordering::SeqCst) > 0 {
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(DRAIN_POLL).await;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::dispatch::tests::{test_config, test_state};

    #[tokio::test]
    async fn test_wait_for_drain() {
        let state = test_state(&test_config());
        assert!(wait_for_drain(&state, Duration::from_millis(10)).await);

        state.active_connections.fetch_add(1, Ordering::SeqCst);
        assert!(!wait_for_drain(&state, Duration::from_millis(120)).await);
    }
}
