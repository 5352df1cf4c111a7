// Connection handling module
// Accepts a single TCP connection and serves it on a local task

use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;

use crate::config::AppState;
use crate::handler;
use crate::logger;

/// One counted connection; the counter is released on drop, even if the
/// serving task panics
#[derive(Debug)]
pub struct ConnectionSlot {
    counter: Arc<AtomicUsize>,
}

impl ConnectionSlot {
    /// Take a slot unless `max` connections are already active.
    ///
    /// The counter is incremented before the limit check so two concurrent
    /// accepts cannot both slip under the limit. On rejection the count
    /// seen at that moment is returned.
    pub fn acquire(counter: &Arc<AtomicUsize>, max: Option<u64>) -> Result<Self, usize> {
        let prev_count = counter.fetch_add(1, Ordering::SeqCst);
        let limit = max.map_or(usize::MAX, |m| usize::try_from(m).unwrap_or(usize::MAX));
        if prev_count >= limit {
            counter.fetch_sub(1, Ordering::SeqCst);
            return Err(prev_count);
        }
        Ok(Self {
            counter: Arc::clone(counter),
        })
    }
}

impl Drop for ConnectionSlot {
    fn drop(&mut self) {
        self.counter.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Accept a connection, enforcing `max_connections`
pub fn accept_connection(stream: TcpStream, peer_addr: SocketAddr, state: &Arc<AppState>) {
    let max_conn = state.config.performance.max_connections;
    let slot = match ConnectionSlot::acquire(&state.active_connections, max_conn) {
        Ok(slot) => slot,
        Err(active) => {
            logger::log_warning(&format!(
                "Max connections reached: {active}/{}. Connection from {peer_addr} rejected.",
                max_conn.unwrap_or_default()
            ));
            drop(stream);
            return;
        }
    };

    if state.access_log_enabled() {
        logger::log_connection_accepted(&peer_addr);
    }

    handle_connection(stream, peer_addr, slot, Arc::clone(state));
}

/// Serve one connection in a spawned local task.
///
/// 1. Wraps the TCP stream in `TokioIo`
/// 2. Configures HTTP/1.1 keep-alive
/// 3. Serves requests under the connection timeout
/// 4. Releases the connection slot when done
fn handle_connection(
    stream: TcpStream,
    peer_addr: SocketAddr,
    slot: ConnectionSlot,
    state: Arc<AppState>,
) {
    tokio::task::spawn_local(async move {
        let io = TokioIo::new(stream);
        let perf = &state.config.performance;
        let timeout_duration = Duration::from_secs(perf.connection_timeout());

        let mut builder = http1::Builder::new();
        builder.keep_alive(perf.keep_alive);

        let service_state = Arc::clone(&state);
        let conn = builder.serve_connection(
            io,
            service_fn(move |req| handler::handle_request(req, Arc::clone(&service_state), peer_addr)),
        );

        match tokio::time::timeout(timeout_duration, conn).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => logger::log_connection_error(&err),
            Err(_) => logger::log_warning(&format!(
                "Connection from {peer_addr} timed out after {} seconds",
                timeout_duration.as_secs()
            )),
        }

        drop(slot);
    });
}
