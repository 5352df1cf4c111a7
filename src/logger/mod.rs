//! Logger module
//!
//! Provides logging utilities for the HTTP server including:
//! - Level filtering (`debug`, `info`, `warn`, `error`)
//! - Server lifecycle logging
//! - Access logging with multiple formats
//! - File-based logging support

mod format;
pub mod writer;

pub use format::AccessLogEntry;

use crate::config::Config;
use chrono::Local;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU8, Ordering};

/// Severity, ordered from most to least verbose
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum Level {
    Debug = 0,
    Info = 1,
    Warn = 2,
    Error = 3,
}

impl Level {
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "debug" => Some(Self::Debug),
            "info" => Some(Self::Info),
            "warn" | "warning" => Some(Self::Warn),
            "error" => Some(Self::Error),
            _ => None,
        }
    }
}

static MIN_LEVEL: AtomicU8 = AtomicU8::new(Level::Info as u8);

fn enabled(level: Level) -> bool {
    level as u8 >= MIN_LEVEL.load(Ordering::Relaxed)
}

/// Initialize the logger with configuration
///
/// Should be called once at application startup.
pub fn init(config: &Config) -> std::io::Result<()> {
    if let Some(level) = Level::parse(&config.logging.level) {
        MIN_LEVEL.store(level as u8, Ordering::Relaxed);
    }
    writer::init(
        config.logging.access_log_file.as_deref(),
        config.logging.error_log_file.as_deref(),
    )
}

fn stamp(tag: &str, message: &str) -> String {
    format!("{} [{tag}] {message}", Local::now().format("%Y-%m-%d %H:%M:%S%.3f"))
}

/// Write to info/access log
fn write_info(message: &str) {
    match writer::get() {
        Some(w) => w.write_access(message),
        None => println!("{message}"),
    }
}

/// Write to error log
fn write_error(message: &str) {
    match writer::get() {
        Some(w) => w.write_error(message),
        None => eprintln!("{message}"),
    }
}

pub fn log_debug(message: &str) {
    if enabled(Level::Debug) {
        write_info(&stamp("DEBUG", message));
    }
}

pub fn log_info(message: &str) {
    if enabled(Level::Info) {
        write_info(&stamp("INFO", message));
    }
}

pub fn log_warning(message: &str) {
    if enabled(Level::Warn) {
        write_error(&stamp("WARN", message));
    }
}

pub fn log_error(message: &str) {
    write_error(&stamp("ERROR", message));
}

/// Log formatted access log entry (not subject to the level filter)
pub fn log_access(entry: &AccessLogEntry, format: &str) {
    write_info(&entry.format(format));
}

pub fn log_server_start(addr: &SocketAddr, config: &Config, routes: &[String]) {
    log_info("======================================");
    log_info(&format!("plainhttp listening on http://{addr}"));
    log_info(&format!("Log level: {}", config.logging.level));
    match config.server.workers {
        Some(workers) => log_info(&format!("Worker threads: {workers}")),
        None => log_info("Worker threads: one per CPU core"),
    }
    log_info(&format!("Routes registered: {}", routes.len()));
    for route in routes {
        log_debug(&format!("  {route}"));
    }
    if config.static_files.enabled {
        log_info(&format!(
            "Static files: {} -> {}",
            config.static_files.prefix, config.static_files.root
        ));
    }
    log_info(&format!("Notes storage: {:?}", config.notes.storage));
    log_info(&format!("Max body size: {} bytes", config.http.max_body_size));
    if let Some(ref path) = config.logging.access_log_file {
        log_info(&format!("Access log: {path}"));
    }
    if let Some(ref path) = config.logging.error_log_file {
        log_info(&format!("Error log: {path}"));
    }
    log_info("======================================");
}

pub fn log_connection_accepted(peer_addr: &SocketAddr) {
    log_debug(&format!("[Connection] Accepted from: {peer_addr}"));
}

pub fn log_connection_error(err: &impl std::fmt::Display) {
    log_warning(&format!("[Connection] Failed to serve connection: {err}"));
}

pub fn log_shutdown(active: usize) {
    log_info(&format!(
        "[Shutdown] Stopped accepting; {active} connection(s) still active"
    ));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_parse_and_order() {
        assert_eq!(Level::parse("DEBUG"), Some(Level::Debug));
        assert_eq!(Level::parse("warning"), Some(Level::Warn));
        assert_eq!(Level::parse("loud"), None);
        assert!(Level::Error > Level::Info);
    }
}
