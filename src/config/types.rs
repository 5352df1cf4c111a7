// Configuration types module
// Defines all configuration-related data structures

use serde::{Deserialize, Serialize};

/// Main configuration structure
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub performance: PerformanceConfig,
    pub http: HttpConfig,
    pub static_files: StaticConfig,
    pub notes: NotesConfig,
    pub cookies: CookieConfig,
}

/// Server configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub workers: Option<usize>,
}

/// Logging configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub access_log: bool,
    /// Access log format (combined, common, json, or custom pattern)
    #[serde(default = "default_access_log_format")]
    pub access_log_format: String,
    /// Access log file path (optional, stdout if not set)
    #[serde(default)]
    pub access_log_file: Option<String>,
    /// Error log file path (optional, stderr if not set)
    #[serde(default)]
    pub error_log_file: Option<String>,
}

#[allow(clippy::missing_const_for_fn)]
fn default_access_log_format() -> String {
    "combined".to_string()
}

/// Performance configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct PerformanceConfig {
    pub keep_alive: bool,
    pub read_timeout: u64,
    pub write_timeout: u64,
    #[serde(default)]
    pub max_connections: Option<u64>,
}

impl PerformanceConfig {
    /// Whole-connection deadline in seconds
    pub fn connection_timeout(&self) -> u64 {
        std::cmp::max(self.read_timeout, self.write_timeout)
    }
}

/// HTTP configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct HttpConfig {
    pub server_name: String,
    pub enable_cors: bool,
    pub max_body_size: u64,
}

/// Static file serving configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct StaticConfig {
    pub enabled: bool,
    /// URL prefix mapped onto `root`, e.g. `/static`
    pub prefix: String,
    pub root: String,
    pub index_files: Vec<String>,
    /// `Cache-Control` max-age in seconds
    pub max_age: u32,
}

/// Where notes live
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StorageKind {
    Memory,
    File,
}

/// Notes API configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct NotesConfig {
    pub storage: StorageKind,
    /// Flat JSON file used when `storage = "file"`
    pub file: String,
}

/// Cookie and session configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CookieConfig {
    pub secure: bool,
    pub session_name: String,
    /// Session lifetime in seconds
    pub session_max_age: i64,
}
