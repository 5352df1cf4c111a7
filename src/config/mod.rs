// Configuration module entry point
// Loads layered configuration and holds shared runtime state

mod state;
mod types;

use std::net::SocketAddr;

pub use state::AppState;
pub use types::{
    Config, CookieConfig, HttpConfig, LoggingConfig, NotesConfig, PerformanceConfig,
    ServerConfig, StaticConfig, StorageKind,
};

/// Values given on the command line; they win over file and environment
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub static_root: Option<String>,
    pub notes_file: Option<String>,
}

const LOG_LEVELS: [&str; 4] = ["debug", "info", "warn", "error"];
/// Ten years
const SESSION_MAX_AGE_LIMIT: i64 = 315_360_000;

impl Config {
    /// Load configuration from specified file path (without extension)
    /// Default config file is "config.toml" when no path specified
    pub fn load_from(config_path: &str, overrides: &Overrides) -> Result<Self, config::ConfigError> {
        let server_name = format!("plainhttp/{}", env!("CARGO_PKG_VERSION"));

        let settings = config::Config::builder()
            .add_source(config::File::with_name(config_path).required(false))
            .add_source(
                config::Environment::with_prefix("PLAINHTTP")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8080)?
            .set_default("logging.level", "info")?
            .set_default("logging.access_log", true)?
            .set_default("performance.keep_alive", true)?
            .set_default("performance.read_timeout", 30)?
            .set_default("performance.write_timeout", 30)?
            .set_default("http.server_name", server_name)?
            .set_default("http.enable_cors", false)?
            .set_default("http.max_body_size", 1_048_576)? // 1MB
            .set_default("static_files.enabled", true)?
            .set_default("static_files.prefix", "/static")?
            .set_default("static_files.root", "public")?
            .set_default("static_files.index_files", vec!["index.html", "index.htm"])?
            .set_default("static_files.max_age", 3600)?
            .set_default("notes.storage", "memory")?
            .set_default("notes.file", "notes.json")?
            .set_default("cookies.secure", false)?
            .set_default("cookies.session_name", "sid")?
            .set_default("cookies.session_max_age", 86_400)?
            .set_override_option("server.host", overrides.host.clone())?
            .set_override_option("server.port", overrides.port.map(i64::from))?
            .set_override_option("static_files.root", overrides.static_root.clone())?
            .set_override_option("notes.file", overrides.notes_file.clone())?
            .set_override_option(
                "notes.storage",
                overrides.notes_file.as_ref().map(|_| "file"),
            )?
            .build()?;

        let cfg: Self = settings.try_deserialize()?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Reject settings that would only fail later at request time
    pub fn validate(&self) -> Result<(), config::ConfigError> {
        let fail = |msg: String| Err(config::ConfigError::Message(msg));

        if self.server.port == 0 {
            return fail("server.port must be non-zero".to_string());
        }
        if self.server.workers == Some(0) {
            return fail("server.workers must be at least 1".to_string());
        }
        if !LOG_LEVELS.contains(&self.logging.level.as_str()) {
            return fail(format!(
                "logging.level '{}' is not one of {}",
                self.logging.level,
                LOG_LEVELS.join(", ")
            ));
        }
        if !self.static_files.prefix.starts_with('/') {
            return fail(format!(
                "static_files.prefix '{}' must start with '/'",
                self.static_files.prefix
            ));
        }
        if self.static_files.index_files.is_empty() {
            return fail("static_files.index_files must not be empty".to_string());
        }
        if self.notes.storage == StorageKind::File && self.notes.file.trim().is_empty() {
            return fail("notes.file is required when notes.storage = \"file\"".to_string());
        }
        if self.cookies.session_name.is_empty()
            || !crate::http::cookie::is_valid_name(&self.cookies.session_name)
        {
            return fail(format!(
                "cookies.session_name '{}' is not a valid cookie name",
                self.cookies.session_name
            ));
        }
        if !(1..=SESSION_MAX_AGE_LIMIT).contains(&self.cookies.session_max_age) {
            return fail(format!(
                "cookies.session_max_age must be between 1 and {SESSION_MAX_AGE_LIMIT} seconds"
            ));
        }
        Ok(())
    }

    pub fn get_socket_addr(&self) -> Result<SocketAddr, String> {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .map_err(|e| format!("Invalid address: {e}"))
    }
}
