// Configuration module entry point
// Loads layered configuration and exposes the shared runtime state

mod state;
mod types;

use std::net::SocketAddr;

// Re-export public types
pub use state::AppState;
pub use types::{Config, HttpConfig, LoggingConfig, PerformanceConfig, ServerConfig, SiteConfig};

/// Default config file name (without extension), looked up in the working directory
pub const DEFAULT_CONFIG_NAME: &str = "coi-server";

impl Config {
    /// Load configuration from the default file name
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::load_from(DEFAULT_CONFIG_NAME)
    }

    /// Load configuration from specified file path (extension optional)
    /// A missing file is fine: the defaults alone describe the demo setup
    pub fn load_from(config_path: &str) -> Result<Self, config::ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(config_path).required(false))
            .add_source(
                config::Environment::with_prefix("COI")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8000)?
            .set_default("server.entry_page", "demo/streaming.html")?
            .set_default("site.root", "..")?
            .set_default("site.index_files", vec!["index.html", "index.htm"])?
            .set_default("site.directory_listing", true)?
            .set_default("logging.level", "info")?
            .set_default("logging.access_log", true)?
            .set_default("logging.show_headers", false)?
            .set_default("performance.keep_alive_timeout", 75)?
            .set_default("http.server_name", "coi-server/0.1")?
            .build()?;

        settings.try_deserialize()
    }

    pub fn get_socket_addr(&self) -> Result<SocketAddr, String> {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .map_err(|e| format!("Invalid address: {e}"))
    }

    /// URL printed on startup so the demo page can be opened directly
    pub fn entry_url(&self) -> String {
        format!(
            "http://localhost:{}/{}",
            self.server.port,
            self.server.entry_page.trim_start_matches('/')
        )
    }
}
