// Application state module
// Shared, read-mostly state handed to every connection

use std::path::PathBuf;

use super::types::Config;

/// Application state
pub struct AppState {
    pub config: Config,

    /// Site root as configured; canonicalized per request so a root that
    /// appears after startup is still picked up
    pub root: PathBuf,
}

impl AppState {
    pub fn new(config: &Config) -> Self {
        Self {
            config: config.clone(),
            root: PathBuf::from(&config.site.root),
        }
    }

    pub const fn access_log_enabled(&self) -> bool {
        self.config.logging.access_log
    }
}
