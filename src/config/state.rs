// Application state module
// Everything a request handler needs, built once at startup and read-only
// afterwards

use super::types::Config;
use crate::page::PageStore;
use crate::render::Templates;

/// Application state shared by all connections
pub struct AppState {
    pub config: Config,
    pub store: PageStore,
    pub templates: Templates,
}

impl AppState {
    pub const fn new(config: Config, store: PageStore, templates: Templates) -> Self {
        Self {
            config,
            store,
            templates,
        }
    }

    pub const fn access_log_enabled(&self) -> bool {
        self.config.logging.access_log
    }
}
