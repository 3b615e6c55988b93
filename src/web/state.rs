use std::sync::Arc;

use crate::config::AppConfig;

/// Shared, read-only state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }
}
