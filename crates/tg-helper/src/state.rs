//! Helper state management

use std::sync::Arc;

use tg_core::config::HelperConfig;
use tg_core::traits::Runtime;

use crate::engine::HelperEngine;

/// Shared state of the helper daemon
pub struct HelperState {
    /// Configuration
    pub config: HelperConfig,
    /// Session engine bound to the local runtime
    pub engine: HelperEngine,
}

impl HelperState {
    /// Create helper state around a runtime
    pub fn new(config: HelperConfig, runtime: Arc<dyn Runtime>) -> Self {
        let engine = HelperEngine::new(runtime, &config);
        Self { config, engine }
    }
}
