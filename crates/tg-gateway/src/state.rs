//! Gateway state management

use std::sync::Arc;

use tg_core::config::GatewayConfig;
use tg_core::traits::Directory;

use crate::bridge::SessionBridge;
use crate::dialer::HelperDialer;
use crate::resolver::EndpointResolver;

/// Shared state of the gateway daemon
pub struct GatewayState {
    /// Configuration
    pub config: GatewayConfig,
    /// Session bridge (resolver plus helper dialer)
    pub bridge: SessionBridge,
}

impl GatewayState {
    /// Create gateway state from its collaborators
    pub fn new(
        config: GatewayConfig,
        directory: Arc<dyn Directory>,
        dialer: Arc<dyn HelperDialer>,
    ) -> Self {
        let resolver = EndpointResolver::new(directory, &config);
        Self {
            bridge: SessionBridge::new(resolver, dialer),
            config,
        }
    }
}
