//! Config snapshot assembler.

use crate::config::schema::{RelayConfig, DEFAULT_ADMIN_NAME, DEFAULT_AUTH_NAME};
use crate::relay::Relay;

impl Relay {
    /// The configuration the relay is currently running, assembled from the
    /// live objects. Listeners and clusters appear in listing order.
    ///
    /// Read-only; each manager is read under its own read lock.
    pub fn snapshot(&self) -> RelayConfig {
        tracing::trace!("Assembling config snapshot");
        RelayConfig {
            api_version: self.version.load().as_ref().clone(),
            admin: self.admin.get(DEFAULT_ADMIN_NAME).unwrap_or_default(),
            auth: self.auth.get(DEFAULT_AUTH_NAME).unwrap_or_default(),
            listeners: self.listeners.configs(),
            clusters: self.clusters.configs(),
        }
    }
}
