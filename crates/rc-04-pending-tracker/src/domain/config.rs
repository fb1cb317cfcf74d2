//! Tracker settings.

use shared_bus::PRIVATE_CHANNEL_PREFIX;
use shared_types::{SessionId, DEFAULT_RECONCILE_METHOD, DEFAULT_RECONCILE_SERVICE};

/// Where the tracker listens and which call it uses to reconcile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackerConfig {
    /// Prefix of the session-scoped private channel.
    pub channel_prefix: String,
    pub reconcile_service: String,
    pub reconcile_method: String,
    /// Poll for outstanding results every time a subscription is established.
    pub reconcile_on_connect: bool,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            channel_prefix: PRIVATE_CHANNEL_PREFIX.to_string(),
            reconcile_service: DEFAULT_RECONCILE_SERVICE.to_string(),
            reconcile_method: DEFAULT_RECONCILE_METHOD.to_string(),
            reconcile_on_connect: false,
        }
    }
}

impl TrackerConfig {
    pub fn with_channel_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.channel_prefix = prefix.into();
        self
    }

    pub fn with_reconcile_call(
        mut self,
        service: impl Into<String>,
        method: impl Into<String>,
    ) -> Self {
        self.reconcile_service = service.into();
        self.reconcile_method = method.into();
        self
    }

    pub fn with_reconcile_on_connect(mut self, enabled: bool) -> Self {
        self.reconcile_on_connect = enabled;
        self
    }

    /// Private channel of `session`.
    pub fn channel_for(&self, session: &SessionId) -> String {
        session.private_channel(&self.channel_prefix)
    }
}
