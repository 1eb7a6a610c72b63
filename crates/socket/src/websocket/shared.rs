//! Defaults shared by the controller and its configuration.
//!
//! Kept runtime-agnostic (no tokio) so the controller core stays portable.

use std::time::Duration;

/// Reconnect attempts allowed in one failure streak before giving up.
pub const DEFAULT_RECONNECT_LIMIT: u32 = 3;
/// Fixed delay before each reconnect attempt (no backoff growth).
pub const DEFAULT_RECONNECT_DELAY_MS: u64 = 2_000;
/// Seconds between heartbeat probes.
pub const DEFAULT_HEARTBEAT_PERIOD_SECS: u64 = 10;
/// Seconds to wait for a pong after a probe.
pub const DEFAULT_HEARTBEAT_GRACE_SECS: u64 = 3;

pub const fn default_reconnect_delay() -> Duration {
    Duration::from_millis(DEFAULT_RECONNECT_DELAY_MS)
}

pub const fn default_heartbeat_period() -> Duration {
    Duration::from_secs(DEFAULT_HEARTBEAT_PERIOD_SECS)
}

pub const fn default_heartbeat_grace() -> Duration {
    Duration::from_secs(DEFAULT_HEARTBEAT_GRACE_SECS)
}
