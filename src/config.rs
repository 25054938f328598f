//! Tunable constants, collected so tests can shrink timeouts without
//! touching any production call site.
use std::time::Duration;

/// Fixed tunables for the engine's retry and convergence loops.
///
/// `Default` is set to the literal values documented throughout this
/// crate; production call sites should use [`EngineConfig::default`]
/// unless a caller has a specific reason to override one value (most
/// commonly: tests shrinking a timeout).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    /// [`crate::display_index::DisplayIndex`] background poll cadence.
    pub monitor_poll_interval: Duration,
    /// [`crate::store::DefinitionStore`] write-attempt count before giving up.
    pub store_write_retry_attempts: u32,
    /// Backoff between [`Self::store_write_retry_attempts`].
    pub store_write_retry_backoff: Duration,
    /// [`crate::store::DefinitionStore`] lock-acquisition attempt count.
    pub store_lock_retry_attempts: u32,
    /// Backoff between lock-acquisition attempts.
    pub store_lock_retry_interval: Duration,
    /// How long Phase 1 Pass 2 waits for a freshly launched window to appear.
    pub window_wait_timeout: Duration,
    /// Poll interval while waiting for a freshly launched window.
    pub window_wait_poll_interval: Duration,
    /// How long to poll for a post-launch window to "settle" before binding.
    pub settle_timeout: Duration,
    /// Poll interval during the settle wait.
    pub settle_poll_interval: Duration,
    /// Max wait for a process to report input-idle before placing it.
    pub input_idle_timeout: Duration,
    /// Max wait for a window to become visible after a show-normal call.
    pub visibility_timeout: Duration,
    /// Poll interval while waiting for visibility.
    pub visibility_poll_interval: Duration,
    /// Placement-verification retry count in the set-placement primitive.
    pub placement_verify_attempts: u32,
    /// Interval between placement-verification attempts.
    pub placement_verify_interval: Duration,
    /// Pixel tolerance for considering a placement converged.
    pub placement_tolerance_px: i32,
    /// Total budget for the arrange convergence loop.
    pub arrange_loop_timeout: Duration,
    /// Poll interval within the arrange convergence loop.
    pub arrange_loop_interval: Duration,
    /// Total budget for the post-settle convergence loop.
    pub post_settle_loop_timeout: Duration,
    /// Poll interval within the post-settle convergence loop.
    pub post_settle_loop_interval: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            monitor_poll_interval: Duration::from_secs(1),
            store_write_retry_attempts: 6,
            store_write_retry_backoff: Duration::from_millis(60),
            store_lock_retry_attempts: 100,
            store_lock_retry_interval: Duration::from_millis(50),
            window_wait_timeout: Duration::from_secs(10),
            window_wait_poll_interval: Duration::from_millis(200),
            settle_timeout: Duration::from_secs(2),
            settle_poll_interval: Duration::from_millis(150),
            input_idle_timeout: Duration::from_secs(5),
            visibility_timeout: Duration::from_secs(5),
            visibility_poll_interval: Duration::from_millis(50),
            placement_verify_attempts: 30,
            placement_verify_interval: Duration::from_millis(150),
            placement_tolerance_px: 8,
            arrange_loop_timeout: Duration::from_secs(6),
            arrange_loop_interval: Duration::from_millis(300),
            post_settle_loop_timeout: Duration::from_secs(5),
            post_settle_loop_interval: Duration::from_millis(400),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_documented_constants() {
        let config = EngineConfig::default();
        assert_eq!(config.placement_tolerance_px, 8);
        assert_eq!(config.store_write_retry_attempts, 6);
        assert_eq!(config.placement_verify_attempts, 30);
    }
}
