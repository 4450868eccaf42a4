//! Default polling values
//!
//! These match the cadence used for Athena query executions, which is the
//! slowest-moving operation this workspace waits on.

/// Default total wait before giving up, in seconds (10 minutes)
pub const DEFAULT_TIMEOUT_SECS: u64 = 600;

/// Default delay before the first status check, in seconds
pub const DEFAULT_INITIAL_DELAY_SECS: u64 = 3;

/// Default spacing between status checks, in seconds
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 3;

/// Default cap for exponential growth of the check spacing, in seconds
pub const DEFAULT_MAX_DELAY_SECS: u64 = 10;

// Serde default functions for struct field defaults

/// Returns the default timeout
pub fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

/// Returns the default initial delay
pub fn default_initial_delay_secs() -> u64 {
    DEFAULT_INITIAL_DELAY_SECS
}

/// Returns the default poll interval
pub fn default_poll_interval_secs() -> u64 {
    DEFAULT_POLL_INTERVAL_SECS
}

/// Returns the default max delay
pub fn default_max_delay_secs() -> u64 {
    DEFAULT_MAX_DELAY_SECS
}
