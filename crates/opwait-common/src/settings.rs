//! Serializable wait settings
//!
//! Seconds-based timing that can live in a JSON config file and be
//! overridden from the command line, then applied to a [`PollSpecBuilder`].

use crate::defaults::{
    default_initial_delay_secs, default_max_delay_secs, default_poll_interval_secs,
    default_timeout_secs,
};
use crate::poll_spec::{Cadence, PollSpecBuilder};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Timing for a poll session, in whole seconds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, garde::Validate)]
#[serde(deny_unknown_fields)]
pub struct WaitSettings {
    /// Total wait before giving up (default: 600)
    #[serde(default = "default_timeout_secs")]
    #[garde(range(min = 1))]
    pub timeout_secs: u64,

    /// Delay before the first check (default: 3)
    #[serde(default = "default_initial_delay_secs")]
    #[garde(skip)]
    pub initial_delay_secs: u64,

    /// Spacing between checks (default: 3)
    #[serde(default = "default_poll_interval_secs")]
    #[garde(range(min = 1))]
    pub poll_interval_secs: u64,

    /// Cap for exponential growth; equal to poll_interval_secs means fixed spacing (default: 10)
    #[serde(default = "default_max_delay_secs")]
    #[garde(custom(at_least_interval(self.poll_interval_secs)))]
    pub max_delay_secs: u64,

    /// Randomize check spacing (default: false)
    #[serde(default)]
    #[garde(skip)]
    pub jitter: bool,

    /// Give up after this many consecutive checks with no status (default: unlimited)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[garde(skip)]
    pub max_absent_checks: Option<u32>,
}

fn at_least_interval(interval: u64) -> impl FnOnce(&u64, &()) -> garde::Result {
    move |max_delay, _| {
        if *max_delay < interval {
            return Err(garde::Error::new(format!(
                "must be at least poll_interval_secs ({interval})"
            )));
        }
        Ok(())
    }
}

impl Default for WaitSettings {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            initial_delay_secs: default_initial_delay_secs(),
            poll_interval_secs: default_poll_interval_secs(),
            max_delay_secs: default_max_delay_secs(),
            jitter: false,
            max_absent_checks: None,
        }
    }
}

impl WaitSettings {
    /// The cadence these settings describe
    pub fn cadence(&self) -> Cadence {
        if self.max_delay_secs <= self.poll_interval_secs && !self.jitter {
            Cadence::Fixed
        } else {
            Cadence::Exponential {
                max_delay: Duration::from_secs(self.max_delay_secs),
                jitter: self.jitter,
            }
        }
    }

    /// Apply the timing to a builder, leaving its status sets alone
    pub fn apply(&self, builder: PollSpecBuilder) -> PollSpecBuilder {
        let builder = builder
            .timeout(Duration::from_secs(self.timeout_secs))
            .initial_delay(Duration::from_secs(self.initial_delay_secs))
            .poll_interval(Duration::from_secs(self.poll_interval_secs))
            .cadence(self.cadence());
        match self.max_absent_checks {
            Some(checks) => builder.max_absent_checks(checks),
            None => builder,
        }
    }
}
