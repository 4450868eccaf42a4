//! Poller errors
//!
//! Typed errors for poll-spec construction and for every way a poll session
//! can end without reaching a target status.

use crate::status::StatusClass;
use std::time::Duration;
use thiserror::Error;

/// Poll specification construction errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SpecError {
    /// No target statuses were given
    #[error("at least one target status is required")]
    EmptyTarget,

    /// A status was placed in two sets
    #[error("status '{status}' is listed as both {first} and {second}")]
    Overlap {
        status: String,
        first: StatusClass,
        second: StatusClass,
    },

    /// poll_interval is zero
    #[error("poll_interval must be greater than 0")]
    ZeroInterval,
}

/// Ways a poll session ends without success
#[derive(Debug, Error)]
pub enum PollError {
    /// The probe itself failed locally; passed through verbatim
    #[error(transparent)]
    Probe(anyhow::Error),

    /// The probe reported a failure status or one outside every configured set
    #[error(
        "unexpected state '{status}', wanted target '{expected}'{}",
        reason_suffix(.reason)
    )]
    UnexpectedState {
        status: String,
        class: StatusClass,
        expected: String,
        reason: Option<String>,
    },

    /// The timeout elapsed while the status was still pending
    #[error(
        "timeout while waiting for state to become '{expected}' (last state: '{}', waited: {elapsed:?})",
        .last_status.as_deref().unwrap_or("")
    )]
    Timeout {
        last_status: Option<String>,
        elapsed: Duration,
        expected: String,
    },

    /// The caller cancelled the wait
    #[error("wait cancelled after {elapsed:?} (last state: '{}')", .last_status.as_deref().unwrap_or(""))]
    Cancelled {
        last_status: Option<String>,
        elapsed: Duration,
    },

    /// Too many consecutive checks reported no status at all
    #[error("operation status not available after {checks} checks")]
    Absent { checks: u32 },
}

fn reason_suffix(reason: &Option<String>) -> String {
    match reason {
        Some(r) if !r.is_empty() => format!(". last error: {r}"),
        _ => String::new(),
    }
}

impl PollError {
    /// Check if the wait ran out of time
    pub fn is_timeout(&self) -> bool {
        matches!(self, PollError::Timeout { .. })
    }

    /// Check if the wait was cancelled
    pub fn is_cancelled(&self) -> bool {
        matches!(self, PollError::Cancelled { .. })
    }

    /// Check if the remote operation reached a non-target terminal status
    pub fn is_unexpected_state(&self) -> bool {
        matches!(self, PollError::UnexpectedState { .. })
    }

    /// The human-readable remote reason, if the probe attached one
    pub fn reason(&self) -> Option<&str> {
        match self {
            PollError::UnexpectedState { reason, .. } => reason.as_deref(),
            _ => None,
        }
    }

    /// The last status observed before the session ended, if known
    pub fn last_status(&self) -> Option<&str> {
        match self {
            PollError::UnexpectedState { status, .. } => Some(status),
            PollError::Timeout { last_status, .. } | PollError::Cancelled { last_status, .. } => {
                last_status.as_deref()
            }
            PollError::Probe(_) | PollError::Absent { .. } => None,
        }
    }
}
