//! Probe observations and wait results

use std::time::Duration;

/// The outcome of a single status check.
///
/// `value` is carried through the poller untouched so the caller can inspect
/// the full fetched object on success. `status` is the discriminator the
/// poller classifies; `None` (or an empty string) means the remote side has
/// not materialized a status yet. `reason` is any human-readable explanation
/// the remote side attached, surfaced in the error if the status is a failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Observation<T> {
    pub value: Option<T>,
    pub status: Option<String>,
    pub reason: Option<String>,
}

impl<T> Observation<T> {
    /// An observation carrying a fetched value and its status
    pub fn new(value: T, status: impl Into<String>) -> Self {
        Self {
            value: Some(value),
            status: Some(status.into()),
            reason: None,
        }
    }

    /// An observation with a status but nothing worth carrying
    pub fn status_only(status: impl Into<String>) -> Self {
        Self {
            value: None,
            status: Some(status.into()),
            reason: None,
        }
    }

    /// No status record exists yet
    pub fn absent() -> Self {
        Self {
            value: None,
            status: None,
            reason: None,
        }
    }

    /// Attach a human-readable reason
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// The status, treating an empty string the same as a missing one
    pub fn status(&self) -> Option<&str> {
        self.status.as_deref().filter(|s| !s.is_empty())
    }
}

/// A poll session that reached a target status
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion<T> {
    /// Value from the final observation (may be `None`; content is never interpreted)
    pub value: Option<T>,
    /// The target status that ended the session
    pub status: String,
    /// Number of probe calls made, including the final one
    pub attempts: u32,
    /// Wall-clock time since the session started, including the initial delay
    pub elapsed: Duration,
}

impl<T> Completion<T> {
    /// Consume the completion, keeping only the fetched value
    pub fn into_value(self) -> Option<T> {
        self.value
    }
}
