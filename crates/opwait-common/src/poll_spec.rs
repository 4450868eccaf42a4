//! Poll specification
//!
//! A [`PollSpec`] names which statuses mean "still running", which mean
//! "done", and which are known failures, plus the timing of the session.
//! The three status sets are pairwise disjoint; the builder rejects overlaps.

use crate::defaults::{
    DEFAULT_INITIAL_DELAY_SECS, DEFAULT_MAX_DELAY_SECS, DEFAULT_POLL_INTERVAL_SECS,
    DEFAULT_TIMEOUT_SECS,
};
use crate::error::SpecError;
use crate::status::StatusClass;
use backon::{BackoffBuilder, ConstantBuilder, ExponentialBuilder};
use std::collections::BTreeSet;
use std::time::Duration;

/// Spacing between status checks after the first one
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Cadence {
    /// Check every `poll_interval`
    Fixed,
    /// Start at `poll_interval` and double up to `max_delay`
    Exponential { max_delay: Duration, jitter: bool },
}

impl Default for Cadence {
    fn default() -> Self {
        Cadence::Exponential {
            max_delay: Duration::from_secs(DEFAULT_MAX_DELAY_SECS),
            jitter: false,
        }
    }
}

/// Configuration for one poll session.
#[derive(Debug, Clone)]
pub struct PollSpec {
    pending: BTreeSet<String>,
    target: BTreeSet<String>,
    failure: BTreeSet<String>,
    timeout: Duration,
    initial_delay: Duration,
    poll_interval: Duration,
    cadence: Cadence,
    max_absent_checks: Option<u32>,
}

impl PollSpec {
    /// Start building a spec with default timing and no statuses
    pub fn builder() -> PollSpecBuilder {
        PollSpecBuilder::default()
    }

    /// Classify an observed status.
    ///
    /// A missing or empty status is `Pending`: right after submission the
    /// remote side may not have a status record yet.
    pub fn classify(&self, status: Option<&str>) -> StatusClass {
        let Some(status) = status.filter(|s| !s.is_empty()) else {
            return StatusClass::Pending;
        };

        if self.target.contains(status) {
            StatusClass::Target
        } else if self.pending.contains(status) {
            StatusClass::Pending
        } else if self.failure.contains(status) {
            StatusClass::Failed
        } else {
            StatusClass::Unknown
        }
    }

    pub fn pending(&self) -> impl Iterator<Item = &str> {
        self.pending.iter().map(String::as_str)
    }

    pub fn target(&self) -> impl Iterator<Item = &str> {
        self.target.iter().map(String::as_str)
    }

    pub fn failure(&self) -> impl Iterator<Item = &str> {
        self.failure.iter().map(String::as_str)
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn initial_delay(&self) -> Duration {
        self.initial_delay
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    pub fn cadence(&self) -> Cadence {
        self.cadence
    }

    pub fn max_absent_checks(&self) -> Option<u32> {
        self.max_absent_checks
    }

    /// Target statuses joined for error messages
    pub(crate) fn expected(&self) -> String {
        self.target.iter().cloned().collect::<Vec<_>>().join(", ")
    }

    /// Endless sequence of delays between checks
    pub(crate) fn delays(&self) -> Box<dyn Iterator<Item = Duration> + Send> {
        match self.cadence {
            Cadence::Fixed => Box::new(
                ConstantBuilder::default()
                    .with_delay(self.poll_interval)
                    .without_max_times()
                    .build(),
            ),
            Cadence::Exponential { max_delay, jitter } => {
                let mut builder = ExponentialBuilder::default()
                    .with_min_delay(self.poll_interval)
                    .with_max_delay(max_delay.max(self.poll_interval))
                    .with_factor(2.0)
                    .without_max_times();
                if jitter {
                    builder = builder.with_jitter();
                }
                Box::new(builder.build())
            }
        }
    }
}

/// Builder for [`PollSpec`]
#[derive(Debug, Clone)]
pub struct PollSpecBuilder {
    pending: BTreeSet<String>,
    target: BTreeSet<String>,
    failure: BTreeSet<String>,
    timeout: Duration,
    initial_delay: Duration,
    poll_interval: Duration,
    cadence: Cadence,
    max_absent_checks: Option<u32>,
}

impl Default for PollSpecBuilder {
    fn default() -> Self {
        Self {
            pending: BTreeSet::new(),
            target: BTreeSet::new(),
            failure: BTreeSet::new(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            initial_delay: Duration::from_secs(DEFAULT_INITIAL_DELAY_SECS),
            poll_interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
            cadence: Cadence::default(),
            max_absent_checks: None,
        }
    }
}

impl PollSpecBuilder {
    pub fn pending<I, S>(mut self, statuses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.pending.extend(statuses.into_iter().map(Into::into));
        self
    }

    pub fn target<I, S>(mut self, statuses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.target.extend(statuses.into_iter().map(Into::into));
        self
    }

    pub fn failure<I, S>(mut self, statuses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.failure.extend(statuses.into_iter().map(Into::into));
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn cadence(mut self, cadence: Cadence) -> Self {
        self.cadence = cadence;
        self
    }

    /// Give up after this many consecutive checks with no status
    pub fn max_absent_checks(mut self, checks: u32) -> Self {
        self.max_absent_checks = Some(checks);
        self
    }

    /// Validate and build the [`PollSpec`]
    pub fn build(self) -> Result<PollSpec, SpecError> {
        if self.target.is_empty() {
            return Err(SpecError::EmptyTarget);
        }
        if self.poll_interval.is_zero() {
            return Err(SpecError::ZeroInterval);
        }

        let sets = [
            (StatusClass::Pending, &self.pending),
            (StatusClass::Target, &self.target),
            (StatusClass::Failed, &self.failure),
        ];
        for (i, (first, a)) in sets.iter().enumerate() {
            for (second, b) in &sets[i + 1..] {
                if let Some(status) = a.intersection(b).next() {
                    return Err(SpecError::Overlap {
                        status: status.clone(),
                        first: *first,
                        second: *second,
                    });
                }
            }
        }

        Ok(PollSpec {
            pending: self.pending,
            target: self.target,
            failure: self.failure,
            timeout: self.timeout,
            initial_delay: self.initial_delay,
            poll_interval: self.poll_interval,
            cadence: self.cadence,
            max_absent_checks: self.max_absent_checks,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query_spec() -> PollSpec {
        PollSpec::builder()
            .pending(["QUEUED", "RUNNING"])
            .target(["SUCCEEDED"])
            .failure(["FAILED", "CANCELLED"])
            .build()
            .unwrap()
    }

    #[test]
    fn classify_each_set() {
        let spec = query_spec();
        assert_eq!(spec.classify(Some("QUEUED")), StatusClass::Pending);
        assert_eq!(spec.classify(Some("RUNNING")), StatusClass::Pending);
        assert_eq!(spec.classify(Some("SUCCEEDED")), StatusClass::Target);
        assert_eq!(spec.classify(Some("FAILED")), StatusClass::Failed);
        assert_eq!(spec.classify(Some("CANCELLED")), StatusClass::Failed);
        assert_eq!(spec.classify(Some("succeeded")), StatusClass::Unknown);
        assert_eq!(spec.classify(Some("PAUSED")), StatusClass::Unknown);
    }

    #[test]
    fn absent_status_is_pending() {
        let spec = query_spec();
        assert_eq!(spec.classify(None), StatusClass::Pending);
        assert_eq!(spec.classify(Some("")), StatusClass::Pending);
    }

    #[test]
    fn overlap_is_rejected() {
        let err = PollSpec::builder()
            .pending(["RUNNING", "DONE"])
            .target(["DONE"])
            .build()
            .unwrap_err();
        assert_eq!(
            err,
            SpecError::Overlap {
                status: "DONE".to_string(),
                first: StatusClass::Pending,
                second: StatusClass::Target,
            }
        );

        let err = PollSpec::builder()
            .target(["DONE"])
            .failure(["DONE"])
            .build()
            .unwrap_err();
        assert!(matches!(err, SpecError::Overlap { second: StatusClass::Failed, .. }));
    }

    #[test]
    fn target_required() {
        let err = PollSpec::builder().pending(["RUNNING"]).build().unwrap_err();
        assert_eq!(err, SpecError::EmptyTarget);
    }

    #[test]
    fn zero_interval_rejected() {
        let err = PollSpec::builder()
            .target(["DONE"])
            .poll_interval(Duration::ZERO)
            .build()
            .unwrap_err();
        assert_eq!(err, SpecError::ZeroInterval);
    }

    #[test]
    fn fixed_cadence_repeats_interval() {
        let spec = PollSpec::builder()
            .target(["DONE"])
            .poll_interval(Duration::from_millis(250))
            .cadence(Cadence::Fixed)
            .build()
            .unwrap();
        let delays: Vec<_> = spec.delays().take(5).collect();
        assert_eq!(delays, vec![Duration::from_millis(250); 5]);
    }

    #[test]
    fn exponential_cadence_is_capped() {
        let spec = PollSpec::builder()
            .target(["DONE"])
            .poll_interval(Duration::from_secs(1))
            .cadence(Cadence::Exponential {
                max_delay: Duration::from_secs(5),
                jitter: false,
            })
            .build()
            .unwrap();
        let delays: Vec<_> = spec.delays().take(6).collect();
        assert_eq!(delays[0], Duration::from_secs(1));
        assert_eq!(delays[1], Duration::from_secs(2));
        assert_eq!(delays[2], Duration::from_secs(4));
        assert!(delays[3..].iter().all(|d| *d == Duration::from_secs(5)));
    }

    #[test]
    fn jittered_cadence_stays_in_bounds() {
        let interval = Duration::from_secs(1);
        let max_delay = Duration::from_secs(5);
        let spec = PollSpec::builder()
            .target(["DONE"])
            .poll_interval(interval)
            .cadence(Cadence::Exponential {
                max_delay,
                jitter: true,
            })
            .build()
            .unwrap();

        // backon adds up to one extra delay's worth of jitter on top of the capped value
        let delays: Vec<_> = spec.delays().take(50).collect();
        assert_eq!(delays.len(), 50);
        assert!(delays[0] >= interval && delays[0] < interval * 2);
        for d in &delays {
            assert!(*d >= interval, "delay {d:?} below interval");
            assert!(*d < max_delay * 2, "delay {d:?} above jitter bound");
        }
        assert!(delays[10..].iter().all(|d| *d >= max_delay));
    }

    #[test]
    fn expected_lists_targets() {
        let spec = PollSpec::builder().target(["B", "A"]).build().unwrap();
        assert_eq!(spec.expected(), "A, B");
    }
}
