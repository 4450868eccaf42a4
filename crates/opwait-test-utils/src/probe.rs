//! Scripted status probes
//!
//! A [`ScriptedProbe`] replays a fixed list of observations (or errors), one
//! per call, and counts how many times it was invoked. Once the script runs
//! out, the last step repeats, which makes "always pending" a one-liner.

use opwait_common::Observation;
use std::collections::VecDeque;
use std::future::Future;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

/// One scripted probe response
#[derive(Debug, Clone)]
pub enum Step<T> {
    /// Report this observation
    Observe(Observation<T>),
    /// Fail locally with this message
    Fail(String),
}

impl<T> Step<T> {
    /// Report a bare status
    pub fn status(status: &str) -> Self {
        Step::Observe(Observation::status_only(status))
    }

    /// Report a failure status with a reason attached
    pub fn failed(status: &str, reason: &str) -> Self {
        Step::Observe(Observation::status_only(status).with_reason(reason))
    }

    /// Report no status at all
    pub fn absent() -> Self {
        Step::Observe(Observation::absent())
    }
}

/// A probe that replays a script and counts its calls.
///
/// # Example
///
/// ```
/// use opwait_test_utils::probe::ScriptedProbe;
///
/// let probe = ScriptedProbe::<()>::statuses(&["QUEUED", "RUNNING", "SUCCEEDED"]);
/// assert_eq!(probe.calls(), 0);
/// ```
#[derive(Debug)]
pub struct ScriptedProbe<T> {
    steps: Mutex<VecDeque<Step<T>>>,
    last: Mutex<Option<Step<T>>>,
    calls: AtomicU32,
    latency: Duration,
}

impl<T: Clone + Send + 'static> ScriptedProbe<T> {
    /// Replay the given steps
    pub fn new(steps: impl IntoIterator<Item = Step<T>>) -> Self {
        Self {
            steps: Mutex::new(steps.into_iter().collect()),
            last: Mutex::new(None),
            calls: AtomicU32::new(0),
            latency: Duration::ZERO,
        }
    }

    /// Replay bare statuses
    pub fn statuses(statuses: &[&str]) -> Self {
        Self::new(statuses.iter().map(|s| Step::status(s)))
    }

    /// Make every call take this long (in tokio time) before answering
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Number of times the probe has been invoked
    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    /// Run one scripted status check.
    ///
    /// The call is counted as soon as the probe is invoked, before the
    /// returned future is polled.
    pub fn check(&self) -> impl Future<Output = anyhow::Result<Observation<T>>> + Send + 'static {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let step = {
            let mut steps = self.steps.lock().unwrap();
            let mut last = self.last.lock().unwrap();
            match steps.pop_front() {
                Some(step) => {
                    *last = Some(step.clone());
                    Some(step)
                }
                None => last.clone(),
            }
        };
        let latency = self.latency;

        async move {
            if !latency.is_zero() {
                tokio::time::sleep(latency).await;
            }
            match step {
                Some(Step::Observe(observation)) => Ok(observation),
                Some(Step::Fail(message)) => Err(anyhow::anyhow!(message)),
                None => Err(anyhow::anyhow!("probe script is empty")),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn replays_then_repeats_last() {
        let probe = ScriptedProbe::<()>::statuses(&["QUEUED", "RUNNING"]);
        let first = probe.check().await.unwrap();
        let second = probe.check().await.unwrap();
        let third = probe.check().await.unwrap();

        assert_eq!(first.status(), Some("QUEUED"));
        assert_eq!(second.status(), Some("RUNNING"));
        assert_eq!(third.status(), Some("RUNNING"));
        assert_eq!(probe.calls(), 3);
    }

    #[tokio::test]
    async fn fail_step_is_an_error() {
        let probe = ScriptedProbe::<()>::new([Step::Fail("boom".to_string())]);
        let err = probe.check().await.unwrap_err();
        assert_eq!(err.to_string(), "boom");
    }

    #[tokio::test]
    async fn empty_script_errors() {
        let probe = ScriptedProbe::<()>::new([]);
        assert!(probe.check().await.is_err());
    }
}
