//! Waiting for an asynchronous operation to reach a terminal status.
//!
//! Provides a generic loop that repeatedly runs a caller-supplied status probe,
//! classifies each observed status against a [`PollSpec`], and stops on a
//! target status, a failure status, a probe error, the timeout, or cancellation.

use crate::error::PollError;
use crate::observation::{Completion, Observation};
use crate::poll_spec::PollSpec;
use crate::status::StatusClass;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Why a sleep ended early
enum Interrupted {
    Cancelled,
}

/// Resolves when the token is cancelled, never if there is no token
async fn cancelled(cancel: Option<&CancellationToken>) {
    match cancel {
        Some(token) => token.cancelled().await,
        None => std::future::pending::<()>().await,
    }
}

/// Sleep for `delay`, but no later than `deadline`, unless cancelled first
async fn pause(
    delay: Duration,
    deadline: Instant,
    cancel: Option<&CancellationToken>,
) -> Result<(), Interrupted> {
    let wake = (Instant::now() + delay).min(deadline);
    tokio::select! {
        biased;
        _ = cancelled(cancel) => Err(Interrupted::Cancelled),
        _ = tokio::time::sleep_until(wake) => Ok(()),
    }
}

/// Wait for an operation to reach one of the [`PollSpec`]'s target statuses.
///
/// Sleeps `initial_delay`, then calls `probe` until it reports a status the
/// spec classifies as terminal. Checks are strictly sequential. Sleeps are
/// clamped to the timeout, so the last check starts at the deadline and its
/// status is still classified; only a pending or absent status there is a
/// timeout.
/// Sleeps and in-flight probes are raced against `cancel`.
///
/// # Arguments
/// * `spec` - Status sets and timing for this session
/// * `cancel` - Optional cancellation token
/// * `probe` - Async function performing one remote status check
///
/// # Returns
/// * `Ok(Completion)` - A target status was observed; carries that observation's value
/// * `Err(PollError::Probe)` - The probe failed; it is not retried
/// * `Err(PollError::UnexpectedState)` - A failure or unrecognized status was observed
/// * `Err(PollError::Timeout)` - Still pending when the timeout elapsed
/// * `Err(PollError::Cancelled)` - The token was cancelled
/// * `Err(PollError::Absent)` - No status for more than `max_absent_checks` checks
///
/// # Example
/// ```ignore
/// let spec = PollSpec::builder()
///     .pending(["QUEUED", "RUNNING"])
///     .target(["SUCCEEDED"])
///     .build()?;
///
/// let done = wait_for_terminal(&spec, Some(&cancel_token), || async {
///     let status = fetch_status(&id).await?;
///     Ok(Observation::new(status.clone(), status.state))
/// })
/// .await?;
/// ```
pub async fn wait_for_terminal<T, F, Fut>(
    spec: &PollSpec,
    cancel: Option<&CancellationToken>,
    mut probe: F,
) -> Result<Completion<T>, PollError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = anyhow::Result<Observation<T>>>,
{
    let start = Instant::now();
    let deadline = start + spec.timeout();
    let mut delays = spec.delays();
    let mut attempts = 0u32;
    let mut absent_checks = 0u32;
    let mut last_status: Option<String> = None;

    let timed_out = |last_status: Option<String>| PollError::Timeout {
        last_status,
        elapsed: start.elapsed(),
        expected: spec.expected(),
    };
    let was_cancelled = |last_status: Option<String>| PollError::Cancelled {
        last_status,
        elapsed: start.elapsed(),
    };

    if pause(spec.initial_delay(), deadline, cancel).await.is_err() {
        return Err(was_cancelled(last_status));
    }

    loop {
        // Never start a probe once cancellation has been requested
        if cancel.is_some_and(CancellationToken::is_cancelled) {
            return Err(was_cancelled(last_status));
        }

        attempts += 1;
        let observation = tokio::select! {
            biased;
            _ = cancelled(cancel) => return Err(was_cancelled(last_status)),
            result = probe() => result.map_err(PollError::Probe)?,
        };

        let status = observation.status().map(str::to_string);
        let class = spec.classify(status.as_deref());
        debug!(
            attempt = attempts,
            status = status.as_deref().unwrap_or("<none>"),
            class = %class,
            "Observed operation status"
        );

        match (class, status) {
            (StatusClass::Target, Some(status)) => {
                return Ok(Completion {
                    value: observation.value,
                    status,
                    attempts,
                    elapsed: start.elapsed(),
                });
            }
            (StatusClass::Failed | StatusClass::Unknown, Some(status)) => {
                return Err(PollError::UnexpectedState {
                    status,
                    class,
                    expected: spec.expected(),
                    reason: observation.reason,
                });
            }
            (_, None) => {
                absent_checks += 1;
                if spec.max_absent_checks().is_some_and(|max| absent_checks > max) {
                    return Err(PollError::Absent {
                        checks: absent_checks,
                    });
                }
            }
            (_, status) => {
                absent_checks = 0;
                last_status = status;
            }
        }

        if Instant::now() >= deadline {
            return Err(timed_out(last_status));
        }

        let delay = delays.next().unwrap_or(spec.poll_interval());
        debug!(attempt = attempts, delay_ms = delay.as_millis(), "Operation pending, waiting");
        if pause(delay, deadline, cancel).await.is_err() {
            return Err(was_cancelled(last_status));
        }
    }
}
