//! Running an Athena query to completion
//!
//! A query is submitted, driven to a terminal state with the poller, and its
//! rows fetched. The status probe handles Athena's quirks: a status block that
//! does not exist yet right after submission, failure reasons carried next to
//! the state, and throttling on GetQueryExecution.

use crate::aws::athena::{AthenaOperations, QueryState, QueryStatus, ResultConfig, ResultRows};
use crate::aws::error::classify_anyhow_error;
use backon::{ExponentialBuilder, Retryable};
use opwait_common::{Observation, PollError, PollSpec, SpecError, WaitSettings, wait_for_terminal};
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Ways running a query can fail
#[derive(Debug, Error)]
pub enum QueryError {
    /// StartQueryExecution failed
    #[error("failed to start query")]
    Start(#[source] anyhow::Error),

    /// The query did not reach SUCCEEDED
    #[error("query execution {query_execution_id} did not succeed")]
    Wait {
        query_execution_id: String,
        #[source]
        source: PollError,
    },

    /// The query succeeded but its rows could not be fetched
    #[error("failed to fetch results for query execution {query_execution_id}")]
    Results {
        query_execution_id: String,
        #[source]
        source: anyhow::Error,
    },
}

impl QueryError {
    /// The poller's error, if the query failed while waiting
    pub fn poll_error(&self) -> Option<&PollError> {
        match self {
            QueryError::Wait { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Poll spec for Athena query executions.
///
/// QUEUED and RUNNING are pending, SUCCEEDED is the target, and FAILED and
/// CANCELLED are known failures.
pub fn query_poll_spec(settings: &WaitSettings) -> Result<PollSpec, SpecError> {
    settings
        .apply(PollSpec::builder())
        .pending(QueryState::IN_PROGRESS.iter().map(ToString::to_string))
        .target([QueryState::Succeeded.to_string()])
        .failure(QueryState::FAILURES.iter().map(ToString::to_string))
        .build()
}

/// Check if a status-check error is worth retrying inside the probe
fn is_retryable_status_error(e: &anyhow::Error) -> bool {
    classify_anyhow_error(e).is_retryable()
}

/// One status check for a query execution.
///
/// Throttling and internal errors are retried here with backoff; anything
/// else fails the probe. A missing status block is reported as absent. For
/// failure states, Athena's state-change reason is attached.
pub async fn check_query_status<O: AthenaOperations>(
    ops: &O,
    query_execution_id: &str,
) -> anyhow::Result<Observation<QueryStatus>> {
    let status = (|| ops.get_query_status(query_execution_id))
        .retry(
            ExponentialBuilder::default()
                .with_min_delay(Duration::from_millis(500))
                .with_max_delay(Duration::from_secs(5))
                .with_max_times(4),
        )
        .when(is_retryable_status_error)
        .notify(|e, dur| {
            debug!(
                query_execution_id = %query_execution_id,
                delay = ?dur,
                error = %e,
                "Transient error checking query status, retrying"
            );
        })
        .await?;

    let Some(state) = status.state.clone().filter(|s| !s.is_empty()) else {
        return Ok(Observation::absent());
    };

    let reason = status
        .parsed_state()
        .filter(|s| s.is_failure())
        .and(status.state_change_reason.clone());

    let observation = Observation::new(status, state);
    Ok(match reason {
        Some(reason) => observation.with_reason(reason),
        None => observation,
    })
}

/// Submit a query and wait for it to reach SUCCEEDED, then fetch its rows.
///
/// If the wait times out or is cancelled, the query is stopped on a
/// best-effort basis before the error is returned.
pub async fn execute_query<O: AthenaOperations>(
    ops: &O,
    query: &str,
    result_config: &ResultConfig,
    spec: &PollSpec,
    cancel: Option<&CancellationToken>,
) -> Result<ResultRows, QueryError> {
    let query_execution_id = ops
        .start_query_execution(query, result_config)
        .await
        .map_err(QueryError::Start)?;

    let waited = wait_for_terminal(spec, cancel, || {
        check_query_status(ops, &query_execution_id)
    })
    .await;

    let completion = match waited {
        Ok(completion) => completion,
        Err(source) => {
            if source.is_timeout() || source.is_cancelled() {
                if let Err(e) = ops.stop_query_execution(&query_execution_id).await {
                    warn!(
                        query_execution_id = %query_execution_id,
                        error = ?e,
                        "Failed to stop abandoned query"
                    );
                }
            }
            return Err(QueryError::Wait {
                query_execution_id,
                source,
            });
        }
    };

    info!(
        query_execution_id = %query_execution_id,
        attempts = completion.attempts,
        elapsed = ?completion.elapsed,
        "Query succeeded"
    );

    ops.get_query_results(&query_execution_id)
        .await
        .map_err(|source| QueryError::Results {
            query_execution_id,
            source,
        })
}
