//! Athena query execution client

mod operations;
mod types;

pub use operations::AthenaOperations;
pub use types::{
    EncryptionOption, EncryptionSettings, QueryState, QueryStatus, ResultConfig, ResultRows,
};

#[cfg(test)]
pub use operations::MockAthenaOperations;

use crate::aws::context::AwsContext;
use anyhow::{Context, Result};
use std::future::Future;
use aws_sdk_athena::Client;
use aws_sdk_athena::types::{EncryptionConfiguration, ResultConfiguration};
use tracing::{debug, info};

/// Athena client for submitting and inspecting query executions
pub struct AthenaClient {
    pub(crate) client: Client,
    work_group: Option<String>,
}

impl AthenaClient {
    /// Create a new Athena client (loads AWS config from environment)
    pub async fn new(region: &str) -> Result<Self> {
        let ctx = AwsContext::new(region).await;
        Ok(Self::from_context(&ctx))
    }

    /// Create an Athena client from a pre-loaded AWS context
    pub fn from_context(ctx: &AwsContext) -> Self {
        Self {
            client: ctx.athena_client(),
            work_group: None,
        }
    }

    /// Run queries in this work group instead of the account default
    pub fn with_work_group(mut self, work_group: impl Into<String>) -> Self {
        self.work_group = Some(work_group.into());
        self
    }

    /// Submit a query, returning its execution ID
    pub async fn start_query_execution(
        &self,
        query: &str,
        result_config: &ResultConfig,
    ) -> Result<String> {
        info!(
            query = %query,
            output_location = %result_config.output_location,
            "Starting Athena query"
        );

        let mut request = self
            .client
            .start_query_execution()
            .query_string(query)
            .result_configuration(to_sdk_result_config(result_config)?);

        if let Some(work_group) = &self.work_group {
            request = request.work_group(work_group);
        }

        let response = request
            .send()
            .await
            .context("Failed to start query execution")?;

        let id = response
            .query_execution_id()
            .context("StartQueryExecution returned no query execution ID")?;

        debug!(query_execution_id = %id, "Query submitted");
        Ok(id.to_string())
    }

    /// Fetch the current state of a query execution
    pub async fn get_query_status(&self, query_execution_id: &str) -> Result<QueryStatus> {
        let response = self
            .client
            .get_query_execution()
            .query_execution_id(query_execution_id)
            .send()
            .await
            .context("Failed to get query execution")?;

        let status = response.query_execution().and_then(|q| q.status());

        Ok(QueryStatus {
            state: status
                .and_then(|s| s.state())
                .map(|s| s.as_str().to_string()),
            state_change_reason: status
                .and_then(|s| s.state_change_reason())
                .map(|s| s.to_string()),
        })
    }

    /// Fetch every row of a finished query's result set, following pagination
    pub async fn get_query_results(&self, query_execution_id: &str) -> Result<ResultRows> {
        let rows = collect_pages(|next_token| async move {
            let response = self
                .client
                .get_query_results()
                .query_execution_id(query_execution_id)
                .set_next_token(next_token)
                .send()
                .await
                .context("Failed to get query results")?;

            let page: ResultRows = response
                .result_set()
                .map(|result_set| {
                    result_set
                        .rows()
                        .iter()
                        .map(|row| {
                            row.data()
                                .iter()
                                .map(|datum| datum.var_char_value().map(|v| v.to_string()))
                                .collect::<Vec<_>>()
                        })
                        .collect()
                })
                .unwrap_or_default();

            Ok((page, response.next_token().map(|t| t.to_string())))
        })
        .await?;

        debug!(query_execution_id = %query_execution_id, rows = rows.len(), "Fetched query results");
        Ok(rows)
    }

    /// Ask Athena to stop a running query
    pub async fn stop_query_execution(&self, query_execution_id: &str) -> Result<()> {
        info!(query_execution_id = %query_execution_id, "Stopping Athena query");

        self.client
            .stop_query_execution()
            .query_execution_id(query_execution_id)
            .send()
            .await
            .context("Failed to stop query execution")?;

        Ok(())
    }
}

/// Accumulate rows from a paginated result set.
///
/// `fetch` is called with the previous page's token (`None` first) and
/// returns a page of rows plus the next token. A missing or empty token
/// ends the walk.
async fn collect_pages<F, Fut>(mut fetch: F) -> Result<ResultRows>
where
    F: FnMut(Option<String>) -> Fut,
    Fut: Future<Output = Result<(ResultRows, Option<String>)>>,
{
    let mut rows = ResultRows::default();
    let mut next_token: Option<String> = None;

    loop {
        let (page, token) = fetch(next_token.take()).await?;
        rows.extend(page);

        match token.filter(|t| !t.is_empty()) {
            Some(token) => next_token = Some(token),
            None => return Ok(rows),
        }
    }
}

/// Convert to the SDK's result configuration
fn to_sdk_result_config(config: &ResultConfig) -> Result<ResultConfiguration> {
    let mut builder = ResultConfiguration::builder().output_location(&config.output_location);

    if let Some(encryption) = &config.encryption {
        let mut encryption_builder = EncryptionConfiguration::builder().encryption_option(
            aws_sdk_athena::types::EncryptionOption::from(encryption.encryption_option.as_ref()),
        );
        if let Some(kms_key) = encryption.kms_key() {
            encryption_builder = encryption_builder.kms_key(kms_key);
        }
        builder = builder.encryption_configuration(
            encryption_builder
                .build()
                .context("Invalid encryption configuration")?,
        );
    }

    Ok(builder.build())
}
