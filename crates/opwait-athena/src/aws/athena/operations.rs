//! Athena operations trait for testing

use super::AthenaClient;
use super::types::{QueryStatus, ResultConfig, ResultRows};
use anyhow::Result;

/// Trait for Athena operations that can be mocked in tests.
///
/// This trait abstracts the Athena client calls so that query waiting and
/// the database lifecycle can be unit tested without hitting real AWS.
#[allow(async_fn_in_trait)] // Internal use only, Send+Sync bounds on trait are sufficient
#[cfg_attr(test, mockall::automock)]
pub trait AthenaOperations: Send + Sync {
    /// Submit a query, returning its execution ID
    async fn start_query_execution(
        &self,
        query: &str,
        result_config: &ResultConfig,
    ) -> Result<String>;

    /// Fetch the current state of a query execution
    async fn get_query_status(&self, query_execution_id: &str) -> Result<QueryStatus>;

    /// Fetch every row of a finished query's result set
    async fn get_query_results(&self, query_execution_id: &str) -> Result<ResultRows>;

    /// Ask Athena to stop a running query
    async fn stop_query_execution(&self, query_execution_id: &str) -> Result<()>;
}

impl AthenaOperations for AthenaClient {
    async fn start_query_execution(
        &self,
        query: &str,
        result_config: &ResultConfig,
    ) -> Result<String> {
        AthenaClient::start_query_execution(self, query, result_config).await
    }

    async fn get_query_status(&self, query_execution_id: &str) -> Result<QueryStatus> {
        AthenaClient::get_query_status(self, query_execution_id).await
    }

    async fn get_query_results(&self, query_execution_id: &str) -> Result<ResultRows> {
        AthenaClient::get_query_results(self, query_execution_id).await
    }

    async fn stop_query_execution(&self, query_execution_id: &str) -> Result<()> {
        AthenaClient::stop_query_execution(self, query_execution_id).await
    }
}

impl<O: AthenaOperations> AthenaOperations for &O {
    async fn start_query_execution(
        &self,
        query: &str,
        result_config: &ResultConfig,
    ) -> Result<String> {
        (**self).start_query_execution(query, result_config).await
    }

    async fn get_query_status(&self, query_execution_id: &str) -> Result<QueryStatus> {
        (**self).get_query_status(query_execution_id).await
    }

    async fn get_query_results(&self, query_execution_id: &str) -> Result<ResultRows> {
        (**self).get_query_results(query_execution_id).await
    }

    async fn stop_query_execution(&self, query_execution_id: &str) -> Result<()> {
        (**self).stop_query_execution(query_execution_id).await
    }
}
