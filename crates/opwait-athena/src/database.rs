//! Athena database lifecycle
//!
//! Databases are managed purely through DDL queries: each operation submits a
//! statement, waits for it with the query poller, and checks the rows that
//! come back.

use crate::aws::athena::{AthenaOperations, EncryptionSettings, ResultConfig, ResultRows};
use crate::query::{QueryError, execute_query};
use garde::Validate;
use opwait_common::PollSpec;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// A database and where its DDL results are written
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct DatabaseConfig {
    /// Lowercase letters, digits and underscores only
    #[garde(custom(valid_database_name))]
    pub name: String,

    /// S3 bucket for query results
    #[garde(length(min = 1))]
    pub bucket: String,

    /// Drop tables along with the database
    #[serde(default)]
    #[garde(skip)]
    pub force_destroy: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[garde(skip)]
    pub encryption: Option<EncryptionSettings>,
}

fn valid_database_name(value: &str, _: &()) -> garde::Result {
    let valid = !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
    if !valid {
        return Err(garde::Error::new(
            "must be lowercase letters, numbers, or underscore",
        ));
    }
    Ok(())
}

impl DatabaseConfig {
    pub fn new(name: impl Into<String>, bucket: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            bucket: bucket.into(),
            force_destroy: false,
            encryption: None,
        }
    }

    pub fn result_config(&self) -> ResultConfig {
        ResultConfig::for_bucket(&self.bucket, self.encryption.clone())
    }
}

/// Database lifecycle errors
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("invalid database config: {0}")]
    Invalid(#[from] garde::Report),

    #[error(transparent)]
    Query(#[from] QueryError),

    #[error("Athena {action} database, unexpected query result: {result}")]
    UnexpectedRows {
        action: &'static str,
        result: String,
    },

    #[error("Athena not found database: {name}, query result: {result}")]
    NotFound { name: String, result: String },
}

impl DatabaseError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, DatabaseError::NotFound { .. })
    }
}

pub fn create_statement(name: &str) -> String {
    format!("create database `{name}`;")
}

pub fn drop_statement(name: &str, force_destroy: bool) -> String {
    if force_destroy {
        format!("drop database `{name}` cascade;")
    } else {
        format!("drop database `{name}`;")
    }
}

pub const SHOW_DATABASES: &str = "show databases;";

/// Creates, reads and drops Athena databases
pub struct DatabaseManager<O> {
    ops: O,
    spec: PollSpec,
    cancel: Option<CancellationToken>,
}

impl<O: AthenaOperations> DatabaseManager<O> {
    pub fn new(ops: O, spec: PollSpec) -> Self {
        Self {
            ops,
            spec,
            cancel: None,
        }
    }

    /// Abandon in-flight waits when `token` is cancelled
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Create the database, then confirm it is listed
    pub async fn create(&self, config: &DatabaseConfig) -> Result<(), DatabaseError> {
        config.validate()?;
        info!(database = %config.name, "Creating Athena database");

        let rows = self.run(config, &create_statement(&config.name)).await?;
        expect_no_rows("create", &rows)?;

        self.read(config).await
    }

    /// Confirm the database is listed by `show databases`
    pub async fn read(&self, config: &DatabaseConfig) -> Result<(), DatabaseError> {
        config.validate()?;

        let rows = self.run(config, SHOW_DATABASES).await?;
        if rows.contains_value(&config.name) {
            return Ok(());
        }

        Err(DatabaseError::NotFound {
            name: config.name.clone(),
            result: rows.flatten(),
        })
    }

    /// Every field forces replacement, so an update only re-reads
    pub async fn update(&self, config: &DatabaseConfig) -> Result<(), DatabaseError> {
        self.read(config).await
    }

    pub async fn delete(&self, config: &DatabaseConfig) -> Result<(), DatabaseError> {
        config.validate()?;
        info!(
            database = %config.name,
            force_destroy = config.force_destroy,
            "Dropping Athena database"
        );

        let rows = self
            .run(
                config,
                &drop_statement(&config.name, config.force_destroy),
            )
            .await?;
        expect_no_rows("drop", &rows)
    }

    async fn run(&self, config: &DatabaseConfig, query: &str) -> Result<ResultRows, DatabaseError> {
        let rows = execute_query(
            &self.ops,
            query,
            &config.result_config(),
            &self.spec,
            self.cancel.as_ref(),
        )
        .await?;
        Ok(rows)
    }
}

fn expect_no_rows(action: &'static str, rows: &ResultRows) -> Result<(), DatabaseError> {
    if rows.is_empty() {
        return Ok(());
    }
    Err(DatabaseError::UnexpectedRows {
        action,
        result: rows.flatten(),
    })
}
