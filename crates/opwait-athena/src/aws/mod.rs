//! AWS client modules
//!
//! This module provides wrappers around AWS SDK clients for:
//! - Athena: query submission, status, results and cancellation
//! - context: loading SDK configuration once per process
//! - error: classifying SDK errors by code

pub mod athena;
pub mod context;
pub mod error;

pub use athena::{
    AthenaClient, AthenaOperations, EncryptionOption, EncryptionSettings, QueryState, QueryStatus,
    ResultConfig, ResultRows,
};
pub use context::AwsContext;
pub use error::{AthenaError, classify_anyhow_error, classify_aws_error};
