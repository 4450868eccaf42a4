//! AWS error classification and handling
//!
//! Provides typed errors for Athena SDK operations using the `.code()` method
//! instead of string matching on Debug format.

use thiserror::Error;

/// Athena error categories for retry decisions
#[derive(Debug, Error)]
pub enum AthenaError {
    /// Query execution or other resource was not found
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Rate limit exceeded (retryable with backoff)
    #[error("Rate limit exceeded")]
    Throttled,

    /// The request was rejected (bad SQL, missing bucket, unknown work group)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Athena had an internal failure (retryable)
    #[error("Athena internal error")]
    Internal,

    /// Generic AWS SDK error with code and message
    #[error("AWS error: {message}")]
    Sdk {
        code: Option<String>,
        message: String,
    },
}

impl AthenaError {
    /// Check if this is a "not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(self, AthenaError::NotFound(_))
    }

    /// Check if this is a retryable error
    pub fn is_retryable(&self) -> bool {
        matches!(self, AthenaError::Throttled | AthenaError::Internal)
    }

    /// Get a user-friendly suggestion for resolving this error, if available.
    pub fn suggestion(&self) -> Option<String> {
        match self {
            AthenaError::InvalidRequest(_) => suggestion_for_code("InvalidRequestException"),
            AthenaError::Sdk { code: Some(c), .. } => suggestion_for_code(c),
            _ => None,
        }
    }
}

/// Known AWS error codes for "not found" conditions
const NOT_FOUND_CODES: &[&str] = &["ResourceNotFoundException", "EntityNotFoundException"];

/// Known AWS error codes for throttling/rate limiting
const THROTTLING_CODES: &[&str] = &[
    "Throttling",
    "ThrottlingException",
    "TooManyRequestsException",
];

/// Known AWS error codes for rejected requests
const INVALID_REQUEST_CODES: &[&str] = &["InvalidRequestException"];

/// Known AWS error codes for service-side failures
const INTERNAL_CODES: &[&str] = &["InternalServerException", "ServiceUnavailable"];

/// Classify an AWS SDK error using the error code.
pub fn classify_aws_error(code: Option<&str>, message: Option<&str>) -> AthenaError {
    let message = message.unwrap_or("Unknown error").to_string();

    match code {
        Some(c) if NOT_FOUND_CODES.contains(&c) => AthenaError::NotFound(message),
        Some(c) if THROTTLING_CODES.contains(&c) => AthenaError::Throttled,
        Some(c) if INVALID_REQUEST_CODES.contains(&c) => AthenaError::InvalidRequest(message),
        Some(c) if INTERNAL_CODES.contains(&c) => AthenaError::Internal,
        _ => AthenaError::Sdk {
            code: code.map(|s| s.to_string()),
            message,
        },
    }
}

/// Classify an error from an anyhow::Error by extracting the AWS error code.
///
/// Walks the error chain using `ProvideErrorMetadata` to extract `.code()` and
/// `.message()` from any Athena SDK error. Falls back to string matching on the
/// Debug representation if no typed error is found.
pub fn classify_anyhow_error(error: &anyhow::Error) -> AthenaError {
    use aws_sdk_athena::error::{ProvideErrorMetadata, SdkError};
    use aws_sdk_athena::operation::{
        get_query_execution::GetQueryExecutionError, get_query_results::GetQueryResultsError,
        start_query_execution::StartQueryExecutionError,
        stop_query_execution::StopQueryExecutionError,
    };

    for cause in error.chain() {
        if let Some(e) = cause.downcast_ref::<SdkError<GetQueryExecutionError>>() {
            let meta = ProvideErrorMetadata::meta(e);
            return classify_aws_error(meta.code(), meta.message());
        }
        if let Some(e) = cause.downcast_ref::<SdkError<StartQueryExecutionError>>() {
            let meta = ProvideErrorMetadata::meta(e);
            return classify_aws_error(meta.code(), meta.message());
        }
        if let Some(e) = cause.downcast_ref::<SdkError<GetQueryResultsError>>() {
            let meta = ProvideErrorMetadata::meta(e);
            return classify_aws_error(meta.code(), meta.message());
        }
        if let Some(e) = cause.downcast_ref::<SdkError<StopQueryExecutionError>>() {
            let meta = ProvideErrorMetadata::meta(e);
            return classify_aws_error(meta.code(), meta.message());
        }
    }

    // Fallback: extract error code from debug string representation
    let debug_str = format!("{:?}", error);
    if let Some(code) = extract_error_code(&debug_str) {
        return classify_aws_error(Some(&code), Some(&debug_str));
    }

    AthenaError::Sdk {
        code: None,
        message: error.to_string(),
    }
}

/// Extract an AWS error code from a debug string representation
fn extract_error_code(debug_str: &str) -> Option<String> {
    let known = NOT_FOUND_CODES
        .iter()
        .chain(THROTTLING_CODES)
        .chain(INVALID_REQUEST_CODES)
        .chain(INTERNAL_CODES);

    // Longest first so "ThrottlingException" wins over "Throttling"
    let mut known: Vec<&str> = known.copied().collect();
    known.sort_by_key(|c| std::cmp::Reverse(c.len()));
    if let Some(code) = known.into_iter().find(|c| debug_str.contains(c)) {
        return Some(code.to_string());
    }

    // Try to extract any code from `code: Some("...")` pattern
    if let Some(start) = debug_str.find("code: Some(\"") {
        let rest = &debug_str[start + 12..];
        if let Some(end) = rest.find('"') {
            return Some(rest[..end].to_string());
        }
    }

    None
}

/// Error code to user-friendly suggestion mapping
const SUGGESTIONS: &[(&str, &str)] = &[
    (
        "InvalidRequestException",
        "Check the SQL syntax, the output bucket, and the work group name.",
    ),
    (
        "AccessDeniedException",
        "The credentials in use lack Athena, Glue, or S3 permissions for this query.",
    ),
    (
        "TooManyRequestsException",
        "Athena rate limit hit. Status checks are retried automatically; reduce concurrent queries.",
    ),
];

/// Get a user-friendly suggestion for a known error code.
fn suggestion_for_code(code: &str) -> Option<String> {
    SUGGESTIONS
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, s)| (*s).to_string())
}
