//! Athena query types, independent of the SDK

use serde::{Deserialize, Serialize};

/// Athena query execution states
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
    strum::EnumIter,
)]
pub enum QueryState {
    #[strum(serialize = "QUEUED")]
    Queued,
    #[strum(serialize = "RUNNING")]
    Running,
    #[strum(serialize = "SUCCEEDED")]
    Succeeded,
    #[strum(serialize = "FAILED")]
    Failed,
    #[strum(serialize = "CANCELLED")]
    Cancelled,
}

impl QueryState {
    /// States the query can still leave
    pub const IN_PROGRESS: [QueryState; 2] = [QueryState::Queued, QueryState::Running];

    /// Terminal states that are not success
    pub const FAILURES: [QueryState; 2] = [QueryState::Failed, QueryState::Cancelled];

    /// Check if the state is a terminal failure
    pub fn is_failure(self) -> bool {
        Self::FAILURES.contains(&self)
    }
}

/// Status of a query execution as reported by GetQueryExecution.
///
/// `state` is `None` when the execution or its status block is missing,
/// which happens briefly right after submission.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryStatus {
    pub state: Option<String>,
    pub state_change_reason: Option<String>,
}

impl QueryStatus {
    pub fn new(state: QueryState) -> Self {
        Self {
            state: Some(state.to_string()),
            state_change_reason: None,
        }
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.state_change_reason = Some(reason.into());
        self
    }

    /// Parsed state, if present and known
    pub fn parsed_state(&self) -> Option<QueryState> {
        self.state.as_deref().and_then(|s| s.parse().ok())
    }
}

/// Rows of a query result set; each cell may be null
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ResultRows {
    rows: Vec<Vec<Option<String>>>,
}

impl ResultRows {
    pub fn new(rows: Vec<Vec<Option<String>>>) -> Self {
        Self { rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[Vec<Option<String>>] {
        &self.rows
    }

    /// Append rows from another page of results
    pub fn extend(&mut self, other: ResultRows) {
        self.rows.extend(other.rows);
    }

    /// Check if any cell equals `value` exactly
    pub fn contains_value(&self, value: &str) -> bool {
        self.rows
            .iter()
            .flatten()
            .any(|cell| cell.as_deref() == Some(value))
    }

    /// All cells, one per line; null cells render as empty lines
    pub fn flatten(&self) -> String {
        self.rows
            .iter()
            .flatten()
            .map(|cell| cell.as_deref().unwrap_or(""))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl FromIterator<Vec<Option<String>>> for ResultRows {
    fn from_iter<I: IntoIterator<Item = Vec<Option<String>>>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// Server-side encryption mode for query results
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
)]
pub enum EncryptionOption {
    #[strum(serialize = "SSE_S3")]
    #[serde(rename = "SSE_S3")]
    SseS3,
    #[strum(serialize = "SSE_KMS")]
    #[serde(rename = "SSE_KMS")]
    SseKms,
    #[strum(serialize = "CSE_KMS")]
    #[serde(rename = "CSE_KMS")]
    CseKms,
}

/// Encryption applied to query results
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EncryptionSettings {
    pub encryption_option: EncryptionOption,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kms_key: Option<String>,
}

impl EncryptionSettings {
    /// The KMS key, if one was given and is non-empty
    pub fn kms_key(&self) -> Option<&str> {
        self.kms_key.as_deref().filter(|k| !k.is_empty())
    }
}

/// Where query results are written, and how they are encrypted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultConfig {
    pub output_location: String,
    pub encryption: Option<EncryptionSettings>,
}

impl ResultConfig {
    /// Results go to the root of `bucket`
    pub fn for_bucket(bucket: &str, encryption: Option<EncryptionSettings>) -> Self {
        Self {
            output_location: format!("s3://{bucket}"),
            encryption,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    fn cells(values: &[Option<&str>]) -> Vec<Option<String>> {
        values.iter().map(|v| v.map(str::to_string)).collect()
    }

    #[test]
    fn query_state_strings_match_athena() {
        let names: Vec<String> = QueryState::iter().map(|s| s.to_string()).collect();
        assert_eq!(
            names,
            ["QUEUED", "RUNNING", "SUCCEEDED", "FAILED", "CANCELLED"]
        );
        assert_eq!("FAILED".parse::<QueryState>().unwrap(), QueryState::Failed);
        assert!("failed".parse::<QueryState>().is_err());
    }

    #[test]
    fn failure_states() {
        assert!(QueryState::Failed.is_failure());
        assert!(QueryState::Cancelled.is_failure());
        assert!(!QueryState::Succeeded.is_failure());
        assert!(!QueryState::Running.is_failure());
    }

    #[test]
    fn result_rows_contains_and_flatten() {
        let rows: ResultRows = [
            cells(&[Some("default")]),
            cells(&[Some("sales"), None]),
        ]
        .into_iter()
        .collect();

        assert_eq!(rows.len(), 2);
        assert!(rows.contains_value("sales"));
        assert!(!rows.contains_value("sale"));
        assert_eq!(rows.flatten(), "default\nsales\n");
    }

    #[test]
    fn empty_result_rows() {
        let rows = ResultRows::default();
        assert!(rows.is_empty());
        assert_eq!(rows.flatten(), "");
    }

    #[test]
    fn encryption_option_strings() {
        assert_eq!(EncryptionOption::SseS3.to_string(), "SSE_S3");
        assert_eq!(
            "CSE_KMS".parse::<EncryptionOption>().unwrap(),
            EncryptionOption::CseKms
        );
        let json = serde_json::to_string(&EncryptionOption::SseKms).unwrap();
        assert_eq!(json, "\"SSE_KMS\"");
    }

    #[test]
    fn empty_kms_key_is_ignored() {
        let settings = EncryptionSettings {
            encryption_option: EncryptionOption::SseKms,
            kms_key: Some(String::new()),
        };
        assert_eq!(settings.kms_key(), None);
    }

    #[test]
    fn result_config_for_bucket() {
        let config = ResultConfig::for_bucket("my-results", None);
        assert_eq!(config.output_location, "s3://my-results");
        assert!(config.encryption.is_none());
    }
}
