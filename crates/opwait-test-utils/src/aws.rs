//! AWS test utilities
//!
//! Provides region detection and unique resource names for AWS integration tests.

use chrono::Utc;

/// Get the AWS region for tests.
///
/// Checks environment variables in order:
/// 1. AWS_REGION
/// 2. AWS_DEFAULT_REGION
/// 3. Falls back to us-east-2
///
/// # Example
///
/// ```
/// use opwait_test_utils::aws::get_test_region;
///
/// let region = get_test_region();
/// // Returns "us-east-2" if no env vars are set
/// ```
pub fn get_test_region() -> String {
    std::env::var("AWS_REGION")
        .or_else(|_| std::env::var("AWS_DEFAULT_REGION"))
        .unwrap_or_else(|_| "us-east-2".to_string())
}

/// Generate a unique run ID for test resources.
///
/// Format: `test-{timestamp_ms}-{counter}`, so names stay unique even when
/// tests start simultaneously.
///
/// # Example
///
/// ```
/// use opwait_test_utils::aws::test_run_id;
///
/// let run_id = test_run_id();
/// assert!(run_id.starts_with("test-"));
/// ```
pub fn test_run_id() -> String {
    use std::sync::atomic::{AtomicU32, Ordering};
    static COUNTER: AtomicU32 = AtomicU32::new(0);

    let ts = Utc::now().timestamp_millis();
    let counter = COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("test-{}-{}", ts, counter)
}

/// Generate a unique Athena database name for test resources.
///
/// Athena database names only allow lowercase letters, digits and
/// underscores, so the run ID's dashes are replaced.
///
/// # Example
///
/// ```
/// use opwait_test_utils::aws::test_database_name;
///
/// let name = test_database_name();
/// assert!(name.starts_with("opwait_test_"));
/// ```
pub fn test_database_name() -> String {
    format!("opwait_{}", test_run_id().replace('-', "_"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_id_format() {
        let run_id = test_run_id();
        // Format: test-{timestamp_ms}-{counter}
        let parts: Vec<&str> = run_id.strip_prefix("test-").unwrap().split('-').collect();
        assert_eq!(parts.len(), 2);
        parts[0].parse::<i64>().expect("Should be valid timestamp");
        parts[1].parse::<u32>().expect("Should be valid counter");
    }

    #[test]
    fn test_run_ids_are_unique() {
        assert_ne!(test_run_id(), test_run_id());
    }

    #[test]
    fn test_database_name_charset() {
        let name = test_database_name();
        assert!(
            name.chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_'),
            "invalid database name: {name}"
        );
    }
}
