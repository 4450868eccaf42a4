//! Database lifecycle against an in-memory Athena
//!
//! `FakeAthena` understands the three DDL statements the database manager
//! issues and walks each query through absent, QUEUED, RUNNING and a
//! terminal state, one step per status check.

use opwait_athena::aws::{AthenaOperations, QueryState, QueryStatus, ResultConfig, ResultRows};
use opwait_athena::database::{DatabaseConfig, DatabaseError, DatabaseManager};
use opwait_athena::query::{execute_query, query_poll_spec};
use opwait_common::{PollSpec, WaitSettings};
use std::collections::{BTreeSet, HashMap};
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};
use tokio_util::sync::CancellationToken;

struct Execution {
    checks: u32,
    outcome: Result<ResultRows, String>,
}

#[derive(Default)]
struct FakeAthena {
    databases: Mutex<BTreeSet<String>>,
    executions: Mutex<HashMap<String, Execution>>,
    output_locations: Mutex<Vec<String>>,
    next_id: AtomicU32,
    stopped: Mutex<Vec<String>>,
    /// Never leave RUNNING
    stuck: bool,
}

impl FakeAthena {
    fn with_databases(names: &[&str]) -> Self {
        let fake = Self::default();
        fake.databases
            .lock()
            .unwrap()
            .extend(names.iter().map(|n| n.to_string()));
        fake
    }

    fn stuck() -> Self {
        Self {
            stuck: true,
            ..Self::default()
        }
    }

    fn has_database(&self, name: &str) -> bool {
        self.databases.lock().unwrap().contains(name)
    }

    fn run_ddl(&self, query: &str) -> Result<ResultRows, String> {
        let mut databases = self.databases.lock().unwrap();

        if query == "show databases;" {
            return Ok(databases.iter().map(|d| vec![Some(d.clone())]).collect());
        }
        if let Some(name) = backticked(query, "create database ") {
            if !databases.insert(name.clone()) {
                return Err(format!("Database {name} already exists"));
            }
            return Ok(ResultRows::default());
        }
        if let Some(name) = backticked(query, "drop database ") {
            if !databases.remove(&name) {
                return Err(format!("Database does not exist: {name}"));
            }
            return Ok(ResultRows::default());
        }
        Err(format!("line 1:1: mismatched input '{query}'"))
    }
}

/// The `name` in "<prefix>`name`..."
fn backticked(query: &str, prefix: &str) -> Option<String> {
    let rest = query.strip_prefix(prefix)?.strip_prefix('`')?;
    rest.split('`').next().map(str::to_string)
}

impl AthenaOperations for FakeAthena {
    async fn start_query_execution(
        &self,
        query: &str,
        result_config: &ResultConfig,
    ) -> anyhow::Result<String> {
        let id = format!("q-{}", self.next_id.fetch_add(1, Ordering::Relaxed));
        self.output_locations
            .lock()
            .unwrap()
            .push(result_config.output_location.clone());
        let outcome = self.run_ddl(query);
        self.executions
            .lock()
            .unwrap()
            .insert(id.clone(), Execution { checks: 0, outcome });
        Ok(id)
    }

    async fn get_query_status(&self, query_execution_id: &str) -> anyhow::Result<QueryStatus> {
        let mut executions = self.executions.lock().unwrap();
        let execution = executions
            .get_mut(query_execution_id)
            .ok_or_else(|| anyhow::anyhow!("InvalidRequestException: {query_execution_id}"))?;
        execution.checks += 1;

        Ok(match (execution.checks, &execution.outcome) {
            (1, _) => QueryStatus::default(),
            (2, _) => QueryStatus::new(QueryState::Queued),
            (_, _) if self.stuck => QueryStatus::new(QueryState::Running),
            (3, _) => QueryStatus::new(QueryState::Running),
            (_, Ok(_)) => QueryStatus::new(QueryState::Succeeded),
            (_, Err(reason)) => QueryStatus::new(QueryState::Failed).with_reason(reason.clone()),
        })
    }

    async fn get_query_results(&self, query_execution_id: &str) -> anyhow::Result<ResultRows> {
        let executions = self.executions.lock().unwrap();
        match executions.get(query_execution_id).map(|e| &e.outcome) {
            Some(Ok(rows)) => Ok(rows.clone()),
            _ => anyhow::bail!("InvalidRequestException: query did not succeed"),
        }
    }

    async fn stop_query_execution(&self, query_execution_id: &str) -> anyhow::Result<()> {
        self.stopped
            .lock()
            .unwrap()
            .push(query_execution_id.to_string());
        Ok(())
    }
}

fn fast_spec(timeout_secs: u64) -> PollSpec {
    query_poll_spec(&WaitSettings {
        timeout_secs,
        initial_delay_secs: 1,
        poll_interval_secs: 2,
        max_delay_secs: 2,
        jitter: false,
        max_absent_checks: Some(3),
    })
    .unwrap()
}

#[tokio::test(start_paused = true)]
async fn test_full_lifecycle() {
    let athena = FakeAthena::with_databases(&["default"]);
    let manager = DatabaseManager::new(&athena, fast_spec(60));
    let config = DatabaseConfig::new("sales", "query-results");

    manager.create(&config).await.expect("Should create database");
    assert!(athena.has_database("sales"));

    manager.read(&config).await.expect("Should find database");
    manager.update(&config).await.expect("Update re-reads");

    manager.delete(&config).await.expect("Should drop database");
    assert!(!athena.has_database("sales"));

    let err = manager.read(&config).await.unwrap_err();
    assert!(err.is_not_found());
    assert!(err.to_string().contains("query result: default"));

    let locations = athena.output_locations.lock().unwrap();
    assert!(locations.iter().all(|l| l == "s3://query-results"));
}

#[tokio::test(start_paused = true)]
async fn test_create_existing_database_reports_reason() {
    let athena = FakeAthena::with_databases(&["sales"]);
    let manager = DatabaseManager::new(&athena, fast_spec(60));

    let err = manager
        .create(&DatabaseConfig::new("sales", "query-results"))
        .await
        .unwrap_err();

    let query_err = match err {
        DatabaseError::Query(e) => e,
        other => panic!("expected query error, got {other:?}"),
    };
    let poll_err = query_err.poll_error().expect("Should fail while waiting");
    assert!(poll_err.is_unexpected_state());
    assert_eq!(poll_err.reason(), Some("Database sales already exists"));
    assert!(poll_err.to_string().contains("FAILED"));
}

#[tokio::test(start_paused = true)]
async fn test_force_destroy_drops_with_cascade() {
    let athena = FakeAthena::with_databases(&["sales"]);
    let manager = DatabaseManager::new(&athena, fast_spec(60));
    let config = DatabaseConfig {
        force_destroy: true,
        ..DatabaseConfig::new("sales", "query-results")
    };

    manager.delete(&config).await.expect("Should drop database");
    assert!(!athena.has_database("sales"));
}

#[tokio::test(start_paused = true)]
async fn test_stuck_query_times_out_and_is_stopped() {
    let athena = FakeAthena::stuck();
    let spec = fast_spec(9);

    let err = execute_query(
        &athena,
        "show databases;",
        &ResultConfig::for_bucket("query-results", None),
        &spec,
        None,
    )
    .await
    .unwrap_err();

    let poll_err = err.poll_error().expect("Should fail while waiting");
    assert!(poll_err.is_timeout());
    assert_eq!(poll_err.last_status(), Some("RUNNING"));
    assert_eq!(*athena.stopped.lock().unwrap(), vec!["q-0".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_stops_query() {
    let athena = FakeAthena::stuck();
    let cancel = CancellationToken::new();
    let manager = DatabaseManager::new(&athena, fast_spec(600)).with_cancellation(cancel.clone());

    let canceller = {
        let cancel = cancel.clone();
        async move {
            tokio::time::sleep(std::time::Duration::from_secs(6)).await;
            cancel.cancel();
        }
    };

    let db = DatabaseConfig::new("sales", "query-results");
    let (result, ()) = tokio::join!(manager.read(&db), canceller);

    let DatabaseError::Query(query_err) = result.unwrap_err() else {
        panic!("expected query error");
    };
    assert!(query_err.poll_error().unwrap().is_cancelled());
    assert_eq!(athena.stopped.lock().unwrap().len(), 1);
}
