//! Shared test utilities for opwait
//!
//! This crate provides common test helpers that can be used across
//! multiple test modules without circular dependencies.
//!
//! ## Modules
//!
//! - [`aws`]: AWS region detection and unique test resource names
//! - [`probe`]: Scripted status probes for driving the poller

pub mod aws;
pub mod probe;

// Re-export commonly used items
pub use aws::{get_test_region, test_database_name, test_run_id};
pub use probe::{ScriptedProbe, Step};
