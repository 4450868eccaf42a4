//! opwait-athena - Athena queries and databases driven by the opwait poller
//!
//! This crate submits Athena queries, waits for them to reach a terminal
//! state with [`opwait_common::wait_for_terminal`], and manages databases
//! through DDL statements.

pub mod aws;
pub mod config;
pub mod database;
pub mod query;
