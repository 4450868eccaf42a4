//! opwait-common - Wait-for-terminal-state polling
//!
//! This crate provides the poller used to drive any "submit an operation,
//! poll until done" integration to a terminal status, without any AWS SDK
//! dependencies to keep it lightweight.
//!
//! ## Modules
//!
//! - [`defaults`]: Default polling values
//! - [`error`]: Poller and poll-spec errors
//! - [`observation`]: What a status probe reports, and what a finished wait returns
//! - [`poll_spec`]: Status sets, timeout and cadence for one poll session
//! - [`settings`]: Serializable, seconds-based wait settings
//! - [`status`]: Status classification
//! - [`wait`]: The poll loop itself

pub mod defaults;
pub mod error;
pub mod observation;
pub mod poll_spec;
pub mod settings;
pub mod status;
pub mod wait;

// Re-export commonly used types
pub use error::{PollError, SpecError};
pub use observation::{Completion, Observation};
pub use poll_spec::{Cadence, PollSpec, PollSpecBuilder};
pub use settings::WaitSettings;
pub use status::StatusClass;
pub use wait::wait_for_terminal;
