//! Status classification
//!
//! Every status a probe reports is mapped once onto a closed set of classes,
//! so the poll loop never compares raw vendor strings.

/// Class of an observed status relative to a [`PollSpec`](crate::PollSpec)
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::AsRefStr, strum::EnumIter,
)]
#[strum(serialize_all = "lowercase")]
pub enum StatusClass {
    /// Still in progress, or no status reported yet
    Pending,
    /// Successfully complete
    Target,
    /// A known terminal failure status
    Failed,
    /// Not in any configured set
    Unknown,
}

impl StatusClass {
    /// Check if the class ends the poll session
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending)
    }

    /// Check if the class ends the poll session with an error
    pub fn is_failure(self) -> bool {
        matches!(self, Self::Failed | Self::Unknown)
    }
}
