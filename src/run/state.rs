/// Run state definitions for tracking one source run
///
/// This module defines every state a run passes through and which transitions are legal.
use std::fmt;

/// Represents the current state of a source run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RunState {
    /// Nothing acquired yet
    Idle,

    /// A session is open for the source
    SessionOpen,

    /// Collecting item endpoints from the index page
    Enumerating,

    /// Fetching one record per endpoint
    FetchingDetails,

    /// Writing the snapshot file
    Persisting,

    /// Comparing against the previous history and replacing it
    DiffingHistory,

    // ===== Terminal States =====
    /// The run completed and history was replaced
    Done,

    /// The run stopped on an unrecovered error
    Failed,
}

impl RunState {
    /// Returns true if the run cannot advance any further
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }

    /// Returns true if `next` may follow this state
    ///
    /// The happy path is strictly linear; `Failed` is reachable from every
    /// non-idle, non-terminal state.
    pub fn can_transition_to(&self, next: RunState) -> bool {
        match (self, next) {
            (Self::Idle, Self::SessionOpen) => true,
            (Self::SessionOpen, Self::Enumerating) => true,
            (Self::Enumerating, Self::FetchingDetails) => true,
            (Self::FetchingDetails, Self::Persisting) => true,
            (Self::Persisting, Self::DiffingHistory) => true,
            (Self::DiffingHistory, Self::Done) => true,
            (Self::Idle, Self::Failed) => false,
            (current, Self::Failed) => !current.is_terminal(),
            _ => false,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::SessionOpen => "session_open",
            Self::Enumerating => "enumerating",
            Self::FetchingDetails => "fetching_details",
            Self::Persisting => "persisting",
            Self::DiffingHistory => "diffing_history",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }

    /// Returns all possible run states
    pub fn all_states() -> Vec<Self> {
        vec![
            Self::Idle,
            Self::SessionOpen,
            Self::Enumerating,
            Self::FetchingDetails,
            Self::Persisting,
            Self::DiffingHistory,
            Self::Done,
            Self::Failed,
        ]
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
