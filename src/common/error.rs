use thiserror::Error;

/// Local rejections of a board intent. None of these reach the network.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BoardError {
    #[error("Not enough users for a stand-up session.")]
    NotEnoughParticipants,
    #[error("Can only create maximum {0} columns!")]
    ColumnLimit(usize),
    #[error("A stand-up session is already running.")]
    StandupActive,
    #[error("No stand-up session is running.")]
    StandupInactive,
    #[error("{0} is not part of the stand-up rotation")]
    UnknownParticipant(String),
    #[error("Unknown card: {0}")]
    UnknownCard(String),
    #[error("Unknown column: {0}")]
    UnknownColumn(String),
    #[error("Name must not be empty")]
    EmptyName,
    #[error("Vote must be 1 or -1, got {0}")]
    InvalidVote(i32),
    #[error("Invalid timer duration `{0}`. Supported formats: 5m or 30s or 5m30s")]
    InvalidDuration(String),
    #[error("Not connected to the board")]
    NotConnected,
}
