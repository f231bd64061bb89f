//! Error types
//!
//! One enum per layer: FEN parsing, move validation, engine communication and
//! configuration loading. Rules code never panics on structurally valid input;
//! everything else surfaces through these types.

use crate::types::Color;
use thiserror::Error;

/// Errors produced while parsing or pre-validating FEN text
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FenError {
    #[error("empty FEN string")]
    Empty,

    #[error("expected 4 to 6 space-separated fields, found {0}")]
    FieldCount(usize),

    #[error("expected 8 ranks in piece placement, found {0}")]
    RankCount(usize),

    #[error("rank {rank} describes {width} squares instead of 8")]
    RankWidth { rank: usize, width: usize },

    #[error("unrecognised piece placement character '{0}'")]
    BadPiece(char),

    #[error("side to move must be 'w' or 'b', found '{0}'")]
    SideToMove(String),

    #[error("{color} must have exactly one king, found {count}")]
    KingCount { color: Color, count: usize },

    #[error("invalid castling field '{0}'")]
    Castling(String),

    #[error("invalid en passant field '{0}'")]
    EnPassant(String),

    #[error("invalid move counter '{0}'")]
    Counter(String),
}

/// Errors produced when a move is rejected
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MoveError {
    #[error("square index out of bounds: {0}")]
    OutOfBounds(usize),

    #[error("move starts and ends on the same square")]
    SameSquare,

    #[error("no piece on {0}")]
    NoPiece(String),

    #[error("piece on {0} does not belong to the side to move")]
    WrongSide(String),

    #[error("invalid promotion: {0}")]
    InvalidPromotion(String),

    #[error("illegal move '{0}'")]
    Illegal(String),

    #[error("cannot parse move '{0}'")]
    Parse(String),

    #[error("ambiguous move '{0}'")]
    Ambiguous(String),
}

/// Errors reported by the engine bridge
///
/// Kept `Clone` so a failed request can carry its error inside the result
/// object handed to subscribers.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("invalid position: {0}")]
    InvalidFen(#[from] FenError),

    #[error("failed to launch engine '{path}': {message}")]
    Spawn { path: String, message: String },

    #[error("engine process crashed: {0}")]
    Crashed(String),

    #[error("engine did not answer within {budget_ms} ms")]
    Timeout { budget_ms: u64 },

    #[error("engine not ready after {stage}")]
    NotReady { stage: String },

    #[error("engine I/O failure: {0}")]
    Io(String),

    #[error("engine restart failed: {0}")]
    RestartFailed(String),

    #[error("no engine attached")]
    NoEngine,
}

impl EngineError {
    /// True for failures that leave the process unusable until a restart.
    pub fn is_crash(&self) -> bool {
        matches!(
            self,
            EngineError::Crashed(_) | EngineError::Io(_) | EngineError::RestartFailed(_)
        )
    }
}

/// Errors while loading configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot read config file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Result type alias for move operations
pub type MoveResult<T> = Result<T, MoveError>;
