//! Error types for the engine

use thiserror::Error;

/// Request-level failure.
///
/// Every variant carries a human-readable message; none of them are
/// recoverable automatically. A failure aborts the current request before a
/// new snapshot is written, so the caller retries against the unchanged
/// prior state.
#[derive(Error, Debug)]
pub enum EngineError {
    /// The requested action is not among the legal actions for the current
    /// top-of-stack phase.
    #[error("Illegal action: {0}")]
    IllegalAction(String),

    /// The supplied identifier is not in the pending action's legal set.
    #[error("Illegal choice: {0}")]
    IllegalChoice(String),

    /// A game-rule precondition is unmet (gold, exhaustion, prerequisites).
    #[error("Precondition failed: {0}")]
    Precondition(String),

    /// An identifier does not resolve to a known card.
    #[error("Card not found: {0}")]
    CardNotFound(u32),

    /// A state reference does not resolve to a stored snapshot.
    #[error("Unknown state reference: {0}")]
    UnknownState(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

pub type Result<T> = std::result::Result<T, EngineError>;
