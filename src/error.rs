//! Error types for govchain

use std::fmt;

/// Why a chain failed verification at a given position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IntegrityFault {
    /// `prev_hash` does not match the predecessor's stored hash.
    BrokenLink,
    /// Stored hash differs from the freshly recomputed digest.
    DigestMismatch,
    /// `index` is not exactly one past the predecessor's index.
    IndexGap,
}

impl fmt::Display for IntegrityFault {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            IntegrityFault::BrokenLink => write!(f, "broken link"),
            IntegrityFault::DigestMismatch => write!(f, "digest mismatch"),
            IntegrityFault::IndexGap => write!(f, "index gap"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ChainError {
    #[error("Cannot append: the chain has no previous block")]
    EmptyChain,
    #[error("Chain integrity error at block {index}: {fault}")]
    ChainIntegrity { index: u64, fault: IntegrityFault },
    #[error("Invalid reward: {0}")]
    InvalidReward(String),
    #[error("Proposal not found: {0}")]
    ProposalNotFound(String),
    #[error("Proposal {0} has already been decided")]
    AlreadyDecided(String),
    #[error("Invalid proposal: {0}")]
    InvalidProposal(String),
    #[error("Invalid vote: {0}")]
    InvalidVote(String),
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Serialization error: {0}")]
    SerializationError(String),
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("IO error: {0}")]
    IoError(String),
}

impl From<std::io::Error> for ChainError {
    fn from(err: std::io::Error) -> Self {
        ChainError::IoError(err.to_string())
    }
}

impl From<rusqlite::Error> for ChainError {
    fn from(err: rusqlite::Error) -> Self {
        ChainError::DatabaseError(err.to_string())
    }
}

impl From<serde_json::Error> for ChainError {
    fn from(err: serde_json::Error) -> Self {
        ChainError::SerializationError(err.to_string())
    }
}

/// Convenience alias used across the crate
pub type Result<T> = std::result::Result<T, ChainError>;
