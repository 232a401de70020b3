//! Core error types.

use tablefsm_document::DocumentError;
use thiserror::Error;

/// Errors from the state machine engines.
///
/// Out-of-range indices and dispatch on an unsized machine are programmer
/// errors and panic instead of producing one of these.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("unknown state: {state}")]
    UnknownState { state: String },

    #[error("unknown message: {message}")]
    UnknownMessage { message: String },

    #[error("unknown target state: {state}")]
    UnknownTargetState { state: String },

    #[error("state machine is missing state definitions for {state}")]
    MissingStateTable { state: String },

    #[error("state {index} has no name")]
    UnnamedState { index: usize },

    #[error("message {index} has no name")]
    UnnamedMessage { index: usize },

    #[error("name {name} is used by more than one slot")]
    DuplicateName { name: String },

    #[error("document declares no states")]
    EmptyDocument,

    #[error("sync payload truncated: need {needed} bytes, have {available}")]
    TruncatedSync { needed: usize, available: usize },

    #[error("synced state {state} out of range (machine has {num_states} states)")]
    SyncStateOutOfRange { state: u32, num_states: usize },

    #[error("document error: {0}")]
    Document(#[from] DocumentError),
}

impl CoreError {
    /// Returns an error code suitable for tooling output.
    pub fn error_code(&self) -> &'static str {
        match self {
            CoreError::UnknownState { .. } => "UNKNOWN_STATE",
            CoreError::UnknownMessage { .. } => "UNKNOWN_MESSAGE",
            CoreError::UnknownTargetState { .. } => "UNKNOWN_TARGET_STATE",
            CoreError::MissingStateTable { .. } => "MISSING_STATE_TABLE",
            CoreError::UnnamedState { .. } => "UNNAMED_STATE",
            CoreError::UnnamedMessage { .. } => "UNNAMED_MESSAGE",
            CoreError::DuplicateName { .. } => "DUPLICATE_NAME",
            CoreError::EmptyDocument => "EMPTY_DOCUMENT",
            CoreError::TruncatedSync { .. } => "BAD_SYNC",
            CoreError::SyncStateOutOfRange { .. } => "BAD_SYNC",
            CoreError::Document(e) => e.error_code(),
        }
    }
}
