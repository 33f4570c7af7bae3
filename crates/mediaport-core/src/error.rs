//! Error types module
//!
//! `UploadError` is the task-level error: whatever ends a task in `Error` is one
//! of its variants, and its `Display` output becomes the task's `error_message`.
//! Collaborator failures have their own enums (`RegistryError`, `TransferError`,
//! `SourceError`) and are folded into `UploadError` at the pipeline boundary.

use serde::{Deserialize, Serialize};
use std::io;
use std::time::Duration;

use crate::models::TaskStatus;

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected errors like validation failures
    Debug,
    /// Warning level - for transport failures outside our control
    Warn,
    /// Error level - for unexpected failures
    Error,
}

/// Coarse classification of task failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Rejected before any network call (size, type, empty file).
    Validation,
    /// Ticket request or byte transfer failed.
    Transport,
    /// Bytes landed but the storage authority did not acknowledge the final metadata.
    Completion,
    /// Local failure (unreadable source, broken invariant).
    Internal,
}

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("File too large: {size} bytes (max: {max} bytes)")]
    FileTooLarge { size: u64, max: u64 },

    #[error("Unsupported file type: {mime_type} (allowed: {allowed:?})")]
    UnsupportedType {
        mime_type: String,
        allowed: Vec<String>,
    },

    #[error("Content type {mime_type} does not match file extension '{extension}'")]
    ExtensionMismatch {
        mime_type: String,
        extension: String,
    },

    #[error("Empty file")]
    EmptyFile,

    #[error("Failed to read source: {0}")]
    Source(#[from] SourceError),

    #[error("Write ticket rejected: {0}")]
    TicketRejected(#[source] RegistryError),

    #[error("{0}")]
    Transfer(#[from] TransferError),

    #[error("Bytes transferred for asset {asset_id} but completion was not acknowledged: {source}")]
    CompletionUnacknowledged {
        asset_id: String,
        #[source]
        source: RegistryError,
    },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl UploadError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            UploadError::FileTooLarge { .. }
            | UploadError::UnsupportedType { .. }
            | UploadError::ExtensionMismatch { .. }
            | UploadError::EmptyFile => ErrorKind::Validation,
            UploadError::TicketRejected(_) | UploadError::Transfer(_) => ErrorKind::Transport,
            UploadError::CompletionUnacknowledged { .. } => ErrorKind::Completion,
            UploadError::Source(_) | UploadError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Machine-readable error code (e.g., "FILE_TOO_LARGE")
    pub fn error_code(&self) -> &'static str {
        match self {
            UploadError::FileTooLarge { .. } => "FILE_TOO_LARGE",
            UploadError::UnsupportedType { .. } => "UNSUPPORTED_TYPE",
            UploadError::ExtensionMismatch { .. } => "EXTENSION_MISMATCH",
            UploadError::EmptyFile => "EMPTY_FILE",
            UploadError::Source(_) => "SOURCE_UNREADABLE",
            UploadError::TicketRejected(RegistryError::PayloadTooLarge(_)) => {
                "TICKET_PAYLOAD_TOO_LARGE"
            }
            UploadError::TicketRejected(_) => "TICKET_REJECTED",
            UploadError::Transfer(TransferError::Status { .. }) => "TRANSFER_STATUS",
            UploadError::Transfer(TransferError::Network(_)) => "TRANSFER_NETWORK",
            UploadError::Transfer(TransferError::Timeout(_)) => "TRANSFER_TIMEOUT",
            UploadError::CompletionUnacknowledged { .. } => "COMPLETION_UNACKNOWLEDGED",
            UploadError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Whether submitting the same file again as a fresh task may succeed.
    /// Nothing is retried automatically.
    pub fn is_resubmittable(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::Transport | ErrorKind::Completion
        ) && !matches!(
            self,
            UploadError::TicketRejected(RegistryError::PayloadTooLarge(_))
        )
    }

    pub fn log_level(&self) -> LogLevel {
        match self.kind() {
            ErrorKind::Validation => LogLevel::Debug,
            ErrorKind::Transport => LogLevel::Warn,
            ErrorKind::Completion | ErrorKind::Internal => LogLevel::Error,
        }
    }
}

impl From<InvalidTransition> for UploadError {
    fn from(err: InvalidTransition) -> Self {
        UploadError::Internal(err.to_string())
    }
}

/// Errors returned by the storage authority API (duplicate check, ticket, completion).
#[derive(Debug, Clone, thiserror::Error)]
pub enum RegistryError {
    #[error("payload declared too large: {0}")]
    PayloadTooLarge(String),

    #[error("request failed with status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("network error: {0}")]
    Network(String),

    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// Errors from moving bytes to a transfer destination.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TransferError {
    #[error("Transfer rejected with status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Transfer failed due to a network error: {0}")]
    Network(String),

    #[error("Transfer timed out after {}s", .0.as_secs_f64())]
    Timeout(Duration),
}

/// Errors reading from a [`ByteSource`](crate::source::ByteSource).
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("range {offset}+{length} is outside a source of {total} bytes")]
    OutOfBounds { offset: u64, length: u64, total: u64 },

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Rejected status change; the task state machine only moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("invalid status transition {from} -> {to}")]
pub struct InvalidTransition {
    pub from: TaskStatus,
    pub to: TaskStatus,
}
