use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use uuid::Uuid;

use super::asset::Fingerprint;
use crate::error::{ErrorKind, InvalidTransition, UploadError};

/// Caller-visible task identifier, stable for the task's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(Uuid);

impl TaskId {
    pub fn new() -> Self {
        TaskId(Uuid::new_v4())
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for TaskId {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        self.0.fmt(f)
    }
}

/// Upload task status.
///
/// ```text
/// Queued -> Hashing -> CheckingDuplicate -> Duplicate
///                                    \-> Transcoding -> Transferring -> Completing -> Done
/// any non-terminal status -> Error
/// ```
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Queued,
    Hashing,
    CheckingDuplicate,
    Transcoding,
    Transferring,
    Completing,
    Done,
    Duplicate,
    Error,
}

impl TaskStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TaskStatus::Done | TaskStatus::Duplicate | TaskStatus::Error
        )
    }

    /// Holding a concurrency slot: admitted and not yet terminal.
    pub fn is_active(self) -> bool {
        !self.is_terminal() && self != TaskStatus::Queued
    }

    pub fn can_transition_to(self, next: TaskStatus) -> bool {
        use TaskStatus::*;
        match (self, next) {
            (Done | Duplicate | Error, _) => false,
            (_, Error) => true,
            (Queued, Hashing) => true,
            (Hashing, CheckingDuplicate) => true,
            (CheckingDuplicate, Duplicate | Transcoding) => true,
            (Transcoding, Transferring) => true,
            (Transferring, Completing) => true,
            (Completing, Done) => true,
            _ => false,
        }
    }

    pub fn transition(self, next: TaskStatus) -> Result<TaskStatus, InvalidTransition> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(InvalidTransition {
                from: self,
                to: next,
            })
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Queued => "queued",
            TaskStatus::Hashing => "hashing",
            TaskStatus::CheckingDuplicate => "checking_duplicate",
            TaskStatus::Transcoding => "transcoding",
            TaskStatus::Transferring => "transferring",
            TaskStatus::Completing => "completing",
            TaskStatus::Done => "done",
            TaskStatus::Duplicate => "duplicate",
            TaskStatus::Error => "error",
        }
    }
}

impl Display for TaskStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "queued" => Ok(TaskStatus::Queued),
            "hashing" => Ok(TaskStatus::Hashing),
            "checking_duplicate" => Ok(TaskStatus::CheckingDuplicate),
            "transcoding" => Ok(TaskStatus::Transcoding),
            "transferring" => Ok(TaskStatus::Transferring),
            "completing" => Ok(TaskStatus::Completing),
            "done" => Ok(TaskStatus::Done),
            "duplicate" => Ok(TaskStatus::Duplicate),
            "error" => Ok(TaskStatus::Error),
            _ => Err(anyhow::anyhow!("Invalid task status: {}", s)),
        }
    }
}

/// Caller-visible snapshot of one upload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadTask {
    pub id: TaskId,
    pub filename: String,
    pub size_bytes: u64,
    pub mime_type: String,
    pub status: TaskStatus,
    /// Percent 0-100, never decreases; 100 exactly when terminal.
    pub progress: u8,
    pub fingerprint: Option<Fingerprint>,
    /// Ticketed asset id, or the existing asset's id when `status == Duplicate`.
    pub assigned_asset_id: Option<String>,
    /// Filename of the existing asset when `status == Duplicate`.
    pub existing_filename: Option<String>,
    /// Present only when `status == Error`, as are `error_code` and `error_kind`.
    pub error_message: Option<String>,
    /// Machine-readable code, e.g. `COMPLETION_UNACKNOWLEDGED`.
    pub error_code: Option<String>,
    pub error_kind: Option<ErrorKind>,
    /// Whether the transferred payload is a re-encoded version of the source.
    pub transcoded: bool,
    /// Bytes actually sent (after transcoding), once known.
    pub transfer_size_bytes: Option<u64>,
    pub submitted_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl UploadTask {
    pub fn new(filename: String, size_bytes: u64, mime_type: String) -> Self {
        Self {
            id: TaskId::new(),
            filename,
            size_bytes,
            mime_type,
            status: TaskStatus::Queued,
            progress: 0,
            fingerprint: None,
            assigned_asset_id: None,
            existing_filename: None,
            error_message: None,
            error_code: None,
            error_kind: None,
            transcoded: false,
            transfer_size_bytes: None,
            submitted_at: Utc::now(),
            finished_at: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Record the error that ended the task. Does not change the status.
    pub fn set_error(&mut self, error: &UploadError) {
        self.error_message = Some(error.to_string());
        self.error_code = Some(error.error_code().to_string());
        self.error_kind = Some(error.kind());
    }
}

/// Update published whenever a task's status or integer progress changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskEvent {
    pub task_id: TaskId,
    pub status: TaskStatus,
    pub progress: u8,
    pub assigned_asset_id: Option<String>,
    pub error_message: Option<String>,
    pub error_code: Option<String>,
    pub error_kind: Option<ErrorKind>,
}

impl From<&UploadTask> for TaskEvent {
    fn from(task: &UploadTask) -> Self {
        Self {
            task_id: task.id,
            status: task.status,
            progress: task.progress,
            assigned_asset_id: task.assigned_asset_id.clone(),
            error_message: task.error_message.clone(),
            error_code: task.error_code.clone(),
            error_kind: task.error_kind,
        }
    }
}
