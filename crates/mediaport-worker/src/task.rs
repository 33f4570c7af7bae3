//! Task board and per-task handles.
//!
//! The board is the only state shared between the scheduler and running tasks:
//! task snapshots in submission order, the FIFO of queued ids, and the byte
//! source each task reads from. Every mutation goes through [`TaskBoard::update`]
//! so progress stays monotonic. A [`TaskEvent`] is published only when status or
//! integer progress changed.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;
use tokio::sync::{broadcast, Notify};

use mediaport_core::{
    ByteSource, ExistingAsset, Fingerprint, TaskEvent, TaskId, TaskStatus, UploadError,
    UploadTask,
};

pub(crate) struct Entry {
    pub task: UploadTask,
    /// Dropped when the task is removed.
    pub source: Option<Arc<dyn ByteSource>>,
}

#[derive(Default)]
pub(crate) struct BoardState {
    pub order: Vec<TaskId>,
    pub entries: HashMap<TaskId, Entry>,
    pub queue: VecDeque<TaskId>,
}

impl BoardState {
    pub fn insert(&mut self, task: UploadTask, source: Option<Arc<dyn ByteSource>>) {
        let id = task.id;
        self.order.push(id);
        self.entries.insert(id, Entry { task, source });
    }

    pub fn remove(&mut self, id: TaskId) -> Option<Entry> {
        let entry = self.entries.remove(&id)?;
        self.order.retain(|t| *t != id);
        self.queue.retain(|t| *t != id);
        Some(entry)
    }

    pub fn is_idle(&self) -> bool {
        self.entries.values().all(|e| e.task.is_terminal())
    }

    pub fn count(&self, pred: impl Fn(TaskStatus) -> bool) -> usize {
        self.entries.values().filter(|e| pred(e.task.status)).count()
    }
}

pub(crate) struct TaskBoard {
    state: Mutex<BoardState>,
    events: broadcast::Sender<TaskEvent>,
    idle: Notify,
}

impl TaskBoard {
    pub fn new(event_capacity: usize) -> Self {
        let (events, _) = broadcast::channel(event_capacity.max(1));
        Self {
            state: Mutex::new(BoardState::default()),
            events,
            idle: Notify::new(),
        }
    }

    /// Board mutations never leave the state half-updated, so a poisoned lock
    /// is still consistent.
    pub fn lock(&self) -> MutexGuard<'_, BoardState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TaskEvent> {
        self.events.subscribe()
    }

    pub fn publish(&self, task: &UploadTask) {
        // No receivers is fine.
        let _ = self.events.send(TaskEvent::from(task));
    }

    pub fn notify_if_idle(&self) {
        if self.lock().is_idle() {
            self.idle.notify_waiters();
        }
    }

    pub async fn wait_idle(&self) {
        loop {
            let notified = self.idle.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.lock().is_idle() {
                return;
            }
            notified.await;
        }
    }

    /// Apply `f` to the task's snapshot, then clamp progress and publish.
    ///
    /// Progress never decreases, stays below 100 until the task is terminal, and
    /// is exactly 100 once it is. Terminal snapshots are frozen: `f` is not run.
    pub fn update<R>(
        &self,
        id: TaskId,
        f: impl FnOnce(&mut UploadTask) -> Result<R, UploadError>,
    ) -> Result<R, UploadError> {
        let mut state = self.lock();
        let entry = state
            .entries
            .get_mut(&id)
            .ok_or_else(|| UploadError::Internal(format!("task {} is no longer tracked", id)))?;
        let task = &mut entry.task;
        if task.is_terminal() {
            return Err(UploadError::Internal(format!(
                "task {} already finished as {}",
                id, task.status
            )));
        }

        let before = (task.status, task.progress);
        let mut next = task.clone();
        let result = f(&mut next)?;

        next.progress = if next.is_terminal() {
            next.finished_at = Some(Utc::now());
            100
        } else {
            next.progress.max(before.1).min(99)
        };
        *task = next;

        if (task.status, task.progress) != before {
            self.publish(task);
        }
        Ok(result)
    }
}

/// Write access to one task's snapshot, held by the pipeline driving it.
#[derive(Clone)]
pub struct TaskHandle {
    id: TaskId,
    board: Arc<TaskBoard>,
}

impl TaskHandle {
    pub(crate) fn new(id: TaskId, board: Arc<TaskBoard>) -> Self {
        Self { id, board }
    }

    pub fn id(&self) -> TaskId {
        self.id
    }

    pub fn snapshot(&self) -> Option<UploadTask> {
        self.board.lock().entries.get(&self.id).map(|e| e.task.clone())
    }

    pub fn transition(&self, next: TaskStatus) -> Result<(), UploadError> {
        self.board.update(self.id, |task| {
            task.status = task.status.transition(next)?;
            tracing::debug!(task_id = %task.id, status = %task.status, "Task status changed");
            Ok(())
        })
    }

    /// Raise progress to `percent`. Lower values and updates to finished tasks
    /// are ignored.
    pub fn advance(&self, percent: u8) {
        let _ = self.board.update(self.id, |task| {
            task.progress = task.progress.max(percent);
            Ok(())
        });
    }

    pub fn record_fingerprint(&self, fingerprint: Fingerprint) -> Result<(), UploadError> {
        self.board.update(self.id, |task| {
            task.fingerprint = Some(fingerprint);
            Ok(())
        })
    }

    pub fn record_payload(
        &self,
        transcoded: bool,
        transfer_size_bytes: u64,
    ) -> Result<(), UploadError> {
        self.board.update(self.id, |task| {
            task.transcoded = transcoded;
            task.transfer_size_bytes = Some(transfer_size_bytes);
            Ok(())
        })
    }

    pub fn assign_asset(&self, asset_id: &str) -> Result<(), UploadError> {
        self.board.update(self.id, |task| {
            task.assigned_asset_id = Some(asset_id.to_string());
            Ok(())
        })
    }

    pub fn finish_duplicate(&self, existing: ExistingAsset) -> Result<(), UploadError> {
        self.board.update(self.id, |task| {
            task.status = task.status.transition(TaskStatus::Duplicate)?;
            task.assigned_asset_id = Some(existing.asset_id);
            task.existing_filename = existing.filename;
            Ok(())
        })
    }

    pub fn finish_done(&self) -> Result<(), UploadError> {
        self.board.update(self.id, |task| {
            task.status = task.status.transition(TaskStatus::Done)?;
            Ok(())
        })
    }

    pub fn fail(&self, error: &UploadError) {
        let result = self.board.update(self.id, |task| {
            task.status = task.status.transition(TaskStatus::Error)?;
            task.set_error(error);
            Ok(())
        });
        if let Err(e) = result {
            tracing::error!(task_id = %self.id, error = %e, "Failed to record task error");
        }
    }
}
