//! Upload scheduler: FIFO intake, bounded admission, task bookkeeping.
//!
//! Admission: a [`Semaphore`] with `max_concurrent` permits. A task moves from
//! `Queued` to `Hashing` only while holding a permit, and the permit is dropped
//! after the task reached a terminal status, so at most `max_concurrent` tasks
//! are active at any instant. Every submit and every release pops from the
//! queue head while permits are available.
//!
//! There is no cancellation: once admitted, a task runs until it finishes.

use std::path::Path;
use std::sync::Arc;

use tokio::sync::{broadcast, OwnedSemaphorePermit, Semaphore};

use mediaport_core::{
    mime_from_path, ByteSource, FileSource, SourceError, TaskEvent, TaskId, TaskStatus,
    UploadError, UploadTask, UploaderConfig,
};
use mediaport_processing::MediaValidator;

use crate::context::UploadContext;
use crate::pipeline::UploadPipeline;
use crate::task::{TaskBoard, TaskHandle};

/// Broadcast buffer for task events. Slow subscribers lag rather than block.
pub const EVENT_CHANNEL_CAPACITY: usize = 1024;

#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    #[error("Task not found: {0}")]
    NotFound(TaskId),

    #[error("Task {id} is {status} and cannot be removed until it finishes")]
    TaskActive { id: TaskId, status: TaskStatus },
}

/// One file to upload.
#[derive(Clone)]
pub struct UploadRequest {
    pub filename: String,
    pub mime_type: String,
    pub source: Arc<dyn ByteSource>,
}

impl UploadRequest {
    pub fn new(
        filename: impl Into<String>,
        mime_type: impl Into<String>,
        source: Arc<dyn ByteSource>,
    ) -> Self {
        Self {
            filename: filename.into(),
            mime_type: mime_type.into(),
            source,
        }
    }

    /// Request for a local file, with the MIME type guessed from its extension.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self, SourceError> {
        let path = path.as_ref();
        let source = FileSource::open(path).await?;
        Ok(Self::new(
            source.filename(),
            mime_from_path(path),
            Arc::new(source),
        ))
    }
}

struct SchedulerInner {
    pipeline: UploadPipeline,
    validator: MediaValidator,
    permits: Arc<Semaphore>,
    max_concurrent: usize,
    board: Arc<TaskBoard>,
}

/// Cheap to clone; clones share the same queue and tasks.
///
/// Must be used from within a Tokio runtime: admitted tasks are spawned onto it.
#[derive(Clone)]
pub struct UploadScheduler {
    inner: Arc<SchedulerInner>,
}

impl UploadScheduler {
    pub fn new(config: &UploaderConfig, context: UploadContext) -> Self {
        let max_concurrent = config.max_concurrent.max(1);
        Self {
            inner: Arc::new(SchedulerInner {
                pipeline: UploadPipeline::new(config, context),
                validator: MediaValidator::from_config(config),
                permits: Arc::new(Semaphore::new(max_concurrent)),
                max_concurrent,
                board: Arc::new(TaskBoard::new(EVENT_CHANNEL_CAPACITY)),
            }),
        }
    }

    /// Create one task per request and admit as many as capacity allows.
    ///
    /// Requests failing validation become `Error` tasks immediately and never
    /// enter the queue. Returned ids are in request order.
    #[tracing::instrument(skip_all)]
    pub fn submit(&self, requests: impl IntoIterator<Item = UploadRequest>) -> Vec<TaskId> {
        let mut ids = Vec::new();
        let mut rejected = false;
        {
            let mut state = self.inner.board.lock();
            for request in requests {
                let mut task = UploadTask::new(
                    request.filename,
                    request.source.total_length(),
                    request.mime_type,
                );
                ids.push(task.id);

                match self.inner.validator.validate_all(
                    &task.filename,
                    &task.mime_type,
                    task.size_bytes,
                ) {
                    Ok(()) => {
                        tracing::info!(
                            task_id = %task.id,
                            filename = %task.filename,
                            bytes = task.size_bytes,
                            "Upload task queued"
                        );
                        state.queue.push_back(task.id);
                        self.inner.board.publish(&task);
                        state.insert(task, Some(request.source));
                    }
                    Err(e) => {
                        tracing::info!(
                            task_id = %task.id,
                            filename = %task.filename,
                            code = e.error_code(),
                            error = %e,
                            "Upload rejected"
                        );
                        reject(&mut task, &e);
                        self.inner.board.publish(&task);
                        state.insert(task, None);
                        rejected = true;
                    }
                }
            }
        }

        Self::admit(&self.inner);
        if rejected {
            self.inner.board.notify_if_idle();
        }
        ids
    }

    pub fn submit_one(&self, request: UploadRequest) -> TaskId {
        self.submit([request])[0]
    }

    /// Remove a queued or finished task. Queued tasks are dropped without any
    /// network activity; finished tasks release their byte source.
    pub fn remove(&self, id: TaskId) -> Result<UploadTask, SchedulerError> {
        let entry = {
            let mut state = self.inner.board.lock();
            let status = state
                .entries
                .get(&id)
                .map(|e| e.task.status)
                .ok_or(SchedulerError::NotFound(id))?;
            if status.is_active() {
                return Err(SchedulerError::TaskActive { id, status });
            }
            state.remove(id).ok_or(SchedulerError::NotFound(id))?
        };

        tracing::info!(task_id = %id, status = %entry.task.status, "Upload task removed");
        self.inner.board.notify_if_idle();
        Ok(entry.task)
    }

    pub fn task(&self, id: TaskId) -> Option<UploadTask> {
        self.inner
            .board
            .lock()
            .entries
            .get(&id)
            .map(|e| e.task.clone())
    }

    /// Snapshots of every tracked task, in submission order.
    pub fn tasks(&self) -> Vec<UploadTask> {
        let state = self.inner.board.lock();
        state
            .order
            .iter()
            .filter_map(|id| state.entries.get(id).map(|e| e.task.clone()))
            .collect()
    }

    pub fn active_count(&self) -> usize {
        self.inner.board.lock().count(TaskStatus::is_active)
    }

    pub fn queued_count(&self) -> usize {
        self.inner.board.lock().queue.len()
    }

    pub fn max_concurrent(&self) -> usize {
        self.inner.max_concurrent
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TaskEvent> {
        self.inner.board.subscribe()
    }

    /// Resolves once no task is queued or active.
    pub async fn wait_idle(&self) {
        self.inner.board.wait_idle().await
    }

    fn admit(inner: &Arc<SchedulerInner>) {
        loop {
            let permit = match inner.permits.clone().try_acquire_owned() {
                Ok(permit) => permit,
                Err(_) => return,
            };

            let Some((id, source)) = Self::next_queued(inner) else {
                drop(permit);
                return;
            };

            let inner_clone = inner.clone();
            tokio::spawn(async move {
                Self::run_task(inner_clone, id, source, permit).await;
            });
        }
    }

    /// Pop the queue head and move it to `Hashing`.
    fn next_queued(inner: &SchedulerInner) -> Option<(TaskId, Arc<dyn ByteSource>)> {
        let mut state = inner.board.lock();
        while let Some(id) = state.queue.pop_front() {
            let Some(entry) = state.entries.get_mut(&id) else {
                continue;
            };
            let Some(source) = entry.source.clone() else {
                continue;
            };
            let task = &mut entry.task;
            match task.status.transition(TaskStatus::Hashing) {
                Ok(status) => {
                    task.status = status;
                    tracing::info!(task_id = %id, "Upload task admitted");
                    inner.board.publish(task);
                    return Some((id, source));
                }
                Err(e) => {
                    tracing::error!(task_id = %id, error = %e, "Queued task in unexpected state");
                }
            }
        }
        None
    }

    async fn run_task(
        inner: Arc<SchedulerInner>,
        id: TaskId,
        source: Arc<dyn ByteSource>,
        permit: OwnedSemaphorePermit,
    ) {
        let handle = TaskHandle::new(id, inner.board.clone());
        inner.pipeline.run(handle, source).await;

        drop(permit);
        inner.board.notify_if_idle();
        Self::admit(&inner);
    }
}

fn reject(task: &mut UploadTask, error: &UploadError) {
    task.status = TaskStatus::Error;
    task.progress = 100;
    task.set_error(error);
    task.finished_at = Some(chrono::Utc::now());
}
