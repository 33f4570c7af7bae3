//! Per-file upload pipeline.
//!
//! Drives one admitted task from `Hashing` to a terminal status:
//! fingerprint, duplicate check (fail-open), transcode, ticket, transfer,
//! completion. Any step's failure ends the task in `Error`; nothing is retried.

use std::sync::Arc;
use std::time::Duration;

use mediaport_core::models::{CompletionNotice, TicketRequest};
use mediaport_core::{
    ByteSource, DuplicateCheck, LogLevel, Payload, TaskStatus, TransferError, TransferProgress,
    UploadError, UploaderConfig,
};
use mediaport_processing::{sanitize_filename, webp_filename, FingerprintEngine};

use crate::context::UploadContext;
use crate::progress::Stage;
use crate::task::TaskHandle;

pub struct UploadPipeline {
    context: UploadContext,
    fingerprints: FingerprintEngine,
    transfer_timeout: Duration,
}

impl UploadPipeline {
    pub fn new(config: &UploaderConfig, context: UploadContext) -> Self {
        Self {
            context,
            fingerprints: FingerprintEngine::from_config(config),
            transfer_timeout: config.transfer_timeout(),
        }
    }

    /// Run the task to completion. The task is already `Hashing` when this is
    /// called and is terminal when it returns.
    #[tracing::instrument(skip_all, fields(task_id = %task.id()))]
    pub async fn run(&self, task: TaskHandle, source: Arc<dyn ByteSource>) {
        if let Err(e) = self.execute(&task, &source).await {
            log_failure(&task, &e);
            task.fail(&e);
            return;
        }

        if let Some(snapshot) = task.snapshot() {
            tracing::info!(
                status = %snapshot.status,
                asset_id = snapshot.assigned_asset_id.as_deref().unwrap_or(""),
                bytes = snapshot.transfer_size_bytes.unwrap_or(0),
                "Upload task finished"
            );
        }
    }

    async fn execute(
        &self,
        task: &TaskHandle,
        source: &Arc<dyn ByteSource>,
    ) -> Result<(), UploadError> {
        let hashed = |done: u64, total: u64| task.advance(Stage::Hashing.at(done, total));
        let fingerprint = self
            .fingerprints
            .fingerprint_with_progress(source.as_ref(), &hashed)
            .await?;
        task.record_fingerprint(fingerprint.clone())?;
        task.advance(Stage::Hashing.end());

        task.transition(TaskStatus::CheckingDuplicate)?;
        match self.context.registry.check_duplicate(&fingerprint).await {
            Ok(DuplicateCheck::Duplicate(existing)) => {
                tracing::debug!(
                    fingerprint = %fingerprint,
                    asset_id = %existing.asset_id,
                    "Content already stored"
                );
                return task.finish_duplicate(existing);
            }
            Ok(DuplicateCheck::Unique) => {}
            Err(e) => {
                tracing::warn!(
                    fingerprint = %fingerprint,
                    error = %e,
                    "Duplicate check failed, continuing upload"
                );
            }
        }

        task.transition(TaskStatus::Transcoding)?;
        let snapshot = task
            .snapshot()
            .ok_or_else(|| UploadError::Internal(format!("task {} vanished", task.id())))?;
        let original = Payload::new(source.clone(), snapshot.mime_type.clone());
        let outcome = self.context.transcoder.transcode(original).await;
        tracing::debug!(decision = ?outcome.decision, "Transcode finished");

        let transcoded = outcome.is_transcoded();
        let payload = outcome.payload;
        let filename = if transcoded {
            sanitize_filename(&webp_filename(&snapshot.filename))
        } else {
            sanitize_filename(&snapshot.filename)
        };
        task.record_payload(transcoded, payload.len())?;

        task.transition(TaskStatus::Transferring)?;
        let ticket = self
            .context
            .registry
            .request_ticket(&TicketRequest {
                filename,
                mime_type: payload.mime_type.clone(),
                size_bytes: payload.len(),
                fingerprint: fingerprint.clone(),
            })
            .await
            .map_err(UploadError::TicketRejected)?;
        task.assign_asset(&ticket.asset_id)?;
        task.advance(Stage::Ticket.end());

        let progress: TransferProgress = {
            let task = task.clone();
            Arc::new(move |sent, total| task.advance(Stage::Transfer.at(sent, total)))
        };
        let transfer = self
            .context
            .transport
            .put(&ticket.transfer_destination, &payload, progress);
        match tokio::time::timeout(self.transfer_timeout, transfer).await {
            Ok(result) => result?,
            Err(_) => return Err(TransferError::Timeout(self.transfer_timeout).into()),
        }
        task.advance(Stage::Transfer.end());

        task.transition(TaskStatus::Completing)?;
        self.context
            .registry
            .complete_upload(&CompletionNotice {
                asset_id: ticket.asset_id.clone(),
                final_size_bytes: payload.len(),
                fingerprint,
            })
            .await
            .map_err(|source| UploadError::CompletionUnacknowledged {
                asset_id: ticket.asset_id.clone(),
                source,
            })?;

        task.finish_done()
    }
}

fn log_failure(task: &TaskHandle, error: &UploadError) {
    let task_id = task.id();
    let code = error.error_code();
    match error.log_level() {
        LogLevel::Debug => {
            tracing::debug!(task_id = %task_id, code, error = %error, "Upload task failed")
        }
        LogLevel::Warn => {
            tracing::warn!(task_id = %task_id, code, error = %error, "Upload task failed")
        }
        LogLevel::Error => {
            tracing::error!(task_id = %task_id, code, error = %error, "Upload task failed")
        }
    }
}
