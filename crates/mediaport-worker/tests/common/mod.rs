#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::Semaphore;

use mediaport_core::models::{CompletionNotice, TicketRequest};
use mediaport_core::{
    AssetRegistry, ByteSource, ByteTransport, DuplicateCheck, ExistingAsset, Fingerprint,
    MemorySource, Payload, RegistryError, SourceError, TaskId, TransferError, TransferProgress,
    UploadTask, UploaderConfig, WriteTicket,
};
use mediaport_worker::{UploadContext, UploadRequest, UploadScheduler};

/// In-process storage authority that records every call.
#[derive(Default)]
pub struct FakeRegistry {
    pub known: Mutex<HashMap<Fingerprint, ExistingAsset>>,
    pub fail_duplicate_check: bool,
    pub ticket_error: Option<RegistryError>,
    pub fail_completion: bool,
    pub duplicate_checks: AtomicUsize,
    pub tickets: Mutex<Vec<TicketRequest>>,
    pub completions: Mutex<Vec<CompletionNotice>>,
}

impl FakeRegistry {
    pub fn knowing(fingerprint: Fingerprint, asset_id: &str) -> Self {
        let registry = Self::default();
        registry.known.lock().unwrap().insert(
            fingerprint,
            ExistingAsset {
                asset_id: asset_id.to_string(),
                filename: Some("original.png".to_string()),
            },
        );
        registry
    }

    pub fn ticket_count(&self) -> usize {
        self.tickets.lock().unwrap().len()
    }

    pub fn completion_count(&self) -> usize {
        self.completions.lock().unwrap().len()
    }

    pub fn network_calls(&self) -> usize {
        self.duplicate_checks.load(Ordering::SeqCst) + self.ticket_count() + self.completion_count()
    }
}

#[async_trait]
impl AssetRegistry for FakeRegistry {
    async fn check_duplicate(
        &self,
        fingerprint: &Fingerprint,
    ) -> Result<DuplicateCheck, RegistryError> {
        self.duplicate_checks.fetch_add(1, Ordering::SeqCst);
        if self.fail_duplicate_check {
            return Err(RegistryError::Status {
                status: 502,
                body: "bad gateway".to_string(),
            });
        }
        Ok(match self.known.lock().unwrap().get(fingerprint) {
            Some(existing) => DuplicateCheck::Duplicate(existing.clone()),
            None => DuplicateCheck::Unique,
        })
    }

    async fn request_ticket(&self, request: &TicketRequest) -> Result<WriteTicket, RegistryError> {
        let mut tickets = self.tickets.lock().unwrap();
        tickets.push(request.clone());
        if let Some(err) = &self.ticket_error {
            return Err(err.clone());
        }
        Ok(WriteTicket {
            transfer_destination: format!("mem://{}", request.filename),
            asset_id: format!("asset-{}", tickets.len()),
        })
    }

    async fn complete_upload(&self, notice: &CompletionNotice) -> Result<(), RegistryError> {
        self.completions.lock().unwrap().push(notice.clone());
        if self.fail_completion {
            return Err(RegistryError::Status {
                status: 500,
                body: "database unavailable".to_string(),
            });
        }
        Ok(())
    }
}

/// Bytes that reached a destination.
#[derive(Debug, Clone)]
pub struct Received {
    pub destination: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

/// Chunk size the fake transport reads payloads with.
pub const FAKE_CHUNK: u64 = 64 * 1024;

/// In-process transport. Optionally gated: each put waits for one permit.
#[derive(Default)]
pub struct FakeTransport {
    pub gate: Option<Arc<Semaphore>>,
    /// Destinations containing this marker are rejected with 500.
    pub fail_marker: Option<String>,
    pub received: Mutex<Vec<Received>>,
    pub in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
}

impl FakeTransport {
    pub fn gated() -> (Self, Arc<Semaphore>) {
        let gate = Arc::new(Semaphore::new(0));
        (
            Self {
                gate: Some(gate.clone()),
                ..Self::default()
            },
            gate,
        )
    }

    pub fn failing(marker: &str) -> Self {
        Self {
            fail_marker: Some(marker.to_string()),
            ..Self::default()
        }
    }

    pub fn put_count(&self) -> usize {
        self.received.lock().unwrap().len()
    }

    pub fn bytes_sent(&self) -> u64 {
        self.received
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.bytes.len() as u64)
            .sum()
    }
}

#[async_trait]
impl ByteTransport for FakeTransport {
    async fn put(
        &self,
        destination: &str,
        payload: &Payload,
        progress: TransferProgress,
    ) -> Result<(), TransferError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let total = payload.len();
        progress(total / 2, total);
        if let Some(gate) = &self.gate {
            if let Ok(permit) = gate.acquire().await {
                permit.forget();
            }
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if let Some(marker) = &self.fail_marker {
            if destination.contains(marker.as_str()) {
                return Err(TransferError::Status {
                    status: 500,
                    body: "disk full".to_string(),
                });
            }
        }

        let mut bytes = Vec::with_capacity(total as usize);
        let mut offset = 0;
        while offset < total {
            let length = FAKE_CHUNK.min(total - offset);
            let chunk = payload
                .source
                .read_range(offset, length)
                .await
                .map_err(|e| TransferError::Network(e.to_string()))?;
            bytes.extend_from_slice(&chunk);
            offset += length;
        }

        progress(total, total);
        self.received.lock().unwrap().push(Received {
            destination: destination.to_string(),
            mime_type: payload.mime_type.clone(),
            bytes,
        });
        Ok(())
    }
}

/// Source that reports a size without holding the bytes, and counts reads.
pub struct SizedSource {
    pub len: u64,
    pub reads: AtomicUsize,
    /// Largest single read so far.
    pub max_read: AtomicU64,
}

impl SizedSource {
    pub fn new(len: u64) -> Self {
        Self {
            len,
            reads: AtomicUsize::new(0),
            max_read: AtomicU64::new(0),
        }
    }
}

#[async_trait]
impl ByteSource for SizedSource {
    fn total_length(&self) -> u64 {
        self.len
    }

    async fn read_range(&self, _offset: u64, length: u64) -> Result<Bytes, SourceError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.max_read.fetch_max(length, Ordering::SeqCst);
        Ok(Bytes::from(vec![0u8; length as usize]))
    }
}

pub fn config(max_concurrent: usize) -> UploaderConfig {
    UploaderConfig {
        max_concurrent,
        transcode_enabled: false,
        ..UploaderConfig::default()
    }
}

pub fn scheduler(
    config: &UploaderConfig,
    registry: Arc<FakeRegistry>,
    transport: Arc<FakeTransport>,
) -> UploadScheduler {
    UploadScheduler::new(
        config,
        UploadContext::without_transcoding(registry, transport),
    )
}

pub fn png_request(name: &str, content: &[u8]) -> UploadRequest {
    UploadRequest::new(
        name,
        "image/png",
        Arc::new(MemorySource::new(content.to_vec())),
    )
}

/// Poll until `pred` holds for the task, failing the test after 5 seconds.
pub async fn wait_for_task(
    scheduler: &UploadScheduler,
    id: TaskId,
    pred: impl Fn(&UploadTask) -> bool,
) -> UploadTask {
    let result = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            if let Some(task) = scheduler.task(id) {
                if pred(&task) {
                    return task;
                }
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await;
    result.expect("task did not reach the expected state in time")
}

pub async fn wait_idle(scheduler: &UploadScheduler) {
    tokio::time::timeout(Duration::from_secs(10), scheduler.wait_idle())
        .await
        .expect("scheduler did not become idle in time");
}
