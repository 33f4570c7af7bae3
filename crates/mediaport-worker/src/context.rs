//! Upload context
//!
//! Collaborators a task needs to move one file: the asset registry, the byte
//! transport, and the transcoder. The binary builds the concrete HTTP-backed
//! implementations; tests substitute in-process fakes.

use std::sync::Arc;

use mediaport_core::{AssetRegistry, ByteTransport};
use mediaport_processing::{PassthroughTranscoder, PayloadTranscoder};

#[derive(Clone)]
pub struct UploadContext {
    pub registry: Arc<dyn AssetRegistry>,
    pub transport: Arc<dyn ByteTransport>,
    pub transcoder: Arc<dyn PayloadTranscoder>,
}

impl UploadContext {
    pub fn new(
        registry: Arc<dyn AssetRegistry>,
        transport: Arc<dyn ByteTransport>,
        transcoder: Arc<dyn PayloadTranscoder>,
    ) -> Self {
        Self {
            registry,
            transport,
            transcoder,
        }
    }

    /// Context that transfers every payload unchanged.
    pub fn without_transcoding(
        registry: Arc<dyn AssetRegistry>,
        transport: Arc<dyn ByteTransport>,
    ) -> Self {
        Self::new(registry, transport, Arc::new(PassthroughTranscoder))
    }
}
