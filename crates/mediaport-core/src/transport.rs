//! Byte transport contract.

use async_trait::async_trait;
use std::sync::Arc;

use crate::error::TransferError;
use crate::models::Payload;

/// Progress callback: `(bytes_sent, total_bytes)`. Called from the transport's
/// task; must not block.
pub type TransferProgress = Arc<dyn Fn(u64, u64) + Send + Sync>;

#[async_trait]
pub trait ByteTransport: Send + Sync {
    /// Send `payload` to `destination`, reporting byte-granularity progress.
    ///
    /// Returns once the destination acknowledged the bytes with a success status.
    /// Timeouts are enforced by the caller.
    async fn put(
        &self,
        destination: &str,
        payload: &Payload,
        progress: TransferProgress,
    ) -> Result<(), TransferError>;
}
