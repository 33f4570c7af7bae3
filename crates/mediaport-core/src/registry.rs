//! Asset registry contract.
//!
//! The storage authority owns the asset records. The uploader never writes them
//! directly; it asks for a write ticket and reports back after the transfer.

use async_trait::async_trait;

use crate::error::RegistryError;
use crate::models::{CompletionNotice, DuplicateCheck, Fingerprint, TicketRequest, WriteTicket};

#[async_trait]
pub trait AssetRegistry: Send + Sync {
    /// Look up an existing asset by fingerprint.
    async fn check_duplicate(&self, fingerprint: &Fingerprint)
        -> Result<DuplicateCheck, RegistryError>;

    /// Request a write ticket for a single transfer.
    ///
    /// A declared-too-large rejection comes back as [`RegistryError::PayloadTooLarge`].
    async fn request_ticket(&self, request: &TicketRequest) -> Result<WriteTicket, RegistryError>;

    /// Finalize the asset record after a confirmed transfer.
    async fn complete_upload(&self, notice: &CompletionNotice) -> Result<(), RegistryError>;
}
