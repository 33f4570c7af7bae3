use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter, Result as FmtResult};
use std::sync::Arc;

use crate::error::SourceError;
use crate::source::{ByteSource, MemorySource};

/// Content-derived dedup key: lowercase hex SHA-256.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn from_digest(digest: &[u8]) -> Self {
        Fingerprint(hex::encode(digest))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for Fingerprint {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(&self.0)
    }
}

/// Asset already present in the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExistingAsset {
    pub asset_id: String,
    pub filename: Option<String>,
}

/// Result of a duplicate lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DuplicateCheck {
    Unique,
    Duplicate(ExistingAsset),
}

/// Duplicate check wire response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DuplicateCheckResponse {
    pub is_duplicate: bool,
    pub existing_asset_id: Option<String>,
    pub existing_filename: Option<String>,
}

impl From<DuplicateCheckResponse> for DuplicateCheck {
    fn from(response: DuplicateCheckResponse) -> Self {
        match (response.is_duplicate, response.existing_asset_id) {
            (true, Some(asset_id)) => DuplicateCheck::Duplicate(ExistingAsset {
                asset_id,
                filename: response.existing_filename,
            }),
            // A positive match without an id cannot be linked to; treat as unique.
            _ => DuplicateCheck::Unique,
        }
    }
}

/// Write ticket request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketRequest {
    pub filename: String,
    pub mime_type: String,
    pub size_bytes: u64,
    pub fingerprint: Fingerprint,
}

/// Short-lived grant authorizing a single transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WriteTicket {
    pub transfer_destination: String,
    pub asset_id: String,
}

/// Final metadata acknowledged by the storage authority.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionNotice {
    pub asset_id: String,
    pub final_size_bytes: u64,
    pub fingerprint: Fingerprint,
}

/// Content to transfer together with its content type. Bytes are read from the
/// source on demand, so a payload never holds a whole file by itself.
#[derive(Clone)]
pub struct Payload {
    pub source: Arc<dyn ByteSource>,
    pub mime_type: String,
}

impl Payload {
    pub fn new(source: Arc<dyn ByteSource>, mime_type: impl Into<String>) -> Self {
        Self {
            source,
            mime_type: mime_type.into(),
        }
    }

    /// Payload over an in-memory buffer, e.g. a transcoded image.
    pub fn from_bytes(bytes: impl Into<Bytes>, mime_type: impl Into<String>) -> Self {
        Self::new(Arc::new(MemorySource::new(bytes)), mime_type)
    }

    pub fn len(&self) -> u64 {
        self.source.total_length()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Read the whole payload into memory.
    pub async fn bytes(&self) -> Result<Bytes, SourceError> {
        self.source.read_all().await
    }
}

impl fmt::Debug for Payload {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("Payload")
            .field("len", &self.len())
            .field("mime_type", &self.mime_type)
            .finish()
    }
}
