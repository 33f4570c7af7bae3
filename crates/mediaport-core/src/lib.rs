//! Mediaport Core Library
//!
//! This crate provides the domain model, error types, configuration, and the
//! collaborator contracts (asset registry, byte transport, byte sources) shared
//! by every Mediaport component.

pub mod config;
pub mod constants;
pub mod error;
pub mod models;
pub mod registry;
pub mod source;
pub mod transport;

// Re-export commonly used types
pub use config::{HashStrategy, UploaderConfig};
pub use error::{
    ErrorKind, InvalidTransition, LogLevel, RegistryError, SourceError, TransferError,
    UploadError,
};
pub use models::{
    DuplicateCheck, ExistingAsset, Fingerprint, Payload, TaskEvent, TaskId, TaskStatus,
    UploadTask, WriteTicket,
};
pub use registry::AssetRegistry;
pub use source::{mime_from_path, ByteSource, FileSource, MemorySource};
pub use transport::{ByteTransport, TransferProgress};
