//! Domain models: upload tasks, their status machine, and storage authority wire types.

pub mod asset;
pub mod task;

pub use asset::{
    CompletionNotice, DuplicateCheck, DuplicateCheckResponse, ExistingAsset, Fingerprint, Payload,
    TicketRequest, WriteTicket,
};
pub use task::{TaskEvent, TaskId, TaskStatus, UploadTask};
