//! Mediaport Worker
//!
//! Bounded-concurrency upload scheduling: a FIFO of submitted files, admission
//! of at most `max_concurrent` active tasks, and the per-file pipeline that
//! drives each admitted task to `Done`, `Duplicate`, or `Error`.

pub mod context;
pub mod pipeline;
pub mod progress;
pub mod scheduler;
pub mod task;

pub use context::UploadContext;
pub use pipeline::UploadPipeline;
pub use progress::Stage;
pub use scheduler::{SchedulerError, UploadRequest, UploadScheduler, EVENT_CHANNEL_CAPACITY};
pub use task::TaskHandle;
