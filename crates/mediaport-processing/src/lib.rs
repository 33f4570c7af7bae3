//! Mediaport Processing Library
//!
//! Per-file work done by an upload task before and around the network calls:
//! admission validation, content fingerprinting, and optional WebP transcoding.

pub mod compression;
pub mod error;
pub mod filename;
pub mod fingerprint;
pub mod image;
pub mod transcoder;
pub mod validator;

// Re-export commonly used types
pub use compression::WebpCompressor;
pub use error::TranscodeError;
pub use filename::{sanitize_filename, webp_filename};
pub use fingerprint::{FingerprintEngine, HashProgress};
pub use transcoder::{
    ImageTranscoder, PassthroughTranscoder, PayloadTranscoder, SkipReason, TranscodeDecision,
    TranscodeOutcome, TranscodeSettings,
};
pub use validator::MediaValidator;
