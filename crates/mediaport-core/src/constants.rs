//! Shared size and limit constants.

/// One mebibyte. All `*_MB` configuration values are multiplied by this.
pub const MIB: u64 = 1024 * 1024;

pub const DEFAULT_MAX_CONCURRENT: usize = 2;
pub const DEFAULT_MAX_FILE_SIZE_MB: u64 = 50;
pub const DEFAULT_HASH_FULL_READ_THRESHOLD_MB: u64 = 5;
pub const DEFAULT_HASH_SAMPLE_BYTES: u64 = MIB;
pub const DEFAULT_TRANSCODE_MAX_DIMENSION_PX: u32 = 2400;
pub const DEFAULT_TRANSCODE_SKIP_ABOVE_MB: u64 = 15;
pub const DEFAULT_TRANSCODE_QUALITY: f32 = 82.0;
pub const DEFAULT_TRANSFER_TIMEOUT_MS: u64 = 300_000;

/// Raster formats accepted for upload unless overridden.
pub const DEFAULT_ACCEPTED_MIME_TYPES: &[&str] = &[
    "image/jpeg",
    "image/png",
    "image/webp",
    "image/gif",
    "image/avif",
];

/// Fallback content type for unknown extensions.
pub const OCTET_STREAM: &str = "application/octet-stream";
