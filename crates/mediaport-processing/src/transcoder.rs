//! Raster re-encoding to WebP.
//!
//! Eligible images are decoded, downscaled so the longer side fits the
//! configured maximum, and re-encoded as lossy WebP. The result replaces the
//! original only when it is strictly smaller; every failure falls back to the
//! original bytes.

use async_trait::async_trait;
use bytes::Bytes;
use image::GenericImageView;
use mediaport_core::{Payload, UploaderConfig};

use crate::compression::WebpCompressor;
use crate::error::TranscodeError;
use crate::image::ImageResize;

/// Content types the transcoder will decode. GIF is excluded to keep animation.
pub const TRANSCODABLE_MIME_TYPES: &[&str] = &[
    "image/jpeg",
    "image/png",
    "image/webp",
    "image/bmp",
    "image/tiff",
];

pub const WEBP_MIME_TYPE: &str = "image/webp";

#[derive(Debug, Clone)]
pub struct TranscodeSettings {
    pub enabled: bool,
    pub max_dimension_px: u32,
    pub skip_above_bytes: u64,
    pub quality: f32,
}

impl TranscodeSettings {
    pub fn from_config(config: &UploaderConfig) -> Self {
        Self {
            enabled: config.transcode_enabled,
            max_dimension_px: config.transcode_max_dimension_px,
            skip_above_bytes: config.transcode_skip_above_bytes,
            quality: config.transcode_quality,
        }
    }
}

impl Default for TranscodeSettings {
    fn default() -> Self {
        Self::from_config(&UploaderConfig::default())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    Disabled,
    UnsupportedType(String),
    TooLarge { size: u64, limit: u64 },
}

#[derive(Debug, Clone, PartialEq)]
pub enum TranscodeDecision {
    Skipped(SkipReason),
    Replaced {
        original_bytes: u64,
        transcoded_bytes: u64,
        width: u32,
        height: u32,
    },
    /// Re-encoding worked but was not smaller.
    KeptOriginal {
        original_bytes: u64,
        candidate_bytes: u64,
    },
    Failed(String),
}

#[derive(Debug, Clone)]
pub struct TranscodeOutcome {
    /// What to transfer.
    pub payload: Payload,
    pub decision: TranscodeDecision,
}

impl TranscodeOutcome {
    fn original(payload: Payload, decision: TranscodeDecision) -> Self {
        Self { payload, decision }
    }

    pub fn is_transcoded(&self) -> bool {
        matches!(self.decision, TranscodeDecision::Replaced { .. })
    }
}

/// Optional size-reduction step between duplicate check and transfer.
///
/// Implementations must not fail: anything that goes wrong yields the input
/// payload unchanged.
#[async_trait]
pub trait PayloadTranscoder: Send + Sync {
    async fn transcode(&self, payload: Payload) -> TranscodeOutcome;
}

/// Transcoder that passes every payload through untouched.
pub struct PassthroughTranscoder;

#[async_trait]
impl PayloadTranscoder for PassthroughTranscoder {
    async fn transcode(&self, payload: Payload) -> TranscodeOutcome {
        TranscodeOutcome::original(payload, TranscodeDecision::Skipped(SkipReason::Disabled))
    }
}

pub struct ImageTranscoder {
    settings: TranscodeSettings,
}

impl ImageTranscoder {
    pub fn new(settings: TranscodeSettings) -> Self {
        Self { settings }
    }

    pub fn from_config(config: &UploaderConfig) -> Self {
        Self::new(TranscodeSettings::from_config(config))
    }

    pub fn is_eligible(mime_type: &str) -> bool {
        let normalized = mime_type.to_lowercase();
        TRANSCODABLE_MIME_TYPES.iter().any(|m| *m == normalized)
    }

    fn skip_reason(&self, payload: &Payload) -> Option<SkipReason> {
        if !self.settings.enabled {
            return Some(SkipReason::Disabled);
        }
        if !Self::is_eligible(&payload.mime_type) {
            return Some(SkipReason::UnsupportedType(payload.mime_type.clone()));
        }
        if payload.len() > self.settings.skip_above_bytes {
            return Some(SkipReason::TooLarge {
                size: payload.len(),
                limit: self.settings.skip_above_bytes,
            });
        }
        None
    }

    /// Decode, downscale, encode. CPU-bound steps run on the blocking pool and
    /// the task yields between them.
    async fn reencode(&self, data: Bytes) -> Result<(Bytes, u32, u32), TranscodeError> {
        let decoded = tokio::task::spawn_blocking(move || {
            image::load_from_memory(&data).map_err(|e| TranscodeError::Decode(e.to_string()))
        })
        .await??;

        tokio::task::yield_now().await;

        let max_dimension = self.settings.max_dimension_px;
        let quality = self.settings.quality;
        let encoded = tokio::task::spawn_blocking(move || {
            let resized = ImageResize::downscale_to_fit(decoded, max_dimension);
            let (width, height) = resized.dimensions();
            WebpCompressor::compress(&resized, quality).map(|bytes| (bytes, width, height))
        })
        .await??;

        tokio::task::yield_now().await;
        Ok(encoded)
    }
}

#[async_trait]
impl PayloadTranscoder for ImageTranscoder {
    #[tracing::instrument(skip(self, payload), fields(mime_type = %payload.mime_type, size = payload.len()))]
    async fn transcode(&self, payload: Payload) -> TranscodeOutcome {
        if let Some(reason) = self.skip_reason(&payload) {
            tracing::debug!(reason = ?reason, "Skipping transcode");
            return TranscodeOutcome::original(payload, TranscodeDecision::Skipped(reason));
        }

        let original_bytes = payload.len();
        let data = match payload.bytes().await {
            Ok(data) => data,
            Err(e) => {
                tracing::warn!(error = %e, "Could not read payload, sending original bytes");
                let decision = TranscodeDecision::Failed(e.to_string());
                return TranscodeOutcome::original(payload, decision);
            }
        };
        match self.reencode(data).await {
            Ok((candidate, width, height)) if (candidate.len() as u64) < original_bytes => {
                let transcoded_bytes = candidate.len() as u64;
                tracing::debug!(
                    original_bytes,
                    transcoded_bytes,
                    width,
                    height,
                    "Replaced payload with WebP"
                );
                TranscodeOutcome {
                    payload: Payload::from_bytes(candidate, WEBP_MIME_TYPE),
                    decision: TranscodeDecision::Replaced {
                        original_bytes,
                        transcoded_bytes,
                        width,
                        height,
                    },
                }
            }
            Ok((candidate, _, _)) => {
                let candidate_bytes = candidate.len() as u64;
                tracing::debug!(
                    original_bytes,
                    candidate_bytes,
                    "WebP not smaller, keeping original"
                );
                TranscodeOutcome::original(
                    payload,
                    TranscodeDecision::KeptOriginal {
                        original_bytes,
                        candidate_bytes,
                    },
                )
            }
            Err(e) => {
                tracing::warn!(error = %e, "Transcode failed, sending original bytes");
                TranscodeOutcome::original(payload, TranscodeDecision::Failed(e.to_string()))
            }
        }
    }
}
