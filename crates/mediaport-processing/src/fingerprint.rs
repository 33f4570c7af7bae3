//! Content fingerprinting for duplicate detection.
//!
//! Files below the full-read threshold are hashed whole. Larger files use the
//! configured [`HashStrategy`]: by default SHA-256 over the first sample, the
//! last sample and the total length as 8 big-endian bytes, so memory use stays
//! bounded regardless of file size.

use mediaport_core::{ByteSource, Fingerprint, HashStrategy, SourceError, UploaderConfig};
use sha2::{Digest, Sha256};

/// Hashing progress callback: `(bytes_hashed, total_bytes)`.
pub type HashProgress<'a> = &'a (dyn Fn(u64, u64) + Send + Sync);

#[derive(Debug, Clone)]
pub struct FingerprintEngine {
    full_read_threshold: u64,
    sample_bytes: u64,
    strategy: HashStrategy,
}

impl FingerprintEngine {
    pub fn new(full_read_threshold: u64, sample_bytes: u64, strategy: HashStrategy) -> Self {
        Self {
            full_read_threshold,
            sample_bytes,
            strategy,
        }
    }

    pub fn from_config(config: &UploaderConfig) -> Self {
        Self::new(
            config.hash_full_read_threshold_bytes,
            config.hash_sample_bytes,
            config.hash_strategy,
        )
    }

    /// Compute the fingerprint of `source`.
    ///
    /// Always yields to the runtime before reading so a burst of submissions
    /// does not hash back to back on one worker thread.
    pub async fn fingerprint(&self, source: &dyn ByteSource) -> Result<Fingerprint, SourceError> {
        self.fingerprint_with_progress(source, &|_, _| {}).await
    }

    /// Like [`fingerprint`](Self::fingerprint), reporting hashed bytes as it
    /// goes. The streaming strategy reports after every chunk, the others once.
    #[tracing::instrument(skip_all, fields(size = source.total_length()))]
    pub async fn fingerprint_with_progress(
        &self,
        source: &dyn ByteSource,
        progress: HashProgress<'_>,
    ) -> Result<Fingerprint, SourceError> {
        tokio::task::yield_now().await;

        let total = source.total_length();
        let fingerprint = if total < self.full_read_threshold {
            let data = source.read_all().await?;
            Fingerprint::from_digest(&Sha256::digest(&data))
        } else {
            match self.strategy {
                HashStrategy::Sampled => self.sampled(source, total).await?,
                HashStrategy::Streaming => self.streaming(source, total, progress).await?,
            }
        };
        progress(total, total);
        Ok(fingerprint)
    }

    async fn sampled(
        &self,
        source: &dyn ByteSource,
        total: u64,
    ) -> Result<Fingerprint, SourceError> {
        let sample = self.sample_bytes.min(total);
        let head = source.read_range(0, sample).await?;
        let tail = source.read_range(total - sample, sample).await?;

        let mut hasher = Sha256::new();
        hasher.update(&head);
        hasher.update(&tail);
        hasher.update(total.to_be_bytes());
        Ok(Fingerprint::from_digest(&hasher.finalize()))
    }

    async fn streaming(
        &self,
        source: &dyn ByteSource,
        total: u64,
        progress: HashProgress<'_>,
    ) -> Result<Fingerprint, SourceError> {
        let chunk = self.sample_bytes.max(1);
        let mut hasher = Sha256::new();
        let mut offset = 0;
        while offset < total {
            let length = chunk.min(total - offset);
            let data = source.read_range(offset, length).await?;
            hasher.update(&data);
            offset += length;
            if offset < total {
                progress(offset, total);
            }
            tokio::task::yield_now().await;
        }
        Ok(Fingerprint::from_digest(&hasher.finalize()))
    }
}
