//! Configuration module
//!
//! Uploader settings: admission control, validation limits, fingerprinting,
//! transcoding, and the storage authority endpoint. Values come from the
//! environment (`MEDIAPORT_*`, optionally via a `.env` file) and fall back to
//! the documented defaults when absent or unparsable.

use std::env;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_ACCEPTED_MIME_TYPES, DEFAULT_HASH_FULL_READ_THRESHOLD_MB, DEFAULT_HASH_SAMPLE_BYTES,
    DEFAULT_MAX_CONCURRENT, DEFAULT_MAX_FILE_SIZE_MB, DEFAULT_TRANSCODE_MAX_DIMENSION_PX,
    DEFAULT_TRANSCODE_QUALITY, DEFAULT_TRANSCODE_SKIP_ABOVE_MB, DEFAULT_TRANSFER_TIMEOUT_MS, MIB,
};

const DEFAULT_API_URL: &str = "http://localhost:3000";
const DEFAULT_API_VERSION: &str = "v1";

/// How the fingerprint engine reads a file at or above the full-read threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HashStrategy {
    /// SHA-256 over head sample, tail sample and big-endian length. Bounded memory,
    /// but distinct files sharing head, tail and length collide.
    #[default]
    Sampled,
    /// SHA-256 over the entire content, read in chunks with yields in between.
    Streaming,
}

impl HashStrategy {
    pub fn parse(s: &str) -> anyhow::Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "sampled" | "composite" => Ok(HashStrategy::Sampled),
            "streaming" | "full" => Ok(HashStrategy::Streaming),
            _ => Err(anyhow::anyhow!("Invalid hash strategy: {}", s)),
        }
    }
}

/// Uploader configuration.
#[derive(Clone, Debug)]
pub struct UploaderConfig {
    pub max_concurrent: usize,
    pub max_file_size_bytes: u64,
    pub accepted_mime_types: Vec<String>,
    pub hash_full_read_threshold_bytes: u64,
    pub hash_sample_bytes: u64,
    pub hash_strategy: HashStrategy,
    pub transcode_enabled: bool,
    pub transcode_max_dimension_px: u32,
    pub transcode_skip_above_bytes: u64,
    pub transcode_quality: f32,
    pub transfer_timeout_ms: u64,
    // Storage authority
    pub api_url: String,
    pub api_key: Option<String>,
    pub api_version: String,
}

impl Default for UploaderConfig {
    fn default() -> Self {
        Self {
            max_concurrent: DEFAULT_MAX_CONCURRENT,
            max_file_size_bytes: DEFAULT_MAX_FILE_SIZE_MB * MIB,
            accepted_mime_types: DEFAULT_ACCEPTED_MIME_TYPES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            hash_full_read_threshold_bytes: DEFAULT_HASH_FULL_READ_THRESHOLD_MB * MIB,
            hash_sample_bytes: DEFAULT_HASH_SAMPLE_BYTES,
            hash_strategy: HashStrategy::default(),
            transcode_enabled: true,
            transcode_max_dimension_px: DEFAULT_TRANSCODE_MAX_DIMENSION_PX,
            transcode_skip_above_bytes: DEFAULT_TRANSCODE_SKIP_ABOVE_MB * MIB,
            transcode_quality: DEFAULT_TRANSCODE_QUALITY,
            transfer_timeout_ms: DEFAULT_TRANSFER_TIMEOUT_MS,
            api_url: DEFAULT_API_URL.to_string(),
            api_key: None,
            api_version: DEFAULT_API_VERSION.to_string(),
        }
    }
}

impl UploaderConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup (the process environment in
    /// production, a map in tests).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, anyhow::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        fn parsed<T: std::str::FromStr>(value: Option<String>, default: T) -> T {
            value
                .and_then(|v| v.trim().parse::<T>().ok())
                .unwrap_or(default)
        }

        let accepted_mime_types = lookup("MEDIAPORT_ACCEPTED_MIME_TYPES")
            .map(|s| {
                s.split(',')
                    .map(|s| s.trim().to_lowercase())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or(defaults.accepted_mime_types);

        let hash_strategy = match lookup("MEDIAPORT_HASH_STRATEGY") {
            Some(raw) => HashStrategy::parse(&raw)?,
            None => defaults.hash_strategy,
        };

        let config = UploaderConfig {
            max_concurrent: parsed(
                lookup("MEDIAPORT_MAX_CONCURRENT"),
                defaults.max_concurrent,
            ),
            max_file_size_bytes: parsed(
                lookup("MEDIAPORT_MAX_FILE_SIZE_MB"),
                DEFAULT_MAX_FILE_SIZE_MB,
            ) * MIB,
            accepted_mime_types,
            hash_full_read_threshold_bytes: parsed(
                lookup("MEDIAPORT_HASH_FULL_READ_THRESHOLD_MB"),
                DEFAULT_HASH_FULL_READ_THRESHOLD_MB,
            ) * MIB,
            hash_sample_bytes: parsed(
                lookup("MEDIAPORT_HASH_SAMPLE_BYTES"),
                defaults.hash_sample_bytes,
            ),
            hash_strategy,
            transcode_enabled: lookup("MEDIAPORT_TRANSCODE_ENABLED")
                .map(|v| v.to_lowercase().parse().unwrap_or(true))
                .unwrap_or(defaults.transcode_enabled),
            transcode_max_dimension_px: parsed(
                lookup("MEDIAPORT_TRANSCODE_MAX_DIMENSION_PX"),
                defaults.transcode_max_dimension_px,
            ),
            transcode_skip_above_bytes: parsed(
                lookup("MEDIAPORT_TRANSCODE_SKIP_ABOVE_MB"),
                DEFAULT_TRANSCODE_SKIP_ABOVE_MB,
            ) * MIB,
            transcode_quality: parsed(
                lookup("MEDIAPORT_TRANSCODE_QUALITY"),
                defaults.transcode_quality,
            ),
            transfer_timeout_ms: parsed(
                lookup("MEDIAPORT_TRANSFER_TIMEOUT_MS"),
                defaults.transfer_timeout_ms,
            ),
            api_url: lookup("MEDIAPORT_API_URL")
                .or_else(|| lookup("API_URL"))
                .unwrap_or(defaults.api_url),
            api_key: lookup("MEDIAPORT_API_KEY").or_else(|| lookup("API_KEY")),
            api_version: lookup("MEDIAPORT_API_VERSION").unwrap_or(defaults.api_version),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.max_concurrent == 0 {
            return Err(anyhow::anyhow!(
                "MEDIAPORT_MAX_CONCURRENT must be at least 1"
            ));
        }

        if self.max_file_size_bytes == 0 {
            return Err(anyhow::anyhow!(
                "MEDIAPORT_MAX_FILE_SIZE_MB must be greater than zero"
            ));
        }

        if self.accepted_mime_types.is_empty() {
            return Err(anyhow::anyhow!(
                "MEDIAPORT_ACCEPTED_MIME_TYPES must list at least one type"
            ));
        }

        if self.hash_sample_bytes == 0 {
            return Err(anyhow::anyhow!(
                "MEDIAPORT_HASH_SAMPLE_BYTES must be greater than zero"
            ));
        }

        // Head and tail samples must not overlap for any file that takes the sampled path.
        if self.hash_full_read_threshold_bytes < self.hash_sample_bytes * 2 {
            return Err(anyhow::anyhow!(
                "MEDIAPORT_HASH_FULL_READ_THRESHOLD_MB must be at least twice the hash sample size"
            ));
        }

        if self.transcode_max_dimension_px == 0 {
            return Err(anyhow::anyhow!(
                "MEDIAPORT_TRANSCODE_MAX_DIMENSION_PX must be greater than zero"
            ));
        }

        if !(1.0..=100.0).contains(&self.transcode_quality) {
            return Err(anyhow::anyhow!(
                "MEDIAPORT_TRANSCODE_QUALITY must be between 1 and 100"
            ));
        }

        if self.transfer_timeout_ms == 0 {
            return Err(anyhow::anyhow!(
                "MEDIAPORT_TRANSFER_TIMEOUT_MS must be greater than zero"
            ));
        }

        if !self.api_url.starts_with("http://") && !self.api_url.starts_with("https://") {
            return Err(anyhow::anyhow!(
                "MEDIAPORT_API_URL must be an http(s) URL"
            ));
        }

        Ok(())
    }

    pub fn transfer_timeout(&self) -> Duration {
        Duration::from_millis(self.transfer_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_match_documented_values() {
        let config = UploaderConfig::default();
        assert_eq!(config.max_concurrent, 2);
        assert_eq!(config.max_file_size_bytes, 50 * MIB);
        assert_eq!(config.hash_full_read_threshold_bytes, 5 * MIB);
        assert_eq!(config.hash_sample_bytes, MIB);
        assert_eq!(config.transcode_max_dimension_px, 2400);
        assert_eq!(config.transcode_skip_above_bytes, 15 * MIB);
        assert_eq!(config.transfer_timeout(), Duration::from_secs(300));
        assert_eq!(config.hash_strategy, HashStrategy::Sampled);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_lookup_empty_uses_defaults() {
        let config = UploaderConfig::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config.max_concurrent, 2);
        assert!(config
            .accepted_mime_types
            .contains(&"image/jpeg".to_string()));
        assert!(config.api_key.is_none());
    }

    #[test]
    fn test_from_lookup_overrides() {
        let config = UploaderConfig::from_lookup(lookup_from(&[
            ("MEDIAPORT_MAX_CONCURRENT", "4"),
            ("MEDIAPORT_MAX_FILE_SIZE_MB", "10"),
            ("MEDIAPORT_ACCEPTED_MIME_TYPES", "image/png, IMAGE/JPEG"),
            ("MEDIAPORT_HASH_STRATEGY", "streaming"),
            ("MEDIAPORT_TRANSFER_TIMEOUT_MS", "1500"),
            ("MEDIAPORT_API_URL", "https://assets.example.com"),
            ("MEDIAPORT_API_KEY", "secret"),
        ]))
        .unwrap();

        assert_eq!(config.max_concurrent, 4);
        assert_eq!(config.max_file_size_bytes, 10 * MIB);
        assert_eq!(config.accepted_mime_types, vec!["image/png", "image/jpeg"]);
        assert_eq!(config.hash_strategy, HashStrategy::Streaming);
        assert_eq!(config.transfer_timeout(), Duration::from_millis(1500));
        assert_eq!(config.api_url, "https://assets.example.com");
        assert_eq!(config.api_key.as_deref(), Some("secret"));
    }

    #[test]
    fn test_from_lookup_unparsable_falls_back() {
        let config =
            UploaderConfig::from_lookup(lookup_from(&[("MEDIAPORT_MAX_CONCURRENT", "lots")]))
                .unwrap();
        assert_eq!(config.max_concurrent, 2);
    }

    #[test]
    fn test_invalid_hash_strategy_is_rejected() {
        let result =
            UploaderConfig::from_lookup(lookup_from(&[("MEDIAPORT_HASH_STRATEGY", "md5")]));
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_rejects_zero_concurrency() {
        let config = UploaderConfig {
            max_concurrent: 0,
            ..UploaderConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_overlapping_samples() {
        let config = UploaderConfig {
            hash_full_read_threshold_bytes: MIB,
            hash_sample_bytes: MIB,
            ..UploaderConfig::default()
        };
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("twice"));
    }

    #[test]
    fn test_validate_rejects_non_http_url() {
        let config = UploaderConfig {
            api_url: "ftp://example.com".to_string(),
            ..UploaderConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_hash_strategy_parse() {
        assert_eq!(HashStrategy::parse("Sampled").unwrap(), HashStrategy::Sampled);
        assert_eq!(HashStrategy::parse("full").unwrap(), HashStrategy::Streaming);
        assert!(HashStrategy::parse("").is_err());
    }
}
