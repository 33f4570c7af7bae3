//! Byte sources: random-access readers over the content being uploaded.
//!
//! The fingerprint engine only needs `read_range` and `total_length`, so large
//! files can be sampled without loading them into memory.

use async_trait::async_trait;
use bytes::Bytes;
use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncReadExt, AsyncSeekExt};

use crate::constants::OCTET_STREAM;
use crate::error::SourceError;

#[async_trait]
pub trait ByteSource: Send + Sync {
    /// Total content length in bytes.
    fn total_length(&self) -> u64;

    /// Read exactly `length` bytes starting at `offset`.
    async fn read_range(&self, offset: u64, length: u64) -> Result<Bytes, SourceError>;

    /// Read the whole content.
    async fn read_all(&self) -> Result<Bytes, SourceError> {
        self.read_range(0, self.total_length()).await
    }
}

fn check_bounds(offset: u64, length: u64, total: u64) -> Result<(), SourceError> {
    match offset.checked_add(length) {
        Some(end) if end <= total => Ok(()),
        _ => Err(SourceError::OutOfBounds {
            offset,
            length,
            total,
        }),
    }
}

/// In-memory content.
#[derive(Debug, Clone)]
pub struct MemorySource {
    data: Bytes,
}

impl MemorySource {
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self { data: data.into() }
    }
}

#[async_trait]
impl ByteSource for MemorySource {
    fn total_length(&self) -> u64 {
        self.data.len() as u64
    }

    async fn read_range(&self, offset: u64, length: u64) -> Result<Bytes, SourceError> {
        check_bounds(offset, length, self.total_length())?;
        let start = offset as usize;
        Ok(self.data.slice(start..start + length as usize))
    }
}

/// File on the local filesystem. Each read opens the file and seeks, so no handle
/// is held between reads.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
    len: u64,
}

impl FileSource {
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, SourceError> {
        let path = path.as_ref().to_path_buf();
        let metadata = tokio::fs::metadata(&path).await?;
        if !metadata.is_file() {
            return Err(SourceError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("not a regular file: {}", path.display()),
            )));
        }
        Ok(Self {
            path,
            len: metadata.len(),
        })
    }

    /// Final path component, or `"file"` when the path has none.
    pub fn filename(&self) -> String {
        self.path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("file")
            .to_string()
    }
}

#[async_trait]
impl ByteSource for FileSource {
    fn total_length(&self) -> u64 {
        self.len
    }

    async fn read_range(&self, offset: u64, length: u64) -> Result<Bytes, SourceError> {
        check_bounds(offset, length, self.len)?;
        let mut file = tokio::fs::File::open(&self.path).await?;
        file.seek(SeekFrom::Start(offset)).await?;
        let mut buffer = vec![0u8; length as usize];
        file.read_exact(&mut buffer).await?;
        Ok(Bytes::from(buffer))
    }
}

/// Guess a MIME type from a file extension.
pub fn mime_from_path(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase());

    match extension.as_deref() {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        Some("avif") => "image/avif",
        Some("bmp") => "image/bmp",
        Some("tif") | Some("tiff") => "image/tiff",
        _ => OCTET_STREAM,
    }
}
