//! HTTP byte transport: a single `PUT` of the payload to the ticketed
//! destination. The body is read from the payload's source one chunk at a
//! time, so memory stays bounded and progress can be observed.

use anyhow::{Context, Result};
use async_trait::async_trait;
use bytes::Bytes;
use futures::{stream, StreamExt};
use mediaport_core::{
    ByteSource, ByteTransport, Payload, SourceError, TransferError, TransferProgress,
};
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE};
use reqwest::{Body, Client};

/// Default chunk size for streamed bodies.
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

#[derive(Clone, Debug)]
pub struct HttpTransport {
    client: Client,
    chunk_size: usize,
}

impl HttpTransport {
    /// The client carries no request timeout; the upload pipeline bounds the
    /// whole transfer instead.
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self::with_client(client))
    }

    pub fn with_client(client: Client) -> Self {
        Self {
            client,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    /// If `chunk_size` is 0, [`DEFAULT_CHUNK_SIZE`] is used.
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = if chunk_size == 0 {
            DEFAULT_CHUNK_SIZE
        } else {
            chunk_size
        };
        self
    }

    /// `(offset, length)` of each chunk of a `total`-byte body.
    fn ranges(&self, total: u64) -> Vec<(u64, u64)> {
        let chunk = self.chunk_size as u64;
        (0..total)
            .step_by(self.chunk_size)
            .map(|offset| (offset, chunk.min(total - offset)))
            .collect()
    }
}

#[async_trait]
impl ByteTransport for HttpTransport {
    #[tracing::instrument(skip_all, fields(bytes = payload.len()))]
    async fn put(
        &self,
        destination: &str,
        payload: &Payload,
        progress: TransferProgress,
    ) -> Result<(), TransferError> {
        let total = payload.len();
        let source = payload.source.clone();
        let mut sent = 0u64;
        // Progress is reported as each chunk is handed to the connection.
        let body = stream::iter(self.ranges(total))
            .then(move |(offset, length)| {
                let source = source.clone();
                async move { source.read_range(offset, length).await }
            })
            .map(move |chunk: Result<Bytes, SourceError>| {
                if let Ok(chunk) = &chunk {
                    sent += chunk.len() as u64;
                    progress(sent, total);
                }
                chunk
            });

        let response = self
            .client
            .put(destination)
            .header(CONTENT_TYPE, payload.mime_type.as_str())
            .header(CONTENT_LENGTH, total)
            .body(Body::wrap_stream(body))
            .send()
            .await
            .map_err(|e| TransferError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(TransferError::Status {
                status: status.as_u16(),
                body: error_text,
            });
        }

        tracing::debug!(bytes = total, "Transfer acknowledged");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn recorder() -> (TransferProgress, Arc<Mutex<Vec<(u64, u64)>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let progress: TransferProgress = Arc::new(move |sent, total| {
            sink.lock().unwrap().push((sent, total));
        });
        (progress, seen)
    }

    #[tokio::test]
    async fn test_put_streams_payload_with_progress() {
        let mut server = mockito::Server::new_async().await;
        let data: Vec<u8> = (0..10_000u32).map(|i| (i % 251) as u8).collect();
        let mock = server
            .mock("PUT", "/blobs/abc")
            .match_header("content-type", "image/webp")
            .match_header("content-length", "10000")
            .match_body(data.clone())
            .with_status(200)
            .create_async()
            .await;

        let transport = HttpTransport::new().unwrap().with_chunk_size(4096);
        let (progress, seen) = recorder();
        transport
            .put(
                &format!("{}/blobs/abc", server.url()),
                &Payload::from_bytes(data, "image/webp"),
                progress,
            )
            .await
            .unwrap();

        mock.assert_async().await;
        let seen = seen.lock().unwrap().clone();
        assert_eq!(seen, vec![(4096, 10_000), (8192, 10_000), (10_000, 10_000)]);
    }

    #[tokio::test]
    async fn test_put_rejected_status() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("PUT", "/blobs/expired")
            .with_status(403)
            .with_body("ticket expired")
            .create_async()
            .await;

        let (progress, _) = recorder();
        let err = HttpTransport::new()
            .unwrap()
            .put(
                &format!("{}/blobs/expired", server.url()),
                &Payload::from_bytes(vec![1u8; 32], "image/png"),
                progress,
            )
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            TransferError::Status { status: 403, ref body } if body == "ticket expired"
        ));
    }

    #[tokio::test]
    async fn test_put_network_failure() {
        let (progress, _) = recorder();
        let err = HttpTransport::new()
            .unwrap()
            .put(
                "http://127.0.0.1:1/blobs/x",
                &Payload::from_bytes(vec![1u8; 8], "image/png"),
                progress,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, TransferError::Network(_)));
    }

    #[test]
    fn test_chunk_ranges() {
        let transport = HttpTransport::new().unwrap().with_chunk_size(3);
        assert_eq!(transport.ranges(7), vec![(0, 3), (3, 3), (6, 1)]);
        assert!(transport.ranges(0).is_empty());
    }
}
