/// Failures inside the transcoder. They never fail a task: the pipeline logs
/// them and transfers the original bytes.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TranscodeError {
    #[error("failed to decode image: {0}")]
    Decode(String),

    #[error("failed to encode WebP: {0}")]
    Encode(String),

    #[error("transcode worker panicked: {0}")]
    Worker(String),
}

impl From<tokio::task::JoinError> for TranscodeError {
    fn from(err: tokio::task::JoinError) -> Self {
        TranscodeError::Worker(err.to_string())
    }
}
