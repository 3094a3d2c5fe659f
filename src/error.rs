use thiserror::Error;

pub type Result<T> = anyhow::Result<T>;

/// Failures of a single call to the generative service.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("invalid generation endpoint: {0}")]
    Endpoint(#[from] url::ParseError),

    #[error("request to the generative service failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("generative service returned status {status}: {body}")]
    Upstream { status: u16, body: String },

    #[error("generative service response carried no text payload")]
    MissingText,

    #[error("structured response could not be parsed: {0}")]
    Malformed(#[from] serde_json::Error),
}
