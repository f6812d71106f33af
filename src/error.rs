//! Error types for the overlay pipeline

use thiserror::Error;

/// Result type alias for overlay operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the overlay pipeline
#[derive(Error, Debug)]
pub enum Error {
    /// Failed to initialize the overlay
    #[error("Overlay initialization failed: {0}")]
    InitializationError(String),

    /// A screenshot request is missing required fields or is malformed
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The offscreen drawing surface could not be used
    #[error("Drawing surface unavailable: {0}")]
    SurfaceUnavailable(String),

    /// Failed to encode the readback into the requested image format
    #[error("Encode failed: {0}")]
    EncodeFailure(String),

    /// The primary upload failed (network or HTTP level)
    #[error("Upload failed: {0}")]
    UploadFailure(String),

    /// The follow-up result notification failed
    #[error("Result notification failed: {0}")]
    ResultNotificationFailure(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::InvalidRequest(err.to_string())
    }
}
