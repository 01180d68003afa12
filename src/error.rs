use thiserror::Error;

/// Failures the scanner surfaces to the user as inline status text.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ScanError {
    /// Camera unavailable or permission denied.
    #[error("Failed to initialize camera: {0}")]
    Device(String),
    /// Camera acquired, but the barcode decoder would not start.
    #[error("Failed to start barcode decoder: {0}")]
    DecodeStart(String),
}

/// Failures of the remote classifier. Always absorbed by the fallback path.
#[derive(Debug, Error)]
pub enum ClassificationError {
    #[error("classifier request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("classifier returned HTTP {0}")]
    Status(u16),
    #[error("classifier returned no text")]
    EmptyResponse,
    #[error("classifier response could not be parsed: {0}")]
    Malformed(String),
    #[error("classifier unavailable: {0}")]
    Unavailable(String),
}
