use thiserror::Error;

// ============================================================================
// Error Handling
// ============================================================================

#[derive(Error, Debug)]
pub enum SignError {
    #[error("Invalid signature image: {0}")]
    ImageDecodeError(String),
    #[error("Failed to fetch source document: {status} {reason}")]
    FetchError { status: u16, reason: String },
    #[error("Source document unreachable: {0}")]
    UnreachableError(String),
    #[error("Failed to load source document: {0}")]
    DocumentLoadError(String),
    #[error("Invalid signature info: {0}")]
    ValidationError(String),
    #[error("Failed to create PDF: {0}")]
    PdfError(String),
    #[error("Invalid configuration: {0}")]
    ConfigError(String),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl SignError {
    /// True for failures to retrieve the source document, as opposed to
    /// failures to make sense of it once retrieved.
    pub fn is_fetch_failure(&self) -> bool {
        matches!(
            self,
            SignError::FetchError { .. } | SignError::UnreachableError(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, SignError>;
