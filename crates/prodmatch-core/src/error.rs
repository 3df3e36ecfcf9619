use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Extraction failed: {message}")]
    ExtractionFailure { message: String, raw: Option<String> },

    #[error("Malformed extraction: {message}")]
    MalformedExtraction { message: String, raw: Option<String> },

    #[error("Catalog unavailable: {0}")]
    CatalogUnavailable(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Flat discriminant of [`Error`], for callers that branch on the failure
/// class without caring about the detail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    ExtractionFailure,
    MalformedExtraction,
    CatalogUnavailable,
    InvalidConfig,
}

impl Error {
    pub fn extraction(message: impl Into<String>, raw: Option<String>) -> Self {
        Self::ExtractionFailure { message: message.into(), raw }
    }

    pub fn malformed(message: impl Into<String>, raw: Option<String>) -> Self {
        Self::MalformedExtraction { message: message.into(), raw }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ExtractionFailure { .. } => ErrorKind::ExtractionFailure,
            Self::MalformedExtraction { .. } => ErrorKind::MalformedExtraction,
            Self::CatalogUnavailable(_) => ErrorKind::CatalogUnavailable,
            Self::InvalidConfig(_) => ErrorKind::InvalidConfig,
        }
    }

    /// Raw upstream output attached for diagnostics, if any.
    pub fn raw_output(&self) -> Option<&str> {
        match self {
            Self::ExtractionFailure { raw, .. } | Self::MalformedExtraction { raw, .. } => raw.as_deref(),
            _ => None,
        }
    }

    /// Only extraction-layer failures abort a request.
    pub fn is_fatal(&self) -> bool {
        matches!(self.kind(), ErrorKind::ExtractionFailure | ErrorKind::MalformedExtraction)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
