/// Error types for topicscan.
///
/// Per-document failures (`NotFound`, `PermissionDenied`, `Io`, `Decode`) are
/// recoverable: a strategy records them against the document and moves on.
/// They are never returned from a scan; they show up in the
/// [`ScanReport`](crate::results::ScanReport) instead.
///
/// ```rust,ignore
/// match loader.load(&id) {
///     Ok(raw) => // parse and count,
///     Err(e) if e.is_load_error() => // record and skip this document,
///     Err(e) => // configuration or corpus problems, reported by the caller
/// }
/// ```
use thiserror::Error;

use crate::document::DocumentId;

/// Result type for scan operations
pub type ScanResult<T> = Result<T, ScanError>;

/// Errors that can occur while enumerating, loading or decoding documents
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Document not found: {0}")]
    NotFound(DocumentId),
    #[error("Permission denied: {0}")]
    PermissionDenied(DocumentId),
    #[error("IO error reading {id}: {source}")]
    Io {
        id: DocumentId,
        source: std::io::Error,
    },
    #[error("Failed to decode {id}: {reason}")]
    Decode { id: DocumentId, reason: String },
    #[error("Corpus error: {0}")]
    Corpus(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Unknown strategy: {0}")]
    InvalidStrategy(String),
}

impl ScanError {
    pub fn not_found(id: impl Into<DocumentId>) -> Self {
        Self::NotFound(id.into())
    }

    pub fn permission_denied(id: impl Into<DocumentId>) -> Self {
        Self::PermissionDenied(id.into())
    }

    /// Maps an I/O failure onto the load taxonomy for `id`.
    pub fn from_io(id: impl Into<DocumentId>, err: std::io::Error) -> Self {
        let id = id.into();
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound(id),
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied(id),
            _ => Self::Io { id, source: err },
        }
    }

    pub fn decode(id: impl Into<DocumentId>, reason: impl Into<String>) -> Self {
        Self::Decode {
            id: id.into(),
            reason: reason.into(),
        }
    }

    pub fn corpus_error(msg: impl Into<String>) -> Self {
        Self::Corpus(msg.into())
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn invalid_strategy(name: impl Into<String>) -> Self {
        Self::InvalidStrategy(name.into())
    }

    /// True for failures to open or read a document
    pub fn is_load_error(&self) -> bool {
        matches!(
            self,
            Self::NotFound(_) | Self::PermissionDenied(_) | Self::Io { .. }
        )
    }

    /// True for malformed document content
    pub fn is_decode_error(&self) -> bool {
        matches!(self, Self::Decode { .. })
    }

    /// The document this error is attributed to, if any
    pub fn document(&self) -> Option<&DocumentId> {
        match self {
            Self::NotFound(id) | Self::PermissionDenied(id) => Some(id),
            Self::Io { id, .. } | Self::Decode { id, .. } => Some(id),
            Self::Corpus(_) | Self::Config(_) | Self::InvalidStrategy(_) => None,
        }
    }
}

impl From<config::ConfigError> for ScanError {
    fn from(err: config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}
