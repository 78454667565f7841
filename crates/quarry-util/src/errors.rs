use miette::Diagnostic;
use thiserror::Error;

/// Unified error type for top-level repository-system operations.
#[derive(Debug, Error, Diagnostic)]
pub enum QuarryError {
    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Dependency collection or conflict resolution failed.
    #[error("Dependency resolution failed: {message}")]
    Resolution { message: String },

    /// Network request or transfer failed.
    #[error("Transfer error: {message}")]
    Transfer { message: String },

    /// A downloaded file did not match its expected checksum.
    #[error("Checksum mismatch for {url}: expected {expected}, got {actual}")]
    #[diagnostic(help("the repository copy may be corrupt, or the download was truncated"))]
    ChecksumMismatch {
        url: String,
        expected: String,
        actual: String,
    },

    /// Catch-all for miscellaneous errors.
    #[error("{message}")]
    Generic { message: String },
}

/// Convenience alias for `miette::Result<T>`.
pub type QuarryResult<T> = miette::Result<T>;
