//! Transport error taxonomy and the `classify` contract.

use miette::Diagnostic;
use thiserror::Error;

/// How callers should treat a transport failure, without looking at the
/// concrete error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The resource does not exist on the remote side.
    NotFound,
    /// Anything else: protocol, network, cancellation.
    Other,
}

/// A failure while executing a transport task.
#[derive(Debug, Error, Diagnostic)]
pub enum TransportError {
    #[error("unexpected status code {status} for {url}")]
    Status { status: u16, url: String },

    /// The task's listener asked for the transfer to stop. Never folded
    /// into an I/O error.
    #[error("transfer was cancelled")]
    Cancelled,

    /// The transporter was closed; the task was not attempted.
    #[error("transporter is closed")]
    Closed,

    #[error("invalid resource location {location:?}")]
    Location { location: String },

    #[error("invalid Content-Range header {header:?}")]
    InvalidContentRange { header: String },

    #[error("server range start {start} does not match resume offset {offset}")]
    ResumeMismatch { offset: u64, start: u64 },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
}

impl TransportError {
    /// 404-ish outcomes map to [`ErrorKind::NotFound`], everything else to
    /// [`ErrorKind::Other`].
    pub fn kind(&self) -> ErrorKind {
        match self {
            TransportError::Status { status: 404, .. } => ErrorKind::NotFound,
            _ => ErrorKind::Other,
        }
    }
}

/// No transporter could be built for a repository, typically because of an
/// unsupported URL scheme. Upper layers try the next factory.
#[derive(Debug, Error, Diagnostic)]
#[error("no transporter available for repository {id} ({url}): {reason}")]
pub struct NoTransporterError {
    pub id: String,
    pub url: String,
    pub reason: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_404_classifies_as_not_found() {
        let err = TransportError::Status {
            status: 404,
            url: "http://repo.example/missing".to_string(),
        };
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn everything_else_classifies_as_other() {
        let status = TransportError::Status {
            status: 500,
            url: "http://repo.example/broken".to_string(),
        };
        assert_eq!(status.kind(), ErrorKind::Other);
        assert_eq!(TransportError::Cancelled.kind(), ErrorKind::Other);
        assert_eq!(TransportError::Closed.kind(), ErrorKind::Other);
        let io = TransportError::Io(std::io::Error::new(
            std::io::ErrorKind::ConnectionReset,
            "reset",
        ));
        assert_eq!(io.kind(), ErrorKind::Other);
    }
}
