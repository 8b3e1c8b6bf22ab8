//! Error types for mediaprobe-container.

use std::fmt::Display;
use std::io;
use thiserror::Error;

/// Result type for container operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while sniffing or walking a container.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A record declares more bytes than remain in its parent.
    #[error("Record {record} declares {declared} bytes but only {remaining} remain")]
    RecordOverrun {
        record: String,
        declared: u64,
        remaining: u64,
    },

    /// A record header or payload was cut off by the end of the file.
    #[error("Record {0} is truncated")]
    Truncated(String),

    /// A structural record the format requires is absent.
    #[error("Missing required record: {0}")]
    MissingRecord(&'static str),

    /// Structurally invalid data.
    #[error("Invalid container data: {0}")]
    Invalid(String),

    /// The owning session was closed while the walk was in flight.
    #[error("Parse cancelled")]
    Cancelled,
}

impl Error {
    /// Create an invalid data error.
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::Invalid(msg.into())
    }

    /// Create a record overrun error.
    pub fn overrun(record: impl Display, declared: u64, remaining: u64) -> Self {
        Self::RecordOverrun {
            record: record.to_string(),
            declared,
            remaining,
        }
    }

    /// Whether this error describes a malformed container rather than an
    /// I/O failure or cancellation.
    pub fn is_malformed(&self) -> bool {
        matches!(
            self,
            Self::RecordOverrun { .. }
                | Self::Truncated(_)
                | Self::MissingRecord(_)
                | Self::Invalid(_)
        )
    }

    /// Map an I/O error raised while reading `record`, turning an early EOF
    /// into [`Error::Truncated`].
    pub(crate) fn from_read(err: io::Error, record: impl Display) -> Self {
        if err.kind() == io::ErrorKind::UnexpectedEof {
            Self::Truncated(record.to_string())
        } else {
            Self::Io(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_classification() {
        assert!(Error::overrun("moov", 100, 10).is_malformed());
        assert!(Error::Truncated("fmt ".into()).is_malformed());
        assert!(Error::MissingRecord("moov").is_malformed());
        assert!(!Error::Cancelled.is_malformed());
        assert!(!Error::Io(io::Error::other("disk")).is_malformed());
    }

    #[test]
    fn test_early_eof_becomes_truncated() {
        let err = Error::from_read(io::Error::from(io::ErrorKind::UnexpectedEof), "trak");
        assert!(matches!(err, Error::Truncated(ref r) if r == "trak"));

        let err = Error::from_read(io::Error::from(io::ErrorKind::PermissionDenied), "trak");
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_overrun_display() {
        let err = Error::overrun("mdat", 4096, 100);
        assert_eq!(
            err.to_string(),
            "Record mdat declares 4096 bytes but only 100 remain"
        );
    }
}
