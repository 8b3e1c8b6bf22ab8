//! Error types for mediaprobe-probe

use std::io;
use std::path::{Path, PathBuf};

/// Result type for probe operations.
pub type Result<T> = std::result::Result<T, ProbeError>;

/// Errors that can occur while probing a file
#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    /// File not found
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// The file exists but cannot be opened for reading
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// The container's structure is damaged or incomplete
    #[error("Malformed container: {0}")]
    MalformedContainer(String),

    /// The session was closed or cancelled
    #[error("Session is closed")]
    SessionClosed,

    /// No supported container signature matched
    #[error("Unsupported container format")]
    UnsupportedFormat,
}

impl ProbeError {
    /// Classify an error raised while opening `path`.
    pub(crate) fn from_open(err: io::Error, path: &Path) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => Self::FileNotFound(path.to_path_buf()),
            io::ErrorKind::PermissionDenied => Self::PermissionDenied(path.to_path_buf()),
            _ => Self::Io(err),
        }
    }

    /// A copy of this error, for replaying a stored parse failure.
    pub(crate) fn replay(&self) -> Self {
        match self {
            Self::FileNotFound(path) => Self::FileNotFound(path.clone()),
            Self::PermissionDenied(path) => Self::PermissionDenied(path.clone()),
            Self::Io(err) => Self::Io(io::Error::new(err.kind(), err.to_string())),
            Self::MalformedContainer(msg) => Self::MalformedContainer(msg.clone()),
            Self::SessionClosed => Self::SessionClosed,
            Self::UnsupportedFormat => Self::UnsupportedFormat,
        }
    }
}

impl From<mediaprobe_container::Error> for ProbeError {
    fn from(err: mediaprobe_container::Error) -> Self {
        use mediaprobe_container::Error;
        match err {
            Error::Cancelled => Self::SessionClosed,
            Error::Io(e) => Self::Io(e),
            other => Self::MalformedContainer(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use mediaprobe_container::Error;

    #[test]
    fn test_open_error_classification() {
        let path = Path::new("/nope/movie.mp4");
        assert_matches!(
            ProbeError::from_open(io::ErrorKind::NotFound.into(), path),
            ProbeError::FileNotFound(p) if p == path
        );
        assert_matches!(
            ProbeError::from_open(io::ErrorKind::PermissionDenied.into(), path),
            ProbeError::PermissionDenied(_)
        );
        assert_matches!(
            ProbeError::from_open(io::ErrorKind::Interrupted.into(), path),
            ProbeError::Io(_)
        );
    }

    #[test]
    fn test_container_error_mapping() {
        assert_matches!(ProbeError::from(Error::Cancelled), ProbeError::SessionClosed);
        assert_matches!(
            ProbeError::from(Error::MissingRecord("moov")),
            ProbeError::MalformedContainer(msg) if msg.contains("moov")
        );
        assert_matches!(
            ProbeError::from(Error::Io(io::Error::other("disk"))),
            ProbeError::Io(_)
        );
    }

    #[test]
    fn test_replay_keeps_variant() {
        let err = ProbeError::Io(io::Error::new(io::ErrorKind::TimedOut, "slow disk"));
        assert_matches!(err.replay(), ProbeError::Io(e) if e.kind() == io::ErrorKind::TimedOut);
        assert_matches!(ProbeError::UnsupportedFormat.replay(), ProbeError::UnsupportedFormat);
    }
}
