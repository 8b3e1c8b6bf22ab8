//! Handle-based query surface over many sessions.
//!
//! Mirrors the MediaInfo calling convention: `open` hands out an opaque
//! handle, `get` returns an empty string for "not available", and `close`
//! may be called any number of times.

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use dashmap::DashMap;
use mediaprobe_container::StreamKind;

use crate::error::{ProbeError, Result};
use crate::options::SessionOptions;
use crate::params::InfoKind;
use crate::session::{CancelHandle, ProbeSession};

/// Rendered value of a parameter that does not exist.
pub const NOT_AVAILABLE: &str = "";

/// Opaque identifier of a session opened through a [`Prober`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionHandle(u64);

impl SessionHandle {
    pub fn id(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for SessionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

struct Entry {
    cancel: CancelHandle,
    session: Arc<Mutex<ProbeSession>>,
}

/// Thread-safe table of open probe sessions.
///
/// Queries on one handle are serialised; different handles proceed in
/// parallel. Closing a handle cancels any parse in flight on it.
#[derive(Clone)]
pub struct Prober {
    sessions: Arc<DashMap<SessionHandle, Entry>>,
    next_id: Arc<AtomicU64>,
    options: SessionOptions,
}

impl Default for Prober {
    fn default() -> Self {
        Self::new(SessionOptions::default())
    }
}

impl Prober {
    /// Create a prober whose sessions use `options`.
    pub fn new(options: SessionOptions) -> Self {
        Self {
            sessions: Arc::new(DashMap::new()),
            next_id: Arc::new(AtomicU64::new(1)),
            options,
        }
    }

    /// Open a session on a file.
    ///
    /// # Arguments
    /// * `path` - File to probe.
    ///
    /// # Returns
    /// The handle used by every other call.
    pub fn open(&self, path: impl AsRef<Path>) -> Result<SessionHandle> {
        let session = ProbeSession::open_with(path, self.options.clone())?;
        let handle = SessionHandle(self.next_id.fetch_add(1, Ordering::Relaxed));
        let entry = Entry {
            cancel: session.cancel_handle(),
            session: Arc::new(Mutex::new(session)),
        };
        self.sessions.insert(handle, entry);
        tracing::debug!(handle = %handle, open = self.sessions.len(), "Registered probe session");
        Ok(handle)
    }

    /// Close a session. Unknown and already closed handles are ignored.
    pub fn close(&self, handle: SessionHandle) {
        if let Some((_, entry)) = self.sessions.remove(&handle) {
            entry.cancel.cancel();
            lock(&entry.session).close();
            tracing::debug!(handle = %handle, "Released probe session");
        }
    }

    /// Number of streams of `kind`.
    pub fn count(&self, handle: SessionHandle, kind: StreamKind) -> Result<usize> {
        self.with_session(handle, |s| s.count(kind))
    }

    /// Rendered parameter value, or [`NOT_AVAILABLE`].
    ///
    /// # Arguments
    /// * `handle` - Session to query.
    /// * `kind` - Stream kind.
    /// * `index` - Stream index within the kind.
    /// * `param` - Parameter name, e.g. `"Duration"`.
    pub fn get(&self, handle: SessionHandle, kind: StreamKind, index: usize, param: &str) -> Result<String> {
        self.get_info(handle, kind, index, param, InfoKind::Text)
    }

    /// Like [`get`](Self::get) for any [`InfoKind`].
    pub fn get_info(
        &self,
        handle: SessionHandle,
        kind: StreamKind,
        index: usize,
        param: &str,
        info: InfoKind,
    ) -> Result<String> {
        let value = self.with_session(handle, |s| s.get_info(kind, index, param, info))?;
        Ok(value.unwrap_or_else(|| NOT_AVAILABLE.to_string()))
    }

    /// Number of open sessions.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    fn with_session<T>(
        &self,
        handle: SessionHandle,
        f: impl FnOnce(&mut ProbeSession) -> Result<T>,
    ) -> Result<T> {
        // Clone the Arc out so the map shard is not held during parsing.
        let session = self
            .sessions
            .get(&handle)
            .map(|entry| Arc::clone(&entry.session))
            .ok_or(ProbeError::SessionClosed)?;
        let mut guard = lock(&session);
        f(&mut guard)
    }
}

fn lock(session: &Mutex<ProbeSession>) -> std::sync::MutexGuard<'_, ProbeSession> {
    session.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use mediaprobe_fixtures::{sample_mp4, write_temp};

    #[test]
    fn test_open_get_close() {
        let file = write_temp(&sample_mp4(), ".mp4");
        let prober = Prober::default();
        let handle = prober.open(file.path()).unwrap();
        assert_eq!(prober.len(), 1);

        assert_eq!(prober.count(handle, StreamKind::Video).unwrap(), 1);
        assert_eq!(prober.get(handle, StreamKind::Video, 0, "Duration").unwrap(), "120000");
        assert_eq!(prober.get(handle, StreamKind::Video, 0, "NoSuchParam").unwrap(), NOT_AVAILABLE);
        assert_eq!(prober.get(handle, StreamKind::Video, 5, "Duration").unwrap(), NOT_AVAILABLE);

        prober.close(handle);
        prober.close(handle);
        assert!(prober.is_empty());
        assert_matches!(
            prober.get(handle, StreamKind::Video, 0, "Duration"),
            Err(ProbeError::SessionClosed)
        );
    }

    #[test]
    fn test_handles_are_distinct() {
        let file = write_temp(&sample_mp4(), ".mp4");
        let prober = Prober::default();
        let a = prober.open(file.path()).unwrap();
        let b = prober.open(file.path()).unwrap();
        assert_ne!(a, b);

        prober.close(a);
        assert_eq!(prober.count(b, StreamKind::Audio).unwrap(), 1);
    }

    #[test]
    fn test_open_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let prober = Prober::default();
        assert_matches!(
            prober.open(dir.path().join("missing.mp4")),
            Err(ProbeError::FileNotFound(_))
        );
        assert!(prober.is_empty());
    }
}
