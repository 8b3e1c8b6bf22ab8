//! Shared liveness flag used to cancel an in-flight container walk.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::{Error, Result};

/// A cloneable flag that starts alive and can be cleared exactly once.
///
/// Readers call [`Liveness::ensure_alive`] before every structural record
/// read, so clearing the flag from another thread bounds the work done after
/// a session is closed.
#[derive(Debug, Clone)]
pub struct Liveness(Arc<AtomicBool>);

impl Liveness {
    /// Create a new, alive flag.
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(true)))
    }

    /// Whether the flag is still alive.
    pub fn is_alive(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// Clear the flag. Idempotent.
    pub fn kill(&self) {
        self.0.store(false, Ordering::Release);
    }

    /// Return [`Error::Cancelled`] once the flag has been cleared.
    pub fn ensure_alive(&self) -> Result<()> {
        if self.is_alive() {
            Ok(())
        } else {
            Err(Error::Cancelled)
        }
    }
}

impl Default for Liveness {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kill_is_shared_between_clones() {
        let flag = Liveness::new();
        let other = flag.clone();
        assert!(other.ensure_alive().is_ok());

        flag.kill();
        flag.kill();
        assert!(!other.is_alive());
        assert!(matches!(other.ensure_alive(), Err(Error::Cancelled)));
    }

    #[test]
    fn test_kill_from_another_thread() {
        let flag = Liveness::new();
        let remote = flag.clone();
        std::thread::spawn(move || remote.kill())
            .join()
            .expect("thread panicked");
        assert!(!flag.is_alive());
    }
}
