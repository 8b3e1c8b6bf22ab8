//! Per-session options.

use mediaprobe_container::sniff::DEFAULT_SNIFF_LIMIT;

/// Character set of strings handed to the caller.
///
/// Sessions always hand out owned UTF-8 `String`s; the option exists so the
/// choice is recorded on the session the way the native interface records it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Charset {
    #[default]
    Utf8,
}

/// Options fixed when a session is opened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOptions {
    /// Surface structural damage and unknown formats as errors instead of
    /// absorbing them.
    pub strict: bool,
    /// Number of leading bytes inspected to identify the container.
    pub sniff_limit: u64,
    pub charset: Charset,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            strict: false,
            sniff_limit: DEFAULT_SNIFF_LIMIT,
            charset: Charset::Utf8,
        }
    }
}

impl SessionOptions {
    pub fn strict() -> Self {
        Self {
            strict: true,
            ..Self::default()
        }
    }
}
