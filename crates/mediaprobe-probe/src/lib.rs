//! # mediaprobe-probe
//!
//! MediaInfo-style metadata queries over the containers walked by
//! `mediaprobe-container`.
//!
//! A [`ProbeSession`] owns one open file. The container is sniffed and
//! walked on the first query; each stream's record is decoded into named
//! parameters the first time that stream is asked about.
//!
//! ## Features
//!
//! - Same stream kinds and parameter names as MediaInfo (`Format`,
//!   `Duration`, `BitRate`, `Width`, `SamplingRate`, ...)
//! - Lenient by default: a damaged container yields the streams located
//!   before the damage
//! - Cancellable from another thread through a [`CancelHandle`]
//! - A handle-table facade ([`Prober`]) mirroring the native C surface
//!
//! ## Example
//!
//! ```no_run
//! use mediaprobe_probe::{ProbeSession, StreamKind};
//!
//! let mut session = ProbeSession::open("movie.mp4").unwrap();
//!
//! println!("Format: {:?}", session.get(StreamKind::General, 0, "Format").unwrap());
//! for index in 0..session.count(StreamKind::Video).unwrap() {
//!     let width = session.get(StreamKind::Video, index, "Width").unwrap();
//!     let height = session.get(StreamKind::Video, index, "Height").unwrap();
//!     println!("Video {}: {:?}x{:?}", index, width, height);
//! }
//!
//! session.close();
//! ```

pub mod colour;
pub mod error;
pub mod extract;
mod fields;
pub mod options;
pub mod params;
pub mod session;
pub mod table;
pub mod value;

pub use error::{ProbeError, Result};
pub use extract::{extract, ParameterMap};
pub use options::{Charset, SessionOptions};
pub use params::InfoKind;
pub use session::{CancelHandle, ProbeSession, SessionState};
pub use table::{Prober, SessionHandle, NOT_AVAILABLE};
pub use value::Value;

pub use mediaprobe_container::{ContainerFormat, StreamKind};
