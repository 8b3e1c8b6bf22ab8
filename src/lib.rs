//! Mediaprobe - media metadata probing in pure Rust
//!
//! Opens audio/video files, identifies the container from its leading bytes
//! and answers MediaInfo-style queries without decoding any sample data.
//! This crate adds a typed [`MediaInfo`] model, parallel batch analysis,
//! TOML configuration and logging setup on top of the
//! [`mediaprobe_probe`] session API.
//!
//! ```no_run
//! let info = mediaprobe::analyze("movie.mkv").unwrap();
//! println!("{}", info.to_json().unwrap());
//! ```

pub mod analyze;
pub mod config;
pub mod logging;
pub mod model;

pub use analyze::{analyze, analyze_all, analyze_dir, analyze_with, read_media_info};
pub use config::{load_config, load_config_or_default, Config};
pub use model::{
    AudioTrack, Extra, Extras, GeneralInfo, HdrFormat, MediaInfo, TextTrack, TimecodeTrack, VideoTrack,
};

pub use mediaprobe_probe::{
    ContainerFormat, InfoKind, ProbeError, ProbeSession, Prober, SessionHandle, SessionOptions,
    StreamKind, Value, NOT_AVAILABLE,
};
