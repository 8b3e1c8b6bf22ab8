//! Synthetic media files for tests and benchmarks.
//!
//! Each builder writes a small, well-formed file of one container format
//! with no real sample payload. Field values are chosen by the caller so
//! tests can assert exact decodes.

pub mod flac;
pub mod mkv;
pub mod mp4;
pub mod riff;

pub use flac::FlacBuilder;
pub use mkv::{MkvBuilder, MkvTrack};
pub use mp4::{Mp4Builder, TrackSpec};
pub use riff::{AviBuilder, AviStreamSpec, WavBuilder};

use std::io::Write;

use tempfile::NamedTempFile;

/// Write `data` to a temporary file whose name ends in `suffix`.
///
/// The file is deleted when the returned handle is dropped.
pub fn write_temp(data: &[u8], suffix: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new()
        .prefix("mediaprobe-")
        .suffix(suffix)
        .tempfile()
        .expect("failed to create temp file");
    file.write_all(data).expect("failed to write temp file");
    file.flush().expect("failed to flush temp file");
    file
}

/// The scenario file: one AVC video track whose media duration is 120000
/// at timescale 1000, plus an AAC audio track.
pub fn sample_mp4() -> Vec<u8> {
    Mp4Builder::new()
        .movie(1000, 120_000)
        .track(TrackSpec::video(1920, 1080).timing(1000, 120_000, 40, 3000))
        .track(TrackSpec::audio(2, 48_000).timing(48_000, 5_760_000, 1024, 5625))
        .build()
}
