//! # mediaprobe-container
//!
//! Container identification and structural record walking.
//!
//! This crate answers two questions about a media file without decoding any
//! sample payload:
//!
//! 1. What container is it? ([`sniff`] matches leading bytes against an
//!    ordered signature table.)
//! 2. Where are its stream descriptors? (one [`ContainerReader`] per format
//!    walks box / element / chunk headers and copies out the records that
//!    describe each stream.)
//!
//! Decoding the copied records into named parameters is the job of
//! `mediaprobe-probe`.
//!
//! ## Supported containers
//!
//! - MP4 / QuickTime (ISO base media boxes)
//! - Matroska and WebM (EBML elements)
//! - WAV and AVI (RIFF chunks)
//! - FLAC (native metadata blocks)
//!
//! ## Example
//!
//! ```no_run
//! use std::fs::File;
//! use mediaprobe_container::{read_container, sniff, Liveness, StreamKind};
//!
//! let mut file = File::open("movie.mp4").unwrap();
//! if let Some(format) = sniff::sniff(&mut file, sniff::DEFAULT_SNIFF_LIMIT).unwrap() {
//!     let parsed = read_container(format, &mut file, &Liveness::new()).unwrap();
//!     println!("{}: {} video stream(s)", format, parsed.count(StreamKind::Video));
//! }
//! ```

pub mod descriptor;
pub mod error;
pub mod flac;
pub mod format;
pub mod liveness;
pub mod mkv;
pub mod mp4;
pub mod riff;
pub mod sniff;
pub mod source;

pub use descriptor::{Extent, ParsedContainer, Record, StreamDescriptor, StreamKind, UnknownStreamKind};
pub use error::{Error, Result};
pub use format::{read_container, read_container_lenient, ContainerFormat, ContainerReader};
pub use liveness::Liveness;
pub use source::{ReadSeek, RecordSource};
