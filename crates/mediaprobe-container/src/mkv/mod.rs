//! Matroska and WebM container walking.
//!
//! WebM is a Matroska profile, so both formats share one reader; the
//! distinction is made by the sniffer from the EBML `DocType`.

pub mod ebml;
mod reader;

pub use reader::MatroskaReader;

use bytes::Bytes;

use crate::descriptor::{Extent, StreamKind};

/// Container-level Matroska records.
#[derive(Debug, Clone, Default)]
pub struct MatroskaSegment {
    /// Payload of the EBML header element.
    pub ebml: Option<Bytes>,
    /// Payload of the segment `Info` element.
    pub info: Option<Bytes>,
    /// Extent of the `Segment` element, header included.
    pub segment: Option<Extent>,
}

/// Payload of a `Chapters` element.
#[derive(Debug, Clone)]
pub struct MatroskaChapters {
    pub payload: Bytes,
}

/// Map a Matroska `TrackType` to a stream kind.
pub fn track_kind(track_type: u64) -> StreamKind {
    match track_type {
        ebml::TRACK_TYPE_VIDEO => StreamKind::Video,
        ebml::TRACK_TYPE_AUDIO => StreamKind::Audio,
        ebml::TRACK_TYPE_SUBTITLE => StreamKind::Text,
        ebml::TRACK_TYPE_BUTTONS => StreamKind::Image,
        _ => StreamKind::Other,
    }
}
