//! Stream descriptors and the records they carry.

use std::fmt;
use std::str::FromStr;

use bytes::Bytes;

use crate::flac::{FlacHeader, FlacStream};
use crate::format::ContainerFormat;
use crate::mkv::{MatroskaChapters, MatroskaSegment};
use crate::mp4::{Mp4Movie, Mp4Track};
use crate::riff::{AviStream, RiffHeader, WaveFormat};

/// Kind of elementary stream.
///
/// Discriminants match the stream enumeration of the native media-inspection
/// library so numeric kinds carry over unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum StreamKind {
    General = 0,
    Video = 1,
    Audio = 2,
    Text = 3,
    Other = 4,
    Image = 5,
    Menu = 6,
}

impl StreamKind {
    /// All stream kinds in enumeration order.
    pub const ALL: [StreamKind; 7] = [
        StreamKind::General,
        StreamKind::Video,
        StreamKind::Audio,
        StreamKind::Text,
        StreamKind::Other,
        StreamKind::Image,
        StreamKind::Menu,
    ];

    /// Canonical name.
    pub fn name(self) -> &'static str {
        match self {
            StreamKind::General => "General",
            StreamKind::Video => "Video",
            StreamKind::Audio => "Audio",
            StreamKind::Text => "Text",
            StreamKind::Other => "Other",
            StreamKind::Image => "Image",
            StreamKind::Menu => "Menu",
        }
    }

    /// Look up a kind by its numeric value.
    pub fn from_index(value: u8) -> Option<Self> {
        Self::ALL.get(value as usize).copied()
    }
}

impl fmt::Display for StreamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error returned when parsing an unrecognised stream kind.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown stream kind: {0}")]
pub struct UnknownStreamKind(pub String);

impl FromStr for StreamKind {
    type Err = UnknownStreamKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Ok(n) = s.parse::<u8>() {
            return Self::from_index(n).ok_or_else(|| UnknownStreamKind(s.to_string()));
        }
        Self::ALL
            .into_iter()
            .find(|k| k.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownStreamKind(s.to_string()))
    }
}

/// The structural record(s) a descriptor points at, copied out of the file.
///
/// Each variant is a decodable sub-type; [`Record::Opaque`] marks a record
/// the extractor does not understand and decodes to nothing.
#[derive(Debug, Clone)]
pub enum Record {
    Mp4Movie(Mp4Movie),
    Mp4Track(Mp4Track),
    MatroskaSegment(MatroskaSegment),
    /// Payload of one `TrackEntry` element.
    MatroskaTrack(Bytes),
    MatroskaChapters(MatroskaChapters),
    RiffHeader(RiffHeader),
    WaveFormat(WaveFormat),
    AviStream(AviStream),
    FlacHeader(FlacHeader),
    FlacStream(FlacStream),
    Opaque([u8; 4]),
}

/// A byte range within the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Extent {
    pub offset: u64,
    pub size: u64,
}

/// One elementary stream located in a container.
#[derive(Debug, Clone)]
pub struct StreamDescriptor {
    /// Stream kind.
    pub kind: StreamKind,
    /// Index within `kind` (0-based).
    pub index: usize,
    /// Position among all non-general streams in container order (0-based).
    pub order: usize,
    /// File offset of the descriptor record.
    pub offset: u64,
    /// Length of the descriptor record in bytes.
    pub length: u64,
    /// Copied record data.
    pub record: Record,
}

/// Result of walking a container: a container-level record plus the
/// stream descriptors found so far.
///
/// Readers push descriptors as each stream record completes, so a walk that
/// fails midway still leaves a consistent prefix.
#[derive(Debug, Clone)]
pub struct ParsedContainer {
    /// Format the walk was performed with.
    pub format: ContainerFormat,
    /// Total file size in bytes.
    pub file_size: u64,
    general: Option<StreamDescriptor>,
    streams: Vec<StreamDescriptor>,
}

impl ParsedContainer {
    /// Create an empty result for `format`.
    pub fn new(format: ContainerFormat, file_size: u64) -> Self {
        Self {
            format,
            file_size,
            general: None,
            streams: Vec::new(),
        }
    }

    /// Set the container-level record, replacing any previous one.
    pub fn set_container(&mut self, offset: u64, length: u64, record: Record) {
        self.general = Some(StreamDescriptor {
            kind: StreamKind::General,
            index: 0,
            order: 0,
            offset,
            length,
            record,
        });
    }

    /// Append a stream descriptor, assigning its per-kind index and order.
    pub fn push(&mut self, kind: StreamKind, offset: u64, length: u64, record: Record) {
        let index = self.count(kind);
        let order = self.streams.len();
        tracing::trace!(%kind, index, offset, length, "Located stream descriptor");
        self.streams.push(StreamDescriptor {
            kind,
            index,
            order,
            offset,
            length,
            record,
        });
    }

    /// Number of streams of `kind`. The general stream always counts as one.
    pub fn count(&self, kind: StreamKind) -> usize {
        if kind == StreamKind::General {
            return 1;
        }
        self.streams.iter().filter(|s| s.kind == kind).count()
    }

    /// Non-general stream descriptors in container order.
    pub fn streams(&self) -> &[StreamDescriptor] {
        &self.streams
    }

    /// All descriptors, the general stream first.
    ///
    /// A general descriptor is synthesised with an opaque record when the
    /// reader never reached the container-level record.
    pub fn into_descriptors(self) -> Vec<StreamDescriptor> {
        let general = self.general.unwrap_or(StreamDescriptor {
            kind: StreamKind::General,
            index: 0,
            order: 0,
            offset: 0,
            length: 0,
            record: Record::Opaque(*b"none"),
        });
        let mut all = Vec::with_capacity(self.streams.len() + 1);
        all.push(general);
        all.extend(self.streams);
        all
    }
}
