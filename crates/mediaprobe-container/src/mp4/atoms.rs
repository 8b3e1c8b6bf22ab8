//! MP4 atom definitions.

use crate::descriptor::{Extent, StreamKind};

/// Four-character atom type code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AtomType(pub [u8; 4]);

impl AtomType {
    pub const FTYP: Self = Self(*b"ftyp");
    pub const MOOV: Self = Self(*b"moov");
    pub const MDAT: Self = Self(*b"mdat");
    pub const MVHD: Self = Self(*b"mvhd");
    pub const TRAK: Self = Self(*b"trak");
    pub const TKHD: Self = Self(*b"tkhd");
    pub const MDIA: Self = Self(*b"mdia");
    pub const MDHD: Self = Self(*b"mdhd");
    pub const HDLR: Self = Self(*b"hdlr");
    pub const MINF: Self = Self(*b"minf");
    pub const STBL: Self = Self(*b"stbl");
    pub const STSD: Self = Self(*b"stsd");
    pub const STTS: Self = Self(*b"stts");
    pub const STSZ: Self = Self(*b"stsz");
    pub const UDTA: Self = Self(*b"udta");
    pub const META: Self = Self(*b"meta");
    pub const ILST: Self = Self(*b"ilst");
    pub const FREE: Self = Self(*b"free");
    pub const SKIP: Self = Self(*b"skip");
    pub const WIDE: Self = Self(*b"wide");

    /// Get the 4-char code as a string.
    pub fn as_str(&self) -> &str {
        std::str::from_utf8(&self.0).unwrap_or("????")
    }
}

impl std::fmt::Display for AtomType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Parsed atom header.
#[derive(Debug, Clone)]
pub struct Atom {
    /// Atom type code.
    pub atom_type: AtomType,
    /// Atom size including header.
    pub size: u64,
    /// File offset where atom data starts (after header).
    pub data_offset: u64,
    /// Size of the header (8 or 16 bytes).
    pub header_size: u8,
}

impl Atom {
    /// Get the data size (size - header).
    pub fn data_size(&self) -> u64 {
        self.size.saturating_sub(self.header_size as u64)
    }

    /// File offset of the atom header.
    pub fn offset(&self) -> u64 {
        self.data_offset - self.header_size as u64
    }

    /// File offset one past the atom's last byte.
    pub fn end(&self) -> u64 {
        self.offset() + self.size
    }

    /// File extent of the whole atom.
    pub fn extent(&self) -> Extent {
        Extent {
            offset: self.offset(),
            size: self.size,
        }
    }
}

/// Handler type for a track.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerType {
    Video,
    Audio,
    Text,
    Subtitle,
    ClosedCaption,
    Timecode,
    Hint,
    Meta,
    Unknown([u8; 4]),
}

impl HandlerType {
    pub fn from_bytes(bytes: [u8; 4]) -> Self {
        match &bytes {
            b"vide" => Self::Video,
            b"soun" => Self::Audio,
            b"text" => Self::Text,
            b"sbtl" | b"subt" => Self::Subtitle,
            b"clcp" => Self::ClosedCaption,
            b"tmcd" => Self::Timecode,
            b"hint" => Self::Hint,
            b"meta" => Self::Meta,
            _ => Self::Unknown(bytes),
        }
    }

    /// Stream kind a track with this handler is reported as.
    pub fn stream_kind(&self) -> StreamKind {
        match self {
            Self::Video => StreamKind::Video,
            Self::Audio => StreamKind::Audio,
            Self::Text | Self::Subtitle | Self::ClosedCaption => StreamKind::Text,
            _ => StreamKind::Other,
        }
    }
}

/// Iterator over boxes packed in an in-memory buffer.
///
/// Yields `(type, payload)` pairs and stops at the first header that does
/// not fit, so it never reads past `data`.
#[derive(Debug, Clone)]
pub struct Boxes<'a> {
    data: &'a [u8],
}

/// Iterate over the boxes in `data`.
pub fn boxes(data: &[u8]) -> Boxes<'_> {
    Boxes { data }
}

impl<'a> Iterator for Boxes<'a> {
    type Item = (AtomType, &'a [u8]);

    fn next(&mut self) -> Option<Self::Item> {
        let data = self.data;
        if data.len() < 8 {
            return None;
        }
        let size = u32::from_be_bytes([data[0], data[1], data[2], data[3]]) as u64;
        let atom_type = AtomType([data[4], data[5], data[6], data[7]]);

        let (size, header) = match size {
            0 => (data.len() as u64, 8usize),
            1 => {
                let ext: [u8; 8] = data.get(8..16)?.try_into().ok()?;
                (u64::from_be_bytes(ext), 16usize)
            }
            n => (n, 8usize),
        };
        if size < header as u64 || size > data.len() as u64 {
            self.data = &[];
            return None;
        }

        let size = size as usize;
        self.data = &data[size..];
        Some((atom_type, &data[header..size]))
    }
}
