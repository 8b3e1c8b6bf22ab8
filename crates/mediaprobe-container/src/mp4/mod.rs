//! MP4 / QuickTime container walking.
//!
//! The reader visits `ftyp`, `moov` and `mdat` at top level and, inside
//! `moov`, every `trak`. Sample tables are not expanded: only the heads of
//! `stts` and `stsz` are copied, which is enough for frame rate and frame
//! count.

mod atoms;
mod reader;

pub use atoms::{boxes, Atom, AtomType, Boxes, HandlerType};
pub use reader::Mp4Reader;

use bytes::Bytes;

use crate::descriptor::Extent;

/// Container-level MP4 records.
#[derive(Debug, Clone, Default)]
pub struct Mp4Movie {
    /// `ftyp` payload.
    pub ftyp: Option<Bytes>,
    /// `mvhd` payload.
    pub mvhd: Option<Bytes>,
    /// `moov/udta` payload.
    pub udta: Option<Bytes>,
    /// Extent of the `moov` box.
    pub moov: Option<Extent>,
    /// Extent of the first `mdat` box.
    pub mdat: Option<Extent>,
    /// Sum of all `mdat` box sizes, headers included.
    pub mdat_size: u64,
}

impl Mp4Movie {
    /// Whether the movie header precedes the media data.
    pub fn is_streamable(&self) -> bool {
        match (self.moov, self.mdat) {
            (Some(moov), Some(mdat)) => moov.offset < mdat.offset,
            (Some(_), None) => true,
            _ => false,
        }
    }
}

/// Records copied out of one `trak`.
#[derive(Debug, Clone)]
pub struct Mp4Track {
    pub handler: HandlerType,
    pub tkhd: Option<Bytes>,
    pub mdhd: Option<Bytes>,
    pub hdlr: Option<Bytes>,
    /// Full `stsd` payload, sample entries included.
    pub stsd: Option<Bytes>,
    /// First 16 bytes of `stts`: version/flags, entry count, first entry.
    pub stts: Option<Bytes>,
    /// First 12 bytes of `stsz`: version/flags, sample size, sample count.
    pub stsz: Option<Bytes>,
    /// Track-level `udta` payload.
    pub udta: Option<Bytes>,
}

impl Mp4Track {
    fn new() -> Self {
        Self {
            handler: HandlerType::Unknown([0; 4]),
            tkhd: None,
            mdhd: None,
            hdlr: None,
            stsd: None,
            stts: None,
            stsz: None,
            udta: None,
        }
    }
}
