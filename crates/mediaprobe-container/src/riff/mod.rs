//! RIFF chunk walking shared by the WAV and AVI readers.
//!
//! Chunk sizes are little-endian and every chunk is padded to an even
//! length. The outer `RIFF` size is clamped to the file, since streaming
//! writers often leave it as zero or `0xFFFFFFFF`.

mod avi;
mod wave;

pub use avi::AviReader;
pub use wave::WaveReader;

use std::fmt;

use bytes::Bytes;
use tracing::{debug, trace};

use crate::error::{Error, Result};
use crate::source::{check_extent, RecordSource};

/// A four-character chunk or list code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FourCc(pub [u8; 4]);

impl FourCc {
    pub const RIFF: Self = Self(*b"RIFF");
    pub const LIST: Self = Self(*b"LIST");
    pub const INFO: Self = Self(*b"INFO");
    pub const FMT: Self = Self(*b"fmt ");
    pub const DATA: Self = Self(*b"data");
    pub const HDRL: Self = Self(*b"hdrl");
    pub const AVIH: Self = Self(*b"avih");
    pub const STRL: Self = Self(*b"strl");
    pub const STRH: Self = Self(*b"strh");
    pub const STRF: Self = Self(*b"strf");
    pub const STRN: Self = Self(*b"strn");
    pub const MOVI: Self = Self(*b"movi");
}

impl fmt::Display for FourCc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(std::str::from_utf8(&self.0).unwrap_or("????"))
    }
}

/// Container-level RIFF records.
#[derive(Debug, Clone)]
pub struct RiffHeader {
    /// Form type (`WAVE`, `AVI `).
    pub form: FourCc,
    /// Size declared by the outer `RIFF` chunk.
    pub riff_size: u32,
    /// AVI main header payload.
    pub avih: Option<Bytes>,
    /// `LIST INFO` payload, list type stripped.
    pub info: Option<Bytes>,
    /// Size of the sample payload (`data` for WAV, `movi` for AVI).
    pub data_size: Option<u64>,
}

impl RiffHeader {
    fn new(form: FourCc, riff_size: u32) -> Self {
        Self {
            form,
            riff_size,
            avih: None,
            info: None,
            data_size: None,
        }
    }
}

/// The `fmt ` chunk of a WAV file.
#[derive(Debug, Clone)]
pub struct WaveFormat {
    /// `WAVEFORMAT`/`WAVEFORMATEX`/`WAVEFORMATEXTENSIBLE` payload.
    pub fmt: Bytes,
    /// Size of the `data` chunk.
    pub data_size: Option<u64>,
}

/// Records of one AVI `strl` list.
#[derive(Debug, Clone, Default)]
pub struct AviStream {
    pub strh: Option<Bytes>,
    pub strf: Option<Bytes>,
    pub strn: Option<Bytes>,
}

/// A located chunk.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Chunk {
    pub id: FourCc,
    pub offset: u64,
    /// Declared payload size.
    pub size: u64,
    /// End of the chunk including its pad byte, bounded by the parent.
    pub end: u64,
}

impl Chunk {
    pub fn data_offset(&self) -> u64 {
        self.offset + 8
    }

    /// Length of the chunk header and payload.
    pub fn length(&self) -> u64 {
        self.size + 8
    }
}

pub(crate) fn next_chunk(src: &mut RecordSource<'_>, pos: u64, end: u64) -> Result<Option<Chunk>> {
    if pos >= end {
        return Ok(None);
    }

    let mut header = [0u8; 8];
    let want = (end - pos).min(8) as usize;
    let got = src.read_header_prefix(pos, &mut header[..want])?;
    if got < 8 {
        if got as u64 == end - pos && header[..got].iter().all(|&b| b == 0) {
            return Ok(None);
        }
        return Err(Error::Truncated("chunk header".into()));
    }

    let id = FourCc([header[0], header[1], header[2], header[3]]);
    let size = u32::from_le_bytes([header[4], header[5], header[6], header[7]]) as u64;
    check_extent(id, pos + 8, size, end)?;

    trace!(chunk = %id, offset = pos, size, "RIFF chunk");
    Ok(Some(Chunk {
        id,
        offset: pos,
        size,
        end: (pos + 8 + size + (size & 1)).min(end),
    }))
}

/// Read the list type of a `LIST` chunk.
pub(crate) fn list_type(src: &mut RecordSource<'_>, chunk: &Chunk) -> Result<Option<FourCc>> {
    if chunk.size < 4 {
        return Ok(None);
    }
    let mut kind = [0u8; 4];
    src.read_header(chunk.data_offset(), &mut kind, chunk.id)?;
    Ok(Some(FourCc(kind)))
}

/// Copy the payload of a chunk.
pub(crate) fn chunk_data(src: &mut RecordSource<'_>, chunk: &Chunk) -> Result<Bytes> {
    src.read_bytes(chunk.data_offset(), chunk.size, chunk.id)
}

/// Copy the payload of a `LIST` chunk after its list type.
pub(crate) fn list_data(src: &mut RecordSource<'_>, chunk: &Chunk) -> Result<Bytes> {
    src.read_bytes(chunk.data_offset() + 4, chunk.size.saturating_sub(4), chunk.id)
}

/// Read the 12-byte RIFF header, check the form type and return the header
/// record together with the end of the RIFF payload.
pub(crate) fn read_riff_header(src: &mut RecordSource<'_>, form: FourCc) -> Result<(RiffHeader, u64)> {
    let mut header = [0u8; 12];
    src.read_header(0, &mut header, FourCc::RIFF)?;
    if header[0..4] != FourCc::RIFF.0 {
        return Err(Error::invalid("missing RIFF header"));
    }
    let found = FourCc([header[8], header[9], header[10], header[11]]);
    if found != form {
        return Err(Error::invalid(format!("RIFF form {} is not {}", found, form)));
    }

    let riff_size = u32::from_le_bytes([header[4], header[5], header[6], header[7]]);
    // Sizes too small to hold the form type mean "until end of file".
    let declared_end = if riff_size < 4 {
        src.len()
    } else {
        8 + riff_size as u64
    };
    let end = declared_end.min(src.len());
    if riff_size < 4 || declared_end != end {
        debug!(declared = riff_size, file_size = src.len(), "Clamped RIFF size to file");
    }
    Ok((RiffHeader::new(form, riff_size), end))
}
