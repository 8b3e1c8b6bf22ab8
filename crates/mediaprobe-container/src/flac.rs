//! Native FLAC metadata block walking.

use bytes::Bytes;
use tracing::trace;

use crate::descriptor::{ParsedContainer, Record, StreamKind};
use crate::error::{Error, Result};
use crate::format::ContainerReader;
use crate::source::{check_extent, RecordSource};

/// Metadata block types.
pub const BLOCK_STREAMINFO: u8 = 0;
pub const BLOCK_PADDING: u8 = 1;
pub const BLOCK_VORBIS_COMMENT: u8 = 4;

/// Size of a STREAMINFO block payload.
pub const STREAMINFO_LEN: u64 = 34;

/// Container-level FLAC records.
#[derive(Debug, Clone, Default)]
pub struct FlacHeader {
    pub streaminfo: Option<Bytes>,
    pub vorbis_comment: Option<Bytes>,
    /// Offset of the first audio frame, known once the last block is seen.
    pub audio_offset: Option<u64>,
}

/// The audio stream of a FLAC file.
#[derive(Debug, Clone)]
pub struct FlacStream {
    pub streaminfo: Bytes,
    /// Bytes of encoded audio after the metadata blocks.
    pub audio_size: Option<u64>,
}

/// FLAC reader.
#[derive(Debug, Clone, Copy, Default)]
pub struct FlacReader;

impl ContainerReader for FlacReader {
    fn name(&self) -> &'static str {
        "flac"
    }

    fn read(&self, src: &mut RecordSource<'_>, out: &mut ParsedContainer) -> Result<()> {
        let mut header = FlacHeader::default();
        let walked = walk(src, &mut header);

        let audio_size = header.audio_offset.map(|at| src.len().saturating_sub(at));
        let metadata_len = header.audio_offset.unwrap_or(0);
        let streaminfo = header.streaminfo.clone();
        out.set_container(0, metadata_len, Record::FlacHeader(header));
        if let Some(streaminfo) = streaminfo {
            out.push(
                StreamKind::Audio,
                8,
                STREAMINFO_LEN,
                Record::FlacStream(FlacStream {
                    streaminfo,
                    audio_size,
                }),
            );
        }

        walked?;
        if out.count(StreamKind::Audio) == 0 {
            return Err(Error::MissingRecord("STREAMINFO"));
        }
        Ok(())
    }
}

fn walk(src: &mut RecordSource<'_>, header: &mut FlacHeader) -> Result<()> {
    let end = src.len();
    let mut magic = [0u8; 4];
    src.read_header(0, &mut magic, "fLaC")?;
    if &magic != b"fLaC" {
        return Err(Error::invalid("missing fLaC marker"));
    }

    let mut pos = 4;
    loop {
        let mut block = [0u8; 4];
        src.read_header(pos, &mut block, "metadata block header")?;
        let last = block[0] & 0x80 != 0;
        let block_type = block[0] & 0x7F;
        let len = u32::from_be_bytes([0, block[1], block[2], block[3]]) as u64;
        let data_offset = pos + 4;
        check_extent(format!("metadata block {}", block_type), data_offset, len, end)?;
        trace!(block_type, offset = pos, len, last, "FLAC metadata block");

        match block_type {
            BLOCK_STREAMINFO if header.streaminfo.is_none() => {
                if len < STREAMINFO_LEN {
                    return Err(Error::invalid(format!("STREAMINFO is {} bytes", len)));
                }
                header.streaminfo = Some(src.read_bytes(data_offset, STREAMINFO_LEN, "STREAMINFO")?);
            }
            BLOCK_VORBIS_COMMENT => {
                header.vorbis_comment = Some(src.read_bytes(data_offset, len, "VORBIS_COMMENT")?);
            }
            0x7F => return Err(Error::invalid("reserved metadata block type 127")),
            _ => {}
        }

        pos = data_offset + len;
        if last {
            header.audio_offset = Some(pos);
            return Ok(());
        }
    }
}
