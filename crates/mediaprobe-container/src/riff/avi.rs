//! AVI reader.

use tracing::trace;

use super::{chunk_data, list_data, list_type, next_chunk, read_riff_header, AviStream, Chunk, FourCc, RiffHeader};
use crate::descriptor::{ParsedContainer, Record, StreamKind};
use crate::error::{Error, Result};
use crate::format::ContainerReader;
use crate::source::RecordSource;

/// RIFF `AVI ` reader. Each `strl` list in `hdrl` is one stream.
#[derive(Debug, Clone, Copy, Default)]
pub struct AviReader;

impl ContainerReader for AviReader {
    fn name(&self) -> &'static str {
        "avi"
    }

    fn read(&self, src: &mut RecordSource<'_>, out: &mut ParsedContainer) -> Result<()> {
        let mut header = None;
        let mut end = 0;
        let mut has_hdrl = false;
        let walked = walk(src, out, &mut header, &mut end, &mut has_hdrl);

        if let Some(header) = header {
            out.set_container(0, end, Record::RiffHeader(header));
        }

        walked?;
        if !has_hdrl {
            return Err(Error::MissingRecord("hdrl"));
        }
        Ok(())
    }
}

/// Stream kind for an `strh` `fccType`.
pub fn stream_kind(fcc_type: &[u8]) -> StreamKind {
    match fcc_type {
        b"vids" => StreamKind::Video,
        b"auds" => StreamKind::Audio,
        b"txts" => StreamKind::Text,
        _ => StreamKind::Other,
    }
}

fn walk(
    src: &mut RecordSource<'_>,
    out: &mut ParsedContainer,
    header: &mut Option<RiffHeader>,
    end: &mut u64,
    has_hdrl: &mut bool,
) -> Result<()> {
    let (riff, riff_end) = read_riff_header(src, FourCc(*b"AVI "))?;
    let header = header.insert(riff);
    *end = riff_end;

    let mut pos = 12;
    while let Some(chunk) = next_chunk(src, pos, riff_end)? {
        if chunk.id == FourCc::LIST {
            match list_type(src, &chunk)? {
                Some(FourCc::HDRL) if !*has_hdrl => {
                    *has_hdrl = true;
                    parse_hdrl(src, &chunk, header, out)?;
                }
                Some(FourCc::MOVI) => {
                    trace!(offset = chunk.offset, size = chunk.size, "Skipping movi");
                    header.data_size = Some(chunk.size.saturating_sub(4));
                }
                Some(FourCc::INFO) => header.info = Some(list_data(src, &chunk)?),
                _ => {}
            }
        }
        pos = chunk.end;
    }

    Ok(())
}

fn parse_hdrl(
    src: &mut RecordSource<'_>,
    hdrl: &Chunk,
    header: &mut RiffHeader,
    out: &mut ParsedContainer,
) -> Result<()> {
    let mut pos = hdrl.data_offset() + 4;
    while let Some(chunk) = next_chunk(src, pos, hdrl.end)? {
        match chunk.id {
            FourCc::AVIH => header.avih = Some(chunk_data(src, &chunk)?),
            FourCc::LIST if list_type(src, &chunk)? == Some(FourCc::STRL) => {
                let stream = parse_strl(src, &chunk)?;
                let kind = stream
                    .strh
                    .as_ref()
                    .and_then(|strh| strh.get(0..4))
                    .map(stream_kind)
                    .unwrap_or(StreamKind::Other);
                out.push(kind, chunk.offset, chunk.length(), Record::AviStream(stream));
            }
            _ => {}
        }
        pos = chunk.end;
    }
    Ok(())
}

fn parse_strl(src: &mut RecordSource<'_>, strl: &Chunk) -> Result<AviStream> {
    let mut stream = AviStream::default();
    let mut pos = strl.data_offset() + 4;
    while let Some(chunk) = next_chunk(src, pos, strl.end)? {
        match chunk.id {
            FourCc::STRH => stream.strh = Some(chunk_data(src, &chunk)?),
            FourCc::STRF => stream.strf = Some(chunk_data(src, &chunk)?),
            FourCc::STRN => stream.strn = Some(chunk_data(src, &chunk)?),
            _ => {}
        }
        pos = chunk.end;
    }
    Ok(stream)
}
