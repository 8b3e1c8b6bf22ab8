//! WAV reader.

use super::{chunk_data, list_data, list_type, next_chunk, read_riff_header, FourCc, RiffHeader, WaveFormat};
use crate::descriptor::{ParsedContainer, Record, StreamKind};
use crate::error::{Error, Result};
use crate::format::ContainerReader;
use crate::source::RecordSource;

/// RIFF `WAVE` reader. The single audio stream is described by `fmt `.
#[derive(Debug, Clone, Copy, Default)]
pub struct WaveReader;

#[derive(Debug)]
struct Walk {
    header: Option<RiffHeader>,
    end: u64,
    /// Offset, length and payload of `fmt `.
    fmt: Option<(u64, u64, bytes::Bytes)>,
}

impl ContainerReader for WaveReader {
    fn name(&self) -> &'static str {
        "wave"
    }

    fn read(&self, src: &mut RecordSource<'_>, out: &mut ParsedContainer) -> Result<()> {
        let mut walk = Walk {
            header: None,
            end: 0,
            fmt: None,
        };
        let walked = walk_chunks(src, &mut walk);

        let data_size = walk.header.as_ref().and_then(|h| h.data_size);
        if let Some(header) = walk.header {
            out.set_container(0, walk.end, Record::RiffHeader(header));
        }
        let has_fmt = walk.fmt.is_some();
        if let Some((offset, length, fmt)) = walk.fmt {
            out.push(
                StreamKind::Audio,
                offset,
                length,
                Record::WaveFormat(WaveFormat { fmt, data_size }),
            );
        }

        walked?;
        if !has_fmt {
            return Err(Error::MissingRecord("fmt "));
        }
        Ok(())
    }
}

fn walk_chunks(src: &mut RecordSource<'_>, walk: &mut Walk) -> Result<()> {
    let (header, end) = read_riff_header(src, FourCc(*b"WAVE"))?;
    let header = walk.header.insert(header);
    walk.end = end;

    let mut pos = 12;
    while let Some(chunk) = next_chunk(src, pos, end)? {
        match chunk.id {
            FourCc::FMT if walk.fmt.is_none() => {
                let data = chunk_data(src, &chunk)?;
                walk.fmt = Some((chunk.offset, chunk.length(), data));
            }
            FourCc::DATA => header.data_size = Some(chunk.size),
            FourCc::LIST => {
                if list_type(src, &chunk)? == Some(FourCc::INFO) {
                    header.info = Some(list_data(src, &chunk)?);
                }
            }
            _ => {}
        }
        pos = chunk.end;
    }

    Ok(())
}
