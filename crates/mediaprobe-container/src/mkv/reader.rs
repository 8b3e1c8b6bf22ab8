//! Matroska element walker.

use bytes::Bytes;
use tracing::{debug, trace};

use super::ebml::{self, ElementId, HeaderError};
use super::{track_kind, MatroskaChapters, MatroskaSegment};
use crate::descriptor::{Extent, ParsedContainer, Record, StreamKind};
use crate::error::{Error, Result};
use crate::format::ContainerReader;
use crate::source::{check_extent, RecordSource};

/// Longest possible element header: 4-byte ID plus 8-byte size.
const MAX_HEADER: u64 = 12;

/// Top-level segment children the walk resolves through `SeekHead`
/// when they sit behind the clusters.
const SEEKABLE: [u32; 3] = [ebml::INFO, ebml::TRACKS, ebml::CHAPTERS];

const SEEK: u32 = 0x4DBB;
const SEEK_ID: u32 = 0x53AB;
const SEEK_POSITION: u32 = 0x53AC;

/// Matroska / WebM reader.
#[derive(Debug, Clone, Copy, Default)]
pub struct MatroskaReader;

impl ContainerReader for MatroskaReader {
    fn name(&self) -> &'static str {
        "matroska"
    }

    fn read(&self, src: &mut RecordSource<'_>, out: &mut ParsedContainer) -> Result<()> {
        let mut segment = MatroskaSegment::default();
        let walked = walk(src, &mut segment, out);

        let extent = segment.segment.unwrap_or_default();
        let has_segment = segment.segment.is_some();
        out.set_container(
            extent.offset,
            extent.size,
            Record::MatroskaSegment(segment),
        );

        walked?;
        if !has_segment {
            return Err(Error::MissingRecord("Segment"));
        }
        Ok(())
    }
}

/// A located element.
#[derive(Debug, Clone, Copy)]
struct Element {
    id: u32,
    offset: u64,
    header_len: u64,
    /// Payload size; an unknown size is resolved to the parent's end.
    size: u64,
}

impl Element {
    fn data_offset(&self) -> u64 {
        self.offset + self.header_len
    }

    fn end(&self) -> u64 {
        self.data_offset() + self.size
    }

    fn extent(&self) -> Extent {
        Extent {
            offset: self.offset,
            size: self.header_len + self.size,
        }
    }
}

fn next_element(src: &mut RecordSource<'_>, pos: u64, end: u64) -> Result<Option<Element>> {
    match locate(src, pos, end)? {
        Some((el, Some(declared))) => {
            check_extent(ElementId(el.id), el.data_offset(), declared, end)?;
            Ok(Some(el))
        }
        Some((el, None)) => Ok(Some(el)),
        None => Ok(None),
    }
}

/// Decode the element header at `pos` without checking its size against
/// `end`. A size that overruns `end` is clamped and also returned so the
/// caller can report it.
fn locate(src: &mut RecordSource<'_>, pos: u64, end: u64) -> Result<Option<(Element, Option<u64>)>> {
    if pos >= end {
        return Ok(None);
    }

    let mut buf = [0u8; MAX_HEADER as usize];
    let want = (end - pos).min(MAX_HEADER) as usize;
    let got = src.read_header_prefix(pos, &mut buf[..want])?;
    let header = match ebml::read_header(&buf[..got]) {
        Ok(h) => h,
        Err(HeaderError::Short) => return Err(Error::Truncated("EBML element header".into())),
        Err(HeaderError::Invalid) => {
            return Err(Error::invalid(format!(
                "invalid EBML element header at offset {}",
                pos
            )))
        }
    };

    let header_len = header.len as u64;
    let available = end - pos - header_len;
    let (size, overrun) = match header.size {
        Some(size) if size > available => (available, Some(size)),
        Some(size) => (size, None),
        None => (available, None),
    };

    trace!(id = %ElementId(header.id), offset = pos, size, "EBML element");
    let el = Element {
        id: header.id,
        offset: pos,
        header_len,
        size,
    };
    Ok(Some((el, overrun)))
}

fn read_payload(src: &mut RecordSource<'_>, el: &Element) -> Result<Bytes> {
    src.read_bytes(el.data_offset(), el.size, ElementId(el.id))
}

fn walk(
    src: &mut RecordSource<'_>,
    segment: &mut MatroskaSegment,
    out: &mut ParsedContainer,
) -> Result<()> {
    let end = src.len();
    let header = next_element(src, 0, end)?
        .ok_or_else(|| Error::invalid("empty EBML stream"))?;
    if header.id != ebml::EBML {
        return Err(Error::invalid("file does not start with an EBML header"));
    }
    segment.ebml = Some(read_payload(src, &header)?);

    // A truncated file usually cuts the segment short. Its children are
    // still walked up to the end of the file before the overrun is reported.
    let mut pos = header.end();
    while let Some((el, overrun)) = locate(src, pos, end)? {
        if el.id == ebml::SEGMENT && segment.segment.is_none() {
            segment.segment = Some(el.extent());
            parse_segment(src, &el, segment, out)?;
        }
        if let Some(declared) = overrun {
            return Err(Error::overrun(ElementId(el.id), declared, el.size));
        }
        pos = el.end();
    }

    Ok(())
}

/// Which seekable top-level children were visited.
#[derive(Debug, Default)]
struct Visited {
    info: bool,
    tracks: bool,
    chapters: bool,
}

impl Visited {
    fn contains(&self, id: u32) -> bool {
        match id {
            ebml::INFO => self.info,
            ebml::TRACKS => self.tracks,
            ebml::CHAPTERS => self.chapters,
            _ => true,
        }
    }
}

fn parse_segment(
    src: &mut RecordSource<'_>,
    seg: &Element,
    segment: &mut MatroskaSegment,
    out: &mut ParsedContainer,
) -> Result<()> {
    let end = seg.end();
    let mut pos = seg.data_offset();
    let mut visited = Visited::default();
    let mut seeks: Vec<(u32, u64)> = Vec::new();

    while let Some((el, overrun)) = locate(src, pos, end)? {
        if el.id == ebml::CLUSTER {
            debug!(offset = el.offset, "Reached first cluster");
            break;
        }
        if let Some(declared) = overrun {
            // Complete track entries inside a cut-off Tracks are still usable.
            if el.id == ebml::TRACKS && !visited.tracks {
                parse_tracks(src, &el, out)?;
            }
            return Err(Error::overrun(ElementId(el.id), declared, el.size));
        }
        if el.id == ebml::SEEK_HEAD {
            seeks.extend(parse_seek_head(&read_payload(src, &el)?));
        } else {
            visit(src, &el, segment, out, &mut visited)?;
        }
        pos = el.end();
    }

    // Metadata written after the clusters is found through SeekHead.
    for (id, relative) in seeks {
        if !SEEKABLE.contains(&id) || visited.contains(id) {
            continue;
        }
        let at = seg.data_offset().saturating_add(relative);
        if let Some(el) = next_element(src, at, end)? {
            if el.id == id {
                visit(src, &el, segment, out, &mut visited)?;
            }
        }
    }

    Ok(())
}

fn visit(
    src: &mut RecordSource<'_>,
    el: &Element,
    segment: &mut MatroskaSegment,
    out: &mut ParsedContainer,
    visited: &mut Visited,
) -> Result<()> {
    match el.id {
        ebml::INFO if !visited.info => {
            visited.info = true;
            segment.info = Some(read_payload(src, el)?);
        }
        ebml::TRACKS if !visited.tracks => {
            visited.tracks = true;
            parse_tracks(src, el, out)?;
        }
        ebml::CHAPTERS if !visited.chapters => {
            visited.chapters = true;
            let payload = read_payload(src, el)?;
            out.push(
                StreamKind::Menu,
                el.offset,
                el.header_len + el.size,
                Record::MatroskaChapters(MatroskaChapters { payload }),
            );
        }
        _ => {}
    }
    Ok(())
}

fn parse_tracks(src: &mut RecordSource<'_>, tracks: &Element, out: &mut ParsedContainer) -> Result<()> {
    let end = tracks.end();
    let mut pos = tracks.data_offset();

    while let Some(el) = next_element(src, pos, end)? {
        if el.id == ebml::TRACK_ENTRY {
            let payload = read_payload(src, &el)?;
            let track_type = ebml::find(&payload, ebml::TRACK_TYPE)
                .and_then(ebml::read_uint)
                .unwrap_or(0);
            out.push(
                track_kind(track_type),
                el.offset,
                el.header_len + el.size,
                Record::MatroskaTrack(payload),
            );
        }
        pos = el.end();
    }

    Ok(())
}

fn parse_seek_head(payload: &[u8]) -> Vec<(u32, u64)> {
    ebml::elements(payload)
        .filter(|(id, _)| *id == SEEK)
        .filter_map(|(_, seek)| {
            let id = ebml::find(seek, SEEK_ID).and_then(ebml::read_uint)?;
            let position = ebml::find(seek, SEEK_POSITION).and_then(ebml::read_uint)?;
            Some((u32::try_from(id).ok()?, position))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::ContainerFormat;
    use crate::liveness::Liveness;
    use std::io::Cursor;

    fn element(id: &[u8], payload: &[u8]) -> Vec<u8> {
        assert!(payload.len() < 0x3FFF);
        let mut out = id.to_vec();
        out.extend_from_slice(&(0x4000u16 | payload.len() as u16).to_be_bytes());
        out.extend_from_slice(payload);
        out
    }

    fn track(track_type: u8) -> Vec<u8> {
        element(&[0xAE], &[0x83, 0x81, track_type])
    }

    fn file(segment_payload: &[u8]) -> Vec<u8> {
        let mut data = element(&[0x1A, 0x45, 0xDF, 0xA3], &element(&[0x42, 0x82], b"matroska"));
        data.extend(element(&[0x18, 0x53, 0x80, 0x67], segment_payload));
        data
    }

    fn run(data: Vec<u8>) -> (ParsedContainer, Result<()>) {
        let len = data.len() as u64;
        let mut cursor = Cursor::new(data);
        let live = Liveness::new();
        let mut src = RecordSource::new(&mut cursor, len, &live);
        let mut out = ParsedContainer::new(ContainerFormat::Matroska, len);
        let res = MatroskaReader.read(&mut src, &mut out);
        (out, res)
    }

    #[test]
    fn test_tracks_and_chapters() {
        let mut tracks = track(1);
        tracks.extend(track(2));
        tracks.extend(track(17));
        let mut seg = element(&[0x15, 0x49, 0xA9, 0x66], &[0x2A, 0xD7, 0xB1, 0x83, 0x0F, 0x42, 0x40]);
        seg.extend(element(&[0x16, 0x54, 0xAE, 0x6B], &tracks));
        seg.extend(element(&[0x10, 0x43, 0xA7, 0x70], &element(&[0x45, 0xB9], &[])));

        let (out, res) = run(file(&seg));
        res.unwrap();
        let kinds: Vec<_> = out.streams().iter().map(|s| s.kind).collect();
        assert_eq!(
            kinds,
            vec![StreamKind::Video, StreamKind::Audio, StreamKind::Text, StreamKind::Menu]
        );
    }

    #[test]
    fn test_stops_at_cluster() {
        let mut seg = element(&[0x16, 0x54, 0xAE, 0x6B], &track(1));
        seg.extend(element(&[0x1F, 0x43, 0xB6, 0x75], &[0xE7, 0x81, 0x00]));
        // A Tracks element after the first cluster is not visited.
        seg.extend(element(&[0x16, 0x54, 0xAE, 0x6B], &track(2)));

        let (out, res) = run(file(&seg));
        res.unwrap();
        assert_eq!(out.count(StreamKind::Video), 1);
        assert_eq!(out.count(StreamKind::Audio), 0);
    }

    #[test]
    fn test_missing_segment() {
        let data = element(&[0x1A, 0x45, 0xDF, 0xA3], &element(&[0x42, 0x82], b"matroska"));
        let (_, res) = run(data);
        assert!(matches!(res, Err(Error::MissingRecord("Segment"))));
    }

    #[test]
    fn test_unknown_size_segment() {
        let mut data = element(&[0x1A, 0x45, 0xDF, 0xA3], &element(&[0x42, 0x82], b"webm"));
        data.extend_from_slice(&[0x18, 0x53, 0x80, 0x67, 0xFF]);
        data.extend(element(&[0x16, 0x54, 0xAE, 0x6B], &track(2)));

        let (out, res) = run(data);
        res.unwrap();
        assert_eq!(out.count(StreamKind::Audio), 1);
    }

    #[test]
    fn test_truncated_tracks_keep_prefix() {
        let mut tracks = track(1);
        tracks.extend(track(2));
        let mut data = file(&element(&[0x16, 0x54, 0xAE, 0x6B], &tracks));
        data.truncate(data.len() - 2);

        let (out, res) = run(data);
        assert!(res.unwrap_err().is_malformed());
        assert_eq!(out.count(StreamKind::Video), 1);
        assert_eq!(out.count(StreamKind::Audio), 0);
    }
}
