//! MP4 file reader with atom walking.

use tracing::{debug, trace};

use super::{Atom, AtomType, HandlerType, Mp4Movie, Mp4Track};
use crate::descriptor::{ParsedContainer, Record};
use crate::error::{Error, Result};
use crate::format::ContainerReader;
use crate::source::RecordSource;

/// Bytes of `stts` kept per track.
const STTS_HEAD: u64 = 16;
/// Bytes of `stsz` kept per track.
const STSZ_HEAD: u64 = 12;

/// MP4 / QuickTime reader.
#[derive(Debug, Clone, Copy, Default)]
pub struct Mp4Reader;

impl ContainerReader for Mp4Reader {
    fn name(&self) -> &'static str {
        "mp4"
    }

    fn read(&self, src: &mut RecordSource<'_>, out: &mut ParsedContainer) -> Result<()> {
        let mut movie = Mp4Movie::default();
        let walked = walk(src, &mut movie, out);

        let (offset, length) = movie.moov.map(|m| (m.offset, m.size)).unwrap_or((0, 0));
        let has_moov = movie.moov.is_some();
        out.set_container(offset, length, Record::Mp4Movie(movie));

        walked?;
        if !has_moov {
            return Err(Error::MissingRecord("moov"));
        }
        Ok(())
    }
}

/// Read the atom header at `pos`, bounded by `end`.
///
/// Returns `Ok(None)` at the end of the parent, including trailing zero
/// padding shorter than a header (QuickTime terminates some lists that way).
fn next_atom(src: &mut RecordSource<'_>, pos: u64, end: u64) -> Result<Option<Atom>> {
    match locate(src, pos, end)? {
        Some((atom, Some(declared))) => Err(Error::overrun(atom.atom_type, declared, end - pos)),
        Some((atom, None)) => Ok(Some(atom)),
        None => Ok(None),
    }
}

/// Decode the atom header at `pos`. A size that overruns `end` is clamped
/// and the declared size returned alongside.
fn locate(src: &mut RecordSource<'_>, pos: u64, end: u64) -> Result<Option<(Atom, Option<u64>)>> {
    if pos >= end {
        return Ok(None);
    }

    let mut header = [0u8; 16];
    let want = (end - pos).min(16) as usize;
    let got = src.read_header_prefix(pos, &mut header[..want])?;
    if got < 8 {
        if got as u64 == end - pos && header[..got].iter().all(|&b| b == 0) {
            return Ok(None);
        }
        return Err(Error::Truncated("box header".into()));
    }

    let size = u32::from_be_bytes([header[0], header[1], header[2], header[3]]) as u64;
    let atom_type = AtomType([header[4], header[5], header[6], header[7]]);

    let (actual_size, header_size) = if size == 1 {
        // 64-bit extended size
        if got < 16 {
            return Err(Error::Truncated(atom_type.to_string()));
        }
        let mut ext = [0u8; 8];
        ext.copy_from_slice(&header[8..16]);
        (u64::from_be_bytes(ext), 16u8)
    } else if size == 0 {
        // Atom extends to end of parent
        (end - pos, 8u8)
    } else {
        (size, 8u8)
    };

    if actual_size < header_size as u64 {
        return Err(Error::invalid(format!(
            "box {} declares size {} smaller than its header",
            atom_type, actual_size
        )));
    }
    let remaining = end - pos;
    let (size, overrun) = if actual_size > remaining {
        (remaining, Some(actual_size))
    } else {
        (actual_size, None)
    };

    trace!(atom = %atom_type, offset = pos, size, "MP4 box");
    let atom = Atom {
        atom_type,
        size,
        data_offset: pos + header_size as u64,
        header_size,
    };
    Ok(Some((atom, overrun)))
}

/// Read and validate atom data.
fn read_atom_data(src: &mut RecordSource<'_>, atom: &Atom) -> Result<bytes::Bytes> {
    src.read_bytes(atom.data_offset, atom.data_size(), atom.atom_type)
}

fn walk(src: &mut RecordSource<'_>, movie: &mut Mp4Movie, out: &mut ParsedContainer) -> Result<()> {
    let end = src.len();
    let mut pos = 0;

    // A top-level box cut short by the end of the file is still walked up to
    // the end before the overrun is reported.
    while let Some((atom, overrun)) = locate(src, pos, end)? {
        if let Some(declared) = overrun {
            debug!(atom = %atom.atom_type, declared, available = atom.size, "Top-level box overruns file");
        }
        match atom.atom_type {
            AtomType::FTYP => movie.ftyp = Some(read_atom_data(src, &atom)?),
            AtomType::MOOV => {
                movie.moov = Some(atom.extent());
                parse_moov(src, &atom, movie, out)?;
            }
            AtomType::MDAT => {
                if movie.mdat.is_none() {
                    movie.mdat = Some(atom.extent());
                }
                movie.mdat_size += atom.size;
            }
            _ => {}
        }
        if let Some(declared) = overrun {
            return Err(Error::overrun(atom.atom_type, declared, atom.size));
        }
        pos = atom.end();
    }

    Ok(())
}

fn parse_moov(
    src: &mut RecordSource<'_>,
    moov: &Atom,
    movie: &mut Mp4Movie,
    out: &mut ParsedContainer,
) -> Result<()> {
    let end = moov.end();
    let mut pos = moov.data_offset;

    while let Some(child) = next_atom(src, pos, end)? {
        match child.atom_type {
            AtomType::MVHD => movie.mvhd = Some(read_atom_data(src, &child)?),
            AtomType::UDTA => movie.udta = Some(read_atom_data(src, &child)?),
            AtomType::TRAK => {
                let track = parse_trak(src, &child)?;
                let kind = track.handler.stream_kind();
                out.push(kind, child.offset(), child.size, Record::Mp4Track(track));
            }
            _ => {}
        }
        pos = child.end();
    }

    Ok(())
}

fn parse_trak(src: &mut RecordSource<'_>, trak: &Atom) -> Result<Mp4Track> {
    let mut track = Mp4Track::new();
    let end = trak.end();
    let mut pos = trak.data_offset;

    while let Some(child) = next_atom(src, pos, end)? {
        match child.atom_type {
            AtomType::TKHD => track.tkhd = Some(read_atom_data(src, &child)?),
            AtomType::MDIA => parse_mdia(src, &child, &mut track)?,
            AtomType::UDTA => track.udta = Some(read_atom_data(src, &child)?),
            _ => {}
        }
        pos = child.end();
    }

    Ok(track)
}

fn parse_mdia(src: &mut RecordSource<'_>, mdia: &Atom, track: &mut Mp4Track) -> Result<()> {
    let end = mdia.end();
    let mut pos = mdia.data_offset;

    while let Some(child) = next_atom(src, pos, end)? {
        match child.atom_type {
            AtomType::MDHD => track.mdhd = Some(read_atom_data(src, &child)?),
            AtomType::HDLR => {
                let data = read_atom_data(src, &child)?;
                if data.len() >= 12 {
                    track.handler = HandlerType::from_bytes([data[8], data[9], data[10], data[11]]);
                }
                track.hdlr = Some(data);
            }
            AtomType::MINF => parse_minf(src, &child, track)?,
            _ => {}
        }
        pos = child.end();
    }

    Ok(())
}

fn parse_minf(src: &mut RecordSource<'_>, minf: &Atom, track: &mut Mp4Track) -> Result<()> {
    let end = minf.end();
    let mut pos = minf.data_offset;

    while let Some(child) = next_atom(src, pos, end)? {
        if child.atom_type == AtomType::STBL {
            parse_stbl(src, &child, track)?;
        }
        pos = child.end();
    }

    Ok(())
}

fn parse_stbl(src: &mut RecordSource<'_>, stbl: &Atom, track: &mut Mp4Track) -> Result<()> {
    let end = stbl.end();
    let mut pos = stbl.data_offset;

    while let Some(child) = next_atom(src, pos, end)? {
        match child.atom_type {
            AtomType::STSD => track.stsd = Some(read_atom_data(src, &child)?),
            AtomType::STTS => {
                track.stts = Some(src.read_head(
                    child.data_offset,
                    child.data_size(),
                    STTS_HEAD,
                    child.atom_type,
                )?)
            }
            AtomType::STSZ => {
                track.stsz = Some(src.read_head(
                    child.data_offset,
                    child.data_size(),
                    STSZ_HEAD,
                    child.atom_type,
                )?)
            }
            _ => {}
        }
        pos = child.end();
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::StreamKind;
    use crate::format::ContainerFormat;
    use crate::liveness::Liveness;
    use std::io::Cursor;

    fn atom(kind: &[u8; 4], payload: &[u8]) -> Vec<u8> {
        let mut out = ((payload.len() + 8) as u32).to_be_bytes().to_vec();
        out.extend_from_slice(kind);
        out.extend_from_slice(payload);
        out
    }

    fn hdlr(handler: &[u8; 4]) -> Vec<u8> {
        let mut payload = vec![0u8; 8];
        payload.extend_from_slice(handler);
        payload.extend_from_slice(&[0u8; 13]);
        atom(b"hdlr", &payload)
    }

    fn trak(handler: &[u8; 4]) -> Vec<u8> {
        atom(b"trak", &atom(b"mdia", &hdlr(handler)))
    }

    fn run(data: Vec<u8>) -> (ParsedContainer, Result<()>) {
        let len = data.len() as u64;
        let mut cursor = Cursor::new(data);
        let live = Liveness::new();
        let mut src = RecordSource::new(&mut cursor, len, &live);
        let mut out = ParsedContainer::new(ContainerFormat::Mp4, len);
        let res = Mp4Reader.read(&mut src, &mut out);
        (out, res)
    }

    #[test]
    fn test_walks_tracks_in_order() {
        let mut moov_payload = atom(b"mvhd", &[0u8; 100]);
        moov_payload.extend(trak(b"vide"));
        moov_payload.extend(trak(b"soun"));
        moov_payload.extend(trak(b"sbtl"));

        let mut file = atom(b"ftyp", b"isom\0\0\x02\0isom");
        file.extend(atom(b"moov", &moov_payload));
        file.extend(atom(b"mdat", &[0u8; 32]));

        let (out, res) = run(file);
        res.unwrap();
        let kinds: Vec<_> = out.streams().iter().map(|s| s.kind).collect();
        assert_eq!(kinds, vec![StreamKind::Video, StreamKind::Audio, StreamKind::Text]);
    }

    #[test]
    fn test_missing_moov() {
        let mut file = atom(b"ftyp", b"isom\0\0\x02\0");
        file.extend(atom(b"mdat", &[0u8; 16]));

        let (out, res) = run(file);
        assert!(matches!(res, Err(Error::MissingRecord("moov"))));
        assert_eq!(out.count(StreamKind::Video), 0);
    }

    #[test]
    fn test_overrun_keeps_earlier_tracks() {
        let mut moov_payload = trak(b"vide");
        // Second trak declares more bytes than its parent holds.
        moov_payload.extend_from_slice(&[0, 0, 0x10, 0]);
        moov_payload.extend_from_slice(b"trak");

        let file = atom(b"moov", &moov_payload);
        let (out, res) = run(file);
        assert!(matches!(res, Err(Error::RecordOverrun { .. })));
        assert_eq!(out.count(StreamKind::Video), 1);
    }

    #[test]
    fn test_truncated_moov_keeps_complete_tracks() {
        let mut moov_payload = atom(b"mvhd", &[0u8; 100]);
        moov_payload.extend(trak(b"vide"));
        moov_payload.extend(trak(b"soun"));
        let mut file = atom(b"ftyp", b"isom\0\0\x02\0isom");
        let moov = atom(b"moov", &moov_payload);
        // Cut inside the second trak.
        let cut = moov.len() - 10;
        file.extend_from_slice(&moov[..cut]);

        let (out, res) = run(file);
        assert!(matches!(res, Err(Error::RecordOverrun { .. })));
        assert_eq!(out.count(StreamKind::Video), 1);
        assert_eq!(out.count(StreamKind::Audio), 0);
    }

    #[test]
    fn test_mdat_size_sums_every_box() {
        let mut file = atom(b"moov", &trak(b"soun"));
        file.extend(atom(b"mdat", &[0u8; 32]));
        file.extend(atom(b"free", &[0u8; 8]));
        file.extend(atom(b"mdat", &[0u8; 24]));

        let (out, res) = run(file);
        res.unwrap();
        let general = out.into_descriptors().remove(0);
        let Record::Mp4Movie(movie) = general.record else {
            panic!("missing movie record");
        };
        assert_eq!(movie.mdat.map(|m| m.size), Some(40));
        assert_eq!(movie.mdat_size, 40 + 32);
    }

    #[test]
    fn test_size_zero_extends_to_end() {
        let mut file = atom(b"moov", &trak(b"soun"));
        file.extend_from_slice(&[0, 0, 0, 0]);
        file.extend_from_slice(b"mdat");
        file.extend_from_slice(&[0u8; 40]);

        let (out, res) = run(file);
        res.unwrap();
        assert_eq!(out.count(StreamKind::Audio), 1);
    }

    #[test]
    fn test_largesize_header() {
        let mut file = atom(b"moov", &trak(b"vide"));
        file.extend_from_slice(&[0, 0, 0, 1]);
        file.extend_from_slice(b"mdat");
        file.extend_from_slice(&24u64.to_be_bytes());
        file.extend_from_slice(&[0u8; 8]);

        let (_, res) = run(file);
        res.unwrap();
    }
}
