//! EBML primitives: element IDs, variable-length integers and typed payloads.

use std::fmt;

pub const EBML: u32 = 0x1A45_DFA3;
pub const DOC_TYPE: u32 = 0x4282;
pub const DOC_TYPE_VERSION: u32 = 0x4287;
pub const SEGMENT: u32 = 0x1853_8067;
pub const SEEK_HEAD: u32 = 0x114D_9B74;
pub const INFO: u32 = 0x1549_A966;
pub const TIMECODE_SCALE: u32 = 0x2AD7B1;
pub const DURATION: u32 = 0x4489;
pub const DATE_UTC: u32 = 0x4461;
pub const TITLE: u32 = 0x7BA9;
pub const MUXING_APP: u32 = 0x4D80;
pub const WRITING_APP: u32 = 0x5741;
pub const TRACKS: u32 = 0x1654_AE6B;
pub const TRACK_ENTRY: u32 = 0xAE;
pub const TRACK_NUMBER: u32 = 0xD7;
pub const TRACK_UID: u32 = 0x73C5;
pub const TRACK_TYPE: u32 = 0x83;
pub const FLAG_DEFAULT: u32 = 0x88;
pub const FLAG_FORCED: u32 = 0x55AA;
pub const DEFAULT_DURATION: u32 = 0x23E383;
pub const NAME: u32 = 0x536E;
pub const LANGUAGE: u32 = 0x22B59C;
pub const LANGUAGE_BCP47: u32 = 0x22B59D;
pub const CODEC_ID: u32 = 0x86;
pub const CODEC_PRIVATE: u32 = 0x63A2;
pub const VIDEO: u32 = 0xE0;
pub const PIXEL_WIDTH: u32 = 0xB0;
pub const PIXEL_HEIGHT: u32 = 0xBA;
pub const DISPLAY_WIDTH: u32 = 0x54B0;
pub const DISPLAY_HEIGHT: u32 = 0x54BA;
pub const COLOUR: u32 = 0x55B0;
pub const BITS_PER_CHANNEL: u32 = 0x55B2;
pub const MATRIX_COEFFICIENTS: u32 = 0x55B1;
pub const TRANSFER_CHARACTERISTICS: u32 = 0x55BA;
pub const PRIMARIES: u32 = 0x55BB;
pub const AUDIO: u32 = 0xE1;
pub const SAMPLING_FREQUENCY: u32 = 0xB5;
pub const CHANNELS: u32 = 0x9F;
pub const BIT_DEPTH: u32 = 0x6264;
pub const CLUSTER: u32 = 0x1F43_B675;
pub const CUES: u32 = 0x1C53_BB6B;
pub const CHAPTERS: u32 = 0x1043_A770;
pub const EDITION_ENTRY: u32 = 0x45B9;
pub const CHAPTER_ATOM: u32 = 0xB6;
pub const TAGS: u32 = 0x1254_C367;

/// Matroska `TrackType` values.
pub const TRACK_TYPE_VIDEO: u64 = 1;
pub const TRACK_TYPE_AUDIO: u64 = 2;
pub const TRACK_TYPE_BUTTONS: u64 = 16;
pub const TRACK_TYPE_SUBTITLE: u64 = 17;

/// An element ID, formatted the way the Matroska registry lists them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ElementId(pub u32);

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EBML element {:#X}", self.0)
    }
}

/// Decoded element header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    /// Element ID with its length marker bits kept.
    pub id: u32,
    /// Bytes taken by ID and size.
    pub len: usize,
    /// Payload size, `None` when the size is the reserved "unknown" value.
    pub size: Option<u64>,
}

/// Why a header could not be decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderError {
    /// More bytes are needed.
    Short,
    /// A length marker is missing or too wide.
    Invalid,
}

/// Decode an element header from the start of `data`.
pub fn read_header(data: &[u8]) -> Result<Header, HeaderError> {
    let first = *data.first().ok_or(HeaderError::Short)?;
    let id_len = first.leading_zeros() as usize + 1;
    if first == 0 || id_len > 4 {
        return Err(HeaderError::Invalid);
    }
    let id_bytes = data.get(..id_len).ok_or(HeaderError::Short)?;
    let id = id_bytes.iter().fold(0u32, |acc, &b| (acc << 8) | b as u32);

    let rest = &data[id_len..];
    let lead = *rest.first().ok_or(HeaderError::Short)?;
    let size_len = lead.leading_zeros() as usize + 1;
    if lead == 0 {
        return Err(HeaderError::Invalid);
    }
    let size_bytes = rest.get(..size_len).ok_or(HeaderError::Short)?;

    let mask = (0xFFu16 >> size_len) as u8;
    let mut value = (lead & mask) as u64;
    let mut all_ones = lead & mask == mask;
    for &b in &size_bytes[1..] {
        value = (value << 8) | b as u64;
        all_ones &= b == 0xFF;
    }

    Ok(Header {
        id,
        len: id_len + size_len,
        size: if all_ones { None } else { Some(value) },
    })
}

/// Iterator over EBML elements packed in an in-memory buffer.
///
/// Yields `(id, payload)` pairs. An unknown-size element takes the rest of
/// the buffer; iteration stops at the first header that does not fit.
#[derive(Debug, Clone)]
pub struct Elements<'a> {
    data: &'a [u8],
}

/// Iterate over the elements in `data`.
pub fn elements(data: &[u8]) -> Elements<'_> {
    Elements { data }
}

impl<'a> Iterator for Elements<'a> {
    type Item = (u32, &'a [u8]);

    fn next(&mut self) -> Option<Self::Item> {
        let header = read_header(self.data).ok()?;
        let rest = &self.data[header.len..];
        let size = match header.size {
            Some(size) if size <= rest.len() as u64 => size as usize,
            Some(_) => {
                self.data = &[];
                return None;
            }
            None => rest.len(),
        };
        self.data = &rest[size..];
        Some((header.id, &rest[..size]))
    }
}

/// Find the first child with `id`.
pub fn find(data: &[u8], id: u32) -> Option<&[u8]> {
    elements(data).find(|(i, _)| *i == id).map(|(_, p)| p)
}

/// Decode a big-endian unsigned integer of 0 to 8 bytes.
pub fn read_uint(data: &[u8]) -> Option<u64> {
    if data.len() > 8 {
        return None;
    }
    Some(data.iter().fold(0u64, |acc, &b| (acc << 8) | b as u64))
}

/// Decode a big-endian signed integer of 0 to 8 bytes.
pub fn read_int(data: &[u8]) -> Option<i64> {
    if data.is_empty() {
        return Some(0);
    }
    let raw = read_uint(data)?;
    let shift = 64 - 8 * data.len() as u32;
    Some(((raw << shift) as i64) >> shift)
}

/// Decode a 4- or 8-byte IEEE float. An empty payload means 0.
pub fn read_float(data: &[u8]) -> Option<f64> {
    match data.len() {
        0 => Some(0.0),
        4 => Some(f32::from_be_bytes(data.try_into().ok()?) as f64),
        8 => Some(f64::from_be_bytes(data.try_into().ok()?)),
        _ => None,
    }
}

/// Decode a string payload, dropping trailing NUL padding.
pub fn read_string(data: &[u8]) -> String {
    let end = data.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
    String::from_utf8_lossy(&data[..end]).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_header() {
        // Segment, 8-byte size
        let data = [0x18, 0x53, 0x80, 0x67, 0x01, 0, 0, 0, 0, 0, 0x10, 0x00];
        let h = read_header(&data).unwrap();
        assert_eq!(h.id, SEGMENT);
        assert_eq!(h.len, 12);
        assert_eq!(h.size, Some(0x1000));

        // TrackType, 1-byte size
        let h = read_header(&[0x83, 0x81, 0x01]).unwrap();
        assert_eq!((h.id, h.len, h.size), (TRACK_TYPE, 2, Some(1)));
    }

    #[test]
    fn test_unknown_size() {
        let h = read_header(&[0x1F, 0x43, 0xB6, 0x75, 0xFF]).unwrap();
        assert_eq!(h.id, CLUSTER);
        assert_eq!(h.size, None);

        let h = read_header(&[0x18, 0x53, 0x80, 0x67, 0x01, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF])
            .unwrap();
        assert_eq!(h.size, None);
    }

    #[test]
    fn test_header_errors() {
        assert_eq!(read_header(&[]), Err(HeaderError::Short));
        assert_eq!(read_header(&[0x1A, 0x45]), Err(HeaderError::Short));
        assert_eq!(read_header(&[0x00, 0x81]), Err(HeaderError::Invalid));
        assert_eq!(read_header(&[0x83, 0x00]), Err(HeaderError::Invalid));
    }

    #[test]
    fn test_elements_and_values() {
        let data = [
            0x83, 0x81, 0x02, // TrackType = 2
            0x86, 0x85, b'A', b'_', b'A', b'A', b'C', // CodecID
            0xB5, 0x84, 0x47, 0x3B, 0x80, 0x00, // SamplingFrequency = 48000.0f32
        ];
        let found: Vec<_> = elements(&data).map(|(id, _)| id).collect();
        assert_eq!(found, vec![TRACK_TYPE, CODEC_ID, SAMPLING_FREQUENCY]);
        assert_eq!(find(&data, TRACK_TYPE).and_then(read_uint), Some(2));
        assert_eq!(find(&data, CODEC_ID).map(read_string).as_deref(), Some("A_AAC"));
        assert_eq!(find(&data, SAMPLING_FREQUENCY).and_then(read_float), Some(48000.0));
    }

    #[test]
    fn test_read_int_sign_extends() {
        assert_eq!(read_int(&[0xFF]), Some(-1));
        assert_eq!(read_int(&[0x7F]), Some(127));
        assert_eq!(read_int(&[0xFF, 0x00]), Some(-256));
    }

    #[test]
    fn test_read_string_trims_padding() {
        assert_eq!(read_string(b"eng\0\0"), "eng");
        assert_eq!(read_string(b"\0"), "");
    }
}
