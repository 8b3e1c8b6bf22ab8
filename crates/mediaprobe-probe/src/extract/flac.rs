//! FLAC record decoding.

use bitstream_io::{BigEndian, BitRead, BitReader};
use mediaprobe_container::flac::{FlacHeader, FlacStream};

use super::Params;
use crate::fields::{le_u32, utf8};

/// Decoded STREAMINFO block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamInfo {
    pub min_block_size: u16,
    pub max_block_size: u16,
    pub sample_rate: u32,
    pub channels: u8,
    pub bits_per_sample: u8,
    /// Zero when unknown.
    pub total_samples: u64,
    pub md5: [u8; 16],
}

impl StreamInfo {
    pub fn parse(data: &[u8]) -> Option<Self> {
        let mut reader = BitReader::endian(data, BigEndian);
        let min_block_size = reader.read::<u16>(16).ok()?;
        let max_block_size = reader.read::<u16>(16).ok()?;
        reader.skip(48).ok()?; // min/max frame size
        let sample_rate = reader.read::<u32>(20).ok()?;
        let channels = reader.read::<u8>(3).ok()? + 1;
        let bits_per_sample = reader.read::<u8>(5).ok()? + 1;
        let total_samples = reader.read::<u64>(36).ok()?;
        let mut md5 = [0u8; 16];
        reader.read_bytes(&mut md5).ok()?;
        Some(Self {
            min_block_size,
            max_block_size,
            sample_rate,
            channels,
            bits_per_sample,
            total_samples,
            md5,
        })
    }

    /// Duration in milliseconds, when the sample count is known.
    pub fn duration_ms(&self) -> Option<f64> {
        if self.sample_rate == 0 || self.total_samples == 0 {
            return None;
        }
        Some(self.total_samples as f64 * 1000.0 / self.sample_rate as f64)
    }
}

pub(super) fn header(header: &FlacHeader, params: &mut Params) {
    params.set("Format", "FLAC");
    if let Some(info) = header.streaminfo.as_deref().and_then(StreamInfo::parse) {
        params.set_opt("Duration", info.duration_ms());
    }
    if let Some(comments) = header.vorbis_comment.as_deref() {
        vorbis_comments(comments, params);
    }
}

/// Vorbis comment block: little-endian lengths, UTF-8 `KEY=value` pairs.
fn vorbis_comments(data: &[u8], params: &mut Params) {
    let Some(vendor_len) = le_u32(data, 0) else {
        return;
    };
    let vendor_end = 4 + vendor_len as usize;
    if let Some(vendor) = data.get(4..vendor_end) {
        params.set("Encoded_Library", utf8(vendor));
    }
    let Some(count) = le_u32(data, vendor_end) else {
        return;
    };

    let mut pos = vendor_end + 4;
    for _ in 0..count {
        let Some(len) = le_u32(data, pos) else {
            break;
        };
        let start = pos + 4;
        let Some(comment) = data.get(start..start + len as usize) else {
            break;
        };
        pos = start + len as usize;

        let comment = utf8(comment);
        let Some((key, value)) = comment.split_once('=') else {
            continue;
        };
        let name = match key.to_ascii_uppercase().as_str() {
            "TITLE" => "Title",
            "ALBUM" => "Album",
            "ARTIST" => "Performer",
            "ENCODER" => "Encoded_Application",
            _ => continue,
        };
        params.fill(name, Some(value.to_string()));
    }
}

pub(super) fn stream(stream: &FlacStream, params: &mut Params) {
    params.set("Format", "FLAC");
    params.set("CodecID", "fLaC");
    let Some(info) = StreamInfo::parse(&stream.streaminfo) else {
        return;
    };
    params.set("SamplingRate", info.sample_rate);
    params.set("Channels", info.channels);
    params.set("BitDepth", info.bits_per_sample);
    if info.total_samples > 0 {
        params.set("SamplingCount", info.total_samples);
    }
    params.set_opt("Duration", info.duration_ms());
    if info.min_block_size == info.max_block_size {
        params.set("BlockSize", info.max_block_size);
    }
    if info.md5.iter().any(|&b| b != 0) {
        let hex: String = info.md5.iter().map(|b| format!("{:02X}", b)).collect();
        params.set("MD5_Unencoded", hex);
    }
    params.set_opt("StreamSize", stream.audio_size);
    params.derive_bit_rate();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    fn streaminfo(rate: u32, channels: u8, bits: u8, total: u64) -> Vec<u8> {
        let mut out = vec![0x10, 0x00, 0x10, 0x00, 0, 0, 14, 0, 0x20, 0];
        let packed = ((rate as u64) << 44)
            | (((channels - 1) as u64) << 41)
            | (((bits - 1) as u64) << 36)
            | total;
        out.extend_from_slice(&packed.to_be_bytes());
        out.extend_from_slice(&[0u8; 16]);
        out
    }

    #[test]
    fn test_streaminfo_20_bit_rate() {
        // 655350 Hz exercises every one of the 20 rate bits
        let info = StreamInfo::parse(&streaminfo(655_350, 6, 24, 0xF_0000_0001)).unwrap();
        assert_eq!(info.sample_rate, 655_350);
        assert_eq!(info.channels, 6);
        assert_eq!(info.bits_per_sample, 24);
        assert_eq!(info.total_samples, 0xF_0000_0001);
        assert_eq!(info.min_block_size, 4096);
    }

    #[test]
    fn test_short_streaminfo() {
        assert!(StreamInfo::parse(&streaminfo(44_100, 2, 16, 0)[..20]).is_none());
    }

    #[test]
    fn test_vorbis_comments() {
        let mut data = Vec::new();
        data.extend_from_slice(&6u32.to_le_bytes());
        data.extend_from_slice(b"libFLA");
        data.extend_from_slice(&2u32.to_le_bytes());
        for comment in ["title=Song", "ARTIST=Band"] {
            data.extend_from_slice(&(comment.len() as u32).to_le_bytes());
            data.extend_from_slice(comment.as_bytes());
        }

        let mut params = Params::default();
        vorbis_comments(&data, &mut params);
        let map = params.into_map();
        assert_eq!(map.get("Title"), Some(&Value::from("Song")));
        assert_eq!(map.get("Performer"), Some(&Value::from("Band")));
        assert_eq!(map.get("Encoded_Library"), Some(&Value::from("libFLA")));
    }
}
