//! Codec configuration records and codec naming.
//!
//! Only the headers of the configuration records are decoded: enough for
//! profile, level, chroma subsampling and bit depth. Parameter sets are
//! skipped, not parsed.

use bitstream_io::{BigEndian, BitRead, BitReader};

use crate::fields::{be_u16, be_u32, u8_at};

/// Header of an `AVCDecoderConfigurationRecord` (`avcC`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AvcConfig {
    pub profile: u8,
    pub compatibility: u8,
    pub level: u8,
    /// `chroma_format_idc`, present for High profiles.
    pub chroma_format: Option<u8>,
    pub bit_depth: Option<u8>,
}

impl AvcConfig {
    pub fn parse(data: &[u8]) -> Option<Self> {
        if u8_at(data, 0)? != 1 {
            return None;
        }
        let profile = u8_at(data, 1)?;
        let compatibility = u8_at(data, 2)?;
        let level = u8_at(data, 3)?;

        let mut config = Self {
            profile,
            compatibility,
            level,
            chroma_format: None,
            bit_depth: None,
        };

        // Skip the SPS and PPS arrays to reach the High profile extension.
        let mut pos = 5;
        let sps_count = u8_at(data, pos)? & 0x1F;
        pos += 1;
        for _ in 0..sps_count {
            pos += 2 + be_u16(data, pos)? as usize;
        }
        let pps_count = u8_at(data, pos).unwrap_or(0);
        pos += 1;
        for _ in 0..pps_count {
            match be_u16(data, pos) {
                Some(len) => pos += 2 + len as usize,
                None => return Some(config),
            }
        }
        if has_chroma_extension(profile) {
            if let (Some(chroma), Some(depth)) = (u8_at(data, pos), u8_at(data, pos + 1)) {
                config.chroma_format = Some(chroma & 0x03);
                config.bit_depth = Some((depth & 0x07) + 8);
            }
        }
        Some(config)
    }

    /// `High@L4.1` style profile string.
    pub fn profile_string(&self) -> String {
        let name = avc_profile_name(self.profile, self.compatibility);
        format!("{}@L{}", name, avc_level(self.level))
    }
}

fn has_chroma_extension(profile: u8) -> bool {
    matches!(profile, 100 | 110 | 122 | 144 | 244 | 44 | 83 | 86 | 118 | 128 | 134 | 135 | 138 | 139)
}

fn avc_profile_name(profile: u8, compatibility: u8) -> String {
    match profile {
        66 if compatibility & 0x40 != 0 => "Constrained Baseline".to_string(),
        66 => "Baseline".to_string(),
        77 => "Main".to_string(),
        88 => "Extended".to_string(),
        100 => "High".to_string(),
        110 => "High 10".to_string(),
        122 => "High 4:2:2".to_string(),
        244 => "High 4:4:4 Predictive".to_string(),
        44 => "CAVLC 4:4:4 Intra".to_string(),
        other => other.to_string(),
    }
}

fn avc_level(level: u8) -> String {
    if level % 10 == 0 {
        (level / 10).to_string()
    } else {
        format!("{}.{}", level / 10, level % 10)
    }
}

/// Header of an `HEVCDecoderConfigurationRecord` (`hvcC`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HevcConfig {
    pub profile: u8,
    pub high_tier: bool,
    pub level: u8,
    pub chroma_format: u8,
    pub bit_depth: u8,
}

impl HevcConfig {
    pub fn parse(data: &[u8]) -> Option<Self> {
        if u8_at(data, 0)? != 1 {
            return None;
        }
        let ptl = u8_at(data, 1)?;
        Some(Self {
            profile: ptl & 0x1F,
            high_tier: ptl & 0x20 != 0,
            level: u8_at(data, 12)?,
            chroma_format: u8_at(data, 16)? & 0x03,
            bit_depth: (u8_at(data, 17)? & 0x07) + 8,
        })
    }

    /// `Main 10@L5.1@High` style profile string.
    pub fn profile_string(&self) -> String {
        let name = match self.profile {
            1 => "Main".to_string(),
            2 => "Main 10".to_string(),
            3 => "Main Still".to_string(),
            4 => "Format Range".to_string(),
            other => other.to_string(),
        };
        let major = self.level / 30;
        let minor = (self.level % 30) / 3;
        let level = if minor == 0 {
            major.to_string()
        } else {
            format!("{}.{}", major, minor)
        };
        let tier = if self.high_tier { "High" } else { "Main" };
        format!("{}@L{}@{}", name, level, tier)
    }
}

/// Chroma subsampling string for a `chroma_format_idc`.
pub fn chroma_subsampling(chroma_format: u8) -> Option<&'static str> {
    match chroma_format {
        0 => Some("4:0:0"),
        1 => Some("4:2:0"),
        2 => Some("4:2:2"),
        3 => Some("4:4:4"),
        _ => None,
    }
}

/// Fields of an MPEG-4 `ES_Descriptor` (`esds` payload).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EsDescriptor {
    pub object_type: Option<u8>,
    pub max_bitrate: Option<u32>,
    pub avg_bitrate: Option<u32>,
    pub decoder_specific: Option<Vec<u8>>,
}

const ES_DESCR_TAG: u8 = 0x03;
const DECODER_CONFIG_TAG: u8 = 0x04;
const DECODER_SPECIFIC_TAG: u8 = 0x05;

impl EsDescriptor {
    /// Parse an `esds` payload (version and flags first).
    pub fn parse(data: &[u8]) -> Option<Self> {
        let mut out = Self::default();
        let (tag, body) = descriptor(data.get(4..)?)?;
        if tag != ES_DESCR_TAG {
            return None;
        }
        let flags = u8_at(body.0, 2)?;
        let mut skip = 3;
        if flags & 0x80 != 0 {
            skip += 2;
        }
        if flags & 0x40 != 0 {
            skip += 1 + u8_at(body.0, skip)? as usize;
        }
        if flags & 0x20 != 0 {
            skip += 2;
        }

        let mut rest = body.0.get(skip..)?;
        while let Some((tag, (payload, next))) = descriptor(rest) {
            if tag == DECODER_CONFIG_TAG {
                out.object_type = u8_at(payload, 0);
                out.max_bitrate = be_u32(payload, 5).filter(|&v| v > 0);
                out.avg_bitrate = be_u32(payload, 9).filter(|&v| v > 0);
                if let Some((DECODER_SPECIFIC_TAG, (dsi, _))) = payload.get(13..).and_then(descriptor) {
                    out.decoder_specific = Some(dsi.to_vec());
                }
            }
            rest = next;
        }
        Some(out)
    }

    /// Audio format name for the object type indication.
    pub fn format(&self) -> Option<&'static str> {
        Some(match self.object_type? {
            0x40 | 0x66 | 0x67 | 0x68 => "AAC",
            0x69 | 0x6B => "MPEG Audio",
            0xA5 => "AC-3",
            0xA6 => "E-AC-3",
            0xA9 => "DTS",
            0xAD => "Opus",
            0x20 => "MPEG-4 Visual",
            0x21 => "AVC",
            _ => return None,
        })
    }
}

/// Split one tagged descriptor off `data`: `(tag, (payload, rest))`.
///
/// Lengths use up to four bytes of 7-bit continuation encoding.
fn descriptor(data: &[u8]) -> Option<(u8, (&[u8], &[u8]))> {
    let tag = *data.first()?;
    let mut len = 0usize;
    let mut pos = 1;
    loop {
        let b = *data.get(pos)?;
        len = (len << 7) | (b & 0x7F) as usize;
        pos += 1;
        if b & 0x80 == 0 || pos > 4 {
            break;
        }
    }
    let payload = data.get(pos..pos.checked_add(len)?)?;
    Some((tag, (payload, &data[pos + len..])))
}

/// Leading fields of an AAC `AudioSpecificConfig`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AacConfig {
    pub object_type: u8,
    pub sampling_rate: Option<u32>,
    pub channel_config: u8,
}

const AAC_SAMPLING_RATES: [u32; 13] = [
    96000, 88200, 64000, 48000, 44100, 32000, 24000, 22050, 16000, 12000, 11025, 8000, 7350,
];

impl AacConfig {
    pub fn parse(data: &[u8]) -> Option<Self> {
        let mut reader = BitReader::endian(data, BigEndian);
        let mut object_type: u8 = reader.read(5).ok()?;
        if object_type == 31 {
            object_type = 32 + reader.read::<u8>(6).ok()?;
        }
        let index: u8 = reader.read(4).ok()?;
        let sampling_rate = if index == 15 {
            Some(reader.read::<u32>(24).ok()?)
        } else {
            AAC_SAMPLING_RATES.get(index as usize).copied()
        };
        let channel_config: u8 = reader.read(4).ok()?;
        Some(Self {
            object_type,
            sampling_rate,
            channel_config,
        })
    }
}

/// Video format name for an MP4 sample entry code.
pub fn mp4_video_format(code: &[u8; 4]) -> Option<&'static str> {
    Some(match code {
        b"avc1" | b"avc3" => "AVC",
        b"hvc1" | b"hev1" => "HEVC",
        b"av01" => "AV1",
        b"vp08" => "VP8",
        b"vp09" => "VP9",
        b"mp4v" => "MPEG-4 Visual",
        b"apco" | b"apcs" | b"apcn" | b"apch" | b"ap4h" | b"ap4x" => "ProRes",
        b"jpeg" | b"mjpa" => "JPEG",
        b"dvh1" | b"dvhe" => "HEVC",
        _ => return None,
    })
}

/// ProRes profile for a sample entry code.
pub fn prores_profile(code: &[u8; 4]) -> Option<&'static str> {
    Some(match code {
        b"apco" => "Proxy",
        b"apcs" => "LT",
        b"apcn" => "422",
        b"apch" => "422 HQ",
        b"ap4h" => "4444",
        b"ap4x" => "4444 XQ",
        _ => return None,
    })
}

/// Audio format name for an MP4 sample entry code.
pub fn mp4_audio_format(code: &[u8; 4]) -> Option<&'static str> {
    Some(match code {
        b"mp4a" => "AAC",
        b"ac-3" => "AC-3",
        b"ec-3" => "E-AC-3",
        b"Opus" => "Opus",
        b"fLaC" => "FLAC",
        b"alac" => "ALAC",
        b".mp3" => "MPEG Audio",
        b"lpcm" | b"sowt" | b"twos" | b"raw " | b"in24" | b"in32" | b"fl32" | b"fl64" => "PCM",
        b"alaw" => "A-Law",
        b"ulaw" => "U-Law",
        _ => return None,
    })
}

/// Byte order and signedness of a QuickTime PCM sample entry code.
pub fn pcm_settings(code: &[u8; 4]) -> Option<(&'static str, Option<&'static str>)> {
    Some(match code {
        b"twos" => ("Big", Some("Signed")),
        b"sowt" => ("Little", Some("Signed")),
        b"raw " => ("Little", Some("Unsigned")),
        b"in24" | b"in32" => ("Big", Some("Signed")),
        b"fl32" | b"fl64" => ("Big", None),
        _ => return None,
    })
}

/// Endianness and sign from the format flags of an `lpcm` sound
/// description (float 0x1, big-endian 0x2, signed integer 0x4).
pub fn lpcm_settings(flags: u32) -> (&'static str, Option<&'static str>) {
    let endianness = if flags & 0x2 != 0 { "Big" } else { "Little" };
    let sign = match (flags & 0x1 != 0, flags & 0x4 != 0) {
        (true, _) => None,
        (false, true) => Some("Signed"),
        (false, false) => Some("Unsigned"),
    };
    (endianness, sign)
}

/// Text format name for an MP4 sample entry code.
pub fn mp4_text_format(code: &[u8; 4]) -> Option<&'static str> {
    Some(match code {
        b"tx3g" | b"text" => "Timed Text",
        b"wvtt" => "WebVTT",
        b"stpp" => "TTML",
        b"c608" => "EIA-608",
        b"c708" => "EIA-708",
        _ => return None,
    })
}

/// Format name for a Matroska `CodecID`.
pub fn matroska_format(codec_id: &str) -> Option<&'static str> {
    let format = match codec_id {
        "V_MPEG4/ISO/AVC" => "AVC",
        "V_MPEGH/ISO/HEVC" => "HEVC",
        "V_AV1" => "AV1",
        "V_VP8" => "VP8",
        "V_VP9" => "VP9",
        "V_MPEG1" | "V_MPEG2" => "MPEG Video",
        "V_PRORES" => "ProRes",
        "V_MJPEG" => "JPEG",
        "A_AC3" => "AC-3",
        "A_EAC3" => "E-AC-3",
        "A_DTS" => "DTS",
        "A_OPUS" => "Opus",
        "A_VORBIS" => "Vorbis",
        "A_FLAC" => "FLAC",
        "A_TRUEHD" => "MLP FBA",
        "A_MPEG/L3" | "A_MPEG/L2" => "MPEG Audio",
        "S_TEXT/UTF8" => "UTF-8",
        "S_TEXT/ASS" | "S_ASS" => "ASS",
        "S_TEXT/SSA" | "S_SSA" => "SSA",
        "S_TEXT/WEBVTT" => "WebVTT",
        "S_HDMV/PGS" => "PGS",
        "S_VOBSUB" => "VobSub",
        id if id.starts_with("V_MPEG4/ISO/") => "MPEG-4 Visual",
        id if id.starts_with("A_AAC") => "AAC",
        id if id.starts_with("A_PCM/") => "PCM",
        _ => return None,
    };
    Some(format)
}

/// Format name for a RIFF `WAVEFORMATEX` format tag.
pub fn wave_format_name(tag: u16) -> Option<&'static str> {
    Some(match tag {
        0x0001 | 0x0003 => "PCM",
        0x0002 | 0x0011 => "ADPCM",
        0x0006 => "A-Law",
        0x0007 => "U-Law",
        0x0050 | 0x0055 => "MPEG Audio",
        0x00FF | 0x1600 | 0x1610 | 0x706D => "AAC",
        0x0161 | 0x0162 | 0x0163 => "WMA",
        0x2000 => "AC-3",
        0x2001 => "DTS",
        0xF1AC => "FLAC",
        _ => return None,
    })
}

/// Format name for an AVI video compression code.
pub fn avi_video_format(code: &[u8; 4]) -> Option<&'static str> {
    let mut upper = *code;
    upper.make_ascii_uppercase();
    Some(match &upper {
        [0, 0, 0, 0] | b"RGB " | b"RAW " => "RGB",
        b"XVID" | b"DIVX" | b"DX50" | b"FMP4" | b"MP4V" => "MPEG-4 Visual",
        b"H264" | b"X264" | b"AVC1" => "AVC",
        b"HEVC" | b"H265" | b"HVC1" => "HEVC",
        b"MJPG" => "JPEG",
        b"DIV3" | b"MP43" => "MPEG-4 Visual",
        b"MPG2" | b"MPEG" => "MPEG Video",
        b"FFV1" => "FFV1",
        b"DVSD" => "DV",
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn avcc(profile: u8, level: u8, ext: Option<(u8, u8)>) -> Vec<u8> {
        let mut out = vec![1, profile, 0, level, 0xFF, 0xE1, 0, 4, 0x67, profile, 0, level, 1, 0, 2, 0x68, 0xCE];
        if let Some((chroma, depth)) = ext {
            out.extend_from_slice(&[0xFC | chroma, 0xF8 | (depth - 8), 0xF8 | (depth - 8), 0]);
        }
        out
    }

    #[test]
    fn test_avc_high_profile() {
        let config = AvcConfig::parse(&avcc(100, 41, Some((1, 8)))).unwrap();
        assert_eq!(config.profile_string(), "High@L4.1");
        assert_eq!(config.chroma_format, Some(1));
        assert_eq!(config.bit_depth, Some(8));
    }

    #[test]
    fn test_avc_main_profile_has_no_extension() {
        let config = AvcConfig::parse(&avcc(77, 30, None)).unwrap();
        assert_eq!(config.profile_string(), "Main@L3");
        assert_eq!(config.bit_depth, None);
    }

    #[test]
    fn test_hevc_profile_string() {
        let mut data = vec![0u8; 23];
        data[0] = 1;
        data[1] = 0x20 | 2;
        data[12] = 153;
        data[16] = 0xFD;
        data[17] = 0xFA;
        let config = HevcConfig::parse(&data).unwrap();
        assert_eq!(config.profile_string(), "Main 10@L5.1@High");
        assert_eq!(config.chroma_format, 1);
        assert_eq!(config.bit_depth, 10);
    }

    #[test]
    fn test_aac_config() {
        // AOT 2, index 3 (48 kHz), 2 channels
        let config = AacConfig::parse(&[0x11, 0x90]).unwrap();
        assert_eq!(config.object_type, 2);
        assert_eq!(config.sampling_rate, Some(48000));
        assert_eq!(config.channel_config, 2);
    }

    #[test]
    fn test_esds_with_long_lengths() {
        // Lengths written with 0x80 continuation bytes, as some muxers do.
        let dsi = [0x05, 0x80, 0x80, 0x80, 0x02, 0x12, 0x10];
        let mut dcd = vec![0x40, 0x15, 0, 0, 0];
        dcd.extend_from_slice(&256_000u32.to_be_bytes());
        dcd.extend_from_slice(&128_000u32.to_be_bytes());
        dcd.extend_from_slice(&dsi);
        let mut es = vec![0, 1, 0, 0x04, 0x80, 0x80, 0x80, dcd.len() as u8];
        es.extend(dcd);
        let mut data = vec![0, 0, 0, 0, 0x03, es.len() as u8];
        data.extend(es);

        let esds = EsDescriptor::parse(&data).unwrap();
        assert_eq!(esds.format(), Some("AAC"));
        assert_eq!(esds.max_bitrate, Some(256_000));
        assert_eq!(esds.avg_bitrate, Some(128_000));
        assert_eq!(esds.decoder_specific.as_deref(), Some(&[0x12, 0x10][..]));
    }

    #[test]
    fn test_codec_names() {
        assert_eq!(matroska_format("A_AAC/MPEG4/LC"), Some("AAC"));
        assert_eq!(matroska_format("V_MPEGH/ISO/HEVC"), Some("HEVC"));
        assert_eq!(matroska_format("X_UNKNOWN"), None);
        assert_eq!(wave_format_name(1), Some("PCM"));
        assert_eq!(avi_video_format(b"xvid"), Some("MPEG-4 Visual"));
        assert_eq!(avi_video_format(&[0; 4]), Some("RGB"));
        assert_eq!(prores_profile(b"ap4h"), Some("4444"));
    }
}
