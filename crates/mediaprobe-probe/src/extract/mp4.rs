//! MP4 / QuickTime record decoding.

use mediaprobe_container::mp4::{boxes, AtomType, HandlerType, Mp4Movie, Mp4Track};
use mediaprobe_container::StreamKind;

use super::codec::{self, chroma_subsampling, AacConfig, AvcConfig, EsDescriptor, HevcConfig};
use super::{aac_profile, duration_ms, Params};
use crate::fields::{
    be_f64, be_fixed32, be_u16, be_u32, be_u64, fourcc, fourcc_str, mac_time, pascal, u8_at, utf8,
};

/// Offset of the first child box in a visual sample entry payload.
const VISUAL_CHILDREN: usize = 78;

pub(super) fn movie(movie: &Mp4Movie, params: &mut Params) {
    params.set("Format", "MPEG-4");

    if let Some(ftyp) = &movie.ftyp {
        if let Some(major) = fourcc(ftyp, 0) {
            params.set("CodecID", fourcc_str(&major));
            params.set_opt("Format_Profile", brand_profile(&major));
        }
        let compatible: Vec<String> = ftyp
            .get(8..)
            .unwrap_or_default()
            .chunks_exact(4)
            .filter_map(|b| <[u8; 4]>::try_from(b).ok())
            .map(|b| fourcc_str(&b))
            .filter(|b| !b.is_empty())
            .collect();
        if !compatible.is_empty() {
            params.set("CodecID_Compatible", compatible.join("/"));
        }
    }

    if let Some(mvhd) = &movie.mvhd {
        if let Some(header) = MediaHeader::parse(mvhd) {
            params.set_opt("Duration", duration_ms(header.duration, header.timescale as u64));
            params.set_opt("Encoded_Date", mac_time(header.creation));
            params.set_opt("Tagged_Date", mac_time(header.modification));
        }
    }

    if movie.moov.is_some() {
        params.set("IsStreamable", movie.is_streamable());
    }
    if let Some(mdat) = movie.mdat {
        params.set("HeaderSize", mdat.offset);
        params.set("DataSize", movie.mdat_size);
    }

    if let Some(udta) = &movie.udta {
        user_data(udta, params);
    }
}

fn brand_profile(major: &[u8; 4]) -> Option<&'static str> {
    Some(match major {
        b"isom" => "Base Media",
        b"iso2" => "Base Media / Version 2",
        b"mp41" => "Base Media / Version 1",
        b"mp42" => "Base Media / Version 2",
        b"qt  " => "QuickTime",
        b"M4A " => "Apple audio with iTunes info",
        b"M4V " => "Apple video",
        b"3gp4" | b"3gp5" | b"3gp6" => "3GPP Media",
        b"dash" => "DASH",
        _ => return None,
    })
}

/// Movie metadata in `udta`: QuickTime `©xxx` text atoms and an iTunes
/// `meta/ilst` list.
fn user_data(udta: &[u8], params: &mut Params) {
    for (kind, payload) in boxes(udta) {
        if kind == AtomType::META {
            // Full box header precedes the children.
            let children = payload.get(4..).unwrap_or_default();
            for (kind, list) in boxes(children) {
                if kind == AtomType::ILST {
                    itunes_list(list, params);
                }
            }
        } else if let Some(name) = tag_param(&kind.0) {
            params.fill(name, quicktime_text(payload));
        }
    }
}

fn itunes_list(ilst: &[u8], params: &mut Params) {
    for (kind, item) in boxes(ilst) {
        let Some(name) = tag_param(&kind.0) else {
            continue;
        };
        let text = boxes(item)
            .find(|(k, _)| k.0 == *b"data")
            .and_then(|(_, data)| data.get(8..))
            .map(utf8);
        params.fill(name, text);
    }
}

fn tag_param(kind: &[u8; 4]) -> Option<&'static str> {
    Some(match kind {
        b"\xA9nam" => "Title",
        b"\xA9too" | b"\xA9swr" => "Encoded_Application",
        b"\xA9enc" => "Encoded_Library",
        b"\xA9alb" => "Album",
        b"\xA9ART" => "Performer",
        _ => return None,
    })
}

/// QuickTime text atom: 16-bit length, 16-bit language, text.
fn quicktime_text(payload: &[u8]) -> Option<String> {
    let len = be_u16(payload, 0)? as usize;
    payload.get(4..4 + len).map(utf8)
}

/// Fields shared by `mvhd` and `mdhd`.
///
/// `language` is only meaningful for `mdhd`; in `mvhd` the same offset
/// holds the playback rate.
struct MediaHeader {
    creation: u64,
    modification: u64,
    timescale: u32,
    duration: u64,
    language: Option<u16>,
}

impl MediaHeader {
    fn parse(data: &[u8]) -> Option<Self> {
        let version = u8_at(data, 0)?;
        let (creation, modification, timescale, duration, lang_at) = if version == 1 {
            (
                be_u64(data, 4)?,
                be_u64(data, 12)?,
                be_u32(data, 20)?,
                be_u64(data, 24)?,
                32,
            )
        } else {
            (
                be_u32(data, 4)? as u64,
                be_u32(data, 8)? as u64,
                be_u32(data, 12)?,
                be_u32(data, 16)? as u64,
                20,
            )
        };
        // All-ones means unknown duration.
        let duration = if duration == u64::MAX || (version == 0 && duration == u32::MAX as u64) {
            0
        } else {
            duration
        };
        Some(Self {
            creation,
            modification,
            timescale,
            duration,
            language: be_u16(data, lang_at),
        })
    }
}

/// Unpack an `mdhd` language code; `und` and unset codes give `None`.
fn language(packed: u16) -> Option<String> {
    if packed == 0 || packed == 0x7FFF {
        return None;
    }
    let code: String = [10u16, 5, 0]
        .iter()
        .map(|shift| (((packed >> shift) & 0x1F) as u8 + 0x60) as char)
        .collect();
    if code == "und" || !code.chars().all(|c| c.is_ascii_lowercase()) {
        return None;
    }
    Some(code)
}

/// Fields of `tkhd`.
struct TrackHeader {
    enabled: bool,
    id: u32,
    width: f64,
    height: f64,
}

impl TrackHeader {
    fn parse(data: &[u8]) -> Option<Self> {
        let version = u8_at(data, 0)?;
        let flags = be_u32(data, 0)? & 0x00FF_FFFF;
        let (id_at, size_at) = if version == 1 { (20, 88) } else { (12, 76) };
        Some(Self {
            enabled: flags & 1 != 0,
            id: be_u32(data, id_at)?,
            width: be_fixed32(data, size_at).unwrap_or(0.0),
            height: be_fixed32(data, size_at + 4).unwrap_or(0.0),
        })
    }
}

/// First entry of `stsd`: `(code, payload)`.
fn sample_entry(stsd: &[u8]) -> Option<([u8; 4], &[u8])> {
    if be_u32(stsd, 4)? == 0 {
        return None;
    }
    let size = be_u32(stsd, 8)? as usize;
    let code = fourcc(stsd, 12)?;
    let end = (8 + size).min(stsd.len());
    Some((code, stsd.get(16..end)?))
}

/// Head of `stts`: entry count and the first entry's delta.
fn time_to_sample(stts: &[u8]) -> Option<(u32, u32, u32)> {
    let entries = be_u32(stts, 4)?;
    let count = be_u32(stts, 8).unwrap_or(0);
    let delta = be_u32(stts, 12).unwrap_or(0);
    Some((entries, count, delta))
}

pub(super) fn track(track: &Mp4Track, kind: StreamKind, params: &mut Params) {
    let tkhd = track.tkhd.as_deref().and_then(TrackHeader::parse);
    if let Some(tkhd) = &tkhd {
        params.set("ID", tkhd.id);
        params.set("Default", tkhd.enabled);
    }

    let mdhd = track.mdhd.as_deref().and_then(MediaHeader::parse);
    let timescale = mdhd.as_ref().map_or(0, |h| h.timescale);
    if let Some(mdhd) = &mdhd {
        params.set_opt("Duration", duration_ms(mdhd.duration, mdhd.timescale as u64));
        params.set_opt("Language", mdhd.language.and_then(language));
        params.set_opt("Encoded_Date", mac_time(mdhd.creation));
        params.set_opt("Tagged_Date", mac_time(mdhd.modification));
    }

    if let Some(udta) = &track.udta {
        let title = boxes(udta)
            .find(|(k, _)| k.0 == *b"name")
            .map(|(_, name)| utf8(name));
        params.set_opt("Title", title);
    }

    // Constant-size samples give the exact stream size.
    let stsz = track.stsz.as_deref();
    let sample_size = stsz.and_then(|d| be_u32(d, 4)).unwrap_or(0);
    let sample_count = stsz.and_then(|d| be_u32(d, 8));
    if sample_size > 0 {
        if let Some(count) = sample_count {
            params.set("StreamSize", sample_size as u64 * count as u64);
        }
    }

    let entry = track.stsd.as_deref().and_then(sample_entry);
    if let Some((code, _)) = &entry {
        params.set("CodecID", fourcc_str(code));
    }

    match (kind, track.handler, entry) {
        (StreamKind::Video, _, Some((code, payload))) => {
            video(&code, payload, tkhd.as_ref(), params);
            frame_rate(track, timescale, sample_count, params);
        }
        (StreamKind::Audio, _, Some((code, payload))) => {
            audio(&code, payload, mdhd.as_ref(), params);
        }
        (StreamKind::Text, _, Some((code, _))) => {
            params.set_opt("Format", codec::mp4_text_format(&code));
        }
        (StreamKind::Other, HandlerType::Timecode, Some((code, payload))) if code == *b"tmcd" => {
            timecode(payload, params);
        }
        _ => {}
    }

    params.derive_bit_rate();
}

fn video(code: &[u8; 4], entry: &[u8], tkhd: Option<&TrackHeader>, params: &mut Params) {
    params.set_opt("Format", codec::mp4_video_format(code));

    let width = be_u16(entry, 24).unwrap_or(0) as u64;
    let height = be_u16(entry, 26).unwrap_or(0) as u64;
    let (width, height) = match tkhd {
        Some(t) if width == 0 || height == 0 => (t.width as u64, t.height as u64),
        _ => (width, height),
    };
    params.set_opt("Encoded_Library_Name", pascal(entry, 42, 32));

    let mut par = None;
    let children = entry.get(VISUAL_CHILDREN..).unwrap_or_default();
    for (kind, payload) in boxes(children) {
        match &kind.0 {
            b"avcC" => {
                if let Some(avc) = AvcConfig::parse(payload) {
                    params.set("Format_Profile", avc.profile_string());
                    let chroma = avc.chroma_format.unwrap_or(1);
                    params.set_opt("ChromaSubsampling", chroma_subsampling(chroma));
                    params.set("BitDepth", avc.bit_depth.unwrap_or(8));
                }
            }
            b"hvcC" => {
                if let Some(hevc) = HevcConfig::parse(payload) {
                    params.set("Format_Profile", hevc.profile_string());
                    params.set_opt("ChromaSubsampling", chroma_subsampling(hevc.chroma_format));
                    params.set("BitDepth", hevc.bit_depth);
                }
            }
            b"colr" if payload.starts_with(b"nclx") || payload.starts_with(b"nclc") => {
                if let (Some(p), Some(t), Some(m)) =
                    (be_u16(payload, 4), be_u16(payload, 6), be_u16(payload, 8))
                {
                    params.colour(p as u8, t as u8, m as u8);
                }
            }
            b"pasp" => {
                if let (Some(h), Some(v)) = (be_u32(payload, 0), be_u32(payload, 4)) {
                    if h > 0 && v > 0 {
                        par = Some(h as f64 / v as f64);
                    }
                }
            }
            b"btrt" => {
                params.set_opt("BitRate_Maximum", be_u32(payload, 4).filter(|&v| v > 0));
            }
            _ => {}
        }
    }
    params.geometry(width, height, par);

    if let Some(profile) = codec::prores_profile(code) {
        params.set("Format_Profile", profile);
        let chroma = if profile.starts_with("4444") { 3 } else { 2 };
        params.set_opt("ChromaSubsampling", chroma_subsampling(chroma));
        params.set("BitDepth", 10u8);
    }
}

fn frame_rate(track: &Mp4Track, timescale: u32, sample_count: Option<u32>, params: &mut Params) {
    let Some((entries, count, delta)) = track.stts.as_deref().and_then(time_to_sample) else {
        return;
    };
    let frames = sample_count.filter(|&c| c > 0).unwrap_or(count);
    if frames > 0 {
        params.set("FrameCount", frames);
    }
    if timescale == 0 {
        return;
    }
    if entries == 1 && delta > 0 {
        params.set("FrameRate_Mode", "CFR");
        params.set("FrameRate", timescale as f64 / delta as f64);
    } else if entries > 1 {
        params.set("FrameRate_Mode", "VFR");
        let ms = params.get("Duration").and_then(|v| v.as_f64()).unwrap_or(0.0);
        if ms > 0.0 && frames > 0 {
            params.set("FrameRate", frames as f64 * 1000.0 / ms);
        }
    }
}

fn audio(code: &[u8; 4], entry: &[u8], mdhd: Option<&MediaHeader>, params: &mut Params) {
    params.set_opt("Format", codec::mp4_audio_format(code));

    let version = be_u16(entry, 8).unwrap_or(0);
    let (channels, sample_size, rate, children_at) = match version {
        2 => (
            be_u32(entry, 40).map(|c| c as u64),
            be_u32(entry, 48).map(|b| b as u64),
            be_f64(entry, 32),
            64,
        ),
        1 => (
            be_u16(entry, 16).map(u64::from),
            be_u16(entry, 18).map(u64::from),
            be_fixed32(entry, 24),
            44,
        ),
        _ => (
            be_u16(entry, 16).map(u64::from),
            be_u16(entry, 18).map(u64::from),
            be_fixed32(entry, 24),
            28,
        ),
    };
    params.set_opt("Channels", channels.filter(|&c| c > 0));
    let rate = rate.filter(|r| *r > 0.0);
    params.set_opt("SamplingRate", rate);

    let pcm = match code {
        b"lpcm" => be_u32(entry, 52)
            .filter(|_| version == 2)
            .map(codec::lpcm_settings),
        _ => codec::pcm_settings(code),
    };
    if let Some((endianness, sign)) = pcm {
        params.set_opt("BitDepth", sample_size.filter(|&b| b > 0));
        params.set("Format_Settings_Endianness", endianness);
        params.set_opt("Format_Settings_Sign", sign);
    }
    if *code == *b"alac" {
        params.set_opt("BitDepth", sample_size.filter(|&b| b > 0));
    }

    if let (Some(rate), Some(mdhd)) = (rate, mdhd) {
        if mdhd.timescale > 0 {
            let samples = if rate as u32 == mdhd.timescale {
                mdhd.duration
            } else {
                (mdhd.duration as f64 * rate / mdhd.timescale as f64).round() as u64
            };
            if samples > 0 {
                params.set("SamplingCount", samples);
            }
        }
    }

    let children = entry.get(children_at..).unwrap_or_default();
    for (kind, payload) in boxes(children) {
        match &kind.0 {
            b"esds" => esds(payload, params),
            b"btrt" => {
                params.fill("BitRate_Maximum", be_u32(payload, 4).filter(|&v| v > 0));
            }
            _ => {}
        }
    }
}

fn esds(payload: &[u8], params: &mut Params) {
    let Some(es) = EsDescriptor::parse(payload) else {
        return;
    };
    if let Some(format) = es.format() {
        params.set("Format", format);
    }
    if let Some(oti) = es.object_type {
        params.set("CodecID", format!("mp4a-{:X}", oti));
    }
    params.set_opt("BitRate_Maximum", es.max_bitrate);
    if !params.contains("StreamSize") {
        params.set_opt("BitRate", es.avg_bitrate);
    }

    let config = es.decoder_specific.as_deref().and_then(AacConfig::parse);
    if let Some(config) = config {
        if es.format() == Some("AAC") {
            params.set_opt("Format_Profile", aac_profile(config.object_type));
            params.set("CodecID", format!("mp4a-40-{}", config.object_type));
        }
        if !params.contains("SamplingRate") {
            params.set_opt("SamplingRate", config.sampling_rate);
        }
    }
}

/// QuickTime timecode sample entry.
fn timecode(entry: &[u8], params: &mut Params) {
    params.set("Type", "Time code");
    params.set("Format", "QuickTime TC");

    let flags = be_u32(entry, 12).unwrap_or(0);
    let timescale = be_u32(entry, 16).unwrap_or(0);
    let frame_duration = be_u32(entry, 20).unwrap_or(0);
    if timescale > 0 && frame_duration > 0 {
        params.set("FrameRate", timescale as f64 / frame_duration as f64);
    }

    let settings: Vec<&str> = [
        (0x1, "Drop frame"),
        (0x2, "24h max"),
        (0x4, "Negative times OK"),
        (0x8, "Counter"),
    ]
    .iter()
    .filter(|(bit, _)| flags & bit != 0)
    .map(|(_, name)| *name)
    .collect();
    if !settings.is_empty() {
        params.set("TimeCode_Settings", settings.join(" / "));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    #[test]
    fn test_language_unpacking() {
        // "eng" packed as in mdhd
        let packed = ((b'e' - 0x60) as u16) << 10 | ((b'n' - 0x60) as u16) << 5 | (b'g' - 0x60) as u16;
        assert_eq!(language(packed).as_deref(), Some("eng"));
        assert_eq!(language(0x55C4), None); // und
        assert_eq!(language(0), None);
    }

    #[test]
    fn test_media_header_versions() {
        let mut v0 = vec![0u8; 24];
        v0[12..16].copy_from_slice(&1000u32.to_be_bytes());
        v0[16..20].copy_from_slice(&5000u32.to_be_bytes());
        let header = MediaHeader::parse(&v0).unwrap();
        assert_eq!((header.timescale, header.duration), (1000, 5000));

        let mut v1 = vec![0u8; 36];
        v1[0] = 1;
        v1[20..24].copy_from_slice(&90000u32.to_be_bytes());
        v1[24..32].copy_from_slice(&(u32::MAX as u64 + 10).to_be_bytes());
        let header = MediaHeader::parse(&v1).unwrap();
        assert_eq!((header.timescale, header.duration), (90000, u32::MAX as u64 + 10));

        assert!(MediaHeader::parse(&v0[..10]).is_none());
    }

    fn sound_description_v2(bits: u32, flags: u32) -> Vec<u8> {
        let mut entry = vec![0u8; 64];
        entry[8..10].copy_from_slice(&2u16.to_be_bytes());
        entry[32..40].copy_from_slice(&48_000f64.to_be_bytes());
        entry[40..44].copy_from_slice(&2u32.to_be_bytes());
        entry[44..48].copy_from_slice(&0x7F00_0000u32.to_be_bytes());
        entry[48..52].copy_from_slice(&bits.to_be_bytes());
        entry[52..56].copy_from_slice(&flags.to_be_bytes());
        entry
    }

    #[test]
    fn test_sound_description_v2_twos() {
        let mut params = Params::default();
        audio(b"twos", &sound_description_v2(24, 0), None, &mut params);
        assert_eq!(params.get("BitDepth").and_then(Value::as_u64), Some(24));
        assert_eq!(params.get("Channels").and_then(Value::as_u64), Some(2));
        assert_eq!(params.get("Format_Settings_Endianness").and_then(Value::as_str), Some("Big"));
    }

    #[test]
    fn test_sound_description_v2_lpcm_flags() {
        // little-endian signed integer
        let mut params = Params::default();
        audio(b"lpcm", &sound_description_v2(16, 0x4), None, &mut params);
        assert_eq!(params.get("Format").and_then(Value::as_str), Some("PCM"));
        assert_eq!(params.get("BitDepth").and_then(Value::as_u64), Some(16));
        assert_eq!(params.get("Format_Settings_Endianness").and_then(Value::as_str), Some("Little"));
        assert_eq!(params.get("Format_Settings_Sign").and_then(Value::as_str), Some("Signed"));

        // big-endian float
        let mut params = Params::default();
        audio(b"lpcm", &sound_description_v2(32, 0x1 | 0x2), None, &mut params);
        assert_eq!(params.get("BitDepth").and_then(Value::as_u64), Some(32));
        assert_eq!(params.get("Format_Settings_Endianness").and_then(Value::as_str), Some("Big"));
        assert!(!params.contains("Format_Settings_Sign"));
    }

    #[test]
    fn test_quicktime_text() {
        let mut payload = vec![0, 5, 0x55, 0xC4];
        payload.extend_from_slice(b"Hello");
        assert_eq!(quicktime_text(&payload).as_deref(), Some("Hello"));
        assert_eq!(quicktime_text(&payload[..6]), None);
    }
}
