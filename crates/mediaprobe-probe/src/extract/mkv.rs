//! Matroska / WebM record decoding.

use mediaprobe_container::mkv::{ebml, MatroskaChapters, MatroskaSegment};
use mediaprobe_container::StreamKind;

use super::codec::{self, chroma_subsampling, AacConfig, AvcConfig, HevcConfig};
use super::{aac_profile, Params};
use crate::fields::matroska_time;

/// Default `TimecodeScale`: one millisecond in nanoseconds.
const DEFAULT_TIMECODE_SCALE: u64 = 1_000_000;

fn uint(data: &[u8], id: u32) -> Option<u64> {
    ebml::find(data, id).and_then(ebml::read_uint)
}

fn float(data: &[u8], id: u32) -> Option<f64> {
    ebml::find(data, id).and_then(ebml::read_float)
}

fn string(data: &[u8], id: u32) -> Option<String> {
    ebml::find(data, id).map(ebml::read_string)
}

pub(super) fn segment(segment: &MatroskaSegment, params: &mut Params) {
    let doc_type = segment
        .ebml
        .as_deref()
        .and_then(|header| string(header, ebml::DOC_TYPE));
    let format = match doc_type.as_deref() {
        Some("webm") => "WebM",
        _ => "Matroska",
    };
    params.set("Format", format);
    if let Some(version) = segment.ebml.as_deref().and_then(|h| uint(h, ebml::DOC_TYPE_VERSION)) {
        params.set("Format_Version", format!("Version {}", version));
    }

    let Some(info) = segment.info.as_deref() else {
        return;
    };
    let scale = uint(info, ebml::TIMECODE_SCALE)
        .filter(|&s| s > 0)
        .unwrap_or(DEFAULT_TIMECODE_SCALE);
    if let Some(duration) = float(info, ebml::DURATION).filter(|d| *d > 0.0) {
        params.set("Duration", duration * scale as f64 / 1_000_000.0);
    }
    let date = ebml::find(info, ebml::DATE_UTC)
        .and_then(ebml::read_int)
        .and_then(matroska_time);
    params.set_opt("Encoded_Date", date);
    params.set_opt("Title", string(info, ebml::TITLE));
    params.set_opt("Encoded_Library", string(info, ebml::MUXING_APP));
    params.set_opt("Encoded_Application", string(info, ebml::WRITING_APP));
}

pub(super) fn track(entry: &[u8], kind: StreamKind, params: &mut Params) {
    params.set_opt("ID", uint(entry, ebml::TRACK_NUMBER));
    params.set_opt("UniqueID", uint(entry, ebml::TRACK_UID));

    let codec_id = string(entry, ebml::CODEC_ID).unwrap_or_default();
    params.set_opt("Format", codec::matroska_format(&codec_id));
    params.set("CodecID", codec_id.clone());

    let language = string(entry, ebml::LANGUAGE_BCP47).or_else(|| string(entry, ebml::LANGUAGE));
    params.set_opt("Language", language.filter(|l| l != "und"));
    params.set_opt("Title", string(entry, ebml::NAME));
    params.set("Default", uint(entry, ebml::FLAG_DEFAULT).unwrap_or(1) != 0);
    params.set("Forced", uint(entry, ebml::FLAG_FORCED).unwrap_or(0) != 0);

    let private = ebml::find(entry, ebml::CODEC_PRIVATE);
    match kind {
        StreamKind::Video => video(entry, &codec_id, private, params),
        StreamKind::Audio => audio(entry, &codec_id, private, params),
        _ => {}
    }
}

fn video(entry: &[u8], codec_id: &str, private: Option<&[u8]>, params: &mut Params) {
    if let Some(ns) = uint(entry, ebml::DEFAULT_DURATION).filter(|&d| d > 0) {
        params.set("FrameRate_Mode", "CFR");
        params.set("FrameRate", 1_000_000_000.0 / ns as f64);
    }

    match (codec_id, private) {
        ("V_MPEG4/ISO/AVC", Some(private)) => {
            if let Some(avc) = AvcConfig::parse(private) {
                params.set("Format_Profile", avc.profile_string());
                params.set_opt("ChromaSubsampling", chroma_subsampling(avc.chroma_format.unwrap_or(1)));
                params.set("BitDepth", avc.bit_depth.unwrap_or(8));
            }
        }
        ("V_MPEGH/ISO/HEVC", Some(private)) => {
            if let Some(hevc) = HevcConfig::parse(private) {
                params.set("Format_Profile", hevc.profile_string());
                params.set_opt("ChromaSubsampling", chroma_subsampling(hevc.chroma_format));
                params.set("BitDepth", hevc.bit_depth);
            }
        }
        _ => {}
    }

    let Some(settings) = ebml::find(entry, ebml::VIDEO) else {
        return;
    };
    let width = uint(settings, ebml::PIXEL_WIDTH).unwrap_or(0);
    let height = uint(settings, ebml::PIXEL_HEIGHT).unwrap_or(0);
    let display = (
        uint(settings, ebml::DISPLAY_WIDTH),
        uint(settings, ebml::DISPLAY_HEIGHT),
    );
    let par = match display {
        (Some(dw), Some(dh)) if dw > 0 && dh > 0 && width > 0 && height > 0 => {
            Some((dw as f64 / dh as f64) / (width as f64 / height as f64))
        }
        _ => None,
    };
    params.geometry(width, height, par);

    if let Some(colour) = ebml::find(settings, ebml::COLOUR) {
        let code = |id| uint(colour, id).map_or(2, |v| v.min(255) as u8);
        params.colour(
            code(ebml::PRIMARIES),
            code(ebml::TRANSFER_CHARACTERISTICS),
            code(ebml::MATRIX_COEFFICIENTS),
        );
        params.fill("BitDepth", uint(colour, ebml::BITS_PER_CHANNEL).filter(|&b| b > 0));
    }
}

fn audio(entry: &[u8], codec_id: &str, private: Option<&[u8]>, params: &mut Params) {
    if let Some(settings) = ebml::find(entry, ebml::AUDIO) {
        params.set_opt("SamplingRate", float(settings, ebml::SAMPLING_FREQUENCY).filter(|r| *r > 0.0));
        params.set_opt("Channels", uint(settings, ebml::CHANNELS).filter(|&c| c > 0));
        params.set_opt("BitDepth", uint(settings, ebml::BIT_DEPTH).filter(|&b| b > 0));
    }

    if codec_id.starts_with("A_PCM/INT/") {
        let big = codec_id.ends_with("BIG");
        params.set("Format_Settings_Endianness", if big { "Big" } else { "Little" });
        let unsigned = params.get("BitDepth").and_then(|b| b.as_u64()) == Some(8);
        params.set("Format_Settings_Sign", if unsigned { "Unsigned" } else { "Signed" });
    }

    if codec_id == "A_AAC" {
        if let Some(config) = private.and_then(AacConfig::parse) {
            params.set_opt("Format_Profile", aac_profile(config.object_type));
        }
    } else if let Some(profile) = codec_id.strip_prefix("A_AAC/MPEG4/").or(codec_id.strip_prefix("A_AAC/MPEG2/")) {
        let profile = match profile {
            "LC" => Some("LC"),
            "MAIN" => Some("Main"),
            "LC/SBR" => Some("HE-AAC"),
            "LC/PS" => Some("HE-AACv2"),
            "LTP" => Some("LTP"),
            _ => None,
        };
        params.set_opt("Format_Profile", profile);
    }
}

pub(super) fn chapters(chapters: &MatroskaChapters, params: &mut Params) {
    params.set("Format", "Matroska chapters");
    let count = ebml::elements(&chapters.payload)
        .filter(|(id, _)| *id == ebml::EDITION_ENTRY)
        .map(|(_, edition)| {
            ebml::elements(edition)
                .filter(|(id, _)| *id == ebml::CHAPTER_ATOM)
                .count()
        })
        .sum::<usize>();
    params.set("ChapterCount", count);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;
    use bytes::Bytes;

    fn element(id: u32, payload: &[u8]) -> Vec<u8> {
        let id_bytes = id.to_be_bytes();
        let skip = id_bytes.iter().take_while(|&&b| b == 0).count();
        let mut out = id_bytes[skip..].to_vec();
        out.push(0x80 | payload.len() as u8);
        out.extend_from_slice(payload);
        out
    }

    #[test]
    fn test_segment_info_duration_scaled() {
        let mut info = element(ebml::TIMECODE_SCALE, &[0x0F, 0x42, 0x40]); // 1_000_000
        info.extend(element(ebml::DURATION, &1500.0f64.to_be_bytes()));
        info.extend(element(ebml::WRITING_APP, b"mkvmerge"));
        let segment = MatroskaSegment {
            ebml: Some(Bytes::from(element(ebml::DOC_TYPE, b"webm"))),
            info: Some(Bytes::from(info)),
            segment: None,
        };

        let mut params = Params::default();
        super::segment(&segment, &mut params);
        let map = params.into_map();
        assert_eq!(map.get("Format"), Some(&Value::from("WebM")));
        assert_eq!(map.get("Duration"), Some(&Value::Float(1500.0)));
        assert_eq!(map.get("Encoded_Application"), Some(&Value::from("mkvmerge")));
    }

    #[test]
    fn test_track_flags_default() {
        let mut entry = element(ebml::TRACK_NUMBER, &[2]);
        entry.extend(element(ebml::CODEC_ID, b"S_TEXT/UTF8"));
        entry.extend(element(ebml::LANGUAGE, b"und"));

        let mut params = Params::default();
        track(&entry, StreamKind::Text, &mut params);
        let map = params.into_map();
        assert_eq!(map.get("Format"), Some(&Value::from("UTF-8")));
        assert_eq!(map.get("Default"), Some(&Value::Bool(true)));
        assert_eq!(map.get("Forced"), Some(&Value::Bool(false)));
        assert!(!map.contains_key("Language"));
    }
}
