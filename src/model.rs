//! Typed media information built from session queries.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Descriptive data attached to a parameter value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Extra {
    /// Unit of measure, with its leading space.
    pub measure: Option<String>,
    /// Human-readable parameter name.
    pub name_text: Option<String>,
    /// Parameter description.
    pub info: Option<String>,
}

impl Extra {
    pub fn is_empty(&self) -> bool {
        self.measure.is_none() && self.name_text.is_none() && self.info.is_none()
    }
}

/// Extras of the parameters read for one stream, keyed by parameter name.
pub type Extras = BTreeMap<String, Extra>;

/// Information about a media file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MediaInfo {
    /// Path to the media file.
    pub file: PathBuf,
    /// Container-level information.
    pub general: GeneralInfo,
    pub video_tracks: Vec<VideoTrack>,
    pub audio_tracks: Vec<AudioTrack>,
    /// Subtitle and other text tracks.
    pub text_tracks: Vec<TextTrack>,
    /// QuickTime timecode tracks.
    pub timecode_tracks: Vec<TimecodeTrack>,
}

impl MediaInfo {
    /// Pretty-printed JSON.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Whether the container was recognised at all.
    pub fn is_recognised(&self) -> bool {
        self.general.format.is_some()
    }

    /// Whether any video track carries an HDR transfer function.
    pub fn is_hdr(&self) -> bool {
        self.video_tracks
            .iter()
            .any(|t| matches!(t.hdr_format, Some(HdrFormat::Hdr10 | HdrFormat::Hlg)))
    }
}

/// Container-level information.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeneralInfo {
    /// Container format (e.g., "MPEG-4", "Matroska").
    pub format: Option<String>,
    pub format_profile: Option<String>,
    /// Major brand for MP4.
    pub codec_id: Option<String>,
    /// Compatible brands, `/`-separated.
    pub codec_id_compatible: Option<String>,
    pub video_count: Option<u64>,
    pub audio_count: Option<u64>,
    pub file_size: Option<u64>,
    /// Duration in milliseconds.
    pub duration_ms: Option<f64>,
    /// Bits per second over the whole file.
    pub overall_bit_rate: Option<u64>,
    /// Frame rate of the first video track.
    pub frame_rate: Option<f64>,
    pub frame_count: Option<u64>,
    /// Bytes not attributed to any stream.
    pub stream_size: Option<u64>,
    pub header_size: Option<u64>,
    pub data_size: Option<u64>,
    pub footer_size: Option<u64>,
    pub title: Option<String>,
    pub encoded_date: Option<DateTime<Utc>>,
    pub tagged_date: Option<DateTime<Utc>>,
    pub file_modified_date: Option<DateTime<Utc>>,
    pub file_modified_date_local: Option<NaiveDateTime>,
    pub encoded_application: Option<String>,
    pub encoded_library: Option<String>,
    /// MP4 only: whether `moov` precedes `mdat`.
    pub is_streamable: Option<bool>,
    pub extras: Extras,
}

/// Information about a video track.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VideoTrack {
    /// Track index within the video kind.
    pub index: usize,
    /// Position among all streams in the container.
    pub stream_order: Option<u64>,
    /// Container track id.
    pub id: Option<u64>,
    /// Video codec (e.g., "AVC", "HEVC", "ProRes").
    pub format: Option<String>,
    pub format_profile: Option<String>,
    pub codec_id: Option<String>,
    pub width: Option<u64>,
    pub height: Option<u64>,
    pub pixel_aspect_ratio: Option<f64>,
    pub display_aspect_ratio: Option<f64>,
    /// Frame rate in FPS.
    pub frame_rate: Option<f64>,
    /// `CFR` or `VFR`.
    pub frame_rate_mode: Option<String>,
    pub frame_count: Option<u64>,
    /// Bit depth (e.g., 8, 10, 12).
    pub bit_depth: Option<u8>,
    pub chroma_subsampling: Option<String>,
    pub color_primaries: Option<String>,
    pub transfer_characteristics: Option<String>,
    pub matrix_coefficients: Option<String>,
    /// HDR format derived from the transfer characteristics.
    pub hdr_format: Option<HdrFormat>,
    pub duration_ms: Option<f64>,
    pub bit_rate: Option<u64>,
    pub stream_size: Option<u64>,
    pub language: Option<String>,
    pub title: Option<String>,
    pub default: Option<bool>,
    pub encoded_date: Option<DateTime<Utc>>,
    pub tagged_date: Option<DateTime<Utc>>,
    pub extras: Extras,
}

/// HDR format types.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum HdrFormat {
    /// Standard Dynamic Range (not HDR).
    Sdr,
    /// SMPTE ST 2084 (PQ) transfer.
    Hdr10,
    /// Hybrid Log-Gamma.
    Hlg,
}

impl HdrFormat {
    /// Classify a MediaInfo `transfer_characteristics` name.
    pub fn from_transfer(name: &str) -> Self {
        match name {
            "PQ" => HdrFormat::Hdr10,
            "HLG" => HdrFormat::Hlg,
            _ => HdrFormat::Sdr,
        }
    }
}

/// Information about an audio track.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AudioTrack {
    pub index: usize,
    pub stream_order: Option<u64>,
    pub id: Option<u64>,
    /// Audio codec (e.g., "AAC", "PCM", "FLAC").
    pub format: Option<String>,
    pub format_profile: Option<String>,
    pub codec_id: Option<String>,
    pub channels: Option<u8>,
    /// Sample rate in Hz.
    pub sampling_rate: Option<u32>,
    /// Total number of samples per channel.
    pub sampling_count: Option<u64>,
    pub bit_depth: Option<u8>,
    pub duration_ms: Option<f64>,
    pub bit_rate: Option<u64>,
    pub bit_rate_maximum: Option<u64>,
    pub stream_size: Option<u64>,
    /// Language code as stored by the container.
    pub language: Option<String>,
    pub title: Option<String>,
    pub default: Option<bool>,
    pub forced: Option<bool>,
    pub encoded_date: Option<DateTime<Utc>>,
    pub tagged_date: Option<DateTime<Utc>>,
    pub extras: Extras,
}

/// Information about a text track.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TextTrack {
    pub index: usize,
    pub id: Option<u64>,
    /// Subtitle format (e.g., "UTF-8", "ASS", "Timed Text").
    pub format: Option<String>,
    pub codec_id: Option<String>,
    pub language: Option<String>,
    pub title: Option<String>,
    pub default: Option<bool>,
    pub forced: Option<bool>,
}

/// Information about a timecode track.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimecodeTrack {
    /// Index within the Other kind.
    pub index: usize,
    pub format: Option<String>,
    pub frame_rate: Option<f64>,
    /// e.g. "Drop frame / 24h max".
    pub settings: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hdr_from_transfer() {
        assert_eq!(HdrFormat::from_transfer("PQ"), HdrFormat::Hdr10);
        assert_eq!(HdrFormat::from_transfer("HLG"), HdrFormat::Hlg);
        assert_eq!(HdrFormat::from_transfer("BT.709"), HdrFormat::Sdr);
    }

    #[test]
    fn test_json_field_names() {
        let info = MediaInfo {
            file: PathBuf::from("/media/clip.mkv"),
            video_tracks: vec![VideoTrack {
                hdr_format: Some(HdrFormat::Hdr10),
                ..Default::default()
            }],
            ..Default::default()
        };
        let json = info.to_json().unwrap();
        assert!(json.contains("\"video_tracks\""));
        assert!(json.contains("\"hdr10\""));
        assert!(info.is_hdr());
        assert!(!info.is_recognised());
        assert!(json.contains("\"extras\""));

        let back: MediaInfo = serde_json::from_str(&json).unwrap();
        assert_eq!(back, info);
    }
}
