//! Matroska / WebM file builder.

use bytes::{BufMut, BytesMut};

const EBML: u32 = 0x1A45_DFA3;
const SEGMENT: u32 = 0x1853_8067;
const INFO: u32 = 0x1549_A966;
const TRACKS: u32 = 0x1654_AE6B;
const CHAPTERS: u32 = 0x1043_A770;
const CLUSTER: u32 = 0x1F43_B675;

/// One `TrackEntry`.
#[derive(Debug, Clone, Default)]
pub struct MkvTrack {
    pub number: u64,
    pub uid: u64,
    pub track_type: u8,
    pub codec_id: String,
    pub codec_private: Option<Vec<u8>>,
    pub language: Option<String>,
    pub name: Option<String>,
    pub default: Option<bool>,
    pub forced: Option<bool>,
    /// Nanoseconds per frame.
    pub default_duration: Option<u64>,
    pub width: Option<u64>,
    pub height: Option<u64>,
    pub display_width: Option<u64>,
    pub display_height: Option<u64>,
    /// Primaries, transfer, matrix.
    pub colour: Option<(u64, u64, u64)>,
    pub bits_per_channel: Option<u64>,
    pub sampling_frequency: Option<f64>,
    pub channels: Option<u64>,
    pub bit_depth: Option<u64>,
}

impl MkvTrack {
    pub fn video(codec_id: &str, width: u64, height: u64) -> Self {
        Self {
            track_type: 1,
            codec_id: codec_id.to_string(),
            width: Some(width),
            height: Some(height),
            ..Default::default()
        }
    }

    pub fn audio(codec_id: &str, channels: u64, sampling_frequency: f64) -> Self {
        Self {
            track_type: 2,
            codec_id: codec_id.to_string(),
            channels: Some(channels),
            sampling_frequency: Some(sampling_frequency),
            ..Default::default()
        }
    }

    pub fn subtitle(codec_id: &str) -> Self {
        Self {
            track_type: 17,
            codec_id: codec_id.to_string(),
            ..Default::default()
        }
    }

    fn encode(&self, number: u64) -> Vec<u8> {
        let mut body = Vec::new();
        body.extend(uint(0xD7, if self.number == 0 { number } else { self.number }));
        body.extend(uint(0x73C5, if self.uid == 0 { number * 1000 + 1 } else { self.uid }));
        body.extend(uint(0x83, self.track_type as u64));
        body.extend(string(0x86, &self.codec_id));
        if let Some(private) = &self.codec_private {
            body.extend(element(0x63A2, private));
        }
        if let Some(language) = &self.language {
            body.extend(string(0x22B59C, language));
        }
        if let Some(name) = &self.name {
            body.extend(string(0x536E, name));
        }
        if let Some(default) = self.default {
            body.extend(uint(0x88, default as u64));
        }
        if let Some(forced) = self.forced {
            body.extend(uint(0x55AA, forced as u64));
        }
        if let Some(duration) = self.default_duration {
            body.extend(uint(0x23E383, duration));
        }

        if self.track_type == 1 {
            let mut video = Vec::new();
            video.extend(opt_uint(0xB0, self.width));
            video.extend(opt_uint(0xBA, self.height));
            video.extend(opt_uint(0x54B0, self.display_width));
            video.extend(opt_uint(0x54BA, self.display_height));
            if self.colour.is_some() || self.bits_per_channel.is_some() {
                let mut colour = Vec::new();
                if let Some((primaries, transfer, matrix)) = self.colour {
                    colour.extend(uint(0x55B1, matrix));
                    colour.extend(uint(0x55BA, transfer));
                    colour.extend(uint(0x55BB, primaries));
                }
                colour.extend(opt_uint(0x55B2, self.bits_per_channel));
                video.extend(element(0x55B0, &colour));
            }
            body.extend(element(0xE0, &video));
        }
        if self.track_type == 2 {
            let mut audio = Vec::new();
            if let Some(freq) = self.sampling_frequency {
                audio.extend(float(0xB5, freq));
            }
            audio.extend(opt_uint(0x9F, self.channels));
            audio.extend(opt_uint(0x6264, self.bit_depth));
            body.extend(element(0xE1, &audio));
        }
        element(0xAE, &body)
    }
}

/// Builder for a complete Matroska or WebM file.
#[derive(Debug, Clone)]
pub struct MkvBuilder {
    doc_type: String,
    timecode_scale: u64,
    /// In `timecode_scale` units.
    duration: Option<f64>,
    title: Option<String>,
    muxing_app: Option<String>,
    writing_app: Option<String>,
    /// Nanoseconds since 2001-01-01.
    date_utc: Option<i64>,
    tracks: Vec<MkvTrack>,
    chapters: usize,
    unknown_size: bool,
}

impl MkvBuilder {
    pub fn matroska() -> Self {
        Self::new("matroska")
    }

    pub fn webm() -> Self {
        Self::new("webm")
    }

    fn new(doc_type: &str) -> Self {
        Self {
            doc_type: doc_type.to_string(),
            timecode_scale: 1_000_000,
            duration: None,
            title: None,
            muxing_app: Some("libebml v1.4.4 + libmatroska v1.7.1".to_string()),
            writing_app: None,
            date_utc: None,
            tracks: Vec::new(),
            chapters: 0,
            unknown_size: false,
        }
    }

    /// Set the segment duration in milliseconds (with the default scale).
    pub fn duration(mut self, duration: f64) -> Self {
        self.duration = Some(duration);
        self
    }

    pub fn timecode_scale(mut self, scale: u64) -> Self {
        self.timecode_scale = scale;
        self
    }

    pub fn title(mut self, title: &str) -> Self {
        self.title = Some(title.to_string());
        self
    }

    pub fn writing_app(mut self, app: &str) -> Self {
        self.writing_app = Some(app.to_string());
        self
    }

    pub fn date_utc(mut self, nanos_since_2001: i64) -> Self {
        self.date_utc = Some(nanos_since_2001);
        self
    }

    pub fn track(mut self, track: MkvTrack) -> Self {
        self.tracks.push(track);
        self
    }

    /// Add a `Chapters` element with `count` chapter atoms.
    pub fn chapters(mut self, count: usize) -> Self {
        self.chapters = count;
        self
    }

    /// Write the segment with the reserved "unknown" size.
    pub fn unknown_size(mut self) -> Self {
        self.unknown_size = true;
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mut header = Vec::new();
        header.extend(uint(0x4286, 1)); // EBMLVersion
        header.extend(uint(0x42F7, 1)); // EBMLReadVersion
        header.extend(uint(0x42F2, 4)); // EBMLMaxIDLength
        header.extend(uint(0x42F3, 8)); // EBMLMaxSizeLength
        header.extend(string(0x4282, &self.doc_type));
        header.extend(uint(0x4287, 4)); // DocTypeVersion
        header.extend(uint(0x4285, 2)); // DocTypeReadVersion

        let mut info = Vec::new();
        info.extend(uint(0x2AD7B1, self.timecode_scale));
        if let Some(duration) = self.duration {
            info.extend(float(0x4489, duration));
        }
        if let Some(date) = self.date_utc {
            info.extend(element(0x4461, &date.to_be_bytes()));
        }
        if let Some(title) = &self.title {
            info.extend(string(0x7BA9, title));
        }
        if let Some(app) = &self.muxing_app {
            info.extend(string(0x4D80, app));
        }
        if let Some(app) = &self.writing_app {
            info.extend(string(0x5741, app));
        }

        let mut tracks = Vec::new();
        for (i, track) in self.tracks.iter().enumerate() {
            tracks.extend(track.encode(i as u64 + 1));
        }

        let mut segment = element(INFO, &info);
        segment.extend(element(TRACKS, &tracks));
        if self.chapters > 0 {
            let mut edition = Vec::new();
            for i in 0..self.chapters {
                let mut atom = uint(0x73C4, i as u64 + 1); // ChapterUID
                atom.extend(uint(0x91, i as u64 * 60_000_000_000)); // ChapterTimeStart
                edition.extend(element(0xB6, &atom));
            }
            segment.extend(element(CHAPTERS, &element(0x45B9, &edition)));
        }
        let mut cluster = uint(0xE7, 0); // Timecode
        cluster.extend(element(0xA3, &[0x81, 0x00, 0x00, 0x80, 0x00]));
        segment.extend(element(CLUSTER, &cluster));

        let mut buf = BytesMut::with_capacity(segment.len() + header.len() + 32);
        buf.put_slice(&element(EBML, &header));
        buf.put_slice(&id_bytes(SEGMENT));
        if self.unknown_size {
            buf.put_u8(0x01);
            buf.put_slice(&[0xFF; 7]);
        } else {
            buf.put_slice(&size_vint(segment.len() as u64));
        }
        buf.put_slice(&segment);
        buf.to_vec()
    }
}

fn id_bytes(id: u32) -> Vec<u8> {
    let bytes = id.to_be_bytes();
    let skip = bytes.iter().take_while(|&&b| b == 0).count().min(3);
    bytes[skip..].to_vec()
}

/// Shortest size vint for `len`; the all-ones pattern is avoided.
fn size_vint(len: u64) -> Vec<u8> {
    let n = (1..=8u32)
        .find(|&n| len < (1u64 << (7 * n)) - 1)
        .unwrap_or(8);
    let marked = len | (1u64 << (7 * n));
    marked.to_be_bytes()[8 - n as usize..].to_vec()
}

/// Encode an element with a minimal size.
pub fn element(id: u32, payload: &[u8]) -> Vec<u8> {
    let mut out = id_bytes(id);
    out.extend(size_vint(payload.len() as u64));
    out.extend_from_slice(payload);
    out
}

pub fn uint(id: u32, value: u64) -> Vec<u8> {
    let bytes = value.to_be_bytes();
    let skip = bytes.iter().take_while(|&&b| b == 0).count().min(7);
    element(id, &bytes[skip..])
}

fn opt_uint(id: u32, value: Option<u64>) -> Vec<u8> {
    value.map(|v| uint(id, v)).unwrap_or_default()
}

pub fn float(id: u32, value: f64) -> Vec<u8> {
    element(id, &value.to_be_bytes())
}

pub fn string(id: u32, value: &str) -> Vec<u8> {
    element(id, value.as_bytes())
}
