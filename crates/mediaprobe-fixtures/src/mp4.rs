//! MP4 file builder.

use bytes::{BufMut, BytesMut};

/// One track of a synthetic MP4.
#[derive(Debug, Clone)]
pub struct TrackSpec {
    pub handler: [u8; 4],
    pub codec: [u8; 4],
    pub timescale: u32,
    /// Duration in `timescale` units.
    pub duration: u64,
    pub language: [u8; 3],
    pub enabled: bool,
    pub width: u16,
    pub height: u16,
    pub depth: u16,
    pub compressor: Option<String>,
    pub channels: u16,
    pub sample_rate: u32,
    pub sample_size: u16,
    pub sample_delta: u32,
    pub sample_count: u32,
    /// Constant size of every sample in bytes.
    pub sample_bytes: u32,
    /// Boxes appended to the sample entry (`avcC`, `esds`, `colr`, ...).
    pub children: Vec<([u8; 4], Vec<u8>)>,
    /// Timecode entry: flags, timescale, frame duration, frames per second.
    pub timecode: Option<(u32, u32, u32, u8)>,
    /// Write version 1 headers (64-bit times).
    pub version1: bool,
    pub name: Option<String>,
}

impl TrackSpec {
    fn base(handler: [u8; 4], codec: [u8; 4]) -> Self {
        Self {
            handler,
            codec,
            timescale: 1000,
            duration: 0,
            language: *b"und",
            enabled: true,
            width: 0,
            height: 0,
            depth: 0x18,
            compressor: None,
            channels: 0,
            sample_rate: 0,
            sample_size: 0,
            sample_delta: 0,
            sample_count: 0,
            sample_bytes: 1000,
            children: Vec::new(),
            timecode: None,
            version1: false,
            name: None,
        }
    }

    /// An `avc1` video track.
    pub fn video(width: u16, height: u16) -> Self {
        Self {
            width,
            height,
            ..Self::base(*b"vide", *b"avc1")
        }
    }

    /// An `mp4a` audio track.
    pub fn audio(channels: u16, sample_rate: u32) -> Self {
        Self {
            channels,
            sample_rate,
            sample_size: 16,
            sample_bytes: 400,
            ..Self::base(*b"soun", *b"mp4a")
        }
    }

    /// A `tx3g` subtitle track.
    pub fn text() -> Self {
        Self {
            sample_bytes: 20,
            ..Self::base(*b"sbtl", *b"tx3g")
        }
    }

    /// A QuickTime timecode track.
    pub fn timecode(flags: u32, timescale: u32, frame_duration: u32, frames: u8) -> Self {
        Self {
            timecode: Some((flags, timescale, frame_duration, frames)),
            sample_bytes: 4,
            ..Self::base(*b"tmcd", *b"tmcd")
        }
    }

    /// Set media timescale, duration, and a single `stts` entry.
    pub fn timing(mut self, timescale: u32, duration: u64, sample_delta: u32, sample_count: u32) -> Self {
        self.timescale = timescale;
        self.duration = duration;
        self.sample_delta = sample_delta;
        self.sample_count = sample_count;
        self
    }

    pub fn codec(mut self, codec: &[u8; 4]) -> Self {
        self.codec = *codec;
        self
    }

    pub fn child(mut self, kind: &[u8; 4], payload: Vec<u8>) -> Self {
        self.children.push((*kind, payload));
        self
    }

    pub fn language(mut self, language: &[u8; 3]) -> Self {
        self.language = *language;
        self
    }

    pub fn compressor(mut self, name: &str) -> Self {
        self.compressor = Some(name.to_string());
        self
    }

    pub fn version1(mut self) -> Self {
        self.version1 = true;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }
}

/// Builder for a complete MP4 file.
#[derive(Debug, Clone)]
pub struct Mp4Builder {
    major_brand: [u8; 4],
    compatible: Vec<[u8; 4]>,
    timescale: u32,
    duration: u64,
    /// Seconds since 1904-01-01.
    creation_time: u64,
    tracks: Vec<TrackSpec>,
    mdat_len: usize,
    moov_first: bool,
    title: Option<String>,
    encoder: Option<String>,
}

impl Default for Mp4Builder {
    fn default() -> Self {
        Self::new()
    }
}

impl Mp4Builder {
    pub fn new() -> Self {
        Self {
            major_brand: *b"isom",
            compatible: vec![*b"isom", *b"iso2", *b"avc1", *b"mp41"],
            timescale: 1000,
            duration: 0,
            creation_time: 0,
            tracks: Vec::new(),
            mdat_len: 64,
            moov_first: true,
            title: None,
            encoder: None,
        }
    }

    /// Set the movie timescale and duration.
    pub fn movie(mut self, timescale: u32, duration: u64) -> Self {
        self.timescale = timescale;
        self.duration = duration;
        self
    }

    pub fn brands(mut self, major: &[u8; 4], compatible: &[[u8; 4]]) -> Self {
        self.major_brand = *major;
        self.compatible = compatible.to_vec();
        self
    }

    /// Set the creation time in seconds since 1904-01-01.
    pub fn creation_time(mut self, secs: u64) -> Self {
        self.creation_time = secs;
        self
    }

    pub fn track(mut self, track: TrackSpec) -> Self {
        self.tracks.push(track);
        self
    }

    pub fn mdat_len(mut self, len: usize) -> Self {
        self.mdat_len = len;
        self
    }

    /// Place `mdat` before `moov`.
    pub fn moov_last(mut self) -> Self {
        self.moov_first = false;
        self
    }

    pub fn title(mut self, title: &str) -> Self {
        self.title = Some(title.to_string());
        self
    }

    pub fn encoder(mut self, encoder: &str) -> Self {
        self.encoder = Some(encoder.to_string());
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mut buf = BytesMut::with_capacity(4096);
        self.write_ftyp(&mut buf);
        if self.moov_first {
            self.write_moov(&mut buf);
            self.write_mdat(&mut buf);
        } else {
            self.write_mdat(&mut buf);
            self.write_moov(&mut buf);
        }
        buf.to_vec()
    }

    fn write_ftyp(&self, buf: &mut BytesMut) {
        let start = begin(buf, b"ftyp");
        buf.put_slice(&self.major_brand);
        buf.put_u32(0x200); // minor version
        for brand in &self.compatible {
            buf.put_slice(brand);
        }
        finish(buf, start);
    }

    fn write_mdat(&self, buf: &mut BytesMut) {
        let start = begin(buf, b"mdat");
        buf.put_bytes(0, self.mdat_len);
        finish(buf, start);
    }

    fn write_moov(&self, buf: &mut BytesMut) {
        let start = begin(buf, b"moov");
        self.write_mvhd(buf);
        for (i, track) in self.tracks.iter().enumerate() {
            self.write_trak(buf, track, i as u32 + 1);
        }
        if self.title.is_some() || self.encoder.is_some() {
            let udta = begin(buf, b"udta");
            if let Some(title) = &self.title {
                write_qt_text(buf, b"\xA9nam", title);
            }
            if let Some(encoder) = &self.encoder {
                write_qt_text(buf, b"\xA9too", encoder);
            }
            finish(buf, udta);
        }
        finish(buf, start);
    }

    fn write_mvhd(&self, buf: &mut BytesMut) {
        let start = begin(buf, b"mvhd");
        buf.put_u32(0); // version 0, flags
        buf.put_u32(self.creation_time as u32);
        buf.put_u32(self.creation_time as u32);
        buf.put_u32(self.timescale);
        buf.put_u32(self.duration as u32);
        buf.put_u32(0x00010000); // rate = 1.0
        buf.put_u16(0x0100); // volume = 1.0
        buf.put_u16(0); // reserved
        buf.put_u64(0); // reserved
        put_matrix(buf);
        buf.put_bytes(0, 24); // pre-defined
        buf.put_u32(self.tracks.len() as u32 + 1); // next track ID
        finish(buf, start);
    }

    fn write_trak(&self, buf: &mut BytesMut, track: &TrackSpec, track_id: u32) {
        let start = begin(buf, b"trak");
        self.write_tkhd(buf, track, track_id);
        write_mdia(buf, track, self.creation_time);
        if let Some(name) = &track.name {
            let udta = begin(buf, b"udta");
            let name_box = begin(buf, b"name");
            buf.put_slice(name.as_bytes());
            finish(buf, name_box);
            finish(buf, udta);
        }
        finish(buf, start);
    }

    fn write_tkhd(&self, buf: &mut BytesMut, track: &TrackSpec, track_id: u32) {
        let movie_duration = if track.timescale == 0 {
            0
        } else {
            track.duration * self.timescale as u64 / track.timescale as u64
        };
        let flags = if track.enabled { 7 } else { 6 };

        let start = begin(buf, b"tkhd");
        if track.version1 {
            buf.put_u32(0x0100_0000 | flags);
            buf.put_u64(self.creation_time);
            buf.put_u64(self.creation_time);
            buf.put_u32(track_id);
            buf.put_u32(0); // reserved
            buf.put_u64(movie_duration);
        } else {
            buf.put_u32(flags);
            buf.put_u32(self.creation_time as u32);
            buf.put_u32(self.creation_time as u32);
            buf.put_u32(track_id);
            buf.put_u32(0); // reserved
            buf.put_u32(movie_duration as u32);
        }
        buf.put_u64(0); // reserved
        buf.put_u16(0); // layer
        buf.put_u16(0); // alternate group
        buf.put_u16(if track.handler == *b"soun" { 0x0100 } else { 0 });
        buf.put_u16(0); // reserved
        put_matrix(buf);
        buf.put_u32((track.width as u32) << 16);
        buf.put_u32((track.height as u32) << 16);
        finish(buf, start);
    }
}

fn write_mdia(buf: &mut BytesMut, track: &TrackSpec, creation_time: u64) {
    let start = begin(buf, b"mdia");

    let mdhd = begin(buf, b"mdhd");
    if track.version1 {
        buf.put_u32(0x0100_0000);
        buf.put_u64(creation_time);
        buf.put_u64(creation_time);
        buf.put_u32(track.timescale);
        buf.put_u64(track.duration);
    } else {
        buf.put_u32(0);
        buf.put_u32(creation_time as u32);
        buf.put_u32(creation_time as u32);
        buf.put_u32(track.timescale);
        buf.put_u32(track.duration as u32);
    }
    buf.put_u16(pack_language(track.language));
    buf.put_u16(0); // quality
    finish(buf, mdhd);

    let hdlr = begin(buf, b"hdlr");
    buf.put_u32(0); // version, flags
    buf.put_u32(0); // pre-defined
    buf.put_slice(&track.handler);
    buf.put_bytes(0, 12); // reserved
    buf.put_slice(b"mediaprobe\0");
    finish(buf, hdlr);

    let minf = begin(buf, b"minf");
    write_stbl(buf, track);
    finish(buf, minf);

    finish(buf, start);
}

fn write_stbl(buf: &mut BytesMut, track: &TrackSpec) {
    let start = begin(buf, b"stbl");

    let stsd = begin(buf, b"stsd");
    buf.put_u32(0); // version, flags
    buf.put_u32(1); // entry count
    write_sample_entry(buf, track);
    finish(buf, stsd);

    let stts = begin(buf, b"stts");
    buf.put_u32(0);
    if track.sample_count > 0 {
        buf.put_u32(1);
        buf.put_u32(track.sample_count);
        buf.put_u32(track.sample_delta);
    } else {
        buf.put_u32(0);
    }
    finish(buf, stts);

    let stsz = begin(buf, b"stsz");
    buf.put_u32(0);
    buf.put_u32(track.sample_bytes);
    buf.put_u32(track.sample_count);
    finish(buf, stsz);

    finish(buf, start);
}

fn write_sample_entry(buf: &mut BytesMut, track: &TrackSpec) {
    let start = begin(buf, &track.codec);
    buf.put_bytes(0, 6); // reserved
    buf.put_u16(1); // data reference index

    match &track.handler {
        b"vide" => {
            buf.put_u16(0); // pre-defined
            buf.put_u16(0); // reserved
            buf.put_bytes(0, 12); // pre-defined
            buf.put_u16(track.width);
            buf.put_u16(track.height);
            buf.put_u32(0x0048_0000); // 72 dpi
            buf.put_u32(0x0048_0000);
            buf.put_u32(0); // reserved
            buf.put_u16(1); // frame count
            let mut name = [0u8; 32];
            if let Some(compressor) = &track.compressor {
                let bytes = compressor.as_bytes();
                let len = bytes.len().min(31);
                name[0] = len as u8;
                name[1..=len].copy_from_slice(&bytes[..len]);
            }
            buf.put_slice(&name);
            buf.put_u16(track.depth);
            buf.put_i16(-1);
        }
        b"soun" => {
            buf.put_u16(0); // version
            buf.put_u16(0); // revision
            buf.put_u32(0); // vendor
            buf.put_u16(track.channels);
            buf.put_u16(track.sample_size);
            buf.put_u16(0); // compression id
            buf.put_u16(0); // packet size
            buf.put_u32(track.sample_rate << 16);
        }
        b"tmcd" => {
            let (flags, timescale, frame_duration, frames) = track.timecode.unwrap_or((0, 25, 1, 25));
            buf.put_u32(0); // reserved
            buf.put_u32(flags);
            buf.put_u32(timescale);
            buf.put_u32(frame_duration);
            buf.put_u8(frames);
            buf.put_u8(0);
        }
        _ => {}
    }

    for (kind, payload) in &track.children {
        let child = begin(buf, kind);
        buf.put_slice(payload);
        finish(buf, child);
    }
    finish(buf, start);
}

fn write_qt_text(buf: &mut BytesMut, kind: &[u8; 4], text: &str) {
    let start = begin(buf, kind);
    buf.put_u16(text.len() as u16);
    buf.put_u16(pack_language(*b"und"));
    buf.put_slice(text.as_bytes());
    finish(buf, start);
}

fn put_matrix(buf: &mut BytesMut) {
    for value in [0x00010000u32, 0, 0, 0, 0x00010000, 0, 0, 0, 0x40000000] {
        buf.put_u32(value);
    }
}

/// Pack an ISO 639-2 code the way `mdhd` stores it.
pub fn pack_language(code: [u8; 3]) -> u16 {
    code.iter()
        .fold(0u16, |acc, &c| (acc << 5) | (c.wrapping_sub(0x60) as u16 & 0x1F))
}

fn begin(buf: &mut BytesMut, kind: &[u8; 4]) -> usize {
    let start = buf.len();
    buf.put_u32(0); // placeholder size
    buf.put_slice(kind);
    start
}

fn finish(buf: &mut BytesMut, start: usize) {
    let size = (buf.len() - start) as u32;
    buf[start..start + 4].copy_from_slice(&size.to_be_bytes());
}

/// An `avcC` payload for the given profile and level.
///
/// High profiles (100 and up) carry the chroma format and bit depth
/// extension.
pub fn avcc(profile: u8, compatibility: u8, level: u8, chroma_format: u8, bit_depth: u8) -> Vec<u8> {
    let sps = [0x67, profile, compatibility, level];
    let pps = [0x68, 0xCE, 0x3C, 0x80];
    let mut out = vec![1, profile, compatibility, level, 0xFF, 0xE1];
    out.extend_from_slice(&(sps.len() as u16).to_be_bytes());
    out.extend_from_slice(&sps);
    out.push(1);
    out.extend_from_slice(&(pps.len() as u16).to_be_bytes());
    out.extend_from_slice(&pps);
    if matches!(profile, 100 | 110 | 122 | 144) {
        out.push(0xFC | (chroma_format & 0x03));
        out.push(0xF8 | (bit_depth.saturating_sub(8) & 0x07));
        out.push(0xF8 | (bit_depth.saturating_sub(8) & 0x07));
        out.push(0);
    }
    out
}

/// An `hvcC` payload header with no parameter set arrays.
pub fn hvcc(profile_idc: u8, tier_high: bool, level_idc: u8, chroma_format: u8, bit_depth: u8) -> Vec<u8> {
    let mut out = vec![1];
    out.push(((tier_high as u8) << 5) | (profile_idc & 0x1F));
    out.extend_from_slice(&[0x60, 0, 0, 0]); // compatibility flags
    out.extend_from_slice(&[0x90, 0, 0, 0, 0, 0]); // constraint flags
    out.push(level_idc);
    out.extend_from_slice(&[0xF0, 0x00]); // min spatial segmentation
    out.push(0xFC); // parallelism
    out.push(0xFC | (chroma_format & 0x03));
    out.push(0xF8 | (bit_depth.saturating_sub(8) & 0x07));
    out.push(0xF8 | (bit_depth.saturating_sub(8) & 0x07));
    out.extend_from_slice(&[0, 0]); // average frame rate
    out.push(0x0F); // length size 4
    out.push(0); // no arrays
    out
}

/// A two-byte AAC `AudioSpecificConfig`.
pub fn aac_config(object_type: u8, frequency_index: u8, channel_config: u8) -> Vec<u8> {
    let bits: u16 = ((object_type as u16 & 0x1F) << 11)
        | ((frequency_index as u16 & 0x0F) << 7)
        | ((channel_config as u16 & 0x0F) << 3);
    bits.to_be_bytes().to_vec()
}

/// An `esds` payload wrapping `decoder_specific` for the given object type.
pub fn esds(object_type: u8, decoder_specific: &[u8], max_bitrate: u32, avg_bitrate: u32) -> Vec<u8> {
    let mut dsi = vec![0x05, decoder_specific.len() as u8];
    dsi.extend_from_slice(decoder_specific);

    let mut dcd = vec![object_type, 0x15, 0, 0, 0];
    dcd.extend_from_slice(&max_bitrate.to_be_bytes());
    dcd.extend_from_slice(&avg_bitrate.to_be_bytes());
    dcd.extend(dsi);
    let mut dcd_tagged = vec![0x04, dcd.len() as u8];
    dcd_tagged.extend(dcd);

    let mut es = vec![0, 1, 0];
    es.extend(dcd_tagged);
    es.extend_from_slice(&[0x06, 0x01, 0x02]);

    let mut out = vec![0, 0, 0, 0, 0x03, es.len() as u8];
    out.extend(es);
    out
}

/// A `colr` payload of type `nclx`.
pub fn colr_nclx(primaries: u16, transfer: u16, matrix: u16, full_range: bool) -> Vec<u8> {
    let mut out = b"nclx".to_vec();
    out.extend_from_slice(&primaries.to_be_bytes());
    out.extend_from_slice(&transfer.to_be_bytes());
    out.extend_from_slice(&matrix.to_be_bytes());
    out.push(if full_range { 0x80 } else { 0 });
    out
}

/// A `pasp` payload.
pub fn pasp(h_spacing: u32, v_spacing: u32) -> Vec<u8> {
    let mut out = h_spacing.to_be_bytes().to_vec();
    out.extend_from_slice(&v_spacing.to_be_bytes());
    out
}

/// A `btrt` payload.
pub fn btrt(buffer_size: u32, max_bitrate: u32, avg_bitrate: u32) -> Vec<u8> {
    let mut out = buffer_size.to_be_bytes().to_vec();
    out.extend_from_slice(&max_bitrate.to_be_bytes());
    out.extend_from_slice(&avg_bitrate.to_be_bytes());
    out
}
