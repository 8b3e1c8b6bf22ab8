//! WAV and AVI file builders.

use bytes::{BufMut, BytesMut};

/// `KSDATAFORMAT_SUBTYPE_PCM` tail shared by every extensible subformat GUID.
const GUID_TAIL: [u8; 14] = [
    0x00, 0x00, 0x00, 0x00, 0x10, 0x00, 0x80, 0x00, 0x00, 0xAA, 0x00, 0x38, 0x9B, 0x71,
];

fn chunk(buf: &mut BytesMut, id: &[u8; 4], payload: &[u8]) {
    buf.put_slice(id);
    buf.put_u32_le(payload.len() as u32);
    buf.put_slice(payload);
    if payload.len() % 2 == 1 {
        buf.put_u8(0);
    }
}

fn list(id: &[u8; 4], children: &[u8]) -> Vec<u8> {
    let mut payload = id.to_vec();
    payload.extend_from_slice(children);
    let mut buf = BytesMut::new();
    chunk(&mut buf, b"LIST", &payload);
    buf.to_vec()
}

fn riff(form: &[u8; 4], body: &[u8]) -> Vec<u8> {
    let mut buf = BytesMut::with_capacity(body.len() + 12);
    buf.put_slice(b"RIFF");
    buf.put_u32_le(body.len() as u32 + 4);
    buf.put_slice(form);
    buf.put_slice(body);
    buf.to_vec()
}

fn info_list(tags: &[([u8; 4], String)]) -> Vec<u8> {
    let mut body = BytesMut::new();
    for (id, value) in tags {
        let mut text = value.as_bytes().to_vec();
        text.push(0);
        chunk(&mut body, id, &text);
    }
    list(b"INFO", &body)
}

/// A `WAVEFORMATEX` structure, extensible when `format_tag` is `0xFFFE`.
pub fn wave_format(format_tag: u16, channels: u16, sample_rate: u32, bits: u16, sub_format: u16) -> Vec<u8> {
    let block_align = channels * bits.div_ceil(8);
    let mut buf = BytesMut::with_capacity(40);
    buf.put_u16_le(format_tag);
    buf.put_u16_le(channels);
    buf.put_u32_le(sample_rate);
    buf.put_u32_le(sample_rate * block_align as u32);
    buf.put_u16_le(block_align);
    buf.put_u16_le(bits);
    if format_tag == 0xFFFE {
        buf.put_u16_le(22);
        buf.put_u16_le(bits); // valid bits per sample
        buf.put_u32_le(if channels == 2 { 0x3 } else { 0x4 }); // channel mask
        buf.put_u16_le(sub_format);
        buf.put_slice(&GUID_TAIL);
    }
    buf.to_vec()
}

/// Builder for a WAV file.
#[derive(Debug, Clone)]
pub struct WavBuilder {
    format_tag: u16,
    sub_format: u16,
    channels: u16,
    sample_rate: u32,
    bits: u16,
    data_len: usize,
    info: Vec<([u8; 4], String)>,
}

impl WavBuilder {
    /// Integer PCM.
    pub fn pcm(channels: u16, sample_rate: u32, bits: u16) -> Self {
        Self {
            format_tag: 1,
            sub_format: 1,
            channels,
            sample_rate,
            bits,
            data_len: 0,
            info: Vec::new(),
        }
    }

    /// Use `WAVEFORMATEXTENSIBLE` with the given subformat code.
    pub fn extensible(mut self, sub_format: u16) -> Self {
        self.format_tag = 0xFFFE;
        self.sub_format = sub_format;
        self
    }

    pub fn format_tag(mut self, tag: u16) -> Self {
        self.format_tag = tag;
        self
    }

    /// Size of the `data` chunk payload.
    pub fn data_len(mut self, len: usize) -> Self {
        self.data_len = len;
        self
    }

    /// Add a `LIST INFO` entry such as `INAM` or `ISFT`.
    pub fn info(mut self, id: &[u8; 4], value: &str) -> Self {
        self.info.push((*id, value.to_string()));
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mut body = BytesMut::new();
        chunk(
            &mut body,
            b"fmt ",
            &wave_format(self.format_tag, self.channels, self.sample_rate, self.bits, self.sub_format),
        );
        if !self.info.is_empty() {
            body.put_slice(&info_list(&self.info));
        }
        chunk(&mut body, b"data", &vec![0u8; self.data_len]);
        riff(b"WAVE", &body)
    }
}

/// One AVI stream.
#[derive(Debug, Clone)]
pub enum AviStreamSpec {
    Video {
        handler: [u8; 4],
        width: u32,
        height: u32,
        bit_count: u16,
        scale: u32,
        rate: u32,
        length: u32,
    },
    Audio {
        format_tag: u16,
        channels: u16,
        sample_rate: u32,
        bits: u16,
    },
}

/// Builder for an AVI file.
#[derive(Debug, Clone)]
pub struct AviBuilder {
    micro_sec_per_frame: u32,
    total_frames: u32,
    width: u32,
    height: u32,
    streams: Vec<(AviStreamSpec, Option<String>)>,
    movi_len: usize,
    info: Vec<([u8; 4], String)>,
}

impl Default for AviBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl AviBuilder {
    pub fn new() -> Self {
        Self {
            micro_sec_per_frame: 40_000,
            total_frames: 0,
            width: 0,
            height: 0,
            streams: Vec::new(),
            movi_len: 16,
            info: Vec::new(),
        }
    }

    /// Add a video stream; also sets the main header's geometry and timing.
    pub fn video(mut self, handler: &[u8; 4], width: u32, height: u32, scale: u32, rate: u32, frames: u32) -> Self {
        if self.width == 0 {
            self.width = width;
            self.height = height;
            self.total_frames = frames;
            if rate > 0 {
                self.micro_sec_per_frame = (scale as u64 * 1_000_000 / rate as u64) as u32;
            }
        }
        self.streams.push((
            AviStreamSpec::Video {
                handler: *handler,
                width,
                height,
                bit_count: 24,
                scale,
                rate,
                length: frames,
            },
            None,
        ));
        self
    }

    pub fn audio(mut self, format_tag: u16, channels: u16, sample_rate: u32, bits: u16) -> Self {
        self.streams.push((
            AviStreamSpec::Audio {
                format_tag,
                channels,
                sample_rate,
                bits,
            },
            None,
        ));
        self
    }

    /// Name the most recently added stream (`strn`).
    pub fn named(mut self, name: &str) -> Self {
        if let Some(last) = self.streams.last_mut() {
            last.1 = Some(name.to_string());
        }
        self
    }

    pub fn info(mut self, id: &[u8; 4], value: &str) -> Self {
        self.info.push((*id, value.to_string()));
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mut hdrl = BytesMut::new();
        let mut avih = BytesMut::with_capacity(56);
        avih.put_u32_le(self.micro_sec_per_frame);
        avih.put_u32_le(0); // max bytes per sec
        avih.put_u32_le(0); // padding granularity
        avih.put_u32_le(0x10); // AVIF_HASINDEX
        avih.put_u32_le(self.total_frames);
        avih.put_u32_le(0); // initial frames
        avih.put_u32_le(self.streams.len() as u32);
        avih.put_u32_le(0); // suggested buffer size
        avih.put_u32_le(self.width);
        avih.put_u32_le(self.height);
        avih.put_bytes(0, 16);
        chunk(&mut hdrl, b"avih", &avih);

        for (stream, name) in &self.streams {
            let mut strl = BytesMut::new();
            let (strh, strf) = match stream {
                AviStreamSpec::Video {
                    handler,
                    width,
                    height,
                    bit_count,
                    scale,
                    rate,
                    length,
                } => {
                    let strh = stream_header(b"vids", handler, *scale, *rate, *length, 0);
                    let mut strf = BytesMut::with_capacity(40);
                    strf.put_u32_le(40);
                    strf.put_i32_le(*width as i32);
                    strf.put_i32_le(*height as i32);
                    strf.put_u16_le(1); // planes
                    strf.put_u16_le(*bit_count);
                    strf.put_slice(handler);
                    strf.put_u32_le(width * height * 3);
                    strf.put_bytes(0, 16);
                    (strh, strf.to_vec())
                }
                AviStreamSpec::Audio {
                    format_tag,
                    channels,
                    sample_rate,
                    bits,
                } => {
                    let block_align = channels * bits.div_ceil(8);
                    let strh = stream_header(b"auds", &[0; 4], block_align as u32, sample_rate * block_align as u32, 0, block_align as u32);
                    (strh, wave_format(*format_tag, *channels, *sample_rate, *bits, 1))
                }
            };
            chunk(&mut strl, b"strh", &strh);
            chunk(&mut strl, b"strf", &strf);
            if let Some(name) = name {
                let mut text = name.as_bytes().to_vec();
                text.push(0);
                chunk(&mut strl, b"strn", &text);
            }
            hdrl.put_slice(&list(b"strl", &strl));
        }

        let mut body = list(b"hdrl", &hdrl);
        if !self.info.is_empty() {
            body.extend(info_list(&self.info));
        }
        let mut movi = BytesMut::new();
        chunk(&mut movi, b"00dc", &vec![0u8; self.movi_len]);
        body.extend(list(b"movi", &movi));
        riff(b"AVI ", &body)
    }
}

fn stream_header(fcc_type: &[u8; 4], handler: &[u8; 4], scale: u32, rate: u32, length: u32, sample_size: u32) -> Vec<u8> {
    let mut buf = BytesMut::with_capacity(56);
    buf.put_slice(fcc_type);
    buf.put_slice(handler);
    buf.put_u32_le(0); // flags
    buf.put_u16_le(0); // priority
    buf.put_u16_le(0); // language
    buf.put_u32_le(0); // initial frames
    buf.put_u32_le(scale);
    buf.put_u32_le(rate);
    buf.put_u32_le(0); // start
    buf.put_u32_le(length);
    buf.put_u32_le(0); // suggested buffer size
    buf.put_u32_le(u32::MAX); // quality
    buf.put_u32_le(sample_size);
    buf.put_bytes(0, 8); // frame rectangle
    buf.to_vec()
}
