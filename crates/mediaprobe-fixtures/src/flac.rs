//! FLAC file builder.

use bytes::{BufMut, BytesMut};

/// Builder for a native FLAC file.
#[derive(Debug, Clone)]
pub struct FlacBuilder {
    sample_rate: u32,
    channels: u8,
    bits_per_sample: u8,
    total_samples: u64,
    vendor: String,
    comments: Vec<String>,
    padding: usize,
    audio_len: usize,
}

impl FlacBuilder {
    pub fn new(sample_rate: u32, channels: u8, bits_per_sample: u8) -> Self {
        Self {
            sample_rate,
            channels,
            bits_per_sample,
            total_samples: 0,
            vendor: "reference libFLAC 1.4.3 20230623".to_string(),
            comments: Vec::new(),
            padding: 0,
            audio_len: 128,
        }
    }

    pub fn total_samples(mut self, samples: u64) -> Self {
        self.total_samples = samples;
        self
    }

    /// Add a Vorbis comment such as `TITLE=...`.
    pub fn comment(mut self, key: &str, value: &str) -> Self {
        self.comments.push(format!("{}={}", key, value));
        self
    }

    pub fn padding(mut self, len: usize) -> Self {
        self.padding = len;
        self
    }

    /// Bytes of (fake) frame data after the metadata.
    pub fn audio_len(mut self, len: usize) -> Self {
        self.audio_len = len;
        self
    }

    /// The 34-byte STREAMINFO payload.
    pub fn streaminfo(&self) -> Vec<u8> {
        let mut buf = BytesMut::with_capacity(34);
        buf.put_u16(4096); // min block size
        buf.put_u16(4096); // max block size
        buf.put_uint(14, 3); // min frame size
        buf.put_uint(8192, 3); // max frame size
        let packed = ((self.sample_rate as u64 & 0xF_FFFF) << 44)
            | (((self.channels.saturating_sub(1)) as u64 & 0x7) << 41)
            | (((self.bits_per_sample.saturating_sub(1)) as u64 & 0x1F) << 36)
            | (self.total_samples & 0xF_FFFF_FFFF);
        buf.put_u64(packed);
        buf.put_bytes(0xAB, 16); // MD5
        buf.to_vec()
    }

    pub fn build(&self) -> Vec<u8> {
        let mut blocks: Vec<(u8, Vec<u8>)> = vec![(0, self.streaminfo())];
        if !self.comments.is_empty() {
            let mut vc = BytesMut::new();
            vc.put_u32_le(self.vendor.len() as u32);
            vc.put_slice(self.vendor.as_bytes());
            vc.put_u32_le(self.comments.len() as u32);
            for comment in &self.comments {
                vc.put_u32_le(comment.len() as u32);
                vc.put_slice(comment.as_bytes());
            }
            blocks.push((4, vc.to_vec()));
        }
        if self.padding > 0 {
            blocks.push((1, vec![0u8; self.padding]));
        }

        let mut buf = BytesMut::new();
        buf.put_slice(b"fLaC");
        let last = blocks.len() - 1;
        for (i, (kind, payload)) in blocks.iter().enumerate() {
            buf.put_u8(if i == last { 0x80 | kind } else { *kind });
            buf.put_uint(payload.len() as u64, 3);
            buf.put_slice(payload);
        }
        buf.put_bytes(0xFF, self.audio_len);
        buf.to_vec()
    }
}
