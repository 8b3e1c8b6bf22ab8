//! Stream Metadata Extractor: decodes a descriptor's record into named
//! parameters.
//!
//! Decoding is pure: it only looks at the bytes copied into the descriptor,
//! never at the file. Parameters whose fields do not fit in the record are
//! left out rather than reported as errors.

pub mod codec;
mod flac;
mod mkv;
mod mp4;
mod riff;

use std::collections::BTreeMap;

use mediaprobe_container::{Record, StreamDescriptor, StreamKind};

use crate::colour::{ColorPrimaries, MatrixCoefficients, TransferCharacteristics};
use crate::value::Value;

/// Decoded parameters of one stream, keyed by MediaInfo parameter name.
pub type ParameterMap = BTreeMap<&'static str, Value>;

/// Decode `descriptor` into its parameters.
///
/// Opaque records decode to an empty map.
pub fn extract(descriptor: &StreamDescriptor) -> ParameterMap {
    let mut params = Params::default();
    if matches!(descriptor.record, Record::Opaque(_)) {
        return params.into_map();
    }
    if descriptor.kind != StreamKind::General {
        params.set("StreamOrder", descriptor.order);
    }

    match &descriptor.record {
        Record::Mp4Movie(movie) => mp4::movie(movie, &mut params),
        Record::Mp4Track(track) => mp4::track(track, descriptor.kind, &mut params),
        Record::MatroskaSegment(segment) => mkv::segment(segment, &mut params),
        Record::MatroskaTrack(entry) => mkv::track(entry, descriptor.kind, &mut params),
        Record::MatroskaChapters(chapters) => mkv::chapters(chapters, &mut params),
        Record::RiffHeader(header) => riff::header(header, &mut params),
        Record::WaveFormat(format) => riff::wave(format, &mut params),
        Record::AviStream(stream) => riff::avi_stream(stream, descriptor, &mut params),
        Record::FlacHeader(header) => flac::header(header, &mut params),
        Record::FlacStream(stream) => flac::stream(stream, &mut params),
        Record::Opaque(_) => {}
    }

    tracing::trace!(
        kind = %descriptor.kind,
        index = descriptor.index,
        params = params.0.len(),
        "Extracted stream parameters"
    );
    params.into_map()
}

/// Parameter map under construction.
///
/// Setters drop values that carry no information (empty text, non-finite
/// floats) so every present parameter renders to something meaningful.
#[derive(Debug, Default)]
pub(crate) struct Params(ParameterMap);

impl Params {
    pub fn from_map(map: ParameterMap) -> Self {
        Self(map)
    }

    pub fn set(&mut self, name: &'static str, value: impl Into<Value>) {
        let value = value.into();
        let keep = match &value {
            Value::Text(s) => !s.trim().is_empty(),
            Value::Float(f) => f.is_finite(),
            _ => true,
        };
        if keep {
            self.0.insert(name, value);
        }
    }

    pub fn set_opt<V: Into<Value>>(&mut self, name: &'static str, value: Option<V>) {
        if let Some(value) = value {
            self.set(name, value);
        }
    }

    /// Set `name` only if it is not already present.
    pub fn fill<V: Into<Value>>(&mut self, name: &'static str, value: Option<V>) {
        if !self.0.contains_key(name) {
            self.set_opt(name, value);
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn into_map(self) -> ParameterMap {
        self.0
    }

    /// Emit the H.273 colour description.
    pub fn colour(&mut self, primaries: u8, transfer: u8, matrix: u8) {
        self.set_opt("colour_primaries", ColorPrimaries::from(primaries).name());
        self.set_opt("transfer_characteristics", TransferCharacteristics::from(transfer).name());
        self.set_opt("matrix_coefficients", MatrixCoefficients::from(matrix).name());
    }

    /// Derive `BitRate` from `StreamSize` and `Duration` when absent.
    pub fn derive_bit_rate(&mut self) {
        if self.contains("BitRate") {
            return;
        }
        let size = self.get("StreamSize").and_then(Value::as_u64);
        let duration = self.get("Duration").and_then(Value::as_f64);
        if let (Some(size), Some(ms)) = (size, duration) {
            self.set_opt("BitRate", bit_rate(size, ms));
        }
    }

    /// Set `Width`, `Height` and the aspect ratios from a pixel size and an
    /// optional pixel aspect ratio.
    pub fn geometry(&mut self, width: u64, height: u64, par: Option<f64>) {
        if width == 0 || height == 0 {
            return;
        }
        self.set("Width", width);
        self.set("Height", height);
        let par = par.filter(|p| *p > 0.0).unwrap_or(1.0);
        self.set("PixelAspectRatio", par);
        self.set("DisplayAspectRatio", width as f64 * par / height as f64);
    }
}

/// Duration in milliseconds from a tick count and timescale.
pub(crate) fn duration_ms(ticks: u64, timescale: u64) -> Option<f64> {
    if timescale == 0 {
        return None;
    }
    Some(ticks as f64 * 1000.0 / timescale as f64)
}

/// Bits per second for `size` bytes over `ms` milliseconds.
pub(crate) fn bit_rate(size: u64, ms: f64) -> Option<u64> {
    if ms <= 0.0 {
        return None;
    }
    Some((size as f64 * 8000.0 / ms).round() as u64)
}

/// Format name for an AAC audio object type.
pub(crate) fn aac_profile(object_type: u8) -> Option<&'static str> {
    Some(match object_type {
        1 => "Main",
        2 => "LC",
        3 => "SSR",
        4 => "LTP",
        5 => "HE-AAC",
        29 => "HE-AACv2",
        42 => "xHE-AAC",
        _ => return None,
    })
}
