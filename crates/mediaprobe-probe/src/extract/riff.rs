//! WAV and AVI record decoding.

use mediaprobe_container::riff::{AviStream, RiffHeader, WaveFormat};
use mediaprobe_container::{StreamDescriptor, StreamKind};

use super::{codec, duration_ms, Params};
use crate::fields::{fourcc, fourcc_str, latin1, le_i32, le_u16, le_u32};

const WAVE_FORMAT_PCM: u16 = 0x0001;
const WAVE_FORMAT_IEEE_FLOAT: u16 = 0x0003;
const WAVE_FORMAT_EXTENSIBLE: u16 = 0xFFFE;

pub(super) fn header(header: &RiffHeader, params: &mut Params) {
    let format = match &header.form.0 {
        b"WAVE" => "Wave",
        b"AVI " => "AVI",
        _ => return,
    };
    params.set("Format", format);
    params.set_opt("DataSize", header.data_size);

    if let Some(avih) = header.avih.as_deref() {
        let us_per_frame = le_u32(avih, 0).unwrap_or(0) as u64;
        let frames = le_u32(avih, 16).unwrap_or(0) as u64;
        if us_per_frame > 0 && frames > 0 {
            params.set("Duration", (frames * us_per_frame) as f64 / 1000.0);
        }
    }

    if let Some(info) = header.info.as_deref() {
        info_list(info, params);
    }
}

/// `LIST INFO` sub-chunks: four-character id, size, NUL-terminated Latin-1.
fn info_list(mut data: &[u8], params: &mut Params) {
    while data.len() >= 8 {
        let id = fourcc(data, 0).unwrap_or_default();
        let size = le_u32(data, 4).unwrap_or(0) as usize;
        let Some(text) = data.get(8..8 + size) else {
            break;
        };
        let name = match &id {
            b"INAM" => Some("Title"),
            b"ISFT" => Some("Encoded_Application"),
            b"IART" => Some("Performer"),
            b"IPRD" => Some("Album"),
            b"ICMT" => Some("Comment"),
            _ => None,
        };
        if let Some(name) = name {
            params.fill(name, Some(latin1(text)));
        }
        let advance = 8 + size + (size & 1);
        data = data.get(advance..).unwrap_or_default();
    }
}

/// Fields of a `WAVEFORMATEX` needed for timing.
struct WaveFields {
    avg_bytes_per_sec: u32,
    block_align: u16,
}

/// Decode a `WAVEFORMAT`, `WAVEFORMATEX` or `WAVEFORMATEXTENSIBLE`.
fn wave_format(fmt: &[u8], params: &mut Params) -> Option<WaveFields> {
    let mut tag = le_u16(fmt, 0)?;
    let channels = le_u16(fmt, 2)?;
    let rate = le_u32(fmt, 4)?;
    let avg_bytes_per_sec = le_u32(fmt, 8)?;
    let block_align = le_u16(fmt, 12)?;
    let mut bits = le_u16(fmt, 14).unwrap_or(0);

    if tag == WAVE_FORMAT_EXTENSIBLE {
        let extra = le_u16(fmt, 16).unwrap_or(0);
        if extra >= 22 {
            if let Some(valid) = le_u16(fmt, 18).filter(|&v| v > 0) {
                bits = valid;
            }
            let sub = le_u16(fmt, 24);
            if let Some(guid) = fmt.get(24..40) {
                params.set("CodecID", guid_string(guid));
            }
            tag = sub.unwrap_or(tag);
        }
    } else {
        params.set("CodecID", format!("{:X}", tag));
    }

    params.set_opt("Format", codec::wave_format_name(tag));
    if channels > 0 {
        params.set("Channels", channels);
    }
    if rate > 0 {
        params.set("SamplingRate", rate);
    }
    if avg_bytes_per_sec > 0 {
        params.set("BitRate", avg_bytes_per_sec as u64 * 8);
    }

    if tag == WAVE_FORMAT_PCM || tag == WAVE_FORMAT_IEEE_FLOAT {
        if bits > 0 {
            params.set("BitDepth", bits);
        }
        params.set("Format_Settings_Endianness", "Little");
        if tag == WAVE_FORMAT_PCM {
            params.set("Format_Settings_Sign", if bits == 8 { "Unsigned" } else { "Signed" });
        } else {
            params.set("Format_Profile", "Float");
        }
    }

    Some(WaveFields {
        avg_bytes_per_sec,
        block_align,
    })
}

/// Render a little-endian GUID in registry form.
fn guid_string(guid: &[u8]) -> String {
    let d1 = le_u32(guid, 0).unwrap_or(0);
    let d2 = le_u16(guid, 4).unwrap_or(0);
    let d3 = le_u16(guid, 6).unwrap_or(0);
    let tail: String = guid.iter().skip(8).map(|b| format!("{:02X}", b)).collect();
    format!("{:08X}-{:04X}-{:04X}-{}-{}", d1, d2, d3, &tail[..4], &tail[4..])
}

pub(super) fn wave(format: &WaveFormat, params: &mut Params) {
    let Some(fields) = wave_format(&format.fmt, params) else {
        return;
    };
    let Some(size) = format.data_size else {
        return;
    };
    params.set("StreamSize", size);
    if fields.avg_bytes_per_sec > 0 {
        params.set("Duration", size as f64 * 1000.0 / fields.avg_bytes_per_sec as f64);
    }
    if fields.block_align > 0 && params.get("Format").and_then(|v| v.as_str()) == Some("PCM") {
        params.set("SamplingCount", size / fields.block_align as u64);
    }
}

pub(super) fn avi_stream(stream: &AviStream, descriptor: &StreamDescriptor, params: &mut Params) {
    params.set("ID", descriptor.order);
    if let Some(name) = stream.strn.as_deref() {
        params.set("Title", latin1(name));
    }
    let Some(strh) = stream.strh.as_deref() else {
        return;
    };
    let scale = le_u32(strh, 20).unwrap_or(0) as u64;
    let rate = le_u32(strh, 24).unwrap_or(0) as u64;
    let length = le_u32(strh, 32).unwrap_or(0) as u64;
    if length > 0 {
        params.set_opt("Duration", duration_ms(length * scale, rate));
    }

    let strf = stream.strf.as_deref().unwrap_or_default();
    match descriptor.kind {
        StreamKind::Video => {
            if scale > 0 && rate > 0 {
                params.set("FrameRate", rate as f64 / scale as f64);
                params.set("FrameRate_Mode", "CFR");
            }
            if length > 0 {
                params.set("FrameCount", length);
            }
            avi_video(strh, strf, params);
        }
        StreamKind::Audio => {
            wave_format(strf, params);
            let sample_size = le_u32(strh, 44).unwrap_or(0) as u64;
            if sample_size > 0 && length > 0 {
                params.set("StreamSize", length * sample_size);
            }
        }
        _ => {}
    }
}

/// `BITMAPINFOHEADER` in `strf`.
fn avi_video(strh: &[u8], strf: &[u8], params: &mut Params) {
    let compression = fourcc(strf, 16).or_else(|| fourcc(strh, 4)).unwrap_or_default();
    if compression != [0; 4] {
        params.set("CodecID", fourcc_str(&compression));
    }
    params.set_opt("Format", codec::avi_video_format(&compression));

    let width = le_i32(strf, 4).unwrap_or(0).unsigned_abs() as u64;
    // Negative height marks a top-down bitmap.
    let height = le_i32(strf, 8).unwrap_or(0).unsigned_abs() as u64;
    params.geometry(width, height, None);

    if compression == [0; 4] {
        if let Some(bits) = le_u16(strf, 14).filter(|&b| b >= 24) {
            params.set("BitDepth", bits / 3);
        }
    }
}
