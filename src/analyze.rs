//! Build a [`MediaInfo`] from a probe session.

use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDateTime, Utc};
use mediaprobe_probe::{InfoKind, ProbeError, ProbeSession, StreamKind, Value};
use rayon::prelude::*;
use walkdir::WalkDir;

use crate::config::Config;
use crate::model::{
    AudioTrack, Extra, Extras, GeneralInfo, HdrFormat, MediaInfo, TextTrack, TimecodeTrack, VideoTrack,
};

/// Layout of `File_Modified_Date_Local`.
const LOCAL_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Analyze a file with the default configuration.
pub fn analyze(path: impl AsRef<Path>) -> Result<MediaInfo, ProbeError> {
    analyze_with(path, &Config::default())
}

/// Analyze a file.
pub fn analyze_with(path: impl AsRef<Path>, config: &Config) -> Result<MediaInfo, ProbeError> {
    let path = path.as_ref();
    let mut session = ProbeSession::open_with(path, config.session_options())?;
    let info = read_media_info(&mut session);
    session.close();
    info
}

/// Analyze many files in parallel, one session per file.
pub fn analyze_all<P>(paths: &[P], config: &Config) -> Vec<(PathBuf, Result<MediaInfo, ProbeError>)>
where
    P: AsRef<Path> + Sync,
{
    paths
        .par_iter()
        .map(|path| {
            let path = path.as_ref();
            (path.to_path_buf(), analyze_with(path, config))
        })
        .collect()
}

/// Analyze every file under `root` whose extension is in
/// `config.probe.extensions` (all files when the list is empty).
pub fn analyze_dir(root: impl AsRef<Path>, config: &Config) -> Vec<(PathBuf, Result<MediaInfo, ProbeError>)> {
    let root = root.as_ref();
    let paths: Vec<PathBuf> = WalkDir::new(root)
        .follow_links(true)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::warn!(error = %e, "Skipping unreadable directory entry");
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| wanted(path, &config.probe.extensions))
        .collect();

    tracing::info!(root = %root.display(), files = paths.len(), "Analyzing directory");
    analyze_all(&paths, config)
}

fn wanted(path: &Path, extensions: &[String]) -> bool {
    if extensions.is_empty() {
        return true;
    }
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .is_some_and(|e| extensions.iter().any(|x| *x == e))
}

/// Query every stream of an open session into the typed model.
pub fn read_media_info(session: &mut ProbeSession) -> Result<MediaInfo, ProbeError> {
    let mut info = MediaInfo {
        file: session.path().to_path_buf(),
        ..Default::default()
    };

    if session.count(StreamKind::General)? > 0 {
        let mut q = Query::new(session, StreamKind::General, 0);
        info.general = GeneralInfo {
            format: q.text("Format")?,
            format_profile: q.text("Format_Profile")?,
            codec_id: q.text("CodecID")?,
            codec_id_compatible: q.text("CodecID_Compatible")?,
            video_count: q.uint("VideoCount")?,
            audio_count: q.uint("AudioCount")?,
            file_size: q.uint("FileSize")?,
            duration_ms: q.float("Duration")?,
            overall_bit_rate: q.uint("OverallBitRate")?,
            frame_rate: q.float("FrameRate")?,
            frame_count: q.uint("FrameCount")?,
            stream_size: q.uint("StreamSize")?,
            header_size: q.uint("HeaderSize")?,
            data_size: q.uint("DataSize")?,
            footer_size: q.uint("FooterSize")?,
            title: q.text("Title")?,
            encoded_date: q.date("Encoded_Date")?,
            tagged_date: q.date("Tagged_Date")?,
            file_modified_date: q.date("File_Modified_Date")?,
            file_modified_date_local: q
                .text("File_Modified_Date_Local")?
                .and_then(|s| NaiveDateTime::parse_from_str(&s, LOCAL_DATE_FORMAT).ok()),
            encoded_application: q.text("Encoded_Application")?,
            encoded_library: q.text("Encoded_Library")?,
            is_streamable: q.boolean("IsStreamable")?,
            extras: Extras::new(),
        };
        info.general.extras = q.into_extras();
    }

    for index in 0..session.count(StreamKind::Video)? {
        info.video_tracks.push(video_track(session, index)?);
    }
    for index in 0..session.count(StreamKind::Audio)? {
        info.audio_tracks.push(audio_track(session, index)?);
    }
    for index in 0..session.count(StreamKind::Text)? {
        let mut q = Query::new(session, StreamKind::Text, index);
        info.text_tracks.push(TextTrack {
            index,
            id: q.uint("ID")?,
            format: q.text("Format")?,
            codec_id: q.text("CodecID")?,
            language: q.text("Language")?,
            title: q.text("Title")?,
            default: q.boolean("Default")?,
            forced: q.boolean("Forced")?,
        });
    }
    for index in 0..session.count(StreamKind::Other)? {
        let mut q = Query::new(session, StreamKind::Other, index);
        if q.text("Type")?.as_deref() != Some("Time code") {
            continue;
        }
        info.timecode_tracks.push(TimecodeTrack {
            index,
            format: q.text("Format")?,
            frame_rate: q.float("FrameRate")?,
            settings: q.text("TimeCode_Settings")?,
        });
    }

    tracing::debug!(
        file = %info.file.display(),
        video = info.video_tracks.len(),
        audio = info.audio_tracks.len(),
        text = info.text_tracks.len(),
        "Built media info"
    );
    Ok(info)
}

fn video_track(session: &mut ProbeSession, index: usize) -> Result<VideoTrack, ProbeError> {
    let mut q = Query::new(session, StreamKind::Video, index);
    let format = q.text("Format")?;
    let format_profile = q.text("Format_Profile")?;
    let transfer = q.text("transfer_characteristics")?;
    let bit_depth = prores_bit_depth(format.as_deref(), format_profile.as_deref())
        .or(q.uint("BitDepth")?.and_then(|b| u8::try_from(b).ok()));

    Ok(VideoTrack {
        index,
        stream_order: q.uint("StreamOrder")?,
        id: q.uint("ID")?,
        codec_id: q.text("CodecID")?,
        width: q.uint("Width")?,
        height: q.uint("Height")?,
        pixel_aspect_ratio: q.float("PixelAspectRatio")?,
        display_aspect_ratio: q.float("DisplayAspectRatio")?,
        frame_rate: q.float("FrameRate")?,
        frame_rate_mode: q.text("FrameRate_Mode")?,
        frame_count: q.uint("FrameCount")?,
        bit_depth,
        chroma_subsampling: q.text("ChromaSubsampling")?,
        color_primaries: q.text("colour_primaries")?,
        hdr_format: transfer.as_deref().map(HdrFormat::from_transfer),
        transfer_characteristics: transfer,
        matrix_coefficients: q.text("matrix_coefficients")?,
        duration_ms: q.float("Duration")?,
        bit_rate: q.uint("BitRate")?,
        stream_size: q.uint("StreamSize")?,
        language: q.text("Language")?,
        title: q.text("Title")?,
        default: q.boolean("Default")?,
        encoded_date: q.date("Encoded_Date")?,
        tagged_date: q.date("Tagged_Date")?,
        format,
        format_profile,
        extras: q.into_extras(),
    })
}

fn audio_track(session: &mut ProbeSession, index: usize) -> Result<AudioTrack, ProbeError> {
    let mut q = Query::new(session, StreamKind::Audio, index);
    Ok(AudioTrack {
        index,
        stream_order: q.uint("StreamOrder")?,
        id: q.uint("ID")?,
        format: q.text("Format")?,
        format_profile: q.text("Format_Profile")?,
        codec_id: q.text("CodecID")?,
        channels: q.uint("Channels")?.and_then(|c| u8::try_from(c).ok()),
        sampling_rate: q.uint("SamplingRate")?.and_then(|r| u32::try_from(r).ok()),
        sampling_count: q.uint("SamplingCount")?,
        bit_depth: q.uint("BitDepth")?.and_then(|b| u8::try_from(b).ok()),
        duration_ms: q.float("Duration")?,
        bit_rate: q.uint("BitRate")?,
        bit_rate_maximum: q.uint("BitRate_Maximum")?,
        stream_size: q.uint("StreamSize")?,
        language: q.text("Language")?,
        title: q.text("Title")?,
        default: q.boolean("Default")?,
        forced: q.boolean("Forced")?,
        encoded_date: q.date("Encoded_Date")?,
        tagged_date: q.date("Tagged_Date")?,
        extras: q.into_extras(),
    })
}

/// ProRes carries its bit depth in the profile, not in the sample entry.
fn prores_bit_depth(format: Option<&str>, profile: Option<&str>) -> Option<u8> {
    if format != Some("ProRes") {
        return None;
    }
    match profile? {
        "4444" | "4444 XQ" => Some(12),
        "422 HQ" | "422" | "LT" | "Proxy" => Some(10),
        _ => None,
    }
}

/// Typed parameter reads against one stream. The extras of every parameter
/// found are collected along the way.
struct Query<'a> {
    session: &'a mut ProbeSession,
    kind: StreamKind,
    index: usize,
    extras: Extras,
}

impl<'a> Query<'a> {
    fn new(session: &'a mut ProbeSession, kind: StreamKind, index: usize) -> Self {
        Self {
            session,
            kind,
            index,
            extras: Extras::new(),
        }
    }

    fn into_extras(self) -> Extras {
        self.extras
    }

    fn value(&mut self, param: &str) -> Result<Option<Value>, ProbeError> {
        let value = self.session.value(self.kind, self.index, param)?;
        if value.is_some() {
            let extra = Extra {
                measure: self.info(param, InfoKind::Measure)?,
                name_text: self.info(param, InfoKind::NameText)?,
                info: self.info(param, InfoKind::Info)?,
            };
            if !extra.is_empty() {
                self.extras.insert(param.to_string(), extra);
            }
        }
        Ok(value)
    }

    fn info(&mut self, param: &str, kind: InfoKind) -> Result<Option<String>, ProbeError> {
        self.session.get_info(self.kind, self.index, param, kind)
    }

    fn date(&mut self, param: &str) -> Result<Option<DateTime<Utc>>, ProbeError> {
        Ok(self.value(param)?.and_then(|v| v.as_date()))
    }

    fn text(&mut self, param: &str) -> Result<Option<String>, ProbeError> {
        Ok(self.value(param)?.map(|v| v.to_string()))
    }

    fn uint(&mut self, param: &str) -> Result<Option<u64>, ProbeError> {
        Ok(self.value(param)?.and_then(|v| v.as_u64()))
    }

    fn float(&mut self, param: &str) -> Result<Option<f64>, ProbeError> {
        Ok(self.value(param)?.and_then(|v| v.as_f64()))
    }

    fn boolean(&mut self, param: &str) -> Result<Option<bool>, ProbeError> {
        Ok(self.value(param)?.and_then(|v| v.as_bool()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prores_bit_depth() {
        assert_eq!(prores_bit_depth(Some("ProRes"), Some("4444")), Some(12));
        assert_eq!(prores_bit_depth(Some("ProRes"), Some("4444 XQ")), Some(12));
        assert_eq!(prores_bit_depth(Some("ProRes"), Some("422 HQ")), Some(10));
        assert_eq!(prores_bit_depth(Some("AVC"), Some("4444")), None);
        assert_eq!(prores_bit_depth(Some("ProRes"), None), None);
    }

    #[test]
    fn test_extension_filter() {
        let exts = vec!["mkv".to_string(), "mp4".to_string()];
        assert!(wanted(Path::new("/a/b.MKV"), &exts));
        assert!(!wanted(Path::new("/a/b.txt"), &exts));
        assert!(!wanted(Path::new("/a/noext"), &exts));
        assert!(wanted(Path::new("/a/noext"), &[]));
    }
}
