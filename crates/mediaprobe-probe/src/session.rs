//! Probe Session: one open file, parsed lazily, queried by stream kind,
//! index and parameter name.
//!
//! ```text
//! Closed --open--> Open --first query--> Parsed --close--> Closed
//!                    |                                        ^
//!                    +--------------- close / cancel ---------+
//! ```
//!
//! Parsing happens on the first query rather than in `open`, so opening is
//! cheap and a session that is closed without being queried never touches
//! the container.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use chrono::{DateTime, Local, Utc};
use mediaprobe_container::{
    read_container_lenient, sniff, ContainerFormat, Liveness, StreamDescriptor, StreamKind,
};
use tracing::{debug, info, warn};

use crate::error::{ProbeError, Result};
use crate::extract::{bit_rate, extract, ParameterMap, Params};
use crate::options::SessionOptions;
use crate::params::{self, InfoKind};
use crate::value::Value;

/// Lifecycle state of a [`ProbeSession`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// File open, container not parsed yet.
    Open,
    /// Container parsed; queries are answered from the descriptors.
    Parsed,
    /// File and descriptors released.
    Closed,
}

/// Cancels a session from another thread.
///
/// An in-flight parse stops at its next structural record read and the
/// session then behaves as closed.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    liveness: Liveness,
}

impl CancelHandle {
    pub fn cancel(&self) {
        debug!("Probe session cancelled");
        self.liveness.kill();
    }

    pub fn is_cancelled(&self) -> bool {
        !self.liveness.is_alive()
    }
}

/// Filesystem facts reported on the general stream.
#[derive(Debug, Clone)]
struct FileInfo {
    path: PathBuf,
    size: u64,
    modified: Option<DateTime<Utc>>,
}

/// A located stream and its lazily decoded parameters.
#[derive(Debug)]
struct Stream {
    descriptor: StreamDescriptor,
    params: OnceLock<ParameterMap>,
}

impl Stream {
    fn new(descriptor: StreamDescriptor) -> Self {
        Self {
            descriptor,
            params: OnceLock::new(),
        }
    }
}

#[derive(Debug)]
struct Parsed {
    format: Option<ContainerFormat>,
    /// General stream first, when the format was recognised.
    streams: Vec<Stream>,
    /// Strict-mode failure replayed on every query.
    failure: Option<ProbeError>,
}

impl Parsed {
    fn failed(format: Option<ContainerFormat>, failure: Option<ProbeError>) -> Self {
        Self {
            format,
            streams: Vec::new(),
            failure,
        }
    }

    fn count(&self, kind: StreamKind) -> usize {
        self.streams
            .iter()
            .filter(|s| s.descriptor.kind == kind)
            .count()
    }

    fn stream(&self, kind: StreamKind, index: usize) -> Option<&Stream> {
        self.streams
            .iter()
            .find(|s| s.descriptor.kind == kind && s.descriptor.index == index)
    }

    fn params(&self, kind: StreamKind, index: usize, file: &FileInfo) -> Option<&ParameterMap> {
        let stream = self.stream(kind, index)?;
        Some(stream.params.get_or_init(|| {
            let map = extract(&stream.descriptor);
            if kind == StreamKind::General {
                self.augment_general(map, file)
            } else {
                map
            }
        }))
    }

    /// Add file facts, stream counts and derived totals to the general map.
    fn augment_general(&self, map: ParameterMap, file: &FileInfo) -> ParameterMap {
        let mut params = Params::from_map(map);
        params.fill("Format", self.format.map(ContainerFormat::name));

        params.set("CompleteName", file.path.display().to_string());
        params.set_opt(
            "FileName",
            file.path.file_stem().map(|s| s.to_string_lossy().into_owned()),
        );
        params.set_opt(
            "FileExtension",
            file.path.extension().map(|s| s.to_string_lossy().into_owned()),
        );
        params.set("FileSize", file.size);
        if let Some(modified) = file.modified {
            params.set("File_Modified_Date", modified);
            let local = modified.with_timezone(&Local);
            params.set("File_Modified_Date_Local", local.format("%Y-%m-%d %H:%M:%S").to_string());
        }

        for (kind, name) in [
            (StreamKind::Video, "VideoCount"),
            (StreamKind::Audio, "AudioCount"),
            (StreamKind::Text, "TextCount"),
            (StreamKind::Other, "OtherCount"),
            (StreamKind::Image, "ImageCount"),
            (StreamKind::Menu, "MenuCount"),
        ] {
            let count = self.count(kind);
            if count > 0 {
                params.set(name, count);
            }
        }

        if !params.contains("Duration") {
            let longest = self
                .streams
                .iter()
                .filter(|s| s.descriptor.kind != StreamKind::General)
                .filter_map(|s| self.params(s.descriptor.kind, s.descriptor.index, file))
                .filter_map(|m| m.get("Duration").and_then(Value::as_f64))
                .fold(None, |max: Option<f64>, d| Some(max.map_or(d, |m| m.max(d))));
            params.set_opt("Duration", longest);
        }
        if let Some(video) = self.params(StreamKind::Video, 0, file) {
            params.fill("FrameRate", video.get("FrameRate").cloned());
            params.fill("FrameCount", video.get("FrameCount").cloned());
        }
        if !params.contains("StreamSize") {
            let sizes: Vec<u64> = self
                .streams
                .iter()
                .filter(|s| s.descriptor.kind != StreamKind::General)
                .filter_map(|s| self.params(s.descriptor.kind, s.descriptor.index, file))
                .filter_map(|m| m.get("StreamSize").and_then(Value::as_u64))
                .collect();
            if !sizes.is_empty() {
                params.set("StreamSize", file.size.saturating_sub(sizes.iter().sum()));
            }
        }
        if !params.contains("OverallBitRate") {
            let duration = params.get("Duration").and_then(Value::as_f64);
            params.set_opt("OverallBitRate", duration.and_then(|ms| bit_rate(file.size, ms)));
        }

        let header = params.get("HeaderSize").and_then(Value::as_u64);
        let data = params.get("DataSize").and_then(Value::as_u64);
        if let (Some(header), Some(data)) = (header, data) {
            params.set("FooterSize", file.size.saturating_sub(header + data));
        }

        params.into_map()
    }
}

enum Inner {
    Open(BufReader<File>),
    Parsed {
        // Released on close.
        _file: BufReader<File>,
        parsed: Parsed,
    },
    Closed,
}

/// A metadata query session over one file.
///
/// # Example
///
/// ```no_run
/// use mediaprobe_probe::{ProbeSession, StreamKind};
///
/// let mut session = ProbeSession::open("sample.mp4").unwrap();
/// assert_eq!(session.count(StreamKind::Video).unwrap(), 1);
/// let duration = session.get(StreamKind::Video, 0, "Duration").unwrap();
/// println!("{:?}", duration);
/// ```
pub struct ProbeSession {
    file: FileInfo,
    options: SessionOptions,
    liveness: Liveness,
    inner: Inner,
}

impl ProbeSession {
    /// Open `path` with default options.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with(path, SessionOptions::default())
    }

    /// Open `path`.
    ///
    /// Fails with [`ProbeError::FileNotFound`] or
    /// [`ProbeError::PermissionDenied`]; the container is not read yet.
    pub fn open_with(path: impl AsRef<Path>, options: SessionOptions) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| ProbeError::from_open(e, path))?;
        let metadata = file.metadata()?;
        let modified = metadata.modified().ok().map(DateTime::<Utc>::from);

        info!(
            path = %path.display(),
            size = metadata.len(),
            strict = options.strict,
            "Opened probe session"
        );

        Ok(Self {
            file: FileInfo {
                path: path.to_path_buf(),
                size: metadata.len(),
                modified,
            },
            options,
            liveness: Liveness::new(),
            inner: Inner::Open(BufReader::new(file)),
        })
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        match self.inner {
            Inner::Open(_) => SessionState::Open,
            Inner::Parsed { .. } => SessionState::Parsed,
            Inner::Closed => SessionState::Closed,
        }
    }

    pub fn path(&self) -> &Path {
        &self.file.path
    }

    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    /// A handle that cancels this session from another thread.
    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle {
            liveness: self.liveness.clone(),
        }
    }

    /// Detected container format; `None` when no signature matched.
    pub fn format(&mut self) -> Result<Option<ContainerFormat>> {
        Ok(self.parsed()?.format)
    }

    /// Number of streams of `kind`.
    ///
    /// An unrecognised file reports zero streams of every kind, including
    /// General.
    pub fn count(&mut self, kind: StreamKind) -> Result<usize> {
        Ok(self.parsed()?.count(kind))
    }

    /// Rendered value of `param` on stream `index` of `kind`.
    ///
    /// `Ok(None)` means "not available": the stream or the parameter does
    /// not exist.
    pub fn get(&mut self, kind: StreamKind, index: usize, param: &str) -> Result<Option<String>> {
        Ok(self.value(kind, index, param)?.map(|v| v.to_string()))
    }

    /// Like [`get`](Self::get), returning the unit of measure or the
    /// parameter name instead of the value when asked to.
    pub fn get_info(
        &mut self,
        kind: StreamKind,
        index: usize,
        param: &str,
        info: InfoKind,
    ) -> Result<Option<String>> {
        let value = self.value(kind, index, param)?;
        Ok(match info {
            InfoKind::Text => value.map(|v| v.to_string()),
            InfoKind::Measure => value.and(params::measure(param)).map(str::to_string),
            InfoKind::Name => value.map(|_| param.to_string()),
            InfoKind::NameText => value.and(params::name_text(param)).map(str::to_string),
            InfoKind::Info => value.and(params::info(param)).map(str::to_string),
        })
    }

    /// Typed value of `param`.
    pub fn value(&mut self, kind: StreamKind, index: usize, param: &str) -> Result<Option<Value>> {
        Ok(self.stream_params(kind, index)?.and_then(|m| m.get(param)).cloned())
    }

    /// Names of the parameters present on a stream, in sorted order.
    pub fn parameters(&mut self, kind: StreamKind, index: usize) -> Result<Vec<&'static str>> {
        Ok(self
            .stream_params(kind, index)?
            .map(|m| m.keys().copied().collect())
            .unwrap_or_default())
    }

    /// Every located stream, general first, in container order.
    pub fn streams(&mut self) -> Result<Vec<&StreamDescriptor>> {
        Ok(self.parsed()?.streams.iter().map(|s| &s.descriptor).collect())
    }

    /// Release the file and every descriptor. Idempotent.
    pub fn close(&mut self) {
        self.liveness.kill();
        if matches!(self.inner, Inner::Closed) {
            return;
        }
        self.inner = Inner::Closed;
        info!(path = %self.file.path.display(), "Closed probe session");
    }

    fn stream_params(&mut self, kind: StreamKind, index: usize) -> Result<Option<&ParameterMap>> {
        self.ensure_parsed()?;
        let parsed = self.current()?;
        Ok(parsed.params(kind, index, &self.file))
    }

    fn parsed(&mut self) -> Result<&Parsed> {
        self.ensure_parsed()?;
        self.current()
    }

    fn current(&self) -> Result<&Parsed> {
        match &self.inner {
            Inner::Parsed { parsed, .. } => match &parsed.failure {
                Some(err) => Err(err.replay()),
                None => Ok(parsed),
            },
            _ => Err(ProbeError::SessionClosed),
        }
    }

    /// Run the parse if it has not happened yet.
    fn ensure_parsed(&mut self) -> Result<()> {
        if !self.liveness.is_alive() {
            self.close();
            return Err(ProbeError::SessionClosed);
        }

        if let Inner::Open(_) = self.inner {
            self.inner = match std::mem::replace(&mut self.inner, Inner::Closed) {
                Inner::Open(mut file) => {
                    match parse(&mut file, &self.file.path, &self.options, &self.liveness) {
                        Ok(parsed) => Inner::Parsed {
                            _file: file,
                            parsed,
                        },
                        Err(err) => {
                            self.close();
                            return Err(err);
                        }
                    }
                }
                other => other,
            };
        }
        Ok(())
    }
}

impl Drop for ProbeSession {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for ProbeSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProbeSession")
            .field("path", &self.file.path)
            .field("state", &self.state())
            .field("options", &self.options)
            .finish()
    }
}

/// Sniff and walk the container.
///
/// Only cancellation is returned as an error; every other failure is either
/// absorbed (lenient) or stored for replay (strict).
fn parse(
    file: &mut BufReader<File>,
    path: &Path,
    options: &SessionOptions,
    liveness: &Liveness,
) -> Result<Parsed> {
    liveness.ensure_alive()?;

    let format = match sniff::sniff(file, options.sniff_limit) {
        Ok(Some(format)) => format,
        Ok(None) => {
            let hint = path
                .extension()
                .and_then(|e| e.to_str())
                .and_then(ContainerFormat::from_extension);
            debug!(path = %path.display(), hint = ?hint, "No container signature matched");
            let failure = options.strict.then_some(ProbeError::UnsupportedFormat);
            return Ok(Parsed::failed(None, failure));
        }
        Err(err) => return Ok(absorb(None, ProbeError::Io(err), path, options)),
    };
    debug!(path = %path.display(), format = %format, "Identified container");

    let (container, walk_error) = match read_container_lenient(format, file, liveness) {
        Ok(result) => result,
        Err(err) => return absorb_container(format, err, path, options),
    };

    if let Some(err) = walk_error {
        let err = ProbeError::from(err);
        if matches!(err, ProbeError::SessionClosed) {
            return Err(err);
        }
        if options.strict {
            return Ok(Parsed::failed(Some(format), Some(err)));
        }
        warn!(
            path = %path.display(),
            format = %format,
            streams = container.streams().len(),
            error = %err,
            "Absorbed malformed container"
        );
    }

    let streams: Vec<Stream> = container
        .into_descriptors()
        .into_iter()
        .map(Stream::new)
        .collect();
    debug!(format = %format, streams = streams.len().saturating_sub(1), "Parsed container");

    Ok(Parsed {
        format: Some(format),
        streams,
        failure: None,
    })
}

fn absorb_container(
    format: ContainerFormat,
    err: mediaprobe_container::Error,
    path: &Path,
    options: &SessionOptions,
) -> Result<Parsed> {
    match ProbeError::from(err) {
        ProbeError::SessionClosed => Err(ProbeError::SessionClosed),
        err => Ok(absorb(Some(format), err, path, options)),
    }
}

fn absorb(
    format: Option<ContainerFormat>,
    err: ProbeError,
    path: &Path,
    options: &SessionOptions,
) -> Parsed {
    if options.strict {
        return Parsed::failed(format, Some(err));
    }
    warn!(path = %path.display(), error = %err, "Probe failed, reporting no streams");
    Parsed::failed(format, None)
}
