//! Container formats and the reader interface each one implements.

use std::fmt;
use std::io::SeekFrom;

use tracing::debug;

use crate::descriptor::ParsedContainer;
use crate::error::{Error, Result};
use crate::flac::FlacReader;
use crate::liveness::Liveness;
use crate::mkv::MatroskaReader;
use crate::mp4::Mp4Reader;
use crate::riff::{AviReader, WaveReader};
use crate::source::{ReadSeek, RecordSource};

/// A recognised container format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContainerFormat {
    Mp4,
    Matroska,
    WebM,
    Wave,
    Avi,
    Flac,
}

impl ContainerFormat {
    /// Display name, as reported by the general stream's `Format` parameter.
    pub fn name(self) -> &'static str {
        match self {
            ContainerFormat::Mp4 => "MPEG-4",
            ContainerFormat::Matroska => "Matroska",
            ContainerFormat::WebM => "WebM",
            ContainerFormat::Wave => "Wave",
            ContainerFormat::Avi => "AVI",
            ContainerFormat::Flac => "FLAC",
        }
    }

    /// The structural reader for this format.
    pub fn reader(self) -> &'static dyn ContainerReader {
        match self {
            ContainerFormat::Mp4 => &Mp4Reader,
            ContainerFormat::Matroska | ContainerFormat::WebM => &MatroskaReader,
            ContainerFormat::Wave => &WaveReader,
            ContainerFormat::Avi => &AviReader,
            ContainerFormat::Flac => &FlacReader,
        }
    }

    /// Guess a format from a file extension. Used only as a hint in logs;
    /// identification always goes through the signature table.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "mp4" | "m4v" | "m4a" | "mov" | "3gp" => Some(ContainerFormat::Mp4),
            "mkv" | "mka" | "mks" => Some(ContainerFormat::Matroska),
            "webm" => Some(ContainerFormat::WebM),
            "wav" => Some(ContainerFormat::Wave),
            "avi" => Some(ContainerFormat::Avi),
            "flac" => Some(ContainerFormat::Flac),
            _ => None,
        }
    }
}

impl fmt::Display for ContainerFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Walks the structural records of one container format.
///
/// Implementations push descriptors into `out` as they complete, so on error
/// `out` still holds every stream located before the failure.
pub trait ContainerReader: Send + Sync {
    /// Reader name for logging.
    fn name(&self) -> &'static str;

    /// Walk `src` and fill `out`.
    fn read(&self, src: &mut RecordSource<'_>, out: &mut ParsedContainer) -> Result<()>;
}

fn source_len(reader: &mut dyn ReadSeek) -> Result<u64> {
    let len = reader.seek(SeekFrom::End(0))?;
    reader.seek(SeekFrom::Start(0))?;
    Ok(len)
}

/// Walk a container of a known format, failing on the first structural error.
pub fn read_container(
    format: ContainerFormat,
    reader: &mut dyn ReadSeek,
    liveness: &Liveness,
) -> Result<ParsedContainer> {
    match read_container_lenient(format, reader, liveness)? {
        (parsed, None) => Ok(parsed),
        (_, Some(err)) => Err(err),
    }
}

/// Walk a container of a known format, keeping every stream located before
/// a structural error.
///
/// The outer `Result` fails only when the source length cannot be
/// determined; walk errors come back alongside the partial result.
pub fn read_container_lenient(
    format: ContainerFormat,
    reader: &mut dyn ReadSeek,
    liveness: &Liveness,
) -> Result<(ParsedContainer, Option<Error>)> {
    let len = source_len(reader)?;
    let mut out = ParsedContainer::new(format, len);
    let walker = format.reader();
    debug!(format = %format, reader = walker.name(), size = len, "Walking container");

    let mut src = RecordSource::new(reader, len, liveness);
    let err = walker.read(&mut src, &mut out).err();
    if let Some(ref e) = err {
        debug!(
            format = %format,
            streams = out.streams().len(),
            error = %e,
            "Container walk stopped early"
        );
    }
    Ok((out, err))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_names() {
        assert_eq!(ContainerFormat::Mp4.to_string(), "MPEG-4");
        assert_eq!(ContainerFormat::Wave.name(), "Wave");
        assert_eq!(ContainerFormat::WebM.reader().name(), "matroska");
    }

    #[test]
    fn test_from_extension() {
        assert_eq!(ContainerFormat::from_extension("MKV"), Some(ContainerFormat::Matroska));
        assert_eq!(ContainerFormat::from_extension("m4a"), Some(ContainerFormat::Mp4));
        assert_eq!(ContainerFormat::from_extension("txt"), None);
    }
}
