//! Parameter vocabulary helpers: info kinds, units of measure and
//! descriptions.

use std::fmt;
use std::str::FromStr;

/// What to return about a parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InfoKind {
    /// The rendered value.
    #[default]
    Text,
    /// The unit of measure, with its leading space (` ms`, ` Hz`, ...).
    Measure,
    /// The parameter name itself.
    Name,
    /// Human-readable parameter name (`Format_Profile` → `Format profile`).
    NameText,
    /// One-line description of the parameter.
    Info,
}

impl fmt::Display for InfoKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InfoKind::Text => write!(f, "Text"),
            InfoKind::Measure => write!(f, "Measure"),
            InfoKind::Name => write!(f, "Name"),
            InfoKind::NameText => write!(f, "Name_Text"),
            InfoKind::Info => write!(f, "Info"),
        }
    }
}

impl FromStr for InfoKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" => Ok(InfoKind::Text),
            "measure" => Ok(InfoKind::Measure),
            "name" => Ok(InfoKind::Name),
            "name_text" | "nametext" => Ok(InfoKind::NameText),
            "info" => Ok(InfoKind::Info),
            _ => Err(format!("Unknown info kind: {}", s)),
        }
    }
}

/// Unit of measure for a parameter, if it has one.
pub fn measure(param: &str) -> Option<&'static str> {
    let unit = match param {
        "Duration" => " ms",
        "BitRate" | "BitRate_Maximum" | "OverallBitRate" => " b/s",
        "SamplingRate" => " Hz",
        "Width" | "Height" => " pixel",
        "FrameRate" => " FPS",
        "FileSize" | "StreamSize" | "HeaderSize" | "DataSize" | "FooterSize" => " byte",
        "BitDepth" => " bit",
        "Channels" => " channel",
        _ => return None,
    };
    Some(unit)
}

/// Human-readable name and description of a parameter.
fn describe(param: &str) -> Option<(&'static str, &'static str)> {
    Some(match param {
        "Format" => ("Format", "Format used"),
        "Format_Profile" => ("Format profile", "Profile of the Format"),
        "Format_Version" => ("Format version", "Version of this format"),
        "Format_Settings_Endianness" => ("Format settings, Endianness", "Byte order of PCM samples"),
        "Format_Settings_Sign" => ("Format settings, Sign", "Signedness of PCM samples"),
        "CodecID" => ("Codec ID", "Codec ID (found in some containers)"),
        "CodecID_Compatible" => ("Codec ID/Compatible", "Compatible brands"),
        "FileSize" => ("File size", "File size in bytes"),
        "StreamSize" => ("Stream size", "Stream size in bytes"),
        "HeaderSize" => ("Header size", "Bytes before the media data"),
        "DataSize" => ("Data size", "Bytes of media data"),
        "FooterSize" => ("Footer size", "Bytes after the media data"),
        "Duration" => ("Duration", "Play time of the stream in ms"),
        "BitRate" => ("Bit rate", "Bit rate in bps"),
        "BitRate_Maximum" => ("Maximum bit rate", "Maximum bit rate in bps"),
        "OverallBitRate" => ("Overall bit rate", "Bit rate of all streams in bps"),
        "IsStreamable" => ("IsStreamable", "Whether the header precedes the media data"),
        "StreamOrder" => ("Stream order", "Position of the stream in the container"),
        "ID" => ("ID", "Stream identifier in the container"),
        "Width" => ("Width", "Width (aperture size if present) in pixel"),
        "Height" => ("Height", "Height in pixel"),
        "PixelAspectRatio" => ("Pixel aspect ratio", "Pixel aspect ratio"),
        "DisplayAspectRatio" => ("Display aspect ratio", "Display aspect ratio"),
        "FrameRate" => ("Frame rate", "Frames per second"),
        "FrameRate_Mode" => ("Frame rate mode", "Frame rate mode (CFR, VFR)"),
        "FrameCount" => ("Frame count", "Number of frames"),
        "BitDepth" => ("Bit depth", "Bits per sample"),
        "ChromaSubsampling" => ("Chroma subsampling", "Chroma subsampling"),
        "Channels" => ("Channel(s)", "Number of channels"),
        "SamplingRate" => ("Sampling rate", "Sampling rate"),
        "SamplingCount" => ("Samples count", "Number of samples"),
        "Language" => ("Language", "Language as stored by the container"),
        "Title" => ("Title", "Name of the track or file"),
        "Default" => ("Default", "Whether the stream is selected by default"),
        "Forced" => ("Forced", "Whether the stream is forced"),
        "Encoded_Date" => ("Encoded date", "UTC time that the encoding of this item was completed"),
        "Tagged_Date" => ("Tagged date", "UTC time that the tags were done for this item"),
        "Encoded_Application" => ("Writing application", "Software used to create the file"),
        "Encoded_Library" => ("Writing library", "Software used to create the stream"),
        "File_Modified_Date" => ("File last modification date", "UTC modification time of the file"),
        "File_Modified_Date_Local" => (
            "File last modification date (local)",
            "Local modification time of the file",
        ),
        "VideoCount" => ("Count of video streams", "Number of video streams"),
        "AudioCount" => ("Count of audio streams", "Number of audio streams"),
        "TextCount" => ("Count of text streams", "Number of text streams"),
        "OtherCount" => ("Count of other streams", "Number of other streams"),
        "MenuCount" => ("Count of menu streams", "Number of menu streams"),
        _ => return None,
    })
}

/// Human-readable name of a parameter, if known.
pub fn name_text(param: &str) -> Option<&'static str> {
    describe(param).map(|(name, _)| name)
}

/// One-line description of a parameter, if known.
pub fn info(param: &str) -> Option<&'static str> {
    describe(param).map(|(_, info)| info)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_measure_units() {
        assert_eq!(measure("Duration"), Some(" ms"));
        assert_eq!(measure("OverallBitRate"), Some(" b/s"));
        assert_eq!(measure("Channels"), Some(" channel"));
        assert_eq!(measure("Format"), None);
    }

    #[test]
    fn test_info_kind_parse() {
        assert_eq!("measure".parse::<InfoKind>().unwrap(), InfoKind::Measure);
        assert_eq!("Name".parse::<InfoKind>().unwrap(), InfoKind::Name);
        assert_eq!("Name_Text".parse::<InfoKind>().unwrap(), InfoKind::NameText);
        assert_eq!("info".parse::<InfoKind>().unwrap(), InfoKind::Info);
        assert_eq!(InfoKind::NameText.to_string(), "Name_Text");
        assert!("options".parse::<InfoKind>().is_err());
    }

    #[test]
    fn test_descriptions() {
        assert_eq!(name_text("Format_Profile"), Some("Format profile"));
        assert_eq!(info("SamplingCount"), Some("Number of samples"));
        assert_eq!(name_text("TimeCode_Settings"), None);
    }
}
