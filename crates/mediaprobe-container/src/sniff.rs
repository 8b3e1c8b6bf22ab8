//! Container identification from leading bytes.
//!
//! Identification never looks at the file extension. The signature table is
//! ordered; when several signatures match, the one whose patterns cover the
//! most bytes wins, so `RIFF....WAVE` beats a bare `RIFF` and an EBML header
//! declaring `webm` beats the plain EBML magic.

use std::io::{Read, Seek, SeekFrom};

use tracing::debug;

use crate::format::ContainerFormat;

/// Default number of leading bytes inspected (64 KiB).
pub const DEFAULT_SNIFF_LIMIT: u64 = 64 * 1024;

/// EBML magic number.
const EBML_MAGIC: &[u8] = &[0x1A, 0x45, 0xDF, 0xA3];

/// `DocType` element (0x4282) with a 1-byte size of 4, followed by "webm".
const WEBM_DOCTYPE: &[u8] = &[0x42, 0x82, 0x84, b'w', b'e', b'b', b'm'];

/// One byte pattern in a signature.
#[derive(Debug, Clone, Copy)]
pub enum Pattern {
    /// Bytes at an exact offset.
    At(usize, &'static [u8]),
    /// Bytes anywhere within the first `limit` bytes.
    Within(usize, &'static [u8]),
}

impl Pattern {
    fn matches(&self, data: &[u8]) -> bool {
        match *self {
            Pattern::At(offset, magic) => data
                .get(offset..offset + magic.len())
                .is_some_and(|window| window == magic),
            Pattern::Within(limit, magic) => {
                let end = data.len().min(limit);
                data[..end].windows(magic.len()).any(|w| w == magic)
            }
        }
    }

    fn len(&self) -> usize {
        match self {
            Pattern::At(_, magic) | Pattern::Within(_, magic) => magic.len(),
        }
    }
}

/// A container signature: every pattern must match.
#[derive(Debug, Clone, Copy)]
pub struct Signature {
    pub format: ContainerFormat,
    pub patterns: &'static [Pattern],
}

impl Signature {
    fn matches(&self, data: &[u8]) -> bool {
        self.patterns.iter().all(|p| p.matches(data))
    }

    fn specificity(&self) -> usize {
        self.patterns.iter().map(Pattern::len).sum()
    }
}

/// The ordered signature table.
pub const SIGNATURES: &[Signature] = &[
    Signature {
        format: ContainerFormat::WebM,
        patterns: &[Pattern::At(0, EBML_MAGIC), Pattern::Within(64, WEBM_DOCTYPE)],
    },
    Signature {
        format: ContainerFormat::Matroska,
        patterns: &[Pattern::At(0, EBML_MAGIC)],
    },
    Signature {
        format: ContainerFormat::Wave,
        patterns: &[Pattern::At(0, b"RIFF"), Pattern::At(8, b"WAVE")],
    },
    Signature {
        format: ContainerFormat::Avi,
        patterns: &[Pattern::At(0, b"RIFF"), Pattern::At(8, b"AVI ")],
    },
    Signature {
        format: ContainerFormat::Mp4,
        patterns: &[Pattern::At(4, b"ftyp")],
    },
    Signature {
        format: ContainerFormat::Mp4,
        patterns: &[Pattern::At(4, b"moov")],
    },
    Signature {
        format: ContainerFormat::Mp4,
        patterns: &[Pattern::At(4, b"mdat")],
    },
    Signature {
        format: ContainerFormat::Mp4,
        patterns: &[Pattern::At(4, b"free")],
    },
    Signature {
        format: ContainerFormat::Mp4,
        patterns: &[Pattern::At(4, b"wide")],
    },
    Signature {
        format: ContainerFormat::Mp4,
        patterns: &[Pattern::At(4, b"skip")],
    },
    Signature {
        format: ContainerFormat::Flac,
        patterns: &[Pattern::At(0, b"fLaC")],
    },
];

/// Shortest prefix on which every signature in [`SIGNATURES`] can be judged.
pub const SIGNATURE_WINDOW: u64 = signature_window(SIGNATURES);

const fn signature_window(signatures: &[Signature]) -> u64 {
    let mut max = 0;
    let mut i = 0;
    while i < signatures.len() {
        let patterns = signatures[i].patterns;
        let mut j = 0;
        while j < patterns.len() {
            let end = match patterns[j] {
                Pattern::At(offset, magic) => offset + magic.len(),
                Pattern::Within(limit, _) => limit,
            };
            if end > max {
                max = end;
            }
            j += 1;
        }
        i += 1;
    }
    max as u64
}

/// Identify a container from its leading bytes.
///
/// Returns `None` when no signature matches. That is a valid answer, not an
/// error.
pub fn identify(data: &[u8]) -> Option<ContainerFormat> {
    let mut best: Option<&Signature> = None;
    for sig in SIGNATURES.iter().filter(|s| s.matches(data)) {
        match best {
            Some(b) if b.specificity() >= sig.specificity() => {}
            _ => best = Some(sig),
        }
    }
    best.map(|s| s.format)
}

/// Read at most `limit` leading bytes of `reader` and identify them.
///
/// The reader is rewound to the start afterwards.
pub fn sniff<R: Read + Seek + ?Sized>(reader: &mut R, limit: u64) -> std::io::Result<Option<ContainerFormat>> {
    reader.seek(SeekFrom::Start(0))?;
    let mut prefix = Vec::with_capacity(limit.min(DEFAULT_SNIFF_LIMIT) as usize);
    Read::take(&mut *reader, limit).read_to_end(&mut prefix)?;
    reader.seek(SeekFrom::Start(0))?;

    let format = identify(&prefix);
    debug!(bytes = prefix.len(), format = ?format, "Sniffed container");
    Ok(format)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_identify_mp4() {
        let data = [0x00, 0x00, 0x00, 0x20, b'f', b't', b'y', b'p', b'i', b's', b'o', b'm'];
        assert_eq!(identify(&data), Some(ContainerFormat::Mp4));

        let data = [0x00, 0x00, 0x00, 0x08, b'm', b'o', b'o', b'v'];
        assert_eq!(identify(&data), Some(ContainerFormat::Mp4));
    }

    #[test]
    fn test_identify_riff_forms() {
        assert_eq!(identify(b"RIFF\x24\x00\x00\x00WAVEfmt "), Some(ContainerFormat::Wave));
        assert_eq!(identify(b"RIFF\x24\x00\x00\x00AVI LIST"), Some(ContainerFormat::Avi));
        // RIFF with an unknown form type is not claimed by anyone.
        assert_eq!(identify(b"RIFF\x24\x00\x00\x00RMID"), None);
    }

    #[test]
    fn test_webm_beats_matroska() {
        let mut data = vec![0x1A, 0x45, 0xDF, 0xA3, 0x9F];
        data.extend_from_slice(&[0x42, 0x86, 0x81, 0x01]);
        data.extend_from_slice(WEBM_DOCTYPE);
        assert_eq!(identify(&data), Some(ContainerFormat::WebM));

        let mut data = vec![0x1A, 0x45, 0xDF, 0xA3, 0x9F];
        data.extend_from_slice(&[0x42, 0x82, 0x88]);
        data.extend_from_slice(b"matroska");
        assert_eq!(identify(&data), Some(ContainerFormat::Matroska));
    }

    #[test]
    fn test_identify_flac() {
        assert_eq!(identify(b"fLaC\x00\x00\x00\x22"), Some(ContainerFormat::Flac));
    }

    #[test]
    fn test_identify_unknown() {
        assert_eq!(identify(b""), None);
        assert_eq!(identify(b"hello world, plain text"), None);
        assert_eq!(identify(&[0x00, 0x00]), None);
    }

    #[test]
    fn test_signature_window_covers_webm() {
        assert_eq!(SIGNATURE_WINDOW, 64);

        let mut data = vec![0x1A, 0x45, 0xDF, 0xA3, 0xA3];
        data.extend_from_slice(&[0xEC, 0xA0]);
        data.extend_from_slice(&[0; 32]);
        data.extend_from_slice(WEBM_DOCTYPE);
        assert!(data.len() as u64 <= SIGNATURE_WINDOW);
        assert_eq!(identify(&data[..16]), Some(ContainerFormat::Matroska));
        assert_eq!(identify(&data), Some(ContainerFormat::WebM));
    }

    #[test]
    fn test_sniff_through_trait_object() {
        trait Source: Read + Seek {}
        impl<T: Read + Seek> Source for T {}

        let mut boxed: Box<dyn Source> = Box::new(Cursor::new(b"fLaC\x00\x00\x00\x22".to_vec()));
        assert_eq!(sniff(&mut *boxed, DEFAULT_SNIFF_LIMIT).unwrap(), Some(ContainerFormat::Flac));
    }

    #[test]
    fn test_sniff_respects_limit_and_rewinds() {
        let mut cursor = Cursor::new(b"RIFF\x24\x00\x00\x00WAVEfmt ".to_vec());
        assert_eq!(sniff(&mut cursor, 8).unwrap(), None);
        assert_eq!(cursor.position(), 0);
        assert_eq!(sniff(&mut cursor, DEFAULT_SNIFF_LIMIT).unwrap(), Some(ContainerFormat::Wave));
        assert_eq!(cursor.position(), 0);
    }
}
