//! Bounded, cancellable access to the bytes of a container.

use std::fmt::Display;
use std::io::{Read, Seek, SeekFrom};

use bytes::Bytes;

use crate::error::{Error, Result};
use crate::liveness::Liveness;

/// Maximum record size copied into memory (64 MB) to prevent OOM on malformed files.
pub const MAX_RECORD_SIZE: u64 = 64 * 1024 * 1024;

/// Object-safe `Read + Seek`.
pub trait ReadSeek: Read + Seek {}

impl<T: Read + Seek + ?Sized> ReadSeek for T {}

/// The byte source a [`ContainerReader`](crate::ContainerReader) walks.
///
/// Every header read checks the session's [`Liveness`] first and maps an
/// early end of file to [`Error::Truncated`].
pub struct RecordSource<'a> {
    reader: &'a mut dyn ReadSeek,
    len: u64,
    liveness: &'a Liveness,
}

impl<'a> RecordSource<'a> {
    /// Wrap a reader of known total length.
    pub fn new(reader: &'a mut dyn ReadSeek, len: u64, liveness: &'a Liveness) -> Self {
        Self {
            reader,
            len,
            liveness,
        }
    }

    /// Total length of the source in bytes.
    pub fn len(&self) -> u64 {
        self.len
    }

    /// Whether the source is empty.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Read exactly `buf.len()` bytes of header at `pos`.
    pub fn read_header(&mut self, pos: u64, buf: &mut [u8], record: impl Display) -> Result<()> {
        self.liveness.ensure_alive()?;
        self.reader.seek(SeekFrom::Start(pos))?;
        self.reader
            .read_exact(buf)
            .map_err(|e| Error::from_read(e, record))
    }

    /// Read up to `buf.len()` bytes at `pos`, returning how many were read.
    ///
    /// Used for variable-length headers (EBML) where the header may legally
    /// be shorter than the scratch buffer.
    pub fn read_header_prefix(&mut self, pos: u64, buf: &mut [u8]) -> Result<usize> {
        self.liveness.ensure_alive()?;
        let available = self.len.saturating_sub(pos).min(buf.len() as u64) as usize;
        if available == 0 {
            return Ok(0);
        }
        self.reader.seek(SeekFrom::Start(pos))?;
        self.reader
            .read_exact(&mut buf[..available])
            .map_err(|e| Error::from_read(e, "header"))?;
        Ok(available)
    }

    /// Copy `len` bytes at `pos` into an owned buffer.
    pub fn read_bytes(&mut self, pos: u64, len: u64, record: impl Display) -> Result<Bytes> {
        if len > MAX_RECORD_SIZE {
            return Err(Error::invalid(format!(
                "record {} data size {} exceeds maximum {}",
                record, len, MAX_RECORD_SIZE
            )));
        }
        self.liveness.ensure_alive()?;
        self.reader.seek(SeekFrom::Start(pos))?;
        let mut data = vec![0u8; len as usize];
        self.reader
            .read_exact(&mut data)
            .map_err(|e| Error::from_read(e, record))?;
        Ok(Bytes::from(data))
    }

    /// Copy at most `limit` bytes of a record's payload.
    pub fn read_head(&mut self, pos: u64, len: u64, limit: u64, record: impl Display) -> Result<Bytes> {
        self.read_bytes(pos, len.min(limit), record)
    }
}

/// Check that a record of `declared` bytes starting at `pos` fits before `end`.
pub fn check_extent(record: impl Display, pos: u64, declared: u64, end: u64) -> Result<()> {
    let remaining = end.saturating_sub(pos);
    if declared > remaining {
        return Err(Error::overrun(record, declared, remaining));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_read_header_truncated() {
        let mut cursor = Cursor::new(vec![1u8, 2, 3]);
        let live = Liveness::new();
        let mut src = RecordSource::new(&mut cursor, 3, &live);

        let mut buf = [0u8; 8];
        let err = src.read_header(0, &mut buf, "moov").unwrap_err();
        assert!(matches!(err, Error::Truncated(_)));
    }

    #[test]
    fn test_read_header_prefix_stops_at_end() {
        let mut cursor = Cursor::new(vec![9u8; 5]);
        let live = Liveness::new();
        let mut src = RecordSource::new(&mut cursor, 5, &live);

        let mut buf = [0u8; 12];
        assert_eq!(src.read_header_prefix(2, &mut buf).unwrap(), 3);
        assert_eq!(src.read_header_prefix(5, &mut buf).unwrap(), 0);
    }

    #[test]
    fn test_cancelled_source_refuses_reads() {
        let mut cursor = Cursor::new(vec![0u8; 16]);
        let live = Liveness::new();
        live.kill();
        let mut src = RecordSource::new(&mut cursor, 16, &live);

        let mut buf = [0u8; 8];
        assert!(matches!(
            src.read_header(0, &mut buf, "ftyp"),
            Err(Error::Cancelled)
        ));
        assert!(matches!(src.read_bytes(0, 4, "ftyp"), Err(Error::Cancelled)));
    }

    #[test]
    fn test_oversized_record_rejected() {
        let mut cursor = Cursor::new(Vec::new());
        let live = Liveness::new();
        let mut src = RecordSource::new(&mut cursor, 0, &live);
        let err = src.read_bytes(0, MAX_RECORD_SIZE + 1, "stsd").unwrap_err();
        assert!(err.is_malformed());
    }

    #[test]
    fn test_check_extent() {
        assert!(check_extent("trak", 10, 90, 100).is_ok());
        let err = check_extent("trak", 10, 91, 100).unwrap_err();
        assert!(matches!(
            err,
            Error::RecordOverrun {
                declared: 91,
                remaining: 90,
                ..
            }
        ));
    }
}
