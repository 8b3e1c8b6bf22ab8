//! Range-checked fixed-offset field access.
//!
//! Every reader returns `None` when the field does not fit in the record,
//! so a short record simply loses the parameters it cannot carry.

use bytes::Buf;
use chrono::{DateTime, Utc};

fn at(data: &[u8], offset: usize, len: usize) -> Option<&[u8]> {
    data.get(offset..offset.checked_add(len)?)
}

pub(crate) fn u8_at(data: &[u8], offset: usize) -> Option<u8> {
    data.get(offset).copied()
}

pub(crate) fn be_u16(data: &[u8], offset: usize) -> Option<u16> {
    at(data, offset, 2).map(|mut b| b.get_u16())
}

pub(crate) fn be_u32(data: &[u8], offset: usize) -> Option<u32> {
    at(data, offset, 4).map(|mut b| b.get_u32())
}

pub(crate) fn be_u64(data: &[u8], offset: usize) -> Option<u64> {
    at(data, offset, 8).map(|mut b| b.get_u64())
}

pub(crate) fn be_f64(data: &[u8], offset: usize) -> Option<f64> {
    at(data, offset, 8).map(|mut b| b.get_f64())
}

/// Unsigned 16.16 fixed point.
pub(crate) fn be_fixed32(data: &[u8], offset: usize) -> Option<f64> {
    be_u32(data, offset).map(|v| v as f64 / 65536.0)
}

pub(crate) fn le_u16(data: &[u8], offset: usize) -> Option<u16> {
    at(data, offset, 2).map(|mut b| b.get_u16_le())
}

pub(crate) fn le_u32(data: &[u8], offset: usize) -> Option<u32> {
    at(data, offset, 4).map(|mut b| b.get_u32_le())
}

pub(crate) fn le_i32(data: &[u8], offset: usize) -> Option<i32> {
    at(data, offset, 4).map(|mut b| b.get_i32_le())
}

pub(crate) fn fourcc(data: &[u8], offset: usize) -> Option<[u8; 4]> {
    at(data, offset, 4).and_then(|b| b.try_into().ok())
}

/// A four-character code as text, trailing spaces and NULs dropped.
pub(crate) fn fourcc_str(code: &[u8; 4]) -> String {
    latin1(code).trim_end().to_string()
}

/// Decode ISO-8859-1, stopping at the first NUL.
pub(crate) fn latin1(data: &[u8]) -> String {
    data.iter()
        .take_while(|&&b| b != 0)
        .map(|&b| b as char)
        .collect()
}

/// Decode UTF-8 (lossily), stopping at the first NUL.
pub(crate) fn utf8(data: &[u8]) -> String {
    let end = data.iter().position(|&b| b == 0).unwrap_or(data.len());
    String::from_utf8_lossy(&data[..end]).into_owned()
}

/// A length-prefixed Pascal string inside a fixed-size field.
pub(crate) fn pascal(data: &[u8], offset: usize, field_len: usize) -> Option<String> {
    let field = at(data, offset, field_len)?;
    let len = (field[0] as usize).min(field_len - 1);
    Some(utf8(&field[1..=len]))
}

/// Seconds between 1904-01-01 and the Unix epoch.
const EPOCH_1904: i64 = 2_082_844_800;

/// Seconds between the Unix epoch and 2001-01-01.
const EPOCH_2001: i64 = 978_307_200;

/// A QuickTime timestamp (seconds since 1904). Zero means unset.
pub(crate) fn mac_time(secs: u64) -> Option<DateTime<Utc>> {
    if secs == 0 {
        return None;
    }
    let unix = i64::try_from(secs).ok()?.checked_sub(EPOCH_1904)?;
    DateTime::from_timestamp(unix, 0)
}

/// A Matroska `DateUTC` (nanoseconds since 2001).
pub(crate) fn matroska_time(nanos: i64) -> Option<DateTime<Utc>> {
    let secs = nanos.div_euclid(1_000_000_000).checked_add(EPOCH_2001)?;
    let sub = nanos.rem_euclid(1_000_000_000) as u32;
    DateTime::from_timestamp(secs, sub)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_out_of_range_is_none() {
        let data = [0x00, 0x01, 0x02];
        assert_eq!(be_u16(&data, 1), Some(0x0102));
        assert_eq!(be_u16(&data, 2), None);
        assert_eq!(be_u32(&data, 0), None);
        assert_eq!(be_u32(&data, usize::MAX), None);
        assert_eq!(le_u16(&data, 0), Some(0x0100));
    }

    #[test]
    fn test_strings() {
        assert_eq!(latin1(b"Caf\xE9\0junk"), "Café");
        assert_eq!(fourcc_str(b"qt  "), "qt");
        let mut field = [0u8; 32];
        field[0] = 3;
        field[1..4].copy_from_slice(b"x264");
        assert_eq!(pascal(&field, 0, 32).as_deref(), Some("x26"));
    }

    #[test]
    fn test_epochs() {
        assert_eq!(mac_time(0), None);
        assert_eq!(mac_time(EPOCH_1904 as u64).map(|d| d.timestamp()), Some(0));
        assert_eq!(matroska_time(0).map(|d| d.timestamp()), Some(EPOCH_2001));
    }
}
