//! Parameter stream decoder.
//!
//! A [`ParameterCursor`] walks an immutable `Bytes` range and hands out typed
//! values. All integers are little-endian; strings and buffers carry a `u32`
//! length prefix.
//!
//! A read either succeeds and advances the cursor by exactly the bytes it
//! consumed, or fails and leaves the cursor where that read started. The error
//! carries the offset of the bytes that could not be satisfied.
//!
//! # Example
//!
//! ```
//! use bytes::Bytes;
//! use nex_rmc::codec::ParameterCursor;
//!
//! let mut cursor = ParameterCursor::new(Bytes::from_static(&[0x2A, 0, 0, 0, 0x07]));
//! assert_eq!(cursor.read_u32().unwrap(), 42);
//! assert!(cursor.read_u16().is_err());
//! assert_eq!(cursor.position(), 4);
//! ```

use std::hash::Hash;

use bytes::{BufMut, Bytes, BytesMut};
use indexmap::IndexMap;

use super::structure::Structure;
use super::variant::Variant;
use super::version::VersionContext;
use crate::error::DecodeError;

/// Result of a single cursor read.
pub type DecodeResult<T> = std::result::Result<T, DecodeError>;

/// Fixed-width little-endian value that can appear in a list.
pub trait Primitive: Sized + Copy {
    /// Encoded width in bytes.
    const WIDTH: usize;

    /// Decode from exactly `WIDTH` bytes.
    fn from_le_slice(bytes: &[u8]) -> Self;

    /// Append the little-endian encoding.
    fn put_le(self, out: &mut BytesMut);
}

macro_rules! impl_primitive {
    ($($ty:ty => $put:ident),* $(,)?) => {
        $(
            impl Primitive for $ty {
                const WIDTH: usize = std::mem::size_of::<$ty>();

                #[inline]
                fn from_le_slice(bytes: &[u8]) -> Self {
                    let mut raw = [0u8; std::mem::size_of::<$ty>()];
                    raw.copy_from_slice(bytes);
                    <$ty>::from_le_bytes(raw)
                }

                #[inline]
                fn put_le(self, out: &mut BytesMut) {
                    out.$put(self);
                }
            }
        )*
    };
}

impl_primitive! {
    u8 => put_u8,
    u16 => put_u16_le,
    u32 => put_u32_le,
    u64 => put_u64_le,
    i32 => put_i32_le,
    i64 => put_i64_le,
    f64 => put_f64_le,
}

/// Cursor over the parameter bytes of one request.
#[derive(Debug, Clone)]
pub struct ParameterCursor {
    buf: Bytes,
    pos: usize,
}

impl ParameterCursor {
    /// Create a cursor positioned at the start of `buf`.
    pub fn new(buf: Bytes) -> Self {
        Self { buf, pos: 0 }
    }

    /// Create a cursor positioned at `offset` within `buf`.
    pub fn with_offset(buf: Bytes, offset: usize) -> Self {
        Self { buf, pos: offset }
    }

    /// Current byte offset.
    #[inline]
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Bytes left to read.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.buf.len().saturating_sub(self.pos)
    }

    /// Check if every byte has been consumed.
    #[inline]
    pub fn is_exhausted(&self) -> bool {
        self.remaining() == 0
    }

    /// Unread tail of the range (does not advance).
    pub fn remaining_bytes(&self) -> Bytes {
        if self.pos >= self.buf.len() {
            return Bytes::new();
        }
        self.buf.slice(self.pos..)
    }

    fn ensure(&self, needed: usize) -> DecodeResult<()> {
        let remaining = self.remaining();
        if needed > remaining {
            return Err(DecodeError::Truncated {
                offset: self.pos,
                needed,
                remaining,
            });
        }
        Ok(())
    }

    /// Run a compound read; on failure the cursor goes back to where it started.
    fn atomically<T>(&mut self, read: impl FnOnce(&mut Self) -> DecodeResult<T>) -> DecodeResult<T> {
        let start = self.pos;
        let result = read(self);
        if result.is_err() {
            self.pos = start;
        }
        result
    }

    /// Read one fixed-width value.
    #[inline]
    pub fn read<T: Primitive>(&mut self) -> DecodeResult<T> {
        self.ensure(T::WIDTH)?;
        let start = self.pos;
        self.pos += T::WIDTH;
        Ok(T::from_le_slice(&self.buf[start..self.pos]))
    }

    #[inline]
    pub fn read_u8(&mut self) -> DecodeResult<u8> {
        self.read()
    }

    #[inline]
    pub fn read_u16(&mut self) -> DecodeResult<u16> {
        self.read()
    }

    #[inline]
    pub fn read_u32(&mut self) -> DecodeResult<u32> {
        self.read()
    }

    #[inline]
    pub fn read_u64(&mut self) -> DecodeResult<u64> {
        self.read()
    }

    #[inline]
    pub fn read_i64(&mut self) -> DecodeResult<i64> {
        self.read()
    }

    #[inline]
    pub fn read_f64(&mut self) -> DecodeResult<f64> {
        self.read()
    }

    /// Read a boolean byte; only `1` is true.
    #[inline]
    pub fn read_bool(&mut self) -> DecodeResult<bool> {
        Ok(self.read_u8()? == 1)
    }

    /// Read exactly `len` raw bytes (zero-copy).
    pub fn read_bytes(&mut self, len: usize) -> DecodeResult<Bytes> {
        self.ensure(len)?;
        let start = self.pos;
        self.pos += len;
        Ok(self.buf.slice(start..self.pos))
    }

    /// Read a `u32`-length-prefixed string.
    ///
    /// The length counts a trailing NUL terminator, which is stripped. A
    /// zero length or a missing terminator is `Malformed` at the length
    /// prefix; non-UTF-8 content is `Malformed` at the string body.
    pub fn read_string(&mut self) -> DecodeResult<String> {
        self.atomically(|cursor| {
            let prefix = cursor.pos;
            let len = cursor.read_u32()? as usize;
            let offset = cursor.pos;
            let raw = cursor.read_bytes(len)?;
            let text = match raw.split_last() {
                Some((&0, rest)) => rest,
                Some(_) => {
                    return Err(DecodeError::malformed(prefix, "string is missing its NUL terminator"))
                }
                None => return Err(DecodeError::malformed(prefix, "string length is zero")),
            };
            String::from_utf8(text.to_vec())
                .map_err(|e| DecodeError::malformed(offset, format!("invalid UTF-8 string: {e}")))
        })
    }

    /// Read a `u32`-length-prefixed byte buffer (zero-copy).
    pub fn read_buffer(&mut self) -> DecodeResult<Bytes> {
        self.atomically(|cursor| {
            let len = cursor.read_u32()? as usize;
            cursor.read_bytes(len)
        })
    }

    /// Read a `u32` count followed by that many fixed-width elements.
    ///
    /// The whole list is bounds-checked before any element is read.
    pub fn read_list<T: Primitive>(&mut self) -> DecodeResult<Vec<T>> {
        self.atomically(|cursor| {
            let count = cursor.read_u32()? as usize;
            let needed = count.checked_mul(T::WIDTH).ok_or_else(|| {
                DecodeError::malformed(cursor.pos, format!("list count {count} overflows"))
            })?;
            cursor.ensure(needed)?;

            let mut items = Vec::with_capacity(count);
            for _ in 0..count {
                items.push(cursor.read::<T>()?);
            }
            Ok(items)
        })
    }

    /// Read a `u32` count followed by that many key/value pairs.
    ///
    /// Entries keep their wire order. Duplicate keys are allowed on the wire;
    /// the later value wins and stays at the first key's position.
    pub fn read_map<K, V, RK, RV>(
        &mut self,
        mut read_key: RK,
        mut read_value: RV,
    ) -> DecodeResult<IndexMap<K, V>>
    where
        K: Hash + Eq,
        RK: FnMut(&mut Self) -> DecodeResult<K>,
        RV: FnMut(&mut Self) -> DecodeResult<V>,
    {
        self.atomically(|cursor| {
            let count = cursor.read_u32()?;
            let mut map = IndexMap::new();
            for _ in 0..count {
                let key = read_key(cursor)?;
                let value = read_value(cursor)?;
                map.insert(key, value);
            }
            Ok(map)
        })
    }

    /// Read a tagged [`Variant`].
    pub fn read_variant(&mut self) -> DecodeResult<Variant> {
        self.atomically(Variant::extract)
    }

    /// Read a composite structure at the given protocol version.
    pub fn read_structure<T: Structure>(&mut self, version: VersionContext) -> DecodeResult<T> {
        self.atomically(|cursor| T::extract(cursor, version))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cursor(bytes: &[u8]) -> ParameterCursor {
        ParameterCursor::new(Bytes::copy_from_slice(bytes))
    }

    #[test]
    fn test_fixed_width_little_endian() {
        let mut c = cursor(&[
            0x01, // u8
            0x02, 0x01, // u16
            0x04, 0x03, 0x02, 0x01, // u32
            0x08, 0x07, 0x06, 0x05, 0x04, 0x03, 0x02, 0x01, // u64
        ]);

        assert_eq!(c.read_u8().unwrap(), 0x01);
        assert_eq!(c.read_u16().unwrap(), 0x0102);
        assert_eq!(c.read_u32().unwrap(), 0x0102_0304);
        assert_eq!(c.read_u64().unwrap(), 0x0102_0304_0506_0708);
        assert!(c.is_exhausted());
    }

    #[test]
    fn test_truncated_reports_offset_and_does_not_advance() {
        let mut c = cursor(&[0xAA, 0x01, 0x02]);
        c.read_u8().unwrap();

        let err = c.read_u32().unwrap_err();
        assert_eq!(
            err,
            DecodeError::Truncated {
                offset: 1,
                needed: 4,
                remaining: 2
            }
        );
        assert_eq!(c.position(), 1);
    }

    #[test]
    fn test_read_string_strips_terminator() {
        let mut c = cursor(&[6, 0, 0, 0, b'h', b'e', b'l', b'l', b'o', 0]);
        assert_eq!(c.read_string().unwrap(), "hello");
        assert!(c.is_exhausted());
    }

    #[test]
    fn test_read_string_without_terminator_is_malformed() {
        let mut c = cursor(&[0xAA, 2, 0, 0, 0, b'o', b'k']);
        c.read_u8().unwrap();

        let err = c.read_string().unwrap_err();
        assert!(matches!(err, DecodeError::Malformed { offset: 1, .. }));
        assert_eq!(c.position(), 1);
    }

    #[test]
    fn test_read_string_zero_length_is_malformed() {
        let mut c = cursor(&[0, 0, 0, 0]);
        let err = c.read_string().unwrap_err();
        assert!(matches!(err, DecodeError::Malformed { offset: 0, .. }));
        assert_eq!(c.position(), 0);
    }

    #[test]
    fn test_read_string_empty_is_lone_terminator() {
        let mut c = cursor(&[1, 0, 0, 0, 0]);
        assert_eq!(c.read_string().unwrap(), "");
        assert!(c.is_exhausted());
    }

    #[test]
    fn test_read_string_truncated_body_restores_position() {
        let mut c = cursor(&[10, 0, 0, 0, b'a', b'b']);
        let err = c.read_string().unwrap_err();

        assert_eq!(
            err,
            DecodeError::Truncated {
                offset: 4,
                needed: 10,
                remaining: 2
            }
        );
        assert_eq!(c.position(), 0);
    }

    #[test]
    fn test_read_string_invalid_utf8_is_malformed() {
        let mut c = cursor(&[3, 0, 0, 0, 0xFF, 0xFE, 0]);
        let err = c.read_string().unwrap_err();
        assert!(matches!(err, DecodeError::Malformed { offset: 4, .. }));
    }

    #[test]
    fn test_read_buffer_is_zero_copy_slice() {
        let data = Bytes::from_static(&[3, 0, 0, 0, 9, 8, 7, 0xFF]);
        let mut c = ParameterCursor::new(data.clone());

        let buf = c.read_buffer().unwrap();
        assert_eq!(&buf[..], &[9, 8, 7]);
        assert_eq!(buf.as_ptr(), data[4..].as_ptr());
        assert_eq!(c.position(), 7);
    }

    #[test]
    fn test_read_list_checks_whole_length_first() {
        // Declares 3 u32s but carries only 2.
        let mut c = cursor(&[3, 0, 0, 0, 1, 0, 0, 0, 2, 0, 0, 0]);
        let err = c.read_list::<u32>().unwrap_err();

        assert_eq!(
            err,
            DecodeError::Truncated {
                offset: 4,
                needed: 12,
                remaining: 8
            }
        );
        assert_eq!(c.position(), 0);
    }

    #[test]
    fn test_read_list_u32() {
        let mut c = cursor(&[2, 0, 0, 0, 5, 0, 0, 0, 6, 0, 0, 0]);
        assert_eq!(c.read_list::<u32>().unwrap(), vec![5, 6]);
    }

    #[test]
    fn test_read_map_later_duplicate_wins() {
        let mut c = cursor(&[
            2, 0, 0, 0, // count
            2, 0, 0, 0, b'k', 0, 10, 0, 0, 0, // "k" -> 10
            2, 0, 0, 0, b'k', 0, 20, 0, 0, 0, // "k" -> 20
        ]);

        let map = c
            .read_map(ParameterCursor::read_string, ParameterCursor::read_u32)
            .unwrap();
        assert_eq!(map.len(), 1);
        assert_eq!(map["k"], 20);
    }

    #[test]
    fn test_read_map_keeps_wire_order() {
        let mut c = cursor(&[
            3, 0, 0, 0, // count
            2, 0, 0, 0, b'z', 0, 1, 0, 0, 0, // "z" -> 1
            2, 0, 0, 0, b'a', 0, 2, 0, 0, 0, // "a" -> 2
            2, 0, 0, 0, b'z', 0, 3, 0, 0, 0, // "z" -> 3
        ]);

        let map = c
            .read_map(ParameterCursor::read_string, ParameterCursor::read_u32)
            .unwrap();
        let entries: Vec<_> = map.iter().map(|(k, v)| (k.as_str(), *v)).collect();
        assert_eq!(entries, vec![("z", 3), ("a", 2)]);
    }

    #[test]
    fn test_with_offset_starts_mid_range() {
        let mut c = ParameterCursor::with_offset(Bytes::from_static(&[0xFF, 0x01, 0x00]), 1);
        assert_eq!(c.read_u16().unwrap(), 1);
    }

    #[test]
    fn test_offset_past_end_is_truncated() {
        let mut c = ParameterCursor::with_offset(Bytes::from_static(&[0x01]), 5);
        assert_eq!(c.remaining(), 0);
        assert!(c.remaining_bytes().is_empty());
        assert!(matches!(
            c.read_u8(),
            Err(DecodeError::Truncated { offset: 5, .. })
        ));
    }
}
