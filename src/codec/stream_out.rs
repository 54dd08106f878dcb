//! Parameter stream encoder.
//!
//! [`StreamOut`] is the write-side mirror of
//! [`ParameterCursor`](super::ParameterCursor): every read has a matching
//! write producing the exact bytes the read consumes.

use bytes::{BufMut, Bytes, BytesMut};
use indexmap::IndexMap;

use super::stream_in::Primitive;
use super::structure::Structure;
use super::variant::Variant;
use super::version::VersionContext;

/// Growable little-endian output stream.
#[derive(Debug, Default, Clone)]
pub struct StreamOut {
    buf: BytesMut,
}

impl StreamOut {
    /// Create an empty stream.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty stream with preallocated capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: BytesMut::with_capacity(capacity),
        }
    }

    /// Bytes written so far.
    #[inline]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Freeze into immutable `Bytes`.
    pub fn freeze(self) -> Bytes {
        self.buf.freeze()
    }

    /// Copy out as a `Vec<u8>`.
    pub fn to_vec(&self) -> Vec<u8> {
        self.buf.to_vec()
    }

    /// Write one fixed-width value.
    #[inline]
    pub fn write<T: Primitive>(&mut self, value: T) -> &mut Self {
        value.put_le(&mut self.buf);
        self
    }

    #[inline]
    pub fn write_u8(&mut self, value: u8) -> &mut Self {
        self.write(value)
    }

    #[inline]
    pub fn write_u16(&mut self, value: u16) -> &mut Self {
        self.write(value)
    }

    #[inline]
    pub fn write_u32(&mut self, value: u32) -> &mut Self {
        self.write(value)
    }

    #[inline]
    pub fn write_u64(&mut self, value: u64) -> &mut Self {
        self.write(value)
    }

    #[inline]
    pub fn write_i64(&mut self, value: i64) -> &mut Self {
        self.write(value)
    }

    #[inline]
    pub fn write_f64(&mut self, value: f64) -> &mut Self {
        self.write(value)
    }

    #[inline]
    pub fn write_bool(&mut self, value: bool) -> &mut Self {
        self.write_u8(u8::from(value))
    }

    /// Write raw bytes with no length prefix.
    pub fn write_bytes(&mut self, bytes: &[u8]) -> &mut Self {
        self.buf.put_slice(bytes);
        self
    }

    /// Write a `u32`-length-prefixed string with its NUL terminator.
    pub fn write_string(&mut self, value: &str) -> &mut Self {
        self.write_u32(value.len() as u32 + 1);
        self.buf.put_slice(value.as_bytes());
        self.buf.put_u8(0);
        self
    }

    /// Write a `u32`-length-prefixed byte buffer.
    pub fn write_buffer(&mut self, bytes: &[u8]) -> &mut Self {
        self.write_u32(bytes.len() as u32);
        self.buf.put_slice(bytes);
        self
    }

    /// Write a `u32` count followed by fixed-width elements.
    pub fn write_list<T: Primitive>(&mut self, items: &[T]) -> &mut Self {
        self.write_u32(items.len() as u32);
        for item in items {
            item.put_le(&mut self.buf);
        }
        self
    }

    /// Write a `u32` count followed by key/value pairs in insertion order.
    pub fn write_map<K, V, WK, WV>(
        &mut self,
        map: &IndexMap<K, V>,
        mut write_key: WK,
        mut write_value: WV,
    ) -> &mut Self
    where
        WK: FnMut(&mut Self, &K),
        WV: FnMut(&mut Self, &V),
    {
        self.write_u32(map.len() as u32);
        for (key, value) in map {
            write_key(self, key);
            write_value(self, value);
        }
        self
    }

    /// Write a tagged [`Variant`].
    pub fn write_variant(&mut self, value: &Variant) -> &mut Self {
        value.write(self);
        self
    }

    /// Write a composite structure at the given protocol version.
    pub fn write_structure<T: Structure>(&mut self, value: &T, version: VersionContext) -> &mut Self {
        value.write(self, version);
        self
    }
}
