//! Tagged variant values and packed timestamps.
//!
//! A [`Variant`] is one tag byte followed by the value of the tagged kind.
//! Variants appear as values in generic key/value maps such as
//! matchmaking parameters.
//!
//! ```text
//! tag  kind       payload
//! 0    none       -
//! 1    int64      8 bytes LE
//! 2    double     8 bytes LE
//! 3    bool       1 byte
//! 4    string     u32 length + bytes
//! 5    datetime   8 bytes LE (packed)
//! 6    uint64     8 bytes LE
//! ```
//!
//! There is no buffer kind. Any tag outside this table, a buffer tag
//! included, is rejected with [`DecodeError::UnknownTag`] at the tag byte.
//!
//! Variants serialize to JSON as their bare value: `None` is `null` and a
//! `DateTime` is its raw packed number.

use std::fmt;

use serde::Serialize;

use super::stream_in::{DecodeResult, ParameterCursor};
use super::stream_out::StreamOut;
use crate::error::DecodeError;

/// Variant tag constants.
pub mod tags {
    pub const NONE: u8 = 0;
    pub const INT64: u8 = 1;
    pub const DOUBLE: u8 = 2;
    pub const BOOL: u8 = 3;
    pub const STRING: u8 = 4;
    pub const DATETIME: u8 = 5;
    pub const UINT64: u8 = 6;
}

/// Timestamp packed into 64 bits.
///
/// Layout from the low bit: second (6), minute (6), hour (5), day (5),
/// month (4), year (remaining bits).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct DateTime(u64);

impl DateTime {
    /// Wrap a raw packed value.
    #[inline]
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Pack calendar components.
    pub const fn from_parts(year: u64, month: u64, day: u64, hour: u64, minute: u64, second: u64) -> Self {
        Self(
            (second & 0x3F)
                | (minute & 0x3F) << 6
                | (hour & 0x1F) << 12
                | (day & 0x1F) << 17
                | (month & 0x0F) << 22
                | year << 26,
        )
    }

    #[inline]
    pub const fn raw(&self) -> u64 {
        self.0
    }

    #[inline]
    pub const fn second(&self) -> u64 {
        self.0 & 0x3F
    }

    #[inline]
    pub const fn minute(&self) -> u64 {
        (self.0 >> 6) & 0x3F
    }

    #[inline]
    pub const fn hour(&self) -> u64 {
        (self.0 >> 12) & 0x1F
    }

    #[inline]
    pub const fn day(&self) -> u64 {
        (self.0 >> 17) & 0x1F
    }

    #[inline]
    pub const fn month(&self) -> u64 {
        (self.0 >> 22) & 0x0F
    }

    #[inline]
    pub const fn year(&self) -> u64 {
        self.0 >> 26
    }
}

impl fmt::Display for DateTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
            self.year(),
            self.month(),
            self.day(),
            self.hour(),
            self.minute(),
            self.second()
        )
    }
}

/// Tagged union of primitive kinds.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Variant {
    #[default]
    None,
    Int64(i64),
    Double(f64),
    Bool(bool),
    String(String),
    DateTime(DateTime),
    UInt64(u64),
}

impl Variant {
    /// Wire tag for this kind.
    pub fn tag(&self) -> u8 {
        match self {
            Variant::None => tags::NONE,
            Variant::Int64(_) => tags::INT64,
            Variant::Double(_) => tags::DOUBLE,
            Variant::Bool(_) => tags::BOOL,
            Variant::String(_) => tags::STRING,
            Variant::DateTime(_) => tags::DATETIME,
            Variant::UInt64(_) => tags::UINT64,
        }
    }

    /// Read a tag byte and the value it announces.
    ///
    /// Prefer [`ParameterCursor::read_variant`], which rewinds on failure.
    pub fn extract(cursor: &mut ParameterCursor) -> DecodeResult<Self> {
        let offset = cursor.position();
        let tag = cursor.read_u8()?;

        Ok(match tag {
            tags::NONE => Variant::None,
            tags::INT64 => Variant::Int64(cursor.read_i64()?),
            tags::DOUBLE => Variant::Double(cursor.read_f64()?),
            tags::BOOL => Variant::Bool(cursor.read_bool()?),
            tags::STRING => Variant::String(cursor.read_string()?),
            tags::DATETIME => Variant::DateTime(DateTime::from_raw(cursor.read_u64()?)),
            tags::UINT64 => Variant::UInt64(cursor.read_u64()?),
            tag => return Err(DecodeError::UnknownTag { offset, tag }),
        })
    }

    /// Write the tag byte and the value.
    pub fn write(&self, out: &mut StreamOut) {
        out.write_u8(self.tag());
        match self {
            Variant::None => {}
            Variant::Int64(v) => {
                out.write_i64(*v);
            }
            Variant::Double(v) => {
                out.write_f64(*v);
            }
            Variant::Bool(v) => {
                out.write_bool(*v);
            }
            Variant::String(v) => {
                out.write_string(v);
            }
            Variant::DateTime(v) => {
                out.write_u64(v.raw());
            }
            Variant::UInt64(v) => {
                out.write_u64(*v);
            }
        }
    }
}
