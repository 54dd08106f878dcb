//! Negotiated protocol version.
//!
//! Versions are packed as `major * 10000 + minor * 100 + patch`, so NEX 3.5.0
//! is `30500`. Composite structures compare against these thresholds to decide
//! whether trailing fields are on the wire.

use std::fmt;

use serde::{Deserialize, Serialize};

/// NEX 3.0.0.
pub const NEX_V3_0_0: u32 = 30000;
/// NEX 3.5.0.
pub const NEX_V3_5_0: u32 = 30500;
/// NEX 4.0.0.
pub const NEX_V4_0_0: u32 = 40000;

/// Protocol version negotiated for one connection.
///
/// Set once at negotiation time and passed by value into every decode call.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct VersionContext(u32);

impl VersionContext {
    /// Create from a packed version number.
    #[inline]
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// Create from version components.
    #[inline]
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self(major * 10000 + minor * 100 + patch)
    }

    /// Packed version number.
    #[inline]
    pub const fn raw(&self) -> u32 {
        self.0
    }

    #[inline]
    pub const fn major(&self) -> u32 {
        self.0 / 10000
    }

    #[inline]
    pub const fn minor(&self) -> u32 {
        (self.0 / 100) % 100
    }

    #[inline]
    pub const fn patch(&self) -> u32 {
        self.0 % 100
    }

    /// Check a version gate: `version >= threshold`.
    #[inline]
    pub const fn supports(&self, threshold: u32) -> bool {
        self.0 >= threshold
    }
}

impl fmt::Display for VersionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major(), self.minor(), self.patch())
    }
}
