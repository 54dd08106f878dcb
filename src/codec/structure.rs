//! Versioned composite structures and method parameter lists.
//!
//! A derived structure owns its base and decodes it first, so its wire
//! layout is always the base layout followed by its own fields. Optional
//! trailing fields are gated on the [`VersionContext`] passed into the call;
//! a field whose gate is not met consumes no bytes and keeps its default.

use super::stream_in::{DecodeResult, ParameterCursor};
use super::stream_out::StreamOut;
use super::version::VersionContext;

/// A composite entity with a fixed, version-gated field order.
pub trait Structure: Sized {
    /// Decode every field in declared order, failing on the first error.
    fn extract(cursor: &mut ParameterCursor, version: VersionContext) -> DecodeResult<Self>;

    /// Encode every field present at `version`, in declared order.
    fn write(&self, out: &mut StreamOut, version: VersionContext);
}

/// The ordered parameter list of one RMC method.
///
/// Implementations assign each field as soon as it decodes. When a read fails,
/// the fields that follow are left at their `Default` values.
pub trait MethodParams: Default + Send + 'static {
    fn decode_into(&mut self, cursor: &mut ParameterCursor, version: VersionContext) -> DecodeResult<()>;
}

impl MethodParams for () {
    fn decode_into(&mut self, _cursor: &mut ParameterCursor, _version: VersionContext) -> DecodeResult<()> {
        Ok(())
    }
}
