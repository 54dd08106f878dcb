//! Codec module - typed reads and writes over RMC parameter bytes.
//!
//! - [`ParameterCursor`] - bounds-checked little-endian decoder
//! - [`StreamOut`] - the matching encoder
//! - [`Variant`] / [`DateTime`] - tagged map values and packed timestamps
//! - [`Structure`] / [`MethodParams`] - composite and per-method layouts
//! - [`VersionContext`] - negotiated version used by field gates
//!
//! # Example
//!
//! ```
//! use nex_rmc::codec::{ParameterCursor, StreamOut};
//!
//! let mut out = StreamOut::new();
//! out.write_u32(7).write_string("Gathering");
//!
//! let mut cursor = ParameterCursor::new(out.freeze());
//! assert_eq!(cursor.read_u32().unwrap(), 7);
//! assert_eq!(cursor.read_string().unwrap(), "Gathering");
//! ```

mod stream_in;
mod stream_out;
mod structure;
mod variant;
mod version;

pub use stream_in::{DecodeResult, ParameterCursor, Primitive};
pub use stream_out::StreamOut;
pub use structure::{MethodParams, Structure};
pub use variant::{tags as variant_tags, DateTime, Variant};
pub use version::{VersionContext, NEX_V3_0_0, NEX_V3_5_0, NEX_V4_0_0};
