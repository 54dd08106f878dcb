//! Binary data protocol (0x76): opaque blob storage keyed by metadata.

use std::future::Future;

use bytes::Bytes;

use crate::codec::{DecodeResult, MethodParams, ParameterCursor, VersionContext};
use crate::handler::{CallContext, Decoded, HandlerResult, MethodRegistry};

pub const PROTOCOL_ID: u8 = 0x76;

pub mod methods {
    pub const SAVE_BINARY_DATA: u32 = 1;
    pub const GET_BINARY_DATA: u32 = 2;
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SaveBinaryDataParams {
    pub metadata: String,
    pub blob: Bytes,
}

impl MethodParams for SaveBinaryDataParams {
    fn decode_into(&mut self, cursor: &mut ParameterCursor, _version: VersionContext) -> DecodeResult<()> {
        self.metadata = cursor.read_string()?;
        self.blob = cursor.read_buffer()?;
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GetBinaryDataParams {
    pub metadata: String,
}

impl MethodParams for GetBinaryDataParams {
    fn decode_into(&mut self, cursor: &mut ParameterCursor, _version: VersionContext) -> DecodeResult<()> {
        self.metadata = cursor.read_string()?;
        Ok(())
    }
}

/// Builder for the binary data method table.
#[derive(Debug)]
pub struct BinaryDataProtocol {
    registry: MethodRegistry,
}

impl BinaryDataProtocol {
    pub fn new() -> Self {
        let mut registry = MethodRegistry::new(PROTOCOL_ID, "BinaryData");
        registry.declare(methods::SAVE_BINARY_DATA, "SaveBinaryData");
        registry.declare(methods::GET_BINARY_DATA, "GetBinaryData");
        Self { registry }
    }

    pub fn save_binary_data<F, Fut>(mut self, handler: F) -> Self
    where
        F: Fn(Decoded<SaveBinaryDataParams>, CallContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.registry.register(methods::SAVE_BINARY_DATA, handler);
        self
    }

    pub fn get_binary_data<F, Fut>(mut self, handler: F) -> Self
    where
        F: Fn(Decoded<GetBinaryDataParams>, CallContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.registry.register(methods::GET_BINARY_DATA, handler);
        self
    }
}

impl Default for BinaryDataProtocol {
    fn default() -> Self {
        Self::new()
    }
}

impl From<BinaryDataProtocol> for MethodRegistry {
    fn from(protocol: BinaryDataProtocol) -> Self {
        protocol.registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::StreamOut;
    use crate::error::DecodeError;
    use crate::handler::decode_params;

    #[test]
    fn test_save_binary_data_decode() {
        let mut out = StreamOut::new();
        out.write_string("band_art.png").write_buffer(&[0x89, b'P', b'N', b'G']);

        let params: Decoded<SaveBinaryDataParams> = decode_params(out.freeze(), VersionContext::default());
        let params = params.unwrap();

        assert_eq!(params.metadata, "band_art.png");
        assert_eq!(&params.blob[..], &[0x89, b'P', b'N', b'G']);
    }

    #[test]
    fn test_save_binary_data_short_blob() {
        let mut out = StreamOut::new();
        out.write_string("m").write_u32(100).write_bytes(&[1, 2, 3]);

        let params: Decoded<SaveBinaryDataParams> = decode_params(out.freeze(), VersionContext::default());
        let rejected = params.unwrap_err();

        assert!(matches!(
            rejected.error,
            DecodeError::Truncated {
                offset: 10,
                needed: 100,
                remaining: 3
            }
        ));
        assert_eq!(rejected.partial.metadata, "m");
        assert!(rejected.partial.blob.is_empty());
    }

    #[test]
    fn test_protocol_table() {
        let registry: MethodRegistry = BinaryDataProtocol::new()
            .get_binary_data(|_params, _ctx| async { Ok(()) })
            .into();

        assert_eq!(registry.protocol_id(), 0x76);
        assert!(registry.is_implemented(methods::GET_BINARY_DATA));
        assert!(!registry.is_implemented(methods::SAVE_BINARY_DATA));
    }
}
