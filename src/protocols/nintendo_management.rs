//! Nintendo management protocol (0x53).

use std::future::Future;

use crate::codec::{DecodeResult, MethodParams, ParameterCursor, VersionContext};
use crate::handler::{CallContext, Decoded, HandlerResult, MethodRegistry};

pub const PROTOCOL_ID: u8 = 0x53;

pub mod methods {
    /// Lists the users registered on a console, by friend code.
    pub const GET_CONSOLE_USERNAMES: u32 = 2;
}

/// Width of a console friend code on the wire.
pub const FRIEND_CODE_LEN: usize = 7;

/// Render a raw 7-byte friend code as decimal text.
///
/// The bytes are reversed and the result read most significant byte first,
/// so `[1, 2, 3, 4, 5, 6, 7]` is `0x07060504030201`.
pub fn decode_friend_code(raw: [u8; FRIEND_CODE_LEN]) -> String {
    let mut reversed = raw;
    reversed.reverse();
    reversed
        .iter()
        .fold(0u64, |acc, &byte| (acc << 8) | u64::from(byte))
        .to_string()
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GetConsoleUsernamesParams {
    pub friend_code: String,
}

impl MethodParams for GetConsoleUsernamesParams {
    fn decode_into(&mut self, cursor: &mut ParameterCursor, _version: VersionContext) -> DecodeResult<()> {
        let bytes = cursor.read_bytes(FRIEND_CODE_LEN)?;
        let mut raw = [0u8; FRIEND_CODE_LEN];
        raw.copy_from_slice(&bytes);
        self.friend_code = decode_friend_code(raw);
        Ok(())
    }
}

/// Builder for the nintendo management method table.
#[derive(Debug)]
pub struct NintendoManagementProtocol {
    registry: MethodRegistry,
}

impl NintendoManagementProtocol {
    pub fn new() -> Self {
        let mut registry = MethodRegistry::new(PROTOCOL_ID, "NintendoManagement");
        registry.declare(methods::GET_CONSOLE_USERNAMES, "GetConsoleUsernames");
        Self { registry }
    }

    pub fn get_console_usernames<F, Fut>(mut self, handler: F) -> Self
    where
        F: Fn(Decoded<GetConsoleUsernamesParams>, CallContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.registry.register(methods::GET_CONSOLE_USERNAMES, handler);
        self
    }
}

impl Default for NintendoManagementProtocol {
    fn default() -> Self {
        Self::new()
    }
}

impl From<NintendoManagementProtocol> for MethodRegistry {
    fn from(protocol: NintendoManagementProtocol) -> Self {
        protocol.registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DecodeError;
    use crate::handler::decode_params;
    use bytes::Bytes;

    #[test]
    fn test_decode_friend_code() {
        assert_eq!(decode_friend_code([1, 2, 3, 4, 5, 6, 7]), "1976943448883713");
        assert_eq!(decode_friend_code([0; 7]), "0");
        assert_eq!(decode_friend_code([0xFF; 7]), "72057594037927935");
    }

    #[test]
    fn test_get_console_usernames_params() {
        let params: Decoded<GetConsoleUsernamesParams> = decode_params(
            Bytes::from_static(&[0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07]),
            VersionContext::default(),
        );

        assert_eq!(params.unwrap().friend_code, "1976943448883713");
    }

    #[test]
    fn test_short_friend_code() {
        let params: Decoded<GetConsoleUsernamesParams> =
            decode_params(Bytes::from_static(&[1, 2, 3]), VersionContext::default());
        let rejected = params.unwrap_err();

        assert_eq!(
            rejected.error,
            DecodeError::Truncated {
                offset: 0,
                needed: 7,
                remaining: 3
            }
        );
        assert!(rejected.partial.friend_code.is_empty());
    }
}
