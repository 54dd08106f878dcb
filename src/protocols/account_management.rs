//! Account management protocol (0x19).

use std::future::Future;

use crate::codec::{DecodeResult, MethodParams, ParameterCursor, VersionContext};
use crate::error::DecodeError;
use crate::handler::{CallContext, Decoded, HandlerResult, MethodRegistry};

pub const PROTOCOL_ID: u8 = 0x19;

pub mod methods {
    pub const DELETE_ACCOUNT: u32 = 0x02;
    pub const SET_STATUS: u32 = 0x11;
    pub const FIND_BY_NAME_LIKE: u32 = 0x19;
    /// Also sent by consoles with several profiles signed in.
    pub const LOOKUP_OR_CREATE_ACCOUNT: u32 = 0x1B;
}

/// Data holder names accepted by LookupOrCreateAccount.
pub const ACCOUNT_DATA_HOLDERS: [&str; 3] = ["NintendoToken", "XboxUserInfo", "SonyNPTicket"];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeleteAccountParams {
    pub pid: u32,
}

impl MethodParams for DeleteAccountParams {
    fn decode_into(&mut self, cursor: &mut ParameterCursor, _version: VersionContext) -> DecodeResult<()> {
        self.pid = cursor.read_u32()?;
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SetStatusParams {
    pub status: String,
}

impl MethodParams for SetStatusParams {
    fn decode_into(&mut self, cursor: &mut ParameterCursor, _version: VersionContext) -> DecodeResult<()> {
        self.status = cursor.read_string()?;
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FindByNameLikeParams {
    pub ui_groups: u32,
    pub name: String,
}

impl MethodParams for FindByNameLikeParams {
    fn decode_into(&mut self, cursor: &mut ParameterCursor, _version: VersionContext) -> DecodeResult<()> {
        self.ui_groups = cursor.read_u32()?;
        self.name = cursor.read_string()?;
        Ok(())
    }
}

/// Parameters of LookupOrCreateAccount.
///
/// The data holder body that follows its name is not decoded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LookupOrCreateAccountParams {
    pub username: String,
    pub key: String,
    pub groups: u32,
    pub email: String,
    pub data_holder: String,
}

impl MethodParams for LookupOrCreateAccountParams {
    fn decode_into(&mut self, cursor: &mut ParameterCursor, _version: VersionContext) -> DecodeResult<()> {
        self.username = cursor.read_string()?;
        self.key = cursor.read_string()?;
        self.groups = cursor.read_u32()?;
        self.email = cursor.read_string()?;

        let offset = cursor.position();
        let data_holder = cursor.read_string()?;
        if !ACCOUNT_DATA_HOLDERS.contains(&data_holder.as_str()) {
            return Err(DecodeError::malformed(
                offset,
                format!("unexpected data holder {data_holder:?}"),
            ));
        }
        self.data_holder = data_holder;
        Ok(())
    }
}

/// Builder for the account management method table.
///
/// Every method is declared up front; methods without a handler answer
/// `Core::NotImplemented`.
#[derive(Debug)]
pub struct AccountManagementProtocol {
    registry: MethodRegistry,
}

impl AccountManagementProtocol {
    pub fn new() -> Self {
        let mut registry = MethodRegistry::new(PROTOCOL_ID, "AccountManagement");
        registry.declare(methods::DELETE_ACCOUNT, "DeleteAccount");
        registry.declare(methods::SET_STATUS, "SetStatus");
        registry.declare(methods::FIND_BY_NAME_LIKE, "FindByNameLike");
        registry.declare(methods::LOOKUP_OR_CREATE_ACCOUNT, "LookupOrCreateAccount");
        Self { registry }
    }

    pub fn delete_account<F, Fut>(mut self, handler: F) -> Self
    where
        F: Fn(Decoded<DeleteAccountParams>, CallContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.registry.register(methods::DELETE_ACCOUNT, handler);
        self
    }

    pub fn set_status<F, Fut>(mut self, handler: F) -> Self
    where
        F: Fn(Decoded<SetStatusParams>, CallContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.registry.register(methods::SET_STATUS, handler);
        self
    }

    pub fn find_by_name_like<F, Fut>(mut self, handler: F) -> Self
    where
        F: Fn(Decoded<FindByNameLikeParams>, CallContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.registry.register(methods::FIND_BY_NAME_LIKE, handler);
        self
    }

    pub fn lookup_or_create_account<F, Fut>(mut self, handler: F) -> Self
    where
        F: Fn(Decoded<LookupOrCreateAccountParams>, CallContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.registry.register(methods::LOOKUP_OR_CREATE_ACCOUNT, handler);
        self
    }
}

impl Default for AccountManagementProtocol {
    fn default() -> Self {
        Self::new()
    }
}

impl From<AccountManagementProtocol> for MethodRegistry {
    fn from(protocol: AccountManagementProtocol) -> Self {
        protocol.registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::StreamOut;
    use crate::handler::{decode_params, MethodLookup};

    fn lookup_request(data_holder: &str) -> bytes::Bytes {
        let mut out = StreamOut::new();
        out.write_string("player")
            .write_string("secret")
            .write_u32(0x10)
            .write_string("player@example.com")
            .write_string(data_holder);
        out.freeze()
    }

    #[test]
    fn test_every_method_declared_unset() {
        let registry: MethodRegistry = AccountManagementProtocol::new().into();

        assert_eq!(registry.protocol_id(), PROTOCOL_ID);
        assert_eq!(registry.len(), 4);
        assert!(matches!(
            registry.lookup(methods::LOOKUP_OR_CREATE_ACCOUNT),
            MethodLookup::Unset {
                name: Some("LookupOrCreateAccount")
            }
        ));
    }

    #[test]
    fn test_setter_registers_handler() {
        let registry: MethodRegistry = AccountManagementProtocol::new()
            .set_status(|_params, _ctx| async { Ok(()) })
            .into();

        assert!(registry.is_implemented(methods::SET_STATUS));
        assert!(!registry.is_implemented(methods::DELETE_ACCOUNT));
    }

    #[test]
    fn test_find_by_name_like_decode() {
        let mut out = StreamOut::new();
        out.write_u32(3).write_string("Harmonix");

        let params: Decoded<FindByNameLikeParams> = decode_params(out.freeze(), VersionContext::default());
        assert_eq!(
            params,
            Ok(FindByNameLikeParams {
                ui_groups: 3,
                name: "Harmonix".to_string()
            })
        );
    }

    #[test]
    fn test_lookup_or_create_account_accepts_known_holders() {
        for holder in ACCOUNT_DATA_HOLDERS {
            let params: Decoded<LookupOrCreateAccountParams> =
                decode_params(lookup_request(holder), VersionContext::default());
            let params = params.unwrap();
            assert_eq!(params.username, "player");
            assert_eq!(params.groups, 0x10);
            assert_eq!(params.data_holder, holder);
        }
    }

    #[test]
    fn test_lookup_or_create_account_rejects_other_holder() {
        let params: Decoded<LookupOrCreateAccountParams> =
            decode_params(lookup_request("PasswordInfo"), VersionContext::default());
        let rejected = params.unwrap_err();

        // 4+7 + 4+7 + 4 + 4+19 bytes precede the holder name.
        assert!(matches!(rejected.error, DecodeError::Malformed { offset: 49, .. }));
        assert_eq!(rejected.partial.email, "player@example.com");
        assert!(rejected.partial.data_holder.is_empty());
    }

    #[test]
    fn test_delete_account_truncated() {
        let params: Decoded<DeleteAccountParams> =
            decode_params(bytes::Bytes::from_static(&[1, 2]), VersionContext::default());
        let rejected = params.unwrap_err();

        assert!(matches!(rejected.error, DecodeError::Truncated { offset: 0, needed: 4, .. }));
        assert_eq!(rejected.partial, DeleteAccountParams::default());
    }
}
