//! Matchmaking protocol (0x15).
//!
//! Gatherings arrive wrapped in an [`AnyDataHolder`]; handlers call
//! [`AnyDataHolder::decode_gathering`] with the connection's version to get a
//! typed [`GatheringKind`](super::GatheringKind).

use std::future::Future;

use super::matchmaking_types::AnyDataHolder;
use crate::codec::{DecodeResult, MethodParams, ParameterCursor, VersionContext};
use crate::handler::{CallContext, Decoded, HandlerResult, MethodRegistry};

pub const PROTOCOL_ID: u8 = 0x15;

pub mod methods {
    pub const REGISTER_GATHERING: u32 = 0x01;
    pub const TERMINATE_GATHERING: u32 = 0x02;
    pub const UPDATE_GATHERING: u32 = 0x04;
    pub const PARTICIPATE: u32 = 0x0B;
    pub const CANCEL_PARTICIPATION: u32 = 0x0C;
    pub const FIND_BY_SINGLE_ID: u32 = 0x15;
    pub const LAUNCH_SESSION: u32 = 0x1A;
    pub const SET_STATE: u32 = 0x1E;
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegisterGatheringParams {
    pub gathering: AnyDataHolder,
}

impl MethodParams for RegisterGatheringParams {
    fn decode_into(&mut self, cursor: &mut ParameterCursor, _version: VersionContext) -> DecodeResult<()> {
        self.gathering = AnyDataHolder::extract(cursor)?;
        Ok(())
    }
}

/// Parameters of UpdateGathering.
///
/// `gathering_id` is not a separate parameter: it is the first field of the
/// wrapped gathering.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateGatheringParams {
    pub gathering: AnyDataHolder,
    pub gathering_id: u32,
}

impl MethodParams for UpdateGatheringParams {
    fn decode_into(&mut self, cursor: &mut ParameterCursor, _version: VersionContext) -> DecodeResult<()> {
        self.gathering = AnyDataHolder::extract(cursor)?;
        self.gathering_id = self.gathering.gathering_id()?;
        Ok(())
    }
}

/// Parameters shared by every method that only names a gathering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GatheringIdParams {
    pub gathering_id: u32,
}

impl MethodParams for GatheringIdParams {
    fn decode_into(&mut self, cursor: &mut ParameterCursor, _version: VersionContext) -> DecodeResult<()> {
        self.gathering_id = cursor.read_u32()?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SetStateParams {
    pub gathering_id: u32,
    pub state: u32,
}

impl MethodParams for SetStateParams {
    fn decode_into(&mut self, cursor: &mut ParameterCursor, _version: VersionContext) -> DecodeResult<()> {
        self.gathering_id = cursor.read_u32()?;
        self.state = cursor.read_u32()?;
        Ok(())
    }
}

/// Builder for the matchmaking method table.
#[derive(Debug)]
pub struct MatchmakingProtocol {
    registry: MethodRegistry,
}

impl MatchmakingProtocol {
    pub fn new() -> Self {
        let mut registry = MethodRegistry::new(PROTOCOL_ID, "Matchmaking");
        registry.declare(methods::REGISTER_GATHERING, "RegisterGathering");
        registry.declare(methods::TERMINATE_GATHERING, "TerminateGathering");
        registry.declare(methods::UPDATE_GATHERING, "UpdateGathering");
        registry.declare(methods::PARTICIPATE, "Participate");
        registry.declare(methods::CANCEL_PARTICIPATION, "CancelParticipation");
        registry.declare(methods::FIND_BY_SINGLE_ID, "FindBySingleID");
        registry.declare(methods::LAUNCH_SESSION, "LaunchSession");
        registry.declare(methods::SET_STATE, "SetState");
        Self { registry }
    }

    pub fn register_gathering<F, Fut>(mut self, handler: F) -> Self
    where
        F: Fn(Decoded<RegisterGatheringParams>, CallContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.registry.register(methods::REGISTER_GATHERING, handler);
        self
    }

    pub fn terminate_gathering<F, Fut>(self, handler: F) -> Self
    where
        F: Fn(Decoded<GatheringIdParams>, CallContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.by_gathering_id(methods::TERMINATE_GATHERING, handler)
    }

    pub fn update_gathering<F, Fut>(mut self, handler: F) -> Self
    where
        F: Fn(Decoded<UpdateGatheringParams>, CallContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.registry.register(methods::UPDATE_GATHERING, handler);
        self
    }

    pub fn participate<F, Fut>(self, handler: F) -> Self
    where
        F: Fn(Decoded<GatheringIdParams>, CallContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.by_gathering_id(methods::PARTICIPATE, handler)
    }

    pub fn cancel_participation<F, Fut>(self, handler: F) -> Self
    where
        F: Fn(Decoded<GatheringIdParams>, CallContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.by_gathering_id(methods::CANCEL_PARTICIPATION, handler)
    }

    pub fn find_by_single_id<F, Fut>(self, handler: F) -> Self
    where
        F: Fn(Decoded<GatheringIdParams>, CallContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.by_gathering_id(methods::FIND_BY_SINGLE_ID, handler)
    }

    pub fn launch_session<F, Fut>(self, handler: F) -> Self
    where
        F: Fn(Decoded<GatheringIdParams>, CallContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.by_gathering_id(methods::LAUNCH_SESSION, handler)
    }

    pub fn set_state<F, Fut>(mut self, handler: F) -> Self
    where
        F: Fn(Decoded<SetStateParams>, CallContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.registry.register(methods::SET_STATE, handler);
        self
    }

    fn by_gathering_id<F, Fut>(mut self, method_id: u32, handler: F) -> Self
    where
        F: Fn(Decoded<GatheringIdParams>, CallContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.registry.register(method_id, handler);
        self
    }
}

impl Default for MatchmakingProtocol {
    fn default() -> Self {
        Self::new()
    }
}

impl From<MatchmakingProtocol> for MethodRegistry {
    fn from(protocol: MatchmakingProtocol) -> Self {
        protocol.registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::StreamOut;
    use crate::error::DecodeError;
    use crate::handler::decode_params;
    use crate::protocols::matchmaking_types::{Gathering, GATHERING_TYPE_NAME};

    fn holder_bytes(gathering: &Gathering) -> bytes::Bytes {
        let mut payload = StreamOut::new();
        payload.write_structure(gathering, VersionContext::default());

        let mut out = StreamOut::new();
        AnyDataHolder::new(GATHERING_TYPE_NAME, payload.freeze()).write(&mut out);
        out.freeze()
    }

    #[test]
    fn test_all_methods_declared() {
        let registry: MethodRegistry = MatchmakingProtocol::new().into();

        assert_eq!(registry.len(), 8);
        assert_eq!(registry.method_name(methods::SET_STATE), Some("SetState"));
        assert_eq!(registry.method_name(methods::FIND_BY_SINGLE_ID), Some("FindBySingleID"));
        assert!(!registry.is_implemented(methods::REGISTER_GATHERING));
    }

    #[test]
    fn test_gathering_id_setters_use_their_own_method() {
        let registry: MethodRegistry = MatchmakingProtocol::new()
            .participate(|_params, _ctx| async { Ok(()) })
            .launch_session(|_params, _ctx| async { Ok(()) })
            .into();

        assert!(registry.is_implemented(methods::PARTICIPATE));
        assert!(registry.is_implemented(methods::LAUNCH_SESSION));
        assert!(!registry.is_implemented(methods::CANCEL_PARTICIPATION));
    }

    #[test]
    fn test_update_gathering_reads_id_from_payload() {
        let gathering = Gathering {
            id: 0x0102_0304,
            description: "lobby".to_string(),
            ..Gathering::default()
        };

        let params: Decoded<UpdateGatheringParams> =
            decode_params(holder_bytes(&gathering), VersionContext::default());
        let params = params.unwrap();

        assert_eq!(params.gathering_id, 0x0102_0304);
        assert_eq!(params.gathering.type_name, GATHERING_TYPE_NAME);
        assert_eq!(
            params.gathering.decode_gathering(VersionContext::default()).unwrap().gathering(),
            &gathering
        );
    }

    #[test]
    fn test_update_gathering_empty_payload_keeps_holder() {
        let mut out = StreamOut::new();
        AnyDataHolder::new(GATHERING_TYPE_NAME, bytes::Bytes::new()).write(&mut out);

        let params: Decoded<UpdateGatheringParams> = decode_params(out.freeze(), VersionContext::default());
        let rejected = params.unwrap_err();

        assert!(matches!(rejected.error, DecodeError::Truncated { offset: 0, .. }));
        assert_eq!(rejected.partial.gathering.type_name, GATHERING_TYPE_NAME);
        assert_eq!(rejected.partial.gathering_id, 0);
    }

    #[test]
    fn test_set_state_second_field_truncated() {
        let mut out = StreamOut::new();
        out.write_u32(77).write_u16(1);

        let params: Decoded<SetStateParams> = decode_params(out.freeze(), VersionContext::default());
        let rejected = params.unwrap_err();

        assert!(matches!(rejected.error, DecodeError::Truncated { offset: 4, needed: 4, remaining: 2 }));
        assert_eq!(
            rejected.partial,
            SetStateParams {
                gathering_id: 77,
                state: 0
            }
        );
    }
}
