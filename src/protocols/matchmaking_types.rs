//! Structures shared by the matchmaking protocols.
//!
//! [`MatchmakeSession`] extends [`Gathering`] by composition: it owns a
//! `Gathering` and decodes it before its own fields. Fields added in later
//! protocol revisions are only on the wire when the negotiated version meets
//! their threshold.

use bytes::Bytes;
use indexmap::IndexMap;
use serde::Serialize;

use crate::codec::{
    DateTime, DecodeResult, ParameterCursor, StreamOut, Structure, Variant, VersionContext,
    NEX_V3_0_0, NEX_V3_5_0, NEX_V4_0_0,
};
use crate::error::DecodeError;

/// A joinable grouping of participants.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Gathering {
    pub id: u32,
    pub owner_pid: u32,
    pub host_pid: u32,
    pub minimum_participants: u16,
    pub maximum_participants: u16,
    pub participation_policy: u32,
    pub policy_argument: u32,
    pub flags: u32,
    pub state: u32,
    pub description: String,
}

impl Structure for Gathering {
    fn extract(cursor: &mut ParameterCursor, _version: VersionContext) -> DecodeResult<Self> {
        Ok(Self {
            id: cursor.read_u32()?,
            owner_pid: cursor.read_u32()?,
            host_pid: cursor.read_u32()?,
            minimum_participants: cursor.read_u16()?,
            maximum_participants: cursor.read_u16()?,
            participation_policy: cursor.read_u32()?,
            policy_argument: cursor.read_u32()?,
            flags: cursor.read_u32()?,
            state: cursor.read_u32()?,
            description: cursor.read_string()?,
        })
    }

    fn write(&self, out: &mut StreamOut, _version: VersionContext) {
        out.write_u32(self.id)
            .write_u32(self.owner_pid)
            .write_u32(self.host_pid)
            .write_u16(self.minimum_participants)
            .write_u16(self.maximum_participants)
            .write_u32(self.participation_policy)
            .write_u32(self.policy_argument)
            .write_u32(self.flags)
            .write_u32(self.state)
            .write_string(&self.description);
    }
}

/// Free-form matchmaking parameters, kept in wire order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MatchmakeParam {
    pub parameters: IndexMap<String, Variant>,
}

impl Structure for MatchmakeParam {
    fn extract(cursor: &mut ParameterCursor, _version: VersionContext) -> DecodeResult<Self> {
        Ok(Self {
            parameters: cursor.read_map(ParameterCursor::read_string, ParameterCursor::read_variant)?,
        })
    }

    fn write(&self, out: &mut StreamOut, _version: VersionContext) {
        out.write_map(
            &self.parameters,
            |out, key| {
                out.write_string(key);
            },
            |out, value| {
                out.write_variant(value);
            },
        );
    }
}

/// A gathering extended with matchmaking session attributes.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MatchmakeSession {
    pub gathering: Gathering,
    pub game_mode: u32,
    pub attributes: Vec<u32>,
    pub open_participation: bool,
    pub matchmake_system_type: u32,
    pub application_data: Bytes,
    pub participation_count: u32,
    /// NEX 3.5.0+
    pub progress_score: u8,
    /// NEX 3.0.0+
    pub session_key: Bytes,
    /// NEX 3.5.0+
    pub option: u32,
    /// NEX 4.0.0+ (this and every field below)
    pub matchmake_param: MatchmakeParam,
    pub started_time: DateTime,
    pub user_password: String,
    pub refer_gid: u32,
    pub user_password_enabled: bool,
    pub system_password_enabled: bool,
    pub code_word: String,
}

impl Structure for MatchmakeSession {
    fn extract(cursor: &mut ParameterCursor, version: VersionContext) -> DecodeResult<Self> {
        let mut session = Self {
            gathering: Gathering::extract(cursor, version)?,
            game_mode: cursor.read_u32()?,
            attributes: cursor.read_list()?,
            open_participation: cursor.read_bool()?,
            matchmake_system_type: cursor.read_u32()?,
            application_data: cursor.read_buffer()?,
            participation_count: cursor.read_u32()?,
            ..Self::default()
        };

        if version.supports(NEX_V3_5_0) {
            session.progress_score = cursor.read_u8()?;
        }

        if version.supports(NEX_V3_0_0) {
            session.session_key = cursor.read_buffer()?;
        }

        if version.supports(NEX_V3_5_0) {
            session.option = cursor.read_u32()?;
        }

        if version.supports(NEX_V4_0_0) {
            session.matchmake_param = cursor.read_structure(version)?;
            session.started_time = DateTime::from_raw(cursor.read_u64()?);
            session.user_password = cursor.read_string()?;
            session.refer_gid = cursor.read_u32()?;
            session.user_password_enabled = cursor.read_bool()?;
            session.system_password_enabled = cursor.read_bool()?;
            session.code_word = cursor.read_string()?;
        }

        Ok(session)
    }

    fn write(&self, out: &mut StreamOut, version: VersionContext) {
        out.write_structure(&self.gathering, version)
            .write_u32(self.game_mode)
            .write_list(&self.attributes)
            .write_bool(self.open_participation)
            .write_u32(self.matchmake_system_type)
            .write_buffer(&self.application_data)
            .write_u32(self.participation_count);

        if version.supports(NEX_V3_5_0) {
            out.write_u8(self.progress_score);
        }

        if version.supports(NEX_V3_0_0) {
            out.write_buffer(&self.session_key);
        }

        if version.supports(NEX_V3_5_0) {
            out.write_u32(self.option);
        }

        if version.supports(NEX_V4_0_0) {
            out.write_structure(&self.matchmake_param, version)
                .write_u64(self.started_time.raw())
                .write_string(&self.user_password)
                .write_u32(self.refer_gid)
                .write_bool(self.user_password_enabled)
                .write_bool(self.system_password_enabled)
                .write_string(&self.code_word);
        }
    }
}

/// Gathering type names carried by an [`AnyDataHolder`].
pub const GATHERING_TYPE_NAME: &str = "Gathering";
pub const MATCHMAKE_SESSION_TYPE_NAME: &str = "MatchmakeSession";

/// A structure wrapped with its type name, as sent by RegisterGathering and
/// UpdateGathering.
///
/// ```text
/// type_name string | outer length u32 | payload buffer
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnyDataHolder {
    pub type_name: String,
    pub payload: Bytes,
}

/// A gathering decoded out of an [`AnyDataHolder`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum GatheringKind {
    Gathering(Gathering),
    MatchmakeSession(MatchmakeSession),
}

impl GatheringKind {
    /// The base gathering, whichever kind this is.
    pub fn gathering(&self) -> &Gathering {
        match self {
            GatheringKind::Gathering(g) => g,
            GatheringKind::MatchmakeSession(s) => &s.gathering,
        }
    }
}

impl AnyDataHolder {
    /// Wrap an encoded structure.
    pub fn new(type_name: impl Into<String>, payload: Bytes) -> Self {
        Self {
            type_name: type_name.into(),
            payload,
        }
    }

    /// Read the holder, leaving its payload undecoded.
    pub fn extract(cursor: &mut ParameterCursor) -> DecodeResult<Self> {
        let type_name = cursor.read_string()?;
        let _outer_length = cursor.read_u32()?;
        let payload = cursor.read_buffer()?;
        Ok(Self { type_name, payload })
    }

    pub fn write(&self, out: &mut StreamOut) {
        out.write_string(&self.type_name)
            .write_u32(self.payload.len() as u32 + 4)
            .write_buffer(&self.payload);
    }

    /// First `u32` of the payload: the gathering ID.
    pub fn gathering_id(&self) -> DecodeResult<u32> {
        ParameterCursor::new(self.payload.clone()).read_u32()
    }

    /// Decode the payload with a fresh cursor according to the type name.
    ///
    /// Offsets in returned errors are relative to the payload.
    pub fn decode_gathering(&self, version: VersionContext) -> DecodeResult<GatheringKind> {
        let mut cursor = ParameterCursor::new(self.payload.clone());
        match self.type_name.as_str() {
            GATHERING_TYPE_NAME => Ok(GatheringKind::Gathering(cursor.read_structure(version)?)),
            MATCHMAKE_SESSION_TYPE_NAME => Ok(GatheringKind::MatchmakeSession(
                cursor.read_structure(version)?,
            )),
            other => Err(DecodeError::malformed(
                0,
                format!("unsupported gathering type {other:?}"),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_gathering() -> Gathering {
        Gathering {
            id: 0x1234,
            owner_pid: 1001,
            host_pid: 1002,
            minimum_participants: 1,
            maximum_participants: 4,
            participation_policy: 98,
            policy_argument: 0,
            flags: 0x200,
            state: 1,
            description: "band practice".to_string(),
        }
    }

    #[test]
    fn test_gathering_layout() {
        let mut out = StreamOut::new();
        out.write_structure(&sample_gathering(), VersionContext::default());
        let bytes = out.to_vec();

        // 7 u32 + 2 u16 = 32 bytes, then "band practice\0" with its length.
        assert_eq!(bytes.len(), 32 + 4 + 14);
        assert_eq!(&bytes[0..4], &0x1234u32.to_le_bytes());
        assert_eq!(&bytes[12..14], &1u16.to_le_bytes());
        assert_eq!(&bytes[14..16], &4u16.to_le_bytes());
        assert_eq!(&bytes[32..36], &14u32.to_le_bytes());
    }

    #[test]
    fn test_gathering_decode_leaves_cursor_after_last_field() {
        let mut out = StreamOut::new();
        out.write_structure(&sample_gathering(), VersionContext::default())
            .write_u32(0xDEAD_BEEF);

        let mut cursor = ParameterCursor::new(out.freeze());
        let gathering: Gathering = cursor.read_structure(VersionContext::default()).unwrap();

        assert_eq!(gathering, sample_gathering());
        assert_eq!(cursor.read_u32().unwrap(), 0xDEAD_BEEF);
    }

    #[test]
    fn test_matchmake_param_duplicate_key_keeps_later_value() {
        let mut out = StreamOut::new();
        out.write_u32(2)
            .write_string("a")
            .write_variant(&Variant::Int64(1))
            .write_string("a")
            .write_variant(&Variant::String("later".to_string()));

        let mut cursor = ParameterCursor::new(out.freeze());
        let param: MatchmakeParam = cursor.read_structure(VersionContext::default()).unwrap();

        assert_eq!(param.parameters.len(), 1);
        assert_eq!(param.parameters["a"], Variant::String("later".to_string()));
    }

    #[test]
    fn test_matchmake_param_reencodes_in_wire_order() {
        let mut out = StreamOut::new();
        out.write_u32(2)
            .write_string("b")
            .write_variant(&Variant::Bool(false))
            .write_string("a")
            .write_variant(&Variant::UInt64(9));
        let wire = out.freeze();

        let mut cursor = ParameterCursor::new(wire.clone());
        let param: MatchmakeParam = cursor.read_structure(VersionContext::default()).unwrap();
        let keys: Vec<_> = param.parameters.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["b", "a"]);

        let mut again = StreamOut::new();
        again.write_structure(&param, VersionContext::default());
        assert_eq!(again.freeze(), wire);
    }

    #[test]
    fn test_gathering_kind_json_shape() {
        let kind = GatheringKind::Gathering(sample_gathering());
        assert_eq!(
            serde_json::to_value(&kind).unwrap(),
            serde_json::json!({
                "Gathering": {
                    "id": 0x1234,
                    "owner_pid": 1001,
                    "host_pid": 1002,
                    "minimum_participants": 1,
                    "maximum_participants": 4,
                    "participation_policy": 98,
                    "policy_argument": 0,
                    "flags": 0x200,
                    "state": 1,
                    "description": "band practice"
                }
            })
        );
    }

    #[test]
    fn test_session_json_shape() {
        let mut parameters = IndexMap::new();
        parameters.insert("@SR".to_string(), Variant::Bool(true));
        parameters.insert("@GIR".to_string(), Variant::Int64(-6));
        let session = MatchmakeSession {
            gathering: sample_gathering(),
            session_key: Bytes::from_static(b"key"),
            matchmake_param: MatchmakeParam { parameters },
            started_time: DateTime::from_raw(42),
            ..MatchmakeSession::default()
        };

        let json = serde_json::to_value(&session).unwrap();
        assert_eq!(json["gathering"]["description"], "band practice");
        assert_eq!(json["session_key"], serde_json::json!([107, 101, 121]));
        assert_eq!(
            json["matchmake_param"],
            serde_json::json!({ "parameters": { "@SR": true, "@GIR": -6 } })
        );
        assert_eq!(json["started_time"], 42);
        assert_eq!(json["code_word"], "");
    }

    #[test]
    fn test_session_fail_fast_propagates_first_error() {
        let version = VersionContext::new(4, 0, 0);
        let mut out = StreamOut::new();
        out.write_structure(&sample_gathering(), version)
            .write_u32(5) // game mode
            .write_u32(10); // attribute count with no elements

        let mut cursor = ParameterCursor::new(out.freeze());
        let err = cursor.read_structure::<MatchmakeSession>(version).unwrap_err();

        assert!(matches!(err, DecodeError::Truncated { offset: 58, needed: 40, .. }));
        assert_eq!(cursor.position(), 0);
    }

    #[test]
    fn test_any_data_holder_redecodes_payload() {
        let version = VersionContext::new(3, 0, 0);
        let session = MatchmakeSession {
            gathering: sample_gathering(),
            game_mode: 3,
            session_key: Bytes::from_static(b"key"),
            ..MatchmakeSession::default()
        };

        let mut payload = StreamOut::new();
        payload.write_structure(&session, version);
        let holder = AnyDataHolder::new(MATCHMAKE_SESSION_TYPE_NAME, payload.freeze());

        let mut out = StreamOut::new();
        holder.write(&mut out);
        let mut cursor = ParameterCursor::new(out.freeze());
        let decoded = AnyDataHolder::extract(&mut cursor).unwrap();
        assert!(cursor.is_exhausted());

        assert_eq!(decoded.gathering_id().unwrap(), 0x1234);
        assert_eq!(
            decoded.decode_gathering(version).unwrap(),
            GatheringKind::MatchmakeSession(session)
        );
    }

    #[test]
    fn test_any_data_holder_unknown_type() {
        let holder = AnyDataHolder::new("PersistentGathering", Bytes::new());
        let err = holder.decode_gathering(VersionContext::default()).unwrap_err();
        assert!(matches!(err, DecodeError::Malformed { offset: 0, .. }));
    }
}
