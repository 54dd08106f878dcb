//! Protocol surfaces served by the dispatcher.
//!
//! Each protocol is a fluent builder that declares its full method table and
//! converts into a [`MethodRegistry`](crate::handler::MethodRegistry):
//!
//! ```
//! use nex_rmc::handler::MethodRegistry;
//! use nex_rmc::protocols::MatchmakingProtocol;
//!
//! let registry: MethodRegistry = MatchmakingProtocol::new()
//!     .participate(|params, ctx| async move {
//!         if let Ok(params) = params {
//!             tracing::info!(gathering_id = params.gathering_id, "participate");
//!         }
//!         ctx.respond(bytes::Bytes::new()).await
//!     })
//!     .into();
//!
//! assert_eq!(registry.protocol_id(), 0x15);
//! ```

pub mod account_management;
pub mod binary_data;
pub mod matchmaking;
pub mod matchmaking_types;
pub mod nintendo_management;

pub use account_management::AccountManagementProtocol;
pub use binary_data::BinaryDataProtocol;
pub use matchmaking::MatchmakingProtocol;
pub use matchmaking_types::{AnyDataHolder, Gathering, GatheringKind, MatchmakeParam, MatchmakeSession};
pub use nintendo_management::{decode_friend_code, NintendoManagementProtocol};
