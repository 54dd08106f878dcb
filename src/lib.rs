//! # nex-rmc
//!
//! Method dispatch and structure codec for NEX RMC game services.
//!
//! The transport engine hands this crate complete request frames and takes
//! back encoded responses. In between:
//!
//! - **Codec**: bounds-checked parameter decoding and the matching encoder,
//!   including version-gated composite structures
//! - **Handlers**: per-protocol method tables; handlers always run and
//!   receive either their decoded parameters or the decode error
//! - **Dispatcher**: routes frames by protocol and method, answering unknown
//!   methods with `Core::NotImplemented`
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use nex_rmc::handler::ClientHandle;
//! use nex_rmc::protocols::MatchmakingProtocol;
//! use nex_rmc::writer::spawn_writer_task_default;
//! use nex_rmc::{Connection, DispatcherBuilder, VersionContext};
//!
//! # async fn run(
//! #     socket: tokio::net::TcpStream,
//! #     frames: tokio::sync::mpsc::Receiver<bytes::Bytes>,
//! # ) {
//! let dispatcher = Arc::new(
//!     DispatcherBuilder::new()
//!         .protocol(MatchmakingProtocol::new().set_state(|params, ctx| async move {
//!             match params {
//!                 Ok(p) => tracing::info!(gathering_id = p.gathering_id, state = p.state, "set state"),
//!                 Err(rejected) => tracing::warn!(error = %rejected.error, "bad SetState"),
//!             }
//!             ctx.respond(bytes::Bytes::new()).await
//!         }))
//!         .build(),
//! );
//!
//! let (writer, _task) = spawn_writer_task_default(socket);
//! let conn = Connection::new(ClientHandle::new(1), VersionContext::new(3, 5, 0), writer);
//! dispatcher.serve(frames, conn).await;
//! # }
//! ```

pub mod codec;
pub mod dispatcher;
pub mod error;
pub mod handler;
pub mod protocol;
pub mod protocols;
pub mod writer;

pub use codec::VersionContext;
pub use dispatcher::{Connection, DispatchOutcome, Dispatcher, DispatcherBuilder, DispatcherConfig};
pub use error::{DecodeError, RmcError};
pub use handler::CallContext;
