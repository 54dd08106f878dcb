//! Handler module - method registration and invocation.
//!
//! Provides:
//! - [`MethodRegistry`] - maps method IDs to handlers for one protocol
//! - [`CallContext`] - who called and how to answer
//! - [`Decoded`] - decoded parameters, or the decode error with partial fields
//!
//! Handlers always run, even when decoding failed; they receive
//! `Err(Rejected { error, partial })` and decide how to answer.

mod context;
mod registry;

pub use context::{CallContext, ClientHandle};
pub use registry::{
    decode_params, BoxFuture, Decoded, Handler, HandlerResult, Invocation, MethodLookup,
    MethodRegistry, Rejected, TypedHandler,
};
