//! Method registry for one RMC protocol.
//!
//! The registry maps numeric method IDs to handlers. A protocol declares every
//! method it knows when it is constructed; a declared method without a handler
//! is answered exactly like an unknown one.
//!
//! # Example
//!
//! ```
//! use nex_rmc::codec::{MethodParams, ParameterCursor, DecodeResult, VersionContext};
//! use nex_rmc::handler::{Decoded, MethodLookup, MethodRegistry};
//!
//! #[derive(Default)]
//! struct Ping {
//!     nonce: u32,
//! }
//!
//! impl MethodParams for Ping {
//!     fn decode_into(&mut self, cursor: &mut ParameterCursor, _: VersionContext) -> DecodeResult<()> {
//!         self.nonce = cursor.read_u32()?;
//!         Ok(())
//!     }
//! }
//!
//! let mut registry = MethodRegistry::new(0x7F, "Ping");
//! registry.declare(1, "Ping");
//! registry.register(1, |params: Decoded<Ping>, _ctx| async move {
//!     let _ = params;
//!     Ok(())
//! });
//!
//! assert!(matches!(registry.lookup(1), MethodLookup::Ready { .. }));
//! ```

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::marker::PhantomData;
use std::pin::Pin;

use bytes::Bytes;

use super::CallContext;
use crate::codec::{MethodParams, ParameterCursor, VersionContext};
use crate::error::{DecodeError, Result};

/// Result type for handler functions.
pub type HandlerResult = Result<()>;

/// Boxed future for handler results.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Parameters delivered to a handler.
///
/// `Ok` carries every field. `Err` carries the first decode failure together
/// with the fields read before it; everything after it is `Default`.
pub type Decoded<T> = std::result::Result<T, Rejected<T>>;

/// A parameter list whose decode failed part-way.
#[derive(Debug, Clone, PartialEq)]
pub struct Rejected<T> {
    pub error: DecodeError,
    pub partial: T,
}

/// Decode a method's parameter list from a fresh cursor.
pub fn decode_params<T: MethodParams>(parameters: Bytes, version: VersionContext) -> Decoded<T> {
    let mut cursor = ParameterCursor::new(parameters);
    let mut params = T::default();

    match params.decode_into(&mut cursor, version) {
        Ok(()) => {
            if !cursor.is_exhausted() {
                tracing::trace!(
                    trailing = cursor.remaining(),
                    "ignoring trailing parameter bytes"
                );
            }
            Ok(params)
        }
        Err(error) => Err(Rejected {
            error,
            partial: params,
        }),
    }
}

/// A handler call whose parameters have already been decoded.
pub struct Invocation {
    /// The decode failure handed to the handler, if any.
    pub decode_error: Option<DecodeError>,
    /// The handler future, ready to be spawned.
    pub future: BoxFuture<'static, HandlerResult>,
}

/// Trait for handler functions.
pub trait Handler: Send + Sync + 'static {
    /// Decode `parameters` synchronously and build the handler future.
    fn prepare(&self, parameters: Bytes, ctx: CallContext) -> Invocation;
}

/// Wrapper that decodes the parameter list before calling the handler.
pub struct TypedHandler<F, T, Fut>
where
    F: Fn(Decoded<T>, CallContext) -> Fut + Send + Sync + 'static,
    T: MethodParams,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    handler: F,
    _phantom: PhantomData<fn(T) -> Fut>,
}

impl<F, T, Fut> TypedHandler<F, T, Fut>
where
    F: Fn(Decoded<T>, CallContext) -> Fut + Send + Sync + 'static,
    T: MethodParams,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    /// Create a new typed handler.
    pub fn new(handler: F) -> Self {
        Self {
            handler,
            _phantom: PhantomData,
        }
    }
}

impl<F, T, Fut> Handler for TypedHandler<F, T, Fut>
where
    F: Fn(Decoded<T>, CallContext) -> Fut + Send + Sync + 'static,
    T: MethodParams,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    fn prepare(&self, parameters: Bytes, ctx: CallContext) -> Invocation {
        let decoded = decode_params::<T>(parameters, ctx.version());
        let decode_error = decoded.as_ref().err().map(|r| r.error.clone());

        Invocation {
            decode_error,
            future: Box::pin((self.handler)(decoded, ctx)),
        }
    }
}

/// Entry for a declared or registered method.
struct MethodEntry {
    name: Option<&'static str>,
    handler: Option<Box<dyn Handler>>,
}

/// Result of looking a method up.
pub enum MethodLookup<'a> {
    /// A handler is registered.
    Ready {
        name: Option<&'static str>,
        handler: &'a dyn Handler,
    },
    /// The method is declared but no handler was ever supplied.
    Unset { name: Option<&'static str> },
    /// The method is unknown to this protocol.
    Absent,
}

/// Registry mapping method IDs to handlers for one protocol.
pub struct MethodRegistry {
    protocol_id: u8,
    name: &'static str,
    methods: HashMap<u32, MethodEntry>,
}

impl MethodRegistry {
    /// Create a new empty registry.
    pub fn new(protocol_id: u8, name: &'static str) -> Self {
        Self {
            protocol_id,
            name,
            methods: HashMap::new(),
        }
    }

    #[inline]
    pub fn protocol_id(&self) -> u8 {
        self.protocol_id
    }

    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Declare a method without a handler.
    ///
    /// An existing handler for the same ID is kept.
    pub fn declare(&mut self, method_id: u32, name: &'static str) {
        self.methods
            .entry(method_id)
            .and_modify(|entry| entry.name = Some(name))
            .or_insert(MethodEntry {
                name: Some(name),
                handler: None,
            });
    }

    /// Register a typed handler.
    ///
    /// Registering the same method ID again replaces the previous handler.
    pub fn register<T, F, Fut>(&mut self, method_id: u32, handler: F)
    where
        F: Fn(Decoded<T>, CallContext) -> Fut + Send + Sync + 'static,
        T: MethodParams,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.register_boxed(method_id, Box::new(TypedHandler::new(handler)));
    }

    /// Register an already boxed handler.
    pub fn register_boxed(&mut self, method_id: u32, handler: Box<dyn Handler>) {
        let entry = self.methods.entry(method_id).or_insert(MethodEntry {
            name: None,
            handler: None,
        });
        entry.handler = Some(handler);
    }

    /// Look up a method by ID.
    pub fn lookup(&self, method_id: u32) -> MethodLookup<'_> {
        match self.methods.get(&method_id) {
            Some(MethodEntry {
                name,
                handler: Some(handler),
            }) => MethodLookup::Ready {
                name: *name,
                handler: handler.as_ref(),
            },
            Some(MethodEntry {
                name,
                handler: None,
            }) => MethodLookup::Unset { name: *name },
            None => MethodLookup::Absent,
        }
    }

    /// Get method name by ID.
    pub fn method_name(&self, method_id: u32) -> Option<&'static str> {
        self.methods.get(&method_id).and_then(|e| e.name)
    }

    /// Check if a handler is registered for `method_id`.
    pub fn is_implemented(&self, method_id: u32) -> bool {
        matches!(self.lookup(method_id), MethodLookup::Ready { .. })
    }

    /// Number of declared or registered methods.
    pub fn len(&self) -> usize {
        self.methods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }

    /// Fold `other` into this registry; its handlers and names win.
    pub fn merge(&mut self, other: MethodRegistry) {
        for (method_id, entry) in other.methods {
            let slot = self.methods.entry(method_id).or_insert(MethodEntry {
                name: None,
                handler: None,
            });
            if entry.name.is_some() {
                slot.name = entry.name;
            }
            if entry.handler.is_some() {
                slot.handler = entry.handler;
            }
        }
    }
}

impl fmt::Debug for MethodRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut ids: Vec<_> = self.methods.keys().copied().collect();
        ids.sort_unstable();
        f.debug_struct("MethodRegistry")
            .field("protocol_id", &self.protocol_id)
            .field("name", &self.name)
            .field("methods", &ids)
            .finish()
    }
}
