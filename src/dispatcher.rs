//! Dispatcher - routes inbound frames to protocol handlers.
//!
//! The [`DispatcherBuilder`] collects protocol method tables once at startup.
//! The resulting [`Dispatcher`] is immutable and shared across connections
//! behind an `Arc`; lookups take no lock.
//!
//! For every frame:
//! 1. Unknown protocol: logged and ignored, no response.
//! 2. Unknown or unset method: `Core::NotImplemented` is sent, no handler runs.
//! 3. Otherwise parameters are decoded on the calling task and the handler is
//!    spawned with the result. The dispatcher does not wait for it.
//!
//! Handlers for different frames run concurrently, so their relative order is
//! not guaranteed even for frames from one connection.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use nex_rmc::handler::ClientHandle;
//! use nex_rmc::protocols::NintendoManagementProtocol;
//! use nex_rmc::writer::ResponseWriter;
//! use nex_rmc::{Connection, DispatcherBuilder, VersionContext};
//!
//! # async fn run(frames: tokio::sync::mpsc::Receiver<bytes::Bytes>) {
//! let dispatcher = DispatcherBuilder::new()
//!     .protocol(NintendoManagementProtocol::new().get_console_usernames(|params, ctx| async move {
//!         let _friend_code = params.map(|p| p.friend_code);
//!         ctx.respond(bytes::Bytes::new()).await
//!     }))
//!     .build();
//!
//! let (writer, _responses) = ResponseWriter::channel(64);
//! let conn = Connection::new(ClientHandle::new(1), VersionContext::new(3, 5, 0), writer);
//! Arc::new(dispatcher).serve(frames, conn).await;
//! # }
//! ```

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use bytes::Bytes;
use serde::Deserialize;
use tokio::sync::{mpsc, Semaphore};

use crate::codec::{MethodParams, VersionContext};
use crate::error::{DecodeError, Result, RmcError};
use crate::handler::{CallContext, ClientHandle, Decoded, HandlerResult, MethodLookup, MethodRegistry};
use crate::protocol::{RequestFrame, RmcResponse};
use crate::writer::ResponseWriter;

/// Default maximum concurrent handlers.
pub const DEFAULT_MAX_CONCURRENT_HANDLERS: usize = 256;

/// Dispatcher configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DispatcherConfig {
    /// Handlers allowed to run at once; further requests wait for a slot.
    pub max_concurrent_handlers: usize,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            max_concurrent_handlers: DEFAULT_MAX_CONCURRENT_HANDLERS,
        }
    }
}

impl DispatcherConfig {
    /// Parse a configuration document; missing keys take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Per-connection state handed to the dispatcher with every frame.
#[derive(Debug, Clone)]
pub struct Connection {
    pub client: ClientHandle,
    /// Negotiated once per connection.
    pub version: VersionContext,
    pub writer: ResponseWriter,
}

impl Connection {
    pub fn new(client: ClientHandle, version: VersionContext, writer: ResponseWriter) -> Self {
        Self {
            client,
            version,
            writer,
        }
    }
}

/// What the dispatcher did with a frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The handler was spawned. `decode_error` is the failure it was given.
    Dispatched { decode_error: Option<DecodeError> },
    /// `Core::NotImplemented` was queued; no handler ran.
    NotImplemented,
    /// No registry for the protocol; the frame was ignored.
    UnknownProtocol,
    /// The frame was too short to carry a request header.
    Dropped,
}

/// Builder for a [`Dispatcher`].
pub struct DispatcherBuilder {
    protocols: HashMap<u8, MethodRegistry>,
    config: DispatcherConfig,
}

impl DispatcherBuilder {
    pub fn new() -> Self {
        Self {
            protocols: HashMap::new(),
            config: DispatcherConfig::default(),
        }
    }

    /// Add a protocol's method table.
    ///
    /// Adding the same protocol ID twice merges the tables; later handlers win.
    pub fn protocol(mut self, protocol: impl Into<MethodRegistry>) -> Self {
        let registry = protocol.into();
        match self.protocols.get_mut(&registry.protocol_id()) {
            Some(existing) => existing.merge(registry),
            None => {
                self.protocols.insert(registry.protocol_id(), registry);
            }
        }
        self
    }

    /// Register a single handler, creating the protocol table if needed.
    ///
    /// Registering the same `(protocol_id, method_id)` again replaces the
    /// previous handler.
    pub fn register<T, F, Fut>(mut self, protocol_id: u8, method_id: u32, handler: F) -> Self
    where
        F: Fn(Decoded<T>, CallContext) -> Fut + Send + Sync + 'static,
        T: MethodParams,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.protocols
            .entry(protocol_id)
            .or_insert_with(|| MethodRegistry::new(protocol_id, "Custom"))
            .register(method_id, handler);
        self
    }

    pub fn config(mut self, config: DispatcherConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the maximum number of concurrent handlers.
    ///
    /// Default: 256
    pub fn max_concurrent_handlers(mut self, limit: usize) -> Self {
        self.config.max_concurrent_handlers = limit;
        self
    }

    pub fn build(self) -> Dispatcher {
        let limit = self.config.max_concurrent_handlers.max(1);
        tracing::debug!(
            protocols = self.protocols.len(),
            max_concurrent_handlers = limit,
            "dispatcher built"
        );
        Dispatcher {
            protocols: self.protocols,
            semaphore: Arc::new(Semaphore::new(limit)),
        }
    }
}

impl Default for DispatcherBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Routes frames to the registered protocol handlers.
#[derive(Debug)]
pub struct Dispatcher {
    protocols: HashMap<u8, MethodRegistry>,
    semaphore: Arc<Semaphore>,
}

impl Dispatcher {
    pub fn builder() -> DispatcherBuilder {
        DispatcherBuilder::new()
    }

    /// Method table for `protocol_id`, if one is registered.
    pub fn protocol(&self, protocol_id: u8) -> Option<&MethodRegistry> {
        self.protocols.get(&protocol_id)
    }

    /// Dispatch a frame received on `conn`.
    ///
    /// Must be called from within a tokio runtime. Never fails: every error is
    /// either passed to the handler or answered with `Core::NotImplemented`.
    pub fn dispatch(&self, frame: RequestFrame, conn: &Connection) -> DispatchOutcome {
        let header = frame.header;

        let registry = match self.protocols.get(&header.protocol_id) {
            Some(r) => r,
            None => {
                tracing::debug!(
                    error = %RmcError::UnknownProtocol(header.protocol_id),
                    method_id = header.method_id,
                    call_id = header.call_id,
                    "ignoring frame"
                );
                return DispatchOutcome::UnknownProtocol;
            }
        };

        let (name, handler) = match registry.lookup(header.method_id) {
            MethodLookup::Ready { name, handler } => (name, handler),
            MethodLookup::Unset { name } => {
                tracing::warn!(
                    protocol = registry.name(),
                    method = name.unwrap_or("?"),
                    call_id = header.call_id,
                    "no handler set"
                );
                self.send_not_implemented(header.protocol_id, header.call_id, conn);
                return DispatchOutcome::NotImplemented;
            }
            MethodLookup::Absent => {
                let error = RmcError::UnknownMethod {
                    protocol_id: header.protocol_id,
                    method_id: header.method_id,
                };
                tracing::warn!(
                    protocol = registry.name(),
                    call_id = header.call_id,
                    error = %error,
                    "unsupported method"
                );
                self.send_not_implemented(header.protocol_id, header.call_id, conn);
                return DispatchOutcome::NotImplemented;
            }
        };

        let ctx = CallContext::with_writer(header, conn.client.clone(), conn.version, conn.writer.clone());
        let invocation = handler.prepare(frame.parameters, ctx);

        if let Some(e) = &invocation.decode_error {
            tracing::warn!(
                protocol = registry.name(),
                method = name.unwrap_or("?"),
                call_id = header.call_id,
                offset = e.offset(),
                error = %e,
                "failed to decode parameters"
            );
        }

        let semaphore = self.semaphore.clone();
        let future = invocation.future;
        tokio::spawn(async move {
            // Permit is held until the handler completes
            let _permit = match semaphore.acquire_owned().await {
                Ok(p) => p,
                Err(_) => {
                    tracing::error!(call_id = header.call_id, "handler semaphore closed");
                    return;
                }
            };

            if let Err(e) = future.await {
                tracing::error!(
                    protocol_id = header.protocol_id,
                    method_id = header.method_id,
                    call_id = header.call_id,
                    error = %e,
                    "handler error"
                );
            }
        });

        DispatchOutcome::Dispatched {
            decode_error: invocation.decode_error,
        }
    }

    /// Split a raw frame into header and parameters, then dispatch it.
    pub fn dispatch_raw(&self, raw: Bytes, conn: &Connection) -> DispatchOutcome {
        match RequestFrame::decode(raw) {
            Ok(frame) => self.dispatch(frame, conn),
            Err(e) => {
                tracing::warn!(
                    connection_id = conn.client.connection_id,
                    error = %e,
                    "dropping frame without a complete header"
                );
                DispatchOutcome::Dropped
            }
        }
    }

    /// Consume raw frames for one connection until the transport closes the
    /// channel. Each frame is dispatched on its own task.
    pub async fn serve(self: Arc<Self>, mut frames: mpsc::Receiver<Bytes>, conn: Connection) {
        while let Some(raw) = frames.recv().await {
            let dispatcher = self.clone();
            let conn = conn.clone();
            tokio::spawn(async move {
                dispatcher.dispatch_raw(raw, &conn);
            });
        }

        tracing::debug!(
            connection_id = conn.client.connection_id,
            "frame channel closed"
        );
    }

    fn send_not_implemented(&self, protocol_id: u8, call_id: u32, conn: &Connection) {
        let writer = conn.writer.clone();
        tokio::spawn(async move {
            if let Err(e) = writer.send(RmcResponse::not_implemented(protocol_id, call_id)).await {
                tracing::debug!(call_id, error = %e, "could not send NotImplemented");
            }
        });
    }
}
