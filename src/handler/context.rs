//! Call context for handlers.
//!
//! Provides who is calling and how to answer:
//! - `respond` - send a success response with encoded data
//! - `respond_error` - send an error result code
//! - `not_implemented` - send `Core::NotImplemented`

use std::net::SocketAddr;

use bytes::Bytes;

use crate::codec::VersionContext;
use crate::error::Result;
use crate::protocol::{RequestHeader, RmcResponse};
use crate::writer::ResponseWriter;

/// Identity of the connected client that issued a call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientHandle {
    /// Transport-assigned connection identifier.
    pub connection_id: u32,
    /// Principal ID once the client has authenticated.
    pub pid: Option<u32>,
    /// Remote address, if the transport knows it.
    pub address: Option<SocketAddr>,
}

impl ClientHandle {
    pub fn new(connection_id: u32) -> Self {
        Self {
            connection_id,
            ..Self::default()
        }
    }

    pub fn with_pid(mut self, pid: u32) -> Self {
        self.pid = Some(pid);
        self
    }

    pub fn with_address(mut self, address: SocketAddr) -> Self {
        self.address = Some(address);
        self
    }
}

/// Context passed to every handler alongside its decoded parameters.
///
/// `CallContext` is `Clone` and can be moved into further tasks.
#[derive(Debug, Clone)]
pub struct CallContext {
    header: RequestHeader,
    client: ClientHandle,
    version: VersionContext,
    writer: Option<ResponseWriter>,
}

impl CallContext {
    /// Create a context without a writer (responses are discarded).
    pub fn new(header: RequestHeader, client: ClientHandle, version: VersionContext) -> Self {
        Self {
            header,
            client,
            version,
            writer: None,
        }
    }

    /// Create a context that answers through `writer`.
    pub fn with_writer(
        header: RequestHeader,
        client: ClientHandle,
        version: VersionContext,
        writer: ResponseWriter,
    ) -> Self {
        Self {
            header,
            client,
            version,
            writer: Some(writer),
        }
    }

    #[inline]
    pub fn protocol_id(&self) -> u8 {
        self.header.protocol_id
    }

    #[inline]
    pub fn method_id(&self) -> u32 {
        self.header.method_id
    }

    #[inline]
    pub fn call_id(&self) -> u32 {
        self.header.call_id
    }

    #[inline]
    pub fn client(&self) -> &ClientHandle {
        &self.client
    }

    /// Version negotiated for the calling connection.
    #[inline]
    pub fn version(&self) -> VersionContext {
        self.version
    }

    /// Send a success response carrying `data`.
    pub async fn respond(&self, data: Bytes) -> Result<()> {
        self.send(RmcResponse::success(
            self.protocol_id(),
            self.method_id(),
            self.call_id(),
            data,
        ))
        .await
    }

    /// Send an error response with `code`.
    pub async fn respond_error(&self, code: u32) -> Result<()> {
        self.send(RmcResponse::error(self.protocol_id(), self.call_id(), code))
            .await
    }

    /// Send `Core::NotImplemented` for this call.
    pub async fn not_implemented(&self) -> Result<()> {
        self.send(RmcResponse::not_implemented(self.protocol_id(), self.call_id()))
            .await
    }

    async fn send(&self, response: RmcResponse) -> Result<()> {
        match &self.writer {
            Some(writer) => writer.send(response).await,
            // No writer configured (testing mode)
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::ResponseBody;

    fn header() -> RequestHeader {
        RequestHeader::new(0x76, 2, 42)
    }

    #[test]
    fn test_context_accessors() {
        let client = ClientHandle::new(7).with_pid(1001);
        let ctx = CallContext::new(header(), client, VersionContext::new(3, 5, 0));

        assert_eq!(ctx.protocol_id(), 0x76);
        assert_eq!(ctx.method_id(), 2);
        assert_eq!(ctx.call_id(), 42);
        assert_eq!(ctx.client().pid, Some(1001));
        assert_eq!(ctx.version().raw(), 30500);
    }

    #[tokio::test]
    async fn test_respond_without_writer() {
        let ctx = CallContext::new(header(), ClientHandle::new(1), VersionContext::default());

        assert!(ctx.respond(Bytes::from_static(b"x")).await.is_ok());
        assert!(ctx.respond_error(1).await.is_ok());
        assert!(ctx.not_implemented().await.is_ok());
    }

    #[tokio::test]
    async fn test_respond_with_writer() {
        let (writer, mut rx) = ResponseWriter::channel(4);
        let ctx = CallContext::with_writer(
            header(),
            ClientHandle::new(1),
            VersionContext::default(),
            writer,
        );

        ctx.respond(Bytes::from_static(b"blob")).await.unwrap();
        ctx.not_implemented().await.unwrap();

        let first = rx.recv().await.unwrap();
        assert_eq!(first.call_id, 42);
        assert_eq!(
            first.body,
            ResponseBody::Success {
                method_id: 2,
                data: Bytes::from_static(b"blob")
            }
        );

        let second = rx.recv().await.unwrap();
        assert!(second.is_not_implemented());
    }
}
