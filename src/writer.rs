//! Response writer - the outbound half of the transport boundary.
//!
//! Handlers and the dispatcher never touch the socket. They push
//! [`RmcResponse`] values into a [`ResponseWriter`], which is a cloneable mpsc
//! handle. The transport engine either drains the receiver itself
//! ([`ResponseWriter::channel`]) or lets [`spawn_writer_task`] encode and
//! write the responses to any `AsyncWrite`.
//!
//! # Architecture
//!
//! ```text
//! Handler 1  ─┐
//! Handler 2  ─┼─► mpsc::Sender<RmcResponse> ─► Writer Task ─► AsyncWrite
//! Dispatcher ─┘
//! ```

use serde::Deserialize;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::{Result, RmcError};
use crate::protocol::RmcResponse;

/// Default channel capacity.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

/// Maximum responses to batch before a flush.
const MAX_BATCH_SIZE: usize = 64;

/// Configuration for the response writer.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WriterConfig {
    /// Channel capacity for the response queue.
    pub channel_capacity: usize,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

/// Handle for queueing responses on one connection.
///
/// This is cheaply cloneable and can be shared across handler tasks.
#[derive(Debug, Clone)]
pub struct ResponseWriter {
    tx: mpsc::Sender<RmcResponse>,
}

impl ResponseWriter {
    /// Create a writer whose responses are delivered to the returned receiver.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<RmcResponse>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }

    /// Queue a response, waiting while the channel is full.
    pub async fn send(&self, response: RmcResponse) -> Result<()> {
        self.tx
            .send(response)
            .await
            .map_err(|_| RmcError::ConnectionClosed)
    }

    /// Queue a response without waiting.
    pub fn try_send(&self, response: RmcResponse) -> Result<()> {
        self.tx.try_send(response).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => RmcError::WriterFull,
            mpsc::error::TrySendError::Closed(_) => RmcError::ConnectionClosed,
        })
    }

    /// Check if the receiving side has gone away.
    #[inline]
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Spawn the writer task and return a handle for sending responses.
///
/// # Returns
///
/// A tuple of `(ResponseWriter, JoinHandle)` where the JoinHandle resolves once
/// every handle has been dropped and the queue is drained.
pub fn spawn_writer_task<W>(writer: W, config: WriterConfig) -> (ResponseWriter, JoinHandle<Result<()>>)
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (handle, rx) = ResponseWriter::channel(config.channel_capacity);
    let task = tokio::spawn(writer_loop(rx, writer));
    (handle, task)
}

/// Spawn the writer task with default configuration.
pub fn spawn_writer_task_default<W>(writer: W) -> (ResponseWriter, JoinHandle<Result<()>>)
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    spawn_writer_task(writer, WriterConfig::default())
}

/// Receive responses, encode them, and write them out in batches.
async fn writer_loop<W>(mut rx: mpsc::Receiver<RmcResponse>, mut writer: W) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    loop {
        let first = match rx.recv().await {
            Some(r) => r,
            None => return Ok(()),
        };

        let mut batch = Vec::with_capacity(MAX_BATCH_SIZE);
        batch.push(first);

        while batch.len() < MAX_BATCH_SIZE {
            match rx.try_recv() {
                Ok(response) => batch.push(response),
                Err(_) => break,
            }
        }

        if let Err(e) = write_batch(&mut writer, &batch).await {
            tracing::error!(error = %e, batch = batch.len(), "failed to write responses");
            return Err(e);
        }
    }
}

async fn write_batch<W>(writer: &mut W, batch: &[RmcResponse]) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    for response in batch {
        writer.write_all(&response.encode()).await?;
    }
    writer.flush().await?;
    Ok(())
}
