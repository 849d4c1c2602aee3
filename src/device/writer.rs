//! Shared device write path
//!
//! Every session forwards client input through one `DeviceWriter`. The
//! handle only queues records; a single writer task owns the device's write
//! half and writes each record in full before taking the next. Records from
//! different sessions therefore never interleave, and a session that is torn
//! down while its record is in flight cannot leave a partial record behind.

use std::io;

use bytes::Bytes;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::{mpsc, oneshot};

use crate::error::{Error, Result};

/// Records waiting for the writer task
const WRITE_QUEUE_CAPACITY: usize = 64;

type WriteRequest = (Bytes, oneshot::Sender<io::Result<()>>);

/// Cloneable handle to the device's write half
#[derive(Debug, Clone)]
pub struct DeviceWriter {
    tx: mpsc::Sender<WriteRequest>,
}

impl DeviceWriter {
    /// Spawn the writer task that owns `writer`
    ///
    /// Must be called from within a tokio runtime. The task ends when every
    /// handle is dropped, or after the first failed write.
    pub fn new<W>(writer: W) -> Self
    where
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (tx, rx) = mpsc::channel(WRITE_QUEUE_CAPACITY);
        tokio::spawn(write_loop(writer, rx));
        Self { tx }
    }

    /// Write one complete record and wait until it is flushed
    ///
    /// Once queued, the record is written whole even if the caller stops
    /// waiting.
    pub async fn write_record(&self, record: Bytes) -> Result<()> {
        let (done_tx, done_rx) = oneshot::channel();
        self.tx
            .send((record, done_tx))
            .await
            .map_err(|_| writer_stopped())?;
        let written = done_rx.await.map_err(|_| writer_stopped())?;
        written?;
        Ok(())
    }

    /// Whether the writer task has stopped
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

async fn write_loop<W>(mut writer: W, mut rx: mpsc::Receiver<WriteRequest>)
where
    W: AsyncWrite + Unpin,
{
    while let Some((record, done)) = rx.recv().await {
        let result = write_one(&mut writer, &record).await;
        let failed = result.is_err();
        if let Err(e) = &result {
            tracing::error!(error = %e, "Device write failed");
        }
        let _ = done.send(result);
        if failed {
            break;
        }
    }
    tracing::debug!("Device writer stopped");
}

async fn write_one<W>(writer: &mut W, record: &[u8]) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(record).await?;
    writer.flush().await
}

fn writer_stopped() -> Error {
    Error::Io(io::Error::new(
        io::ErrorKind::BrokenPipe,
        "device writer stopped",
    ))
}
