//! Socket tasks of one established connection

use super::LinkEvent;
use crate::error::{BridgeError, Result};
use std::io;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::timeout;

/// Largest frame the charger sends is 36 bytes
const READ_BUFFER_SIZE: usize = 512;

/// How long `close` waits for queued bytes to reach the socket
const CLOSE_GRACE: Duration = Duration::from_secs(1);

/// Handle to the reader and writer tasks of a connected socket
///
/// Every event the tasks post carries the generation the link was spawned
/// with. Dropping the link aborts both tasks.
pub(crate) struct Link {
    tx: mpsc::UnboundedSender<Vec<u8>>,
    reader: Option<JoinHandle<()>>,
    writer: Option<JoinHandle<io::Result<()>>>,
}

impl Link {
    pub(crate) fn spawn(
        stream: TcpStream,
        events: mpsc::UnboundedSender<LinkEvent>,
        generation: u64,
    ) -> Self {
        let (read_half, write_half) = stream.into_split();
        let (tx, rx) = mpsc::unbounded_channel();

        let reader = tokio::spawn(read_loop(read_half, events.clone(), generation));
        let writer = tokio::spawn(write_loop(write_half, rx, events, generation));

        Self {
            tx,
            reader: Some(reader),
            writer: Some(writer),
        }
    }

    /// A link without a socket; frames land on the other end of `tx`
    #[cfg(test)]
    pub(crate) fn detached(tx: mpsc::UnboundedSender<Vec<u8>>) -> Self {
        Self {
            tx,
            reader: None,
            writer: None,
        }
    }

    /// Queue a frame for the writer, `false` once the writer has gone away
    pub(crate) fn send(&self, frame: Vec<u8>) -> bool {
        self.tx.send(frame).is_ok()
    }

    /// Stop reading, flush queued frames and shut the socket down
    pub(crate) async fn close(mut self) -> Result<()> {
        if let Some(reader) = self.reader.take() {
            reader.abort();
        }
        let Some(mut writer) = self.writer.take() else {
            return Ok(());
        };
        // Closing the frame channel lets the writer drain and exit
        drop(self);

        match timeout(CLOSE_GRACE, &mut writer).await {
            Ok(Ok(Ok(()))) => Ok(()),
            Ok(Ok(Err(e))) => Err(BridgeError::shutdown(format!(
                "failed to flush socket: {}",
                e
            ))),
            Ok(Err(e)) => Err(BridgeError::shutdown(format!("writer task failed: {}", e))),
            Err(_) => {
                writer.abort();
                Err(BridgeError::shutdown("timed out flushing socket"))
            }
        }
    }
}

impl Drop for Link {
    fn drop(&mut self) {
        if let Some(reader) = self.reader.take() {
            reader.abort();
        }
        if let Some(writer) = self.writer.take() {
            writer.abort();
        }
    }
}

async fn read_loop(
    mut socket: OwnedReadHalf,
    events: mpsc::UnboundedSender<LinkEvent>,
    generation: u64,
) {
    let mut buf = vec![0u8; READ_BUFFER_SIZE];
    loop {
        let event = match socket.read(&mut buf).await {
            Ok(0) => LinkEvent::Closed { generation },
            Ok(n) => LinkEvent::Data {
                generation,
                bytes: buf[..n].to_vec(),
            },
            Err(error) => LinkEvent::Error { generation, error },
        };
        let finished = !matches!(event, LinkEvent::Data { .. });
        if events.send(event).is_err() || finished {
            break;
        }
    }
}

async fn write_loop(
    mut socket: OwnedWriteHalf,
    mut frames: mpsc::UnboundedReceiver<Vec<u8>>,
    events: mpsc::UnboundedSender<LinkEvent>,
    generation: u64,
) -> io::Result<()> {
    while let Some(frame) = frames.recv().await {
        if let Err(error) = socket.write_all(&frame).await {
            let kind = error.kind();
            let _ = events.send(LinkEvent::Error { generation, error });
            return Err(kind.into());
        }
    }
    socket.shutdown().await
}
