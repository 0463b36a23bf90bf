//! Output relay: child output stream -> output queue -> UI.
//!
//! A reader task is bound to exactly one stream. It forwards every non-empty
//! line as `RelayEvent::Line` and ends at end-of-stream; it is never restarted.
//! The UI thread drains the queue without blocking on a fixed interval.

use crate::models::RelayEvent;
use crossbeam_channel::{unbounded, Receiver, Sender};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

/// Create the output queue shared by every producer.
///
/// Unbounded: producers never block, and FIFO order is kept per producer.
pub fn output_queue() -> (Sender<RelayEvent>, Receiver<RelayEvent>) {
    unbounded()
}

/// Spawn a reader for one process's combined output.
///
/// After the stream closes a `StreamClosed` notice tagged with `generation`
/// is queued, so the UI can tell an exit of this process apart from a stale
/// notice of an earlier one.
pub fn spawn_reader<R>(
    runtime: &Handle,
    stream: R,
    tx: Sender<RelayEvent>,
    generation: u64,
) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    runtime.spawn(async move {
        let forwarded = relay_lines(stream, &tx).await;
        log::debug!(
            "[Relay] Stream for generation {} closed after {} lines",
            generation,
            forwarded
        );
        let _ = tx.send(RelayEvent::StreamClosed { generation });
    })
}

/// Forward each non-empty line of `stream` to the queue until end-of-stream.
///
/// Invalid UTF-8 is replaced rather than ending the stream, and a read error
/// is treated as end-of-stream. Returns the number of lines forwarded.
pub async fn relay_lines<R>(stream: R, tx: &Sender<RelayEvent>) -> usize
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(stream);
    let mut buf = Vec::with_capacity(256);
    let mut forwarded = 0;

    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {
                if let Some(line) = clean_line(&buf) {
                    if tx.send(RelayEvent::Line(line)).is_err() {
                        // Consumer is gone; nothing left to deliver to
                        break;
                    }
                    forwarded += 1;
                }
            }
            Err(e) => {
                log::warn!("[Relay] Read error, closing stream: {}", e);
                break;
            }
        }
    }

    forwarded
}

/// Decode one raw line, trimming the line terminator. Blank lines yield `None`.
pub fn clean_line(raw: &[u8]) -> Option<String> {
    let text = String::from_utf8_lossy(raw);
    let line = text.trim_end_matches(['\n', '\r']);
    if line.trim().is_empty() {
        None
    } else {
        Some(line.to_string())
    }
}

/// Take everything currently queued without waiting
pub fn drain(rx: &Receiver<RelayEvent>) -> Vec<RelayEvent> {
    rx.try_iter().collect()
}
