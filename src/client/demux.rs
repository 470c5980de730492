//! Response demultiplexing for a single connection (spec.md §4.1 and §5).
//!
//! One reader thread owns the socket's read half for the lifetime of the
//! connection. Callers register a pending slot for their tag, send their
//! frame, and then block on their own slot — never on the shared reader.
//! Registration happens strictly before the frame is sent, so a response
//! that the server returns before the caller starts waiting is never lost.
//!
//! When the stream itself fails (EOF, reset, malformed frame), the reader
//! fans the error out to every outstanding waiter rather than only the one
//! whose frame it was mid-read for, since a torn stream invalidates all of
//! them at once.

use crate::error::Error;
use crate::net::{FrameReader, FrameWriter};
use crate::protocol::Frame;
use std::collections::HashMap;
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

type PendingMap = Arc<Mutex<HashMap<i32, mpsc::Sender<Result<Frame, Error>>>>>;

pub struct Demux {
    writer: Arc<FrameWriter>,
    next_tag: AtomicI32,
    pending: PendingMap,
    reader_handle: Option<JoinHandle<()>>,
}

impl Demux {
    pub fn new(writer: FrameWriter, mut reader: FrameReader) -> Self {
        let writer = Arc::new(writer);
        let pending: PendingMap = Arc::new(Mutex::new(HashMap::new()));
        let reader_pending = pending.clone();

        let reader_handle = std::thread::spawn(move || loop {
            match reader.receive() {
                Ok(frame) => {
                    let sender = reader_pending.lock().expect("pending lock poisoned").remove(&frame.tag);
                    if let Some(sender) = sender {
                        let _ = sender.send(Ok(frame));
                    }
                }
                Err(e) => {
                    let mut map = reader_pending.lock().expect("pending lock poisoned");
                    for (_, sender) in map.drain() {
                        let _ = sender.send(Err(Error::Protocol(format!(
                            "connection closed: {e}"
                        ))));
                    }
                    return;
                }
            }
        });

        Demux {
            writer,
            next_tag: AtomicI32::new(1),
            pending,
            reader_handle: Some(reader_handle),
        }
    }

    /// Sends a request and blocks for its response, or times out.
    pub fn call(&self, kind: i32, payload: Vec<u8>, timeout: Duration) -> Result<Frame, Error> {
        let tag = self.next_tag.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = mpsc::channel();
        self.pending.lock().expect("pending lock poisoned").insert(tag, tx);

        if let Err(e) = self.writer.send(&Frame::new(tag, kind, payload)) {
            self.pending.lock().expect("pending lock poisoned").remove(&tag);
            return Err(e);
        }

        match rx.recv_timeout(timeout) {
            Ok(result) => result,
            Err(_) => {
                self.pending.lock().expect("pending lock poisoned").remove(&tag);
                Err(Error::Protocol(format!(
                    "timed out after {:?} waiting for tag {tag}",
                    timeout
                )))
            }
        }
    }
}

impl Drop for Demux {
    fn drop(&mut self) {
        if let Some(handle) = self.reader_handle.take() {
            let _ = handle.join();
        }
    }
}
