use std::collections::VecDeque;
use std::ffi::OsStr;
use std::io::{Read, Write};
use std::process::ExitStatus;
use std::sync::mpsc::{self, RecvTimeoutError, SyncSender};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::JoinHandle;
use std::time::Duration;

use bytes::Bytes;
use keepalive_frame::{FrameConfig, FrameError, FrameReader, FrameWriter};
use keepalive_transport::ChildProcess;
use tracing::{debug, info, warn};

use crate::error::{ChannelError, Result};

type Reply = std::result::Result<Bytes, String>;

/// Parent side of a keepalive bridge.
///
/// Owns the write half of the child's input and a background thread reading
/// the child's output. The protocol carries no request ids, so responses are
/// matched to requests strictly in order: the n-th response frame answers the
/// n-th request. A request that times out keeps its place in that order and
/// its late response is discarded.
///
/// When the child's output closes or turns invalid, every caller still
/// waiting receives [`ChannelError::Closed`] and later requests fail fast.
pub struct KeepaliveClient {
    writer: Mutex<Option<FrameWriter<Box<dyn Write + Send>>>>,
    pending: Arc<Mutex<Pending>>,
    reader: Option<JoinHandle<()>>,
    child: Option<ChildProcess>,
}

#[derive(Default)]
struct Pending {
    waiting: VecDeque<SyncSender<Reply>>,
    closed: Option<String>,
}

impl KeepaliveClient {
    /// Spawn `program` and talk to it over its stdin/stdout.
    pub fn spawn<I, S>(program: impl AsRef<OsStr>, args: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        Self::spawn_with_config(program, args, FrameConfig::default())
    }

    /// Spawn with explicit frame configuration.
    pub fn spawn_with_config<I, S>(
        program: impl AsRef<OsStr>,
        args: I,
        config: FrameConfig,
    ) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let (child, source, sink) = ChildProcess::spawn(program, args)?;
        let mut client = Self::from_streams_with_config(source, sink, config);
        client.child = Some(child);
        Ok(client)
    }

    /// Client over injected streams: `reader` carries responses, `writer`
    /// carries requests.
    pub fn from_streams<R, W>(reader: R, writer: W) -> Self
    where
        R: Read + Send + 'static,
        W: Write + Send + 'static,
    {
        Self::from_streams_with_config(reader, writer, FrameConfig::default())
    }

    /// Client over injected streams with explicit frame configuration.
    pub fn from_streams_with_config<R, W>(reader: R, writer: W, config: FrameConfig) -> Self
    where
        R: Read + Send + 'static,
        W: Write + Send + 'static,
    {
        let pending = Arc::new(Mutex::new(Pending::default()));
        let frames = FrameReader::with_config(reader, config.clone());
        let reader = {
            let pending = Arc::clone(&pending);
            std::thread::spawn(move || read_loop(frames, pending))
        };
        let writer: Box<dyn Write + Send> = Box::new(writer);

        Self {
            writer: Mutex::new(Some(FrameWriter::with_config(writer, config))),
            pending,
            reader: Some(reader),
            child: None,
        }
    }

    /// Send one request and block until its response arrives.
    pub fn request(&self, payload: &[u8]) -> Result<Bytes> {
        self.request_inner(payload, None)
    }

    /// Send one request and wait at most `timeout` for its response.
    pub fn request_timeout(&self, payload: &[u8], timeout: Duration) -> Result<Bytes> {
        self.request_inner(payload, Some(timeout))
    }

    fn request_inner(&self, payload: &[u8], timeout: Option<Duration>) -> Result<Bytes> {
        let (tx, rx) = mpsc::sync_channel(1);
        {
            // Holding the writer lock across enqueue and send keeps the
            // waiting queue in the same order as requests on the wire.
            let mut writer = self.writer.lock().map_err(|_| ChannelError::Poisoned)?;
            let writer = writer
                .as_mut()
                .ok_or_else(|| ChannelError::Closed("client shut down".to_string()))?;

            {
                let mut pending = lock(&self.pending);
                if let Some(reason) = &pending.closed {
                    return Err(ChannelError::Closed(reason.clone()));
                }
                pending.waiting.push_back(tx);
            }

            if let Err(err) = writer.send(payload) {
                lock(&self.pending).waiting.pop_back();
                return Err(err.into());
            }
        }

        let reply = match timeout {
            Some(timeout) => match rx.recv_timeout(timeout) {
                Ok(reply) => reply,
                Err(RecvTimeoutError::Timeout) => return Err(ChannelError::Timeout(timeout)),
                Err(RecvTimeoutError::Disconnected) => {
                    return Err(ChannelError::Closed(self.close_reason()))
                }
            },
            None => rx
                .recv()
                .map_err(|_| ChannelError::Closed(self.close_reason()))?,
        };

        reply.map_err(ChannelError::Closed)
    }

    /// Requests sent whose responses have not arrived yet.
    pub fn pending(&self) -> usize {
        lock(&self.pending).waiting.len()
    }

    /// True once the response stream has closed.
    pub fn is_closed(&self) -> bool {
        lock(&self.pending).closed.is_some()
    }

    /// Process id of the spawned child, if this client spawned one.
    pub fn child_id(&self) -> Option<u32> {
        self.child.as_ref().map(ChildProcess::id)
    }

    /// Close the request stream and wait for the other side to finish.
    ///
    /// Returns the child's exit status when this client spawned the child.
    pub fn shutdown(mut self) -> Result<Option<ExitStatus>> {
        self.close_writer();
        if let Some(reader) = self.reader.take() {
            if reader.join().is_err() {
                warn!("response reader thread panicked");
            }
        }
        match self.child.take() {
            Some(mut child) => Ok(Some(child.wait()?)),
            None => Ok(None),
        }
    }

    fn close_writer(&self) {
        match self.writer.lock() {
            Ok(mut writer) => {
                writer.take();
            }
            Err(poisoned) => {
                poisoned.into_inner().take();
            }
        }
    }

    fn close_reason(&self) -> String {
        lock(&self.pending)
            .closed
            .clone()
            .unwrap_or_else(|| "response reader stopped".to_string())
    }
}

impl Drop for KeepaliveClient {
    fn drop(&mut self) {
        self.close_writer();
    }
}

impl std::fmt::Debug for KeepaliveClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeepaliveClient")
            .field("child", &self.child)
            .field("pending", &self.pending())
            .field("closed", &self.is_closed())
            .finish()
    }
}

fn lock(pending: &Mutex<Pending>) -> MutexGuard<'_, Pending> {
    match pending.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

fn read_loop<R: Read>(mut frames: FrameReader<R>, pending: Arc<Mutex<Pending>>) {
    let reason = loop {
        match frames.read_frame() {
            Ok(frame) => {
                let waiter = lock(&pending).waiting.pop_front();
                match waiter {
                    Some(tx) => {
                        if tx.send(Ok(frame)).is_err() {
                            debug!("discarding response to abandoned request");
                        }
                    }
                    None => warn!(len = frame.len(), "discarding unsolicited response"),
                }
            }
            Err(FrameError::ConnectionClosed) => break "peer closed its output".to_string(),
            Err(err) => break err.to_string(),
        }
    };

    let mut pending = lock(&pending);
    if !pending.waiting.is_empty() {
        warn!(waiting = pending.waiting.len(), %reason, "failing outstanding requests");
    } else {
        info!(%reason, "response stream closed");
    }
    for tx in pending.waiting.drain(..) {
        let _ = tx.send(Err(reason.clone()));
    }
    pending.closed = Some(reason);
}
