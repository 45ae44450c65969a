use std::io::{ErrorKind, Read, Write};

use bytes::{Bytes, BytesMut};
use keepalive_frame::{FrameConfig, FrameDecoder, ReadState};
use keepalive_transport::ByteSource;
use tracing::{debug, info, warn};

use crate::error::{BoxError, ChannelError, Result};
use crate::responder::Responder;

/// What a message handler returns.
pub type HandlerResult = std::result::Result<(), BoxError>;

/// Child side of a keepalive bridge.
///
/// Reads chunks from `input`, reassembles them into framed messages and calls
/// the handler once per message with a [`Responder`] bound to the output.
/// Chunks are handled one at a time in arrival order; every frame completed
/// by a chunk is dispatched before the next chunk is read.
pub struct FramedChannel<R, H> {
    input: R,
    decoder: FrameDecoder,
    responder: Responder,
    handler: H,
    buf: BytesMut,
    chunk_size: usize,
    messages: u64,
}

impl<H> FramedChannel<ByteSource, H>
where
    H: FnMut(Bytes, &Responder) -> HandlerResult,
{
    /// Channel over this process's stdin and stdout.
    pub fn stdio(handler: H) -> Self {
        Self::stdio_with_config(handler, FrameConfig::default())
    }

    /// Channel over this process's stdin and stdout with explicit configuration.
    pub fn stdio_with_config(handler: H, config: FrameConfig) -> Self {
        let (input, output) = keepalive_transport::stdio();
        Self::with_config(handler, input, output, config)
    }
}

impl<R, H> FramedChannel<R, H>
where
    R: Read,
    H: FnMut(Bytes, &Responder) -> HandlerResult,
{
    /// Channel over injected streams with default configuration.
    pub fn new<W>(handler: H, input: R, output: W) -> Self
    where
        W: Write + Send + 'static,
    {
        Self::with_config(handler, input, output, FrameConfig::default())
    }

    /// Channel over injected streams with explicit configuration.
    pub fn with_config<W>(handler: H, input: R, output: W, config: FrameConfig) -> Self
    where
        W: Write + Send + 'static,
    {
        Self {
            input,
            decoder: FrameDecoder::with_max_payload(config.max_payload_size),
            buf: BytesMut::new(),
            chunk_size: config.read_chunk_size.max(1),
            responder: Responder::new(output, config),
            handler,
            messages: 0,
        }
    }

    /// Process one incoming chunk.
    ///
    /// Dispatches every message the chunk completes. A handler error stops
    /// dispatch and is returned as [`ChannelError::Handler`]. The bytes after
    /// the failing message are held back and dispatched ahead of the next
    /// chunk, so the channel may keep going after a handler error. Passing an
    /// empty chunk dispatches what was held back.
    pub fn process_chunk(&mut self, chunk: Bytes) -> Result<()> {
        let handler = &mut self.handler;
        let responder = &self.responder;
        let messages = &mut self.messages;
        self.decoder.feed(chunk, |message| {
            *messages += 1;
            debug!(len = message.len(), seq = *messages, "dispatching message");
            handler(message, responder).map_err(ChannelError::Handler)
        })
    }

    /// Read and dispatch until the input closes.
    ///
    /// Returns `Ok(())` when the input closes on a frame boundary and
    /// [`FrameError::Truncated`](keepalive_frame::FrameError::Truncated) when
    /// it closes part-way through a frame. After a handler error `run` may be
    /// called again; held-back messages are dispatched first.
    pub fn run(&mut self) -> Result<()> {
        loop {
            self.buf.resize(self.chunk_size, 0);
            let read = match self.input.read(&mut self.buf) {
                Ok(n) => n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(ChannelError::Frame(err.into())),
            };
            self.buf.truncate(read);

            if read == 0 {
                self.process_chunk(Bytes::new())?;
                return match self.decoder.finish() {
                    Ok(()) => {
                        info!(messages = self.messages, "input closed");
                        Ok(())
                    }
                    Err(err) => {
                        warn!(messages = self.messages, error = %err, "input closed mid-frame");
                        Err(err.into())
                    }
                };
            }

            let chunk = self.buf.split().freeze();
            self.process_chunk(chunk)?;
        }
    }

    /// A responder bound to this channel's output.
    pub fn responder(&self) -> Responder {
        self.responder.clone()
    }

    /// Current read state.
    pub fn read_state(&self) -> &ReadState {
        self.decoder.state()
    }

    /// Messages dispatched so far.
    pub fn messages_handled(&self) -> u64 {
        self.messages
    }
}
