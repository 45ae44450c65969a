use bytes::{BufMut, Bytes, BytesMut};
use tracing::trace;

use crate::codec::{decode_header, HEADER_SIZE};
use crate::error::{FrameError, Result};
use crate::state::{Advance, ReadMode, ReadState};

/// Incremental frame decoder driven one input chunk at a time.
///
/// Holds exactly one [`ReadState`] and replaces it at every field boundary.
/// Chunks never need to line up with frames: a chunk may carry zero, one or
/// many frames, and a frame may span any number of chunks.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    state: ReadState,
    max_payload_size: Option<usize>,
    leftover: Bytes,
}

impl FrameDecoder {
    /// Create a decoder with no payload size limit.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a decoder that rejects headers announcing more than `max` bytes.
    pub fn with_max_payload(max_payload_size: Option<usize>) -> Self {
        Self {
            max_payload_size,
            ..Self::default()
        }
    }

    /// Feed one chunk, calling `on_frame` for every payload it completes.
    ///
    /// The state for the next frame is installed before `on_frame` runs. When
    /// the callback fails, the unprocessed rest of the chunk is kept and
    /// replayed ahead of the next chunk, so processing can resume without
    /// losing frame alignment. Feeding an empty chunk replays it on its own.
    ///
    /// A header announcing more than the configured maximum fails with
    /// [`FrameError::PayloadTooLarge`]. The stream cannot be resynchronized
    /// after that and the decoder should be discarded.
    pub fn feed<F, E>(&mut self, chunk: Bytes, mut on_frame: F) -> std::result::Result<(), E>
    where
        F: FnMut(Bytes) -> std::result::Result<(), E>,
        E: From<FrameError>,
    {
        let leftover = std::mem::take(&mut self.leftover);
        if !leftover.is_empty() {
            if let Err(err) = self.drain(leftover, &mut on_frame) {
                if !chunk.is_empty() {
                    let mut joined = BytesMut::with_capacity(self.leftover.len() + chunk.len());
                    joined.put_slice(&self.leftover);
                    joined.put_slice(&chunk);
                    self.leftover = joined.freeze();
                }
                return Err(err);
            }
        }
        self.drain(chunk, &mut on_frame)
    }

    fn drain<F, E>(&mut self, mut cursor: Bytes, on_frame: &mut F) -> std::result::Result<(), E>
    where
        F: FnMut(Bytes) -> std::result::Result<(), E>,
        E: From<FrameError>,
    {
        // A zero-length payload completes as soon as its header does, even
        // when the header ended exactly at the end of the chunk.
        while !cursor.is_empty() || self.state.is_satisfied() {
            let state = std::mem::take(&mut self.state);
            match state.advance(&mut cursor) {
                Advance::Pending(state) => {
                    self.state = state;
                }
                Advance::Complete {
                    mode: ReadMode::Header,
                    field,
                } => {
                    let mut header = [0u8; HEADER_SIZE];
                    header.copy_from_slice(&field);
                    let len = decode_header(header);
                    if let Some(max) = self.max_payload_size {
                        if len > max {
                            return Err(FrameError::PayloadTooLarge { size: len, max }.into());
                        }
                    }
                    trace!(len, "frame header decoded");
                    self.state = ReadState::payload(len);
                }
                Advance::Complete {
                    mode: ReadMode::Payload,
                    field,
                } => {
                    self.state = ReadState::header();
                    trace!(len = field.len(), "frame payload complete");
                    if let Err(err) = on_frame(field) {
                        self.leftover = cursor;
                        return Err(err);
                    }
                }
            }
        }

        Ok(())
    }

    /// Feed one chunk and collect the payloads it completes.
    pub fn decode(&mut self, chunk: Bytes) -> Result<Vec<Bytes>> {
        let mut frames = Vec::new();
        self.feed::<_, FrameError>(chunk, |frame| {
            frames.push(frame);
            Ok(())
        })?;
        Ok(frames)
    }

    /// Check that the stream may end here.
    ///
    /// Returns [`FrameError::Truncated`] when part of a frame has been seen.
    /// Bytes held back after a failed callback must be replayed with an empty
    /// [`feed`](Self::feed) first.
    pub fn finish(&self) -> Result<()> {
        if self.is_idle() {
            return Ok(());
        }
        Err(FrameError::Truncated {
            mode: self.state.mode(),
            remaining: self.state.bytes_remaining(),
        })
    }

    /// True when the decoder sits on a frame boundary with nothing held back.
    pub fn is_idle(&self) -> bool {
        self.state.is_idle() && self.leftover.is_empty()
    }

    /// Bytes held back by a failed callback, awaiting replay.
    pub fn held_back(&self) -> usize {
        self.leftover.len()
    }

    /// Current read state.
    pub fn state(&self) -> &ReadState {
        &self.state
    }

    /// Configured payload limit.
    pub fn max_payload_size(&self) -> Option<usize> {
        self.max_payload_size
    }
}
