use std::io::Write;
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use keepalive_frame::{FrameConfig, FrameWriter};

use crate::error::{ChannelError, Result};

type SharedWriter = Arc<Mutex<FrameWriter<Box<dyn Write + Send>>>>;

/// Capability to send framed responses on a channel's output.
///
/// Handed to the message handler for every inbound message. Clones share the
/// same output, so a handler may keep one and respond later, from any
/// thread, any number of times. Each call produces exactly one outbound
/// frame; concurrent calls are serialized so frames never interleave.
#[derive(Clone)]
pub struct Responder {
    inner: ResponderInner,
}

#[derive(Clone)]
enum ResponderInner {
    Blocking(SharedWriter),
    #[cfg(feature = "async")]
    Queued {
        tx: tokio::sync::mpsc::UnboundedSender<Bytes>,
        config: FrameConfig,
    },
}

impl Responder {
    /// Responder writing directly to `output`.
    pub fn new<W>(output: W, config: FrameConfig) -> Self
    where
        W: Write + Send + 'static,
    {
        let output: Box<dyn Write + Send> = Box::new(output);
        Self {
            inner: ResponderInner::Blocking(Arc::new(Mutex::new(FrameWriter::with_config(
                output, config,
            )))),
        }
    }

    /// Responder handing payloads to a writer task.
    #[cfg(feature = "async")]
    pub(crate) fn queued(tx: tokio::sync::mpsc::UnboundedSender<Bytes>, config: FrameConfig) -> Self {
        Self {
            inner: ResponderInner::Queued { tx, config },
        }
    }

    /// Send one framed response.
    pub fn respond(&self, payload: impl Into<Bytes>) -> Result<()> {
        let payload = payload.into();
        match &self.inner {
            ResponderInner::Blocking(writer) => {
                let mut writer = writer.lock().map_err(|_| ChannelError::Poisoned)?;
                writer.send(&payload)?;
                Ok(())
            }
            #[cfg(feature = "async")]
            ResponderInner::Queued { tx, config } => {
                config.check_payload(payload.len())?;
                tx.send(payload)
                    .map_err(|_| ChannelError::Closed("response writer stopped".to_string()))
            }
        }
    }
}

impl std::fmt::Debug for Responder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mode = match &self.inner {
            ResponderInner::Blocking(_) => "blocking",
            #[cfg(feature = "async")]
            ResponderInner::Queued { .. } => "queued",
        };
        f.debug_struct("Responder").field("mode", &mode).finish()
    }
}
