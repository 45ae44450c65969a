use bytes::Bytes;
use futures_util::{SinkExt, StreamExt};
use keepalive_frame::{FrameConfig, KeepaliveCodec};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio_util::codec::{FramedRead, FramedWrite};
use tracing::{debug, info};

use crate::channel::HandlerResult;
use crate::error::{ChannelError, Result};
use crate::responder::Responder;

/// Tokio flavour of [`FramedChannel`](crate::FramedChannel).
///
/// Input frames are decoded with [`KeepaliveCodec`] and dispatched to the
/// handler in order. Responses are queued and written by a single writer
/// task, which keeps concurrent responders from interleaving frames.
pub struct AsyncFramedChannel<R, W, H> {
    input: R,
    output: W,
    handler: H,
    config: FrameConfig,
}

impl<H> AsyncFramedChannel<tokio::io::Stdin, tokio::io::Stdout, H>
where
    H: FnMut(Bytes, &Responder) -> HandlerResult,
{
    /// Channel over this process's stdin and stdout.
    pub fn stdio(handler: H) -> Self {
        Self::stdio_with_config(handler, FrameConfig::default())
    }

    /// Channel over this process's stdin and stdout with explicit configuration.
    pub fn stdio_with_config(handler: H, config: FrameConfig) -> Self {
        let (input, output) = keepalive_transport::async_stdio();
        Self::with_config(handler, input, output, config)
    }
}

impl<R, W, H> AsyncFramedChannel<R, W, H>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
    H: FnMut(Bytes, &Responder) -> HandlerResult,
{
    /// Channel over injected streams with default configuration.
    pub fn new(handler: H, input: R, output: W) -> Self {
        Self::with_config(handler, input, output, FrameConfig::default())
    }

    /// Channel over injected streams with explicit configuration.
    pub fn with_config(handler: H, input: R, output: W, config: FrameConfig) -> Self {
        Self {
            input,
            output,
            handler,
            config,
        }
    }

    /// Read and dispatch until the input closes.
    ///
    /// After a clean close this waits for every [`Responder`] clone to be
    /// dropped so queued responses reach the output. On an input or handler
    /// error the writer task is aborted and the error returned.
    pub async fn run(self) -> Result<()> {
        let Self {
            input,
            output,
            mut handler,
            config,
        } = self;

        let (tx, rx) = mpsc::unbounded_channel();
        let responder = Responder::queued(tx, config.clone());
        let sink = FramedWrite::new(output, KeepaliveCodec::with_config(config.clone()));
        let writer = tokio::spawn(write_loop(sink, rx));

        let mut frames = FramedRead::with_capacity(
            input,
            KeepaliveCodec::with_config(config.clone()),
            config.read_chunk_size.max(1),
        );

        let mut messages = 0u64;
        let read_result: Result<()> = async {
            while let Some(message) = frames.next().await {
                let message = message?;
                messages += 1;
                debug!(len = message.len(), seq = messages, "dispatching message");
                handler(message, &responder).map_err(ChannelError::Handler)?;
            }
            Ok(())
        }
        .await;
        drop(responder);

        if let Err(err) = read_result {
            writer.abort();
            return Err(err);
        }

        info!(messages, "input closed");
        writer
            .await
            .map_err(|err| ChannelError::Closed(format!("response writer failed: {err}")))?
    }
}

async fn write_loop<W>(
    mut sink: FramedWrite<W, KeepaliveCodec>,
    mut rx: mpsc::UnboundedReceiver<Bytes>,
) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    while let Some(payload) = rx.recv().await {
        sink.send(payload).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use bytes::BytesMut;
    use keepalive_frame::{encode_frame, FrameDecoder, FrameError, ReadMode};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    use super::*;

    fn wire(payloads: &[&[u8]]) -> Vec<u8> {
        let mut buf = BytesMut::new();
        for payload in payloads {
            encode_frame(payload, &mut buf).unwrap();
        }
        buf.to_vec()
    }

    async fn drain(mut stream: tokio::io::DuplexStream) -> Vec<Bytes> {
        let mut out = Vec::new();
        stream.read_to_end(&mut out).await.unwrap();
        FrameDecoder::new().decode(Bytes::from(out)).unwrap()
    }

    #[tokio::test]
    async fn echo_over_duplex() {
        let (mut feed, input) = tokio::io::duplex(5);
        let (output, collected) = tokio::io::duplex(64 * 1024);

        let channel = AsyncFramedChannel::new(
            |message: Bytes, respond: &Responder| {
                respond.respond(message)?;
                Ok(())
            },
            input,
            output,
        );

        let feeder = tokio::spawn(async move {
            feed.write_all(&wire(&[b"one", b"", b"three"])).await.unwrap();
            feed.shutdown().await.unwrap();
        });

        channel.run().await.unwrap();
        feeder.await.unwrap();

        assert_eq!(
            drain(collected).await,
            vec![
                Bytes::from_static(b"one"),
                Bytes::new(),
                Bytes::from_static(b"three"),
            ]
        );
    }

    #[tokio::test]
    async fn deferred_responses_are_flushed_before_run_returns() {
        let (mut feed, input) = tokio::io::duplex(64);
        let (output, collected) = tokio::io::duplex(64 * 1024);

        let channel = AsyncFramedChannel::new(
            |message: Bytes, respond: &Responder| {
                let respond = respond.clone();
                tokio::spawn(async move {
                    tokio::time::sleep(Duration::from_millis(10)).await;
                    respond.respond(message).unwrap();
                });
                Ok(())
            },
            input,
            output,
        );

        feed.write_all(&wire(&[b"later"])).await.unwrap();
        feed.shutdown().await.unwrap();

        channel.run().await.unwrap();
        assert_eq!(drain(collected).await, vec![Bytes::from_static(b"later")]);
    }

    #[tokio::test]
    async fn truncated_input_is_reported() {
        let (mut feed, input) = tokio::io::duplex(64);
        let (output, _collected) = tokio::io::duplex(64);
        let seen = Arc::new(Mutex::new(Vec::new()));

        let channel = AsyncFramedChannel::new(
            {
                let seen = seen.clone();
                move |message: Bytes, _respond: &Responder| {
                    seen.lock().unwrap().push(message);
                    Ok(())
                }
            },
            input,
            output,
        );

        let mut bytes = wire(&[b"whole"]);
        bytes.extend_from_slice(&[0, 0, 0, 4, b'h']);
        feed.write_all(&bytes).await.unwrap();
        feed.shutdown().await.unwrap();

        let err = channel.run().await.unwrap_err();
        assert!(matches!(
            err,
            ChannelError::Frame(FrameError::Truncated {
                mode: ReadMode::Payload,
                remaining: 3
            })
        ));
        assert_eq!(*seen.lock().unwrap(), vec![Bytes::from_static(b"whole")]);
    }

    #[tokio::test]
    async fn handler_error_stops_channel() {
        let (mut feed, input) = tokio::io::duplex(64);
        let (output, _collected) = tokio::io::duplex(64);

        let channel = AsyncFramedChannel::new(
            |_message: Bytes, _respond: &Responder| Err("nope".into()),
            input,
            output,
        );

        feed.write_all(&wire(&[b"x"])).await.unwrap();
        let err = channel.run().await.unwrap_err();
        assert!(matches!(err, ChannelError::Handler(_)));
    }

    #[tokio::test]
    async fn queued_responder_enforces_max_payload() {
        let (mut feed, input) = tokio::io::duplex(64);
        let (output, _collected) = tokio::io::duplex(64);
        let outcome = Arc::new(Mutex::new(None));

        let channel = AsyncFramedChannel::with_config(
            {
                let outcome = outcome.clone();
                move |_message: Bytes, respond: &Responder| {
                    *outcome.lock().unwrap() = Some(respond.respond("too long"));
                    Ok(())
                }
            },
            input,
            output,
            FrameConfig::default().with_max_payload_size(4),
        );

        feed.write_all(&wire(&[b"ok"])).await.unwrap();
        feed.shutdown().await.unwrap();
        channel.run().await.unwrap();

        let outcome = outcome.lock().unwrap().take().unwrap();
        assert!(matches!(
            outcome,
            Err(ChannelError::Frame(FrameError::PayloadTooLarge { size: 8, max: 4 }))
        ));
    }
}
