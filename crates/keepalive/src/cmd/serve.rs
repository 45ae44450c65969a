use bytes::{BufMut, Bytes, BytesMut};
use keepalive_channel::{AsyncFramedChannel, FramedChannel, HandlerResult, Responder};
use keepalive_frame::FrameConfig;

use crate::cmd::ServeArgs;
use crate::exit::{channel_error, io_error, CliResult, SUCCESS};

pub fn run(args: ServeArgs, config: FrameConfig) -> CliResult<i32> {
    let prefix = Bytes::from(args.prefix.unwrap_or_default());
    tracing::info!(
        mode = if args.use_async { "async" } else { "blocking" },
        max_payload = ?config.max_payload_size,
        "serving echo channel on stdio"
    );

    if args.use_async {
        return run_async(prefix, config);
    }

    let mut channel = FramedChannel::stdio_with_config(echo(prefix), config);
    channel
        .run()
        .map_err(|err| channel_error("serve failed", err))?;
    Ok(SUCCESS)
}

fn run_async(prefix: Bytes, config: FrameConfig) -> CliResult<i32> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|err| io_error("runtime setup failed", err))?;

    let channel = AsyncFramedChannel::stdio_with_config(echo(prefix), config);
    let result = runtime.block_on(channel.run());
    // A read of stdin may still be parked on the blocking pool.
    runtime.shutdown_background();

    result.map_err(|err| channel_error("serve failed", err))?;
    Ok(SUCCESS)
}

fn echo(prefix: Bytes) -> impl FnMut(Bytes, &Responder) -> HandlerResult {
    move |message, respond| {
        tracing::debug!(size = message.len(), "echoing frame");
        if prefix.is_empty() {
            respond.respond(message)?;
        } else {
            let mut reply = BytesMut::with_capacity(prefix.len() + message.len());
            reply.put_slice(&prefix);
            reply.put_slice(&message);
            respond.respond(reply.freeze())?;
        }
        Ok(())
    }
}
