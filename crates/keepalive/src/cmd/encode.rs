use keepalive_frame::{FrameConfig, FrameWriter};
use keepalive_transport::ByteSink;

use crate::cmd::payload::resolve_payload;
use crate::cmd::EncodeArgs;
use crate::exit::{frame_error, CliResult, SUCCESS};

pub fn run(args: EncodeArgs, config: FrameConfig) -> CliResult<i32> {
    let payload = resolve_payload(&args.payload)?;
    let mut writer = FrameWriter::with_config(ByteSink::stdout(), config);
    writer
        .send(&payload)
        .map_err(|err| frame_error("encode failed", err))?;
    tracing::debug!(size = payload.len(), "frame encoded");
    Ok(SUCCESS)
}
