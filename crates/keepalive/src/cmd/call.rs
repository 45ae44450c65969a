use std::time::Instant;

use keepalive_channel::KeepaliveClient;
use keepalive_frame::FrameConfig;

use crate::cmd::payload::{parse_duration, resolve_payload};
use crate::cmd::CallArgs;
use crate::exit::{channel_error, CliError, CliResult, FAILURE, SUCCESS, USAGE};
use crate::output::{print_frame, Direction, FrameReport, OutputFormat};

pub fn run(args: CallArgs, format: OutputFormat, config: FrameConfig) -> CliResult<i32> {
    let timeout = parse_duration(&args.timeout)?;
    let payload = resolve_payload(&args.payload)?;
    let (program, program_args) = args
        .command
        .split_first()
        .ok_or_else(|| CliError::new(USAGE, "missing program to run"))?;
    if args.repeat == 0 {
        return Err(CliError::new(USAGE, "--repeat must be greater than zero"));
    }

    let client = KeepaliveClient::spawn_with_config(program, program_args, config)
        .map_err(|err| channel_error("spawn failed", err))?;
    tracing::info!(program = %program, pid = ?client.child_id(), "child started");

    for index in 0..args.repeat {
        let started = Instant::now();
        let response = client
            .request_timeout(&payload, timeout)
            .map_err(|err| channel_error("request failed", err))?;
        print_frame(
            &FrameReport {
                direction: Direction::Response,
                index,
                payload: &response,
                elapsed_ms: Some(started.elapsed().as_millis()),
            },
            format,
        );
    }

    let status = client
        .shutdown()
        .map_err(|err| channel_error("shutdown failed", err))?;
    match status {
        Some(status) if !status.success() => {
            tracing::warn!(%status, "child exited unsuccessfully");
            Ok(FAILURE)
        }
        _ => Ok(SUCCESS),
    }
}
