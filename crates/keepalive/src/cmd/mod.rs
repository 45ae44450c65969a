use clap::{Args, Subcommand};
use keepalive_frame::FrameConfig;
use std::path::PathBuf;

use crate::exit::CliResult;
use crate::output::OutputFormat;

pub mod call;
pub mod decode;
pub mod encode;
pub mod payload;
pub mod serve;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run an echo channel on stdin/stdout.
    Serve(ServeArgs),
    /// Write one framed payload to stdout.
    Encode(EncodeArgs),
    /// Read framed payloads from stdin or a file and print them.
    Decode(DecodeArgs),
    /// Spawn a framed child once and exchange requests with it.
    Call(CallArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat, config: FrameConfig) -> CliResult<i32> {
    match command {
        Command::Serve(args) => serve::run(args, config),
        Command::Encode(args) => encode::run(args, config),
        Command::Decode(args) => decode::run(args, format, config),
        Command::Call(args) => call::run(args, format, config),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug, Default)]
pub struct PayloadArgs {
    /// JSON payload.
    #[arg(long, conflicts_with_all = ["data", "file"])]
    pub json: Option<String>,
    /// Raw string payload.
    #[arg(long, conflicts_with_all = ["json", "file"])]
    pub data: Option<String>,
    /// Read payload from file.
    #[arg(long, conflicts_with_all = ["json", "data"])]
    pub file: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Use the tokio channel instead of the blocking one.
    #[arg(long = "async")]
    pub use_async: bool,
    /// Prepend this text to every echoed payload.
    #[arg(long, value_name = "TEXT")]
    pub prefix: Option<String>,
}

#[derive(Args, Debug)]
pub struct EncodeArgs {
    #[command(flatten)]
    pub payload: PayloadArgs,
}

#[derive(Args, Debug)]
pub struct DecodeArgs {
    /// Read frames from this file instead of stdin.
    #[arg(long)]
    pub file: Option<PathBuf>,
    /// Stop after N frames.
    #[arg(long)]
    pub count: Option<u64>,
}

#[derive(Args, Debug)]
pub struct CallArgs {
    #[command(flatten)]
    pub payload: PayloadArgs,
    /// Maximum time to wait for each response (e.g. 5s, 500ms).
    #[arg(long, default_value = "5s")]
    pub timeout: String,
    /// Send the payload this many times over the same child.
    #[arg(long, default_value = "1")]
    pub repeat: u64,
    /// Program to run, followed by its arguments.
    #[arg(last = true, required = true, value_name = "PROGRAM")]
    pub command: Vec<String>,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}
