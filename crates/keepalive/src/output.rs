use std::io::{IsTerminal, Write};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use keepalive_frame::HEADER_SIZE;
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

/// Where a printed frame came from.
#[derive(Clone, Copy, Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Decoded,
    Response,
}

#[derive(Serialize)]
struct FrameOutput<'a> {
    direction: Direction,
    index: u64,
    header: String,
    payload_size: usize,
    wire_size: usize,
    payload: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    elapsed_ms: Option<u128>,
    #[serde(skip_serializing_if = "Option::is_none")]
    json: Option<&'a serde_json::Value>,
}

/// One frame as the CLI reports it.
pub struct FrameReport<'a> {
    pub direction: Direction,
    pub index: u64,
    pub payload: &'a [u8],
    pub elapsed_ms: Option<u128>,
}

pub fn print_frame(report: &FrameReport<'_>, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let parsed = serde_json::from_slice::<serde_json::Value>(report.payload).ok();
            let out = FrameOutput {
                direction: report.direction,
                index: report.index,
                header: header_hex(report.payload.len()),
                payload_size: report.payload.len(),
                wire_size: HEADER_SIZE + report.payload.len(),
                payload: payload_preview(report.payload),
                elapsed_ms: report.elapsed_ms,
                json: parsed.as_ref(),
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let elapsed = report
                .elapsed_ms
                .map(|ms| format!("{ms}ms"))
                .unwrap_or_else(|| "-".to_string());
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["#", "HEADER", "SIZE", "ELAPSED", "PAYLOAD"])
                .add_row(vec![
                    report.index.to_string(),
                    header_hex(report.payload.len()),
                    report.payload.len().to_string(),
                    elapsed,
                    payload_preview(report.payload),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            let elapsed = report
                .elapsed_ms
                .map(|ms| format!(" elapsed={ms}ms"))
                .unwrap_or_default();
            println!(
                "#{} size={}{} payload={}",
                report.index,
                report.payload.len(),
                elapsed,
                payload_preview(report.payload)
            );
        }
        OutputFormat::Raw => {
            print_raw(report.payload);
        }
    }
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

fn header_hex(len: usize) -> String {
    match u32::try_from(len) {
        Ok(len) => len
            .to_be_bytes()
            .iter()
            .map(|b| format!("{b:02x}"))
            .collect::<Vec<_>>()
            .join(" "),
        Err(_) => "oversize".to_string(),
    }
}

fn payload_preview(payload: &[u8]) -> String {
    match std::str::from_utf8(payload) {
        Ok(text) => text.to_string(),
        Err(_) => format!("<binary {} bytes>", payload.len()),
    }
}
