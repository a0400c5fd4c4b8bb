use std::io::{IsTerminal, Write};
use std::time::{SystemTime, UNIX_EPOCH};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;
use subghz_frame::{Body, Im920Frame, Packet, SubGhzFrame};

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

#[derive(Serialize)]
struct FrameOutput<'a> {
    sender: &'a str,
    node_id: Option<u8>,
    rssi: Option<i32>,
    packet_type: &'static str,
    sequence: Option<u8>,
    fragmented: bool,
    response_requested: bool,
    code: Option<u8>,
    body_size: usize,
    body: String,
    timestamp: String,
}

pub fn print_frame(frame: &Im920Frame, format: OutputFormat) {
    let packet = frame.packet();
    match format {
        OutputFormat::Json => {
            let out = FrameOutput {
                sender: frame.sender(),
                node_id: frame.node_id(),
                rssi: frame.rssi(),
                packet_type: packet.packet_type().name(),
                sequence: packet.sequence,
                fragmented: packet.fragmented,
                response_requested: packet.response_requested,
                code: command_code(packet),
                body_size: packet.body_len(),
                body: body_preview(packet),
                timestamp: now_unix_seconds(),
            };
            print_json(&out);
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["SENDER", "RSSI", "TYPE", "SEQ", "FLAGS", "BODY"])
                .add_row(vec![
                    frame.sender().to_string(),
                    optional(frame.rssi()),
                    packet.packet_type().name().to_string(),
                    optional(packet.sequence),
                    flags(packet),
                    body_preview(packet),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => println!("{frame}"),
        OutputFormat::Raw => {
            if let Body::Data(bytes) = &packet.body {
                print_raw(bytes);
            }
        }
    }
}

#[derive(Serialize)]
struct ResponseOutput<'a> {
    command: &'a str,
    responses: &'a [String],
}

/// Print the lines a module command produced.
pub fn print_responses(command: &str, responses: &[String], format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(&ResponseOutput { command, responses }),
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["COMMAND", "RESPONSE"]);
            for response in responses {
                table.add_row(vec![command, response.as_str()]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty | OutputFormat::Raw => {
            for response in responses {
                println!("{response}");
            }
        }
    }
}

#[derive(Serialize)]
pub struct ConfigOutput {
    pub port: String,
    pub baud: u32,
    pub active_duration: u16,
    pub sleep_duration: u16,
}

pub fn print_config(out: &ConfigOutput, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(out),
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["SETTING", "VALUE"])
                .add_row(vec!["port".to_string(), out.port.clone()])
                .add_row(vec!["baud".to_string(), out.baud.to_string()])
                .add_row(vec![
                    "active_duration".to_string(),
                    format!("{:04X}", out.active_duration),
                ])
                .add_row(vec![
                    "sleep_duration".to_string(),
                    format!("{:04X}", out.sleep_duration),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty | OutputFormat::Raw => {
            println!(
                "port={} baud={} active={:04X} sleep={:04X}",
                out.port, out.baud, out.active_duration, out.sleep_duration
            );
        }
    }
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

fn print_json<T: Serialize>(value: &T) {
    println!(
        "{}",
        serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
    );
}

fn command_code(packet: &Packet) -> Option<u8> {
    match &packet.body {
        Body::Command { code, .. } | Body::Ack { code, .. } => Some(*code),
        Body::Data(_) | Body::Notice(_) => None,
    }
}

fn flags(packet: &Packet) -> String {
    let mut out = String::new();
    if packet.fragmented {
        out.push('F');
    }
    if packet.response_requested {
        out.push('A');
    }
    if out.is_empty() {
        out.push('-');
    }
    out
}

fn body_preview(packet: &Packet) -> String {
    match &packet.body {
        Body::Data(bytes) => match std::str::from_utf8(bytes) {
            Ok(text) if !text.chars().any(char::is_control) => text.to_string(),
            _ => hex::encode_upper(bytes),
        },
        Body::Command { param, .. } => param.clone(),
        Body::Ack { response, .. } => response.clone(),
        Body::Notice(text) => text.clone(),
    }
}

fn optional<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string())
}

fn now_unix_seconds() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs().to_string())
        .unwrap_or_else(|_| "0".to_string())
}
