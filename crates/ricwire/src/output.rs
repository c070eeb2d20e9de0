use std::io::{IsTerminal, Write};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use ricwire_endpoint::{protocol, EnvelopeStats, Message};
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

#[derive(Serialize)]
pub struct MessageOutput {
    pub channel_id: u32,
    pub sequence: u8,
    pub msg_type: &'static str,
    pub protocol: &'static str,
    pub payload_size: usize,
    pub payload: String,
}

impl MessageOutput {
    pub fn from_message(msg: &Message) -> Self {
        Self {
            channel_id: msg.channel_id,
            sequence: msg.sequence,
            msg_type: msg.msg_type.name(),
            protocol: protocol::name(msg.protocol),
            payload_size: msg.payload.len(),
            payload: payload_preview(&msg.payload),
        }
    }
}

#[derive(Serialize)]
pub struct StatsOutput {
    pub messages_decoded: u32,
    pub malformed_headers: u32,
    pub oversize_dropped: u32,
    pub frames_received: Option<u32>,
    pub crc_errors: Option<u32>,
    pub frames_too_long: Option<u32>,
    pub buffer_alloc_failures: Option<u32>,
}

impl From<EnvelopeStats> for StatsOutput {
    fn from(stats: EnvelopeStats) -> Self {
        Self {
            messages_decoded: stats.messages_decoded,
            malformed_headers: stats.malformed_headers,
            oversize_dropped: stats.oversize_dropped,
            frames_received: stats.framer.map(|f| f.frames_received),
            crc_errors: stats.framer.map(|f| f.crc_errors),
            frames_too_long: stats.framer.map(|f| f.frames_too_long),
            buffer_alloc_failures: stats.framer.map(|f| f.buffer_alloc_failures),
        }
    }
}

#[derive(Serialize)]
struct DecodeOutput<'a> {
    envelope: &'a str,
    messages: &'a [MessageOutput],
    stats: &'a StatsOutput,
}

pub fn print_messages(envelope: &str, messages: &[Message], stats: EnvelopeStats, format: OutputFormat) {
    let rows: Vec<MessageOutput> = messages.iter().map(MessageOutput::from_message).collect();
    let stats = StatsOutput::from(stats);
    match format {
        OutputFormat::Json => {
            let out = DecodeOutput {
                envelope,
                messages: &rows,
                stats: &stats,
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["SEQ", "TYPE", "PROTOCOL", "SIZE", "PAYLOAD"]);
            for row in &rows {
                table.add_row(vec![
                    row.sequence.to_string(),
                    row.msg_type.to_string(),
                    row.protocol.to_string(),
                    row.payload_size.to_string(),
                    row.payload.clone(),
                ]);
            }
            println!("{table}");
            println!("{}", stats_line(&stats));
        }
        OutputFormat::Pretty => {
            for row in &rows {
                println!(
                    "seq={} type={} protocol={} size={} payload={}",
                    row.sequence, row.msg_type, row.protocol, row.payload_size, row.payload
                );
            }
            println!("{}", stats_line(&stats));
        }
        OutputFormat::Raw => {
            for msg in messages {
                print_raw(&msg.payload);
            }
        }
    }
}

fn stats_line(stats: &StatsOutput) -> String {
    let mut line = format!(
        "decoded={} malformed={} oversize={}",
        stats.messages_decoded, stats.malformed_headers, stats.oversize_dropped
    );
    if let (Some(frames), Some(crc), Some(long)) =
        (stats.frames_received, stats.crc_errors, stats.frames_too_long)
    {
        line.push_str(&format!(" frames={frames} crc_errors={crc} too_long={long}"));
    }
    line
}

#[derive(Serialize)]
pub struct WireOutput<'a> {
    pub envelope: &'a str,
    pub sequence: u8,
    pub msg_type: &'static str,
    pub protocol: &'static str,
    pub payload_size: usize,
    pub high_bit: bool,
    pub wire_size: usize,
    pub wire: String,
}

pub fn print_wire(out: &WireOutput<'_>, wire: &[u8], format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string(out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["ENVELOPE", "SEQ", "TYPE", "PAYLOAD", "WIRE", "BYTES"])
                .add_row(vec![
                    out.envelope.to_string(),
                    out.sequence.to_string(),
                    out.msg_type.to_string(),
                    out.payload_size.to_string(),
                    out.wire_size.to_string(),
                    out.wire.clone(),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => println!("{}", out.wire),
        OutputFormat::Raw => print_raw(wire),
    }
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

/// Lower-case hex, space separated.
pub fn to_hex(data: &[u8]) -> String {
    data.iter()
        .map(|b| format!("{b:02x}"))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Parse hex, ignoring whitespace and an optional `0x` per byte group.
pub fn parse_hex(input: &str) -> Result<Vec<u8>, String> {
    let digits: String = input
        .split_whitespace()
        .map(|group| group.trim_start_matches("0x").trim_start_matches("0X"))
        .collect();
    if !digits.is_ascii() {
        return Err("non-ASCII character in hex input".to_string());
    }
    if digits.len() % 2 != 0 {
        return Err(format!("odd number of hex digits ({})", digits.len()));
    }
    (0..digits.len())
        .step_by(2)
        .map(|i| {
            u8::from_str_radix(&digits[i..i + 2], 16)
                .map_err(|_| format!("invalid hex byte: {}", &digits[i..i + 2]))
        })
        .collect()
}

fn payload_preview(payload: &[u8]) -> String {
    match std::str::from_utf8(payload) {
        Ok(text) => text.to_string(),
        Err(_) => format!("<binary {} bytes: {}>", payload.len(), to_hex(payload)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_roundtrip_forms() {
        assert_eq!(parse_hex("7e 7d").unwrap(), vec![0x7E, 0x7D]);
        assert_eq!(parse_hex("0x01 0xFF").unwrap(), vec![0x01, 0xFF]);
        assert_eq!(parse_hex("0a0B\n0c").unwrap(), vec![0x0A, 0x0B, 0x0C]);
        assert_eq!(to_hex(&[0x00, 0xab]), "00 ab");
    }

    #[test]
    fn hex_rejects_garbage() {
        assert!(parse_hex("abc").is_err());
        assert!(parse_hex("zz").is_err());
        assert!(parse_hex("aé1").is_err());
    }

    #[test]
    fn binary_payloads_previewed_as_hex() {
        assert_eq!(payload_preview(b"ok"), "ok");
        assert_eq!(payload_preview(&[0xff]), "<binary 1 bytes: ff>");
    }
}
