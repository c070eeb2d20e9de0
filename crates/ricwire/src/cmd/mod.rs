use clap::{Args, Subcommand};
use std::path::PathBuf;

use ricwire_endpoint::{EnvelopeKind, EnvelopeSettings, MessageType};

use crate::exit::{config_error, io_error, CliError, CliResult};
use crate::output::{parse_hex, OutputFormat};

pub mod decode;
pub mod doctor;
pub mod encode;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Encode one message into wire bytes.
    Encode(EncodeArgs),
    /// Decode wire bytes into messages.
    Decode(DecodeArgs),
    /// Run built-in codec self-checks.
    Doctor(DoctorArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Encode(args) => encode::run(args, format),
        Command::Decode(args) => decode::run(args, format),
        Command::Doctor(args) => doctor::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

/// Options shared by commands that build an envelope.
#[derive(Args, Debug)]
pub struct EnvelopeArgs {
    /// Envelope protocol (RICSerial, RICFrame, RICJSON).
    #[arg(long, short = 'e', default_value = "RICSerial")]
    pub envelope: EnvelopeKind,
    /// Restrict the wire to bytes with the high bit set.
    #[arg(long)]
    pub high_bit: bool,
    /// Envelope settings as JSON (e.g. {"FrameBound":231,"BitWise":true}).
    #[arg(long, value_name = "JSON")]
    pub settings: Option<String>,
}

impl EnvelopeArgs {
    pub fn envelope_settings(&self) -> CliResult<EnvelopeSettings> {
        match &self.settings {
            Some(json) => EnvelopeSettings::from_json(json)
                .map_err(|err| config_error("--settings rejected", err)),
            None => Ok(EnvelopeSettings::default()),
        }
    }
}

#[derive(Args, Debug)]
pub struct EncodeArgs {
    #[command(flatten)]
    pub envelope: EnvelopeArgs,
    /// Sequence number.
    #[arg(long, default_value = "0")]
    pub seq: u8,
    /// Protocol code (0 ROSSerial, 1 M1SC, 2 RICREST, 63 none).
    #[arg(long, default_value = "2")]
    pub protocol: u8,
    /// Message type (cmd, rsp, pub, rep).
    #[arg(long, default_value = "cmd")]
    pub msg_type: MessageType,
    /// Raw string payload.
    #[arg(long, conflicts_with_all = ["hex", "file"])]
    pub data: Option<String>,
    /// Hex payload.
    #[arg(long, conflicts_with_all = ["data", "file"])]
    pub hex: Option<String>,
    /// Read payload from file.
    #[arg(long, conflicts_with_all = ["data", "hex"])]
    pub file: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct DecodeArgs {
    #[command(flatten)]
    pub envelope: EnvelopeArgs,
    /// Hex wire bytes.
    #[arg(long, conflicts_with = "file")]
    pub hex: Option<String>,
    /// Read wire bytes from file. Default: stdin.
    #[arg(long, conflicts_with = "hex")]
    pub file: Option<PathBuf>,
    /// Feed the input in blocks of this many bytes.
    #[arg(long, value_name = "BYTES")]
    pub chunk: Option<usize>,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

#[derive(Args, Debug, Default)]
pub struct DoctorArgs {}

/// Bytes from `--data`, `--hex` or `--file`; empty if none given.
pub fn resolve_bytes(
    data: Option<&str>,
    hex: Option<&str>,
    file: Option<&PathBuf>,
) -> CliResult<Option<Vec<u8>>> {
    if let Some(data) = data {
        return Ok(Some(data.as_bytes().to_vec()));
    }
    if let Some(hex) = hex {
        return parse_hex(hex)
            .map(Some)
            .map_err(|err| CliError::usage(format!("--hex: {err}")));
    }
    if let Some(path) = file {
        return std::fs::read(path)
            .map(Some)
            .map_err(|err| io_error(&format!("failed reading {}", path.display()), err));
    }
    Ok(None)
}
