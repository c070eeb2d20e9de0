use std::io::Read;
use std::sync::{Arc, Mutex, PoisonError};

use ricwire_endpoint::{
    ChannelSpec, EndpointConfig, EndpointManager, EnvelopeStats, Message, WireAlphabet,
};
use tracing::debug;

use crate::cmd::{resolve_bytes, DecodeArgs};
use crate::exit::{endpoint_error, io_error, CliError, CliResult, SUCCESS};
use crate::output::{parse_hex, print_messages, OutputFormat};

pub fn run(args: DecodeArgs, format: OutputFormat) -> CliResult<i32> {
    let wire = match resolve_bytes(None, args.hex.as_deref(), args.file.as_ref())? {
        Some(wire) => wire,
        None => read_stdin()?,
    };
    let chunk = match args.chunk {
        Some(0) => return Err(CliError::usage("--chunk must be greater than zero")),
        Some(n) => n,
        None => wire.len().max(1),
    };

    let (messages, stats) = decode_wire(&args, &wire, chunk)?;
    print_messages(args.envelope.envelope.name(), &messages, stats, format);
    Ok(SUCCESS)
}

/// Stdin may carry hex text or raw wire bytes.
fn read_stdin() -> CliResult<Vec<u8>> {
    let mut input = Vec::new();
    std::io::stdin()
        .read_to_end(&mut input)
        .map_err(|err| io_error("failed reading stdin", err))?;
    match std::str::from_utf8(&input).ok().map(parse_hex) {
        Some(Ok(bytes)) => Ok(bytes),
        _ => Ok(input),
    }
}

/// Push `wire` through a registered channel in `chunk`-sized blocks, the
/// way a transport would, and collect what the handler sees.
fn decode_wire(
    args: &DecodeArgs,
    wire: &[u8],
    chunk: usize,
) -> CliResult<(Vec<Message>, EnvelopeStats)> {
    let kind = args.envelope.envelope;
    let mut manager = EndpointManager::new();
    manager.add_protocol(kind, args.envelope.envelope_settings()?);

    let config = EndpointConfig {
        alphabet: if args.envelope.high_bit {
            WireAlphabet::HighBit
        } else {
            WireAlphabet::Raw
        },
        ..EndpointConfig::default()
    };
    let received = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&received);
    let channel_id = manager
        .register_channel(
            ChannelSpec::new(kind.name(), "cli", "input").with_config(config),
            move |msg| sink.lock().unwrap_or_else(PoisonError::into_inner).push(msg),
        )
        .map_err(|err| endpoint_error("channel setup failed", err))?;

    for block in wire.chunks(chunk) {
        while !manager.can_accept_inbound(channel_id) {
            manager.service(|_, _| {});
        }
        manager.handle_inbound(channel_id, block);
    }
    let endpoint = manager
        .endpoint(channel_id)
        .ok_or_else(|| CliError::new(crate::exit::INTERNAL, "channel vanished"))?;
    while endpoint.stats_snapshot().inbound.current_depth > 0 {
        manager.service(|_, _| {});
    }

    let stats = endpoint.stats_snapshot().envelope.unwrap_or_default();
    debug!(
        channel_id,
        blocks = wire.len().div_ceil(chunk),
        decoded = stats.messages_decoded,
        "input decoded"
    );
    let messages = std::mem::take(&mut *received.lock().unwrap_or_else(PoisonError::into_inner));
    Ok((messages, stats))
}
