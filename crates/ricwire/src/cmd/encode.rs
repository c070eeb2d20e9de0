use ricwire_endpoint::{Envelope, Message};
use ricwire_frame::Transcoder;
use tracing::debug;

use crate::cmd::{resolve_bytes, EncodeArgs};
use crate::exit::{envelope_error, CliResult, SUCCESS};
use crate::output::{print_wire, to_hex, OutputFormat, WireOutput};

const CLI_CHANNEL: u32 = 0;

pub fn run(args: EncodeArgs, format: OutputFormat) -> CliResult<i32> {
    let settings = args.envelope.envelope_settings()?;
    let payload = resolve_bytes(args.data.as_deref(), args.hex.as_deref(), args.file.as_ref())?
        .unwrap_or_default();

    let msg = Message::new(CLI_CHANNEL, args.protocol, args.msg_type, args.seq, payload);
    let wire = encode_message(&msg, &args, &settings)?;
    debug!(
        envelope = %args.envelope.envelope,
        payload = msg.payload.len(),
        wire = wire.len(),
        "message encoded"
    );

    let out = WireOutput {
        envelope: args.envelope.envelope.name(),
        sequence: msg.sequence,
        msg_type: msg.msg_type.name(),
        protocol: msg.protocol_name(),
        payload_size: msg.payload.len(),
        high_bit: args.envelope.high_bit,
        wire_size: wire.len(),
        wire: to_hex(&wire),
    };
    print_wire(&out, &wire, format);
    Ok(SUCCESS)
}

fn encode_message(
    msg: &Message,
    args: &EncodeArgs,
    settings: &ricwire_endpoint::EnvelopeSettings,
) -> CliResult<Vec<u8>> {
    let mut envelope = Envelope::create(args.envelope.envelope, CLI_CHANNEL, settings);
    let encoded = envelope
        .encode(msg)
        .map_err(|err| envelope_error("encode failed", err))?;
    if args.envelope.high_bit {
        Ok(Transcoder::encode_to_bytes(&encoded.payload).to_vec())
    } else {
        Ok(encoded.payload.to_vec())
    }
}
