use ricwire_endpoint::{protocol, Envelope, EnvelopeKind, EnvelopeSettings, Message, MessageType};
use ricwire_frame::{crc16, Framer, HdlcConfig, StuffingMode, Transcoder};
use serde::Serialize;

use crate::cmd::DoctorArgs;
use crate::exit::{CliResult, HEALTH_CHECK_FAILED, SUCCESS};
use crate::output::OutputFormat;

#[derive(Clone, Copy, Debug, Serialize)]
#[serde(rename_all = "lowercase")]
enum CheckStatus {
    Pass,
    Fail,
    Info,
}

#[derive(Debug, Serialize)]
struct CheckResult {
    name: String,
    status: CheckStatus,
    detail: String,
}

impl CheckResult {
    fn outcome(name: &str, ok: bool, pass: &str, fail: String) -> Self {
        Self {
            name: name.to_string(),
            status: if ok { CheckStatus::Pass } else { CheckStatus::Fail },
            detail: if ok { pass.to_string() } else { fail },
        }
    }
}

#[derive(Debug, Serialize)]
struct DoctorOutput {
    checks: Vec<CheckResult>,
    overall: &'static str,
}

pub fn run(_args: DoctorArgs, format: OutputFormat) -> CliResult<i32> {
    let mut checks = vec![
        crc_check_value(),
        framer_roundtrip(),
        framer_rejects_corruption(),
        bitwise_roundtrip(),
        transcoder_vector(),
    ];
    checks.extend(EnvelopeKind::ALL.into_iter().map(envelope_roundtrip));
    checks.push(compiled_features_check());

    let has_fail = checks.iter().any(|c| matches!(c.status, CheckStatus::Fail));
    let output = DoctorOutput {
        checks,
        overall: if has_fail { "fail" } else { "pass" },
    };

    print_doctor(&output, format);

    if has_fail {
        Ok(HEALTH_CHECK_FAILED)
    } else {
        Ok(SUCCESS)
    }
}

fn print_doctor(output: &DoctorOutput, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string(output).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table | OutputFormat::Pretty => {
            println!("ricwire doctor\n");
            for c in &output.checks {
                println!(
                    "  [{:>4}] {:<22} {}",
                    status_text(c.status),
                    c.name,
                    c.detail
                );
            }
            if output.overall == "pass" {
                println!("\n  Result: all checks passed");
            } else {
                println!("\n  Result: one or more checks failed");
            }
        }
        OutputFormat::Raw => {
            println!("{}", output.overall);
        }
    }
}

fn status_text(status: CheckStatus) -> &'static str {
    match status {
        CheckStatus::Pass => "PASS",
        CheckStatus::Fail => "FAIL",
        CheckStatus::Info => "INFO",
    }
}

fn crc_check_value() -> CheckResult {
    let crc = crc16(b"123456789");
    CheckResult::outcome(
        "crc16_check_value",
        crc == 0x29B1,
        "CRC-16/CCITT(\"123456789\") = 0x29b1",
        format!("expected 0x29b1, got {crc:#06x}"),
    )
}

fn decode_all(framer: &mut Framer, wire: &[u8]) -> Vec<Vec<u8>> {
    let mut frames = Vec::new();
    framer.feed_slice(wire, |frame| frames.push(frame.to_vec()));
    frames
}

fn framer_roundtrip() -> CheckResult {
    let payload = [0x7E, 0x7D, 0x00, 0x7E, 0x20, 0x5E, 0x5D];
    let mut framer = Framer::default();
    let result = framer
        .encode(&payload)
        .map(|wire| decode_all(&mut framer, &wire));
    match result {
        Ok(frames) => CheckResult::outcome(
            "framer_roundtrip",
            frames == [payload.to_vec()],
            "reserved-octet payload survives encode/decode",
            format!("decoded {frames:?}"),
        ),
        Err(err) => CheckResult::outcome("framer_roundtrip", false, "", err.to_string()),
    }
}

fn framer_rejects_corruption() -> CheckResult {
    let mut framer = Framer::default();
    let result = framer.encode(b"doctor").map(|wire| {
        let mut wire = wire.to_vec();
        wire[1] ^= 0x01;
        decode_all(&mut framer, &wire)
    });
    let crc_errors = framer.stats().crc_errors;
    match result {
        Ok(frames) => CheckResult::outcome(
            "framer_crc_guard",
            frames.is_empty() && crc_errors == 1,
            "single-bit corruption dropped and counted",
            format!("{} frames delivered, {crc_errors} crc errors", frames.len()),
        ),
        Err(err) => CheckResult::outcome("framer_crc_guard", false, "", err.to_string()),
    }
}

fn bitwise_roundtrip() -> CheckResult {
    let payload = [0xFF, 0x7E, 0x3F, 0x00];
    let mut framer = Framer::new(HdlcConfig {
        mode: StuffingMode::Bit,
        ..HdlcConfig::default()
    });
    let result = framer.encode_bits(&payload).map(|bits| {
        let mut frames = Vec::new();
        framer.feed_bits(bits.bits(), |frame| frames.push(frame.to_vec()));
        frames
    });
    match result {
        Ok(frames) => CheckResult::outcome(
            "bit_stuffing",
            frames == [payload.to_vec()],
            "bit-stuffed frame survives encode/decode",
            format!("decoded {frames:?}"),
        ),
        Err(err) => CheckResult::outcome("bit_stuffing", false, "", err.to_string()),
    }
}

fn transcoder_vector() -> CheckResult {
    let input = [0x00, 0x0F, 0x10, 0x7F, 0x80, 0x85, 0x8F, 0x90, 0xFF];
    let wire = Transcoder::encode_to_bytes(&input);
    let mut transcoder = Transcoder::new();
    let decoded: Vec<u8> = wire.iter().filter_map(|&b| transcoder.decode_byte(b)).collect();
    let high_bit = wire.iter().all(|b| b & 0x80 != 0);
    CheckResult::outcome(
        "transcoder_vector",
        high_bit && decoded[..] == input[..],
        "every wire byte has bit 7 set and decodes back",
        format!("high_bit={high_bit}, decoded {:?}", &decoded[..]),
    )
}

fn envelope_roundtrip(kind: EnvelopeKind) -> CheckResult {
    let name = format!("envelope_{}", kind.name().to_ascii_lowercase());
    let mut envelope = Envelope::create(kind, 0, &EnvelopeSettings::default());
    let msg = Message::new(
        0,
        protocol::RICREST,
        MessageType::Command,
        42,
        &br#"{"cmdName":"doctor"}"#[..],
    );
    let wire = match envelope.encode(&msg) {
        Ok(wire) => wire,
        Err(err) => return CheckResult::outcome(&name, false, "", err.to_string()),
    };
    let mut decoded = Vec::new();
    envelope.decode(&wire.payload, &mut |m| decoded.push(m));
    let ok = decoded.len() == 1 && decoded[0].payload == msg.payload;
    CheckResult::outcome(
        &name,
        ok,
        &format!("{} bytes on the wire", wire.payload.len()),
        format!("{} messages decoded", decoded.len()),
    )
}

fn compiled_features_check() -> CheckResult {
    let mut features = vec!["cli"];
    if cfg!(feature = "async") {
        features.push("async");
    }

    CheckResult {
        name: "compiled_features".to_string(),
        status: CheckStatus::Info,
        detail: features.join(", "),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_builtin_check_passes() {
        let mut checks = vec![
            crc_check_value(),
            framer_roundtrip(),
            framer_rejects_corruption(),
            bitwise_roundtrip(),
            transcoder_vector(),
        ];
        checks.extend(EnvelopeKind::ALL.into_iter().map(envelope_roundtrip));
        for check in &checks {
            assert!(
                matches!(check.status, CheckStatus::Pass),
                "{}: {}",
                check.name,
                check.detail
            );
        }
    }

    #[test]
    fn doctor_output_has_overall_status() {
        let output = DoctorOutput {
            checks: vec![crc_check_value()],
            overall: "pass",
        };
        let json = serde_json::to_string(&output).expect("doctor output should serialize");
        assert!(json.contains("\"overall\":\"pass\""));
        assert!(json.contains("\"status\":\"pass\""));
    }
}
