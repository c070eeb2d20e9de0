use ricwire_endpoint::EnvelopeKind;

use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

pub fn run(args: VersionArgs) -> CliResult<i32> {
    let version = env!("CARGO_PKG_VERSION");
    if !args.extended {
        println!("ricwire {version}");
        return Ok(SUCCESS);
    }

    let envelopes: Vec<&str> = EnvelopeKind::ALL.iter().map(|k| k.name()).collect();
    println!("name: ricwire");
    println!("version: {version}");
    println!("target: {}-{}", std::env::consts::ARCH, std::env::consts::OS);
    println!("envelopes: {}", envelopes.join(", "));
    println!("crc: CRC-16/CCITT (poly 0x1021, init 0xffff)");
    println!(
        "framing: boundary {:#04x}, escape {:#04x}, max {} bytes",
        ricwire_frame::DEFAULT_BOUNDARY_OCTET,
        ricwire_frame::DEFAULT_ESCAPE_OCTET,
        ricwire_frame::DEFAULT_MAX_RX_LEN
    );
    println!("features: async={}, cli=true", cfg!(feature = "async"));

    Ok(SUCCESS)
}
