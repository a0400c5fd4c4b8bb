use std::fs;

use bytes::Bytes;
use subghz_frame::Packet;
use subghz_link::Im920Radio;
use tracing::info;

use crate::cmd::SendArgs;
use crate::exit::{io_error, link_error, CliError, CliResult, DATA_INVALID, SUCCESS, USAGE};
use crate::output::OutputFormat;

/// What `send` puts on the air.
#[derive(Debug, PartialEq, Eq)]
enum Payload {
    Data(Bytes),
    Notice(String),
}

pub fn run(args: SendArgs, _format: OutputFormat) -> CliResult<i32> {
    let payload = resolve_payload(&args)?;
    let radio = Im920Radio::new(args.port.open()?);

    let sent = match payload {
        Payload::Notice(text) => radio.send_confirmed(Packet::notice(text)).map(|_| ()),
        Payload::Data(bytes) => {
            let size = bytes.len();
            let result = radio.send_data_confirmed(bytes);
            if result.is_ok() {
                info!(size, next_sequence = radio.next_sequence(), "payload sent");
            }
            result
        }
    };
    radio.close();
    sent.map_err(|err| link_error("send failed", err))?;

    Ok(SUCCESS)
}

fn resolve_payload(args: &SendArgs) -> CliResult<Payload> {
    if let Some(data) = &args.data {
        if args.notice {
            return Ok(Payload::Notice(data.clone()));
        }
        return Ok(Payload::Data(Bytes::copy_from_slice(data.as_bytes())));
    }
    if let Some(digits) = &args.hex {
        return hex::decode(digits.trim())
            .map(|raw| Payload::Data(Bytes::from(raw)))
            .map_err(|err| CliError::new(DATA_INVALID, format!("--hex is not valid hex: {err}")));
    }
    if let Some(path) = &args.file {
        return fs::read(path)
            .map(|raw| Payload::Data(Bytes::from(raw)))
            .map_err(|err| io_error(&format!("failed reading {}", path.display()), err));
    }
    Err(CliError::new(USAGE, "one of --data, --hex or --file is required"))
}
