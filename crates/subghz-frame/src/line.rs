//! Text syntax of frames received by an IM920 module.
//!
//! The module reports every radio frame as one line:
//!
//! ```text
//! NN,MMMM,RR:P0,P1,...,Pn
//! ```
//!
//! `NN` is the node number, `MMMM` the sender's module id, `RR` the signal
//! strength, followed by the payload bytes. Depending on firmware the payload
//! bytes are separated by `,` or `:`.

use bytes::Bytes;

use crate::error::{FrameError, Result};

/// Shortest possible frame line (`NN,MMMM,RR:PP`).
pub const MIN_FRAME_LINE_LEN: usize = 11;

/// Metadata the module prepends to every received frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Im920Meta {
    pub node_id: u8,
    pub module_id: u16,
    /// Raw RSSI byte as reported by the module.
    pub rssi: u8,
}

/// Whether `line` follows the frame syntax.
pub fn is_frame_line(line: &str) -> bool {
    line.len() >= MIN_FRAME_LINE_LEN && split_frame_line(line).is_some()
}

/// Parse one frame line into its metadata and payload bytes.
pub fn parse_frame_line(line: &str) -> Result<(Im920Meta, Bytes)> {
    let malformed = || FrameError::MalformedFrame(line.to_string());

    if line.len() < MIN_FRAME_LINE_LEN {
        return Err(malformed());
    }
    let (node, module, rssi, payload) = split_frame_line(line).ok_or_else(malformed)?;

    let meta = Im920Meta {
        node_id: hex_byte(node)?,
        module_id: u16::from_be_bytes(hex_array::<2>(module)?),
        rssi: hex_byte(rssi)?,
    };

    let mut bytes = Vec::with_capacity(payload.len() / 3 + 1);
    for pair in payload.split([',', ':']) {
        bytes.push(hex_byte(pair)?);
    }

    Ok((meta, Bytes::from(bytes)))
}

/// Render a received frame the way the module prints it.
pub fn format_frame_line(meta: &Im920Meta, payload: &[u8]) -> String {
    let body = payload
        .iter()
        .map(|b| format!("{b:02X}"))
        .collect::<Vec<_>>()
        .join(",");
    format!(
        "{:02X},{:04X},{:02X}:{body}",
        meta.node_id, meta.module_id, meta.rssi
    )
}

// Returns the four fields once the structure is known to be well formed.
fn split_frame_line(line: &str) -> Option<(&str, &str, &str, &str)> {
    let (head, payload) = line.split_once(':')?;

    let mut fields = head.split(',');
    let node = fields.next()?;
    let module = fields.next()?;
    let rssi = fields.next()?;
    if fields.next().is_some() {
        return None;
    }
    if !is_hex_of_len(node, 2) || !is_hex_of_len(module, 4) || !is_hex_of_len(rssi, 2) {
        return None;
    }

    if payload.is_empty() || !payload.split([',', ':']).all(|pair| is_hex_of_len(pair, 2)) {
        return None;
    }

    Some((node, module, rssi, payload))
}

fn is_hex_of_len(field: &str, len: usize) -> bool {
    field.len() == len && field.bytes().all(|b| b.is_ascii_hexdigit())
}

fn hex_byte(pair: &str) -> Result<u8> {
    Ok(hex_array::<1>(pair)?[0])
}

fn hex_array<const N: usize>(text: &str) -> Result<[u8; N]> {
    let mut out = [0u8; N];
    hex::decode_to_slice(text, &mut out)?;
    Ok(out)
}
