use bytes::{BufMut, Bytes, BytesMut};
use tracing::debug;

use crate::error::{FrameError, Result};
use crate::family::ModuleFamily;
use crate::packet::{
    Packet, PacketType, FLAG_FRAGMENTED, FLAG_RESPONSE_REQUESTED, TYPE_MASK,
};

/// Encode a packet in the layout of family `F`.
///
/// The length byte (IM920) is always recomputed from the body. A packet without
/// a sequence number is written with sequence 0.
///
/// ```text
/// IM920     ┌────────┬───────┬──────────┬──────────────┐
///           │ length │ flags │ sequence │ body ...     │
///           └────────┴───────┴──────────┴──────────────┘
/// Lazurite  ┌───────┬──────────────┐
///           │ flags │ body ...     │
///           └───────┴──────────────┘
/// flags = fragmented (0x10) | ack requested (0x08) | type (0x07)
/// ```
pub fn encode_packet<F: ModuleFamily>(packet: &Packet) -> Result<Bytes> {
    let mut dst = BytesMut::new();
    encode_packet_into::<F>(packet, &mut dst)?;
    Ok(dst.freeze())
}

/// Append the encoding of `packet` to `dst`.
pub fn encode_packet_into<F: ModuleFamily>(packet: &Packet, dst: &mut BytesMut) -> Result<()> {
    let body_len = packet.body_len();
    if body_len > F::body_capacity() {
        return Err(FrameError::PayloadTooLarge {
            size: body_len,
            max: F::body_capacity(),
        });
    }

    let total = F::HEADER_SIZE + body_len;
    let mut header = [0u8; 8];
    if let Some(offset) = F::LENGTH_OFFSET {
        // Bounded by MAX_PAYLOAD, which fits a byte for every family.
        header[offset] = u8::try_from(total).unwrap_or(u8::MAX);
    }
    header[F::FLAGS_OFFSET] = packet.flags_byte();
    if let Some(offset) = F::SEQUENCE_OFFSET {
        header[offset] = packet.sequence.unwrap_or(0);
    }

    dst.reserve(total);
    dst.put_slice(&header[..F::HEADER_SIZE]);
    packet.put_body(dst);
    Ok(())
}

/// Decode a packet laid out for family `F`.
pub fn decode_packet<F: ModuleFamily>(src: &[u8]) -> Result<Packet> {
    if src.len() < F::HEADER_SIZE {
        return Err(FrameError::Truncated {
            needed: F::HEADER_SIZE,
            actual: src.len(),
        });
    }

    let flags = src[F::FLAGS_OFFSET];
    let packet_type = PacketType::from_id(flags & TYPE_MASK)?;

    if let Some(offset) = F::LENGTH_OFFSET {
        let declared = usize::from(src[offset]);
        if declared != src.len() {
            debug!(
                family = F::NAME,
                declared,
                actual = src.len(),
                "length byte disagrees with packet size"
            );
        }
    }

    let body = &src[F::HEADER_SIZE..];
    if body.len() > F::body_capacity() {
        return Err(FrameError::PayloadTooLarge {
            size: body.len(),
            max: F::body_capacity(),
        });
    }

    Ok(Packet {
        fragmented: flags & FLAG_FRAGMENTED != 0,
        response_requested: flags & FLAG_RESPONSE_REQUESTED != 0,
        sequence: F::SEQUENCE_OFFSET.map(|offset| src[offset]),
        body: Packet::parse_body(packet_type, body, F::HEADER_SIZE)?,
    })
}
