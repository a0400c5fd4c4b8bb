use bytes::Bytes;

use crate::family::ModuleFamily;
use crate::packet::Packet;

/// Split `payload` into DATA packets of at most `capacity` body bytes.
///
/// Every packet but the last has `fragmented` set. The last one carries the
/// remainder, or a full `capacity` bytes when the payload length is a
/// multiple of `capacity`: exactly `k * capacity` bytes yield `k` packets.
/// An empty payload yields one empty packet. Sequence numbers are left unset.
///
/// # Panics
///
/// Panics if `capacity` is zero.
pub fn chop(payload: impl Into<Bytes>, capacity: usize) -> Vec<Packet> {
    assert!(capacity > 0, "fragment capacity must be non-zero");

    let mut rest: Bytes = payload.into();
    let mut packets = Vec::with_capacity(rest.len() / capacity + 1);
    while rest.len() > capacity {
        let head = rest.split_to(capacity);
        packets.push(Packet::data(head, true));
    }
    packets.push(Packet::data(rest, false));
    packets
}

/// [`chop`] with the body capacity of family `F`.
pub fn chop_for<F: ModuleFamily>(payload: impl Into<Bytes>) -> Vec<Packet> {
    chop(payload, F::body_capacity())
}
