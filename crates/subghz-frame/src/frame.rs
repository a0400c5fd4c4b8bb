use std::fmt;

use bytes::Bytes;

use crate::codec::{decode_packet, encode_packet};
use crate::error::{FrameError, Result};
use crate::family::{Im920, Lazurite};
use crate::line::{parse_frame_line, Im920Meta};
use crate::packet::Packet;

/// Accessors shared by the frames of every module family.
pub trait SubGhzFrame {
    /// Bytes exchanged with the module for this frame.
    fn frame_bytes(&self) -> &Bytes;

    /// Radio payload. Frames carry no header of their own, so this is the
    /// encoded packet.
    fn payload(&self) -> &Bytes {
        self.frame_bytes()
    }

    fn packet(&self) -> &Packet;

    /// Sender address as lowercase hex; empty for outbound frames.
    fn sender(&self) -> &str;

    /// Signal strength of a received frame.
    fn rssi(&self) -> Option<i32>;
}

/// A frame exchanged with an IM920 module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Im920Frame {
    meta: Option<Im920Meta>,
    bytes: Bytes,
    packet: Packet,
    sender: String,
}

impl Im920Frame {
    /// Decode a received frame from its line metadata and payload bytes.
    pub fn decode(meta: Im920Meta, raw: Bytes) -> Result<Self> {
        let packet = decode_packet::<Im920>(&raw)?;
        Ok(Self {
            meta: Some(meta),
            sender: format!("{:x}", meta.module_id),
            bytes: raw,
            packet,
        })
    }

    /// Parse and decode one frame line printed by the module.
    pub fn from_line(line: &str) -> Result<Self> {
        let (meta, raw) = parse_frame_line(line)?;
        Self::decode(meta, raw)
    }

    /// Build a frame for transmission.
    pub fn outbound(packet: Packet) -> Result<Self> {
        let bytes = encode_packet::<Im920>(&packet)?;
        Ok(Self {
            meta: None,
            bytes,
            packet,
            sender: String::new(),
        })
    }

    pub fn node_id(&self) -> Option<u8> {
        self.meta.map(|m| m.node_id)
    }

    pub fn module_id(&self) -> Option<u16> {
        self.meta.map(|m| m.module_id)
    }

    pub fn meta(&self) -> Option<&Im920Meta> {
        self.meta.as_ref()
    }

    pub fn into_packet(self) -> Packet {
        self.packet
    }
}

impl SubGhzFrame for Im920Frame {
    fn frame_bytes(&self) -> &Bytes {
        &self.bytes
    }

    fn packet(&self) -> &Packet {
        &self.packet
    }

    fn sender(&self) -> &str {
        &self.sender
    }

    /// Signal strength as the module reports it: a signed byte.
    fn rssi(&self) -> Option<i32> {
        self.meta.map(|m| i32::from(m.rssi as i8))
    }
}

impl fmt::Display for Im920Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.meta {
            Some(meta) => write!(
                f,
                "IM920 node={:02X} module={:04X} rssi={:02X} {}",
                meta.node_id, meta.module_id, meta.rssi, self.packet
            ),
            None => write!(f, "IM920 outbound {}", self.packet),
        }
    }
}

/// MAC header the Lazurite driver decodes from a received radio frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MacHeader {
    pub frame_type: u8,
    pub ack_req: bool,
    pub seq_num: u8,
    pub addr_type: u8,
    pub rx_panid: u16,
    /// Destination address, little-endian.
    pub rx_addr: [u8; 8],
    pub tx_panid: u16,
    /// Source address, little-endian.
    pub tx_addr: [u8; 8],
    /// Offset of the payload inside the raw radio frame.
    pub payload_offset: usize,
    pub payload_len: usize,
    pub rssi: u8,
}

impl MacHeader {
    /// Source address as lowercase hex.
    pub fn source_addr(&self) -> String {
        format!("{:x}", u64::from_le_bytes(self.tx_addr))
    }

    /// Destination address as lowercase hex.
    pub fn destination_addr(&self) -> String {
        format!("{:x}", u64::from_le_bytes(self.rx_addr))
    }
}

/// A frame exchanged through the Lazurite native driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LazuriteFrame {
    bytes: Bytes,
    packet: Packet,
    mac: Option<MacHeader>,
    destination: Option<(u16, u16)>,
    sender: String,
}

impl LazuriteFrame {
    /// Decode the payload region of a raw radio frame described by `mac`.
    pub fn from_mac(mac: MacHeader, raw: &[u8]) -> Result<Self> {
        let end = mac.payload_offset + mac.payload_len;
        let payload = raw
            .get(mac.payload_offset..end)
            .ok_or(FrameError::Truncated {
                needed: end,
                actual: raw.len(),
            })?;
        let bytes = Bytes::copy_from_slice(payload);
        let packet = decode_packet::<Lazurite>(&bytes)?;

        Ok(Self {
            sender: mac.source_addr(),
            bytes,
            packet,
            mac: Some(mac),
            destination: None,
        })
    }

    /// Build a frame for transmission to `addr` on PAN `pan_id`.
    pub fn outbound(pan_id: u16, addr: u16, packet: Packet) -> Result<Self> {
        let bytes = encode_packet::<Lazurite>(&packet)?;
        Ok(Self {
            bytes,
            packet,
            mac: None,
            destination: Some((pan_id, addr)),
            sender: String::new(),
        })
    }

    /// MAC header of a received frame.
    pub fn mac_header(&self) -> Option<&MacHeader> {
        self.mac.as_ref()
    }

    pub fn destination_pan_id(&self) -> Option<u16> {
        self.destination.map(|(pan, _)| pan)
    }

    pub fn destination_addr(&self) -> Option<u16> {
        self.destination.map(|(_, addr)| addr)
    }

    /// Receiver address of a received frame as lowercase hex.
    pub fn receiver(&self) -> Option<String> {
        self.mac.as_ref().map(MacHeader::destination_addr)
    }

    pub fn into_packet(self) -> Packet {
        self.packet
    }
}

impl SubGhzFrame for LazuriteFrame {
    fn frame_bytes(&self) -> &Bytes {
        &self.bytes
    }

    fn packet(&self) -> &Packet {
        &self.packet
    }

    fn sender(&self) -> &str {
        &self.sender
    }

    fn rssi(&self) -> Option<i32> {
        self.mac.map(|m| i32::from(m.rssi))
    }
}

impl fmt::Display for LazuriteFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.mac, self.destination) {
            (Some(mac), _) => write!(
                f,
                "Lazurite src=0x{} dst=0x{} seq={} rssi={} {}",
                mac.source_addr(),
                mac.destination_addr(),
                mac.seq_num,
                mac.rssi,
                self.packet
            ),
            (None, Some((pan, addr))) => {
                write!(f, "Lazurite to pan=0x{pan:04x} addr=0x{addr:04x} {}", self.packet)
            }
            (None, None) => write!(f, "Lazurite {}", self.packet),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::Body;

    #[test]
    fn im920_frame_from_line() {
        // length 8, DATA, seq 3, "HELLO"
        let frame = Im920Frame::from_line("01,00A2,1A:08,00,03,48,45,4C,4C,4F").unwrap();
        assert_eq!(frame.node_id(), Some(1));
        assert_eq!(frame.module_id(), Some(0x00A2));
        assert_eq!(frame.sender(), "a2");
        assert_eq!(frame.rssi(), Some(0x1A));
        assert_eq!(frame.packet().sequence, Some(3));
        assert_eq!(frame.packet().body, Body::Data(Bytes::from_static(b"HELLO")));
        assert_eq!(frame.payload().len(), 8);
    }

    #[test]
    fn im920_rssi_is_signed() {
        let frame = Im920Frame::from_line("01,ABCD,C8:03,03,00").unwrap();
        assert_eq!(frame.rssi(), Some(-56));

        let frame = Im920Frame::from_line("01,ABCD,7F:03,03,00").unwrap();
        assert_eq!(frame.rssi(), Some(127));
    }

    #[test]
    fn im920_unknown_type_fails_frame() {
        let err = Im920Frame::from_line("01,0002,1A:03,05,00").unwrap_err();
        assert!(matches!(err, FrameError::InvalidPacketType(5)));
    }

    #[test]
    fn im920_outbound_has_no_metadata() {
        let packet = Packet::notice("hi").with_sequence(1);
        let frame = Im920Frame::outbound(packet.clone()).unwrap();
        assert_eq!(frame.rssi(), None);
        assert_eq!(frame.sender(), "");
        assert_eq!(frame.frame_bytes().as_ref(), &[5, 0x03, 1, b'h', b'i']);

        let decoded = Im920Frame::decode(Im920Meta::default(), frame.frame_bytes().clone()).unwrap();
        assert_eq!(decoded.payload(), frame.payload());
        assert_eq!(decoded.packet(), &packet);
    }

    fn mac_for(payload_offset: usize, payload_len: usize) -> MacHeader {
        MacHeader {
            frame_type: 1,
            seq_num: 42,
            tx_addr: [0x34, 0x12, 0, 0, 0, 0, 0, 0],
            rx_addr: [0xFF, 0xFF, 0, 0, 0, 0, 0, 0],
            tx_panid: 0xABCD,
            rx_panid: 0xABCD,
            payload_offset,
            payload_len,
            rssi: 200,
            ..MacHeader::default()
        }
    }

    #[test]
    fn lazurite_frame_slices_payload() {
        let mut raw = vec![0xEEu8; 9];
        raw.extend_from_slice(&[0x03, b'o', b'k']);
        raw.push(0xEE);

        let frame = LazuriteFrame::from_mac(mac_for(9, 3), &raw).unwrap();
        assert_eq!(frame.payload().as_ref(), &[0x03, b'o', b'k']);
        assert_eq!(frame.packet().body, Body::Notice("ok".to_string()));
        assert_eq!(frame.sender(), "1234");
        assert_eq!(frame.receiver().as_deref(), Some("ffff"));
        assert_eq!(frame.rssi(), Some(200));
        assert_eq!(frame.destination_pan_id(), None);
    }

    #[test]
    fn lazurite_frame_rejects_short_raw() {
        let err = LazuriteFrame::from_mac(mac_for(9, 10), &[0u8; 12]).unwrap_err();
        assert!(matches!(err, FrameError::Truncated { needed: 19, actual: 12 }));
    }

    #[test]
    fn lazurite_outbound_roundtrip() {
        let packet = Packet::command(9, "led", true);
        let frame = LazuriteFrame::outbound(0xABCD, 0x1234, packet.clone()).unwrap();
        assert_eq!(frame.destination_pan_id(), Some(0xABCD));
        assert_eq!(frame.destination_addr(), Some(0x1234));
        assert!(frame.mac_header().is_none());
        assert_eq!(frame.rssi(), None);

        let len = frame.frame_bytes().len();
        let received = LazuriteFrame::from_mac(mac_for(0, len), frame.frame_bytes()).unwrap();
        assert_eq!(received.payload(), frame.payload());
        assert_eq!(received.packet(), &packet);
    }

    #[test]
    fn display_is_readable() {
        let frame = Im920Frame::from_line("01,0002,1A:06,03,00,61,62,63").unwrap();
        let text = frame.to_string();
        assert!(text.contains("module=0002"));
        assert!(text.contains("NOTICE"));
    }
}
