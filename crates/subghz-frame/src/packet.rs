use std::fmt;

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{FrameError, Result};

/// Header flag: more fragments of the same payload follow.
pub const FLAG_FRAGMENTED: u8 = 0x10;

/// Header flag: the sender wants an ACK packet back.
pub const FLAG_RESPONSE_REQUESTED: u8 = 0x08;

/// Low bits of the flags byte that carry the packet type.
pub const TYPE_MASK: u8 = 0x07;

/// Size of the command code that leads COMMAND and ACK bodies.
pub const COMMAND_CODE_SIZE: usize = 1;

/// The four message kinds shared by both module families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum PacketType {
    Data = 0,
    Command = 1,
    Ack = 2,
    Notice = 3,
}

impl PacketType {
    /// Wire tag of this type.
    pub fn id(self) -> u8 {
        self as u8
    }

    /// Look up a type by its wire tag.
    pub fn from_id(id: u8) -> Result<Self> {
        match id {
            0 => Ok(PacketType::Data),
            1 => Ok(PacketType::Command),
            2 => Ok(PacketType::Ack),
            3 => Ok(PacketType::Notice),
            other => Err(FrameError::InvalidPacketType(other)),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            PacketType::Data => "DATA",
            PacketType::Command => "COMMAND",
            PacketType::Ack => "ACK",
            PacketType::Notice => "NOTICE",
        }
    }
}

impl TryFrom<u8> for PacketType {
    type Error = FrameError;

    fn try_from(id: u8) -> Result<Self> {
        Self::from_id(id)
    }
}

impl fmt::Display for PacketType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Variant body of a packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Body {
    /// Raw application bytes.
    Data(Bytes),
    /// A command addressed to the remote application.
    Command { code: u8, param: String },
    /// The answer to a command.
    Ack { code: u8, response: String },
    /// Free-form notice text.
    Notice(String),
}

/// One protocol message: header flags, optional sequence number and body.
///
/// The length field of the wire header is not stored; it is derived from the
/// body every time the packet is encoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    /// More fragments of the same logical payload follow this one.
    pub fragmented: bool,
    /// The sender asks for an ACK.
    pub response_requested: bool,
    /// Sequence number. Only IM920 carries one on the wire; the session that
    /// sends the packet assigns it.
    pub sequence: Option<u8>,
    pub body: Body,
}

impl Packet {
    /// A DATA packet.
    pub fn data(data: impl Into<Bytes>, fragmented: bool) -> Self {
        Self::with_body(Body::Data(data.into()), fragmented, false)
    }

    /// A COMMAND packet.
    pub fn command(code: u8, param: impl Into<String>, response_requested: bool) -> Self {
        Self::with_body(
            Body::Command {
                code,
                param: param.into(),
            },
            false,
            response_requested,
        )
    }

    /// An ACK packet answering command `code`.
    pub fn ack(code: u8, response: impl Into<String>) -> Self {
        Self::with_body(
            Body::Ack {
                code,
                response: response.into(),
            },
            false,
            false,
        )
    }

    /// A NOTICE packet.
    pub fn notice(text: impl Into<String>) -> Self {
        Self::with_body(Body::Notice(text.into()), false, false)
    }

    fn with_body(body: Body, fragmented: bool, response_requested: bool) -> Self {
        Self {
            fragmented,
            response_requested,
            sequence: None,
            body,
        }
    }

    /// Set the sequence number.
    pub fn with_sequence(mut self, sequence: u8) -> Self {
        self.sequence = Some(sequence);
        self
    }

    pub fn packet_type(&self) -> PacketType {
        match self.body {
            Body::Data(_) => PacketType::Data,
            Body::Command { .. } => PacketType::Command,
            Body::Ack { .. } => PacketType::Ack,
            Body::Notice(_) => PacketType::Notice,
        }
    }

    /// Encoded size of the body in bytes.
    pub fn body_len(&self) -> usize {
        match &self.body {
            Body::Data(data) => data.len(),
            Body::Command { param: text, .. } | Body::Ack { response: text, .. } => {
                COMMAND_CODE_SIZE + text.chars().count()
            }
            Body::Notice(text) => text.chars().count(),
        }
    }

    /// The flags/type byte shared by both header layouts.
    pub fn flags_byte(&self) -> u8 {
        let mut byte = self.packet_type().id();
        if self.fragmented {
            byte |= FLAG_FRAGMENTED;
        }
        if self.response_requested {
            byte |= FLAG_RESPONSE_REQUESTED;
        }
        byte
    }

    pub(crate) fn put_body(&self, dst: &mut BytesMut) {
        match &self.body {
            Body::Data(data) => dst.put_slice(data),
            Body::Command { code, param: text } | Body::Ack { code, response: text } => {
                dst.put_u8(*code);
                put_ascii(text, dst);
            }
            Body::Notice(text) => put_ascii(text, dst),
        }
    }

    pub(crate) fn parse_body(packet_type: PacketType, body: &[u8], offset: usize) -> Result<Body> {
        let text_after_code = |body: &[u8]| -> Result<(u8, String)> {
            match body.split_first() {
                Some((code, rest)) => Ok((*code, ascii_string(rest))),
                None => Err(FrameError::Truncated {
                    needed: offset + COMMAND_CODE_SIZE,
                    actual: offset,
                }),
            }
        };

        Ok(match packet_type {
            PacketType::Data => Body::Data(Bytes::copy_from_slice(body)),
            PacketType::Command => {
                let (code, param) = text_after_code(body)?;
                Body::Command { code, param }
            }
            PacketType::Ack => {
                let (code, response) = text_after_code(body)?;
                Body::Ack { code, response }
            }
            PacketType::Notice => Body::Notice(ascii_string(body)),
        })
    }
}

impl fmt::Display for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} fragmented={} response_requested={}",
            self.packet_type(),
            self.fragmented,
            self.response_requested
        )?;
        if let Some(seq) = self.sequence {
            write!(f, " seq={seq}")?;
        }
        match &self.body {
            Body::Data(data) => write!(f, " data={}", hex::encode(data)),
            Body::Command { code, param } => write!(f, " command={code} param={param:?}"),
            Body::Ack { code, response } => write!(f, " command={code} response={response:?}"),
            Body::Notice(text) => write!(f, " notice={text:?}"),
        }
    }
}

// Strings travel one byte per character. Bytes outside 7-bit ASCII are not
// rejected: they map to U+0080..=U+00FF and back, so decode/encode is lossless.
fn put_ascii(text: &str, dst: &mut BytesMut) {
    dst.extend(
        text.chars()
            .map(|c| u8::try_from(u32::from(c)).unwrap_or(b'?')),
    );
}

fn ascii_string(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| char::from(b)).collect()
}
