/// Errors that can occur during packet and frame encoding/decoding.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The type tag in the packet header is not DATA, COMMAND, ACK or NOTICE.
    #[error("invalid packet type id {0}")]
    InvalidPacketType(u8),

    /// The buffer is too short for the header (or the fixed part of the body).
    #[error("packet truncated ({actual} bytes, need at least {needed})")]
    Truncated { needed: usize, actual: usize },

    /// The body exceeds what the module family can carry in one packet.
    #[error("packet body too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// A received line does not follow the module's frame syntax.
    #[error("malformed frame line: {0:?}")]
    MalformedFrame(String),

    /// Hex text could not be decoded.
    #[error("invalid hex: {0}")]
    InvalidHex(#[from] hex::FromHexError),
}

pub type Result<T> = std::result::Result<T, FrameError>;
