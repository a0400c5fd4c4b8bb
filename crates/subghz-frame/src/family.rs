/// Wire layout and payload limits of one radio module family.
///
/// Both families share the flags/type byte and the body encodings; they differ
/// in which extra header fields they carry and how much fits in one radio
/// frame.
pub trait ModuleFamily {
    /// Human-readable family name (used in logs).
    const NAME: &'static str;
    /// Largest packet, header included, that fits in one radio frame.
    const MAX_PAYLOAD: usize;
    /// Size of the packet header.
    const HEADER_SIZE: usize;
    /// Offset of the length byte, if the family carries one.
    const LENGTH_OFFSET: Option<usize>;
    /// Offset of the flags/type byte.
    const FLAGS_OFFSET: usize;
    /// Offset of the sequence byte, if the family carries one.
    const SEQUENCE_OFFSET: Option<usize>;

    /// Maximum body size of a single packet.
    fn body_capacity() -> usize {
        Self::MAX_PAYLOAD - Self::HEADER_SIZE
    }
}

/// Serial-attached IM920 module: `length | flags | sequence | body`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Im920;

impl ModuleFamily for Im920 {
    const NAME: &'static str = "IM920";
    const MAX_PAYLOAD: usize = 64;
    const HEADER_SIZE: usize = 3;
    const LENGTH_OFFSET: Option<usize> = Some(0);
    const FLAGS_OFFSET: usize = 1;
    const SEQUENCE_OFFSET: Option<usize> = Some(2);
}

/// Lazurite module behind a native driver: `flags | body`.
///
/// The driver spends 11 bytes of the 250-byte radio frame on its MAC header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Lazurite;

/// Radio frame size of a Lazurite module.
pub const LAZURITE_RADIO_FRAME: usize = 250;

/// Bytes of the radio frame used by the Lazurite MAC header.
pub const LAZURITE_MAC_HEADER: usize = 11;

impl ModuleFamily for Lazurite {
    const NAME: &'static str = "Lazurite";
    const MAX_PAYLOAD: usize = LAZURITE_RADIO_FRAME - LAZURITE_MAC_HEADER;
    const HEADER_SIZE: usize = 1;
    const LENGTH_OFFSET: Option<usize> = None;
    const FLAGS_OFFSET: usize = 0;
    const SEQUENCE_OFFSET: Option<usize> = None;
}
