//! Packet and frame codecs for IM920 and Lazurite sub-GHz radio modules.
//!
//! Both module families share one logical packet format:
//! - A flags/type byte (fragmented, ack requested, 3-bit type)
//! - IM920 only: a length byte in front and a sequence byte after it
//! - A body that depends on the type: DATA, COMMAND, ACK or NOTICE
//!
//! Frames wrap a packet with what the module reports about it (sender,
//! signal strength). Oversized payloads are split with [`chop`].

pub mod codec;
pub mod error;
pub mod family;
pub mod fragment;
pub mod frame;
pub mod line;
pub mod packet;

pub use codec::{decode_packet, encode_packet, encode_packet_into};
pub use error::{FrameError, Result};
pub use family::{Im920, Lazurite, ModuleFamily};
pub use fragment::{chop, chop_for};
pub use frame::{Im920Frame, LazuriteFrame, MacHeader, SubGhzFrame};
pub use line::{format_frame_line, is_frame_line, parse_frame_line, Im920Meta, MIN_FRAME_LINE_LEN};
pub use packet::{Body, Packet, PacketType};
