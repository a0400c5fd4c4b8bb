//! Link-layer packet protocol for IM920 and Lazurite sub-GHz radio modules.
//!
//! subghz turns a serial-attached IM920 module, or a Lazurite module behind
//! its kernel driver, into a packet link: typed packets with sequence
//! numbers, fragmentation of large payloads, and a duplex engine that keeps
//! command responses apart from frames received over the air.
//!
//! # Crate Structure
//!
//! - [`transport`]: serial line abstraction (tty devices, stream sockets)
//! - [`frame`]: packet and frame codecs, fragmentation
//! - [`link`]: duplex engine, ticket pool and radio sessions (behind `link` feature)

/// Re-export transport types.
pub mod transport {
    pub use subghz_transport::*;
}

/// Re-export packet and frame types.
pub mod frame {
    pub use subghz_frame::*;
}

/// Re-export engine and session types (requires `link` feature).
#[cfg(feature = "link")]
pub mod link {
    pub use subghz_link::*;
}
