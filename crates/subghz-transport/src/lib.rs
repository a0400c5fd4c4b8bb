//! Serial line abstraction for sub-GHz radio modules.
//!
//! Provides one interface over the ways a module can be attached:
//! - tty devices (USB-serial adapters, on-board UARTs)
//! - local stream sockets (pty bridges such as `socat`, test harnesses)
//!
//! This is the lowest layer of subghz. The duplex engine in `subghz-link`
//! only talks to the [`SerialPort`] trait defined here.

pub mod baud;
pub mod error;
pub mod traits;

#[cfg(unix)]
pub mod tty;

pub use baud::BaudRate;
pub use error::{Result, TransportError};
pub use traits::SerialPort;

#[cfg(unix)]
pub use traits::SerialStream;
