use std::fmt;
use std::time::Duration;

use crate::error::{Result, TransportError};

/// Line speeds accepted by the modules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BaudRate {
    B1200,
    B2400,
    B4800,
    B9600,
    /// Factory default of the IM920.
    #[default]
    B19200,
    B38400,
    B57600,
    B115200,
}

impl BaudRate {
    pub const ALL: [BaudRate; 8] = [
        BaudRate::B1200,
        BaudRate::B2400,
        BaudRate::B4800,
        BaudRate::B9600,
        BaudRate::B19200,
        BaudRate::B38400,
        BaudRate::B57600,
        BaudRate::B115200,
    ];

    /// Bits per second.
    pub fn baud(self) -> u32 {
        match self {
            BaudRate::B1200 => 1200,
            BaudRate::B2400 => 2400,
            BaudRate::B4800 => 4800,
            BaudRate::B9600 => 9600,
            BaudRate::B19200 => 19200,
            BaudRate::B38400 => 38400,
            BaudRate::B57600 => 57600,
            BaudRate::B115200 => 115200,
        }
    }

    /// Look up a supported rate by its numeric value.
    pub fn from_baud(baud: u32) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|rate| rate.baud() == baud)
            .ok_or(TransportError::UnsupportedBaud(baud))
    }

    /// Time to shift one byte over the line (8N1 = 10 bit times), rounded up.
    ///
    /// The duplex engine uses this as its idle window when deciding that a
    /// multi-line reply is complete, and as the pause after a wake byte.
    pub fn byte_time(self) -> Duration {
        let bit_us = 1_000_000 / u64::from(self.baud()) + 1;
        Duration::from_micros(bit_us * 10)
    }
}

impl fmt::Display for BaudRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.baud())
    }
}
