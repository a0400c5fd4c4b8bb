use std::path::PathBuf;

/// Errors that can occur in serial transport operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The named port does not exist.
    #[error("{path}: no such port")]
    NoSuchPort { path: PathBuf },

    /// Another process holds the port.
    #[error("{path} is currently in use")]
    PortInUse { path: PathBuf },

    /// Failed to open the port device.
    #[error("failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The device could not be configured as a serial line.
    #[error("failed to configure {path}: {source}")]
    Configure {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The requested baud rate is not one the modules support.
    #[error("baud rate {0} is not supported")]
    UnsupportedBaud(u32),

    /// An I/O error occurred on the serial stream.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The serial driver failed on an open port.
    #[cfg(unix)]
    #[error("serial port error: {0}")]
    Serial(#[from] serialport::Error),
}

pub type Result<T> = std::result::Result<T, TransportError>;
