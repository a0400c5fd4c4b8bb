use std::path::Path;
use std::time::Duration;

use serialport::{DataBits, FlowControl, Parity, StopBits};
use tracing::{info, warn};

use crate::baud::BaudRate;
use crate::error::{Result, TransportError};
use crate::traits::SerialStream;

/// Upper bound on a single blocking read once input was reported ready.
const TTY_READ_TIMEOUT: Duration = Duration::from_secs(1);

impl SerialStream {
    /// Open a tty device as a raw 8N1 serial line at `baud`.
    ///
    /// The port is held exclusively for the lifetime of the stream; a
    /// second opener gets [`TransportError::PortInUse`]. Nothing is retried.
    pub fn open(path: impl AsRef<Path>, baud: BaudRate) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            warn!(?path, "no such port");
            return Err(TransportError::NoSuchPort {
                path: path.to_path_buf(),
            });
        }

        let mut port = serialport::new(path.to_string_lossy(), baud.baud())
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(TTY_READ_TIMEOUT)
            .open_native()
            .map_err(|e| open_error(path, e))?;

        if let Err(e) = port.set_exclusive(true) {
            // The line still works; another opener is just not kept out.
            warn!(?path, error = %e, "could not take the port exclusively; keep running");
        }

        info!(?path, %baud, "opened serial port");
        Ok(Self::from_tty(port))
    }
}

fn open_error(path: &Path, err: serialport::Error) -> TransportError {
    let path = path.to_path_buf();
    match err.kind() {
        serialport::ErrorKind::NoDevice => {
            warn!(?path, "no such port");
            TransportError::NoSuchPort { path }
        }
        serialport::ErrorKind::Io(std::io::ErrorKind::NotFound) => TransportError::NoSuchPort { path },
        serialport::ErrorKind::InvalidInput => {
            warn!(?path, "only serial ports are handled");
            TransportError::Configure {
                path,
                source: err.into(),
            }
        }
        // EBUSY carries no dedicated kind; the description names it.
        serialport::ErrorKind::Unknown if is_busy(&err) => {
            warn!(?path, "port is currently in use");
            TransportError::PortInUse { path }
        }
        _ => TransportError::Open {
            path,
            source: err.into(),
        },
    }
}

fn is_busy(err: &serialport::Error) -> bool {
    err.description.to_ascii_lowercase().contains("busy")
}
