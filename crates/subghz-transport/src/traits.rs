use std::io::{Read, Write};
use std::time::Duration;

#[cfg(unix)]
use std::time::Instant;

#[cfg(unix)]
use serialport::{ClearBuffer, SerialPort as _, TTYPort};

use crate::error::Result;

/// A serial line shared by one reading and one writing thread.
///
/// This is the contract the duplex engine consumes. Implementations must be
/// cloneable into independent handles so that a blocked read on one handle
/// does not prevent writes on another.
pub trait SerialPort: Read + Write + Send + 'static {
    /// Duplicate the handle (same underlying line).
    fn try_clone(&self) -> Result<Self>
    where
        Self: Sized;

    /// Number of bytes that can be read right now without blocking.
    fn bytes_available(&self) -> Result<usize>;

    /// Wait until input is readable or `timeout` elapses.
    ///
    /// Returns `true` when a subsequent `read` will not block (this includes
    /// end-of-stream and error conditions).
    fn wait_readable(&self, timeout: Duration) -> Result<bool>;

    /// Stop I/O on the line. Readers observe end-of-stream or an error.
    fn shutdown(&self) -> Result<()>;
}

/// A connected serial stream implementing Read + Write.
///
/// On Unix this wraps either a tty opened through `serialport` or a local
/// stream socket that carries the module's byte stream.
#[cfg(unix)]
pub struct SerialStream {
    inner: SerialStreamInner,
}

#[cfg(unix)]
enum SerialStreamInner {
    Tty(TTYPort),
    Socket(std::os::unix::net::UnixStream),
}

#[cfg(unix)]
impl Read for SerialStream {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match &mut self.inner {
            SerialStreamInner::Tty(port) => port.read(buf),
            SerialStreamInner::Socket(stream) => stream.read(buf),
        }
    }
}

#[cfg(unix)]
impl Write for SerialStream {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match &mut self.inner {
            SerialStreamInner::Tty(port) => port.write(buf),
            SerialStreamInner::Socket(stream) => stream.write(buf),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match &mut self.inner {
            SerialStreamInner::Tty(port) => port.flush(),
            SerialStreamInner::Socket(stream) => stream.flush(),
        }
    }
}

#[cfg(unix)]
impl SerialStream {
    /// Wrap an already configured tty device.
    pub(crate) fn from_tty(port: TTYPort) -> Self {
        Self {
            inner: SerialStreamInner::Tty(port),
        }
    }

    /// Wrap a local stream socket that carries a module's byte stream.
    pub fn from_socket(stream: std::os::unix::net::UnixStream) -> Self {
        Self {
            inner: SerialStreamInner::Socket(stream),
        }
    }

    /// A connected in-process pair, one end per side of the line.
    pub fn pair() -> Result<(Self, Self)> {
        let (left, right) = std::os::unix::net::UnixStream::pair()?;
        Ok((Self::from_socket(left), Self::from_socket(right)))
    }

    fn socket_bytes_available(stream: &std::os::unix::net::UnixStream) -> Result<usize> {
        use std::os::fd::AsRawFd;

        let mut available: libc::c_int = 0;

        // SAFETY: `available` is a valid writable c_int, which is what FIONREAD
        // stores, and the descriptor is owned by `stream` for the whole call.
        let rc = unsafe {
            libc::ioctl(
                stream.as_raw_fd(),
                libc::FIONREAD,
                &mut available as *mut libc::c_int,
            )
        };
        if rc < 0 {
            return Err(std::io::Error::last_os_error().into());
        }
        Ok(usize::try_from(available).unwrap_or(0))
    }

    fn socket_wait_readable(stream: &std::os::unix::net::UnixStream, timeout: Duration) -> Result<bool> {
        use std::os::fd::AsRawFd;

        let mut pfd = libc::pollfd {
            fd: stream.as_raw_fd(),
            events: libc::POLLIN,
            revents: 0,
        };
        let timeout_ms = libc::c_int::try_from(timeout.as_millis()).unwrap_or(libc::c_int::MAX);

        // SAFETY: `pfd` points to exactly one initialized pollfd and nfds is 1.
        let rc = unsafe { libc::poll(&mut pfd, 1, timeout_ms) };
        if rc < 0 {
            let err = std::io::Error::last_os_error();
            if err.kind() == std::io::ErrorKind::Interrupted {
                return Ok(false);
            }
            return Err(err.into());
        }

        Ok(rc > 0 && pfd.revents & (libc::POLLIN | libc::POLLHUP | libc::POLLERR) != 0)
    }
}

/// Step between input checks while a tty waits to become readable.
#[cfg(unix)]
const TTY_POLL_STEP: Duration = Duration::from_millis(2);

#[cfg(unix)]
impl SerialPort for SerialStream {
    fn try_clone(&self) -> Result<Self> {
        match &self.inner {
            SerialStreamInner::Tty(port) => Ok(Self::from_tty(port.try_clone_native()?)),
            SerialStreamInner::Socket(stream) => Ok(Self::from_socket(stream.try_clone()?)),
        }
    }

    fn bytes_available(&self) -> Result<usize> {
        match &self.inner {
            SerialStreamInner::Tty(port) => Ok(port.bytes_to_read()? as usize),
            SerialStreamInner::Socket(stream) => Self::socket_bytes_available(stream),
        }
    }

    fn wait_readable(&self, timeout: Duration) -> Result<bool> {
        match &self.inner {
            SerialStreamInner::Tty(port) => {
                let deadline = Instant::now() + timeout;
                loop {
                    if port.bytes_to_read()? > 0 {
                        return Ok(true);
                    }
                    let now = Instant::now();
                    if now >= deadline {
                        return Ok(false);
                    }
                    std::thread::sleep(TTY_POLL_STEP.min(deadline - now));
                }
            }
            SerialStreamInner::Socket(stream) => Self::socket_wait_readable(stream, timeout),
        }
    }

    fn shutdown(&self) -> Result<()> {
        match &self.inner {
            SerialStreamInner::Tty(port) => Ok(port.clear(ClearBuffer::All)?),
            SerialStreamInner::Socket(stream) => match stream.shutdown(std::net::Shutdown::Both) {
                Ok(()) => Ok(()),
                Err(err) if err.kind() == std::io::ErrorKind::NotConnected => Ok(()),
                Err(err) => Err(err.into()),
            },
        }
    }
}

#[cfg(unix)]
impl std::fmt::Debug for SerialStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.inner {
            SerialStreamInner::Tty(port) => f
                .debug_struct("SerialStream")
                .field("type", &"tty")
                .field("name", &port.name())
                .finish(),
            SerialStreamInner::Socket(_) => f
                .debug_struct("SerialStream")
                .field("type", &"socket")
                .finish(),
        }
    }
}
