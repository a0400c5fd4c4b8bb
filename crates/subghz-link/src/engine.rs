use std::fmt;
use std::io::{ErrorKind, Read, Write};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender, TryRecvError};
use subghz_frame::{is_frame_line, parse_frame_line, FrameError, Im920Frame};
use subghz_transport::{BaudRate, SerialPort, TransportError};
use tracing::{debug, info, warn};

#[cfg(unix)]
use subghz_transport::SerialStream;

use crate::config::LinkConfig;
use crate::error::{LinkError, Result};
use crate::lines::LineBuffer;
use crate::ticket::{Ticket, TicketPool};

/// Replies of at most this many characters complete a command on their own.
pub const SHORT_RESPONSE_LEN: usize = 2;

/// Commands starting with this character wake a sleeping module first.
pub const WAKE_PREFIX: char = '?';

/// An inbound frame, or the reason its packet could not be decoded.
pub type ReceivedFrame = std::result::Result<Im920Frame, FrameError>;

/// Phase of the reader or writer cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CycleState {
    /// Waiting for input (reader) or for a command to send (writer).
    Idle = 0,
    Reading = 1,
    Writing = 2,
    /// Shutdown observed; the cycle is winding down.
    Interrupted = 3,
    /// The cycle's thread has exited.
    Stopped = 4,
}

impl CycleState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => CycleState::Idle,
            1 => CycleState::Reading,
            2 => CycleState::Writing,
            3 => CycleState::Interrupted,
            _ => CycleState::Stopped,
        }
    }
}

impl fmt::Display for CycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CycleState::Idle => "idle",
            CycleState::Reading => "reading",
            CycleState::Writing => "writing",
            CycleState::Interrupted => "interrupted",
            CycleState::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

#[derive(Clone)]
struct StateCell(Arc<AtomicU8>);

impl StateCell {
    fn new() -> Self {
        Self(Arc::new(AtomicU8::new(CycleState::Idle as u8)))
    }

    fn set(&self, state: CycleState) {
        self.0.store(state as u8, Ordering::Release);
    }

    fn get(&self) -> CycleState {
        CycleState::from_u8(self.0.load(Ordering::Acquire))
    }
}

/// Duplex engine for an IM920 module on a serial line.
///
/// Two threads share the line. The reader splits incoming text into lines
/// and routes each one: frame lines go to the inbound queue, everything else
/// is a command response. The writer sends one queued command at a time and
/// waits for its response before taking the next, so at most one command is
/// ever in flight while any number of threads may issue commands.
///
/// Responses are recognized by shape. A reply of one or two characters
/// (`OK`, `NG`) is complete as soon as its line ends. Longer lines are
/// buffered and delivered together once the line has been quiet for the
/// idle window (one byte time by default).
pub struct Im920Interface<P: SerialPort> {
    port: Mutex<P>,
    config: LinkConfig,
    pool: TicketPool,
    commands: Sender<Ticket>,
    inbound: Receiver<ReceivedFrame>,
    shutdown: Mutex<Option<Sender<()>>>,
    reader: Mutex<Option<JoinHandle<()>>>,
    writer: Mutex<Option<JoinHandle<()>>>,
    reader_state: StateCell,
    writer_state: StateCell,
}

#[cfg(unix)]
impl Im920Interface<SerialStream> {
    /// Open a serial port and start both cycles.
    pub fn open(path: impl AsRef<std::path::Path>, baud: BaudRate) -> Result<Self> {
        Self::open_with_config(path, LinkConfig::new(baud))
    }

    /// Open with explicit configuration.
    pub fn open_with_config(path: impl AsRef<std::path::Path>, config: LinkConfig) -> Result<Self> {
        let port = SerialStream::open(path, config.baud)?;
        Self::from_port(port, config)
    }
}

impl<P: SerialPort> Im920Interface<P> {
    /// Start both cycles on an already opened line.
    pub fn from_port(port: P, config: LinkConfig) -> Result<Self> {
        let reader_port = port.try_clone()?;
        let writer_port = port.try_clone()?;

        let (command_tx, command_rx) = unbounded::<Ticket>();
        let (inbound_tx, inbound_rx) = unbounded::<ReceivedFrame>();
        let (response_tx, response_rx) = unbounded::<Vec<String>>();
        let (shutdown_tx, shutdown_rx) = unbounded::<()>();

        let pool = TicketPool::new(config.initial_tickets, config.ticket_growth);
        let reader_state = StateCell::new();
        let writer_state = StateCell::new();

        let reader = ReaderCycle {
            port: reader_port,
            inbound: inbound_tx,
            responses: response_tx,
            shutdown: shutdown_rx.clone(),
            state: reader_state.clone(),
            idle: config.idle_window(),
            poll_interval: config.poll_interval,
        };
        let writer = WriterCycle {
            port: writer_port,
            commands: command_rx,
            responses: response_rx,
            shutdown: shutdown_rx,
            state: writer_state.clone(),
            byte_time: config.baud.byte_time(),
        };

        let reader = thread::Builder::new()
            .name("im920-reader".to_string())
            .spawn(move || reader.run())
            .map_err(TransportError::from)?;
        let writer = match thread::Builder::new()
            .name("im920-writer".to_string())
            .spawn(move || writer.run())
        {
            Ok(handle) => handle,
            Err(e) => {
                drop(shutdown_tx);
                let _ = port.shutdown();
                let _ = reader.join();
                return Err(TransportError::from(e).into());
            }
        };

        info!(baud = %config.baud, "IM920 interface started");

        Ok(Self {
            port: Mutex::new(port),
            config,
            pool,
            commands: command_tx,
            inbound: inbound_rx,
            shutdown: Mutex::new(Some(shutdown_tx)),
            reader: Mutex::new(Some(reader)),
            writer: Mutex::new(Some(writer)),
            reader_state,
            writer_state,
        })
    }

    /// Queue a raw command (terminator included) and return its ticket.
    pub fn submit(&self, command: impl Into<String>, sync: bool) -> Result<Ticket> {
        if self.pool.is_closed() {
            return Err(LinkError::Closed);
        }
        let ticket = self.pool.checkin(command, sync);
        debug!(command = %ticket.command().trim_end(), sync, "command queued");
        self.commands
            .send(ticket.clone())
            .map_err(|_| LinkError::Closed)?;
        Ok(ticket)
    }

    /// Transmit `data` over the air without waiting for the module's reply.
    pub fn send_data_async(&self, data: &[u8]) -> Result<()> {
        self.submit(txda(data), false).map(|_| ())
    }

    /// Transmit `data` over the air and wait for the module to confirm.
    pub fn send_data(&self, data: &[u8]) -> Result<()> {
        self.queue_data(data)?.wait()
    }

    /// Queue `data` for transmission; the module's confirmation is awaited
    /// separately with [`PendingSend::wait`].
    pub fn queue_data(&self, data: &[u8]) -> Result<PendingSend> {
        let ticket = self.submit(txda(data), true)?;
        Ok(PendingSend { ticket })
    }

    /// Let the module sleep between receive windows (`DSRX`).
    pub fn enable_sleep(&self) -> Result<()> {
        self.exec_expect("DSRX", "OK")
    }

    /// Wake the module and keep it listening (`?ENRX`).
    pub fn disable_sleep(&self) -> Result<()> {
        self.exec_expect("?ENRX", "OK")
    }

    /// Active time per intermittent receive cycle (`RWTM`).
    pub fn active_duration(&self) -> Result<u16> {
        self.exec_hex("RWTM")
    }

    pub fn set_active_duration(&self, duration: u16) -> Result<()> {
        self.exec_expect(&format!("SWTM{duration:04X}"), "OK")
    }

    /// Sleep time per intermittent receive cycle (`RSTM`).
    pub fn sleep_duration(&self) -> Result<u16> {
        self.exec_hex("RSTM")
    }

    pub fn set_sleep_duration(&self, duration: u16) -> Result<()> {
        self.exec_expect(&format!("SSTM{duration:04X}"), "OK")
    }

    /// Software reset (`SRST`); succeeds once the version banner comes back.
    pub fn reset_interface(&self) -> Result<()> {
        self.exec_expect("SRST", "IM920 Ver.")
    }

    /// Run any module command and return its response lines.
    pub fn exec(&self, command: &str) -> Result<Vec<String>> {
        self.submit(format!("{command}\r\n"), true)?.checkout()
    }

    /// Block until the next frame arrives.
    ///
    /// Frames whose packet fails to decode are reported as
    /// [`LinkError::Frame`]; the next call moves on to the following frame.
    pub fn take_received_frame(&self) -> Result<Im920Frame> {
        let frame = self.inbound.recv().map_err(|_| LinkError::Closed)?;
        Ok(frame?)
    }

    /// Like [`take_received_frame`](Self::take_received_frame), giving up after
    /// `timeout` with `Ok(None)`.
    pub fn try_take_received_frame(&self, timeout: Duration) -> Result<Option<Im920Frame>> {
        match self.inbound.recv_timeout(timeout) {
            Ok(frame) => Ok(Some(frame?)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(LinkError::Closed),
        }
    }

    /// Time to shift one byte over the line.
    pub fn byte_time(&self) -> Duration {
        self.config.baud.byte_time()
    }

    pub fn config(&self) -> &LinkConfig {
        &self.config
    }

    pub fn ticket_pool(&self) -> &TicketPool {
        &self.pool
    }

    pub fn reader_state(&self) -> CycleState {
        self.reader_state.get()
    }

    pub fn writer_state(&self) -> CycleState {
        self.writer_state.get()
    }

    pub fn is_closed(&self) -> bool {
        lock(&self.shutdown).is_none()
    }

    /// Stop both cycles and wait for them to exit.
    ///
    /// Issuers blocked on a response get [`LinkError::Interrupted`]; frames
    /// already queued can still be taken. Calling `close` again is a no-op.
    pub fn close(&self) {
        let Some(shutdown) = lock(&self.shutdown).take() else {
            return;
        };
        drop(shutdown);
        self.pool.close();

        if let Err(e) = lock(&self.port).shutdown() {
            debug!(error = %e, "serial shutdown failed; reader exits on next poll");
        }

        for (name, handle) in [("reader", &self.reader), ("writer", &self.writer)] {
            if let Some(handle) = lock(handle).take() {
                if handle.join().is_err() {
                    warn!(cycle = name, "cycle thread panicked");
                }
            }
        }
        info!("IM920 interface closed");
    }

    fn exec_expect(&self, command: &str, expected: &str) -> Result<()> {
        let responses = self.exec(command)?;
        expect_prefix(command, &responses, expected)
    }

    fn exec_hex(&self, command: &str) -> Result<u16> {
        let responses = self.exec(command)?;
        let first = responses.first().map(String::as_str).unwrap_or("");
        if first.starts_with("NG") {
            info!(command, "module rejected command");
            return Err(LinkError::CommandFailed {
                command: command.to_string(),
                response: first.to_string(),
            });
        }
        first
            .get(..4)
            .and_then(|digits| u16::from_str_radix(digits, 16).ok())
            .ok_or_else(|| LinkError::UnexpectedResponse {
                command: command.to_string(),
                response: first.to_string(),
            })
    }
}

/// A queued `TXDA` whose confirmation has not been collected yet.
#[derive(Debug)]
pub struct PendingSend {
    ticket: Ticket,
}

impl PendingSend {
    /// Block until the module answers; anything but `OK` is an error.
    pub fn wait(self) -> Result<()> {
        let responses = self.ticket.checkout()?;
        expect_prefix(self.ticket.command().trim_end(), &responses, "OK")
    }
}

impl<P: SerialPort> Drop for Im920Interface<P> {
    fn drop(&mut self) {
        self.close();
    }
}

impl<P: SerialPort> fmt::Debug for Im920Interface<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Im920Interface")
            .field("baud", &self.config.baud)
            .field("reader", &self.reader_state())
            .field("writer", &self.writer_state())
            .field("tickets", &self.pool)
            .finish()
    }
}

fn txda(data: &[u8]) -> String {
    format!("TXDA{}\r\n", hex::encode_upper(data))
}

fn expect_prefix(command: &str, responses: &[String], expected: &str) -> Result<()> {
    let command = command.trim_end();
    let first = responses.first().map(String::as_str).unwrap_or("");
    if first.starts_with(expected) {
        return Ok(());
    }
    if first.starts_with("NG") {
        info!(command, "module rejected command");
        return Err(LinkError::CommandFailed {
            command: command.to_string(),
            response: first.to_string(),
        });
    }
    Err(LinkError::UnexpectedResponse {
        command: command.to_string(),
        response: responses.join("\n"),
    })
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Where a received line goes.
#[derive(Debug, PartialEq, Eq)]
enum LineKind {
    Frame,
    ShortResponse,
    ResponsePart,
}

fn classify(line: &str) -> LineKind {
    if is_frame_line(line) {
        LineKind::Frame
    } else if line.chars().count() <= SHORT_RESPONSE_LEN {
        LineKind::ShortResponse
    } else {
        LineKind::ResponsePart
    }
}

fn is_shut_down(shutdown: &Receiver<()>) -> bool {
    matches!(shutdown.try_recv(), Err(TryRecvError::Disconnected))
}

/// Sleep for `duration` unless shutdown comes first. Returns `false` on shutdown.
fn pause(shutdown: &Receiver<()>, duration: Duration) -> bool {
    !matches!(
        shutdown.recv_timeout(duration),
        Err(RecvTimeoutError::Disconnected)
    )
}

struct ReaderCycle<P> {
    port: P,
    inbound: Sender<ReceivedFrame>,
    responses: Sender<Vec<String>>,
    shutdown: Receiver<()>,
    state: StateCell,
    idle: Duration,
    poll_interval: Duration,
}

impl<P: SerialPort> ReaderCycle<P> {
    fn run(mut self) {
        let mut lines = LineBuffer::new();
        let mut pending: Vec<String> = Vec::new();
        let mut buf = [0u8; 256];

        loop {
            if is_shut_down(&self.shutdown) {
                break;
            }

            if pending.is_empty() {
                self.state.set(CycleState::Idle);
                match self.port.wait_readable(self.poll_interval) {
                    Ok(true) => {}
                    Ok(false) => continue,
                    Err(e) => {
                        warn!(error = %e, "waiting for serial input failed");
                        break;
                    }
                }
            } else {
                if !pause(&self.shutdown, self.idle) {
                    break;
                }
                match self.port.bytes_available() {
                    Ok(0) => {
                        let batch = std::mem::take(&mut pending);
                        debug!(lines = batch.len(), "multi-line response complete");
                        self.deliver(batch);
                        continue;
                    }
                    Ok(_) => {}
                    Err(e) => {
                        warn!(error = %e, "polling serial input failed");
                        self.deliver(std::mem::take(&mut pending));
                        continue;
                    }
                }
            }

            self.state.set(CycleState::Reading);
            let n = match self.port.read(&mut buf) {
                Ok(0) => {
                    info!("serial line closed");
                    break;
                }
                Ok(n) => n,
                Err(e) if matches!(e.kind(), ErrorKind::Interrupted | ErrorKind::TimedOut) => continue,
                Err(e) => {
                    if !is_shut_down(&self.shutdown) {
                        warn!(error = %e, "reading from the serial line failed");
                    }
                    break;
                }
            };

            lines.push(&buf[..n]);
            while let Some(line) = lines.next_line() {
                self.route(line, &mut pending);
            }
        }

        self.state.set(CycleState::Interrupted);
        info!("reader cycle exiting on close");
        self.state.set(CycleState::Stopped);
    }

    fn route(&self, line: String, pending: &mut Vec<String>) {
        match classify(&line) {
            LineKind::Frame => match parse_frame_line(&line) {
                Ok((meta, raw)) => {
                    debug!(%line, "frame received");
                    let _ = self.inbound.send(Im920Frame::decode(meta, raw));
                }
                Err(e) => warn!(%line, error = %e, "discarding malformed frame line"),
            },
            LineKind::ShortResponse => {
                debug!(%line, "response");
                self.deliver(vec![line]);
            }
            LineKind::ResponsePart => {
                debug!(%line, "response line");
                pending.push(line);
            }
        }
    }

    fn deliver(&self, responses: Vec<String>) {
        let _ = self.responses.send(responses);
    }
}

struct WriterCycle<P> {
    port: P,
    commands: Receiver<Ticket>,
    responses: Receiver<Vec<String>>,
    shutdown: Receiver<()>,
    state: StateCell,
    byte_time: Duration,
}

impl<P: SerialPort> WriterCycle<P> {
    fn run(mut self) {
        loop {
            self.state.set(CycleState::Idle);
            let ticket = crossbeam_channel::select! {
                recv(self.commands) -> ticket => match ticket {
                    Ok(ticket) => ticket,
                    Err(_) => break,
                },
                recv(self.shutdown) -> _ => break,
            };

            self.state.set(CycleState::Writing);
            self.discard_unsolicited();

            match self.write_command(ticket.command()) {
                Ok(true) => {}
                Ok(false) => {
                    ticket.discard();
                    break;
                }
                Err(e) => {
                    warn!(command = %ticket.command().trim_end(), error = %e, "write failed; command discarded");
                    ticket.discard();
                    continue;
                }
            }

            crossbeam_channel::select! {
                recv(self.responses) -> responses => match responses {
                    Ok(responses) => {
                        debug!(command = %ticket.command().trim_end(), ?responses, "command answered");
                        ticket.notify(responses);
                    }
                    Err(_) => break,
                },
                recv(self.shutdown) -> _ => break,
            }
        }

        self.state.set(CycleState::Interrupted);
        info!("writer cycle exiting on close");
        self.state.set(CycleState::Stopped);
    }

    // Lines left over from an earlier exchange must not answer this command.
    fn discard_unsolicited(&self) {
        while let Ok(stale) = self.responses.try_recv() {
            warn!(responses = ?stale, "discarding unsolicited response");
        }
    }

    /// Returns `Ok(false)` when shutdown interrupted the wake pause.
    fn write_command(&mut self, command: &str) -> std::io::Result<bool> {
        debug!(command = %command.trim_end(), "writing command");
        let rest = match command.strip_prefix(WAKE_PREFIX) {
            Some(rest) => {
                self.write_raw(WAKE_PREFIX.to_string().as_bytes())?;
                if !pause(&self.shutdown, self.byte_time) {
                    return Ok(false);
                }
                rest
            }
            None => command,
        };
        self.write_raw(rest.as_bytes())?;
        Ok(true)
    }

    fn write_raw(&mut self, bytes: &[u8]) -> std::io::Result<()> {
        self.port.write_all(bytes)?;
        self.port.flush()
    }
}

#[cfg(all(test, unix))]
mod tests {
    use std::io::{BufRead, BufReader};

    use subghz_frame::{format_frame_line, Im920Meta, Packet, SubGhzFrame};

    use super::*;

    fn test_config() -> LinkConfig {
        LinkConfig {
            response_idle: Some(Duration::from_millis(30)),
            poll_interval: Duration::from_millis(10),
            ..LinkConfig::default()
        }
    }

    fn start() -> (Im920Interface<SerialStream>, SerialStream) {
        let (host, module) = SerialStream::pair().unwrap();
        let interface = Im920Interface::from_port(host, test_config()).unwrap();
        (interface, module)
    }

    fn read_command(reader: &mut BufReader<SerialStream>) -> String {
        let mut line = String::new();
        reader.read_line(&mut line).unwrap();
        line
    }

    #[test]
    fn classify_lines() {
        assert_eq!(classify("01,0002,1A:48,45"), LineKind::Frame);
        assert_eq!(classify("OK"), LineKind::ShortResponse);
        assert_eq!(classify("NG"), LineKind::ShortResponse);
        assert_eq!(classify("0010"), LineKind::ResponsePart);
        assert_eq!(classify("IM920 Ver.02.30"), LineKind::ResponsePart);
    }

    #[test]
    fn txda_is_uppercase_hex_with_crlf() {
        assert_eq!(txda(&[0x0A, 0xFF]), "TXDA0AFF\r\n");
        assert_eq!(txda(&[]), "TXDA\r\n");
    }

    #[test]
    fn expect_prefix_maps_ng_and_garbage() {
        let ok = vec!["OK".to_string()];
        assert!(expect_prefix("DSRX\r\n", &ok, "OK").is_ok());

        let ng = vec!["NG".to_string()];
        assert!(matches!(
            expect_prefix("DSRX\r\n", &ng, "OK"),
            Err(LinkError::CommandFailed { ref command, .. }) if command == "DSRX"
        ));

        let other = vec!["??".to_string()];
        assert!(matches!(
            expect_prefix("DSRX", &other, "OK"),
            Err(LinkError::UnexpectedResponse { .. })
        ));
        assert!(expect_prefix("DSRX", &[], "OK").is_err());
    }

    #[test]
    fn exec_returns_short_response() {
        let (interface, module) = start();
        let mut reader = BufReader::new(module.try_clone().unwrap());
        let mut module = module;

        let sim = thread::spawn(move || {
            let command = read_command(&mut reader);
            module.write_all(b"OK\r\n").unwrap();
            command
        });

        assert_eq!(interface.exec("DSRX").unwrap(), vec!["OK".to_string()]);
        assert_eq!(sim.join().unwrap(), "DSRX\r\n");
    }

    #[test]
    fn hex_reply_is_parsed() {
        let (interface, module) = start();
        let mut reader = BufReader::new(module.try_clone().unwrap());
        let mut module = module;

        let sim = thread::spawn(move || {
            let command = read_command(&mut reader);
            module.write_all(b"00A0\r\n").unwrap();
            command
        });

        assert_eq!(interface.active_duration().unwrap(), 0x00A0);
        assert_eq!(sim.join().unwrap(), "RWTM\r\n");
    }

    #[test]
    fn wake_prefix_is_sent_first() {
        let (interface, module) = start();
        let mut reader = module.try_clone().unwrap();
        let mut module = module;

        let sim = thread::spawn(move || {
            let mut first = [0u8; 1];
            reader.read_exact(&mut first).unwrap();
            let mut rest = [0u8; 6];
            reader.read_exact(&mut rest).unwrap();
            module.write_all(b"OK\r\n").unwrap();
            (first, rest)
        });

        interface.disable_sleep().unwrap();
        let (first, rest) = sim.join().unwrap();
        assert_eq!(&first, b"?");
        assert_eq!(&rest, b"ENRX\r\n");
    }

    #[test]
    fn frames_reach_inbound_queue() {
        let (interface, mut module) = start();
        let packet = Packet::notice("hi").with_sequence(4);
        let frame = Im920Frame::outbound(packet.clone()).unwrap();
        let meta = Im920Meta {
            node_id: 1,
            module_id: 0x1234,
            rssi: 0x80,
        };
        let line = format_frame_line(&meta, frame.frame_bytes());
        module.write_all(format!("{line}\r\n").as_bytes()).unwrap();

        let received = interface
            .try_take_received_frame(Duration::from_secs(2))
            .unwrap()
            .expect("frame should arrive");
        assert_eq!(received.packet(), &packet);
        assert_eq!(received.sender(), "1234");
    }

    #[test]
    fn undecodable_frame_is_reported() {
        let (interface, mut module) = start();
        module.write_all(b"01,0002,1A:03,07,00\r\n").unwrap();
        module.write_all(b"01,0002,1A:03,03,01\r\n").unwrap();

        let err = interface.take_received_frame().unwrap_err();
        assert!(matches!(err, LinkError::Frame(FrameError::InvalidPacketType(7))));

        let next = interface.take_received_frame().unwrap();
        assert_eq!(next.packet().sequence, Some(1));
    }

    #[test]
    fn close_stops_both_cycles() {
        let (interface, _module) = start();
        interface.close();
        assert!(interface.is_closed());
        assert_eq!(interface.reader_state(), CycleState::Stopped);
        assert_eq!(interface.writer_state(), CycleState::Stopped);
        assert!(matches!(interface.exec("RWTM"), Err(LinkError::Closed)));
        assert!(matches!(interface.take_received_frame(), Err(LinkError::Closed)));
        interface.close();
    }

    #[test]
    fn close_interrupts_waiting_issuer() {
        let (interface, _module) = start();
        let interface = Arc::new(interface);

        let issuer = {
            let interface = Arc::clone(&interface);
            thread::spawn(move || interface.exec("RSTM"))
        };
        thread::sleep(Duration::from_millis(50));
        interface.close();

        assert!(matches!(issuer.join().unwrap(), Err(LinkError::Interrupted)));
    }
}
