#![allow(dead_code)]

use std::io::{BufRead, BufReader, Write};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use subghz_link::{Im920Interface, LinkConfig};
use subghz_transport::{SerialPort, SerialStream};

/// Idle window used by the tests; long enough for a busy CI machine.
pub const TEST_IDLE: Duration = Duration::from_millis(40);

pub fn test_config() -> LinkConfig {
    LinkConfig {
        response_idle: Some(TEST_IDLE),
        poll_interval: Duration::from_millis(10),
        ..LinkConfig::default()
    }
}

/// What the simulated module writes back for one command line.
pub enum Reply {
    /// Write the bytes at once.
    Now(Vec<u8>),
    /// Wait, then write.
    After(Duration, Vec<u8>),
    /// Write the chunks with a pause between them.
    Chunks(Vec<(Duration, Vec<u8>)>),
    Nothing,
}

impl Reply {
    pub fn lines(lines: &[&str]) -> Self {
        let mut out = Vec::new();
        for line in lines {
            out.extend_from_slice(line.as_bytes());
            out.extend_from_slice(b"\r\n");
        }
        Reply::Now(out)
    }
}

/// A module simulator on the far end of a socket pair.
pub struct Module {
    /// Writer handle for injecting received frames.
    pub line: Arc<Mutex<SerialStream>>,
    handle: JoinHandle<Vec<(String, Instant)>>,
}

impl Module {
    /// Commands seen until the host closed the line.
    pub fn commands(self) -> Vec<String> {
        self.timeline().into_iter().map(|(command, _)| command).collect()
    }

    /// Commands with the time each one arrived.
    pub fn timeline(self) -> Vec<(String, Instant)> {
        self.handle.join().expect("module thread should complete")
    }

    /// Write a line as if the module had printed it.
    pub fn print(&self, line: &str) {
        let mut port = self.line.lock().unwrap();
        port.write_all(format!("{line}\r\n").as_bytes()).unwrap();
    }
}

/// Start an interface wired to a module that answers with `respond`.
pub fn start<F>(respond: F) -> (Im920Interface<SerialStream>, Module)
where
    F: Fn(&str) -> Reply + Send + 'static,
{
    let (host, module) = SerialStream::pair().expect("socket pair should be creatable");
    let reader = module.try_clone().expect("module clone should succeed");
    let line = Arc::new(Mutex::new(module));

    let writer = Arc::clone(&line);
    let handle = thread::spawn(move || {
        let mut reader = BufReader::new(reader);
        let mut seen = Vec::new();
        loop {
            let mut command = String::new();
            match reader.read_line(&mut command) {
                Ok(0) | Err(_) => break,
                Ok(_) => {}
            }
            let command = command.trim_end().to_string();
            let arrived = Instant::now();

            match respond(&command) {
                Reply::Now(bytes) => write(&writer, &bytes),
                Reply::After(delay, bytes) => {
                    thread::sleep(delay);
                    write(&writer, &bytes);
                }
                Reply::Chunks(chunks) => {
                    for (delay, bytes) in chunks {
                        thread::sleep(delay);
                        write(&writer, &bytes);
                    }
                }
                Reply::Nothing => {}
            }
            seen.push((command, arrived));
        }
        seen
    });

    let interface = Im920Interface::from_port(host, test_config()).expect("interface should start");
    (interface, Module { line, handle })
}

/// A module that confirms everything with `OK`.
pub fn start_ok() -> (Im920Interface<SerialStream>, Module) {
    start(|_| Reply::lines(&["OK"]))
}

fn write(line: &Arc<Mutex<SerialStream>>, bytes: &[u8]) {
    let mut port = line.lock().unwrap();
    let _ = port.write_all(bytes);
    let _ = port.flush();
}
