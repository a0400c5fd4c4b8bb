use std::io;
use std::thread;
use std::time::Duration;

use bytes::Bytes;
use subghz_frame::{chop_for, Lazurite, LazuriteFrame, MacHeader, Packet, SubGhzFrame};
use tracing::{debug, info, warn};

use crate::config::LazuriteParams;
use crate::error::{LinkError, Result};

/// Largest raw radio frame the driver hands out.
pub const RAW_FRAME_SIZE: usize = 256;

/// Errno the driver returns when the peer did not acknowledge a frame.
pub const NO_ACK_ERRNO: i32 = 110;

/// Interval at which [`LazuriteRadio::read_frame`] polls the driver.
pub const READ_POLL_INTERVAL: Duration = Duration::from_millis(5);

/// Calls into the vendor driver of a Lazurite module.
///
/// Failures are reported as `io::Error`; a negative driver return code maps
/// to the matching OS error.
pub trait NativeDriver {
    fn init(&mut self) -> io::Result<()>;
    fn set_addr_type(&mut self, addr_type: u8) -> io::Result<()>;
    fn set_tx_retry(&mut self, retry: u8) -> io::Result<()>;
    fn set_tx_interval(&mut self, interval: u16) -> io::Result<()>;
    fn begin(&mut self, ch: u8, pan_id: u16, rate: u8, pwr: u8) -> io::Result<()>;
    fn rx_enable(&mut self) -> io::Result<()>;
    fn rx_disable(&mut self) -> io::Result<()>;
    fn close(&mut self) -> io::Result<()>;
    /// Unload the driver.
    fn remove(&mut self) -> io::Result<()>;
    /// Bytes of received frames waiting in the driver.
    fn available(&mut self) -> io::Result<usize>;
    /// Copy the next raw radio frame into `buf`, returning its size.
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;
    /// Decode the MAC header of a raw radio frame.
    fn dec_mac(&mut self, raw: &[u8]) -> io::Result<MacHeader>;
    /// Transmit `payload` to `addr` on PAN `pan_id`.
    fn send(&mut self, pan_id: u16, addr: u16, payload: &[u8]) -> io::Result<i32>;
}

/// Packet-level session over a Lazurite driver.
#[derive(Debug)]
pub struct LazuriteRadio<D: NativeDriver> {
    driver: D,
}

impl<D: NativeDriver> LazuriteRadio<D> {
    pub fn new(driver: D) -> Self {
        Self { driver }
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub fn into_driver(self) -> D {
        self.driver
    }

    /// Load the driver, apply `params` and start receiving.
    ///
    /// Address type, retry count and retry interval are best effort: a
    /// failure there is logged and setup continues.
    pub fn begin(&mut self, params: &LazuriteParams) -> Result<()> {
        info!(ch = params.ch(), pan_id = params.pan_id(), "starting Lazurite module");
        self.driver
            .init()
            .map_err(|e| driver_error("couldn't load the lazurite driver", &e))?;

        if let Err(e) = self.driver.set_addr_type(params.addr_type()) {
            warn!(error = %e, addr_type = params.addr_type(), "setting address type failed");
        }
        if let Err(e) = self.driver.set_tx_retry(params.tx_retry()) {
            warn!(error = %e, tx_retry = params.tx_retry(), "setting tx retry failed");
        }
        if let Err(e) = self.driver.set_tx_interval(params.tx_interval()) {
            warn!(error = %e, tx_interval = params.tx_interval(), "setting tx interval failed");
        }

        self.driver
            .begin(params.ch(), params.pan_id(), params.rate(), params.pwr())
            .and_then(|()| self.driver.rx_enable())
            .map_err(|e| driver_error("couldn't set up the lazurite interface", &e))
    }

    /// Stop receiving and unload the driver.
    pub fn close(&mut self) -> Result<()> {
        self.driver
            .rx_disable()
            .and_then(|()| self.driver.close())
            .and_then(|()| self.driver.remove())
            .map_err(|e| driver_error("couldn't close the lazurite interface", &e))?;
        info!("Lazurite module closed");
        Ok(())
    }

    /// Block until a frame is received and decode it.
    pub fn read_frame(&mut self) -> Result<LazuriteFrame> {
        loop {
            match self.driver.available() {
                Ok(0) => thread::sleep(READ_POLL_INTERVAL),
                Ok(_) => break,
                Err(e) => return Err(driver_error("reading from the lazurite module failed", &e)),
            }
        }

        let mut raw = [0u8; RAW_FRAME_SIZE];
        let size = self
            .driver
            .read(&mut raw)
            .map_err(|e| driver_error("reading from the lazurite module failed", &e))?;
        let raw = &raw[..size.min(RAW_FRAME_SIZE)];
        debug!(size, "raw frame read");

        let mac = self.driver.dec_mac(raw).map_err(|e| {
            warn!(error = %e, "decoding MAC header failed; frame may be broken");
            driver_error("frame couldn't be rebuilt from raw bytes", &e)
        })?;

        Ok(LazuriteFrame::from_mac(mac, raw)?)
    }

    /// Transmit a frame.
    ///
    /// A peer that does not acknowledge is logged, not reported as an error.
    pub fn send_frame(&mut self, pan_id: u16, addr: u16, frame: &LazuriteFrame) -> Result<()> {
        match self.driver.send(pan_id, addr, frame.frame_bytes()) {
            Ok(ret) => {
                info!(pan_id = format_args!("{pan_id:x}"), addr = format_args!("{addr:x}"), ret, "frame sent");
                Ok(())
            }
            Err(e) if is_no_ack(&e) => {
                warn!(pan_id = format_args!("{pan_id:x}"), addr = format_args!("{addr:x}"), "peer didn't respond");
                Ok(())
            }
            Err(e) => Err(driver_error("sending over the lazurite module failed", &e)),
        }
    }

    /// Send `data`, split into as many DATA packets as needed.
    pub fn send_data(&mut self, pan_id: u16, addr: u16, data: impl Into<Bytes>) -> Result<()> {
        for packet in chop_for::<Lazurite>(data) {
            self.send_packet(pan_id, addr, packet)?;
        }
        Ok(())
    }

    pub fn send_command(&mut self, pan_id: u16, addr: u16, code: u8, param: &str) -> Result<()> {
        self.send_packet(pan_id, addr, Packet::command(code, param, false))
    }

    /// Send a command and ask the peer to ACK it.
    pub fn send_command_with_ack(
        &mut self,
        pan_id: u16,
        addr: u16,
        code: u8,
        param: &str,
    ) -> Result<()> {
        self.send_packet(pan_id, addr, Packet::command(code, param, true))
    }

    pub fn send_ack(&mut self, pan_id: u16, addr: u16, code: u8, response: &str) -> Result<()> {
        self.send_packet(pan_id, addr, Packet::ack(code, response))
    }

    pub fn send_notice(&mut self, pan_id: u16, addr: u16, notice: &str) -> Result<()> {
        self.send_packet(pan_id, addr, Packet::notice(notice))
    }

    fn send_packet(&mut self, pan_id: u16, addr: u16, packet: Packet) -> Result<()> {
        let frame = LazuriteFrame::outbound(pan_id, addr, packet)?;
        self.send_frame(pan_id, addr, &frame)
    }
}

fn is_no_ack(err: &io::Error) -> bool {
    err.raw_os_error() == Some(NO_ACK_ERRNO) || err.kind() == io::ErrorKind::TimedOut
}

fn driver_error(context: &str, err: &io::Error) -> LinkError {
    LinkError::Driver(format!("{context}: {err}"))
}

#[cfg(test)]
mod tests {
    use subghz_frame::{encode_packet, Body};

    use super::*;

    #[derive(Debug, Default)]
    struct MockDriver {
        calls: Vec<String>,
        inbox: Vec<Vec<u8>>,
        sent: Vec<(u16, u16, Vec<u8>)>,
        fail: Option<&'static str>,
        send_error: Option<io::ErrorKind>,
        send_errno: Option<i32>,
    }

    impl MockDriver {
        fn record(&mut self, call: &str) -> io::Result<()> {
            self.calls.push(call.to_string());
            if self.fail == Some(call) {
                return Err(io::Error::other(format!("{call} failed")));
            }
            Ok(())
        }
    }

    const MAC_SIZE: usize = 9;

    impl NativeDriver for MockDriver {
        fn init(&mut self) -> io::Result<()> {
            self.record("init")
        }
        fn set_addr_type(&mut self, addr_type: u8) -> io::Result<()> {
            self.record(&format!("addr_type {addr_type}"))
        }
        fn set_tx_retry(&mut self, retry: u8) -> io::Result<()> {
            self.record(&format!("tx_retry {retry}"))
        }
        fn set_tx_interval(&mut self, interval: u16) -> io::Result<()> {
            self.record(&format!("tx_interval {interval}"))
        }
        fn begin(&mut self, ch: u8, pan_id: u16, rate: u8, pwr: u8) -> io::Result<()> {
            self.record(&format!("begin {ch} {pan_id:x} {rate} {pwr}"))
        }
        fn rx_enable(&mut self) -> io::Result<()> {
            self.record("rx_enable")
        }
        fn rx_disable(&mut self) -> io::Result<()> {
            self.record("rx_disable")
        }
        fn close(&mut self) -> io::Result<()> {
            self.record("close")
        }
        fn remove(&mut self) -> io::Result<()> {
            self.record("remove")
        }
        fn available(&mut self) -> io::Result<usize> {
            Ok(self.inbox.first().map_or(0, Vec::len))
        }
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let frame = self.inbox.remove(0);
            buf[..frame.len()].copy_from_slice(&frame);
            Ok(frame.len())
        }
        fn dec_mac(&mut self, raw: &[u8]) -> io::Result<MacHeader> {
            Ok(MacHeader {
                tx_addr: [0x01, 0x5A, 0, 0, 0, 0, 0, 0],
                payload_offset: MAC_SIZE,
                payload_len: raw.len() - MAC_SIZE,
                rssi: 180,
                ..MacHeader::default()
            })
        }
        fn send(&mut self, pan_id: u16, addr: u16, payload: &[u8]) -> io::Result<i32> {
            if let Some(errno) = self.send_errno {
                return Err(io::Error::from_raw_os_error(errno));
            }
            if let Some(kind) = self.send_error {
                return Err(io::Error::from(kind));
            }
            self.sent.push((pan_id, addr, payload.to_vec()));
            Ok(i32::try_from(payload.len()).unwrap())
        }
    }

    fn radio() -> LazuriteRadio<MockDriver> {
        LazuriteRadio::new(MockDriver::default())
    }

    #[test]
    fn begin_applies_params_in_order() {
        let mut radio = radio();
        let params = LazuriteParams::new(36, 0xABCD).with_rate(50);
        radio.begin(&params).unwrap();
        assert_eq!(
            radio.driver().calls,
            vec![
                "init",
                "addr_type 6",
                "tx_retry 10",
                "tx_interval 500",
                "begin 36 abcd 50 20",
                "rx_enable",
            ]
        );
    }

    #[test]
    fn begin_tolerates_optional_setting_failure() {
        let mut radio = LazuriteRadio::new(MockDriver {
            fail: Some("tx_retry 10"),
            ..MockDriver::default()
        });
        radio.begin(&LazuriteParams::new(36, 0xABCD)).unwrap();
        assert_eq!(radio.driver().calls.last().map(String::as_str), Some("rx_enable"));
    }

    #[test]
    fn begin_fails_when_driver_does_not_load() {
        let mut radio = LazuriteRadio::new(MockDriver {
            fail: Some("init"),
            ..MockDriver::default()
        });
        let err = radio.begin(&LazuriteParams::new(36, 0xABCD)).unwrap_err();
        assert!(matches!(err, LinkError::Driver(_)));
        assert_eq!(radio.driver().calls, vec!["init"]);
    }

    #[test]
    fn close_disables_rx_and_unloads() {
        let mut radio = radio();
        radio.close().unwrap();
        assert_eq!(radio.driver().calls, vec!["rx_disable", "close", "remove"]);
    }

    #[test]
    fn read_frame_decodes_payload() {
        let mut raw = vec![0u8; MAC_SIZE];
        raw.extend_from_slice(&encode_packet::<Lazurite>(&Packet::notice("ready")).unwrap());
        let mut radio = LazuriteRadio::new(MockDriver {
            inbox: vec![raw],
            ..MockDriver::default()
        });

        let frame = radio.read_frame().unwrap();
        assert_eq!(frame.packet().body, Body::Notice("ready".to_string()));
        assert_eq!(frame.sender(), "5a01");
        assert_eq!(frame.rssi(), Some(180));
    }

    #[test]
    fn send_data_chops_into_fragments() {
        let mut radio = radio();
        radio.send_data(0xABCD, 0x5A01, vec![7u8; 300]).unwrap();

        let sent = &radio.driver().sent;
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].2.len(), 239);
        assert_eq!(sent[0].2[0], 0x10);
        assert_eq!(sent[1].2.len(), 1 + 62);
        assert_eq!(sent[1].2[0], 0x00);
        assert!(sent.iter().all(|(pan, addr, _)| *pan == 0xABCD && *addr == 0x5A01));
    }

    #[test]
    fn typed_senders_set_flags() {
        let mut radio = radio();
        radio.send_command(1, 2, 5, "go").unwrap();
        radio.send_command_with_ack(1, 2, 5, "go").unwrap();
        radio.send_ack(1, 2, 5, "done").unwrap();
        radio.send_notice(1, 2, "hello").unwrap();

        let flags: Vec<u8> = radio.driver().sent.iter().map(|(_, _, p)| p[0]).collect();
        assert_eq!(flags, vec![0x01, 0x09, 0x02, 0x03]);
    }

    #[test]
    fn missing_ack_is_not_an_error() {
        let mut radio = LazuriteRadio::new(MockDriver {
            send_errno: Some(NO_ACK_ERRNO),
            ..MockDriver::default()
        });
        radio.send_notice(1, 2, "anyone?").unwrap();

        let mut radio = LazuriteRadio::new(MockDriver {
            send_error: Some(io::ErrorKind::TimedOut),
            ..MockDriver::default()
        });
        radio.send_notice(1, 2, "anyone?").unwrap();
    }

    #[test]
    fn other_send_errors_are_raised() {
        let mut radio = LazuriteRadio::new(MockDriver {
            send_error: Some(io::ErrorKind::BrokenPipe),
            ..MockDriver::default()
        });
        let err = radio.send_notice(1, 2, "x").unwrap_err();
        assert!(matches!(err, LinkError::Driver(_)));
    }

    #[test]
    fn oversized_notice_is_rejected_before_sending() {
        let mut radio = radio();
        let err = radio.send_notice(1, 2, &"n".repeat(239)).unwrap_err();
        assert!(matches!(err, LinkError::Frame(_)));
        assert!(radio.driver().sent.is_empty());
    }
}
