use std::sync::{Mutex, MutexGuard};

use bytes::Bytes;
use subghz_frame::{chop_for, Im920, Im920Frame, Packet, SubGhzFrame};
use subghz_transport::SerialPort;
use tracing::debug;

use crate::engine::{Im920Interface, PendingSend};
use crate::error::Result;

/// Packet-level session on top of an [`Im920Interface`].
///
/// Every packet sent through the session gets the next sequence number from
/// one counter shared by all packet kinds. The counter starts at 0 and wraps
/// from 255 back to 0.
pub struct Im920Radio<P: SerialPort> {
    interface: Im920Interface<P>,
    sequence: Mutex<u8>,
}

impl<P: SerialPort> Im920Radio<P> {
    pub fn new(interface: Im920Interface<P>) -> Self {
        Self {
            interface,
            sequence: Mutex::new(0),
        }
    }

    pub fn interface(&self) -> &Im920Interface<P> {
        &self.interface
    }

    pub fn into_interface(self) -> Im920Interface<P> {
        self.interface
    }

    /// Sequence number the next packet will carry.
    pub fn next_sequence(&self) -> u8 {
        *self.lock_sequence()
    }

    /// Block until the next frame arrives.
    pub fn read_frame(&self) -> Result<Im920Frame> {
        self.interface.take_received_frame()
    }

    /// Number `packet` and queue it for transmission.
    ///
    /// Returns the sequence number used.
    pub fn send(&self, packet: Packet) -> Result<u8> {
        let mut sequence = self.lock_sequence();
        self.queue_numbered(&mut sequence, packet, false).map(|(seq, _)| seq)
    }

    /// Like [`send`](Self::send), but wait until the module reports the
    /// transmission with `OK`.
    ///
    /// Only numbering and queueing happen under the counter lock, so other
    /// senders are not held up while the module is slow to answer.
    pub fn send_confirmed(&self, packet: Packet) -> Result<u8> {
        let (seq, pending) = {
            let mut sequence = self.lock_sequence();
            self.queue_numbered(&mut sequence, packet, true)?
        };
        if let Some(pending) = pending {
            pending.wait()?;
        }
        Ok(seq)
    }

    /// Send `data`, split into as many DATA packets as needed.
    ///
    /// The fragments get consecutive sequence numbers; no other packet from
    /// this session is interleaved with them.
    pub fn send_data(&self, data: impl Into<Bytes>) -> Result<()> {
        self.queue_fragments(data.into(), false).map(|_| ())
    }

    /// Like [`send_data`](Self::send_data), waiting for the module to confirm
    /// each fragment.
    ///
    /// All fragments are queued before the first confirmation is awaited.
    /// Every confirmation is collected; the first failure is returned.
    pub fn send_data_confirmed(&self, data: impl Into<Bytes>) -> Result<()> {
        let pending = self.queue_fragments(data.into(), true)?;
        pending
            .into_iter()
            .map(PendingSend::wait)
            .fold(Ok(()), |first, next| first.and(next))
    }

    pub fn send_command(&self, code: u8, param: &str) -> Result<u8> {
        self.send(Packet::command(code, param, false))
    }

    /// Send a command and ask the peer to ACK it.
    pub fn send_command_with_ack(&self, code: u8, param: &str) -> Result<u8> {
        self.send(Packet::command(code, param, true))
    }

    pub fn send_ack(&self, code: u8, response: &str) -> Result<u8> {
        self.send(Packet::ack(code, response))
    }

    pub fn send_notice(&self, notice: &str) -> Result<u8> {
        self.send(Packet::notice(notice))
    }

    pub fn close(&self) {
        self.interface.close();
    }

    fn queue_fragments(&self, data: Bytes, confirm: bool) -> Result<Vec<PendingSend>> {
        let mut sequence = self.lock_sequence();
        let mut pending = Vec::new();
        for packet in chop_for::<Im920>(data) {
            let (_, waiting) = self.queue_numbered(&mut sequence, packet, confirm)?;
            pending.extend(waiting);
        }
        Ok(pending)
    }

    // The counter advances once the packet is queued, even if the module
    // later rejects it.
    fn queue_numbered(
        &self,
        sequence: &mut MutexGuard<'_, u8>,
        packet: Packet,
        confirm: bool,
    ) -> Result<(u8, Option<PendingSend>)> {
        let seq = **sequence;
        let frame = Im920Frame::outbound(packet.with_sequence(seq))?;
        let bytes = frame.frame_bytes();
        let pending = if confirm {
            Some(self.interface.queue_data(bytes)?)
        } else {
            self.interface.send_data_async(bytes)?;
            None
        };
        **sequence = seq.wrapping_add(1);
        debug!(seq, packet = %frame.packet(), confirm, "packet queued");
        Ok((seq, pending))
    }

    fn lock_sequence(&self) -> MutexGuard<'_, u8> {
        self.sequence
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl<P: SerialPort> std::fmt::Debug for Im920Radio<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Im920Radio")
            .field("interface", &self.interface)
            .field("next_sequence", &self.next_sequence())
            .finish()
    }
}
