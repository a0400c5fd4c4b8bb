use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use crossbeam_channel::{bounded, Receiver, Sender};
use tracing::{debug, info};

use crate::config::{DEFAULT_INITIAL_TICKETS, DEFAULT_TICKET_GROWTH};
use crate::error::{LinkError, Result};

/// Single-slot response holder reused across tickets.
struct ResponseSlot {
    tx: Sender<Vec<String>>,
    rx: Receiver<Vec<String>>,
}

impl ResponseSlot {
    fn new() -> Arc<Self> {
        let (tx, rx) = bounded(1);
        Arc::new(Self { tx, rx })
    }

    fn clear(&self) {
        while self.rx.try_recv().is_ok() {}
    }
}

struct PoolState {
    free: Vec<Arc<ResponseSlot>>,
    capacity: usize,
}

struct PoolInner {
    state: Mutex<PoolState>,
    growth: usize,
    shutdown_tx: Mutex<Option<Sender<()>>>,
    shutdown_rx: Receiver<()>,
}

/// Growable pool of correlation tickets.
///
/// A ticket pairs one command with the response the module sends back.
/// The pool never blocks: when it runs dry it grows by a fixed batch.
#[derive(Clone)]
pub struct TicketPool {
    inner: Arc<PoolInner>,
}

impl TicketPool {
    pub fn new(initial: usize, growth: usize) -> Self {
        let (shutdown_tx, shutdown_rx) = bounded(0);
        Self {
            inner: Arc::new(PoolInner {
                state: Mutex::new(PoolState {
                    free: (0..initial).map(|_| ResponseSlot::new()).collect(),
                    capacity: initial,
                }),
                growth,
                shutdown_tx: Mutex::new(Some(shutdown_tx)),
                shutdown_rx,
            }),
        }
    }

    /// Take a ticket for `command`.
    ///
    /// A `sync` ticket is waited on with [`Ticket::checkout`]; any other
    /// ticket goes back to the pool as soon as its response arrives.
    pub fn checkin(&self, command: impl Into<String>, sync: bool) -> Ticket {
        let slot = {
            let mut state = self.lock_state();
            match state.free.pop() {
                Some(slot) => slot,
                None => {
                    info!(growth = self.inner.growth, "creating new tickets");
                    let growth = self.inner.growth;
                    state.free.extend((0..growth).map(|_| ResponseSlot::new()));
                    state.capacity += growth + 1;
                    ResponseSlot::new()
                }
            }
        };
        slot.clear();

        Ticket {
            inner: Arc::new(TicketInner {
                command: command.into(),
                sync,
                slot,
                returned: AtomicBool::new(false),
                pool: self.clone(),
            }),
        }
    }

    /// Wake every blocked [`Ticket::checkout`] with [`LinkError::Interrupted`].
    pub fn close(&self) {
        let sender = self
            .inner
            .shutdown_tx
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        if sender.is_some() {
            debug!("ticket pool closed");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.inner
            .shutdown_tx
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .is_none()
    }

    /// Tickets ever created by this pool.
    pub fn capacity(&self) -> usize {
        self.lock_state().capacity
    }

    /// Tickets currently waiting in the pool.
    pub fn available(&self) -> usize {
        self.lock_state().free.len()
    }

    fn give_back(&self, slot: Arc<ResponseSlot>) {
        self.lock_state().free.push(slot);
    }

    fn lock_state(&self) -> MutexGuard<'_, PoolState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for TicketPool {
    fn default() -> Self {
        Self::new(DEFAULT_INITIAL_TICKETS, DEFAULT_TICKET_GROWTH)
    }
}

impl fmt::Debug for TicketPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TicketPool")
            .field("capacity", &self.capacity())
            .field("available", &self.available())
            .field("closed", &self.is_closed())
            .finish()
    }
}

struct TicketInner {
    command: String,
    sync: bool,
    slot: Arc<ResponseSlot>,
    returned: AtomicBool,
    pool: TicketPool,
}

/// A command waiting for (or holding) the module's response.
///
/// Clones share the same ticket: the issuer keeps one to wait on, the writer
/// cycle gets the other to fill.
#[derive(Clone)]
pub struct Ticket {
    inner: Arc<TicketInner>,
}

impl Ticket {
    pub fn command(&self) -> &str {
        &self.inner.command
    }

    /// Whether the issuer waits for the response.
    pub fn is_sync(&self) -> bool {
        self.inner.sync
    }

    /// Block until the response arrives, then return the ticket to the pool.
    ///
    /// Fails with [`LinkError::IllegalState`] on a fire-and-forget ticket or
    /// one that was already checked out, and with [`LinkError::Interrupted`]
    /// when the pool is closed first.
    pub fn checkout(&self) -> Result<Vec<String>> {
        if !self.inner.sync {
            return Err(LinkError::IllegalState(format!(
                "ticket for {:?} was issued without sync; nothing to wait for",
                self.inner.command.trim_end()
            )));
        }
        if self.inner.returned.load(Ordering::Acquire) {
            return Err(LinkError::IllegalState(format!(
                "ticket for {:?} was already checked out",
                self.inner.command.trim_end()
            )));
        }

        let slot = &self.inner.slot;
        let responses = match slot.rx.try_recv() {
            Ok(responses) => responses,
            Err(_) => {
                crossbeam_channel::select! {
                    recv(slot.rx) -> msg => msg.map_err(|_| LinkError::Interrupted)?,
                    recv(self.inner.pool.inner.shutdown_rx) -> _ => {
                        info!(command = %self.inner.command.trim_end(), "wait for response aborted by close");
                        return Err(LinkError::Interrupted);
                    }
                }
            }
        };

        self.give_back();
        Ok(responses)
    }

    /// Hand the module's response to this ticket.
    ///
    /// A sync ticket keeps the response for its issuer; any other ticket is
    /// returned to the pool right away.
    pub fn notify(&self, responses: Vec<String>) {
        if self.inner.sync {
            if self.inner.slot.tx.try_send(responses).is_err() {
                debug!(command = %self.inner.command.trim_end(), "response slot already filled");
            }
        } else {
            self.give_back();
        }
    }

    /// Return a ticket that will never receive a response.
    pub(crate) fn discard(&self) {
        if !self.inner.sync {
            self.give_back();
        }
    }

    fn give_back(&self) {
        if !self.inner.returned.swap(true, Ordering::AcqRel) {
            self.inner.pool.give_back(Arc::clone(&self.inner.slot));
        }
    }
}

impl fmt::Debug for Ticket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ticket")
            .field("command", &self.inner.command)
            .field("sync", &self.inner.sync)
            .finish()
    }
}
