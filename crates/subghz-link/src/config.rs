use std::time::Duration;

use subghz_transport::BaudRate;

/// Tickets created when a pool is built.
pub const DEFAULT_INITIAL_TICKETS: usize = 5;

/// Tickets added each time the pool runs dry.
pub const DEFAULT_TICKET_GROWTH: usize = 4;

/// Configuration for an [`Im920Interface`](crate::Im920Interface).
#[derive(Debug, Clone)]
pub struct LinkConfig {
    /// Line speed. Also determines the byte time.
    pub baud: BaudRate,
    /// Quiet period after which buffered reply lines are delivered as one
    /// response. Default: one byte time at `baud`.
    pub response_idle: Option<Duration>,
    /// How long the reader blocks on an idle line before re-checking for
    /// shutdown.
    pub poll_interval: Duration,
    /// Tickets created up front.
    pub initial_tickets: usize,
    /// Tickets added when the pool is exhausted.
    pub ticket_growth: usize,
}

impl LinkConfig {
    pub fn new(baud: BaudRate) -> Self {
        Self {
            baud,
            ..Self::default()
        }
    }

    /// Effective idle window for multi-line replies.
    pub fn idle_window(&self) -> Duration {
        self.response_idle.unwrap_or_else(|| self.baud.byte_time())
    }
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            baud: BaudRate::default(),
            response_idle: None,
            poll_interval: Duration::from_millis(50),
            initial_tickets: DEFAULT_INITIAL_TICKETS,
            ticket_growth: DEFAULT_TICKET_GROWTH,
        }
    }
}

/// Radio parameters handed to the Lazurite driver by
/// [`LazuriteRadio::begin`](crate::LazuriteRadio::begin).
///
/// The `with_*` setters ignore values the module does not accept and keep the
/// previous setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LazuriteParams {
    ch: u8,
    pan_id: u16,
    rate: u8,
    pwr: u8,
    addr_type: u8,
    tx_retry: u8,
    tx_interval: u16,
}

impl LazuriteParams {
    pub const DEFAULT_RATE: u8 = 100;
    pub const DEFAULT_PWR: u8 = 20;
    pub const DEFAULT_ADDR_TYPE: u8 = 6;
    pub const DEFAULT_TX_RETRY: u8 = 10;
    pub const DEFAULT_TX_INTERVAL: u16 = 500;

    /// Parameters for channel `ch` on PAN `pan_id`, everything else default.
    pub fn new(ch: u8, pan_id: u16) -> Self {
        Self {
            ch,
            pan_id,
            rate: Self::DEFAULT_RATE,
            pwr: Self::DEFAULT_PWR,
            addr_type: Self::DEFAULT_ADDR_TYPE,
            tx_retry: Self::DEFAULT_TX_RETRY,
            tx_interval: Self::DEFAULT_TX_INTERVAL,
        }
    }

    /// Data rate in kbps: 50 or 100.
    pub fn with_rate(mut self, rate: u8) -> Self {
        if rate == 100 || rate == 50 {
            self.rate = rate;
        }
        self
    }

    /// Transmit power in mW: 1 or 20.
    pub fn with_pwr(mut self, pwr: u8) -> Self {
        if pwr == 20 || pwr == 1 {
            self.pwr = pwr;
        }
        self
    }

    /// Address type, 0..=6.
    pub fn with_addr_type(mut self, addr_type: u8) -> Self {
        if addr_type <= 6 {
            self.addr_type = addr_type;
        }
        self
    }

    pub fn with_tx_retry(mut self, tx_retry: u8) -> Self {
        self.tx_retry = tx_retry;
        self
    }

    /// Retry interval in ms, at most 500.
    pub fn with_tx_interval(mut self, tx_interval: u16) -> Self {
        if tx_interval <= 500 {
            self.tx_interval = tx_interval;
        }
        self
    }

    pub fn ch(&self) -> u8 {
        self.ch
    }

    pub fn pan_id(&self) -> u16 {
        self.pan_id
    }

    pub fn rate(&self) -> u8 {
        self.rate
    }

    pub fn pwr(&self) -> u8 {
        self.pwr
    }

    pub fn addr_type(&self) -> u8 {
        self.addr_type
    }

    pub fn tx_retry(&self) -> u8 {
        self.tx_retry
    }

    pub fn tx_interval(&self) -> u16 {
        self.tx_interval
    }
}
