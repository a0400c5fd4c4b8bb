//! Command/frame engine and radio sessions for sub-GHz modules.
//!
//! This is the layer applications talk to:
//! - [`Im920Interface`] shares one serial line between the module's command
//!   responses and the frames it receives over the air
//! - [`Im920Radio`] numbers packets and sends them through the interface
//! - [`LazuriteRadio`] does the same for a Lazurite module behind its native
//!   driver

pub mod config;
pub mod engine;
pub mod error;
pub mod lazurite;
pub mod lines;
pub mod session;
pub mod ticket;

pub use config::{LazuriteParams, LinkConfig, DEFAULT_INITIAL_TICKETS, DEFAULT_TICKET_GROWTH};
pub use engine::{CycleState, Im920Interface, PendingSend, ReceivedFrame};
pub use error::{LinkError, Result};
pub use lazurite::{LazuriteRadio, NativeDriver};
pub use lines::LineBuffer;
pub use session::Im920Radio;
pub use ticket::{Ticket, TicketPool};
