/// Errors that can occur in link operations.
#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(#[from] subghz_transport::TransportError),

    /// Packet or frame decoding error.
    #[error("frame error: {0}")]
    Frame(#[from] subghz_frame::FrameError),

    /// A blocking wait was aborted because the interface is closing.
    #[error("interrupted by interface close")]
    Interrupted,

    /// The operation is not permitted in the current state.
    #[error("illegal state: {0}")]
    IllegalState(String),

    /// The module answered `NG` (or did not confirm) a command.
    #[error("command {command:?} failed: {response:?}")]
    CommandFailed { command: String, response: String },

    /// The module's answer could not be interpreted.
    #[error("unexpected response to {command:?}: {response:?}")]
    UnexpectedResponse { command: String, response: String },

    /// The interface has been closed.
    #[error("interface closed")]
    Closed,

    /// The Lazurite native driver reported a failure.
    #[error("driver error: {0}")]
    Driver(String),
}

pub type Result<T> = std::result::Result<T, LinkError>;
