use thiserror::Error;

/// Top-level error type for Nudge.
#[derive(Debug, Error)]
pub enum NudgeError {
    /// Unrecognized message shape or date/time fragment.
    #[error("parse error: {0}")]
    Parse(String),

    /// The durable snapshot could not be written.
    /// In-memory state stays authoritative until the next successful write.
    #[error("persistence error: {0}")]
    Persistence(String),

    /// The snapshot on disk is unreadable. Fatal at startup.
    #[error("corrupt state: {0}")]
    CorruptState(String),

    /// A notification could not be delivered.
    #[error("delivery error: {0}")]
    Delivery(String),

    /// Error from a messaging channel.
    #[error("channel error: {0}")]
    Channel(String),

    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),
}
