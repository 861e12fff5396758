//! Error types for the relay.

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Rule storage errors.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Rules file {path} is malformed: {reason}")]
    Malformed { path: String, reason: String },

    #[error("Failed to serialize rules: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Platform channel errors (ingress and egress).
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("Channel {name} failed to start: {reason}")]
    StartupFailed { name: String, reason: String },

    #[error("Failed to forward to {destination} on {name}: {reason}")]
    SendFailed {
        name: String,
        destination: String,
        reason: String,
    },

    #[error("Invalid message format: {0}")]
    InvalidMessage(String),

    #[error("Authentication failed for channel {name}: {reason}")]
    AuthFailed { name: String, reason: String },

    #[error("HTTP error: {0}")]
    Http(String),
}

/// Admin command parsing errors.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("Unknown command: {0}")]
    Unknown(String),

    #[error("Usage: {usage}")]
    Usage { usage: &'static str },

    #[error("Invalid channel id: {0}")]
    InvalidChannel(String),

    #[error("Unterminated quote in command")]
    UnterminatedQuote,
}
