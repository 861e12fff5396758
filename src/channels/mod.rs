//! Platform adapters: event ingress and content egress.

pub mod channel;
pub mod cli;
pub mod discord;
pub mod stdout;

pub use channel::*;
pub use cli::StdinSource;
pub use discord::DiscordForwarder;
pub use stdout::StdoutForwarder;
