//! Ingress trait and the inputs it delivers to the relay loop.

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;

use crate::error::ChannelError;
use crate::pipeline::InboundEvent;

/// One unit of work for the relay loop.
#[derive(Debug, Clone)]
pub enum RelayInput {
    /// A platform message to evaluate against the rules.
    Event(InboundEvent),
    /// An admin command line (e.g. `/view_rules`).
    Command(String),
}

/// Stream of inputs from a source, in arrival order.
pub type InputStream = Pin<Box<dyn Stream<Item = RelayInput> + Send>>;

/// Ingress side of a platform adapter.
#[async_trait]
pub trait EventSource: Send + Sync {
    /// Source name (e.g. "stdin").
    fn name(&self) -> &str;

    /// Start listening and return the input stream.
    async fn start(&self) -> Result<InputStream, ChannelError>;

    /// Deliver the reply to an admin command.
    async fn reply(&self, text: &str) -> Result<(), ChannelError>;

    async fn shutdown(&self) -> Result<(), ChannelError> {
        Ok(())
    }
}
