//! Stdout forwarder: prints what would be forwarded. Used for dry runs.

use async_trait::async_trait;

use crate::error::ChannelError;
use crate::pipeline::{ContentBlock, Forwarder};
use crate::rules::ChannelId;

pub struct StdoutForwarder;

impl StdoutForwarder {
    pub fn new() -> Self {
        Self
    }
}

impl Default for StdoutForwarder {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Forwarder for StdoutForwarder {
    fn name(&self) -> &str {
        "stdout"
    }

    async fn forward(
        &self,
        destination: ChannelId,
        block: &ContentBlock,
    ) -> Result<(), ChannelError> {
        println!("→ <#{destination}> {}", block.to_payload());
        Ok(())
    }
}
