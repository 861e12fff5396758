//! Stdin source: line-oriented input for local operation.
//!
//! Lines starting with `/` are admin commands; every other non-empty line
//! is a Discord message object in JSON. Replies go to stdout.

use async_trait::async_trait;
use futures::stream;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::channels::discord::event_from_message;
use crate::channels::{EventSource, InputStream, RelayInput};
use crate::error::ChannelError;

pub struct StdinSource;

impl StdinSource {
    pub fn new() -> Self {
        Self
    }
}

impl Default for StdinSource {
    fn default() -> Self {
        Self::new()
    }
}

/// Turn one input line into a relay input. Blank and unparseable lines yield `None`.
pub fn parse_line(line: &str) -> Option<RelayInput> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    if line.starts_with('/') {
        return Some(RelayInput::Command(line.to_string()));
    }

    let value: serde_json::Value = match serde_json::from_str(line) {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!("Skipping line that is neither a command nor JSON: {e}");
            return None;
        }
    };
    match event_from_message(&value) {
        Some(event) => Some(RelayInput::Event(event)),
        None => {
            tracing::warn!("Skipping message without channel_id or author.id");
            None
        }
    }
}

#[async_trait]
impl EventSource for StdinSource {
    fn name(&self) -> &str {
        "stdin"
    }

    async fn start(&self) -> Result<InputStream, ChannelError> {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();

        tokio::spawn(async move {
            let reader = BufReader::new(tokio::io::stdin());
            let mut lines = reader.lines();

            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => {
                        let Some(input) = parse_line(&line) else {
                            continue;
                        };
                        if tx.send(input).is_err() {
                            break;
                        }
                    }
                    Ok(None) => break, // EOF
                    Err(e) => {
                        tracing::error!("Error reading stdin: {}", e);
                        break;
                    }
                }
            }
        });

        let stream = stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|input| (input, rx))
        });

        Ok(Box::pin(stream))
    }

    async fn reply(&self, text: &str) -> Result<(), ChannelError> {
        println!("{text}\n");
        Ok(())
    }
}
