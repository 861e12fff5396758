//! Relay loop: takes inputs from a source one at a time.
//!
//! Events are dispatched to completion before the next input is read, so
//! events are handled in arrival order. Admin commands run against the same
//! store and their replies go back through the source.

use std::sync::Arc;

use futures::StreamExt;
use tracing::{info, warn};

use crate::admin::AdminCommand;
use crate::channels::{EventSource, RelayInput};
use crate::error::ChannelError;
use crate::pipeline::{DispatchReport, Dispatcher, InboundEvent};

/// Running totals, returned when the input stream ends.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelayStats {
    pub events: usize,
    pub commands: usize,
    pub forwarded: usize,
    pub failed: usize,
}

pub struct Relay {
    dispatcher: Arc<Dispatcher>,
}

impl Relay {
    pub fn new(dispatcher: Arc<Dispatcher>) -> Self {
        Self { dispatcher }
    }

    /// Consume `source` until its stream ends.
    pub async fn run(&self, source: &dyn EventSource) -> Result<RelayStats, ChannelError> {
        let mut inputs = source.start().await?;
        info!(source = source.name(), "Relay listening");

        let mut stats = RelayStats::default();
        while let Some(input) = inputs.next().await {
            match input {
                RelayInput::Event(event) => {
                    let report = self.handle_event(&event).await;
                    stats.events += 1;
                    stats.forwarded += report.delivered;
                    stats.failed += report.failures.len();
                }
                RelayInput::Command(line) => {
                    stats.commands += 1;
                    let reply = self.handle_command(&line).await;
                    if let Err(e) = source.reply(&reply).await {
                        warn!(source = source.name(), error = %e, "Failed to deliver command reply");
                    }
                }
            }
        }

        source.shutdown().await?;
        info!(
            events = stats.events,
            commands = stats.commands,
            forwarded = stats.forwarded,
            failed = stats.failed,
            "Relay input ended"
        );
        Ok(stats)
    }

    /// Dispatch one event and log the outcome.
    pub async fn handle_event(&self, event: &InboundEvent) -> DispatchReport {
        let report = self.dispatcher.dispatch(event).await;
        if report.attempted() > 0 {
            info!(
                source = %event.source_id,
                destinations = report.destinations.len(),
                delivered = report.delivered,
                failed = report.failures.len(),
                "Event dispatched"
            );
        }
        report
    }

    /// Parse and run an admin command line, returning the reply text.
    pub async fn handle_command(&self, line: &str) -> String {
        match AdminCommand::parse(line) {
            Ok(cmd) => cmd.execute(self.dispatcher.store()).await,
            Err(e) => e.to_string(),
        }
    }
}
