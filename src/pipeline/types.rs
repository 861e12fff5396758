//! Shared types for the relay pipeline.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ChannelError;
use crate::rules::ChannelId;

// ── Inbound event ───────────────────────────────────────────────────

/// Platform-agnostic inbound event.
///
/// Channel adapters convert their native payloads into this shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundEvent {
    /// Channel the event arrived on.
    pub source_id: ChannelId,
    /// Author identity (user or bot id).
    pub author_id: u64,
    /// Forwardable content, in platform order.
    #[serde(default)]
    pub blocks: Vec<ContentBlock>,
}

impl InboundEvent {
    pub fn new(source_id: ChannelId, author_id: u64) -> Self {
        Self {
            source_id,
            author_id,
            blocks: Vec::new(),
        }
    }

    pub fn with_block(mut self, block: ContentBlock) -> Self {
        self.blocks.push(block);
        self
    }

    /// Blocks that would be forwarded on a match.
    pub fn forwardable_blocks(&self) -> impl Iterator<Item = &ContentBlock> {
        self.blocks.iter().filter(|b| b.has_content())
    }
}

/// One unit of forwardable content (a Discord embed).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContentBlock {
    /// Only the title takes part in matching.
    pub title: Option<String>,
    pub description: Option<String>,
    pub url: Option<String>,
    /// Full platform payload, re-posted verbatim when forwarding.
    #[serde(default)]
    pub raw: serde_json::Value,
}

impl ContentBlock {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Default::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Title, if present and non-empty.
    pub fn match_title(&self) -> Option<&str> {
        self.title.as_deref().filter(|t| !t.is_empty())
    }

    /// Whether there is anything to forward.
    pub fn has_content(&self) -> bool {
        let non_empty = |s: &Option<String>| s.as_deref().is_some_and(|s| !s.is_empty());
        non_empty(&self.title)
            || non_empty(&self.description)
            || non_empty(&self.url)
            || self.raw.as_object().is_some_and(|o| !o.is_empty())
    }

    /// Payload to send to the destination.
    ///
    /// Prefers the raw platform payload; otherwise builds one from the
    /// known fields.
    pub fn to_payload(&self) -> serde_json::Value {
        if self.raw.as_object().is_some_and(|o| !o.is_empty()) {
            return self.raw.clone();
        }
        let mut payload = serde_json::Map::new();
        if let Some(ref title) = self.title {
            payload.insert("title".into(), title.clone().into());
        }
        if let Some(ref description) = self.description {
            payload.insert("description".into(), description.clone().into());
        }
        if let Some(ref url) = self.url {
            payload.insert("url".into(), url.clone().into());
        }
        serde_json::Value::Object(payload)
    }
}

// ── Matching ────────────────────────────────────────────────────────

/// Outcome of evaluating one rule against one event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchResult {
    /// Include keywords found, in first-match order, without duplicates.
    pub matched_keywords: Vec<String>,
    /// An exclude keyword was found in a scanned block.
    pub excluded: bool,
}

impl MatchResult {
    /// The rule fires when something matched and nothing excluded it.
    pub fn fires(&self) -> bool {
        !self.matched_keywords.is_empty() && !self.excluded
    }
}

// ── Dispatch ────────────────────────────────────────────────────────

/// One forwarding pass: every forwardable block of an event to one destination.
#[derive(Debug, Clone)]
pub struct ForwardPlan {
    pub destination: ChannelId,
    pub blocks: Vec<ContentBlock>,
    /// Keywords of the rule that claimed this destination.
    pub matched_keywords: Vec<String>,
}

/// Summary of one event's dispatch.
#[derive(Debug, Clone, Default)]
pub struct DispatchReport {
    /// Event was authored by the relay itself and skipped.
    pub self_authored: bool,
    /// Rules evaluated for the source.
    pub rules_evaluated: usize,
    /// Destinations that received a forwarding pass, in rule order.
    pub destinations: Vec<ChannelId>,
    /// Forward calls that succeeded.
    pub delivered: usize,
    /// Forward calls that failed, with the failure.
    pub failures: Vec<(ChannelId, String)>,
}

impl DispatchReport {
    pub fn attempted(&self) -> usize {
        self.delivered + self.failures.len()
    }
}

// ── Forwarder trait ─────────────────────────────────────────────────

/// Egress side of a platform adapter: pure I/O, no matching logic.
#[async_trait]
pub trait Forwarder: Send + Sync {
    /// Adapter name (e.g. "discord").
    fn name(&self) -> &str;

    /// Whether `destination` exists and can be posted to.
    ///
    /// Unreachable destinations are skipped by the dispatcher.
    async fn is_reachable(&self, _destination: ChannelId) -> bool {
        true
    }

    /// Post one content block to `destination`.
    async fn forward(
        &self,
        destination: ChannelId,
        block: &ContentBlock,
    ) -> Result<(), ChannelError>;
}
