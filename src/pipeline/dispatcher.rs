//! Event dispatcher: matches an event against its source's rules and fans
//! the content out to every firing destination.

use std::collections::HashSet;
use std::sync::Arc;

use futures::future::join_all;
use tracing::{debug, info, warn};

use crate::pipeline::matcher;
use crate::pipeline::types::{DispatchReport, ForwardPlan, Forwarder, InboundEvent};
use crate::rules::{ChannelId, Rule, RuleStore};

/// Routes inbound events to destinations according to the rule store.
pub struct Dispatcher {
    store: Arc<RuleStore>,
    forwarder: Arc<dyn Forwarder>,
    /// The relay's own author id; its posts are never evaluated.
    self_id: Option<u64>,
}

impl Dispatcher {
    pub fn new(store: Arc<RuleStore>, forwarder: Arc<dyn Forwarder>) -> Self {
        Self {
            store,
            forwarder,
            self_id: None,
        }
    }

    /// Set the relay's own identity on the platform.
    pub fn with_self_id(mut self, self_id: u64) -> Self {
        self.self_id = Some(self_id);
        self
    }

    pub fn store(&self) -> &Arc<RuleStore> {
        &self.store
    }

    fn is_self_authored(&self, event: &InboundEvent) -> bool {
        self.self_id == Some(event.author_id)
    }

    /// Decide which destinations receive this event, without sending anything.
    ///
    /// Each destination gets at most one pass per event, claimed by the
    /// first firing rule (in store order) that targets it. Unreachable
    /// destinations are skipped and stay unclaimed.
    pub async fn route(&self, event: &InboundEvent) -> Vec<ForwardPlan> {
        if self.is_self_authored(event) {
            return Vec::new();
        }

        let rules = self.store.rules_for(event.source_id).await;
        self.plan(event, &rules).await
    }

    async fn plan(&self, event: &InboundEvent, rules: &[Rule]) -> Vec<ForwardPlan> {
        let mut processed: HashSet<ChannelId> = HashSet::new();
        let mut plans = Vec::new();

        for rule in rules {
            let result = matcher::evaluate(&event.blocks, rule);
            debug!(
                source = %event.source_id,
                destination = %rule.target_channel,
                matched = ?result.matched_keywords,
                excluded = result.excluded,
                "Evaluated rule"
            );

            if !result.fires() || processed.contains(&rule.target_channel) {
                continue;
            }

            if !self.forwarder.is_reachable(rule.target_channel).await {
                debug!(destination = %rule.target_channel, "Destination unreachable, skipping rule");
                continue;
            }

            processed.insert(rule.target_channel);
            plans.push(ForwardPlan {
                destination: rule.target_channel,
                blocks: event.forwardable_blocks().cloned().collect(),
                matched_keywords: result.matched_keywords,
            });
        }

        plans
    }

    /// Route the event and run every forward concurrently.
    ///
    /// Waits for all forwards to finish. A failed forward is logged and
    /// recorded; it never stops the others.
    pub async fn dispatch(&self, event: &InboundEvent) -> DispatchReport {
        if self.is_self_authored(event) {
            debug!(source = %event.source_id, "Skipping self-authored event");
            return DispatchReport {
                self_authored: true,
                ..Default::default()
            };
        }

        let rules = self.store.rules_for(event.source_id).await;
        let plans = self.plan(event, &rules).await;

        let mut report = DispatchReport {
            rules_evaluated: rules.len(),
            destinations: plans.iter().map(|p| p.destination).collect(),
            ..Default::default()
        };

        for plan in &plans {
            info!(
                source = %event.source_id,
                destination = %plan.destination,
                keywords = ?plan.matched_keywords,
                blocks = plan.blocks.len(),
                "Event matched rule, forwarding"
            );
        }

        let forwarder = &self.forwarder;
        let sends = plans.iter().flat_map(move |plan| {
            plan.blocks.iter().map(move |block| async move {
                let outcome = forwarder.forward(plan.destination, block).await;
                (plan.destination, outcome)
            })
        });

        for (destination, outcome) in join_all(sends).await {
            match outcome {
                Ok(()) => report.delivered += 1,
                Err(e) => {
                    warn!(
                        destination = %destination,
                        forwarder = forwarder.name(),
                        error = %e,
                        "Forward failed"
                    );
                    report.failures.push((destination, e.to_string()));
                }
            }
        }

        report
    }
}
