//! Rule evaluation and dispatch pipeline.
//!
//! Every inbound event flows through:
//! 1. Self-authored filter: the relay never re-evaluates its own posts
//! 2. `RuleStore::rules_for()`: rules for the event's source channel
//! 3. `matcher::evaluate()`: keyword matching per rule, pure
//! 4. `Dispatcher`: destination dedup and concurrent forwarding

pub mod dispatcher;
pub mod matcher;
pub mod types;

pub use dispatcher::Dispatcher;
pub use types::{ContentBlock, DispatchReport, ForwardPlan, Forwarder, InboundEvent, MatchResult};
