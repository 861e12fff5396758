//! Keyword rules: data model, in-memory store, and durable persistence.
//!
//! Rules are scoped to a monitored channel. The store is the single source
//! of truth at runtime; persistence only mirrors it after every mutation.

pub mod model;
pub mod persist;
pub mod store;

pub use model::{ChannelId, Rule, RuleMap, normalize_keywords, parse_keyword_list};
pub use persist::{JsonFilePersistence, MemoryPersistence, RulePersistence};
pub use store::{Mutation, RuleStore};
