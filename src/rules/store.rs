//! In-memory rule store with write-through persistence.

use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};
use tracing::{error, info};

use super::model::{ChannelId, Rule, RuleMap, normalize_keywords};
use super::persist::RulePersistence;
use crate::error::StoreError;

/// Result of a store mutation.
///
/// The in-memory change always stands; `persist_error` reports whether the
/// following write to durable storage failed.
#[derive(Debug)]
pub struct Mutation<T> {
    pub value: T,
    pub persist_error: Option<StoreError>,
}

impl<T> Mutation<T> {
    pub fn persisted(&self) -> bool {
        self.persist_error.is_none()
    }
}

/// Monitored channel → rules, shared between admin commands and the dispatcher.
///
/// Mutations and the persistence write that follows them are serialized by
/// `writer`. Readers only take the map's read lock, so they never wait on disk.
pub struct RuleStore {
    rules: RwLock<RuleMap>,
    writer: Mutex<()>,
    persistence: Arc<dyn RulePersistence>,
}

impl RuleStore {
    /// Create an empty store.
    pub fn new(persistence: Arc<dyn RulePersistence>) -> Self {
        Self {
            rules: RwLock::new(RuleMap::new()),
            writer: Mutex::new(()),
            persistence,
        }
    }

    /// Create a store populated from the persistence layer.
    pub async fn load(persistence: Arc<dyn RulePersistence>) -> Result<Self, StoreError> {
        let mut rules = persistence.load().await?;
        // Hand-edited files may carry mixed-case or padded keywords.
        for list in rules.values_mut() {
            for rule in list.iter_mut() {
                *rule = Rule::new(
                    rule.target_channel,
                    &rule.include_keywords,
                    &rule.exclude_keywords,
                );
            }
        }
        // Entries with no rules must not exist in the map.
        rules.retain(|_, list| !list.is_empty());
        Ok(Self {
            rules: RwLock::new(rules),
            writer: Mutex::new(()),
            persistence,
        })
    }

    /// Append a rule for `source`. Duplicate rules are allowed.
    pub async fn add_rule<I, E, S, T>(
        &self,
        source: ChannelId,
        target: ChannelId,
        include: I,
        exclude: E,
    ) -> Mutation<Rule>
    where
        I: IntoIterator<Item = S>,
        E: IntoIterator<Item = T>,
        S: AsRef<str>,
        T: AsRef<str>,
    {
        let rule = Rule::new(target, include, exclude);

        let _writer = self.writer.lock().await;
        let snapshot = {
            let mut rules = self.rules.write().await;
            rules.entry(source).or_default().push(rule.clone());
            rules.clone()
        };

        info!(
            source = %source,
            destination = %target,
            include = ?rule.include_keywords,
            exclude = ?rule.exclude_keywords,
            "Rule added"
        );

        let persist_error = self.persist(&snapshot).await;
        Mutation {
            value: rule,
            persist_error,
        }
    }

    /// Remove every rule under `source` whose include set equals `include`.
    ///
    /// Returns the number of rules removed. Persistence only runs when
    /// something was removed.
    pub async fn remove_rule<I, S>(&self, source: ChannelId, include: I) -> Mutation<usize>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let include = normalize_keywords(include);

        let _writer = self.writer.lock().await;
        let (removed, snapshot) = {
            let mut rules = self.rules.write().await;
            let Some(list) = rules.get_mut(&source) else {
                return Mutation {
                    value: 0,
                    persist_error: None,
                };
            };

            let before = list.len();
            list.retain(|rule| !rule.has_include_set(&include));
            let removed = before - list.len();

            if list.is_empty() {
                rules.remove(&source);
            }
            (removed, rules.clone())
        };

        if removed == 0 {
            return Mutation {
                value: 0,
                persist_error: None,
            };
        }

        info!(source = %source, include = ?include, removed, "Rules removed");

        let persist_error = self.persist(&snapshot).await;
        Mutation {
            value: removed,
            persist_error,
        }
    }

    /// Owned snapshot of every rule.
    pub async fn list_rules(&self) -> RuleMap {
        self.rules.read().await.clone()
    }

    /// Owned snapshot of the rules for `source`, in insertion order.
    pub async fn rules_for(&self, source: ChannelId) -> Vec<Rule> {
        self.rules
            .read()
            .await
            .get(&source)
            .cloned()
            .unwrap_or_default()
    }

    /// Whether any rule watches `source`.
    pub async fn is_monitored(&self, source: ChannelId) -> bool {
        self.rules.read().await.contains_key(&source)
    }

    async fn persist(&self, snapshot: &RuleMap) -> Option<StoreError> {
        match self.persistence.save(snapshot).await {
            Ok(()) => None,
            Err(e) => {
                error!(error = %e, "Failed to persist rules; in-memory state kept");
                Some(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::rules::model::parse_keyword_list;
    use crate::rules::persist::MemoryPersistence;

    const SRC: ChannelId = ChannelId(100);
    const DEST: ChannelId = ChannelId(200);

    fn store() -> (RuleStore, Arc<MemoryPersistence>) {
        let mem = Arc::new(MemoryPersistence::new());
        (RuleStore::new(mem.clone()), mem)
    }

    const NONE: [&str; 0] = [];

    struct FailingPersistence;

    #[async_trait]
    impl RulePersistence for FailingPersistence {
        async fn load(&self) -> Result<RuleMap, StoreError> {
            Ok(RuleMap::new())
        }
        async fn save(&self, _rules: &RuleMap) -> Result<(), StoreError> {
            Err(StoreError::Io(std::io::Error::other("disk full")))
        }
    }

    #[tokio::test]
    async fn add_normalizes_and_persists() {
        let (store, mem) = store();
        let added = store
            .add_rule(SRC, DEST, parse_keyword_list(" Rocket, LAUNCH "), NONE)
            .await;

        assert!(added.persisted());
        assert_eq!(added.value.include_keywords, vec!["rocket", "launch"]);
        assert_eq!(store.rules_for(SRC).await.len(), 1);
        assert_eq!(mem.save_count().await, 1);
        assert_eq!(mem.snapshot().await.unwrap(), store.list_rules().await);
    }

    #[tokio::test]
    async fn add_keeps_duplicates_in_order() {
        let (store, _) = store();
        store.add_rule(SRC, DEST, ["a"], NONE).await;
        store.add_rule(SRC, ChannelId(300), ["b"], NONE).await;
        store.add_rule(SRC, DEST, ["a"], NONE).await;

        let rules = store.rules_for(SRC).await;
        let targets: Vec<u64> = rules.iter().map(|r| r.target_channel.0).collect();
        assert_eq!(targets, vec![200, 300, 200]);
    }

    #[tokio::test]
    async fn remove_matches_by_set_equality() {
        let (store, _) = store();
        store.add_rule(SRC, DEST, ["rocket", "launch"], NONE).await;
        store.add_rule(SRC, ChannelId(300), ["rocket"], NONE).await;

        let removed = store
            .remove_rule(SRC, parse_keyword_list("LAUNCH , rocket"))
            .await;
        assert_eq!(removed.value, 1);

        let rules = store.rules_for(SRC).await;
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].include_keywords, vec!["rocket"]);
    }

    #[tokio::test]
    async fn remove_removes_every_duplicate() {
        let (store, _) = store();
        store.add_rule(SRC, DEST, ["a"], NONE).await;
        store.add_rule(SRC, ChannelId(300), ["a"], ["b"]).await;

        assert_eq!(store.remove_rule(SRC, ["a"]).await.value, 2);
        assert!(!store.is_monitored(SRC).await);
    }

    #[tokio::test]
    async fn remove_without_match_is_noop() {
        let (store, mem) = store();
        store.add_rule(SRC, DEST, ["rocket", "launch"], NONE).await;

        assert_eq!(store.remove_rule(SRC, ["rocket"]).await.value, 0);
        assert_eq!(store.remove_rule(ChannelId(999), ["rocket"]).await.value, 0);
        assert_eq!(store.rules_for(SRC).await.len(), 1);
        // Only the add was persisted.
        assert_eq!(mem.save_count().await, 1);
    }

    #[tokio::test]
    async fn add_then_remove_restores_prior_state() {
        let (store, mem) = store();
        store.add_rule(SRC, DEST, ["x"], NONE).await;
        let before = store.list_rules().await;

        store
            .add_rule(ChannelId(101), DEST, ["Rocket", " launch"], NONE)
            .await;
        store.remove_rule(ChannelId(101), ["LAUNCH", "rocket "]).await;

        assert_eq!(store.list_rules().await, before);
        assert!(!store.is_monitored(ChannelId(101)).await);
        assert_eq!(mem.snapshot().await.unwrap(), before);
    }

    #[tokio::test]
    async fn snapshots_are_detached() {
        let (store, _) = store();
        store.add_rule(SRC, DEST, ["a"], NONE).await;

        let mut snapshot = store.list_rules().await;
        snapshot.clear();
        let mut rules = store.rules_for(SRC).await;
        rules.clear();

        assert_eq!(store.rules_for(SRC).await.len(), 1);
    }

    #[tokio::test]
    async fn unknown_source_has_no_rules() {
        let (store, _) = store();
        assert!(store.rules_for(ChannelId(5)).await.is_empty());
    }

    #[tokio::test]
    async fn persistence_failure_keeps_mutation() {
        let store = RuleStore::new(Arc::new(FailingPersistence));
        let added = store.add_rule(SRC, DEST, ["a"], NONE).await;

        assert!(!added.persisted());
        assert_eq!(store.rules_for(SRC).await.len(), 1);

        let removed = store.remove_rule(SRC, ["a"]).await;
        assert_eq!(removed.value, 1);
        assert!(removed.persist_error.is_some());
        assert!(store.list_rules().await.is_empty());
    }

    #[tokio::test]
    async fn load_drops_empty_entries() {
        let mut seeded = RuleMap::new();
        seeded.insert(SRC, vec![]);
        seeded.insert(ChannelId(101), vec![Rule::new(DEST, ["a"], NONE)]);
        let store = RuleStore::load(Arc::new(MemoryPersistence::with_rules(seeded)))
            .await
            .unwrap();

        assert!(!store.is_monitored(SRC).await);
        assert!(store.is_monitored(ChannelId(101)).await);
    }

    #[tokio::test]
    async fn load_normalizes_keywords() {
        let mut seeded = RuleMap::new();
        seeded.insert(
            SRC,
            vec![Rule {
                target_channel: DEST,
                include_keywords: vec!["Rocket".into(), " launch".into(), "ROCKET".into()],
                exclude_keywords: vec![" Scrubbed ".into()],
            }],
        );
        let store = RuleStore::load(Arc::new(MemoryPersistence::with_rules(seeded)))
            .await
            .unwrap();

        let rules = store.rules_for(SRC).await;
        assert_eq!(rules[0].include_keywords, vec!["rocket", "launch"]);
        assert_eq!(rules[0].exclude_keywords, vec!["scrubbed"]);

        let removed = store.remove_rule(SRC, ["launch", "rocket"]).await;
        assert_eq!(removed.value, 1);
        assert!(!store.is_monitored(SRC).await);
    }

    #[tokio::test]
    async fn concurrent_adds_are_all_persisted() {
        let mem = Arc::new(MemoryPersistence::new());
        let store = Arc::new(RuleStore::new(mem.clone()));

        let handles: Vec<_> = (0..16u64)
            .map(|i| {
                let store = Arc::clone(&store);
                tokio::spawn(async move {
                    store
                        .add_rule(ChannelId(i % 4), DEST, [format!("kw{i}")], NONE)
                        .await;
                })
            })
            .collect();
        for h in handles {
            h.await.unwrap();
        }

        let total: usize = store.list_rules().await.values().map(Vec::len).sum();
        assert_eq!(total, 16);
        assert_eq!(mem.save_count().await, 16);
        assert_eq!(mem.snapshot().await.unwrap(), store.list_rules().await);
    }
}
