//! Rule data model and keyword normalization.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

// ── Channel identifiers ─────────────────────────────────────────────

/// Platform channel identifier (a Discord snowflake).
///
/// Used both for monitored sources and for forwarding destinations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChannelId(pub u64);

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ChannelId {
    type Err = std::num::ParseIntError;

    /// Accepts a bare id or a channel mention (`<#123>`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let raw = s
            .strip_prefix("<#")
            .and_then(|rest| rest.strip_suffix('>'))
            .unwrap_or(s);
        raw.parse().map(ChannelId)
    }
}

// ── Rule ────────────────────────────────────────────────────────────

/// A keyword rule scoped to one monitored channel.
///
/// Field names match the on-disk rules file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    /// Where matching content is forwarded.
    pub target_channel: ChannelId,
    /// At least one of these must appear in a block title.
    pub include_keywords: Vec<String>,
    /// Any of these in a scanned block title vetoes the rule.
    #[serde(default)]
    pub exclude_keywords: Vec<String>,
}

impl Rule {
    /// Build a rule, normalizing both keyword lists.
    pub fn new<I, E, S, T>(target_channel: ChannelId, include: I, exclude: E) -> Self
    where
        I: IntoIterator<Item = S>,
        E: IntoIterator<Item = T>,
        S: AsRef<str>,
        T: AsRef<str>,
    {
        Self {
            target_channel,
            include_keywords: normalize_keywords(include),
            exclude_keywords: normalize_keywords(exclude),
        }
    }

    /// Whether this rule's include keywords equal `keywords` as a set.
    ///
    /// `keywords` is expected to be normalized already.
    pub fn has_include_set(&self, keywords: &[String]) -> bool {
        let ours: BTreeSet<&str> = self.include_keywords.iter().map(String::as_str).collect();
        let theirs: BTreeSet<&str> = keywords.iter().map(String::as_str).collect();
        ours == theirs
    }

    /// A rule without include keywords can never fire.
    pub fn can_fire(&self) -> bool {
        !self.include_keywords.is_empty()
    }
}

/// Monitored channel → ordered rules.
pub type RuleMap = BTreeMap<ChannelId, Vec<Rule>>;

// ── Keyword normalization ───────────────────────────────────────────

/// Trim, lowercase, drop empties, and collapse duplicates (first-seen order).
///
/// Idempotent: normalizing a normalized list returns it unchanged.
pub fn normalize_keywords<I, S>(keywords: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = BTreeSet::new();
    keywords
        .into_iter()
        .map(|kw| kw.as_ref().trim().to_lowercase())
        .filter(|kw| !kw.is_empty())
        .filter(|kw| seen.insert(kw.clone()))
        .collect()
}

/// Parse a comma-separated keyword list ("Rocket, launch ,,NASA").
pub fn parse_keyword_list(list: &str) -> Vec<String> {
    normalize_keywords(list.split(','))
}
