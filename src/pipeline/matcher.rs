//! Keyword matcher.
//!
//! Case-insensitive substring matching of a rule's keywords against block
//! titles. No stemming, no word boundaries: "launch" matches "relaunched".
//!
//! Blocks are scanned in order. The first block containing an exclude
//! keyword ends the scan: include keywords in that block are still recorded,
//! later blocks are never looked at, and the rule does not fire.

use tracing::trace;

use crate::pipeline::types::{ContentBlock, MatchResult};
use crate::rules::Rule;

/// Evaluate `rule` against the blocks of one event.
pub fn evaluate(blocks: &[ContentBlock], rule: &Rule) -> MatchResult {
    let mut result = MatchResult::default();
    if !rule.can_fire() {
        return result;
    }

    for block in blocks {
        let Some(title) = block.match_title() else {
            continue;
        };
        let title = title.to_lowercase();

        for kw in &rule.include_keywords {
            if title.contains(kw.as_str()) && !result.matched_keywords.contains(kw) {
                result.matched_keywords.push(kw.clone());
            }
        }

        result.excluded = rule
            .exclude_keywords
            .iter()
            .any(|kw| title.contains(kw.as_str()));

        trace!(
            title = %title,
            matched = ?result.matched_keywords,
            excluded = result.excluded,
            "Scanned block"
        );

        if result.excluded {
            break;
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::ChannelId;

    fn rule(include: &[&str], exclude: &[&str]) -> Rule {
        Rule::new(ChannelId(1), include, exclude)
    }

    fn titled(titles: &[&str]) -> Vec<ContentBlock> {
        titles.iter().map(|t| ContentBlock::titled(*t)).collect()
    }

    #[test]
    fn matches_case_insensitive_substring() {
        let result = evaluate(
            &titled(&["Breaking: Rocket Launch Delayed"]),
            &rule(&["rocket"], &[]),
        );
        assert!(result.fires());
        assert_eq!(result.matched_keywords, vec!["rocket"]);
    }

    #[test]
    fn substring_not_whole_word() {
        let result = evaluate(&titled(&["Relaunched today"]), &rule(&["launch"], &[]));
        assert!(result.fires());
    }

    #[test]
    fn collects_keywords_across_blocks() {
        let result = evaluate(
            &titled(&["Rocket news", "NASA update", "rocket again"]),
            &rule(&["rocket", "nasa", "esa"], &[]),
        );
        assert_eq!(result.matched_keywords, vec!["rocket", "nasa"]);
        assert!(result.fires());
    }

    #[test]
    fn no_match_does_not_fire() {
        let result = evaluate(&titled(&["Weather report"]), &rule(&["rocket"], &[]));
        assert!(result.matched_keywords.is_empty());
        assert!(!result.fires());
    }

    #[test]
    fn exclude_in_same_block_vetoes() {
        let result = evaluate(
            &titled(&["Rocket launch scrubbed"]),
            &rule(&["rocket"], &["scrubbed"]),
        );
        assert!(result.excluded);
        assert_eq!(result.matched_keywords, vec!["rocket"]);
        assert!(!result.fires());
    }

    #[test]
    fn exclude_short_circuits_later_blocks() {
        let result = evaluate(
            &titled(&["rocket news", "launch scrubbed", "launch window opens"]),
            &rule(&["launch", "window"], &["scrubbed"]),
        );
        assert!(result.excluded);
        // The excluding block's own keywords count; the third block is never scanned.
        assert_eq!(result.matched_keywords, vec!["launch"]);
        assert!(!result.fires());
    }

    #[test]
    fn earlier_match_still_vetoed_by_later_exclude() {
        let result = evaluate(
            &titled(&["launch confirmed", "weather scrubbed it"]),
            &rule(&["launch"], &["scrubbed"]),
        );
        assert!(result.excluded);
        assert!(!result.fires());
    }

    #[test]
    fn untitled_blocks_are_ignored() {
        let blocks = vec![
            ContentBlock::default().with_description("rocket scrubbed"),
            ContentBlock {
                title: Some(String::new()),
                ..Default::default()
            },
            ContentBlock::titled("Rocket"),
        ];
        let result = evaluate(&blocks, &rule(&["rocket"], &["scrubbed"]));
        assert!(result.fires());
    }

    #[test]
    fn empty_include_never_fires() {
        let result = evaluate(&titled(&["anything"]), &rule(&[], &["anything"]));
        assert!(!result.fires());
        // Nothing is scanned for a rule that cannot fire.
        assert_eq!(result, MatchResult::default());
    }

    #[test]
    fn no_blocks_never_fires() {
        let result = evaluate(&[], &rule(&["rocket"], &[]));
        assert_eq!(result, MatchResult::default());
    }
}
