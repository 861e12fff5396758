//! Administrative commands over the rule store.
//!
//! Three commands, mirroring the bot's slash commands:
//!
//! ```text
//! /add_rule <monitored> <target> "<+keywords>" ["<-keywords>"]
//! /remove_rule <monitored> "<+keywords>"
//! /view_rules
//! ```
//!
//! Keyword lists are comma-separated. Channels are ids or `<#id>` mentions.

use tracing::debug;

use crate::error::CommandError;
use crate::rules::{ChannelId, RuleMap, RuleStore, parse_keyword_list};

const ADD_USAGE: &str = "/add_rule <monitored> <target> \"<+keywords>\" [\"<-keywords>\"]";
const REMOVE_USAGE: &str = "/remove_rule <monitored> \"<+keywords>\"";

/// A parsed admin command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdminCommand {
    AddRule {
        monitored: ChannelId,
        target: ChannelId,
        include: String,
        exclude: Option<String>,
    },
    RemoveRule {
        monitored: ChannelId,
        include: String,
    },
    ViewRules,
}

impl AdminCommand {
    /// Parse a command line such as `/add_rule 1 2 "rocket, launch"`.
    pub fn parse(line: &str) -> Result<Self, CommandError> {
        let tokens = tokenize(line)?;
        let Some((name, args)) = tokens.split_first() else {
            return Err(CommandError::Unknown(String::new()));
        };

        match name.trim_start_matches('/') {
            "add_rule" => match args {
                [monitored, target, include] | [monitored, target, include, _] => {
                    Ok(Self::AddRule {
                        monitored: parse_channel(monitored)?,
                        target: parse_channel(target)?,
                        include: include.clone(),
                        exclude: args.get(3).cloned(),
                    })
                }
                _ => Err(CommandError::Usage { usage: ADD_USAGE }),
            },
            "remove_rule" => match args {
                [monitored, include] => Ok(Self::RemoveRule {
                    monitored: parse_channel(monitored)?,
                    include: include.clone(),
                }),
                _ => Err(CommandError::Usage {
                    usage: REMOVE_USAGE,
                }),
            },
            "view_rules" => Ok(Self::ViewRules),
            other => Err(CommandError::Unknown(other.to_string())),
        }
    }

    /// Run the command against the store and return the reply text.
    pub async fn execute(self, store: &RuleStore) -> String {
        debug!(command = ?self, "Executing admin command");
        match self {
            Self::AddRule {
                monitored,
                target,
                include,
                exclude,
            } => add_rule(store, monitored, target, &include, exclude.as_deref()).await,
            Self::RemoveRule { monitored, include } => {
                remove_rule(store, monitored, &include).await
            }
            Self::ViewRules => view_rules(store).await,
        }
    }
}

/// Add a rule from comma-separated keyword lists.
pub async fn add_rule(
    store: &RuleStore,
    monitored: ChannelId,
    target: ChannelId,
    include: &str,
    exclude: Option<&str>,
) -> String {
    let include = parse_keyword_list(include);
    if include.is_empty() {
        return "At least one + keyword is required.".to_string();
    }
    let exclude = exclude.map(parse_keyword_list).unwrap_or_default();

    let added = store.add_rule(monitored, target, include, exclude).await;
    let rule = &added.value;

    let mut reply = format!(
        "Added rule:\n\
         Monitored Channel: <#{monitored}>\n\
         Target Channel: <#{target}>\n\
         + Keywords: {}\n\
         - Keywords: {}",
        rule.include_keywords.join(", "),
        join_or_none(&rule.exclude_keywords),
    );
    if !added.persisted() {
        reply.push_str("\nWarning: rule is active but could not be saved to disk.");
    }
    reply
}

/// Remove every rule under `monitored` with exactly this include set.
pub async fn remove_rule(store: &RuleStore, monitored: ChannelId, include: &str) -> String {
    if !store.is_monitored(monitored).await {
        return format!("No rules found for <#{monitored}>.");
    }

    let keywords = parse_keyword_list(include);
    let removed = store.remove_rule(monitored, &keywords).await;
    let listed = keywords.join(", ");

    if removed.value == 0 {
        return format!("No matching rule found for <#{monitored}> with +keywords `{listed}`.");
    }

    let mut reply = format!("Removed rule for <#{monitored}> with +keywords `{listed}`.");
    if !removed.persisted() {
        reply.push_str("\nWarning: removal is active but could not be saved to disk.");
    }
    reply
}

/// Human-readable listing of every rule.
pub async fn view_rules(store: &RuleStore) -> String {
    format_rules(&store.list_rules().await)
}

fn format_rules(rules: &RuleMap) -> String {
    if rules.is_empty() {
        return "No rules are currently set.".to_string();
    }

    let summary: Vec<String> = rules
        .iter()
        .flat_map(|(monitored, list)| {
            list.iter().map(move |rule| {
                format!(
                    "Monitored Channel: <#{monitored}>  → Target Channel: <#{}>\n       \
                     Positive Keywords: {}\n       \
                     Negative Keywords: {}\n",
                    rule.target_channel,
                    rule.include_keywords.join(", "),
                    rule.exclude_keywords.join(", "),
                )
            })
        })
        .collect();

    format!("**Current Rules:**\n{}", summary.join("\n"))
}

fn join_or_none(keywords: &[String]) -> String {
    if keywords.is_empty() {
        "None".to_string()
    } else {
        keywords.join(", ")
    }
}

fn parse_channel(raw: &str) -> Result<ChannelId, CommandError> {
    raw.parse()
        .map_err(|_| CommandError::InvalidChannel(raw.to_string()))
}

/// Split on whitespace, keeping double-quoted runs together.
fn tokenize(line: &str) -> Result<Vec<String>, CommandError> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut quoted = false;

    for c in line.trim().chars() {
        match c {
            '"' => {
                in_quotes = !in_quotes;
                quoted = true;
            }
            c if c.is_whitespace() && !in_quotes => {
                if !current.is_empty() || quoted {
                    tokens.push(std::mem::take(&mut current));
                }
                quoted = false;
            }
            c => current.push(c),
        }
    }

    if in_quotes {
        return Err(CommandError::UnterminatedQuote);
    }
    if !current.is_empty() || quoted {
        tokens.push(current);
    }
    Ok(tokens)
}
