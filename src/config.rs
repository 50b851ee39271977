//! Configuration loading and rule compilation.
//!
//! The on-disk config is JSON with rules keyed by integer strings. Loading
//! produces the typed `Config` the router consumes: rules in key order with
//! compiled patterns. A bad rule is dropped with a warning and recorded, a
//! bad config file is an error; nothing here aborts the process.

use crate::insert::InsertBehavior;
use crate::matcher::{Matcher, RegexMatcher};
use crate::resolve::DestinationSpec;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Whether a matched rule ends routing or lets later rules run too.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExitBehavior {
    #[default]
    Finish,
    Continue,
}

/// One compiled routing rule, ready for the router.
pub struct Rule {
    pub key: String,
    pub matcher: Box<dyn Matcher>,
    pub position: Option<Box<dyn Matcher>>,
    pub insert: InsertBehavior,
    pub exit: ExitBehavior,
    pub destination: DestinationSpec,
    pub format: Option<String>,
}

/// Fallback applied when no rule wrote the submission.
pub struct DefaultDestination {
    pub file: PathBuf,
    pub insert: InsertBehavior,
}

/// A rule discarded at load time, kept for `jot rules` output.
pub struct DroppedRule {
    pub key: String,
    pub reason: String,
}

pub struct Config {
    pub interval_minutes: u32,
    pub rules: Vec<Rule>,
    pub default: DefaultDestination,
    pub dropped: Vec<DroppedRule>,
}

#[derive(Deserialize)]
struct RawConfig {
    #[serde(default = "default_interval")]
    interval_minutes: u32,
    #[serde(default)]
    default: RawDefault,
    #[serde(default)]
    rules: BTreeMap<String, RawRule>,
}

#[derive(Default, Deserialize)]
struct RawDefault {
    file: Option<String>,
    insert: Option<InsertBehavior>,
}

#[derive(Deserialize)]
struct RawRule {
    #[serde(rename = "match")]
    pattern: Option<String>,
    position: Option<String>,
    #[serde(default)]
    insert: InsertBehavior,
    #[serde(default)]
    then: ExitBehavior,
    file: Option<String>,
    dir: Option<String>,
    file_match: Option<String>,
    format: Option<String>,
}

fn default_interval() -> u32 {
    30
}

/// Config file location: `--config` override, else the XDG config dir.
pub fn config_path(overridden: Option<&Path>) -> PathBuf {
    if let Some(path) = overridden {
        return path.to_path_buf();
    }
    dirs::config_dir()
        .map(|dir| dir.join("jot").join("config.json"))
        .unwrap_or_else(|| PathBuf::from("jot-config.json"))
}

/// Application-data log file used when the default destination is unset.
pub fn default_log_path() -> PathBuf {
    dirs::data_dir()
        .map(|dir| dir.join("jot").join("log.md"))
        .unwrap_or_else(|| PathBuf::from("jot-log.md"))
}

/// Pretty JSON stub written by `jot init`.
pub fn config_stub() -> String {
    let stub = serde_json::json!({
        "interval_minutes": 30,
        "default": {
            "file": default_log_path(),
            "insert": "date"
        },
        "rules": {
            "10": {
                "match": "(?i)^todo\\b",
                "file": "~/notes/todo.md",
                "insert": "end-of-list",
                "position": "^## Inbox$",
                "format": "- [ ] $prompt",
                "then": "finish"
            }
        }
    });
    serde_json::to_string_pretty(&stub).unwrap_or_default()
}

/// Load and compile the config at `path`.
pub fn load_config(path: &Path) -> Result<Config> {
    let text =
        fs::read_to_string(path).with_context(|| format!("read config {}", path.display()))?;
    parse_config(&text).with_context(|| format!("parse config {}", path.display()))
}

/// Parse config JSON and compile its rules, dropping (and logging) the
/// invalid ones.
pub fn parse_config(text: &str) -> Result<Config> {
    let raw: RawConfig = serde_json::from_str(text).context("parse config JSON")?;

    let mut keyed: Vec<(i64, String, RawRule)> = Vec::new();
    let mut dropped = Vec::new();
    for (key, rule) in raw.rules {
        match key.parse::<i64>() {
            Ok(order) => keyed.push((order, key, rule)),
            Err(_) => drop_rule(&mut dropped, &key, "rule key is not an integer".to_string()),
        }
    }
    // Numeric order, key string breaking ties deterministically.
    keyed.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(&b.1)));

    let mut rules = Vec::new();
    for (_, key, rule) in keyed {
        match compile_rule(&key, rule) {
            Ok(rule) => rules.push(rule),
            Err(err) => drop_rule(&mut dropped, &key, format!("{err:#}")),
        }
    }

    let default = DefaultDestination {
        file: raw
            .default
            .file
            .as_deref()
            .map(expand_path)
            .unwrap_or_else(default_log_path),
        insert: raw.default.insert.unwrap_or(InsertBehavior::Date),
    };

    Ok(Config {
        interval_minutes: raw.interval_minutes.max(1),
        rules,
        default,
        dropped,
    })
}

fn drop_rule(dropped: &mut Vec<DroppedRule>, key: &str, reason: String) {
    tracing::warn!(key, %reason, "dropping rule");
    dropped.push(DroppedRule {
        key: key.to_string(),
        reason,
    });
}

fn compile_rule(key: &str, raw: RawRule) -> Result<Rule> {
    let pattern = raw
        .pattern
        .as_deref()
        .context("rule has no match pattern")?;
    let matcher = Box::new(RegexMatcher::compile(pattern)?) as Box<dyn Matcher>;
    let position = raw
        .position
        .as_deref()
        .map(|p| RegexMatcher::compile(p).map(|m| Box::new(m) as Box<dyn Matcher>))
        .transpose()?;
    if raw.insert == InsertBehavior::EndOfList && position.is_none() {
        tracing::warn!(key, "end-of-list rule has no position pattern; entries will append");
    }

    let destination = match (raw.file.as_deref(), raw.dir.as_deref()) {
        (Some(file), None) => {
            if raw.file_match.is_some() {
                anyhow::bail!("file_match only applies to dir destinations");
            }
            DestinationSpec::File(expand_path(file))
        }
        (None, Some(dir)) => DestinationSpec::Directory {
            dir: expand_path(dir),
            file_match: raw
                .file_match
                .as_deref()
                .map(|p| RegexMatcher::compile(p).map(|m| Box::new(m) as Box<dyn Matcher>))
                .transpose()?,
        },
        (Some(_), Some(_)) => anyhow::bail!("rule sets both file and dir"),
        (None, None) => anyhow::bail!("rule sets neither file nor dir"),
    };

    Ok(Rule {
        key: key.to_string(),
        matcher,
        position,
        insert: raw.insert,
        exit: raw.then,
        destination,
        format: raw.format,
    })
}

fn expand_path(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).into_owned())
}
