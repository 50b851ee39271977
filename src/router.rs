//! Entry router: walks the ordered rules for one submission and lands the
//! formatted entry in the first destination that accepts it, falling back
//! to the default destination.
//!
//! Every per-rule failure degrades to "try the next rule"; only a failed
//! default write surfaces as an error.

use crate::config::{Config, DefaultDestination, ExitBehavior, Rule};
use crate::fsio::{read_or_create, write_atomic};
use crate::insert::{format_entry, insert_entry};
use crate::resolve::resolve;
use anyhow::{Context, Result};
use chrono::NaiveDateTime;

/// Route one submission. Returns whether a rule wrote it (`false` means the
/// default destination was used, or the submission was empty).
pub fn route(text: &str, config: &Config, now: NaiveDateTime) -> Result<bool> {
    let text = text.trim();
    if text.is_empty() {
        tracing::debug!("empty submission, nothing to route");
        return Ok(false);
    }

    let mut any_written = false;
    for rule in &config.rules {
        if !rule.matcher.is_match(text) {
            continue;
        }
        tracing::debug!(key = rule.key.as_str(), "rule matched");
        let wrote = match apply_rule(rule, text, now) {
            Ok(path) => {
                tracing::info!(key = rule.key.as_str(), path = %path, "entry written");
                true
            }
            Err(err) => {
                let reason = format!("{err:#}");
                tracing::warn!(key = rule.key.as_str(), %reason, "rule skipped");
                false
            }
        };
        any_written = any_written || wrote;
        // A finish rule that wrote ends routing; one that failed falls
        // through to the next rule rather than straight to the default.
        if wrote && rule.exit == ExitBehavior::Finish {
            return Ok(true);
        }
    }
    if any_written {
        return Ok(true);
    }

    write_default(&config.default, text, now)?;
    Ok(false)
}

/// Resolve, read, insert, and atomically rewrite for one matched rule.
/// Returns the written path for logging.
fn apply_rule(rule: &Rule, text: &str, now: NaiveDateTime) -> Result<String> {
    let resolved = resolve(&rule.destination)?;
    if resolved.must_exist && !resolved.path.is_file() {
        anyhow::bail!("resolved file {} no longer exists", resolved.path.display());
    }
    let content = read_or_create(&resolved.path, !resolved.must_exist)?;
    let entry = format_entry(rule.format.as_deref(), rule.insert, text, now.time());
    let updated = insert_entry(
        &content,
        rule.insert,
        rule.position.as_deref(),
        &entry,
        now.date(),
    );
    write_atomic(&resolved.path, &updated)?;
    Ok(resolved.path.display().to_string())
}

fn write_default(default: &DefaultDestination, text: &str, now: NaiveDateTime) -> Result<()> {
    let content = read_or_create(&default.file, true)?;
    let entry = format_entry(None, default.insert, text, now.time());
    let updated = insert_entry(&content, default.insert, None, &entry, now.date());
    write_atomic(&default.file, &updated)
        .with_context(|| format!("default destination {}", default.file.display()))?;
    tracing::info!(path = %default.file.display(), "entry written to default");
    Ok(())
}
