//! Insertion point engine: pure content transforms for placing one formatted
//! entry into existing Markdown text.
//!
//! Nothing here touches the filesystem; the router reads the file, calls in,
//! and writes the result back.

use crate::matcher::Matcher;
use chrono::{NaiveDate, NaiveTime};
use serde::Deserialize;

/// Where in a file's content a new entry lands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InsertBehavior {
    Prepend,
    #[default]
    Append,
    /// Group entries under a `# YYYY-MM-DD` heading, creating it on first
    /// write of the day.
    Date,
    /// Extend the contiguous dash list following a position-pattern match.
    EndOfList,
}

impl InsertBehavior {
    pub fn name(self) -> &'static str {
        match self {
            InsertBehavior::Prepend => "prepend",
            InsertBehavior::Append => "append",
            InsertBehavior::Date => "date",
            InsertBehavior::EndOfList => "end-of-list",
        }
    }
}

/// Render the entry line for a submission.
///
/// A configured template has its `$prompt` token substituted; otherwise the
/// behavior's implicit default applies (`date` renders a timestamped
/// checkbox, everything else the raw text). Always newline-terminated.
pub fn format_entry(
    template: Option<&str>,
    behavior: InsertBehavior,
    text: &str,
    now: NaiveTime,
) -> String {
    if let Some(template) = template {
        let mut line = template.replace("$prompt", text);
        line.push('\n');
        return line;
    }
    match behavior {
        InsertBehavior::Date => format!("- [ ] {} {}\n", text, now.format("%H:%M")),
        _ => format!("{text}\n"),
    }
}

/// Compute the new file content with `entry` inserted per `behavior`.
///
/// `position` only matters for `end-of-list`; without it (or without a
/// match) that behavior degrades to append.
pub fn insert_entry(
    content: &str,
    behavior: InsertBehavior,
    position: Option<&dyn Matcher>,
    entry: &str,
    today: NaiveDate,
) -> String {
    match behavior {
        InsertBehavior::Prepend => splice(content, 0, entry),
        InsertBehavior::Append => splice(content, content.len(), entry),
        InsertBehavior::Date => insert_dated(content, entry, today),
        InsertBehavior::EndOfList => {
            let offset = position
                .and_then(|matcher| end_of_list_offset(content, matcher))
                .unwrap_or(content.len());
            splice(content, offset, entry)
        }
    }
}

/// Insert `entry` at `offset`, clamped into `[0, content.len()]`.
fn splice(content: &str, offset: usize, entry: &str) -> String {
    let offset = offset.min(content.len());
    let mut out = String::with_capacity(content.len() + entry.len());
    out.push_str(&content[..offset]);
    out.push_str(entry);
    out.push_str(&content[offset..]);
    out
}

fn insert_dated(content: &str, entry: &str, today: NaiveDate) -> String {
    let heading = format!("# {}", today.format("%Y-%m-%d"));
    if content.lines().any(|line| line == heading) {
        // Heading already present; entries for the day always land at
        // end-of-file, not re-located under the heading.
        return splice(content, content.len(), entry);
    }
    let mut out = String::with_capacity(content.len() + heading.len() + entry.len() + 2);
    out.push_str(content);
    if !content.ends_with('\n') {
        out.push('\n');
    }
    out.push_str(&heading);
    out.push('\n');
    out.push_str(entry);
    out
}

/// Offset just past the last line of the contiguous dash list following the
/// first `position` match, or just past the matched line when no list
/// follows it. `None` when the pattern does not match at all.
fn end_of_list_offset(content: &str, position: &dyn Matcher) -> Option<usize> {
    let matched = position.first_match(content)?;
    let mut offset = match content[matched.end..].find('\n') {
        Some(i) => matched.end + i + 1,
        None => content.len(),
    };
    while offset < content.len() {
        let line_end = match content[offset..].find('\n') {
            Some(i) => offset + i + 1,
            None => content.len(),
        };
        let line = content[offset..line_end].trim_start();
        if line.starts_with("- ") || line.starts_with("-\t") {
            offset = line_end;
        } else {
            break;
        }
    }
    Some(offset)
}
