use std::collections::{HashMap, HashSet};
use std::fmt;

use serde::Deserialize;

use crate::m3u::{HEADER, is_directive, is_url_line};
use crate::matcher::{ChannelTable, Pick};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RewriteMode {
    /// Only substitute URLs of entries already in the destination.
    #[default]
    InPlace,
    /// As `InPlace`, then append wanted channels the destination lacks.
    AppendMissing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelOutcome {
    Updated,
    Unchanged,
    Inserted,
    Appended,
    /// Present in the destination but no source URL was picked.
    NoSource,
    /// Picked, but the destination has no entry for it (in-place mode).
    NotInDestination,
}

impl fmt::Display for ChannelOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Updated => "updated",
            Self::Unchanged => "already up-to-date",
            Self::Inserted => "inserted url",
            Self::Appended => "appended",
            Self::NoSource => "no source url",
            Self::NotInDestination => "not in destination",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RewriteReport {
    pub entries: Vec<(String, ChannelOutcome)>,
}

impl RewriteReport {
    /// Number of entries whose stream URL actually changed or was added.
    pub fn changes(&self) -> usize {
        self.entries
            .iter()
            .filter(|(_, o)| {
                matches!(
                    o,
                    ChannelOutcome::Updated | ChannelOutcome::Inserted | ChannelOutcome::Appended
                )
            })
            .count()
    }
}

#[derive(Debug, Clone)]
pub struct Rewritten {
    pub text: String,
    pub report: RewriteReport,
}

/// Substitutes picked URLs into `dest`. Directive lines are never edited;
/// only the URL line after a matched directive is replaced or inserted.
/// The output keeps the destination's line ending (CRLF when it has any) and
/// ends with exactly one, with trailing blank lines dropped.
pub fn rewrite_playlist(
    dest: &str,
    table: &ChannelTable,
    picked: &HashMap<String, Pick>,
    mode: RewriteMode,
) -> Rewritten {
    let eol = if dest.contains("\r\n") { "\r\n" } else { "\n" };
    let mut lines: Vec<&str> = dest.lines().collect();
    let has_header = lines
        .first()
        .is_some_and(|l| l.trim().to_uppercase().starts_with(HEADER));
    if !has_header {
        lines.insert(0, HEADER);
    }

    let mut report = RewriteReport::default();
    let mut present: HashSet<&str> = HashSet::new();
    let mut out: Vec<String> = Vec::with_capacity(lines.len() + 2);
    let mut i = 0;
    while i < lines.len() {
        let line = lines[i];
        if !is_directive(line) {
            out.push(line.to_string());
            i += 1;
            continue;
        }

        let target = table
            .dest_target(line)
            .map(|r| r.name.as_str())
            .or_else(|| appended_directive(line, table, picked, mode));
        let Some(name) = target else {
            out.push(line.to_string());
            i += 1;
            continue;
        };
        present.insert(name);

        let Some(pick) = picked.get(name) else {
            report.entries.push((name.to_string(), ChannelOutcome::NoSource));
            out.push(line.to_string());
            i += 1;
            continue;
        };

        out.push(line.to_string());
        match lines.get(i + 1).filter(|next| is_url_line(next)) {
            Some(old) => {
                let outcome = if old.trim() == pick.url {
                    ChannelOutcome::Unchanged
                } else {
                    ChannelOutcome::Updated
                };
                report.entries.push((name.to_string(), outcome));
                i += 2;
            }
            None => {
                report.entries.push((name.to_string(), ChannelOutcome::Inserted));
                i += 1;
            }
        }
        out.push(pick.url.clone());
    }

    for rule in &table.rules {
        if present.contains(rule.name.as_str()) {
            continue;
        }
        let Some(pick) = picked.get(&rule.name) else {
            continue;
        };
        if mode == RewriteMode::InPlace {
            report
                .entries
                .push((rule.name.clone(), ChannelOutcome::NotInDestination));
            continue;
        }
        if out.last().is_some_and(|l| !l.trim().is_empty()) {
            out.push(String::new());
        }
        out.push(format!("# --- {} ---", rule.name));
        out.push(pick.directive.clone());
        out.push(pick.url.clone());
        report
            .entries
            .push((rule.name.clone(), ChannelOutcome::Appended));
    }

    let mut text = out.join(eol).trim_end().to_string();
    text.push_str(eol);
    Rewritten { text, report }
}

// A directive appended on an earlier run is recognised by its exact text, so
// re-running append mode does not append it twice.
fn appended_directive<'t>(
    line: &str,
    table: &'t ChannelTable,
    picked: &HashMap<String, Pick>,
    mode: RewriteMode,
) -> Option<&'t str> {
    if mode != RewriteMode::AppendMissing {
        return None;
    }
    table
        .rules
        .iter()
        .find(|r| {
            picked
                .get(&r.name)
                .is_some_and(|p| p.directive.trim() == line.trim())
        })
        .map(|r| r.name.as_str())
}
