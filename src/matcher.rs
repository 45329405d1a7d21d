use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::m3u::{PlaylistEntry, display_name, normalize_name};

static ENGLISH_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(en|english)\b").expect("static regex"));
const QUALITY_TAGS: [&str; 4] = [" uhd", " 4k", " fhd", " hd"];

const REGION_POINTS: u32 = 5;
const QUALITY_POINTS: u32 = 2;
const ENGLISH_POINTS: u32 = 1;

/// When a destination name mentions one of the `foreign` words it must also
/// carry a `required` hint, so feeds for other countries are left alone.
#[derive(Debug, Clone)]
pub struct RegionGuard {
    pub foreign: Regex,
    pub required: Regex,
}

#[derive(Debug, Clone)]
pub struct ChannelRule {
    pub name: String,
    /// Full-directive patterns for the source feed, OR-ed.
    pub source_patterns: Vec<Regex>,
    /// Normalized display names accepted in the destination.
    pub dest_aliases: Vec<String>,
    /// Extra destination patterns, applied to the normalized display name.
    pub dest_patterns: Vec<Regex>,
    /// Normalized word a source display name must contain.
    pub require_source_word: Option<String>,
    pub region_guard: Option<RegionGuard>,
}

impl ChannelRule {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source_patterns: Vec::new(),
            dest_aliases: Vec::new(),
            dest_patterns: Vec::new(),
            require_source_word: None,
            region_guard: None,
        }
    }

    pub fn with_aliases<I, S>(mut self, aliases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.dest_aliases
            .extend(aliases.into_iter().map(|a| normalize_name(a.as_ref())));
        self
    }

    pub fn with_source_patterns(mut self, patterns: Vec<Regex>) -> Self {
        self.source_patterns.extend(patterns);
        self
    }

    /// Rules without source patterns fall back to the destination alias test.
    pub fn matches_source(&self, directive: &str) -> bool {
        if let Some(word) = self.require_source_word.as_deref() {
            let name = normalize_name(display_name(directive));
            if !name.split(' ').any(|w| w == word) {
                return false;
            }
        }
        if self.source_patterns.is_empty() {
            return self.alias_match(&normalize_name(display_name(directive)));
        }
        self.source_patterns.iter().any(|rx| rx.is_match(directive))
    }

    pub fn matches_destination(&self, directive: &str) -> bool {
        let name = normalize_name(display_name(directive));
        let base =
            self.alias_match(&name) || self.dest_patterns.iter().any(|rx| rx.is_match(&name));
        if !base {
            return false;
        }
        match &self.region_guard {
            Some(guard) if guard.foreign.is_match(&name) => guard.required.is_match(&name),
            _ => true,
        }
    }

    // Equal, or the alias followed by a word boundary (a space after normalization).
    fn alias_match(&self, normalized: &str) -> bool {
        self.dest_aliases.iter().any(|alias| {
            !alias.is_empty()
                && (normalized == alias
                    || normalized
                        .strip_prefix(alias.as_str())
                        .is_some_and(|rest| rest.starts_with(' ')))
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pick {
    pub directive: String,
    pub url: String,
}

/// The wanted channels of one playlist job, in wanted order.
#[derive(Debug, Clone, Default)]
pub struct ChannelTable {
    pub rules: Vec<ChannelRule>,
    /// Lowercase substrings that mark the preferred region of a source entry.
    pub region_markers: Vec<String>,
}

impl ChannelTable {
    /// First rule, in table order, whose destination test accepts the line.
    pub fn dest_target(&self, directive: &str) -> Option<&ChannelRule> {
        self.rules.iter().find(|r| r.matches_destination(directive))
    }

    pub fn score(&self, directive: &str) -> u32 {
        let low = directive.to_lowercase();
        let mut sc = 0;
        if self
            .region_markers
            .iter()
            .any(|m| !m.is_empty() && low.contains(&m.to_lowercase()))
        {
            sc += REGION_POINTS;
        }
        if QUALITY_TAGS.iter().any(|q| low.contains(q)) {
            sc += QUALITY_POINTS;
        }
        if ENGLISH_TAG.is_match(&low) {
            sc += ENGLISH_POINTS;
        }
        sc
    }

    /// Best source entry per wanted channel. Entries without a URL are never
    /// candidates; equal scores keep the earliest entry.
    pub fn pick_urls(&self, entries: &[PlaylistEntry]) -> HashMap<String, Pick> {
        let mut best: HashMap<String, (u32, Pick)> = HashMap::new();
        for entry in entries {
            let Some(url) = entry.url.as_deref() else {
                continue;
            };
            for rule in self.rules.iter().filter(|r| r.matches_source(&entry.directive)) {
                let sc = self.score(&entry.directive);
                let replace = best.get(&rule.name).is_none_or(|(prev, _)| sc > *prev);
                if replace {
                    best.insert(
                        rule.name.clone(),
                        (
                            sc,
                            Pick {
                                directive: entry.directive.clone(),
                                url: url.to_string(),
                            },
                        ),
                    );
                }
            }
        }
        best.into_iter().map(|(name, (_, pick))| (name, pick)).collect()
    }
}
