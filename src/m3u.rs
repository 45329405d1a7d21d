use once_cell::sync::Lazy;
use regex::Regex;

pub const HEADER: &str = "#EXTM3U";
pub const DIRECTIVE: &str = "#EXTINF";

static BRACKETS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\[\]\(\),]+").expect("static regex"));
static QUALITY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(uhd|4k|fhd|hd|sd)\b").expect("static regex"));
static PUNCT: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\w\s]+").expect("static regex"));
static SPACES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("static regex"));

/// A directive line and the stream URL that followed it, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaylistEntry {
    pub directive: String,
    pub url: Option<String>,
}

impl PlaylistEntry {
    pub fn display_name(&self) -> &str {
        display_name(&self.directive)
    }
}

pub fn is_directive(line: &str) -> bool {
    line.trim_start().starts_with(DIRECTIVE)
}

/// A line that can serve as a stream URL: non-blank and not a comment.
pub fn is_url_line(line: &str) -> bool {
    let t = line.trim();
    !t.is_empty() && !t.starts_with('#')
}

/// Pairs each directive with the line right after it when that line is a
/// URL. If it is not, the line is examined again on the next step, so a
/// directive directly following another directive still starts its own entry.
pub fn parse_entries(text: &str) -> Vec<PlaylistEntry> {
    let lines: Vec<&str> = text.lines().collect();
    let mut out = Vec::new();
    let mut i = 0;
    while i < lines.len() {
        let line = lines[i];
        if !is_directive(line) {
            i += 1;
            continue;
        }
        let url = lines
            .get(i + 1)
            .filter(|next| is_url_line(next))
            .map(|next| next.trim().to_string());
        i += if url.is_some() { 2 } else { 1 };
        out.push(PlaylistEntry {
            directive: line.trim_end().to_string(),
            url,
        });
    }
    out
}

/// Text after the first comma of a directive; the whole line when there is none.
pub fn display_name(directive: &str) -> &str {
    match directive.split_once(',') {
        Some((_, name)) => name.trim(),
        None => directive,
    }
}

/// Lowercase, drop quality tags and punctuation, collapse whitespace.
pub fn normalize_name(name: &str) -> String {
    let n = name.to_lowercase();
    let n = BRACKETS.replace_all(&n, " ");
    let n = QUALITY.replace_all(&n, " ");
    let n = PUNCT.replace_all(&n, " ");
    SPACES.replace_all(&n, " ").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directive_without_url_keeps_next_directive() {
        let text = "#EXTM3U\n#EXTINF:-1,A\n#EXTINF:-1,B\nhttp://b\n#EXTINF:-1,C\n\n";
        let entries = parse_entries(text);
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].url, None);
        assert_eq!(entries[1].display_name(), "B");
        assert_eq!(entries[1].url.as_deref(), Some("http://b"));
        assert_eq!(entries[2].url, None);
    }

    #[test]
    fn comment_line_is_not_a_url() {
        let entries = parse_entries("#EXTINF:-1,A\n#EXTVLCOPT:http-referrer=x\nhttp://a\n");
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].url, None);
    }

    #[test]
    fn display_name_after_first_comma() {
        assert_eq!(
            display_name("#EXTINF:-1 tvg-name=\"x\", Sky Sports, Premier League HD"),
            "Sky Sports, Premier League HD"
        );
        assert_eq!(display_name("#EXTINF:-1"), "#EXTINF:-1");
    }

    #[test]
    fn normalization_strips_quality_and_punctuation() {
        assert_eq!(
            normalize_name("  Sky Sports [Premier-League] FHD "),
            "sky sports premier league"
        );
        assert_eq!(normalize_name("TNT Sports 1 (UK) 4K"), "tnt sports 1 uk");
        assert_eq!(normalize_name("HDTV One"), "hdtv one");
    }
}
