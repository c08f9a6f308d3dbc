//! Structured text parsing of pasted roadmap documents.
//!
//! The input is whatever the user pasted: a numbered "cahier des charges"
//! with headings and bullet bodies, a markdown outline, or just a flat list
//! of task lines. A detection pass decides which shape we are looking at,
//! then the matching extraction pass produces an ordered list of
//! [`ParsedMission`] records. The parser never fails: garbage text degrades
//! to a short or empty list, not an error.

use crate::import::duration;
use crate::models::ParsedMission;
use regex::Regex;
use std::sync::OnceLock;

/// A heading candidate longer than this is body text, not a title. Keeps a
/// long descriptive sentence that happens to start with "1." from opening a
/// bogus mission.
const MAX_TITLE_LEN: usize = 150;

/// Numbered headings: `4.1 Setup`, `1. Launch`, `2) Billing`. A bare number
/// ("2 jours") does not qualify; it needs a dotted part or trailing `.`/`)`.
fn numbered_heading() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\s*(?:\d+(?:\.\d+)+[.)]?|\d+[.)])\s+(\S.*)$").unwrap())
}

/// Markdown-style headings: `# Setup` through `###### Setup`.
fn markdown_heading() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\s*#{1,6}\s+(\S.*)$").unwrap())
}

/// Extract the cleaned title from a heading line, if the line is one.
///
/// Applies the length guard: over-long candidates are not titles even when
/// the pattern matches.
fn heading_title(line: &str) -> Option<String> {
    if line.trim().chars().count() > MAX_TITLE_LEN {
        return None;
    }
    for re in [numbered_heading(), markdown_heading()] {
        if let Some(caps) = re.captures(line) {
            return Some(caps[1].trim().to_string());
        }
    }
    None
}

/// Strip a leading bullet marker (`-`, `•`, `*`) and surrounding whitespace.
fn strip_bullet(line: &str) -> &str {
    let trimmed = line.trim();
    trimmed
        .strip_prefix(['-', '•', '*'])
        .map(str::trim_start)
        .unwrap_or(trimmed)
}

/// Clean buffered body lines into a description: bullet markers and leading
/// indentation stripped per line, blank lines dropped, rejoined with `\n`.
fn clean_body(lines: &[&str]) -> String {
    lines
        .iter()
        .map(|line| strip_bullet(line))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Parse pasted roadmap text into an ordered list of missions.
///
/// Detection pass first: if any line looks like a numbered or markdown
/// heading the text is treated as structured, otherwise every non-empty
/// line becomes its own mission (flat mode).
pub fn parse(raw: &str) -> Vec<ParsedMission> {
    let lines: Vec<&str> = raw.lines().collect();

    let structured = lines
        .iter()
        .any(|line| !line.trim().is_empty() && heading_title(line).is_some());

    if structured {
        parse_structured(&lines)
    } else {
        parse_flat(&lines)
    }
}

/// Flat mode: one mission per non-empty line, order preserved.
fn parse_flat(lines: &[&str]) -> Vec<ParsedMission> {
    lines
        .iter()
        .filter(|line| !line.trim().is_empty())
        .map(|line| strip_bullet(line))
        .filter(|title| !title.is_empty())
        .map(|title| ParsedMission {
            title: title.to_string(),
            description: String::new(),
            estimated_duration: None,
        })
        .collect()
}

/// Structured mode: headings open missions, everything between two headings
/// is the body of the mission above it. Lines before the first heading are
/// dropped since no mission is open yet.
fn parse_structured(lines: &[&str]) -> Vec<ParsedMission> {
    let mut missions = Vec::new();
    let mut current: Option<(String, Vec<&str>)> = None;

    for line in lines {
        if let Some(title) = heading_title(line) {
            if let Some((prev_title, body)) = current.take() {
                missions.push(flush(prev_title, &body));
            }
            current = Some((title, Vec::new()));
        } else if let Some((_, body)) = current.as_mut() {
            body.push(line);
        }
    }

    if let Some((title, body)) = current {
        missions.push(flush(title, &body));
    }

    missions
}

/// Turn a buffered title + body into a mission. The duration is extracted
/// from the full raw body text, not just the title.
fn flush(title: String, body: &[&str]) -> ParsedMission {
    let raw_body = body.join("\n");
    ParsedMission {
        title,
        description: clean_body(body),
        estimated_duration: duration::extract(&raw_body),
    }
}
