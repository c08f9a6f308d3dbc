//! Duration extraction from free-text mission bodies.
//!
//! Roadmap authors write estimates in many shapes: "Estimation: 3h",
//! "durée : 2 jours", or just "45min" somewhere in a bullet. This module
//! pulls the first recognizable estimate out of a text block and normalizes
//! it to a compact token ("3h", "2j", "45min").

use regex::Regex;
use std::sync::OnceLock;

/// Labeled forms: `estimation: 3h`, `durée: 2 jours`, `temps: 45 min`.
fn labeled_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)(?:estimation|dur[ée]e|temps)\s*:?\s*(\d+)\s*(heures?|h|jours?|j|minutes?|min)\b",
        )
        .unwrap()
    })
}

/// Bare quantity forms, checked after the labeled forms: `3h`, `2 jours`,
/// `45min`. One regex per unit family, tried in order.
fn bare_patterns() -> &'static [(Regex, &'static str)] {
    static RES: OnceLock<Vec<(Regex, &'static str)>> = OnceLock::new();
    RES.get_or_init(|| {
        vec![
            (Regex::new(r"(?i)(\d+)\s*(?:heures?|h)\b").unwrap(), "h"),
            (Regex::new(r"(?i)(\d+)\s*(?:jours?|j)\b").unwrap(), "j"),
            (Regex::new(r"(?i)(\d+)\s*(?:minutes?|min)\b").unwrap(), "min"),
        ]
    })
}

/// Collapse a captured unit word to its compact form.
fn normalize_unit(unit: &str) -> &'static str {
    let unit = unit.to_lowercase();
    if unit.starts_with("min") {
        "min"
    } else if unit.starts_with('h') {
        "h"
    } else {
        "j"
    }
}

/// Extract a coarse time estimate from a free-text block.
///
/// Ordered pattern matching, first match wins: explicit labeled forms
/// ("estimation:", "durée:", "temps:") take precedence over bare quantities.
/// Returns a normalized token such as `"3h"`, `"2j"` or `"45min"`, or `None`
/// when no pattern matches. Pure and idempotent.
pub fn extract(text: &str) -> Option<String> {
    if let Some(caps) = labeled_pattern().captures(text) {
        let number = &caps[1];
        let unit = normalize_unit(&caps[2]);
        return Some(format!("{}{}", number, unit));
    }

    for (re, unit) in bare_patterns() {
        if let Some(caps) = re.captures(text) {
            return Some(format!("{}{}", &caps[1], unit));
        }
    }

    None
}
