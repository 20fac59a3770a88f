//! Roadmap text → display structure.
//!
//! The generator is prompted for four fixed sections (overview, numbered
//! steps, phase summary, final advice). Models drift, so parsing is lenient:
//! anything missing falls back to an empty value or the default advice.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

pub const DEFAULT_FINAL_ADVICE: &str = "Good luck!";

static TRAILING_WS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)[ \t]+$").expect("valid regex"));
static BLANK_RUN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n{3,}").expect("valid regex"));

static OVERVIEW_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)ROADMAP OVERVIEW:").expect("valid regex"));
static FINAL_ADVICE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)FINAL ADVICE:").expect("valid regex"));
static STEP_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)Step[ \t]*\d+:").expect("valid regex"));
/// Start of any top-level section, optionally numbered like `2) LEARNING PATH`.
static SECTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?im)^[ \t]*(?:\d+\)[ \t]*)?(?:ROADMAP OVERVIEW:|LEARNING PATH\b|PHASES SUMMARY\b|PHASE[ \t]*\d+:|FINAL ADVICE:)",
    )
    .expect("valid regex")
});
static TITLE_LEAD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[→\-–\s]+").expect("valid regex"));

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoadmapStep {
    pub title: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoadmapView {
    pub overview: String,
    pub steps: Vec<RoadmapStep>,
    pub final_advice: String,
}

/// Cleans raw generator output before it is stored.
pub fn normalize(raw: &str) -> String {
    let text = raw.replace('\r', "");
    let text = TRAILING_WS_RE.replace_all(&text, "");
    let text = BLANK_RUN_RE.replace_all(&text, "\n\n");
    text.trim().to_string()
}

/// Earliest section or step boundary strictly after `from`.
fn next_boundary(text: &str, from: usize) -> usize {
    let section = SECTION_RE
        .find_iter(text)
        .map(|m| m.start())
        .find(|&start| start >= from);
    let step = STEP_RE
        .find_iter(text)
        .map(|m| m.start())
        .find(|&start| start >= from);
    [section, step]
        .into_iter()
        .flatten()
        .min()
        .unwrap_or(text.len())
}

pub fn parse(text: &str) -> RoadmapView {
    let overview = OVERVIEW_RE
        .find(text)
        .map(|m| text[m.end()..next_boundary(text, m.end())].trim().to_string())
        .unwrap_or_default();

    let step_matches: Vec<_> = STEP_RE.find_iter(text).collect();
    let steps = step_matches
        .iter()
        .map(|m| {
            let end = next_boundary(text, m.end());
            let body = text[m.end()..end].trim();
            let (title_line, rest) = body.split_once('\n').unwrap_or((body, ""));
            let title = TITLE_LEAD_RE
                .replace(title_line, "")
                .replace(['*', '_'], "")
                .trim()
                .to_string();
            RoadmapStep {
                title,
                content: rest.trim().to_string(),
            }
        })
        .collect();

    let final_advice = FINAL_ADVICE_RE
        .find(text)
        .map(|m| text[m.end()..].trim().to_string())
        .filter(|advice| !advice.is_empty())
        .unwrap_or_else(|| DEFAULT_FINAL_ADVICE.to_string());

    RoadmapView {
        overview,
        steps,
        final_advice,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "1) ROADMAP OVERVIEW:
   - Goal: Become a data engineer
   - Duration (total months): 6

2) LEARNING PATH (20 sequential numbered steps):
   Step 1: **SQL fundamentals**
   → Duration: 2 weeks
   → Focus: joins, window functions

   Step 2: → Python for data
   → Duration: 3 weeks

3) PHASES SUMMARY:
   PHASE 1: Foundations
   - Phase Goal: basics

4) FINAL ADVICE:
   - This Week's 3 Actions: install Postgres";

    #[test]
    fn test_parse_full_roadmap() {
        let view = parse(SAMPLE);
        assert!(view.overview.starts_with("- Goal: Become a data engineer"));
        assert!(!view.overview.contains("LEARNING PATH"));

        assert_eq!(view.steps.len(), 2);
        assert_eq!(view.steps[0].title, "SQL fundamentals");
        assert!(view.steps[0].content.contains("window functions"));
        assert_eq!(view.steps[1].title, "Python for data");
        assert!(!view.steps[1].content.contains("PHASE 1"));

        assert!(view.final_advice.contains("install Postgres"));
    }

    #[test]
    fn test_parse_empty_text_uses_defaults() {
        let view = parse("");
        assert_eq!(view.overview, "");
        assert!(view.steps.is_empty());
        assert_eq!(view.final_advice, DEFAULT_FINAL_ADVICE);
    }

    #[test]
    fn test_parse_unstructured_text_uses_defaults() {
        let view = parse("Sorry, I cannot help with that.");
        assert_eq!(view.overview, "");
        assert!(view.steps.is_empty());
        assert_eq!(view.final_advice, "Good luck!");
    }

    #[test]
    fn test_empty_final_advice_falls_back() {
        let view = parse("Step 1: Learn\nFINAL ADVICE:   \n");
        assert_eq!(view.final_advice, "Good luck!");
        assert_eq!(view.steps.len(), 1);
        assert_eq!(view.steps[0].title, "Learn");
    }

    #[test]
    fn test_normalize_cleans_whitespace() {
        let raw = "\r\nLine one   \r\n\r\n\r\n\r\nLine two\t\n";
        assert_eq!(normalize(raw), "Line one\n\nLine two");
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let once = normalize(SAMPLE);
        assert_eq!(normalize(&once), once);
    }
}
