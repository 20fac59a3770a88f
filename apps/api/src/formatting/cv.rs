//! CV analysis text → score and sectioned report.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

static SCORE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)SCORE:\s*(\d+)").expect("valid regex"));
static BULLET_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[-•]\s+").expect("valid regex"));
static STAR_BULLET_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^(\s*)\*\s+").expect("valid regex"));
static RULE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[-=_]{3,}$").expect("valid regex"));

/// Section headings the analyzer prompt asks for, longest prefix first
/// where two share a stem.
const HEADINGS: [&str; 9] = [
    "SCORING BREAKDOWN",
    "SCORE",
    "TOP 5 CRITICAL ISSUES",
    "TOP STRENGTHS",
    "AREAS FOR IMPROVEMENT",
    "ATS & STRUCTURE OPTIMIZATION",
    "SKILLS & COMPETENC",
    "STRATEGIC",
    "OVERALL IMPRESSION",
];

const MAX_HEADING_LINE: usize = 80;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportSection {
    pub heading: Option<String>,
    pub lines: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CvReport {
    pub score: Option<i32>,
    pub sections: Vec<ReportSection>,
}

/// First `SCORE: <n>` in the text, clamped to 0..=100.
pub fn extract_score(text: &str) -> Option<i32> {
    let digits = SCORE_RE.captures(text)?.get(1)?.as_str();
    let score = digits.parse::<u64>().unwrap_or(u64::MAX).min(100);
    Some(score as i32)
}

/// Matches a heading line like `🏆 SCORE: 78` or `💪 TOP STRENGTHS`.
/// Returns the heading and whatever text follows it on the line.
fn match_heading(line: &str) -> Option<(String, String)> {
    if line.chars().count() > MAX_HEADING_LINE {
        return None;
    }
    let key = line.trim_start_matches(|c: char| !c.is_alphanumeric());
    let upper = key.to_uppercase();
    HEADINGS.iter().find_map(|heading| {
        if !upper.starts_with(heading) {
            return None;
        }
        // Keep the full heading as written, up to any colon.
        let (title, rest) = key.split_once(':').unwrap_or((key, ""));
        if title.chars().any(char::is_lowercase) {
            return None;
        }
        Some((title.trim().to_string(), rest.trim().to_string()))
    })
}

pub fn format_report(text: &str) -> CvReport {
    let cleaned = text.replace("**", "");
    let cleaned = STAR_BULLET_RE
        .replace_all(&cleaned, "${1}• ")
        .replace(['*', '_'], "");
    let mut sections: Vec<ReportSection> = Vec::new();

    for raw_line in cleaned.lines() {
        let line = raw_line.trim();
        if line.is_empty() || RULE_RE.is_match(line) {
            continue;
        }

        if let Some((heading, rest)) = match_heading(line) {
            let mut lines = Vec::new();
            if !rest.is_empty() {
                lines.push(rest);
            }
            sections.push(ReportSection {
                heading: Some(heading),
                lines,
            });
            continue;
        }

        let line = BULLET_RE.replace(line, "• ").into_owned();
        match sections.last_mut() {
            Some(section) => section.lines.push(line),
            None => sections.push(ReportSection {
                heading: None,
                lines: vec![line],
            }),
        }
    }

    CvReport {
        score: extract_score(text),
        sections,
    }
}
