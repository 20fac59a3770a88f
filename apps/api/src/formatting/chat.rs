use std::sync::LazyLock;

use regex::Regex;

const MARKERS: [&str; 5] = ["✅", "🔹", "➡️", "💡", "🔸"];

static SPLIT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"✅|🔹|➡\x{FE0F}?|💡|➕|🔸|\n").expect("valid regex")
});
static HEADING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z\s]+:?\s*$|^[A-Z\s]+:").expect("valid regex"));

/// Rewrites a career coach reply into one marked line per sentence.
///
/// ALL CAPS headings pass through unmarked; every other fragment gets the
/// next marker in the cycle. Applying it twice yields the same text.
pub fn format_career_reply(raw: &str) -> String {
    let mut out = Vec::new();
    let mut marker = 0;

    for fragment in SPLIT_RE.split(raw) {
        let line = fragment.trim();
        if line.is_empty() {
            continue;
        }
        if HEADING_RE.is_match(line) {
            out.push(line.to_string());
        } else {
            out.push(format!("{} {}", MARKERS[marker % MARKERS.len()], line));
            marker += 1;
        }
    }

    out.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_markers_cycle_and_headings_pass_through() {
        let raw = "SKILLS TO LEARN:\nLearn SQL\nPractice Python\nBuild dashboards\nRead docs\nShip a project\nAsk for feedback";
        let formatted = format_career_reply(raw);
        let lines: Vec<&str> = formatted.lines().collect();
        assert_eq!(lines[0], "SKILLS TO LEARN:");
        assert_eq!(lines[1], "✅ Learn SQL");
        assert_eq!(lines[2], "🔹 Practice Python");
        assert_eq!(lines[3], "➡️ Build dashboards");
        assert_eq!(lines[4], "💡 Read docs");
        assert_eq!(lines[5], "🔸 Ship a project");
        assert_eq!(lines[6], "✅ Ask for feedback");
    }

    #[test]
    fn test_inline_markers_split_into_lines() {
        let formatted = format_career_reply("✅ Learn SQL ➕ Practice daily 🔹 Apply");
        assert_eq!(formatted, "✅ Learn SQL\n🔹 Practice daily\n➡️ Apply");
    }

    #[test]
    fn test_formatting_is_idempotent() {
        let raw = "JOB SEARCH:\nUpdate LinkedIn\n\n  Ask for referrals  \nNETWORK: meet people";
        let once = format_career_reply(raw);
        assert_eq!(format_career_reply(&once), once);
    }

    #[test]
    fn test_empty_reply_stays_empty() {
        assert_eq!(format_career_reply(""), "");
        assert_eq!(format_career_reply("\n \n"), "");
    }
}
