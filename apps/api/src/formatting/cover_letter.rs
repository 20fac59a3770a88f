/// Strips markdown emphasis and heading marks and puts every non-empty line
/// in its own paragraph.
pub fn clean(raw: &str) -> String {
    let stripped: String = raw
        .chars()
        .filter(|c| !matches!(c, '*' | '#' | '\r'))
        .collect();

    stripped
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_strips_markdown_and_splits_paragraphs() {
        let raw = "## Dear Hiring Manager,\r\n**I am excited** to apply.\nI bring five years of Rust.\n\n\nSincerely,\nAda";
        assert_eq!(
            clean(raw),
            "Dear Hiring Manager,\n\nI am excited to apply.\n\nI bring five years of Rust.\n\nSincerely,\n\nAda"
        );
    }

    #[test]
    fn test_clean_is_idempotent() {
        let once = clean("# Title\n*one*\n\n\ntwo  \n");
        assert_eq!(clean(&once), once);
    }

    #[test]
    fn test_clean_empty() {
        assert_eq!(clean(""), "");
        assert_eq!(clean("***\n##"), "");
    }
}
