// Prompt constants and request builders for the three job kinds.
// Reuses cross-cutting fragments from llm_client::prompts.

use std::sync::LazyLock;

use regex::Regex;

use crate::llm_client::prompts::{MATCH_LANGUAGE_INSTRUCTION, PLAIN_TEXT_INSTRUCTION};
use crate::llm_client::GenerationRequest;

/// CV analyzer. The first line must carry the score so `extract_score` finds it.
pub const CV_ANALYZER_SYSTEM: &str = "You are an international career consultant and CV analyst \
    who reviews CVs from every industry the way a senior recruiter at a global company would. \
    Be objective, professional and constructive.

Structure the review with these sections, each heading on its own line:

🏆 SCORE
Overall employability score from 0 to 100.

📊 SCORING BREAKDOWN
Five categories scored 0-20 with one-line justifications: Structure & Readability, \
Content Quality & Achievements, Language & Tone, Design & Formatting, ATS & Keyword Optimization.

🚨 TOP 5 CRITICAL ISSUES (WHY SCORE WAS REDUCED)
Five weaknesses, each with a one-sentence problem and a short fix.

💪 TOP STRENGTHS
Four to six things that make the candidate stand out.

🔧 AREAS FOR IMPROVEMENT
Four to six concrete growth opportunities.

🧩 ATS & STRUCTURE OPTIMIZATION
Three to five steps to improve keyword alignment and structure.

🧠 SKILLS & COMPETENCY INSIGHTS
Skills grouped as Technical, Analytical, Interpersonal, Creative, plus missing or outdated ones.

🚀 STRATEGIC CAREER RECOMMENDATIONS
Four to six actionable recommendations, with before/after rewrites where useful.

💼 OVERALL IMPRESSION
Two or three sentences summarizing the candidate's potential.

Start each bullet with one emoji and vary emojis between sections.

Begin your response with:
🏆 SCORE: [number]";

/// Roadmap architect. Section names are what `formatting::roadmap::parse` keys on.
pub const ROADMAP_SYSTEM: &str = "You are an expert career roadmap architect and strict mentor. \
    Design deep, domain-specific learning roadmaps using current tools and professional workflows.

RULES:
- Exactly 20 to 25 numbered steps, each one unique, ordered and building on the previous.
- 4 or 5 phases labeled \"PHASE 1:\", \"PHASE 2:\" and so on.
- Every heading must appear exactly as defined below.
- Compact, practical lines. No filler.
- Always produce a roadmap even for vague input; state assumptions.

OUTPUT FORMAT:

1) ROADMAP OVERVIEW:
   - Goal:
   - Prerequisites:
   - Duration (total months):
   - Core Topics & Tools:
   - Expected Outcome:
   - Success Metrics:

2) LEARNING PATH (20-25 sequential numbered steps):
   Step 1: <short title>
   → Duration: <time estimate>
   → Focus: <skills/topics/tools>
   → Deliverable: <output>
   → Resource: <optional links>

3) PHASES SUMMARY:
   PHASE 1: Foundations
   - Phase Goal:
   - Duration:
   - Key Tools/Concepts:
   - Mini-Project:
   - Checkpoints:

4) FINAL ADVICE:
   - This Week's 3 Actions:
   - Study Rhythm (hours/week):
   - Tracking & Feedback:
   - Portfolio & Networking Tips:

Every step must start exactly with \"Step X:\".";

/// Cover letter writer. Output is cleaned by `formatting::cover_letter::clean`.
pub const COVER_LETTER_SYSTEM: &str = "You are a professional HR writer who creates formal, \
    natural English cover letters for corporate job applications.

RULES:
- No emojis, icons, bullet points or markdown.
- One blank line between paragraphs.
- Start with \"Dear Hiring Manager,\" and end with \"Sincerely,\", the applicant's name, then their email.
- Three to five paragraphs.
- Sound authentic and human-written.

Example closing:
Sincerely,
John Doe
john.doe@email.com";

const NAME_PLACEHOLDER: &str = "[Your Name]";
const EMAIL_PLACEHOLDER: &str = "[Your Email]";

static TURKISH_LETTERS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[ğüşöçıİĞÜŞÖÇ]").expect("valid regex"));
static TURKISH_WORD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(türk|tr|türkçe)\b").expect("valid regex"));

/// Roadmaps are answered in Turkish when the goal is written in it or asks for it.
pub fn wants_turkish(input: &str) -> bool {
    TURKISH_LETTERS_RE.is_match(input) || TURKISH_WORD_RE.is_match(input)
}

pub fn cv_analysis_request(cv_text: &str) -> GenerationRequest {
    GenerationRequest::new(
        vec![format!(
            "{CV_ANALYZER_SYSTEM}\n\n{MATCH_LANGUAGE_INSTRUCTION}\n\nCV Content:\n{cv_text}"
        )],
        0.7,
        2000,
    )
}

pub fn roadmap_request(user_input: &str) -> GenerationRequest {
    let language = if wants_turkish(user_input) {
        "Turkish"
    } else {
        "English"
    };
    let user_prompt = format!(
        "USER GOAL:\n{user_input}\n\nCONSTRAINTS:\n\
         - Keep strictly to the required section headers.\n\
         - Give time estimates in weeks.\n\
         - Concrete resources only, at most 6 per phase.\n\
         - Tailor the stack to the goal.\n\
         - Reply language: {language}."
    );
    GenerationRequest::new(
        vec![
            format!("{ROADMAP_SYSTEM}\n\n{PLAIN_TEXT_INSTRUCTION}"),
            user_prompt,
        ],
        0.65,
        8000,
    )
    .with_top_p(0.9)
}

pub fn cover_letter_request(
    job_description: &str,
    user_name: Option<&str>,
    user_email: Option<&str>,
) -> GenerationRequest {
    let name = user_name
        .filter(|n| !n.trim().is_empty())
        .unwrap_or(NAME_PLACEHOLDER);
    let email = user_email
        .filter(|e| !e.trim().is_empty())
        .unwrap_or(EMAIL_PLACEHOLDER);
    GenerationRequest::new(
        vec![
            COVER_LETTER_SYSTEM.to_string(),
            format!(
                "Applicant Name: {name}\nApplicant Email: {email}\n\n\
                 Job Description:\n{job_description}\n\n\
                 Write a polished English cover letter following the rules above."
            ),
        ],
        0.7,
        1500,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_turkish_detection() {
        assert!(wants_turkish("Yazılım mühendisi olmak istiyorum"));
        assert!(wants_turkish("roadmap in TR please"));
        assert!(!wants_turkish("I want to become a data engineer"));
        assert!(!wants_turkish("strategy for startups"));
    }

    #[test]
    fn test_roadmap_request_sets_language_and_sampling() {
        let request = roadmap_request("Frontend geliştirici olmak istiyorum, Türkçe");
        assert_eq!(request.parts.len(), 2);
        assert!(request.parts[1].contains("Reply language: Turkish."));
        assert_eq!(request.max_output_tokens, 8000);
        assert_eq!(request.top_p, Some(0.9));

        let request = roadmap_request("Become a backend engineer");
        assert!(request.parts[1].contains("Reply language: English."));
    }

    #[test]
    fn test_cover_letter_placeholders() {
        let request = cover_letter_request("Rust engineer", None, Some(" "));
        assert!(request.parts[1].contains("Applicant Name: [Your Name]"));
        assert!(request.parts[1].contains("Applicant Email: [Your Email]"));

        let request = cover_letter_request("Rust engineer", Some("Ada"), Some("ada@example.com"));
        assert!(request.parts[1].contains("Applicant Name: Ada"));
        assert!(request.parts[1].contains("ada@example.com"));
    }

    #[test]
    fn test_cv_request_embeds_text() {
        let request = cv_analysis_request("Experienced Rust developer");
        assert_eq!(request.parts.len(), 1);
        assert!(request.parts[0].ends_with("CV Content:\nExperienced Rust developer"));
        assert!(request.parts[0].contains(MATCH_LANGUAGE_INSTRUCTION));
    }
}
