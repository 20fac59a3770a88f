// Shared prompt fragments.
// Each feature that calls the generator defines its own prompts.rs alongside it.
// This file contains cross-cutting instructions appended to those prompts.

/// Reply in the language the user wrote in.
pub const MATCH_LANGUAGE_INSTRUCTION: &str = "\
    Detect the language of the user's input and reply in that same language.";

/// Forbid code fences and structured output wrappers.
pub const PLAIN_TEXT_INSTRUCTION: &str = "\
    Use plain text only. Do NOT wrap the answer in markdown code fences. \
    Do NOT return JSON.";
