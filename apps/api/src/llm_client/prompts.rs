// Shared prompt fragments. Each service that needs LLM calls defines its own
// prompts.rs alongside it and composes these where they apply.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

/// System prompt fragment that enforces JSON-only output.
pub const JSON_ONLY_SYSTEM: &str = "You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";

/// System prompt fragment that enforces a bare-text answer.
pub const PLAIN_TEXT_SYSTEM: &str = "Respond with the requested text only. \
    Do NOT add quotes, notes, explanations, alternatives or questions.";

static SLOT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{([a-z_]+)\}").unwrap());

/// Fills `{name}` slots in one pass. Inserted values are never rescanned, and
/// slots without a value are left as written.
pub fn fill(template: &str, values: &[(&str, &str)]) -> String {
    SLOT_RE
        .replace_all(template, |caps: &Captures| {
            let name = &caps[1];
            values
                .iter()
                .find(|(key, _)| *key == name)
                .map_or_else(|| caps[0].to_string(), |(_, value)| (*value).to_string())
        })
        .into_owned()
}
