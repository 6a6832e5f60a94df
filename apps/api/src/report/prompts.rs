// LLM prompt constants for CV extraction and report translation.
// Reuses cross-cutting fragments from llm_client::prompts where they fit.

/// System prompt for CV extraction.
pub const EXTRACT_SYSTEM: &str = "You are a system that converts resumes into structured JSON \
    for automation. You must follow exactly the structure of the provided schema. \
    All keys must be present and correctly named. If a value is missing, use an empty string \
    or an empty list. Do not omit, rename, or add any keys.";

/// Extraction prompt template.
/// Replace `{schema}`, `{report_lang}`, `{benefits_block}` and `{cv_text}` before sending.
pub const EXTRACT_PROMPT_TEMPLATE: &str = r#"Extract ALL possible information from the following CV content and map it into the provided schema.
Your response must be a single JSON object with exactly the same keys and structure as the schema below.
If you cannot fill a value, leave it as an empty string or an empty list.

Rules:
- One entry in "line_items" per employer; list every position held there in "job_posts".
- Dates as they appear in the CV (month and year when available). Use "present" for a current position.
- "language_level" is the proficiency as stated in the CV (e.g. "basic", "fluent", "native").
- "job_tasks" holds one responsibility or achievement per entry.
- Write free-text fields in the report language.

Schema example:
{schema}

Report language: {report_lang}

Compensation/benefits block:
{benefits_block}

CV Content:
{cv_text}"#;

/// Translation prompt template. Replace `{language}` and `{text}` before sending.
pub const TRANSLATE_PROMPT_TEMPLATE: &str = "Translate the text below into {language}. \
    Keep proper nouns, acronyms, numbers and dates as they are. \
    If the text is already in {language}, return it unchanged.\n\n\
    Text:\n{text}";
