//! CV ingestion boundary: PDF bytes to text, text to a raw candidate JSON object.

use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info};

use crate::errors::AppError;
use crate::llm_client::prompts::{fill, JSON_ONLY_SYSTEM};
use crate::llm_client::{parse_json_reply, LlmClient, LlmError};
use crate::models::candidate::ReportLang;
use crate::report::prompts::{EXTRACT_PROMPT_TEMPLATE, EXTRACT_SYSTEM};
use crate::report::schema::schema_example;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("could not read PDF: {0}")]
    Pdf(String),

    #[error("PDF contains no extractable text")]
    EmptyText,
}

impl From<ExtractError> for AppError {
    fn from(e: ExtractError) -> Self {
        AppError::Pdf(e.to_string())
    }
}

/// Pulls the text layer out of a PDF document.
pub fn extract_pdf_text(bytes: &[u8]) -> Result<String, ExtractError> {
    let text =
        pdf_extract::extract_text_from_mem(bytes).map_err(|e| ExtractError::Pdf(e.to_string()))?;
    if text.trim().is_empty() {
        return Err(ExtractError::EmptyText);
    }
    Ok(text)
}

pub fn build_extract_prompt(cv_text: &str, lang: ReportLang, benefits_block: &str) -> String {
    let schema = schema_example();
    fill(
        EXTRACT_PROMPT_TEMPLATE,
        &[
            ("schema", schema.as_str()),
            ("report_lang", lang.as_str()),
            ("benefits_block", benefits_block.trim()),
            ("cv_text", cv_text),
        ],
    )
}

/// Interprets the model's reply. Anything that is not a JSON object is a terminal
/// extraction failure for the request.
pub fn parse_extraction(reply: &str) -> Result<Value, AppError> {
    match parse_json_reply::<Value>(reply) {
        Ok(value @ Value::Object(_)) => Ok(value),
        Ok(other) => Err(AppError::Extraction(format!(
            "expected a JSON object, got {}",
            json_kind(&other)
        ))),
        Err(e) => Err(AppError::Extraction(e.to_string())),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Asks the LLM to map CV text onto the candidate schema.
pub async fn extract_candidate(
    llm: &LlmClient,
    cv_text: &str,
    lang: ReportLang,
    benefits_block: &str,
) -> Result<Value, AppError> {
    let prompt = build_extract_prompt(cv_text, lang, benefits_block);
    let system = format!("{EXTRACT_SYSTEM} {JSON_ONLY_SYSTEM}");

    info!(
        "Extracting candidate data ({} chars of CV text, lang {})",
        cv_text.len(),
        lang.as_str()
    );
    let profile = llm.extraction_profile();
    let reply = llm.call_text(&prompt, &system, profile).await.map_err(|e| match e {
        LlmError::Parse(e) => AppError::Extraction(e.to_string()),
        other => AppError::Llm(other.to_string()),
    })?;
    debug!("Extraction reply: {} chars", reply.len());

    parse_extraction(&reply)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_embeds_schema_and_inputs() {
        let prompt = build_extract_prompt("Jane Doe, engineer", ReportLang::En, "  VR R$ 800  ");
        assert!(prompt.contains("\"line_items\""));
        assert!(prompt.contains("Report language: EN"));
        assert!(prompt.contains("VR R$ 800"));
        assert!(prompt.ends_with("Jane Doe, engineer"));
        assert!(!prompt.contains("{schema}"));
    }

    #[test]
    fn test_benefits_text_cannot_splice_cv_twice() {
        let prompt = build_extract_prompt("CV BODY", ReportLang::Pt, "see {cv_text} and {schema}");
        assert_eq!(prompt.matches("CV BODY").count(), 1);
        assert!(prompt.contains("see {cv_text} and {schema}"));
    }

    #[test]
    fn test_parse_extraction_accepts_fenced_object() {
        let value = parse_extraction("```json\n{\"cdd_name\": \"Ana\"}\n```").unwrap();
        assert_eq!(value["cdd_name"], "Ana");
    }

    #[test]
    fn test_parse_extraction_rejects_non_object() {
        let err = parse_extraction("[1, 2]").unwrap_err();
        assert!(matches!(err, AppError::Extraction(msg) if msg.contains("array")));
    }

    #[test]
    fn test_parse_extraction_rejects_prose() {
        let err = parse_extraction("Sorry, I could not read this CV.").unwrap_err();
        assert!(matches!(err, AppError::Extraction(_)));
    }

    #[test]
    fn test_garbage_pdf_is_pdf_error() {
        let err = extract_pdf_text(b"not a pdf").unwrap_err();
        assert!(matches!(err, ExtractError::Pdf(_)));
        assert!(matches!(AppError::from(err), AppError::Pdf(_)));
    }
}
