//! Selective translation. Localizes the string leaves of a JSON tree while keeping
//! keys, structure and a configured set of fields untouched.
//!
//! The external translator is unreliable: it may answer with nothing, echo the
//! input, ask for clarification or drift into Spanish. Every result passes through
//! [`TranslationGuard`]; anything it rejects keeps the original text.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, warn};

use crate::llm_client::prompts::{fill, PLAIN_TEXT_SYSTEM};
use crate::llm_client::{CallProfile, LlmClient};
use crate::models::candidate::ReportLang;
use crate::report::prompts::TRANSLATE_PROMPT_TEMPLATE;

#[derive(Debug, Error)]
pub enum TranslateError {
    #[error("translation backend failed: {0}")]
    Backend(String),
}

/// A text translator constrained to the two report languages.
///
/// Carried in `AppState` as `Arc<dyn Translator>`; tests inject fakes.
#[async_trait]
pub trait Translator: Send + Sync {
    async fn translate(&self, text: &str, target: ReportLang) -> Result<String, TranslateError>;
}

/// Translator backed by the shared LLM client.
pub struct LlmTranslator {
    llm: LlmClient,
}

impl LlmTranslator {
    pub fn new(llm: LlmClient) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl Translator for LlmTranslator {
    async fn translate(&self, text: &str, target: ReportLang) -> Result<String, TranslateError> {
        let prompt = fill(
            TRANSLATE_PROMPT_TEMPLATE,
            &[("language", target.english_name()), ("text", text)],
        );
        self.llm
            .call_text(&prompt, PLAIN_TEXT_SYSTEM, CallProfile::TRANSLATION)
            .await
            .map_err(|e| TranslateError::Backend(e.to_string()))
    }
}

/// Why a translation result was discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    Empty,
    Unchanged,
    Refusal,
    WrongLanguage,
}

/// Acceptance policy for translation results.
#[derive(Debug, Clone)]
pub struct TranslationGuard {
    /// Lowercase phrases that signal a refusal or a clarification request.
    pub refusal_markers: Vec<&'static str>,
    /// Lowercase whole words that only occur in Spanish among PT/EN/ES.
    pub foreign_words: Vec<&'static str>,
    /// Lowercase character sequences that only occur in Spanish among PT/EN/ES.
    pub foreign_fragments: Vec<&'static str>,
}

impl Default for TranslationGuard {
    fn default() -> Self {
        Self {
            refusal_markers: vec![
                "i'm sorry",
                "i am sorry",
                "i cannot",
                "i can't",
                "as an ai",
                "could you clarify",
                "could you please provide",
                "please provide the text",
                "não posso",
                "nao posso",
                "desculpe",
                "poderia esclarecer",
                "por favor, forneça",
                "não entendi",
            ],
            foreign_words: vec![
                "el", "los", "las", "del", "y", "pero", "muy", "usted", "también", "hizo",
                "ellos", "nosotros",
            ],
            foreign_fragments: vec!["ñ", "¿", "¡", "ción", "ciones"],
        }
    }
}

fn words(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_string)
        .collect()
}

impl TranslationGuard {
    /// Accepts `translated` as a replacement for `original`, or says why not.
    /// Markers already present in the original never count against the translation.
    pub fn check(&self, original: &str, translated: &str) -> Result<(), Rejection> {
        let translated = translated.trim();
        if translated.is_empty() {
            return Err(Rejection::Empty);
        }
        if translated == original.trim() {
            return Err(Rejection::Unchanged);
        }

        let original_lower = original.to_lowercase();
        let translated_lower = translated.to_lowercase();

        let introduced = |marker: &&str| {
            translated_lower.contains(*marker) && !original_lower.contains(*marker)
        };
        if self.refusal_markers.iter().any(introduced) {
            return Err(Rejection::Refusal);
        }
        if self.foreign_fragments.iter().any(introduced) {
            return Err(Rejection::WrongLanguage);
        }

        let original_words = words(&original_lower);
        let translated_words = words(&translated_lower);
        if self
            .foreign_words
            .iter()
            .any(|w| translated_words.contains(*w) && !original_words.contains(*w))
        {
            return Err(Rejection::WrongLanguage);
        }

        Ok(())
    }
}

/// Keys whose string values are never translated: identifiers, proper nouns,
/// dates and values that are already localized.
pub fn default_exempt_keys() -> Vec<String> {
    [
        "cdd_name",
        "cdd_email",
        "cdd_cel",
        "cdd_age",
        "cdd_city",
        "cdd_state",
        "company",
        "cdd_company",
        "last_company",
        "job_bond",
        "start_date",
        "end_date",
        "company_start_date",
        "company_end_date",
        "academic_institution",
        "academic_conclusion",
        "language_level",
        "level_description",
        "report_lang",
        "report_date",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn should_translate(key: Option<&str>, text: &str, exempt: &HashSet<String>) -> bool {
    if key.is_some_and(|k| exempt.contains(k)) {
        return false;
    }
    text.chars().any(char::is_alphabetic)
}

fn collect_leaves(
    value: &Value,
    key: Option<&str>,
    exempt: &HashSet<String>,
    seen: &mut HashSet<String>,
    out: &mut Vec<String>,
) {
    match value {
        Value::String(s) => {
            if should_translate(key, s, exempt) && seen.insert(s.clone()) {
                out.push(s.clone());
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_leaves(item, key, exempt, seen, out);
            }
        }
        Value::Object(map) => {
            for (k, v) in map {
                collect_leaves(v, Some(k.as_str()), exempt, seen, out);
            }
        }
        _ => {}
    }
}

fn rewrite(
    value: &Value,
    key: Option<&str>,
    exempt: &HashSet<String>,
    accepted: &HashMap<String, String>,
) -> Value {
    match value {
        Value::String(s) if should_translate(key, s, exempt) => {
            Value::String(accepted.get(s).cloned().unwrap_or_else(|| s.clone()))
        }
        Value::Array(items) => Value::Array(
            items
                .iter()
                .map(|item| rewrite(item, key, exempt, accepted))
                .collect(),
        ),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), rewrite(v, Some(k.as_str()), exempt, accepted)))
                .collect::<Map<_, _>>(),
        ),
        other => other.clone(),
    }
}

/// Translates every eligible string leaf of `value` into `target`.
///
/// A leaf is eligible when its containing key (for list elements, the list's key)
/// is not in `exempt` and it has at least one letter. Identical leaves are
/// translated once. Failures and rejected results keep the original text.
pub async fn translate_tree(
    value: &Value,
    target: ReportLang,
    exempt: &HashSet<String>,
    translator: &dyn Translator,
    guard: &TranslationGuard,
) -> Value {
    let mut leaves = Vec::new();
    collect_leaves(value, None, exempt, &mut HashSet::new(), &mut leaves);

    let mut accepted = HashMap::with_capacity(leaves.len());
    for original in leaves {
        match translator.translate(&original, target).await {
            Ok(translated) => match guard.check(&original, &translated) {
                Ok(()) => {
                    accepted.insert(original, translated.trim().to_string());
                }
                Err(reason) => debug!("Keeping original text, translation rejected: {reason:?}"),
            },
            Err(e) => warn!("Translation failed, keeping original text: {e}"),
        }
    }

    debug!(
        "Translated {} leaves into {}",
        accepted.len(),
        target.as_str()
    );
    rewrite(value, None, exempt, &accepted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Returns a canned reply for every call and counts the calls.
    struct FakeTranslator {
        reply: fn(&str) -> Result<String, TranslateError>,
        calls: AtomicUsize,
    }

    impl FakeTranslator {
        fn new(reply: fn(&str) -> Result<String, TranslateError>) -> Self {
            Self {
                reply,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl Translator for FakeTranslator {
        async fn translate(
            &self,
            text: &str,
            _target: ReportLang,
        ) -> Result<String, TranslateError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            (self.reply)(text)
        }
    }

    fn exempt() -> HashSet<String> {
        default_exempt_keys().into_iter().collect()
    }

    async fn translate_en(input: &Value, fake: &FakeTranslator) -> Value {
        translate_tree(input, ReportLang::En, &exempt(), fake, &TranslationGuard::default()).await
    }

    fn sample() -> Value {
        json!({
            "cdd_name": "joão silva",
            "abt_background": "engenheiro de dados",
            "line_items": [{
                "cdd_company": "Padaria Central",
                "company_desc": "rede de padarias",
                "job_posts": [{
                    "job_title": "gerente",
                    "start_date": "01/2020",
                    "end_date": "PRESENT",
                    "job_tasks": [{"task": "gestão de equipe"}, {"task": "gestão de equipe"}]
                }]
            }],
            "job_count": 3
        })
    }

    #[tokio::test]
    async fn test_translates_only_non_exempt_leaves() {
        let fake = FakeTranslator::new(|t| Ok(format!("[en] {t}")));
        let out = translate_tree(
            &sample(),
            ReportLang::En,
            &exempt(),
            &fake,
            &TranslationGuard::default(),
        )
        .await;

        assert_eq!(out["cdd_name"], "joão silva");
        assert_eq!(out["abt_background"], "[en] engenheiro de dados");
        let item = &out["line_items"][0];
        assert_eq!(item["cdd_company"], "Padaria Central");
        assert_eq!(item["company_desc"], "[en] rede de padarias");
        assert_eq!(item["job_posts"][0]["start_date"], "01/2020");
        assert_eq!(item["job_posts"][0]["end_date"], "PRESENT");
        assert_eq!(item["job_posts"][0]["job_tasks"][1]["task"], "[en] gestão de equipe");
        assert_eq!(out["job_count"], 3);
    }

    #[tokio::test]
    async fn test_identical_leaves_translated_once() {
        let fake = FakeTranslator::new(|t| Ok(format!("[en] {t}")));
        translate_tree(
            &sample(),
            ReportLang::En,
            &exempt(),
            &fake,
            &TranslationGuard::default(),
        )
        .await;
        // abt_background, company_desc, job_title, one distinct task
        assert_eq!(fake.calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_echo_keeps_original() {
        let fake = FakeTranslator::new(|t| Ok(t.to_string()));
        let input = sample();
        let out = translate_en(&input, &fake).await;
        assert_eq!(out, input);
    }

    #[tokio::test]
    async fn test_empty_reply_keeps_original() {
        let fake = FakeTranslator::new(|_| Ok("   ".to_string()));
        let input = sample();
        let out = translate_en(&input, &fake).await;
        assert_eq!(out, input);
    }

    #[tokio::test]
    async fn test_backend_failure_keeps_original() {
        let fake = FakeTranslator::new(|_| Err(TranslateError::Backend("timeout".into())));
        let input = sample();
        let out = translate_en(&input, &fake).await;
        assert_eq!(out, input);
    }

    #[tokio::test]
    async fn test_spanish_reply_keeps_original() {
        let fake = FakeTranslator::new(|_| Ok("gestión del equipo y ventas".to_string()));
        let input = json!({"task": "gestão de equipe"});
        let out = translate_en(&input, &fake).await;
        assert_eq!(out, input);
    }

    #[test]
    fn test_guard_rejections() {
        let guard = TranslationGuard::default();
        assert_eq!(guard.check("olá", ""), Err(Rejection::Empty));
        assert_eq!(guard.check("olá", " olá "), Err(Rejection::Unchanged));
        assert_eq!(
            guard.check("vendas", "I'm sorry, could you clarify the text?"),
            Err(Rejection::Refusal)
        );
        assert_eq!(
            guard.check("gestão do projeto", "gestión del proyecto"),
            Err(Rejection::WrongLanguage)
        );
        assert_eq!(
            guard.check("team management", "el gerenciamento de equipe"),
            Err(Rejection::WrongLanguage)
        );
        assert_eq!(guard.check("gestão de projetos", "project management"), Ok(()));
    }

    #[test]
    fn test_guard_ignores_markers_already_in_original() {
        let guard = TranslationGuard::default();
        assert_eq!(
            guard.check("Cliente: Los Angeles Times", "Client: Los Angeles Times"),
            Ok(())
        );
    }

    #[test]
    fn test_leaves_without_letters_are_skipped() {
        let mut leaves = Vec::new();
        collect_leaves(
            &json!({"job_wage": "R$ 10.000,00", "job_others": "vale cultura"}),
            None,
            &exempt(),
            &mut HashSet::new(),
            &mut leaves,
        );
        assert_eq!(leaves.len(), 2);
        let mut numeric = Vec::new();
        collect_leaves(
            &json!({"x": "12/2020"}),
            None,
            &exempt(),
            &mut HashSet::new(),
            &mut numeric,
        );
        assert!(numeric.is_empty());
    }
}
