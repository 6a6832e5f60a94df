use std::sync::Arc;

use sqlx::PgPool;

use crate::llm_client::LlmClient;
use crate::render::ReportRenderer;
use crate::report::levels::LevelTable;
use crate::report::pipeline::ReportOptions;
use crate::report::translate::{TranslationGuard, Translator};

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub llm: LlmClient,
    /// Language-level reference table, loaded once at startup and read-only after.
    pub levels: Arc<LevelTable>,
    /// Pluggable translator. Default: LlmTranslator over the shared client.
    pub translator: Arc<dyn Translator>,
    pub guard: Arc<TranslationGuard>,
    pub renderer: Arc<dyn ReportRenderer>,
    pub report_options: Arc<ReportOptions>,
}
