mod companies;
mod config;
mod db;
mod errors;
mod llm_client;
mod models;
mod render;
mod report;
mod routes;
mod state;

use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::db::create_pool;
use crate::llm_client::{LlmClient, LlmSettings};
use crate::render::docx::DocxTemplateRenderer;
use crate::report::levels::LevelTable;
use crate::report::pipeline::ReportOptions;
use crate::report::translate::{LlmTranslator, TranslationGuard};
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting reportgen v{}", env!("CARGO_PKG_VERSION"));

    // Initialize PostgreSQL (company list)
    let db = create_pool(&config.database_url).await?;

    // Initialize LLM client
    let llm = LlmClient::new(LlmSettings::from_config(&config))
        .context("Failed to build LLM HTTP client")?;
    info!("LLM client initialized (model: {})", llm.model());

    // Load the language-level reference table once; it is read-only afterwards
    let levels = load_level_table(&config).await?;

    let renderer = DocxTemplateRenderer::new(&config.template_dir);
    info!("Report templates directory: {}", config.template_dir);

    let state = AppState {
        db,
        llm: llm.clone(),
        levels: Arc::new(levels),
        translator: Arc::new(LlmTranslator::new(llm)),
        guard: Arc::new(TranslationGuard::default()),
        renderer: Arc::new(renderer),
        report_options: Arc::new(ReportOptions::from_config(&config)),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict origins to the report front-end

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn load_level_table(config: &Config) -> Result<LevelTable> {
    let Some(source) = config.levels_table_source.as_deref() else {
        warn!("LEVELS_TABLE_SOURCE not set; language levels will have no descriptions");
        return Ok(LevelTable::empty());
    };
    let table = LevelTable::load(source)
        .await
        .with_context(|| format!("Failed to load level table from {source}"))?;
    if table.is_empty() {
        warn!("Level table at {source} has no rows; language levels will have no descriptions");
    }
    Ok(table)
}
