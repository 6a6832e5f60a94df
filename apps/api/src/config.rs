use anyhow::{bail, Context, Result};

use crate::report::translate::default_exempt_keys;

pub const DEFAULT_LLM_MODEL: &str = "claude-sonnet-4-5";

/// How academic conclusion dates are rendered in the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcademicDateStyle {
    /// Four-digit year only, e.g. `2019`.
    Year,
    /// Canonical `MM/YYYY`, same as job dates.
    MonthYear,
}

impl AcademicDateStyle {
    pub fn parse(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "year" => Ok(Self::Year),
            "month_year" | "month-year" => Ok(Self::MonthYear),
            other => bail!("ACADEMIC_DATE_STYLE must be 'year' or 'month_year', got '{other}'"),
        }
    }
}

/// Application configuration loaded from environment variables.
/// Fails at startup if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub anthropic_api_key: String,
    pub llm_model: String,
    pub llm_timeout_secs: u64,
    pub extract_max_tokens: u32,
    pub port: u16,
    pub rust_log: String,
    pub template_dir: String,
    pub levels_table_source: Option<String>,
    pub academic_date_style: AcademicDateStyle,
    pub translate_exempt_keys: Vec<String>,
    pub description_max_chars: usize,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            anthropic_api_key: require_env("ANTHROPIC_API_KEY")?,
            llm_model: std::env::var("LLM_MODEL")
                .unwrap_or_else(|_| DEFAULT_LLM_MODEL.to_string()),
            llm_timeout_secs: std::env::var("LLM_TIMEOUT_SECS")
                .unwrap_or_else(|_| "120".to_string())
                .parse::<u64>()
                .context("LLM_TIMEOUT_SECS must be a number of seconds")?,
            extract_max_tokens: std::env::var("EXTRACT_MAX_TOKENS")
                .unwrap_or_else(|_| "4096".to_string())
                .parse::<u32>()
                .context("EXTRACT_MAX_TOKENS must be a positive integer")?,
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            template_dir: std::env::var("TEMPLATE_DIR").unwrap_or_else(|_| "template".to_string()),
            levels_table_source: std::env::var("LEVELS_TABLE_SOURCE")
                .ok()
                .filter(|s| !s.trim().is_empty()),
            academic_date_style: AcademicDateStyle::parse(
                &std::env::var("ACADEMIC_DATE_STYLE").unwrap_or_else(|_| "year".to_string()),
            )?,
            translate_exempt_keys: std::env::var("TRANSLATE_EXEMPT_KEYS")
                .map(|raw| parse_key_list(&raw))
                .unwrap_or_else(|_| default_exempt_keys()),
            description_max_chars: std::env::var("DESCRIPTION_MAX_CHARS")
                .unwrap_or_else(|_| "89".to_string())
                .parse::<usize>()
                .context("DESCRIPTION_MAX_CHARS must be a positive integer")?,
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn parse_key_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(String::from)
        .collect()
}
