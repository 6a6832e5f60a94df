use axum::{
    extract::{Multipart, Query, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use bytes::Bytes;
use chrono::{Local, NaiveDate};
use serde::Deserialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::errors::AppError;
use crate::models::candidate::{CandidateRecord, ReportLang};
use crate::render::DOCX_CONTENT_TYPE;
use crate::report::context::RenderContext;
use crate::report::extract::{extract_candidate, extract_pdf_text};
use crate::report::pipeline::{output_filename, Pipeline, UserFields};
use crate::state::AppState;

fn pipeline(state: &AppState) -> Pipeline<'_> {
    Pipeline {
        levels: &state.levels,
        translator: state.translator.as_ref(),
        guard: &state.guard,
        options: &state.report_options,
    }
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Form fields of a CV upload.
#[derive(Debug, Default)]
pub struct CvUpload {
    pub cv_file: Option<Bytes>,
    pub report_lang: Option<ReportLang>,
    pub company: Option<String>,
    pub company_title: Option<String>,
    pub benefits_block: String,
    pub translate: bool,
}

impl CvUpload {
    fn user_fields(&self) -> UserFields {
        UserFields {
            report_lang: self.report_lang,
            company: self.company.clone(),
            company_title: self.company_title.clone(),
        }
    }

    fn lang(&self) -> ReportLang {
        self.report_lang.unwrap_or_default()
    }
}

fn parse_flag(raw: &str) -> bool {
    matches!(
        raw.trim().to_ascii_lowercase().as_str(),
        "true" | "1" | "yes" | "on"
    )
}

async fn read_cv_upload(mut multipart: Multipart) -> Result<CvUpload, AppError> {
    let mut upload = CvUpload::default();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Invalid multipart body: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_string();
        let bad_field = |e: axum::extract::multipart::MultipartError| {
            AppError::Validation(format!("Invalid form field '{name}': {e}"))
        };
        match name.as_str() {
            "cv_file" => upload.cv_file = Some(field.bytes().await.map_err(bad_field)?),
            "report_lang" => {
                let raw = field.text().await.map_err(bad_field)?;
                upload.report_lang = Some(ReportLang::parse(&raw))
            }
            "company" => upload.company = Some(field.text().await.map_err(bad_field)?),
            "company_title" => upload.company_title = Some(field.text().await.map_err(bad_field)?),
            "benefits_block" => upload.benefits_block = field.text().await.map_err(bad_field)?,
            "translate" => upload.translate = parse_flag(&field.text().await.map_err(bad_field)?),
            other => warn!("Ignoring unknown form field '{other}'"),
        }
    }
    Ok(upload)
}

/// CV upload → raw candidate JSON from the LLM.
async fn extract_from_upload(state: &AppState, upload: &CvUpload) -> Result<Value, AppError> {
    let cv = upload
        .cv_file
        .clone()
        .filter(|b| !b.is_empty())
        .ok_or_else(|| AppError::Validation("cv_file is required".to_string()))?;

    let cv_text = tokio::task::spawn_blocking(move || extract_pdf_text(&cv))
        .await
        .map_err(|e| AppError::Pdf(format!("PDF text extraction aborted: {e}")))??;

    extract_candidate(&state.llm, &cv_text, upload.lang(), &upload.benefits_block).await
}

/// ASCII `filename` plus RFC 5987 `filename*` for names with accents.
fn content_disposition(filename: &str) -> String {
    let ascii: String = filename
        .chars()
        .map(|c| if c.is_ascii() && c != '"' { c } else { '_' })
        .collect();
    let encoded: String = filename
        .bytes()
        .map(|b| {
            if b.is_ascii_alphanumeric() || matches!(b, b'-' | b'.' | b'_') {
                (b as char).to_string()
            } else {
                format!("%{b:02X}")
            }
        })
        .collect();
    format!("attachment; filename=\"{ascii}\"; filename*=UTF-8''{encoded}")
}

async fn render_response(
    state: &AppState,
    ctx: RenderContext,
    today: NaiveDate,
) -> Result<Response, AppError> {
    let lang = ctx.record.report_lang;
    let filename = output_filename(&ctx.record.cdd_name, today);
    let value = ctx.to_value();
    let renderer = state.renderer.clone();

    let bytes = tokio::task::spawn_blocking(move || renderer.render(lang, &value))
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("render task failed: {e}")))??;

    info!("Report {filename} generated ({} bytes)", bytes.len());
    Ok((
        [
            (header::CONTENT_TYPE, DOCX_CONTENT_TYPE.to_string()),
            (header::CONTENT_DISPOSITION, content_disposition(&filename)),
        ],
        bytes,
    )
        .into_response())
}

/// POST /api/v1/reports/parse
/// Multipart CV upload → normalized candidate record, for review before rendering.
pub async fn handle_parse_cv(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<CandidateRecord>, AppError> {
    let upload = read_cv_upload(multipart).await?;
    let raw = extract_from_upload(&state, &upload).await?;
    let record = pipeline(&state).normalize(&raw, &upload.user_fields())?;
    Ok(Json(record))
}

/// POST /api/v1/reports/from-cv
/// Multipart CV upload → rendered DOCX report.
pub async fn handle_report_from_cv(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Response, AppError> {
    let upload = read_cv_upload(multipart).await?;
    let raw = extract_from_upload(&state, &upload).await?;
    let today = today();
    let ctx = pipeline(&state)
        .run(&raw, &upload.user_fields(), upload.translate, today)
        .await?;
    render_response(&state, ctx, today).await
}

#[derive(Debug, Deserialize)]
pub struct ReportQuery {
    #[serde(default)]
    pub translate: bool,
}

/// POST /api/v1/reports
/// Candidate JSON (possibly incomplete) → rendered DOCX report.
pub async fn handle_report_from_json(
    State(state): State<AppState>,
    Query(query): Query<ReportQuery>,
    Json(body): Json<Value>,
) -> Result<Response, AppError> {
    if !body.is_object() {
        return Err(AppError::Validation(
            "Request body must be a JSON object".to_string(),
        ));
    }
    let today = today();
    let ctx = pipeline(&state)
        .run(&body, &UserFields::default(), query.translate, today)
        .await?;
    render_response(&state, ctx, today).await
}
