//! Document rendering boundary.
//!
//! The report pipeline produces a JSON render context; a [`ReportRenderer`] turns
//! it into the final document bytes. The production renderer fills DOCX templates
//! (see [`docx`]); tests swap in fakes through `AppState`.

pub mod docx;
pub mod template;

use serde_json::Value;
use thiserror::Error;

use crate::models::candidate::ReportLang;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("template '{template}' not found")]
    TemplateNotFound { template: String },

    #[error("template '{template}' is not a valid DOCX archive: {detail}")]
    Archive { template: String, detail: String },

    #[error("template '{template}': I/O error: {source}")]
    Io {
        template: String,
        #[source]
        source: std::io::Error,
    },

    #[error("template '{template}', part '{part}': {detail}")]
    Syntax {
        template: String,
        part: String,
        detail: String,
    },

    #[error("template '{template}', field '{field}': {detail}")]
    Field {
        template: String,
        field: String,
        detail: String,
    },
}

/// Renders a report context into a finished document.
pub trait ReportRenderer: Send + Sync {
    fn render(&self, lang: ReportLang, context: &Value) -> Result<Vec<u8>, RenderError>;
}

/// File name of the report template for `lang`.
pub fn template_file_name(lang: ReportLang) -> String {
    format!("Template_Placeholders_{}.docx", lang.as_str())
}

pub const DOCX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
