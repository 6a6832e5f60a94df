//! DOCX template renderer: fills `Template_Placeholders_{LANG}.docx` in place.
//!
//! Only the main document, headers and footers are templated. Every other archive
//! entry is copied as-is.

use std::io::{Cursor, Read, Write};
use std::path::PathBuf;

use serde_json::Value;
use tracing::{debug, info};
use zip::write::SimpleFileOptions;
use zip::{ZipArchive, ZipWriter};

use crate::models::candidate::ReportLang;
use crate::render::template::{has_placeholders, render_part, TemplateError};
use crate::render::{template_file_name, RenderError, ReportRenderer};

pub struct DocxTemplateRenderer {
    template_dir: PathBuf,
}

impl DocxTemplateRenderer {
    pub fn new(template_dir: impl Into<PathBuf>) -> Self {
        Self {
            template_dir: template_dir.into(),
        }
    }

    /// Renders the template at `name` inside the template directory.
    pub fn render_template(&self, name: &str, context: &Value) -> Result<Vec<u8>, RenderError> {
        let path = self.template_dir.join(name);
        if !path.is_file() {
            return Err(RenderError::TemplateNotFound {
                template: name.to_string(),
            });
        }
        let bytes = std::fs::read(&path).map_err(|source| RenderError::Io {
            template: name.to_string(),
            source,
        })?;
        let out = render_docx(name, &bytes, context)?;
        info!("Rendered {name} ({} bytes)", out.len());
        Ok(out)
    }
}

impl ReportRenderer for DocxTemplateRenderer {
    fn render(&self, lang: ReportLang, context: &Value) -> Result<Vec<u8>, RenderError> {
        self.render_template(&template_file_name(lang), context)
    }
}

/// Parts of a WordprocessingML package that carry report text.
pub fn is_templated_part(name: &str) -> bool {
    name == "word/document.xml"
        || (name.starts_with("word/header") && name.ends_with(".xml"))
        || (name.starts_with("word/footer") && name.ends_with(".xml"))
}

/// Renders a DOCX archive held in memory. `template` names it in errors.
pub fn render_docx(template: &str, bytes: &[u8], context: &Value) -> Result<Vec<u8>, RenderError> {
    let archive_err = |e: zip::result::ZipError| RenderError::Archive {
        template: template.to_string(),
        detail: e.to_string(),
    };
    let io_err = |source: std::io::Error| RenderError::Io {
        template: template.to_string(),
        source,
    };

    let mut archive = ZipArchive::new(Cursor::new(bytes)).map_err(archive_err)?;
    let mut writer = ZipWriter::new(Cursor::new(Vec::with_capacity(bytes.len())));
    let mut found_document = false;

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i).map_err(archive_err)?;
        let name = entry.name().to_string();
        let options = SimpleFileOptions::default().compression_method(entry.compression());

        if entry.is_dir() {
            writer.add_directory(name, options).map_err(archive_err)?;
            continue;
        }

        let mut content = Vec::with_capacity(entry.size() as usize);
        entry.read_to_end(&mut content).map_err(io_err)?;

        if is_templated_part(&name) {
            found_document |= name == "word/document.xml";
            let xml = String::from_utf8(content).map_err(|e| RenderError::Syntax {
                template: template.to_string(),
                part: name.clone(),
                detail: format!("not valid UTF-8: {e}"),
            })?;
            content = if has_placeholders(&xml) {
                debug!("Rendering {template}:{name}");
                render_part(&name, &xml, context)
                    .map_err(|e| template_error(template, &name, e))?
                    .into_bytes()
            } else {
                xml.into_bytes()
            };
        }

        writer.start_file(name, options).map_err(archive_err)?;
        writer.write_all(&content).map_err(io_err)?;
    }

    if !found_document {
        return Err(RenderError::Archive {
            template: template.to_string(),
            detail: "missing word/document.xml".to_string(),
        });
    }

    let cursor = writer.finish().map_err(archive_err)?;
    Ok(cursor.into_inner())
}

fn template_error(template: &str, part: &str, err: TemplateError) -> RenderError {
    match err {
        TemplateError::Syntax(detail) => RenderError::Syntax {
            template: template.to_string(),
            part: part.to_string(),
            detail,
        },
        TemplateError::Field { field, detail } => RenderError::Field {
            template: template.to_string(),
            field,
            detail,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const DOCUMENT: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body><w:p><w:r><w:t>{{ cdd_name }}</w:t></w:r></w:p><w:p><w:r><w:t>{%p for item in line_items %}</w:t></w:r></w:p><w:p><w:r><w:t>{{ item.cdd_company }}</w:t></w:r></w:p><w:p><w:r><w:t>{%p endfor %}</w:t></w:r></w:p></w:body></w:document>"#;

    fn build_docx(parts: &[(&str, &str)]) -> Vec<u8> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default();
        for (name, body) in parts {
            writer.start_file(*name, options).unwrap();
            writer.write_all(body.as_bytes()).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    fn read_part(docx: &[u8], name: &str) -> String {
        let mut archive = ZipArchive::new(Cursor::new(docx)).unwrap();
        let mut entry = archive.by_name(name).unwrap();
        let mut out = String::new();
        entry.read_to_string(&mut out).unwrap();
        out
    }

    fn context() -> Value {
        json!({
            "cdd_name": "Ana & Co",
            "line_items": [{"cdd_company": "ACME"}, {"cdd_company": "GLOBEX"}],
            "company": "CLIENTE"
        })
    }

    #[test]
    fn test_renders_document_and_headers() {
        let template = build_docx(&[
            ("[Content_Types].xml", "<Types/>"),
            ("word/document.xml", DOCUMENT),
            ("word/header1.xml", "<w:hdr><w:p><w:r><w:t>{{ company }}</w:t></w:r></w:p></w:hdr>"),
            ("word/styles.xml", "<w:styles>{{ untouched }}</w:styles>"),
        ]);
        let out = render_docx("t.docx", &template, &context()).unwrap();

        let doc = read_part(&out, "word/document.xml");
        assert!(doc.contains("<w:t>Ana &amp; Co</w:t>"));
        assert!(doc.contains("<w:t>ACME</w:t>"));
        assert!(doc.contains("<w:t>GLOBEX</w:t>"));
        assert!(!doc.contains("{%"));
        assert_eq!(
            read_part(&out, "word/header1.xml"),
            "<w:hdr><w:p><w:r><w:t>CLIENTE</w:t></w:r></w:p></w:hdr>"
        );
        assert_eq!(
            read_part(&out, "word/styles.xml"),
            "<w:styles>{{ untouched }}</w:styles>"
        );
        assert_eq!(read_part(&out, "[Content_Types].xml"), "<Types/>");
    }

    #[test]
    fn test_renderer_picks_language_template() {
        let dir = tempfile::tempdir().unwrap();
        let template = build_docx(&[("word/document.xml", DOCUMENT)]);
        std::fs::write(dir.path().join("Template_Placeholders_EN.docx"), template).unwrap();

        let renderer = DocxTemplateRenderer::new(dir.path());
        let out = renderer.render(ReportLang::En, &context()).unwrap();
        assert!(read_part(&out, "word/document.xml").contains("GLOBEX"));

        let err = renderer.render(ReportLang::Pt, &context()).unwrap_err();
        assert!(matches!(
            err,
            RenderError::TemplateNotFound { template }
                if template == "Template_Placeholders_PT.docx"
        ));
    }

    #[test]
    fn test_field_error_carries_template_name() {
        let template = build_docx(&[("word/document.xml", DOCUMENT)]);
        let err = render_docx(
            "Template_Placeholders_PT.docx",
            &template,
            &json!({"line_items": 42}),
        )
        .unwrap_err();
        assert!(matches!(err, RenderError::Field { .. } | RenderError::Syntax { .. }));
        assert!(err.to_string().contains("Template_Placeholders_PT.docx"));
    }

    #[test]
    fn test_syntax_error_names_part() {
        let template = build_docx(&[(
            "word/document.xml",
            "<w:p><w:r><w:t>{% if x %}</w:t></w:r></w:p>",
        )]);
        let err = render_docx("t.docx", &template, &json!({})).unwrap_err();
        assert!(matches!(err, RenderError::Syntax { part, .. } if part == "word/document.xml"));
    }

    #[test]
    fn test_not_a_zip_is_archive_error() {
        let err = render_docx("t.docx", b"plain text", &json!({})).unwrap_err();
        assert!(matches!(err, RenderError::Archive { .. }));
    }

    #[test]
    fn test_missing_document_part() {
        let template = build_docx(&[("word/styles.xml", "<w:styles/>")]);
        let err = render_docx("t.docx", &template, &json!({})).unwrap_err();
        assert!(matches!(
            err,
            RenderError::Archive { detail, .. } if detail.contains("document.xml")
        ));
    }

    #[test]
    fn test_templated_part_names() {
        assert!(is_templated_part("word/document.xml"));
        assert!(is_templated_part("word/footer2.xml"));
        assert!(!is_templated_part("word/footer2.xml.rels"));
        assert!(!is_templated_part("word/styles.xml"));
    }
}
