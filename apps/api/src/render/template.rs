//! Jinja rendering of WordprocessingML parts.
//!
//! Templates are authored in Word with docxtpl conventions, so the XML is cleaned up
//! before it reaches minijinja: placeholders split across runs are re-joined, the
//! `{%p … %}` / `{%tr … %}` tags swallow their enclosing paragraph or table row, and
//! entities Word writes inside tags (`&quot;`, smart quotes) are turned back into
//! Jinja syntax.

use std::fmt::Write as _;

use minijinja::value::{Value, ValueKind};
use minijinja::{Environment, Error, ErrorKind, Output, State, UndefinedBehavior};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use thiserror::Error as ThisError;

#[derive(Debug, ThisError, PartialEq, Eq)]
pub enum TemplateError {
    #[error("{0}")]
    Syntax(String),

    #[error("field '{field}' {detail}")]
    Field { field: String, detail: String },
}

static SPLIT_PLACEHOLDER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)\{(?:<[^>]*>)*[{%].*?[}%](?:<[^>]*>)*\}").unwrap()
});
static XML_TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").unwrap());
static SCOPED_TAG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)\{%(p|tr)\s(.*?)%\}").unwrap());
static PLACEHOLDER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)\{\{.*?\}\}|\{%.*?%\}").unwrap());

static ENV: Lazy<Environment<'static>> = Lazy::new(|| {
    let mut env = Environment::new();
    env.set_undefined_behavior(UndefinedBehavior::Lenient);
    env.set_formatter(format_value);
    env
});

/// Strips the run/proof markup Word inserts inside `{{ … }}` and `{% … %}`.
/// Placeholders spanning paragraphs are left alone.
pub fn merge_split_placeholders(xml: &str) -> String {
    SPLIT_PLACEHOLDER_RE
        .replace_all(xml, |caps: &Captures| {
            let found = &caps[0];
            if found.contains("</w:p>") {
                found.to_string()
            } else {
                XML_TAG_RE.replace_all(found, "").into_owned()
            }
        })
        .into_owned()
}

fn open_before(xml: &str, pos: usize, element: &str) -> Option<usize> {
    let head = &xml[..pos];
    let bare = head.rfind(&format!("<{element}>"));
    let with_attrs = head.rfind(&format!("<{element} "));
    bare.max(with_attrs)
}

fn close_after(xml: &str, pos: usize, element: &str) -> Option<usize> {
    let closing = format!("</{element}>");
    xml[pos..].find(&closing).map(|i| pos + i + closing.len())
}

/// Locates the next scoped tag: the byte range of its enclosing element and the
/// plain tag that replaces it.
fn next_scoped_tag(xml: &str) -> Result<Option<(usize, usize, String)>, TemplateError> {
    let Some(caps) = SCOPED_TAG_RE.captures(xml) else {
        return Ok(None);
    };
    let (Some(whole), Some(kind), Some(body)) = (caps.get(0), caps.get(1), caps.get(2)) else {
        return Ok(None);
    };
    let element = if kind.as_str() == "p" { "w:p" } else { "w:tr" };

    match (
        open_before(xml, whole.start(), element),
        close_after(xml, whole.end(), element),
    ) {
        (Some(start), Some(end)) => Ok(Some((
            start,
            end,
            format!("{{% {} %}}", body.as_str().trim()),
        ))),
        _ => Err(TemplateError::Syntax(format!(
            "'{}' is not inside a <{element}> element",
            whole.as_str()
        ))),
    }
}

/// Replaces the paragraph (`{%p`) or table row (`{%tr`) holding each scoped tag
/// with the bare tag.
pub fn expand_scoped_tags(xml: &str) -> Result<String, TemplateError> {
    let mut xml = xml.to_string();
    while let Some((start, end, tag)) = next_scoped_tag(&xml)? {
        xml.replace_range(start..end, &tag);
    }
    Ok(xml)
}

fn unescape_xml(s: &str) -> String {
    s.replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
        .replace(['\u{201C}', '\u{201D}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'")
}

/// Undoes Word's escaping inside tags so `{% if a == &quot;x&quot; %}` parses.
fn unescape_placeholders(xml: &str) -> String {
    PLACEHOLDER_RE
        .replace_all(xml, |caps: &Captures| unescape_xml(&caps[0]))
        .into_owned()
}

/// Escapes a value for a `<w:t>` element. Line breaks become `<w:br/>`.
pub fn escape_text(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
        .replace('\r', "")
        .replace('\n', "</w:t><w:br/><w:t xml:space=\"preserve\">")
}

fn format_value(
    out: &mut Output<'_>,
    _state: &State<'_, '_>,
    value: &Value,
) -> Result<(), Error> {
    if value.is_undefined() || value.is_none() {
        return Ok(());
    }
    if value.is_safe() {
        return out.write_str(&value.to_string()).map_err(Error::from);
    }
    match value.kind() {
        ValueKind::Seq | ValueKind::Map => Err(Error::new(
            ErrorKind::InvalidOperation,
            "is a list or mapping, not a printable value",
        )),
        _ => {
            let text = value.as_str().map_or_else(|| value.to_string(), str::to_string);
            out.write_str(&escape_text(&text)).map_err(Error::from)
        }
    }
}

/// Source text the engine blamed, used to name the offending field.
fn blamed_source(source: &str, err: &Error) -> Option<String> {
    let range = err.range()?;
    let snippet = source.get(range)?;
    let snippet = snippet
        .trim()
        .trim_start_matches("{{")
        .trim_start_matches("{%")
        .trim_end_matches("}}")
        .trim_end_matches("%}")
        .trim();
    (!snippet.is_empty()).then(|| snippet.to_string())
}

fn template_error(source: &str, err: Error) -> TemplateError {
    let mut detail = err.detail().unwrap_or("template error").to_string();
    if let Some(line) = err.line() {
        let _ = write!(detail, " (line {line})");
    }
    match (err.kind(), blamed_source(source, &err)) {
        (ErrorKind::SyntaxError, _) | (_, None) => TemplateError::Syntax(detail),
        (_, Some(field)) => TemplateError::Field { field, detail },
    }
}

/// True if the part contains anything that looks like a placeholder.
pub fn has_placeholders(xml: &str) -> bool {
    xml.contains('{')
        && (xml.contains("{{") || xml.contains("{%") || SPLIT_PLACEHOLDER_RE.is_match(xml))
}

/// Renders one XML part named `part` against `context`.
pub fn render_part(
    part: &str,
    xml: &str,
    context: &serde_json::Value,
) -> Result<String, TemplateError> {
    let merged = merge_split_placeholders(xml);
    let expanded = expand_scoped_tags(&merged)?;
    let source = unescape_placeholders(&expanded);

    ENV.render_named_str(part, &source, context).map_err(|e| template_error(&source, e))
}
