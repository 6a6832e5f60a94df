//! Date normalization. Collapses the month/year expressions found in CVs into
//! canonical `MM/YYYY`, the ongoing token, or the sentinel.

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::candidate::ReportLang;

/// Placeholder for "no parseable date".
pub const SENTINEL_DATE: &str = "00/0000";
/// Placeholder for current, ongoing employment.
pub const ONGOING: &str = "PRESENT";

static MONTH_NUMERIC_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{1,2})\s*[/.\-]\s*(\d{4})$").unwrap());
static DAY_MONTH_YEAR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{1,2}\s*[/.\-]\s*(\d{1,2})\s*[/.\-]\s*(\d{4})$").unwrap());
static YEAR_MONTH_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{4})\s*[/.\-]\s*(\d{1,2})$").unwrap());
static MONTH_NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(\p{L}+)\.?\s*(?:,|/|-|de\b)?\s*(\d{4})$").unwrap());
static YEAR_ONLY_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d{4})$").unwrap());
static CANONICAL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(0[1-9]|1[0-2])/\d{4}$").unwrap());
static ANY_YEAR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(?:19|20)\d{2}\b").unwrap());

const MONTHS_PT: &[(&str, u32)] = &[
    ("janeiro", 1),
    ("jan", 1),
    ("fevereiro", 2),
    ("fev", 2),
    ("março", 3),
    ("marco", 3),
    ("mar", 3),
    ("abril", 4),
    ("abr", 4),
    ("maio", 5),
    ("mai", 5),
    ("junho", 6),
    ("jun", 6),
    ("julho", 7),
    ("jul", 7),
    ("agosto", 8),
    ("ago", 8),
    ("setembro", 9),
    ("set", 9),
    ("outubro", 10),
    ("out", 10),
    ("novembro", 11),
    ("nov", 11),
    ("dezembro", 12),
    ("dez", 12),
];

const MONTHS_EN: &[(&str, u32)] = &[
    ("january", 1),
    ("jan", 1),
    ("february", 2),
    ("feb", 2),
    ("march", 3),
    ("mar", 3),
    ("april", 4),
    ("apr", 4),
    ("may", 5),
    ("june", 6),
    ("jun", 6),
    ("july", 7),
    ("jul", 7),
    ("august", 8),
    ("aug", 8),
    ("september", 9),
    ("sept", 9),
    ("sep", 9),
    ("october", 10),
    ("oct", 10),
    ("november", 11),
    ("nov", 11),
    ("december", 12),
    ("dec", 12),
];

const PRESENT_TERMS_PT: &[&str] = &[
    "presente",
    "atual",
    "atualmente",
    "no presente",
    "neste momento",
    "data atual",
    "presente momento",
    "agora",
];

const PRESENT_TERMS_EN: &[&str] = &[
    "present",
    "current",
    "currently",
    "actual",
    "nowadays",
    "this moment",
    "today",
];

fn month_table(lang: ReportLang) -> &'static [(&'static str, u32)] {
    match lang {
        ReportLang::Pt => MONTHS_PT,
        ReportLang::En => MONTHS_EN,
    }
}

fn present_terms(lang: ReportLang) -> &'static [&'static str] {
    match lang {
        ReportLang::Pt => PRESENT_TERMS_PT,
        ReportLang::En => PRESENT_TERMS_EN,
    }
}

/// Looks a month name up in `lang`'s table first, then in the other language's.
fn month_from_name(name: &str, lang: ReportLang) -> Option<u32> {
    let name = name.to_lowercase();
    [lang, lang.other()].into_iter().find_map(|l| {
        month_table(l)
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, m)| *m)
    })
}

fn month_year(month: &str, year: &str) -> Option<String> {
    let month: u32 = month.parse().ok()?;
    (1..=12)
        .contains(&month)
        .then(|| format!("{month:02}/{year}"))
}

/// Normalizes a raw date expression to `MM/YYYY`.
///
/// Accepted shapes: `M/YYYY` (also `-` and `.` separators), `DD/MM/YYYY`,
/// `YYYY-MM`, `<month name> YYYY` in Portuguese or English (full or abbreviated,
/// optionally with `de` or a comma), and a bare `YYYY` (month defaults to `01`).
/// Anything else is returned unchanged; callers check [`is_canonical`].
pub fn normalize_date(raw: &str, lang: ReportLang) -> String {
    let trimmed = raw.trim();

    let parsed = if let Some(caps) = MONTH_NUMERIC_RE.captures(trimmed) {
        month_year(&caps[1], &caps[2])
    } else if let Some(caps) = DAY_MONTH_YEAR_RE.captures(trimmed) {
        month_year(&caps[1], &caps[2])
    } else if let Some(caps) = YEAR_MONTH_RE.captures(trimmed) {
        month_year(&caps[2], &caps[1])
    } else if let Some(caps) = MONTH_NAME_RE.captures(trimmed) {
        month_from_name(&caps[1], lang).map(|m| format!("{m:02}/{}", &caps[2]))
    } else if let Some(caps) = YEAR_ONLY_RE.captures(trimmed) {
        Some(format!("01/{}", &caps[1]))
    } else {
        None
    };

    parsed.unwrap_or_else(|| raw.to_string())
}

/// True for a well-formed `MM/YYYY` value (month 01–12, four-digit year).
pub fn is_canonical(value: &str) -> bool {
    CANONICAL_RE.is_match(value)
}

/// True if `value` equals or contains one of `lang`'s "ongoing employment" phrases.
pub fn is_present_term(value: &str, lang: ReportLang) -> bool {
    let lower = value.trim().to_lowercase();
    if lower.is_empty() {
        return false;
    }
    present_terms(lang)
        .iter()
        .any(|term| lower == *term || lower.contains(term))
}

/// Ongoing check used by the pipeline: the token itself, or a present-term in either language.
pub fn is_ongoing(value: &str, lang: ReportLang) -> bool {
    value.trim().eq_ignore_ascii_case(ONGOING)
        || is_present_term(value, lang)
        || is_present_term(value, lang.other())
}

/// Normalizes a start date; anything that is not canonical afterwards becomes the sentinel.
pub fn normalize_start_date(raw: &str, lang: ReportLang) -> String {
    let normalized = normalize_date(raw, lang);
    if is_canonical(&normalized) {
        normalized
    } else {
        SENTINEL_DATE.to_string()
    }
}

/// Normalizes an end date. The ongoing check runs first: "present" is not a calendar date.
pub fn normalize_end_date(raw: &str, lang: ReportLang) -> String {
    if is_ongoing(raw, lang) {
        return ONGOING.to_string();
    }
    normalize_start_date(raw, lang)
}

/// Reduces an academic conclusion date to its four-digit year.
/// In-progress courses get the ongoing token; values without a year pass through trimmed.
pub fn normalize_year(raw: &str, lang: ReportLang) -> String {
    if is_ongoing(raw, lang) {
        return ONGOING.to_string();
    }
    ANY_YEAR_RE
        .find_iter(raw)
        .last()
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| raw.trim().to_string())
}

/// Parses a canonical `MM/YYYY` value into the first day of that month.
pub fn parse_month_year(value: &str) -> Option<NaiveDate> {
    if !is_canonical(value) {
        return None;
    }
    NaiveDate::parse_from_str(&format!("01/{value}"), "%d/%m/%Y").ok()
}
