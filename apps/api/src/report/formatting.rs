//! Text formatting rules applied when building the render context.

use chrono::{Datelike, NaiveDate};

use crate::models::candidate::ReportLang;

const LOWERCASE_PT: &[&str] = &[
    "de", "da", "do", "das", "dos", "para", "com", "e", "a", "o", "as", "os", "em", "no", "na",
    "nos", "nas",
];

const LOWERCASE_EN: &[&str] = &[
    "of", "and", "the", "in", "for", "at", "to", "a", "an", "on", "with", "by", "or", "from",
];

const MONTHS_PT: [&str; 12] = [
    "janeiro", "fevereiro", "março", "abril", "maio", "junho", "julho", "agosto", "setembro",
    "outubro", "novembro", "dezembro",
];

const MONTHS_EN: [&str; 12] = [
    "January", "February", "March", "April", "May", "June", "July", "August", "September",
    "October", "November", "December",
];

fn lowercase_exceptions(lang: ReportLang) -> &'static [&'static str] {
    match lang {
        ReportLang::Pt => LOWERCASE_PT,
        ReportLang::En => LOWERCASE_EN,
    }
}

fn upper_first(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Title-cases `text`, keeping the language's connectives lowercase.
/// The first word is always capitalized; whitespace is collapsed.
pub fn smart_title(text: &str, lang: ReportLang) -> String {
    let exceptions = lowercase_exceptions(lang);
    text.to_lowercase()
        .split_whitespace()
        .enumerate()
        .map(|(i, word)| {
            if i > 0 && exceptions.contains(&word) {
                word.to_string()
            } else {
                upper_first(word)
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn format_caps(text: &str) -> String {
    text.trim().to_uppercase()
}

/// Uppercases the first character and leaves the rest alone, so acronyms survive.
pub fn capitalize_first(text: &str) -> String {
    upper_first(text.trim())
}

/// Cuts `text` to at most `max_chars` characters at a word boundary, marking the cut with `...`.
pub fn trim_text(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let head: String = text.chars().take(max_chars).collect();
    let cut = match head.rsplit_once(' ') {
        Some((before, _)) => before,
        None => head.as_str(),
    };
    format!("{}...", cut.trim_end())
}

fn ordinal(n: u32) -> String {
    let suffix = if (11..=13).contains(&(n % 100)) {
        "th"
    } else {
        match n % 10 {
            1 => "st",
            2 => "nd",
            3 => "rd",
            _ => "th",
        }
    };
    format!("{n}{suffix}")
}

/// Long-form report date: `5 de março de 2024` or `5th March, 2024`.
pub fn format_report_date(lang: ReportLang, today: NaiveDate) -> String {
    let month = today.month0() as usize;
    match lang {
        ReportLang::Pt => format!("{} de {} de {}", today.day(), MONTHS_PT[month], today.year()),
        ReportLang::En => format!(
            "{} {}, {}",
            ordinal(today.day()),
            MONTHS_EN[month],
            today.year()
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_smart_title_pt_exceptions() {
        assert_eq!(
            smart_title("JOÃO DA SILVA dos santos", ReportLang::Pt),
            "João da Silva dos Santos"
        );
        assert_eq!(smart_title("de souza", ReportLang::Pt), "De Souza");
    }

    #[test]
    fn test_smart_title_en_exceptions() {
        assert_eq!(
            smart_title("head   OF sales and marketing", ReportLang::En),
            "Head of Sales and Marketing"
        );
    }

    #[test]
    fn test_capitalize_first_keeps_rest() {
        assert_eq!(capitalize_first("  implantação do SAP"), "Implantação do SAP");
        assert_eq!(capitalize_first(""), "");
    }

    #[test]
    fn test_trim_text_at_word_boundary() {
        assert_eq!(trim_text("short", 89), "short");
        assert_eq!(trim_text("abc def ghi", 6), "abc...");
        assert_eq!(trim_text("abcdefghij", 4), "abcd...");
        let long = "Empresa multinacional de tecnologia com atuação em mais de quarenta países e milhares de colaboradores";
        let trimmed = trim_text(long, 89);
        assert!(trimmed.ends_with("..."));
        assert!(trimmed.chars().count() <= 92);
        assert!(long.starts_with(trimmed.trim_end_matches("...")));
    }

    #[test]
    fn test_trim_text_counts_chars_not_bytes() {
        assert_eq!(trim_text("ação", 4), "ação");
    }

    #[test]
    fn test_report_date_pt() {
        let d = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();
        assert_eq!(format_report_date(ReportLang::Pt, d), "5 de março de 2024");
    }

    #[test]
    fn test_report_date_en_ordinals() {
        let date = |day| NaiveDate::from_ymd_opt(2024, 6, day).unwrap();
        assert_eq!(format_report_date(ReportLang::En, date(1)), "1st June, 2024");
        assert_eq!(format_report_date(ReportLang::En, date(2)), "2nd June, 2024");
        assert_eq!(format_report_date(ReportLang::En, date(3)), "3rd June, 2024");
        assert_eq!(format_report_date(ReportLang::En, date(11)), "11th June, 2024");
        assert_eq!(format_report_date(ReportLang::En, date(22)), "22nd June, 2024");
        assert_eq!(format_report_date(ReportLang::En, date(13)), "13th June, 2024");
    }
}
