//! Language proficiency levels: five canonical tiers with localized labels,
//! plus the externally supplied table of standard level descriptions.

use std::io::Read;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::models::candidate::{LanguageSkill, ReportLang};

/// The five proficiency tiers, in declaration order.
///
/// Declaration order is also the matching precedence: when a description matches
/// patterns of several tiers, the earliest tier wins. `PreOperational` must stay
/// ahead of `Operational` because "pré-operacional" contains "operacional".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CanonicalLevel {
    Elementary,
    PreOperational,
    Operational,
    Extended,
    Expert,
}

impl CanonicalLevel {
    pub const ALL: [CanonicalLevel; 5] = [
        CanonicalLevel::Elementary,
        CanonicalLevel::PreOperational,
        CanonicalLevel::Operational,
        CanonicalLevel::Extended,
        CanonicalLevel::Expert,
    ];

    pub fn label(&self, lang: ReportLang) -> &'static str {
        match (self, lang) {
            (CanonicalLevel::Elementary, ReportLang::En) => "Elementary",
            (CanonicalLevel::Elementary, ReportLang::Pt) => "Elementar",
            (CanonicalLevel::PreOperational, ReportLang::En) => "Pre-operational",
            (CanonicalLevel::PreOperational, ReportLang::Pt) => "Pré-operacional",
            (CanonicalLevel::Operational, ReportLang::En) => "Operational",
            (CanonicalLevel::Operational, ReportLang::Pt) => "Operacional",
            (CanonicalLevel::Extended, ReportLang::En) => "Extended",
            (CanonicalLevel::Extended, ReportLang::Pt) => "Avançado",
            (CanonicalLevel::Expert, _) => "Expert",
        }
    }

    /// Lowercase substrings that identify this tier in free-form text.
    fn patterns(&self) -> &'static [&'static str] {
        match self {
            CanonicalLevel::Elementary => &[
                "elementar",
                "elementary",
                "básico",
                "basico",
                "basic",
                "beginner",
                "iniciante",
                "a1",
                "a2",
            ],
            CanonicalLevel::PreOperational => &[
                "pré-operacional",
                "pre-operacional",
                "pré operacional",
                "pre-operational",
                "pre operational",
                "preoperational",
                "intermediário",
                "intermediario",
                "intermediate",
                "b1",
            ],
            CanonicalLevel::Operational => &[
                "operacional",
                "operational",
                "conversação",
                "conversacao",
                "conversational",
                "b2",
            ],
            CanonicalLevel::Extended => &[
                "avançado",
                "avancado",
                "advanced",
                "extended",
                "estendido",
                "fluente",
                "fluência",
                "fluencia",
                "fluent",
                "fluency",
                "c1",
            ],
            CanonicalLevel::Expert => &[
                "expert",
                "especialista",
                "nativo",
                "nativa",
                "native",
                "bilíngue",
                "bilingue",
                "bilingual",
                "proficiente",
                "proficient",
                "c2",
            ],
        }
    }
}

/// Matches a free-form proficiency description against the five tiers.
///
/// Exact (case-insensitive) label match in the report language first, then
/// substring containment against each tier's patterns in declaration order.
pub fn match_level(raw: &str, lang: ReportLang) -> Option<CanonicalLevel> {
    let needle = raw.trim().to_lowercase();
    if needle.is_empty() {
        return None;
    }

    if let Some(level) = CanonicalLevel::ALL
        .iter()
        .find(|l| l.label(lang).to_lowercase() == needle)
    {
        return Some(*level);
    }

    CanonicalLevel::ALL
        .iter()
        .find(|l| l.patterns().iter().any(|p| needle.contains(p)))
        .copied()
}

/// Canonical localized label for `raw`, or an empty string when the level is unknown.
pub fn canonicalize(raw: &str, lang: ReportLang) -> String {
    match_level(raw, lang)
        .map(|l| l.label(lang).to_string())
        .unwrap_or_default()
}

#[derive(Debug, Error)]
pub enum LevelTableError {
    #[error("failed to fetch level table: {0}")]
    Fetch(#[from] reqwest::Error),

    #[error("failed to read level table: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed level table: {0}")]
    Csv(#[from] csv::Error),
}

/// One row of the reference table: the same tier titled and described in both languages.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct LevelRow {
    #[serde(default)]
    pub title_pt: String,
    #[serde(default)]
    pub description_pt: String,
    #[serde(default)]
    pub title_en: String,
    #[serde(default)]
    pub description_en: String,
}

impl LevelRow {
    fn title(&self, lang: ReportLang) -> &str {
        match lang {
            ReportLang::Pt => &self.title_pt,
            ReportLang::En => &self.title_en,
        }
    }

    fn description(&self, lang: ReportLang) -> &str {
        match lang {
            ReportLang::Pt => &self.description_pt,
            ReportLang::En => &self.description_en,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LevelDescription {
    pub label: String,
    pub description: String,
}

/// Read-only table of standard level descriptions, loaded once at startup.
#[derive(Debug, Clone, Default)]
pub struct LevelTable {
    rows: Vec<LevelRow>,
}

impl LevelTable {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_rows(rows: Vec<LevelRow>) -> Self {
        Self { rows }
    }

    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Self, LevelTableError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);
        let rows = csv_reader
            .deserialize::<LevelRow>()
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { rows })
    }

    /// Loads the table from an `http(s)://` URL or a local file path.
    pub async fn load(source: &str) -> Result<Self, LevelTableError> {
        let body = if source.starts_with("http://") || source.starts_with("https://") {
            reqwest::get(source)
                .await?
                .error_for_status()?
                .bytes()
                .await?
                .to_vec()
        } else {
            tokio::fs::read(source).await?
        };
        let table = Self::from_csv_reader(body.as_slice())?;
        info!("Loaded {} language level descriptions", table.len());
        Ok(table)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Finds the row whose localized title equals `level`, ignoring case.
    pub fn describe(&self, level: &str, lang: ReportLang) -> Option<LevelDescription> {
        let needle = level.trim().to_lowercase();
        if needle.is_empty() {
            return None;
        }

        let row = self
            .rows
            .iter()
            .find(|r| r.title(lang).trim().to_lowercase() == needle)?;

        Some(LevelDescription {
            label: row.title(lang).trim().to_string(),
            description: row.description(lang).trim().to_string(),
        })
    }
}

/// Canonicalizes a skill's level in place and attaches the reference description.
///
/// When the tiers do not recognize the raw level, it is kept only if it names a
/// table title exactly; otherwise the level stays empty and the skill is kept.
pub fn resolve_language_skill(skill: &mut LanguageSkill, lang: ReportLang, table: &LevelTable) {
    let canonical = canonicalize(&skill.language_level, lang);
    let lookup = if canonical.is_empty() {
        skill.language_level.as_str()
    } else {
        canonical.as_str()
    };

    match table.describe(lookup, lang) {
        Some(found) => {
            skill.language_level = if canonical.is_empty() {
                found.label
            } else {
                canonical
            };
            skill.level_description = found.description;
        }
        None => {
            if canonical.is_empty() && !skill.language_level.trim().is_empty() {
                debug!(
                    "Unrecognized language level '{}' for '{}'",
                    skill.language_level, skill.language
                );
            }
            skill.language_level = canonical;
            skill.level_description = String::new();
        }
    }
}
