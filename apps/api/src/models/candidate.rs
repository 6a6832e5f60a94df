use serde::{Deserialize, Serialize};

/// Language the report is written in. Anything unrecognized falls back to `PT`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", rename_all = "UPPERCASE")]
pub enum ReportLang {
    #[default]
    Pt,
    En,
}

impl ReportLang {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_uppercase().as_str() {
            "EN" | "ENG" | "ENGLISH" => ReportLang::En,
            _ => ReportLang::Pt,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ReportLang::Pt => "PT",
            ReportLang::En => "EN",
        }
    }

    /// The other supported language. CVs are often written in one and reported in the other.
    pub fn other(&self) -> Self {
        match self {
            ReportLang::Pt => ReportLang::En,
            ReportLang::En => ReportLang::Pt,
        }
    }

    /// English name of the language, used when instructing the LLM.
    pub fn english_name(&self) -> &'static str {
        match self {
            ReportLang::Pt => "Brazilian Portuguese",
            ReportLang::En => "English",
        }
    }
}

impl From<String> for ReportLang {
    fn from(raw: String) -> Self {
        ReportLang::parse(&raw)
    }
}

/// One résumé, as extracted and then normalized in place by the report pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CandidateRecord {
    pub company: String,
    pub company_title: String,
    pub cdd_name: String,
    pub cdd_email: String,
    pub cdd_city: String,
    pub cdd_state: String,
    pub cdd_cel: String,
    pub cdd_age: String,
    pub cdd_nationality: String,
    pub abt_background: String,
    pub bhv_profile: String,
    pub job_bond: String,
    pub job_wage: String,
    pub job_variable: String,
    pub job_meal: String,
    pub job_food: String,
    pub job_health: String,
    pub job_dental: String,
    pub job_life: String,
    pub job_pension: String,
    pub job_others: String,
    pub job_expectation: String,
    pub last_company: String,
    pub report_lang: ReportLang,
    pub report_date: String,
    pub line_items: Vec<EmploymentRecord>,
    pub academics: Vec<AcademicRecord>,
    pub languages: Vec<LanguageSkill>,
}

/// One employer and the positions held there.
///
/// `company_start_date`, `company_end_date`, `job_count` and `is_current` are
/// derived by the aggregator and never taken from extraction output.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmploymentRecord {
    pub cdd_company: String,
    pub company_desc: String,
    pub company_start_date: String,
    pub company_end_date: String,
    pub job_count: usize,
    pub is_current: bool,
    pub job_posts: Vec<JobPost>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JobPost {
    pub job_title: String,
    pub start_date: String,
    pub end_date: String,
    pub job_tasks: Vec<Task>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Task {
    pub task: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AcademicRecord {
    pub academic_course: String,
    pub academic_institution: String,
    pub academic_conclusion: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LanguageSkill {
    pub language: String,
    pub language_level: String,
    pub level_description: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_lang_unknown_defaults_to_pt() {
        assert_eq!(ReportLang::parse("es"), ReportLang::Pt);
        assert_eq!(ReportLang::parse(""), ReportLang::Pt);
        assert_eq!(ReportLang::parse(" en "), ReportLang::En);
    }

    #[test]
    fn test_report_lang_serde() {
        let lang: ReportLang = serde_json::from_str(r#""en""#).unwrap();
        assert_eq!(lang, ReportLang::En);
        assert_eq!(serde_json::to_string(&ReportLang::Pt).unwrap(), r#""PT""#);
    }

    #[test]
    fn test_candidate_missing_fields_default() {
        let json = r#"{"cdd_name": "Ana", "line_items": [{"cdd_company": "Acme"}]}"#;
        let record: CandidateRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.cdd_name, "Ana");
        assert_eq!(record.report_lang, ReportLang::Pt);
        assert_eq!(record.line_items[0].job_count, 0);
        assert!(record.line_items[0].job_posts.is_empty());
    }
}
