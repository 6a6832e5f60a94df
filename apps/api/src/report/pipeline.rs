//! Report pipeline: raw extracted JSON in, render context out.
//!
//! Linear and single-pass per request. Only the level table is shared, read-only.

use std::collections::HashSet;

use chrono::NaiveDate;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::{AcademicDateStyle, Config};
use crate::errors::AppError;
use crate::models::candidate::{CandidateRecord, ReportLang};
use crate::report::aggregate::aggregate_employers;
use crate::report::context::{build_context, ContextOptions, RenderContext};
use crate::report::dates::{
    normalize_date, normalize_end_date, normalize_start_date, normalize_year,
};
use crate::report::levels::{resolve_language_skill, LevelTable};
use crate::report::schema::{enforce, CANDIDATE_SCHEMA};
use crate::report::translate::{translate_tree, TranslationGuard, Translator};

/// Per-process report settings, derived once from [`Config`].
#[derive(Debug, Clone)]
pub struct ReportOptions {
    pub academic_date_style: AcademicDateStyle,
    pub description_max_chars: usize,
    pub exempt_keys: HashSet<String>,
}

impl ReportOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            academic_date_style: config.academic_date_style,
            description_max_chars: config.description_max_chars,
            exempt_keys: config.translate_exempt_keys.iter().cloned().collect(),
        }
    }
}

/// Fields the requester supplies alongside the CV. They win over extracted values.
#[derive(Debug, Clone, Default)]
pub struct UserFields {
    pub report_lang: Option<ReportLang>,
    pub company: Option<String>,
    pub company_title: Option<String>,
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

impl UserFields {
    pub fn apply(&self, record: &mut CandidateRecord) {
        if let Some(lang) = self.report_lang {
            record.report_lang = lang;
        }
        if let Some(company) = non_empty(&self.company) {
            record.company = company.to_string();
        }
        if let Some(title) = non_empty(&self.company_title) {
            record.company_title = title.to_string();
        }
    }
}

fn normalize_dates(record: &mut CandidateRecord, style: AcademicDateStyle) {
    let lang = record.report_lang;
    for item in &mut record.line_items {
        for job in &mut item.job_posts {
            let start = normalize_start_date(&job.start_date, lang);
            let end = normalize_end_date(&job.end_date, lang);
            if start != job.start_date.trim() || end != job.end_date.trim() {
                debug!(
                    "Job dates '{}'..'{}' normalized to {start}..{end}",
                    job.start_date, job.end_date
                );
            }
            job.start_date = start;
            job.end_date = end;
        }
    }
    for academic in &mut record.academics {
        academic.academic_conclusion = match style {
            AcademicDateStyle::Year => normalize_year(&academic.academic_conclusion, lang),
            AcademicDateStyle::MonthYear => {
                normalize_date(academic.academic_conclusion.trim(), lang)
            }
        };
    }
}

/// Everything a report run needs besides its input.
pub struct Pipeline<'a> {
    pub levels: &'a LevelTable,
    pub translator: &'a dyn Translator,
    pub guard: &'a TranslationGuard,
    pub options: &'a ReportOptions,
}

impl<'a> Pipeline<'a> {
    /// Schema enforcement, user overrides, date and level normalization, then
    /// per-employer aggregation.
    pub fn normalize(&self, raw: &Value, user: &UserFields) -> Result<CandidateRecord, AppError> {
        let enforced = enforce(raw, &CANDIDATE_SCHEMA);
        let mut record: CandidateRecord = serde_json::from_value(enforced)
            .map_err(|e| AppError::Extraction(format!("candidate record: {e}")))?;

        user.apply(&mut record);
        normalize_dates(&mut record, self.options.academic_date_style);

        let lang = record.report_lang;
        for skill in &mut record.languages {
            resolve_language_skill(skill, lang, self.levels);
        }

        record.line_items = aggregate_employers(std::mem::take(&mut record.line_items));
        Ok(record)
    }

    /// Localizes the record's free-text leaves into its report language.
    pub async fn translate(&self, record: CandidateRecord) -> CandidateRecord {
        let target = record.report_lang;
        let value = match serde_json::to_value(&record) {
            Ok(value) => value,
            Err(e) => {
                warn!("Skipping translation, record not serializable: {e}");
                return record;
            }
        };
        let translated = translate_tree(
            &value,
            target,
            &self.options.exempt_keys,
            self.translator,
            self.guard,
        )
        .await;
        match serde_json::from_value(translated) {
            Ok(record) => record,
            Err(e) => {
                warn!("Discarding translation, result no longer fits the record: {e}");
                record
            }
        }
    }

    pub async fn run(
        &self,
        raw: &Value,
        user: &UserFields,
        translate: bool,
        today: NaiveDate,
    ) -> Result<RenderContext, AppError> {
        let mut record = self.normalize(raw, user)?;
        info!(
            "Normalized candidate: {} employers, {} academics, {} languages",
            record.line_items.len(),
            record.academics.len(),
            record.languages.len()
        );
        if translate {
            record = self.translate(record).await;
        }
        let options = ContextOptions {
            description_max_chars: self.options.description_max_chars,
        };
        Ok(build_context(&record, &options, today))
    }
}

/// `Relatorio_{name}_{YYYYMMDD}.docx`, with the name reduced to filesystem-safe characters.
pub fn output_filename(cdd_name: &str, today: NaiveDate) -> String {
    let name = cdd_name
        .split_whitespace()
        .map(|part| {
            part.chars()
                .filter(|c| c.is_alphanumeric() || *c == '-')
                .collect::<String>()
        })
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("_");
    let name = if name.is_empty() {
        "Candidato".to_string()
    } else {
        name
    };
    format!("Relatorio_{name}_{}.docx", today.format("%Y%m%d"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;

    use crate::report::dates::{ONGOING, SENTINEL_DATE};
    use crate::report::levels::LevelRow;
    use crate::report::translate::TranslateError;

    struct UpperTranslator;

    #[async_trait]
    impl Translator for UpperTranslator {
        async fn translate(
            &self,
            text: &str,
            _target: ReportLang,
        ) -> Result<String, TranslateError> {
            Ok(text.to_uppercase())
        }
    }

    struct FailingTranslator;

    #[async_trait]
    impl Translator for FailingTranslator {
        async fn translate(
            &self,
            _text: &str,
            _target: ReportLang,
        ) -> Result<String, TranslateError> {
            Err(TranslateError::Backend("offline".into()))
        }
    }

    fn options(style: AcademicDateStyle) -> ReportOptions {
        ReportOptions {
            academic_date_style: style,
            description_max_chars: 89,
            exempt_keys: crate::report::translate::default_exempt_keys()
                .into_iter()
                .collect(),
        }
    }

    fn levels() -> LevelTable {
        LevelTable::from_rows(vec![LevelRow {
            title_pt: "Avançado".into(),
            description_pt: "Comunica-se com desenvoltura.".into(),
            title_en: "Extended".into(),
            description_en: "Communicates with ease.".into(),
        }])
    }

    fn raw_candidate() -> Value {
        json!({
            "cdd_name": "ana lima",
            "company": "extracted co",
            "report_lang": "EN",
            "line_items": [
                {
                    "cdd_company": "Employer A",
                    "company_desc": "retail",
                    "job_posts": [
                        {"job_title": "analyst", "start_date": "January 2020", "end_date": "3/2022",
                         "job_tasks": [{"task": "reporting"}]}
                    ]
                },
                {
                    "cdd_company": "Employer B",
                    "company_desc": "bank",
                    "job_posts": [
                        {"job_title": "manager", "start_date": "2022-04", "end_date": "currently",
                         "job_tasks": []}
                    ]
                }
            ],
            "academics": [
                {"academic_course": "economics", "academic_institution": "usp", "academic_conclusion": "Dec 2018"}
            ],
            "languages": [
                {"language": "english", "language_level": "advanced"},
                {"language": "klingon", "language_level": "somewhat"}
            ]
        })
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 2).unwrap()
    }

    #[test]
    fn test_normalize_end_to_end() {
        let levels = levels();
        let opts = options(AcademicDateStyle::Year);
        let pipeline = Pipeline {
            levels: &levels,
            translator: &FailingTranslator,
            guard: &TranslationGuard::default(),
            options: &opts,
        };
        let record = pipeline
            .normalize(&raw_candidate(), &UserFields::default())
            .unwrap();

        assert_eq!(record.report_lang, ReportLang::En);
        let a = &record.line_items[0];
        assert_eq!(a.job_posts[0].start_date, "01/2020");
        assert_eq!(a.job_posts[0].end_date, "03/2022");
        assert_eq!(a.company_start_date, "01/2020");
        assert_eq!(a.company_end_date, "03/2022");
        let b = &record.line_items[1];
        assert_eq!(b.company_start_date, "04/2022");
        assert_eq!(b.company_end_date, ONGOING);
        assert!(b.is_current);
        // empty task list is replaced by the placeholder
        assert_eq!(b.job_posts[0].job_tasks.len(), 1);

        assert_eq!(record.academics[0].academic_conclusion, "2018");

        assert_eq!(record.languages[0].language_level, "Extended");
        assert_eq!(record.languages[0].level_description, "Communicates with ease.");
        assert_eq!(record.languages[1].language_level, "");
        assert_eq!(record.languages[1].level_description, "");
        assert_eq!(record.languages[1].language, "klingon");
    }

    #[test]
    fn test_month_year_academic_style() {
        let levels = LevelTable::empty();
        let opts = options(AcademicDateStyle::MonthYear);
        let pipeline = Pipeline {
            levels: &levels,
            translator: &FailingTranslator,
            guard: &TranslationGuard::default(),
            options: &opts,
        };
        let record = pipeline
            .normalize(&raw_candidate(), &UserFields::default())
            .unwrap();
        assert_eq!(record.academics[0].academic_conclusion, "12/2018");
    }

    #[test]
    fn test_user_fields_override_extraction() {
        let levels = LevelTable::empty();
        let opts = options(AcademicDateStyle::Year);
        let pipeline = Pipeline {
            levels: &levels,
            translator: &FailingTranslator,
            guard: &TranslationGuard::default(),
            options: &opts,
        };
        let user = UserFields {
            report_lang: Some(ReportLang::Pt),
            company: Some("  Cliente SA ".into()),
            company_title: Some("   ".into()),
        };
        let record = pipeline.normalize(&raw_candidate(), &user).unwrap();
        assert_eq!(record.report_lang, ReportLang::Pt);
        assert_eq!(record.company, "Cliente SA");
        assert_eq!(record.company_title, "");
    }

    #[test]
    fn test_garbage_input_still_yields_full_record() {
        let levels = LevelTable::empty();
        let opts = options(AcademicDateStyle::Year);
        let pipeline = Pipeline {
            levels: &levels,
            translator: &FailingTranslator,
            guard: &TranslationGuard::default(),
            options: &opts,
        };
        let record = pipeline
            .normalize(&json!({"line_items": "nope", "cdd_name": ["x"]}), &UserFields::default())
            .unwrap();
        assert_eq!(record.cdd_name, "");
        assert_eq!(record.line_items.len(), 1);
        assert_eq!(record.line_items[0].company_start_date, SENTINEL_DATE);
        assert_eq!(record.report_lang, ReportLang::Pt);
    }

    #[tokio::test]
    async fn test_run_with_translation_keeps_exempt_fields() {
        let levels = LevelTable::empty();
        let opts = options(AcademicDateStyle::Year);
        let pipeline = Pipeline {
            levels: &levels,
            translator: &UpperTranslator,
            guard: &TranslationGuard::default(),
            options: &opts,
        };
        let ctx = pipeline
            .run(&raw_candidate(), &UserFields::default(), true, today())
            .await
            .unwrap();
        let r = &ctx.record;
        assert_eq!(r.last_company, "EMPLOYER B");
        assert_eq!(r.line_items[1].company_end_date, ONGOING);
        assert_eq!(r.line_items[0].job_posts[0].job_tasks[0].task, "REPORTING");
        assert_eq!(r.line_items[0].job_posts[0].start_date, "01/2020");
        assert_eq!(r.cdd_name, "Ana Lima");
        assert_eq!(r.report_date, "2nd May, 2024");
    }

    #[tokio::test]
    async fn test_failed_translation_keeps_original() {
        let levels = LevelTable::empty();
        let opts = options(AcademicDateStyle::Year);
        let pipeline = Pipeline {
            levels: &levels,
            translator: &FailingTranslator,
            guard: &TranslationGuard::default(),
            options: &opts,
        };
        let ctx = pipeline
            .run(&raw_candidate(), &UserFields::default(), true, today())
            .await
            .unwrap();
        assert_eq!(
            ctx.record.line_items[0].job_posts[0].job_tasks[0].task,
            "Reporting"
        );
    }

    #[test]
    fn test_output_filename() {
        let d = NaiveDate::from_ymd_opt(2024, 1, 9).unwrap();
        assert_eq!(
            output_filename("João da Silva", d),
            "Relatorio_João_da_Silva_20240109.docx"
        );
        assert_eq!(output_filename(" ../ ", d), "Relatorio_Candidato_20240109.docx");
    }
}
