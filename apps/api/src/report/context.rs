//! Render context, the formatted mapping handed to the document template.

use chrono::NaiveDate;
use serde::Serialize;

use crate::models::candidate::{
    AcademicRecord, CandidateRecord, EmploymentRecord, JobPost, LanguageSkill, Task,
};
use crate::report::aggregate::most_recent_employer;
use crate::report::formatting::{
    capitalize_first, format_caps, format_report_date, smart_title, trim_text,
};

#[derive(Debug, Clone, Copy)]
pub struct ContextOptions {
    /// Character budget for company descriptions.
    pub description_max_chars: usize,
}

impl Default for ContextOptions {
    fn default() -> Self {
        Self {
            description_max_chars: 89,
        }
    }
}

/// Candidate fields formatted for display, plus the template aliases.
#[derive(Debug, Clone, Serialize)]
pub struct RenderContext {
    #[serde(flatten)]
    pub record: CandidateRecord,
    /// Templates address the target position as `job_title`.
    pub job_title: String,
}

impl RenderContext {
    pub fn to_value(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

/// Builds the render context from a normalized, aggregated record. Pure: no I/O,
/// `today` is injected for the report date.
pub fn build_context(
    record: &CandidateRecord,
    options: &ContextOptions,
    today: NaiveDate,
) -> RenderContext {
    let lang = record.report_lang;
    let title = |s: &str| smart_title(s, lang);

    let line_items: Vec<EmploymentRecord> = record
        .line_items
        .iter()
        .map(|item| EmploymentRecord {
            cdd_company: format_caps(&item.cdd_company),
            company_desc: trim_text(
                &capitalize_first(&item.company_desc),
                options.description_max_chars,
            ),
            job_posts: item
                .job_posts
                .iter()
                .map(|job| JobPost {
                    job_title: title(&job.job_title),
                    job_tasks: job
                        .job_tasks
                        .iter()
                        .map(|t| Task {
                            task: capitalize_first(&t.task),
                        })
                        .collect(),
                    ..job.clone()
                })
                .collect(),
            ..item.clone()
        })
        .collect();

    let last_company = most_recent_employer(&line_items)
        .map(|i| line_items[i].cdd_company.clone())
        .unwrap_or_default();

    let academics = record
        .academics
        .iter()
        .map(|a| AcademicRecord {
            academic_course: title(&a.academic_course),
            academic_institution: title(&a.academic_institution),
            academic_conclusion: a.academic_conclusion.trim().to_string(),
        })
        .collect();

    let languages = record
        .languages
        .iter()
        .map(|l| LanguageSkill {
            language: title(&l.language),
            ..l.clone()
        })
        .collect();

    let company_title = title(&record.company_title);

    RenderContext {
        record: CandidateRecord {
            company: format_caps(&record.company),
            company_title: company_title.clone(),
            cdd_name: title(&record.cdd_name),
            cdd_email: record.cdd_email.trim().to_lowercase(),
            cdd_city: title(&record.cdd_city),
            cdd_state: format_caps(&record.cdd_state),
            cdd_nationality: title(&record.cdd_nationality),
            abt_background: capitalize_first(&record.abt_background),
            bhv_profile: capitalize_first(&record.bhv_profile),
            last_company,
            report_date: format_report_date(lang, today),
            line_items,
            academics,
            languages,
            ..record.clone()
        },
        job_title: company_title,
    }
}
