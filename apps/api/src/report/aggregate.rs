//! Line-item aggregation: per-employer tenure bounds and the most recent employer.
//!
//! Runs after every job date has been normalized, so it only ever sees canonical
//! `MM/YYYY` values, the ongoing token, or the sentinel.

use std::collections::HashMap;

use chrono::NaiveDate;

use crate::models::candidate::{EmploymentRecord, JobPost};
use crate::report::dates::{parse_month_year, ONGOING, SENTINEL_DATE};

/// Tenure derived from an employer's job posts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmployerBounds {
    pub start: String,
    pub end: String,
    pub is_current: bool,
    pub job_count: usize,
}

/// Computes the employer's bounds: earliest parsed start, and for the end the ongoing
/// token if any job is ongoing, else the latest parsed end. Missing bounds are the sentinel.
pub fn employer_bounds(jobs: &[JobPost]) -> EmployerBounds {
    let is_current = jobs.iter().any(|j| j.end_date == ONGOING);

    let start = jobs
        .iter()
        .filter_map(|j| parse_month_year(&j.start_date))
        .min();

    let end = if is_current {
        ONGOING.to_string()
    } else {
        jobs.iter()
            .filter_map(|j| parse_month_year(&j.end_date))
            .max()
            .map(format_month_year)
            .unwrap_or_else(|| SENTINEL_DATE.to_string())
    };

    EmployerBounds {
        start: start
            .map(format_month_year)
            .unwrap_or_else(|| SENTINEL_DATE.to_string()),
        end,
        is_current,
        job_count: jobs.len(),
    }
}

fn format_month_year(date: NaiveDate) -> String {
    date.format("%m/%Y").to_string()
}

fn employer_key(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Merges line items that name the same employer (case and whitespace insensitive),
/// keeping encounter order. Unnamed items are never merged.
pub fn group_by_employer(items: Vec<EmploymentRecord>) -> Vec<EmploymentRecord> {
    let mut grouped: Vec<EmploymentRecord> = Vec::with_capacity(items.len());
    let mut index: HashMap<String, usize> = HashMap::new();

    for item in items {
        let key = employer_key(&item.cdd_company);
        if key.is_empty() {
            grouped.push(item);
            continue;
        }
        match index.get(&key) {
            Some(&at) => {
                let existing = &mut grouped[at];
                if existing.company_desc.trim().is_empty() {
                    existing.company_desc = item.company_desc;
                }
                existing.job_posts.extend(item.job_posts);
            }
            None => {
                index.insert(key, grouped.len());
                grouped.push(item);
            }
        }
    }

    grouped
}

/// Groups line items per employer and fills in the derived tenure fields.
pub fn aggregate_employers(items: Vec<EmploymentRecord>) -> Vec<EmploymentRecord> {
    group_by_employer(items)
        .into_iter()
        .map(|mut item| {
            let bounds = employer_bounds(&item.job_posts);
            item.company_start_date = bounds.start;
            item.company_end_date = bounds.end;
            item.is_current = bounds.is_current;
            item.job_count = bounds.job_count;
            item
        })
        .collect()
}

/// Total order over employer end dates: unparseable < any date (chronological) < ongoing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum EndRank {
    Unparseable,
    Date(NaiveDate),
    Ongoing,
}

pub fn end_rank(company_end_date: &str) -> EndRank {
    if company_end_date == ONGOING {
        return EndRank::Ongoing;
    }
    parse_month_year(company_end_date)
        .map(EndRank::Date)
        .unwrap_or(EndRank::Unparseable)
}

/// Index of the most recent employer by [`EndRank`]. Ties keep the first one seen.
pub fn most_recent_employer(items: &[EmploymentRecord]) -> Option<usize> {
    let mut best: Option<(usize, EndRank)> = None;
    for (i, item) in items.iter().enumerate() {
        let rank = end_rank(&item.company_end_date);
        let newer = best.map_or(true, |(_, best_rank)| rank > best_rank);
        if newer {
            best = Some((i, rank));
        }
    }
    best.map(|(i, _)| i)
}
