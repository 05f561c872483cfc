use std::collections::HashSet;

use chrono::NaiveDate;
use serde::Serialize;

use crate::dates::MonthKey;
use crate::models::{ComplianceStatus, FellowReportConfig, RequiredMonths, StatusReport};

/// End months the reporting program currently recognizes.
const RECOGNIZED_END_MONTHS: [(&str, i32, u32); 11] = [
    ("Feb 2026", 2026, 2),
    ("Mar 2026", 2026, 3),
    ("Apr 2026", 2026, 4),
    ("May 2026", 2026, 5),
    ("Jun 2026", 2026, 6),
    ("Jul 2026", 2026, 7),
    ("Aug 2026", 2026, 8),
    ("Sep 2026", 2026, 9),
    ("Oct 2026", 2026, 10),
    ("Nov 2026", 2026, 11),
    ("Dec 2026", 2026, 12),
];

const SENIOR_DEFAULT_END_MONTH: &str = "Nov 2026";
const STANDARD_DEFAULT_END_MONTH: &str = "Sep 2026";

pub const GIFT_CARD_STREAK: u32 = 3;
pub const PAUSE_MISSED_COUNT: u32 = 2;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScheduleWarning {
    #[error("report end month '{0}' is not a recognized program month; no reports will be required")]
    UnrecognizedEndMonth(String),
}

/// Resolved reporting window for one fellow.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportSchedule {
    pub end_month: Option<String>,
    pub months: RequiredMonths,
    pub warning: Option<ScheduleWarning>,
}

/// The configured end month, or the fellow-type default when none is set.
pub fn resolve_end_month(config: &FellowReportConfig) -> &str {
    match config.report_end_month.as_deref() {
        Some(month) if !month.is_empty() => month,
        _ if config.fellow_type.contains("Senior") => SENIOR_DEFAULT_END_MONTH,
        _ => STANDARD_DEFAULT_END_MONTH,
    }
}

fn recognized_end_month(label: &str) -> Option<MonthKey> {
    RECOGNIZED_END_MONTHS
        .iter()
        .find(|(key, _, _)| *key == label)
        .and_then(|(_, year, month)| MonthKey::new(*year, *month))
}

/// Work out the reporting window, keeping any configuration problem visible.
pub fn resolve_schedule(config: &FellowReportConfig) -> ReportSchedule {
    if !config.requires_monthly_reports {
        return ReportSchedule::default();
    }
    let Some(start_date) = config.report_start_date else {
        return ReportSchedule::default();
    };

    let end_label = resolve_end_month(config).to_string();
    let Some(end) = recognized_end_month(&end_label) else {
        return ReportSchedule {
            warning: Some(ScheduleWarning::UnrecognizedEndMonth(end_label.clone())),
            end_month: Some(end_label),
            months: RequiredMonths::default(),
        };
    };

    let mut months = Vec::new();
    let mut current = MonthKey::from_date(start_date);
    while current <= end {
        months.push(current.to_string());
        current = current.next();
    }

    ReportSchedule {
        end_month: Some(end_label),
        months: RequiredMonths::new(months),
        warning: None,
    }
}

/// Months a fellow owes a report for, oldest first.
///
/// Fellows outside the program, without a usable start date, or with an end
/// month outside the recognized table owe nothing.
pub fn derive_required_months(config: &FellowReportConfig) -> RequiredMonths {
    let schedule = resolve_schedule(config);
    if let Some(warning) = &schedule.warning {
        tracing::warn!(fellow_type = %config.fellow_type, "{warning}");
    }
    schedule.months
}

fn submitted_months(reports: &[StatusReport]) -> HashSet<&str> {
    reports
        .iter()
        .filter(|report| report.submitted)
        .map(|report| report.month.as_str())
        .collect()
}

/// Required months whose last day falls strictly before `now`.
/// Keys that do not parse are left out.
fn past_months<'a>(required_months: &'a RequiredMonths, now: NaiveDate) -> Vec<&'a str> {
    required_months
        .iter()
        .filter(|month| {
            MonthKey::parse(month)
                .and_then(|key| key.last_day())
                .is_some_and(|last_day| last_day < now)
        })
        .map(String::as_str)
        .collect()
}

pub fn calculate_compliance(
    reports: &[StatusReport],
    required_months: &RequiredMonths,
    now: NaiveDate,
) -> ComplianceStatus {
    if required_months.is_empty() {
        return ComplianceStatus::default();
    }

    let submitted = submitted_months(reports);
    let past = past_months(required_months, now);

    let streak = past
        .iter()
        .rev()
        .take_while(|month| submitted.contains(*month))
        .count() as u32;
    let missed_count = past
        .iter()
        .rev()
        .take_while(|month| !submitted.contains(*month))
        .count() as u32;

    ComplianceStatus {
        streak,
        gift_card_eligible: streak >= GIFT_CARD_STREAK,
        at_risk: missed_count == 1,
        reimbursements_paused: missed_count >= PAUSE_MISSED_COUNT,
        missed_count,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum MonthState {
    Submitted { date_submitted: Option<NaiveDate> },
    Overdue,
    Due,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthEntry {
    pub month: String,
    pub due: NaiveDate,
    #[serde(flatten)]
    pub state: MonthState,
}

/// Month-by-month view of a fellow's obligations. When a month has several
/// submitted rows, the last one in `reports` supplies the submission date.
pub fn month_checklist(
    reports: &[StatusReport],
    required_months: &RequiredMonths,
    now: NaiveDate,
) -> Vec<MonthEntry> {
    required_months
        .iter()
        .filter_map(|month| {
            let due = MonthKey::parse(month)?.last_day()?;
            let submitted = reports
                .iter()
                .rev()
                .find(|report| report.submitted && report.month == *month);

            let state = match submitted {
                Some(report) => MonthState::Submitted {
                    date_submitted: report.date_submitted,
                },
                None if due < now => MonthState::Overdue,
                None => MonthState::Due,
            };

            Some(MonthEntry {
                month: month.clone(),
                due,
                state,
            })
        })
        .collect()
}
