use std::collections::HashMap;
use std::fmt::Write;

use chrono::NaiveDate;
use serde::Serialize;
use uuid::Uuid;

use crate::compliance::{self, ScheduleWarning};
use crate::models::{ComplianceStatus, Fellow, RequiredMonths, StatusReport};
use crate::roster;

#[derive(Debug, Clone, Serialize)]
pub struct FellowCompliance {
    pub fellow_id: Uuid,
    pub name: String,
    pub email: String,
    pub cohort: String,
    pub end_month: Option<String>,
    pub required_months: RequiredMonths,
    pub status: ComplianceStatus,
    pub warning: Option<String>,
}

pub fn assess_fellow(fellow: &Fellow, reports: &[StatusReport], now: NaiveDate) -> FellowCompliance {
    let schedule = compliance::resolve_schedule(&fellow.report_config);
    if let Some(warning) = &schedule.warning {
        tracing::warn!(fellow = %fellow.email, "{warning}");
    }
    let status = compliance::calculate_compliance(reports, &schedule.months, now);

    FellowCompliance {
        fellow_id: fellow.id,
        name: fellow.name.clone(),
        email: fellow.email.clone(),
        cohort: fellow.cohort.clone(),
        end_month: schedule.end_month,
        required_months: schedule.months,
        status,
        warning: schedule.warning.as_ref().map(ScheduleWarning::to_string),
    }
}

/// Assess every enrolled fellow, most urgent first.
pub fn assess_roster(
    fellows: &[Fellow],
    reports: &HashMap<Uuid, Vec<StatusReport>>,
    now: NaiveDate,
) -> Vec<FellowCompliance> {
    let mut assessed: Vec<FellowCompliance> = fellows
        .iter()
        .filter(|fellow| fellow.report_config.requires_monthly_reports)
        .map(|fellow| {
            let history = reports.get(&fellow.id).map(Vec::as_slice).unwrap_or_default();
            assess_fellow(fellow, history, now)
        })
        .collect();

    assessed.sort_by(|a, b| {
        b.status
            .missed_count
            .cmp(&a.status.missed_count)
            .then_with(|| a.status.streak.cmp(&b.status.streak))
            .then_with(|| a.name.cmp(&b.name))
    });
    assessed
}

pub fn status_badges(status: &ComplianceStatus) -> Vec<String> {
    let mut badges = Vec::new();
    if status.streak > 0 {
        badges.push(format!("streak {}", status.streak));
    }
    if status.gift_card_eligible {
        badges.push("gift card earned".to_string());
    }
    if status.at_risk {
        badges.push("at risk".to_string());
    }
    if status.reimbursements_paused {
        badges.push("reimbursements paused".to_string());
    }
    badges
}

fn write_section<'a>(
    output: &mut String,
    title: &str,
    empty: &str,
    entries: impl Iterator<Item = &'a FellowCompliance>,
) {
    let _ = writeln!(output);
    let _ = writeln!(output, "## {title}");

    let mut wrote = false;
    for entry in entries {
        wrote = true;
        let _ = writeln!(
            output,
            "- {} ({}, {}) streak {}, missed {}",
            entry.name, entry.email, entry.cohort, entry.status.streak, entry.status.missed_count
        );
    }
    if !wrote {
        let _ = writeln!(output, "{empty}");
    }
}

pub fn build_report(
    cohort: Option<&str>,
    now: NaiveDate,
    fellows: &[Fellow],
    reports: &HashMap<Uuid, Vec<StatusReport>>,
) -> String {
    let assessed = assess_roster(fellows, reports, now);
    let stats = roster::dashboard_stats(fellows, now);

    let mut output = String::new();
    let cohort_label = cohort.unwrap_or("all cohorts");

    let _ = writeln!(output, "# Monthly Report Compliance");
    let _ = writeln!(output, "Generated for {} as of {}", cohort_label, now);
    let _ = writeln!(output);
    let _ = writeln!(output, "## Summary");
    let _ = writeln!(
        output,
        "- {} fellows ({} active, {} flagged, {} ending soon)",
        stats.total, stats.active, stats.flagged, stats.ending_soon
    );
    let _ = writeln!(output, "- {} enrolled in monthly reports", assessed.len());
    let _ = writeln!(
        output,
        "- {} gift card eligible, {} at risk, {} with reimbursements paused",
        assessed.iter().filter(|a| a.status.gift_card_eligible).count(),
        assessed.iter().filter(|a| a.status.at_risk).count(),
        assessed.iter().filter(|a| a.status.reimbursements_paused).count(),
    );
    let _ = writeln!(output, "- {} need a check-in", stats.needs_check_in);

    write_section(
        &mut output,
        "Reimbursements Paused",
        "No fellows have two or more consecutive missed reports.",
        assessed.iter().filter(|a| a.status.reimbursements_paused),
    );
    write_section(
        &mut output,
        "At Risk",
        "No fellows missed last month's report.",
        assessed.iter().filter(|a| a.status.at_risk),
    );
    write_section(
        &mut output,
        "Gift Card Eligible",
        "No fellows have a streak of three or more.",
        assessed.iter().filter(|a| a.status.gift_card_eligible),
    );

    let warnings: Vec<&FellowCompliance> = assessed.iter().filter(|a| a.warning.is_some()).collect();
    if !warnings.is_empty() {
        let _ = writeln!(output);
        let _ = writeln!(output, "## Configuration Warnings");
        for entry in warnings {
            let _ = writeln!(
                output,
                "- {} ({}): {}",
                entry.name,
                entry.email,
                entry.warning.as_deref().unwrap_or_default()
            );
        }
    }

    let mut overdue: Vec<&Fellow> = fellows
        .iter()
        .filter(|f| roster::needs_check_in(f, now))
        .collect();
    overdue.sort_by_key(|f| f.last_check_in);
    let _ = writeln!(output);
    let _ = writeln!(output, "## Needs Check-in");
    if overdue.is_empty() {
        let _ = writeln!(output, "Every active fellow was contacted in the last seven months.");
    } else {
        for fellow in overdue {
            let last = fellow
                .last_check_in
                .map(|date| date.to_string())
                .unwrap_or_else(|| "never".to_string());
            let _ = writeln!(output, "- {} ({}) last check-in {}", fellow.name, fellow.email, last);
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FellowReportConfig, FellowStatus, FellowType};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn enrolled(name: &str, end_month: Option<&str>) -> Fellow {
        Fellow {
            id: Uuid::new_v4(),
            name: name.to_string(),
            email: format!("{}@example.com", name.to_lowercase()),
            phone: String::new(),
            cohort: "January 2026".to_string(),
            fellow_type: Some(FellowType::CongressionalInnovation),
            party: None,
            office: String::new(),
            chamber: None,
            linkedin: String::new(),
            start_date: None,
            end_date: None,
            status: FellowStatus::Active,
            last_check_in: Some(date(2026, 6, 1)),
            prior_role: String::new(),
            education: String::new(),
            notes: String::new(),
            report_config: FellowReportConfig {
                requires_monthly_reports: true,
                report_start_date: Some(date(2026, 2, 1)),
                report_end_month: end_month.map(str::to_string),
                fellow_type: "Congressional Innovation Fellow".to_string(),
            },
        }
    }

    fn submitted(months: &[&str]) -> Vec<StatusReport> {
        months
            .iter()
            .map(|month| StatusReport {
                month: month.to_string(),
                submitted: true,
                date_submitted: None,
            })
            .collect()
    }

    #[test]
    fn roster_assessment_orders_by_missed_reports() {
        let steady = enrolled("Steady", None);
        let lapsed = enrolled("Lapsed", None);
        let mut reports = HashMap::new();
        reports.insert(steady.id, submitted(&["Feb 2026", "Mar 2026", "Apr 2026", "May 2026"]));
        reports.insert(lapsed.id, submitted(&["Feb 2026", "Mar 2026"]));

        let assessed = assess_roster(&[steady, lapsed], &reports, date(2026, 6, 15));
        assert_eq!(assessed[0].name, "Lapsed");
        assert!(assessed[0].status.reimbursements_paused);
        assert_eq!(assessed[1].status.streak, 4);
    }

    #[test]
    fn report_lists_each_bucket_and_warnings() {
        let steady = enrolled("Steady", None);
        let misconfigured = enrolled("Odd", Some("Jan 2030"));
        let mut reports = HashMap::new();
        reports.insert(steady.id, submitted(&["Feb 2026", "Mar 2026", "Apr 2026"]));

        let report = build_report(None, date(2026, 6, 15), &[steady, misconfigured], &reports);

        assert!(report.contains("Generated for all cohorts as of 2026-06-15"));
        assert!(report.contains("## At Risk\n- Steady"));
        assert!(report.contains("## Configuration Warnings"));
        assert!(report.contains("'Jan 2030'"));
        assert!(report.contains("No fellows have a streak of three or more."));
    }

    #[test]
    fn badges_follow_status_flags() {
        let status = ComplianceStatus {
            streak: 3,
            gift_card_eligible: true,
            ..ComplianceStatus::default()
        };
        assert_eq!(status_badges(&status), ["streak 3", "gift card earned"]);
        assert!(status_badges(&ComplianceStatus::default()).is_empty());
    }
}
