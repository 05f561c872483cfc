use std::cmp::{Ordering, Reverse};

use chrono::NaiveDate;
use clap::ValueEnum;

use crate::models::{Chamber, Fellow, FellowStatus, FellowType, Party};

/// Days without contact before an active fellow is due a check-in.
pub const CHECK_IN_THRESHOLD_DAYS: i64 = 210;

pub fn days_since(date: Option<NaiveDate>, today: NaiveDate) -> Option<i64> {
    date.map(|date| (today - date).num_days())
}

/// Whole calendar days between the two dates. Both sides are dates, so a
/// fellow ending tomorrow is one day out regardless of the time of day.
pub fn days_until(date: Option<NaiveDate>, today: NaiveDate) -> Option<i64> {
    date.map(|date| (date - today).num_days())
}

/// Active, non-AI-Security fellows with no contact in over seven months.
/// A fellow never checked in with counts as overdue.
pub fn needs_check_in(fellow: &Fellow, today: NaiveDate) -> bool {
    if fellow.status != FellowStatus::Active || fellow.is_ai_security() {
        return false;
    }
    days_since(fellow.last_check_in, today).map_or(true, |days| days > CHECK_IN_THRESHOLD_DAYS)
}

/// Chronological key for cohort labels like "January 2025", "Jan 2025" or "2025".
pub fn cohort_sort_key(cohort: &str) -> Option<NaiveDate> {
    let cohort = cohort.trim();
    if cohort.is_empty() {
        return None;
    }
    let padded = format!("1 {cohort}");
    ["%d %B %Y", "%d %b %Y"]
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(&padded, format).ok())
        .or_else(|| {
            if cohort.len() == 4 {
                cohort
                    .parse::<i32>()
                    .ok()
                    .and_then(|year| NaiveDate::from_ymd_opt(year, 1, 1))
            } else {
                None
            }
        })
}

#[derive(Debug, Clone, Default)]
pub struct RosterFilter {
    pub search: Option<String>,
    pub status: Option<FellowStatus>,
    pub fellow_type: Option<FellowType>,
    pub party: Option<Party>,
    pub chamber: Option<Chamber>,
    pub cohort: Option<String>,
}

impl RosterFilter {
    pub fn matches(&self, fellow: &Fellow) -> bool {
        if let Some(term) = self.search.as_deref().map(str::to_lowercase) {
            let hit = [&fellow.name, &fellow.office, &fellow.email]
                .iter()
                .any(|field| field.to_lowercase().contains(&term));
            if !hit {
                return false;
            }
        }

        self.status.map_or(true, |status| fellow.status == status)
            && self.fellow_type.map_or(true, |kind| fellow.fellow_type == Some(kind))
            && self.party.map_or(true, |party| fellow.party == Some(party))
            && self.chamber.map_or(true, |chamber| fellow.chamber == Some(chamber))
            && self
                .cohort
                .as_deref()
                .map_or(true, |cohort| fellow.cohort == cohort)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum RosterSort {
    /// Flagged first, then ending soon, longest without contact first
    Priority,
    NameAsc,
    NameDesc,
    LastCheckInOldest,
    LastCheckInNewest,
    EndDateSoonest,
    EndDateLatest,
    #[default]
    CohortNewest,
    CohortOldest,
}

/// Sort with missing values last regardless of direction.
fn cmp_missing_last<T: Ord>(a: Option<T>, b: Option<T>, descending: bool) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) if descending => b.cmp(&a),
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

pub fn filter_and_sort<'a>(
    fellows: &'a [Fellow],
    filter: &RosterFilter,
    sort: RosterSort,
    today: NaiveDate,
) -> Vec<&'a Fellow> {
    let mut selected: Vec<&Fellow> = fellows.iter().filter(|f| filter.matches(f)).collect();

    match sort {
        RosterSort::Priority => selected.sort_by_key(|f| {
            // unknown contact sorts as the longest wait
            let waited = days_since(f.last_check_in, today).unwrap_or(i64::MAX);
            (f.status.priority(), Reverse(waited))
        }),
        RosterSort::NameAsc => selected.sort_by_key(|f| f.name.to_lowercase()),
        RosterSort::NameDesc => selected.sort_by_key(|f| Reverse(f.name.to_lowercase())),
        // never checked in sorts ahead of the oldest contact
        RosterSort::LastCheckInOldest => selected.sort_by_key(|f| f.last_check_in),
        RosterSort::LastCheckInNewest => selected.sort_by_key(|f| Reverse(f.last_check_in)),
        RosterSort::EndDateSoonest => {
            selected.sort_by(|a, b| cmp_missing_last(a.end_date, b.end_date, false))
        }
        RosterSort::EndDateLatest => {
            selected.sort_by(|a, b| cmp_missing_last(a.end_date, b.end_date, true))
        }
        RosterSort::CohortNewest => selected.sort_by_key(|f| Reverse(cohort_sort_key(&f.cohort))),
        RosterSort::CohortOldest => selected.sort_by_key(|f| cohort_sort_key(&f.cohort)),
    }

    selected
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DashboardStats {
    pub total: usize,
    pub active: usize,
    pub flagged: usize,
    pub ending_soon: usize,
    pub needs_check_in: usize,
}

pub fn dashboard_stats(fellows: &[Fellow], today: NaiveDate) -> DashboardStats {
    let count = |status: FellowStatus| fellows.iter().filter(|f| f.status == status).count();

    DashboardStats {
        total: fellows.len(),
        active: count(FellowStatus::Active),
        flagged: count(FellowStatus::Flagged),
        ending_soon: count(FellowStatus::EndingSoon),
        needs_check_in: fellows.iter().filter(|f| needs_check_in(f, today)).count(),
    }
}

pub fn cohorts(fellows: &[Fellow]) -> Vec<String> {
    let mut cohorts: Vec<String> = fellows
        .iter()
        .map(|f| f.cohort.clone())
        .filter(|c| !c.is_empty())
        .collect();
    cohorts.sort();
    cohorts.dedup();
    cohorts.sort_by_key(|c| Reverse(cohort_sort_key(c)));
    cohorts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FellowReportConfig;
    use uuid::Uuid;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn fellow(name: &str, status: FellowStatus, last_check_in: Option<NaiveDate>) -> Fellow {
        Fellow {
            id: Uuid::new_v4(),
            name: name.to_string(),
            email: format!("{}@example.com", name.to_lowercase().replace(' ', ".")),
            phone: String::new(),
            cohort: "2026".to_string(),
            fellow_type: Some(FellowType::CongressionalInnovation),
            party: None,
            office: String::new(),
            chamber: None,
            linkedin: String::new(),
            start_date: None,
            end_date: None,
            status,
            last_check_in,
            prior_role: String::new(),
            education: String::new(),
            notes: String::new(),
            report_config: FellowReportConfig::default(),
        }
    }

    #[test]
    fn check_in_due_after_threshold_or_never() {
        let today = date(2026, 10, 1);
        let recent = fellow("Avery Lee", FellowStatus::Active, Some(date(2026, 6, 1)));
        let stale = fellow("Jules Moreno", FellowStatus::Active, Some(date(2026, 1, 2)));
        let never = fellow("Kiara Patel", FellowStatus::Active, None);

        assert!(!needs_check_in(&recent, today));
        assert!(needs_check_in(&stale, today));
        assert!(needs_check_in(&never, today));

        let mut aisf = never.clone();
        aisf.fellow_type = Some(FellowType::AiSecurity);
        assert!(!needs_check_in(&aisf, today));

        let flagged = fellow("Sam Ortiz", FellowStatus::Flagged, None);
        assert!(!needs_check_in(&flagged, today));
    }

    #[test]
    fn day_counts_handle_unknown_dates() {
        let today = date(2026, 3, 10);
        assert_eq!(days_since(Some(date(2026, 3, 1)), today), Some(9));
        assert_eq!(days_until(Some(date(2026, 3, 20)), today), Some(10));
        assert_eq!(days_since(None, today), None);
    }

    #[test]
    fn days_until_counts_whole_calendar_days() {
        let today = date(2026, 12, 17);
        assert_eq!(days_until(Some(date(2026, 12, 18)), today), Some(1));
        assert_eq!(days_until(Some(today), today), Some(0));
        assert_eq!(days_until(Some(date(2026, 12, 16)), today), Some(-1));
        assert_eq!(days_until(Some(date(2027, 1, 1)), today), Some(15));
    }

    #[test]
    fn cohort_keys_accept_month_year_and_year() {
        assert_eq!(cohort_sort_key("January 2025"), Some(date(2025, 1, 1)));
        assert_eq!(cohort_sort_key("Sep 2024"), Some(date(2024, 9, 1)));
        assert_eq!(cohort_sort_key("2026"), Some(date(2026, 1, 1)));
        assert_eq!(cohort_sort_key("Spring"), None);
    }

    #[test]
    fn priority_puts_flagged_then_longest_wait_first() {
        let today = date(2026, 10, 1);
        let fellows = vec![
            fellow("Active Recent", FellowStatus::Active, Some(date(2026, 9, 1))),
            fellow("Active Stale", FellowStatus::Active, Some(date(2026, 1, 1))),
            fellow("Ending", FellowStatus::EndingSoon, Some(date(2026, 9, 1))),
            fellow("Flagged", FellowStatus::Flagged, Some(date(2026, 9, 1))),
        ];

        let sorted = filter_and_sort(&fellows, &RosterFilter::default(), RosterSort::Priority, today);
        let names: Vec<&str> = sorted.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, ["Flagged", "Ending", "Active Stale", "Active Recent"]);
    }

    #[test]
    fn filters_combine_search_and_status() {
        let today = date(2026, 10, 1);
        let fellows = vec![
            fellow("Avery Lee", FellowStatus::Active, None),
            fellow("Avery Stone", FellowStatus::Flagged, None),
            fellow("Jules Moreno", FellowStatus::Flagged, None),
        ];
        let filter = RosterFilter {
            search: Some("AVERY".to_string()),
            status: Some(FellowStatus::Flagged),
            ..RosterFilter::default()
        };

        let sorted = filter_and_sort(&fellows, &filter, RosterSort::NameAsc, today);
        assert_eq!(sorted.len(), 1);
        assert_eq!(sorted[0].name, "Avery Stone");
    }

    #[test]
    fn missing_end_dates_sort_last_both_ways() {
        let today = date(2026, 10, 1);
        let mut early = fellow("Early", FellowStatus::Active, None);
        early.end_date = Some(date(2026, 11, 1));
        let mut late = fellow("Late", FellowStatus::Active, None);
        late.end_date = Some(date(2027, 2, 1));
        let open = fellow("Open", FellowStatus::Active, None);
        let fellows = vec![open, late, early];

        let soonest = filter_and_sort(&fellows, &RosterFilter::default(), RosterSort::EndDateSoonest, today);
        let names: Vec<&str> = soonest.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, ["Early", "Late", "Open"]);

        let latest = filter_and_sort(&fellows, &RosterFilter::default(), RosterSort::EndDateLatest, today);
        let names: Vec<&str> = latest.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, ["Late", "Early", "Open"]);
    }

    #[test]
    fn stats_count_each_status() {
        let today = date(2026, 10, 1);
        let fellows = vec![
            fellow("A", FellowStatus::Active, Some(date(2026, 9, 1))),
            fellow("B", FellowStatus::Active, None),
            fellow("C", FellowStatus::Flagged, None),
            fellow("D", FellowStatus::EndingSoon, None),
        ];

        let stats = dashboard_stats(&fellows, today);
        assert_eq!(
            stats,
            DashboardStats {
                total: 4,
                active: 2,
                flagged: 1,
                ending_soon: 1,
                needs_check_in: 1,
            }
        );
    }

    #[test]
    fn cohorts_are_distinct_and_newest_first() {
        let mut a = fellow("A", FellowStatus::Active, None);
        a.cohort = "January 2025".to_string();
        let mut b = fellow("B", FellowStatus::Active, None);
        b.cohort = "2026".to_string();
        let c = fellow("C", FellowStatus::Active, None);

        assert_eq!(cohorts(&[a, b, c]), ["2026", "January 2025"]);
    }
}
