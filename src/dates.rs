use std::fmt;

use chrono::{Datelike, NaiveDate};

const MONTH_ABBREVIATIONS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// Parse a date cell the way the spreadsheet may render it.
///
/// Tries ISO `YYYY-MM-DD` first, then U.S. slash forms (`MM/DD/YYYY`,
/// `M/D/YYYY`, `MM/DD/YY`, `M/D/YY`). Empty or unrecognized text yields `None`.
pub fn parse_flexible_date(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return Some(date);
    }

    // chrono's %Y happily reads "26" as year 26, so pick the year width up front.
    let year_part = text.rsplit('/').next()?;
    let format = match year_part.len() {
        4 => "%m/%d/%Y",
        2 => "%m/%d/%y",
        _ => return None,
    };

    NaiveDate::parse_from_str(text, format).ok()
}

/// Normalize a boolean-like sheet cell ("TRUE", "1", "YES").
pub fn parse_sheet_bool(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_uppercase().as_str(),
        "TRUE" | "1" | "YES"
    )
}

/// A calendar month, rendered as the canonical "Mon YYYY" key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MonthKey {
    year: i32,
    month: u32,
}

impl MonthKey {
    pub fn new(year: i32, month: u32) -> Option<Self> {
        (1..=12).contains(&month).then_some(Self { year, month })
    }

    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    /// Parse a "Mon YYYY" key. Case-insensitive on the month name.
    pub fn parse(key: &str) -> Option<Self> {
        let (name, year) = key.trim().split_once(' ')?;
        let year = year.trim();
        if year.len() != 4 || !year.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }

        let month = MONTH_ABBREVIATIONS
            .iter()
            .position(|abbr| abbr.eq_ignore_ascii_case(name))?;

        Self::new(year.parse().ok()?, month as u32 + 1)
    }

    pub fn next(&self) -> Self {
        if self.month == 12 {
            Self {
                year: self.year + 1,
                month: 1,
            }
        } else {
            Self {
                year: self.year,
                month: self.month + 1,
            }
        }
    }

    pub fn first_day(&self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month, 1)
    }

    pub fn last_day(&self) -> Option<NaiveDate> {
        self.next().first_day()?.pred_opt()
    }
}

impl fmt::Display for MonthKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = MONTH_ABBREVIATIONS[(self.month - 1) as usize];
        write!(f, "{} {}", name, self.year)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn accepts_iso_and_us_slash_forms() {
        let expected = Some(date(2026, 3, 5));
        assert_eq!(parse_flexible_date("2026-03-05"), expected);
        assert_eq!(parse_flexible_date("03/05/2026"), expected);
        assert_eq!(parse_flexible_date("3/5/2026"), expected);
        assert_eq!(parse_flexible_date("03/05/26"), expected);
        assert_eq!(parse_flexible_date("3/5/26"), expected);
        assert_eq!(parse_flexible_date(" 2026-03-05 "), expected);
    }

    #[test]
    fn rejects_empty_and_garbage() {
        assert_eq!(parse_flexible_date(""), None);
        assert_eq!(parse_flexible_date("   "), None);
        assert_eq!(parse_flexible_date("not-a-date"), None);
        assert_eq!(parse_flexible_date("13/40/2026"), None);
        assert_eq!(parse_flexible_date("3/5/226"), None);
    }

    #[test]
    fn sheet_bools_follow_cell_conventions() {
        assert!(parse_sheet_bool("TRUE"));
        assert!(parse_sheet_bool("true"));
        assert!(parse_sheet_bool(" yes "));
        assert!(parse_sheet_bool("1"));
        assert!(!parse_sheet_bool("FALSE"));
        assert!(!parse_sheet_bool(""));
    }

    #[test]
    fn month_keys_round_trip_through_display() {
        let key = MonthKey::parse("Mar 2026").unwrap();
        assert_eq!(key, MonthKey::new(2026, 3).unwrap());
        assert_eq!(key.to_string(), "Mar 2026");
        assert_eq!(MonthKey::parse("sep 2026").unwrap().to_string(), "Sep 2026");
        assert_eq!(MonthKey::parse("March 2026"), None);
        assert_eq!(MonthKey::parse("Mar 26"), None);
        assert_eq!(MonthKey::parse(""), None);
    }

    #[test]
    fn december_rolls_into_next_year() {
        let dec = MonthKey::new(2026, 12).unwrap();
        assert_eq!(dec.next(), MonthKey::new(2027, 1).unwrap());
        assert_eq!(dec.last_day(), Some(date(2026, 12, 31)));
        assert_eq!(MonthKey::new(2028, 2).unwrap().last_day(), Some(date(2028, 2, 29)));
        assert_eq!(MonthKey::new(2026, 13), None);
    }
}
