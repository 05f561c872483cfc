use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use clap::ValueEnum;
use serde::Serialize;
use uuid::Uuid;

use crate::dates::parse_flexible_date;

/// Inputs the compliance engine needs from a fellow row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FellowReportConfig {
    pub requires_monthly_reports: bool,
    pub report_start_date: Option<NaiveDate>,
    /// Explicit "Mon YYYY" end month; `None` falls back to the fellow-type default.
    pub report_end_month: Option<String>,
    pub fellow_type: String,
}

impl FellowReportConfig {
    /// Build from raw sheet cells. Unparseable start dates become `None`.
    pub fn from_cells(
        requires_monthly_reports: bool,
        report_start_date: &str,
        report_end_month: &str,
        fellow_type: &str,
    ) -> Self {
        let end = report_end_month.trim();
        Self {
            requires_monthly_reports,
            report_start_date: parse_flexible_date(report_start_date),
            report_end_month: (!end.is_empty()).then(|| end.to_string()),
            fellow_type: fellow_type.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusReport {
    pub month: String,
    pub submitted: bool,
    pub date_submitted: Option<NaiveDate>,
}

/// Ordered "Mon YYYY" keys a fellow owes reports for.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RequiredMonths(Vec<String>);

impl RequiredMonths {
    pub fn new(months: Vec<String>) -> Self {
        Self(months)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, String> {
        self.0.iter()
    }

    pub fn contains(&self, month: &str) -> bool {
        self.0.iter().any(|m| m == month)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ComplianceStatus {
    pub streak: u32,
    pub gift_card_eligible: bool,
    pub at_risk: bool,
    pub reimbursements_paused: bool,
    pub missed_count: u32,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DomainParseError {
    #[error("unknown fellow status '{0}'")]
    Status(String),
    #[error("unknown party '{0}'")]
    Party(String),
    #[error("unknown chamber '{0}'")]
    Chamber(String),
    #[error("unknown check-in type '{0}'")]
    CheckInKind(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum FellowStatus {
    Active,
    Flagged,
    EndingSoon,
}

impl FellowStatus {
    pub fn label(&self) -> &'static str {
        match self {
            FellowStatus::Active => "Active",
            FellowStatus::Flagged => "Flagged",
            FellowStatus::EndingSoon => "Ending Soon",
        }
    }

    /// Lower sorts first in the priority view.
    pub fn priority(&self) -> u8 {
        match self {
            FellowStatus::Flagged => 0,
            FellowStatus::EndingSoon => 1,
            FellowStatus::Active => 2,
        }
    }
}

impl FromStr for FellowStatus {
    type Err = DomainParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "" | "Active" | "on-track" => Ok(Self::Active),
            "Flagged" | "flagged" => Ok(Self::Flagged),
            "Ending Soon" | "ending-soon" => Ok(Self::EndingSoon),
            other => Err(DomainParseError::Status(other.to_string())),
        }
    }
}

impl fmt::Display for FellowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum FellowType {
    CongressionalInnovation,
    SeniorCongressionalInnovation,
    AiSecurity,
}

impl FellowType {
    /// Classify a free-text type label. Empty labels have no type.
    pub fn from_label(label: &str) -> Option<Self> {
        let label = label.trim();
        if label.is_empty() {
            None
        } else if label.contains("Senior") {
            Some(Self::SeniorCongressionalInnovation)
        } else if label.contains("AI Security") {
            Some(Self::AiSecurity)
        } else {
            Some(Self::CongressionalInnovation)
        }
    }

    pub fn short_label(&self) -> &'static str {
        match self {
            FellowType::CongressionalInnovation => "CIF",
            FellowType::SeniorCongressionalInnovation => "Senior CIF",
            FellowType::AiSecurity => "AISF",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Party {
    Democrat,
    Republican,
    Independent,
    InstitutionalOffice,
}

impl Party {
    pub fn label(&self) -> &'static str {
        match self {
            Party::Democrat => "Democrat",
            Party::Republican => "Republican",
            Party::Independent => "Independent",
            Party::InstitutionalOffice => "Institutional Office",
        }
    }
}

impl FromStr for Party {
    type Err = DomainParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "Democrat" => Ok(Self::Democrat),
            "Republican" => Ok(Self::Republican),
            "Independent" => Ok(Self::Independent),
            "Institutional Office" => Ok(Self::InstitutionalOffice),
            other => Err(DomainParseError::Party(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Chamber {
    Senate,
    House,
}

impl Chamber {
    pub fn label(&self) -> &'static str {
        match self {
            Chamber::Senate => "Senate",
            Chamber::House => "House",
        }
    }
}

impl FromStr for Chamber {
    type Err = DomainParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "Senate" => Ok(Self::Senate),
            "House" => Ok(Self::House),
            other => Err(DomainParseError::Chamber(other.to_string())),
        }
    }
}

/// Parse an optional enum cell: blank means unset.
pub fn parse_optional<T: FromStr>(value: &str) -> Result<Option<T>, T::Err> {
    let value = value.trim();
    if value.is_empty() {
        Ok(None)
    } else {
        value.parse().map(Some)
    }
}

#[derive(Debug, Clone)]
pub struct Fellow {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub cohort: String,
    pub fellow_type: Option<FellowType>,
    pub party: Option<Party>,
    pub office: String,
    pub chamber: Option<Chamber>,
    pub linkedin: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub status: FellowStatus,
    pub last_check_in: Option<NaiveDate>,
    pub prior_role: String,
    pub education: String,
    pub notes: String,
    pub report_config: FellowReportConfig,
}

impl Fellow {
    pub fn is_ai_security(&self) -> bool {
        self.fellow_type == Some(FellowType::AiSecurity)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CheckInKind {
    Email,
    Phone,
    Zoom,
    InPerson,
    Slack,
    Text,
}

impl CheckInKind {
    pub fn label(&self) -> &'static str {
        match self {
            CheckInKind::Email => "Email",
            CheckInKind::Phone => "Phone",
            CheckInKind::Zoom => "Zoom",
            CheckInKind::InPerson => "In-person",
            CheckInKind::Slack => "Slack",
            CheckInKind::Text => "Text",
        }
    }
}

impl FromStr for CheckInKind {
    type Err = DomainParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "Email" => Ok(Self::Email),
            "Phone" => Ok(Self::Phone),
            "Zoom" => Ok(Self::Zoom),
            "In-person" => Ok(Self::InPerson),
            "Slack" => Ok(Self::Slack),
            "Text" => Ok(Self::Text),
            other => Err(DomainParseError::CheckInKind(other.to_string())),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CheckIn {
    pub id: Uuid,
    pub fellow_id: Uuid,
    pub date: NaiveDate,
    pub kind: CheckInKind,
    pub notes: String,
    pub staff_member: String,
}
