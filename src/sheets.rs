use std::io::Read;

use serde::Deserialize;
use uuid::Uuid;

use crate::dates::{parse_flexible_date, parse_sheet_bool};
use crate::models::{
    parse_optional, DomainParseError, Fellow, FellowReportConfig, FellowType, StatusReport,
};

/// Failures while reading a spreadsheet tab export.
#[derive(Debug, thiserror::Error)]
pub enum SheetImportError {
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error("row {row}: invalid id '{value}'")]
    InvalidId { row: usize, value: String },
    #[error("row {row}: missing fellow id")]
    MissingFellowId { row: usize },
    #[error("row {row}: {source}")]
    Domain {
        row: usize,
        #[source]
        source: DomainParseError,
    },
}

/// One row of the Fellows tab, keyed by the sheet's header names.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FellowRow {
    #[serde(rename = "ID")]
    id: String,
    #[serde(rename = "Name")]
    name: String,
    #[serde(rename = "Email")]
    email: String,
    #[serde(rename = "Phone Number")]
    phone: String,
    #[serde(rename = "Cohort")]
    cohort: String,
    #[serde(rename = "Fellow Type")]
    fellow_type: String,
    #[serde(rename = "Party")]
    party: String,
    #[serde(rename = "Office")]
    office: String,
    #[serde(rename = "Chamber")]
    chamber: String,
    #[serde(rename = "LinkedIn")]
    linkedin: String,
    #[serde(rename = "Start Date")]
    start_date: String,
    #[serde(rename = "End Date")]
    end_date: String,
    #[serde(rename = "Status")]
    status: String,
    #[serde(rename = "Last Check-in")]
    last_check_in: String,
    #[serde(rename = "Prior Role")]
    prior_role: String,
    #[serde(rename = "Education")]
    education: String,
    #[serde(rename = "Notes")]
    notes: String,
    #[serde(rename = "Requires Monthly Reports")]
    requires_monthly_reports: String,
    #[serde(rename = "Report Start Date")]
    report_start_date: String,
    #[serde(rename = "Report End Month")]
    report_end_month: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct StatusReportRow {
    #[serde(rename = "ID")]
    id: String,
    #[serde(rename = "Fellow ID")]
    fellow_id: String,
    #[serde(rename = "Month")]
    month: String,
    #[serde(rename = "Submitted")]
    submitted: String,
    #[serde(rename = "Date Submitted")]
    date_submitted: String,
    #[serde(rename = "Notes")]
    notes: String,
}

#[derive(Debug, Clone)]
pub struct SheetFellow {
    pub fellow: Fellow,
    /// False when the ID cell was blank and the id was derived from the email.
    pub has_sheet_id: bool,
}

#[derive(Debug, Clone)]
pub struct SheetStatusReport {
    pub id: Uuid,
    pub fellow_id: Uuid,
    pub report: StatusReport,
    pub notes: String,
}

fn parse_id(row: usize, value: &str) -> Result<Option<Uuid>, SheetImportError> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }
    Uuid::parse_str(value)
        .map(Some)
        .map_err(|_| SheetImportError::InvalidId {
            row,
            value: value.to_string(),
        })
}

fn domain(row: usize) -> impl Fn(DomainParseError) -> SheetImportError {
    move |source| SheetImportError::Domain { row, source }
}

fn fellow_id_from_email(email: &str) -> Uuid {
    let name = format!("mailto:{}", email.trim().to_lowercase());
    Uuid::new_v5(&Uuid::NAMESPACE_URL, name.as_bytes())
}

/// Read a Fellows tab export. Rows without an ID get one derived from the
/// email, so the same sheet reads back with the same ids.
pub fn read_fellows<R: Read>(reader: R) -> Result<Vec<SheetFellow>, SheetImportError> {
    let mut reader = csv::Reader::from_reader(reader);
    let mut fellows = Vec::new();

    for (index, result) in reader.deserialize::<FellowRow>().enumerate() {
        // header is line 1
        let row_number = index + 2;
        let row = result?;

        let sheet_id = parse_id(row_number, &row.id)?;
        let id = sheet_id.unwrap_or_else(|| fellow_id_from_email(&row.email));
        let report_config = FellowReportConfig::from_cells(
            parse_sheet_bool(&row.requires_monthly_reports),
            &row.report_start_date,
            &row.report_end_month,
            &row.fellow_type,
        );

        let fellow = Fellow {
            id,
            fellow_type: FellowType::from_label(&row.fellow_type),
            party: parse_optional(&row.party).map_err(domain(row_number))?,
            chamber: parse_optional(&row.chamber).map_err(domain(row_number))?,
            status: row.status.parse().map_err(domain(row_number))?,
            start_date: parse_flexible_date(&row.start_date),
            end_date: parse_flexible_date(&row.end_date),
            last_check_in: parse_flexible_date(&row.last_check_in),
            name: row.name,
            email: row.email.trim().to_string(),
            phone: row.phone,
            cohort: row.cohort.trim().to_string(),
            office: row.office,
            linkedin: row.linkedin,
            prior_role: row.prior_role,
            education: row.education,
            notes: row.notes,
            report_config,
        };
        fellows.push(SheetFellow {
            fellow,
            has_sheet_id: sheet_id.is_some(),
        });
    }

    Ok(fellows)
}

pub fn read_status_reports<R: Read>(reader: R) -> Result<Vec<SheetStatusReport>, SheetImportError> {
    let mut reader = csv::Reader::from_reader(reader);
    let mut reports = Vec::new();

    for (index, result) in reader.deserialize::<StatusReportRow>().enumerate() {
        let row_number = index + 2;
        let row = result?;

        let fellow_id = parse_id(row_number, &row.fellow_id)?
            .ok_or(SheetImportError::MissingFellowId { row: row_number })?;

        reports.push(SheetStatusReport {
            id: parse_id(row_number, &row.id)?.unwrap_or_else(Uuid::new_v4),
            fellow_id,
            report: StatusReport {
                month: row.month.trim().to_string(),
                submitted: parse_sheet_bool(&row.submitted),
                date_submitted: parse_flexible_date(&row.date_submitted),
            },
            notes: row.notes,
        });
    }

    Ok(reports)
}
