use std::path::PathBuf;

use anyhow::{bail, Context};
use chrono::{Local, NaiveDate};
use clap::{ArgGroup, Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;
use uuid::Uuid;

mod compliance;
mod config;
mod dates;
mod db;
mod models;
mod report;
mod roster;
mod sheets;
mod telemetry;

use crate::compliance::MonthState;
use crate::models::{Chamber, CheckIn, CheckInKind, FellowStatus, FellowType, Party};
use crate::roster::{RosterFilter, RosterSort};

#[derive(Parser)]
#[command(name = "fellows-report-compliance")]
#[command(about = "Monthly report compliance and check-in tracker for program fellows", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

fn parse_date_arg(value: &str) -> Result<NaiveDate, String> {
    dates::parse_flexible_date(value)
        .ok_or_else(|| format!("'{value}' is not a date (use YYYY-MM-DD or M/D/YYYY)"))
}

fn parse_fellow_type_arg(value: &str) -> Result<FellowType, String> {
    FellowType::from_label(value).ok_or_else(|| "fellow type must not be empty".to_string())
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load realistic seed data
    Seed,
    /// Import the Fellows tab from a CSV export
    ImportFellows {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Import the Status Reports tab from a CSV export
    ImportReports {
        #[arg(long)]
        csv: PathBuf,
    },
    /// List fellows with dashboard filters and sorting
    Roster {
        /// Match against name, office or email
        #[arg(long)]
        search: Option<String>,
        #[arg(long)]
        status: Option<FellowStatus>,
        #[arg(long, value_parser = parse_fellow_type_arg)]
        fellow_type: Option<FellowType>,
        #[arg(long)]
        party: Option<Party>,
        #[arg(long)]
        chamber: Option<Chamber>,
        #[arg(long)]
        cohort: Option<String>,
        #[arg(long, value_enum, default_value_t = RosterSort::CohortNewest)]
        sort: RosterSort,
        #[arg(long, value_parser = parse_date_arg)]
        as_of: Option<NaiveDate>,
    },
    /// Score report compliance across enrolled fellows
    #[command(group(
        ArgGroup::new("scope")
            .args(["cohort", "email"])
            .multiple(false)
    ))]
    Compliance {
        #[arg(long)]
        cohort: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long, value_parser = parse_date_arg)]
        as_of: Option<NaiveDate>,
        #[arg(long)]
        json: bool,
    },
    /// Show the month-by-month report checklist for one fellow
    Checklist {
        #[arg(long)]
        email: String,
        #[arg(long, value_parser = parse_date_arg)]
        as_of: Option<NaiveDate>,
        #[arg(long)]
        json: bool,
    },
    /// Mark a required month's report as submitted
    MarkSubmitted {
        #[arg(long)]
        email: String,
        /// Month key such as "Mar 2026"
        #[arg(long)]
        month: String,
        #[arg(long, value_parser = parse_date_arg)]
        date: Option<NaiveDate>,
    },
    /// Log a staff check-in with a fellow
    CheckIn {
        #[arg(long)]
        email: String,
        #[arg(long, value_parser = parse_date_arg)]
        date: Option<NaiveDate>,
        #[arg(long, value_enum, default_value_t = CheckInKind::Email)]
        kind: CheckInKind,
        #[arg(long, default_value = "")]
        staff: String,
        #[arg(long, default_value = "")]
        notes: String,
    },
    /// List a fellow's check-ins, newest first
    CheckIns {
        #[arg(long)]
        email: String,
    },
    /// Remove a logged check-in by id
    DeleteCheckIn {
        #[arg(long)]
        id: Uuid,
    },
    /// Generate a markdown compliance report
    Report {
        #[arg(long)]
        cohort: Option<String>,
        #[arg(long, value_parser = parse_date_arg)]
        as_of: Option<NaiveDate>,
        #[arg(long, default_value = "compliance-report.md")]
        out: PathBuf,
    },
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

async fn require_fellow(pool: &sqlx::PgPool, email: &str) -> anyhow::Result<models::Fellow> {
    db::fetch_fellow_by_email(pool, email)
        .await?
        .with_context(|| format!("no fellow with email {email}"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = config::AppConfig::load()?;
    telemetry::init(&config.telemetry)?;

    let pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .connect(&config.database.url)
        .await
        .context("failed to connect to Postgres")?;

    match cli.command {
        Commands::InitDb => {
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            db::seed(&pool).await?;
            println!("Seed data inserted.");
        }
        Commands::ImportFellows { csv } => {
            let imported = db::import_fellows_csv(&pool, &csv).await?;
            println!("Imported {imported} fellows from {}.", csv.display());
        }
        Commands::ImportReports { csv } => {
            let imported = db::import_status_reports_csv(&pool, &csv).await?;
            println!("Imported {imported} status reports from {}.", csv.display());
        }
        Commands::Roster {
            search,
            status,
            fellow_type,
            party,
            chamber,
            cohort,
            sort,
            as_of,
        } => {
            let now = as_of.unwrap_or_else(today);
            let fellows = db::fetch_fellows(&pool).await?;
            if fellows.is_empty() {
                println!("No fellows found. Import or seed some to get started.");
                return Ok(());
            }

            let stats = roster::dashboard_stats(&fellows, now);
            println!(
                "{} fellows: {} active, {} need check-in, {} flagged, {} ending soon",
                stats.total, stats.active, stats.needs_check_in, stats.flagged, stats.ending_soon
            );
            println!("Cohorts: {}", roster::cohorts(&fellows).join(", "));

            let filter = RosterFilter {
                search,
                status,
                fellow_type,
                party,
                chamber,
                cohort,
            };
            let listed = roster::filter_and_sort(&fellows, &filter, sort, now);
            println!("Showing {} of {} fellows", listed.len(), stats.total);

            for fellow in listed {
                let kind = fellow.fellow_type.map(|t| t.short_label()).unwrap_or("-");
                let contact = match roster::days_since(fellow.last_check_in, now) {
                    Some(days) => format!("{days} days since check-in"),
                    None => "never checked in".to_string(),
                };
                let ending = roster::days_until(fellow.end_date, now)
                    .map(|days| format!(", ends in {days} days"))
                    .unwrap_or_default();
                let flag = if roster::needs_check_in(fellow, now) {
                    " [needs check-in]"
                } else {
                    ""
                };
                println!(
                    "- {} ({}, {}, {}) {}: {}{}{}",
                    fellow.name, fellow.email, kind, fellow.cohort, fellow.status, contact, ending, flag
                );
            }
        }
        Commands::Compliance {
            cohort,
            email,
            as_of,
            json,
        } => {
            let now = as_of.unwrap_or_else(today);
            let fellows: Vec<models::Fellow> = db::fetch_fellows(&pool)
                .await?
                .into_iter()
                .filter(|f| cohort.as_deref().map_or(true, |c| f.cohort == c))
                .filter(|f| {
                    email
                        .as_deref()
                        .map_or(true, |e| f.email.eq_ignore_ascii_case(e.trim()))
                })
                .collect();
            let reports = db::fetch_all_status_reports(&pool).await?;
            let assessed = report::assess_roster(&fellows, &reports, now);

            if json {
                println!("{}", serde_json::to_string_pretty(&assessed)?);
                return Ok(());
            }
            if assessed.is_empty() {
                println!("No fellows enrolled in monthly reports for this scope.");
                return Ok(());
            }

            println!("Report compliance as of {now}:");
            for entry in assessed.iter() {
                let mut badges = report::status_badges(&entry.status);
                if let Some(warning) = &entry.warning {
                    badges.push(warning.clone());
                }
                let badges = if badges.is_empty() {
                    "no completed months yet".to_string()
                } else {
                    badges.join(", ")
                };
                println!(
                    "- {} ({}, {}) {} of {} months owed: {}",
                    entry.name,
                    entry.email,
                    entry.cohort,
                    entry.required_months.len(),
                    entry.end_month.as_deref().unwrap_or("-"),
                    badges
                );
            }
        }
        Commands::Checklist { email, as_of, json } => {
            let now = as_of.unwrap_or_else(today);
            let fellow = require_fellow(&pool, &email).await?;
            if !fellow.report_config.requires_monthly_reports {
                println!("{} does not require monthly status reports.", fellow.name);
                return Ok(());
            }

            let reports = db::fetch_status_reports(&pool, fellow.id).await?;
            let required = compliance::derive_required_months(&fellow.report_config);
            let entries = compliance::month_checklist(&reports, &required, now);
            let status = compliance::calculate_compliance(&reports, &required, now);

            if json {
                let payload = serde_json::json!({ "months": entries, "status": status });
                println!("{}", serde_json::to_string_pretty(&payload)?);
                return Ok(());
            }

            println!("{} ({})", fellow.name, fellow.email);
            let badges = report::status_badges(&status);
            if !badges.is_empty() {
                println!("Status: {}", badges.join(", "));
            }
            for entry in entries {
                let due = entry.due.format("%b %d");
                match entry.state {
                    MonthState::Submitted { date_submitted } => {
                        let on = date_submitted.map(|d| format!(" {d}")).unwrap_or_default();
                        println!("[x] {} submitted{}", entry.month, on);
                    }
                    MonthState::Overdue => println!("[!] {} overdue (was due {})", entry.month, due),
                    MonthState::Due => println!("[ ] {} due {}", entry.month, due),
                }
            }
        }
        Commands::MarkSubmitted { email, month, date } => {
            let fellow = require_fellow(&pool, &email).await?;
            let required = compliance::derive_required_months(&fellow.report_config);
            let month = month.trim();
            if !required.contains(month) {
                bail!(
                    "{month} is not a required report month for {} (required: {})",
                    fellow.email,
                    required.as_slice().join(", ")
                );
            }

            let submitted_on = date.unwrap_or_else(today);
            let outcome = db::mark_report_submitted(&pool, fellow.id, month, submitted_on).await?;
            tracing::info!(fellow = %fellow.email, month, ?outcome, "report marked submitted");
            println!("Marked {month} as submitted for {}.", fellow.name);
        }
        Commands::CheckIn {
            email,
            date,
            kind,
            staff,
            notes,
        } => {
            let fellow = require_fellow(&pool, &email).await?;
            let check_in = CheckIn {
                id: Uuid::new_v4(),
                fellow_id: fellow.id,
                date: date.unwrap_or_else(today),
                kind,
                notes,
                staff_member: staff,
            };
            db::record_check_in(&pool, &check_in).await?;
            println!(
                "Logged {} check-in with {} on {}.",
                check_in.kind.label(),
                fellow.name,
                check_in.date
            );
        }
        Commands::CheckIns { email } => {
            let fellow = require_fellow(&pool, &email).await?;
            let check_ins = db::fetch_check_ins(&pool, fellow.id).await?;
            println!("{} ({}): {} check-ins", fellow.name, fellow.email, check_ins.len());
            if check_ins.is_empty() {
                println!("No check-ins recorded yet.");
            }
            for check_in in check_ins.iter() {
                let staff = if check_in.staff_member.is_empty() {
                    String::new()
                } else {
                    format!(" by {}", check_in.staff_member)
                };
                println!(
                    "- {} {}{} [{}] {}",
                    check_in.date,
                    check_in.kind.label(),
                    staff,
                    check_in.id,
                    check_in.notes
                );
            }
        }
        Commands::DeleteCheckIn { id } => {
            if !db::delete_check_in(&pool, id).await? {
                bail!("no check-in with id {id}");
            }
            tracing::info!(%id, "check-in deleted");
            println!("Deleted check-in {id}.");
        }
        Commands::Report { cohort, as_of, out } => {
            let now = as_of.unwrap_or_else(today);
            let fellows: Vec<models::Fellow> = db::fetch_fellows(&pool)
                .await?
                .into_iter()
                .filter(|f| cohort.as_deref().map_or(true, |c| f.cohort == c))
                .collect();
            let reports = db::fetch_all_status_reports(&pool).await?;
            let report = report::build_report(cohort.as_deref(), now, &fellows, &reports);
            std::fs::write(&out, report)?;
            println!("Report written to {}.", out.display());
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn date_arguments_accept_sheet_formats() {
        assert_eq!(parse_date_arg("6/15/2026"), Ok(NaiveDate::from_ymd_opt(2026, 6, 15).unwrap()));
        assert!(parse_date_arg("tomorrow").is_err());
    }

    #[test]
    fn compliance_scope_is_cohort_or_email() {
        let result = Cli::try_parse_from([
            "fellows-report-compliance",
            "compliance",
            "--cohort",
            "2026",
            "--email",
            "a@example.com",
        ]);
        assert!(result.is_err());

        let cli = Cli::try_parse_from([
            "fellows-report-compliance",
            "roster",
            "--status",
            "Flagged",
            "--sort",
            "priority",
        ])
        .unwrap();
        match cli.command {
            Commands::Roster { status, sort, .. } => {
                assert_eq!(status, Some(FellowStatus::Flagged));
                assert_eq!(sort, RosterSort::Priority);
            }
            _ => panic!("expected roster command"),
        }
    }

    #[test]
    fn delete_check_in_takes_a_uuid() {
        let id = "9a1f3c2e-5b7d-4e8f-a0b1-c2d3e4f5a6b7";
        let cli = Cli::try_parse_from(["fellows-report-compliance", "delete-check-in", "--id", id])
            .unwrap();
        match cli.command {
            Commands::DeleteCheckIn { id: parsed } => {
                assert_eq!(parsed, Uuid::parse_str(id).unwrap());
            }
            _ => panic!("expected delete-check-in command"),
        }

        let bad = Cli::try_parse_from([
            "fellows-report-compliance",
            "delete-check-in",
            "--id",
            "not-an-id",
        ]);
        assert!(bad.is_err());
    }
}
