//! Operator command line: dashboards, cascade maintenance and backups.

pub mod output;

use std::io::IsTerminal;

use chrono::NaiveDate;
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use scola_config::Config;

use crate::errors::SchoolError;
use crate::manager::SchoolLedgerManager;
use crate::utils::build_info::BUILD_INFO;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("{0}")]
    Usage(String),
    #[error(transparent)]
    School(#[from] SchoolError),
    #[error("JSON output failed: {0}")]
    Json(#[from] serde_json::Error),
}

/// One parsed command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Summary { json: bool },
    Payments { json: bool },
    Teacher {
        id: Uuid,
        range: Option<(NaiveDate, NaiveDate)>,
        json: bool,
    },
    Cascades,
    Reconcile { json: bool },
    Backup { note: Option<String> },
    Backups,
    Restore { id: String },
    DeleteBackup { id: String },
    Version,
    Help,
}

pub const USAGE: &str = "\
Usage: scola_cli <command> [options]

Commands:
  summary [--json]                     Revenue, cash flow and projected payouts for this month
  payments [--json]                    Payment analytics for this month
  teacher <id> [<from> <to>] [--json]  Teacher report, dates as YYYY-MM-DD
  cascades                             Retry pending enrollment payment cascades
  reconcile [--json]                   List failed cascades and ledger anomalies
  backup [note]                        Snapshot the ledger
  backups                              List ledger backups
  restore <backup>                     Restore a ledger backup
  delete-backup <backup>               Delete a ledger backup
  version                              Print build information
";

impl Command {
    pub fn parse<I, S>(args: I) -> Result<Self, CliError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut json = false;
        let mut words = Vec::new();
        for arg in args.into_iter().map(Into::into) {
            if arg == "--json" {
                json = true;
            } else {
                words.push(arg);
            }
        }
        let mut words = words.into_iter();
        let command = match words.next() {
            Some(command) => command,
            None => return Ok(Command::Help),
        };
        let rest: Vec<String> = words.collect();

        let parsed = match (command.as_str(), rest.as_slice()) {
            ("summary", []) => Command::Summary { json },
            ("payments", []) => Command::Payments { json },
            ("teacher", [id]) => Command::Teacher {
                id: parse_uuid(id)?,
                range: None,
                json,
            },
            ("teacher", [id, from, to]) => Command::Teacher {
                id: parse_uuid(id)?,
                range: Some((parse_date(from)?, parse_date(to)?)),
                json,
            },
            ("cascades", []) => Command::Cascades,
            ("reconcile", []) => Command::Reconcile { json },
            ("backup", note) => Command::Backup {
                note: (!note.is_empty()).then(|| note.join(" ")),
            },
            ("backups", []) => Command::Backups,
            ("restore", [id]) => Command::Restore { id: id.clone() },
            ("delete-backup", [id]) => Command::DeleteBackup { id: id.clone() },
            ("version" | "--version" | "-V", []) => Command::Version,
            ("help" | "--help" | "-h", _) => Command::Help,
            (other, _) => {
                return Err(CliError::Usage(format!(
                    "unknown or malformed command `{other}`"
                )))
            }
        };
        Ok(parsed)
    }
}

fn parse_uuid(raw: &str) -> Result<Uuid, CliError> {
    Uuid::parse_str(raw.trim()).map_err(|_| CliError::Usage(format!("`{raw}` is not a valid id")))
}

fn parse_date(raw: &str) -> Result<NaiveDate, CliError> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|_| CliError::Usage(format!("`{raw}` is not a YYYY-MM-DD date")))
}

/// Parses `args` (without the program name) and runs the command.
pub fn run<I, S>(args: I, manager: &SchoolLedgerManager, config: &Config) -> Result<(), CliError>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    if !std::io::stdout().is_terminal() {
        colored::control::set_override(false);
    }
    let command = Command::parse(args)?;
    execute(command, manager, config)
}

pub fn execute(
    command: Command,
    manager: &SchoolLedgerManager,
    config: &Config,
) -> Result<(), CliError> {
    let currency = config.currency.as_str();
    match command {
        Command::Summary { json } => {
            let summary = manager.revenue_summary()?;
            let students = manager.student_analytics()?;
            if json {
                return print_json(&serde_json::json!({
                    "revenue": summary,
                    "students": students,
                }));
            }
            output::section(format!("Summary {}", summary.period.label()));
            output::row("Students", students.total_students);
            output::row("Enrollments", students.total_enrollments);
            output::row("Recurring revenue", output::money(summary.recurring_revenue, currency));
            output::row("Enrollment fees", output::money(summary.enrollment_revenue, currency));
            output::row("Monthly revenue", output::money(summary.monthly_revenue, currency));
            output::row("Cash received", output::money(summary.cash_flow.income, currency));
            output::row("Expenses", output::money(summary.cash_flow.expense, currency));
            output::row("Balance", output::money(summary.cash_flow.balance, currency));
            output::row(
                "Projected teacher pay",
                output::money(summary.projected_teacher_expense, currency),
            );
            if !students.recent_enrollments.is_empty() {
                output::section("Recent enrollments");
                for recent in &students.recent_enrollments {
                    output::info(format!(
                        "  {} {} {} {} ({})",
                        recent.date.format("%Y-%m-%d"),
                        recent.student_name.as_deref().unwrap_or("<removed student>"),
                        recent.kind,
                        recent.category,
                        output::money(recent.amount, currency),
                    ));
                }
            }
        }
        Command::Payments { json } => {
            let analytics = manager.payment_analytics()?;
            if json {
                return print_json(&analytics);
            }
            output::section("Payments this month");
            output::row(
                "Received this month",
                output::money(analytics.total_received_month, currency),
            );
            output::row("Expenses this month", output::money(analytics.total_expenses, currency));
            output::row("Income to date", output::money(analytics.total_income, currency));
            output::row(
                "Projected teacher pay",
                output::money(analytics.teacher_expenses, currency),
            );
            output::row("Other expenses", output::money(analytics.other_expenses, currency));
            let breakdown = manager.expense_breakdown()?;
            if !breakdown.is_empty() {
                output::section("Expenses by category");
                for (category, amount) in &breakdown {
                    output::row(category, output::money(*amount, currency));
                }
            }
        }
        Command::Teacher { id, range, json } => {
            let report = manager.teacher_report(id, range)?;
            if json {
                return print_json(&report);
            }
            output::section(format!("{} {}", report.name, report.period.label()));
            output::row("Students", report.total_students);
            output::row("Groups", report.total_groups);
            output::row("Sessions", report.total_sessions);
            output::row("Attendance", output::percent(report.attendance_rate));
            output::row("Monthly revenue", output::money(report.monthly_revenue, currency));
            for group in &report.group_performance {
                output::info(format!(
                    "  {} [{}] {} students, {} sessions, {} attendance, {}{}",
                    group.name,
                    group.subject,
                    group.students,
                    group.sessions,
                    output::percent(group.attendance_rate),
                    output::money(group.monthly_revenue, currency),
                    if group.active { "" } else { " (inactive)" },
                ));
            }
        }
        Command::Cascades => {
            let run = manager.process_cascades()?;
            if run.retrying == 0 && run.failed == 0 {
                output::success(format!("{} cascade(s) applied", run.applied));
            } else {
                output::warning(format!(
                    "{} applied, {} will retry, {} failed",
                    run.applied, run.retrying, run.failed
                ));
            }
        }
        Command::Reconcile { json } => {
            let report = manager.reconciliation_report()?;
            if json {
                return print_json(&report);
            }
            if report.is_clean() {
                output::success("Ledger is reconciled");
                return Ok(());
            }
            output::section("Reconciliation");
            for event in &report.failed {
                output::error(format!(
                    "cascade {} failed after {} attempt(s): {}",
                    event.id,
                    event.attempts,
                    event.last_error.as_deref().unwrap_or("unknown error")
                ));
            }
            for event in &report.pending {
                output::warning(format!(
                    "cascade {} pending ({} attempt(s))",
                    event.id, event.attempts
                ));
            }
            for enrollment in &report.unpaid_enrollments {
                output::warning(format!("enrollment {enrollment} has no payment"));
            }
            for warning in &report.warnings {
                output::warning(warning);
            }
        }
        Command::Backup { note } => {
            let info = manager.backup(note.as_deref())?;
            output::success(format!("Backup created: {}", info.id));
        }
        Command::Backups => {
            let backups = manager.list_backups()?;
            if backups.is_empty() {
                output::info("No backups yet");
            }
            for backup in backups {
                output::info(format!("{}  {}", backup.created_at, backup.id));
            }
        }
        Command::Restore { id } => {
            let ledger = manager.restore_backup(&id)?;
            output::success(format!("Restored `{}` from {id}", ledger.name));
        }
        Command::DeleteBackup { id } => {
            manager.delete_backup(&id)?;
            output::success(format!("Deleted backup {id}"));
        }
        Command::Version => {
            output::info(BUILD_INFO.summary());
            output::row("Built", BUILD_INFO.timestamp);
            output::row("Target", BUILD_INFO.target);
            output::row("Compiler", BUILD_INFO.rustc);
        }
        Command::Help => output::info(USAGE),
    }
    Ok(())
}

fn print_json(value: &impl Serialize) -> Result<(), CliError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
