//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - installs logging (stderr, `RUST_LOG`)
//! - parses CLI arguments
//! - runs the report pipeline or a raw lookup
//! - prints JSON to stdout

use clap::Parser;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use crate::cli::{
    AllArgs, Command, DebtArgs, Listing, ReportArgs, SecuritiesArgs, SecurityArgs, WindowArgs,
};
use crate::data::TreasuryDirect;
use crate::domain::ReportKind;
use crate::error::AppError;

pub mod pipeline;

use pipeline::ReportRequest;

/// Entry point for the `tdr` binary.
pub fn run() -> Result<(), AppError> {
    init_tracing();
    let cli = crate::cli::Cli::parse();

    match cli.command {
        Command::Report(args) => handle_report(args),
        Command::All(args) => handle_all(args),
        Command::Security(args) => handle_security(args),
        Command::Securities(args) => handle_securities(args),
        Command::Debt(args) => handle_debt(args),
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    // Logs go to stderr so stdout stays valid JSON.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn handle_report(args: ReportArgs) -> Result<(), AppError> {
    let request = request_from_args(&args);
    let report = pipeline::run_report(&request)?;
    print_json(&report, args.output.pretty)
}

fn handle_all(args: AllArgs) -> Result<(), AppError> {
    let template = request_from_window(ReportKind::Maturing, &args.window);
    let reports = pipeline::run_all(&template)?;
    print_json(&reports, args.output.pretty)
}

fn handle_security(args: SecurityArgs) -> Result<(), AppError> {
    let treasury = TreasuryDirect::from_env()?;
    let info = treasury.security_info(&args.cusip, &args.issue_date)?;
    print_json(&info, args.output.pretty)
}

fn handle_securities(args: SecuritiesArgs) -> Result<(), AppError> {
    let treasury = TreasuryDirect::from_env()?;
    let listing = match args.listing {
        None => treasury.security_type(args.security_type)?,
        Some(listing) => treasury.security_hist(args.security_type, listing == Listing::Auctioned)?,
    };
    print_json(&listing, args.output.pretty)
}

fn handle_debt(args: DebtArgs) -> Result<(), AppError> {
    let treasury = TreasuryDirect::from_env()?;
    let debt = match (&args.date, &args.start, &args.end) {
        (Some(date), _, _) => treasury.debt_by_date(date)?,
        (None, Some(start), Some(end)) => treasury.debt_range(start, end)?,
        _ => treasury.current_debt()?,
    };
    print_json(&debt, args.output.pretty)
}

pub fn request_from_args(args: &ReportArgs) -> ReportRequest {
    ReportRequest {
        granularity: args.granularity,
        attribute: args.attribute,
        name: args.name.clone(),
        security_type: args.security_type,
        ..request_from_window(args.kind, &args.window)
    }
}

fn request_from_window(kind: ReportKind, window: &WindowArgs) -> ReportRequest {
    ReportRequest {
        start_date: window.start.clone(),
        end_date: window.end.clone(),
        days_ago: window.days_ago,
        as_of: window.as_of,
        ..ReportRequest::new(kind)
    }
}

fn print_json<T: Serialize>(value: &T, pretty: bool) -> Result<(), AppError> {
    let out = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    }
    .map_err(|e| AppError::new(4, format!("Failed to serialize output: {e}")))?;

    println!("{out}");
    Ok(())
}
