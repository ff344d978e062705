//! Command-line parsing for the `tdr` report tool.
//!
//! The goal of this module is to keep **argument parsing** separate from the
//! retrieval and aggregation code.

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::domain::{DateAttribute, Granularity, ReportKind, SecurityType};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "tdr", version, about = "Treasury issuance reports from TreasuryDirect and NY Fed SOMA data")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Build one time-bucketed report and print it as JSON.
    Report(ReportArgs),
    /// Build the four default monthly reports (soma_holdings, announced, auctioned, maturing).
    All(AllArgs),
    /// Print TreasuryDirect data for one security.
    Security(SecurityArgs),
    /// Print every security of one type, or its recent announced/auctioned listing.
    Securities(SecuritiesArgs),
    /// Print public debt data (current, one date, or a date range).
    Debt(DebtArgs),
}

/// Options shared by every command.
#[derive(Debug, Args, Clone)]
pub struct OutputArgs {
    /// Pretty-print JSON output.
    #[arg(long)]
    pub pretty: bool,
}

/// Fetch windows shared by `report` and `all`.
#[derive(Debug, Args, Clone)]
pub struct WindowArgs {
    /// Start of the maturity window (MM/DD/YYYY) for maturing reports.
    #[arg(long, default_value = "01/01/2016")]
    pub start: String,

    /// End of the maturity window (MM/DD/YYYY) for maturing reports.
    #[arg(long, default_value = "01/01/2021")]
    pub end: String,

    /// Look-back window in days for announced/auctioned reports.
    #[arg(long, default_value_t = 365)]
    pub days_ago: u32,

    /// SOMA holdings as-of date (YYYY-MM-DD). Defaults to the latest Wednesday.
    #[arg(long)]
    pub as_of: Option<NaiveDate>,
}

#[derive(Debug, Args, Clone)]
pub struct ReportArgs {
    /// Which report to build.
    #[arg(value_enum)]
    pub kind: ReportKind,

    /// Bucket size.
    #[arg(long = "by", value_enum, default_value_t = Granularity::Month)]
    pub granularity: Granularity,

    /// Date that drives the buckets (defaults to the report's natural date).
    #[arg(long = "date", value_enum)]
    pub attribute: Option<DateAttribute>,

    /// Dimension name used in output keys (default: e.g. `month_maturing`).
    #[arg(long)]
    pub name: Option<String>,

    /// Restrict announced/auctioned reports to one security type.
    #[arg(long = "type", value_enum)]
    pub security_type: Option<SecurityType>,

    #[command(flatten)]
    pub window: WindowArgs,

    #[command(flatten)]
    pub output: OutputArgs,
}

#[derive(Debug, Args, Clone)]
pub struct AllArgs {
    #[command(flatten)]
    pub window: WindowArgs,

    #[command(flatten)]
    pub output: OutputArgs,
}

#[derive(Debug, Args, Clone)]
pub struct SecurityArgs {
    /// 9-character CUSIP.
    #[arg(long)]
    pub cusip: String,

    /// Issue date (MM/DD/YYYY).
    #[arg(long)]
    pub issue_date: String,

    #[command(flatten)]
    pub output: OutputArgs,
}

/// Recent listings for `securities --listing`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Listing {
    Announced,
    Auctioned,
}

#[derive(Debug, Args, Clone)]
pub struct SecuritiesArgs {
    #[arg(long = "type", value_enum)]
    pub security_type: SecurityType,

    /// Only the recent announced or auctioned listing.
    #[arg(long, value_enum)]
    pub listing: Option<Listing>,

    #[command(flatten)]
    pub output: OutputArgs,
}

#[derive(Debug, Args, Clone)]
pub struct DebtArgs {
    /// Single date (YYYY/MM/DD).
    #[arg(long, conflicts_with_all = ["start", "end"])]
    pub date: Option<String>,

    /// Range start (YYYY-MM-DD); requires --end.
    #[arg(long, requires = "end")]
    pub start: Option<String>,

    /// Range end (YYYY-MM-DD); requires --start.
    #[arg(long, requires = "start")]
    pub end: Option<String>,

    #[command(flatten)]
    pub output: OutputArgs,
}
