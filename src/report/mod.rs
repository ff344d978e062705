//! Report aggregation engine.
//!
//! Pipeline: raw records -> [`normalize`] -> [`dedup`] -> [`aggregate`]
//! (keyed by a [`SortCriteria`]) -> ordered [`Report`].
//!
//! Everything here is pure: no I/O, no shared state, safe to call from any
//! number of threads on independent inputs.

pub mod aggregate;
pub mod bucket;
pub mod dedup;
pub mod normalize;

pub use aggregate::{BucketEntry, Report, TermEntry, aggregate};
pub use bucket::{BucketKey, SortCriteria, term_key, week_of_year};
pub use dedup::dedup_issues;
pub use normalize::{NormalizedIssue, normalize_issue, normalize_issues};

use crate::domain::{RawIssue, TREASURY_DATE_FORMAT};
use crate::error::ReportError;

/// Build a report from raw TreasuryDirect records.
///
/// `name` labels the totals in serialized output (`<name>_total`, ...);
/// `include_soma` adds the parallel `soma_holding_amount` totals.
pub fn produce_report(
    issues: Vec<RawIssue>,
    criteria: SortCriteria,
    name: &str,
    include_soma: bool,
) -> Result<Report, ReportError> {
    produce_report_with_format(issues, TREASURY_DATE_FORMAT, criteria, name, include_soma)
}

/// [`produce_report`] with an explicit source date format.
pub fn produce_report_with_format(
    issues: Vec<RawIssue>,
    source_format: &str,
    criteria: SortCriteria,
    name: &str,
    include_soma: bool,
) -> Result<Report, ReportError> {
    let normalized = normalize_issues(issues, source_format)?;
    let deduped = dedup_issues(normalized);
    let report = aggregate(deduped, criteria, name, include_soma)?;

    tracing::debug!(name, buckets = report.len(), "report produced");
    Ok(report)
}
