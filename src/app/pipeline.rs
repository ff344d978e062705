//! Shared "report pipeline" logic used by every CLI command.
//!
//! Keeping this in one place avoids duplicating the workflow:
//! fetch records (+ SOMA enrichment) -> normalize -> dedup -> group/aggregate
//!
//! The CLI can then focus on argument handling and output.

use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::data::{FedSoma, SecurityQuery, TreasuryDirect, enrich};
use crate::domain::{DateAttribute, Granularity, RawIssue, ReportKind, SecurityType};
use crate::error::{AppError, FetchError};
use crate::report::{Report, SortCriteria, produce_report};

/// Everything needed to fetch and build one report.
#[derive(Debug, Clone)]
pub struct ReportRequest {
    pub kind: ReportKind,
    pub granularity: Granularity,
    /// Bucket date; `None` uses the kind's default.
    pub attribute: Option<DateAttribute>,
    /// Dimension name for totals; `None` derives it from the criteria.
    pub name: Option<String>,
    /// Maturity window (`MM/DD/YYYY`) for `maturing` reports.
    pub start_date: String,
    pub end_date: String,
    /// Look-back window for `announced` / `auctioned` reports.
    pub days_ago: u32,
    pub security_type: Option<SecurityType>,
    /// SOMA as-of date for `soma` reports; `None` picks the latest Wednesday.
    pub as_of: Option<NaiveDate>,
}

impl ReportRequest {
    pub fn new(kind: ReportKind) -> Self {
        Self {
            kind,
            granularity: Granularity::Month,
            attribute: None,
            name: None,
            start_date: "01/01/2016".to_string(),
            end_date: "01/01/2021".to_string(),
            days_ago: 365,
            security_type: None,
            as_of: None,
        }
    }

    pub fn criteria(&self) -> SortCriteria {
        SortCriteria::new(
            self.granularity,
            self.attribute.unwrap_or_else(|| self.kind.default_attribute()),
        )
    }

    pub fn name(&self) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| self.criteria().default_name())
    }
}

/// Fetch the records a report needs.
pub fn fetch_records(treasury: &TreasuryDirect, request: &ReportRequest) -> Result<Vec<RawIssue>, FetchError> {
    let query = SecurityQuery {
        security_type: request.security_type,
        ..SecurityQuery::days_ago(request.days_ago)
    };

    match request.kind {
        ReportKind::Maturing => treasury.maturing_issues_by_date(&request.start_date, &request.end_date),
        ReportKind::Announced => treasury.security_announcements(&query),
        ReportKind::Auctioned => treasury.security_auctions(&query),
        ReportKind::Soma => {
            let soma = FedSoma::from_env(request.as_of)?;
            let holdings = soma.soma_holdings()?;
            let mut cusips: Vec<String> = holdings.keys().cloned().collect();
            cusips.sort();
            let records = treasury.issues_by_cusips(&cusips);
            Ok(enrich(&records, &holdings))
        }
    }
}

/// Fetch records and build the requested report.
pub fn run_report(request: &ReportRequest) -> Result<Report, AppError> {
    let treasury = TreasuryDirect::from_env()?;
    let records = fetch_records(&treasury, request)?;
    build_report(records, request)
}

/// Build a report from pre-fetched records.
pub fn build_report(records: Vec<RawIssue>, request: &ReportRequest) -> Result<Report, AppError> {
    let criteria = request.criteria();
    let name = request.name();
    tracing::info!(kind = ?request.kind, %name, records = records.len(), "building report");

    let report = produce_report(records, criteria, &name, request.kind.includes_soma())?;
    Ok(report)
}

/// The four default monthly reports, keyed `soma_holdings`, `announced`,
/// `auctioned` and `maturing`.
pub fn run_all(template: &ReportRequest) -> Result<BTreeMap<&'static str, Report>, AppError> {
    let treasury = TreasuryDirect::from_env()?;
    let kinds = [
        ("soma_holdings", ReportKind::Soma),
        ("announced", ReportKind::Announced),
        ("auctioned", ReportKind::Auctioned),
        ("maturing", ReportKind::Maturing),
    ];

    let mut out = BTreeMap::new();
    for (key, kind) in kinds {
        let request = ReportRequest {
            kind,
            ..template.clone()
        };
        let records = fetch_records(&treasury, &request)?;
        out.insert(key, build_report(records, &request)?);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_defaults_follow_report_kind() {
        let soma = ReportRequest::new(ReportKind::Soma);
        assert_eq!(soma.criteria(), SortCriteria::MONTH_MATURITY);
        assert_eq!(soma.name(), "month_maturing");

        let mut auctioned = ReportRequest::new(ReportKind::Auctioned);
        auctioned.granularity = Granularity::Week;
        assert_eq!(auctioned.criteria(), SortCriteria::WEEK_AUCTIONED);
        assert_eq!(auctioned.name(), "week_auctioned");

        let mut custom = ReportRequest::new(ReportKind::Announced);
        custom.attribute = Some(DateAttribute::Issue);
        custom.name = Some("issued".to_string());
        assert_eq!(custom.criteria(), SortCriteria::MONTH_ISSUED);
        assert_eq!(custom.name(), "issued");
    }

    #[test]
    fn build_report_applies_soma_totals_for_soma_kind() {
        let mut record = RawIssue::new();
        record.insert("cusip".into(), json!("912828S68"));
        record.insert("securityTerm".into(), json!("5-Year"));
        record.insert("offeringAmount".into(), json!("1000"));
        record.insert("maturityDate".into(), json!("2021-07-31T00:00:00"));
        record.insert("soma_holding_amount".into(), json!("250"));

        let report = build_report(vec![record], &ReportRequest::new(ReportKind::Soma)).unwrap();
        assert_eq!(report.buckets[0].timeframe, "2021-7");
        assert_eq!(report.buckets[0].soma_bucket_total, Some(250));
    }

    #[test]
    fn build_report_errors_use_report_exit_code() {
        let mut record = RawIssue::new();
        record.insert("cusip".into(), json!("912828S68"));
        record.insert("securityTerm".into(), json!("5-Year"));
        record.insert("maturityDate".into(), json!("2021-07-31T00:00:00"));

        let err = build_report(vec![record], &ReportRequest::new(ReportKind::Maturing)).unwrap_err();
        assert_eq!(err.exit_code(), 3);
    }
}
