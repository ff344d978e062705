//! Date normalization for raw issue records.
//!
//! TreasuryDirect returns every date as `YYYY-MM-DDTHH:MM:SS`. Reports want
//! plain `YYYY-MM-DD` strings for output, and calendar values for sorting and
//! bucketing. [`NormalizedIssue`] holds both: the public field map with the
//! rewritten strings, and crate-private parsed timestamps that never leave the
//! report engine. The timestamps keep the time of day the output strings drop,
//! so records that differ only there stay distinct.

use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde_json::Value;

use crate::domain::{
    DateField, FIELD_ACTUAL_MATURITY, FIELD_CUSIP, OUTPUT_DATE_FORMAT, RawIssue,
};
use crate::error::ReportError;

/// A record with normalized dates and the derived `actual_maturity`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedIssue {
    pub(crate) fields: RawIssue,
    pub(crate) dates: BTreeMap<DateField, NaiveDateTime>,
    pub(crate) actual_maturity: Option<NaiveDateTime>,
}

impl NormalizedIssue {
    /// Public fields, as they will appear in a report.
    pub fn fields(&self) -> &RawIssue {
        &self.fields
    }

    /// Drop the parsed-date helpers and keep only the public fields.
    pub fn into_fields(self) -> RawIssue {
        self.fields
    }

    pub fn date(&self, field: DateField) -> Option<NaiveDate> {
        self.dates.get(&field).map(NaiveDateTime::date)
    }

    /// Later of `maturingDate` / `maturityDate`, if either is present.
    pub fn actual_maturity(&self) -> Option<NaiveDate> {
        self.actual_maturity.map(|at| at.date())
    }

    pub fn cusip(&self) -> String {
        record_cusip(&self.fields)
    }
}

/// CUSIP of a record for error messages.
pub(crate) fn record_cusip(fields: &RawIssue) -> String {
    match fields.get(FIELD_CUSIP) {
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => "<unknown>".to_string(),
    }
}

/// Normalize every record's date fields using `source_format`.
///
/// Output has the same length and order as the input. A single unparseable
/// date fails the whole batch.
pub fn normalize_issues(
    issues: Vec<RawIssue>,
    source_format: &str,
) -> Result<Vec<NormalizedIssue>, ReportError> {
    issues
        .into_iter()
        .map(|issue| normalize_issue(issue, source_format))
        .collect()
}

/// Normalize a single record.
pub fn normalize_issue(mut fields: RawIssue, source_format: &str) -> Result<NormalizedIssue, ReportError> {
    let mut dates = BTreeMap::new();

    for field in DateField::ALL {
        let name = field.field_name();
        let Some(raw) = fields.get(name) else {
            continue;
        };
        let Some(at) = parse_date_value(raw, source_format).map_err(|value| ReportError::DateFormat {
            cusip: record_cusip(&fields),
            field: name.to_string(),
            value,
            format: source_format.to_string(),
        })?
        else {
            continue;
        };

        dates.insert(field, at);
        fields.insert(
            name.to_string(),
            Value::String(at.format(OUTPUT_DATE_FORMAT).to_string()),
        );
    }

    let actual_maturity = later_of(
        dates.get(&DateField::MaturingDate).copied(),
        dates.get(&DateField::MaturityDate).copied(),
    );
    if let Some(at) = actual_maturity {
        fields.insert(
            FIELD_ACTUAL_MATURITY.to_string(),
            Value::String(at.format(OUTPUT_DATE_FORMAT).to_string()),
        );
    }

    Ok(NormalizedIssue {
        fields,
        dates,
        actual_maturity,
    })
}

/// `Ok(None)` for null/empty values; `Err(rendered value)` when the value does not parse.
///
/// Date-only formats parse to midnight.
fn parse_date_value(raw: &Value, source_format: &str) -> Result<Option<NaiveDateTime>, String> {
    let s = match raw {
        Value::Null => return Ok(None),
        Value::String(s) if s.trim().is_empty() => return Ok(None),
        Value::String(s) => s.trim(),
        other => return Err(other.to_string()),
    };

    NaiveDateTime::parse_from_str(s, source_format)
        .or_else(|_| {
            NaiveDate::parse_from_str(s, source_format).map(|d| d.and_time(NaiveTime::MIN))
        })
        .map(Some)
        .map_err(|_| s.to_string())
}

/// A re-opened issue can carry both dates; the later one is when it actually matures.
fn later_of(
    maturing: Option<NaiveDateTime>,
    maturity: Option<NaiveDateTime>,
) -> Option<NaiveDateTime> {
    match (maturing, maturity) {
        (Some(a), Some(b)) => Some(a.max(b)),
        (a, b) => a.or(b),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TREASURY_DATE_FORMAT;
    use proptest::prelude::*;
    use serde_json::json;

    fn raw(pairs: &[(&str, &str)]) -> RawIssue {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), json!(v)))
            .collect()
    }

    #[test]
    fn rewrites_dates_and_keeps_parsed_values() {
        let issue = raw(&[
            ("cusip", "912828S68"),
            ("issueDate", "2016-08-01T00:00:00"),
            ("maturityDate", "2021-07-31T00:00:00"),
        ]);
        let n = normalize_issue(issue, TREASURY_DATE_FORMAT).unwrap();

        assert_eq!(n.fields()["issueDate"], json!("2016-08-01"));
        assert_eq!(n.fields()["maturityDate"], json!("2021-07-31"));
        assert_eq!(n.fields()["actual_maturity"], json!("2021-07-31"));
        assert_eq!(
            n.date(DateField::IssueDate),
            NaiveDate::from_ymd_opt(2016, 8, 1)
        );
        assert_eq!(n.date(DateField::AuctionDate), None);
    }

    #[test]
    fn actual_maturity_prefers_later_date() {
        let issue = raw(&[
            ("cusip", "912828S68"),
            ("maturingDate", "2019-02-15T00:00:00"),
            ("maturityDate", "2018-11-15T00:00:00"),
        ]);
        let n = normalize_issue(issue, TREASURY_DATE_FORMAT).unwrap();
        assert_eq!(n.actual_maturity(), NaiveDate::from_ymd_opt(2019, 2, 15));
        assert_eq!(n.fields()["actual_maturity"], json!("2019-02-15"));
    }

    #[test]
    fn missing_maturity_dates_leave_actual_maturity_absent() {
        let issue = raw(&[("cusip", "912828S68"), ("issueDate", "2016-08-01T00:00:00")]);
        let n = normalize_issue(issue, TREASURY_DATE_FORMAT).unwrap();
        assert_eq!(n.actual_maturity(), None);
        assert!(!n.fields().contains_key("actual_maturity"));
    }

    #[test]
    fn empty_and_null_dates_are_treated_as_absent() {
        let mut issue = raw(&[("cusip", "912828S68"), ("maturingDate", "")]);
        issue.insert("auctionDate".to_string(), Value::Null);
        let n = normalize_issue(issue, TREASURY_DATE_FORMAT).unwrap();
        assert_eq!(n.date(DateField::MaturingDate), None);
        assert_eq!(n.fields()["maturingDate"], json!(""));
        assert_eq!(n.fields()["auctionDate"], Value::Null);
    }

    #[test]
    fn bad_date_fails_whole_batch() {
        let good = raw(&[("cusip", "AAA"), ("issueDate", "2016-08-01T00:00:00")]);
        let bad = raw(&[("cusip", "BBB"), ("issueDate", "08/01/2016")]);

        let err = normalize_issues(vec![good, bad], TREASURY_DATE_FORMAT).unwrap_err();
        assert_eq!(
            err,
            ReportError::DateFormat {
                cusip: "BBB".to_string(),
                field: "issueDate".to_string(),
                value: "08/01/2016".to_string(),
                format: TREASURY_DATE_FORMAT.to_string(),
            }
        );
    }

    #[test]
    fn non_string_date_is_a_format_error() {
        let mut issue = raw(&[("cusip", "CCC")]);
        issue.insert("issueDate".to_string(), json!(20160801));
        let err = normalize_issue(issue, TREASURY_DATE_FORMAT).unwrap_err();
        assert!(matches!(err, ReportError::DateFormat { ref value, .. } if value == "20160801"));
    }

    #[test]
    fn date_only_source_format_is_accepted() {
        let issue = raw(&[("cusip", "DDD"), ("issueDate", "2016-08-01")]);
        let n = normalize_issue(issue, "%Y-%m-%d").unwrap();
        assert_eq!(n.date(DateField::IssueDate), NaiveDate::from_ymd_opt(2016, 8, 1));
    }

    #[test]
    fn time_of_day_is_kept_in_helpers_only() {
        let morning = normalize_issue(
            raw(&[("cusip", "EEE"), ("maturityDate", "2020-06-15T00:00:00")]),
            TREASURY_DATE_FORMAT,
        )
        .unwrap();
        let noon = normalize_issue(
            raw(&[("cusip", "EEE"), ("maturityDate", "2020-06-15T12:00:00")]),
            TREASURY_DATE_FORMAT,
        )
        .unwrap();

        assert_eq!(morning.fields(), noon.fields());
        assert_eq!(morning.actual_maturity(), noon.actual_maturity());
        assert_ne!(morning, noon);
    }

    #[test]
    fn same_day_maturity_prefers_later_time() {
        let issue = raw(&[
            ("cusip", "FFF"),
            ("maturingDate", "2020-06-15T12:00:00"),
            ("maturityDate", "2020-06-15T00:00:00"),
        ]);
        let n = normalize_issue(issue, TREASURY_DATE_FORMAT).unwrap();
        assert_eq!(
            n.actual_maturity,
            NaiveDate::from_ymd_opt(2020, 6, 15).and_then(|d| d.and_hms_opt(12, 0, 0))
        );
    }

    #[test]
    fn preserves_count_and_order() {
        let issues = vec![
            raw(&[("cusip", "A")]),
            raw(&[("cusip", "B"), ("issueDate", "2017-01-01T00:00:00")]),
            raw(&[("cusip", "C")]),
        ];
        let out = normalize_issues(issues, TREASURY_DATE_FORMAT).unwrap();
        let cusips: Vec<_> = out.iter().map(|n| n.cusip()).collect();
        assert_eq!(cusips, vec!["A", "B", "C"]);
    }

    proptest! {
        #[test]
        fn actual_maturity_is_max_or_the_one_present(
            a in proptest::option::of(0i64..20_000),
            b in proptest::option::of(0i64..20_000),
        ) {
            let base = NaiveDate::from_ymd_opt(1990, 1, 1).unwrap();
            let to_date = |d: i64| base + chrono::Duration::days(d);

            let mut issue = raw(&[("cusip", "912828S68")]);
            if let Some(d) = a {
                issue.insert(
                    "maturingDate".to_string(),
                    json!(format!("{}T00:00:00", to_date(d))),
                );
            }
            if let Some(d) = b {
                issue.insert(
                    "maturityDate".to_string(),
                    json!(format!("{}T00:00:00", to_date(d))),
                );
            }

            let n = normalize_issue(issue, TREASURY_DATE_FORMAT).unwrap();
            let expected = match (a, b) {
                (Some(x), Some(y)) => Some(to_date(x.max(y))),
                (x, y) => x.or(y).map(to_date),
            };
            prop_assert_eq!(n.actual_maturity(), expected);
        }
    }
}
