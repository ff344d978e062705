//! Two-level grouping and amount aggregation.
//!
//! Issues are grouped by time bucket, then by security term inside each
//! bucket. Each term carries the sum of its members' `offeringAmount` (and
//! optionally `soma_holding_amount`); each bucket carries the sum of its terms.
//!
//! The in-memory schema is explicit (`bucket_total`, `term_total`, ...). The
//! caller-visible key names (`<name>_total`, `soma_<name>_term_total`, ...) are
//! only produced when a [`Report`] is serialized.

use std::collections::BTreeMap;

use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};
use serde_json::Value;

use crate::domain::{
    FIELD_OFFERING_AMOUNT, FIELD_SECURITY_TERM, FIELD_SOMA_HOLDING_AMOUNT, RawIssue,
};
use crate::error::ReportError;
use crate::report::bucket::{BucketKey, SortCriteria, term_key};
use crate::report::normalize::{NormalizedIssue, record_cusip};

/// Issues of one term within one bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TermEntry {
    pub term_total: u64,
    pub soma_term_total: Option<u64>,
    /// Member records with parsed-date helpers stripped.
    pub issues: Vec<RawIssue>,
}

/// One time bucket of a report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketEntry {
    pub key: BucketKey,
    /// `key` rendered as a hyphen-joined string.
    pub timeframe: String,
    pub bucket_total: u64,
    pub soma_bucket_total: Option<u64>,
    pub terms: BTreeMap<String, TermEntry>,
}

/// Ordered bucket entries plus the dimension name used to label their totals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub name: String,
    pub buckets: Vec<BucketEntry>,
}

impl Report {
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    pub fn into_buckets(self) -> Vec<BucketEntry> {
        self.buckets
    }
}

/// Group `issues` by `criteria` then by term, summing amounts.
///
/// Issues without the date `criteria` keys on (e.g. no maturing or maturity
/// date for a maturity report) are left out of the report. Missing or
/// non-integer amounts abort the whole call.
pub fn aggregate(
    issues: Vec<NormalizedIssue>,
    criteria: SortCriteria,
    name: &str,
    include_soma: bool,
) -> Result<Report, ReportError> {
    let total = issues.len();
    let mut keyed: Vec<(BucketKey, NormalizedIssue)> = issues
        .into_iter()
        .filter_map(|issue| criteria.key(&issue).map(|key| (key, issue)))
        .collect();

    let excluded = total - keyed.len();
    if excluded > 0 {
        tracing::debug!(
            excluded,
            criteria = %criteria.default_name(),
            "issues without a bucket date left out of report"
        );
    }

    keyed.sort_by_key(|(key, _)| *key);

    let mut buckets = Vec::new();
    for (key, members) in group_runs(keyed) {
        buckets.push(build_bucket(key, members, include_soma)?);
    }

    Ok(Report {
        name: name.to_string(),
        buckets,
    })
}

fn build_bucket(
    key: BucketKey,
    members: Vec<NormalizedIssue>,
    include_soma: bool,
) -> Result<BucketEntry, ReportError> {
    let mut by_term = Vec::with_capacity(members.len());
    for issue in members {
        let term = term_key(&issue)
            .ok_or_else(|| ReportError::MissingField {
                cusip: issue.cusip(),
                field: FIELD_SECURITY_TERM.to_string(),
            })?
            .to_string();
        by_term.push((term, issue));
    }
    by_term.sort_by(|a, b| a.0.cmp(&b.0));

    let mut bucket_total = 0u64;
    let mut soma_bucket_total = include_soma.then_some(0u64);
    let mut terms = BTreeMap::new();

    for (term, issues) in group_runs(by_term) {
        let term_total = sum_amounts(&issues, FIELD_OFFERING_AMOUNT)?;
        bucket_total = checked_total(bucket_total, term_total, FIELD_OFFERING_AMOUNT)?;

        let soma_term_total = match soma_bucket_total {
            Some(running) => {
                let sum = sum_amounts(&issues, FIELD_SOMA_HOLDING_AMOUNT)?;
                soma_bucket_total = Some(checked_total(running, sum, FIELD_SOMA_HOLDING_AMOUNT)?);
                Some(sum)
            }
            None => None,
        };

        terms.insert(
            term,
            TermEntry {
                term_total,
                soma_term_total,
                issues: issues.into_iter().map(NormalizedIssue::into_fields).collect(),
            },
        );
    }

    Ok(BucketEntry {
        key,
        timeframe: key.to_string(),
        bucket_total,
        soma_bucket_total,
        terms,
    })
}

/// Split a sorted `(key, item)` list into runs of equal keys, preserving order.
fn group_runs<K: PartialEq, T>(items: Vec<(K, T)>) -> Vec<(K, Vec<T>)> {
    let mut out: Vec<(K, Vec<T>)> = Vec::new();
    for (key, item) in items {
        match out.last_mut() {
            Some((last, run)) if *last == key => run.push(item),
            _ => out.push((key, vec![item])),
        }
    }
    out
}

fn sum_amounts(issues: &[NormalizedIssue], field: &str) -> Result<u64, ReportError> {
    issues.iter().try_fold(0u64, |acc, issue| {
        let amount = parse_amount(issue.fields(), field)?;
        checked_total(acc, amount, field)
    })
}

fn checked_total(acc: u64, amount: u64, field: &str) -> Result<u64, ReportError> {
    acc.checked_add(amount)
        .ok_or_else(|| ReportError::AmountOverflow {
            field: field.to_string(),
        })
}

/// Amounts arrive as string-encoded integers, occasionally as JSON numbers.
fn parse_amount(fields: &RawIssue, field: &str) -> Result<u64, ReportError> {
    let invalid = |value: String| ReportError::InvalidAmount {
        cusip: record_cusip(fields),
        field: field.to_string(),
        value,
    };

    match fields.get(field) {
        None | Some(Value::Null) => Err(ReportError::MissingAmount {
            cusip: record_cusip(fields),
            field: field.to_string(),
        }),
        Some(Value::String(s)) if s.trim().is_empty() => Err(ReportError::MissingAmount {
            cusip: record_cusip(fields),
            field: field.to_string(),
        }),
        Some(Value::String(s)) => s.trim().parse::<u64>().map_err(|_| invalid(s.clone())),
        Some(Value::Number(n)) => n.as_u64().ok_or_else(|| invalid(n.to_string())),
        Some(other) => Err(invalid(other.to_string())),
    }
}

impl Serialize for Report {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.buckets.len()))?;
        for entry in &self.buckets {
            seq.serialize_element(&NamedBucket {
                name: &self.name,
                entry,
            })?;
        }
        seq.end()
    }
}

struct NamedBucket<'a> {
    name: &'a str,
    entry: &'a BucketEntry,
}

impl Serialize for NamedBucket<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let NamedBucket { name, entry } = *self;
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("timeframe", &entry.timeframe)?;
        map.serialize_entry(&format!("{name}_total"), &entry.bucket_total)?;
        if let Some(soma) = entry.soma_bucket_total {
            map.serialize_entry(&format!("soma_{name}_total"), &soma)?;
        }
        let terms: BTreeMap<&str, NamedTerm<'_>> = entry
            .terms
            .iter()
            .map(|(term, t)| (term.as_str(), NamedTerm { name, entry: t }))
            .collect();
        map.serialize_entry(&format!("{name}_issues"), &terms)?;
        map.end()
    }
}

struct NamedTerm<'a> {
    name: &'a str,
    entry: &'a TermEntry,
}

impl Serialize for NamedTerm<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let NamedTerm { name, entry } = *self;
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry(&format!("{name}_term_total"), &entry.term_total)?;
        if let Some(soma) = entry.soma_term_total {
            map.serialize_entry(&format!("soma_{name}_term_total"), &soma)?;
        }
        map.serialize_entry("issues", &entry.issues)?;
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TREASURY_DATE_FORMAT;
    use crate::report::normalize::normalize_issue;
    use proptest::prelude::*;
    use serde_json::json;

    fn issue(pairs: &[(&str, &str)]) -> NormalizedIssue {
        let raw: RawIssue = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), json!(v)))
            .collect();
        normalize_issue(raw, TREASURY_DATE_FORMAT).unwrap()
    }

    fn maturing(cusip: &str, date: &str, term: &str, amount: &str) -> NormalizedIssue {
        issue(&[
            ("cusip", cusip),
            ("maturityDate", date),
            ("securityTerm", term),
            ("offeringAmount", amount),
        ])
    }

    #[test]
    fn groups_by_bucket_then_term_in_ascending_order() {
        let issues = vec![
            maturing("C", "2019-01-15T00:00:00", "2-Year", "30"),
            maturing("A", "2018-10-15T00:00:00", "2-Year", "10"),
            maturing("B", "2018-10-31T00:00:00", "10-Year", "20"),
            maturing("D", "2018-10-01T00:00:00", "2-Year", "5"),
        ];
        let report = aggregate(issues, SortCriteria::MONTH_MATURITY, "month_maturing", false).unwrap();

        let timeframes: Vec<_> = report.buckets.iter().map(|b| b.timeframe.as_str()).collect();
        assert_eq!(timeframes, vec!["2018-10", "2019-1"]);

        let oct = &report.buckets[0];
        assert_eq!(oct.bucket_total, 35);
        assert_eq!(oct.soma_bucket_total, None);
        let terms: Vec<_> = oct.terms.keys().map(String::as_str).collect();
        assert_eq!(terms, vec!["10-Year", "2-Year"]);
        assert_eq!(oct.terms["2-Year"].term_total, 15);
        assert_eq!(oct.terms["2-Year"].issues.len(), 2);
        assert_eq!(oct.terms["10-Year"].term_total, 20);
    }

    #[test]
    fn members_keep_stable_order_within_a_term() {
        let issues = vec![
            maturing("FIRST", "2018-10-20T00:00:00", "5-Year", "1"),
            maturing("SECOND", "2018-10-03T00:00:00", "5-Year", "1"),
        ];
        let report = aggregate(issues, SortCriteria::MONTH_MATURITY, "m", false).unwrap();
        let cusips: Vec<_> = report.buckets[0].terms["5-Year"]
            .issues
            .iter()
            .map(|i| i["cusip"].clone())
            .collect();
        assert_eq!(cusips, vec![json!("FIRST"), json!("SECOND")]);
    }

    #[test]
    fn issues_without_bucket_date_are_excluded() {
        let issues = vec![
            maturing("A", "2018-10-15T00:00:00", "2-Year", "10"),
            issue(&[("cusip", "B"), ("securityTerm", "2-Year"), ("offeringAmount", "99")]),
        ];
        let report = aggregate(issues, SortCriteria::MONTH_MATURITY, "m", false).unwrap();
        assert_eq!(report.len(), 1);
        assert_eq!(report.buckets[0].bucket_total, 10);
    }

    #[test]
    fn missing_offering_amount_is_an_error_not_zero() {
        let issues = vec![issue(&[
            ("cusip", "912828S68"),
            ("maturityDate", "2018-10-15T00:00:00"),
            ("securityTerm", "2-Year"),
        ])];
        let err = aggregate(issues, SortCriteria::MONTH_MATURITY, "m", false).unwrap_err();
        assert_eq!(
            err,
            ReportError::MissingAmount {
                cusip: "912828S68".to_string(),
                field: "offeringAmount".to_string(),
            }
        );
    }

    #[test]
    fn non_numeric_amount_is_an_error() {
        let issues = vec![maturing("X", "2018-10-15T00:00:00", "2-Year", "12.5")];
        let err = aggregate(issues, SortCriteria::MONTH_MATURITY, "m", false).unwrap_err();
        assert!(matches!(err, ReportError::InvalidAmount { ref value, .. } if value == "12.5"));
    }

    #[test]
    fn soma_flag_requires_holding_amount() {
        let issues = vec![maturing("X", "2018-10-15T00:00:00", "2-Year", "10")];
        let err = aggregate(issues, SortCriteria::MONTH_MATURITY, "m", true).unwrap_err();
        assert!(matches!(err, ReportError::MissingAmount { ref field, .. } if field == "soma_holding_amount"));
    }

    #[test]
    fn numeric_json_amounts_are_accepted() {
        let mut raw: RawIssue = RawIssue::new();
        raw.insert("cusip".into(), json!("N"));
        raw.insert("maturityDate".into(), json!("2018-10-15T00:00:00"));
        raw.insert("securityTerm".into(), json!("2-Year"));
        raw.insert("offeringAmount".into(), json!(42));
        raw.insert("soma_holding_amount".into(), json!("7"));
        let n = normalize_issue(raw, TREASURY_DATE_FORMAT).unwrap();

        let report = aggregate(vec![n], SortCriteria::MONTH_MATURITY, "m", true).unwrap();
        assert_eq!(report.buckets[0].bucket_total, 42);
        assert_eq!(report.buckets[0].soma_bucket_total, Some(7));
        assert_eq!(report.buckets[0].terms["2-Year"].soma_term_total, Some(7));
    }

    #[test]
    fn missing_term_is_an_error() {
        let issues = vec![issue(&[
            ("cusip", "T"),
            ("maturityDate", "2018-10-15T00:00:00"),
            ("offeringAmount", "1"),
        ])];
        let err = aggregate(issues, SortCriteria::MONTH_MATURITY, "m", false).unwrap_err();
        assert!(matches!(err, ReportError::MissingField { ref field, .. } if field == "securityTerm"));
    }

    #[test]
    fn serializes_with_dimension_named_keys() {
        let mut a = maturing("A", "2018-10-15T00:00:00", "2-Year", "10");
        a.fields.insert("soma_holding_amount".into(), json!("4"));
        let report = aggregate(vec![a], SortCriteria::MONTH_MATURITY, "month_maturing", true).unwrap();

        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(
            value,
            json!([{
                "timeframe": "2018-10",
                "month_maturing_total": 10,
                "soma_month_maturing_total": 4,
                "month_maturing_issues": {
                    "2-Year": {
                        "month_maturing_term_total": 10,
                        "soma_month_maturing_term_total": 4,
                        "issues": [{
                            "actual_maturity": "2018-10-15",
                            "cusip": "A",
                            "maturityDate": "2018-10-15",
                            "offeringAmount": "10",
                            "securityTerm": "2-Year",
                            "soma_holding_amount": "4"
                        }]
                    }
                }
            }])
        );
    }

    #[test]
    fn soma_keys_absent_without_flag() {
        let report = aggregate(
            vec![maturing("A", "2018-10-15T00:00:00", "2-Year", "10")],
            SortCriteria::MONTH_MATURITY,
            "month_maturing",
            false,
        )
        .unwrap();
        let value = serde_json::to_value(&report).unwrap();
        let bucket = value[0].as_object().unwrap();
        assert!(!bucket.contains_key("soma_month_maturing_total"));
        assert!(bucket.contains_key("month_maturing_total"));
    }

    proptest! {
        #[test]
        fn bucket_total_is_sum_of_term_totals(
            rows in proptest::collection::vec((1u32..13, 0usize..4, 0u64..1_000_000_000), 1..40)
        ) {
            let terms = ["10-Year", "2-Year", "30-Year", "5-Year"];
            let issues: Vec<_> = rows
                .iter()
                .enumerate()
                .map(|(i, (month, term, amount))| {
                    maturing(
                        &format!("C{i}"),
                        &format!("2018-{month:02}-15T00:00:00"),
                        terms[*term],
                        &amount.to_string(),
                    )
                })
                .collect();

            let report = aggregate(issues, SortCriteria::MONTH_MATURITY, "m", false).unwrap();
            let grand: u64 = rows.iter().map(|r| r.2).sum();
            prop_assert_eq!(report.buckets.iter().map(|b| b.bucket_total).sum::<u64>(), grand);

            for bucket in &report.buckets {
                let from_terms: u64 = bucket.terms.values().map(|t| t.term_total).sum();
                prop_assert_eq!(bucket.bucket_total, from_terms);
                for term in bucket.terms.values() {
                    let from_members: u64 = term
                        .issues
                        .iter()
                        .map(|i| i["offeringAmount"].as_str().unwrap().parse::<u64>().unwrap())
                        .sum();
                    prop_assert_eq!(term.term_total, from_members);
                }
            }
            prop_assert!(report.buckets.windows(2).all(|w| w[0].key < w[1].key));
        }
    }
}
