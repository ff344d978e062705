//! Join extra per-CUSIP data (such as SOMA holdings) onto security records.

use std::collections::HashMap;

use serde_json::Value;

use crate::domain::{Enrichment, FIELD_CUSIP, RawIssue};

/// Return copies of `records` with each CUSIP's enrichment fields merged in.
///
/// Enrichment values overwrite same-named record fields. Records whose CUSIP
/// has no enrichment come back unchanged.
pub fn enrich(records: &[RawIssue], enrichment: &HashMap<String, Enrichment>) -> Vec<RawIssue> {
    records
        .iter()
        .map(|record| {
            let mut merged = record.clone();
            if let Some(extra) = cusip_of(record).and_then(|c| enrichment.get(c)) {
                merged.extend(extra.iter().map(|(k, v)| (k.clone(), v.clone())));
            }
            merged
        })
        .collect()
}

fn cusip_of(record: &RawIssue) -> Option<&str> {
    match record.get(FIELD_CUSIP) {
        Some(Value::String(c)) => Some(c.as_str()),
        _ => None,
    }
}
