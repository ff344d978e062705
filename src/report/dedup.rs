//! Content-based de-duplication.
//!
//! Maturing-date and maturity-date searches can both return the same issue.
//! Two records are duplicates only when every public field and every parsed
//! date helper is equal. A record that merely lacks a field another copy has
//! is a distinct record.

use std::collections::HashSet;

use crate::report::normalize::NormalizedIssue;

/// Collapse exact duplicates to one representative each.
///
/// Survivors keep first-occurrence order, but callers must not rely on it:
/// grouping re-sorts everything.
pub fn dedup_issues(issues: Vec<NormalizedIssue>) -> Vec<NormalizedIssue> {
    let before = issues.len();
    let mut seen = HashSet::with_capacity(before);
    let out: Vec<NormalizedIssue> = issues
        .into_iter()
        .filter(|issue| seen.insert(canonical_key(issue)))
        .collect();

    tracing::debug!(before, after = out.len(), "deduplicated issues");
    out
}

/// Deterministic rendering of a record's full content.
///
/// Fields and helpers live in `BTreeMap`s, so the key does not depend on the
/// order fields were inserted or returned by the API.
fn canonical_key(issue: &NormalizedIssue) -> String {
    // Names are debug-quoted and values are JSON, so `=` and `;` inside them
    // cannot split an entry.
    let mut parts: Vec<String> = issue
        .fields
        .iter()
        .map(|(name, value)| format!("{name:?}={value}"))
        .collect();
    parts.extend(
        issue
            .dates
            .iter()
            .map(|(field, at)| format!("@{}={at}", field.field_name())),
    );
    if let Some(at) = issue.actual_maturity {
        parts.push(format!("@actual_maturity={at}"));
    }
    parts.join(";")
}
