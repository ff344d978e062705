//! Input checks applied before a request is built.

use chrono::NaiveDate;

use crate::error::ValidationError;

/// TreasuryDirect path date format for security lookups and searches.
pub const QUERY_DATE_FORMAT: &str = "%m/%d/%Y";

pub fn check_cusip(cusip: &str) -> Result<(), ValidationError> {
    if cusip.chars().count() != 9 {
        return Err(ValidationError::CusipLength(cusip.to_string()));
    }
    Ok(())
}

/// Ensure a user-supplied date string matches `format`; returns it unchanged.
pub fn check_date(date: &str, format: &str) -> Result<String, ValidationError> {
    NaiveDate::parse_from_str(date, format)
        .map(|_| date.to_string())
        .map_err(|_| ValidationError::DateFormat {
            value: date.to_string(),
            format: format.to_string(),
        })
}
