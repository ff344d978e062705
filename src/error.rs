//! Error types.
//!
//! Library code returns one of the typed `thiserror` enums below so callers can
//! match on the failure kind. The `tdr` binary folds all of them into
//! [`AppError`], which carries the process exit code:
//!
//! - `2`: invalid input (CUSIP, dates, security type, CLI usage)
//! - `3`: report aggregation failed (bad dates or amounts in the data)
//! - `4`: data retrieval failed (HTTP, decoding, CSV)

use thiserror::Error;

/// Failures of the report aggregation core.
///
/// Every variant carries the offending record's CUSIP (or `"<unknown>"` when
/// the record has none) so bad upstream data can be traced.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReportError {
    #[error("{cusip}: field `{field}` value '{value}' does not match date format '{format}'")]
    DateFormat {
        cusip: String,
        field: String,
        value: String,
        format: String,
    },

    #[error("{cusip}: missing amount field `{field}`")]
    MissingAmount { cusip: String, field: String },

    #[error("{cusip}: amount field `{field}` is not an integer: '{value}'")]
    InvalidAmount {
        cusip: String,
        field: String,
        value: String,
    },

    #[error("{cusip}: missing required field `{field}`")]
    MissingField { cusip: String, field: String },

    #[error("total of `{field}` overflowed")]
    AmountOverflow { field: String },
}

/// Input validation failures (before any request is sent).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("CUSIP '{0}' is not length 9")]
    CusipLength(String),

    #[error("Incorrect date format '{value}', should be {format}")]
    DateFormat { value: String, format: String },

    #[error("Incorrect security type '{0}', should be one of (Bill, Note, Bond, CMB, TIPS, FRN)")]
    SecurityType(String),

    #[error("Please specify a dateFieldName for a date-range search")]
    MissingDateField,
}

/// Data retrieval failures.
///
/// The status variants mirror the response codes TreasuryDirect documents.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Bad request")]
    BadRequest,
    #[error("Unauthorized")]
    Unauthorized,
    #[error("Treasury data not found")]
    NotFound,
    #[error("Too many requests")]
    TooManyRequests,
    #[error("Internal server error")]
    InternalServerError,
    #[error("Service unavailable")]
    ServiceUnavailable,
    #[error("request failed with status {0}")]
    Status(u16),
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("failed to parse SOMA CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("unexpected response from {url}: {message}")]
    Decode { url: String, message: String },
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        AppError::new(2, err.to_string())
    }
}

impl From<ReportError> for AppError {
    fn from(err: ReportError) -> Self {
        AppError::new(3, format!("Report failed: {err}"))
    }
}

impl From<FetchError> for AppError {
    fn from(err: FetchError) -> Self {
        match err {
            FetchError::Validation(v) => v.into(),
            other => AppError::new(4, other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_follow_error_kind() {
        let v: AppError = ValidationError::CusipLength("ABC".into()).into();
        assert_eq!(v.exit_code(), 2);

        let r: AppError = ReportError::MissingAmount {
            cusip: "912828S68".into(),
            field: "offeringAmount".into(),
        }
        .into();
        assert_eq!(r.exit_code(), 3);
        assert!(r.to_string().contains("offeringAmount"));

        let f: AppError = FetchError::NotFound.into();
        assert_eq!(f.exit_code(), 4);
        assert_eq!(f.to_string(), "Treasury data not found");

        let nested: AppError = FetchError::Validation(ValidationError::MissingDateField).into();
        assert_eq!(nested.exit_code(), 2);
    }
}
