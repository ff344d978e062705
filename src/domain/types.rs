//! Shared domain types.
//!
//! Records from TreasuryDirect are kept as loosely-typed field maps
//! ([`RawIssue`]) because the API returns dozens of optional fields and
//! reports must pass them through untouched. The enums here name the handful
//! of fields and choices the report engine actually reasons about.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ValidationError;

/// A security record as returned by the data source: field name to JSON value.
///
/// A `BTreeMap` keeps field order canonical, which dedup and serialization rely on.
pub type RawIssue = BTreeMap<String, Value>;

/// Extra fields merged into a record by CUSIP (e.g. `soma_holding_amount`).
pub type Enrichment = BTreeMap<String, Value>;

pub const FIELD_CUSIP: &str = "cusip";
pub const FIELD_SECURITY_TERM: &str = "securityTerm";
pub const FIELD_OFFERING_AMOUNT: &str = "offeringAmount";
pub const FIELD_SOMA_HOLDING_AMOUNT: &str = "soma_holding_amount";
pub const FIELD_ACTUAL_MATURITY: &str = "actual_maturity";

/// Date-time format TreasuryDirect uses for every date field.
pub const TREASURY_DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Date format written back into normalized records.
pub const OUTPUT_DATE_FORMAT: &str = "%Y-%m-%d";

/// Marketable security types accepted by TreasuryDirect queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
pub enum SecurityType {
    #[value(name = "Bill")]
    Bill,
    #[value(name = "Note")]
    Note,
    #[value(name = "Bond")]
    Bond,
    #[serde(rename = "CMB")]
    #[value(name = "CMB")]
    Cmb,
    #[serde(rename = "TIPS")]
    #[value(name = "TIPS")]
    Tips,
    #[serde(rename = "FRN")]
    #[value(name = "FRN")]
    Frn,
}

impl SecurityType {
    pub const ALL: [SecurityType; 6] = [
        SecurityType::Bill,
        SecurityType::Note,
        SecurityType::Bond,
        SecurityType::Cmb,
        SecurityType::Tips,
        SecurityType::Frn,
    ];

    /// Name as used in API query strings.
    pub fn as_str(self) -> &'static str {
        match self {
            SecurityType::Bill => "Bill",
            SecurityType::Note => "Note",
            SecurityType::Bond => "Bond",
            SecurityType::Cmb => "CMB",
            SecurityType::Tips => "TIPS",
            SecurityType::Frn => "FRN",
        }
    }
}

impl fmt::Display for SecurityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SecurityType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SecurityType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| ValidationError::SecurityType(s.to_string()))
    }
}

/// The five date fields that get normalized on every record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DateField {
    IssueDate,
    AnnouncementDate,
    AuctionDate,
    MaturingDate,
    MaturityDate,
}

impl DateField {
    pub const ALL: [DateField; 5] = [
        DateField::IssueDate,
        DateField::AnnouncementDate,
        DateField::AuctionDate,
        DateField::MaturingDate,
        DateField::MaturityDate,
    ];

    /// Field name in API records.
    pub fn field_name(self) -> &'static str {
        match self {
            DateField::IssueDate => "issueDate",
            DateField::AnnouncementDate => "announcementDate",
            DateField::AuctionDate => "auctionDate",
            DateField::MaturingDate => "maturingDate",
            DateField::MaturityDate => "maturityDate",
        }
    }
}

/// Which date of an issue drives the time buckets of a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DateAttribute {
    /// The derived `actual_maturity` (later of maturing/maturity date).
    Maturity,
    Issue,
    Auction,
    Announcement,
}

impl DateAttribute {
    pub const ALL: [DateAttribute; 4] = [
        DateAttribute::Maturity,
        DateAttribute::Issue,
        DateAttribute::Auction,
        DateAttribute::Announcement,
    ];

    /// Past-participle label used in report names (`month_maturing`, `week_issued`, ...).
    pub fn label(self) -> &'static str {
        match self {
            DateAttribute::Maturity => "maturing",
            DateAttribute::Issue => "issued",
            DateAttribute::Auction => "auctioned",
            DateAttribute::Announcement => "announced",
        }
    }
}

/// Calendar period size of a time bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    Day,
    Week,
    Month,
}

impl Granularity {
    pub const ALL: [Granularity; 3] = [Granularity::Day, Granularity::Week, Granularity::Month];

    pub fn label(self) -> &'static str {
        match self {
            Granularity::Day => "day",
            Granularity::Week => "week",
            Granularity::Month => "month",
        }
    }
}

/// The canned reports the pipeline knows how to fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ReportKind {
    /// Issues maturing within a date range (maturity and maturing date searches).
    Maturing,
    /// Recently announced auctions.
    Announced,
    /// Recently auctioned securities.
    Auctioned,
    /// Securities currently held in the Fed's SOMA portfolio, with holdings totals.
    Soma,
}

impl ReportKind {
    /// Date attribute used when the caller does not pick one.
    pub fn default_attribute(self) -> DateAttribute {
        match self {
            ReportKind::Maturing | ReportKind::Soma => DateAttribute::Maturity,
            ReportKind::Announced => DateAttribute::Announcement,
            ReportKind::Auctioned => DateAttribute::Auction,
        }
    }

    /// Whether the report carries the parallel SOMA holdings totals.
    pub fn includes_soma(self) -> bool {
        matches!(self, ReportKind::Soma)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn security_type_parses_api_names_only() {
        assert_eq!("TIPS".parse::<SecurityType>().unwrap(), SecurityType::Tips);
        assert_eq!("Bill".parse::<SecurityType>().unwrap(), SecurityType::Bill);
        assert_eq!(
            "bill".parse::<SecurityType>(),
            Err(ValidationError::SecurityType("bill".to_string()))
        );
    }

    #[test]
    fn report_kind_defaults() {
        assert_eq!(ReportKind::Soma.default_attribute(), DateAttribute::Maturity);
        assert_eq!(ReportKind::Auctioned.default_attribute(), DateAttribute::Auction);
        assert!(ReportKind::Soma.includes_soma());
        assert!(!ReportKind::Maturing.includes_soma());
    }
}
