//! Time-bucket and term keys.
//!
//! A report groups issues first by a calendar bucket derived from one of their
//! dates, then by security term. [`SortCriteria`] is the closed set of
//! `granularity x date attribute` combinations (twelve in total); each resolves
//! to a pure key function over a [`NormalizedIssue`].

use std::fmt;

use chrono::{Datelike, NaiveDate};
use serde_json::Value;

use crate::domain::{DateAttribute, DateField, FIELD_SECURITY_TERM, Granularity};
use crate::report::normalize::NormalizedIssue;

/// Calendar grouping key. Ordering is lexicographic over the integers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BucketKey {
    Day { year: i32, month: u32, day: u32 },
    Week { year: i32, week: u32 },
    Month { year: i32, month: u32 },
}

impl BucketKey {
    pub fn from_date(granularity: Granularity, date: NaiveDate) -> Self {
        match granularity {
            Granularity::Day => BucketKey::Day {
                year: date.year(),
                month: date.month(),
                day: date.day(),
            },
            Granularity::Week => BucketKey::Week {
                year: date.year(),
                week: week_of_year(date),
            },
            Granularity::Month => BucketKey::Month {
                year: date.year(),
                month: date.month(),
            },
        }
    }
}

/// Hyphen-joined integers without padding: `2018-10-1`, `2018-49`, `2020-6`.
impl fmt::Display for BucketKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BucketKey::Day { year, month, day } => write!(f, "{year}-{month}-{day}"),
            BucketKey::Week { year, week } => write!(f, "{year}-{week}"),
            BucketKey::Month { year, month } => write!(f, "{year}-{month}"),
        }
    }
}

/// Seven-day counter from January 1st: days 1-7 are week 1, 8-14 week 2, ...
///
/// This is not ISO-8601 week numbering. Day 365/366 lands in week 53, and a
/// calendar week spanning New Year is split across two years.
pub fn week_of_year(date: NaiveDate) -> u32 {
    date.ordinal0() / 7 + 1
}

/// Which bucket a report groups by: a granularity applied to one date attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SortCriteria {
    pub granularity: Granularity,
    pub attribute: DateAttribute,
}

impl SortCriteria {
    pub const fn new(granularity: Granularity, attribute: DateAttribute) -> Self {
        Self {
            granularity,
            attribute,
        }
    }

    pub const DAY_MATURITY: Self = Self::new(Granularity::Day, DateAttribute::Maturity);
    pub const WEEK_MATURITY: Self = Self::new(Granularity::Week, DateAttribute::Maturity);
    pub const MONTH_MATURITY: Self = Self::new(Granularity::Month, DateAttribute::Maturity);

    pub const DAY_ISSUED: Self = Self::new(Granularity::Day, DateAttribute::Issue);
    pub const WEEK_ISSUED: Self = Self::new(Granularity::Week, DateAttribute::Issue);
    pub const MONTH_ISSUED: Self = Self::new(Granularity::Month, DateAttribute::Issue);

    pub const DAY_AUCTIONED: Self = Self::new(Granularity::Day, DateAttribute::Auction);
    pub const WEEK_AUCTIONED: Self = Self::new(Granularity::Week, DateAttribute::Auction);
    pub const MONTH_AUCTIONED: Self = Self::new(Granularity::Month, DateAttribute::Auction);

    pub const DAY_ANNOUNCED: Self = Self::new(Granularity::Day, DateAttribute::Announcement);
    pub const WEEK_ANNOUNCED: Self = Self::new(Granularity::Week, DateAttribute::Announcement);
    pub const MONTH_ANNOUNCED: Self = Self::new(Granularity::Month, DateAttribute::Announcement);

    pub const ALL: [SortCriteria; 12] = [
        Self::DAY_MATURITY,
        Self::WEEK_MATURITY,
        Self::MONTH_MATURITY,
        Self::DAY_ISSUED,
        Self::WEEK_ISSUED,
        Self::MONTH_ISSUED,
        Self::DAY_AUCTIONED,
        Self::WEEK_AUCTIONED,
        Self::MONTH_AUCTIONED,
        Self::DAY_ANNOUNCED,
        Self::WEEK_ANNOUNCED,
        Self::MONTH_ANNOUNCED,
    ];

    /// Conventional report dimension name, e.g. `month_maturing` or `week_issued`.
    pub fn default_name(self) -> String {
        format!("{}_{}", self.granularity.label(), self.attribute.label())
    }

    /// The date this criteria buckets on, if the issue has it.
    pub fn date(self, issue: &NormalizedIssue) -> Option<NaiveDate> {
        match self.attribute {
            DateAttribute::Maturity => issue.actual_maturity(),
            DateAttribute::Issue => issue.date(DateField::IssueDate),
            DateAttribute::Auction => issue.date(DateField::AuctionDate),
            DateAttribute::Announcement => issue.date(DateField::AnnouncementDate),
        }
    }

    /// Bucket key for an issue; `None` when the chosen date is absent.
    pub fn key(self, issue: &NormalizedIssue) -> Option<BucketKey> {
        self.date(issue)
            .map(|date| BucketKey::from_date(self.granularity, date))
    }
}

/// `securityTerm` verbatim (e.g. `"10-Year"`). Terms sort as plain strings.
pub fn term_key(issue: &NormalizedIssue) -> Option<&str> {
    match issue.fields().get(FIELD_SECURITY_TERM) {
        Some(Value::String(term)) => Some(term.as_str()),
        _ => None,
    }
}
