//! TreasuryDirect web-service client.
//!
//! Wraps the securities (`/TA_WS`) and public-debt (`/NP_WS`) endpoints. List
//! endpoints are trimmed to [`KEEP_KEYS`] so downstream reports only carry the
//! fields they use.

use std::time::Duration;

use rayon::prelude::*;
use reqwest::StatusCode;
use reqwest::blocking::Client;
use serde_json::Value;

use crate::data::validate::{QUERY_DATE_FORMAT, check_cusip, check_date};
use crate::domain::{RawIssue, SecurityType};
use crate::error::{FetchError, ValidationError};

const DEFAULT_BASE_URL: &str = "https://www.treasurydirect.gov";
const SECURITIES_ENDPOINT: &str = "/TA_WS/securities/";
const ANNOUNCED_ENDPOINT: &str = "/TA_WS/securities/announced";
const SEARCH_ENDPOINT: &str = "/TA_WS/securities/search";
const DEBT_ENDPOINT: &str = "/NP_WS/debt/";

const DEBT_DATE_FORMAT: &str = "%Y/%m/%d";
const DEBT_RANGE_DATE_FORMAT: &str = "%Y-%m-%d";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Fields kept from security records.
pub const KEEP_KEYS: [&str; 11] = [
    "cusip",
    "securityType",
    "securityTerm",
    "issueDate",
    "announcementDate",
    "auctionDate",
    "bidToCoverRatio",
    "maturingDate",
    "offeringAmount",
    "originalSecurityTerm",
    "maturityDate",
];

/// Filters for the announced/auctioned listings.
#[derive(Debug, Clone)]
pub struct SecurityQuery {
    pub security_type: Option<SecurityType>,
    pub days_ago: u32,
    pub max_securities: Option<u32>,
    pub reopening: Option<bool>,
}

impl Default for SecurityQuery {
    fn default() -> Self {
        Self {
            security_type: None,
            days_ago: 250,
            max_securities: None,
            reopening: None,
        }
    }
}

impl SecurityQuery {
    pub fn days_ago(days_ago: u32) -> Self {
        Self {
            days_ago,
            ..Self::default()
        }
    }

    fn params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if let Some(t) = self.security_type {
            params.push(("type", t.to_string()));
        }
        if let Some(n) = self.max_securities.filter(|n| *n > 0) {
            params.push(("pagesize", n.to_string()));
        }
        if let Some(reopening) = self.reopening {
            params.push(("reopening", yes_no(reopening).to_string()));
        }
        if self.days_ago > 0 {
            params.push(("days", self.days_ago.to_string()));
        }
        params
    }
}

/// Parameters for `/securities/search`.
///
/// `date_field` names which date (`issueDate`, `maturityDate`, ...) the
/// `start_date`/`end_date` range (`MM/DD/YYYY`) applies to.
#[derive(Debug, Clone, Default)]
pub struct SearchQuery {
    pub date_field: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub security_type: Option<SecurityType>,
    pub cusip: Option<String>,
    pub reopening: Option<bool>,
}

impl SearchQuery {
    pub fn for_cusip(cusip: impl Into<String>) -> Self {
        Self {
            cusip: Some(cusip.into()),
            ..Self::default()
        }
    }

    pub fn date_range(
        date_field: impl Into<String>,
        start_date: impl Into<String>,
        end_date: impl Into<String>,
    ) -> Self {
        Self {
            date_field: Some(date_field.into()),
            start_date: Some(start_date.into()),
            end_date: Some(end_date.into()),
            ..Self::default()
        }
    }

    /// Validate and render query parameters.
    pub fn params(&self) -> Result<Vec<(&'static str, String)>, ValidationError> {
        let has_range = self.start_date.is_some() || self.end_date.is_some();
        if has_range && self.date_field.is_none() {
            return Err(ValidationError::MissingDateField);
        }

        let mut params = Vec::new();
        if let Some(field) = &self.date_field {
            params.push(("dateFieldName", field.clone()));
        }
        if let Some(start) = &self.start_date {
            params.push(("startDate", check_date(start, QUERY_DATE_FORMAT)?));
        }
        if let Some(end) = &self.end_date {
            params.push(("endDate", check_date(end, QUERY_DATE_FORMAT)?));
        }
        if let Some(t) = self.security_type {
            params.push(("type", t.to_string()));
        }
        if let Some(cusip) = &self.cusip {
            check_cusip(cusip)?;
            params.push(("cusip", cusip.clone()));
        }
        if let Some(reopening) = self.reopening {
            params.push(("reopening", yes_no(reopening).to_string()));
        }
        Ok(params)
    }
}

fn yes_no(flag: bool) -> &'static str {
    if flag { "Yes" } else { "No" }
}

/// A resolved GET: full URL plus query parameters (`format=json` is added on send).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub url: String,
    pub params: Vec<(&'static str, String)>,
}

pub struct TreasuryDirect {
    client: Client,
    base_url: String,
}

impl TreasuryDirect {
    pub fn new(base_url: impl Into<String>) -> Result<Self, FetchError> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Build a client, honouring `TREASURY_API_BASE_URL` (from the environment or `.env`).
    pub fn from_env() -> Result<Self, FetchError> {
        dotenvy::dotenv().ok();
        let base_url =
            std::env::var("TREASURY_API_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        Self::new(base_url)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Endpoint {
        Endpoint {
            url: format!("{}{path}", self.base_url),
            params: Vec::new(),
        }
    }

    pub fn security_info_endpoint(&self, cusip: &str, issue_date: &str) -> Result<Endpoint, ValidationError> {
        check_cusip(cusip)?;
        let issue_date = check_date(issue_date, QUERY_DATE_FORMAT)?;
        Ok(self.endpoint(&format!("{SECURITIES_ENDPOINT}{cusip}/{issue_date}")))
    }

    pub fn security_type_endpoint(&self, security_type: SecurityType) -> Endpoint {
        self.endpoint(&format!("{SECURITIES_ENDPOINT}{security_type}"))
    }

    pub fn security_hist_endpoint(&self, security_type: SecurityType, auctioned: bool) -> Endpoint {
        let listing = if auctioned { "auctioned" } else { "announced" };
        Endpoint {
            params: vec![("type", security_type.to_string())],
            ..self.endpoint(&format!("{SECURITIES_ENDPOINT}{listing}"))
        }
    }

    /// Announced listing. Auction results are served from here too.
    pub fn announced_endpoint(&self, query: &SecurityQuery) -> Endpoint {
        Endpoint {
            params: query.params(),
            ..self.endpoint(ANNOUNCED_ENDPOINT)
        }
    }

    pub fn search_endpoint(&self, query: &SearchQuery) -> Result<Endpoint, ValidationError> {
        Ok(Endpoint {
            params: query.params()?,
            ..self.endpoint(SEARCH_ENDPOINT)
        })
    }

    pub fn current_debt_endpoint(&self) -> Endpoint {
        self.endpoint(&format!("{DEBT_ENDPOINT}current"))
    }

    /// `date` is `YYYY/MM/DD`.
    pub fn debt_by_date_endpoint(&self, date: &str) -> Result<Endpoint, ValidationError> {
        let date = check_date(date, DEBT_DATE_FORMAT)?;
        Ok(self.endpoint(&format!("{DEBT_ENDPOINT}{date}")))
    }

    /// Dates are `YYYY-MM-DD`.
    pub fn debt_range_endpoint(&self, start_date: &str, end_date: &str) -> Result<Endpoint, ValidationError> {
        let start = check_date(start_date, DEBT_RANGE_DATE_FORMAT)?;
        let end = check_date(end_date, DEBT_RANGE_DATE_FORMAT)?;
        Ok(Endpoint {
            params: vec![("startdate", start), ("enddate", end)],
            ..self.endpoint(&format!("{DEBT_ENDPOINT}search"))
        })
    }

    /// Data about one security, identified by CUSIP and issue date (`MM/DD/YYYY`).
    pub fn security_info(&self, cusip: &str, issue_date: &str) -> Result<Value, FetchError> {
        self.get_json(&self.security_info_endpoint(cusip, issue_date)?)
    }

    /// All securities of one type.
    pub fn security_type(&self, security_type: SecurityType) -> Result<Value, FetchError> {
        self.get_json(&self.security_type_endpoint(security_type))
    }

    /// Recently announced (or auctioned) securities of one type.
    pub fn security_hist(&self, security_type: SecurityType, auctioned: bool) -> Result<Value, FetchError> {
        self.get_json(&self.security_hist_endpoint(security_type, auctioned))
    }

    pub fn security_announcements(&self, query: &SecurityQuery) -> Result<Vec<RawIssue>, FetchError> {
        self.get_records(&self.announced_endpoint(query))
    }

    /// Auction results. TreasuryDirect serves these from the announced listing.
    pub fn security_auctions(&self, query: &SecurityQuery) -> Result<Vec<RawIssue>, FetchError> {
        self.get_records(&self.announced_endpoint(query))
    }

    pub fn security_search(&self, query: &SearchQuery) -> Result<Vec<RawIssue>, FetchError> {
        self.get_records(&self.search_endpoint(query)?)
    }

    /// Issues maturing between `start_date` and `end_date` (`MM/DD/YYYY`).
    ///
    /// Depending on the security, the relevant date is either `maturityDate`
    /// or `maturingDate`, so both are searched. The concatenation can contain
    /// duplicates; report dedup removes them.
    pub fn maturing_issues_by_date(&self, start_date: &str, end_date: &str) -> Result<Vec<RawIssue>, FetchError> {
        let mut results =
            self.security_search(&SearchQuery::date_range("maturityDate", start_date, end_date))?;
        results.extend(self.security_search(&SearchQuery::date_range("maturingDate", start_date, end_date))?);
        Ok(results)
    }

    /// Look up many CUSIPs in parallel over the shared connection pool.
    ///
    /// A failed lookup is logged and skipped; the rest are returned.
    pub fn issues_by_cusips(&self, cusips: &[String]) -> Vec<RawIssue> {
        let results: Vec<RawIssue> = cusips
            .par_iter()
            .filter_map(|cusip| match self.security_search(&SearchQuery::for_cusip(cusip.as_str())) {
                Ok(records) => Some(records),
                Err(err) => {
                    tracing::warn!(%cusip, error = %err, "CUSIP lookup failed, skipping");
                    None
                }
            })
            .flatten()
            .collect();

        tracing::info!(requested = cusips.len(), records = results.len(), "fetched issues by CUSIP");
        results
    }

    pub fn current_debt(&self) -> Result<Value, FetchError> {
        self.get_json(&self.current_debt_endpoint())
    }

    /// Debt to the penny on one date (`YYYY/MM/DD`).
    pub fn debt_by_date(&self, date: &str) -> Result<Value, FetchError> {
        self.get_json(&self.debt_by_date_endpoint(date)?)
    }

    /// Debt entries between two dates (`YYYY-MM-DD`).
    pub fn debt_range(&self, start_date: &str, end_date: &str) -> Result<Value, FetchError> {
        self.get_json(&self.debt_range_endpoint(start_date, end_date)?)
    }

    fn get_records(&self, endpoint: &Endpoint) -> Result<Vec<RawIssue>, FetchError> {
        let body = self.get_json(endpoint)?;
        Ok(filter_records(body))
    }

    /// GET with `format=json`. An empty or non-JSON body yields `Value::Null`.
    fn get_json(&self, endpoint: &Endpoint) -> Result<Value, FetchError> {
        let Endpoint { url, params } = endpoint;
        tracing::info!(url = %url, ?params, "GET");
        let resp = self
            .client
            .get(url)
            .query(&[("format", "json")])
            .query(params)
            .send()?;

        check_status(resp.status())?;

        let text = resp.text()?;
        Ok(serde_json::from_str(&text).unwrap_or(Value::Null))
    }
}

/// Map documented TreasuryDirect response codes to typed errors.
pub fn check_status(status: StatusCode) -> Result<(), FetchError> {
    if status.is_success() {
        return Ok(());
    }
    Err(match status.as_u16() {
        400 => FetchError::BadRequest,
        401 => FetchError::Unauthorized,
        404 => FetchError::NotFound,
        429 => FetchError::TooManyRequests,
        500 => FetchError::InternalServerError,
        503 => FetchError::ServiceUnavailable,
        other => FetchError::Status(other),
    })
}

/// Keep only [`KEEP_KEYS`] of each object in a JSON array. Anything else yields no records.
pub fn filter_records(body: Value) -> Vec<RawIssue> {
    let Value::Array(items) = body else {
        return Vec::new();
    };
    items
        .into_iter()
        .filter_map(|item| match item {
            Value::Object(map) => Some(
                map.into_iter()
                    .filter(|(k, _)| KEEP_KEYS.contains(&k.as_str()))
                    .collect::<RawIssue>(),
            ),
            _ => None,
        })
        .collect()
}
