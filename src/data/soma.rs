//! New York Fed SOMA (System Open Market Account) holdings.
//!
//! The markets API publishes non-MBS holdings as a CSV per weekly as-of date.
//! We only need two columns: `CUSIP` and `Par Value`, which becomes each
//! record's `soma_holding_amount` during enrichment.

use std::collections::HashMap;
use std::io::Read;
use std::time::Duration;

use chrono::{Datelike, Local, NaiveDate};
use reqwest::blocking::Client;
use serde_json::Value;

use crate::data::treasury::check_status;
use crate::domain::{Enrichment, FIELD_SOMA_HOLDING_AMOUNT};
use crate::error::FetchError;

const DEFAULT_BASE_URL: &str = "https://markets.newyorkfed.org";
const HOLDINGS_PATH: &str = "/api/soma/non-mbs/get/ALL/asof";
const AS_OF_FORMAT: &str = "%Y-%m-%d";

const COL_CUSIP: &str = "cusip";
const COL_PAR_VALUE: &str = "par value";

pub struct FedSoma {
    client: Client,
    base_url: String,
    as_of: NaiveDate,
}

impl FedSoma {
    /// `as_of` defaults to the most recent Wednesday (SOMA's weekly update day).
    pub fn new(base_url: impl Into<String>, as_of: Option<NaiveDate>) -> Result<Self, FetchError> {
        let client = Client::builder().timeout(Duration::from_secs(60)).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            as_of: as_of.unwrap_or_else(|| latest_wednesday(Local::now().date_naive())),
        })
    }

    /// Build a client, honouring `SOMA_API_BASE_URL` (from the environment or `.env`).
    pub fn from_env(as_of: Option<NaiveDate>) -> Result<Self, FetchError> {
        dotenvy::dotenv().ok();
        let base_url =
            std::env::var("SOMA_API_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        Self::new(base_url, as_of)
    }

    pub fn as_of(&self) -> NaiveDate {
        self.as_of
    }

    pub fn holdings_url(&self) -> String {
        format!(
            "{}{HOLDINGS_PATH}/{}.csv",
            self.base_url,
            self.as_of.format(AS_OF_FORMAT)
        )
    }

    /// Holdings keyed by CUSIP, each carrying `soma_holding_amount`.
    pub fn soma_holdings(&self) -> Result<HashMap<String, Enrichment>, FetchError> {
        let url = self.holdings_url();
        tracing::info!(%url, "GET");

        let resp = self.client.get(&url).send()?;
        check_status(resp.status())?;

        let holdings = parse_holdings(resp).map_err(|err| match err {
            FetchError::Decode { message, .. } => FetchError::Decode { url: url.clone(), message },
            other => other,
        })?;
        tracing::info!(as_of = %self.as_of, holdings = holdings.len(), "loaded SOMA holdings");
        Ok(holdings)
    }
}

/// Most recent Wednesday on or before `today`.
pub fn latest_wednesday(today: NaiveDate) -> NaiveDate {
    let since_wednesday = (today.weekday().num_days_from_monday() + 7 - 2) % 7;
    today - chrono::Duration::days(i64::from(since_wednesday))
}

/// Parse the holdings CSV into per-CUSIP enrichment fields.
pub fn parse_holdings<R: Read>(reader: R) -> Result<HashMap<String, Enrichment>, FetchError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = reader.headers()?.clone();
    let column = |name: &str| {
        headers
            .iter()
            .position(|h| normalize_header_name(h) == name)
            .ok_or_else(|| FetchError::Decode {
                url: String::new(),
                message: format!("SOMA CSV has no `{name}` column"),
            })
    };
    let cusip_idx = column(COL_CUSIP)?;
    let par_idx = column(COL_PAR_VALUE)?;

    let mut out = HashMap::new();
    for record in reader.records() {
        let record = record?;
        let Some(cusip) = record.get(cusip_idx).filter(|c| !c.is_empty()) else {
            continue;
        };
        let par = record.get(par_idx).unwrap_or_default();

        let mut fields = Enrichment::new();
        fields.insert(
            FIELD_SOMA_HOLDING_AMOUNT.to_string(),
            Value::String(par.to_string()),
        );
        out.insert(cusip.to_string(), fields);
    }
    Ok(out)
}

fn normalize_header_name(name: &str) -> String {
    // Strip a UTF-8 BOM on the first header so the lookup still matches.
    let name = name.trim().trim_start_matches('\u{feff}');
    name.to_ascii_lowercase()
}
