//! `treasury-reports` library crate.
//!
//! The binary (`tdr`) is a thin wrapper around this library so that:
//!
//! - the report engine is testable without network access or processes
//! - retrieval and aggregation stay separate (`data` vs `report`)
//! - other tools can feed their own records into `report::produce_report`

pub mod app;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod report;
