//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - the raw record representation (`RawIssue`) and well-known field names
//! - query enums (`SecurityType`, `ReportKind`)
//! - report keying choices (`DateField`, `DateAttribute`, `Granularity`)

pub mod types;

pub use types::*;
