//! Data retrieval: TreasuryDirect securities, NY Fed SOMA holdings, and the
//! helpers that validate queries and join the two sources.

pub mod enrich;
pub mod soma;
pub mod treasury;
pub mod validate;

pub use enrich::enrich;
pub use soma::FedSoma;
pub use treasury::{Endpoint, SearchQuery, SecurityQuery, TreasuryDirect};
