//! Upstream data sources.
//!
//! - `floodnet` - FloodNet REST API: URL construction + blocking transport
//! - `fixtures` (test only) - representative API response payloads

pub mod floodnet;

#[cfg(test)]
pub(crate) mod fixtures;
