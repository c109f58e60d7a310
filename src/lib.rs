//! MGNREGA district comparison library
//!
//! Exposes the record source, aggregator, summary cache, HTTP API and
//! comparison helpers for use by the binary and integration tests.

pub mod cache;
pub mod cli;
pub mod client;
pub mod data;
pub mod insight;
pub mod logging;
pub mod server;
