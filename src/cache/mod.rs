//! Cache module for the district summary
//!
//! This module provides an in-memory, time-bounded cache in front of the
//! aggregator. It is owned by the service instance (not a process global) and
//! collapses concurrent refreshes into a single upstream fetch.

mod summary;

pub use summary::{CacheStats, SummaryCache, DEFAULT_CACHE_TTL};
