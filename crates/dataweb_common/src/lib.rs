//! Dataweb Common - shared types for the dataweb daemon.
//!
//! The data model for instrument readings: blocks as shown on an
//! instrument's dataweb screen, the per-instrument `Reading` snapshot,
//! the cache entry states, and the fetch error taxonomy.

pub mod block;
pub mod error;
pub mod reading;

pub use block::{Block, BlockDetails, BlockStatus};
pub use error::FetchError;
pub use reading::{CacheEntry, Reading};
