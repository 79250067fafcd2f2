//! The per-instrument status snapshot and its cache entry states.

use crate::block::BlockDetails;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Everything a dataweb screen needs about one instrument at one instant.
///
/// Produced whole by a fetch and never mutated afterwards. BTreeMaps keep
/// the serialized form stable between polls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    /// Name of the configuration the instrument is running.
    pub config_name: String,
    /// Group name -> block name -> block state, as configured.
    pub groups: BTreeMap<String, BTreeMap<String, BlockDetails>>,
    /// Selected run metadata PVs (run state, run number, beam current, ...).
    pub inst_pvs: BTreeMap<String, BlockDetails>,
}

impl Reading {
    pub fn new(config_name: impl Into<String>) -> Self {
        Self {
            config_name: config_name.into(),
            groups: BTreeMap::new(),
            inst_pvs: BTreeMap::new(),
        }
    }
}

/// What the cache holds for an instrument that has completed at least one
/// poll. Instruments never polled have no entry at all.
#[derive(Debug, Clone, PartialEq)]
pub enum CacheEntry {
    /// The latest successfully fetched reading.
    Present(Reading),
    /// The last poll failed; previous data is not served.
    Unavailable,
}

impl CacheEntry {
    pub fn is_present(&self) -> bool {
        matches!(self, CacheEntry::Present(_))
    }
}
