//! Configuration management for datawebd.
//!
//! Loads settings from /etc/dataweb/config.toml or uses defaults. The
//! instrument set is fixed for the life of the process; the file is not
//! re-read while running.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tracing::{info, warn};

/// Config file path
pub const CONFIG_PATH: &str = "/etc/dataweb/config.toml";

/// Poll cadence, backoff, and log throttling
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntervalsConfig {
    /// Wait between successful polls, in seconds
    #[serde(default = "default_poll_secs")]
    pub poll_secs: u64,

    /// Wait after a failed poll, in seconds
    #[serde(default = "default_backoff_secs")]
    pub backoff_secs: u64,

    /// Suppressed failures between repeated failure log entries
    #[serde(default = "default_failures_between_logs")]
    pub failures_between_logs: u32,

    /// Timeout for each HTTP request to an instrument, in seconds
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,
}

fn default_poll_secs() -> u64 {
    3
}

fn default_backoff_secs() -> u64 {
    60
}

fn default_failures_between_logs() -> u32 {
    60
}

fn default_fetch_timeout_secs() -> u64 {
    10
}

impl Default for IntervalsConfig {
    fn default() -> Self {
        Self {
            poll_secs: default_poll_secs(),
            backoff_secs: default_backoff_secs(),
            failures_between_logs: default_failures_between_logs(),
            fetch_timeout_secs: default_fetch_timeout_secs(),
        }
    }
}

/// Daemon configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Address the query server listens on
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// Instruments whose host is the name with an "NDX" prefix
    #[serde(default = "default_ndx_instruments")]
    pub ndx_instruments: Vec<String>,

    /// Non-NDX instruments, name -> explicit host
    #[serde(default = "default_instruments")]
    pub instruments: HashMap<String, String>,

    #[serde(default)]
    pub intervals: IntervalsConfig,
}

fn default_bind_address() -> String {
    "0.0.0.0:60000".to_string()
}

fn default_ndx_instruments() -> Vec<String> {
    ["DEMO", "LARMOR", "IMAT", "IRIS", "VESUVIO", "ALF", "ZOOM", "POLARIS", "HRPD"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_instruments() -> HashMap<String, String> {
    HashMap::from([("MUONFE".to_string(), "NDEMUONFE".to_string())])
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            ndx_instruments: default_ndx_instruments(),
            instruments: default_instruments(),
            intervals: IntervalsConfig::default(),
        }
    }
}

/// A monitored instrument: short name plus resolved host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instrument {
    pub name: String,
    pub host: String,
}

impl Config {
    /// Load configuration from the given path, falling back to defaults if
    /// the file is absent or malformed.
    pub fn load(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(contents) => match toml::from_str(&contents) {
                Ok(config) => {
                    info!("Loaded configuration from {}", path.display());
                    config
                }
                Err(e) => {
                    warn!("Invalid config at {}: {} - using defaults", path.display(), e);
                    Self::default()
                }
            },
            Err(_) => {
                info!("No config at {} - using defaults", path.display());
                Self::default()
            }
        }
    }

    /// The full instrument set, hosts resolved, sorted by name.
    ///
    /// An explicit host wins over NDX derivation if a name appears in both
    /// tables.
    pub fn instrument_list(&self) -> Vec<Instrument> {
        let mut by_name: HashMap<String, String> = self
            .ndx_instruments
            .iter()
            .map(|name| (name.clone(), format!("NDX{}", name)))
            .collect();
        by_name.extend(self.instruments.clone());

        let mut list: Vec<Instrument> = by_name
            .into_iter()
            .map(|(name, host)| Instrument { name, host })
            .collect();
        list.sort_by(|a, b| a.name.cmp(&b.name));
        list
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.bind_address, "0.0.0.0:60000");
        assert_eq!(config.intervals.poll_secs, 3);
        assert_eq!(config.intervals.backoff_secs, 60);
        assert_eq!(config.intervals.failures_between_logs, 60);
        assert_eq!(config.instruments["MUONFE"], "NDEMUONFE");
    }

    #[test]
    fn test_ndx_resolution_prefixes_host() {
        let config = Config::default();
        let list = config.instrument_list();
        let larmor = list.iter().find(|i| i.name == "LARMOR").unwrap();
        assert_eq!(larmor.host, "NDXLARMOR");
        let muonfe = list.iter().find(|i| i.name == "MUONFE").unwrap();
        assert_eq!(muonfe.host, "NDEMUONFE");
    }

    #[test]
    fn test_explicit_host_wins_over_ndx() {
        let config = Config {
            ndx_instruments: vec!["LARMOR".to_string()],
            instruments: HashMap::from([("LARMOR".to_string(), "TESTHOST".to_string())]),
            ..Config::default()
        };
        let list = config.instrument_list();
        let larmor = list.iter().find(|i| i.name == "LARMOR").unwrap();
        assert_eq!(larmor.host, "TESTHOST");
    }

    #[test]
    fn test_instrument_list_sorted() {
        let names: Vec<String> = Config::default()
            .instrument_list()
            .into_iter()
            .map(|i| i.name)
            .collect();
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);
    }

    #[test]
    fn test_partial_file_gets_field_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "bind_address = \"127.0.0.1:9000\"\n\n[intervals]\npoll_secs = 1"
        )
        .unwrap();

        let config = Config::load(file.path());
        assert_eq!(config.bind_address, "127.0.0.1:9000");
        assert_eq!(config.intervals.poll_secs, 1);
        assert_eq!(config.intervals.backoff_secs, 60);
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let config = Config::load(Path::new("/nonexistent/dataweb.toml"));
        assert_eq!(config.bind_address, "0.0.0.0:60000");
    }
}
