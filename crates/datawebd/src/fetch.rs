//! Fetching instrument status pages.
//!
//! `ReadingFetcher` is the seam between the pollers and the network:
//! production uses `PageFetcher` against the instrument's archive and
//! blockserver ports; tests script their own implementations.

use crate::scrape::{self, BlockserverConfig, ChannelList};
use async_trait::async_trait;
use dataweb_common::{FetchError, Reading};
use std::time::Duration;

/// Instrument PV archive port
const PORT_INSTPV: u16 = 4812;
/// Block archive port
const PORT_BLOCKS: u16 = 4813;
/// Blockserver configuration port
const PORT_CONFIG: u16 = 8008;

/// Produces the current `Reading` for a host, or fails as a whole.
#[async_trait]
pub trait ReadingFetcher: Send + Sync {
    async fn fetch(&self, host: &str) -> Result<Reading, FetchError>;
}

/// HTTP fetcher reading the archive group pages and the blockserver
/// configuration.
pub struct PageFetcher {
    client: reqwest::Client,
}

impl PageFetcher {
    /// The timeout bounds every request, so one hung host cannot stall its
    /// poller past a single attempt.
    pub fn new(timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_default(),
        }
    }

    async fn get_text(&self, url: &str) -> Result<String, FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::Http(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        response.text().await.map_err(|e| FetchError::Http(e.to_string()))
    }

    async fn read_group(
        &self,
        host: &str,
        port: u16,
        group: &str,
    ) -> Result<ChannelList, FetchError> {
        let url = format!("http://{host}:{port}/group?name={group}&format=json");
        let text = self.get_text(&url).await?;
        serde_json::from_str(&text).map_err(|e| FetchError::Parse {
            url,
            reason: e.to_string(),
        })
    }

    async fn read_config(&self, host: &str) -> Result<BlockserverConfig, FetchError> {
        let url = format!("http://{host}:{PORT_CONFIG}/");
        let text = self.get_text(&url).await?;
        let repaired = repair_python_literal(&text);
        serde_json::from_str(&repaired).map_err(|e| FetchError::Parse {
            url,
            reason: e.to_string(),
        })
    }
}

#[async_trait]
impl ReadingFetcher for PageFetcher {
    async fn fetch(&self, host: &str) -> Result<Reading, FetchError> {
        let config = self.read_config(host).await?;

        let blocks_log =
            scrape::extract_blocks(&self.read_group(host, PORT_BLOCKS, "BLOCKS").await?);
        let blocks_nolog =
            scrape::extract_blocks(&self.read_group(host, PORT_BLOCKS, "DATAWEB").await?);
        let inst_blocks =
            scrape::extract_blocks(&self.read_group(host, PORT_INSTPV, "INST").await?);

        scrape::build_reading(&config, blocks_log, blocks_nolog, inst_blocks)
    }
}

/// The blockserver prints a Python literal rather than JSON; repair the
/// quoting and keyword spellings before parsing.
pub fn repair_python_literal(raw: &str) -> String {
    raw.replace('\'', "\"")
        .replace("None", "null")
        .replace("True", "true")
        .replace("False", "false")
}
