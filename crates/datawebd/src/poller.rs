//! Per-instrument polling loops and their supervisor.
//!
//! Each instrument gets one task that fetches, writes the cache, and waits:
//! a short cadence while the instrument answers, a long backoff while it
//! does not. Failures never cross instrument boundaries, and a stop request
//! lands within the wait granularity no matter which state a loop is in.

use crate::cache::ReadingCache;
use crate::config::{Instrument, IntervalsConfig};
use crate::fetch::ReadingFetcher;
use dataweb_common::CacheEntry;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// Granularity at which waits notice a stop request.
const WAIT_SLICE: Duration = Duration::from_secs(1);

/// Timing and throttling knobs for the poll loops.
#[derive(Debug, Clone, Copy)]
pub struct PollIntervals {
    /// Wait between successful polls.
    pub poll: Duration,
    /// Wait after a failed poll.
    pub backoff: Duration,
    /// Suppressed failures between repeated failure notices.
    pub failures_between_logs: u32,
}

impl From<&IntervalsConfig> for PollIntervals {
    fn from(config: &IntervalsConfig) -> Self {
        Self {
            poll: Duration::from_secs(config.poll_secs),
            backoff: Duration::from_secs(config.backoff_secs),
            failures_between_logs: config.failures_between_logs,
        }
    }
}

/// Decides which poll outcomes get logged.
///
/// The first failure after a success is logged; during a continued outage
/// only every `threshold`-th failure after that is. The counter resets on
/// success and on every emitted notice, so the gap between notices is
/// always exactly `threshold` failures.
#[derive(Debug)]
pub struct FailureLog {
    threshold: u32,
    consecutive: u32,
    previously_failed: bool,
}

impl FailureLog {
    pub fn new(threshold: u32) -> Self {
        Self {
            threshold,
            consecutive: 0,
            previously_failed: false,
        }
    }

    /// Record a success. Returns whether to log a reconnect notice.
    pub fn on_success(&mut self) -> bool {
        let reconnected = self.previously_failed;
        self.previously_failed = false;
        self.consecutive = 0;
        reconnected
    }

    /// Record a failure. Returns whether to log a failure notice.
    pub fn on_failure(&mut self) -> bool {
        self.consecutive += 1;
        let emit = !self.previously_failed || self.consecutive >= self.threshold;
        if emit {
            self.consecutive = 0;
        }
        self.previously_failed = true;
        emit
    }
}

/// One instrument's polling loop.
struct Poller {
    name: String,
    host: String,
    fetcher: Arc<dyn ReadingFetcher>,
    cache: ReadingCache,
    intervals: PollIntervals,
    failures: FailureLog,
    shutdown: CancellationToken,
}

impl Poller {
    async fn run(mut self) {
        info!("Polling {} at {}", self.name, self.host);

        while !self.shutdown.is_cancelled() {
            let result = tokio::select! {
                _ = self.shutdown.cancelled() => break,
                result = self.fetcher.fetch(&self.host) => result,
            };

            match result {
                Ok(reading) => {
                    self.cache
                        .set(&self.name, CacheEntry::Present(reading))
                        .await;
                    if self.failures.on_success() {
                        error!("Reconnected with {}", self.name);
                    }
                    self.wait(self.intervals.poll).await;
                }
                Err(e) => {
                    self.cache.set(&self.name, CacheEntry::Unavailable).await;
                    if self.failures.on_failure() {
                        error!(
                            "Failed to get data from instrument {} at {}: {}",
                            self.name, self.host, e
                        );
                    }
                    self.wait(self.intervals.backoff).await;
                }
            }
        }

        debug!("Poller for {} stopped", self.name);
    }

    /// Sleep in short slices so a stop request lands quickly even in the
    /// middle of a long backoff.
    async fn wait(&self, total: Duration) {
        let mut remaining = total;
        while !remaining.is_zero() {
            if self.shutdown.is_cancelled() {
                return;
            }
            let slice = remaining.min(WAIT_SLICE);
            sleep(slice).await;
            remaining -= slice;
        }
    }
}

/// Owns every running poller: one task per instrument, all hanging off a
/// single parent cancellation token.
pub struct PollerSet {
    shutdown: CancellationToken,
    handles: Vec<JoinHandle<()>>,
}

impl PollerSet {
    /// Start one poller per instrument.
    pub fn spawn(
        instruments: &[Instrument],
        fetcher: Arc<dyn ReadingFetcher>,
        cache: ReadingCache,
        intervals: PollIntervals,
    ) -> Self {
        let shutdown = CancellationToken::new();

        let handles: Vec<JoinHandle<()>> = instruments
            .iter()
            .map(|instrument| {
                let poller = Poller {
                    name: instrument.name.clone(),
                    host: instrument.host.clone(),
                    fetcher: Arc::clone(&fetcher),
                    cache: cache.clone(),
                    intervals,
                    failures: FailureLog::new(intervals.failures_between_logs),
                    shutdown: shutdown.child_token(),
                };
                tokio::spawn(poller.run())
            })
            .collect();

        info!("Started {} pollers", handles.len());
        Self { shutdown, handles }
    }

    /// Signal every poller to stop and wait until each has done so. No
    /// cache writes happen after this returns.
    pub async fn shutdown(self) {
        info!("Stopping {} pollers", self.handles.len());
        self.shutdown.cancel();
        for handle in self.handles {
            let _ = handle.await;
        }
        info!("All pollers stopped");
    }
}
