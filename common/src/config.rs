use std::time::Duration;

use crate::network::filter::UnaddressedPolicy;

pub const DEFAULT_UPDATE_INTERVAL: Duration = Duration::from_millis(100);
pub const DEFAULT_RECEIVE_TIMEOUT: Duration = Duration::from_millis(100);
pub const DEFAULT_SNAPSHOT_LEN: usize = 4096;
pub const DEFAULT_SWEEP_PROBE_DELAY: Duration = Duration::from_millis(2);

const MIN_IDLE_SLEEP: Duration = Duration::from_millis(1);
const MAX_IDLE_SLEEP: Duration = Duration::from_millis(50);

#[derive(Debug, Clone)]
pub struct Config {
    /// Directory-changed events are emitted no more often than this.
    pub update_interval: Duration,
    /// Upper bound on one blocking receive call; also the stop latency of a
    /// capture loop.
    pub receive_timeout: Duration,
    /// Bytes kept from each captured frame.
    pub snapshot_len: usize,
    pub promiscuous: bool,
    /// Admission of traffic seen on interfaces without an IPv4 address.
    pub unaddressed_policy: UnaddressedPolicy,
    /// Pause between two echo probes of a subnet sweep.
    pub sweep_probe_delay: Duration,
}

impl Config {
    /// How long the aggregator sleeps when the queue is empty: a tenth of
    /// the update interval, kept within [1 ms, 50 ms].
    pub fn idle_sleep(&self) -> Duration {
        (self.update_interval / 10).clamp(MIN_IDLE_SLEEP, MAX_IDLE_SLEEP)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            update_interval: DEFAULT_UPDATE_INTERVAL,
            receive_timeout: DEFAULT_RECEIVE_TIMEOUT,
            snapshot_len: DEFAULT_SNAPSHOT_LEN,
            promiscuous: true,
            unaddressed_policy: UnaddressedPolicy::default(),
            sweep_probe_delay: DEFAULT_SWEEP_PROBE_DELAY,
        }
    }
}
