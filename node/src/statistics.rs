//! Statistics gathered during play, mostly for debugging the arena
//!
//! Round-trip times are aggregated per peer address with Welford's online
//! algorithm, so every sample is folded in O(1) without keeping history.
//! IR counters track beams fired, acknowledged hits and decoded signals.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

const LOCALHOST: &str = "localhost";

/// Streaming estimator of count, mean, deviation and range.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
    sum: f64,
}

impl RunningStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn feed(&mut self, x: f64) {
        if self.count == 0 {
            self.count = 1;
            self.mean = x;
            self.m2 = 0.0;
            self.min = x;
            self.max = x;
            self.sum = x;
            return;
        }

        self.count += 1;
        let delta = x - self.mean;
        let delta_n = delta / self.count as f64;
        self.m2 += delta * delta_n * (self.count - 1) as f64;
        self.mean += delta_n;
        self.min = self.min.min(x);
        self.max = self.max.max(x);
        self.sum += x;
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        self.mean
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    pub fn sum(&self) -> f64 {
        self.sum
    }

    /// Sample standard deviation, NaN with fewer than two samples
    pub fn std_dev(&self) -> f64 {
        if self.count > 1 {
            (self.m2 / (self.count - 1) as f64).sqrt()
        } else {
            f64::NAN
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Read-only view of one [`RunningStats`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatsSnapshot {
    pub count: u64,
    pub sum: f64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSnapshot {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count(),
            sum: stats.sum(),
            min: stats.min(),
            max: stats.max(),
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

/// Counters for the IR emitter and detector
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IrStats {
    /// Acknowledged hits from other robots
    pub ack_hits: u32,
    /// Acknowledged hits from our own beam
    pub ack_back_fire: u32,
    /// Beams fired by this robot
    pub count_fires: u32,
    /// Received signals whose checksum matched
    pub raw_signals_match: u32,
    /// Received signals whose checksum did not match
    pub raw_signals_mismatch: u32,
    /// Matching signals discarded because of interference
    pub raw_signals_wrong: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StatisticsSummary {
    pub lag_by_address: BTreeMap<String, StatsSnapshot>,
    pub ir: IrStats,
}

#[derive(Debug, Clone, Copy)]
pub enum IrCounter {
    AckHits,
    AckBackFire,
    CountFires,
    RawSignalsMatch,
    RawSignalsMismatch,
}

/// Thread-safe statistics store shared by the node.
#[derive(Debug, Default)]
pub struct Statistics {
    lag_by_address: Mutex<HashMap<String, RunningStats>>,
    ir: Mutex<IrStats>,
}

fn address_key(addr: &str) -> &str {
    if addr.is_empty() {
        LOCALHOST
    } else {
        addr
    }
}

// A poisoned statistics lock only means a panic mid-update of a counter;
// the data stays usable.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl Statistics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn feed_lag(&self, addr: &str, ping_ms: u64) {
        let mut lag = lock(&self.lag_by_address);
        lag.entry(address_key(addr).to_string())
            .or_default()
            .feed(ping_ms as f64);
    }

    pub fn lag_stats(&self, addr: &str) -> Option<StatsSnapshot> {
        let lag = lock(&self.lag_by_address);
        lag.get(address_key(addr)).map(StatsSnapshot::from)
    }

    pub fn addresses_with_lag_stats(&self) -> Vec<String> {
        let lag = lock(&self.lag_by_address);
        let mut addresses: Vec<String> = lag.keys().cloned().collect();
        addresses.sort();
        addresses
    }

    pub fn clear_lag_stats(&self) {
        lock(&self.lag_by_address).clear();
    }

    pub fn increment(&self, counter: IrCounter) {
        let mut ir = lock(&self.ir);
        match counter {
            IrCounter::AckHits => ir.ack_hits += 1,
            IrCounter::AckBackFire => ir.ack_back_fire += 1,
            IrCounter::CountFires => ir.count_fires += 1,
            IrCounter::RawSignalsMatch => ir.raw_signals_match += 1,
            IrCounter::RawSignalsMismatch => ir.raw_signals_mismatch += 1,
        }
    }

    pub fn add_raw_signals_wrong(&self, amount: u32) {
        lock(&self.ir).raw_signals_wrong += amount;
    }

    pub fn ir_stats(&self) -> IrStats {
        *lock(&self.ir)
    }

    pub fn clear_ir_stats(&self) {
        *lock(&self.ir) = IrStats::default();
    }

    pub fn clear_all(&self) {
        self.clear_lag_stats();
        self.clear_ir_stats();
    }

    /// Consistent copy of everything gathered so far
    pub fn summary(&self) -> StatisticsSummary {
        let lag_by_address = {
            let lag = lock(&self.lag_by_address);
            lag.iter()
                .map(|(addr, stats)| (addr.clone(), StatsSnapshot::from(stats)))
                .collect()
        };
        StatisticsSummary {
            lag_by_address,
            ir: self.ir_stats(),
        }
    }
}
