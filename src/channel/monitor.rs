//! Shared, read-mostly view of a channel for the supervisor and UI

use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

use crate::channel::state::ChannelState;

/// Per-channel counters, updated by the worker
#[derive(Debug, Default)]
pub struct ChannelStats {
    datagrams_received: AtomicU64,
    samples_written: AtomicU64,
    malformed_records: AtomicU64,
    wraps: AtomicU64,
    last_adjusted_time: AtomicI64,
}

impl ChannelStats {
    pub fn record_datagram(&self) {
        self.datagrams_received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_sample(&self, adjusted_time: i64) {
        self.last_adjusted_time.store(adjusted_time, Ordering::Relaxed);
        self.samples_written.fetch_add(1, Ordering::Release);
    }

    pub fn record_malformed(&self) {
        self.malformed_records.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_wrap(&self) {
        self.wraps.fetch_add(1, Ordering::Relaxed);
    }

    pub fn samples_written(&self) -> u64 {
        self.samples_written.load(Ordering::Acquire)
    }

    pub fn reset(&self) {
        self.datagrams_received.store(0, Ordering::Relaxed);
        self.samples_written.store(0, Ordering::Relaxed);
        self.malformed_records.store(0, Ordering::Relaxed);
        self.wraps.store(0, Ordering::Relaxed);
        self.last_adjusted_time.store(0, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            datagrams_received: self.datagrams_received.load(Ordering::Relaxed),
            samples_written: self.samples_written.load(Ordering::Acquire),
            malformed_records: self.malformed_records.load(Ordering::Relaxed),
            wraps: self.wraps.load(Ordering::Relaxed),
            last_adjusted_time: self.last_adjusted_time.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`ChannelStats`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub datagrams_received: u64,
    pub samples_written: u64,
    pub malformed_records: u64,
    pub wraps: u64,
    pub last_adjusted_time: i64,
}

/// State, counters and bound address of one channel
#[derive(Debug, Default)]
pub struct ChannelMonitor {
    state: RwLock<ChannelState>,
    stats: ChannelStats,
    local_addr: RwLock<Option<SocketAddr>>,
    warnings: Mutex<Vec<String>>,
}

impl ChannelMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> ChannelState {
        self.state.read().clone()
    }

    /// Apply a state change if the lifecycle allows it.
    ///
    /// Returns whether the state changed.
    pub fn transition(&self, next: ChannelState) -> bool {
        let mut state = self.state.write();
        if !state.can_transition_to(&next) {
            tracing::debug!("Ignoring transition {} -> {}", *state, next);
            return false;
        }
        tracing::debug!("State {} -> {}", *state, next);
        *state = next;
        true
    }

    /// Prepare for a new session: back to Idle, counters cleared
    pub fn begin_session(&self) {
        self.transition(ChannelState::Idle);
        self.stats.reset();
        *self.local_addr.write() = None;
    }

    pub fn stats(&self) -> &ChannelStats {
        &self.stats
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        *self.local_addr.read()
    }

    pub fn set_local_addr(&self, addr: Option<SocketAddr>) {
        *self.local_addr.write() = addr;
    }

    pub fn record_warning(&self, warning: impl Into<String>) {
        self.warnings.lock().push(warning.into());
    }

    pub fn warnings(&self) -> Vec<String> {
        self.warnings.lock().clone()
    }
}
