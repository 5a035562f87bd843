//! Webserver state management
//!
//! Requests are independent; the only shared state is a handful of counters
//! reported by the health route.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Instant;

/// Process-wide server counters
#[derive(Debug)]
pub struct WebServerState {
    is_running: AtomicBool,
    streams_started: AtomicU64,
    active_streams: AtomicU64,
    server_start_time: Instant,
}

impl Default for WebServerState {
    fn default() -> Self {
        Self::new()
    }
}

impl WebServerState {
    pub fn new() -> Self {
        Self {
            is_running: AtomicBool::new(true),
            streams_started: AtomicU64::new(0),
            active_streams: AtomicU64::new(0),
            server_start_time: Instant::now(),
        }
    }

    pub fn is_running(&self) -> bool {
        self.is_running.load(Ordering::Relaxed)
    }

    pub fn set_running(&self, running: bool) {
        self.is_running.store(running, Ordering::Relaxed);
    }

    pub fn get_uptime_seconds(&self) -> u64 {
        self.server_start_time.elapsed().as_secs()
    }

    /// Record a forwarding loop starting; returns the number now active
    pub fn stream_started(&self) -> u64 {
        self.streams_started.fetch_add(1, Ordering::Relaxed);
        self.active_streams.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Record a forwarding loop ending; returns the number still active
    pub fn stream_finished(&self) -> u64 {
        let previous = self
            .active_streams
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| Some(n.saturating_sub(1)))
            .unwrap_or(0);
        previous.saturating_sub(1)
    }

    pub fn active_streams(&self) -> u64 {
        self.active_streams.load(Ordering::Relaxed)
    }

    pub fn streams_started(&self) -> u64 {
        self.streams_started.load(Ordering::Relaxed)
    }
}
