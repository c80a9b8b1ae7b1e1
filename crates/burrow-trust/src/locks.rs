//! Per-host mutual exclusion
//!
//! Two requests to the same host must not interleave their
//! verify/pin/purge steps. Requests to different hosts never wait on each
//! other.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Default)]
pub struct HostLocks {
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl HostLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock handle for `host`; callers hold `handle.lock()` for the exchange
    pub fn handle(&self, host: &str) -> Arc<Mutex<()>> {
        self.locks
            .lock()
            .entry(host.to_lowercase())
            .or_default()
            .clone()
    }
}
