//! Per-intent retry delays for the controller's error policy.
//!
//! Delays follow a Fibonacci sequence in whole minutes between the configured
//! bounds (1m, 1m, 2m, 3m, 5m, 8m, 10m with the defaults). Every intent keeps
//! its own sequence, which is cleared after a successful attempt or once the
//! intent is gone.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

#[derive(Debug, Clone, Copy)]
struct Sequence {
    prev_minutes: u64,
    current_minutes: u64,
}

/// Fibonacci retry delays keyed by `namespace/name`
#[derive(Debug)]
pub struct RetryBackoff {
    min_minutes: u64,
    max_minutes: u64,
    sequences: Mutex<HashMap<String, Sequence>>,
}

impl RetryBackoff {
    /// Bounds are in minutes; `min_minutes` is used for the first two retries
    #[must_use]
    pub fn new(min_minutes: u64, max_minutes: u64) -> Self {
        Self {
            min_minutes,
            max_minutes,
            sequences: Mutex::new(HashMap::new()),
        }
    }

    fn sequences(&self) -> MutexGuard<'_, HashMap<String, Sequence>> {
        self.sequences.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Delay before the next retry of `key`, advancing its sequence
    pub fn next_delay(&self, key: &str) -> Duration {
        let mut sequences = self.sequences();
        let seq = sequences.entry(key.to_string()).or_insert(Sequence {
            prev_minutes: 0,
            current_minutes: self.min_minutes,
        });

        let delay = Duration::from_secs(seq.current_minutes * 60);
        let next = (seq.prev_minutes + seq.current_minutes).min(self.max_minutes);
        seq.prev_minutes = seq.current_minutes;
        seq.current_minutes = next;
        delay
    }

    /// Drop the sequence of `key`; its next failure starts again at the minimum
    pub fn clear(&self, key: &str) {
        self.sequences().remove(key);
    }

    #[cfg(test)]
    pub fn tracked(&self) -> usize {
        self.sequences().len()
    }
}
