//! Call Pacer
//!
//! Courtesy rate limiting toward the external lookup service: enforces a
//! minimum delay between the end of one call and the start of the next.

use std::time::Duration;
use tokio::sync::{Mutex, MutexGuard};
use tokio::time::{sleep_until, Instant};

/// Pacer configuration.
#[derive(Debug, Clone)]
pub struct PacerConfig {
    /// Minimum gap between two successive external calls
    pub min_interval: Duration,
}

impl Default for PacerConfig {
    fn default() -> Self {
        Self {
            min_interval: Duration::from_millis(20),
        }
    }
}

/// Serializes external calls and spaces them out.
///
/// Only real calls go through the pacer; cache hits and blank rows never
/// touch it, so they cost no delay. Holding a [`PacerPermit`] also means
/// no other call to the same service is in flight.
pub struct CallPacer {
    config: PacerConfig,
    /// When the previous call finished
    last_call: Mutex<Option<Instant>>,
}

impl CallPacer {
    pub fn new(config: PacerConfig) -> Self {
        Self {
            config,
            last_call: Mutex::new(None),
        }
    }

    /// Wait until the next call is allowed.
    ///
    /// The returned permit must be held for the duration of the call;
    /// dropping it records the call's end time.
    pub async fn acquire(&self) -> PacerPermit<'_> {
        let guard = self.last_call.lock().await;

        if let Some(last) = *guard {
            let ready_at = last + self.config.min_interval;
            if Instant::now() < ready_at {
                tracing::trace!(
                    "pacing next lookup call by {:?}",
                    ready_at.saturating_duration_since(Instant::now())
                );
                sleep_until(ready_at).await;
            }
        }

        PacerPermit { guard }
    }

    /// When the last paced call finished, if any.
    pub async fn last_call(&self) -> Option<Instant> {
        *self.last_call.lock().await
    }
}

/// Exclusive right to issue one external call.
pub struct PacerPermit<'a> {
    guard: MutexGuard<'a, Option<Instant>>,
}

impl Drop for PacerPermit<'_> {
    fn drop(&mut self) {
        *self.guard = Some(Instant::now());
    }
}
