//! Connection state tracking - advisory signal for UI display
//!
//! Best-effort indicator of whether remote enhancement is currently likely
//! to succeed. Updated from real attempt outcomes by the orchestrator and
//! refreshable with an explicit probe. Never gates whether an attempt is
//! made.

use std::sync::atomic::{AtomicU32, AtomicU8, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::Client;
use tracing::{debug, warn};

use crate::config::Config;

/// Probe request deadline
const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Advisory connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Unknown,
    Connected,
    Disconnected,
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unknown => write!(f, "unknown"),
            Self::Connected => write!(f, "connected"),
            Self::Disconnected => write!(f, "disconnected"),
        }
    }
}

const STATE_UNKNOWN: u8 = 0;
const STATE_CONNECTED: u8 = 1;
const STATE_DISCONNECTED: u8 = 2;

/// Shared connection tracker.
///
/// Owned by the caller and injected into the orchestrator; independent
/// enhancement calls may record outcomes concurrently.
#[derive(Debug, Default)]
pub struct ConnectionTracker {
    state: AtomicU8,
    consecutive_failures: AtomicU32,
    last_success: Mutex<Option<DateTime<Utc>>>,
}

impl ConnectionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current advisory state
    pub fn state(&self) -> ConnectionState {
        match self.state.load(Ordering::Relaxed) {
            STATE_CONNECTED => ConnectionState::Connected,
            STATE_DISCONNECTED => ConnectionState::Disconnected,
            _ => ConnectionState::Unknown,
        }
    }

    /// Failures since the last successful attempt
    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures.load(Ordering::Relaxed)
    }

    /// Timestamp of the most recent successful attempt
    pub fn last_success(&self) -> Option<DateTime<Utc>> {
        *self.last_success.lock().expect("last_success lock poisoned")
    }

    /// Record a successful attempt: reset failures, mark connected
    pub fn record_success(&self) {
        self.consecutive_failures.store(0, Ordering::Relaxed);
        self.state.store(STATE_CONNECTED, Ordering::Relaxed);
        *self.last_success.lock().expect("last_success lock poisoned") = Some(Utc::now());
    }

    /// Record a failed attempt. The state itself only flips to disconnected
    /// once a whole request exhausts its candidates, via `mark_disconnected`.
    pub fn record_failure(&self) {
        self.consecutive_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Mark the remote as unreachable after a terminal request failure
    pub fn mark_disconnected(&self) {
        self.state.store(STATE_DISCONNECTED, Ordering::Relaxed);
    }

    /// Probe the API with a lightweight request and update state.
    ///
    /// Informational only; a disconnected reading never blocks real work.
    pub async fn refresh(&self, client: &Client, config: &Config) -> ConnectionState {
        let url = format!("{}/v1/models", config.base_url);
        debug!("Probing connection: {}", url);

        let result = client
            .get(&url)
            .timeout(PROBE_TIMEOUT)
            .header("Authorization", format!("Bearer {}", config.api_key))
            .send()
            .await;

        match result {
            Ok(resp) if resp.status().is_success() => {
                self.state.store(STATE_CONNECTED, Ordering::Relaxed);
            }
            Ok(resp) => {
                warn!("Connection probe returned {}", resp.status());
                self.state.store(STATE_DISCONNECTED, Ordering::Relaxed);
            }
            Err(e) => {
                warn!("Connection probe failed: {}", e);
                self.state.store(STATE_DISCONNECTED, Ordering::Relaxed);
            }
        }

        self.state()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state_is_unknown() {
        let tracker = ConnectionTracker::new();
        assert_eq!(tracker.state(), ConnectionState::Unknown);
        assert_eq!(tracker.consecutive_failures(), 0);
        assert!(tracker.last_success().is_none());
    }

    #[test]
    fn test_success_resets_failures() {
        let tracker = ConnectionTracker::new();
        tracker.record_failure();
        tracker.record_failure();
        assert_eq!(tracker.consecutive_failures(), 2);

        tracker.record_success();
        assert_eq!(tracker.consecutive_failures(), 0);
        assert_eq!(tracker.state(), ConnectionState::Connected);
        assert!(tracker.last_success().is_some());
    }

    #[test]
    fn test_failures_do_not_flip_state_until_terminal() {
        let tracker = ConnectionTracker::new();
        tracker.record_failure();
        assert_eq!(tracker.state(), ConnectionState::Unknown);

        tracker.mark_disconnected();
        assert_eq!(tracker.state(), ConnectionState::Disconnected);
    }
}
