//! Configuration management for the lock simulator.
//!
//! Loads configuration from environment variables with sensible defaults.

use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Lock lifecycle configuration
    pub locks: LockConfig,
    /// Simulated backend latencies
    pub latency: LatencyConfig,
    /// Event log configuration
    pub log: LogConfig,
}

/// Lock lifecycle configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockConfig {
    /// How long a lock is held before it is eligible for reclaim, in seconds
    pub lock_duration_secs: u64,
    /// How often the expiry scheduler scans for stale locks, in seconds
    pub reclaim_interval_secs: u64,
}

/// Simulated backend latencies, in milliseconds.
///
/// Each command-style operation sleeps for its configured latency between
/// accepting the request and applying the atomic mutation. Zero disables the
/// delay, which tests rely on.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LatencyConfig {
    /// Latency of a user-initiated lock acquisition
    pub acquire_ms: u64,
    /// Latency of payment processing during commit
    pub commit_ms: u64,
    /// Latency of a bot-initiated lock acquisition
    pub bot_acquire_ms: u64,
    /// Pause before the deadlock narrative reports detection
    pub narrative_detect_ms: u64,
    /// Pause before the deadlock narrative reports the retry outcome
    pub narrative_retry_ms: u64,
}

/// Event log configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Maximum retained entries; older entries are evicted first
    pub capacity: usize,
}

impl Config {
    /// Load configuration from environment variables, falling back to
    /// defaults for anything unset or unparseable.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            locks: LockConfig {
                lock_duration_secs: env::var("CINELOCK_LOCK_DURATION_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(420), // 7 minutes
                reclaim_interval_secs: env::var("CINELOCK_RECLAIM_INTERVAL_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(5),
            },
            latency: LatencyConfig {
                acquire_ms: env::var("CINELOCK_ACQUIRE_LATENCY_MS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(800),
                commit_ms: env::var("CINELOCK_COMMIT_LATENCY_MS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(1500),
                bot_acquire_ms: env::var("CINELOCK_BOT_ACQUIRE_LATENCY_MS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(1200),
                narrative_detect_ms: env::var("CINELOCK_NARRATIVE_DETECT_MS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(2000),
                narrative_retry_ms: env::var("CINELOCK_NARRATIVE_RETRY_MS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(1000),
            },
            log: LogConfig {
                capacity: env::var("CINELOCK_LOG_CAPACITY")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(50),
            },
        }
    }

    /// Lock hold duration as a [`Duration`].
    #[must_use]
    pub const fn lock_duration(&self) -> Duration {
        Duration::from_secs(self.locks.lock_duration_secs)
    }

    /// Reclaim scan period as a [`Duration`].
    #[must_use]
    pub const fn reclaim_interval(&self) -> Duration {
        Duration::from_secs(self.locks.reclaim_interval_secs)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}

impl LatencyConfig {
    /// Production-like latencies matching the simulated backend.
    #[must_use]
    pub const fn realistic() -> Self {
        Self {
            acquire_ms: 800,
            commit_ms: 1500,
            bot_acquire_ms: 1200,
            narrative_detect_ms: 2000,
            narrative_retry_ms: 1000,
        }
    }

    /// All latencies zeroed; operations complete as fast as the runtime
    /// schedules them. Intended for tests.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            acquire_ms: 0,
            commit_ms: 0,
            bot_acquire_ms: 0,
            narrative_detect_ms: 0,
            narrative_retry_ms: 0,
        }
    }

    /// Acquire latency as a [`Duration`], picked per requester kind.
    #[must_use]
    pub const fn acquire(&self, is_bot: bool) -> Duration {
        if is_bot {
            Duration::from_millis(self.bot_acquire_ms)
        } else {
            Duration::from_millis(self.acquire_ms)
        }
    }

    /// Commit latency as a [`Duration`].
    #[must_use]
    pub const fn commit(&self) -> Duration {
        Duration::from_millis(self.commit_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_simulated_backend() {
        let config = Config::from_env();
        assert_eq!(config.lock_duration(), Duration::from_secs(7 * 60));
        assert_eq!(config.reclaim_interval(), Duration::from_secs(5));
        assert_eq!(config.log.capacity, 50);
        assert_eq!(config.latency.acquire(false), Duration::from_millis(800));
        assert_eq!(config.latency.acquire(true), Duration::from_millis(1200));
        assert_eq!(config.latency.commit(), Duration::from_millis(1500));
    }

    #[test]
    fn zeroed_latencies_disable_delays() {
        let latency = LatencyConfig::none();
        assert_eq!(latency.acquire(false), Duration::ZERO);
        assert_eq!(latency.acquire(true), Duration::ZERO);
        assert_eq!(latency.commit(), Duration::ZERO);
    }
}
