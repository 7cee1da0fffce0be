//! Pool configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default maximum number of concurrently leased resources
pub const DEFAULT_CAPACITY: usize = 25;

/// Default time a caller waits for a resource before giving up
pub const DEFAULT_ACQUIRE_TIMEOUT_MS: u64 = 30_000;

/// Resource pool configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Maximum number of concurrently leased resources. Zero means
    /// unbounded: every acquire that finds no idle resource creates one.
    pub capacity: usize,
    /// Number of idle resources to pre-create when the pool is warmed
    pub reserved: usize,
    /// How long an acquire waits for a resource before failing
    pub acquire_timeout_ms: u64,
    /// Maximum time a resource may stay leased before the sweep retires
    /// it. `None` disables lifetime enforcement.
    pub max_lifetime_ms: Option<u64>,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            reserved: 0,
            acquire_timeout_ms: DEFAULT_ACQUIRE_TIMEOUT_MS,
            max_lifetime_ms: None,
        }
    }
}

impl PoolConfig {
    /// Create a configuration with the given capacity
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            ..Default::default()
        }
    }

    /// Set the number of pre-created idle resources
    ///
    /// # Panics
    ///
    /// Panics if `reserved` exceeds a non-zero capacity.
    pub fn with_reserved(mut self, reserved: usize) -> Self {
        assert!(
            self.capacity == 0 || reserved <= self.capacity,
            "reserved ({reserved}) must not exceed capacity ({})",
            self.capacity
        );
        self.reserved = reserved;
        self
    }

    /// Set the acquire timeout in milliseconds
    pub fn with_acquire_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.acquire_timeout_ms = timeout_ms;
        self
    }

    /// Set the maximum lease lifetime in milliseconds
    pub fn with_max_lifetime_ms(mut self, lifetime_ms: u64) -> Self {
        self.max_lifetime_ms = Some(lifetime_ms);
        self
    }

    /// Acquire timeout as a [`Duration`]
    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_millis(self.acquire_timeout_ms)
    }

    /// Maximum lease lifetime as a [`Duration`], if enforced
    pub fn max_lifetime(&self) -> Option<Duration> {
        self.max_lifetime_ms.map(Duration::from_millis)
    }

    /// Whether the pool caps the number of concurrent leases
    pub fn is_bounded(&self) -> bool {
        self.capacity > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = PoolConfig::default();
        assert_eq!(config.capacity, DEFAULT_CAPACITY);
        assert_eq!(config.reserved, 0);
        assert_eq!(config.acquire_timeout(), Duration::from_secs(30));
        assert!(config.max_lifetime().is_none());
        assert!(config.is_bounded());
    }

    #[test]
    fn builder_chain() {
        let config = PoolConfig::new(4)
            .with_reserved(2)
            .with_acquire_timeout_ms(500)
            .with_max_lifetime_ms(60_000);
        assert_eq!(config.capacity, 4);
        assert_eq!(config.reserved, 2);
        assert_eq!(config.acquire_timeout(), Duration::from_millis(500));
        assert_eq!(config.max_lifetime(), Some(Duration::from_secs(60)));
    }

    #[test]
    fn zero_capacity_is_unbounded() {
        let config = PoolConfig::new(0).with_reserved(10);
        assert!(!config.is_bounded());
        assert_eq!(config.reserved, 10);
    }

    #[test]
    #[should_panic(expected = "must not exceed capacity")]
    fn reserved_cannot_exceed_capacity() {
        let _ = PoolConfig::new(2).with_reserved(3);
    }

    #[test]
    fn config_round_trips_through_json() {
        let config = PoolConfig::new(8).with_max_lifetime_ms(1_000);
        let json = serde_json::to_string(&config).expect("serialize");
        let back: PoolConfig = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back.capacity, 8);
        assert_eq!(back.max_lifetime_ms, Some(1_000));
    }
}
