//! Pool statistics

use serde::{Deserialize, Serialize};

/// A point-in-time snapshot of pool occupancy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolStats {
    /// Total resources owned by the pool (idle plus leased)
    pub total: usize,
    /// Idle resources ready to be leased
    pub available: usize,
    /// Resources currently leased out
    pub in_use: usize,
    /// Callers queued for a resource
    pub waiting: usize,
    /// Configured capacity (zero means unbounded)
    pub capacity: usize,
}

impl PoolStats {
    /// Fraction of capacity currently leased, in `0.0..=1.0`
    ///
    /// Always `0.0` for unbounded pools.
    pub fn utilization(&self) -> f64 {
        if self.capacity == 0 {
            0.0
        } else {
            self.in_use as f64 / self.capacity as f64
        }
    }

    /// Whether every capacity slot is leased
    pub fn is_full(&self) -> bool {
        self.capacity > 0 && self.in_use >= self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn utilization_and_fullness() {
        let stats = PoolStats {
            total: 4,
            available: 1,
            in_use: 3,
            waiting: 2,
            capacity: 4,
        };
        assert!((stats.utilization() - 0.75).abs() < f64::EPSILON);
        assert!(!stats.is_full());

        let full = PoolStats {
            in_use: 4,
            available: 0,
            ..stats
        };
        assert!(full.is_full());
    }

    #[test]
    fn unbounded_pool_is_never_full() {
        let stats = PoolStats {
            total: 100,
            available: 0,
            in_use: 100,
            waiting: 0,
            capacity: 0,
        };
        assert!(!stats.is_full());
        assert_eq!(stats.utilization(), 0.0);
    }
}
