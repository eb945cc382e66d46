//! Time utilities with clock abstraction for testability.
//!
//! All timestamps in the system are UTC Unix milliseconds. Components
//! that stamp messages take a `Clock` so tests can pin time.

use chrono::Utc;

/// Clock trait for dependency injection and testing.
pub trait Clock: Send + Sync {
    /// Current Unix timestamp in UTC (milliseconds).
    fn now_millis(&self) -> i64;
}

/// System clock implementation (uses actual system time).
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        now_timestamp_millis()
    }
}

/// Fixed clock for testing (always returns the same instant).
#[derive(Debug, Clone, Copy)]
pub struct FixedClock {
    fixed_time: i64,
}

impl FixedClock {
    /// Create a fixed clock pinned to the given millisecond timestamp.
    pub fn new(fixed_time_millis: i64) -> Self {
        Self {
            fixed_time: fixed_time_millis,
        }
    }
}

impl Clock for FixedClock {
    fn now_millis(&self) -> i64 {
        self.fixed_time
    }
}

/// Current Unix timestamp in UTC (milliseconds).
pub fn now_timestamp_millis() -> i64 {
    Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_clock_returns_plausible_time() {
        // テスト項目: SystemClock が現在時刻に近いタイムスタンプを返す
        // given (前提条件):
        let clock = SystemClock;

        // when (操作):
        let now = clock.now_millis();

        // then (期待する結果): 2020-01-01 以降のタイムスタンプ
        assert!(now > 1_577_836_800_000);
    }

    #[test]
    fn test_fixed_clock_returns_fixed_time() {
        // テスト項目: FixedClock が固定時刻を返し続ける
        // given (前提条件):
        let clock = FixedClock::new(1_700_000_000_000);

        // when (操作) / then (期待する結果):
        assert_eq!(clock.now_millis(), 1_700_000_000_000);
        assert_eq!(clock.now_millis(), 1_700_000_000_000);
    }
}
