//! Cross-platform wall clock.
//!
//! Persisted envelopes record their write time as milliseconds since the
//! Unix epoch, matching what a browser's `Date.now()` produces.

pub use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Returns the current system time.
#[cfg(not(target_arch = "wasm32"))]
pub fn now() -> SystemTime {
    SystemTime::now()
}

/// Returns the current system time.
#[cfg(target_arch = "wasm32")]
pub fn now() -> SystemTime {
    use web_time::web::SystemTimeExt;
    web_time::SystemTime::now().to_std()
}

/// Milliseconds elapsed since the Unix epoch, saturating at zero for clocks
/// set before 1970.
pub fn epoch_millis() -> u64 {
    now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_returns_a_timestamp_after_2020() {
        // 2020-01-01T00:00:00Z
        assert!(epoch_millis() > 1_577_836_800_000);
    }

    #[test]
    fn it_returns_increasing_values() {
        let first = epoch_millis();
        let second = epoch_millis();
        assert!(second >= first);
    }
}
