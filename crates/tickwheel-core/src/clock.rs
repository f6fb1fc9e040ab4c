//! Process-wide monotonic clock
//!
//! All deadlines are signed nanosecond offsets from a fixed per-process
//! epoch. Using a process-wide start point keeps deadline arithmetic in
//! plain integers and is cheaper than repeated wall-clock conversions.

use std::sync::OnceLock;
use std::time::{Duration, Instant};

/// The fixed instant all deadlines are measured against.
///
/// Initialised on first use; stable for the lifetime of the process.
pub fn epoch() -> Instant {
    static START: OnceLock<Instant> = OnceLock::new();
    *START.get_or_init(Instant::now)
}

/// Current monotonic time in nanoseconds since [`epoch`].
#[inline]
pub fn now_ns() -> i64 {
    epoch().elapsed().as_nanos() as i64
}

/// Convert an absolute instant to nanoseconds since [`epoch`].
///
/// Instants before the epoch saturate to zero.
#[inline]
pub fn instant_ns(t: Instant) -> i64 {
    t.saturating_duration_since(epoch()).as_nanos() as i64
}

/// Convert nanoseconds since [`epoch`] back to an instant.
#[inline]
pub fn ns_instant(ns: i64) -> Instant {
    epoch() + Duration::from_nanos(ns.max(0) as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_now_ns_monotonic() {
        let t1 = now_ns();
        std::thread::sleep(Duration::from_micros(100));
        let t2 = now_ns();
        assert!(t2 > t1);
    }

    #[test]
    fn test_epoch_stable() {
        assert_eq!(epoch(), epoch());
    }

    #[test]
    fn test_instant_roundtrip() {
        let t = Instant::now() + Duration::from_secs(2);
        let ns = instant_ns(t);
        let back = ns_instant(ns);
        let drift = if back > t { back - t } else { t - back };
        assert!(drift < Duration::from_micros(1));
    }

    #[test]
    fn test_instant_before_epoch_saturates() {
        let past = epoch() - Duration::from_secs(1);
        assert_eq!(instant_ns(past), 0);
    }
}
