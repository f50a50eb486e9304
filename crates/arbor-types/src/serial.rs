//! Monotonic freshness serials and the clock issuing them.
//!
//! A [`Serial`] is a happens-before token, not wall-clock time: equal
//! serials on two independently built nodes mean "already identical, no
//! merge needed". Serial zero means "unstamped".

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// A freshness stamp issued by a [`SerialClock`].
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Serial(u64);

impl Serial {
    /// The unstamped serial.
    pub const UNSTAMPED: Serial = Serial(0);

    /// Wrap a raw serial value (for the persistence layer's benefit).
    pub const fn from_u64(v: u64) -> Self {
        Serial(v)
    }

    /// The raw serial value.
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// Returns `true` if this node has never been stamped.
    pub const fn is_unstamped(self) -> bool {
        self.0 == 0
    }
}

impl std::fmt::Display for Serial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Process-owned monotonic counter issuing freshness stamps.
///
/// `next` is strictly increasing and safe under concurrent calls; it is the
/// only Environment facility documented safe without the external write
/// lock. Wraparound is out of scope.
#[derive(Debug, Default)]
pub struct SerialClock {
    counter: AtomicU64,
}

impl SerialClock {
    /// Create a clock starting at zero (first issued serial is 1).
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a clock resuming from a persisted counter value.
    pub fn resume_from(last: Serial) -> Self {
        Self {
            counter: AtomicU64::new(last.as_u64()),
        }
    }

    /// Issue a fresh serial, strictly greater than all previously issued.
    pub fn next(&self) -> Serial {
        Serial(self.counter.fetch_add(1, Ordering::Relaxed) + 1)
    }

    /// The last issued serial (UNSTAMPED if none issued yet).
    pub fn current(&self) -> Serial {
        Serial(self.counter.load(Ordering::Relaxed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serials_are_strictly_increasing() {
        let clock = SerialClock::new();
        let mut prev = clock.next();
        assert!(!prev.is_unstamped());
        for _ in 0..1000 {
            let next = clock.next();
            assert!(next > prev, "clock must be strictly monotonic");
            prev = next;
        }
    }

    #[test]
    fn current_tracks_last_issued() {
        let clock = SerialClock::new();
        assert!(clock.current().is_unstamped());
        let s = clock.next();
        assert_eq!(clock.current(), s);
    }

    #[test]
    fn resume_continues_past_persisted_value() {
        let clock = SerialClock::resume_from(Serial::from_u64(41));
        assert_eq!(clock.next(), Serial::from_u64(42));
    }

    #[test]
    fn concurrent_next_yields_unique_serials() {
        use std::sync::Arc;
        use std::thread;

        let clock = Arc::new(SerialClock::new());
        let mut handles = Vec::new();
        for _ in 0..8 {
            let clock = Arc::clone(&clock);
            handles.push(thread::spawn(move || {
                let mut out = Vec::with_capacity(200);
                for _ in 0..200 {
                    out.push(clock.next());
                }
                out
            }));
        }

        let mut all: Vec<Serial> = Vec::new();
        for handle in handles {
            all.extend(handle.join().unwrap());
        }
        let len = all.len();
        all.sort();
        all.dedup();
        assert_eq!(all.len(), len, "all serials must be unique across threads");
    }
}
