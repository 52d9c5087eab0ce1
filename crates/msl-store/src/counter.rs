//! Non-replayable ID counters.

use std::sync::atomic::{AtomicU64, Ordering};

use msl_core::{MAX_LONG_VALUE, MslError, MslResult};

/// Monotonic non-replayable ID generator for one master token serial number.
///
/// Each call to [`next_id`](Self::next_id) returns the current value and
/// advances it by one, atomically. Values run from the seed up to and
/// including [`MAX_LONG_VALUE`]; after that every call fails with
/// [`MslError::CounterExhausted`].
#[derive(Debug)]
pub struct NonReplayableCounter {
    serial_number: u64,
    next: AtomicU64,
}

impl NonReplayableCounter {
    /// A counter for `serial_number` whose first ID is `first`.
    #[must_use]
    pub fn new(serial_number: u64, first: u64) -> Self {
        Self {
            serial_number,
            next: AtomicU64::new(first),
        }
    }

    /// Master token serial number this counter belongs to.
    #[must_use]
    pub fn serial_number(&self) -> u64 {
        self.serial_number
    }

    /// Issue the next ID.
    ///
    /// # Errors
    ///
    /// Returns [`MslError::CounterExhausted`] once the ID space is used up.
    pub fn next_id(&self) -> MslResult<u64> {
        self.next
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                if current > MAX_LONG_VALUE {
                    None
                } else {
                    current.checked_add(1)
                }
            })
            .map_err(|_| MslError::CounterExhausted {
                serial_number: self.serial_number,
            })
    }

    /// The ID the next call would return, without issuing it.
    #[must_use]
    pub fn peek(&self) -> u64 {
        self.next.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_sequence_from_seed() {
        let counter = NonReplayableCounter::new(1, 5);
        assert_eq!(counter.next_id().unwrap(), 5);
        assert_eq!(counter.next_id().unwrap(), 6);
        assert_eq!(counter.peek(), 7);
    }

    #[test]
    fn test_exhaustion_is_fatal() {
        let counter = NonReplayableCounter::new(9, MAX_LONG_VALUE);
        assert_eq!(counter.next_id().unwrap(), MAX_LONG_VALUE);

        let err = counter.next_id().unwrap_err();
        assert!(err.is_fatal());
        assert!(matches!(err, MslError::CounterExhausted { serial_number: 9 }));
        // Stays exhausted.
        assert!(counter.next_id().is_err());
    }

    #[test]
    fn test_concurrent_ids_are_distinct() {
        let counter = NonReplayableCounter::new(1, 0);
        let ids: Vec<u64> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..4)
                .map(|_| {
                    s.spawn(|| {
                        (0..250)
                            .map(|_| counter.next_id().unwrap())
                            .collect::<Vec<_>>()
                    })
                })
                .collect();
            handles
                .into_iter()
                .flat_map(|h| h.join().unwrap())
                .collect()
        });

        let unique: HashSet<u64> = ids.iter().copied().collect();
        assert_eq!(unique.len(), 1000);
        assert_eq!(ids.iter().max().copied(), Some(999));
    }
}
