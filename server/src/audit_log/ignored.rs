//! Messages whose next edit or delete must not be logged.

use std::time::{Duration, Instant};

use dashmap::DashMap;
use warden_common::MessageId;

/// Bounded set of message ids with a time-to-live.
///
/// When full, inserting evicts expired entries first and then the oldest
/// one.
#[derive(Debug)]
pub struct IgnoredMessages {
    entries: DashMap<MessageId, Instant>,
    capacity: usize,
    ttl: Duration,
}

impl IgnoredMessages {
    #[must_use]
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            capacity: capacity.max(1),
            ttl,
        }
    }

    pub fn insert(&self, message: MessageId) {
        if self.entries.len() >= self.capacity {
            self.evict_expired();
        }
        if self.entries.len() >= self.capacity {
            let oldest = self
                .entries
                .iter()
                .min_by_key(|entry| *entry.value())
                .map(|entry| *entry.key());
            if let Some(oldest) = oldest {
                self.entries.remove(&oldest);
            }
        }
        self.entries.insert(message, Instant::now());
    }

    /// Consume the entry for `message`. Returns `true` if it was present and
    /// not expired.
    pub fn take(&self, message: MessageId) -> bool {
        self.entries
            .remove(&message)
            .is_some_and(|(_, inserted)| inserted.elapsed() < self.ttl)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn evict_expired(&self) {
        let ttl = self.ttl;
        self.entries.retain(|_, inserted| inserted.elapsed() < ttl);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn take_consumes_entry() {
        let ignored = IgnoredMessages::new(8, Duration::from_secs(60));
        ignored.insert(MessageId(1));

        assert!(ignored.take(MessageId(1)));
        assert!(!ignored.take(MessageId(1)));
        assert!(!ignored.take(MessageId(2)));
    }

    #[test]
    fn capacity_evicts_oldest() {
        let ignored = IgnoredMessages::new(2, Duration::from_secs(60));
        ignored.insert(MessageId(1));
        std::thread::sleep(Duration::from_millis(2));
        ignored.insert(MessageId(2));
        std::thread::sleep(Duration::from_millis(2));
        ignored.insert(MessageId(3));

        assert_eq!(ignored.len(), 2);
        assert!(!ignored.take(MessageId(1)));
        assert!(ignored.take(MessageId(3)));
    }

    #[test]
    fn expired_entries_are_not_honoured() {
        let ignored = IgnoredMessages::new(8, Duration::ZERO);
        ignored.insert(MessageId(1));
        assert!(!ignored.take(MessageId(1)));
        assert!(ignored.is_empty());
    }
}
