//! Per-subject serialization of sanction state changes.
//!
//! The check for an active sanction and the creation of a new one run under
//! the same `(kind, subject)` lock, as do manual and automatic deactivation.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};
use warden_common::UserId;

use crate::db::SanctionKind;

#[derive(Debug, Default)]
pub struct SubjectLocks {
    locks: DashMap<(SanctionKind, UserId), Arc<Mutex<()>>>,
}

impl SubjectLocks {
    /// Wait for exclusive access to the sanction state of one subject.
    pub async fn lock(&self, kind: SanctionKind, subject: UserId) -> OwnedMutexGuard<()> {
        let mutex = self
            .locks
            .entry((kind, subject))
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        mutex.lock_owned().await
    }

    /// Drop locks nobody holds or waits for.
    pub fn prune(&self) {
        self.locks.retain(|_, mutex| Arc::strong_count(mutex) > 1);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn same_subject_is_serialized() {
        let locks = Arc::new(SubjectLocks::default());
        let guard = locks.lock(SanctionKind::Mute, UserId(1)).await;

        let contender = {
            let locks = locks.clone();
            tokio::spawn(async move {
                let _guard = locks.lock(SanctionKind::Mute, UserId(1)).await;
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!contender.is_finished());

        drop(guard);
        contender.await.unwrap();
    }

    #[tokio::test]
    async fn different_kinds_do_not_block() {
        let locks = SubjectLocks::default();
        let _mute = locks.lock(SanctionKind::Mute, UserId(1)).await;
        let _ban = locks.lock(SanctionKind::Ban, UserId(1)).await;
        assert_eq!(locks.len(), 2);
    }

    #[tokio::test]
    async fn prune_keeps_held_locks() {
        let locks = SubjectLocks::default();
        let held = locks.lock(SanctionKind::Ban, UserId(1)).await;
        drop(locks.lock(SanctionKind::Ban, UserId(2)).await);

        locks.prune();
        assert_eq!(locks.len(), 1);
        drop(held);
        locks.prune();
        assert!(locks.is_empty());
    }
}
