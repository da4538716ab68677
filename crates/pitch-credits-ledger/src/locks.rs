//! Per-user exclusive locks.
//!
//! Every balance mutation for a user runs while holding that user's lock,
//! which turns the load, compute and append steps into one indivisible
//! unit. Locks of different users are independent; there is no global
//! ledger lock.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use pitch_credits_core::UserId;

/// A table of per-user mutexes, created on first use and dropped once no
/// caller holds or waits for them.
#[derive(Debug, Default)]
pub struct UserLocks {
    slots: Mutex<HashMap<UserId, Arc<Mutex<()>>>>,
}

impl UserLocks {
    /// Create an empty lock table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` while holding the exclusive lock of `user_id`.
    ///
    /// The table mutex is only held while looking up the slot, never while
    /// `f` runs.
    pub fn with_lock<T>(&self, user_id: &UserId, f: impl FnOnce() -> T) -> T {
        let slot = SlotRef {
            locks: self,
            user_id: *user_id,
            slot: self.slot(user_id),
        };
        // Store writes are atomic, so a panic inside a previous holder
        // cannot have left partial state behind.
        let _guard = slot.slot.lock().unwrap_or_else(PoisonError::into_inner);
        f()
    }

    /// Number of users with a live lock slot.
    #[must_use]
    pub fn active(&self) -> usize {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn slot(&self, user_id: &UserId) -> Arc<Mutex<()>> {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(slots.entry(*user_id).or_default())
    }

    fn release(&self, user_id: &UserId, slot: &Arc<Mutex<()>>) {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        // one reference in the table, one held by this caller
        if Arc::strong_count(slot) == 2 {
            slots.remove(user_id);
        }
    }
}

/// A borrowed slot, handed back to the table on drop, also when the
/// critical section panics.
struct SlotRef<'a> {
    locks: &'a UserLocks,
    user_id: UserId,
    slot: Arc<Mutex<()>>,
}

impl Drop for SlotRef<'_> {
    fn drop(&mut self) {
        self.locks.release(&self.user_id, &self.slot);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[test]
    fn same_user_sections_never_overlap() {
        let locks = UserLocks::new();
        let user_id = UserId::generate();
        let inside = AtomicUsize::new(0);
        let max_inside = AtomicUsize::new(0);

        std::thread::scope(|scope| {
            for _ in 0..8 {
                scope.spawn(|| {
                    locks.with_lock(&user_id, || {
                        let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                        max_inside.fetch_max(now, Ordering::SeqCst);
                        std::thread::sleep(Duration::from_millis(5));
                        inside.fetch_sub(1, Ordering::SeqCst);
                    });
                });
            }
        });

        assert_eq!(max_inside.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn different_users_do_not_contend() {
        let locks = UserLocks::new();
        let alice = UserId::generate();
        let bob = UserId::generate();

        // Holding alice's lock must not block bob.
        locks.with_lock(&alice, || {
            locks.with_lock(&bob, || {
                assert_eq!(locks.active(), 2);
            });
        });
    }

    #[test]
    fn released_slots_are_pruned() {
        let locks = UserLocks::new();
        let user_id = UserId::generate();

        locks.with_lock(&user_id, || ());

        assert_eq!(locks.active(), 0);
    }

    #[test]
    fn panicking_section_releases_its_slot() {
        let locks = UserLocks::new();
        let user_id = UserId::generate();

        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            locks.with_lock(&user_id, || panic!("store exploded"));
        }));

        assert!(outcome.is_err());
        assert_eq!(locks.active(), 0);
        // the slot is usable again
        assert_eq!(locks.with_lock(&user_id, || 7), 7);
    }
}
