//! Concurrent access to one user's balance.

use std::sync::Arc;

use pitch_credits_core::{Actor, Adjustment, CreditsError, Decision, EntryReason, UserId};
use pitch_credits_ledger::Ledger;
use pitch_credits_store::{MemoryStore, Store};

fn funded(store: Arc<dyn Store>, balance: i64) -> (Ledger, UserId) {
    let ledger = Ledger::new(store);
    let user_id = UserId::generate();
    ledger.open_account(user_id).unwrap();
    ledger
        .adjust(Adjustment::new(user_id, balance, EntryReason::TopUp))
        .unwrap();
    (ledger, user_id)
}

/// Fire `attempts` debits of one credit at an account holding `balance`.
fn race_debits(ledger: &Ledger, user_id: UserId, attempts: usize) -> (usize, usize) {
    let results: Vec<_> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..attempts)
            .map(|_| {
                scope.spawn(move || {
                    ledger.adjust(Adjustment::new(user_id, -1, EntryReason::GenerationCharge))
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    let ok = results.iter().filter(|r| r.is_ok()).count();
    let refused = results
        .iter()
        .filter(|r| matches!(r, Err(CreditsError::InsufficientCredits { .. })))
        .count();
    (ok, refused)
}

fn assert_replay_matches(ledger: &Ledger, user_id: &UserId) {
    let report = ledger.audit(user_id).unwrap();
    assert!(report.is_consistent(), "{report:?}");

    let mut entries = ledger.transactions(user_id, 1_000).unwrap();
    entries.reverse();
    let mut running = 0;
    for (i, entry) in entries.iter().enumerate() {
        running += entry.delta;
        assert_eq!(entry.balance_after, running);
        assert_eq!(entry.sequence, i as u64 + 1);
        assert!(entry.balance_after >= 0);
    }
    assert_eq!(running, ledger.balance(user_id).unwrap());
}

#[test]
fn more_debits_than_credits_never_overdraw() {
    const BALANCE: i64 = 7;
    const ATTEMPTS: usize = 32;

    let (ledger, user_id) = funded(Arc::new(MemoryStore::new()), BALANCE);

    let (ok, refused) = race_debits(&ledger, user_id, ATTEMPTS);

    assert_eq!(ok, BALANCE as usize);
    assert_eq!(refused, ATTEMPTS - BALANCE as usize);
    assert_eq!(ledger.balance(&user_id).unwrap(), 0);
    // one top-up plus one entry per successful debit
    assert_eq!(
        ledger.transactions(&user_id, 100).unwrap().len(),
        BALANCE as usize + 1
    );
    assert_replay_matches(&ledger, &user_id);
}

#[test]
fn users_do_not_interfere() {
    let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
    let ledger = Ledger::new(Arc::clone(&store));
    let users: Vec<UserId> = (0..4).map(|_| UserId::generate()).collect();
    for user_id in &users {
        ledger.open_account(*user_id).unwrap();
        ledger
            .adjust(Adjustment::new(*user_id, 3, EntryReason::TopUp))
            .unwrap();
    }

    std::thread::scope(|scope| {
        for user_id in &users {
            let ledger = &ledger;
            scope.spawn(move || race_debits(ledger, *user_id, 5));
        }
    });

    for user_id in &users {
        assert_eq!(ledger.balance(user_id).unwrap(), 0);
        assert_replay_matches(&ledger, user_id);
    }
}

#[test]
fn approvals_and_debits_interleave_consistently() {
    let (ledger, user_id) = funded(Arc::new(MemoryStore::new()), 2);
    let staff = Actor::staff(UserId::generate());
    let requests: Vec<_> = (0..4)
        .map(|_| ledger.submit_credit_request(user_id, 1, "").unwrap())
        .collect();

    std::thread::scope(|scope| {
        for request in &requests {
            let ledger = &ledger;
            scope.spawn(move || {
                ledger
                    .resolve_credit_request(&request.id, Decision::Approve, &staff)
                    .unwrap();
            });
        }
        let ledger = &ledger;
        scope.spawn(move || race_debits(ledger, user_id, 10));
    });

    // 2 initial + 4 approved = 6 credits available in total.
    let balance = ledger.balance(&user_id).unwrap();
    assert!(balance >= 0);
    assert_replay_matches(&ledger, &user_id);
    let debits = ledger
        .transactions(&user_id, 100)
        .unwrap()
        .iter()
        .filter(|e| e.reason == EntryReason::GenerationCharge)
        .count();
    assert_eq!(balance + debits as i64, 6);
}

#[cfg(feature = "rocksdb-backend")]
mod rocks {
    use super::*;
    use pitch_credits_store::RocksStore;

    #[test]
    fn rocksdb_backend_never_overdraws() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(RocksStore::open(dir.path()).unwrap());
        let (ledger, user_id) = funded(store, 5);

        let (ok, _) = race_debits(&ledger, user_id, 20);

        assert_eq!(ok, 5);
        assert_eq!(ledger.balance(&user_id).unwrap(), 0);
        assert_replay_matches(&ledger, &user_id);
    }
}
