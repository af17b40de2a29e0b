use std::sync::{Arc, Barrier};
use std::thread;

use chrono::Utc;
use pinvault_core::notify::MemoryNotifier;
use pinvault_core::storage::{NewVaultEntry, SqliteVaultStore};
use pinvault_core::tier::StaticEntitlements;
use pinvault_core::{ChallengeOutcome, Identity, Vault, VaultError};

const CHALLENGERS: usize = 8;

#[test]
fn test_concurrent_correct_guesses_yield_one_success() {
    let store = Arc::new(SqliteVaultStore::open_in_memory().expect("store should open"));
    let notifier = Arc::new(MemoryNotifier::new());
    let vault = Arc::new(Vault::new(
        store,
        Arc::new(StaticEntitlements::new()),
        notifier.clone(),
    ));

    let entry = vault
        .create_entry(
            NewVaultEntry::new("sunset", "hello", Identity::device("author"), "482"),
            Utc::now(),
        )
        .expect("create should succeed");

    let barrier = Arc::new(Barrier::new(CHALLENGERS));
    let handles: Vec<_> = (0..CHALLENGERS)
        .map(|i| {
            let vault = Arc::clone(&vault);
            let barrier = Arc::clone(&barrier);
            let entry_id = entry.id;
            thread::spawn(move || {
                let challenger = Identity::account(format!("challenger-{}", i));
                barrier.wait();
                vault.challenge(&entry_id, &challenger, "482", Utc::now())
            })
        })
        .collect();

    let results: Vec<_> = handles
        .into_iter()
        .map(|handle| handle.join().expect("thread should not panic"))
        .collect();

    let successes = results
        .iter()
        .filter(|result| matches!(result, Ok(ChallengeOutcome::Success)))
        .count();
    let conflicts = results
        .iter()
        .filter(|result| matches!(result, Err(VaultError::TransferConflict(_))))
        .count();

    assert_eq!(successes, 1);
    assert_eq!(conflicts, CHALLENGERS - 1);
    assert_eq!(notifier.delivered().len(), 1);
}

#[test]
fn test_concurrent_attempts_by_one_challenger_admit_once() {
    let store = Arc::new(SqliteVaultStore::open_in_memory().expect("store should open"));
    let vault = Arc::new(Vault::new(
        store,
        Arc::new(StaticEntitlements::new()),
        Arc::new(MemoryNotifier::new()),
    ));

    let entry = vault
        .create_entry(
            NewVaultEntry::new("sunset", "hello", Identity::device("author"), "482"),
            Utc::now(),
        )
        .expect("create should succeed");

    let barrier = Arc::new(Barrier::new(CHALLENGERS));
    let handles: Vec<_> = (0..CHALLENGERS)
        .map(|_| {
            let vault = Arc::clone(&vault);
            let barrier = Arc::clone(&barrier);
            let entry_id = entry.id;
            thread::spawn(move || {
                barrier.wait();
                vault.challenge(&entry_id, &Identity::account("same"), "111", Utc::now())
            })
        })
        .collect();

    let outcomes: Vec<_> = handles
        .into_iter()
        .map(|handle| {
            handle
                .join()
                .expect("thread should not panic")
                .expect("challenge should be answered")
        })
        .collect();

    let evaluated = outcomes
        .iter()
        .filter(|outcome| matches!(outcome, ChallengeOutcome::Failed(_)))
        .count();
    assert_eq!(evaluated, 1);
    assert_eq!(
        outcomes
            .iter()
            .filter(|outcome| matches!(outcome, ChallengeOutcome::LimitExceeded { .. }))
            .count(),
        CHALLENGERS - 1
    );
}
