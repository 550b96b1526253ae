//! Loop detection and mutual exclusion guarantees.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::*;
use guildsync_engine::{SkipReason, SyncOutcome, SyncSettings};

#[tokio::test]
async fn test_loop_ceiling_refuses_the_fourth_attempt() {
    let h = harness(SyncSettings::for_testing(standard_mappings()));
    h.directory.add_role(1, "Supporter", 10).await;

    let (local, user) = linked_user(&h, 100).await;
    h.directory.add_member(user, &[1]).await;

    // Ceiling is 3: three attempts inside the window run normally.
    for _ in 0..3 {
        let outcome = h.service.sync_external_to_local(local, false).await.unwrap();
        assert!(outcome.is_complete());
    }

    let fetches_before = h.directory.member_fetch_count();

    // The fourth is refused before any directory traffic.
    let outcome = h.service.sync_external_to_local(local, false).await.unwrap();
    assert_eq!(
        outcome,
        SyncOutcome::Skipped {
            reason: SkipReason::LoopSuspected { attempts: 4 }
        }
    );
    assert_eq!(
        h.directory.member_fetch_count(),
        fetches_before,
        "a suspected loop must not reach the network"
    );
}

#[tokio::test]
async fn test_forced_sync_resets_the_counter_and_proceeds() {
    let h = harness(SyncSettings::for_testing(standard_mappings()));
    h.directory.add_role(1, "Supporter", 10).await;

    let (local, user) = linked_user(&h, 100).await;
    h.directory.add_member(user, &[1]).await;

    // Exhaust the window.
    for _ in 0..4 {
        let _ = h.service.sync_external_to_local(local, false).await.unwrap();
    }
    let blocked = h.service.sync_external_to_local(local, false).await.unwrap();
    assert!(blocked.is_skipped());

    // An explicit user action cuts through and resets the window.
    let forced = h.service.sync_external_to_local(local, true).await.unwrap();
    assert!(forced.is_complete());

    // The window restarts: non-forced attempts work again.
    let next = h.service.sync_external_to_local(local, false).await.unwrap();
    assert!(next.is_complete());
}

#[tokio::test]
async fn test_directions_count_attempts_independently() {
    let h = harness(SyncSettings::for_testing(standard_mappings()));
    h.directory.add_role(1, "Supporter", 10).await;

    let (local, user) = linked_user(&h, 100).await;
    h.directory.add_member(user, &[1]).await;

    // Exhaust direction A's window.
    for _ in 0..4 {
        let _ = h.service.sync_external_to_local(local, false).await.unwrap();
    }
    assert!(h
        .service
        .sync_external_to_local(local, false)
        .await
        .unwrap()
        .is_skipped());

    // Direction B still has a fresh counter.
    let outcome = h
        .service
        .sync_local_to_external(local, "member", &[], false)
        .await
        .unwrap();
    assert!(outcome.is_complete());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_runs_serialize_on_the_lock() {
    let h = harness(SyncSettings::for_testing(standard_mappings()));
    h.directory.add_role(1, "Supporter", 10).await;
    // Slow fetches keep the first run inside its critical section long
    // enough for the second to collide with the lock.
    h.directory.set_fetch_delay(Duration::from_millis(100));

    let (local, user) = linked_user(&h, 100).await;
    h.directory.add_member(user, &[1]).await;

    let engine = Arc::clone(h.service.engine());
    let first = tokio::spawn({
        let engine = Arc::clone(&engine);
        async move { engine.sync_to_local(local, false).await.unwrap() }
    });
    let second = tokio::spawn({
        let engine = Arc::clone(&engine);
        async move {
            // Give the first task a head start into the fetch phase.
            tokio::time::sleep(Duration::from_millis(20)).await;
            engine.sync_to_local(local, false).await.unwrap()
        }
    });

    let (a, b) = (first.await.unwrap(), second.await.unwrap());

    let skipped = [&a, &b]
        .iter()
        .filter(|o| {
            matches!(
                o,
                SyncOutcome::Skipped {
                    reason: SkipReason::AlreadyInProgress
                }
            )
        })
        .count();
    let completed = [&a, &b].iter().filter(|o| o.is_complete()).count();

    assert_eq!(skipped, 1, "exactly one run must lose the lock: {a:?} / {b:?}");
    assert_eq!(completed, 1, "exactly one run must complete: {a:?} / {b:?}");
}

#[tokio::test]
async fn test_lock_is_released_after_success_and_error() {
    let h = harness(SyncSettings::for_testing(standard_mappings()));
    h.directory.add_role(1, "Supporter", 10).await;

    let (local, user) = linked_user(&h, 100).await;
    h.directory.add_member(user, &[1]).await;

    // Success path releases.
    let outcome = h.service.sync_external_to_local(local, false).await.unwrap();
    assert!(outcome.is_complete());

    // Error path must release too.
    h.directory.fail_member_fetches(true);
    let result = h.service.sync_external_to_local(local, false).await;
    assert!(result.is_err());

    h.directory.fail_member_fetches(false);
    let outcome = h.service.sync_external_to_local(local, false).await.unwrap();
    assert!(
        outcome.is_complete(),
        "a failed run must not leave the lock held: {outcome:?}"
    );
}
