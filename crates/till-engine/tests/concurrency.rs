//! Races between opens, closes, resets and cash events on a file-backed
//! store with several pooled connections.

mod common;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use common::*;
use till_core::{CoreError, Denomination, SessionStatus};
use till_engine::EngineError;

fn is_core(err: &EngineError, check: impl Fn(&CoreError) -> bool) -> bool {
    err.as_core().map_or(false, check)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_opens_leave_one_open_session() {
    let store = FileStore::new(5).await;
    let service = store.service.clone();

    // Watch the invariant while the races run
    let done = Arc::new(AtomicBool::new(false));
    let watcher = {
        let db = service.database().clone();
        let done = done.clone();
        tokio::spawn(async move {
            let mut max_seen = 0;
            while !done.load(Ordering::SeqCst) {
                max_seen = max_seen.max(db.sessions().count_open("north").await.unwrap());
                tokio::task::yield_now().await;
            }
            max_seen
        })
    };

    for round in 0..5 {
        let opens: Vec<_> = (0..12)
            .map(|_| {
                let service = service.clone();
                tokio::spawn(async move { service.open_session(open_request("north", 1_000)).await })
            })
            .collect();

        let mut winners = Vec::new();
        for handle in opens {
            match handle.await.unwrap() {
                Ok(session) => winners.push(session),
                Err(err) => assert!(
                    is_core(&err, |e| matches!(e, CoreError::AlreadyOpen { .. })),
                    "round {round}: unexpected {err:?}"
                ),
            }
        }
        assert_eq!(winners.len(), 1, "round {round}: exactly one open must win");
        let session_id = winners[0].id.clone();

        // Half the workers try to close, half to reset
        let enders: Vec<_> = (0..8)
            .map(|i| {
                let service = service.clone();
                let session_id = session_id.clone();
                tokio::spawn(async move {
                    if i % 2 == 0 {
                        close(&service, &session_id, &[(Denomination::Bill10, 1)]).await
                    } else {
                        service.reset_session(&session_id, "manager").await
                    }
                })
            })
            .collect();

        let mut ended = 0;
        for handle in enders {
            match handle.await.unwrap() {
                Ok(session) => {
                    assert!(session.status.is_terminal());
                    ended += 1;
                }
                Err(err) => assert!(
                    is_core(&err, |e| matches!(e, CoreError::NotOpen { .. })),
                    "round {round}: unexpected {err:?}"
                ),
            }
        }
        assert_eq!(ended, 1, "round {round}: exactly one transition out of open");
        assert_eq!(service.database().sessions().count_open("north").await.unwrap(), 0);
    }

    done.store(true, Ordering::SeqCst);
    assert!(watcher.await.unwrap() <= 1);

    let history = service
        .list_history("north", Default::default(), till_core::Pagination::first(50))
        .await
        .unwrap();
    assert_eq!(history.total, 5);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_events_are_additive() {
    let store = FileStore::new(5).await;
    let service = store.service.clone();
    let session = open(&service, "north", 20_000).await;

    let amounts: Vec<i64> = (1..=60).map(|i| i * 37 + 5).collect();
    let expected_sales: i64 = amounts.iter().sum();

    let handles: Vec<_> = amounts
        .iter()
        .copied()
        .enumerate()
        .map(|(i, cents)| {
            let service = service.clone();
            tokio::spawn(async move {
                sale(&service, "north", cents).await.unwrap();
                if i % 10 == 0 {
                    expense(&service, "north", 100).await.unwrap();
                }
            })
        })
        .collect();

    for handle in handles {
        handle.await.unwrap();
    }

    let session = service.get_session(&session.id).await.unwrap();
    assert_eq!(session.summary.cash_sales_total_cents, expected_sales);
    assert_eq!(session.summary.sales_count, 60);
    assert_eq!(session.summary.total_expenses_cents, 600);
    assert_eq!(session.summary.expenses_count, 6);
    assert_eq!(session.version, 66);

    let movements = service.list_movements(&session.id).await.unwrap();
    assert_eq!(movements.len(), 66);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn close_racing_sales_stays_consistent() {
    // One attempt: the close holds the write lock while it counts
    let store = FileStore::new(1).await;
    let service = store.service.clone();
    let session = open(&service, "north", 10_000).await;

    let sales: Vec<_> = (0..40)
        .map(|i| {
            let service = service.clone();
            tokio::spawn(async move { sale(&service, "north", 100 + i).await })
        })
        .collect();

    let closer = {
        let service = service.clone();
        let session_id = session.id.clone();
        tokio::spawn(async move { close(&service, &session_id, &[(Denomination::Bill100, 1)]).await })
    };

    let mut accepted = 0_i64;
    for handle in sales {
        match handle.await.unwrap() {
            Ok(movement) => {
                assert_eq!(movement.session_id.as_deref(), Some(session.id.as_str()));
                accepted += movement.amount_cents;
            }
            Err(err) => assert!(
                is_core(&err, |e| matches!(e, CoreError::NoOpenSession { .. })),
                "unexpected {err:?}"
            ),
        }
    }

    let closed = closer.await.unwrap().unwrap();
    assert!(matches!(
        closed.status,
        SessionStatus::Closed | SessionStatus::Balanced
    ));

    // The closing record reconciles exactly the summary it froze
    let closing = closed.closing.clone().unwrap();
    assert_eq!(closed.summary.cash_sales_total_cents, accepted);
    assert_eq!(closing.expected_total_cents, 10_000 + accepted);
    assert_eq!(
        closing.difference_cents,
        closing.counted_total_cents - closing.expected_total_cents
    );

    let stored = service.get_session(&session.id).await.unwrap();
    assert_eq!(stored, closed);
}

#[tokio::test]
async fn stale_version_conflicts_and_engine_closes_latest_summary() {
    // A raw CAS with a version read before a sale misses
    let store = FileStore::new(1).await;
    let service = store.service.clone();
    let session = open(&service, "north", 0).await;

    let db = service.database().clone();
    let stale = db.sessions().get_by_id(&session.id).await.unwrap().unwrap();
    sale(&service, "north", 500).await.unwrap();

    let closing = till_core::SessionClosing {
        closed_by: "manager".to_string(),
        closed_at: chrono::Utc::now(),
        cash_breakdown: breakdown(&[]),
        counted_total_cents: 0,
        expected_total_cents: 0,
        difference_cents: 0,
        classification: till_core::Classification::Exact,
        closing_notes: None,
    };
    let err = db
        .sessions()
        .close(&session.id, stale.version, SessionStatus::Balanced, &closing)
        .await
        .unwrap_err();
    assert!(err.is_conflict());

    // The engine reads the summary under the lock it closes with
    let closed = close(&service, &session.id, &[(Denomination::Bill5, 1)])
        .await
        .unwrap();
    assert_eq!(closed.status, SessionStatus::Balanced);
    assert_eq!(closed.closing.unwrap().expected_total_cents, 500);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn close_is_not_starved_by_a_steady_sale_stream() {
    // Single attempt: a close that lost CAS races would fail here
    let store = FileStore::new(1).await;
    let service = store.service.clone();
    let session = open(&service, "north", 0).await;

    // Sell continuously until the branch has no open session
    let sellers: Vec<_> = (0..4)
        .map(|_| {
            let service = service.clone();
            tokio::spawn(async move {
                let mut accepted = 0_i64;
                loop {
                    match sale(&service, "north", 25).await {
                        Ok(movement) => accepted += movement.amount_cents,
                        Err(err) => {
                            assert!(
                                is_core(&err, |e| matches!(e, CoreError::NoOpenSession { .. })),
                                "unexpected {err:?}"
                            );
                            return accepted;
                        }
                    }
                }
            })
        })
        .collect();

    for _ in 0..10_000 {
        if service.get_session(&session.id).await.unwrap().summary.sales_count >= 20 {
            break;
        }
        tokio::task::yield_now().await;
    }

    let closed = close(&service, &session.id, &[(Denomination::Bill1, 3)])
        .await
        .unwrap();
    let closing = closed.closing.clone().unwrap();
    assert_eq!(closing.expected_total_cents, closed.summary.cash_sales_total_cents);
    assert_eq!(closing.counted_total_cents, 300);

    let mut accepted = 0;
    for seller in sellers {
        accepted += seller.await.unwrap();
    }
    assert_eq!(accepted, closed.summary.cash_sales_total_cents);

    let ledger: i64 = service
        .list_movements(&session.id)
        .await
        .unwrap()
        .iter()
        .map(|m| m.amount_cents)
        .sum();
    assert_eq!(ledger, accepted);
}
