//! Spacing guarantees of the shared request scheduler under contention.

use std::sync::Arc;
use std::time::Duration;

use stakesync_ledger::RequestScheduler;
use tokio::time::Instant;

const INTERVAL: Duration = Duration::from_millis(2_000);

#[tokio::test(start_paused = true)]
async fn concurrent_callers_are_spaced_pairwise() {
    let scheduler = Arc::new(RequestScheduler::new(INTERVAL));
    let start = Instant::now();

    let tasks: Vec<_> = (0..8)
        .map(|_| {
            let scheduler = scheduler.clone();
            tokio::spawn(async move {
                scheduler.acquire().await;
                Instant::now()
            })
        })
        .collect();

    let mut completed = Vec::new();
    for task in tasks {
        completed.push(task.await.unwrap());
    }
    completed.sort();

    for pair in completed.windows(2) {
        assert!(pair[1] - pair[0] >= INTERVAL, "permits granted {:?} apart", pair[1] - pair[0]);
    }
    assert_eq!(completed[0], start);
    assert_eq!(*completed.last().unwrap() - start, INTERVAL * 7);
    assert_eq!(scheduler.granted(), 8);
}

#[tokio::test(start_paused = true)]
async fn callers_from_different_entities_share_one_budget() {
    let scheduler = Arc::new(RequestScheduler::new(INTERVAL));

    // Two "entities", each issuing three sequential reads
    let entity = |scheduler: Arc<RequestScheduler>| async move {
        let mut granted = Vec::new();
        for _ in 0..3 {
            granted.push(scheduler.acquire().await.granted_at);
        }
        granted
    };

    let (a, b) = tokio::join!(entity(scheduler.clone()), entity(scheduler.clone()));
    let mut all: Vec<_> = a.into_iter().chain(b).collect();
    all.sort();
    all.dedup();

    assert_eq!(all.len(), 6);
    for pair in all.windows(2) {
        assert!(pair[1] - pair[0] >= INTERVAL);
    }
}

#[tokio::test(start_paused = true)]
async fn waiting_reports_queue_position() {
    let scheduler = Arc::new(RequestScheduler::new(INTERVAL));
    let first = scheduler.acquire().await;
    let second = scheduler.acquire().await;
    let third = scheduler.acquire().await;

    assert_eq!(first.waited, Duration::ZERO);
    assert_eq!(second.waited, INTERVAL);
    assert_eq!(third.waited, INTERVAL);
    assert_eq!(third.sequence, 3);
}
