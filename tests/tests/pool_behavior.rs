//! Worker-pool contract: exactly one result per job, bounded termination
//! under cancellation, closed stream once the workers are gone.

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

use dpiprobe_core::pool::{self, PoolOpt};

#[tokio::test]
async fn n_jobs_produce_exactly_n_results() {
    let cancel = CancellationToken::new();
    let (tx, rx) = mpsc::channel(1);
    let jobs: Vec<u64> = (0..200).collect();

    tokio::spawn(pool::push_and_close(cancel.clone(), tx, jobs));

    let executions = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&executions);
    let mut results = pool::start(PoolOpt { workers: 7, cancel }, rx, move |n: u64| {
        let counter = Arc::clone(&counter);
        async move {
            counter.fetch_add(1, Ordering::Relaxed);
            n
        }
    });

    let mut got = HashSet::new();
    while let Some(r) = results.recv().await {
        assert!(got.insert(r), "job {r} was executed by more than one worker");
    }

    assert_eq!(got.len(), 200);
    assert_eq!(executions.load(Ordering::Relaxed), 200);
}

#[tokio::test]
async fn cancellation_stops_the_pool_within_bounded_time() {
    let cancel = CancellationToken::new();
    let (tx, rx) = mpsc::channel(1);
    let jobs: Vec<u64> = (0..10_000).collect();

    tokio::spawn(pool::push_and_close(cancel.clone(), tx, jobs));
    let mut results = pool::start(
        PoolOpt { workers: 4, cancel: cancel.clone() },
        rx,
        |n: u64| async move {
            tokio::time::sleep(Duration::from_millis(2)).await;
            n
        },
    );

    let mut received = 0usize;
    let drained = timeout(Duration::from_secs(5), async {
        while let Some(_r) = results.recv().await {
            received += 1;
            if received == 10 {
                cancel.cancel();
            }
        }
    })
    .await;

    assert!(drained.is_ok(), "pool did not terminate after cancellation");
    assert!(received >= 10);
    assert!(received < 10_000, "cancellation should drop the remaining jobs");
}

#[tokio::test]
async fn results_do_not_depend_on_submission_order() {
    let cancel = CancellationToken::new();
    let (tx, rx) = mpsc::channel(1);
    let jobs: Vec<u64> = (0..32).collect();

    tokio::spawn(pool::push_and_close(cancel.clone(), tx, jobs));
    // Reversed sleep times force completions out of submission order.
    let mut results = pool::start(PoolOpt { workers: 8, cancel }, rx, |n: u64| async move {
        tokio::time::sleep(Duration::from_millis(32 - n)).await;
        n
    });

    let mut got = Vec::new();
    while let Some(r) = results.recv().await {
        got.push(r);
    }

    let mut sorted = got.clone();
    sorted.sort_unstable();
    assert_eq!(sorted, (0..32).collect::<Vec<_>>());
}
