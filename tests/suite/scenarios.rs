//! End-to-end pool scenarios through the public API.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use fanout_pool::{ConcurrencyLimit, Lifecycle, Outcome, OutcomeSummary, Pool};
use pretty_assertions::assert_eq;

use crate::common::{Gauge, Sentinel, drain};

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn mixed_results_with_limit_two() {
    let pool: Pool<Sentinel> = Pool::new(2);

    for id in 1..=5 {
        pool.submit(move || async move {
            tokio::time::sleep(Duration::from_millis(1)).await;
            match id {
                2 | 4 => Err(Sentinel(id)),
                _ => Ok(()),
            }
        });
    }

    let outcomes = drain(pool).await;
    assert_eq!(outcomes.len(), 5);
    assert_eq!(outcomes.iter().filter(|o| o.is_success()).count(), 3);

    let errors: BTreeSet<_> = outcomes.iter().filter_map(Outcome::error).cloned().collect();
    assert_eq!(errors, BTreeSet::from([Sentinel(2), Sentinel(4)]));
    for outcome in &outcomes {
        assert_eq!(outcome.is_success(), outcome.error().is_none());
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn non_positive_limits_behave_like_one() {
    for requested in [0_i64, -1, -100] {
        let pool: Pool<Sentinel> = Pool::with_limit(ConcurrencyLimit::clamped(requested));
        let gauge = Arc::new(Gauge::default());
        let order = Arc::new(Mutex::new(Vec::new()));

        for id in 0..12 {
            let gauge = Arc::clone(&gauge);
            let order = Arc::clone(&order);
            pool.submit(move || async move {
                gauge.enter();
                order.lock().unwrap().push(id);
                tokio::task::yield_now().await;
                gauge.exit();
                Ok(())
            });
        }

        let outcomes = drain(pool).await;
        assert_eq!(outcomes.len(), 12);
        assert_eq!(gauge.max(), 1, "limit {requested} ran tasks concurrently");
        assert_eq!(*order.lock().unwrap(), (0..12).collect::<Vec<_>>());
    }
}

#[tokio::test]
async fn nothing_submitted_returns_empty() {
    let pool: Pool<Sentinel> = Pool::new(10);
    let handle = pool.handle();

    let outcomes = drain(pool).await;
    assert!(outcomes.is_empty());
    assert_eq!(handle.snapshot().lifecycle, Lifecycle::Terminated);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn drains_for_many_limits_and_sizes() {
    for limit in [1, 2, 7, 64] {
        for tasks in [0, 1, 3, 200] {
            let pool: Pool<Sentinel> = Pool::new(limit);
            let ran = Arc::new(AtomicUsize::new(0));
            let gauge = Arc::new(Gauge::default());

            for id in 0..tasks {
                let ran = Arc::clone(&ran);
                let gauge = Arc::clone(&gauge);
                pool.submit(move || async move {
                    gauge.enter();
                    ran.fetch_add(1, Ordering::SeqCst);
                    tokio::task::yield_now().await;
                    gauge.exit();
                    if id % 5 == 0 { Err(Sentinel(id)) } else { Ok(()) }
                });
            }

            let outcomes = drain(pool).await;
            assert_eq!(outcomes.len(), tasks, "limit={limit} tasks={tasks}");
            assert_eq!(ran.load(Ordering::SeqCst), tasks);
            assert!(gauge.max() <= limit);

            let summary = OutcomeSummary::from_outcomes(&outcomes);
            assert_eq!(summary.failed, tasks.div_ceil(5));
        }
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn recursive_fan_out_is_fully_collected() {
    fn spawn_tree(
        handle: fanout_pool::PoolHandle<Sentinel>,
        depth: usize,
        counter: Arc<AtomicUsize>,
    ) {
        let child_handle = handle.clone();
        handle
            .submit(move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                if depth > 0 {
                    spawn_tree(child_handle.clone(), depth - 1, Arc::clone(&counter));
                    spawn_tree(child_handle, depth - 1, counter);
                }
                Ok(())
            })
            .expect("pool is still draining");
    }

    let pool: Pool<Sentinel> = Pool::new(3);
    let counter = Arc::new(AtomicUsize::new(0));
    spawn_tree(pool.handle(), 4, Arc::clone(&counter));

    let outcomes = drain(pool).await;
    // A full binary tree of depth 4 has 2^5 - 1 nodes.
    assert_eq!(outcomes.len(), 31);
    assert_eq!(counter.load(Ordering::SeqCst), 31);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn sync_and_async_tasks_mix() {
    let pool: Pool<Sentinel> = Pool::new(4);
    let gauge = Arc::new(Gauge::default());

    for id in 0..20 {
        let gauge = Arc::clone(&gauge);
        if id % 2 == 0 {
            pool.submit_blocking(move || {
                gauge.enter();
                std::thread::sleep(Duration::from_millis(2));
                gauge.exit();
                Ok(())
            });
        } else {
            pool.submit(move || async move {
                gauge.enter();
                tokio::time::sleep(Duration::from_millis(2)).await;
                gauge.exit();
                Err(Sentinel(id))
            });
        }
    }

    let outcomes = drain(pool).await;
    let summary = OutcomeSummary::from_outcomes(&outcomes);
    assert_eq!(summary.total, 20);
    assert_eq!(summary.succeeded, 10);
    assert_eq!(summary.failed, 10);
    assert!(gauge.max() <= 4);
}
