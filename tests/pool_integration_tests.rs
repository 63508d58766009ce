//! Integration tests for the connection pool under concurrency.
//!
//! These drive many tasks against one pool to check the capacity bound,
//! waiter wake-ups and close/drain racing with checkouts.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use nodepool::infrastructure::classify::DefaultClassifier;
use nodepool::infrastructure::pool::ConnectionPool;
use nodepool::testkit;
use nodepool::testkit::net::MockDialer;
use nodepool::{ConnectionOptions, Context, Error};
use tokio::time::timeout;

fn pool(max: usize, idle: usize) -> (ConnectionPool, Arc<MockDialer>) {
    let dialer = Arc::new(MockDialer::new());
    let pool = ConnectionPool::new(
        testkit::address(),
        testkit::config::pool(max, idle),
        ConnectionOptions::default(),
        dialer.clone(),
        Arc::new(DefaultClassifier),
    )
    .unwrap();
    (pool, dialer)
}

// ---------------------------------------------------------------------------
// Test 1: Many tasks never push live connections past the limit
// ---------------------------------------------------------------------------

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_checkouts_respect_max_connections() {
    let (pool, dialer) = pool(4, 2);
    let in_use = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));

    let tasks: Vec<_> = (0..32)
        .map(|_| {
            let pool = pool.clone();
            let in_use = in_use.clone();
            let peak = peak.clone();
            tokio::spawn(async move {
                for _ in 0..10 {
                    let conn = pool.get(&Context::background()).await.unwrap();
                    let now = in_use.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::task::yield_now().await;
                    in_use.fetch_sub(1, Ordering::SeqCst);
                    drop(conn);
                }
            })
        })
        .collect();
    for task in tasks {
        task.await.unwrap();
    }

    assert!(peak.load(Ordering::SeqCst) <= 4);
    let stats = pool.stats();
    assert_eq!(stats.checked_out, 0);
    assert!(stats.idle <= 2);
    assert!(stats.total_created - stats.total_closed <= 4);
    assert!(dialer.dial_count() >= 1);
}

// ---------------------------------------------------------------------------
// Test 2: Every waiter eventually gets a connection
// ---------------------------------------------------------------------------

#[tokio::test]
async fn waiters_are_not_starved() {
    let (pool, _) = pool(1, 1);
    let held = pool.get(&Context::background()).await.unwrap();

    let waiters: Vec<_> = (0..8)
        .map(|_| {
            let pool = pool.clone();
            tokio::spawn(async move {
                let conn = pool.get(&Context::background()).await?;
                tokio::time::sleep(Duration::from_millis(1)).await;
                drop(conn);
                Ok::<_, Error>(())
            })
        })
        .collect();
    drop(held);

    for waiter in waiters {
        let result = timeout(Duration::from_secs(1), waiter).await.unwrap().unwrap();
        assert!(result.is_ok());
    }
    assert_eq!(pool.stats().total_created, 1);
}

// ---------------------------------------------------------------------------
// Test 3: Close racing with checkouts never hangs
// ---------------------------------------------------------------------------

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn close_racing_with_checkouts_resolves_every_call() {
    let (pool, _) = pool(2, 2);

    let tasks: Vec<_> = (0..16)
        .map(|_| {
            let pool = pool.clone();
            tokio::spawn(async move {
                loop {
                    match pool.get(&Context::background()).await {
                        Ok(conn) => {
                            tokio::task::yield_now().await;
                            drop(conn);
                        }
                        Err(Error::PoolClosed) => return,
                        Err(e) => panic!("unexpected error: {e}"),
                    }
                }
            })
        })
        .collect();

    tokio::time::sleep(Duration::from_millis(20)).await;
    pool.close().unwrap();

    for task in tasks {
        timeout(Duration::from_secs(1), task)
            .await
            .expect("checkout loop exits after close")
            .unwrap();
    }
    let stats = pool.stats();
    assert_eq!(stats.checked_out, 0);
    assert_eq!(stats.idle, 0);
    assert_eq!(stats.total_created, stats.total_closed);
}

// ---------------------------------------------------------------------------
// Test 4: Drains during traffic never hand out stale connections
// ---------------------------------------------------------------------------

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn drains_during_traffic_retire_old_generations() {
    let (pool, _) = pool(3, 3);

    let workers: Vec<_> = (0..6)
        .map(|_| {
            let pool = pool.clone();
            tokio::spawn(async move {
                for _ in 0..50 {
                    let generation = pool.generation();
                    let conn = pool.get(&Context::background()).await.unwrap();
                    assert!(conn.generation() >= generation);
                    tokio::task::yield_now().await;
                    drop(conn);
                }
            })
        })
        .collect();

    for _ in 0..5 {
        tokio::time::sleep(Duration::from_millis(1)).await;
        pool.drain();
    }
    for worker in workers {
        worker.await.unwrap();
    }

    let current = pool.generation();
    assert_eq!(current, 5);
    let fresh = pool.get(&Context::background()).await.unwrap();
    assert_eq!(fresh.generation(), current);
}
