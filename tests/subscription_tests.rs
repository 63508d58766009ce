//! Integration tests for description fan-out.
//!
//! Exercises the broadcaster through the server: late joiners, slow
//! consumers, unsubscribe and shutdown racing with subscribe.

use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use nodepool::infrastructure::subscription::Broadcaster;
use nodepool::testkit;
use nodepool::testkit::net::MockDialer;
use nodepool::testkit::probe::ScriptedProber;
use nodepool::{Error, Server, ServerDescription, ServerKind};
use tokio::time::timeout;

fn observed(kind: ServerKind) -> ServerDescription {
    ServerDescription::observed(
        testkit::address(),
        kind,
        Duration::from_millis(1),
        Duration::from_millis(1),
    )
}

#[tokio::test]
async fn late_joiner_gets_current_state() {
    let prober = ScriptedProber::new();
    prober.set_fallback(Ok(ServerKind::Secondary));
    let server = Server::new(
        testkit::address(),
        testkit::config::server(2, 2),
        Arc::new(MockDialer::new()),
        Arc::new(prober),
    )
    .unwrap();

    let mut first = server.subscribe().unwrap();
    timeout(Duration::from_secs(1), async {
        while first.recv().await.map(|d| d.kind) != Some(ServerKind::Secondary) {}
    })
    .await
    .unwrap();

    let mut late = server.subscribe().unwrap();
    let desc = timeout(Duration::from_millis(10), late.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(desc.kind, ServerKind::Secondary);
    server.close().await.unwrap();
}

#[tokio::test]
async fn slow_consumer_does_not_block_others() {
    let broadcaster = Broadcaster::new(ServerDescription::unknown(testkit::address()));
    let _stalled = broadcaster.subscribe().unwrap();
    let mut active = broadcaster.subscribe().unwrap();
    active.recv().await.unwrap();

    for kind in [ServerKind::Secondary, ServerKind::Primary, ServerKind::Router] {
        broadcaster.publish(observed(kind));
        assert_eq!(active.recv().await.unwrap().kind, kind);
    }
}

#[tokio::test]
async fn unsubscribe_concurrent_with_publish() {
    let broadcaster = Broadcaster::new(ServerDescription::unknown(testkit::address()));
    let publisher = {
        let broadcaster = broadcaster.clone();
        tokio::spawn(async move {
            for _ in 0..500 {
                broadcaster.publish(observed(ServerKind::Primary));
                tokio::task::yield_now().await;
            }
        })
    };

    let subs: Vec<_> = (0..20).map(|_| broadcaster.subscribe().unwrap()).collect();
    for mut sub in subs {
        tokio::task::yield_now().await;
        sub.unsubscribe();
    }
    publisher.await.unwrap();
    assert_eq!(broadcaster.subscriber_count(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn subscribe_racing_with_close_never_leaves_open_mailbox() {
    let server = Server::new(
        testkit::address(),
        testkit::config::quiet_server(2, 2),
        Arc::new(MockDialer::new()),
        Arc::new(ScriptedProber::new()),
    )
    .unwrap();

    let subscribers: Vec<_> = (0..16)
        .map(|_| {
            let server = server.clone();
            tokio::spawn(async move {
                match server.subscribe() {
                    Ok(sub) => {
                        let drained: Vec<_> = timeout(Duration::from_secs(1), sub.into_stream().collect())
                            .await
                            .expect("mailbox closed after server close");
                        assert!(!drained.is_empty());
                    }
                    Err(Error::SubscribeAfterClosed) => {}
                    Err(e) => panic!("unexpected error: {e}"),
                }
            })
        })
        .collect();

    tokio::task::yield_now().await;
    server.close().await.unwrap();
    for task in subscribers {
        task.await.unwrap();
    }
}
