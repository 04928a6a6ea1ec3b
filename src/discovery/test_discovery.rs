use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[cfg(test)]
use pretty_assertions::assert_eq;

use futures::future::{self, BoxFuture};
use slog::{o, Discard, Logger};
use tokio::sync::Notify;

use super::*;
use crate::conf::ClusterConf;

/// Flaky is not ready for the first `not_ready` calls and then fails `errors` times.
struct Flaky {
    not_ready: u32,
    errors: u32,
    calls: AtomicU32,
    leader: usize,
}

impl Flaky {
    fn new(not_ready: u32, errors: u32) -> Flaky {
        Flaky {
            not_ready,
            errors,
            calls: AtomicU32::new(0),
            leader: 1,
        }
    }
}

impl Discovery for Flaky {
    fn replica_list(&self) -> BoxFuture<'_, Result<ReplicaList, DiscoveryError>> {
        Box::pin(async move {
            // a remote call yields to the runtime at least once.
            tokio::task::yield_now().await;

            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.not_ready {
                return Ok(ReplicaList::default());
            }
            if n < self.not_ready + self.errors {
                return Err(DiscoveryError::Unavailable(format!("call {}", n)));
            }
            Ok(ReplicaList {
                ready: true,
                replicas: vec!["a:1".into(), "b:2".into()],
            })
        })
    }

    fn leader(&self) -> BoxFuture<'_, Result<usize, DiscoveryError>> {
        Box::pin(future::ready(Ok(self.leader)))
    }
}

fn discard() -> Logger {
    Logger::root(Discard, o!())
}

#[tokio::test(start_paused = true)]
async fn test_static() {
    let d = StaticDiscovery::new(ClusterConf::from_list("x:1, y:2,z:3").unwrap());
    let c = discover(&d, None, 1, Duration::from_secs(1), &discard())
        .await
        .unwrap();
    assert_eq!(
        Cluster {
            replicas: vec!["x:1".into(), "y:2".into(), "z:3".into()],
            leader: 0
        },
        c
    );
    assert_eq!(3, c.len());

    let c = discover(&d, Some(2), 1, Duration::from_secs(1), &discard())
        .await
        .unwrap();
    assert_eq!(2, c.leader);
}

#[tokio::test(start_paused = true)]
async fn test_retry_until_ready() {
    let d = Flaky::new(2, 3);
    let start = tokio::time::Instant::now();

    let c = discover(&d, None, 10, Duration::from_millis(100), &discard())
        .await
        .unwrap();

    assert_eq!(1, c.leader);
    assert_eq!(2, c.len());
    assert_eq!(6, d.calls.load(Ordering::SeqCst));
    let elapsed = start.elapsed();
    assert!(
        elapsed >= Duration::from_millis(500) && elapsed < Duration::from_millis(600),
        "{:?}",
        elapsed
    );
}

#[tokio::test(start_paused = true)]
async fn test_exhausted() {
    let d = Flaky::new(100, 0);
    let r = discover(&d, None, 4, Duration::from_millis(10), &discard()).await;

    assert_eq!(Err(DiscoveryError::Exhausted(4)), r);
    assert_eq!(4, d.calls.load(Ordering::SeqCst));
}

#[tokio::test(start_paused = true)]
async fn test_bad_leader() {
    let mut d = Flaky::new(0, 0);
    d.leader = 5;
    let r = discover(&d, None, 3, Duration::from_millis(10), &discard()).await;
    assert_eq!(Err(DiscoveryError::BadLeader(5, 2)), r);

    let d = Flaky::new(0, 0);
    let r = discover(&d, Some(2), 3, Duration::from_millis(10), &discard()).await;
    assert_eq!(Err(DiscoveryError::BadLeader(2, 2)), r);
}

/// Gated answers only once `open` is notified.
struct Gated {
    open: Notify,
}

impl Discovery for Gated {
    fn replica_list(&self) -> BoxFuture<'_, Result<ReplicaList, DiscoveryError>> {
        Box::pin(async move {
            self.open.notified().await;
            Ok(ReplicaList {
                ready: true,
                replicas: vec!["a:1".into()],
            })
        })
    }

    fn leader(&self) -> BoxFuture<'_, Result<usize, DiscoveryError>> {
        Box::pin(future::ready(Ok(0)))
    }
}

#[tokio::test]
async fn test_answer_from_another_task() {
    // single threaded runtime: a blocking call would never see the notification.
    let d = Arc::new(Gated {
        open: Notify::new(),
    });

    let d2 = d.clone();
    tokio::spawn(async move {
        tokio::task::yield_now().await;
        d2.open.notify_one();
    });

    let c = discover(d.as_ref(), None, 1, Duration::from_millis(10), &discard())
        .await
        .unwrap();
    assert_eq!(1, c.len());
    assert_eq!(0, c.leader);
}
